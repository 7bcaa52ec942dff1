use anyhow::{Result, anyhow};
use rusqlite::OptionalExtension;

use crate::Database;
use crate::models::{ChannelSummaryRow, MessageRow, UserRow};

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password) VALUES (?1, ?2, ?3)",
                (id, username, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username, password, created_at FROM users WHERE username = ?1",
                [username],
                |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        password: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
        })
    }

    pub fn get_username_by_id(&self, id: &str) -> Result<String> {
        self.with_conn(|conn| {
            conn.query_row("SELECT username FROM users WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .map_err(|_| anyhow!("User not found: {}", id))
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        id: &str,
        channel_id: &str,
        sender_id: &str,
        body: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (id, channel_id, sender_id, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, channel_id, sender_id, body, created_at),
            )?;
            Ok(())
        })
    }

    /// Newest-first window of a channel's messages. `before` is an exclusive
    /// created_at cursor for paging into history.
    pub fn get_messages(
        &self,
        channel_id: &str,
        limit: u32,
        before: Option<&str>,
    ) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.channel_id, m.sender_id, u.username, m.body,
                        m.created_at, m.read_at
                   FROM messages m
                   JOIN users u ON u.id = m.sender_id
                  WHERE m.channel_id = ?1
                    AND (?2 IS NULL OR m.created_at < ?2)
                  ORDER BY m.created_at DESC, m.id DESC
                  LIMIT ?3",
            )?;
            let rows = stmt
                .query_map((channel_id, before, limit), |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        channel_id: row.get(1)?,
                        sender_id: row.get(2)?,
                        sender_username: row.get(3)?,
                        body: row.get(4)?,
                        created_at: row.get(5)?,
                        read_at: row.get(6)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Distinct authors of messages in `channel_id` that `reader_id` has not
    /// read yet. These are exactly the parties owed a read receipt.
    pub fn unread_senders(&self, channel_id: &str, reader_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT sender_id FROM messages
                  WHERE channel_id = ?1 AND sender_id != ?2 AND read_at IS NULL",
            )?;
            let rows = stmt
                .query_map((channel_id, reader_id), |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(rows)
        })
    }

    /// Stamp `read_at` on everything `reader_id` just acknowledged. Rows with
    /// a `read_at` already set are left untouched (read state is monotonic).
    pub fn stamp_messages_read(
        &self,
        channel_id: &str,
        reader_id: &str,
        read_at: &str,
    ) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE messages SET read_at = ?3
                  WHERE channel_id = ?1 AND sender_id != ?2 AND read_at IS NULL",
                (channel_id, reader_id, read_at),
            )?;
            Ok(n)
        })
    }

    // -- Memberships --

    /// Create the membership row on first access; no-op if it exists.
    pub fn ensure_membership(&self, user_id: &str, channel_id: &str, now: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO channel_members (channel_id, user_id, created_at)
                 VALUES (?1, ?2, ?3)",
                (channel_id, user_id, now),
            )?;
            Ok(())
        })
    }

    /// Advance the unread watermark. Last writer wins: concurrent acks both
    /// write monotonic now-values, so no coordination is needed.
    pub fn upsert_last_read(&self, user_id: &str, channel_id: &str, read_at: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO channel_members (channel_id, user_id, last_read_at, created_at)
                 VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT (channel_id, user_id)
                 DO UPDATE SET last_read_at = excluded.last_read_at",
                (channel_id, user_id, read_at),
            )?;
            Ok(())
        })
    }

    pub fn channel_members(&self, channel_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT user_id FROM channel_members WHERE channel_id = ?1")?;
            let rows = stmt
                .query_map([channel_id], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(rows)
        })
    }

    // -- Channels --

    pub fn create_group_channel(&self, id: &str, name: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO channels (id, name) VALUES (?1, ?2)",
                (id, name),
            )?;
            Ok(())
        })
    }

    pub fn channel_name(&self, channel_id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT name FROM channels WHERE id = ?1",
                [channel_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
        })
    }

    /// One row per channel the user belongs to, newest activity first.
    /// Unread counts derive from the membership watermark alone.
    pub fn channel_summaries(&self, user_id: &str) -> Result<Vec<ChannelSummaryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT cm.channel_id,
                        COALESCE(
                            (SELECT m.created_at FROM messages m
                              WHERE m.channel_id = cm.channel_id
                              ORDER BY m.created_at DESC, m.id DESC LIMIT 1),
                            cm.created_at
                        ) AS last_activity,
                        (SELECT m.body FROM messages m
                          WHERE m.channel_id = cm.channel_id
                          ORDER BY m.created_at DESC, m.id DESC LIMIT 1) AS preview,
                        (SELECT COUNT(*) FROM messages m
                          WHERE m.channel_id = cm.channel_id
                            AND m.sender_id != cm.user_id
                            AND (cm.last_read_at IS NULL
                                 OR m.created_at > cm.last_read_at)) AS unread
                   FROM channel_members cm
                  WHERE cm.user_id = ?1
                  ORDER BY last_activity DESC, cm.channel_id ASC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ChannelSummaryRow {
                        channel_id: row.get(0)?,
                        last_activity: row.get(1)?,
                        preview: row.get(2)?,
                        unread: row.get(3)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_users(names: &[(&str, &str)]) -> Database {
        let db = Database::open_in_memory().unwrap();
        for (id, name) in names {
            db.create_user(id, name, "x").unwrap();
        }
        db
    }

    #[test]
    fn unread_senders_excludes_reader_and_read_rows() {
        let db = db_with_users(&[("u1", "ana"), ("u2", "ben")]);
        db.insert_message("m1", "chan", "u1", "hi", "2026-08-06T10:00:00.000Z")
            .unwrap();
        db.insert_message("m2", "chan", "u2", "yo", "2026-08-06T10:00:01.000Z")
            .unwrap();

        // u2 reading sees only u1 as an unread sender.
        assert_eq!(db.unread_senders("chan", "u2").unwrap(), vec!["u1"]);

        db.stamp_messages_read("chan", "u2", "2026-08-06T10:00:02.000Z")
            .unwrap();
        assert!(db.unread_senders("chan", "u2").unwrap().is_empty());
    }

    #[test]
    fn stamp_is_monotonic() {
        let db = db_with_users(&[("u1", "ana"), ("u2", "ben")]);
        db.insert_message("m1", "chan", "u1", "hi", "2026-08-06T10:00:00.000Z")
            .unwrap();

        assert_eq!(
            db.stamp_messages_read("chan", "u2", "2026-08-06T10:01:00.000Z")
                .unwrap(),
            1
        );
        // Second ack touches nothing: read_at never moves once set.
        assert_eq!(
            db.stamp_messages_read("chan", "u2", "2026-08-06T10:02:00.000Z")
                .unwrap(),
            0
        );

        let rows = db.get_messages("chan", 10, None).unwrap();
        assert_eq!(
            rows[0].read_at.as_deref(),
            Some("2026-08-06T10:01:00.000Z")
        );
    }

    #[test]
    fn summaries_count_unread_from_watermark() {
        let db = db_with_users(&[("u1", "ana"), ("u2", "ben")]);
        db.ensure_membership("u2", "chan", "2026-08-06T09:00:00.000Z")
            .unwrap();
        db.insert_message("m1", "chan", "u1", "one", "2026-08-06T10:00:00.000Z")
            .unwrap();
        db.insert_message("m2", "chan", "u1", "two", "2026-08-06T10:00:01.000Z")
            .unwrap();
        db.insert_message("m3", "chan", "u2", "mine", "2026-08-06T10:00:02.000Z")
            .unwrap();

        let rows = db.channel_summaries("u2").unwrap();
        assert_eq!(rows.len(), 1);
        // Own message does not count as unread.
        assert_eq!(rows[0].unread, 2);
        assert_eq!(rows[0].preview.as_deref(), Some("mine"));

        db.upsert_last_read("u2", "chan", "2026-08-06T10:00:01.000Z")
            .unwrap();
        let rows = db.channel_summaries("u2").unwrap();
        assert_eq!(rows[0].unread, 0);
    }

    #[test]
    fn summaries_order_by_activity() {
        let db = db_with_users(&[("u1", "ana"), ("u2", "ben")]);
        db.ensure_membership("u2", "old", "2026-08-06T09:00:00.000Z")
            .unwrap();
        db.ensure_membership("u2", "busy", "2026-08-06T09:00:00.000Z")
            .unwrap();
        db.insert_message("m1", "old", "u1", "a", "2026-08-06T10:00:00.000Z")
            .unwrap();
        db.insert_message("m2", "busy", "u1", "b", "2026-08-06T11:00:00.000Z")
            .unwrap();

        let rows = db.channel_summaries("u2").unwrap();
        assert_eq!(rows[0].channel_id, "busy");
        assert_eq!(rows[1].channel_id, "old");
    }

    #[test]
    fn ensure_membership_is_idempotent_and_keeps_watermark() {
        let db = db_with_users(&[("u1", "ana")]);
        db.upsert_last_read("u1", "chan", "2026-08-06T10:00:00.000Z")
            .unwrap();
        db.ensure_membership("u1", "chan", "2026-08-06T11:00:00.000Z")
            .unwrap();

        let rows = db.channel_summaries("u1").unwrap();
        assert_eq!(rows.len(), 1);
        // Re-ensuring did not clobber the existing row.
        assert_eq!(rows[0].unread, 0);
    }
}
