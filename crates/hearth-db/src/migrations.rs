use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Group channels only. Direct channels have no row: their identity
        -- is fully encoded in the dm:<a>:<b> channel id.
        CREATE TABLE IF NOT EXISTS channels (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- One row per (user, channel). last_read_at is the unread watermark;
        -- NULL means the user has never acknowledged the channel.
        CREATE TABLE IF NOT EXISTS channel_members (
            channel_id    TEXT NOT NULL,
            user_id       TEXT NOT NULL REFERENCES users(id),
            last_read_at  TEXT,
            created_at    TEXT NOT NULL,
            PRIMARY KEY (channel_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_members_user
            ON channel_members(user_id);

        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            channel_id  TEXT NOT NULL,
            sender_id   TEXT NOT NULL REFERENCES users(id),
            body        TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            read_at     TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_messages_channel
            ON messages(channel_id, created_at);

        CREATE INDEX IF NOT EXISTS idx_messages_unread
            ON messages(channel_id, read_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
