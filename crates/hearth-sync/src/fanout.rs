use hearth_db::Database;
use hearth_types::{ChannelId, ChannelKind};
use tracing::warn;
use uuid::Uuid;

use crate::SyncError;

/// Destinations that must observe a new message in `channel`.
///
/// Direct channels decode both participants straight from the canonical id —
/// no database round trip. The sender is always included so their other open
/// sessions reconcile too. Group channels use the membership roster.
pub fn message_destinations(db: &Database, channel: &ChannelId) -> Result<Vec<Uuid>, SyncError> {
    match channel.kind()? {
        ChannelKind::Direct => {
            let (a, b) = channel.direct_members()?;
            Ok(vec![a, b])
        }
        ChannelKind::Group => {
            let members = db.channel_members(channel.as_str()).map_err(SyncError::db)?;
            Ok(parse_user_ids(channel, members))
        }
    }
}

/// Destinations owed a read receipt when `reader` acknowledges `channel`:
/// the distinct senders with unread messages as of the action. Computed from
/// data the ack already touches, so it costs nothing extra for the common
/// direct-channel case.
pub fn read_destinations(
    db: &Database,
    channel: &ChannelId,
    reader: Uuid,
) -> Result<Vec<Uuid>, SyncError> {
    // Validate the id shape up front so a malformed id fails resolution
    // instead of producing an empty-but-plausible sender set.
    channel.kind()?;

    let senders = db
        .unread_senders(channel.as_str(), &reader.to_string())
        .map_err(SyncError::db)?;
    Ok(parse_user_ids(channel, senders))
}

/// Rows hold ids we wrote ourselves; an unparseable one is dropped (never
/// delivered anywhere) and logged.
fn parse_user_ids(channel: &ChannelId, raw: Vec<String>) -> Vec<Uuid> {
    raw.into_iter()
        .filter_map(|s| match s.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!("skipping corrupt user id {:?} in {}", s, channel);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_types::ChannelIdError;

    fn uid(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    #[test]
    fn direct_message_destinations_are_both_participants() {
        let db = Database::open_in_memory().unwrap();
        let chan = ChannelId::direct(uid(1), uid(2));
        let mut dests = message_destinations(&db, &chan).unwrap();
        dests.sort();
        assert_eq!(dests, vec![uid(1), uid(2)]);
    }

    #[test]
    fn group_message_destinations_come_from_roster() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&uid(1).to_string(), "ana", "x").unwrap();
        db.create_user(&uid(2).to_string(), "ben", "x").unwrap();
        let chan = ChannelId::group(uid(9));
        db.ensure_membership(&uid(1).to_string(), chan.as_str(), "2026-08-06T00:00:00.000Z")
            .unwrap();
        db.ensure_membership(&uid(2).to_string(), chan.as_str(), "2026-08-06T00:00:00.000Z")
            .unwrap();

        let mut dests = message_destinations(&db, &chan).unwrap();
        dests.sort();
        assert_eq!(dests, vec![uid(1), uid(2)]);
    }

    #[test]
    fn malformed_channel_id_fails_resolution() {
        let db = Database::open_in_memory().unwrap();
        let bad = ChannelId::from("dm:oops".to_string());
        assert!(matches!(
            message_destinations(&db, &bad),
            Err(SyncError::Channel(ChannelIdError::Malformed(_)))
        ));
        assert!(read_destinations(&db, &ChannelId::from("??".to_string()), uid(1)).is_err());
    }

    #[test]
    fn read_destinations_are_distinct_unread_senders() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&uid(1).to_string(), "ana", "x").unwrap();
        db.create_user(&uid(2).to_string(), "ben", "x").unwrap();
        let chan = ChannelId::direct(uid(1), uid(2));

        db.insert_message("m1", chan.as_str(), &uid(1).to_string(), "a", "2026-08-06T10:00:00.000Z")
            .unwrap();
        db.insert_message("m2", chan.as_str(), &uid(1).to_string(), "b", "2026-08-06T10:00:01.000Z")
            .unwrap();

        // Two unread messages, one distinct sender.
        assert_eq!(read_destinations(&db, &chan, uid(2)).unwrap(), vec![uid(1)]);
        // The reader's own messages never earn the reader a receipt.
        assert!(read_destinations(&db, &chan, uid(1)).unwrap().is_empty());
    }
}
