use std::sync::Arc;

use chrono::{DateTime, Utc};
use hearth_db::time::fmt_ts;
use hearth_db::Database;
use hearth_types::events::ChatEvent;
use hearth_types::ChannelId;
use tracing::warn;
use uuid::Uuid;

use crate::{fanout, EventPublisher, SyncError};

pub struct AckOutcome {
    pub read_at: DateTime<Utc>,
    /// Distinct senders that were sent a read receipt.
    pub receipts: usize,
}

/// Record that `user_id` has read `channel` up to now and notify the senders
/// owed a receipt. Runs the blocking core on the blocking pool.
pub async fn mark_read(
    db: Arc<Database>,
    publisher: EventPublisher,
    user_id: Uuid,
    channel: ChannelId,
) -> Result<AckOutcome, SyncError> {
    tokio::task::spawn_blocking(move || {
        mark_read_at(&db, &publisher, user_id, &channel, Utc::now())
    })
    .await
    .map_err(|e| SyncError::Runtime(e.to_string()))?
}

/// Synchronous core with an explicit timestamp.
///
/// Order matters:
///   1. resolve the distinct unread senders (the receipt audience);
///   2. advance the membership watermark — the durability anchor; failure
///      here fails the whole ack;
///   3. stamp `read_at` on the acknowledged rows so reloads agree with the
///      pushed event — best-effort;
///   4. publish one `MessagesRead` per sender — best-effort.
///
/// Calling this again with no new messages is a no-op: the sender set is
/// empty, so no events go out and only the watermark advances.
pub fn mark_read_at(
    db: &Database,
    publisher: &EventPublisher,
    user_id: Uuid,
    channel: &ChannelId,
    read_at: DateTime<Utc>,
) -> Result<AckOutcome, SyncError> {
    // A malformed id only breaks destination resolution; the watermark write
    // below still goes through and the ack succeeds without receipts.
    let senders = match fanout::read_destinations(db, channel, user_id) {
        Ok(senders) => senders,
        Err(SyncError::Channel(err)) => {
            warn!("skipping read-receipt fanout: {err}");
            Vec::new()
        }
        Err(other) => return Err(other),
    };

    let ts = fmt_ts(read_at);
    let reader = user_id.to_string();
    db.upsert_last_read(&reader, channel.as_str(), &ts)
        .map_err(SyncError::db)?;

    if let Err(err) = db.stamp_messages_read(channel.as_str(), &reader, &ts) {
        warn!("failed to stamp read_at in {channel}: {err}");
    }

    let event = ChatEvent::MessagesRead {
        channel_id: channel.clone(),
        read_by: user_id,
        read_at,
    };
    for sender in &senders {
        publisher.publish(*sender, event.clone());
    }

    Ok(AckOutcome {
        read_at,
        receipts: senders.len(),
    })
}
