use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::channel::ChannelId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// A chat message as clients see it.
///
/// `id` is server-assigned and is the *only* identity key: every client-side
/// merge path deduplicates on it. `read_at` transitions once from `None` to a
/// timestamp when the other party acknowledges the channel, and never reverts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub channel_id: ChannelId,
    pub sender_id: Uuid,
    pub sender_username: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// One row of a user's channel list, ordered by most recent activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub channel_id: ChannelId,
    /// Display name: the peer's username for direct channels, the channel
    /// name for groups.
    pub name: String,
    pub last_activity: DateTime<Utc>,
    pub preview: Option<String>,
    pub unread: u32,
}
