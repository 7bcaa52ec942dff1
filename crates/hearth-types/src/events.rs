use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::channel::ChannelId;
use crate::models::Message;

/// Events delivered over the gateway.
///
/// Every event is addressed to a single user's private delivery queue —
/// there is no shared broadcast topic. The transport is at-least-once and
/// unordered across event kinds, so consumers must tolerate duplicates and
/// reordering (see `hearth-client`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ChatEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, username: String },

    /// A new message was posted in a channel the recipient participates in
    NewMessage {
        channel_id: ChannelId,
        message: Message,
    },

    /// The recipient's messages in this channel were read up to `read_at`
    MessagesRead {
        channel_id: ChannelId,
        read_by: Uuid,
        read_at: DateTime<Utc>,
    },

    /// A participant started or stopped typing
    UserTyping {
        channel_id: ChannelId,
        user_id: Uuid,
        username: String,
        is_typing: bool,
    },
}

/// Commands sent FROM client TO server over the gateway socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// First keystroke (or throttle window elapsed) in a channel
    StartTyping { channel_id: ChannelId },

    /// Quiet timeout or input blur
    StopTyping { channel_id: ChannelId },
}
