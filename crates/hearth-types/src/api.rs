use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::channel::ChannelId;
use crate::models::{ChannelSummary, Message};

// -- JWT Claims --

/// JWT claims shared between hearth-api (REST middleware) and hearth-gateway
/// (WebSocket identify). Canonical definition lives here to avoid drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub body: String,
}

/// A send returns the stored message so the sender can insert it optimistically
/// before the gateway echo arrives.
pub type MessageResponse = Message;

// -- Read state --

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub channel_id: ChannelId,
    pub read_at: DateTime<Utc>,
    /// Distinct senders that were notified with a read receipt.
    pub receipts: usize,
}

// -- Channels --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenDirectRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct OpenDirectResponse {
    pub channel_id: ChannelId,
}

pub type ChannelListResponse = Vec<ChannelSummary>;
