use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use hearth_db::models::MessageRow;
use hearth_db::time::fmt_ts;
use hearth_sync::{publish, read_state};
use hearth_types::api::{AckResponse, Claims, SendMessageRequest};
use hearth_types::models::Message;
use hearth_types::{ChannelId, ChannelKind};

use crate::AppState;

const MAX_BODY_LEN: usize = 4000;

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor-based pagination: pass the `created_at` of the oldest message
    /// from the previous page to fetch older history.
    pub before: Option<String>,
}

fn default_limit() -> u32 {
    50
}

/// Store the message, then fan it out. The insert is the action: if it fails
/// the caller sees an error and nothing is published. If only the fanout
/// fails, the stored row is ground truth and clients catch up on their next
/// reload.
pub async fn send_message(
    State(state): State<AppState>,
    Path(channel_id): Path<ChannelId>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let body = req.body.trim().to_string();
    if body.is_empty() || body.len() > MAX_BODY_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }

    // A sender must be a participant of a direct channel; garbage ids are
    // rejected before they can create orphan rows.
    match channel_id.kind().map_err(|_| StatusCode::BAD_REQUEST)? {
        ChannelKind::Direct => {
            let (a, b) = channel_id
                .direct_members()
                .map_err(|_| StatusCode::BAD_REQUEST)?;
            if claims.sub != a && claims.sub != b {
                return Err(StatusCode::FORBIDDEN);
            }
        }
        ChannelKind::Group => {}
    }

    let message = Message {
        id: Uuid::new_v4(),
        channel_id: channel_id.clone(),
        sender_id: claims.sub,
        sender_username: claims.username.clone(),
        body,
        created_at: Utc::now(),
        read_at: None,
    };

    // Run blocking DB work off the async runtime.
    let db = state.db.clone();
    let stored = message.clone();
    tokio::task::spawn_blocking(move || {
        let now = fmt_ts(stored.created_at);
        match stored.channel_id.kind() {
            Ok(ChannelKind::Direct) => {
                let (a, b) = stored.channel_id.direct_members().map_err(|e| anyhow::anyhow!(e))?;
                db.ensure_membership(&a.to_string(), stored.channel_id.as_str(), &now)?;
                db.ensure_membership(&b.to_string(), stored.channel_id.as_str(), &now)?;
            }
            _ => {
                db.ensure_membership(&stored.sender_id.to_string(), stored.channel_id.as_str(), &now)?;
            }
        }
        db.insert_message(
            &stored.id.to_string(),
            stored.channel_id.as_str(),
            &stored.sender_id.to_string(),
            &stored.body,
            &now,
        )
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // Best-effort live delivery to each participant's private queue. The row
    // is already committed; any failure here is logged and left for the next
    // reload to repair.
    let db = state.db.clone();
    let publisher = state.publisher.clone();
    let outbound = message.clone();
    let fanout = tokio::task::spawn_blocking(move || {
        if let Err(err) = publish::fan_out_message(&db, &publisher, &outbound) {
            warn!("message {} stored but not fanned out: {}", outbound.id, err);
        }
    })
    .await;
    if let Err(err) = fanout {
        warn!("fanout task failed: {}", err);
    }

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(channel_id): Path<ChannelId>,
    Query(query): Query<MessageQuery>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let limit = query.limit.min(200);
    let before = query.before;

    let rows = tokio::task::spawn_blocking(move || {
        db.get_messages(channel_id.as_str(), limit, before.as_deref())
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // Rows arrive newest-first for the cursor; clients want oldest-first.
    let messages: Vec<Message> = rows.into_iter().rev().map(row_to_message).collect();
    Ok(Json(messages))
}

/// The read action: advance the caller's watermark and notify senders.
pub async fn ack_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<ChannelId>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let outcome = read_state::mark_read(
        state.db.clone(),
        state.publisher.clone(),
        claims.sub,
        channel_id.clone(),
    )
    .await
    .map_err(|e| {
        error!("ack failed for {}: {}", channel_id, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(AckResponse {
        channel_id,
        read_at: outcome.read_at,
        receipts: outcome.receipts,
    }))
}

fn row_to_message(row: MessageRow) -> Message {
    Message {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt message id '{}': {}", row.id, e);
            Uuid::default()
        }),
        channel_id: ChannelId::from(row.channel_id),
        sender_id: row.sender_id.parse().unwrap_or_else(|e| {
            warn!("Corrupt sender_id on message '{}': {}", row.id, e);
            Uuid::default()
        }),
        sender_username: row.sender_username,
        body: row.body,
        created_at: hearth_db::time::parse_ts(&row.created_at).unwrap_or_else(|e| {
            warn!("Corrupt created_at on message '{}': {}", row.id, e);
            chrono::DateTime::default()
        }),
        read_at: row
            .read_at
            .as_deref()
            .and_then(|s| hearth_db::time::parse_ts(s).ok()),
    }
}
