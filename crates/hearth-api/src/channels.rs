use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::Utc;
use tracing::{error, warn};

use hearth_db::time::fmt_ts;
use hearth_types::api::{Claims, OpenDirectRequest, OpenDirectResponse};
use hearth_types::models::ChannelSummary;
use hearth_types::{ChannelId, ChannelKind};

use crate::AppState;

/// The caller's channel list, newest activity first, with unread badges.
/// This is the authoritative reload that reconciles the client-side roster.
pub async fn list_channels(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let me = claims.sub;

    let summaries = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<ChannelSummary>> {
        let rows = db.channel_summaries(&me.to_string())?;
        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let channel_id = ChannelId::from(row.channel_id);
            let name = match channel_id.kind() {
                Ok(ChannelKind::Direct) => match channel_id.direct_peer(me) {
                    Ok(peer) => db
                        .get_username_by_id(&peer.to_string())
                        .unwrap_or_else(|_| peer.to_string()),
                    Err(e) => {
                        warn!("skipping channel with bad id: {}", e);
                        continue;
                    }
                },
                Ok(ChannelKind::Group) => db
                    .channel_name(channel_id.as_str())?
                    .unwrap_or_else(|| channel_id.to_string()),
                Err(e) => {
                    warn!("skipping channel with bad id: {}", e);
                    continue;
                }
            };

            let last_activity = match hearth_db::time::parse_ts(&row.last_activity) {
                Ok(ts) => ts,
                Err(e) => {
                    warn!("skipping channel {} with bad activity: {}", channel_id, e);
                    continue;
                }
            };

            summaries.push(ChannelSummary {
                channel_id,
                name,
                last_activity,
                preview: row.preview,
                unread: row.unread.max(0) as u32,
            });
        }
        Ok(summaries)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(summaries))
}

/// Resolve (and lazily create) the direct channel between the caller and
/// another user. The id is canonical, so both sides always land in the same
/// conversation no matter who opens it first.
pub async fn open_direct(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<OpenDirectRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.user_id == claims.sub {
        return Err(StatusCode::BAD_REQUEST);
    }

    let channel_id = ChannelId::direct(claims.sub, req.user_id);
    let db = state.db.clone();
    let me = claims.sub;
    let peer = req.user_id;
    let chan = channel_id.clone();

    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        // Peer must exist before we create membership rows against it.
        db.get_username_by_id(&peer.to_string())?;
        let now = fmt_ts(Utc::now());
        db.ensure_membership(&me.to_string(), chan.as_str(), &now)?;
        db.ensure_membership(&peer.to_string(), chan.as_str(), &now)?;
        Ok(())
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|_| StatusCode::NOT_FOUND)?;

    Ok(Json(OpenDirectResponse { channel_id }))
}
