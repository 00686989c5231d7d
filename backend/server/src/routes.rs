use std::{sync::Arc, time::Instant};

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    codec::encode,
    error::AppError,
    state::State as AppState,
    sync::{Cursor, read_since},
};

#[derive(Deserialize)]
pub struct VoteRequest {
    pub action: u64,
    #[serde(alias = "thing")]
    pub target: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncQuery {
    sync_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VotesResponse {
    pub votes: Vec<u64>,
    pub next_sync_id: u64,
    pub duration: u64,
}

pub async fn store_vote_handler(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    // clients post with whatever content type curl picks
    let vote: VoteRequest = serde_json::from_slice(&body)?;
    let entry = encode(vote.action, vote.target)?;

    let len = state.log.append(&user, entry).await?;
    debug!(%user, action = vote.action, target = vote.target, len, "Stored vote");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_votes_handler(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
    Query(query): Query<SyncQuery>,
) -> Result<Json<VotesResponse>, AppError> {
    let start_time = Instant::now();

    let cursor = Cursor::parse(query.sync_id.as_deref());
    let page = read_since(state.log.as_ref(), &user, cursor).await?;

    Ok(Json(VotesResponse {
        votes: page.flatten(),
        next_sync_id: page.next_sync_id,
        duration: start_time.elapsed().as_millis() as u64,
    }))
}
