//! Search and history endpoints.
//!
//! Every handler receives the caller's [`Identity`] from the auth
//! middleware via request extensions, so store operations are always
//! scoped to the authenticated user.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::db::{DEFAULT_LIST_LIMIT, DEFAULT_RECENT_LIMIT};
use crate::domain::Identity;
use crate::domain::search::{SearchOutcome, SearchRecord};

#[derive(Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<u64>,
}

/// POST /search
/// Run a live search for the caller and record the result
pub async fn perform_search(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<ApiResponse<SearchOutcome>>, ApiError> {
    let query = payload.query.trim();
    if query.is_empty() {
        return Err(ApiError::validation("Query must not be empty"));
    }

    let outcome = state.gateway().perform_search(Some(identity), query).await?;

    Ok(Json(ApiResponse::success(outcome)))
}

/// GET /searches/recent
/// Compact recent-history view, newest first
pub async fn list_recent(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<SearchRecord>>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);

    let records = state.store().list_recent(Some(identity), limit).await?;

    Ok(Json(ApiResponse::success(records)))
}

/// GET /searches
/// Full history view, newest first
pub async fn list_searches(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<SearchRecord>>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);

    let records = state.store().list_all(Some(identity), limit).await?;

    Ok(Json(ApiResponse::success(records)))
}

/// DELETE /searches/{id}
/// Remove one of the caller's records. Records owned by other users are
/// indistinguishable from records that never existed.
pub async fn delete_search(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(record_id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.store().delete_search(Some(identity), record_id).await?;

    Ok(Json(ApiResponse::success(())))
}
