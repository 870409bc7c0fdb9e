use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use tedtalks_core::{influence::rank_speakers, Talk};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

const DEFAULT_LIMIT: i64 = 5;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct InfluenceParams {
    limit: Option<i64>,
}

/// Ranks speakers by average engagement per talk, computed over the full
/// talks table. The ranking itself is pure; only the fetch touches the DB.
pub async fn list_influential_speakers(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<InfluenceParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("limit must be between 1 and {MAX_LIMIT}, got {limit}"),
        ));
    }

    let rows = tedtalks_db::list_all_talks(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let talks: Vec<Talk> = rows.into_iter().map(Talk::from).collect();

    let speakers = rank_speakers(&talks, limit);
    Ok(Json(ApiResponse {
        data: speakers,
        meta: ResponseMeta::new(req_id.0),
    }))
}
