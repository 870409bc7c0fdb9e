use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tedtalks_core::Talk;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

const MIN_YEAR: i32 = 1984;
const MAX_YEAR: i32 = 9999;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    page: Option<i64>,
    size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PagedResponse {
    pub items: Vec<Talk>,
    pub page: i64,
    pub size: i64,
    pub total_elements: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total: i64,
}

fn total_pages(total_elements: i64, size: i64) -> i64 {
    if total_elements == 0 {
        0
    } else {
        (total_elements + size - 1) / size
    }
}

pub async fn get_talk(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let talk = tedtalks_db::get_talk_by_id(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    match talk {
        Some(talk) => Ok(Json(ApiResponse {
            data: Talk::from(talk),
            meta: ResponseMeta::new(req_id.0),
        })),
        None => Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("talk {id} not found"),
        )),
    }
}

pub async fn list_talks_by_year(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(year): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("year must be between {MIN_YEAR} and {MAX_YEAR}, got {year}"),
        ));
    }

    let rows = tedtalks_db::list_talks_by_year(&state.pool, year)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let talks: Vec<Talk> = rows.into_iter().map(Talk::from).collect();
    Ok(Json(ApiResponse {
        data: talks,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub async fn list_talks(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = params.page.unwrap_or(0);
    let size = params.size.unwrap_or(DEFAULT_PAGE_SIZE);

    if page < 0 {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("page must be >= 0, got {page}"),
        ));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&size) {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("size must be between 1 and {MAX_PAGE_SIZE}, got {size}"),
        ));
    }

    // page and size are individually bounded but their product can still
    // overflow i64; treat that as a validation failure, not a store error.
    let Some(offset) = page.checked_mul(size) else {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("page {page} with size {size} is out of range"),
        ));
    };

    let total_elements = tedtalks_db::count_talks(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let rows = tedtalks_db::list_talks_page(&state.pool, size, offset)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let items: Vec<Talk> = rows.into_iter().map(Talk::from).collect();
    Ok(Json(ApiResponse {
        data: PagedResponse {
            items,
            page,
            size,
            total_elements,
            total_pages: total_pages(total_elements, size),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub async fn get_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<impl IntoResponse, ApiError> {
    let total = tedtalks_db::count_talks(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse {
            data: StatsResponse { total },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}
