//! # 하이라이트 라우트 핸들러
//!
//! ## 엔드포인트
//! | 메서드 | 경로 | 핸들러 |
//! |--------|------|--------|
//! | GET | /api/v1/highlights?q=...&tag_ids=... | `search_highlights` |
//! | POST | /api/v1/highlights | `create_highlight` |
//! | GET | /api/v1/highlights/{id} | `get_highlight` |
//! | PATCH | /api/v1/highlights/{id} | `update_highlight` |
//! | DELETE | /api/v1/highlights/{id} | `delete_highlight` |
//! | GET | /api/v1/highlights/{id}/tags | `get_highlight_tags` |
//! | GET | /api/v1/highlights/{id}/review | `get_review_card` |
//! | PATCH | /api/v1/highlights/{id}/review | `set_review_active` |
//!
//! 검색 조건은 쿼리 문자열로 받습니다 (`HighlightFilters` 참고).

use crate::{
    db,
    error::AppError,
    models::*,
    routes::AppState,
    services::{self, review_queue},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

/// `GET /highlights` → `{ "highlights": [...] }`
pub async fn search_highlights(
    State(state): State<AppState>,
    Query(filters): Query<HighlightFilters>,
) -> Result<Json<Value>, AppError> {
    let highlights = db::search_highlights(&state.pool, &filters).await?;
    Ok(Json(json!({ "highlights": highlights })))
}

/// `POST /highlights` — 하이라이트와 복습 카드를 함께 만듭니다.
///
/// 첫 복습일은 서버 현지 날짜 기준 내일입니다.
pub async fn create_highlight(
    State(state): State<AppState>,
    Json(req): Json<CreateHighlightRequest>,
) -> Result<Json<Highlight>, AppError> {
    let highlight = db::create_highlight(&state.pool, &req, services::today()).await?;
    Ok(Json(highlight))
}

/// `GET /highlights/{id}`
pub async fn get_highlight(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Highlight>, AppError> {
    let highlight = db::get_highlight(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::not_found("Highlight not found"))?;
    Ok(Json(highlight))
}

/// `PATCH /highlights/{id}`
pub async fn update_highlight(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateHighlightRequest>,
) -> Result<Json<Highlight>, AppError> {
    let highlight = db::update_highlight(&state.pool, &id, &req)
        .await?
        .ok_or_else(|| AppError::not_found("Highlight not found"))?;
    Ok(Json(highlight))
}

/// `DELETE /highlights/{id}` → `204 No Content`
pub async fn delete_highlight(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !db::delete_highlight(&state.pool, &id).await? {
        return Err(AppError::not_found("Highlight not found"));
    }
    tracing::info!(highlight_id = %id, "Highlight deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /highlights/{id}/tags` → `{ "tags": [...] }`
pub async fn get_highlight_tags(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let highlight = db::get_highlight(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::not_found("Highlight not found"))?;
    Ok(Json(json!({ "tags": highlight.tags })))
}

/// `GET /highlights/{id}/review` → `{ "card": {...}, "history": [...] }`
pub async fn get_review_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReviewCardDetail>, AppError> {
    let detail = review_queue::get_review_card(&state.pool, &id).await?;
    Ok(Json(detail))
}

/// `PATCH /highlights/{id}/review` + `{ "is_active": false }`
pub async fn set_review_active(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetReviewActiveRequest>,
) -> Result<Json<ReviewCard>, AppError> {
    let card = review_queue::set_review_active(&state.pool, &id, req.is_active).await?;
    Ok(Json(card))
}
