//! # 읽을거리(Source) 라우트 핸들러
//!
//! ## 엔드포인트
//! - `GET    /api/v1/sources`                 → 목록 (`?source_type=book&is_read=false`)
//! - `POST   /api/v1/sources`                 → 생성
//! - `GET    /api/v1/sources/{id}`            → 단일 조회
//! - `PATCH  /api/v1/sources/{id}`            → 부분 수정
//! - `DELETE /api/v1/sources/{id}`            → 삭제 (하이라이트와 복습 카드도 함께 삭제)
//! - `PUT    /api/v1/sources/{id}/progress`   → 읽기 진행률 기록 `{ "position": 42.5 }`
//! - `PUT    /api/v1/sources/{id}/read`       → 읽음 표시 `{ "is_read": true }`
//! - `GET    /api/v1/sources/{id}/highlights` → 이 자료의 하이라이트 목록

use crate::{db, error::AppError, models::*, routes::AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

/// `GET /sources` → `{ "sources": [...] }` (최근 수정순)
pub async fn list_sources(
    State(state): State<AppState>,
    Query(filters): Query<SourceFilters>,
) -> Result<Json<Value>, AppError> {
    let sources = db::list_sources(&state.pool, &filters).await?;
    Ok(Json(json!({ "sources": sources })))
}

/// `POST /sources`
pub async fn create_source(
    State(state): State<AppState>,
    Json(req): Json<CreateSourceRequest>,
) -> Result<Json<Source>, AppError> {
    let source = db::create_source(&state.pool, &req).await?;
    Ok(Json(source))
}

/// `GET /sources/{id}`
pub async fn get_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Source>, AppError> {
    let source = db::get_source(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::not_found("Source not found"))?;
    Ok(Json(source))
}

/// `PATCH /sources/{id}`
pub async fn update_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateSourceRequest>,
) -> Result<Json<Source>, AppError> {
    let source = db::update_source(&state.pool, &id, &req)
        .await?
        .ok_or_else(|| AppError::not_found("Source not found"))?;
    Ok(Json(source))
}

/// `DELETE /sources/{id}` → `204 No Content`
pub async fn delete_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !db::delete_source(&state.pool, &id).await? {
        return Err(AppError::not_found("Source not found"));
    }
    tracing::info!(source_id = %id, "Source deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /sources/{id}/progress` — 복습 카드에는 영향을 주지 않습니다.
pub async fn update_reading_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ReadingProgressRequest>,
) -> Result<Json<Source>, AppError> {
    let source = db::update_reading_progress(&state.pool, &id, req.position)
        .await?
        .ok_or_else(|| AppError::not_found("Source not found"))?;
    Ok(Json(source))
}

/// `PUT /sources/{id}/read`
pub async fn mark_as_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MarkReadRequest>,
) -> Result<Json<Source>, AppError> {
    let source = db::mark_as_read(&state.pool, &id, req.is_read)
        .await?
        .ok_or_else(|| AppError::not_found("Source not found"))?;
    Ok(Json(source))
}

/// `GET /sources/{id}/highlights?limit=&offset=` → `{ "highlights": [...] }`
///
/// 한 페이지는 최대 200개이며, 더 있으면 `offset`으로 이어서 요청합니다.
pub async fn list_source_highlights(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Value>, AppError> {
    // 자료가 없으면 빈 목록 대신 404
    let _ = db::get_source(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::not_found("Source not found"))?;

    let highlights = db::list_source_highlights(&state.pool, &id, &page).await?;
    Ok(Json(json!({ "highlights": highlights })))
}
