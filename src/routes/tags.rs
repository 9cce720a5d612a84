//! # 태그 API 라우트 핸들러
//!
//! ## 엔드포인트 목록
//! | 메서드 | 경로 | 핸들러 | 설명 |
//! |--------|------|--------|------|
//! | GET | /api/v1/tags | `list_tags` | 전체 태그 목록 |
//! | POST | /api/v1/tags | `create_tag` | 새 태그 생성 |
//! | PATCH | /api/v1/tags/{id} | `update_tag` | 태그 이름/색상 수정 |
//! | DELETE | /api/v1/tags/{id} | `delete_tag` | 태그 삭제 (하이라이트 연결도 삭제) |
//!
//! 하이라이트에 태그를 붙이는 것은 하이라이트 생성/수정 요청의 `tag_ids`로 합니다.

use crate::{db, error::AppError, models::*, routes::AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

/// `GET /tags` → `{ "tags": [...] }`
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let tags = db::list_tags(&state.pool).await?;
    Ok(Json(json!({ "tags": tags })))
}

/// `POST /tags` + `{ "name": "...", "color": "..." }`
///
/// 같은 이름의 태그가 이미 있으면 409 Conflict
pub async fn create_tag(
    State(state): State<AppState>,
    Json(req): Json<CreateTagRequest>,
) -> Result<Json<Tag>, AppError> {
    let tag = db::create_tag(&state.pool, &req).await?;
    Ok(Json(tag))
}

/// `PATCH /tags/{id}`
pub async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTagRequest>,
) -> Result<Json<Tag>, AppError> {
    let tag = db::update_tag(&state.pool, &id, &req)
        .await?
        .ok_or_else(|| AppError::not_found("Tag not found"))?;
    Ok(Json(tag))
}

/// `DELETE /tags/{id}` → `204 No Content`
pub async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let deleted = db::delete_tag(&state.pool, &id).await?;
    if !deleted {
        return Err(AppError::not_found("Tag not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
