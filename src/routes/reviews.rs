//! # 복습(Review) 라우트 핸들러
//!
//! ## 엔드포인트
//! - `GET  /api/v1/reviews/due?limit=20`     → 오늘 복습할 하이라이트
//! - `POST /api/v1/reviews/{highlight_id}`   → 평가 제출 `{ "rating": 0..5 }`
//! - `GET  /api/v1/reviews/stats`            → 복습 통계
//!
//! "오늘"은 서버 현지 날짜입니다.

use crate::{
    error::AppError,
    models::*,
    routes::AppState,
    services::{self, review_queue},
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};

/// `GET /reviews/due` → `{ "reviews": [...] }`
///
/// `limit`이 없으면 설정값(`REVIEW_BATCH_SIZE`)을 사용합니다.
pub async fn due_reviews(
    State(state): State<AppState>,
    Query(query): Query<DueReviewsQuery>,
) -> Result<Json<Value>, AppError> {
    let limit = query.limit.unwrap_or(state.review_batch_size);
    let reviews = review_queue::get_due_reviews(&state.pool, services::today(), limit).await?;
    Ok(Json(json!({ "reviews": reviews })))
}

/// `POST /reviews/{highlight_id}` → 새 스케줄
///
/// 503 응답(`retryable: true`)은 같은 요청을 그대로 다시 보내도 안전합니다.
pub async fn submit_review(
    State(state): State<AppState>,
    Path(highlight_id): Path<String>,
    Json(req): Json<SubmitReviewRequest>,
) -> Result<Json<ReviewOutcome>, AppError> {
    let outcome =
        review_queue::submit_review(&state.pool, &highlight_id, req.rating, services::today())
            .await?;
    Ok(Json(outcome))
}

/// `GET /reviews/stats`
pub async fn review_stats(State(state): State<AppState>) -> Result<Json<ReviewStats>, AppError> {
    let stats = review_queue::get_review_stats(&state.pool, services::today()).await?;
    Ok(Json(stats))
}
