//! # 라우트 핸들러 모듈
//!
//! HTTP 요청을 처리하는 핸들러 함수들을 모아둔 모듈입니다.
//! Axum에서 핸들러는 HTTP 요청을 받아 응답을 반환하는 async 함수입니다.
//!
//! 각 하위 모듈:
//! - `health`: 서버 상태 확인 (헬스체크)
//! - `sources`: 읽을거리 CRUD와 읽기 진행 상태
//! - `highlights`: 하이라이트 CRUD, 검색, 복습 카드 상세/활성화
//! - `tags`: 태그 CRUD
//! - `reviews`: 복습 목록, 평가 제출, 통계

pub mod health;
pub mod highlights;
pub mod reviews;
pub mod sources;
pub mod tags;

pub use health::*;
pub use highlights::*;
pub use reviews::*;
pub use sources::*;
pub use tags::*;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use sqlx::SqlitePool;

/// 애플리케이션 공유 상태
///
/// 모든 요청 핸들러가 `State(state): State<AppState>`로 접근합니다.
/// `SqlitePool`은 내부적으로 Arc이므로 clone해도 같은 풀을 가리킵니다.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    /// `limit` 없이 복습 목록을 요청했을 때의 기본 개수
    pub review_batch_size: u32,
}

/// `/api/v1` 아래에 중첩될 API 라우터
///
/// axum 0.8부터 경로 변수는 `{id}` 형식입니다.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        // 읽을거리(Source)
        .route("/sources", get(list_sources).post(create_source))
        .route(
            "/sources/{id}",
            get(get_source).patch(update_source).delete(delete_source),
        )
        .route("/sources/{id}/progress", put(update_reading_progress))
        .route("/sources/{id}/read", put(mark_as_read))
        .route("/sources/{id}/highlights", get(list_source_highlights))
        // 하이라이트(Highlight)
        .route("/highlights", get(search_highlights).post(create_highlight))
        .route(
            "/highlights/{id}",
            get(get_highlight)
                .patch(update_highlight)
                .delete(delete_highlight),
        )
        .route("/highlights/{id}/tags", get(get_highlight_tags))
        .route(
            "/highlights/{id}/review",
            get(get_review_card).patch(set_review_active),
        )
        // 태그(Tag)
        .route("/tags", get(list_tags).post(create_tag))
        .route("/tags/{id}", patch(update_tag).delete(delete_tag))
        // 복습(Review)
        .route("/reviews/due", get(due_reviews))
        .route("/reviews/stats", get(review_stats))
        .route("/reviews/{highlight_id}", post(submit_review))
        // 헬스체크
        .route("/health", get(health_check))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt; // oneshot()

    async fn app() -> Router {
        let pool = test_pool().await;
        api_router(AppState {
            pool,
            review_batch_size: 20,
        })
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = app().await;
        let (status, body) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn highlight_flow_over_http() {
        let app = app().await;

        let (status, source) = call(
            &app,
            Method::POST,
            "/sources",
            Some(json!({ "title": "Thinking, Fast and Slow", "source_type": "book" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let source_id = source["id"].as_str().unwrap().to_string();

        let (status, highlight) = call(
            &app,
            Method::POST,
            "/highlights",
            Some(json!({
                "source_id": source_id,
                "text": "Nothing in life is as important as you think it is.",
                "location": { "type": "page", "page": 402 }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(highlight["location"], json!({ "type": "page", "page": 402 }));
        let highlight_id = highlight["id"].as_str().unwrap().to_string();

        let (status, detail) = call(&app, Method::GET, &format!("/highlights/{highlight_id}/review"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["card"]["repetitions"], 0);
        assert_eq!(detail["history"], json!([]));

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/reviews/{highlight_id}"),
            Some(json!({ "rating": 7 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "validation_error");
        assert_eq!(body["error"]["field"], "rating");

        let (status, outcome) = call(
            &app,
            Method::POST,
            &format!("/reviews/{highlight_id}"),
            Some(json!({ "rating": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["repetitions"], 1);
        assert_eq!(outcome["interval_days"], 1);

        let (status, found) = call(&app, Method::GET, "/highlights?q=important", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found["highlights"].as_array().unwrap().len(), 1);

        let (status, stats) = call(&app, Method::GET, "/reviews/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["reviewed_today"], 1);
        assert_eq!(stats["current_streak"], 1);
    }

    #[tokio::test]
    async fn errors_use_json_envelope() {
        let app = app().await;

        let (status, body) = call(&app, Method::POST, "/reviews/missing", Some(json!({ "rating": 3 }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
        assert_eq!(body["error"]["message"], "Highlight not found");

        let (status, body) = call(
            &app,
            Method::POST,
            "/highlights",
            Some(json!({ "source_id": "nope", "text": "orphan" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "source_id");

        let (status, _) = call(&app, Method::DELETE, "/tags/unknown", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reading_progress_is_validated() {
        let app = app().await;
        let (_, source) = call(&app, Method::POST, "/sources", Some(json!({ "title": "Essay" }))).await;
        let id = source["id"].as_str().unwrap();

        let (status, body) = call(
            &app,
            Method::PUT,
            &format!("/sources/{id}/progress"),
            Some(json!({ "position": 120.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "position");

        let (status, updated) = call(
            &app,
            Method::PUT,
            &format!("/sources/{id}/progress"),
            Some(json!({ "position": 35.5 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["reading_position"], 35.5);
        assert!(updated["last_read_at"].is_string());

        let (status, _) = call(&app, Method::GET, "/sources/unknown/highlights", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
