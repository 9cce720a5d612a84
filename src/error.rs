//! # 에러 처리 모듈
//!
//! 애플리케이션에서 발생할 수 있는 모든 에러 타입을 정의합니다.
//! Rust에서는 예외(exception) 대신 `Result<T, E>` 타입으로 에러를 처리합니다.
//!
//! 이 모듈의 핵심:
//! - `AppError` 열거형(enum): 모든 에러 종류를 하나의 타입으로 통합
//! - `IntoResponse` 구현: 에러를 HTTP 응답으로 자동 변환
//!
//! ## 에러 분류
//! | variant | HTTP | 재시도 |
//! |---------|------|--------|
//! | `Validation` | 400 | 하지 않음 (요청 자체가 잘못됨) |
//! | `NotFound` / `ReviewCardMissing` | 404 | 하지 않음 |
//! | `Conflict` | 409 | 하지 않음 |
//! | `Transient` (+ 일시적인 DB 에러) | 503 | 같은 요청을 그대로 다시 보내도 안전 |
//! | `Consistency` | 500 | 하지 않음 — 카드를 동결하고 수동 점검 |

use axum::{
    http::StatusCode,                   // HTTP 상태 코드 (200, 404, 500 등)
    response::{IntoResponse, Response}, // Axum의 응답 변환 트레이트
    Json,                               // JSON 응답 래퍼
};
use serde_json::json; // json! 매크로: JSON 객체를 간편하게 생성
use thiserror::Error; // thiserror: 커스텀 에러 타입을 쉽게 만들어주는 매크로 크레이트

/// 애플리케이션에서 발생할 수 있는 모든 에러 종류
///
/// 각 에러 variant는 적절한 HTTP 상태 코드와 메시지로 변환됩니다.
/// 핸들러에서 `Result<T, AppError>`를 반환하면,
/// Axum이 자동으로 `IntoResponse`를 호출하여 HTTP 응답으로 변환합니다.
#[derive(Debug, Error)]
pub enum AppError {
    /// 입력값 검증 실패 (HTTP 400)
    ///
    /// 어떤 필드가 잘못되었는지 `field`로 함께 알려줍니다.
    /// 예: 평가 점수가 0~5 범위를 벗어남, 빈 하이라이트 본문, 읽기 위치가 0~100 밖
    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// 요청한 리소스를 찾을 수 없음 (HTTP 404)
    /// 어떤 리소스가 없는지 메시지로 구분합니다 (예: "Highlight not found").
    #[error("{0}")]
    NotFound(String),

    /// 하이라이트는 있는데 복습 카드가 없음 (HTTP 404)
    ///
    /// 카드는 하이라이트와 같은 트랜잭션에서 만들어지므로,
    /// 이 에러가 나왔다면 초기화 버그입니다. 일반 NotFound와 구분해서 기록합니다.
    #[error("Highlight {0} has no review card")]
    ReviewCardMissing(String),

    /// 리소스 충돌 (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 일시적인 저장소 오류 (HTTP 503)
    /// 모든 변경이 단일 트랜잭션이므로 클라이언트가 그대로 재시도해도 안전합니다.
    #[error("Temporarily unavailable: {0}")]
    Transient(String),

    /// 있을 수 없는 카드 상태 (HTTP 500)
    /// 예: 음수 간격, 1.3 미만의 easiness factor. 해당 카드는 비활성화(동결)됩니다.
    #[error("Inconsistent review state: {0}")]
    Consistency(String),

    /// 서버 내부 오류 (HTTP 500)
    #[error("Internal error: {0}")]
    Internal(String),

    /// 데이터베이스 오류 (HTTP 500, 일시적인 경우 503)
    /// #[from]: sqlx::Error를 AppError로 자동 변환하는 From 트레이트를 구현합니다.
    /// 이를 통해 sqlx 함수에서 반환된 에러에 `?` 연산자를 사용하면
    /// 자동으로 AppError::Database로 변환됩니다.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    /// `Validation` 에러를 짧게 만드는 헬퍼
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field,
            message: message.into(),
        }
    }

    /// `NotFound` 에러를 짧게 만드는 헬퍼
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    /// 같은 요청을 다시 보내면 성공할 수 있는 에러인지 판단합니다.
    ///
    /// - 연결 풀 대기 시간 초과, 풀 종료, 소켓 I/O 오류
    /// - SQLite의 SQLITE_BUSY(5) / SQLITE_LOCKED(6): 다른 쓰기 트랜잭션과 충돌
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Transient(_) => true,
            AppError::Database(e) => is_transient_sqlx(e),
            _ => false,
        }
    }
}

fn is_transient_sqlx(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db) => {
            // 확장 코드(예: 517 = SQLITE_BUSY_SNAPSHOT)도 하위 8비트가 기본 코드입니다.
            db.code()
                .and_then(|code| code.parse::<i32>().ok())
                .map(|code| matches!(code & 0xff, 5 | 6))
                .unwrap_or(false)
        }
        _ => false,
    }
}

// impl IntoResponse for AppError:
// 핸들러가 Err(AppError)를 반환하면,
// Axum이 자동으로 이 메서드를 호출하여 적절한 HTTP 응답을 생성합니다.
impl IntoResponse for AppError {
    /// AppError를 HTTP 응답으로 변환합니다.
    ///
    /// 내부 에러(Database, Internal, Consistency)는 실제 에러 내용을 로그에만 기록하고,
    /// 클라이언트에는 일반적인 메시지만 반환합니다.
    fn into_response(self) -> Response {
        if self.is_transient() {
            tracing::warn!("Transient storage error: {}", self);
            let body = Json(json!({
                "error": {
                    "code": "transient_error",
                    "message": "The store is temporarily unavailable, please retry",
                    "retryable": true
                }
            }));
            return (StatusCode::SERVICE_UNAVAILABLE, body).into_response();
        }

        // (status, code, message) 튜플을 반환합니다.
        let (status, code, message) = match self {
            AppError::Validation { field, ref message } => {
                // 어떤 필드가 잘못되었는지 응답에 포함합니다.
                let body = Json(json!({
                    "error": {
                        "code": "validation_error",
                        "field": field,
                        "message": message
                    }
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::ReviewCardMissing(ref highlight_id) => {
                tracing::error!(
                    highlight_id = %highlight_id,
                    "Highlight exists without a review card (initialization bug)"
                );
                (
                    StatusCode::NOT_FOUND,
                    "review_card_missing",
                    self.to_string(),
                )
            }
            AppError::Conflict(ref msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            AppError::Consistency(ref msg) => {
                tracing::error!("Consistency error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "consistency_error",
                    "The review card was frozen pending inspection".to_string(),
                )
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "A database error occurred".to_string(),
                )
            }
            // is_transient()가 true인 경우는 위에서 이미 반환했습니다.
            AppError::Transient(ref msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "transient_error",
                msg.clone(),
            ),
        };

        // 결과: { "error": { "code": "not_found", "message": "Highlight not found" } }
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
