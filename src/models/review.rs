//! # 복습 카드 모델 정의
//!
//! 하이라이트 하나당 하나씩 존재하는 복습 스케줄 레코드와,
//! 평가를 제출할 때마다 추가되는 복습 기록(event)을 표현합니다.
//!
//! ## 카드 상태 흐름
//! ```text
//! New (repetitions=0, interval=0)
//!   └─ 성공(3~5) → Learning (interval 1 → 6)
//!                    └─ 성공 → Graduated (interval = 이전 간격 × EF)
//! 어느 단계에서든 실패(0~2) → repetitions=0, interval=1
//! ```
//! 카드 상태는 스케줄러(`services::scheduler`)만 해석합니다.

use crate::models::{Highlight, SourceType};
use serde::{Deserialize, Serialize};

/// 복습 카드 — DB의 `review_cards` 테이블 한 행
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReviewCard {
    pub highlight_id: String,
    /// 기억 난이도 계수. 초기값 2.5, 하한 1.3
    pub easiness_factor: f64,
    /// 다음 복습까지의 일 수
    pub interval_days: i64,
    /// 마지막 실패 이후 연속 성공 횟수
    pub repetitions: i64,
    /// 다음 복습 날짜 ("YYYY-MM-DD")
    pub next_review_date: String,
    pub is_active: bool,
    /// 스케줄러가 카드를 갱신할 때마다 1씩 증가. 동시 제출 감지에 사용
    pub revision: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// 복습 기록 — `review_events` 테이블 한 행 (추가만 하고 수정하지 않음)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReviewEvent {
    pub id: String,
    pub highlight_id: String,
    pub rating: i64,
    pub previous_easiness: f64,
    pub previous_interval: i64,
    pub previous_repetitions: i64,
    pub easiness_factor: f64,
    pub interval_days: i64,
    pub repetitions: i64,
    pub next_review_date: String,
    /// 복습한 날짜 (서버 현지 날짜, 연속 기록 계산에 사용)
    pub reviewed_on: String,
    pub created_at: String,
}

/// 평가 제출 요청 — `POST /api/v1/reviews/{highlight_id}`
///
/// 범위를 벗어난 값도 일단 받아서 검증 에러(400)로 돌려주기 위해 i64로 받습니다.
#[derive(Debug, Deserialize)]
pub struct SubmitReviewRequest {
    pub rating: i64,
}

/// 평가 제출 결과
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewOutcome {
    pub highlight_id: String,
    pub rating: u8,
    pub easiness_factor: f64,
    pub interval_days: i64,
    pub repetitions: i64,
    pub next_review_date: String,
}

/// 오늘 복습할 항목 하나
#[derive(Debug, Clone, Serialize)]
pub struct DueReview {
    pub highlight: Highlight,
    pub source_title: String,
    pub source_type: SourceType,
    pub card: ReviewCard,
}

/// 복습 목록 조회 조건 — `GET /api/v1/reviews/due?limit=20`
#[derive(Debug, Default, Deserialize)]
pub struct DueReviewsQuery {
    pub limit: Option<u32>,
}

/// 카드 상세 (카드 + 복습 기록, 최신순)
#[derive(Debug, Clone, Serialize)]
pub struct ReviewCardDetail {
    pub card: ReviewCard,
    pub history: Vec<ReviewEvent>,
}

/// 카드 활성/비활성 전환 요청 — `PATCH /api/v1/highlights/{id}/review`
#[derive(Debug, Deserialize)]
pub struct SetReviewActiveRequest {
    pub is_active: bool,
}

/// 복습 통계 — `GET /api/v1/reviews/stats`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReviewStats {
    pub due_today: i64,
    pub due_this_week: i64,
    pub reviewed_today: i64,
    pub reviewed_this_week: i64,
    pub reviewed_this_month: i64,
    pub total_highlights_with_reviews: i64,
    pub average_easiness_factor: f64,
    pub current_streak: u32,
}
