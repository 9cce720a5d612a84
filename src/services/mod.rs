//! # 서비스 계층
//!
//! DB 쿼리(`db/`)와 HTTP 핸들러(`routes/`) 사이의 도메인 로직입니다.
//!
//! - `scheduler`: SM-2 복습 스케줄 계산 (순수 함수)
//! - `review_queue`: 복습 목록 조회, 평가 제출, 통계
//! - `text`: 본문 단어 수, 읽기 시간, URL 도메인 계산

pub mod review_queue;
pub mod scheduler;
pub mod text;

pub use text::*;

use chrono::NaiveDate;

/// 서버 현지 기준 오늘 날짜
///
/// "오늘 복습할 카드"와 연속 복습 일수는 모두 이 날짜를 기준으로 계산합니다.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
