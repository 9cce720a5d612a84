//! # 읽을거리(Source) 모델 정의
//!
//! 하이라이트가 속하는 원본 자료(책, 기사, PDF, 웹 페이지, 팟캐스트, 영상)를 표현합니다.
//!
//! ## 구조체 역할
//! - `Source`: DB의 `sources` 테이블 한 행 + 파생값 `highlight_count`
//! - `CreateSourceRequest` / `UpdateSourceRequest`: 생성/부분 수정 요청 본문
//! - `ReadingProgressRequest` / `MarkReadRequest`: 읽기 진행 상태 변경 요청 본문
//!
//! 읽기 위치(`reading_position`)와 읽음 여부(`is_read`)는 서로 독립적이며,
//! 복습 스케줄과도 관계가 없습니다.

use serde::{Deserialize, Serialize};

/// 읽을거리 종류
///
/// `#[derive(sqlx::Type)]`: SQLite의 TEXT 컬럼과 enum을 자동 변환합니다.
/// `rename_all = "lowercase"`: `SourceType::Pdf` ↔ `"pdf"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SourceType {
    Book,
    Article,
    Pdf,
    Web,
    Podcast,
    Video,
}

/// 읽을거리 엔티티
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Source {
    pub id: String,
    pub source_type: SourceType,
    pub title: String,
    pub author: Option<String>,
    pub url: Option<String>,
    /// URL의 호스트 (예: "example.com"). 생성 시 URL에서 자동으로 추출합니다.
    pub domain: Option<String>,
    pub published_date: Option<String>,
    pub category: Option<String>,
    /// 본문 또는 발췌문
    pub content: Option<String>,
    pub word_count: i64,
    pub reading_time_minutes: i64,
    pub is_read: bool,
    /// 0~100 사이의 읽기 진행률
    pub reading_position: f64,
    pub last_read_at: Option<String>,
    pub last_highlighted_at: Option<String>,
    /// 이 자료에 달린 하이라이트 수 (조회 시 COUNT로 계산)
    pub highlight_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSourceRequest {
    pub source_type: Option<SourceType>,
    pub title: String,
    pub author: Option<String>,
    pub url: Option<String>,
    pub domain: Option<String>,
    pub published_date: Option<String>,
    pub category: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSourceRequest {
    pub source_type: Option<SourceType>,
    pub title: Option<String>,
    /// None = 필드 누락 (변경 안 함), Some(None) = null (값 지우기), Some(Some(v)) = 새 값
    #[serde(default, deserialize_with = "double_option")]
    pub author: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    /// 본문을 바꾸면 단어 수와 예상 읽기 시간도 다시 계산합니다.
    #[serde(default, deserialize_with = "double_option")]
    pub content: Option<Option<String>>,
}

/// 읽기 진행률 변경 요청 — `PUT /api/v1/sources/{id}/progress`
#[derive(Debug, Deserialize)]
pub struct ReadingProgressRequest {
    pub position: f64,
}

/// 읽음 표시 요청 — `PUT /api/v1/sources/{id}/read`
#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    pub is_read: bool,
}

/// 목록 조회 필터 — `GET /api/v1/sources?source_type=book&is_read=false`
#[derive(Debug, Default, Deserialize)]
pub struct SourceFilters {
    pub source_type: Option<SourceType>,
    pub is_read: Option<bool>,
}

/// JSON의 "필드 없음"과 "null"을 구분하기 위한 역직렬화 함수
///
/// `#[serde(default)]`와 함께 쓰면:
/// - 필드가 없으면 → `None`
/// - `null`이면 → `Some(None)`
/// - 값이 있으면 → `Some(Some(값))`
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
