//! # 하이라이트 모델 정의
//!
//! 읽을거리에서 발췌한 구절(하이라이트)과 그 위치, 색상, 태그를 표현합니다.
//!
//! 위치(`HighlightLocation`)는 닫힌 태그 열거형입니다.
//! DB에는 JSON 문자열로 저장되지만, 코드에서는 항상 세 가지 경우 중 하나로만 다룹니다.
//! 복습 스케줄러는 위치를 전혀 해석하지 않습니다.

use crate::error::AppError;
use crate::models::source::double_option;
use crate::models::{SourceType, Tag};
use serde::{Deserialize, Serialize};

/// 하이라이트 색상 (기본값: 노랑)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum HighlightColor {
    #[default]
    Yellow,
    Green,
    Blue,
    Pink,
    Purple,
}

/// 하이라이트 위치
///
/// JSON 표현 (`type` 필드로 구분):
/// - `{ "type": "page", "page": 12 }`
/// - `{ "type": "offset", "start": 100, "end": 180 }`
/// - `{ "type": "percentage", "percent": 42.5 }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HighlightLocation {
    Page { page: u32 },
    Offset { start: u64, end: u64 },
    Percentage { percent: f64 },
}

impl HighlightLocation {
    /// 위치 값의 범위를 검사합니다.
    pub fn validate(&self) -> Result<(), AppError> {
        match *self {
            HighlightLocation::Page { page } if page == 0 => {
                Err(AppError::validation("location", "page numbers start at 1"))
            }
            HighlightLocation::Offset { start, end } if start > end => Err(
                AppError::validation("location", "offset start must not exceed end"),
            ),
            HighlightLocation::Percentage { percent } if !(0.0..=100.0).contains(&percent) => {
                Err(AppError::validation(
                    "location",
                    "percentage must be between 0 and 100",
                ))
            }
            _ => Ok(()),
        }
    }
}

/// DB의 `highlights` 테이블 한 행
///
/// `location`은 JSON 문자열 그대로이므로, 응답에는 `Highlight`로 변환해서 사용합니다.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HighlightRow {
    pub id: String,
    pub source_id: String,
    pub text: String,
    pub note: Option<String>,
    pub location: Option<String>,
    pub color: HighlightColor,
    pub is_favorite: bool,
    pub is_archived: bool,
    pub highlighted_at: String,
    pub created_at: String,
    pub updated_at: String,
}

impl HighlightRow {
    /// 태그 목록을 붙여 API 응답용 `Highlight`로 변환합니다.
    ///
    /// 저장된 위치 JSON을 해석할 수 없으면 위치 없이 반환하고 경고를 남깁니다.
    pub fn into_highlight(self, tags: Vec<Tag>) -> Highlight {
        let location = self.location.as_deref().and_then(|raw| {
            serde_json::from_str::<HighlightLocation>(raw)
                .map_err(|e| {
                    tracing::warn!(highlight_id = %self.id, "Unreadable highlight location: {}", e);
                })
                .ok()
        });

        Highlight {
            id: self.id,
            source_id: self.source_id,
            text: self.text,
            note: self.note,
            location,
            color: self.color,
            is_favorite: self.is_favorite,
            is_archived: self.is_archived,
            tags,
            highlighted_at: self.highlighted_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// 하이라이트 엔티티 (API 응답용)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Highlight {
    pub id: String,
    pub source_id: String,
    pub text: String,
    pub note: Option<String>,
    pub location: Option<HighlightLocation>,
    pub color: HighlightColor,
    pub is_favorite: bool,
    pub is_archived: bool,
    pub tags: Vec<Tag>,
    pub highlighted_at: String,
    pub created_at: String,
    pub updated_at: String,
}

/// 하이라이트 생성 요청 — `POST /api/v1/highlights`
#[derive(Debug, Deserialize)]
pub struct CreateHighlightRequest {
    pub source_id: String,
    pub text: String,
    pub note: Option<String>,
    pub location: Option<HighlightLocation>,
    pub color: Option<HighlightColor>,
    /// 연결할 태그 ID 목록
    #[serde(default)]
    pub tag_ids: Vec<String>,
    /// 가져오기(import) 시 원래 하이라이트한 시각. 없으면 현재 시각
    pub highlighted_at: Option<String>,
}

/// 하이라이트 수정 요청 — `PATCH /api/v1/highlights/{id}`
///
/// `tag_ids`를 보내면 기존 태그 집합 전체를 교체합니다 (병합하지 않음).
#[derive(Debug, Default, Deserialize)]
pub struct UpdateHighlightRequest {
    pub text: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub note: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<HighlightLocation>>,
    pub color: Option<HighlightColor>,
    pub is_favorite: Option<bool>,
    pub is_archived: Option<bool>,
    pub tag_ids: Option<Vec<String>>,
}

/// 하이라이트 검색 조건 — `GET /api/v1/highlights?...`
///
/// 모든 조건은 AND로 결합됩니다.
/// 여러 값을 받는 필드(`source_ids`, `tag_ids`, `tags`)는 쉼표로 구분합니다.
/// 예: `?q=memory&tag_ids=a,b&from=2026-01-01&limit=20`
#[derive(Debug, Default, Deserialize)]
pub struct HighlightFilters {
    /// 본문/메모 전문검색어
    pub q: Option<String>,
    pub source_id: Option<String>,
    pub source_ids: Option<String>,
    pub source_type: Option<SourceType>,
    pub has_notes: Option<bool>,
    /// 하이라이트 날짜 범위 (양 끝 포함, "YYYY-MM-DD")
    pub from: Option<chrono::NaiveDate>,
    pub to: Option<chrono::NaiveDate>,
    pub tag_ids: Option<String>,
    /// 태그 이름 목록
    pub tags: Option<String>,
    pub is_favorite: Option<bool>,
    /// true면 보관(archived)된 하이라이트도 포함
    pub include_archived: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// 페이지 조건 — `GET /api/v1/sources/{id}/highlights?limit=&offset=`
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// "a, b,,c" → ["a", "b", "c"]
pub fn split_csv(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
