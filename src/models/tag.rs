//! # 태그 모델 정의
//!
//! 태그(Tag) 시스템에서 사용하는 데이터 구조체들을 정의합니다.
//! 태그는 하이라이트를 분류하고 검색하기 위한 라벨입니다.
//!
//! ## 구조체 역할
//! - `Tag`: 데이터베이스에 저장된 태그를 표현 (응답용)
//! - `CreateTagRequest`: 새 태그 생성 시 클라이언트가 보내는 JSON 본문
//! - `UpdateTagRequest`: 태그 수정 시 클라이언트가 보내는 JSON 본문
//!
//! 하이라이트에 태그를 붙이는 것은 하이라이트 생성/수정 요청의 `tag_ids`로 처리합니다.

use serde::{Deserialize, Serialize};

/// 태그 엔티티 — DB의 `tags` 테이블 한 행(row)에 대응합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    /// 태그 고유 식별자 (UUIDv7 형식 문자열)
    pub id: String,
    /// 태그 이름 (예: "철학", "다시 읽기"). 이름은 중복될 수 없습니다.
    pub name: String,
    /// 태그 색상 코드 (예: "#FF5733")
    pub color: Option<String>,
}

/// 태그 생성 요청 — `POST /api/v1/tags`의 요청 본문(body)에 해당합니다.
#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    /// 생성할 태그 이름 (필수)
    pub name: String,
    /// 태그 색상 코드 (선택)
    pub color: Option<String>,
}

/// 태그 수정 요청 — `PATCH /api/v1/tags/{id}`의 요청 본문에 해당합니다.
///
/// 모든 필드가 Option인 이유: PATCH는 부분 업데이트(partial update)를 의미합니다.
#[derive(Debug, Deserialize)]
pub struct UpdateTagRequest {
    /// 변경할 태그 이름 (None이면 변경하지 않음)
    pub name: Option<String>,
    /// 변경할 태그 색상 (None이면 변경하지 않음)
    pub color: Option<String>,
}
