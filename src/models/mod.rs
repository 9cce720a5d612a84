//! # 데이터 모델 모듈
//!
//! 애플리케이션에서 사용하는 데이터 구조체(struct)들을 정의합니다.
//! 각 하위 모듈은 특정 도메인의 데이터 타입을 담당합니다:
//! - `source`: 읽을거리(Source)와 읽기 진행 상태 관련 구조체
//! - `highlight`: 하이라이트와 위치, 검색 조건
//! - `review`: 복습 카드, 복습 기록, 통계
//! - `tag`: 태그 관련 구조체
//!
//! `pub use X::*;`는 하위 모듈의 모든 공개 항목을
//! 이 모듈에서 바로 접근할 수 있게 재공개(re-export)합니다.
//! 예: `crate::models::highlight::Highlight` 대신 `crate::models::Highlight`로 접근 가능

pub mod highlight;
pub mod review;
pub mod source;
pub mod tag;

pub use highlight::*;
pub use review::*;
pub use source::*;
pub use tag::*;
