//! # 하이라이트 데이터베이스 쿼리 모듈
//!
//! `highlights` 테이블에 대한 생성/조회/수정/삭제 쿼리입니다.
//!
//! ## 하이라이트 생성은 하나의 트랜잭션
//! ```text
//! BEGIN
//!   1. 원본 읽을거리 존재 확인
//!   2. highlights INSERT
//!   3. highlight_tags INSERT
//!   4. sources.last_highlighted_at 갱신
//!   5. review_cards INSERT (기본 상태: EF 2.5, 간격 0, 반복 0, 내일 복습)
//! COMMIT
//! ```
//! 중간에 하나라도 실패하면 트랜잭션이 롤백되어 하이라이트도 남지 않습니다.
//! 따라서 복습 카드가 없는 하이라이트는 정상 경로로는 생길 수 없습니다.

use crate::db::{self, NOW_SQL};
use crate::error::AppError;
use crate::models::*;
use crate::services::clean_optional;
use crate::services::scheduler::first_review_date;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

pub(crate) const HIGHLIGHT_COLUMNS: &str = "h.id, h.source_id, h.text, h.note, h.location, h.color, \
     h.is_favorite, h.is_archived, h.highlighted_at, h.created_at, h.updated_at";

/// ID로 하이라이트 한 행을 조회합니다 (태그 제외).
pub async fn get_highlight_row(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<HighlightRow>, AppError> {
    let row = sqlx::query_as::<_, HighlightRow>(&format!(
        "SELECT {HIGHLIGHT_COLUMNS} FROM highlights h WHERE h.id = ?"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// 하이라이트가 존재하는지 확인합니다.
pub async fn highlight_exists(conn: &mut SqliteConnection, id: &str) -> Result<bool, AppError> {
    let found: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM highlights WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(found.is_some())
}

async fn load_highlight(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<Highlight>, AppError> {
    let Some(row) = get_highlight_row(&mut *conn, id).await? else {
        return Ok(None);
    };
    let tags = db::get_highlight_tags(&mut *conn, id).await?;
    Ok(Some(row.into_highlight(tags)))
}

/// ID로 하이라이트를 태그와 함께 조회합니다.
pub async fn get_highlight(pool: &SqlitePool, id: &str) -> Result<Option<Highlight>, AppError> {
    let mut conn = pool.acquire().await?;
    load_highlight(&mut conn, id).await
}

/// 새 하이라이트를 만들고, 같은 트랜잭션에서 기본 복습 카드를 만듭니다.
///
/// # 매개변수
/// - `today`: 생성 날짜. 첫 복습일은 그 다음 날입니다.
///
/// # 에러 (모두 `Validation`, 아무것도 저장되지 않음)
/// - 본문이 공백뿐인 경우 (`text`)
/// - 읽을거리가 존재하지 않는 경우 (`source_id`)
/// - 위치 값이 범위를 벗어난 경우 (`location`)
/// - 존재하지 않는 태그 ID (`tag_ids`)
/// - `highlighted_at`이 RFC 3339 시각이 아닌 경우
pub async fn create_highlight(
    pool: &SqlitePool,
    req: &CreateHighlightRequest,
    today: NaiveDate,
) -> Result<Highlight, AppError> {
    let text = validate_text(&req.text)?;
    if let Some(location) = &req.location {
        location.validate()?;
    }
    let location = req.location.as_ref().map(serde_json::to_string).transpose().map_err(|e| {
        AppError::Internal(format!("Failed to encode highlight location: {}", e))
    })?;
    let highlighted_at = req
        .highlighted_at
        .as_deref()
        .map(normalize_timestamp)
        .transpose()?;

    let id = uuid::Uuid::now_v7().to_string();

    // pool.begin(): 트랜잭션 시작. commit() 전에 함수가 에러로 빠져나가면
    // tx가 drop되면서 자동으로 롤백됩니다.
    let mut tx = pool.begin().await?;

    let source: Option<(String,)> = sqlx::query_as("SELECT id FROM sources WHERE id = ?")
        .bind(&req.source_id)
        .fetch_optional(&mut *tx)
        .await?;
    if source.is_none() {
        return Err(AppError::validation(
            "source_id",
            format!("source {} does not exist", req.source_id),
        ));
    }

    let mut insert = QueryBuilder::<Sqlite>::new(
        "INSERT INTO highlights (id, source_id, text, note, location, color, highlighted_at) VALUES (",
    );
    insert
        .push_bind(&id)
        .push(", ")
        .push_bind(&req.source_id)
        .push(", ")
        .push_bind(text)
        .push(", ")
        .push_bind(clean_optional(req.note.as_deref()))
        .push(", ")
        .push_bind(location)
        .push(", ")
        .push_bind(req.color.unwrap_or_default())
        .push(", ");
    match highlighted_at {
        Some(at) => insert.push_bind(at),
        None => insert.push(NOW_SQL),
    };
    insert.push(")");
    insert.build().execute(&mut *tx).await?;

    db::replace_highlight_tags(&mut tx, &id, &req.tag_ids).await?;

    sqlx::query(
        r#"
        UPDATE sources
        SET last_highlighted_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(&req.source_id)
    .execute(&mut *tx)
    .await?;

    db::create_review_card(&mut tx, &id, first_review_date(today)).await?;

    let highlight = load_highlight(&mut tx, &id)
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created highlight".to_string()))?;

    tx.commit().await?;

    tracing::info!(highlight_id = %id, source_id = %req.source_id, "Highlight created");
    Ok(highlight)
}

/// 하이라이트를 부분 수정합니다 (PATCH).
///
/// - 요청에 있는 필드만 변경합니다.
/// - `note`, `location`은 `null`을 보내면 지워집니다.
/// - `tag_ids`를 보내면 태그 집합 전체를 교체합니다.
///
/// 모든 변경은 하나의 트랜잭션에서 적용됩니다.
pub async fn update_highlight(
    pool: &SqlitePool,
    id: &str,
    req: &UpdateHighlightRequest,
) -> Result<Option<Highlight>, AppError> {
    let mut tx = pool.begin().await?;

    if !highlight_exists(&mut tx, id).await? {
        return Ok(None);
    }

    let mut query = QueryBuilder::<Sqlite>::new("UPDATE highlights SET updated_at = ");
    query.push(NOW_SQL);

    if let Some(text) = &req.text {
        query.push(", text = ").push_bind(validate_text(text)?);
    }
    if let Some(note) = &req.note {
        query
            .push(", note = ")
            .push_bind(clean_optional(note.as_deref()));
    }
    if let Some(location) = &req.location {
        let encoded = match location {
            Some(location) => {
                location.validate()?;
                Some(serde_json::to_string(location).map_err(|e| {
                    AppError::Internal(format!("Failed to encode highlight location: {}", e))
                })?)
            }
            None => None,
        };
        query.push(", location = ").push_bind(encoded);
    }
    if let Some(color) = req.color {
        query.push(", color = ").push_bind(color);
    }
    if let Some(is_favorite) = req.is_favorite {
        query.push(", is_favorite = ").push_bind(is_favorite);
    }
    if let Some(is_archived) = req.is_archived {
        query.push(", is_archived = ").push_bind(is_archived);
    }
    query.push(" WHERE id = ").push_bind(id);
    query.build().execute(&mut *tx).await?;

    if let Some(tag_ids) = &req.tag_ids {
        db::replace_highlight_tags(&mut tx, id, tag_ids).await?;
    }

    let highlight = load_highlight(&mut tx, id).await?;
    tx.commit().await?;

    Ok(highlight)
}

/// 하이라이트를 삭제합니다.
///
/// 태그 연결(`highlight_tags`)과 복습 카드(`review_cards`)는 `ON DELETE CASCADE`로 함께 삭제됩니다.
/// 복습 기록(`review_events`)은 통계를 위해 남습니다.
pub async fn delete_highlight(pool: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM highlights WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// 본문 앞뒤 공백을 제거하고 비어 있지 않은지 확인합니다.
fn validate_text(text: &str) -> Result<String, AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("text", "highlight text must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// RFC 3339 시각을 DB 저장 형식("2026-03-01T09:30:00.000Z")으로 바꿉니다.
fn normalize_timestamp(raw: &str) -> Result<String, AppError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|at| {
            at.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Millis, true)
        })
        .map_err(|_| AppError::validation("highlighted_at", "must be an RFC 3339 timestamp"))
}
