//! # 복습 카드 데이터베이스 쿼리 모듈
//!
//! `review_cards`(하이라이트당 하나)와 `review_events`(평가 기록) 테이블을 다룹니다.
//!
//! 카드 쓰기는 모두 트랜잭션 안에서 호출되도록 `&mut SqliteConnection`을 받습니다.
//! 트랜잭션(`Transaction`)이나 풀에서 빌린 연결(`PoolConnection`) 모두
//! `&mut *tx` / `&mut conn` 형태로 넘길 수 있습니다.
//!
//! ## 낙관적 동시성 제어 (revision)
//! ```sql
//! UPDATE review_cards SET ..., revision = revision + 1
//! WHERE highlight_id = ? AND revision = ?   -- 읽었을 때의 revision
//! ```
//! 그 사이 다른 요청이 카드를 바꿨다면 영향받은 행이 0개가 되고,
//! 호출한 쪽은 재시도 가능한 에러로 처리합니다.

use crate::db::NOW_SQL;
use crate::error::AppError;
use crate::models::*;
use crate::services::scheduler::{CardState, Rating, Scheduled};
use chrono::NaiveDate;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;

const CARD_COLUMNS: &str = "highlight_id, easiness_factor, interval_days, repetitions, \
     next_review_date, is_active, revision, created_at, updated_at";

const EVENT_COLUMNS: &str = "id, highlight_id, rating, previous_easiness, previous_interval, \
     previous_repetitions, easiness_factor, interval_days, repetitions, next_review_date, \
     reviewed_on, created_at";

/// DB에 저장하는 날짜 형식 ("YYYY-MM-DD")
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// 새 하이라이트의 기본 카드를 만듭니다 (EF 2.5, 간격 0, 반복 0).
///
/// 하이라이트 INSERT와 같은 트랜잭션에서 호출됩니다.
pub async fn create_review_card(
    conn: &mut SqliteConnection,
    highlight_id: &str,
    next_review_date: NaiveDate,
) -> Result<(), AppError> {
    let initial = CardState::default();

    sqlx::query(
        r#"
        INSERT INTO review_cards (highlight_id, easiness_factor, interval_days, repetitions, next_review_date)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(highlight_id)
    .bind(initial.easiness_factor)
    .bind(initial.interval_days)
    .bind(initial.repetitions)
    .bind(date_key(next_review_date))
    .execute(conn)
    .await?;

    Ok(())
}

/// 하이라이트 ID로 복습 카드를 조회합니다 (비활성 카드 포함).
pub async fn get_review_card(
    conn: &mut SqliteConnection,
    highlight_id: &str,
) -> Result<Option<ReviewCard>, AppError> {
    let card = sqlx::query_as::<_, ReviewCard>(&format!(
        "SELECT {CARD_COLUMNS} FROM review_cards WHERE highlight_id = ?"
    ))
    .bind(highlight_id)
    .fetch_optional(conn)
    .await?;

    Ok(card)
}

/// `today`까지 복습 날짜가 된 활성 카드 목록
///
/// 정렬: 복습 예정일 → 카드 생성 시각 → 하이라이트 ID.
/// 같은 상태에서 여러 번 호출해도 항상 같은 순서가 나옵니다.
pub async fn list_due_cards(
    conn: &mut SqliteConnection,
    today: NaiveDate,
    limit: i64,
) -> Result<Vec<ReviewCard>, AppError> {
    let cards = sqlx::query_as::<_, ReviewCard>(&format!(
        r#"
        SELECT {CARD_COLUMNS}
        FROM review_cards
        WHERE is_active = 1 AND next_review_date <= ?
        ORDER BY next_review_date ASC, created_at ASC, highlight_id ASC
        LIMIT ?
        "#
    ))
    .bind(date_key(today))
    .bind(limit)
    .fetch_all(conn)
    .await?;

    Ok(cards)
}

/// 복습 화면에 필요한 하이라이트 + 읽을거리 정보 한 행
#[derive(Debug, sqlx::FromRow)]
pub struct DueHighlightRow {
    #[sqlx(flatten)]
    pub highlight: HighlightRow,
    pub source_title: String,
    pub source_type: SourceType,
}

/// 여러 하이라이트를 읽을거리 제목/종류와 함께 한 번에 조회합니다.
pub async fn due_highlight_rows(
    conn: &mut SqliteConnection,
    highlight_ids: &[String],
) -> Result<HashMap<String, DueHighlightRow>, AppError> {
    if highlight_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {}, s.title AS source_title, s.source_type AS source_type \
         FROM highlights h JOIN sources s ON s.id = h.source_id WHERE h.id IN (",
        crate::db::highlights::HIGHLIGHT_COLUMNS
    ));
    let mut ids = query.separated(", ");
    for id in highlight_ids {
        ids.push_bind(id.as_str());
    }
    ids.push_unseparated(")");

    let rows: Vec<DueHighlightRow> = query.build_query_as().fetch_all(conn).await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.highlight.id.clone(), row))
        .collect())
}

/// 스케줄러가 계산한 새 상태를 저장합니다.
///
/// `expected_revision`이 현재 값과 다르면(동시 제출) 아무것도 바꾸지 않고 `false`를 반환합니다.
pub async fn update_card_state(
    conn: &mut SqliteConnection,
    highlight_id: &str,
    expected_revision: i64,
    scheduled: &Scheduled,
) -> Result<bool, AppError> {
    let result = sqlx::query(&format!(
        r#"
        UPDATE review_cards
        SET easiness_factor = ?, interval_days = ?, repetitions = ?, next_review_date = ?,
            revision = revision + 1, updated_at = {NOW_SQL}
        WHERE highlight_id = ? AND revision = ? AND is_active = 1
        "#
    ))
    .bind(scheduled.state.easiness_factor)
    .bind(scheduled.state.interval_days)
    .bind(scheduled.state.repetitions)
    .bind(date_key(scheduled.next_review_date))
    .bind(highlight_id)
    .bind(expected_revision)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// 평가 한 번을 기록합니다 (추가 전용).
pub async fn insert_review_event(
    conn: &mut SqliteConnection,
    highlight_id: &str,
    rating: Rating,
    previous: &CardState,
    scheduled: &Scheduled,
    reviewed_on: NaiveDate,
) -> Result<(), AppError> {
    let id = uuid::Uuid::now_v7().to_string();

    sqlx::query(
        r#"
        INSERT INTO review_events (
            id, highlight_id, rating,
            previous_easiness, previous_interval, previous_repetitions,
            easiness_factor, interval_days, repetitions, next_review_date, reviewed_on
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(highlight_id)
    .bind(i64::from(rating.value()))
    .bind(previous.easiness_factor)
    .bind(previous.interval_days)
    .bind(previous.repetitions)
    .bind(scheduled.state.easiness_factor)
    .bind(scheduled.state.interval_days)
    .bind(scheduled.state.repetitions)
    .bind(date_key(scheduled.next_review_date))
    .bind(date_key(reviewed_on))
    .execute(conn)
    .await?;

    Ok(())
}

/// 하이라이트의 복습 기록 (최신순)
pub async fn list_review_events(
    conn: &mut SqliteConnection,
    highlight_id: &str,
) -> Result<Vec<ReviewEvent>, AppError> {
    // 같은 밀리초 안의 기록은 삽입 순서(rowid)로 정렬합니다.
    let events = sqlx::query_as::<_, ReviewEvent>(&format!(
        "SELECT {EVENT_COLUMNS} FROM review_events WHERE highlight_id = ? \
         ORDER BY created_at DESC, rowid DESC"
    ))
    .bind(highlight_id)
    .fetch_all(conn)
    .await?;

    Ok(events)
}

/// 카드를 수동으로 활성/비활성화합니다. 스케줄 값은 건드리지 않습니다.
pub async fn set_card_active(
    conn: &mut SqliteConnection,
    highlight_id: &str,
    is_active: bool,
) -> Result<bool, AppError> {
    let result = sqlx::query(&format!(
        "UPDATE review_cards SET is_active = ?, updated_at = {NOW_SQL} WHERE highlight_id = ?"
    ))
    .bind(is_active)
    .bind(highlight_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// 상태가 깨진 카드를 동결(비활성화)합니다.
pub async fn freeze_card(conn: &mut SqliteConnection, highlight_id: &str) -> Result<(), AppError> {
    set_card_active(conn, highlight_id, false).await?;
    tracing::error!(highlight_id = %highlight_id, "Review card frozen after consistency failure");
    Ok(())
}

// ── 통계 쿼리 ──

/// `date`까지 복습 날짜가 된 활성 카드 수
pub async fn count_due_until(conn: &mut SqliteConnection, date: NaiveDate) -> Result<i64, AppError> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM review_cards WHERE is_active = 1 AND next_review_date <= ?",
    )
    .bind(date_key(date))
    .fetch_one(conn)
    .await?;

    Ok(count)
}

/// `from`~`to`(양 끝 포함) 사이의 평가 횟수
pub async fn count_reviews_between(
    conn: &mut SqliteConnection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<i64, AppError> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM review_events WHERE reviewed_on BETWEEN ? AND ?")
            .bind(date_key(from))
            .bind(date_key(to))
            .fetch_one(conn)
            .await?;

    Ok(count)
}

/// 활성 카드 수와 평균 easiness factor (카드가 없으면 0.0)
pub async fn active_card_summary(conn: &mut SqliteConnection) -> Result<(i64, f64), AppError> {
    let summary: (i64, f64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(AVG(easiness_factor), 0.0) FROM review_cards WHERE is_active = 1",
    )
    .fetch_one(conn)
    .await?;

    Ok(summary)
}

/// `until` 이전(포함)에 복습한 날짜들, 최신순 중복 제거
pub async fn review_days(
    conn: &mut SqliteConnection,
    until: NaiveDate,
) -> Result<Vec<NaiveDate>, AppError> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT reviewed_on FROM review_events WHERE reviewed_on <= ? ORDER BY reviewed_on DESC",
    )
    .bind(date_key(until))
    .fetch_all(conn)
    .await?;

    rows.into_iter()
        .map(|(raw,)| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| {
                AppError::Internal(format!("Unreadable review date {:?}: {}", raw, e))
            })
        })
        .collect()
}
