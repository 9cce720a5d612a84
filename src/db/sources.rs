//! # 읽을거리(Source) 데이터베이스 쿼리 모듈
//!
//! `sources` 테이블에 대한 CRUD 쿼리와 읽기 진행 상태(진행률, 읽음 표시) 변경 함수들입니다.
//!
//! 읽기 진행 상태는 하이라이트나 복습 카드와 완전히 독립적입니다.
//! 진행률을 바꿔도 복습 일정은 달라지지 않습니다.

use crate::db::NOW_SQL;
use crate::error::AppError;
use crate::models::*;
use crate::services::{clean_optional, count_words, domain_from_url, reading_time_minutes};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

/// `highlight_count`는 저장하지 않고 조회할 때마다 COUNT로 계산합니다.
const SOURCE_SELECT: &str = r#"
    SELECT s.id, s.source_type, s.title, s.author, s.url, s.domain, s.published_date,
           s.category, s.content, s.word_count, s.reading_time_minutes, s.is_read,
           s.reading_position, s.last_read_at, s.last_highlighted_at,
           (SELECT COUNT(*) FROM highlights h WHERE h.source_id = s.id) AS highlight_count,
           s.created_at, s.updated_at
    FROM sources s
"#;

/// 읽을거리 목록을 최근 수정순으로 조회합니다.
///
/// `filters`의 조건은 AND로 결합됩니다. 조건이 없으면 전체 목록입니다.
pub async fn list_sources(
    pool: &SqlitePool,
    filters: &SourceFilters,
) -> Result<Vec<Source>, AppError> {
    // QueryBuilder: 조건에 따라 SQL을 동적으로 조립하면서도
    // 값은 항상 바인딩(?)으로 전달하여 SQL 인젝션을 방지합니다.
    let mut query = QueryBuilder::<Sqlite>::new(SOURCE_SELECT);
    query.push(" WHERE 1 = 1");

    if let Some(source_type) = filters.source_type {
        query.push(" AND s.source_type = ").push_bind(source_type);
    }
    if let Some(is_read) = filters.is_read {
        query.push(" AND s.is_read = ").push_bind(is_read);
    }
    query.push(" ORDER BY s.updated_at DESC, s.id DESC");

    let sources = query.build_query_as::<Source>().fetch_all(pool).await?;
    Ok(sources)
}

/// ID로 단일 읽을거리를 조회합니다.
///
/// # 반환값
/// - `Ok(Some(Source))`: 찾은 경우
/// - `Ok(None)`: 해당 ID가 없는 경우
pub async fn get_source(pool: &SqlitePool, id: &str) -> Result<Option<Source>, AppError> {
    let source = sqlx::query_as::<_, Source>(&format!("{SOURCE_SELECT} WHERE s.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(source)
}

/// 새 읽을거리를 생성합니다.
///
/// - 제목은 앞뒤 공백을 제거한 뒤 비어 있으면 안 됩니다.
/// - 본문이 있으면 단어 수와 예상 읽기 시간을 계산합니다.
/// - 도메인을 따로 주지 않으면 URL에서 추출합니다.
pub async fn create_source(
    pool: &SqlitePool,
    req: &CreateSourceRequest,
) -> Result<Source, AppError> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::validation("title", "must not be empty"));
    }

    let id = uuid::Uuid::now_v7().to_string();
    let url = clean_optional(req.url.as_deref());
    let domain = clean_optional(req.domain.as_deref())
        .or_else(|| url.as_deref().and_then(domain_from_url));
    let content = clean_optional(req.content.as_deref());
    let word_count = content.as_deref().map(count_words).unwrap_or(0);

    sqlx::query(
        r#"
        INSERT INTO sources (id, source_type, title, author, url, domain, published_date,
                             category, content, word_count, reading_time_minutes)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(req.source_type.unwrap_or(SourceType::Book))
    .bind(title)
    .bind(clean_optional(req.author.as_deref()))
    .bind(&url)
    .bind(&domain)
    .bind(clean_optional(req.published_date.as_deref()))
    .bind(clean_optional(req.category.as_deref()))
    .bind(&content)
    .bind(word_count as i64)
    .bind(reading_time_minutes(word_count) as i64)
    .execute(pool)
    .await?;

    tracing::debug!(source_id = %id, "Source created");

    get_source(pool, &id)
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created source".to_string()))
}

/// 읽을거리 정보를 부분 수정합니다 (PATCH).
///
/// 요청에 포함된 필드만 바뀝니다. `author`/`url`/`category`/`content`는 `null`로 지울 수 있습니다.
/// URL을 바꾸면 도메인도, 본문을 바꾸면 단어 수와 읽기 시간도 함께 다시 계산합니다.
pub async fn update_source(
    pool: &SqlitePool,
    id: &str,
    req: &UpdateSourceRequest,
) -> Result<Option<Source>, AppError> {
    if get_source(pool, id).await?.is_none() {
        return Ok(None);
    }

    let mut query = QueryBuilder::<Sqlite>::new("UPDATE sources SET updated_at = ");
    query.push(NOW_SQL);

    if let Some(source_type) = req.source_type {
        query.push(", source_type = ").push_bind(source_type);
    }
    if let Some(title) = &req.title {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::validation("title", "must not be empty"));
        }
        query.push(", title = ").push_bind(title.to_string());
    }
    if let Some(author) = &req.author {
        query
            .push(", author = ")
            .push_bind(clean_optional(author.as_deref()));
    }
    if let Some(url) = &req.url {
        let url = clean_optional(url.as_deref());
        let domain = url.as_deref().and_then(domain_from_url);
        query.push(", url = ").push_bind(url);
        query.push(", domain = ").push_bind(domain);
    }
    if let Some(category) = &req.category {
        query
            .push(", category = ")
            .push_bind(clean_optional(category.as_deref()));
    }
    if let Some(content) = &req.content {
        let content = clean_optional(content.as_deref());
        let word_count = content.as_deref().map(count_words).unwrap_or(0);
        query.push(", content = ").push_bind(content);
        query.push(", word_count = ").push_bind(word_count as i64);
        query
            .push(", reading_time_minutes = ")
            .push_bind(reading_time_minutes(word_count) as i64);
    }

    query.push(" WHERE id = ").push_bind(id);
    query.build().execute(pool).await?;

    get_source(pool, id).await
}

/// 읽을거리를 삭제합니다.
///
/// `ON DELETE CASCADE`로 하이라이트가 함께 삭제되고,
/// 하이라이트를 통해 태그 연결과 복습 카드도 삭제됩니다.
pub async fn delete_source(pool: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM sources WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// 읽기 진행률(0~100)을 기록하고 `last_read_at`을 현재 시각으로 바꿉니다.
///
/// # 에러
/// - 진행률이 0~100 범위 밖이거나 NaN이면 `position` 필드 검증 에러
///
/// # 반환값
/// - `Ok(None)`: 해당 ID의 읽을거리가 없음
pub async fn update_reading_progress(
    pool: &SqlitePool,
    id: &str,
    position: f64,
) -> Result<Option<Source>, AppError> {
    // NaN은 어떤 범위에도 포함되지 않으므로 contains()에서 걸러집니다.
    if !(0.0..=100.0).contains(&position) {
        return Err(AppError::validation(
            "position",
            format!("must be between 0 and 100, got {}", position),
        ));
    }

    let result = sqlx::query(
        r#"
        UPDATE sources
        SET reading_position = ?,
            last_read_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(position)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_source(pool, id).await
}

/// 읽음 여부만 바꿉니다. 읽기 진행률은 건드리지 않습니다.
pub async fn mark_as_read(
    pool: &SqlitePool,
    id: &str,
    is_read: bool,
) -> Result<Option<Source>, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE sources
        SET is_read = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(is_read)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_source(pool, id).await
}
