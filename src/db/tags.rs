//! # 태그 데이터베이스 쿼리 모듈
//!
//! 태그 CRUD 및 하이라이트-태그 관계를 관리하는 SQL 쿼리 함수들입니다.
//!
//! ## 테이블 구조
//! - `tags`: 태그 엔티티 (id, name, color)
//! - `highlight_tags`: 하이라이트와 태그의 다대다(N:M) 관계 테이블
//!
//! ```sql
//! tags ←── highlight_tags ──→ highlights
//!  (1)         (N:M)             (1)
//! ```

use crate::error::AppError;
use crate::models::*;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;

/// 모든 태그를 이름순으로 조회합니다.
pub async fn list_tags(pool: &SqlitePool) -> Result<Vec<Tag>, AppError> {
    let tags = sqlx::query_as::<_, Tag>("SELECT id, name, color FROM tags ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(tags)
}

/// ID로 태그 하나를 조회합니다.
pub async fn get_tag(pool: &SqlitePool, id: &str) -> Result<Option<Tag>, AppError> {
    let tag = sqlx::query_as::<_, Tag>("SELECT id, name, color FROM tags WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(tag)
}

/// 새 태그를 생성하고 생성된 태그를 반환합니다.
///
/// ## 처리 흐름
/// 1. 이름의 앞뒤 공백 제거, 빈 이름이면 검증 에러
/// 2. UUIDv7으로 고유 ID 생성 후 INSERT
/// 3. 이름이 이미 있으면 UNIQUE 제약 위반 → 409 Conflict
pub async fn create_tag(pool: &SqlitePool, req: &CreateTagRequest) -> Result<Tag, AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name", "must not be empty"));
    }

    let id = uuid::Uuid::now_v7().to_string();

    sqlx::query("INSERT INTO tags (id, name, color) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(name)
        .bind(&req.color) // Option<String>도 bind 가능 — None이면 SQL NULL로 처리됨
        .execute(pool)
        .await
        .map_err(|e| duplicate_name(e, name))?;

    get_tag(pool, &id)
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created tag".to_string()))
}

/// 태그 정보를 부분 업데이트합니다.
///
/// ## 반환값
/// - `Ok(Some(Tag))`: 업데이트 성공, 변경된 태그 반환
/// - `Ok(None)`: 해당 ID의 태그가 존재하지 않음
pub async fn update_tag(
    pool: &SqlitePool,
    id: &str,
    req: &UpdateTagRequest,
) -> Result<Option<Tag>, AppError> {
    let tag = get_tag(pool, id).await?;
    if tag.is_none() {
        return Ok(None); // 404 처리를 라우트 핸들러에 위임
    }

    if let Some(name) = &req.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("name", "must not be empty"));
        }
        sqlx::query("UPDATE tags SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| duplicate_name(e, name))?;
    }

    if let Some(color) = &req.color {
        sqlx::query("UPDATE tags SET color = ? WHERE id = ?")
            .bind(color)
            .bind(id)
            .execute(pool)
            .await?;
    }

    get_tag(pool, id).await
}

/// ID로 태그를 삭제합니다.
///
/// `highlight_tags` 테이블에 `ON DELETE CASCADE`가 설정되어 있으므로,
/// 태그를 삭제하면 해당 태그와 하이라이트의 관계도 자동으로 삭제됩니다.
pub async fn delete_tag(pool: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM tags WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// 특정 하이라이트에 연결된 모든 태그를 이름순으로 조회합니다.
pub async fn get_highlight_tags(
    conn: &mut SqliteConnection,
    highlight_id: &str,
) -> Result<Vec<Tag>, AppError> {
    let tags = sqlx::query_as::<_, Tag>(
        r#"
        SELECT t.id, t.name, t.color
        FROM tags t
        JOIN highlight_tags ht ON ht.tag_id = t.id
        WHERE ht.highlight_id = ?
        ORDER BY t.name
        "#,
    )
    .bind(highlight_id)
    .fetch_all(conn)
    .await?;

    Ok(tags)
}

/// 여러 하이라이트의 태그를 한 번의 쿼리로 가져옵니다.
///
/// 목록 조회에서 하이라이트마다 쿼리를 보내지 않기 위해 사용합니다(N+1 방지).
/// 반환값은 `하이라이트 ID → 태그 목록` 맵이며, 태그가 없는 하이라이트는 맵에 없습니다.
pub async fn tags_for_highlights(
    conn: &mut SqliteConnection,
    highlight_ids: &[String],
) -> Result<HashMap<String, Vec<Tag>>, AppError> {
    let mut map: HashMap<String, Vec<Tag>> = HashMap::new();
    if highlight_ids.is_empty() {
        return Ok(map);
    }

    let mut query = QueryBuilder::<Sqlite>::new(
        r#"
        SELECT ht.highlight_id, t.id, t.name, t.color
        FROM tags t
        JOIN highlight_tags ht ON ht.tag_id = t.id
        WHERE ht.highlight_id IN (
        "#,
    );
    let mut ids = query.separated(", ");
    for id in highlight_ids {
        ids.push_bind(id.as_str());
    }
    ids.push_unseparated(") ORDER BY t.name");

    let rows: Vec<(String, String, String, Option<String>)> =
        query.build_query_as().fetch_all(conn).await?;

    for (highlight_id, id, name, color) in rows {
        map.entry(highlight_id)
            .or_default()
            .push(Tag { id, name, color });
    }
    Ok(map)
}

/// 하이라이트의 태그 집합을 통째로 교체합니다 (삭제 후 삽입, 병합하지 않음).
///
/// 트랜잭션 안에서 호출해야 중간 상태가 다른 요청에 보이지 않습니다.
/// 존재하지 않는 태그 ID가 있으면 `tag_ids` 검증 에러를 반환하고,
/// 호출한 쪽의 트랜잭션이 롤백되면서 삭제도 취소됩니다.
pub async fn replace_highlight_tags(
    conn: &mut SqliteConnection,
    highlight_id: &str,
    tag_ids: &[String],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM highlight_tags WHERE highlight_id = ?")
        .bind(highlight_id)
        .execute(&mut *conn)
        .await?;

    for tag_id in tag_ids {
        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ?")
            .bind(tag_id)
            .fetch_optional(&mut *conn)
            .await?;
        if exists.is_none() {
            return Err(AppError::validation(
                "tag_ids",
                format!("tag {} does not exist", tag_id),
            ));
        }

        // 같은 ID가 두 번 들어와도 INSERT OR IGNORE로 한 번만 연결됩니다.
        sqlx::query("INSERT OR IGNORE INTO highlight_tags (highlight_id, tag_id) VALUES (?, ?)")
            .bind(highlight_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// UNIQUE 제약 위반을 409 Conflict로 바꿉니다.
fn duplicate_name(e: sqlx::Error, name: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(format!("Tag '{}' already exists", name))
        }
        _ => AppError::Database(e),
    }
}
