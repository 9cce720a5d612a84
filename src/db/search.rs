//! # 하이라이트 검색 모듈
//!
//! 전문검색(FTS5)과 여러 조건 필터를 하나의 동적 쿼리로 조합합니다.
//!
//! ## FTS5 외부 콘텐츠 테이블
//! `highlights_fts`는 `content='highlights'`로 생성되어 검색 인덱스만 관리하고,
//! 원본 텍스트는 `highlights` 테이블에서 읽습니다.
//! 인덱스는 마이그레이션의 트리거(INSERT/UPDATE/DELETE)가 자동으로 동기화합니다.
//!
//! ## 조건 조합
//! ```sql
//! SELECT ... FROM highlights h JOIN sources s ON s.id = h.source_id
//! WHERE 1 = 1
//!   AND h.rowid IN (SELECT rowid FROM highlights_fts WHERE highlights_fts MATCH ?)
//!   AND h.source_id IN (?, ?)
//!   AND EXISTS (SELECT 1 FROM highlight_tags ... )   -- 태그마다 하나씩
//!   AND h.is_archived = 0
//! ORDER BY h.highlighted_at DESC, h.id DESC
//! LIMIT ? OFFSET ?
//! ```
//! 모든 조건은 AND로 결합됩니다.

use crate::db::{self, highlights::HIGHLIGHT_COLUMNS};
use crate::error::AppError;
use crate::models::*;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

pub const DEFAULT_SEARCH_LIMIT: i64 = 50;
pub const MAX_SEARCH_LIMIT: i64 = 200;

/// 검색어를 FTS5 MATCH 식으로 바꿉니다.
///
/// 공백으로 나눈 단어마다 큰따옴표로 감싸 AND로 연결합니다.
/// 사용자가 입력한 `OR`, `*`, `-` 같은 FTS5 연산자는 일반 글자로 취급됩니다.
///
/// `"memory palace"` → `"memory" AND "palace"`
pub fn fts_query(q: &str) -> Option<String> {
    let terms: Vec<String> = q
        .split_whitespace()
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" AND "))
    }
}

/// 조건에 맞는 하이라이트를 최신순으로 검색합니다.
pub async fn search_highlights(
    pool: &SqlitePool,
    filters: &HighlightFilters,
) -> Result<Vec<Highlight>, AppError> {
    let mut query = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {HIGHLIGHT_COLUMNS} FROM highlights h JOIN sources s ON s.id = h.source_id WHERE 1 = 1"
    ));

    if let Some(matcher) = filters.q.as_deref().and_then(fts_query) {
        query
            .push(" AND h.rowid IN (SELECT rowid FROM highlights_fts WHERE highlights_fts MATCH ")
            .push_bind(matcher)
            .push(")");
    }

    if let Some(source_id) = &filters.source_id {
        query.push(" AND h.source_id = ").push_bind(source_id.clone());
    }

    let source_ids = split_csv(filters.source_ids.as_deref());
    if !source_ids.is_empty() {
        query.push(" AND h.source_id IN (");
        let mut ids = query.separated(", ");
        for id in source_ids {
            ids.push_bind(id);
        }
        ids.push_unseparated(")");
    }

    if let Some(source_type) = filters.source_type {
        query.push(" AND s.source_type = ").push_bind(source_type);
    }

    match filters.has_notes {
        Some(true) => {
            query.push(" AND h.note IS NOT NULL AND trim(h.note) <> ''");
        }
        Some(false) => {
            query.push(" AND (h.note IS NULL OR trim(h.note) = '')");
        }
        None => {}
    }

    // highlighted_at은 "YYYY-MM-DDTHH:MM:SS.sssZ" 형식이므로 앞 10글자가 날짜입니다.
    if let Some(from) = filters.from {
        query
            .push(" AND substr(h.highlighted_at, 1, 10) >= ")
            .push_bind(from.format("%Y-%m-%d").to_string());
    }
    if let Some(to) = filters.to {
        query
            .push(" AND substr(h.highlighted_at, 1, 10) <= ")
            .push_bind(to.format("%Y-%m-%d").to_string());
    }

    // 나열한 태그를 모두 가진 하이라이트만 (태그마다 EXISTS 하나)
    for tag_id in split_csv(filters.tag_ids.as_deref()) {
        query
            .push(" AND EXISTS (SELECT 1 FROM highlight_tags ht WHERE ht.highlight_id = h.id AND ht.tag_id = ")
            .push_bind(tag_id)
            .push(")");
    }
    for name in split_csv(filters.tags.as_deref()) {
        query
            .push(
                " AND EXISTS (SELECT 1 FROM highlight_tags ht JOIN tags t ON t.id = ht.tag_id \
                 WHERE ht.highlight_id = h.id AND t.name = ",
            )
            .push_bind(name)
            .push(" COLLATE NOCASE)");
    }

    if let Some(is_favorite) = filters.is_favorite {
        query.push(" AND h.is_favorite = ").push_bind(is_favorite);
    }
    if !filters.include_archived.unwrap_or(false) {
        query.push(" AND h.is_archived = 0");
    }

    let limit = filters
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);
    let offset = filters.offset.unwrap_or(0).max(0);
    query
        .push(" ORDER BY h.highlighted_at DESC, h.id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let mut conn = pool.acquire().await?;
    let rows: Vec<HighlightRow> = query.build_query_as().fetch_all(&mut *conn).await?;

    let ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();
    let mut tags = db::tags_for_highlights(&mut conn, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let row_tags = tags.remove(&row.id).unwrap_or_default();
            row.into_highlight(row_tags)
        })
        .collect())
}

/// 특정 읽을거리의 하이라이트 목록 (보관된 것 포함, 최신순)
///
/// 한 페이지는 최대 200개입니다. `limit`이 없으면 한 번에 최대치를 돌려주고,
/// 그보다 많으면 `offset`으로 넘겨 가며 읽습니다.
pub async fn list_source_highlights(
    pool: &SqlitePool,
    source_id: &str,
    page: &PageQuery,
) -> Result<Vec<Highlight>, AppError> {
    let filters = HighlightFilters {
        source_id: Some(source_id.to_string()),
        include_archived: Some(true),
        limit: Some(page.limit.unwrap_or(MAX_SEARCH_LIMIT)),
        offset: page.offset,
        ..Default::default()
    };
    search_highlights(pool, &filters).await
}
