//! # 데이터베이스 접근 계층 (Data Access Layer)
//!
//! 데이터베이스와 직접 상호작용하는 함수들을 모아둔 모듈입니다.
//! 라우트 핸들러(routes/)와 서비스(services/)에서 이 모듈의 함수를 호출하여 DB 작업을 수행합니다.
//!
//! 각 하위 모듈:
//! - `sources`: 읽을거리 CRUD와 읽기 진행 상태
//! - `highlights`: 하이라이트 CRUD (복습 카드 생성 포함)
//! - `search`: 하이라이트 조건 검색 (FTS5 + 필터)
//! - `tags`: 태그 CRUD 및 하이라이트-태그 관계 쿼리
//! - `reviews`: 복습 카드, 복습 기록, 통계 쿼리

pub mod highlights;
pub mod reviews;
pub mod search;
pub mod sources;
pub mod tags;

// 하위 모듈의 모든 공개 함수를 재공개(re-export)하여
// `crate::db::get_highlight`처럼 바로 접근할 수 있게 합니다.
pub use highlights::*;
pub use reviews::*;
pub use search::*;
pub use sources::*;
pub use tags::*;

use crate::config::Config;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// SQL에서 현재 UTC 시각을 ISO 8601 문자열로 만드는 식
pub const NOW_SQL: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// 설정값으로 SQLite 연결 풀을 만듭니다.
///
/// - WAL 모드: 읽기와 쓰기가 서로를 막지 않습니다.
/// - `busy_timeout`: 다른 트랜잭션이 쓰기 잠금을 잡고 있을 때 기다리는 시간
/// - `acquire_timeout`: 풀에서 연결을 빌리지 못하면 `PoolTimedOut`(→ 503, 재시도 가능)
/// - `foreign_keys`: ON DELETE CASCADE가 동작하려면 반드시 켜야 합니다.
pub async fn connect(config: &Config) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(config.db_busy_timeout)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(config.db_acquire_timeout)
        .connect_with(options)
        .await
}

/// `./migrations` 폴더의 마이그레이션 중 아직 실행되지 않은 것을 순서대로 실행합니다.
///
/// sqlx::migrate!는 컴파일 타임에 SQL 파일들을 바이너리에 포함시키는 매크로입니다.
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
