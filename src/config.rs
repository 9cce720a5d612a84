//! # 애플리케이션 설정(Configuration) 모듈
//!
//! 환경변수에서 서버 설정값을 읽어오는 모듈입니다.
//! `.env` 파일이나 시스템 환경변수에서 값을 가져옵니다.
//!
//! 설정 항목:
//! - `DATABASE_URL`: SQLite 데이터베이스 경로 (필수)
//! - `HOST`: 서버 바인딩 주소
//! - `PORT`: 서버 포트 번호
//! - `FRONTEND_DIST`: 빌드된 프론트엔드 정적 파일 디렉토리
//! - `DB_MAX_CONNECTIONS`: 연결 풀의 최대 연결 수
//! - `DB_ACQUIRE_TIMEOUT_SECS`: 풀에서 연결을 빌릴 때 기다리는 최대 시간
//! - `DB_BUSY_TIMEOUT_SECS`: SQLite 쓰기 잠금을 기다리는 최대 시간
//! - `REVIEW_BATCH_SIZE`: `limit` 없이 복습 목록을 요청했을 때 돌려줄 카드 수

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// 애플리케이션 전체 설정을 담는 구조체
///
/// 서버 시작 시 환경변수에서 한 번 읽어온 후,
/// 애플리케이션 전체에서 공유됩니다.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite 데이터베이스 경로 (예: "sqlite:data/folio.db")
    pub database_url: String,
    /// 서버가 바인딩할 호스트 주소 (기본값: "0.0.0.0")
    pub host: String,
    /// 서버 포트 번호 (기본값: 3000)
    pub port: u16,
    /// 프론트엔드 빌드 결과물 경로 (기본값: "../frontend/dist")
    pub frontend_dist: String,
    /// 연결 풀 최대 연결 수 (기본값: 5)
    pub db_max_connections: u32,
    /// 연결 대기 시간 초과 (기본값: 5초). 초과하면 503(재시도 가능)으로 응답합니다.
    pub db_acquire_timeout: Duration,
    /// SQLite busy_timeout (기본값: 5초)
    pub db_busy_timeout: Duration,
    /// 복습 목록 기본 크기 (기본값: 20)
    pub review_batch_size: u32,
}

impl Config {
    /// 환경변수에서 설정값을 읽어 Config 인스턴스를 생성합니다.
    ///
    /// # 에러
    /// `DATABASE_URL`은 필수이며, 없으면 에러가 발생합니다.
    /// 나머지 설정은 기본값이 있어 환경변수가 없어도 동작합니다.
    /// 숫자 설정을 파싱할 수 없으면 경고 없이 기본값을 사용합니다.
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?, // 필수: 없으면 에러
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("PORT", 3000),
            frontend_dist: env::var("FRONTEND_DIST")
                .unwrap_or_else(|_| "../frontend/dist".to_string()),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 5),
            db_acquire_timeout: Duration::from_secs(parse_or("DB_ACQUIRE_TIMEOUT_SECS", 5)),
            db_busy_timeout: Duration::from_secs(parse_or("DB_BUSY_TIMEOUT_SECS", 5)),
            review_batch_size: parse_or("REVIEW_BATCH_SIZE", 20),
        })
    }
}

/// 환경변수를 읽어 `T`로 파싱하고, 없거나 파싱에 실패하면 `default`를 반환합니다.
///
/// 제네릭 `T: FromStr`: `"3000".parse::<u16>()`처럼 문자열에서 변환 가능한 모든 타입에 사용할 수 있습니다.
fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
