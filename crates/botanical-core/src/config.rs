//! 설정 관리.
//!
//! 이 모듈은 애플리케이션 설정을 정의하고 관리합니다.
//! 기본값 → 설정 파일(선택) → `BOTANICAL__` 접두사 환경 변수 순으로 덮어씁니다.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::error::ConfigError;
use crate::logging::LogFormat;

/// 개발용 기본 JWT 시크릿 (운영 환경에서는 반드시 교체).
pub const DEFAULT_JWT_SECRET: &str = "dev-secret-key-change-in-production";

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// 서버 설정
    pub server: ServerConfig,
    /// 데이터베이스 설정
    pub database: DatabaseConfig,
    /// 토큰 설정
    pub jwt: JwtConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
    /// CORS 허용 origin 목록 (비어 있으면 모든 origin 허용)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            request_timeout_secs: 30,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// 소켓 주소 반환.
    ///
    /// # Errors
    /// `host:port` 형식이 유효하지 않으면 `AddrParseError`를 반환합니다.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// 데이터베이스 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL 연결 URL (없으면 인메모리 저장소 사용)
    pub url: Option<String>,
    /// 최대 연결 수
    pub max_connections: u32,
    /// 연결 타임아웃 (초)
    pub connection_timeout_secs: u64,
    /// 시작 시 마이그레이션 실행 여부
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            connection_timeout_secs: 10,
            run_migrations: true,
        }
    }
}

/// 토큰 발급/검증 설정.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JwtConfig {
    /// HMAC 서명 시크릿
    pub secret: String,
    /// 발급자 태그 (`iss` 클레임)
    pub issuer: String,
    /// 토큰 유효 시간 (시간)
    pub expire_hours: i64,
    /// 계정당 하나의 활성 토큰만 허용 (재로그인 시 이전 토큰 무효화)
    pub single_session: bool,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_JWT_SECRET.to_string(),
            issuer: "botanical-api".to_string(),
            expire_hours: 24,
            single_session: true,
        }
    }
}

impl JwtConfig {
    /// 개발용 기본 시크릿 사용 여부.
    pub fn uses_default_secret(&self) -> bool {
        self.secret == DEFAULT_JWT_SECRET
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("expire_hours", &self.expire_hours)
            .field("single_session", &self.single_session)
            .finish()
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "botanical_api=info,botanical_core=info,tower_http=debug".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없으면 기본값과 환경 변수만 사용합니다.
    /// `database.url`이 비어 있으면 `DATABASE_URL` 환경 변수를 사용합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let builder = config::Config::builder()
            // 파일에서 로드 (선택)
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("BOTANICAL")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            );

        let mut config: AppConfig = builder.build()?.try_deserialize()?;

        if config.database.url.is_none() {
            config.database.url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        }

        config.validate()?;
        Ok(config)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load("config/default.toml")
    }

    /// 설정 값 검증.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.trim().is_empty() {
            return Err(ConfigError::Invalid("jwt.secret must not be empty".to_string()));
        }
        if self.jwt.expire_hours <= 0 {
            return Err(ConfigError::Invalid(format!(
                "jwt.expire_hours must be positive, got {}",
                self.jwt.expire_hours
            )));
        }
        if self.jwt.issuer.trim().is_empty() {
            return Err(ConfigError::Invalid("jwt.issuer must not be empty".to_string()));
        }
        if LogFormat::parse(&self.logging.format).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unknown logging.format {:?}",
                self.logging.format
            )));
        }
        Ok(())
    }
}
