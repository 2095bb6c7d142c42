//! tracing 구독자 초기화.
//!
//! `logging.format`으로 출력 형식(pretty, json, compact)을 고르며,
//! `RUST_LOG`가 있으면 `logging.level`보다 우선합니다.
//! 토큰과 비밀번호는 어떤 레벨에서도 필드로 기록하지 않습니다.

use thiserror::Error;
use tracing_subscriber::{
    filter::ParseError, fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError,
    EnvFilter,
};

use crate::config::LoggingConfig;
use crate::error::ConfigError;

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 개발용
    #[default]
    Pretty,
    /// 로그 수집기용
    Json,
    Compact,
}

impl LogFormat {
    /// 설정 문자열 파싱 (대소문자 무시).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

/// 로깅 초기화 에러.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("잘못된 로그 레벨 필터: {0}")]
    Filter(#[from] ParseError),
    #[error("로깅 구독자가 이미 설치되어 있습니다: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// 구독자 초기화 옵션.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// EnvFilter 지시어 (예: "botanical_api=debug,tower_http=info")
    pub level: String,
    pub format: LogFormat,
    /// 파일명/줄 번호 포함
    pub with_location: bool,
}

impl LogConfig {
    /// 설정 섹션에서 옵션 생성.
    ///
    /// # Errors
    /// 알 수 없는 형식이면 `ConfigError::Invalid`.
    pub fn from_settings(settings: &LoggingConfig) -> Result<Self, ConfigError> {
        let format = LogFormat::parse(&settings.format).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "logging.format must be pretty, json or compact, got {:?}",
                settings.format
            ))
        })?;

        Ok(Self {
            level: settings.level.clone(),
            format,
            with_location: format == LogFormat::Pretty,
        })
    }
}

/// 전역 tracing 구독자를 설치합니다. 프로세스당 한 번만 호출해야 합니다.
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)?,
    };

    let layer = fmt::layer()
        .with_file(config.with_location)
        .with_line_number(config.with_location)
        .with_target(true);
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Pretty => registry.with(layer.pretty()).try_init()?,
        LogFormat::Json => registry.with(layer.json()).try_init()?,
        LogFormat::Compact => registry.with(layer.compact()).try_init()?,
    }

    tracing::info!(format = ?config.format, filter = %config.level, "Logging initialized");
    Ok(())
}
