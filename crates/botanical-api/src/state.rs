//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 Arc로 래핑되어 여러 요청 간에 공유됩니다.
//! 가변 공유 자원은 자격증명 저장소뿐이며, 나머지는 읽기 전용입니다.

use std::sync::Arc;

use botanical_core::{AccountStore, JwtConfig};

use crate::auth::{AccountService, Authenticator, SessionPolicy, TokenIssuer, TokenValidator};

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 자격증명 저장소 (PostgreSQL 또는 인메모리)
    pub store: Arc<dyn AccountStore>,

    /// 인증 게이트 - 토큰 검증 및 계정 조회
    pub auth: Arc<Authenticator>,

    /// 계정 생명주기 서비스 - 가입, 로그인, 비밀번호 변경
    pub accounts: Arc<AccountService>,

    /// 데이터베이스 연결 풀 (설정된 경우)
    pub db_pool: Option<sqlx::PgPool>,

    /// 서버 시작 시간
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 새로운 AppState 생성.
    ///
    /// 토큰 발급기와 검증기는 같은 설정(시크릿, 발급자)에서 만들어집니다.
    pub fn new(jwt: &JwtConfig, store: Arc<dyn AccountStore>) -> Self {
        let policy = SessionPolicy::from_flag(jwt.single_session);

        let auth = Authenticator::new(TokenValidator::from_config(jwt), store.clone(), policy);
        let accounts = AccountService::new(
            store.clone(),
            TokenIssuer::from_config(jwt),
            jwt.expire_hours,
        );

        Self {
            store,
            auth: Arc::new(auth),
            accounts: Arc::new(accounts),
            db_pool: None,
            started_at: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 데이터베이스 연결 풀 설정.
    pub fn with_db_pool(mut self, pool: sqlx::PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// 서버 업타임(초).
    pub fn uptime_secs(&self) -> i64 {
        chrono::Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds()
    }

    /// 자격증명 저장소 연결 상태 확인.
    pub async fn is_store_healthy(&self) -> bool {
        self.store.health_check().await.is_ok()
    }
}

/// 테스트용 AppState 생성 (인메모리 저장소, 단일 세션 정책).
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state() -> AppState {
    let jwt = JwtConfig {
        secret: "test-secret-key-for-jwt-testing-minimum-32-chars".to_string(),
        ..JwtConfig::default()
    };
    AppState::new(&jwt, Arc::new(botanical_core::MemoryAccountStore::new()))
}
