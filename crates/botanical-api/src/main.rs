//! 식물 도감 API 서버 진입점.
//!
//! 설정을 읽고 자격 증명 저장소를 고른 뒤 HTTP 서버를 띄웁니다.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::{extract::State, middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use botanical_api::metrics::setup_metrics_recorder;
use botanical_api::middleware::metrics_layer;
use botanical_api::openapi::swagger_ui_router;
use botanical_api::repository::PgAccountStore;
use botanical_api::routes::create_api_router;
use botanical_api::state::AppState;
use botanical_core::{
    init_logging, AccountStore, AppConfig, DatabaseConfig, LogConfig, MemoryAccountStore,
    ServerConfig,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 풀 종료 대기 한도
const POOL_CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// PostgreSQL 저장소 연결.
///
/// 마이그레이션(설정 시)과 연결 확인까지 마친 저장소를 돌려줍니다.
async fn connect_pg_store(database: &DatabaseConfig, url: &str) -> Result<PgAccountStore, BoxError> {
    let pool = PgPoolOptions::new()
        .max_connections(database.max_connections)
        .acquire_timeout(Duration::from_secs(database.connection_timeout_secs))
        .connect(url)
        .await
        .inspect_err(|e| error!(error = %e, "Could not reach credential database"))?;

    let store = PgAccountStore::new(pool);
    if database.run_migrations {
        store.migrate().await?;
    }
    store.health_check().await?;
    Ok(store)
}

/// 설정에 맞는 자격 증명 저장소로 AppState를 구성합니다.
async fn build_state(config: &AppConfig) -> Result<AppState, BoxError> {
    match config.database.url.as_deref() {
        Some(url) => {
            let pg_store = connect_pg_store(&config.database, url).await?;
            let pool = pg_store.pool().clone();
            info!("Credential store: PostgreSQL");
            let store: Arc<dyn AccountStore> = Arc::new(pg_store);
            Ok(AppState::new(&config.jwt, store).with_db_pool(pool))
        }
        None => {
            warn!("Credential store: in-memory, accounts are lost on restart");
            let store: Arc<dyn AccountStore> = Arc::new(MemoryAccountStore::new());
            Ok(AppState::new(&config.jwt, store))
        }
    }
}

/// `server.cors_origins` 기반 CORS 정책.
///
/// 목록이 비어 있으면 모든 origin을 허용하며, 이때는 credentials를 허용하지 않습니다.
fn cors_policy(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(600));

    if origins.is_empty() {
        base.allow_origin(AllowOrigin::any())
    } else {
        info!(count = origins.len(), "CORS restricted to configured origins");
        base.allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
    }
}

async fn render_metrics(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

fn build_app(state: Arc<AppState>, metrics: PrometheusHandle, server: &ServerConfig) -> Router {
    let metrics_route = Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(metrics);

    create_api_router(state)
        .merge(metrics_route)
        .merge(swagger_ui_router())
        .layer(middleware::from_fn(metrics_layer))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(server.request_timeout_secs),
        ))
        .layer(cors_policy(server))
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // .env는 선택 사항
    dotenvy::dotenv().ok();

    let config = AppConfig::load_default()?;
    init_logging(&LogConfig::from_settings(&config.logging)?)?;

    let addr = config.server.socket_addr()?;
    if config.jwt.uses_default_secret() {
        warn!("jwt.secret is the built-in development value, set BOTANICAL__JWT__SECRET");
    }

    let metrics = setup_metrics_recorder()?;
    let state = Arc::new(build_state(&config).await?);
    info!(
        version = %state.version,
        session_policy = ?state.auth.policy(),
        token_ttl_hours = state.accounts.ttl_hours(),
        "Botanical API ready"
    );

    let app = build_app(state.clone(), metrics, &config.server);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Listening (docs at /swagger-ui, metrics at /metrics)");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    if let Some(pool) = state.db_pool.as_ref() {
        if tokio::time::timeout(POOL_CLOSE_TIMEOUT, pool.close()).await.is_err() {
            warn!("Timed out closing database pool");
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Ctrl+C 또는 SIGTERM 중 먼저 오는 쪽을 기다립니다.
///
/// 핸들러 설치에 실패한 시그널은 무시하고 나머지만 기다립니다.
async fn wait_for_shutdown() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal_name = tokio::select! {
        _ = interrupt => "SIGINT",
        _ = terminate => "SIGTERM",
    };
    info!(signal = signal_name, "Shutting down, draining in-flight requests");
}
