//! liveness/readiness 프로브.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::AppState;

/// 의존성 하나의 점검 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    Up,
    Down,
    /// 인메모리 저장소로 기동해 데이터베이스가 없는 경우
    NotConfigured,
}

/// 의존성별 점검 결과.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DependencyChecks {
    pub credential_store: CheckState,
    pub database: CheckState,
}

impl DependencyChecks {
    /// `Down`이 하나라도 있으면 트래픽을 받을 수 없습니다.
    pub fn all_available(&self) -> bool {
        self.credential_store != CheckState::Down && self.database != CheckState::Down
    }
}

/// readiness 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadinessReport {
    pub ready: bool,
    pub version: String,
    pub uptime_secs: i64,
    pub checked_at: DateTime<Utc>,
    pub checks: DependencyChecks,
}

/// 프로세스가 요청을 처리할 수 있는지만 확인합니다.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "프로세스 동작 중", body = String)),
    tag = "health"
)]
pub async fn liveness() -> &'static str {
    "OK"
}

/// 자격 증명 저장소와 연결 풀을 점검합니다. 하나라도 내려가 있으면 503.
#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "트래픽 수신 가능", body = ReadinessReport),
        (status = 503, description = "의존성 장애", body = ReadinessReport)
    ),
    tag = "health"
)]
pub async fn readiness(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessReport>) {
    let credential_store = if state.is_store_healthy().await {
        CheckState::Up
    } else {
        CheckState::Down
    };
    let database = state
        .db_pool
        .as_ref()
        .map_or(CheckState::NotConfigured, |pool| {
            if pool.is_closed() {
                CheckState::Down
            } else {
                CheckState::Up
            }
        });

    let checks = DependencyChecks {
        credential_store,
        database,
    };
    let ready = checks.all_available();
    if !ready {
        tracing::warn!(?checks, "Readiness check failed");
    }

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let report = ReadinessReport {
        ready,
        version: state.version.clone(),
        uptime_secs: state.uptime_secs(),
        checked_at: Utc::now(),
        checks,
    };
    (status, Json(report))
}

pub fn health_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(liveness))
        .route("/ready", get(readiness))
}
