//! Prometheus 메트릭.
//!
//! HTTP 요청 메트릭과 인증 메트릭(거부 사유, 로그인 결과)을 기록하고 `/metrics`로 노출합니다.

use std::time::Duration;

use axum::http::Method;
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_RESPONSES_TOTAL: &str = "http_responses_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const AUTH_REJECTIONS_TOTAL: &str = "auth_rejections_total";
pub const AUTH_LOGINS_TOTAL: &str = "auth_logins_total";

/// 로그인(Argon2 검증) 요청까지 포함하는 범위
const DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// Prometheus 레코더를 설치하고 렌더링 핸들을 반환합니다.
///
/// # Errors
///
/// 레코더가 이미 설치되어 있으면 에러를 반환합니다.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_string()),
            DURATION_BUCKETS,
        )?
        .install_recorder()?;

    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "Total HTTP requests received");
    describe_counter!(HTTP_RESPONSES_TOTAL, "Total HTTP responses by status");
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "HTTP request latency"
    );
    describe_counter!(
        AUTH_REJECTIONS_TOTAL,
        "Requests rejected by the authentication or admin gate, by reason"
    );
    describe_counter!(AUTH_LOGINS_TOTAL, "Login attempts by outcome");
}

/// 요청 한 건의 메트릭 라벨.
#[derive(Debug, Clone)]
pub struct RequestLabels {
    method: String,
    route: String,
}

impl RequestLabels {
    /// 라우트 템플릿(`/api/v1/users/{id}`)이나 정규화된 경로로 라벨 생성.
    pub fn new(method: &Method, route: impl Into<String>) -> Self {
        Self {
            method: method.as_str().to_string(),
            route: route.into(),
        }
    }
}

/// 요청 수신 기록.
pub fn record_request_started(labels: &RequestLabels) {
    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => labels.method.clone(),
        "path" => labels.route.clone()
    )
    .increment(1);
}

/// 응답 상태와 처리 시간 기록.
pub fn record_request_completed(labels: &RequestLabels, status: u16, elapsed: Duration) {
    counter!(
        HTTP_RESPONSES_TOTAL,
        "method" => labels.method.clone(),
        "path" => labels.route.clone(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "method" => labels.method.clone(),
        "path" => labels.route.clone()
    )
    .record(elapsed.as_secs_f64());
}

/// 인증/인가 거부 기록.
pub fn record_auth_rejection(reason: &'static str) {
    counter!(AUTH_REJECTIONS_TOTAL, "reason" => reason).increment(1);
}

/// 로그인 시도 결과 기록 (success, unknown_phone, wrong_password).
pub fn record_login(outcome: &'static str) {
    counter!(AUTH_LOGINS_TOTAL, "outcome" => outcome).increment(1);
}

/// 매칭된 라우트가 없을 때 라벨 폭증을 막기 위해 숫자 세그먼트를 치환합니다.
///
/// 예: `/api/v1/users/42/password` → `/api/v1/users/{id}/password`
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
