//! HTTP 요청 metrics middleware.

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};

use crate::metrics::{normalize_path, record_request_completed, record_request_started, RequestLabels};

/// 요청 수, 응답 상태, 처리 시간을 기록합니다.
///
/// 경로 라벨은 매칭된 라우트 템플릿을 우선 사용하고, 없으면 숫자 ID를 치환한 경로를 씁니다.
pub async fn metrics_layer(request: Request, next: Next) -> Response {
    let route = match request.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_string(),
        None => normalize_path(request.uri().path()),
    };
    let labels = RequestLabels::new(request.method(), route);

    let start = Instant::now();
    record_request_started(&labels);

    let response = next.run(request).await;

    record_request_completed(&labels, response.status().as_u16(), start.elapsed());
    response
}
