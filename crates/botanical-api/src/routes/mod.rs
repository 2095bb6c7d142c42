//! API 라우트.
//!
//! 모든 REST API 엔드포인트를 정의하고 라우터를 구성합니다.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 상세 헬스 체크 (readiness)
//! - `/api/v1/auth` - 가입, 로그인 (공개)
//! - `/api/v1/me`, `/api/v1/users` - 계정 관리 (인증 필요)

pub mod auth;
pub mod health;
pub mod users;

pub use auth::{auth_router, AuthResponse, LoginRequest, RegisterRequest, RegisterResponse};
pub use health::{health_router, CheckState, DependencyChecks, ReadinessReport};
pub use users::{users_router, ChangePasswordRequest, MessageResponse, UpdateProfileRequest};

use axum::{middleware, Router};
use std::sync::Arc;

use crate::auth::require_auth;
use crate::state::AppState;

/// 전체 API 라우터 생성.
///
/// 계정 관리 라우트에는 인증 게이트가 적용되고, 헬스 체크와 가입/로그인은 공개입니다.
pub fn create_api_router(state: Arc<AppState>) -> Router {
    let protected = users_router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        require_auth,
    ));

    Router::new()
        .nest("/health", health_router())
        .nest("/api/v1/auth", auth_router())
        .nest("/api/v1", protected)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::state::create_test_state;

    #[tokio::test]
    async fn test_public_routes_skip_auth() {
        let app = create_api_router(Arc::new(create_test_state()));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let app = create_api_router(Arc::new(create_test_state()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/nowhere")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        // route_layer는 매칭된 라우트에만 적용되므로 인증 없이 404
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
