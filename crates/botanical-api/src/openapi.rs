//! OpenAPI 문서와 Swagger UI (`/swagger-ui`).

use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use botanical_core::{AccountSummary, Role};

use crate::error::ApiErrorResponse;
use crate::routes::{
    auth, health, users, AuthResponse, ChangePasswordRequest, CheckState, DependencyChecks,
    LoginRequest, MessageResponse, ReadinessReport, RegisterRequest, RegisterResponse,
    UpdateProfileRequest,
};

/// `/api-docs/openapi.json`으로 제공되는 문서.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Botanical Catalog API",
        version = "0.1.0",
        description = "식물 도감 계정 API. 로그인으로 받은 토큰을 `Authorization: Bearer <token>`으로 보냅니다. \
                       다시 로그인하면 이전 토큰은 거부됩니다."
    ),
    tags(
        (name = "health", description = "프로브"),
        (name = "auth", description = "가입, 로그인"),
        (name = "users", description = "프로필, 비밀번호 변경, 계정 삭제")
    ),
    modifiers(&SecurityAddon),
    components(schemas(
        ApiErrorResponse,
        AccountSummary,
        Role,
        ReadinessReport,
        DependencyChecks,
        CheckState,
        RegisterRequest,
        RegisterResponse,
        LoginRequest,
        AuthResponse,
        UpdateProfileRequest,
        ChangePasswordRequest,
        MessageResponse,
    )),
    paths(
        health::liveness,
        health::readiness,
        auth::register,
        auth::login,
        users::get_me,
        users::update_me,
        users::change_my_password,
        users::get_user,
        users::change_user_password,
        users::delete_user,
    )
)]
pub struct ApiDoc;

/// Bearer 토큰 보안 스키마 등록.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// `/swagger-ui`와 `/api-docs/openapi.json`을 제공하는 라우터.
pub fn swagger_ui_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
