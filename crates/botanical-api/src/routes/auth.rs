//! 가입 및 로그인 endpoint.
//!
//! 인증 없이 접근 가능한 공개 라우트입니다.
//!
//! - `POST /api/v1/auth/register` - 가입 후 즉시 토큰 발급
//! - `POST /api/v1/auth/login` - 전화번호/비밀번호 로그인

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;
use validator::Validate;

use botanical_core::AccountSummary;

use crate::auth::Registration;
use crate::error::{ApiErrorResponse, ApiResult};
use crate::state::AppState;

// ==================== 요청/응답 타입 ====================

/// 가입 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// 표시 이름
    #[validate(length(min = 1, max = 50, message = "사용자 이름은 1~50자여야 합니다"))]
    pub username: String,

    /// 전화번호 (로그인 키)
    #[validate(length(min = 1, max = 20, message = "전화번호는 1~20자여야 합니다"))]
    pub phone: String,

    /// 비밀번호 (6~20자, 숫자와 문자 포함)
    #[validate(length(min = 1, message = "비밀번호를 입력하세요"))]
    pub password: String,
}

/// 로그인 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "전화번호를 입력하세요"))]
    pub phone: String,

    #[validate(length(min = 1, message = "비밀번호를 입력하세요"))]
    pub password: String,
}

/// 로그인 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    /// 발급된 토큰 (`Authorization: Bearer <token>`으로 사용)
    pub token: String,
    /// 토큰 만료 시각
    pub expires_at: DateTime<Utc>,
    /// 계정 요약
    pub user: AccountSummary,
}

/// 가입 응답.
///
/// 계정 생성 후 토큰 발급에 실패하면 `token`은 비어 있고 `message`에 안내가 담깁니다.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub user: AccountSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ==================== 핸들러 ====================

/// 계정 가입.
///
/// POST /api/v1/auth/register
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "가입 성공", body = RegisterResponse),
        (status = 400, description = "입력값 또는 비밀번호 정책 위반", body = ApiErrorResponse),
        (status = 409, description = "이미 등록된 전화번호", body = ApiErrorResponse),
        (status = 500, description = "서버 오류", body = ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    request
        .validate()
        .map_err(|e| ApiErrorResponse::from_validation(&e))?;

    let account = state
        .accounts
        .register(Registration {
            username: &request.username,
            phone: &request.phone,
            password: &request.password,
        })
        .await?;

    // 계정은 이미 생성되었으므로 토큰 발급 실패는 가입 실패로 보지 않음
    let response = match state.accounts.open_session(&account).await {
        Ok(issued) => RegisterResponse {
            token: Some(issued.token),
            expires_at: Some(issued.expires_at),
            user: account.summary(),
            message: None,
        },
        Err(e) => {
            warn!(account_id = account.id, error = %e, "Token issuance after registration failed");
            RegisterResponse {
                token: None,
                expires_at: None,
                user: account.summary(),
                message: Some("가입은 완료되었지만 토큰 발급에 실패했습니다. 다시 로그인하세요".to_string()),
            }
        }
    };

    debug!(account_id = account.id, has_token = response.token.is_some(), "POST /auth/register");
    Ok((StatusCode::CREATED, Json(response)))
}

/// 로그인.
///
/// POST /api/v1/auth/login
///
/// 성공하면 이전에 발급된 토큰은 새 토큰으로 대체됩니다.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "로그인 성공", body = AuthResponse),
        (status = 400, description = "자격증명 불일치", body = ApiErrorResponse),
        (status = 500, description = "서버 오류", body = ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    request
        .validate()
        .map_err(|e| ApiErrorResponse::from_validation(&e))?;

    let (issued, account) = state
        .accounts
        .login(request.phone.trim(), &request.password)
        .await?;

    Ok(Json(AuthResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        user: account.summary(),
    }))
}

/// 인증 라우터 생성.
pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}
