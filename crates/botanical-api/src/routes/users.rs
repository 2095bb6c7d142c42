//! 계정 관리 endpoint.
//!
//! 모든 라우트는 인증 게이트 뒤에 마운트됩니다.
//!
//! - `GET /api/v1/me` - 내 정보
//! - `PUT /api/v1/me` - 내 프로필 수정
//! - `PUT /api/v1/me/password` - 내 비밀번호 변경
//! - `GET /api/v1/users/{id}` - 계정 조회
//! - `PUT /api/v1/users/{id}/password` - 비밀번호 변경 (본인 또는 관리자)
//! - `DELETE /api/v1/users/{id}` - 계정 삭제 (관리자)

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use botanical_core::{AccountId, AccountSummary, Permission};

use crate::auth::{ensure_self_or_admin, require_admin, require_permission, CurrentAccount};
use crate::error::{ApiErrorResponse, ApiResult};
use crate::state::AppState;

// ==================== 요청/응답 타입 ====================

/// 프로필 수정 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50, message = "사용자 이름은 1~50자여야 합니다"))]
    pub username: String,
}

/// 비밀번호 변경 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "기존 비밀번호를 입력하세요"))]
    pub old_password: String,

    #[validate(length(min = 1, message = "새 비밀번호를 입력하세요"))]
    pub new_password: String,
}

/// 단순 메시지 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ==================== 핸들러 ====================

/// 내 정보 조회.
///
/// GET /api/v1/me
#[utoipa::path(
    get,
    path = "/api/v1/me",
    responses(
        (status = 200, description = "인증된 계정", body = AccountSummary),
        (status = 401, description = "인증 실패", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_me(CurrentAccount(account): CurrentAccount) -> Json<AccountSummary> {
    Json(account.summary())
}

/// 내 프로필 수정.
///
/// PUT /api/v1/me
#[utoipa::path(
    put,
    path = "/api/v1/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "수정된 계정", body = AccountSummary),
        (status = 400, description = "입력값 오류", body = ApiErrorResponse),
        (status = 401, description = "인증 실패", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    CurrentAccount(account): CurrentAccount,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<Json<AccountSummary>> {
    request
        .validate()
        .map_err(|e| ApiErrorResponse::from_validation(&e))?;

    let updated = state
        .accounts
        .update_profile(account.id, &request.username)
        .await?;

    info!(account_id = account.id, "Profile updated");
    Ok(Json(updated.summary()))
}

/// 내 비밀번호 변경.
///
/// PUT /api/v1/me/password
#[utoipa::path(
    put,
    path = "/api/v1/me/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "변경 완료", body = MessageResponse),
        (status = 400, description = "기존 비밀번호 불일치 또는 정책 위반", body = ApiErrorResponse),
        (status = 401, description = "인증 실패", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn change_my_password(
    State(state): State<Arc<AppState>>,
    CurrentAccount(account): CurrentAccount,
    Json(request): Json<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    change_password_for(&state, account.id, request).await
}

/// 계정 조회.
///
/// GET /api/v1/users/{id}
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "계정 ID")),
    responses(
        (status = 200, description = "계정 요약", body = AccountSummary),
        (status = 401, description = "인증 실패", body = ApiErrorResponse),
        (status = 404, description = "계정 없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    CurrentAccount(account): CurrentAccount,
    Path(id): Path<AccountId>,
) -> ApiResult<Json<AccountSummary>> {
    require_permission(&account, Permission::ViewAccounts)?;

    let target = state.accounts.get_account(id).await?;
    Ok(Json(target.summary()))
}

/// 계정 비밀번호 변경 (본인 또는 관리자).
///
/// PUT /api/v1/users/{id}/password
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/password",
    params(("id" = i64, Path, description = "계정 ID")),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "변경 완료", body = MessageResponse),
        (status = 400, description = "기존 비밀번호 불일치 또는 정책 위반", body = ApiErrorResponse),
        (status = 401, description = "인증 실패", body = ApiErrorResponse),
        (status = 403, description = "권한 없음", body = ApiErrorResponse),
        (status = 404, description = "계정 없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn change_user_password(
    State(state): State<Arc<AppState>>,
    CurrentAccount(account): CurrentAccount,
    Path(id): Path<AccountId>,
    Json(request): Json<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    ensure_self_or_admin(&account, id)?;
    change_password_for(&state, id, request).await
}

/// 계정 삭제 (관리자).
///
/// DELETE /api/v1/users/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "계정 ID")),
    responses(
        (status = 204, description = "삭제 완료"),
        (status = 401, description = "인증 실패", body = ApiErrorResponse),
        (status = 403, description = "관리자 아님", body = ApiErrorResponse),
        (status = 404, description = "계정 없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    CurrentAccount(admin): CurrentAccount,
    Path(id): Path<AccountId>,
) -> ApiResult<StatusCode> {
    state.accounts.delete_account(id).await?;

    info!(admin_id = admin.id, account_id = id, "Account deleted by admin");
    Ok(StatusCode::NO_CONTENT)
}

async fn change_password_for(
    state: &AppState,
    account_id: AccountId,
    request: ChangePasswordRequest,
) -> ApiResult<Json<MessageResponse>> {
    request
        .validate()
        .map_err(|e| ApiErrorResponse::from_validation(&e))?;

    state
        .accounts
        .change_password(account_id, &request.old_password, &request.new_password)
        .await?;

    Ok(Json(MessageResponse::new("비밀번호가 변경되었습니다")))
}

/// 계정 관리 라우터 생성.
///
/// 인증 게이트는 호출 측에서 적용합니다. 관리자 게이트는 DELETE에만 걸리며,
/// `route_layer` 이후에 추가된 GET은 영향을 받지 않습니다.
pub fn users_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me", get(get_me).put(update_me))
        .route("/me/password", put(change_my_password))
        .route(
            "/users/{id}",
            delete(delete_user)
                .route_layer(middleware::from_fn(require_admin))
                .get(get_user),
        )
        .route("/users/{id}/password", put(change_user_password))
}
