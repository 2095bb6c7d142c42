//! Axum용 인증/인가 미들웨어.
//!
//! - [`require_auth`]: 토큰 추출 → 검증 → 계정 조회 → 세션 정책 확인 → 요청 Extensions에 주입
//! - [`require_admin`]: `require_auth` 뒤에 적용되어 관리자(역할 9)만 통과
//! - [`CurrentAccount`]: 핸들러에서 인증된 계정을 꺼내는 추출기

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use botanical_core::{Account, AccountId, AccountStore, Permission, StoreError};

use super::jwt::{TokenError, TokenValidator};
use crate::error::{codes, ApiErrorResponse};
use crate::metrics::record_auth_rejection;
use crate::state::AppState;

/// 세션 정책.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPolicy {
    /// 저장된 활성 토큰과 일치하는 토큰만 허용 (재로그인 시 이전 토큰 무효)
    SingleSession,
    /// 서명과 만료만 확인 (이전 토큰도 만료 전까지 유효)
    Stateless,
}

impl SessionPolicy {
    /// 설정 플래그에서 정책 선택.
    pub fn from_flag(single_session: bool) -> Self {
        if single_session {
            Self::SingleSession
        } else {
            Self::Stateless
        }
    }
}

/// 토큰 자체의 문제(서명, 만료, 소유 계정 없음)에 대한 공통 응답 메시지
const INVALID_TOKEN_MESSAGE: &str = "유효하지 않거나 만료된 토큰입니다";

/// 인증/인가 에러.
///
/// 인증 실패 원인은 모두 401 `UNAUTHENTICATED` 하나로 응답합니다.
/// 토큰 문제와 계정 없음은 같은 메시지를 쓰고, 세부 원인은 로그와 [`AuthError::reason`]에만 남습니다.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("인증 토큰이 필요합니다")]
    MissingCredential,
    #[error("{}", INVALID_TOKEN_MESSAGE)]
    InvalidToken(TokenError),
    /// 서명은 유효하지만 계정이 사라진 토큰. 외부 메시지는 잘못된 토큰과 같습니다.
    #[error("{}", INVALID_TOKEN_MESSAGE)]
    UnknownAccount,
    #[error("활성 세션이 없습니다. 다시 로그인하세요")]
    NoActiveSession,
    #[error("세션이 만료되었습니다. 다시 로그인하세요")]
    SessionExpired,
    #[error("다른 곳에서 로그인하여 이 토큰은 더 이상 유효하지 않습니다")]
    SessionSuperseded,
    #[error("권한이 부족합니다")]
    Forbidden,
    #[error("계정 저장소 에러: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// 메트릭/로그용 원인 라벨.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::InvalidToken(e) => e.reason(),
            Self::UnknownAccount => "unknown_account",
            Self::NoActiveSession => "no_active_session",
            Self::SessionExpired => "session_expired",
            Self::SessionSuperseded => "session_superseded",
            Self::Forbidden => "forbidden",
            Self::Store(_) => "store_error",
        }
    }

    /// HTTP 상태 코드.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl AuthError {
    /// 에러 응답 본문 생성. 거부 사유별 카운터도 함께 기록합니다.
    pub fn to_error_response(&self) -> (StatusCode, ApiErrorResponse) {
        let status = self.status_code();
        let code = match status {
            StatusCode::FORBIDDEN => codes::FORBIDDEN,
            StatusCode::UNAUTHORIZED => codes::UNAUTHENTICATED,
            _ => codes::INTERNAL_ERROR,
        };

        record_auth_rejection(self.reason());

        let message = match self {
            // 저장소 상세는 외부로 노출하지 않음
            Self::Store(e) => {
                error!(error = %e, "Credential store failure during authentication");
                "요청을 처리할 수 없습니다".to_string()
            }
            other => other.to_string(),
        };

        (status, ApiErrorResponse::new(code, message))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, body) = self.to_error_response();
        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for (StatusCode, Json<ApiErrorResponse>) {
    fn from(e: AuthError) -> Self {
        let (status, body) = e.to_error_response();
        (status, Json(body))
    }
}

/// 인증 게이트.
///
/// 요청당 저장소 조회는 계정 조회 한 번뿐이며, 공유 상태는 읽기 전용 키 재료뿐입니다.
pub struct Authenticator {
    validator: TokenValidator,
    store: Arc<dyn AccountStore>,
    policy: SessionPolicy,
}

impl Authenticator {
    /// 새 인증 게이트 생성.
    pub fn new(
        validator: TokenValidator,
        store: Arc<dyn AccountStore>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            validator,
            store,
            policy,
        }
    }

    /// 현재 세션 정책.
    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// 헤더에서 계정을 인증합니다.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Account, AuthError> {
        self.authenticate_at(headers, Utc::now()).await
    }

    /// 주어진 시각 기준으로 인증합니다.
    pub async fn authenticate_at(
        &self,
        headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> Result<Account, AuthError> {
        let token = extract_token(headers)?;

        let claims = self
            .validator
            .parse_at(token, now)
            .map_err(AuthError::InvalidToken)?;

        let account = self
            .store
            .find_by_id(claims.id)
            .await?
            .ok_or(AuthError::UnknownAccount)?;

        if self.policy == SessionPolicy::SingleSession {
            let session = account
                .session
                .as_ref()
                .ok_or(AuthError::NoActiveSession)?;
            if !session.matches(token) {
                return Err(AuthError::SessionSuperseded);
            }
            if session.is_expired_at(now) {
                return Err(AuthError::SessionExpired);
            }
        }

        Ok(account)
    }
}

/// `Authorization` 헤더에서 토큰 추출. `Bearer ` 접두사는 선택입니다.
fn extract_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?
        .to_str()
        .map_err(|_| {
            AuthError::InvalidToken(TokenError::Malformed(
                "Authorization 헤더에 허용되지 않는 문자가 있습니다".to_string(),
            ))
        })?
        .trim_start();

    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    Ok(token)
}

/// 인증 미들웨어.
///
/// 성공 시 [`Account`]를 요청 Extensions에 넣고 다음 핸들러로 진행합니다.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let result = state.auth.authenticate(request.headers()).await;
    match result {
        Ok(account) => {
            debug!(account_id = account.id, "Request authenticated");
            request.extensions_mut().insert(account);
            Ok(next.run(request).await)
        }
        Err(e) => {
            warn!(
                reason = e.reason(),
                path = %request.uri().path(),
                error = ?e,
                "Authentication rejected"
            );
            Err(e)
        }
    }
}

/// 관리자 전용 미들웨어.
///
/// `require_auth` 다음에 적용해야 합니다. 인증 정보가 없으면 403으로 거부합니다.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AuthError> {
    let Some(account) = request.extensions().get::<Account>() else {
        warn!(path = %request.uri().path(), "Admin gate reached without principal");
        return Err(AuthError::Forbidden);
    };

    if !account.is_admin() {
        warn!(
            account_id = account.id,
            role = %account.role,
            path = %request.uri().path(),
            "Admin access denied"
        );
        return Err(AuthError::Forbidden);
    }

    Ok(next.run(request).await)
}

/// 인증된 계정 추출기.
///
/// ```rust,ignore
/// async fn me(CurrentAccount(account): CurrentAccount) -> impl IntoResponse {
///     Json(account.summary())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub Account);

impl<S> FromRequestParts<S> for CurrentAccount
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Account>()
            .cloned()
            .map(CurrentAccount)
            .ok_or(AuthError::MissingCredential)
    }
}

/// 권한 확인.
pub fn require_permission(account: &Account, permission: Permission) -> Result<(), AuthError> {
    if account.role.has_permission(permission) {
        Ok(())
    } else {
        debug!(
            account_id = account.id,
            permission = permission.description(),
            "Permission denied"
        );
        Err(AuthError::Forbidden)
    }
}

/// 본인 또는 관리자만 허용.
pub fn ensure_self_or_admin(account: &Account, target: AccountId) -> Result<(), AuthError> {
    if account.id == target {
        return Ok(());
    }
    require_permission(account, Permission::ManageAccounts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use botanical_core::{ActiveSession, MemoryAccountStore, NewAccount, Role};
    use chrono::Duration;
    use secrecy::SecretString;

    use crate::auth::jwt::TokenIssuer;

    const SECRET: &str = "middleware-test-secret";

    fn account_with_role(id: AccountId, role: Role) -> Account {
        let now = Utc::now();
        Account {
            id,
            username: "tester".to_string(),
            phone: format!("1380000000{id}"),
            password_hash: "$argon2id$stub".to_string(),
            role,
            session: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    async fn setup(policy: SessionPolicy) -> (Authenticator, TokenIssuer, Arc<MemoryAccountStore>, Account) {
        let store = Arc::new(MemoryAccountStore::new());
        let account = store
            .create(NewAccount {
                username: "tester".to_string(),
                phone: "13800000001".to_string(),
                password_hash: "$argon2id$stub".to_string(),
                role: Role::MEMBER,
            })
            .await
            .unwrap();
        let auth = Authenticator::new(
            TokenValidator::new(SecretString::from(SECRET.to_string()), "botanical-api"),
            store.clone(),
            policy,
        );
        let issuer = TokenIssuer::new(SecretString::from(SECRET.to_string()), "botanical-api");
        (auth, issuer, store, account)
    }

    async fn login(issuer: &TokenIssuer, store: &MemoryAccountStore, id: AccountId) -> String {
        let issued = issuer.issue(id, "tester", 1).unwrap();
        store
            .persist_token(id, &ActiveSession::new(issued.token.clone(), issued.expires_at))
            .await
            .unwrap();
        issued.token
    }

    #[test]
    fn test_extract_token_variants() {
        assert!(matches!(
            extract_token(&HeaderMap::new()),
            Err(AuthError::MissingCredential)
        ));

        assert_eq!(extract_token(&bearer("abc")).unwrap(), "abc");

        let mut raw = HeaderMap::new();
        raw.insert(AUTHORIZATION, HeaderValue::from_static("abc"));
        assert_eq!(extract_token(&raw).unwrap(), "abc");

        let mut empty = HeaderMap::new();
        empty.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(matches!(extract_token(&empty), Err(AuthError::MissingCredential)));

        let mut padded = HeaderMap::new();
        padded.insert(AUTHORIZATION, HeaderValue::from_static("  Bearer abc  "));
        assert_eq!(extract_token(&padded).unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_authenticate_current_token() {
        let (auth, issuer, store, account) = setup(SessionPolicy::SingleSession).await;
        let token = login(&issuer, &store, account.id).await;

        let principal = auth.authenticate(&bearer(&token)).await.unwrap();
        assert_eq!(principal.id, account.id);
    }

    #[tokio::test]
    async fn test_single_session_rejects_superseded_token() {
        let (auth, issuer, store, account) = setup(SessionPolicy::SingleSession).await;
        let first = login(&issuer, &store, account.id).await;
        let second = login(&issuer, &store, account.id).await;

        assert!(matches!(
            auth.authenticate(&bearer(&first)).await,
            Err(AuthError::SessionSuperseded)
        ));
        assert!(auth.authenticate(&bearer(&second)).await.is_ok());
    }

    #[tokio::test]
    async fn test_stateless_accepts_superseded_token() {
        let (auth, issuer, store, account) = setup(SessionPolicy::Stateless).await;
        let first = login(&issuer, &store, account.id).await;
        let _second = login(&issuer, &store, account.id).await;

        assert!(auth.authenticate(&bearer(&first)).await.is_ok());
    }

    #[tokio::test]
    async fn test_single_session_requires_stored_session() {
        let (auth, issuer, _store, account) = setup(SessionPolicy::SingleSession).await;
        let never_persisted = issuer.issue(account.id, "tester", 1).unwrap();

        assert!(matches!(
            auth.authenticate(&bearer(&never_persisted.token)).await,
            Err(AuthError::NoActiveSession)
        ));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let (auth, issuer, store, account) = setup(SessionPolicy::SingleSession).await;
        let token = login(&issuer, &store, account.id).await;

        let later = Utc::now() + Duration::hours(2);
        assert!(matches!(
            auth.authenticate_at(&bearer(&token), later).await,
            Err(AuthError::InvalidToken(TokenError::Expired))
        ));
    }

    #[tokio::test]
    async fn test_unknown_account_rejected() {
        let (auth, issuer, _store, _account) = setup(SessionPolicy::Stateless).await;
        let orphan = issuer.issue(404, "ghost", 1).unwrap();

        assert!(matches!(
            auth.authenticate(&bearer(&orphan.token)).await,
            Err(AuthError::UnknownAccount)
        ));
    }

    #[tokio::test]
    async fn test_orphaned_token_looks_like_invalid_token() {
        let (auth, issuer, _store, _account) = setup(SessionPolicy::SingleSession).await;
        let orphan = issuer.issue(404, "ghost", 1).unwrap();

        let orphan_err = auth.authenticate(&bearer(&orphan.token)).await.unwrap_err();
        let garbage_err = auth.authenticate(&bearer("garbage")).await.unwrap_err();
        assert_eq!(orphan_err.reason(), "unknown_account");
        assert_eq!(garbage_err.reason(), "malformed");

        let (orphan_status, orphan_body) = orphan_err.to_error_response();
        let (garbage_status, garbage_body) = garbage_err.to_error_response();
        assert_eq!(orphan_status, garbage_status);
        assert_eq!(orphan_body.code(), garbage_body.code());
        assert_eq!(orphan_body.message(), garbage_body.message());
        assert_eq!(orphan_body.details, garbage_body.details);

        let expired = issuer.issue_at(1, "tester", 1, Utc::now() - Duration::hours(3)).unwrap();
        let (_, expired_body) = auth
            .authenticate(&bearer(&expired.token))
            .await
            .unwrap_err()
            .to_error_response();
        assert_eq!(expired_body.message(), orphan_body.message());
    }

    #[tokio::test]
    async fn test_admin_gate_without_principal_is_forbidden() {
        use axum::{body::Body, middleware, routing::get, Router};
        use tower::ServiceExt;

        let app = Router::new()
            .route("/admin", get(|| async { "ok" }))
            .route_layer(middleware::from_fn(require_admin));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/admin")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ApiErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.code(), codes::FORBIDDEN);
    }

    #[test]
    fn test_self_or_admin() {
        let member = account_with_role(1, Role::MEMBER);
        let admin = account_with_role(2, Role::ADMIN);

        assert!(ensure_self_or_admin(&member, 1).is_ok());
        assert!(matches!(ensure_self_or_admin(&member, 2), Err(AuthError::Forbidden)));
        assert!(ensure_self_or_admin(&admin, 1).is_ok());
    }

    #[test]
    fn test_auth_error_status_codes() {
        let unauthenticated = vec![
            AuthError::MissingCredential,
            AuthError::InvalidToken(TokenError::Expired),
            AuthError::InvalidToken(TokenError::NotYetValid),
            AuthError::InvalidToken(TokenError::Malformed("bad".to_string())),
            AuthError::UnknownAccount,
            AuthError::NoActiveSession,
            AuthError::SessionExpired,
            AuthError::SessionSuperseded,
        ];
        for error in unauthenticated {
            assert_eq!(error.into_response().status(), StatusCode::UNAUTHORIZED);
        }

        assert_eq!(
            AuthError::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthError::Store(StoreError::Backend("down".to_string()))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
