//! 계정 생명주기 연산.
//!
//! 가입, 로그인(토큰 발급 및 저장), 비밀번호 변경, 프로필 수정, 삭제.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, info, warn};

use botanical_core::{
    Account, AccountId, AccountStore, ActiveSession, NewAccount, Role, StoreError,
};

use super::jwt::{IssuedToken, TokenError, TokenIssuer};
use super::password::{
    hash_password, validate_password_strength, verify_password, PasswordError,
    PasswordPolicyViolation,
};
use crate::error::{codes, ApiErrorResponse};
use crate::metrics::record_login;

/// 계정 연산 에러.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    PasswordPolicy(#[from] PasswordPolicyViolation),
    #[error("이미 등록된 전화번호입니다")]
    AccountExists,
    /// 알 수 없는 전화번호와 잘못된 비밀번호를 구분하지 않음
    #[error("전화번호 또는 비밀번호가 올바르지 않습니다")]
    CredentialFailure,
    #[error("계정을 찾을 수 없습니다: {0}")]
    NotFound(AccountId),
    #[error("비밀번호 처리 실패")]
    Hashing(#[from] PasswordError),
    #[error("토큰 발급 실패")]
    Token(#[from] TokenError),
    #[error("계정 저장소 에러")]
    Store(StoreError),
}

impl From<StoreError> for AccountError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(_) => Self::AccountExists,
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

impl AccountError {
    /// HTTP 상태 코드와 에러 코드.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) | Self::PasswordPolicy(_) => {
                (StatusCode::BAD_REQUEST, codes::VALIDATION_FAILED)
            }
            Self::AccountExists => (StatusCode::CONFLICT, codes::ACCOUNT_EXISTS),
            Self::CredentialFailure => (StatusCode::BAD_REQUEST, codes::INVALID_CREDENTIALS),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, codes::NOT_FOUND),
            Self::Hashing(_) | Self::Token(_) | Self::Store(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, codes::INTERNAL_ERROR)
            }
        }
    }
}

impl AccountError {
    /// 에러 응답 본문 생성. 내부 실패는 여기서 error 레벨로 기록합니다.
    pub fn to_error_response(&self) -> (StatusCode, ApiErrorResponse) {
        let (status, code) = self.status_and_code();

        let body = match self {
            Self::PasswordPolicy(violation) => ApiErrorResponse::with_details(
                code,
                violation.to_string(),
                json!({ "rule": violation.rule() }),
            ),
            Self::Hashing(e) => {
                error!(error = %e, "Password hashing failed");
                ApiErrorResponse::new(code, self.to_string())
            }
            Self::Token(e) => {
                error!(error = %e, "Token signing failed");
                ApiErrorResponse::new(code, self.to_string())
            }
            Self::Store(e) => {
                error!(error = %e, "Credential store failure");
                ApiErrorResponse::new(code, self.to_string())
            }
            _ => ApiErrorResponse::new(code, self.to_string()),
        };

        (status, body)
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let (status, body) = self.to_error_response();
        (status, Json(body)).into_response()
    }
}

impl From<AccountError> for (StatusCode, Json<ApiErrorResponse>) {
    fn from(e: AccountError) -> Self {
        let (status, body) = e.to_error_response();
        (status, Json(body))
    }
}

/// 가입 입력.
pub struct Registration<'a> {
    pub username: &'a str,
    pub phone: &'a str,
    pub password: &'a str,
}

/// 계정 생명주기 서비스.
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    issuer: TokenIssuer,
    ttl_hours: i64,
}

impl AccountService {
    /// 새 서비스 생성.
    pub fn new(store: Arc<dyn AccountStore>, issuer: TokenIssuer, ttl_hours: i64) -> Self {
        Self {
            store,
            issuer,
            ttl_hours,
        }
    }

    /// 토큰 유효 시간 (시간).
    pub fn ttl_hours(&self) -> i64 {
        self.ttl_hours
    }

    /// 계정 가입.
    ///
    /// 중복 확인 → 강도 정책 → 해싱 → 저장(기본 역할, 활성 토큰 없음) 순서입니다.
    /// 정책 위반이면 행을 만들지 않습니다.
    pub async fn register(&self, input: Registration<'_>) -> Result<Account, AccountError> {
        let phone = input.phone.trim();
        let username = input.username.trim();
        if phone.is_empty() {
            return Err(AccountError::Validation("전화번호는 필수입니다".to_string()));
        }
        if username.is_empty() {
            return Err(AccountError::Validation(
                "사용자 이름은 비어 있을 수 없습니다".to_string(),
            ));
        }

        if self.store.exists_by_phone(phone).await? {
            return Err(AccountError::AccountExists);
        }

        validate_password_strength(input.password)?;
        let password_hash = hash_password(input.password)?;

        let account = self
            .store
            .create(NewAccount {
                username: username.to_string(),
                phone: phone.to_string(),
                password_hash,
                role: Role::default(),
            })
            .await?;

        info!(account_id = account.id, "Account registered");
        Ok(account)
    }

    /// 로그인.
    ///
    /// 성공 시 새 토큰을 발급하고 저장소의 이전 세션을 덮어씁니다.
    pub async fn login(
        &self,
        phone: &str,
        password: &str,
    ) -> Result<(IssuedToken, Account), AccountError> {
        let Some(mut account) = self.store.find_by_phone(phone).await? else {
            record_login("unknown_phone");
            warn!("Login failed: unknown phone");
            return Err(AccountError::CredentialFailure);
        };

        if !verify_password(&account.password_hash, password) {
            record_login("wrong_password");
            warn!(account_id = account.id, "Login failed: password mismatch");
            return Err(AccountError::CredentialFailure);
        }

        let issued = self.open_session(&account).await?;
        account.session = Some(ActiveSession::new(issued.token.clone(), issued.expires_at));

        record_login("success");
        info!(account_id = account.id, expires_at = %issued.expires_at, "Login succeeded");
        Ok((issued, account))
    }

    /// 토큰을 발급하고 계정의 활성 세션으로 저장합니다.
    pub async fn open_session(&self, account: &Account) -> Result<IssuedToken, AccountError> {
        let issued = self
            .issuer
            .issue(account.id, &account.username, self.ttl_hours)?;

        self.store
            .persist_token(
                account.id,
                &ActiveSession::new(issued.token.clone(), issued.expires_at),
            )
            .await?;

        Ok(issued)
    }

    /// 비밀번호 변경.
    ///
    /// 호출자 권한(본인 또는 관리자)은 핸들러에서 확인합니다.
    /// 기존 비밀번호가 틀리면 해시는 바뀌지 않으며, 토큰은 재발급하지 않습니다.
    pub async fn change_password(
        &self,
        account_id: AccountId,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        let account = self.get_account(account_id).await?;

        if !verify_password(&account.password_hash, old_password) {
            warn!(account_id, "Password change rejected: old password mismatch");
            return Err(AccountError::CredentialFailure);
        }

        validate_password_strength(new_password)?;
        let password_hash = hash_password(new_password)?;

        self.store
            .persist_password_hash(account_id, &password_hash)
            .await?;

        info!(account_id, "Password changed");
        Ok(())
    }

    /// ID로 계정 조회.
    pub async fn get_account(&self, account_id: AccountId) -> Result<Account, AccountError> {
        self.store
            .find_by_id(account_id)
            .await?
            .ok_or(AccountError::NotFound(account_id))
    }

    /// 표시 이름 변경.
    pub async fn update_profile(
        &self,
        account_id: AccountId,
        username: &str,
    ) -> Result<Account, AccountError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AccountError::Validation(
                "사용자 이름은 비어 있을 수 없습니다".to_string(),
            ));
        }

        self.store
            .update_profile(account_id, username)
            .await?
            .ok_or(AccountError::NotFound(account_id))
    }

    /// 계정 삭제.
    pub async fn delete_account(&self, account_id: AccountId) -> Result<(), AccountError> {
        if self.store.delete(account_id).await? {
            info!(account_id, "Account deleted");
            Ok(())
        } else {
            Err(AccountError::NotFound(account_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botanical_core::MemoryAccountStore;
    use secrecy::SecretString;

    use crate::auth::jwt::TokenValidator;

    const SECRET: &str = "service-test-secret";

    fn service() -> (AccountService, Arc<MemoryAccountStore>) {
        let store = Arc::new(MemoryAccountStore::new());
        let issuer = TokenIssuer::new(SecretString::from(SECRET.to_string()), "botanical-api");
        (AccountService::new(store.clone(), issuer, 24), store)
    }

    fn registration<'a>(phone: &'a str, password: &'a str) -> Registration<'a> {
        Registration {
            username: "zhangsan",
            phone,
            password,
        }
    }

    #[tokio::test]
    async fn test_register_defaults() {
        let (service, _store) = service();
        let account = service
            .register(registration("13800000001", "abc123"))
            .await
            .unwrap();

        assert_eq!(account.role, Role::MEMBER);
        assert!(account.session.is_none());
        assert!(!account.password_hash.is_empty());
        assert_ne!(account.password_hash, "abc123");
    }

    #[tokio::test]
    async fn test_register_blank_identity_rejected() {
        let (service, store) = service();

        let blank_phone = Registration {
            username: "zhangsan",
            phone: "   ",
            password: "abc123",
        };
        assert!(matches!(
            service.register(blank_phone).await,
            Err(AccountError::Validation(_))
        ));

        let blank_name = Registration {
            username: " \t ",
            phone: "13800000001",
            password: "abc123",
        };
        assert!(matches!(
            service.register(blank_name).await,
            Err(AccountError::Validation(_))
        ));

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_register_trims_identity() {
        let (service, _store) = service();
        let account = service
            .register(Registration {
                username: "  zhangsan ",
                phone: " 13800000001 ",
                password: "abc123",
            })
            .await
            .unwrap();

        assert_eq!(account.phone, "13800000001");
        assert_eq!(account.username, "zhangsan");
    }

    #[tokio::test]
    async fn test_register_weak_password_creates_no_row() {
        let (service, store) = service();
        let result = service.register(registration("13800000001", "abcdef")).await;

        assert!(matches!(
            result,
            Err(AccountError::PasswordPolicy(PasswordPolicyViolation::MissingDigit))
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_register_duplicate_phone() {
        let (service, store) = service();
        service
            .register(registration("13800000001", "abc123"))
            .await
            .unwrap();

        let result = service.register(registration("13800000001", "xyz789")).await;
        assert!(matches!(result, Err(AccountError::AccountExists)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_login_persists_session() {
        let (service, store) = service();
        let account = service
            .register(registration("13800000001", "abc123"))
            .await
            .unwrap();

        let (issued, logged_in) = service.login("13800000001", "abc123").await.unwrap();
        assert_eq!(logged_in.id, account.id);

        let stored = store.find_by_id(account.id).await.unwrap().unwrap();
        let session = stored.session.unwrap();
        assert!(session.matches(&issued.token));
        assert_eq!(session.expires_at, issued.expires_at);

        let validator =
            TokenValidator::new(SecretString::from(SECRET.to_string()), "botanical-api");
        assert_eq!(validator.parse(&issued.token).unwrap().id, account.id);
    }

    #[tokio::test]
    async fn test_login_failures_are_generic() {
        let (service, _store) = service();
        service
            .register(registration("13800000001", "abc123"))
            .await
            .unwrap();

        let unknown = service.login("13900000000", "abc123").await.unwrap_err();
        let wrong = service.login("13800000001", "abc124").await.unwrap_err();

        assert!(matches!(unknown, AccountError::CredentialFailure));
        assert!(matches!(wrong, AccountError::CredentialFailure));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_change_password_wrong_old_keeps_hash() {
        let (service, store) = service();
        let account = service
            .register(registration("13800000001", "abc123"))
            .await
            .unwrap();

        let result = service.change_password(account.id, "wrong1", "new456").await;
        assert!(matches!(result, Err(AccountError::CredentialFailure)));

        let stored = store.find_by_id(account.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, account.password_hash);
    }

    #[tokio::test]
    async fn test_change_password_success_keeps_session() {
        let (service, store) = service();
        let account = service
            .register(registration("13800000001", "abc123"))
            .await
            .unwrap();
        let (issued, _) = service.login("13800000001", "abc123").await.unwrap();

        service
            .change_password(account.id, "abc123", "new456")
            .await
            .unwrap();

        assert!(service.login("13800000001", "abc123").await.is_err());
        let stored = store.find_by_id(account.id).await.unwrap().unwrap();
        assert!(verify_password(&stored.password_hash, "new456"));
        // 비밀번호 변경은 토큰을 재발급하지 않음
        assert!(stored.session.unwrap().matches(&issued.token));
    }

    #[tokio::test]
    async fn test_change_password_policy_on_new() {
        let (service, _store) = service();
        let account = service
            .register(registration("13800000001", "abc123"))
            .await
            .unwrap();

        let result = service.change_password(account.id, "abc123", "short").await;
        assert!(matches!(
            result,
            Err(AccountError::PasswordPolicy(PasswordPolicyViolation::Length))
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (service, _store) = service();
        let account = service
            .register(registration("13800000001", "abc123"))
            .await
            .unwrap();

        let updated = service.update_profile(account.id, " lisi ").await.unwrap();
        assert_eq!(updated.username, "lisi");
        assert!(matches!(
            service.update_profile(account.id, "   ").await,
            Err(AccountError::Validation(_))
        ));

        service.delete_account(account.id).await.unwrap();
        assert!(matches!(
            service.delete_account(account.id).await,
            Err(AccountError::NotFound(_))
        ));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AccountError::CredentialFailure.status_and_code(),
            (StatusCode::BAD_REQUEST, codes::INVALID_CREDENTIALS)
        );
        assert_eq!(
            AccountError::from(StoreError::Duplicate("1".to_string())).status_and_code(),
            (StatusCode::CONFLICT, codes::ACCOUNT_EXISTS)
        );
        assert_eq!(
            AccountError::Hashing(PasswordError::HashingFailed("rng".to_string()))
                .status_and_code()
                .0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
