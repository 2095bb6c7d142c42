//! 인증 및 권한 부여.
//!
//! 토큰 기반 인증, 단일 활성 세션 제어, 역할 기반 접근 제어를 제공합니다.
//!
//! # 구성 요소
//!
//! - [`password`]: Argon2 해싱/검증 및 비밀번호 강도 정책
//! - [`jwt`]: 토큰 발급기([`TokenIssuer`])와 검증기([`TokenValidator`])
//! - [`middleware`]: 인증 게이트, 관리자 게이트, [`CurrentAccount`] 추출기
//! - [`service`]: 가입/로그인/비밀번호 변경 등 계정 생명주기 연산
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! Router::new()
//!     .route("/me", get(me))
//!     .layer(middleware::from_fn_with_state(state.clone(), require_auth));
//!
//! async fn me(CurrentAccount(account): CurrentAccount) -> impl IntoResponse {
//!     Json(account.summary())
//! }
//! ```

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;

pub use botanical_core::{Permission, Role};
pub use jwt::{Claims, IssuedToken, TokenError, TokenIssuer, TokenValidator};
pub use middleware::{
    ensure_self_or_admin, require_admin, require_auth, require_permission, AuthError,
    Authenticator, CurrentAccount, SessionPolicy,
};
pub use password::{
    hash_password, validate_password_strength, verify_password, PasswordError,
    PasswordPolicyViolation,
};
pub use service::{AccountError, AccountService, Registration};
