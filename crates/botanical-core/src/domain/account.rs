//! 계정 모델.
//!
//! 저장소에 보관되는 계정 레코드와 외부로 노출되는 요약 타입을 정의합니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Role;

/// 계정 식별자.
pub type AccountId = i64;

/// 현재 발급된 토큰과 그 만료 시각.
///
/// 토큰과 만료 시각은 항상 함께 설정되고 함께 해제됩니다.
#[derive(Clone, PartialEq, Eq)]
pub struct ActiveSession {
    /// 발급된 토큰 문자열
    pub token: String,
    /// 토큰 만료 시각
    pub expires_at: DateTime<Utc>,
}

impl ActiveSession {
    /// 새 세션 생성.
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// 저장소 컬럼 쌍에서 세션 복원.
    ///
    /// 둘 중 하나라도 비어 있으면 세션이 없는 것으로 간주합니다.
    pub fn from_columns(token: Option<String>, expires_at: Option<DateTime<Utc>>) -> Option<Self> {
        match (token, expires_at) {
            (Some(token), Some(expires_at)) if !token.is_empty() => Some(Self { token, expires_at }),
            _ => None,
        }
    }

    /// 주어진 시각 기준 만료 여부.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// 제시된 토큰이 현재 발급된 토큰인지 확인.
    pub fn matches(&self, presented: &str) -> bool {
        self.token == presented
    }
}

impl std::fmt::Debug for ActiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSession")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// 계정 레코드.
#[derive(Clone, Serialize, Deserialize)]
pub struct Account {
    /// 계정 ID
    pub id: AccountId,
    /// 표시 이름
    pub username: String,
    /// 전화번호 (로그인 키)
    pub phone: String,
    /// 비밀번호 해시 (외부로 직렬화하지 않음)
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// 역할 마커
    #[serde(rename = "user_role")]
    pub role: Role,
    /// 현재 활성 세션
    #[serde(skip)]
    pub session: Option<ActiveSession>,
    /// 생성 시각
    pub created_at: DateTime<Utc>,
    /// 수정 시각
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// 관리자 여부.
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// 민감 정보를 제외한 요약.
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            username: self.username.clone(),
            phone: self.phone.clone(),
            user_role: self.role,
        }
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("phone", &self.phone)
            .field("role", &self.role)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// 계정 요약 (응답용, 민감 필드 없음).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
pub struct AccountSummary {
    /// 계정 ID
    pub id: AccountId,
    /// 표시 이름
    pub username: String,
    /// 전화번호
    pub phone: String,
    /// 역할 (1: 일반, 2: VIP, 9: 관리자)
    pub user_role: Role,
}

/// 새 계정 입력 (해시 계산이 끝난 상태).
#[derive(Clone)]
pub struct NewAccount {
    pub username: String,
    pub phone: String,
    pub password_hash: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_account() -> Account {
        let now = Utc::now();
        Account {
            id: 7,
            username: "zhangsan".to_string(),
            phone: "13800138000".to_string(),
            password_hash: "$argon2id$v=19$stub".to_string(),
            role: Role::MEMBER,
            session: Some(ActiveSession::new("header.payload.sig", now + Duration::hours(1))),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_session_columns_set_together() {
        let at = Utc::now();
        assert!(ActiveSession::from_columns(Some("t".into()), Some(at)).is_some());
        assert!(ActiveSession::from_columns(Some("t".into()), None).is_none());
        assert!(ActiveSession::from_columns(None, Some(at)).is_none());
        assert!(ActiveSession::from_columns(Some(String::new()), Some(at)).is_none());
    }

    #[test]
    fn test_session_expiry_boundary() {
        let expires_at = Utc::now();
        let session = ActiveSession::new("t", expires_at);

        assert!(!session.is_expired_at(expires_at - Duration::seconds(1)));
        assert!(session.is_expired_at(expires_at));
        assert!(session.is_expired_at(expires_at + Duration::seconds(1)));
    }

    #[test]
    fn test_account_json_hides_secrets() {
        let json = serde_json::to_string(&sample_account()).unwrap();

        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("header.payload.sig"));
        assert!(json.contains(r#""user_role":1"#));
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", sample_account());
        assert!(!debug.contains("header.payload.sig"));
        assert!(!debug.contains("argon2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_summary() {
        let summary = sample_account().summary();
        assert_eq!(summary.id, 7);
        assert_eq!(summary.user_role, Role::MEMBER);
    }
}
