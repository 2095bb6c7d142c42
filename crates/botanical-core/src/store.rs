//! 자격증명 저장소 추상화.
//!
//! 계정 레코드의 조회 및 조건부 갱신을 위한 저장소 중립적인 인터페이스와
//! 개발/테스트용 인메모리 구현을 제공합니다.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::{Account, AccountId, ActiveSession, NewAccount};
use crate::error::{StoreError, StoreResult};

// =============================================================================
// AccountStore Trait
// =============================================================================

/// 자격증명 저장소 trait.
///
/// 인증 코어는 이 trait를 통해서만 계정 레코드에 접근합니다.
/// 행 단위 원자성은 구현체(스토리지 엔진)에 위임하며,
/// 동시 로그인 경합은 마지막 쓰기가 이깁니다.
///
/// # 구현 예시
///
/// ```ignore
/// pub struct PgAccountStore {
///     pool: PgPool,
/// }
///
/// #[async_trait]
/// impl AccountStore for PgAccountStore {
///     async fn find_by_id(&self, id: AccountId) -> StoreResult<Option<Account>> {
///         // SELECT ... WHERE id = $1
///     }
///
///     // ... 나머지 메서드 구현
/// }
/// ```
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// ID로 계정 조회.
    async fn find_by_id(&self, id: AccountId) -> StoreResult<Option<Account>>;

    /// 로그인 키(전화번호)로 계정 조회.
    async fn find_by_phone(&self, phone: &str) -> StoreResult<Option<Account>>;

    /// 로그인 키 존재 여부.
    async fn exists_by_phone(&self, phone: &str) -> StoreResult<bool>;

    /// 새 계정 저장.
    ///
    /// # Errors
    ///
    /// - `StoreError::Duplicate`: 같은 전화번호가 이미 존재
    async fn create(&self, account: NewAccount) -> StoreResult<Account>;

    /// 발급된 토큰과 만료 시각을 함께 기록 (이전 세션은 덮어씀).
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound`: 계정이 존재하지 않음
    async fn persist_token(&self, id: AccountId, session: &ActiveSession) -> StoreResult<()>;

    /// 비밀번호 해시 갱신.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound`: 계정이 존재하지 않음
    async fn persist_password_hash(&self, id: AccountId, password_hash: &str) -> StoreResult<()>;

    /// 표시 이름 갱신. 계정이 없으면 `None`.
    async fn update_profile(&self, id: AccountId, username: &str) -> StoreResult<Option<Account>>;

    /// 계정 삭제. 삭제된 행이 있으면 `true`.
    async fn delete(&self, id: AccountId) -> StoreResult<bool>;

    /// 저장소 연결 상태 확인 (readiness probe용).
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

// =============================================================================
// 인메모리 구현
// =============================================================================

#[derive(Default)]
struct MemoryInner {
    last_id: AccountId,
    accounts: BTreeMap<AccountId, Account>,
}

/// 인메모리 자격증명 저장소.
///
/// 데이터베이스가 설정되지 않은 개발 환경과 테스트에서 사용합니다.
#[derive(Default)]
pub struct MemoryAccountStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryAccountStore {
    /// 빈 저장소 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 계정 수.
    pub async fn len(&self) -> usize {
        self.inner.read().await.accounts.len()
    }

    /// 저장소가 비어 있는지 확인.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.accounts.is_empty()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_id(&self, id: AccountId) -> StoreResult<Option<Account>> {
        Ok(self.inner.read().await.accounts.get(&id).cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> StoreResult<Option<Account>> {
        let inner = self.inner.read().await;
        Ok(inner
            .accounts
            .values()
            .find(|a| !a.phone.is_empty() && a.phone == phone)
            .cloned())
    }

    async fn exists_by_phone(&self, phone: &str) -> StoreResult<bool> {
        Ok(self.find_by_phone(phone).await?.is_some())
    }

    async fn create(&self, account: NewAccount) -> StoreResult<Account> {
        let mut inner = self.inner.write().await;

        if inner.accounts.values().any(|a| a.phone == account.phone) {
            return Err(StoreError::Duplicate(account.phone));
        }

        inner.last_id += 1;
        let now = Utc::now();
        let record = Account {
            id: inner.last_id,
            username: account.username,
            phone: account.phone,
            password_hash: account.password_hash,
            role: account.role,
            session: None,
            created_at: now,
            updated_at: now,
        };
        inner.accounts.insert(record.id, record.clone());

        Ok(record)
    }

    async fn persist_token(&self, id: AccountId, session: &ActiveSession) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let account = inner.accounts.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        account.session = Some(session.clone());
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn persist_password_hash(&self, id: AccountId, password_hash: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let account = inner.accounts.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        account.password_hash = password_hash.to_string();
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn update_profile(&self, id: AccountId, username: &str) -> StoreResult<Option<Account>> {
        let mut inner = self.inner.write().await;
        Ok(inner.accounts.get_mut(&id).map(|account| {
            account.username = username.to_string();
            account.updated_at = Utc::now();
            account.clone()
        }))
    }

    async fn delete(&self, id: AccountId) -> StoreResult<bool> {
        Ok(self.inner.write().await.accounts.remove(&id).is_some())
    }
}
