//! Account Repository
//!
//! `users` 테이블에 대한 [`AccountStore`] PostgreSQL 구현입니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::info;

use botanical_core::{
    Account, AccountId, AccountStore, ActiveSession, NewAccount, Role, StoreError, StoreResult,
};

// ================================================================================================
// Types
// ================================================================================================

/// `users` 테이블 행.
#[derive(Debug, Clone, FromRow)]
struct AccountRow {
    id: i64,
    username: String,
    phone: String,
    password_hash: String,
    user_role: i16,
    #[sqlx(default)]
    token: Option<String>,
    #[sqlx(default)]
    token_expire_time: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            phone: row.phone,
            password_hash: row.password_hash,
            role: Role::from_raw(row.user_role),
            session: ActiveSession::from_columns(row.token, row.token_expire_time),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const ACCOUNT_COLUMNS: &str = "id, username, phone, password_hash, user_role, \
     token, token_expire_time, created_at, updated_at";

/// 유니크 제약 위반 SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

// ================================================================================================
// Repository
// ================================================================================================

/// PostgreSQL 자격증명 저장소.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    /// 연결 풀로 저장소 생성.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 내부 연결 풀.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// `users` 스키마 마이그레이션 실행.
    pub async fn migrate(&self) -> StoreResult<()> {
        info!("Running database migrations...");

        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migration failed: {e}")))?;

        info!("Migrations completed successfully");
        Ok(())
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_id(&self, id: AccountId) -> StoreResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        Ok(row.map(Account::from))
    }

    async fn find_by_phone(&self, phone: &str) -> StoreResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE phone <> '' AND phone = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        Ok(row.map(Account::from))
    }

    async fn exists_by_phone(&self, phone: &str) -> StoreResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM users WHERE phone <> '' AND phone = $1)",
        )
        .bind(phone)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        Ok(exists)
    }

    async fn create(&self, account: NewAccount) -> StoreResult<Account> {
        let sql = format!(
            r#"
            INSERT INTO users (username, phone, password_hash, user_role)
            VALUES ($1, $2, $3, $4)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(&account.username)
            .bind(&account.phone)
            .bind(&account.password_hash)
            .bind(account.role.raw())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                let duplicate = matches!(
                    &e,
                    sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION)
                );
                if duplicate {
                    StoreError::Duplicate(account.phone.clone())
                } else {
                    backend(e)
                }
            })?;

        Ok(row.into())
    }

    async fn persist_token(&self, id: AccountId, session: &ActiveSession) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET token = $2, token_expire_time = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&session.token)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn persist_password_hash(&self, id: AccountId, password_hash: &str) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn update_profile(&self, id: AccountId, username: &str) -> StoreResult<Option<Account>> {
        let sql = format!(
            r#"
            UPDATE users SET username = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        Ok(row.map(Account::from))
    }

    async fn delete(&self, id: AccountId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(backend)
    }
}
