//! 핵심 에러 타입.
//!
//! 자격증명 저장소와 설정 로딩에서 발생하는 에러를 정의합니다.

use thiserror::Error;

use crate::domain::AccountId;

/// 자격증명 저장소 에러.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 대상 계정 없음 (갱신 대상 행이 존재하지 않음)
    #[error("계정을 찾을 수 없습니다: {0}")]
    NotFound(AccountId),

    /// 로그인 키(전화번호) 중복
    #[error("이미 등록된 로그인 키: {0}")]
    Duplicate(String),

    /// 저장소 백엔드 에러 (DB 연결, 쿼리 실패 등)
    #[error("저장소 에러: {0}")]
    Backend(String),
}

/// 저장소 작업을 위한 Result 타입.
pub type StoreResult<T> = Result<T, StoreError>;

/// 설정 에러.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 설정 소스 로딩/역직렬화 실패
    #[error("설정 로딩 실패: {0}")]
    Load(#[from] config::ConfigError),

    /// 설정 값 검증 실패
    #[error("잘못된 설정 값: {0}")]
    Invalid(String),
}
