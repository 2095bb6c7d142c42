//! # Botanical Core
//!
//! 식물 카탈로그 API의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 API 서버 전반에서 사용되는 기본 타입을 제공합니다:
//! - 계정(Account) 및 역할(Role) 모델
//! - 활성 세션(발급된 토큰 + 만료 시각)
//! - 자격증명 저장소 추상화 ([`AccountStore`]) 및 인메모리 구현
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod store;

pub use self::config::*;
pub use self::domain::*;
pub use self::error::*;
pub use self::logging::*;
pub use self::store::{AccountStore, MemoryAccountStore};
