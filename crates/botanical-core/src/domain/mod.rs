//! 계정 관리를 위한 도메인 모델.

mod account;
mod role;

pub use account::*;
pub use role::*;
