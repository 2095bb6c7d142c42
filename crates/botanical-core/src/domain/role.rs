//! 역할 기반 접근 제어 (RBAC).
//!
//! 계정 역할 마커 및 권한 정의.

use serde::{Deserialize, Serialize};

/// 계정 역할 마커.
///
/// 저장소에는 작은 정수로 저장됩니다. `9`는 관리자이며,
/// 그 외 모든 값은 일반 권한으로 취급합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
pub struct Role(i16);

impl Role {
    /// 일반 회원 (가입 시 기본값)
    pub const MEMBER: Role = Role(1);
    /// 관리자
    pub const ADMIN: Role = Role(9);

    /// 저장된 정수 값에서 역할 생성.
    pub const fn from_raw(value: i16) -> Self {
        Self(value)
    }

    /// 저장용 정수 값.
    pub const fn raw(self) -> i16 {
        self.0
    }

    /// 관리자 여부.
    pub fn is_admin(self) -> bool {
        self == Self::ADMIN
    }

    /// 역할이 특정 권한을 가지는지 확인.
    pub fn has_permission(self, permission: Permission) -> bool {
        match permission {
            Permission::ViewAccounts => true,
            Permission::ManageAccounts => self.is_admin(),
        }
    }

    /// 로그용 역할 이름.
    pub fn label(self) -> &'static str {
        match self.0 {
            9 => "admin",
            2 => "vip",
            1 => "member",
            _ => "custom",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::MEMBER
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.label(), self.0)
    }
}

/// 시스템 권한.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// 다른 계정의 공개 프로필 조회
    ViewAccounts,
    /// 다른 계정의 비밀번호 변경, 계정 삭제
    ManageAccounts,
}

impl Permission {
    /// 권한에 대한 설명 반환.
    pub fn description(&self) -> &'static str {
        match self {
            Permission::ViewAccounts => "계정 조회",
            Permission::ManageAccounts => "계정 관리",
        }
    }
}
