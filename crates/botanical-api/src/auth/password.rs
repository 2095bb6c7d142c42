//! 비밀번호 해싱 유틸리티.
//!
//! Argon2 기반 비밀번호 해싱/검증과 비밀번호 강도 정책.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// 비밀번호 최소 길이 (문자 수).
pub const PASSWORD_MIN_LEN: usize = 6;
/// 비밀번호 최대 길이 (문자 수).
pub const PASSWORD_MAX_LEN: usize = 20;

/// 해시 계산 에러.
///
/// 엔트로피/메모리 할당 실패처럼 복구할 수 없는 상황에서만 발생합니다.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("비밀번호 해싱 실패: {0}")]
    HashingFailed(String),
}

/// 비밀번호 강도 정책 위반.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PasswordPolicyViolation {
    #[error("비밀번호 길이는 6-20자 사이여야 합니다")]
    Length,
    #[error("비밀번호에 최소 1개의 숫자가 포함되어야 합니다")]
    MissingDigit,
    #[error("비밀번호에 최소 1개의 문자가 포함되어야 합니다")]
    MissingLetter,
}

impl PasswordPolicyViolation {
    /// 위반한 규칙 이름.
    pub fn rule(&self) -> &'static str {
        match self {
            Self::Length => "length",
            Self::MissingDigit => "digit",
            Self::MissingLetter => "letter",
        }
    }
}

/// 비밀번호 해싱.
///
/// 호출마다 새 솔트를 생성하며, 결과는 솔트를 포함한 PHC 문자열입니다.
///
/// ```rust,ignore
/// let hash = hash_password("abc123")?;
/// // "$argon2id$v=19$m=19456,t=2,p=1$..."
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

/// 비밀번호 검증.
///
/// 불일치와 해시 형식 오류 모두 `false`를 반환합니다. 에러를 내지 않습니다.
pub fn verify_password(hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        tracing::warn!("Stored password hash is not a valid PHC string");
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// 비밀번호 강도 검증.
///
/// 해싱 전에 실행되는 별도 가드입니다.
///
/// # 요구사항
///
/// - 6-20자 (바이트가 아닌 문자 수 기준)
/// - 최소 1개의 숫자 (0-9, 위첨자나 분수 문자는 제외)
/// - 최소 1개의 문자(알파벳)
pub fn validate_password_strength(password: &str) -> Result<(), PasswordPolicyViolation> {
    let len = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(PasswordPolicyViolation::Length);
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordPolicyViolation::MissingDigit);
    }

    if !password.chars().any(char::is_alphabetic) {
        return Err(PasswordPolicyViolation::MissingLetter);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("abc123").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert_ne!(hash, "abc123");
        assert!(verify_password(&hash, "abc123"));
        assert!(!verify_password(&hash, "abc124"));
    }

    #[test]
    fn test_same_password_different_hashes() {
        let hash1 = hash_password("Password1").unwrap();
        let hash2 = hash_password("Password1").unwrap();

        // 솔트가 다르므로 해시가 다름
        assert_ne!(hash1, hash2);
        assert!(verify_password(&hash1, "Password1"));
        assert!(verify_password(&hash2, "Password1"));
    }

    #[test]
    fn test_invalid_hash_format_is_mismatch() {
        assert!(!verify_password("not-a-valid-hash", "password1"));
        assert!(!verify_password("", "password1"));
    }

    #[test]
    fn test_password_strength_validation() {
        assert!(validate_password_strength("abc123").is_ok());
        assert!(validate_password_strength("Password1").is_ok());
        assert!(validate_password_strength("a1a1a1a1a1a1a1a1a1a1").is_ok());

        assert_eq!(
            validate_password_strength("ab12"),
            Err(PasswordPolicyViolation::Length)
        );
        assert_eq!(
            validate_password_strength("a1a1a1a1a1a1a1a1a1a1a"),
            Err(PasswordPolicyViolation::Length)
        );
        assert_eq!(
            validate_password_strength("abcdef"),
            Err(PasswordPolicyViolation::MissingDigit)
        );
        assert_eq!(
            validate_password_strength("123456"),
            Err(PasswordPolicyViolation::MissingLetter)
        );
        assert_eq!(validate_password_strength(""), Err(PasswordPolicyViolation::Length));
    }

    #[test]
    fn test_numeric_symbols_are_not_digits() {
        assert_eq!(
            validate_password_strength("abcde²"),
            Err(PasswordPolicyViolation::MissingDigit)
        );
        assert_eq!(
            validate_password_strength("abcde½"),
            Err(PasswordPolicyViolation::MissingDigit)
        );
        assert!(validate_password_strength("abcde²1").is_ok());
    }

    #[test]
    fn test_length_counts_characters() {
        // 한글 7자 + 숫자: 바이트로는 20 초과지만 문자 수로는 허용 범위
        assert!(validate_password_strength("비밀번호입니다1").is_ok());
        let hash = hash_password("비밀번호입니다1").unwrap();
        assert!(verify_password(&hash, "비밀번호입니다1"));
    }

    #[test]
    fn test_violation_rule_names() {
        assert_eq!(PasswordPolicyViolation::Length.rule(), "length");
        assert_eq!(PasswordPolicyViolation::MissingDigit.rule(), "digit");
        assert_eq!(PasswordPolicyViolation::MissingLetter.rule(), "letter");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn prop_verify_rejects_other_password(
            p in "[a-z]{3,10}[0-9]{1,5}",
            q in "[a-z]{3,10}[0-9]{1,5}",
        ) {
            prop_assume!(p != q);
            let hash = hash_password(&p).unwrap();
            prop_assert!(verify_password(&hash, &p));
            prop_assert!(!verify_password(&hash, &q));
        }
    }
}
