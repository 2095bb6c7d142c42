//! JWT 토큰 처리.
//!
//! HS256 서명 토큰의 발급([`TokenIssuer`])과 검증([`TokenValidator`]).
//! 두 구성 요소 모두 설정에서 주입된 시크릿만 사용하며 저장소를 조회하지 않습니다.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use botanical_core::{AccountId, JwtConfig};

/// JWT 페이로드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// 계정 ID
    pub id: AccountId,
    /// 표시 이름
    pub username: String,
    /// Issued At (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// 발급자 태그
    pub iss: String,
    /// JWT ID - 같은 초에 발급된 토큰도 서로 다르도록 하는 무작위 값
    pub jti: String,
    /// Not Before (Unix timestamp, 선택)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
}

impl Claims {
    /// 만료 시각.
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// 서명된 토큰과 만료 시각.
#[derive(Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// 토큰 에러.
///
/// 외부로는 모두 인증 실패로 취급되지만, 원인은 로그와 메시지로 구분됩니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// 서명 불일치, 알고리즘/발급자 불일치, 구조 오류
    #[error("유효하지 않은 토큰: {0}")]
    Malformed(String),
    /// 아직 유효 시작 시각(nbf) 이전
    #[error("아직 유효하지 않은 토큰")]
    NotYetValid,
    /// 만료된 토큰
    #[error("토큰이 만료되었습니다")]
    Expired,
    /// 토큰 서명 실패
    #[error("토큰 서명 실패: {0}")]
    Signing(String),
}

impl TokenError {
    /// 메트릭/로그용 원인 라벨.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::NotYetValid => "not_yet_valid",
            Self::Expired => "expired",
            Self::Signing(_) => "signing",
        }
    }
}

/// 토큰 발급기.
pub struct TokenIssuer {
    secret: SecretString,
    issuer: String,
}

impl TokenIssuer {
    /// 시크릿과 발급자 태그로 발급기 생성.
    pub fn new(secret: SecretString, issuer: impl Into<String>) -> Self {
        Self {
            secret,
            issuer: issuer.into(),
        }
    }

    /// 설정에서 발급기 생성.
    pub fn from_config(config: &JwtConfig) -> Self {
        Self::new(SecretString::from(config.secret.clone()), config.issuer.clone())
    }

    /// 현재 시각 기준으로 토큰 발급.
    ///
    /// 만료 시각은 `now + ttl_hours`입니다. 발급된 토큰의 저장은 호출자가 담당합니다.
    pub fn issue(
        &self,
        account_id: AccountId,
        username: &str,
        ttl_hours: i64,
    ) -> Result<IssuedToken, TokenError> {
        self.issue_at(account_id, username, ttl_hours, Utc::now())
    }

    /// 주어진 시각 기준으로 토큰 발급.
    pub fn issue_at(
        &self,
        account_id: AccountId,
        username: &str,
        ttl_hours: i64,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        // 토큰에는 초 단위로 기록되므로 저장하는 만료 시각도 초 단위로 맞춤
        let issued_at = now.timestamp();
        let exp = (now + Duration::hours(ttl_hours)).timestamp();

        let claims = Claims {
            id: account_id,
            username: username.to_string(),
            iat: issued_at,
            exp,
            iss: self.issuer.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
            nbf: None,
        };

        let token = self.sign(&claims)?;
        Ok(IssuedToken {
            token,
            expires_at: claims.expires_at(),
        })
    }

    /// 임의의 Claims 서명 (HS256).
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

/// 토큰 검증기.
pub struct TokenValidator {
    secret: SecretString,
    issuer: String,
}

impl TokenValidator {
    /// 시크릿과 기대 발급자 태그로 검증기 생성.
    pub fn new(secret: SecretString, issuer: impl Into<String>) -> Self {
        Self {
            secret,
            issuer: issuer.into(),
        }
    }

    /// 설정에서 검증기 생성.
    pub fn from_config(config: &JwtConfig) -> Self {
        Self::new(SecretString::from(config.secret.clone()), config.issuer.clone())
    }

    /// 현재 시각 기준 토큰 검증.
    pub fn parse(&self, token: &str) -> Result<Claims, TokenError> {
        self.parse_at(token, Utc::now())
    }

    /// 주어진 시각 기준 토큰 검증.
    ///
    /// 서명/구조 검사가 먼저이고, 그 다음 시간 검사(nbf → exp) 순서입니다.
    /// 만료 경계(`now == exp`)는 만료로 취급합니다.
    pub fn parse_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // 시간 검사는 아래에서 직접 수행
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "iss"]);

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.expose_secret().as_bytes()),
            &validation,
        )
        .map_err(|e| TokenError::Malformed(e.to_string()))?
        .claims;

        let now = now.timestamp();
        if claims.nbf.is_some_and(|nbf| now < nbf) {
            return Err(TokenError::NotYetValid);
        }
        if now >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
