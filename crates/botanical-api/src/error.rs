//! API 에러 응답 본문.
//!
//! 인증 실패, 인가 실패, 입력 검증 실패, 계정 연산 실패가 모두 같은 JSON 형식으로 나갑니다.

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;

/// 외부로 노출되는 에러 코드.
///
/// 인증 실패 원인(만료, 변조, 세션 교체 등)은 코드로 구분하지 않고 메시지에만 담습니다.
pub mod codes {
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const INVALID_CREDENTIALS: &str = "INVALID_CREDENTIALS";
    pub const ACCOUNT_EXISTS: &str = "ACCOUNT_EXISTS";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// 에러 응답 본문.
///
/// ```json
/// {
///   "code": "VALIDATION_FAILED",
///   "message": "비밀번호에 숫자가 포함되어야 합니다",
///   "details": { "rule": "digit" },
///   "timestamp": 1738300800
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// [`codes`]의 값 중 하나
    pub code: String,
    pub message: String,
    /// 위반된 규칙, 잘못된 필드 목록 등
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Unix timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ApiErrorResponse {
    /// 에러 본문 생성 (타임스탬프 포함).
    ///
    /// ```
    /// use botanical_api::error::{codes, ApiErrorResponse};
    ///
    /// let error = ApiErrorResponse::new(codes::NOT_FOUND, "계정을 찾을 수 없습니다");
    /// assert_eq!(error.code(), "NOT_FOUND");
    /// ```
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: Some(chrono::Utc::now().timestamp()),
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            details: Some(details),
            ..Self::new(code, message)
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// 요청 DTO 검증 실패를 400 응답으로 변환.
    ///
    /// 필드별 메시지를 `; `로 이어 붙이고, 잘못된 필드 이름은 `details.fields`에 담습니다.
    pub fn from_validation(errors: &validator::ValidationErrors) -> (StatusCode, Json<Self>) {
        let mut field_errors: Vec<_> = errors.field_errors().into_iter().collect();
        field_errors.sort_by(|a, b| a.0.cmp(&b.0));

        let fields: Vec<String> = field_errors.iter().map(|(f, _)| f.to_string()).collect();
        let message = field_errors
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match e.message.as_ref() {
                    Some(m) => m.to_string(),
                    None => format!("{field}: 유효하지 않은 값"),
                })
            })
            .collect::<Vec<_>>()
            .join("; ");

        (
            StatusCode::BAD_REQUEST,
            Json(Self::with_details(
                codes::VALIDATION_FAILED,
                message,
                json!({ "fields": fields }),
            )),
        )
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiErrorResponse {}

/// 핸들러 Result 타입.
///
/// [`crate::auth::AuthError`]와 [`crate::auth::AccountError`]는 `?`로 바로 변환됩니다.
pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiErrorResponse>)>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Signup {
        #[validate(length(min = 1, message = "전화번호는 필수입니다"))]
        phone: String,
        #[validate(length(min = 1, max = 50, message = "사용자 이름은 1~50자여야 합니다"))]
        username: String,
    }

    #[test]
    fn test_new_sets_timestamp() {
        let error = ApiErrorResponse::new(codes::FORBIDDEN, "권한이 부족합니다");
        assert_eq!(error.code(), "FORBIDDEN");
        assert_eq!(error.message(), "권한이 부족합니다");
        assert!(error.timestamp.is_some());
        assert!(error.details.is_none());
    }

    #[test]
    fn test_details_skipped_when_absent() {
        let json = serde_json::to_string(&ApiErrorResponse::new(codes::NOT_FOUND, "x")).unwrap();
        assert!(!json.contains("details"));

        let error = ApiErrorResponse::with_details(
            codes::VALIDATION_FAILED,
            "bad",
            json!({ "rule": "length" }),
        );
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains(r#""rule":"length""#));
    }

    #[test]
    fn test_from_validation_lists_fields_in_order() {
        let errors = Signup {
            phone: String::new(),
            username: String::new(),
        }
        .validate()
        .unwrap_err();

        let (status, Json(body)) = ApiErrorResponse::from_validation(&errors);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, codes::VALIDATION_FAILED);
        assert_eq!(
            body.message,
            "전화번호는 필수입니다; 사용자 이름은 1~50자여야 합니다"
        );
        assert_eq!(body.details.unwrap()["fields"], json!(["phone", "username"]));
    }
}
