//! Result envelope and request/response bodies for the SniffOut backend API.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Message used when a failed response carries no `error` field.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";

/// Uniform outcome of every API call.
///
/// Serializes to exactly `{"success": bool, "data": .. | null, "error": .. | null}`.
/// Exactly one of `data`/`error` is populated, except for bodiless
/// successes (204/205) where both are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResult<T = Value> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<Value>,
}

impl<T> ApiResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Success without a body (204 No Content, 205 Reset Content).
    pub fn empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn failed(error: Value) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }

    /// Failure built from a parsed error response body.
    ///
    /// Uses the body's `error` field, falling back to
    /// `{"message": "Something went wrong"}` when it is missing or null.
    pub fn from_error_body(body: &Value) -> Self {
        let error = body
            .get("error")
            .filter(|e| !e.is_null())
            .cloned()
            .unwrap_or_else(|| json!({ "message": GENERIC_ERROR_MESSAGE }));
        Self::failed(error)
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The `message` of the error payload, or the error itself when it is a
    /// bare string.
    pub fn error_message(&self) -> Option<&str> {
        let error = self.error.as_ref()?;
        error
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| error.as_str())
    }

    /// Convert into a standard `Result`, keeping the error payload.
    pub fn into_result(self) -> Result<Option<T>, Value> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self
                .error
                .unwrap_or_else(|| json!({ "message": GENERIC_ERROR_MESSAGE })))
        }
    }
}

/// Login request body sent to POST auth/login/.
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token pair issued at login: `{"data": {"tokens": {"access", "refresh"}}}`.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub data: LoginData,
}

#[derive(Debug, Deserialize)]
pub struct LoginData {
    pub tokens: TokenPair,
}

#[derive(Debug, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Refresh request body sent to POST auth/refresh-token/.
#[derive(Debug, Serialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Refresh response: `{"data": {"access": "..."}}`.
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub data: RefreshData,
}

#[derive(Debug, Deserialize)]
pub struct RefreshData {
    #[serde(default)]
    pub access: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_serializes_all_three_fields() {
        let ok = ApiResult::ok(json!({"id": 1}));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"success": true, "data": {"id": 1}, "error": null})
        );

        let empty: ApiResult = ApiResult::empty();
        assert_eq!(
            serde_json::to_value(&empty).unwrap(),
            json!({"success": true, "data": null, "error": null})
        );
    }

    #[test]
    fn test_error_body_uses_error_field() {
        let result: ApiResult = ApiResult::from_error_body(&json!({"error": {"message": "bad request"}}));
        assert!(!result.is_success());
        assert_eq!(result.data, None);
        assert_eq!(result.error, Some(json!({"message": "bad request"})));
        assert_eq!(result.error_message(), Some("bad request"));
    }

    #[test]
    fn test_error_body_falls_back_to_generic_message() {
        for body in [json!({"detail": "nope"}), json!({"error": null}), json!([1, 2])] {
            let result: ApiResult = ApiResult::from_error_body(&body);
            assert_eq!(result.error, Some(json!({"message": GENERIC_ERROR_MESSAGE})));
        }
    }

    #[test]
    fn test_error_message_accepts_bare_string() {
        let result: ApiResult = ApiResult::failed(json!("Invalid credentials"));
        assert_eq!(result.error_message(), Some("Invalid credentials"));
    }

    #[test]
    fn test_into_result() {
        assert_eq!(ApiResult::ok(5).into_result(), Ok(Some(5)));
        assert_eq!(ApiResult::<i32>::empty().into_result(), Ok(None));
        assert_eq!(
            ApiResult::<i32>::failed(json!({"message": "x"})).into_result(),
            Err(json!({"message": "x"}))
        );
    }

    #[test]
    fn test_refresh_response_tolerates_missing_access() {
        let parsed: RefreshResponse = serde_json::from_value(json!({"data": {}})).unwrap();
        assert_eq!(parsed.data.access, None);
    }
}
