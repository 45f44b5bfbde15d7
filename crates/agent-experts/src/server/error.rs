use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;

/// Machine-readable category of an [`ApiError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No agent is registered under the requested key.
    AgentNotFound,
    /// The request was malformed or failed validation.
    InvalidQuery,
    /// The agent or a tool failed.
    AgentExecutionError,
    /// The client sent too many requests.
    RateLimitExceeded,
    /// The API key was missing or wrong.
    Unauthorized,
    /// The server lacks configuration required by the request.
    ConfigurationError,
    /// No route matches the request.
    NotFound,
}

/// An error answered with `{"detail", "error_code", "timestamp"}`.
#[derive(Debug, thiserror::Error)]
#[error("{detail}")]
pub struct ApiError {
    status: StatusCode,
    code: ErrorCode,
    detail: String,
}

impl ApiError {
    /// Creates an error with an explicit status.
    pub fn new<S: Into<String>>(
        status: StatusCode,
        code: ErrorCode,
        detail: S,
    ) -> Self {
        Self {
            status,
            code,
            detail: detail.into(),
        }
    }

    /// 400, the request failed validation.
    #[inline]
    pub fn bad_request<S: Into<String>>(detail: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::InvalidQuery, detail)
    }

    /// 422, the request could not be parsed.
    #[inline]
    pub fn unprocessable<S: Into<String>>(detail: S) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::InvalidQuery,
            detail,
        )
    }

    /// 500, a tool or an agent failed.
    #[inline]
    pub fn execution<S: Into<String>>(detail: S) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::AgentExecutionError,
            detail,
        )
    }

    /// 503, agents are disabled.
    #[inline]
    pub fn agents_unavailable() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::ConfigurationError,
            "Agents are not available. Please set GOOGLE_API_KEY.",
        )
    }

    /// 404, no agent under `key`.
    #[inline]
    pub fn agent_not_found(key: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            ErrorCode::AgentNotFound,
            format!("Agent '{key}' not found"),
        )
    }

    /// 404, no route matches.
    #[inline]
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorCode::NotFound, "Not Found")
    }

    /// 401, the API key was missing or wrong.
    #[inline]
    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            ErrorCode::Unauthorized,
            "Invalid or missing API key",
        )
    }

    /// 429, the client exhausted its rate limit.
    #[inline]
    pub fn rate_limited() -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::RateLimitExceeded,
            "Rate limit exceeded. Too many requests.",
        )
    }

    /// Returns the HTTP status of this error.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the category of this error.
    #[inline]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Returns the human-readable reason.
    #[inline]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: &'a str,
    error_code: ErrorCode,
    timestamp: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("request failed with {}: {}", self.status, self.detail);
        } else {
            debug!("request rejected with {}: {}", self.status, self.detail);
        }
        let body = ErrorBody {
            detail: &self.detail,
            error_code: self.code,
            timestamp: Utc::now().to_rfc3339(),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::InvalidQuery,
            rejection.body_text(),
        )
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::InvalidQuery,
            rejection.body_text(),
        )
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use serde_json::Value;

    use super::*;

    #[tokio::test]
    async fn test_error_body() {
        let response = ApiError::rate_limited().into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["detail"], "Rate limit exceeded. Too many requests.");
        assert_eq!(body["error_code"], "RATE_LIMIT_EXCEEDED");
        assert!(
            chrono::DateTime::parse_from_rfc3339(
                body["timestamp"].as_str().unwrap()
            )
            .is_ok()
        );
    }

    #[test]
    fn test_constructors() {
        let err = ApiError::bad_request("City name cannot be empty");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), ErrorCode::InvalidQuery);
        assert_eq!(err.to_string(), "City name cannot be empty");
        assert_eq!(
            ApiError::agents_unavailable().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
