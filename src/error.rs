//! Errors that end a request early and the responses they become.

use crate::dispatcher::HandlerResponse;
use crate::validator::FieldIssue;
use serde_json::{json, Value};
use thiserror::Error;

pub const NOT_FOUND_DETAIL: &str = "Not Found";
pub const METHOD_NOT_ALLOWED_DETAIL: &str = "Method Not Allowed";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("request validation failed with {} issue(s)", .0.len())]
    Validation(Vec<FieldIssue>),

    /// Well-formed input that breaks a domain rule.
    #[error("{0}")]
    BusinessRule(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    Internal(String),

    /// A handler coroutine is gone or not answering.
    #[error("{0}")]
    Unavailable(String),
}

impl ApiError {
    /// Route-level 404 for paths the document does not declare.
    pub fn route_not_found() -> Self {
        ApiError::NotFound(NOT_FOUND_DETAIL.to_string())
    }

    pub fn status(&self) -> u16 {
        match self {
            ApiError::Validation(_) => 422,
            ApiError::BusinessRule(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::MethodNotAllowed => 405,
            ApiError::Internal(_) => 500,
            ApiError::Unavailable(_) => 503,
        }
    }

    /// `{"detail": ...}` body: the issue list for validation errors, the message otherwise.
    pub fn body(&self) -> Value {
        match self {
            ApiError::Validation(issues) => json!({ "detail": issues }),
            ApiError::MethodNotAllowed => json!({ "detail": METHOD_NOT_ALLOWED_DETAIL }),
            other => json!({ "detail": other.to_string() }),
        }
    }
}

impl From<ApiError> for HandlerResponse {
    fn from(err: ApiError) -> Self {
        HandlerResponse::json(err.status(), err.body())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::IssueKind;
    use rstest::rstest;

    #[rstest]
    #[case(ApiError::BusinessRule("price must be > 0".into()), 400, json!({"detail": "price must be > 0"}))]
    #[case(ApiError::NotFound("not found".into()), 404, json!({"detail": "not found"}))]
    #[case(ApiError::route_not_found(), 404, json!({"detail": "Not Found"}))]
    #[case(ApiError::MethodNotAllowed, 405, json!({"detail": "Method Not Allowed"}))]
    #[case(ApiError::Internal("boom".into()), 500, json!({"detail": "boom"}))]
    fn test_status_and_body(#[case] err: ApiError, #[case] status: u16, #[case] body: Value) {
        assert_eq!(err.status(), status);
        assert_eq!(err.body(), body);
    }

    #[test]
    fn test_validation_body_lists_issues() {
        let err = ApiError::Validation(vec![FieldIssue::new(IssueKind::Missing, ["body", "name"])]);
        let resp = HandlerResponse::from(err);
        assert_eq!(resp.status, 422);
        assert_eq!(resp.body["detail"][0]["type"], "missing");
        assert_eq!(resp.body["detail"][0]["loc"], json!(["body", "name"]));
    }
}
