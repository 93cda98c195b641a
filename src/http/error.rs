//! Request error types and their HTTP representation

use hyper::header::{HeaderValue, ALLOW};
use hyper::{Method, StatusCode};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use super::multipart::MultipartError;
use super::response::{json_response, HttpResponse};
use crate::handler::unicorns::{unicorn_exception_handler, UnicornException};
use crate::logger;

/// One element of a validation error location, e.g. `["body", "images", 0, "url"]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LocSegment {
    Field(String),
    Index(usize),
}

impl From<&str> for LocSegment {
    fn from(value: &str) -> Self {
        Self::Field(value.to_string())
    }
}

impl From<String> for LocSegment {
    fn from(value: String) -> Self {
        Self::Field(value)
    }
}

impl From<usize> for LocSegment {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

/// A single entry of a 422 `detail` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub loc: Vec<LocSegment>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ValidationIssue {
    pub fn new<L, S>(loc: L, msg: impl Into<String>, kind: impl Into<String>) -> Self
    where
        L: IntoIterator<Item = S>,
        S: Into<LocSegment>,
    {
        Self {
            loc: loc.into_iter().map(Into::into).collect(),
            msg: msg.into(),
            kind: kind.into(),
        }
    }

    /// A required value was not supplied
    pub fn missing<L, S>(loc: L) -> Self
    where
        L: IntoIterator<Item = S>,
        S: Into<LocSegment>,
    {
        Self::new(loc, "field required", "value_error.missing")
    }

    /// A record position held something other than a JSON object
    pub fn not_a_dict<L, S>(loc: L) -> Self
    where
        L: IntoIterator<Item = S>,
        S: Into<LocSegment>,
    {
        Self::new(loc, "value is not a valid dict", "type_error.dict")
    }
}

/// `loc` extended by one more segment
pub fn child_loc(loc: &[LocSegment], segment: impl Into<LocSegment>) -> Vec<LocSegment> {
    let mut full = loc.to_vec();
    full.push(segment.into());
    full
}

/// Everything a handler can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request validation failed ({} issue(s))", .0.len())]
    Validation(Vec<ValidationIssue>),

    #[error(transparent)]
    Unicorn(#[from] UnicornException),

    #[error("no route for path")]
    NotFound,

    #[error("item {0} not found")]
    ItemNotFound(String),

    #[error("method not allowed")]
    MethodNotAllowed { allow: Vec<Method> },

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("failed to read request body: {0}")]
    BodyRead(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(issue: ValidationIssue) -> Self {
        Self::Validation(vec![issue])
    }

    /// The body was valid JSON but not an object
    pub fn not_a_dict() -> Self {
        Self::validation(ValidationIssue::not_a_dict(["body"]))
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unicorn(_) => StatusCode::IM_A_TEAPOT,
            Self::NotFound | Self::ItemNotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BodyRead(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response(self) -> HttpResponse {
        let status = self.status();
        match self {
            Self::Validation(issues) => json_response(status, &json!({ "detail": issues })),
            Self::Unicorn(exc) => unicorn_exception_handler(&exc),
            Self::NotFound => json_response(status, &json!({ "detail": "Not Found" })),
            Self::ItemNotFound(_) => json_response(status, &json!({ "detail": "Item not found" })),
            Self::MethodNotAllowed { allow } => {
                let mut resp = json_response(status, &json!({ "detail": "Method Not Allowed" }));
                let allow = allow
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    resp.headers_mut().insert(ALLOW, value);
                }
                resp
            }
            Self::PayloadTooLarge { .. } => {
                json_response(status, &json!({ "detail": "Request body too large" }))
            }
            Self::BodyRead(reason) => {
                logger::log_warning(&format!("Failed to read request body: {reason}"));
                json_response(
                    status,
                    &json!({ "detail": "There was an error parsing the body" }),
                )
            }
            Self::Internal(message) => {
                logger::log_error(&message);
                json_response(status, &json!({ "detail": "Internal Server Error" }))
            }
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::validation(ValidationIssue::new(["body"], err.to_string(), "value_error.multipart"))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_json(resp: HttpResponse) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_issue_serialization() {
        let issue = ValidationIssue::new(
            vec![LocSegment::from("body"), "images".into(), 0_usize.into(), "url".into()],
            "invalid or missing URL scheme",
            "value_error.url.scheme",
        );
        let value = serde_json::to_value(&issue).unwrap();
        assert_eq!(value["loc"], json!(["body", "images", 0, "url"]));
        assert_eq!(value["type"], "value_error.url.scheme");
    }

    #[tokio::test]
    async fn test_validation_response() {
        let err = ApiError::validation(ValidationIssue::missing(["query", "needy"]));
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(resp).await;
        assert_eq!(
            body,
            json!({"detail": [{"loc": ["query", "needy"], "msg": "field required", "type": "value_error.missing"}]})
        );
    }

    #[tokio::test]
    async fn test_method_not_allowed_sets_allow() {
        let err = ApiError::MethodNotAllowed {
            allow: vec![Method::GET, Method::PUT],
        };
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()[ALLOW], "GET, PUT");
        assert_eq!(body_json(resp).await, json!({"detail": "Method Not Allowed"}));
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let resp = ApiError::NotFound.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await, json!({"detail": "Not Found"}));
    }

    #[test]
    fn test_multipart_error_is_unprocessable() {
        let err: ApiError = MultipartError::MissingBoundary.into();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
