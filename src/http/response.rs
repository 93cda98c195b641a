//! HTTP response building module
//!
//! Builders for the content types the endpoints emit. Builder failures fall
//! back to a bare response and are logged.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE, LOCATION, SET_COOKIE};
use hyper::{Response, StatusCode};
use serde::Serialize;

pub type HttpResponse = Response<Full<Bytes>>;

const JSON: &str = "application/json";

/// Build a response with an arbitrary body and content type
pub fn content_response(
    status: StatusCode,
    content_type: &str,
    body: impl Into<Bytes>,
) -> HttpResponse {
    let body = body.into();
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, content_type)
        .header("Content-Length", body.len())
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Serialize `value` as compact JSON
pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> HttpResponse {
    match serde_json::to_vec(value) {
        Ok(body) => content_response(status, JSON, body),
        Err(e) => {
            crate::logger::log_error(&format!("Failed to serialize response body: {e}"));
            content_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                JSON,
                r#"{"detail":"Internal Server Error"}"#,
            )
        }
    }
}

/// Send bytes that are already encoded JSON
pub fn raw_json_response(status: StatusCode, body: Vec<u8>) -> HttpResponse {
    content_response(status, JSON, body)
}

pub fn text_response(body: impl Into<String>) -> HttpResponse {
    content_response(StatusCode::OK, "text/plain; charset=utf-8", body.into())
}

pub fn html_response(body: impl Into<String>) -> HttpResponse {
    content_response(StatusCode::OK, "text/html; charset=utf-8", body.into())
}

pub fn xml_response(body: impl Into<String>) -> HttpResponse {
    content_response(StatusCode::OK, "application/xml", body.into())
}

/// Build 307 Temporary Redirect response
pub fn redirect_response(target: &str) -> HttpResponse {
    Response::builder()
        .status(StatusCode::TEMPORARY_REDIRECT)
        .header(LOCATION, target)
        .header("Content-Length", 0)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("307", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Add a header with a static value
pub fn with_header(mut resp: HttpResponse, name: &'static str, value: &'static str) -> HttpResponse {
    resp.headers_mut()
        .append(name, HeaderValue::from_static(value));
    resp
}

/// A `Set-Cookie` value with the attributes the endpoints use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie<'a> {
    pub name: &'a str,
    pub value: &'a str,
    pub path: &'a str,
    pub same_site: &'a str,
}

impl<'a> Cookie<'a> {
    pub const fn new(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            value,
            path: "/",
            same_site: "lax",
        }
    }

    pub fn header_value(&self) -> String {
        format!(
            "{}={}; Path={}; SameSite={}",
            self.name, self.value, self.path, self.same_site
        )
    }
}

/// Append a `Set-Cookie` header
pub fn set_cookie(mut resp: HttpResponse, cookie: &Cookie<'_>) -> HttpResponse {
    match HeaderValue::from_str(&cookie.header_value()) {
        Ok(value) => {
            resp.headers_mut().append(SET_COOKIE, value);
        }
        Err(e) => {
            crate::logger::log_error(&format!("Invalid cookie {}: {e}", cookie.name));
        }
    }
    resp
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
