//! HTTP protocol layer module
//!
//! Request buffering and extraction, body decoders, the error type shared by
//! all handlers and the response builders. Nothing here knows about specific
//! endpoints apart from the registered exception handler in `error`.

pub mod error;
pub mod multipart;
pub mod request;
pub mod response;
pub mod urlencoded;

// Re-export commonly used types
pub use error::{child_loc, ApiError, LocSegment, ValidationIssue};
pub use request::{expect_record, ApiRequest, FromParam, RecordShape};
pub use response::{
    html_response, json_response, raw_json_response, redirect_response, set_cookie,
    text_response, with_header, xml_response, Cookie, HttpResponse,
};
