//! Custom exception and its registered handler

use hyper::StatusCode;
use serde_json::json;
use thiserror::Error;

use crate::http::{json_response, ApiError, ApiRequest, HttpResponse};

/// Raised by `/unicorns/{name}` for the one name it refuses
#[derive(Debug, Error)]
#[error("unicorn {name} did something")]
pub struct UnicornException {
    pub name: String,
}

/// Name that makes `/unicorns/{name}` raise
const FORBIDDEN_UNICORN: &str = "yolo";

/// Turn a `UnicornException` into its 418 response
pub fn unicorn_exception_handler(exc: &UnicornException) -> HttpResponse {
    json_response(
        StatusCode::IM_A_TEAPOT,
        &json!({
            "message": format!("Oops! {} did something. There goes a rainbow...", exc.name)
        }),
    )
}

pub fn read_unicorn(req: &ApiRequest) -> Result<HttpResponse, ApiError> {
    let name: String = req.path_param("name")?;
    if name == FORBIDDEN_UNICORN {
        return Err(UnicornException { name }.into());
    }
    Ok(json_response(StatusCode::OK, &json!({ "unicorn_name": name })))
}
