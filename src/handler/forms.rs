//! Form and file upload endpoints

use hyper::StatusCode;
use serde_json::json;

use crate::http::{json_response, ApiError, ApiRequest, HttpResponse};
use crate::logger;

pub fn login(req: &ApiRequest) -> Result<HttpResponse, ApiError> {
    let form = req.form()?;

    // Both fields are reported when both are missing
    match (form.required_text("username"), form.required_text("password")) {
        (Ok(username), Ok(_)) => Ok(json_response(
            StatusCode::OK,
            &json!({ "username": username }),
        )),
        (username, password) => {
            let issues = [username.err(), password.err()]
                .into_iter()
                .flatten()
                .flat_map(|err| match err {
                    ApiError::Validation(issues) => issues,
                    _ => Vec::new(),
                })
                .collect();
            Err(ApiError::Validation(issues))
        }
    }
}

/// Size of the `file` field, sent either as a file part or a plain field
pub fn create_file(req: &ApiRequest) -> Result<HttpResponse, ApiError> {
    let form = req.form()?;
    let file = form.required_bytes("file")?;
    Ok(json_response(StatusCode::OK, &json!({ "file_size": file.len() })))
}

pub fn create_upload_file(req: &ApiRequest) -> Result<HttpResponse, ApiError> {
    let form = req.form()?;
    let file = form.required_file("file")?;
    logger::log_debug(&format!(
        "[Upload] {} bytes, content type {}",
        file.data.len(),
        file.content_type.as_deref().unwrap_or("unknown")
    ));
    Ok(json_response(
        StatusCode::OK,
        &json!({ "filename": file.filename }),
    ))
}
