//! Path, query, cookie and header parameter endpoints

use hyper::header::USER_AGENT;
use hyper::StatusCode;
use serde_json::{json, Map, Value};

use crate::config::{AppState, RootFormat};
use crate::http::{json_response, text_response, ApiError, ApiRequest, HttpResponse, ValidationIssue};
use crate::models::ModelName;

/// Query parameter alias used by the `/items/` endpoints
const ITEM_QUERY: &str = "item-query";

const ITEM_QUERY_MIN_CHARS: usize = 3;
const ITEM_QUERY_MAX_CHARS: usize = 50;

pub fn root(state: &AppState) -> HttpResponse {
    match state.config.app.root_format {
        RootFormat::Text => text_response("Hello World"),
        RootFormat::Json => json_response(StatusCode::OK, &json!({ "Hello": "World" })),
    }
}

pub fn read_item(req: &ApiRequest) -> Result<HttpResponse, ApiError> {
    let item_id: i64 = req.path_param("item_id")?;

    let mut results = Map::new();
    results.insert("item_id".into(), item_id.into());
    if let Some(q) = req.query_value(ITEM_QUERY).filter(|q| !q.is_empty()) {
        results.insert("q".into(), q.into());
    }
    Ok(json_response(StatusCode::OK, &results))
}

pub fn read_items(req: &ApiRequest) -> Result<HttpResponse, ApiError> {
    let q = req.query_value(ITEM_QUERY);
    if let Some(q) = &q {
        check_item_query(q)?;
    }

    let mut results = Map::new();
    results.insert(
        "items".into(),
        json!([{ "item_id": "Foo" }, { "item_id": "Bar" }]),
    );
    if let Some(q) = q.filter(|q| !q.is_empty()) {
        results.insert("q".into(), q.into());
    }
    Ok(json_response(StatusCode::OK, &results))
}

fn check_item_query(q: &str) -> Result<(), ApiError> {
    let len = q.chars().count();
    let issue = if len < ITEM_QUERY_MIN_CHARS {
        ValidationIssue::new(
            ["query", ITEM_QUERY],
            format!("ensure this value has at least {ITEM_QUERY_MIN_CHARS} characters"),
            "value_error.any_str.min_length",
        )
    } else if len > ITEM_QUERY_MAX_CHARS {
        ValidationIssue::new(
            ["query", ITEM_QUERY],
            format!("ensure this value has at most {ITEM_QUERY_MAX_CHARS} characters"),
            "value_error.any_str.max_length",
        )
    } else {
        return Ok(());
    };
    Err(ApiError::validation(issue))
}

pub fn read_model(req: &ApiRequest) -> Result<HttpResponse, ApiError> {
    let model_name: ModelName = req.path_param("model_name")?;
    Ok(json_response(
        StatusCode::OK,
        &json!({ "model_name": model_name, "message": model_name.message() }),
    ))
}

pub fn read_file(req: &ApiRequest) -> Result<HttpResponse, ApiError> {
    let file_path: String = req.path_param("file_path")?;
    Ok(json_response(StatusCode::OK, &json!({ "file_path": file_path })))
}

pub fn read_user_item(req: &ApiRequest) -> Result<HttpResponse, ApiError> {
    let item_id: String = req.path_param("item_id")?;
    let needy: String = req.required_query("needy")?;
    Ok(json_response(
        StatusCode::OK,
        &json!({ "item_id": item_id, "needy": needy }),
    ))
}

pub fn read_ads_cookie(req: &ApiRequest) -> HttpResponse {
    json_response(StatusCode::OK, &json!({ "ads_id": req.cookie("ads_id") }))
}

pub fn read_user_agent(req: &ApiRequest) -> HttpResponse {
    let user_agent = req.header(USER_AGENT.as_str()).map(Value::from);
    json_response(StatusCode::OK, &json!({ "User-Agent": user_agent }))
}
