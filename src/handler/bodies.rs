//! JSON request body endpoints

use std::collections::BTreeMap;

use hyper::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::http::{
    child_loc, expect_record, json_response, ApiError, ApiRequest, HttpResponse, LocSegment,
    RecordShape, ValidationIssue,
};
use crate::models::{Image, Item, User};
use crate::schedule::{format_datetime, total_seconds, Schedule};

/// Body of `PUT /items/{item_id}`: several models embedded under their names
#[derive(Debug, Deserialize)]
struct ItemUpdate {
    item: Item,
    user: User,
    importance: i64,
}

impl RecordShape for ItemUpdate {
    fn check_shape(value: &Value, loc: &[LocSegment], issues: &mut Vec<ValidationIssue>) {
        if let Some(map) = expect_record(value, loc, issues) {
            if let Some(item) = map.get("item") {
                Item::check_shape(item, &child_loc(loc, "item"), issues);
            }
            if let Some(user) = map.get("user") {
                User::check_shape(user, &child_loc(loc, "user"), issues);
            }
        }
    }
}

pub fn update_item(req: &ApiRequest) -> Result<HttpResponse, ApiError> {
    let item_id: i64 = req.path_param("item_id")?;
    let body: ItemUpdate = req.json()?;

    let issues = body.item.validate(&[LocSegment::from("body"), "item".into()]);
    if !issues.is_empty() {
        return Err(ApiError::Validation(issues));
    }

    Ok(json_response(
        StatusCode::OK,
        &json!({
            "item_id": item_id,
            "item": body.item,
            "user": body.user,
            "importance": body.importance,
        }),
    ))
}

pub fn update_schedule(req: &ApiRequest) -> Result<HttpResponse, ApiError> {
    let item_id: Uuid = req.path_param("item_id")?;
    let body = Value::Object(req.json_object()?);
    let schedule = Schedule::from_body(&body)?;

    Ok(json_response(
        StatusCode::OK,
        &json!({
            "item_id": item_id,
            "start_datetime": schedule.start_datetime.as_ref().map(format_datetime),
            "end_datetime": schedule.end_datetime.as_ref().map(format_datetime),
            "repeat_at": schedule.repeat_at.map(|t| t.to_string()),
            "process_after": schedule.process_after.map(total_seconds),
            "start_process": schedule.start_process().as_ref().map(format_datetime),
            "duration": schedule.duration().map(total_seconds),
        }),
    ))
}

pub fn create_images(req: &ApiRequest) -> Result<HttpResponse, ApiError> {
    let images: Vec<Image> = req.json()?;
    Ok(json_response(StatusCode::OK, &images))
}

pub fn create_index_weights(req: &ApiRequest) -> Result<HttpResponse, ApiError> {
    // JSON object keys arrive as strings; serde parses them as integers
    let weights: BTreeMap<i64, f64> = req.json()?;
    Ok(json_response(StatusCode::OK, &weights))
}

/// Echo the created item without `name` and without fields the client
/// did not send.
pub fn create_item(req: &ApiRequest) -> Result<HttpResponse, ApiError> {
    let (item, raw): (Item, Value) = req.json_with_value()?;

    let issues = item.validate(&[LocSegment::from("body")]);
    if !issues.is_empty() {
        return Err(ApiError::Validation(issues));
    }

    let sent = raw.as_object().ok_or_else(ApiError::not_a_dict)?;
    let Value::Object(full) = serde_json::to_value(&item)? else {
        return Err(ApiError::Internal("item did not serialize to an object".into()));
    };
    let echoed: Map<String, Value> = full
        .into_iter()
        .filter(|(key, _)| key != "name" && sent.contains_key(key))
        .collect();

    Ok(json_response(StatusCode::CREATED, &echoed))
}
