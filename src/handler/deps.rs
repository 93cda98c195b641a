//! Request-derived dependencies
//!
//! A dependency turns the request into a value before the handler body
//! runs. Plain functions and callable objects share the `Dependency` seam:
//! any `Fn(&ApiRequest) -> Result<T, ApiError>` is one, and structs that
//! carry configuration implement the trait directly.

use hyper::StatusCode;
use serde::Serialize;
use serde_json::{json, Map};

use crate::http::{json_response, ApiError, ApiRequest, HttpResponse};
use crate::store::FAKE_ITEMS_DB;

pub trait Dependency {
    type Output;

    fn resolve(&self, req: &ApiRequest) -> Result<Self::Output, ApiError>;
}

impl<F, T> Dependency for F
where
    F: Fn(&ApiRequest) -> Result<T, ApiError>,
{
    type Output = T;

    fn resolve(&self, req: &ApiRequest) -> Result<T, ApiError> {
        self(req)
    }
}

const DEFAULT_SKIP: i64 = 0;
const DEFAULT_LIMIT: i64 = 100;

/// `q`, `skip` and `limit` query parameters shared by listing endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommonQueryParams {
    pub q: Option<String>,
    pub skip: i64,
    pub limit: i64,
}

impl CommonQueryParams {
    pub fn extract(req: &ApiRequest) -> Result<Self, ApiError> {
        Ok(Self {
            q: req.query("q")?,
            skip: req.query("skip")?.unwrap_or(DEFAULT_SKIP),
            limit: req.query("limit")?.unwrap_or(DEFAULT_LIMIT),
        })
    }
}

/// Plain-function dependency returning the common parameters as a map
pub fn common_parameters(req: &ApiRequest) -> Result<Map<String, serde_json::Value>, ApiError> {
    let params = CommonQueryParams::extract(req)?;
    let mut map = Map::new();
    map.insert("q".into(), params.q.into());
    map.insert("skip".into(), params.skip.into());
    map.insert("limit".into(), params.limit.into());
    Ok(map)
}

/// Reports whether the `q` query parameter contains a fixed substring
#[derive(Debug, Clone, Copy)]
pub struct FixedContentQueryChecker {
    fixed_content: &'static str,
}

impl FixedContentQueryChecker {
    pub const fn new(fixed_content: &'static str) -> Self {
        Self { fixed_content }
    }
}

impl Dependency for FixedContentQueryChecker {
    type Output = bool;

    fn resolve(&self, req: &ApiRequest) -> Result<bool, ApiError> {
        let q = req.query::<String>("q")?.unwrap_or_default();
        Ok(!q.is_empty() && q.contains(self.fixed_content))
    }
}

pub const CHECKER: FixedContentQueryChecker = FixedContentQueryChecker::new("bar");

pub fn read_users(req: &ApiRequest) -> Result<HttpResponse, ApiError> {
    let commons = common_parameters.resolve(req)?;
    Ok(json_response(StatusCode::OK, &commons))
}

pub fn read_items3(req: &ApiRequest) -> Result<HttpResponse, ApiError> {
    let commons = CommonQueryParams::extract.resolve(req)?;

    let mut response = Map::new();
    if let Some(q) = commons.q.filter(|q| !q.is_empty()) {
        let stop = commons.skip.saturating_add(commons.limit);
        let items: Vec<_> = slice_clamped(&FAKE_ITEMS_DB, commons.skip, stop)
            .iter()
            .map(|name| json!({ "item_name": name }))
            .collect();
        response.insert("q".into(), q.into());
        response.insert("items".into(), items.into());
    }
    Ok(json_response(StatusCode::OK, &response))
}

pub fn read_query_check(req: &ApiRequest) -> Result<HttpResponse, ApiError> {
    let included = CHECKER.resolve(req)?;
    Ok(json_response(
        StatusCode::OK,
        &json!({ "fixed_content_in_query": included }),
    ))
}

/// `items[start..stop]` where negative bounds count from the end and
/// out-of-range bounds are clamped
fn slice_clamped<T>(items: &[T], start: i64, stop: i64) -> &[T] {
    let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
    let clamp = |i: i64| {
        let i = if i < 0 { i.saturating_add(len).max(0) } else { i.min(len) };
        usize::try_from(i).unwrap_or(0)
    };
    let (start, stop) = (clamp(start), clamp(stop));
    items.get(start..stop).unwrap_or(&[])
}
