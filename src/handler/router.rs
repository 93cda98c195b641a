//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: body limits, buffering, route
//! matching, dispatch to the endpoint and the access log line.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::header::CONTENT_LENGTH;
use hyper::{Method, Request};

use super::{bodies, deps, forms, params, records, responses, unicorns};
use crate::config::AppState;
use crate::http::{redirect_response, ApiError, ApiRequest, HttpResponse};
use crate::logger::{self, AccessLogEntry};
use crate::routing::{self, Endpoint, RouteMatch};

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<HttpResponse, Infallible> {
    let started = Instant::now();
    let access_log = state.access_log_enabled();
    let mut entry = access_log.then(|| {
        AccessLogEntry::start(
            peer_addr.to_string(),
            req.method(),
            req.uri().path(),
            req.uri().query(),
            req.version(),
            req.headers(),
        )
    });

    let is_head = req.method() == Method::HEAD;
    let mut response = match read_request(req, &state).await {
        Ok(api_req) => dispatch(&state, api_req).await,
        Err(err) => err.into_response(),
    };

    if is_head {
        *response.body_mut() = Full::new(Bytes::new());
    }

    if let Some(entry) = entry.as_mut() {
        let body_bytes = usize::try_from(response.body().size_hint().exact().unwrap_or(0))
            .unwrap_or(usize::MAX);
        entry.finish(response.status().as_u16(), body_bytes, started.elapsed());
        logger::log_access(entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Buffer the body within `http.max_body_size` and build an `ApiRequest`
async fn read_request(req: Request<Incoming>, state: &AppState) -> Result<ApiRequest, ApiError> {
    let max_body_size = state.config.http.max_body_size;
    check_body_size(&req, max_body_size)?;

    logger::log_headers_count(req.headers().len(), state.config.logging.show_headers);

    let (parts, body) = req.into_parts();
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let body = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            logger::log_error(&format!(
                "Request body too large: exceeded {max_body_size} bytes while reading"
            ));
            return Err(ApiError::PayloadTooLarge {
                limit: max_body_size,
            });
        }
        Err(e) => return Err(ApiError::BodyRead(e.to_string())),
    };

    let mut api_req = ApiRequest::new(parts.method, parts.uri.path())
        .with_headers(parts.headers)
        .with_body(body)
        .with_max_upload_size(state.config.http.max_upload_size);
    if let Some(query) = parts.uri.query() {
        api_req = api_req.with_query(query);
    }
    Ok(api_req)
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(req: &Request<Incoming>, max_body_size: u64) -> Result<(), ApiError> {
    let Some(content_length) = req.headers().get(CONTENT_LENGTH) else {
        return Ok(());
    };
    let Ok(size_str) = content_length.to_str() else {
        logger::log_warning("Content-Length header contains non-ASCII characters");
        return Ok(());
    };
    match size_str.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            logger::log_error(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            Err(ApiError::PayloadTooLarge {
                limit: max_body_size,
            })
        }
        Err(_) => {
            logger::log_warning(&format!(
                "Invalid Content-Length value: '{size_str}', skipping size check"
            ));
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Route a buffered request and run its endpoint
pub async fn dispatch(state: &AppState, mut req: ApiRequest) -> HttpResponse {
    let endpoint = match routing::lookup(req.method(), req.path()) {
        RouteMatch::Found { endpoint, params } => {
            req.set_params(params);
            endpoint
        }
        RouteMatch::MethodNotAllowed(allow) => {
            logger::log_warning(&format!("Method not allowed: {} {}", req.method(), req.path()));
            return ApiError::MethodNotAllowed { allow }.into_response();
        }
        RouteMatch::RedirectSlash(target) => {
            let location = match req.query_string() {
                Some(query) => format!("{target}?{query}"),
                None => target,
            };
            return redirect_response(&location);
        }
        RouteMatch::NotFound => return ApiError::NotFound.into_response(),
    };

    run_endpoint(state, endpoint, &req)
        .await
        .unwrap_or_else(ApiError::into_response)
}

async fn run_endpoint(
    state: &AppState,
    endpoint: Endpoint,
    req: &ApiRequest,
) -> Result<HttpResponse, ApiError> {
    match endpoint {
        Endpoint::Root => Ok(params::root(state)),
        Endpoint::ReadItem => params::read_item(req),
        Endpoint::ReadItems => params::read_items(req),
        Endpoint::UpdateItem => bodies::update_item(req),
        Endpoint::ReadModel => params::read_model(req),
        Endpoint::ReadFile => params::read_file(req),
        Endpoint::UpdateSchedule => bodies::update_schedule(req),
        Endpoint::ReadUserItem => params::read_user_item(req),
        Endpoint::CreateImages => bodies::create_images(req),
        Endpoint::CreateIndexWeights => bodies::create_index_weights(req),
        Endpoint::ReadAdsCookie => Ok(params::read_ads_cookie(req)),
        Endpoint::ReadUserAgent => Ok(params::read_user_agent(req)),
        Endpoint::CreateItem => bodies::create_item(req),
        Endpoint::Login => forms::login(req),
        Endpoint::CreateFile => forms::create_file(req),
        Endpoint::CreateUploadFile => forms::create_upload_file(req),
        Endpoint::ReadUnicorn => unicorns::read_unicorn(req),
        Endpoint::ReplaceItem2 => records::replace_item2(state, req).await,
        Endpoint::PatchItem2 => records::patch_item2(state, req).await,
        Endpoint::ReadUsers => deps::read_users(req),
        Endpoint::ReadItems3 => deps::read_items3(req),
        Endpoint::GetLegacyData => Ok(responses::get_legacy_data()),
        Endpoint::ReadItems5 => responses::read_items5(),
        Endpoint::ReadItems6 => Ok(responses::read_items6()),
        Endpoint::RedirectTyper => Ok(responses::redirect_typer()),
        Endpoint::CreateCookieAndObject => Ok(responses::create_cookie_and_object()),
        Endpoint::CreateCookie => Ok(responses::create_cookie()),
        Endpoint::GetHeadersAndObject => Ok(responses::get_headers_and_object()),
        Endpoint::GetHeaders => Ok(responses::get_headers()),
        Endpoint::GetOrCreateTask => records::get_or_create_task(state, req).await,
        Endpoint::ReadQueryCheck => deps::read_query_check(req),
    }
}
