//! Route table
//!
//! Routes are tried in declaration order and the first one whose template
//! and method both match wins. A path that matches only with another method
//! produces 405; a path that matches once its trailing slash is toggled
//! produces a redirect.

use std::collections::HashMap;

use hyper::Method;

use super::matcher::match_template;

/// Every endpoint the server exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Root,
    ReadItem,
    ReadItems,
    UpdateItem,
    ReadModel,
    ReadFile,
    UpdateSchedule,
    ReadUserItem,
    CreateImages,
    CreateIndexWeights,
    ReadAdsCookie,
    ReadUserAgent,
    CreateItem,
    Login,
    CreateFile,
    CreateUploadFile,
    ReadUnicorn,
    ReplaceItem2,
    PatchItem2,
    ReadUsers,
    ReadItems3,
    GetLegacyData,
    ReadItems5,
    ReadItems6,
    RedirectTyper,
    CreateCookieAndObject,
    CreateCookie,
    GetHeadersAndObject,
    GetHeaders,
    GetOrCreateTask,
    ReadQueryCheck,
}

#[derive(Debug)]
pub struct Route {
    pub method: Method,
    pub template: &'static str,
    pub endpoint: Endpoint,
}

const fn route(method: Method, template: &'static str, endpoint: Endpoint) -> Route {
    Route {
        method,
        template,
        endpoint,
    }
}

pub static ROUTES: &[Route] = &[
    route(Method::GET, "/", Endpoint::Root),
    route(Method::GET, "/items/{item_id}", Endpoint::ReadItem),
    route(Method::GET, "/items/", Endpoint::ReadItems),
    route(Method::PUT, "/items/{item_id}", Endpoint::UpdateItem),
    route(Method::GET, "/models/{model_name}", Endpoint::ReadModel),
    route(Method::GET, "/files/{file_path:path}", Endpoint::ReadFile),
    route(Method::PUT, "/items1/{item_id}", Endpoint::UpdateSchedule),
    route(Method::GET, "/items1/{item_id}", Endpoint::ReadUserItem),
    route(Method::POST, "/images/multiple/", Endpoint::CreateImages),
    route(Method::POST, "/index-weights/", Endpoint::CreateIndexWeights),
    route(Method::GET, "/items1/", Endpoint::ReadAdsCookie),
    route(Method::GET, "/items11/", Endpoint::ReadAdsCookie),
    route(Method::GET, "/items2/", Endpoint::ReadUserAgent),
    route(Method::POST, "/items/", Endpoint::CreateItem),
    route(Method::POST, "/login/", Endpoint::Login),
    route(Method::POST, "/files/", Endpoint::CreateFile),
    route(Method::POST, "/uploadfile/", Endpoint::CreateUploadFile),
    route(Method::GET, "/unicorns/{name}", Endpoint::ReadUnicorn),
    route(Method::PUT, "/items2/{item_id}", Endpoint::ReplaceItem2),
    route(Method::PATCH, "/items2/{item_id}", Endpoint::PatchItem2),
    route(Method::GET, "/users/", Endpoint::ReadUsers),
    route(Method::GET, "/items3/", Endpoint::ReadItems3),
    route(Method::GET, "/legacy/", Endpoint::GetLegacyData),
    route(Method::GET, "/items5/", Endpoint::ReadItems5),
    route(Method::GET, "/items6/", Endpoint::ReadItems6),
    route(Method::GET, "/typer", Endpoint::RedirectTyper),
    route(Method::POST, "/cookie-and-object/", Endpoint::CreateCookieAndObject),
    route(Method::POST, "/cookie/", Endpoint::CreateCookie),
    route(Method::GET, "/headers-and-object/", Endpoint::GetHeadersAndObject),
    route(Method::GET, "/headers/", Endpoint::GetHeaders),
    route(Method::PUT, "/get-or-create-task/{task_id}", Endpoint::GetOrCreateTask),
    route(Method::GET, "/query-checker/", Endpoint::ReadQueryCheck),
];

/// Outcome of a route lookup
#[derive(Debug, PartialEq, Eq)]
pub enum RouteMatch {
    Found {
        endpoint: Endpoint,
        params: HashMap<String, String>,
    },
    MethodNotAllowed(Vec<Method>),
    RedirectSlash(String),
    NotFound,
}

/// GET routes also answer HEAD
fn method_matches(route_method: &Method, method: &Method) -> bool {
    route_method == method || (*route_method == Method::GET && *method == Method::HEAD)
}

/// Resolve `method` and `path` against the route table
pub fn lookup(method: &Method, path: &str) -> RouteMatch {
    let mut allowed: Vec<Method> = Vec::new();

    for route in ROUTES {
        let Some(params) = match_template(route.template, path) else {
            continue;
        };
        if method_matches(&route.method, method) {
            return RouteMatch::Found {
                endpoint: route.endpoint,
                params,
            };
        }
        if !allowed.contains(&route.method) {
            allowed.push(route.method.clone());
            if route.method == Method::GET {
                allowed.push(Method::HEAD);
            }
        }
    }

    if !allowed.is_empty() {
        return RouteMatch::MethodNotAllowed(allowed);
    }

    if path != "/" {
        let toggled = match path.strip_suffix('/') {
            Some(trimmed) => trimmed.to_string(),
            None => format!("{path}/"),
        };
        if ROUTES
            .iter()
            .any(|r| method_matches(&r.method, method) && match_template(r.template, &toggled).is_some())
        {
            return RouteMatch::RedirectSlash(toggled);
        }
    }

    RouteMatch::NotFound
}
