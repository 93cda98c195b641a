//! Endpoints that customize the response itself
//!
//! Content type, encoder, redirects, cookies and extra headers.

use hyper::StatusCode;
use serde_json::json;

use crate::http::{
    html_response, json_response, raw_json_response, redirect_response, set_cookie, with_header,
    xml_response, ApiError, Cookie, HttpResponse,
};

const LEGACY_XML: &str = r#"<?xml version="1.0"?>
    <shampoo>
    <Header>
    Apply shampoo here.
    </Header>
    <Body>
    You'll have to use soap here.
    </Body>
    </shampoo>
    "#;

const ITEMS_HTML: &str = "
    <html>
        <head>
            <title>Some HTML in here</title>
        </head>
        <body>
            <h1>Look ma! HTML!</h1>
        </body>
    </html>
    ";

const TYPER_URL: &str = "https://typer.tiangolo.com";

const SESSION_COOKIE: Cookie<'static> = Cookie::new("fakesession", "fake-cookie-session-value");

pub fn get_legacy_data() -> HttpResponse {
    xml_response(LEGACY_XML)
}

/// Encoded up front and sent as-is
pub fn read_items5() -> Result<HttpResponse, ApiError> {
    let body = serde_json::to_vec(&json!([{ "item_id": "Foo" }]))?;
    Ok(raw_json_response(StatusCode::OK, body))
}

pub fn read_items6() -> HttpResponse {
    html_response(ITEMS_HTML)
}

pub fn redirect_typer() -> HttpResponse {
    redirect_response(TYPER_URL)
}

fn cookie_message() -> HttpResponse {
    json_response(
        StatusCode::OK,
        &json!({ "message": "Come to the dark side, we have cookies" }),
    )
}

/// Cookie set on the response the handler is given
pub fn create_cookie_and_object() -> HttpResponse {
    set_cookie(cookie_message(), &SESSION_COOKIE)
}

/// Cookie set on a response the handler builds itself
pub fn create_cookie() -> HttpResponse {
    let response = cookie_message();
    set_cookie(response, &SESSION_COOKIE)
}

fn hello_world() -> HttpResponse {
    json_response(StatusCode::OK, &json!({ "message": "Hello World" }))
}

pub fn get_headers_and_object() -> HttpResponse {
    with_header(hello_world(), "x-cat-dog", "alone in the world")
}

pub fn get_headers() -> HttpResponse {
    let resp = with_header(hello_world(), "x-cat-dog", "alone in the world");
    with_header(resp, "content-language", "en-US")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::testing::{body_json, body_text, send, state};
    use crate::http::ApiRequest;
    use hyper::header::{CONTENT_TYPE, LOCATION, SET_COOKIE};
    use hyper::Method;

    fn get(path: &str) -> ApiRequest {
        ApiRequest::new(Method::GET, path)
    }

    #[tokio::test]
    async fn test_legacy_xml() {
        let resp = send(&state(), get("/legacy/")).await;
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/xml");
        let body = body_text(resp).await;
        assert!(body.starts_with("<?xml version=\"1.0\"?>"));
        assert!(body.contains("Apply shampoo here."));
    }

    #[tokio::test]
    async fn test_items5_compact_json() {
        let resp = send(&state(), get("/items5/")).await;
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(body_text(resp).await, r#"[{"item_id":"Foo"}]"#);
    }

    #[tokio::test]
    async fn test_items6_html() {
        let resp = send(&state(), get("/items6/")).await;
        assert_eq!(resp.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
        assert!(body_text(resp).await.contains("<h1>Look ma! HTML!</h1>"));
    }

    #[tokio::test]
    async fn test_typer_redirect() {
        let resp = send(&state(), get("/typer")).await;
        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(resp.headers()[LOCATION], TYPER_URL);
    }

    #[tokio::test]
    async fn test_cookie_endpoints() {
        for path in ["/cookie-and-object/", "/cookie/"] {
            let resp = send(&state(), ApiRequest::new(Method::POST, path)).await;
            let cookie = resp.headers()[SET_COOKIE].to_str().unwrap().to_string();
            assert!(cookie.starts_with("fakesession=fake-cookie-session-value"));
            assert_eq!(
                body_json(resp).await,
                json!({"message": "Come to the dark side, we have cookies"})
            );
        }
    }

    #[tokio::test]
    async fn test_custom_headers() {
        let resp = send(&state(), get("/headers-and-object/")).await;
        assert_eq!(resp.headers()["x-cat-dog"], "alone in the world");
        assert!(resp.headers().get("content-language").is_none());

        let resp = send(&state(), get("/headers/")).await;
        assert_eq!(resp.headers()["x-cat-dog"], "alone in the world");
        assert_eq!(resp.headers()["content-language"], "en-US");
        assert_eq!(body_json(resp).await, json!({"message": "Hello World"}));
    }
}
