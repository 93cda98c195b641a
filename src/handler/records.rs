//! Endpoints backed by the in-memory stores

use hyper::StatusCode;

use crate::config::AppState;
use crate::http::{json_response, ApiError, ApiRequest, HttpResponse};
use crate::models::Item2;

/// Full replace: fields missing from the body take their defaults
pub async fn replace_item2(state: &AppState, req: &ApiRequest) -> Result<HttpResponse, ApiError> {
    let item_id: String = req.path_param("item_id")?;
    let item: Item2 = req.json()?;

    let stored = state.items.replace(&item_id, item).await;
    Ok(json_response(StatusCode::OK, &stored))
}

/// Partial update: only fields present in the body overwrite the record
pub async fn patch_item2(state: &AppState, req: &ApiRequest) -> Result<HttpResponse, ApiError> {
    let item_id: String = req.path_param("item_id")?;
    // Typed parse first so bad field types are reported as 422
    let (_, raw): (Item2, _) = req.json_with_value()?;
    let update = raw.as_object().ok_or_else(ApiError::not_a_dict)?;

    match state.items.merge(&item_id, update).await? {
        Some(updated) => Ok(json_response(StatusCode::OK, &updated)),
        None => Err(ApiError::ItemNotFound(item_id)),
    }
}

/// 201 when this call created the task, 200 when it already existed
pub async fn get_or_create_task(
    state: &AppState,
    req: &ApiRequest,
) -> Result<HttpResponse, ApiError> {
    let task_id: String = req.path_param("task_id")?;
    let (task, created) = state.tasks.get_or_create(&task_id).await;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok(json_response(status, &task))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::testing::{body_json, send, state};
    use hyper::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_replaces_with_defaults() {
        let state = state();
        let req = ApiRequest::new(Method::PUT, "/items2/bar").with_json(&json!({"name": "New"}));
        let resp = send(&state, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await,
            json!({"name": "New", "description": null, "price": null, "tax": 10.5, "tags": []})
        );
        let stored = state.items.get("bar").await.unwrap();
        assert_eq!(stored.description, None);
    }

    #[tokio::test]
    async fn test_patch_merges_and_is_idempotent() {
        let state = state();
        let patch = json!({"name": "Barz", "price": 3});

        let first = send(
            &state,
            ApiRequest::new(Method::PATCH, "/items2/bar").with_json(&patch),
        )
        .await;
        assert_eq!(first.status(), StatusCode::OK);
        let first = body_json(first).await;
        assert_eq!(first["name"], "Barz");
        assert_eq!(first["description"], "The bartenders");
        assert_eq!(first["tax"], 20.2);

        let second = send(
            &state,
            ApiRequest::new(Method::PATCH, "/items2/bar").with_json(&patch),
        )
        .await;
        assert_eq!(body_json(second).await, first);
    }

    #[tokio::test]
    async fn test_patch_unknown_item() {
        let req = ApiRequest::new(Method::PATCH, "/items2/nope").with_json(&json!({"name": "x"}));
        let resp = send(&state(), req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await, json!({"detail": "Item not found"}));
    }

    #[tokio::test]
    async fn test_patch_rejects_bad_types() {
        let req = ApiRequest::new(Method::PATCH, "/items2/foo").with_json(&json!({"tax": "lots"}));
        let resp = send(&state(), req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_put_and_patch_reject_positional_records() {
        let state = state();
        for method in [Method::PUT, Method::PATCH] {
            let req = ApiRequest::new(method, "/items2/bar")
                .with_json(&json!(["Bar", null, 1.0, 10.5, []]));
            let resp = send(&state, req).await;
            assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
            let body = body_json(resp).await;
            assert_eq!(body["detail"][0]["loc"], json!(["body"]));
            assert_eq!(body["detail"][0]["type"], "type_error.dict");
        }
        assert_eq!(
            state.items.get("bar").await.unwrap().description.as_deref(),
            Some("The bartenders")
        );
    }

    #[tokio::test]
    async fn test_get_or_create_task() {
        let state = state();
        let req = || ApiRequest::new(Method::PUT, "/get-or-create-task/new-id");

        let resp = send(&state, req()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(body_json(resp).await, json!("This didn't exist before"));

        let resp = send(&state, req()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(&state, ApiRequest::new(Method::PUT, "/get-or-create-task/foo")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!("Listen to the Bar Fighters"));
    }
}
