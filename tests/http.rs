mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::state;
use entity_engine::{app, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(state: &AppState, method: Method, uri: &str, principal: Option<(&str, &str)>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = principal {
        builder = builder.header("X-Principal-Id", id).header("X-Principal-Role", role);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_and_version() {
    let state = state();
    let (status, body) = send(&state, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
    let (_, body) = send(&state, Method::GET, "/version", None, None).await;
    assert_eq!(body["name"], json!("entity-engine"));
}

#[tokio::test]
async fn crud_round_trip() {
    let state = state();
    let (status, created) =
        send(&state, Method::POST, "/customers", None, Some(json!({"name": "Ada", "password": "pw"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["id"], json!(1));
    assert!(created["data"].get("password").is_none());

    let (status, read) = send(&state, Method::GET, "/customers/1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["data"]["name"], json!("Ada"));

    let (status, patched) = send(&state, Method::PATCH, "/customers/1", None, Some(json!({"tier": "gold"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["data"]["tier"], json!("gold"));
    assert_eq!(patched["data"]["name"], json!("Ada"));

    let (status, put) = send(&state, Method::PUT, "/customers/1", None, Some(json!({"name": "Ada L."}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(put["data"]["tier"], json!("gold"));

    let (status, page) = send(&state, Method::GET, "/customers", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], json!(1));
    assert_eq!(page["currentPage"], json!(1));
    assert_eq!(page["lastPage"], json!(1));
    assert_eq!(page["perPage"], json!(10));
    assert_eq!(page["data"][0]["name"], json!("Ada L."));

    let (status, options) = send(&state, Method::GET, "/customers/select-options", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(options, json!({"data": [{"id": 1, "label": "Ada L."}], "meta": {"count": 1}}));
}

#[tokio::test]
async fn list_accepts_relation_filters() {
    let state = state();
    state.seeder().seed_all().await.unwrap();
    let (status, all) = send(&state, Method::GET, "/orders?paginated=false", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let total = all["meta"]["count"].as_u64().unwrap();

    let (_, one) = send(&state, Method::GET, "/orders?paginated=false&customer=1", None, None).await;
    let (_, rest) = send(&state, Method::GET, "/orders?paginated=false&customer=2&customer=3&customer=4&customer=5&customer=6&customer=7", None, None).await;
    assert_eq!(one["meta"]["count"].as_u64().unwrap() + rest["meta"]["count"].as_u64().unwrap(), total);
    for order in one["data"].as_array().unwrap() {
        assert_eq!(order["customer_id"], json!(1));
    }

    let (status, _) = send(&state, Method::GET, "/orders?customer=abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn denials_look_like_missing_entities() {
    let state = state();
    let (status, body) = send(&state, Method::GET, "/secrets", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("not_found"));

    let (status, _) = send(&state, Method::GET, "/unicorns", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&state, Method::GET, "/secrets", Some(("7", "user")), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&state, Method::POST, "/secrets", Some(("7", "user")), Some(json!({"value": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&state, Method::POST, "/secrets", Some(("1", "admin")), Some(json!({"value": "x"}))).await;
    assert_eq!(status, StatusCode::CREATED);

    send(&state, Method::POST, "/customers", None, Some(json!({"name": "Ada"}))).await;
    let (status, _) = send(&state, Method::DELETE, "/customers/1", Some(("7", "user")), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, deleted) = send(&state, Method::DELETE, "/customers/1", Some(("1", "admin")), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["data"], json!({"id": 1, "affected": 1}));
}

#[tokio::test]
async fn meta_lists_readable_entities() {
    let state = state();
    let slugs = |body: &Value| -> Vec<String> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["entity"]["slug"].as_str().unwrap().to_string())
            .collect()
    };
    let (status, anonymous) = send(&state, Method::GET, "/meta", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(slugs(&anonymous), vec!["orders", "customers", "products"]);

    let (_, signed_in) = send(&state, Method::GET, "/meta", Some(("7", "user")), None).await;
    assert_eq!(slugs(&signed_in), vec!["orders", "customers", "products", "secrets"]);

    let orders = &anonymous["data"][0];
    assert_eq!(orders["entity"]["seedCount"], json!(common::ORDER_SEED));
    let customer = orders["properties"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["propName"] == json!("customer"))
        .unwrap();
    assert_eq!(customer["type"], json!("relation"));
    assert_eq!(customer["options"]["relation"]["entity"], json!("customers"));
}

#[tokio::test]
async fn malformed_requests_are_bad_requests() {
    let state = state();
    let (status, _) = send(&state, Method::GET, "/customers/abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&state, Method::GET, "/customers?page=two", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&state, Method::GET, "/customers?page=18446744073709551615", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&state, Method::POST, "/customers", None, Some(json!([1, 2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = send(&state, Method::POST, "/customers", None, Some(json!({"email": "x@y.z"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], json!("validation_error"));
}
