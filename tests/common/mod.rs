#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use openacademy::{api::router, db, state::AppState};
use serde_json::{Value, json};
use tower::ServiceExt;

pub async fn app() -> Router {
    let pool = db::connect_in_memory()
        .await
        .expect("Failed to create database");
    router(AppState { db: pool })
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    user: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).expect("Failed to build request"))
        .await
        .expect("Request failed");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Response is not JSON")
    };
    (status, value)
}

pub async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body), None).await
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None, None).await
}

pub async fn patch(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::PATCH, uri, Some(body), None).await
}

pub fn id_of(value: &Value) -> String {
    value["id"].as_str().expect("missing id").to_string()
}

pub async fn create_course(app: &Router, name: &str) -> String {
    let (status, body) = post(app, "/courses", json!({ "name": name })).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    id_of(&body)
}

pub async fn create_partner(app: &Router, name: &str, instructor: bool) -> String {
    let (status, body) = post(
        app,
        "/partners",
        json!({ "name": name, "instructor": instructor }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    id_of(&body)
}

pub async fn create_session(app: &Router, body: Value) -> Value {
    let (status, body) = post(app, "/sessions", body).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

pub fn ids(value: &Value) -> Vec<String> {
    let mut ids: Vec<String> = value
        .as_array()
        .expect("expected an array")
        .iter()
        .map(|v| v.as_str().expect("expected a string").to_string())
        .collect();
    ids.sort();
    ids
}
