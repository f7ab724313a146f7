mod common;

use common::{bag, client, jpeg, kernel, text_file, valid_map, valid_raw};
use restparam::testing::TestClient;
use restparam::{ListenerMode, Method, Request, RequestBuilder, StatusCode, UploadError};
use serde_json::{json, Value};

async fn post(client: &TestClient, uri: &str, form: Value) -> Value {
    let response = client.post(uri, bag(form)).await.unwrap();
    assert!(response.is_successful(), "request failed: {}", response.text());
    response.json().unwrap()
}

#[tokio::test]
async fn default_parameters() {
    let data = post(&client(), "/params", json!({})).await;
    assert_eq!(data["raw"], "invalid");
    assert_eq!(data["map"], "invalid2 %");
    assert_eq!(data["bar"], Value::Null);
}

#[tokio::test]
async fn valid_raw_parameter() {
    let data = post(&client(), "/params", json!({"raw": valid_raw(), "map": valid_map()})).await;
    assert_eq!(data["raw"], valid_raw());
    // each element of a map param must match on its own
    assert_eq!(data["map"], "invalid2 %");
    assert_eq!(data["bar"], Value::Null);
}

#[tokio::test]
async fn valid_map_parameter() {
    let map = json!({"foo": valid_map(), "bar": valid_map()});
    let data = post(&client(), "/params", json!({"raw": "bar", "map": map.clone(), "bar": "bar foo"})).await;
    assert_eq!(data["raw"], "invalid");
    assert_eq!(data["map"], map);
    assert_eq!(data["bar"], "bar foo");
}

#[tokio::test]
async fn with_sub_requests() {
    let req = Request::builder(Method::POST, "/params/test?foo=quz")
        .form_bag(bag(json!({"raw": valid_raw()})))
        .build()
        .unwrap();
    let response = client().request(req).await;
    assert!(response.is_successful(), "request failed: {}", response.text());

    let data: Value = response.json().unwrap();
    assert_eq!(data["before"], json!({"foo": "quz", "bar": "foo"}));
    assert_eq!(
        data["during"],
        json!({"raw": valid_raw(), "map": "invalid2 %", "bar": null, "foz": "", "baz": ""})
    );
    assert_eq!(data["after"], json!({"foo": "quz", "bar": "foo"}));
}

#[tokio::test]
async fn valid_query_parameter() {
    let data = post(&client(), "/params?foz=val1", json!({})).await;
    assert_eq!(data["foz"], "");
}

#[tokio::test]
async fn incompatible_query_parameter() {
    let response = client().post("/params?foz=val1&baz=val2", Default::default()).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.text().contains(r#"\"baz\" param is incompatible with foz param."#));
}

#[tokio::test]
async fn strict_violation_is_a_bad_request() {
    let response = client().post("/params/strict", bag(json!({"id": "abc"}))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().unwrap();
    assert_eq!(
        body["message"],
        r#"Parameter "id" of value "abc" violated a constraint "Parameter 'id' value, does not match requirements '\d+'""#
    );

    let data = post(&client(), "/params/strict", json!({"id": "42"})).await;
    assert_eq!(data, json!({"id": "42", "raw": "class default", "bar": null}));
}

// ── Files ─────────────────────────────────────────────────────────────────────

async fn upload(req: RequestBuilder) -> Value {
    let response = client().request(req.build().unwrap()).await;
    assert!(response.is_successful(), "request failed: {}", response.text());
    response.json().unwrap()
}

#[tokio::test]
async fn file_param_with_errors() {
    let file = jpeg("cat.jpeg").with_error(UploadError::from_code(7));
    let req = Request::builder(Method::POST, "/file/test").file("single_file", file);
    assert_eq!(upload(req).await, json!({"single_file": "noFile"}));
}

#[tokio::test]
async fn file_param() {
    let req = Request::builder(Method::POST, "/file/test").file("single_file", jpeg("cat.jpeg"));
    assert_eq!(upload(req).await, json!({"single_file": "cat.jpeg"}));
}

#[tokio::test]
async fn file_param_null() {
    let req = Request::builder(Method::POST, "/file/test");
    assert_eq!(upload(req).await, json!({"single_file": "noFile"}));
}

#[tokio::test]
async fn file_param_array() {
    let req = Request::builder(Method::POST, "/file/collection/test")
        .files("array_files", vec![jpeg("cat.jpeg"), text_file("bar.txt", "text/plain")]);
    assert_eq!(
        upload(req).await,
        json!({"array_files": ["cat.jpeg", "bar.txt"]})
    );
}

#[tokio::test]
async fn file_param_image_constraint_array() {
    let req = Request::builder(Method::POST, "/image/collection/test")
        .files("array_images", vec![jpeg("cat.jpeg"), jpeg("cat.jpeg")]);
    assert_eq!(
        upload(req).await,
        json!({"array_images": ["cat.jpeg", "cat.jpeg"]})
    );
}

#[tokio::test]
async fn file_param_image_constraint_array_rejects_non_images() {
    let req = Request::builder(Method::POST, "/image/collection/test")
        .files("array_images", vec![jpeg("cat.jpeg"), text_file("bar.txt", "plain/text")]);
    assert_eq!(
        upload(req).await,
        json!({"array_images": "NotAnImage"})
    );
}

// ── Listener modes ────────────────────────────────────────────────────────────

#[tokio::test]
async fn force_mode_stores_params_as_attributes() {
    let forced = TestClient::new(kernel(ListenerMode::Force));
    let response = forced.get("/params/attributes?foz=abc").await.unwrap();
    assert!(response.is_successful(), "request failed: {}", response.text());
    let data: Value = response.json().unwrap();
    assert_eq!(data["foz"], "abc");
    assert_eq!(data["raw"], "invalid");

    let response = client().get("/params/attributes?foz=abc").await.unwrap();
    assert_eq!(response.json::<Value>().unwrap(), json!({}));
}

#[tokio::test]
async fn force_mode_short_circuits_on_failure() {
    let forced = TestClient::new(kernel(ListenerMode::Force));
    let response = forced.get("/params/attributes?foz=a&baz=b").await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn routes_without_actions_ignore_the_listener() {
    let forced = TestClient::new(kernel(ListenerMode::Force));
    let response = forced.get("/health").await.unwrap();
    assert_eq!(response.text(), "ok");

    let response = forced.get("/missing").await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
