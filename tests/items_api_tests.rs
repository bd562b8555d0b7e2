//! End-to-end tests over a real socket against the embedded OpenAPI document.

mod common;

use common::test_server::{parse_response, request, send_request, ItemsTestServer};
use rstest::rstest;
use serde_json::{json, Value};

fn call(server: &ItemsTestServer, method: &str, path: &str, body: Option<&str>) -> (u16, Value) {
    let resp = send_request(&server.addr(), &request(method, path, body));
    parse_response(&resp)
}

#[test]
fn test_health_endpoint() {
    let server = ItemsTestServer::new();
    let (status, body) = call(&server, "GET", "/health", None);
    assert_eq!(status, 200);
    assert_eq!(body, json!({"status": "ok"}));
}

#[rstest]
#[case(r#"{"name":"book","price":12.5}"#, json!({"id": 1, "name": "book", "price": 12.5}))]
#[case(r#"{"name":"","price":0.01}"#, json!({"id": 1, "name": "", "price": 0.01}))]
#[case(r#"{"name":"pen","price":3,"colour":"red"}"#, json!({"id": 1, "name": "pen", "price": 3.0}))]
fn test_create_item_echoes_with_fixed_id(#[case] payload: &str, #[case] expected: Value) {
    let server = ItemsTestServer::new();
    let (status, body) = call(&server, "POST", "/items", Some(payload));
    assert_eq!(status, 200);
    assert_eq!(body, expected);
}

#[rstest]
#[case(r#"{"name":"book","price":0}"#)]
#[case(r#"{"name":"book","price":-4.5}"#)]
fn test_create_item_rejects_non_positive_price(#[case] payload: &str) {
    let server = ItemsTestServer::new();
    let (status, body) = call(&server, "POST", "/items", Some(payload));
    assert_eq!(status, 400);
    assert_eq!(body, json!({"detail": "price must be > 0"}));
}

#[rstest]
#[case(r#"{"name":"book"}"#, "missing", vec!["body", "price"])]
#[case(r#"{"price":2}"#, "missing", vec!["body", "name"])]
#[case(r#"{"name":"book","price":"cheap"}"#, "float_type", vec!["body", "price"])]
#[case(r#"{"name":7,"price":2}"#, "string_type", vec!["body", "name"])]
#[case(r#"[1,2]"#, "model_attributes_type", vec!["body"])]
#[case(r#"{"name":"#, "json_invalid", vec!["body"])]
fn test_create_item_malformed_input(
    #[case] payload: &str,
    #[case] kind: &str,
    #[case] loc: Vec<&str>,
) {
    let server = ItemsTestServer::new();
    let (status, body) = call(&server, "POST", "/items", Some(payload));
    assert_eq!(status, 422);
    let issues = body["detail"].as_array().unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0]["type"], kind);
    assert_eq!(issues[0]["loc"], json!(loc));
    assert!(issues[0]["msg"].as_str().is_some_and(|m| !m.is_empty()));
}

#[test]
fn test_create_item_reports_every_missing_field() {
    let server = ItemsTestServer::new();
    let (status, body) = call(&server, "POST", "/items", Some("{}"));
    assert_eq!(status, 422);
    let locs: Vec<Value> = body["detail"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["loc"].clone())
        .collect();
    assert_eq!(locs, vec![json!(["body", "name"]), json!(["body", "price"])]);
}

#[rstest]
#[case("/items/1")]
#[case("/items/01")]
#[case("/items/%31")]
fn test_get_sample_item(#[case] path: &str) {
    let server = ItemsTestServer::new();
    let (status, body) = call(&server, "GET", path, None);
    assert_eq!(status, 200);
    assert_eq!(body, json!({"id": 1, "name": "sample", "price": 10.0}));
}

#[rstest]
#[case("/items/2")]
#[case("/items/0")]
#[case("/items/-1")]
#[case("/items/%2D1")]
#[case("/items/99999999999999999999999")]
fn test_get_unknown_item(#[case] path: &str) {
    let server = ItemsTestServer::new();
    let (status, body) = call(&server, "GET", path, None);
    assert_eq!(status, 404);
    assert_eq!(body, json!({"detail": "not found"}));
}

#[rstest]
#[case("/items/abc")]
#[case("/items/1.5")]
#[case("/items/%201")]
fn test_get_item_with_non_integer_id(#[case] path: &str) {
    let server = ItemsTestServer::new();
    let (status, body) = call(&server, "GET", path, None);
    assert_eq!(status, 422);
    assert_eq!(body["detail"][0]["type"], "int_parsing");
    assert_eq!(body["detail"][0]["loc"], json!(["path", "item_id"]));
}

#[test]
fn test_unknown_path_and_wrong_method() {
    let server = ItemsTestServer::new();

    let (status, body) = call(&server, "GET", "/nope", None);
    assert_eq!(status, 404);
    assert_eq!(body, json!({"detail": "Not Found"}));

    let (status, body) = call(&server, "DELETE", "/items/1", None);
    assert_eq!(status, 405);
    assert_eq!(body, json!({"detail": "Method Not Allowed"}));
}

#[test]
fn test_openapi_document_is_served() {
    let server = ItemsTestServer::new();
    let (status, body) = call(&server, "GET", "/openapi.yaml", None);
    assert_eq!(status, 200);
    let text = body.as_str().unwrap();
    assert!(text.contains("openapi: 3.1.0"));
    assert!(text.contains("/items/{item_id}"));
}
