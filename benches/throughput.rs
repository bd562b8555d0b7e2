use criterion::{criterion_group, criterion_main, Criterion};
use http::Method;
use items_api::router::Router;
use items_api::server::{AppService, ParsedRequest};
use items_api::spec::load_embedded_spec;
use items_api::validator::ValidatorCache;
use serde_json::json;
use std::hint::black_box;

fn bench_route_match(c: &mut Criterion) {
    let spec = load_embedded_spec().expect("embedded spec");
    let router = Router::new(spec.routes).expect("router");
    let cases = [
        (Method::GET, "/health"),
        (Method::POST, "/items"),
        (Method::GET, "/items/1"),
        (Method::GET, "/items/abc"),
        (Method::DELETE, "/items/1"),
        (Method::GET, "/does/not/exist"),
    ];
    c.bench_function("route_match", |b| {
        b.iter(|| {
            for (method, path) in cases.iter() {
                black_box(router.route(method, path));
            }
        })
    });
}

fn bench_body_validation(c: &mut Criterion) {
    let spec = load_embedded_spec().expect("embedded spec");
    let route = spec
        .routes
        .iter()
        .find(|r| r.handler_name.as_ref() == "create_item")
        .expect("create_item route");
    let schema = route.request_schema.clone().expect("request schema");
    let cache = ValidatorCache::default();
    let valid = json!({"name": "book", "price": 12.5});
    let invalid = json!({"name": 7});

    c.bench_function("validate_body_valid", |b| {
        b.iter(|| black_box(cache.validate_body(route, &schema, &valid)))
    });
    c.bench_function("validate_body_invalid", |b| {
        b.iter(|| black_box(cache.validate_body(route, &schema, &invalid)))
    });
}

fn bench_service_handle(c: &mut Criterion) {
    may::config().set_stack_size(0x8000);
    let spec = load_embedded_spec().expect("embedded spec");
    let svc = AppService::from_spec(&spec, true).expect("service");
    let body = br#"{"name":"book","price":12.5}"#;

    c.bench_function("handle_get_item", |b| {
        b.iter(|| black_box(svc.handle(ParsedRequest::new("GET", "/items/1"))))
    });
    c.bench_function("handle_create_item", |b| {
        b.iter(|| black_box(svc.handle(ParsedRequest::new("POST", "/items").with_body(body))))
    });
}

criterion_group!(benches, bench_route_match, bench_body_validation, bench_service_handle);
criterion_main!(benches);
