use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use modrouter::{Application, HttpMethod, IncomingRequest, MethodRoute, RouteDef, RouterConfig};
use serde_json::Value;

fn ok() -> MethodRoute {
    MethodRoute::new(|_| Ok(Value::Null))
}

/// The verb zoo plus a few deep parametric paths.
fn zoo_app(config: RouterConfig) -> Application {
    Application::builder()
        .config(config)
        .route(RouteDef::new("").method(HttpMethod::Get, ok()))
        .route(
            RouteDef::new("zoo/animals")
                .method(HttpMethod::Get, ok())
                .method(HttpMethod::Post, ok()),
        )
        .route(
            RouteDef::new("zoo/animals/:id")
                .method(HttpMethod::Get, ok())
                .method(HttpMethod::Put, ok())
                .method(HttpMethod::Patch, ok())
                .method(HttpMethod::Delete, ok()),
        )
        .route(RouteDef::new("zoo/animals/:id/toys/:toy_id").method(HttpMethod::Get, ok()))
        .route(
            RouteDef::new("zoo/:category/animals/:id/habitats/:habitat_id/sections/:section_id")
                .method(HttpMethod::Get, ok()),
        )
        .route(
            RouteDef::new("inventory/:warehouse_id/feeds/:feed_id/items/:item_id/batches/:batch_id")
                .method(HttpMethod::Post, ok()),
        )
        .route(RouteDef::new("complex/:a/:b/:c/:d/:e/:f/:g/:h/:i").method(HttpMethod::Get, ok()))
        .route(
            RouteDef::new("zoo/health")
                .method(HttpMethod::Head, ok())
                .method(HttpMethod::Options, ok()),
        )
        .build()
        .expect("zoo app builds")
}

const PARAM_PATHS: [(HttpMethod, &str); 5] = [
    (HttpMethod::Get, "zoo/animals/123"),
    (HttpMethod::Get, "zoo/animals/123/toys/456"),
    (HttpMethod::Get, "zoo/cats/animals/123/habitats/88/sections/5"),
    (HttpMethod::Post, "inventory/1/feeds/2/items/3/batches/4"),
    (HttpMethod::Get, "complex/1/2/3/4/5/6/7/8/9"),
];

fn bench_static_match(c: &mut Criterion) {
    let app = zoo_app(RouterConfig::default());
    let router = app.router();
    c.bench_function("trie_static_match", |b| {
        b.iter(|| {
            black_box(router.find(HttpMethod::Get, black_box("zoo/animals")));
            black_box(router.find(HttpMethod::Head, black_box("zoo/health")));
        })
    });
}

fn bench_param_match(c: &mut Criterion) {
    let app = zoo_app(RouterConfig::default());
    let router = app.router();
    c.bench_function("trie_param_match", |b| {
        b.iter(|| {
            for (method, path) in PARAM_PATHS.iter() {
                black_box(router.find(*method, black_box(path)));
            }
        })
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let cached = zoo_app(RouterConfig::default());
    let uncached = zoo_app(RouterConfig {
        route_cache_enabled: false,
        ..RouterConfig::default()
    });

    let mut group = c.benchmark_group("dispatch");
    group.bench_function("cached", |b| {
        b.iter(|| black_box(cached.dispatch(IncomingRequest::get("/zoo/animals/123/toys/456"))))
    });
    group.bench_function("uncached", |b| {
        b.iter(|| black_box(uncached.dispatch(IncomingRequest::get("/zoo/animals/123/toys/456"))))
    });
    group.finish();
}

criterion_group!(benches, bench_static_match, bench_param_match, bench_dispatch);
criterion_main!(benches);
