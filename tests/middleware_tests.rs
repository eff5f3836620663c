mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::Trail;
use modrouter::middleware::{MetricsMiddleware, TracingMiddleware};
use modrouter::{
    Application, Context, Controller, ControllerDef, Flow, HttpMethod, IncomingRequest, MethodRoute,
    Middleware, ModuleDef, RouteDef, RouterConfig,
};
use serde_json::{json, Value};

#[test]
fn test_middleware_order_global_module_route_method() {
    let trail = Trail::new();
    let handler_trail = trail.clone();
    let module = ModuleDef::new("AppModule")
        .middleware(trail.native("B"))
        .route(
            RouteDef::new("items")
                .middleware(trail.native("C"))
                .method(
                    HttpMethod::Get,
                    MethodRoute::new(move |_| {
                        handler_trail.push("handler");
                        Ok(json!("ok"))
                    })
                    .middleware(trail.native("D")),
                ),
        );
    let app = Application::builder()
        .use_middleware(trail.native("A"))
        .module(module)
        .build()
        .unwrap();

    let resp = app.dispatch(IncomingRequest::get("/items"));
    assert_eq!(resp.status, 200);
    assert_eq!(trail.steps(), vec!["A", "B", "C", "D", "handler"]);
}

#[test]
fn test_guards_ordering_for_method_handlers() {
    let trail = Trail::new();
    let app = Application::builder()
        .route(
            RouteDef::new("admin")
                .guard(trail.native("route-guard"))
                .middleware(trail.native("route-mw"))
                .method(
                    HttpMethod::Get,
                    MethodRoute::new(|_| Ok(Value::Null))
                        .middleware(trail.native("method-mw"))
                        .guard(trail.native("method-guard")),
                ),
        )
        .build()
        .unwrap();
    app.dispatch(IncomingRequest::get("/admin"));
    assert_eq!(
        trail.steps(),
        vec!["route-guard", "route-mw", "method-guard", "method-mw"]
    );
}

struct GuardedController {
    trail: Trail,
}

impl Controller for GuardedController {
    fn methods(&self) -> Vec<HttpMethod> {
        vec![HttpMethod::Get]
    }

    fn handle(&self, _method: HttpMethod, _ctx: &mut Context) -> anyhow::Result<Value> {
        Ok(Value::Null)
    }

    fn middlewares(&self, _method: HttpMethod) -> Vec<Middleware> {
        vec![self.trail.native("controller-mw")]
    }

    fn guards(&self, _method: HttpMethod) -> Vec<Middleware> {
        vec![self.trail.native("controller-guard")]
    }
}

#[test]
fn test_guards_ordering_for_controllers() {
    let trail = Trail::new();
    let controller_trail = trail.clone();
    let app = Application::builder()
        .declare(ControllerDef::new("Guarded", move |_| {
            Ok(GuardedController {
                trail: controller_trail.clone(),
            })
        }))
        .route(
            RouteDef::new("admin")
                .guard(trail.native("route-guard"))
                .middleware(trail.native("route-mw"))
                .controller("Guarded"),
        )
        .build()
        .unwrap();
    app.dispatch(IncomingRequest::get("/admin"));
    assert_eq!(
        trail.steps(),
        vec!["route-mw", "route-guard", "controller-guard", "controller-mw"]
    );
}

#[test]
fn test_module_middlewares_inherited_root_first() {
    let trail = Trail::new();
    let child = ModuleDef::new("Child")
        .prefix("child")
        .middleware(trail.native("child"))
        .route(RouteDef::new("x").get(|_| Ok(Value::Null)));
    let app = Application::builder()
        .module(
            ModuleDef::new("Root")
                .middleware(trail.native("root"))
                .import(child),
        )
        .build()
        .unwrap();
    app.dispatch(IncomingRequest::get("/child/x"));
    assert_eq!(trail.steps(), vec!["root", "child"]);
}

#[test]
fn test_native_and_foreign_interleave() {
    let trail = Trail::new();
    let app = Application::builder()
        .use_middleware(trail.foreign("f1"))
        .use_middleware(trail.native("n1"))
        .use_middleware(trail.foreign("f2"))
        .route(RouteDef::new("x").get(|_| Ok(json!(1))))
        .build()
        .unwrap();
    let resp = app.dispatch(IncomingRequest::get("/x"));
    assert_eq!(resp.body, json!(1));
    assert_eq!(trail.steps(), vec!["f1", "n1", "f2"]);
}

#[test]
fn test_short_circuit_skips_rest_and_handler() {
    let trail = Trail::new();
    let handler_calls = Arc::new(AtomicUsize::new(0));
    let calls = Arc::clone(&handler_calls);
    let app = Application::builder()
        .use_middleware(trail.native("first"))
        .use_middleware(Middleware::foreign(|_req, _res, next| {
            next.call(Some(anyhow::anyhow!("Forbidden: missing token")));
        }))
        .use_middleware(trail.native("never"))
        .route(RouteDef::new("secret").get(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        }))
        .build()
        .unwrap();

    let resp = app.dispatch(IncomingRequest::get("/secret"));
    assert_eq!(resp.status, 500);
    assert_eq!(resp.body, json!({ "message": "Forbidden: missing token" }));
    assert_eq!(trail.steps(), vec!["first"]);
    assert_eq!(handler_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_native_fail_short_circuits() {
    let app = Application::builder()
        .use_middleware(Middleware::native(|_ctx, next| next.fail(anyhow::anyhow!("rate limited"))))
        .route(RouteDef::new("x").get(|_| Ok(Value::Null)))
        .build()
        .unwrap();
    let resp = app.dispatch(IncomingRequest::get("/x"));
    assert_eq!(resp.status, 500);
    assert_eq!(resp.body["message"], "rate limited");
}

#[test]
fn test_middleware_can_answer_itself() {
    let app = Application::builder()
        .use_middleware(Middleware::foreign(|req, res, _next| {
            if req.header("authorization").is_none() {
                res.set_status(401).set_header("www-authenticate", "Bearer");
                res.send(json!({ "error": "unauthorized" }));
            }
        }))
        .route(RouteDef::new("me").get(|_| Ok(json!("me"))))
        .build()
        .unwrap();

    let resp = app.dispatch(IncomingRequest::get("/me"));
    assert_eq!(resp.status, 401);
    assert_eq!(resp.body, json!({ "error": "unauthorized" }));
    assert_eq!(resp.get_header("www-authenticate"), Some("Bearer"));
}

#[test]
fn test_native_halt_defaults_to_200_null() {
    let app = Application::builder()
        .use_middleware(Middleware::native(|_ctx, _next| Ok(Flow::Halted)))
        .route(RouteDef::new("x").get(|_| Ok(json!("unreachable"))))
        .build()
        .unwrap();
    let resp = app.dispatch(IncomingRequest::get("/x"));
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, Value::Null);
}

#[test]
fn test_foreign_locals_reach_handler() {
    let app = Application::builder()
        .use_middleware(Middleware::foreign(|req, _res, next| {
            req.locals.insert("user".to_string(), json!("alice"));
            next.proceed();
        }))
        .route(RouteDef::new("whoami").get(|ctx| Ok(ctx.local("user").cloned().unwrap_or_default())))
        .build()
        .unwrap();
    let resp = app.dispatch(IncomingRequest::get("/whoami"));
    assert_eq!(resp.body, json!("alice"));
}

#[test]
fn test_code_after_next_sees_result() {
    let app = Application::builder()
        .use_middleware(Middleware::native(|ctx, next| {
            let result = next.run(ctx);
            ctx.response.set_header("x-after", "seen");
            result
        }))
        .route(RouteDef::new("x").get(|_| Ok(json!(1))))
        .build()
        .unwrap();
    let resp = app.dispatch(IncomingRequest::get("/x"));
    assert_eq!(resp.get_header("x-after"), Some("seen"));
}

#[test]
fn test_chain_timeout() {
    let config = RouterConfig {
        chain_timeout_ms: Some(5),
        ..RouterConfig::default()
    };
    let reached = Arc::new(AtomicUsize::new(0));
    let hits = Arc::clone(&reached);
    let app = Application::builder()
        .config(config)
        .use_middleware(Middleware::native(|ctx, next| {
            thread::sleep(Duration::from_millis(30));
            next.run(ctx)
        }))
        .route(RouteDef::new("slow").get(move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        }))
        .build()
        .unwrap();
    let resp = app.dispatch(IncomingRequest::get("/slow"));
    assert_eq!(resp.status, 500);
    assert!(resp.body["message"].as_str().unwrap().contains("deadline"));
    assert_eq!(reached.load(Ordering::SeqCst), 0);
}

#[test]
fn test_metrics_middleware_counts() {
    let metrics = Arc::new(MetricsMiddleware::new());
    let app = Application::builder()
        .use_middleware(Middleware::Native(metrics.clone()))
        .use_middleware(Middleware::Native(Arc::new(TracingMiddleware)))
        .route(RouteDef::new("ok").get(|_| Ok(Value::Null)))
        .route(RouteDef::new("boom").get(|_| Err(anyhow::anyhow!("boom"))))
        .build()
        .unwrap();

    app.dispatch(IncomingRequest::get("/ok"));
    app.dispatch(IncomingRequest::get("/ok"));
    app.dispatch(IncomingRequest::get("/boom"));
    app.dispatch(IncomingRequest::get("/missing"));

    assert_eq!(metrics.request_count(), 3);
    assert_eq!(metrics.error_count(), 1);
    assert_eq!(metrics.halted_count(), 0);
}
