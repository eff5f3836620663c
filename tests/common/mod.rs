#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use modrouter::{
    Application, Context, Controller, ControllerDef, HttpMethod, Middleware, ModuleDef, Provider,
    RouteDef,
};
use serde_json::{json, Value};

/// Service injected into [`GreetController`].
#[derive(Debug)]
pub struct GreetService {
    pub greeting: String,
}

impl GreetService {
    pub fn greet(&self, name: &str) -> String {
        format!("{} {}", self.greeting, name)
    }
}

pub struct GreetController {
    pub service: Arc<GreetService>,
}

impl Controller for GreetController {
    fn methods(&self) -> Vec<HttpMethod> {
        vec![HttpMethod::Get]
    }

    fn handle(&self, _method: HttpMethod, ctx: &mut Context) -> anyhow::Result<Value> {
        let name = ctx.query_param("name").unwrap_or("World");
        Ok(json!(self.service.greet(name)))
    }
}

pub fn greet_module() -> ModuleDef {
    ModuleDef::new("AppModule")
        .provider(Provider::new("GreetService", |_| {
            Ok(GreetService {
                greeting: "Hello".to_string(),
            })
        }))
        .declare(
            ControllerDef::new("GreetController", |deps| {
                Ok(GreetController {
                    service: deps.get::<GreetService>(0)?,
                })
            })
            .depends_on(["GreetService"]),
        )
        .route(RouteDef::new("greet").controller("GreetController"))
}

/// The smallest complete application: `GET /greet` answers "Hello World".
pub fn greet_app() -> Application {
    Application::builder()
        .module(greet_module())
        .build()
        .expect("greet app builds")
}

/// Shared log of the order in which middlewares ran.
#[derive(Clone, Default)]
pub struct Trail(Arc<Mutex<Vec<String>>>);

impl Trail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, step: impl Into<String>) {
        self.0.lock().unwrap().push(step.into());
    }

    pub fn steps(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// A native middleware that records `label` and continues.
    pub fn native(&self, label: &'static str) -> Middleware {
        let trail = self.clone();
        Middleware::native(move |ctx, next| {
            trail.push(label);
            next.run(ctx)
        })
    }

    /// A foreign middleware that records `label` and calls `next()`.
    pub fn foreign(&self, label: &'static str) -> Middleware {
        let trail = self.clone();
        Middleware::foreign(move |_req, _res, next| {
            trail.push(label);
            next.call(None);
        })
    }
}
