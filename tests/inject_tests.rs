mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use common::{GreetController, GreetService};
use modrouter::{
    Application, ConfigError, Context, Controller, ControllerDef, HttpMethod, InstanceRegistry,
    ModuleDef, Provider, RouteDef,
};
use serde_json::Value;

struct Holder {
    service: Arc<GreetService>,
}

impl Controller for Holder {
    fn methods(&self) -> Vec<HttpMethod> {
        vec![HttpMethod::Get]
    }

    fn handle(&self, _method: HttpMethod, _ctx: &mut Context) -> anyhow::Result<Value> {
        Ok(Value::String(self.service.greeting.clone()))
    }
}

fn greet_provider(counter: Arc<AtomicUsize>) -> Provider {
    Provider::new("GreetService", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(GreetService {
            greeting: "Hello".to_string(),
        })
    })
}

#[test]
fn test_singleton_shared_between_controllers() {
    let built = Arc::new(AtomicUsize::new(0));
    let app = Application::builder()
        .provider(greet_provider(Arc::clone(&built)))
        .declare(
            ControllerDef::new("GreetController", |deps| {
                Ok(GreetController {
                    service: deps.get::<GreetService>(0)?,
                })
            })
            .depends_on(["GreetService"]),
        )
        .declare(
            ControllerDef::new("Holder", |deps| {
                Ok(Holder {
                    service: deps.get::<GreetService>(0)?,
                })
            })
            .depends_on(["GreetService"]),
        )
        .route(RouteDef::new("a").controller("GreetController"))
        .route(RouteDef::new("b").controller("Holder"))
        .build()
        .unwrap();

    assert_eq!(built.load(Ordering::SeqCst), 1);
    let first = app.resolve::<GreetService>("GreetService").unwrap();
    let second = app.resolve::<GreetService>("GreetService").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(built.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_resolution_builds_once() {
    let built = Arc::new(AtomicUsize::new(0));
    let app = Arc::new(
        Application::builder()
            .provider(greet_provider(Arc::clone(&built)))
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let app = Arc::clone(&app);
            thread::spawn(move || app.resolve::<GreetService>("GreetService").unwrap())
        })
        .collect();
    let instances: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert!(instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}

#[test]
fn test_provider_dependencies_resolve_transitively() {
    let app = Application::builder()
        .provider(Provider::value("Prefix", String::from("Hi")))
        .provider(
            Provider::new("GreetService", |deps| {
                Ok(GreetService {
                    greeting: deps.get::<String>(0)?.to_string(),
                })
            })
            .depends_on(["Prefix"]),
        )
        .build()
        .unwrap();
    let service = app.resolve::<GreetService>("GreetService").unwrap();
    assert_eq!(service.greet("there"), "Hi there");
}

#[test]
fn test_primitive_dependencies_are_empty_slots() {
    let app = Application::builder()
        .provider(
            Provider::new("Flags", |deps| {
                assert_eq!(deps.len(), 2);
                assert!(deps.raw(0).is_none());
                Ok(deps.optional::<String>(1).is_none())
            })
            .depends_on(["String", "Boolean"]),
        )
        .build()
        .unwrap();
    assert!(*app.resolve::<bool>("Flags").unwrap());
}

#[test]
fn test_provider_cycle_is_reported() {
    let err = Application::builder()
        .provider(Provider::new("A", |deps| Ok(deps.get::<u8>(0)?)).depends_on(["B"]))
        .provider(Provider::new("B", |deps| Ok(deps.get::<u8>(0)?)).depends_on(["A"]))
        .declare(
            ControllerDef::new("GreetController", |deps| {
                Ok(Holder {
                    service: deps.get::<GreetService>(0)?,
                })
            })
            .depends_on(["A"]),
        )
        .route(RouteDef::new("x").controller("GreetController"))
        .build()
        .unwrap_err();

    match err {
        ConfigError::CyclicProvider { chain } => assert_eq!(chain, vec!["A", "B", "A"]),
        other => panic!("expected cycle, got {other:?}"),
    }
}

#[test]
fn test_sibling_providers_are_not_visible() {
    let left = ModuleDef::new("Left").provider(Provider::value("Secret", 1_u8));
    let right = ModuleDef::new("Right")
        .declare(
            ControllerDef::new("Holder", |deps| {
                deps.get::<u8>(0)?;
                Ok(Holder {
                    service: Arc::new(GreetService {
                        greeting: String::new(),
                    }),
                })
            })
            .depends_on(["Secret"]),
        )
        .bootstrap("Holder");
    let err = Application::builder()
        .module(ModuleDef::new("Root").import(left).import(right))
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::ProviderNotFound { ref dependency, ref requested_by }
            if dependency == "Secret" && requested_by == "Holder"
    ));
}

#[test]
fn test_factory_error_aborts_startup() {
    let err = Application::builder()
        .module(
            ModuleDef::new("Root")
                .provider(Provider::new("Database", |_| -> anyhow::Result<u8> {
                    Err(anyhow::anyhow!("connection refused"))
                }))
                .depends_on(["Database"]),
        )
        .build()
        .unwrap_err();
    match err {
        ConfigError::ProviderFactory { provider, source } => {
            assert_eq!(provider, "Database");
            assert_eq!(source.to_string(), "connection refused");
        }
        other => panic!("expected factory error, got {other:?}"),
    }
}

#[test]
fn test_shared_registry_spans_applications() {
    let registry = Arc::new(InstanceRegistry::new());
    let built = Arc::new(AtomicUsize::new(0));
    for _ in 0..2 {
        let app = Application::builder()
            .registry(Arc::clone(&registry))
            .module(
                ModuleDef::new("Root")
                    .provider(greet_provider(Arc::clone(&built)))
                    .depends_on(["GreetService"]),
            )
            .build()
            .unwrap();
        assert!(app.resolve::<GreetService>("GreetService").is_ok());
    }
    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert_eq!(registry.names(), vec!["GreetService".to_string()]);
}
