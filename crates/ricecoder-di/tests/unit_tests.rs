//! Unit tests for the DI container core functionality
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ricecoder_di::*;

#[derive(Debug, PartialEq)]
struct TestService {
    value: i32,
}

pub trait Storage: Send + Sync {
    fn name(&self) -> String;
}

impl Interface for dyn Storage {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::interface::<dyn Storage>(Visibility::Public)
    }
}

struct MemoryStorage;

impl Storage for MemoryStorage {
    fn name(&self) -> String {
        "memory".to_string()
    }
}

struct DiskStorage;

impl Storage for DiskStorage {
    fn name(&self) -> String {
        "disk".to_string()
    }
}

struct Prefixed(Arc<dyn Storage>);

impl Storage for Prefixed {
    fn name(&self) -> String {
        format!("prefixed:{}", self.0.name())
    }
}

#[test]
fn test_register_and_resolve_singleton() {
    let mut builder = ContainerBuilder::new();
    builder
        .register(|_| Ok(TestService { value: 42 }))
        .single_instance();
    let container = builder.build();

    let service1 = container.resolve::<TestService>().unwrap();
    let service2 = container.resolve::<TestService>().unwrap();

    assert_eq!(service1.value, 42);
    assert!(Arc::ptr_eq(&service1, &service2));
    assert_eq!(container.singleton_count(), 1);
}

#[test]
fn test_register_transient() {
    let mut builder = ContainerBuilder::new();
    builder.register(|_| Ok(TestService { value: 42 }));
    let container = builder.build();

    let service1 = container.resolve::<TestService>().unwrap();
    let service2 = container.resolve::<TestService>().unwrap();

    assert_eq!(service1.value, 42);
    assert!(!Arc::ptr_eq(&service1, &service2));
}

#[test]
fn test_scoped_lifetime() {
    let mut builder = ContainerBuilder::new();
    builder
        .register(|_| Ok(TestService { value: 7 }))
        .instance_per_lifetime_scope();
    let container = builder.build();

    let scope_a = container.begin_lifetime_scope();
    let scope_b = container.begin_lifetime_scope();

    let a1 = scope_a.resolve::<TestService>().unwrap();
    let a2 = scope_a.resolve::<TestService>().unwrap();
    let b1 = scope_b.resolve::<TestService>().unwrap();

    assert!(Arc::ptr_eq(&a1, &a2));
    assert!(!Arc::ptr_eq(&a1, &b1));
}

#[test]
fn test_singleton_shared_across_scopes() {
    let mut builder = ContainerBuilder::new();
    builder
        .register(|_| Ok(TestService { value: 1 }))
        .single_instance();
    let container = builder.build();

    let nested = container.begin_lifetime_scope().begin_lifetime_scope();
    let from_nested = nested.resolve::<TestService>().unwrap();
    let from_root = container.resolve::<TestService>().unwrap();

    assert!(Arc::ptr_eq(&from_nested, &from_root));
}

#[test]
fn test_service_not_registered() {
    let container = ContainerBuilder::new().build();

    let result = container.resolve::<TestService>();
    assert!(matches!(result, Err(DIError::ServiceNotRegistered { .. })));
    assert!(container.resolve_optional::<TestService>().unwrap().is_none());
}

#[test]
fn test_resolve_trait() {
    let mut builder = ContainerBuilder::new();
    builder
        .register(|_| Ok(MemoryStorage))
        .implements::<dyn Storage, _>(|s| s)
        .as_service::<dyn Storage>();
    let container = builder.build();

    let storage = container.resolve_trait::<dyn Storage>().unwrap();
    assert_eq!(storage.name(), "memory");

    // Not exposed as itself
    assert!(!container.is_registered(&Service::typed::<MemoryStorage>()));
}

#[test]
fn test_last_registration_wins() {
    let mut builder = ContainerBuilder::new();
    builder
        .register(|_| Ok(MemoryStorage))
        .implements::<dyn Storage, _>(|s| s)
        .as_service::<dyn Storage>();
    builder
        .register(|_| Ok(DiskStorage))
        .implements::<dyn Storage, _>(|s| s)
        .as_service::<dyn Storage>();
    let container = builder.build();

    assert_eq!(container.resolve_trait::<dyn Storage>().unwrap().name(), "disk");
}

#[test]
fn test_keyed_services() {
    let mut builder = ContainerBuilder::new();
    builder
        .register(|_| Ok(MemoryStorage))
        .implements::<dyn Storage, _>(|s| s)
        .named::<dyn Storage>("fast");
    builder
        .register(|_| Ok(DiskStorage))
        .implements::<dyn Storage, _>(|s| s)
        .named::<dyn Storage>("durable");
    let container = builder.build();

    assert_eq!(container.resolve_keyed_trait::<dyn Storage>("fast").unwrap().name(), "memory");
    assert_eq!(container.resolve_keyed_trait::<dyn Storage>("durable").unwrap().name(), "disk");
    assert!(matches!(
        container.resolve_trait::<dyn Storage>(),
        Err(DIError::ServiceNotRegistered { .. })
    ));
}

#[test]
fn test_exposed_interface_without_view_is_invalid_type() {
    let mut builder = ContainerBuilder::new();
    builder
        .register(|_| Ok(TestService { value: 0 }))
        .as_service::<dyn Storage>();
    let container = builder.build();

    let result = container.resolve_trait::<dyn Storage>();
    assert!(matches!(result, Err(DIError::InvalidServiceType { .. })));
}

#[test]
fn test_constructor_dependencies() {
    struct Consumer {
        storage: Arc<dyn Storage>,
        config: Arc<TestService>,
    }

    let mut builder = ContainerBuilder::new();
    builder
        .register(|_| Ok(MemoryStorage))
        .implements::<dyn Storage, _>(|s| s)
        .as_service::<dyn Storage>();
    builder.register(|_| Ok(TestService { value: 3 }));
    builder.register(|args| {
        Ok(Consumer {
            storage: args.resolve_trait::<dyn Storage>()?,
            config: args.resolve::<TestService>()?,
        })
    });
    let container = builder.build();

    let consumer = container.resolve::<Consumer>().unwrap();
    assert_eq!(consumer.storage.name(), "memory");
    assert_eq!(consumer.config.value, 3);
}

#[test]
fn test_missing_dependency_propagates() {
    struct Consumer;

    let mut builder = ContainerBuilder::new();
    builder.register(|args| {
        args.resolve::<TestService>()?;
        Ok(Consumer)
    });
    let container = builder.build();

    let result = container.resolve::<Consumer>();
    match result {
        Err(DIError::ServiceNotRegistered { service_type }) => {
            assert!(service_type.contains("TestService"));
        }
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_circular_dependency_detected() {
    struct Left;
    struct Right;

    let mut builder = ContainerBuilder::new();
    builder.register(|args| {
        args.resolve::<Right>()?;
        Ok(Left)
    });
    builder.register(|args| {
        args.resolve::<Left>()?;
        Ok(Right)
    });
    let container = builder.build();

    match container.resolve::<Left>() {
        Err(DIError::CircularDependency { path }) => {
            assert!(path.contains("Left -> "));
            assert!(path.ends_with("Left"));
        }
        other => panic!("expected circular dependency, got {:?}", other.map(|_| ())),
    }

    // The failed operation leaves no state behind
    assert!(matches!(
        container.resolve::<Right>(),
        Err(DIError::CircularDependency { .. })
    ));
}

#[test]
fn test_parameters() {
    struct Greeting(String);

    let mut builder = ContainerBuilder::new();
    builder.register(|args| {
        let name = args.named::<String>("name")?;
        let punctuation = args.positional::<char>(0)?;
        Ok(Greeting(format!("hello {}{}", name, punctuation)))
    });
    let container = builder.build();

    let greeting = container
        .resolve_with_parameters::<Greeting>(vec![
            Parameter::named("name", "rice".to_string()),
            Parameter::positional(0, '!'),
        ])
        .unwrap();
    assert_eq!(greeting.0, "hello rice!");

    let missing = container.resolve::<Greeting>();
    assert!(matches!(missing, Err(DIError::DependencyResolutionFailed { .. })));
}

#[test]
fn test_typed_parameter_overrides_registration() {
    struct Consumer(Arc<TestService>);

    let mut builder = ContainerBuilder::new();
    builder.register(|_| Ok(TestService { value: 1 }));
    builder.register(|args| Ok(Consumer(args.resolve::<TestService>()?)));
    let container = builder.build();

    let consumer = container
        .resolve_with_parameters::<Consumer>(vec![Parameter::typed(TestService { value: 99 })])
        .unwrap();
    assert_eq!(consumer.0.value, 99);
}

#[test]
fn test_on_preparing_handlers_run_in_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let first = order.clone();
    let second = order.clone();

    let mut builder = ContainerBuilder::new();
    builder
        .register(|args| Ok(TestService { value: *args.positional::<i32>(0)? }))
        .on_preparing(move |args| {
            first.lock().unwrap().push("first");
            args.prepend_parameters(vec![Parameter::positional(0, 5i32)]);
            Ok(())
        })
        .on_preparing(move |args| {
            second.lock().unwrap().push("second");
            assert_eq!(args.parameters().len(), 1);
            Ok(())
        });
    let container = builder.build();

    assert_eq!(container.resolve::<TestService>().unwrap().value, 5);
    assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
}

#[test]
fn test_register_instance() {
    let storage = Arc::new(MemoryStorage);

    let mut builder = ContainerBuilder::new();
    builder
        .register_instance(storage.clone())
        .implements::<dyn Storage, _>(|s| s)
        .as_self()
        .as_service::<dyn Storage>();
    let container = builder.build();

    let resolved = container.resolve::<MemoryStorage>().unwrap();
    assert!(Arc::ptr_eq(&resolved, &storage));

    let instance = container.resolve_service(&Service::interface::<dyn Storage>()).unwrap();
    let again = container.resolve_service(&Service::interface::<dyn Storage>()).unwrap();
    assert!(instance.is_same(&again));
    assert_eq!(
        container
            .root_scope()
            .registration_for(&Service::typed::<MemoryStorage>())
            .unwrap()
            .component_type()
            .activator_kind(),
        ActivatorKind::ProvidedInstance
    );
}

#[test]
fn test_decorators_apply_in_order() {
    let mut builder = ContainerBuilder::new();
    builder
        .register(|_| Ok(MemoryStorage))
        .implements::<dyn Storage, _>(|s| s)
        .as_service::<dyn Storage>();
    builder
        .register_decorator::<dyn Storage, _>(|inner| Arc::new(Prefixed(inner)))
        .register_decorator::<dyn Storage, _>(|inner| Arc::new(Prefixed(inner)));
    let container = builder.build();

    let storage = container.resolve_trait::<dyn Storage>().unwrap();
    assert_eq!(storage.name(), "prefixed:prefixed:memory");
}

#[test]
fn test_pipeline_middleware_order() {
    struct Recorder {
        phase: PipelinePhase,
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl ResolveMiddleware for Recorder {
        fn phase(&self) -> PipelinePhase {
            self.phase
        }

        fn execute(&self, ctx: &mut ResolveRequestContext<'_>, next: Next<'_>) -> DIResult<()> {
            self.log.lock().unwrap().push(self.label);
            next(ctx)
        }
    }

    let log = Arc::new(Mutex::new(Vec::new()));
    let recorder = |phase, label| {
        Arc::new(Recorder {
            phase,
            label,
            log: log.clone(),
        }) as Arc<dyn ResolveMiddleware>
    };

    let mut builder = ContainerBuilder::new();
    builder
        .register(|_| Ok(TestService { value: 0 }))
        .configure_pipeline(
            PipelinePhase::Activation,
            MiddlewareInsertionMode::EndOfPhase,
            recorder(PipelinePhase::Activation, "activation-end"),
        )
        .configure_pipeline(
            PipelinePhase::Activation,
            MiddlewareInsertionMode::StartOfPhase,
            recorder(PipelinePhase::Activation, "activation-start"),
        )
        .configure_pipeline(
            PipelinePhase::RegistrationPipelineStart,
            MiddlewareInsertionMode::StartOfPhase,
            recorder(PipelinePhase::RegistrationPipelineStart, "registration-start"),
        )
        .configure_pipeline(
            PipelinePhase::ResolveRequestStart,
            MiddlewareInsertionMode::EndOfPhase,
            recorder(PipelinePhase::ResolveRequestStart, "request-start"),
        );
    let container = builder.build();

    container.resolve::<TestService>().unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "request-start",
            "registration-start",
            "activation-start",
            "activation-end"
        ]
    );
}

#[test]
fn test_singleton_created_once_under_contention() {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();

    let mut builder = ContainerBuilder::new();
    builder
        .register(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(TestService { value: 1 })
        })
        .single_instance();
    let container = Arc::new(builder.build());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let container = container.clone();
            std::thread::spawn(move || container.resolve::<TestService>().unwrap())
        })
        .collect();
    let resolved: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for service in &resolved {
        assert!(Arc::ptr_eq(service, &resolved[0]));
    }
    assert!(created.load(Ordering::SeqCst) >= 1);
}

#[test]
fn test_registration_display() {
    let mut builder = ContainerBuilder::new();
    builder
        .register(|_| Ok(MemoryStorage))
        .implements::<dyn Storage, _>(|s| s)
        .as_service::<dyn Storage>()
        .single_instance();
    let container = builder.build();

    let registration = container
        .root_scope()
        .registration_for(&Service::interface::<dyn Storage>())
        .unwrap();
    let text = registration.to_string();
    assert!(text.contains("MemoryStorage"));
    assert!(text.contains("Constructor"));
    assert!(text.contains("Storage"));
    assert!(text.contains("Lifetime = Singleton"));
}
