//! Integration tests for member access through a wired `ReflectContext`

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use reflekt_engine::reflect::{bean, constants, WritePath};
use reflekt_engine::types::{FieldDecl, Member, MethodDecl, TypeDefinition};
use reflekt_engine::{
    AccessError, AccessResolver, CacheService, MemberAccessor, Object, PropertyFilter,
    ReflectContext, ReflektConfig, TypeLoader, Value, ValueType,
};

fn context() -> ReflectContext {
    let ctx = ReflectContext::new(ReflektConfig::default());
    let registry = ctx.registry();

    registry.define(
        TypeDefinition::class("geo.Point")
            .field(FieldDecl::new("x", ValueType::INT).private())
            .field(FieldDecl::new("y", ValueType::INT).private()),
    );
    registry.define(
        TypeDefinition::class("geo.Point3")
            .extends("geo.Point")
            .field(FieldDecl::new("z", ValueType::INT).private()),
    );
    registry.define(
        TypeDefinition::class("lab.Temperature")
            .field(FieldDecl::new("kelvin", ValueType::DOUBLE).private())
            .method(
                MethodDecl::new("getCelsius", vec![], ValueType::DOUBLE, |this, _| {
                    let k = this.read("kelvin").and_then(|v| v.as_f64()).unwrap_or(0.0);
                    Ok(Value::Double(k - 273.15))
                })
                .public(),
            )
            .method(
                MethodDecl::new("setCelsius", vec![ValueType::DOUBLE], ValueType::Void, |this, args| {
                    let c = args[0].as_f64().ok_or("celsius must be numeric")?;
                    this.write("kelvin", Value::Double(c + 273.15));
                    Ok(Value::Null)
                })
                .public(),
            ),
    );
    registry.define(
        TypeDefinition::class("shop.Order")
            .field(FieldDecl::new("id", ValueType::LONG).private())
            .field(FieldDecl::new("note", ValueType::Str).private())
            .field(FieldDecl::constant("MAX_LINES", ValueType::INT, Value::Int(50)))
            .field(FieldDecl::constant("CURRENCY", ValueType::Str, Value::from("EUR")).private())
            .method(MethodDecl::getter("getId", ValueType::LONG, "id"))
            .method(MethodDecl::setter("setId", ValueType::LONG, "id"))
            .method(MethodDecl::getter("getNote", ValueType::Str, "note"))
            .method(MethodDecl::setter("setNote", ValueType::Str, "note")),
    );
    ctx
}

fn new_object(ctx: &ReflectContext, name: &str) -> Arc<Object> {
    Object::new(&ctx.registry().load(name).unwrap())
}

#[test]
fn test_point_field_round_trip() {
    let ctx = context();
    let p = new_object(&ctx, "geo.Point");

    assert_eq!(ctx.resolver().get_value("x", &p).unwrap(), Value::Int(0));
    ctx.resolver().set_value(&p, "x", Value::Int(5)).unwrap();
    assert_eq!(ctx.resolver().get_value("x", &p).unwrap(), Value::Int(5));
}

#[test]
fn test_inherited_field() {
    let ctx = context();
    let p = new_object(&ctx, "geo.Point3");

    ctx.resolver().set_value(&p, "x", Value::Int(1)).unwrap();
    ctx.resolver().set_value(&p, "z", Value::Int(3)).unwrap();
    assert_eq!(ctx.resolver().get_value("x", &p).unwrap(), Value::Int(1));
    assert_eq!(ctx.resolver().get_value("z", &p).unwrap(), Value::Int(3));
    assert!(ctx.resolver().field_exists(&p, "z"));
    assert!(!ctx.resolver().field_exists(&p, "x"));
}

#[test]
fn test_temperature_accessor_fallback() {
    let ctx = context();
    let t = new_object(&ctx, "lab.Temperature");

    ctx.resolver().set_value(&t, "celsius", Value::Double(100.0)).unwrap();
    let direct = ctx
        .resolver()
        .call_method(&t, "getCelsius", &[])
        .unwrap()
        .as_f64()
        .unwrap();
    let via_name = ctx.resolver().get_value("celsius", &t).unwrap().as_f64().unwrap();
    assert!((direct - 100.0).abs() < 1e-9);
    assert_eq!(direct, via_name);
}

#[test]
fn test_bogus_member() {
    let ctx = context();
    let p = new_object(&ctx, "geo.Point");

    let err = ctx.resolver().get_value("bogus", &p).unwrap_err();
    assert_eq!(
        err,
        AccessError::MemberNotFound {
            owner: "geo.Point".into(),
            member: "bogus".into()
        }
    );
    assert!(ctx.resolver().get_value_quiet("bogus", &p).is_none());
}

#[test]
fn test_type_mismatch_on_write() {
    let ctx = context();
    let p = new_object(&ctx, "geo.Point");

    let err = ctx
        .resolver()
        .set_value(&p, "x", Value::from("five"))
        .unwrap_err();
    assert!(matches!(err, AccessError::TypeMismatch { .. }));
    assert_eq!(ctx.resolver().get_value("x", &p).unwrap(), Value::Int(0));
}

#[test]
fn test_set_to_null_through_setter() {
    let ctx = context();
    let order = new_object(&ctx, "shop.Order");

    ctx.resolver().set_value(&order, "note", Value::from("fragile")).unwrap();
    ctx.resolver().set_to_null(&order, "note").unwrap();
    assert_eq!(ctx.resolver().get_value("note", &order).unwrap(), Value::Null);
}

#[test]
fn test_resolution_is_idempotent_until_eviction() {
    let ctx = context();
    let ty = ctx.registry().load("geo.Point").unwrap();

    let first = ctx.resolver().resolve_read(&ty, "x").unwrap();
    let again = ctx.resolver().resolve_read(&ty, "x").unwrap();
    assert!(Arc::ptr_eq(&first, &again));

    ctx.cache().evict_all();
    assert_eq!(ctx.cache().stats().retrieval_entries, 0);

    let fresh = ctx.resolver().resolve_read(&ty, "x").unwrap();
    assert!(!Arc::ptr_eq(&first, &fresh));
    assert_eq!(*first, *fresh);
}

#[test]
fn test_concurrent_resolution_converges() {
    let ctx = Arc::new(context());
    let ty = ctx.registry().load("lab.Temperature").unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let ty = Arc::clone(&ty);
            thread::spawn(move || {
                let read = ctx.resolver().resolve_read(&ty, "celsius").unwrap();
                let write = ctx
                    .resolver()
                    .resolve_write(&ty, "celsius", &Value::Double(1.0))
                    .unwrap();
                (read, write)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for (read, write) in &results {
        assert_eq!(**read, *results[0].0);
        assert_eq!(**write, *results[0].1);
    }
    assert_eq!(ctx.cache().stats().retrieval_entries, 1);
}

#[test]
fn test_concurrent_writes_through_accessors() {
    let ctx = Arc::new(context());
    let objects: Vec<_> = (0..4).map(|_| new_object(&ctx, "lab.Temperature")).collect();

    let workers: Vec<_> = objects
        .iter()
        .enumerate()
        .map(|(i, obj)| {
            let ctx = Arc::clone(&ctx);
            let obj = Arc::clone(obj);
            thread::spawn(move || {
                ctx.resolver()
                    .set_value(&obj, "celsius", Value::Double(i as f64))
                    .unwrap();
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    for (i, obj) in objects.iter().enumerate() {
        let celsius = ctx.resolver().get_value("celsius", obj).unwrap().as_f64().unwrap();
        assert!((celsius - i as f64).abs() < 1e-9);
    }
}

#[test]
fn test_concurrent_private_field_access() {
    let ctx = Arc::new(context());
    let point = new_object(&ctx, "geo.Point");

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let ctx = Arc::clone(&ctx);
            let point = Arc::clone(&point);
            thread::spawn(move || {
                let mut failures = 0;
                for n in 0..20_000 {
                    if ctx.resolver().set_value(&point, "x", Value::Int(i * n)).is_err() {
                        failures += 1;
                    }
                    if ctx.resolver().get_value("x", &point).is_err() {
                        failures += 1;
                    }
                }
                failures
            })
        })
        .collect();

    let failures: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();
    assert_eq!(failures, 0);

    let field = ctx.registry().load("geo.Point").unwrap();
    let x = field.declared_field("x").unwrap();
    assert_eq!(x.access().relaxed_count(), 0);
}

#[test]
fn test_retry_is_bounded_by_config() {
    let mut config = ReflektConfig::default();
    config.access.setter_retry_limit = 2;
    let ctx = ReflectContext::new(config);
    ctx.registry()
        .define(TypeDefinition::class("geo.Point").field(FieldDecl::new("x", ValueType::INT).private()));
    let p = new_object(&ctx, "geo.Point");

    let outcome = ctx
        .resolver()
        .set_value_with_retry(&p, "x", Value::Int(9))
        .unwrap();
    assert_eq!(outcome.path, WritePath::Field);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(ctx.resolver().get_value("x", &p).unwrap(), Value::Int(9));
}

#[test]
fn test_retry_default_limit() {
    let ctx = context();
    let p = new_object(&ctx, "geo.Point");

    let outcome = ctx
        .resolver()
        .set_value_with_retry(&p, "y", Value::Int(4))
        .unwrap();
    assert_eq!(outcome.attempts, 5);

    let order = new_object(&ctx, "shop.Order");
    let outcome = ctx
        .resolver()
        .set_value_with_retry(&order, "id", Value::Long(12))
        .unwrap();
    assert_eq!(outcome.path, WritePath::Setter);
    assert_eq!(outcome.attempts, 1);
}

#[test]
fn test_constants_and_beans() {
    let ctx = context();
    let order = ctx.registry().load("shop.Order").unwrap();

    assert_eq!(
        constants::list_constants(&order).unwrap(),
        vec![Value::Int(50), Value::from("EUR")]
    );

    let getters = bean::getters(&order, &PropertyFilter::all());
    assert_eq!(
        getters.into_iter().collect::<Vec<_>>(),
        vec!["getId".to_string(), "getNote".to_string()]
    );
    let setters = bean::setters(&order, &PropertyFilter::only(vec![ValueType::Str]));
    assert_eq!(setters.into_iter().collect::<Vec<_>>(), vec!["setNote".to_string()]);
}

#[test]
fn test_copy_between_objects() {
    let ctx = context();
    let a = new_object(&ctx, "shop.Order");
    let b = new_object(&ctx, "shop.Order");
    ctx.resolver().set_value(&a, "id", Value::Long(7)).unwrap();
    ctx.resolver().set_value(&a, "note", Value::from("gift")).unwrap();

    assert_eq!(
        ctx.mapper().differing_properties(&a, &b).unwrap(),
        vec!["id".to_string(), "note".to_string()]
    );
    assert_eq!(ctx.mapper().copy_properties(&a, &b).unwrap(), 2);
    assert!(ctx.mapper().differing_properties(&a, &b).unwrap().is_empty());
    assert_eq!(ctx.cache().stats().grouping_entries, 2);
}

#[test]
fn test_member_accessor_trait_object() {
    let ctx = context();
    let p = new_object(&ctx, "geo.Point");
    let accessor: &dyn MemberAccessor = ctx.resolver();

    accessor.set_value(&p, "y", Value::Int(-2)).unwrap();
    assert_eq!(accessor.get_value("y", &p).unwrap(), Value::Int(-2));
}

#[test]
fn test_ticker_evicts_in_background() {
    let ctx = context();
    let cache = Arc::new(CacheService::with_interval(Duration::from_millis(20)));
    let resolver = AccessResolver::new(Arc::clone(&cache));
    let ty = ctx.registry().load("geo.Point").unwrap();

    cache.init().unwrap();
    resolver.resolve_read(&ty, "x").unwrap();

    let mut evicted = false;
    for _ in 0..100 {
        thread::sleep(Duration::from_millis(10));
        if cache.stats().evictions > 0 && cache.stats().retrieval_entries == 0 {
            evicted = true;
            break;
        }
    }
    cache.shutdown();
    assert!(evicted);
    assert!(!cache.is_running());

    // lookups keep working after the ticker has stopped
    assert!(resolver.resolve_read(&ty, "x").is_some());
}

#[test]
fn test_context_start_and_shutdown() {
    let ctx = context();
    ctx.start().unwrap();
    assert!(ctx.cache().is_running());
    ctx.start().unwrap();
    ctx.shutdown();
    assert!(!ctx.cache().is_running());
}
