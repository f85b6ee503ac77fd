use criterion::{black_box, criterion_group, criterion_main, Criterion};
use reflekt_engine::types::{FieldDecl, MethodDecl, TypeDefinition};
use reflekt_engine::{Object, ReflectContext, ReflektConfig, TypeLoader, Value, ValueType};

fn context() -> ReflectContext {
    let ctx = ReflectContext::new(ReflektConfig::default());
    ctx.registry().define(
        TypeDefinition::class("bench.Account")
            .field(FieldDecl::new("balance", ValueType::LONG).private())
            .field(FieldDecl::new("owner", ValueType::Str).private())
            .method(MethodDecl::getter("getOwner", ValueType::Str, "owner"))
            .method(MethodDecl::setter("setOwner", ValueType::Str, "owner"))
            .method(MethodDecl::getter("getLimit", ValueType::LONG, "balance")),
    );
    ctx
}

fn bench_reads(c: &mut Criterion) {
    let ctx = context();
    let account = Object::new(&ctx.registry().load("bench.Account").unwrap());
    let mut group = c.benchmark_group("get_value");

    group.bench_function("field_cached", |b| {
        b.iter(|| ctx.resolver().get_value(black_box("balance"), &account).unwrap());
    });

    group.bench_function("accessor_cached", |b| {
        b.iter(|| ctx.resolver().get_value(black_box("limit"), &account).unwrap());
    });

    group.bench_function("field_uncached", |b| {
        b.iter(|| {
            ctx.cache().evict_all();
            ctx.resolver().get_value(black_box("balance"), &account).unwrap()
        });
    });

    group.finish();
}

fn bench_writes(c: &mut Criterion) {
    let ctx = context();
    let account = Object::new(&ctx.registry().load("bench.Account").unwrap());
    let mut group = c.benchmark_group("set_value");

    group.bench_function("field", |b| {
        b.iter(|| {
            ctx.resolver()
                .set_value(&account, "balance", black_box(Value::Long(42)))
                .unwrap()
        });
    });

    group.bench_function("via_setter", |b| {
        b.iter(|| {
            ctx.resolver()
                .set_value_via_setter(&account, "owner", black_box(Value::from("ada")))
                .unwrap()
        });
    });

    group.bench_function("with_retry_fallback", |b| {
        b.iter(|| {
            ctx.resolver()
                .set_value_with_retry(&account, "balance", black_box(Value::Long(7)))
                .unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_reads, bench_writes);
criterion_main!(benches);
