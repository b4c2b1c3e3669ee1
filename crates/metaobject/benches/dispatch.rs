use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use metaobject::{base_of, field_of, reflect_type, type_of, Engine, ObjectHandle};

#[derive(Default)]
struct Base {
    level: u32,
}
reflect_type!(Base);

#[derive(Default)]
struct Leaf {
    base: Base,
    x: f64,
}
reflect_type!(Leaf);

fn engine() -> Engine {
    let engine = Engine::new();
    engine
        .register::<Base>()
        .field("level", field_of!(Base, level))
        .unwrap()
        .method("level", |b: &Base| b.level)
        .unwrap();
    engine
        .register::<Leaf>()
        .base::<Base>(base_of!(Leaf, base))
        .unwrap()
        .field("x", field_of!(Leaf, x))
        .unwrap()
        .method_mut("scale", |l: &mut Leaf, k: f64| l.x *= k)
        .unwrap()
        .method_mut("scale", |l: &mut Leaf, k: i32| l.x *= k as f64)
        .unwrap();
    engine
}

fn bench_var(c: &mut Criterion) {
    let engine = engine();
    let mut leaf = Leaf::default();
    let h = ObjectHandle::from_mut(&mut leaf);

    let mut group = c.benchmark_group("var");
    for field in ["x", "level"] {
        group.bench_with_input(BenchmarkId::new("field", field), &field, |b, field| {
            b.iter(|| engine.var(black_box(h), field));
        });
    }
    group.finish();
}

fn bench_invoke(c: &mut Criterion) {
    let engine = engine();
    let mut leaf = Leaf::default();
    let h = ObjectHandle::from_mut(&mut leaf);
    let k = 1.0f64;
    let arg = [ObjectHandle::from_ref(&k)];

    c.bench_function("invoke_overloaded", |b| {
        b.iter(|| engine.invoke(black_box(h), "scale", &arg));
    });
    c.bench_function("invoke_inherited", |b| {
        b.iter(|| engine.invoke(black_box(h), "level", &[]));
    });
    c.bench_function("is_invocable", |b| {
        b.iter(|| engine.is_invocable(type_of::<Leaf>(), "scale", &[type_of::<i32>()]));
    });
}

fn bench_cast(c: &mut Criterion) {
    let engine = engine();
    let mut leaf = Leaf::default();
    let h = ObjectHandle::from_mut(&mut leaf);
    let base = engine.static_cast(h, type_of::<Base>());

    c.bench_function("static_cast_up", |b| {
        b.iter(|| engine.static_cast(black_box(h), type_of::<Base>()));
    });
    c.bench_function("static_cast_down", |b| {
        b.iter(|| engine.static_cast(black_box(base), type_of::<Leaf>()));
    });
}

criterion_group!(benches, bench_var, bench_invoke, bench_cast);
criterion_main!(benches);
