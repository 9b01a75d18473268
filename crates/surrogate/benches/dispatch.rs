// Use codspeed-criterion-compat when running on CodSpeed (CI), real criterion otherwise
#[cfg(codspeed)]
use codspeed_criterion_compat::{Bencher, Criterion, black_box, criterion_group, criterion_main};
#[cfg(not(codspeed))]
use criterion::{Bencher, Criterion, black_box, criterion_group, criterion_main};
use surrogate::{ProxyBase, ProxyFactory, RunResult, Value, ops};

fn ints(n: i64) -> Value {
    Value::list((0..n).map(Value::Int).collect())
}

/// Runs `op` once to check it, then measures it.
fn run(bench: &mut Bencher, value: &Value, op: fn(&Value) -> RunResult<Value>, expected: &Value) {
    assert_eq!(&op(value).unwrap(), expected);
    bench.iter(|| black_box(op(black_box(value)).unwrap()));
}

fn len(value: &Value) -> RunResult<Value> {
    ops::len(value).map(|n| Value::Int(n as i64))
}

fn add(value: &Value) -> RunResult<Value> {
    ops::add(value, &Value::Int(1))
}

fn radd(value: &Value) -> RunResult<Value> {
    ops::add(&Value::Float(0.5), value)
}

fn getattr_call(value: &Value) -> RunResult<Value> {
    ops::call_method(value, "count", &[Value::Int(3)])
}

fn sum_iter(value: &Value) -> RunResult<Value> {
    let mut total = Value::Int(0);
    for item in ops::to_vec(value)? {
        total = ops::add(&total, &item)?;
    }
    Ok(total)
}

/// Configures the dispatch benchmark group: each operation directly and through a proxy.
fn criterion_benchmark(c: &mut Criterion) {
    let factory = ProxyFactory::new();
    let list = ints(100);
    let proxied_list = factory.proxy(list.clone());
    let nested_list = factory.proxy(factory.proxy(list.clone()));
    let int = Value::Int(41);
    let proxied_int = factory.proxy(int.clone());
    let overriding = ProxyBase::builder("constant_len")
        .direct("__len__", |_this, _args| Ok(Value::Int(100)))
        .build()
        .unwrap();
    let overridden_list = factory.proxy_with(list.clone(), &overriding).unwrap();
    let masked_list = factory.mask_proxy(list.clone(), ["append", "pop"]);

    c.bench_function("len__direct", |b| run(b, &list, len, &Value::Int(100)));
    c.bench_function("len__proxy", |b| run(b, &proxied_list, len, &Value::Int(100)));
    c.bench_function("len__nested_proxy", |b| run(b, &nested_list, len, &Value::Int(100)));
    c.bench_function("len__override", |b| run(b, &overridden_list, len, &Value::Int(100)));

    c.bench_function("add__direct", |b| run(b, &int, add, &Value::Int(42)));
    c.bench_function("add__proxy", |b| run(b, &proxied_int, add, &Value::Int(42)));
    c.bench_function("radd__direct", |b| run(b, &int, radd, &Value::Float(41.5)));
    c.bench_function("radd__proxy", |b| run(b, &proxied_int, radd, &Value::Float(41.5)));

    c.bench_function("method_call__direct", |b| run(b, &list, getattr_call, &Value::Int(1)));
    c.bench_function("method_call__proxy", |b| run(b, &proxied_list, getattr_call, &Value::Int(1)));
    c.bench_function("method_call__masked", |b| run(b, &masked_list, getattr_call, &Value::Int(1)));

    c.bench_function("sum_100__direct", |b| run(b, &list, sum_iter, &Value::Int(4950)));
    c.bench_function("sum_100__proxy", |b| run(b, &proxied_list, sum_iter, &Value::Int(4950)));

    c.bench_function("proxy_type__cached", |b| {
        let class = list.class();
        let base = ProxyBase::plain();
        b.iter(|| black_box(factory.proxy_type(black_box(&class), &base).unwrap()));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
