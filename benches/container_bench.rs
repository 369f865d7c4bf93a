//! Benchmarks for the bean container

use bean_container::{BeanDefinition, Container, DependencyGraph};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

#[allow(dead_code)]
struct SmallService {
    value: i32,
}

#[allow(dead_code)]
struct MediumService {
    name: String,
    values: Vec<i32>,
}

#[allow(dead_code)]
struct Node {
    deps: Vec<Arc<Node>>,
}

/// `width` independent chains of `depth` beans each; every bean depends on
/// its predecessor in the chain.
fn layered_definitions(width: usize, depth: usize) -> Vec<BeanDefinition> {
    let mut definitions = Vec::with_capacity(width * depth);
    for chain in 0..width {
        for level in 0..depth {
            let mut builder = BeanDefinition::singleton(format!("bean_{chain}_{level}"), |ctx| {
                let deps = ctx
                    .dependencies()
                    .iter()
                    .map(|dep| ctx.get::<Node>(dep))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Node { deps })
            });
            if level > 0 {
                builder = builder.depends_on(format!("bean_{chain}_{}", level - 1));
            }
            definitions.push(builder.build());
        }
    }
    definitions
}

fn started_container() -> Container {
    let container = Container::new();
    container
        .register_all([
            BeanDefinition::singleton("small", |_| Ok(SmallService { value: 42 })).build(),
            BeanDefinition::singleton("medium", |_| {
                Ok(MediumService {
                    name: "test".to_string(),
                    values: vec![1, 2, 3, 4, 5],
                })
            })
            .build(),
            BeanDefinition::prototype("prototype", |_| Ok(SmallService { value: 7 })).build(),
            BeanDefinition::prototype("prototype_with_dep", |ctx| {
                let small = ctx.get::<SmallService>("small")?;
                Ok(SmallService { value: small.value })
            })
            .depends_on("small")
            .build(),
        ])
        .unwrap();
    container.start().unwrap();
    container
}

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");

    group.bench_function("register_single", |b| {
        b.iter(|| {
            let container = Container::new();
            container
                .register(BeanDefinition::singleton("small", |_| Ok(SmallService { value: 42 })))
                .unwrap();
            black_box(container)
        })
    });

    group.bench_function("register_all_100", |b| {
        b.iter(|| {
            let container = Container::with_capacity(100);
            container.register_all(layered_definitions(10, 10)).unwrap();
            black_box(container)
        })
    });

    group.finish();
}

fn bench_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph");

    for size in [10usize, 100, 1000] {
        let definitions: Vec<Arc<BeanDefinition>> = layered_definitions(size / 10, 10)
            .into_iter()
            .map(Arc::new)
            .collect();
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(
            BenchmarkId::new("topological_order", size),
            &definitions,
            |b, definitions| {
                b.iter(|| {
                    let order = DependencyGraph::build(definitions)
                        .unwrap()
                        .topological_order()
                        .unwrap();
                    black_box(order)
                })
            },
        );
    }

    group.finish();
}

fn bench_start(c: &mut Criterion) {
    let mut group = c.benchmark_group("start");

    for size in [10usize, 100] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(BenchmarkId::new("eager_singletons", size), |b| {
            b.iter(|| {
                let container = Container::with_capacity(size);
                container
                    .register_all(layered_definitions(size / 10, 10))
                    .unwrap();
                container.start().unwrap();
                black_box(container)
            })
        });
    }

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");
    group.throughput(Throughput::Elements(1));

    let container = started_container();

    group.bench_function("get_singleton", |b| {
        b.iter(|| {
            let service = container.get::<SmallService>("small").unwrap();
            black_box(service)
        })
    });

    group.bench_function("get_medium", |b| {
        b.iter(|| {
            let service = container.get::<MediumService>("medium").unwrap();
            black_box(service)
        })
    });

    group.bench_function("get_prototype", |b| {
        b.iter(|| {
            let service = container.get::<SmallService>("prototype").unwrap();
            black_box(service)
        })
    });

    group.bench_function("get_prototype_with_dependency", |b| {
        b.iter(|| {
            let service = container.get::<SmallService>("prototype_with_dep").unwrap();
            black_box(service)
        })
    });

    group.bench_function("contains_check", |b| {
        b.iter(|| {
            let exists = container.contains("small");
            black_box(exists)
        })
    });

    group.bench_function("try_get_not_found", |b| {
        b.iter(|| {
            let service = container.try_get::<SmallService>("missing");
            black_box(service)
        })
    });

    group.finish();
}

fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");

    group.bench_function("concurrent_reads_4", |b| {
        let container = started_container();

        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let c = container.clone();
                    thread::spawn(move || {
                        for _ in 0..100 {
                            let _ = c.get::<SmallService>("small").unwrap();
                        }
                    })
                })
                .collect();

            for h in handles {
                h.join().unwrap();
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_registration,
    bench_graph,
    bench_start,
    bench_resolution,
    bench_concurrent,
);

criterion_main!(benches);
