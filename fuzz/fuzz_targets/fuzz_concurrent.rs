#![no_main]

//! Fuzz target for concurrent bean retrieval
//!
//! Races lazy singleton and prototype retrieval across threads and checks
//! that every singleton is constructed exactly once.

use arbitrary::Arbitrary;
use bean_container::{BeanDefinition, Container};
use libfuzzer_sys::fuzz_target;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

const SINGLETONS: usize = 4;
const PROTOTYPES: usize = 2;

/// Thread operation
#[derive(Debug, Clone, Arbitrary)]
enum ThreadOp {
    GetSingleton(u8),
    GetPrototype(u8),
    GetUnknown,
    Contains(u8),
    BeanState(u8),
}

/// Concurrent test scenario
#[derive(Debug, Arbitrary)]
struct ConcurrentScenario {
    /// Number of threads (clamped to 1-8)
    thread_count: u8,
    /// Operations per thread (clamped)
    ops: Vec<ThreadOp>,
}

fuzz_target!(|scenario: ConcurrentScenario| {
    let container = Container::new();
    let singleton_builds: Arc<Vec<AtomicUsize>> =
        Arc::new((0..SINGLETONS).map(|_| AtomicUsize::new(0)).collect());
    let prototype_builds = Arc::new(AtomicUsize::new(0));

    for index in 0..SINGLETONS {
        let builds = Arc::clone(&singleton_builds);
        let mut definition = BeanDefinition::singleton(format!("singleton{index}"), move |_| {
            builds[index].fetch_add(1, Ordering::SeqCst);
            Ok(index)
        })
        .lazy(true);
        if index > 0 {
            definition = definition.depends_on(format!("singleton{}", index - 1));
        }
        container.register(definition).unwrap();
    }
    for index in 0..PROTOTYPES {
        let builds = Arc::clone(&prototype_builds);
        container
            .register(
                BeanDefinition::prototype(format!("prototype{index}"), move |ctx| {
                    builds.fetch_add(1, Ordering::SeqCst);
                    let shared = ctx.get::<usize>("singleton0")?;
                    Ok(*shared + index)
                })
                .depends_on("singleton0"),
            )
            .unwrap();
    }
    container.start().unwrap();

    let thread_count = (scenario.thread_count % 8).max(1) as usize;
    let ops: Vec<ThreadOp> = scenario.ops.into_iter().take(50).collect();
    let barrier = Arc::new(Barrier::new(thread_count));
    let prototype_gets = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..thread_count)
        .map(|_| {
            let container = container.clone();
            let ops = ops.clone();
            let barrier = Arc::clone(&barrier);
            let prototype_gets = Arc::clone(&prototype_gets);
            thread::spawn(move || {
                barrier.wait();
                for op in ops {
                    match op {
                        ThreadOp::GetSingleton(i) => {
                            let index = i as usize % SINGLETONS;
                            let value = container.get::<usize>(&format!("singleton{index}")).unwrap();
                            assert_eq!(*value, index);
                        }
                        ThreadOp::GetPrototype(i) => {
                            let index = i as usize % PROTOTYPES;
                            let _ = container.get::<usize>(&format!("prototype{index}")).unwrap();
                            prototype_gets.fetch_add(1, Ordering::SeqCst);
                        }
                        ThreadOp::GetUnknown => {
                            assert!(container.get_any("missing").is_err());
                        }
                        ThreadOp::Contains(i) => {
                            let index = i as usize % SINGLETONS;
                            assert!(container.contains(&format!("singleton{index}")));
                        }
                        ThreadOp::BeanState(i) => {
                            let index = i as usize % SINGLETONS;
                            assert!(container.bean_state(&format!("singleton{index}")).is_some());
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    for builds in singleton_builds.iter() {
        assert!(builds.load(Ordering::SeqCst) <= 1);
    }
    assert_eq!(
        prototype_builds.load(Ordering::SeqCst),
        prototype_gets.load(Ordering::SeqCst)
    );

    // Identity is stable once realized
    for name in container.realized_beans() {
        let a = container.get_any(&name).unwrap();
        let b = container.get_any(&name).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
    container.shutdown().unwrap();
});
