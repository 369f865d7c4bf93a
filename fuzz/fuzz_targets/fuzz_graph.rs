#![no_main]

//! Fuzz target for dependency graph resolution
//!
//! Builds arbitrary bean graphs (dangling references, self loops and cycles
//! included) and checks the ordering and failure guarantees of `start()`.

use arbitrary::Arbitrary;
use bean_container::{BeanDefinition, BeanError, Container, Scope};
use libfuzzer_sys::fuzz_target;
use std::sync::{Arc, Mutex};

const MAX_BEANS: usize = 16;

#[derive(Debug, Arbitrary)]
struct BeanSpec {
    /// Dependency indices; values past the bean count are dangling
    deps: Vec<u8>,
    prototype: bool,
    lazy: bool,
}

#[derive(Debug, Arbitrary)]
struct GraphScenario {
    beans: Vec<BeanSpec>,
}

fn name(index: usize) -> String {
    format!("bean{index}")
}

fuzz_target!(|scenario: GraphScenario| {
    let beans: Vec<BeanSpec> = scenario.beans.into_iter().take(MAX_BEANS).collect();
    let count = beans.len();
    let constructed = Arc::new(Mutex::new(Vec::<String>::new()));

    let deps_of: Vec<Vec<String>> = beans
        .iter()
        .map(|spec| {
            spec.deps
                .iter()
                .take(4)
                .map(|&dep| name(dep as usize % (MAX_BEANS + 2)))
                .collect()
        })
        .collect();

    let container = Container::new();
    let definitions: Vec<BeanDefinition> = beans
        .iter()
        .enumerate()
        .map(|(index, spec)| {
            let log = Arc::clone(&constructed);
            BeanDefinition::builder(name(index), move |ctx| {
                for dep in ctx.dependencies() {
                    ctx.get_any(dep)?;
                }
                log.lock().unwrap().push(ctx.bean_name().to_string());
                Ok(index)
            })
            .depends_on_all(deps_of[index].iter().cloned())
            .scope(if spec.prototype {
                Scope::Prototype
            } else {
                Scope::Singleton
            })
            .lazy(spec.lazy)
            .build()
        })
        .collect();
    container.register_all(definitions).unwrap();

    let is_edge = |from: &str, to: &str| {
        (0..count).any(|index| name(index) == from && deps_of[index].iter().any(|dep| dep == to))
    };

    match container.start() {
        Ok(()) => {
            // Each realized bean appears after all of its dependencies
            let log = constructed.lock().unwrap().clone();
            for (position, bean) in log.iter().enumerate() {
                let index = (0..count).find(|&i| &name(i) == bean).unwrap();
                for dep in &deps_of[index] {
                    let dep_index = (0..count).find(|&i| &name(i) == dep).unwrap();
                    if !beans[dep_index].prototype {
                        assert!(log[..position].contains(dep), "{dep} not built before {bean}");
                    }
                }
            }

            // Singletons are constructed at most once
            let mut singletons: Vec<&String> = log
                .iter()
                .filter(|bean| {
                    let index = (0..count).find(|&i| &name(i) == *bean).unwrap();
                    !beans[index].prototype
                })
                .collect();
            let total = singletons.len();
            singletons.sort();
            singletons.dedup();
            assert_eq!(total, singletons.len());

            for index in 0..count {
                let value = container.get::<usize>(&name(index)).unwrap();
                assert_eq!(*value, index);
            }
            container.shutdown().unwrap();
        }
        Err(BeanError::CircularDependency { path }) => {
            assert!(constructed.lock().unwrap().is_empty());
            assert!(path.len() >= 2);
            assert_eq!(path.first(), path.last());
            for pair in path.windows(2) {
                assert!(is_edge(&pair[0], &pair[1]), "{} -> {} is not an edge", pair[0], pair[1]);
            }
        }
        Err(BeanError::UnknownBean { required_by, .. }) => {
            assert!(constructed.lock().unwrap().is_empty());
            assert!(required_by.is_some());
        }
        Err(other) => panic!("unexpected error: {other}"),
    }
});
