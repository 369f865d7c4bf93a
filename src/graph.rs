//! Dependency graph construction and ordering
//!
//! The graph is rebuilt from the registered definitions on every resolution
//! pass and dropped afterwards. Ordering uses an iterative depth-first search
//! with three-color marking, so cycles are found in O(V+E) and deep chains
//! cannot overflow the stack.

use crate::{BeanDefinition, BeanError, Result};
use ahash::RandomState;
use std::collections::HashMap;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, error};

/// `from` depends on `to`, so `to` must be realized first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Directed graph of bean identifiers.
///
/// Nodes are kept in registration order; that order breaks ties between
/// independent subgraphs.
///
/// # Examples
///
/// ```rust
/// use bean_container::{BeanDefinition, DependencyGraph};
/// use std::sync::Arc;
///
/// let defs: Vec<Arc<BeanDefinition>> = vec![
///     Arc::new(BeanDefinition::singleton("c", |_| Ok(3u8)).depends_on_all(["b", "a"]).build()),
///     Arc::new(BeanDefinition::singleton("a", |_| Ok(1u8)).build()),
///     Arc::new(BeanDefinition::singleton("b", |_| Ok(2u8)).depends_on("a").build()),
/// ];
///
/// let graph = DependencyGraph::build(&defs).unwrap();
/// assert_eq!(graph.topological_order().unwrap(), ["a", "b", "c"]);
/// ```
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: Vec<String>,
    index: HashMap<String, usize, RandomState>,
    /// Outgoing edges per node, in declaration order
    adjacency: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Build the graph, failing with `UnknownBean` on a dangling reference.
    pub fn build(definitions: &[Arc<BeanDefinition>]) -> Result<Self> {
        let mut index: HashMap<String, usize, RandomState> =
            HashMap::with_capacity_and_hasher(definitions.len(), RandomState::new());
        for (position, definition) in definitions.iter().enumerate() {
            index.insert(definition.name().to_string(), position);
        }

        let mut adjacency = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let mut targets = Vec::with_capacity(definition.dependencies().len());
            for dependency in definition.dependencies() {
                let Some(&target) = index.get(dependency.as_str()) else {
                    #[cfg(feature = "logging")]
                    error!(
                        target: "bean_container",
                        bean = definition.name(),
                        dependency = dependency.as_str(),
                        "Dependency refers to an unregistered bean"
                    );
                    return Err(BeanError::missing_dependency(
                        dependency.as_str(),
                        definition.name(),
                    ));
                };
                targets.push(target);
            }
            adjacency.push(targets);
        }

        Ok(Self {
            nodes: definitions
                .iter()
                .map(|definition| definition.name().to_string())
                .collect(),
            index,
            adjacency,
        })
    }

    /// Every identifier such that each appears after all of its dependencies.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());

        for root in 0..self.nodes.len() {
            self.visit(root, &mut marks, &mut order, &|_: &str| true)?;
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "bean_container",
            beans = order.len(),
            order = ?order,
            "Resolved instantiation order"
        );

        Ok(order)
    }

    /// The subgraph reachable from `root`, dependencies first, `root` last.
    pub fn order_for(&self, root: &str) -> Result<Vec<String>> {
        self.order_for_filtered(root, |_| true)
    }

    /// Like [`order_for`](Self::order_for), but a node for which `expand`
    /// returns `false` is emitted without visiting its dependencies.
    ///
    /// `root` is always emitted last.
    pub fn order_for_filtered<F>(&self, root: &str, expand: F) -> Result<Vec<String>>
    where
        F: Fn(&str) -> bool,
    {
        let &start = self
            .index
            .get(root)
            .ok_or_else(|| BeanError::unknown(root))?;

        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut order = Vec::new();
        self.visit(start, &mut marks, &mut order, &expand)?;
        Ok(order)
    }

    /// Edges derived from the declared dependency lists
    pub fn edges(&self) -> Vec<DependencyEdge> {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(from, targets)| {
                targets.iter().map(move |&to| DependencyEdge {
                    from: self.nodes[from].clone(),
                    to: self.nodes[to].clone(),
                })
            })
            .collect()
    }

    /// Identifiers in registration order
    #[inline]
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Post-order DFS from `root` with an explicit stack of
    /// `(node, next outgoing edge)` frames.
    fn visit<F>(
        &self,
        root: usize,
        marks: &mut [Mark],
        order: &mut Vec<String>,
        expand: &F,
    ) -> Result<()>
    where
        F: Fn(&str) -> bool,
    {
        if marks[root] != Mark::Unvisited {
            return Ok(());
        }
        if !expand(&self.nodes[root]) {
            marks[root] = Mark::Done;
            order.push(self.nodes[root].clone());
            return Ok(());
        }

        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        marks[root] = Mark::InProgress;

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;

            let Some(&target) = self.adjacency[node].get(next) else {
                marks[node] = Mark::Done;
                order.push(self.nodes[node].clone());
                stack.pop();
                continue;
            };
            frame.1 += 1;

            match marks[target] {
                Mark::Done => {}
                Mark::Unvisited if !expand(&self.nodes[target]) => {
                    marks[target] = Mark::Done;
                    order.push(self.nodes[target].clone());
                }
                Mark::Unvisited => {
                    marks[target] = Mark::InProgress;
                    stack.push((target, 0));
                }
                Mark::InProgress => {
                    let path = self.cycle_path(&stack, target);

                    #[cfg(feature = "logging")]
                    error!(
                        target: "bean_container",
                        path = %path.join(" -> "),
                        "Circular dependency detected"
                    );

                    return Err(BeanError::CircularDependency { path });
                }
            }
        }

        Ok(())
    }

    /// The in-progress frames from `target` to the top of the stack, closed
    /// by `target` again.
    fn cycle_path(&self, stack: &[(usize, usize)], target: usize) -> Vec<String> {
        let start = stack
            .iter()
            .position(|&(node, _)| node == target)
            .unwrap_or(0);
        stack[start..]
            .iter()
            .map(|&(node, _)| self.nodes[node].clone())
            .chain(std::iter::once(self.nodes[target].clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defs(spec: &[(&str, &[&str])]) -> Vec<Arc<BeanDefinition>> {
        spec.iter()
            .map(|(name, deps)| {
                Arc::new(
                    BeanDefinition::singleton(*name, |_| Ok(()))
                        .depends_on_all(deps.iter().copied())
                        .build(),
                )
            })
            .collect()
    }

    #[test]
    fn test_order_puts_dependencies_first() {
        let graph = DependencyGraph::build(&defs(&[("a", &[]), ("b", &["a"]), ("c", &["b", "a"])]))
            .unwrap();
        assert_eq!(graph.topological_order().unwrap(), ["a", "b", "c"]);
    }

    #[test]
    fn test_order_independent_of_registration_order() {
        let graph = DependencyGraph::build(&defs(&[("c", &["b", "a"]), ("b", &["a"]), ("a", &[])]))
            .unwrap();
        assert_eq!(graph.topological_order().unwrap(), ["a", "b", "c"]);
    }

    #[test]
    fn test_ties_broken_by_registration_order() {
        let graph = DependencyGraph::build(&defs(&[
            ("x", &[]),
            ("m", &[]),
            ("y", &["x"]),
            ("a", &[]),
        ]))
        .unwrap();

        let first = graph.topological_order().unwrap();
        assert_eq!(first, ["x", "m", "y", "a"]);

        // Deterministic across runs
        for _ in 0..10 {
            assert_eq!(graph.topological_order().unwrap(), first);
        }
    }

    #[test]
    fn test_two_node_cycle_reports_path() {
        let graph = DependencyGraph::build(&defs(&[("a", &["b"]), ("b", &["a"])])).unwrap();
        let err = graph.topological_order().unwrap_err();
        match err {
            BeanError::CircularDependency { path } => assert_eq!(path, ["a", "b", "a"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_cycle_path_excludes_acyclic_prefix() {
        let graph = DependencyGraph::build(&defs(&[
            ("root", &["x"]),
            ("x", &["y"]),
            ("y", &["z"]),
            ("z", &["x"]),
        ]))
        .unwrap();
        let err = graph.topological_order().unwrap_err();
        match err {
            BeanError::CircularDependency { path } => assert_eq!(path, ["x", "y", "z", "x"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let graph = DependencyGraph::build(&defs(&[("a", &["a"])])).unwrap();
        assert!(matches!(
            graph.topological_order(),
            Err(BeanError::CircularDependency { ref path }) if path == &["a", "a"]
        ));
    }

    #[test]
    fn test_unknown_dependency_rejected_at_build() {
        let err = DependencyGraph::build(&defs(&[("a", &["ghost"])])).unwrap_err();
        match err {
            BeanError::UnknownBean { name, required_by } => {
                assert_eq!(name, "ghost");
                assert_eq!(required_by.as_deref(), Some("a"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_order_for_subgraph() {
        let graph = DependencyGraph::build(&defs(&[
            ("a", &[]),
            ("unrelated", &[]),
            ("b", &["a"]),
            ("c", &["b"]),
        ]))
        .unwrap();

        assert_eq!(graph.order_for("c").unwrap(), ["a", "b", "c"]);
        assert_eq!(graph.order_for("a").unwrap(), ["a"]);
        assert!(graph.order_for("missing").is_err());
    }

    #[test]
    fn test_filtered_subgraph_stops_at_unexpanded_nodes() {
        let graph = DependencyGraph::build(&defs(&[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &["b"]),
            ("d", &["c", "a"]),
        ]))
        .unwrap();

        // `b` is emitted but `a` is only reached through `d`
        assert_eq!(
            graph.order_for_filtered("d", |name| name != "b").unwrap(),
            ["b", "c", "a", "d"]
        );
        assert_eq!(graph.order_for_filtered("d", |name| name != "d").unwrap(), ["d"]);
    }

    #[test]
    fn test_edges() {
        let graph = DependencyGraph::build(&defs(&[("a", &[]), ("b", &["a"])])).unwrap();
        assert_eq!(
            graph.edges(),
            vec![DependencyEdge {
                from: "b".into(),
                to: "a".into()
            }]
        );
        assert_eq!(graph.nodes(), ["a", "b"]);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let names: Vec<String> = (0..20_000).map(|i| format!("bean{i}")).collect();
        let definitions: Vec<Arc<BeanDefinition>> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut builder = BeanDefinition::singleton(name.clone(), |_| Ok(()));
                if i > 0 {
                    builder = builder.depends_on(names[i - 1].clone());
                }
                Arc::new(builder.build())
            })
            .collect();

        let order = DependencyGraph::build(&definitions)
            .unwrap()
            .topological_order()
            .unwrap();
        assert_eq!(order, names);
    }
}
