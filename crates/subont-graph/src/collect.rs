//! Descendant closure.
//!
//! BFS from the seed set over the rooted graph. Each node is expanded at most
//! once, so diamonds are not re-walked and cycles (possible when all
//! relationship types are kept) terminate.

use std::collections::{HashSet, VecDeque};

use subont_core::{ConceptCode, Deadline};

use crate::error::Result;
use crate::graph::{OntologyGraph, CHECK_INTERVAL};

/// Result of a descendant collection.
#[derive(Debug, Clone, Default)]
pub struct Closure {
    /// Every node reached by following at least one edge from a seed.
    pub descendants: HashSet<ConceptCode>,
    /// Nodes whose successors were fetched, in expansion order.
    pub expanded: Vec<ConceptCode>,
    /// Seeds that do not occur in the graph.
    pub unknown_seeds: Vec<ConceptCode>,
}

impl Closure {
    pub fn len(&self) -> usize {
        self.descendants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descendants.is_empty()
    }

    pub fn contains(&self, code: ConceptCode) -> bool {
        self.descendants.contains(&code)
    }
}

/// Computes descendant closures over a borrowed, read-only graph.
pub struct DescendantCollector<'g> {
    graph: &'g OntologyGraph,
    deadline: Deadline,
}

impl<'g> DescendantCollector<'g> {
    pub fn new(graph: &'g OntologyGraph) -> Self {
        Self {
            graph,
            deadline: Deadline::none(),
        }
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    /// All descendants of `seeds`.
    ///
    /// Seeds are included only when reachable from some seed. Seeds missing
    /// from the graph contribute nothing and are listed in
    /// [`Closure::unknown_seeds`].
    pub fn collect(&self, seeds: &[ConceptCode]) -> Result<Closure> {
        let graph = self.graph;
        let mut queued = vec![false; graph.node_count()];
        let mut queue = VecDeque::new();
        let mut closure = Closure::default();

        for &seed in seeds {
            match graph.node_index.get(&seed) {
                Some(&idx) => {
                    if !queued[idx] {
                        queued[idx] = true;
                        queue.push_back(idx);
                    }
                }
                None => {
                    tracing::debug!(seed = %seed, "Seed code not in ontology graph");
                    closure.unknown_seeds.push(seed);
                }
            }
        }

        while let Some(node) = queue.pop_front() {
            closure.expanded.push(graph.nodes[node]);
            if closure.expanded.len() % CHECK_INTERVAL == 0 {
                self.deadline.check()?;
            }

            for &child in &graph.adjacency[node] {
                closure.descendants.insert(graph.nodes[child]);
                if !queued[child] {
                    queued[child] = true;
                    queue.push_back(child);
                }
            }
        }

        tracing::debug!(
            seeds = seeds.len(),
            unknown_seeds = closure.unknown_seeds.len(),
            expanded = closure.expanded.len(),
            descendants = closure.descendants.len(),
            "Descendant closure computed"
        );

        Ok(closure)
    }
}

/// Descendants of `seeds` without a deadline.
pub fn collect_descendants(graph: &OntologyGraph, seeds: &[ConceptCode]) -> HashSet<ConceptCode> {
    // Without a deadline the traversal has no failure path.
    DescendantCollector::new(graph)
        .collect(seeds)
        .map(|closure| closure.descendants)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use std::time::Duration;

    const A: ConceptCode = ConceptCode(1);
    const B: ConceptCode = ConceptCode(2);
    const C: ConceptCode = ConceptCode(3);
    const D: ConceptCode = ConceptCode(4);
    const E: ConceptCode = ConceptCode(5);

    fn graph_from(edges: &[(ConceptCode, ConceptCode)]) -> OntologyGraph {
        let mut graph = OntologyGraph::new();
        for &(p, c) in edges {
            graph.add_edge(p, c);
        }
        graph.dedup_edges();
        graph
    }

    fn set(codes: &[ConceptCode]) -> HashSet<ConceptCode> {
        codes.iter().copied().collect()
    }

    /// Build a diamond:
    ///
    /// ```text
    ///     A
    ///    / \
    ///   B   C
    ///    \ /
    ///     D
    /// ```
    fn diamond() -> OntologyGraph {
        graph_from(&[(A, B), (A, C), (B, D), (C, D)])
    }

    #[test]
    fn test_chain_excludes_seed() {
        let graph = graph_from(&[(A, B), (B, C)]);
        let closure = DescendantCollector::new(&graph).collect(&[A]).unwrap();
        assert_eq!(closure.descendants, set(&[B, C]));
        assert!(!closure.contains(A));
    }

    #[test]
    fn test_diamond_expands_shared_node_once() {
        let graph = diamond();
        let closure = DescendantCollector::new(&graph).collect(&[A]).unwrap();

        assert_eq!(closure.descendants, set(&[B, C, D]));
        assert_eq!(closure.expanded.iter().filter(|&&n| n == D).count(), 1);
        assert_eq!(closure.expanded.len(), 4);
    }

    #[test]
    fn test_no_node_expanded_twice_across_seeds() {
        let graph = diamond();
        let closure = DescendantCollector::new(&graph)
            .collect(&[A, B, C, A])
            .unwrap();

        let unique: HashSet<_> = closure.expanded.iter().copied().collect();
        assert_eq!(unique.len(), closure.expanded.len());
        // B and C are seeds but also children of seed A.
        assert_eq!(closure.descendants, set(&[B, C, D]));
    }

    #[test]
    fn test_seed_included_only_when_reached() {
        let graph = graph_from(&[(A, B), (B, C), (D, E)]);
        let closure = DescendantCollector::new(&graph).collect(&[B, D]).unwrap();
        assert_eq!(closure.descendants, set(&[C, E]));
    }

    #[test]
    fn test_cycle_terminates() {
        let graph = graph_from(&[(A, B), (B, C), (C, A), (C, D)]);
        let closure = DescendantCollector::new(&graph).collect(&[A]).unwrap();

        // A is reachable from itself through the cycle.
        assert_eq!(closure.descendants, set(&[A, B, C, D]));
        assert_eq!(closure.expanded.len(), 4);
    }

    #[test]
    fn test_self_loop() {
        let graph = graph_from(&[(A, A), (A, B)]);
        let closure = DescendantCollector::new(&graph).collect(&[A]).unwrap();
        assert_eq!(closure.descendants, set(&[A, B]));
        assert_eq!(closure.expanded, vec![A, B]);
    }

    #[test]
    fn test_leaf_seed_contributes_nothing() {
        let graph = diamond();
        let closure = DescendantCollector::new(&graph).collect(&[D]).unwrap();
        assert!(closure.is_empty());
        assert!(closure.unknown_seeds.is_empty());
    }

    #[test]
    fn test_unknown_seed_reported() {
        let graph = diamond();
        let missing = ConceptCode(404_684_003);
        let closure = DescendantCollector::new(&graph)
            .collect(&[missing, B])
            .unwrap();
        assert_eq!(closure.descendants, set(&[D]));
        assert_eq!(closure.unknown_seeds, vec![missing]);
    }

    #[test]
    fn test_empty_graph() {
        let graph = OntologyGraph::new();
        let closure = DescendantCollector::new(&graph).collect(&[A, B]).unwrap();
        assert!(closure.is_empty());
        assert!(closure.expanded.is_empty());
        assert_eq!(closure.unknown_seeds, vec![A, B]);
        assert!(collect_descendants(&graph, &[A]).is_empty());
    }

    #[test]
    fn test_empty_seed_list() {
        let graph = diamond();
        assert!(DescendantCollector::new(&graph).collect(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_collect_is_idempotent() {
        let graph = graph_from(&[(A, B), (A, C), (C, D), (D, B), (B, E)]);
        let collector = DescendantCollector::new(&graph);
        let first = collector.collect(&[A, C]).unwrap();
        let second = collector.collect(&[A, C]).unwrap();
        assert_eq!(first.descendants, second.descendants);
        assert_eq!(first.expanded, second.expanded);
    }

    #[test]
    fn test_free_function_matches_collector() {
        let graph = graph_from(&[(A, B), (B, C), (C, A), (C, D), (E, D)]);
        for seeds in [vec![A], vec![E], vec![B, E], vec![D], vec![]] {
            let closure = DescendantCollector::new(&graph).collect(&seeds).unwrap();
            assert_eq!(collect_descendants(&graph, &seeds), closure.descendants);
        }
    }

    #[test]
    fn test_deadline_interrupts_large_traversal() {
        let mut graph = OntologyGraph::new();
        for i in 0..(CHECK_INTERVAL as u64 * 2) {
            graph.add_edge(ConceptCode(i), ConceptCode(i + 1));
        }
        let result = DescendantCollector::new(&graph)
            .with_deadline(Deadline::after(Duration::ZERO))
            .collect(&[ConceptCode(0)]);
        assert!(matches!(result, Err(GraphError::Timeout { max_seconds: 0 })));
    }
}
