//! In-memory ontology graph.
//!
//! Concept codes are mapped to dense indices and edges are kept in a compact
//! adjacency list, so traversals over several hundred thousand concepts stay
//! cache-friendly. Edges point from the broader concept to the narrower one.

use std::collections::{HashMap, VecDeque};

use subont_core::{ConceptCode, Deadline};

use crate::error::Result;

/// How often long loops consult the deadline.
pub(crate) const CHECK_INTERVAL: usize = 4096;

/// A directed parent → child graph over concept codes.
#[derive(Debug, Clone, Default)]
pub struct OntologyGraph {
    /// All nodes, indexed by dense index.
    pub nodes: Vec<ConceptCode>,
    /// Adjacency list: `adjacency[i]` = children of node `i`.
    pub adjacency: Vec<Vec<usize>>,
    /// Map from concept code → dense index.
    pub node_index: HashMap<ConceptCode, usize>,
}

impl OntologyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dense index of `code`, inserting a new node if needed.
    fn intern(&mut self, code: ConceptCode) -> usize {
        if let Some(&idx) = self.node_index.get(&code) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(code);
        self.adjacency.push(Vec::new());
        self.node_index.insert(code, idx);
        idx
    }

    /// Add a `parent → child` edge.
    ///
    /// Repeated edges are stored until [`dedup_edges`](Self::dedup_edges) runs.
    pub fn add_edge(&mut self, parent: ConceptCode, child: ConceptCode) {
        let p = self.intern(parent);
        let c = self.intern(child);
        self.adjacency[p].push(c);
    }

    /// Collapse repeated edges so each `(parent, child)` pair appears once.
    pub fn dedup_edges(&mut self) {
        for children in &mut self.adjacency {
            children.sort_unstable();
            children.dedup();
        }
    }

    pub fn contains(&self, code: ConceptCode) -> bool {
        self.node_index.contains_key(&code)
    }

    /// Direct children of `code`. Unknown codes have none.
    pub fn successors(&self, code: ConceptCode) -> impl Iterator<Item = ConceptCode> + '_ {
        self.node_index
            .get(&code)
            .map(|&i| self.adjacency[i].as_slice())
            .unwrap_or(&[])
            .iter()
            .map(|&j| self.nodes[j])
    }

    /// All edges as `(parent, child)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (ConceptCode, ConceptCode)> + '_ {
        self.adjacency.iter().enumerate().flat_map(move |(i, children)| {
            children.iter().map(move |&j| (self.nodes[i], self.nodes[j]))
        })
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(|edges| edges.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Restrict the graph to everything reachable from `root`.
    ///
    /// BFS from the root marks reachable nodes; the result keeps those nodes
    /// and every edge leaving them (such an edge always lands on another
    /// reachable node). An absent root yields an empty graph.
    pub fn rooted_at(&self, root: ConceptCode, deadline: &Deadline) -> Result<OntologyGraph> {
        let Some(&root_idx) = self.node_index.get(&root) else {
            return Ok(OntologyGraph::new());
        };

        // Old index → new index, assigned in BFS order so the root is node 0.
        let mut remap: Vec<Option<usize>> = vec![None; self.nodes.len()];
        let mut order = Vec::new();
        let mut queue = VecDeque::new();

        remap[root_idx] = Some(0);
        order.push(root_idx);
        queue.push_back(root_idx);

        let mut popped = 0usize;
        while let Some(node) = queue.pop_front() {
            popped += 1;
            if popped % CHECK_INTERVAL == 0 {
                deadline.check()?;
            }
            for &child in &self.adjacency[node] {
                if remap[child].is_none() {
                    remap[child] = Some(order.len());
                    order.push(child);
                    queue.push_back(child);
                }
            }
        }

        let mut rooted = OntologyGraph {
            nodes: Vec::with_capacity(order.len()),
            adjacency: Vec::with_capacity(order.len()),
            node_index: HashMap::with_capacity(order.len()),
        };

        for (new_idx, &old_idx) in order.iter().enumerate() {
            let code = self.nodes[old_idx];
            rooted.nodes.push(code);
            rooted.node_index.insert(code, new_idx);
            rooted.adjacency.push(
                self.adjacency[old_idx]
                    .iter()
                    .filter_map(|&child| remap[child])
                    .collect(),
            );
        }

        Ok(rooted)
    }
}
