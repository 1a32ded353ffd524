//! Directed acyclic class graph.
//!
//! Nodes are stored once, in insertion order, and referenced by index.
//! Forward (`children`) and backward (`parents`) adjacency are both kept so
//! that ancestor and sibling queries never scan the whole edge set.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::TaxonomyError;

/// An immutable, validated class hierarchy.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    nodes: Vec<String>,
    descriptions: Vec<String>,
    index: HashMap<String, usize>,
    children: Vec<Vec<usize>>,
    parents: Vec<Vec<usize>>,
    max_depth: usize,
}

/// Mutable graph under construction. Only [`GraphBuilder::build`] produces a
/// [`Taxonomy`], and only after validation.
#[derive(Debug, Default)]
pub(crate) struct GraphBuilder {
    nodes: Vec<String>,
    descriptions: Vec<String>,
    index: HashMap<String, usize>,
    children: Vec<Vec<usize>>,
    parents: Vec<Vec<usize>>,
}

impl GraphBuilder {
    /// Index of `name`, inserting it if new.
    pub(crate) fn add_node(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(name.to_string());
        self.descriptions.push(String::new());
        self.children.push(Vec::new());
        self.parents.push(Vec::new());
        self.index.insert(name.to_string(), idx);
        idx
    }

    pub(crate) fn set_description(&mut self, node: usize, description: &str) {
        if let Some(slot) = self.descriptions.get_mut(node) {
            *slot = description.to_string();
        }
    }

    /// Add `parent -> child`. Repeated edges are ignored.
    pub(crate) fn add_edge(&mut self, parent: usize, child: usize) {
        if !self.children[parent].contains(&child) {
            self.children[parent].push(child);
            self.parents[child].push(parent);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Validate acyclicity and compute derived values.
    pub(crate) fn build(self) -> Result<Taxonomy, TaxonomyError> {
        if let Some(node) = find_cycle(&self.children) {
            return Err(TaxonomyError::CycleDetected {
                node: self.nodes[node].clone(),
            });
        }

        let order = topological_order(&self.children, &self.parents);
        let max_depth = longest_path_length(&order, &self.parents);

        debug!(
            nodes = self.nodes.len(),
            max_depth = max_depth,
            "Built taxonomy graph"
        );

        Ok(Taxonomy {
            nodes: self.nodes,
            descriptions: self.descriptions,
            index: self.index,
            children: self.children,
            parents: self.parents,
            max_depth,
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// First node found on a cycle, if any. Iterative DFS with three colors:
/// reaching a gray node means a back edge.
fn find_cycle(children: &[Vec<usize>]) -> Option<usize> {
    let mut color = vec![Color::White; children.len()];

    for start in 0..children.len() {
        if color[start] != Color::White {
            continue;
        }
        color[start] = Color::Gray;
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];

        while let Some((node, next)) = stack.last_mut() {
            if let Some(&child) = children[*node].get(*next) {
                *next += 1;
                match color[child] {
                    Color::Gray => return Some(child),
                    Color::White => {
                        color[child] = Color::Gray;
                        stack.push((child, 0));
                    }
                    Color::Black => {}
                }
            } else {
                color[*node] = Color::Black;
                stack.pop();
            }
        }
    }

    None
}

/// Kahn's algorithm. Assumes the graph is acyclic.
fn topological_order(children: &[Vec<usize>], parents: &[Vec<usize>]) -> Vec<usize> {
    let mut in_degree: Vec<usize> = parents.iter().map(Vec::len).collect();
    let mut queue: VecDeque<usize> = (0..children.len())
        .filter(|&n| in_degree[n] == 0)
        .collect();
    let mut order = Vec::with_capacity(children.len());

    while let Some(node) = queue.pop_front() {
        order.push(node);
        for &child in &children[node] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                queue.push_back(child);
            }
        }
    }

    order
}

/// Longest directed path, in edges, by DP over a topological order.
fn longest_path_length(order: &[usize], parents: &[Vec<usize>]) -> usize {
    let mut depth = vec![0usize; parents.len()];
    for &node in order {
        depth[node] = parents[node]
            .iter()
            .map(|&p| depth[p] + 1)
            .max()
            .unwrap_or(0);
    }
    depth.into_iter().max().unwrap_or(0)
}

impl Taxonomy {
    /// Build from explicit `(parent, child)` edges.
    ///
    /// There is no implicit root: zero in-degree nodes are the roots.
    pub fn from_edges<I, S>(edges: I) -> Result<Self, TaxonomyError>
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        let mut builder = GraphBuilder::default();
        for (parent, child) in edges {
            let p = builder.add_node(parent.as_ref());
            let c = builder.add_node(child.as_ref());
            builder.add_edge(p, c);
        }

        if builder.len() < 2 {
            // A lone self-loop is still a cycle, report that first.
            builder.build()?;
            return Err(TaxonomyError::TooFewNodes);
        }

        let taxonomy = builder.build()?;
        if taxonomy.root_nodes().is_empty() {
            return Err(TaxonomyError::NoTopLevelNodes);
        }
        Ok(taxonomy)
    }

    pub(crate) fn from_builder(builder: GraphBuilder) -> Result<Self, TaxonomyError> {
        builder.build()
    }

    fn idx(&self, node: &str) -> Result<usize, TaxonomyError> {
        self.index
            .get(node)
            .copied()
            .ok_or_else(|| TaxonomyError::UnknownNode(node.to_string()))
    }

    fn names(&self, indices: impl IntoIterator<Item = usize>) -> BTreeSet<String> {
        indices
            .into_iter()
            .map(|i| self.nodes[i].clone())
            .collect()
    }

    /// All classes in insertion order.
    pub fn classes(&self) -> &[String] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, node: &str) -> bool {
        self.index.contains_key(node)
    }

    /// Description of `node`, empty when none was given.
    pub fn description(&self, node: &str) -> Option<&str> {
        self.index
            .get(node)
            .map(|&i| self.descriptions[i].as_str())
    }

    /// Longest directed path length in edges.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Nodes with no parents.
    pub fn root_nodes(&self) -> BTreeSet<String> {
        self.names((0..self.nodes.len()).filter(|&i| self.parents[i].is_empty()))
    }

    /// Nodes with no children.
    pub fn leaf_nodes(&self) -> BTreeSet<String> {
        self.names((0..self.nodes.len()).filter(|&i| self.children[i].is_empty()))
    }

    pub fn is_leaf(&self, node: &str) -> bool {
        self.index
            .get(node)
            .is_some_and(|&i| self.children[i].is_empty())
    }

    /// Direct successors of `node`.
    pub fn children(&self, node: &str) -> Result<BTreeSet<String>, TaxonomyError> {
        let i = self.idx(node)?;
        Ok(self.names(self.children[i].iter().copied()))
    }

    /// Direct predecessors of `node`.
    pub fn parents(&self, node: &str) -> Result<BTreeSet<String>, TaxonomyError> {
        let i = self.idx(node)?;
        Ok(self.names(self.parents[i].iter().copied()))
    }

    /// Every node from which `node` is reachable.
    pub fn ancestors(&self, node: &str) -> Result<BTreeSet<String>, TaxonomyError> {
        let start = self.idx(node)?;
        let mut seen: HashSet<usize> = HashSet::new();
        let mut queue: VecDeque<usize> = self.parents[start].iter().copied().collect();

        while let Some(n) = queue.pop_front() {
            if seen.insert(n) {
                queue.extend(self.parents[n].iter().copied());
            }
        }

        Ok(self.names(seen))
    }

    /// Children of every parent of `node`, minus `node` itself.
    pub fn siblings(&self, node: &str) -> Result<BTreeSet<String>, TaxonomyError> {
        let i = self.idx(node)?;
        let mut siblings: BTreeSet<String> = self.names(
            self.parents[i]
                .iter()
                .flat_map(|&p| self.children[p].iter().copied()),
        );
        siblings.remove(node);
        Ok(siblings)
    }

    /// Every path from a root to a leaf, without the root element.
    ///
    /// Paths that become empty (a root that is itself a leaf) are skipped and
    /// duplicate paths are reported once, in first-seen order.
    pub fn all_root_to_leaf_paths(&self) -> Vec<Vec<String>> {
        let mut seen: HashSet<Vec<usize>> = HashSet::new();
        let mut paths = Vec::new();

        for root in (0..self.nodes.len()).filter(|&i| self.parents[i].is_empty()) {
            let mut path = vec![root];
            let mut stack: Vec<usize> = vec![0];

            while let Some(next) = stack.last_mut() {
                let Some(&node) = path.last() else { break };
                if self.children[node].is_empty() {
                    let trimmed = path[1..].to_vec();
                    if !trimmed.is_empty() && seen.insert(trimmed.clone()) {
                        paths.push(trimmed.iter().map(|&i| self.nodes[i].clone()).collect());
                    }
                    stack.pop();
                    path.pop();
                } else if let Some(&child) = self.children[node].get(*next) {
                    *next += 1;
                    path.push(child);
                    stack.push(0);
                } else {
                    stack.pop();
                    path.pop();
                }
            }
        }

        paths
    }

    /// Stable SHA-256 hex digest of nodes, descriptions and edges.
    ///
    /// Independent of insertion order.
    pub fn fingerprint(&self) -> String {
        let mut lines: Vec<String> = Vec::with_capacity(self.nodes.len() * 2);
        for (i, name) in self.nodes.iter().enumerate() {
            lines.push(format!("node\t{}\t{}", name, self.descriptions[i]));
            for &c in &self.children[i] {
                lines.push(format!("edge\t{}\t{}", name, self.nodes[c]));
            }
        }
        lines.sort();

        let mut hasher = Sha256::new();
        for line in &lines {
            hasher.update(line.as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// A -> {A1, A2}, B -> {B1}, A1 -> {X}, B1 -> {X}
    fn diamond() -> Taxonomy {
        Taxonomy::from_edges([
            ("A", "A1"),
            ("A", "A2"),
            ("B", "B1"),
            ("A1", "X"),
            ("B1", "X"),
        ])
        .unwrap()
    }

    #[test]
    fn test_root_and_leaf_nodes() {
        let t = diamond();
        assert_eq!(t.root_nodes(), set(&["A", "B"]));
        assert_eq!(t.leaf_nodes(), set(&["A2", "X"]));
        assert!(t.is_leaf("X"));
        assert!(!t.is_leaf("A"));
    }

    #[test]
    fn test_max_depth_is_longest_path() {
        assert_eq!(diamond().max_depth(), 2);

        let chain = Taxonomy::from_edges([("a", "b"), ("b", "c"), ("c", "d"), ("a", "d")]).unwrap();
        assert_eq!(chain.max_depth(), 3);
    }

    #[test]
    fn test_siblings_union_across_parents() {
        let t = Taxonomy::from_edges([
            ("P1", "X"),
            ("P1", "S1"),
            ("P2", "X"),
            ("P2", "S2"),
        ])
        .unwrap();
        assert_eq!(t.siblings("X").unwrap(), set(&["S1", "S2"]));
        assert_eq!(t.siblings("S1").unwrap(), set(&["X"]));
        assert!(t.siblings("P1").unwrap().is_empty());
    }

    #[test]
    fn test_ancestors_and_parents() {
        let t = diamond();
        assert_eq!(t.parents("X").unwrap(), set(&["A1", "B1"]));
        assert_eq!(t.ancestors("X").unwrap(), set(&["A", "A1", "B", "B1"]));
        assert!(t.ancestors("A").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_node() {
        let t = diamond();
        assert!(matches!(t.ancestors("nope"), Err(TaxonomyError::UnknownNode(_))));
        assert!(t.description("nope").is_none());
        assert!(!t.contains("nope"));
    }

    #[test]
    fn test_all_paths_drop_root_and_dedupe() {
        let t = diamond();
        let paths = t.all_root_to_leaf_paths();
        assert_eq!(
            paths,
            vec![
                vec!["A1".to_string(), "X".to_string()],
                vec!["A2".to_string()],
                vec!["B1".to_string(), "X".to_string()],
            ]
        );

        // Two roots funnelling into the same subtree yield the same trimmed path.
        let shared = Taxonomy::from_edges([("r1", "m"), ("r2", "m"), ("m", "leaf")]).unwrap();
        assert_eq!(
            shared.all_root_to_leaf_paths(),
            vec![vec!["m".to_string(), "leaf".to_string()]]
        );
    }

    #[test]
    fn test_cycle_rejected() {
        let err = Taxonomy::from_edges([("a", "b"), ("b", "c"), ("c", "a")]).unwrap_err();
        assert!(matches!(err, TaxonomyError::CycleDetected { .. }));

        let err = Taxonomy::from_edges([("a", "a")]).unwrap_err();
        assert!(matches!(err, TaxonomyError::CycleDetected { .. }));
    }

    #[test]
    fn test_too_few_nodes() {
        let err = Taxonomy::from_edges(Vec::<(&str, &str)>::new()).unwrap_err();
        assert!(matches!(err, TaxonomyError::TooFewNodes));
    }

    #[test]
    fn test_fingerprint_ignores_insertion_order() {
        let a = Taxonomy::from_edges([("A", "A1"), ("B", "B1")]).unwrap();
        let b = Taxonomy::from_edges([("B", "B1"), ("A", "A1")]).unwrap();
        let c = Taxonomy::from_edges([("A", "A1"), ("B", "B2")]).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_classes_keep_insertion_order() {
        let t = Taxonomy::from_edges([("B", "B1"), ("A", "A1")]).unwrap();
        assert_eq!(t.classes(), &["B", "B1", "A", "A1"]);
        assert_eq!(t.len(), 4);
    }
}
