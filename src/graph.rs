use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// Directed multigraph whose vertices carry the token they were read from.
///
/// Vertex ids are dense and follow first appearance in the input. Once built
/// the graph is read-only; only [`GraphBuilder`] can add to it.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    inner: DiGraph<String, ()>,
}

impl Graph {
    pub fn num_vertices(&self) -> usize {
        self.inner.node_count()
    }

    pub fn num_edges(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn token(&self, vertex: usize) -> &str {
        &self.inner[NodeIndex::new(vertex)]
    }

    /// Edges as `(source, target)` vertex ids, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.inner
            .edge_references()
            .map(|e| (e.source().index(), e.target().index()))
    }

    pub fn as_petgraph(&self) -> &DiGraph<String, ()> {
        &self.inner
    }
}

/// Interns vertex tokens and collects edges for a [`Graph`].
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: DiGraph<String, ()>,
    node_indices: HashMap<String, NodeIndex>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `token`, creating the vertex on first sight.
    pub fn vertex(&mut self, token: &str) -> usize {
        if let Some(idx) = self.node_indices.get(token) {
            return idx.index();
        }
        let idx = self.graph.add_node(token.to_string());
        self.node_indices.insert(token.to_string(), idx);
        idx.index()
    }

    pub fn add_edge(&mut self, source: &str, target: &str) {
        let s = self.vertex(source);
        let t = self.vertex(target);
        self.graph
            .add_edge(NodeIndex::new(s), NodeIndex::new(t), ());
    }

    pub fn build(self) -> Graph {
        Graph { inner: self.graph }
    }
}

impl<S: AsRef<str>> FromIterator<(S, S)> for Graph {
    fn from_iter<I: IntoIterator<Item = (S, S)>>(iter: I) -> Self {
        let mut builder = GraphBuilder::new();
        for (s, t) in iter {
            builder.add_edge(s.as_ref(), t.as_ref());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_follow_first_occurrence() {
        let g: Graph = [("b", "a"), ("c", "b"), ("a", "d")].into_iter().collect();
        assert_eq!(g.num_vertices(), 4);
        assert_eq!(g.token(0), "b");
        assert_eq!(g.token(1), "a");
        assert_eq!(g.token(2), "c");
        assert_eq!(g.token(3), "d");
        assert_eq!(g.edges().collect::<Vec<_>>(), vec![(0, 1), (2, 0), (1, 3)]);
    }

    #[test]
    fn parallel_edges_and_self_loops_are_kept() {
        let g: Graph = [("a", "b"), ("a", "b"), ("a", "a")].into_iter().collect();
        assert_eq!(g.num_vertices(), 2);
        assert_eq!(g.num_edges(), 3);
    }
}
