use petgraph::algo::tarjan_scc;
use petgraph::unionfind::UnionFind;
use std::fmt;

use crate::graph::Graph;

/// Which notion of connectivity to label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentMode {
    /// Edge direction ignored.
    Weak,
    /// Mutual reachability along directed paths.
    Strong,
}

/// Component id per vertex plus the size of every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentLabels {
    pub labels: Vec<usize>,
    pub histogram: Vec<usize>,
}

impl ComponentLabels {
    pub fn count(&self) -> usize {
        self.histogram.len()
    }

    pub fn largest(&self) -> usize {
        self.histogram.iter().copied().max().unwrap_or(0)
    }
}

pub fn label_components(graph: &Graph, mode: ComponentMode) -> ComponentLabels {
    match mode {
        ComponentMode::Weak => weak_components(graph),
        ComponentMode::Strong => strong_components(graph),
    }
}

fn weak_components(graph: &Graph) -> ComponentLabels {
    let n = graph.num_vertices();
    let mut uf = UnionFind::<usize>::new(n);
    for (s, t) in graph.edges() {
        uf.union(s, t);
    }

    // Representatives are arbitrary vertex ids; compact them to 0..k.
    let mut dense = vec![usize::MAX; n];
    let mut histogram = Vec::new();
    let labels: Vec<usize> = uf
        .into_labeling()
        .into_iter()
        .map(|root| {
            if dense[root] == usize::MAX {
                dense[root] = histogram.len();
                histogram.push(0);
            }
            histogram[dense[root]] += 1;
            dense[root]
        })
        .collect();

    ComponentLabels { labels, histogram }
}

fn strong_components(graph: &Graph) -> ComponentLabels {
    let sccs = tarjan_scc(graph.as_petgraph());
    let mut labels = vec![0; graph.num_vertices()];
    let mut histogram = Vec::with_capacity(sccs.len());
    for (component_id, nodes) in sccs.into_iter().enumerate() {
        histogram.push(nodes.len());
        for node in nodes {
            labels[node.index()] = component_id;
        }
    }
    ComponentLabels { labels, histogram }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityReport {
    pub num_edges: usize,
    pub num_vertices: usize,
    pub weak_components: usize,
    pub strong_components: usize,
}

impl ConnectivityReport {
    /// Builds the report from labelings already computed for `graph`.
    pub fn from_labels(graph: &Graph, weak: &ComponentLabels, strong: &ComponentLabels) -> Self {
        ConnectivityReport {
            num_edges: graph.num_edges(),
            num_vertices: graph.num_vertices(),
            weak_components: weak.count(),
            strong_components: strong.count(),
        }
    }
}

pub fn analyze(graph: &Graph) -> ConnectivityReport {
    let weak = label_components(graph, ComponentMode::Weak);
    let strong = label_components(graph, ComponentMode::Strong);
    ConnectivityReport::from_labels(graph, &weak, &strong)
}

impl fmt::Display for ConnectivityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.num_edges)?;
        writeln!(f, "{}", self.num_vertices)?;
        writeln!(f, "# wcc: {}", self.weak_components)?;
        write!(f, "# scc: {}", self.strong_components)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    fn graph(edges: &[(&str, &str)]) -> Graph {
        edges.iter().copied().collect()
    }

    #[test]
    fn directed_cycle_is_one_strong_component() {
        let report = analyze(&graph(&[("a", "b"), ("b", "c"), ("c", "a")]));
        assert_eq!(report.weak_components, 1);
        assert_eq!(report.strong_components, 1);
    }

    #[test]
    fn directed_path_splits_into_singletons() {
        let report = analyze(&graph(&[("a", "b"), ("b", "c")]));
        assert_eq!(report.weak_components, 1);
        assert_eq!(report.strong_components, 3);
    }

    #[test]
    fn isolated_vertices_are_their_own_components() {
        let mut builder = GraphBuilder::new();
        for token in ["x", "y", "z", "w"] {
            builder.vertex(token);
        }
        let report = analyze(&builder.build());
        assert_eq!(report.num_edges, 0);
        assert_eq!(report.weak_components, 4);
        assert_eq!(report.strong_components, 4);
    }

    #[test]
    fn labels_agree_with_histogram() {
        // two cycles joined one way, plus a separate pair
        let g = graph(&[
            ("a", "b"),
            ("b", "a"),
            ("c", "d"),
            ("d", "c"),
            ("b", "c"),
            ("e", "f"),
        ]);
        let weak = label_components(&g, ComponentMode::Weak);
        let strong = label_components(&g, ComponentMode::Strong);

        assert_eq!(weak.count(), 2);
        assert_eq!(strong.count(), 4);
        assert_eq!(weak.largest(), 4);
        for labels in [&weak, &strong] {
            let mut sizes = vec![0; labels.count()];
            for &l in &labels.labels {
                sizes[l] += 1;
            }
            assert_eq!(sizes, labels.histogram);
        }
        assert_eq!(strong.labels[0], strong.labels[1]);
        assert_ne!(strong.labels[1], strong.labels[2]);
        assert_eq!(weak.labels[0], weak.labels[3]);
        assert_ne!(weak.labels[0], weak.labels[4]);
    }

    #[test]
    fn report_from_labels_matches_analyze() {
        let g = graph(&[("a", "b"), ("b", "a"), ("b", "c"), ("d", "e")]);
        let weak = label_components(&g, ComponentMode::Weak);
        let strong = label_components(&g, ComponentMode::Strong);
        let report = ConnectivityReport::from_labels(&g, &weak, &strong);
        assert_eq!(report, analyze(&g));
        assert_eq!(report.weak_components, 2);
        assert_eq!(report.strong_components, 4);
    }

    #[test]
    fn report_prints_four_lines() {
        let report = analyze(&graph(&[("a", "b"), ("b", "c")]));
        assert_eq!(report.to_string(), "2\n3\n# wcc: 1\n# scc: 3");
    }
}
