use csv::WriterBuilder;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io;
use std::path::Path;

use crate::graph::{Graph, GraphBuilder};

#[derive(Debug, Clone)]
pub struct PriceConfig {
    pub nodes: usize,
    /// Out-edges added with every new vertex.
    pub edges_per_node: usize,
    pub seed: u64,
}

impl Default for PriceConfig {
    fn default() -> Self {
        PriceConfig {
            nodes: 300,
            edges_per_node: 1,
            seed: 0,
        }
    }
}

/// Directed Price network: each new vertex links to up to `edges_per_node`
/// distinct earlier vertices, picked with probability proportional to
/// in-degree + 1. Vertex tokens are their decimal ids.
pub fn price_network(config: &PriceConfig) -> Graph {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut builder = GraphBuilder::new();
    // every vertex appears once, plus once per received edge
    let mut urn: Vec<usize> = Vec::with_capacity(config.nodes * (config.edges_per_node + 1));
    let mut targets: Vec<usize> = Vec::with_capacity(config.edges_per_node);

    for v in 0..config.nodes {
        builder.vertex(&v.to_string());

        let wanted = config.edges_per_node.min(v);
        targets.clear();
        while targets.len() < wanted {
            let t = urn[rng.gen_range(0..urn.len())];
            if !targets.contains(&t) {
                targets.push(t);
            }
        }
        for &t in &targets {
            builder.add_edge(&v.to_string(), &t.to_string());
            urn.push(t);
        }
        urn.push(v);
    }
    builder.build()
}

/// Writes one `source<delimiter>target` line per edge.
pub fn write_edge_list(graph: &Graph, path: impl AsRef<Path>, delimiter: u8) -> io::Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_path(path)?;
    for (s, t) in graph.edges() {
        writer.write_record([graph.token(s), graph.token(t)])?;
    }
    writer.flush()
}
