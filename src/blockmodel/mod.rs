//! Nested stochastic block model inference.
//!
//! The hierarchy is built bottom-up: vertices are grouped into blocks by
//! minimising the description length of a degree-corrected SBM, the block
//! graph is then grouped again with a multigraph SBM, and so on until a
//! single block remains. Independent restarts run on the rayon pool.

mod entropy;
mod level;
mod state;

use crossbeam_channel::Sender;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tracing::debug;

use crate::error::FitError;
use crate::graph::Graph;
use level::{LevelContext, fit_level};
use state::{Entropy, LevelGraph};

/// Progress reported while fitting.
#[derive(Debug, Clone, PartialEq)]
pub enum FitEvent {
    LevelStarted {
        restart: usize,
        level: usize,
        nodes: usize,
    },
    Round {
        restart: usize,
        level: usize,
        blocks: usize,
        description_length: f64,
    },
    LevelFinished {
        restart: usize,
        level: usize,
        blocks: usize,
    },
    RestartFinished {
        restart: usize,
        description_length: f64,
    },
}

#[derive(Debug, Clone)]
pub struct FitConfig {
    pub degree_corrected: bool,
    /// Each agglomeration round divides the block count by this.
    pub merge_ratio: f64,
    /// Merge proposals evaluated per block and round.
    pub merge_candidates: usize,
    /// Maximum node-move sweeps after each round.
    pub sweeps: usize,
    pub restarts: usize,
    /// Base seed; restart `i` uses `seed + i`. Random when unset.
    pub seed: Option<u64>,
    pub events: Option<Sender<FitEvent>>,
}

impl FitConfig {
    pub(crate) fn emit(&self, event: FitEvent) {
        if let Some(tx) = &self.events {
            // a dropped receiver only means nobody is listening
            let _ = tx.send(event);
        }
    }
}

impl Default for FitConfig {
    fn default() -> Self {
        FitConfig {
            degree_corrected: true,
            merge_ratio: 1.3,
            merge_candidates: 10,
            sweeps: 10,
            restarts: 4,
            seed: None,
            events: None,
        }
    }
}

/// Nested partition of a graph's vertices.
///
/// `levels[0]` maps vertices to blocks, `levels[l]` maps blocks of level
/// `l - 1` to blocks of level `l`. The last level has a single block.
#[derive(Debug, Clone, PartialEq)]
pub struct Hierarchy {
    pub levels: Vec<Vec<usize>>,
    pub description_length: f64,
}

impl Hierarchy {
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Number of blocks at `level`.
    pub fn blocks(&self, level: usize) -> usize {
        self.levels[level].iter().copied().max().map_or(0, |b| b + 1)
    }

    /// Block containing `vertex` at `level`.
    pub fn block_of(&self, vertex: usize, level: usize) -> usize {
        self.levels[..=level]
            .iter()
            .fold(vertex, |node, assignment| assignment[node])
    }
}

pub fn minimize_nested_blockmodel_dl(graph: &Graph, config: &FitConfig) -> Result<Hierarchy, FitError> {
    if graph.num_vertices() == 0 {
        return Err(FitError::EmptyGraph);
    }
    if !(config.merge_ratio > 1.0) {
        return Err(FitError::InvalidMergeRatio(config.merge_ratio));
    }

    let base = LevelGraph::from_graph(graph);
    let seed = config.seed.unwrap_or_else(rand::random);
    let restarts = config.restarts.max(1);
    debug!(seed, restarts, "fitting nested block model");

    let fits: Vec<Hierarchy> = (0..restarts)
        .into_par_iter()
        .map(|restart| fit_nested(&base, config, restart, seed.wrapping_add(restart as u64)))
        .collect();

    // strict comparison keeps the lowest restart index on ties
    let mut best: Option<Hierarchy> = None;
    for fit in fits {
        if best
            .as_ref()
            .is_none_or(|b| fit.description_length < b.description_length)
        {
            best = Some(fit);
        }
    }
    best.ok_or(FitError::EmptyGraph)
}

fn fit_nested(base: &LevelGraph, config: &FitConfig, restart: usize, seed: u64) -> Hierarchy {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut levels = Vec::new();
    let mut description_length = 0.0;
    let mut entropy = if config.degree_corrected {
        Entropy::DegreeCorrected
    } else {
        Entropy::Multigraph
    };

    let mut current = base.clone();
    loop {
        let ctx = LevelContext {
            config,
            restart,
            level: levels.len(),
        };
        config.emit(FitEvent::LevelStarted {
            restart,
            level: ctx.level,
            nodes: current.num_nodes(),
        });

        let fit = fit_level(&current, entropy, &ctx, &mut rng);
        config.emit(FitEvent::LevelFinished {
            restart,
            level: ctx.level,
            blocks: fit.blocks,
        });

        let done = fit.blocks <= 1;
        // the block graph cost is only a stand-in while upper levels exist
        description_length += if done {
            fit.description_length
        } else {
            fit.description_length - fit.edge_count_cost
        };
        if !done {
            current = current.block_graph(&fit.assignment, fit.blocks);
        }
        levels.push(fit.assignment);
        entropy = Entropy::Multigraph;
        if done {
            break;
        }
    }

    config.emit(FitEvent::RestartFinished {
        restart,
        description_length,
    });
    Hierarchy {
        levels,
        description_length,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(seed: u64) -> FitConfig {
        FitConfig {
            seed: Some(seed),
            restarts: 2,
            ..FitConfig::default()
        }
    }

    /// Two dense directed cliques joined by a single edge.
    fn planted() -> Graph {
        let mut edges = Vec::new();
        for group in ["a", "b"] {
            for i in 0..6 {
                for j in 0..6 {
                    if i != j {
                        edges.push((format!("{group}{i}"), format!("{group}{j}")));
                    }
                }
            }
        }
        edges.push(("a0".to_string(), "b0".to_string()));
        edges.into_iter().collect()
    }

    #[test]
    fn empty_graph_is_rejected() {
        let g = Graph::default();
        assert_eq!(
            minimize_nested_blockmodel_dl(&g, &FitConfig::default()),
            Err(FitError::EmptyGraph)
        );
    }

    #[test]
    fn merge_ratio_must_shrink() {
        let g: Graph = [("a", "b")].into_iter().collect();
        let cfg = FitConfig {
            merge_ratio: 1.0,
            ..config(1)
        };
        assert_eq!(
            minimize_nested_blockmodel_dl(&g, &cfg),
            Err(FitError::InvalidMergeRatio(1.0))
        );
    }

    #[test]
    fn hierarchy_ends_in_one_block_and_levels_are_dense() {
        let g = planted();
        let h = minimize_nested_blockmodel_dl(&g, &config(3)).unwrap();

        assert_eq!(h.blocks(h.depth() - 1), 1);
        assert_eq!(h.levels[0].len(), g.num_vertices());
        for l in 1..h.depth() {
            assert_eq!(h.levels[l].len(), h.blocks(l - 1));
        }
        for l in 0..h.depth() {
            let blocks = h.blocks(l);
            let mut used = vec![false; blocks];
            for &b in &h.levels[l] {
                used[b] = true;
            }
            assert!(used.into_iter().all(|u| u), "level {l} has an unused block");
        }
        assert!(h.description_length.is_finite());
    }

    #[test]
    fn planted_cliques_are_separated() {
        let g = planted();
        let h = minimize_nested_blockmodel_dl(&g, &config(11)).unwrap();
        let a0 = h.block_of(0, 0);
        let b0 = h.block_of(6, 0);
        assert_ne!(a0, b0);
        for v in 1..6 {
            assert_eq!(h.block_of(v, 0), a0);
            assert_eq!(h.block_of(v + 6, 0), b0);
        }
    }

    #[test]
    fn fixed_seed_is_deterministic() {
        let g = planted();
        let first = minimize_nested_blockmodel_dl(&g, &config(5)).unwrap();
        let second = minimize_nested_blockmodel_dl(&g, &config(5)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn progress_events_are_delivered() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let cfg = FitConfig {
            events: Some(tx),
            restarts: 1,
            ..config(2)
        };
        let g: Graph = [("a", "b"), ("b", "c"), ("c", "a")].into_iter().collect();
        let h = minimize_nested_blockmodel_dl(&g, &cfg).unwrap();
        drop(cfg);

        let events: Vec<FitEvent> = rx.iter().collect();
        assert!(matches!(
            events.first(),
            Some(FitEvent::LevelStarted { level: 0, nodes: 3, .. })
        ));
        assert!(matches!(
            events.last(),
            Some(FitEvent::RestartFinished { restart: 0, .. })
        ));
        let finished = events
            .iter()
            .filter(|e| matches!(e, FitEvent::LevelFinished { .. }))
            .count();
        assert_eq!(finished, h.depth());
    }
}
