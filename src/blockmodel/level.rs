use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::state::{BlockState, Entropy, LevelGraph};
use super::{FitConfig, FitEvent};

/// Improvements smaller than this are treated as noise.
const EPSILON: f64 = 1e-9;

/// Best partition found for one level.
#[derive(Debug, Clone)]
pub(crate) struct LevelFit {
    pub(crate) assignment: Vec<usize>,
    pub(crate) blocks: usize,
    pub(crate) description_length: f64,
    /// Part of `description_length` that stands in for the level above.
    pub(crate) edge_count_cost: f64,
}

pub(crate) struct LevelContext<'a> {
    pub(crate) config: &'a FitConfig,
    pub(crate) restart: usize,
    pub(crate) level: usize,
}

/// Agglomerative search from singleton blocks down to a single block,
/// keeping the shortest description that actually merged something.
pub(crate) fn fit_level(graph: &LevelGraph, entropy: Entropy, ctx: &LevelContext<'_>, rng: &mut StdRng) -> LevelFit {
    let n = graph.num_nodes();
    let mut assignment: Vec<usize> = (0..n).collect();
    let mut blocks = n;

    if n <= 1 {
        let state = BlockState::new(graph, entropy, assignment.clone(), n.max(1));
        return LevelFit {
            assignment,
            blocks: n,
            description_length: state.description_length(),
            edge_count_cost: state.edge_count_cost(),
        };
    }

    let mut best: Option<LevelFit> = None;
    while blocks > 1 {
        let mut state = BlockState::new(graph, entropy, assignment, blocks);
        let target = shrink_target(blocks, ctx.config.merge_ratio);

        merge_round(&mut state, target, ctx.config.merge_candidates, rng);
        sweep(&mut state, ctx.config.sweeps, rng);

        let description_length = state.description_length();
        let edge_count_cost = state.edge_count_cost();
        (assignment, blocks) = state.compact();

        ctx.config.emit(FitEvent::Round {
            restart: ctx.restart,
            level: ctx.level,
            blocks,
            description_length,
        });

        if best
            .as_ref()
            .is_none_or(|b| description_length < b.description_length - EPSILON)
        {
            best = Some(LevelFit {
                assignment: assignment.clone(),
                blocks,
                description_length,
                edge_count_cost,
            });
        }
    }

    // n > 1 guarantees at least one round ran
    best.unwrap_or(LevelFit {
        assignment,
        blocks,
        description_length: f64::INFINITY,
        edge_count_cost: 0.0,
    })
}

fn shrink_target(blocks: usize, ratio: f64) -> usize {
    let target = (blocks as f64 / ratio).floor() as usize;
    target.clamp(1, blocks - 1)
}

/// Picks a block for `v` to join: usually one of its neighbours' blocks,
/// otherwise any other block.
fn propose_block(state: &BlockState<'_>, graph: &LevelGraph, v: usize, rng: &mut StdRng) -> usize {
    let current = state.assignment[v];
    let degree = graph.degree(v);
    if degree > 0 {
        let u = graph.neighbour(v, rng.gen_range(0..degree));
        let s = state.assignment[u];
        if s != current {
            return s;
        }
    }
    let u = rng.gen_range(0..state.assignment.len());
    state.assignment[u]
}

fn merge_round(state: &mut BlockState<'_>, target: usize, candidates: usize, rng: &mut StdRng) {
    let members = state.members();
    let slots = state.slots();
    let graph = state.graph();

    let mut proposals: Vec<(f64, usize, usize)> = Vec::with_capacity(slots);
    for r in 0..slots {
        if members[r].is_empty() {
            continue;
        }
        let mut best: Option<(f64, usize)> = None;
        for _ in 0..candidates.max(1) {
            let v = *members[r].choose(rng).unwrap_or(&members[r][0]);
            let mut s = propose_block(state, graph, v, rng);
            if s == r {
                // any other slot; every slot is occupied at the start of a round
                s = rng.gen_range(0..slots - 1);
                if s >= r {
                    s += 1;
                }
            }
            let delta = state.merge_delta(r, s, &members[r]);
            if best.is_none_or(|(d, _)| delta < d) {
                best = Some((delta, s));
            }
        }
        if let Some((delta, s)) = best {
            proposals.push((delta, r, s));
        }
    }
    proposals.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut merged_into: Vec<usize> = (0..slots).collect();
    let mut members = members;
    for (_, r, s) in proposals {
        if state.occupied() <= target {
            break;
        }
        let r = resolve(&mut merged_into, r);
        let s = resolve(&mut merged_into, s);
        if r == s {
            continue;
        }
        let moving = std::mem::take(&mut members[r]);
        for &v in &moving {
            state.move_node(v, s);
        }
        members[s].extend(moving);
        merged_into[r] = s;
    }
}

fn resolve(merged_into: &mut [usize], mut r: usize) -> usize {
    while merged_into[r] != r {
        merged_into[r] = merged_into[merged_into[r]];
        r = merged_into[r];
    }
    r
}

/// Greedy single-node moves until a sweep changes nothing.
fn sweep(state: &mut BlockState<'_>, sweeps: usize, rng: &mut StdRng) {
    let graph = state.graph();
    let mut order: Vec<usize> = (0..state.assignment.len()).collect();
    for _ in 0..sweeps {
        order.shuffle(rng);
        let mut moved = 0usize;
        for &v in &order {
            let s = propose_block(state, graph, v, rng);
            if s == state.assignment[v] {
                continue;
            }
            if state.move_delta(v, s) < -EPSILON {
                state.move_node(v, s);
                moved += 1;
            }
        }
        if moved == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use rand::SeedableRng;

    fn context(config: &FitConfig) -> LevelContext<'_> {
        LevelContext {
            config,
            restart: 0,
            level: 0,
        }
    }

    #[test]
    fn shrink_target_always_makes_progress() {
        assert_eq!(shrink_target(2, 1.3), 1);
        assert_eq!(shrink_target(3, 1.3), 2);
        assert_eq!(shrink_target(100, 2.0), 50);
        assert_eq!(shrink_target(5, 1.01), 4);
    }

    #[test]
    fn single_node_level_is_trivial() {
        let g: Graph = [("a", "a")].into_iter().collect();
        let level = LevelGraph::from_graph(&g);
        let config = FitConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let fit = fit_level(&level, Entropy::DegreeCorrected, &context(&config), &mut rng);
        assert_eq!(fit.assignment, vec![0]);
        assert_eq!(fit.blocks, 1);
    }

    #[test]
    fn level_fit_always_merges_something() {
        let g: Graph = [("a", "b"), ("c", "d")].into_iter().collect();
        let level = LevelGraph::from_graph(&g);
        let config = FitConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        let fit = fit_level(&level, Entropy::Multigraph, &context(&config), &mut rng);
        assert!(fit.blocks < 4);
        assert!(fit.assignment.iter().all(|&b| b < fit.blocks));
    }
}
