use std::collections::{BTreeMap, HashMap};

use super::entropy::{ln_binom, ln_fact, ln_multiset, xlogx};
use crate::graph::Graph;

/// Adjacency entropy used for a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Entropy {
    /// Poisson degree-corrected SBM; vertex degrees are part of the model.
    DegreeCorrected,
    /// Microcanonical multigraph SBM without degree correction.
    Multigraph,
}

/// Weighted directed multigraph fitted at one level of the hierarchy.
#[derive(Debug, Clone)]
pub(crate) struct LevelGraph {
    /// `v -> [(u, w)]`, sorted by `u`.
    pub(crate) out: Vec<Vec<(usize, u64)>>,
    /// `v -> [(u, w)]` for `u -> v`, self-loops excluded, sorted by `u`.
    pub(crate) inc: Vec<Vec<(usize, u64)>>,
    pub(crate) k_out: Vec<u64>,
    pub(crate) k_in: Vec<u64>,
    pub(crate) total: u64,
    /// Partition independent part of the degree-corrected entropy.
    dc_constant: f64,
}

impl LevelGraph {
    pub(crate) fn from_graph(graph: &Graph) -> Self {
        Self::from_weighted(graph.num_vertices(), graph.edges().map(|(s, t)| (s, t, 1)))
    }

    fn from_weighted(n: usize, edges: impl Iterator<Item = (usize, usize, u64)>) -> Self {
        let mut rows: Vec<HashMap<usize, u64>> = vec![HashMap::new(); n];
        for (s, t, w) in edges {
            *rows[s].entry(t).or_insert(0) += w;
        }

        let mut out = vec![Vec::new(); n];
        let mut inc = vec![Vec::new(); n];
        let mut k_out = vec![0; n];
        let mut k_in = vec![0; n];
        let mut total = 0;
        let mut ln_multiplicity = 0.0;
        for (s, row) in rows.into_iter().enumerate() {
            for (t, w) in row {
                out[s].push((t, w));
                if s != t {
                    inc[t].push((s, w));
                }
                k_out[s] += w;
                k_in[t] += w;
                total += w;
                ln_multiplicity += ln_fact(w);
            }
        }
        for adj in out.iter_mut().chain(inc.iter_mut()) {
            adj.sort_unstable();
        }

        let degree_part: f64 = k_out.iter().chain(k_in.iter()).map(|&k| xlogx(k)).sum();
        let dc_constant = total as f64 + ln_multiplicity - degree_part;

        LevelGraph {
            out,
            inc,
            k_out,
            k_in,
            total,
            dc_constant,
        }
    }

    /// Graph whose vertices are the blocks of `partition`.
    pub(crate) fn block_graph(&self, partition: &[usize], blocks: usize) -> Self {
        let edges = self.out.iter().enumerate().flat_map(move |(s, adj)| {
            adj.iter()
                .map(move |&(t, w)| (partition[s], partition[t], w))
        });
        Self::from_weighted(blocks, edges)
    }

    pub(crate) fn num_nodes(&self) -> usize {
        self.out.len()
    }

    pub(crate) fn degree(&self, v: usize) -> usize {
        self.out[v].len() + self.inc[v].len()
    }

    /// The `i`-th neighbour of `v` ignoring direction, `i < degree(v)`.
    pub(crate) fn neighbour(&self, v: usize, i: usize) -> usize {
        let outs = &self.out[v];
        if i < outs.len() {
            outs[i].0
        } else {
            self.inc[v][i - outs.len()].0
        }
    }
}

/// Block assignment of one level with the sufficient statistics needed to
/// evaluate description length changes incrementally.
pub(crate) struct BlockState<'g> {
    graph: &'g LevelGraph,
    entropy: Entropy,
    pub(crate) assignment: Vec<usize>,
    rows: Vec<BTreeMap<usize, u64>>,
    cols: Vec<BTreeMap<usize, u64>>,
    size: Vec<u64>,
    e_out: Vec<u64>,
    e_in: Vec<u64>,
    occupied: usize,
}

impl<'g> BlockState<'g> {
    /// `assignment` must map into `0..slots`.
    pub(crate) fn new(graph: &'g LevelGraph, entropy: Entropy, assignment: Vec<usize>, slots: usize) -> Self {
        let mut state = BlockState {
            graph,
            entropy,
            rows: vec![BTreeMap::new(); slots],
            cols: vec![BTreeMap::new(); slots],
            size: vec![0; slots],
            e_out: vec![0; slots],
            e_in: vec![0; slots],
            occupied: 0,
            assignment,
        };
        for v in 0..graph.num_nodes() {
            let r = state.assignment[v];
            if state.size[r] == 0 {
                state.occupied += 1;
            }
            state.size[r] += 1;
            state.e_out[r] += graph.k_out[v];
            state.e_in[r] += graph.k_in[v];
            for &(u, w) in &graph.out[v] {
                let s = state.assignment[u];
                state.shift_entry(r, s, w as i64);
            }
        }
        state
    }

    pub(crate) fn graph(&self) -> &'g LevelGraph {
        self.graph
    }

    pub(crate) fn occupied(&self) -> usize {
        self.occupied
    }

    pub(crate) fn slots(&self) -> usize {
        self.size.len()
    }

    pub(crate) fn members(&self) -> Vec<Vec<usize>> {
        let mut members = vec![Vec::new(); self.slots()];
        for (v, &r) in self.assignment.iter().enumerate() {
            members[r].push(v);
        }
        members
    }

    fn shift_entry(&mut self, r: usize, s: usize, delta: i64) {
        let row = self.rows[r].entry(s).or_insert(0);
        *row = (*row as i64 + delta) as u64;
        if *row == 0 {
            self.rows[r].remove(&s);
            self.cols[s].remove(&r);
        } else {
            let value = *row;
            self.cols[s].insert(r, value);
        }
    }

    pub(crate) fn move_node(&mut self, v: usize, s: usize) {
        let r = self.assignment[v];
        if r == s {
            return;
        }
        let graph = self.graph;

        for &(u, w) in &graph.out[v] {
            let w = w as i64;
            if u == v {
                self.shift_entry(r, r, -w);
                self.shift_entry(s, s, w);
            } else {
                let t = self.assignment[u];
                self.shift_entry(r, t, -w);
                self.shift_entry(s, t, w);
            }
        }
        for &(u, w) in &graph.inc[v] {
            let w = w as i64;
            let t = self.assignment[u];
            self.shift_entry(t, r, -w);
            self.shift_entry(t, s, w);
        }

        self.e_out[r] -= graph.k_out[v];
        self.e_out[s] += graph.k_out[v];
        self.e_in[r] -= graph.k_in[v];
        self.e_in[s] += graph.k_in[v];
        self.size[r] -= 1;
        if self.size[r] == 0 {
            self.occupied -= 1;
        }
        if self.size[s] == 0 {
            self.occupied += 1;
        }
        self.size[s] += 1;
        self.assignment[v] = s;
    }

    fn entry_term(&self, r: usize, s: usize, e: u64) -> f64 {
        match self.entropy {
            Entropy::DegreeCorrected => -xlogx(e),
            Entropy::Multigraph => ln_multiset(self.size[r] * self.size[s], e),
        }
    }

    fn block_term(&self, r: usize) -> f64 {
        let n = self.size[r];
        let partition = -ln_fact(n);
        match self.entropy {
            Entropy::DegreeCorrected => {
                xlogx(self.e_out[r])
                    + xlogx(self.e_in[r])
                    + ln_multiset(n, self.e_out[r])
                    + ln_multiset(n, self.e_in[r])
                    + partition
            }
            Entropy::Multigraph => partition,
        }
    }

    /// Cost of the block graph when this level is fitted on its own.
    pub(crate) fn edge_count_cost(&self) -> f64 {
        let b = self.occupied as u64;
        ln_multiset(b * b, self.graph.total)
    }

    fn global_terms(&self) -> f64 {
        let n = self.graph.num_nodes() as u64;
        let b = self.occupied as u64;
        let mut dl = ln_binom(n - 1, b - 1) + ln_fact(n) + (n as f64).ln() + self.edge_count_cost();
        if self.entropy == Entropy::DegreeCorrected {
            dl += self.graph.dc_constant;
        }
        dl
    }

    /// Every term that involves at least one block in `blocks`.
    fn local_terms(&self, blocks: &[usize]) -> f64 {
        let mut dl = 0.0;
        for &r in blocks {
            dl += self.block_term(r);
            for (&s, &e) in &self.rows[r] {
                dl += self.entry_term(r, s, e);
            }
            for (&t, &e) in &self.cols[r] {
                if !blocks.contains(&t) {
                    dl += self.entry_term(t, r, e);
                }
            }
        }
        dl
    }

    pub(crate) fn description_length(&self) -> f64 {
        let mut dl = self.global_terms();
        for r in 0..self.slots() {
            if self.size[r] == 0 {
                continue;
            }
            dl += self.block_term(r);
            for (&s, &e) in &self.rows[r] {
                dl += self.entry_term(r, s, e);
            }
        }
        dl
    }

    /// Change in description length if `v` moved to block `s`.
    pub(crate) fn move_delta(&mut self, v: usize, s: usize) -> f64 {
        let r = self.assignment[v];
        if r == s {
            return 0.0;
        }
        let blocks = [r, s];
        let before = self.local_terms(&blocks) + self.global_terms();
        self.move_node(v, s);
        let after = self.local_terms(&blocks) + self.global_terms();
        self.move_node(v, r);
        after - before
    }

    /// Change in description length if every node of `r` joined `s`.
    pub(crate) fn merge_delta(&mut self, r: usize, s: usize, members_of_r: &[usize]) -> f64 {
        if r == s {
            return 0.0;
        }
        let blocks = [r, s];
        let before = self.local_terms(&blocks) + self.global_terms();
        for &v in members_of_r {
            self.move_node(v, s);
        }
        let after = self.local_terms(&blocks) + self.global_terms();
        for &v in members_of_r {
            self.move_node(v, r);
        }
        after - before
    }

    /// Assignment relabelled to `0..occupied` in order of first use.
    pub(crate) fn compact(&self) -> (Vec<usize>, usize) {
        let mut dense = vec![usize::MAX; self.slots()];
        let mut next = 0;
        let assignment = self
            .assignment
            .iter()
            .map(|&r| {
                if dense[r] == usize::MAX {
                    dense[r] = next;
                    next += 1;
                }
                dense[r]
            })
            .collect();
        (assignment, next)
    }
}
