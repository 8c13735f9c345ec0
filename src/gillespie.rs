//! Exact stochastic simulation (Gillespie's direct method) over a flat
//! set of discrete processes, each with a constant propensity between
//! reaction firings.
//!
//! Grounded on the teacher crate's `ChoiceTree`/`Gillespie` pair: a
//! binary-indexed propensity tree gives O(log n) updates and sampling,
//! and a reactant -> dependent-process index limits how many
//! propensities must be recomputed after each firing.

use rand::Rng;
use rand_distr::{Distribution, Exp};

use crate::compartment::{ConcSource, Kind};
use crate::error::Result;
use crate::model::FlatModel;
use crate::state::State;

/// A binary-indexed-tree-like data structure for storing process
/// propensities and sampling the next process to fire with them.
#[derive(Debug, Clone)]
struct ChoiceTree {
    data: Vec<f64>,
    alloc_size: usize,
    size: usize,
}

impl ChoiceTree {
    fn empty(size: usize) -> ChoiceTree {
        let alloc_size = size.max(1).next_power_of_two();
        ChoiceTree { data: vec![0.0; alloc_size * 2 - 1], size, alloc_size }
    }

    fn len(&self) -> usize {
        self.size
    }

    fn update(&mut self, idx: usize, value: f64) {
        debug_assert!(value >= 0.0, "a process propensity cannot be negative: {value}");
        debug_assert!((0..self.len()).contains(&idx), "attempted to set an empty index: {idx}");
        let old_val = self.data[self.alloc_size + idx - 1];
        let mut mapped_index = idx + self.alloc_size;
        while mapped_index > 0 {
            self.data[mapped_index - 1] += value - old_val;
            mapped_index /= 2;
        }
    }

    fn total(&self) -> f64 {
        self.data[0]
    }
}

impl Distribution<usize> for ChoiceTree {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let mut idx = 1;
        let mut choice = rng.random::<f64>() * self.data[0];
        while idx * 2 < self.data.len() {
            if choice < self.data[2 * idx] {
                idx = 2 * idx + 1;
            } else {
                choice -= self.data[2 * idx];
                idx = 2 * idx;
            }
        }
        idx - self.alloc_size
    }
}

/// A falling-factorial multiplicity: `count` copies of state position
/// `index` are multiplied into this process's propensity as
/// `Q*(Q-1)*...*(Q-count+1)`, the discrete analogue of `Q^count` that
/// correctly accounts for a reaction consuming more than one molecule
/// of the same species.
#[derive(Debug, Clone, Copy)]
pub struct Multiplicity {
    pub index: usize,
    pub count: u32,
}

/// One discrete process: firing it changes the state by `deltas` at a
/// rate given by `rate * falling_factorial_product(multiplicities)`.
#[derive(Debug, Clone)]
pub struct Process {
    pub rate: f64,
    pub multiplicities: Vec<Multiplicity>,
    pub deltas: Vec<(usize, i64)>,
}

impl Process {
    fn propensity(&self, state: &[i64]) -> f64 {
        let mut product = self.rate;
        for m in &self.multiplicities {
            let q = state[m.index];
            for k in 0..m.count as i64 {
                product *= (q - k).max(0) as f64;
            }
        }
        product
    }
}

/// Builds the process table for every reaction (forward and reverse)
/// and every resolved transport edge in `model`, indexed consistently
/// with `state`.
pub fn build_processes(model: &FlatModel, state: &State) -> Result<Vec<Process>> {
    let mut processes = Vec::new();

    for (c_tag, c) in &model.compartments {
        for r in c.reactions() {
            let volume_factor = |order: u32| -> Result<f64> {
                if order <= 1 {
                    return Ok(1.0);
                }
                let v = c.volume().ok_or(crate::error::RxnError::MissingVolume)?;
                Ok(v.powi(order as i32 - 1))
            };

            if r.kf > 0.0 {
                let mut multiplicities = Vec::new();
                let mut deltas = Vec::new();
                let mut n_r = 0u32;
                for (j, x) in r.reactants.iter().enumerate() {
                    let idx = state.position(c_tag, &x.id).unwrap();
                    multiplicities.push(Multiplicity { index: idx, count: r.stoich_r[j] });
                    deltas.push((idx, -(r.stoich_r[j] as i64)));
                    n_r += r.stoich_r[j];
                }
                for (j, x) in r.products.iter().enumerate() {
                    let idx = state.position(c_tag, &x.id).unwrap();
                    deltas.push((idx, r.stoich_p[j] as i64));
                }
                processes.push(Process { rate: r.kf / volume_factor(n_r)?, multiplicities, deltas });
            }

            if r.kr > 0.0 {
                let mut multiplicities = Vec::new();
                let mut deltas = Vec::new();
                let mut n_p = 0u32;
                for (j, x) in r.reactants.iter().enumerate() {
                    let idx = state.position(c_tag, &x.id).unwrap();
                    deltas.push((idx, r.stoich_r[j] as i64));
                }
                for (j, x) in r.products.iter().enumerate() {
                    let idx = state.position(c_tag, &x.id).unwrap();
                    multiplicities.push(Multiplicity { index: idx, count: r.stoich_p[j] });
                    deltas.push((idx, -(r.stoich_p[j] as i64)));
                    n_p += r.stoich_p[j];
                }
                processes.push(Process { rate: r.kr / volume_factor(n_p)?, multiplicities, deltas });
            }
        }

        for (other_tag, conn) in &c.connections {
            for s in conn.species() {
                let Some((k_out, _)) = conn.rate_pair(s) else { continue };
                let idx = match state.position(c_tag, s) {
                    Some(i) => i,
                    None => continue,
                };
                let rate = if conn.is_div_by_v() { k_out / c.volume().ok_or(crate::error::RxnError::MissingVolume)? } else { k_out };

                let other = &model.compartments[other_tag];
                match &other.kind {
                    Kind::Reservoir { .. } => continue,
                    Kind::Normal => {
                        let other_idx = state.position(other_tag, s).ok_or_else(|| {
                            crate::error::RxnError::InactiveStateReference {
                                compartment: other_tag.clone(),
                                species: s.to_string(),
                            }
                        })?;
                        processes.push(Process {
                            rate,
                            multiplicities: vec![Multiplicity { index: idx, count: 1 }],
                            deltas: vec![(idx, -1), (other_idx, 1)],
                        });
                    }
                }
            }
        }
    }

    Ok(processes)
}

/// A process whose rate arrives entirely from a reservoir's
/// prescribed concentration, frozen at the start of the `advance()`
/// interval (propensities are assumed constant between firings, so a
/// genuinely time-varying reservoir can only be approximated this
/// way inside one exact-SSA interval).
#[derive(Debug, Clone)]
pub struct ReservoirProcess {
    pub prefactor: f64,
    pub source: ConcSource,
    pub deltas: Vec<(usize, i64)>,
}

/// Builds the reservoir-sourced birth processes separately, since
/// their rate depends on wall-clock time rather than the state vector.
pub fn build_reservoir_processes(model: &FlatModel, state: &State) -> Vec<ReservoirProcess> {
    let mut out = Vec::new();
    for (c_tag, c) in &model.compartments {
        for (other_tag, conn) in &c.connections {
            let other = &model.compartments[other_tag];
            let Kind::Reservoir { conc_sources } = &other.kind else { continue };
            for s in conn.species() {
                let Some(source) = conc_sources.get(s) else { continue };
                let Some((_, k_in)) = conn.rate_pair(s) else { continue };
                let idx = match state.position(c_tag, s) {
                    Some(i) => i,
                    None => continue,
                };
                out.push(ReservoirProcess { prefactor: k_in, source: source.clone(), deltas: vec![(idx, 1)] });
            }
        }
    }
    out
}

/// Runs the exact stochastic simulation algorithm over a fixed process
/// table, advancing molecule counts in place.
pub struct Engine {
    processes: Vec<Process>,
    dependents: Vec<Vec<usize>>,
    tree: ChoiceTree,
    state: Vec<i64>,
    total_reactions: u64,
}

impl Engine {
    pub fn new(processes: Vec<Process>, initial_state: Vec<i64>) -> Self {
        let n_positions = initial_state.len();
        let mut position_to_processes: Vec<Vec<usize>> = vec![Vec::new(); n_positions];
        for (p_idx, p) in processes.iter().enumerate() {
            for m in &p.multiplicities {
                position_to_processes[m.index].push(p_idx);
            }
        }

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); processes.len()];
        for (p_idx, p) in processes.iter().enumerate() {
            for (delta_idx, _) in &p.deltas {
                dependents[p_idx].extend(position_to_processes[*delta_idx].iter().copied());
            }
            dependents[p_idx].sort_unstable();
            dependents[p_idx].dedup();
        }

        let mut tree = ChoiceTree::empty(processes.len());
        for (idx, p) in processes.iter().enumerate() {
            tree.update(idx, p.propensity(&initial_state));
        }

        Engine { processes, dependents, tree, state: initial_state, total_reactions: 0 }
    }

    pub fn state(&self) -> &[i64] {
        &self.state
    }

    pub fn total_reactions(&self) -> u64 {
        self.total_reactions
    }

    /// Samples and applies one reaction firing, returning the amount of
    /// time elapsed (capped at `max_time` when no reaction fires
    /// within the interval).
    pub fn sample_reaction(&mut self, max_time: f64, rng: &mut impl Rng) -> f64 {
        let total = self.tree.total();
        if total <= 1e-12 {
            return max_time;
        }
        let dt = rng.sample(Exp::new(total).unwrap());
        if dt > max_time {
            return max_time;
        }

        let p_idx = self.tree.sample(rng);
        for &(idx, delta) in &self.processes[p_idx].deltas {
            self.state[idx] += delta;
        }
        for &dep in &self.dependents[p_idx] {
            self.tree.update(dep, self.processes[dep].propensity(&self.state));
        }
        self.total_reactions += 1;
        dt
    }

    pub fn advance(&mut self, mut time: f64, rng: &mut impl Rng) {
        while time > 0.0 {
            time -= self.sample_reaction(time, rng);
        }
    }
}
