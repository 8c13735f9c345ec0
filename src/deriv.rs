//! Builds, for every state position, the list of source/sink terms
//! that make up its ODE derivative. Each term is `(prefactor, [state
//! indices to multiply])`; the sum over sources minus the sum over
//! sinks (prefactors already carry their sign) gives `dq[i]/dt`.
//!
//! Rate constants are assumed already canonical (number-density
//! based, not molar) by the time they reach this module; see
//! `crate::units`.

use crate::compartment::{ConcSource, Kind};
use crate::error::{Result, RxnError};
use crate::model::FlatModel;
use crate::state::State;

/// One term of a derivative: a constant prefactor (already signed, and
/// already volume-scaled if needed) multiplied by the product of the
/// named state positions.
#[derive(Debug, Clone)]
pub struct Term {
    pub prefactor: f64,
    pub q_indices: Vec<usize>,
}

/// A term sourced from a reservoir's externally prescribed
/// concentration rather than from the state vector.
#[derive(Debug, Clone)]
pub struct ReservoirTerm {
    pub prefactor: f64,
    pub source: ConcSource,
}

/// The full set of terms governing one state position's derivative.
#[derive(Debug, Clone, Default)]
pub struct DerivTerms {
    terms: Vec<Term>,
    reservoir_terms: Vec<ReservoirTerm>,
}

impl DerivTerms {
    pub fn eval(&self, q: &[f64], t: f64) -> f64 {
        let mut dqdt = 0.0;
        for term in &self.terms {
            let mut product = term.prefactor;
            for &idx in &term.q_indices {
                product *= q[idx];
            }
            dqdt += product;
        }
        for term in &self.reservoir_terms {
            dqdt += term.prefactor * term.source.conc(t);
        }
        dqdt
    }
}

/// Volume scaling factor for a reaction of the given order: `1` for
/// zeroth/first order, `volume^(order - 1)` otherwise. Requires a
/// defined volume whenever `order > 1`.
fn volume_factor(order: u32, volume: Option<f64>) -> Result<f64> {
    if order <= 1 {
        return Ok(1.0);
    }
    let v = volume.ok_or(RxnError::MissingVolume)?;
    Ok(v.powi(order as i32 - 1))
}

/// Builds one `DerivTerms` per position in `state`, in index order.
pub fn build_deriv_terms(model: &FlatModel, state: &State) -> Result<Vec<DerivTerms>> {
    let mut out = Vec::with_capacity(state.size());

    for i in 0..state.size() {
        let c_tag = &state.compartment[i];
        let s = &state.species[i];
        let c = &model.compartments[c_tag];

        let mut terms = DerivTerms::default();

        for r in c.reactions() {
            if let Some(s_idx) = r.reactant_ids().position(|x| x == s) {
                if r.kf > 0.0 {
                    let mut q_list = Vec::new();
                    let mut n_r = 0u32;
                    for (j, x) in r.reactants.iter().enumerate() {
                        let idx = state.position(c_tag, &x.id).ok_or_else(|| RxnError::InactiveStateReference {
                            compartment: c_tag.clone(),
                            species: x.id.clone(),
                        })?;
                        for _ in 0..r.stoich_r[j] {
                            q_list.push(idx);
                        }
                        n_r += r.stoich_r[j];
                    }
                    let rate = r.kf / volume_factor(n_r, c.volume())?;
                    terms.terms.push(Term { prefactor: -rate * r.stoich_r[s_idx] as f64, q_indices: q_list });
                }
                if r.kr > 0.0 {
                    let mut q_list = Vec::new();
                    let mut n_p = 0u32;
                    for (j, x) in r.products.iter().enumerate() {
                        let idx = state.position(c_tag, &x.id).ok_or_else(|| RxnError::InactiveStateReference {
                            compartment: c_tag.clone(),
                            species: x.id.clone(),
                        })?;
                        for _ in 0..r.stoich_p[j] {
                            q_list.push(idx);
                        }
                        n_p += r.stoich_p[j];
                    }
                    let rate = r.kr / volume_factor(n_p, c.volume())?;
                    terms.terms.push(Term { prefactor: rate * r.stoich_r[s_idx] as f64, q_indices: q_list });
                }
            }

            if let Some(s_idx) = r.product_ids().position(|x| x == s) {
                if r.kf > 0.0 {
                    let mut q_list = Vec::new();
                    let mut n_r = 0u32;
                    for (j, x) in r.reactants.iter().enumerate() {
                        let idx = state.position(c_tag, &x.id).ok_or_else(|| RxnError::InactiveStateReference {
                            compartment: c_tag.clone(),
                            species: x.id.clone(),
                        })?;
                        for _ in 0..r.stoich_r[j] {
                            q_list.push(idx);
                        }
                        n_r += r.stoich_r[j];
                    }
                    let rate = r.kf / volume_factor(n_r, c.volume())?;
                    terms.terms.push(Term { prefactor: rate * r.stoich_p[s_idx] as f64, q_indices: q_list });
                }
                if r.kr > 0.0 {
                    let mut q_list = Vec::new();
                    let mut n_p = 0u32;
                    for (j, x) in r.products.iter().enumerate() {
                        let idx = state.position(c_tag, &x.id).ok_or_else(|| RxnError::InactiveStateReference {
                            compartment: c_tag.clone(),
                            species: x.id.clone(),
                        })?;
                        for _ in 0..r.stoich_p[j] {
                            q_list.push(idx);
                        }
                        n_p += r.stoich_p[j];
                    }
                    let rate = r.kr / volume_factor(n_p, c.volume())?;
                    terms.terms.push(Term { prefactor: -rate * r.stoich_p[s_idx] as f64, q_indices: q_list });
                }
            }
        }

        for (other_tag, conn) in &c.connections {
            let Some((k_out, k_in)) = conn.rate_pair(s) else { continue };

            let out_rate = if conn.is_div_by_v() { k_out / c.volume().ok_or(RxnError::MissingVolume)? } else { k_out };
            terms.terms.push(Term { prefactor: -out_rate, q_indices: vec![i] });

            let other = &model.compartments[other_tag];
            match &other.kind {
                Kind::Reservoir { conc_sources } => {
                    if let Some(source) = conc_sources.get(s) {
                        terms.reservoir_terms.push(ReservoirTerm { prefactor: k_in, source: source.clone() });
                    }
                }
                Kind::Normal => {
                    let other_idx = state.position(other_tag, s).ok_or_else(|| RxnError::InactiveStateReference {
                        compartment: other_tag.clone(),
                        species: s.clone(),
                    })?;
                    let in_rate = if conn.is_div_by_v() {
                        k_in / other.volume().ok_or(RxnError::MissingVolume)?
                    } else {
                        k_in
                    };
                    terms.terms.push(Term { prefactor: in_rate, q_indices: vec![other_idx] });
                }
            }
        }

        out.push(terms);
    }

    Ok(out)
}

/// Evaluates every derivative term against `q` at time `t`.
pub fn eval_all(terms: &[DerivTerms], q: &[f64], t: f64) -> Vec<f64> {
    terms.iter().map(|t_i| t_i.eval(q, t)).collect()
}
