//! `State` holds the full population vector for a `FlatModel`: one
//! entry per (compartment, species) pair that is actually active
//! (referenced by a reaction or a connection in that compartment).
//! Reservoir compartments contribute no entries since their
//! concentrations are prescribed, not evolved.

use std::collections::BTreeMap;

use crate::compartment::Kind;
use crate::error::{Result, RxnError};
use crate::model::FlatModel;
use crate::units::{Dimension, Quantity};

/// One (compartment, species) row of tabular state data, used by
/// `State::to_rows`/`from_rows` for serialization without a dataframe
/// dependency. Derives `serde::{Serialize, Deserialize}` so callers can
/// plug in whatever on-disk format they like (CSV, JSON, ...).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StateRow {
    pub compartment: String,
    pub species: String,
    pub q: f64,
    pub x_pos: f64,
    pub y_pos: f64,
    pub z_pos: f64,
}

/// The population vector for a flattened model, plus the bookkeeping
/// needed to find a given (compartment, species) position in it.
#[derive(Debug, Clone, Default)]
pub struct State {
    /// `index[compartment_flat_id][species_id]` -> position in `q`.
    pub index: BTreeMap<String, BTreeMap<String, usize>>,
    pub species: Vec<String>,
    pub compartment: Vec<String>,
    pub x_pos: Vec<f64>,
    pub y_pos: Vec<f64>,
    pub z_pos: Vec<f64>,
    pub q: Vec<f64>,
}

impl State {
    /// Builds an index over every (compartment, species) pair that is
    /// active: referenced either by a reaction or by an outgoing
    /// connection in that compartment. Initial populations are zero.
    pub fn from_flat_model(model: &FlatModel) -> Self {
        let mut state = State::default();
        let mut running_index = 0usize;

        for (c_tag, c) in &model.compartments {
            let mut active = std::collections::BTreeSet::new();
            for conn in c.connections.values() {
                for s in conn.species() {
                    active.insert(s.to_string());
                }
            }
            for r in c.reactions() {
                for s in r.reactant_ids() {
                    active.insert(s.to_string());
                }
                for s in r.product_ids() {
                    active.insert(s.to_string());
                }
            }

            let mut comp_index = BTreeMap::new();
            let center = c.extent.center();
            let x = center.first().copied().unwrap_or(0.0);
            let y = center.get(1).copied().unwrap_or(0.0);
            let z = center.get(2).copied().unwrap_or(0.0);

            for s in &active {
                comp_index.insert(s.clone(), running_index);
                state.species.push(s.clone());
                state.compartment.push(c_tag.clone());
                state.x_pos.push(x);
                state.y_pos.push(y);
                state.z_pos.push(z);
                running_index += 1;
            }
            state.index.insert(c_tag.clone(), comp_index);
        }

        state.q = vec![0.0; running_index];
        state
    }

    pub fn size(&self) -> usize {
        self.q.len()
    }

    /// The state position for `(compartment, species)`, if active
    /// there.
    pub fn position(&self, compartment: &str, species: &str) -> Option<usize> {
        self.index.get(compartment)?.get(species).copied()
    }

    pub fn to_rows(&self) -> Vec<StateRow> {
        (0..self.size())
            .map(|i| StateRow {
                compartment: self.compartment[i].clone(),
                species: self.species[i].clone(),
                q: self.q[i],
                x_pos: self.x_pos[i],
                y_pos: self.y_pos[i],
                z_pos: self.z_pos[i],
            })
            .collect()
    }

    pub fn from_rows(rows: Vec<StateRow>) -> Self {
        let mut state = State::default();
        for (i, row) in rows.into_iter().enumerate() {
            state
                .index
                .entry(row.compartment.clone())
                .or_default()
                .insert(row.species.clone(), i);
            state.compartment.push(row.compartment);
            state.species.push(row.species);
            state.q.push(row.q);
            state.x_pos.push(row.x_pos);
            state.y_pos.push(row.y_pos);
            state.z_pos.push(row.z_pos);
        }
        state
    }

    /// Sets the raw molecule count at each of `idxs`.
    pub fn set_count(&mut self, idxs: &[usize], count: f64) {
        for &i in idxs {
            self.q[i] = count;
        }
    }

    /// Sets the population at each of `idxs` from a concentration,
    /// converting via the owning compartment's volume. Errors if any
    /// targeted compartment has no volume (e.g. a `Point` extent), or
    /// if `discrete` is set: a Gillespie system tracks raw molecule
    /// counts, so a concentration quantity has no well-defined meaning
    /// there and must go through `set_count` instead.
    pub fn set_concentration(
        &mut self,
        idxs: &[usize],
        conc: Quantity,
        model: &FlatModel,
        discrete: bool,
    ) -> Result<()> {
        if discrete {
            return Err(RxnError::ConcentrationInDiscreteSystem);
        }
        let density = conc.into_canonical(Dimension::CONCENTRATION)?;
        for &i in idxs {
            let comp_id = &self.compartment[i];
            let comp = &model.compartments[comp_id];
            let volume = comp.volume().ok_or(RxnError::MissingVolume)?;
            self.q[i] = density * volume;
        }
        Ok(())
    }

    /// True if `compartment` is a reservoir in `model` (and therefore
    /// contributes no entries to this state).
    pub fn is_reservoir(model: &FlatModel, compartment: &str) -> bool {
        matches!(model.compartments.get(compartment).map(|c| &c.kind), Some(Kind::Reservoir { .. }))
    }
}
