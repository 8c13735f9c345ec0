//! A spatially-resolved chemical reaction network simulator.
//!
//! Compartments (point, linear, planar or volumetric regions) hold
//! reactions and are wired together by connections that carry
//! first-order transport. A `Model` is assembled from standalone
//! compartments and regular arrays of compartments, then `flatten()`ed
//! into a single-namespace `FlatModel` with every transport edge
//! resolved to a concrete rate. From there, a `State` indexes the
//! active (compartment, species) population vector, and either the
//! `OdeSimulation` (deterministic, continuous) or `GillespieSimulation`
//! (exact stochastic, discrete) backend advances it in time, firing
//! `Reporter`s at scheduled checkpoints.

pub mod array;
pub mod compartment;
pub mod connection;
pub mod deriv;
pub mod error;
pub mod gillespie;
pub mod model;
pub mod reaction;
pub mod reporters;
pub mod species;
pub mod state;
pub mod system;
#[cfg(test)]
mod tests;
pub mod units;

pub use compartment::{Compartment, ConcSource, Extent, Kind};
pub use connection::Connection;
pub use error::{Result, RxnError};
pub use model::{FlatModel, Model};
pub use reaction::Reaction;
pub use reporters::{
    AllReporter, AvgReporter, MaxReporter, MinReporter, Reporter, SelectionReporter, SumReporter,
};
pub use species::Species;
pub use state::State;
pub use system::{GillespieSimulation, OdeSimulation};
pub use units::{Dimension, Quantity};
