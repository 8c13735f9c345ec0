//! Error taxonomy for model construction, flattening and compilation.
//!
//! Every error here is fatal at the call site: there is no silent
//! recovery path anywhere in this crate (spec taxonomy in the design
//! doc, section 7). Warnings that are not fatal are logged through
//! `log::warn!` at the point they occur instead of being represented
//! here.

use thiserror::Error;

use crate::units::Dimension;

/// All errors raised while building, flattening or compiling a model.
#[derive(Debug, Error)]
pub enum RxnError {
    /// A connection refers to a neighbor id that is absent from the
    /// flattened model.
    #[error("unknown neighbor id(s) referenced during flatten: {0:?}")]
    UnknownNeighbors(Vec<String>),

    #[error("duplicate compartment id: {0}")]
    DuplicateCompartment(String),

    #[error("duplicate array id: {0}")]
    DuplicateArray(String),

    #[error("periodic axis length mismatch: existing box length {existing}, incoming {incoming}")]
    PeriodicLengthMismatch { existing: f64, incoming: f64 },

    #[error("periodicity mismatch adding array to model: existing {existing:?}, incoming {incoming:?}")]
    PeriodicityMismatch { existing: Vec<bool>, incoming: Vec<bool> },

    #[error("array face shape mismatch on join: {0:?} vs {1:?}")]
    FaceShapeMismatch((usize, usize), (usize, usize)),

    #[error("unable to determine the adjoining face between compartments {0:?} and {1:?}")]
    UnresolvableAdjoiningFace(String, String),

    #[error("dimensional mismatch: expected {expected:?}, found {found:?}")]
    DimensionalMismatch { expected: Dimension, found: Dimension },

    #[error("a concentration quantity was supplied to a discrete (Gillespie) system")]
    ConcentrationInDiscreteSystem,

    #[error("Ficks connection cannot be resolved without surface area and center-to-center distance")]
    UnresolvedFicks,

    #[error("reaction rate constant is negative: {0}")]
    NegativeRate(f64),

    #[error("stoichiometry list length ({stoich_len}) does not match species list length ({species_len})")]
    StoichiometryLengthMismatch { species_len: usize, stoich_len: usize },

    #[error("species {0:?} is present in both the reservoir constant-concentration map and the time-function map")]
    DuplicateReservoirSpecies(String),

    #[error("reservoir compartment {0:?} cannot be assigned reactions")]
    ReservoirHasReactions(String),

    #[error("state position (compartment {compartment:?}, species {species:?}) has no index: the species is not active there")]
    InactiveStateReference { compartment: String, species: String },

    #[error("a compartment without a defined volume cannot participate in a rate term requiring volume scaling")]
    MissingVolume,

    #[error("the ODE integrator failed: {0}")]
    IntegratorFailure(String),

    #[error("malformed tabular row: {0}")]
    MalformedRow(String),
}

pub type Result<T> = std::result::Result<T, RxnError>;
