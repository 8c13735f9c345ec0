//! Compartments hold a set of reactions and govern the transport of
//! material to neighboring compartments through connections.
//!
//! A compartment's spatial `Extent` is an explicit variant
//! (`Point`/`Linear`/`Planar`/`Volumetric`) rather than a duck-typed
//! `volume` attribute probed with `hasattr` — the flattener and both
//! simulation backends dispatch on it directly.

pub mod id;

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::sync::Arc;

pub use id::make_id;

use crate::connection::Connection;
use crate::error::{Result, RxnError};
use crate::reaction::Reaction;

/// The face of a volumetric compartment along which two compartments can
/// adjoin, used to look up the pre-tabulated face area for Ficks
/// resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FaceKey {
    Xy,
    Yz,
    Xz,
}

/// The spatial extent of a compartment. Carries the axis ranges that
/// apply to this compartment's dimensionality and, for volumetric
/// compartments, the pre-computed face areas used by Ficks resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Extent {
    /// No spatial extent: a well-mixed compartment with no implied
    /// volume (e.g. a reservoir, or a lumped "main" compartment).
    Point,
    Linear { x: (f64, f64) },
    Planar { x: (f64, f64), y: (f64, f64) },
    Volumetric { x: (f64, f64), y: (f64, f64), z: (f64, f64), surface_area: BTreeMap<FaceKey, f64> },
}

impl Extent {
    /// The measure of this extent: length, area, or volume, depending on
    /// dimensionality. `None` for `Point`.
    pub fn volume(&self) -> Option<f64> {
        match self {
            Extent::Point => None,
            Extent::Linear { x } => Some(x.1 - x.0),
            Extent::Planar { x, y } => Some((x.1 - x.0) * (y.1 - y.0)),
            Extent::Volumetric { x, y, z, .. } => Some((x.1 - x.0) * (y.1 - y.0) * (z.1 - z.0)),
        }
    }

    /// The spatial dimensionality (0, 1, 2 or 3) of this extent.
    pub fn spatial_dim(&self) -> u8 {
        match self {
            Extent::Point => 0,
            Extent::Linear { .. } => 1,
            Extent::Planar { .. } => 2,
            Extent::Volumetric { .. } => 3,
        }
    }

    /// Per-axis midpoints, one entry per axis this extent has (empty for
    /// `Point`).
    pub fn center(&self) -> Vec<f64> {
        match self {
            Extent::Point => vec![],
            Extent::Linear { x } => vec![0.5 * (x.0 + x.1)],
            Extent::Planar { x, y } => vec![0.5 * (x.0 + x.1), 0.5 * (y.0 + y.1)],
            Extent::Volumetric { x, y, z, .. } => {
                vec![0.5 * (x.0 + x.1), 0.5 * (y.0 + y.1), 0.5 * (z.0 + z.1)]
            }
        }
    }

    /// Per-axis `(lo, hi)` ranges, one entry per axis this extent has.
    pub fn ranges(&self) -> Vec<(f64, f64)> {
        match self {
            Extent::Point => vec![],
            Extent::Linear { x } => vec![*x],
            Extent::Planar { x, y } => vec![*x, *y],
            Extent::Volumetric { x, y, z, .. } => vec![*x, *y, *z],
        }
    }
}

/// The concentration of a reservoir species, either held constant or
/// driven by an externally supplied function of time. Replaces the
/// source's pattern of capturing one closure per species at construction
/// time with a tagged variant that the simulation core does not need to
/// special-case at every call site.
#[derive(Clone)]
pub enum ConcSource {
    Constant(f64),
    TimeFn(Arc<dyn Fn(f64) -> f64 + Send + Sync>),
}

impl ConcSource {
    pub fn conc(&self, t: f64) -> f64 {
        match self {
            ConcSource::Constant(v) => *v,
            ConcSource::TimeFn(f) => f(t),
        }
    }
}

impl std::fmt::Debug for ConcSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConcSource::Constant(v) => write!(f, "ConcSource::Constant({v})"),
            ConcSource::TimeFn(_) => write!(f, "ConcSource::TimeFn(<fn>)"),
        }
    }
}

/// Whether a compartment is a normal well-mixed region (with reactions
/// and an evolved population) or a reservoir (externally prescribed
/// concentrations, no reactions, no evolved state).
#[derive(Debug, Clone, Default)]
pub enum Kind {
    #[default]
    Normal,
    Reservoir { conc_sources: BTreeMap<String, ConcSource> },
}

/// A well-mixed spatial region. Compartments accumulate reactions and
/// outgoing connections during model construction; after
/// `Model::flatten()` they are copied into a `FlatModel` and must not be
/// mutated further.
#[derive(Debug, Clone)]
pub struct Compartment {
    pub id: String,
    pub array_id: Option<String>,
    pub extent: Extent,
    pub kind: Kind,
    reactions: Vec<Reaction>,
    rxn_ids: HashSet<String>,
    /// Outgoing edges, keyed by the neighbor's flat identifier.
    pub connections: BTreeMap<String, Connection>,
}

impl Compartment {
    pub fn new(id: impl Into<String>, extent: Extent, array_id: Option<String>) -> Self {
        Compartment {
            id: id.into(),
            array_id,
            extent,
            kind: Kind::Normal,
            reactions: Vec::new(),
            rxn_ids: HashSet::new(),
            connections: BTreeMap::new(),
        }
    }

    pub fn point(id: impl Into<String>) -> Self {
        Self::new(id, Extent::Point, None)
    }

    /// Builds a reservoir compartment with the given prescribed
    /// concentration sources. A species may appear in only one source;
    /// duplicating a species across callers is an error.
    pub fn reservoir(
        id: impl Into<String>,
        conc_sources: BTreeMap<String, ConcSource>,
    ) -> Self {
        let mut c = Self::point(id);
        c.kind = Kind::Reservoir { conc_sources };
        c
    }

    pub fn is_reservoir(&self) -> bool {
        matches!(self.kind, Kind::Reservoir { .. })
    }

    pub fn volume(&self) -> Option<f64> {
        self.extent.volume()
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    /// Flat identifier of this compartment (`array_id` + `id` joined).
    pub fn flat_id(&self) -> String {
        make_id(self.array_id.as_deref(), &self.id)
    }

    /// Adds a reaction to this compartment. A reservoir compartment may
    /// never be assigned reactions. Adding the same reaction id twice
    /// is a no-op with a warning.
    pub fn add_reaction(&mut self, rxn: Reaction) -> Result<()> {
        if self.is_reservoir() {
            return Err(RxnError::ReservoirHasReactions(self.flat_id()));
        }
        if self.rxn_ids.contains(&rxn.id) {
            log::warn!("reaction {:?} already present in compartment {:?}", rxn.id, self.flat_id());
            return Ok(());
        }
        self.rxn_ids.insert(rxn.id.clone());
        self.reactions.push(rxn);
        Ok(())
    }

    pub fn add_reactions(&mut self, rxns: impl IntoIterator<Item = Reaction>) -> Result<()> {
        for r in rxns {
            self.add_reaction(r)?;
        }
        Ok(())
    }

    /// Writes a directed edge to `neighbor_flat_id` using `conn`.
    /// Overwriting an existing edge to the same neighbor is allowed but
    /// warns unless `warn_overwrite` is false.
    pub fn connect(&mut self, neighbor_flat_id: impl Into<String>, conn: Connection, warn_overwrite: bool) {
        let tag = neighbor_flat_id.into();
        if self.connections.contains_key(&tag) && warn_overwrite {
            log::warn!("overwriting connection between {:?} and {:?}", self.flat_id(), tag);
        }
        self.connections.insert(tag, conn);
    }

    /// Removes the connection to `neighbor_flat_id`. Tolerant: warns
    /// (rather than failing) if no such connection exists.
    pub fn remove_connection(&mut self, neighbor_flat_id: &str) {
        if self.connections.remove(neighbor_flat_id).is_none() {
            log::warn!("connection to remove between {:?} and {:?} does not exist", self.flat_id(), neighbor_flat_id);
        }
    }

    /// Returns a copy of this compartment, optionally assigned a new id
    /// and/or stripped of its `array_id`. Reactions, connections and
    /// extent are preserved; a reservoir's `conc_sources` are preserved
    /// as well.
    pub fn rekey(&self, new_id: Option<&str>, drop_array_id: bool) -> Self {
        let id = new_id.map(|s| s.to_string()).unwrap_or_else(|| self.id.clone());
        let array_id = if drop_array_id { None } else { self.array_id.clone() };

        Compartment {
            id,
            array_id,
            extent: self.extent.clone(),
            kind: self.kind.clone(),
            reactions: self.reactions.clone(),
            rxn_ids: self.rxn_ids.clone(),
            connections: self.connections.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;

    #[test]
    fn flat_id_includes_array_when_present() {
        let c = Compartment::new("3", Extent::Linear { x: (0.0, 1.0) }, Some("bulk".to_string()));
        assert_eq!(c.flat_id(), "bulk-3");
    }

    #[test]
    fn reservoir_rejects_reactions() {
        let mut r = Compartment::reservoir("res", BTreeMap::new());
        let rxn = crate::reaction::Reaction::new(
            "r1",
            vec![],
            vec![],
            vec![crate::species::Species::new("A")],
            vec![1],
            crate::units::Quantity::rate_per_second(1.0, 0),
            crate::units::Quantity::rate_per_second(0.0, 1),
        )
        .unwrap();
        assert!(r.add_reaction(rxn).is_err());
    }

    #[test]
    fn rekey_preserves_connections() {
        let mut c = Compartment::new("0", Extent::Linear { x: (0.0, 1.0) }, Some("bulk".to_string()));
        c.connect("bulk-1", Connection::isotropic_scalar("A", 0.1), true);
        let renamed = c.rekey(Some("bulk-0"), true);
        assert_eq!(renamed.id, "bulk-0");
        assert!(renamed.array_id.is_none());
        assert_eq!(renamed.connections.len(), 1);
    }
}
