//! Connections govern first-order transport between compartments.
//!
//! `d_n1/dt = -k_out * n1  +  k_in * n2` (after any required volume
//! division) is the general shape every variant reduces to once
//! resolved; the variants below only differ in how `(k_out, k_in)` is
//! supplied and whether it still needs geometric resolution.

use std::collections::BTreeMap;

use crate::error::{Result, RxnError};
use crate::units::{Dimension, Quantity};

/// Dimension of a diffusion constant: length^2 / time.
const DIFFUSION_DIM: Dimension = Dimension { length: 2, time: -1, amount: 0 };

/// A rate supplied either as one scalar (broadcast to both directions,
/// with a warning for `Anisotropic`) or as an explicit `(k_out, k_in)`
/// pair.
#[derive(Debug, Clone, Copy)]
pub enum RateSpec {
    Scalar(Quantity),
    Pair(Quantity, Quantity),
}

/// The face of a volumetric compartment that a `Res` connection adjoins,
/// used to look up surface area and inter-compartment distance
/// automatically when they are not supplied directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    X,
    Y,
    Z,
}

/// A directed transport rule from the owning compartment to a named
/// neighbor, carrying per-species rate data.
#[derive(Debug, Clone)]
pub enum Connection {
    /// A symmetric per-species rate, already in canonical 1/time units.
    Isotropic { rates: BTreeMap<String, (f64, f64)> },
    /// An asymmetric per-species `(k_out, k_in)` pair, canonical 1/time.
    Anisotropic { rates: BTreeMap<String, (f64, f64)> },
    /// A per-species `(k_out, k_in)` pair still in `length^d/time`, to be
    /// divided by the owning compartment's volume at compile time.
    DivByV { rates: BTreeMap<String, (f64, f64)>, spatial_dim: u8 },
    /// Unresolved Fickian diffusion: per-species diffusion constants,
    /// plus optional interface geometry. `resolve()` turns this into a
    /// `DivByV` connection.
    Ficks {
        diffusion: BTreeMap<String, f64>,
        surface_area: Option<f64>,
        ic_distance: Option<f64>,
        spatial_dim: u8,
    },
    /// Like `Ficks`, but bound to one face of a reservoir; resolves into
    /// a directional `DivByV` connection pointed at the reservoir.
    Res {
        diffusion: BTreeMap<String, f64>,
        face: Face,
        surface_area: Option<f64>,
        ic_distance: Option<f64>,
    },
}

impl Connection {
    /// `species_rates` maps a species id to a single transport rate `k`,
    /// normalized to the symmetric pair `(k, k)`.
    pub fn isotropic(species_rates: BTreeMap<String, Quantity>) -> Result<Connection> {
        let mut rates = BTreeMap::new();
        for (s, q) in species_rates {
            let k = q.into_canonical(Dimension::rate_for_order(1))?;
            rates.insert(s, (k, k));
        }
        Ok(Connection::Isotropic { rates })
    }

    /// Convenience constructor for a single already-canonical rate,
    /// mainly useful in tests and small hand-built models.
    pub fn isotropic_scalar(species: impl Into<String>, k_per_second: f64) -> Connection {
        let mut map = BTreeMap::new();
        map.insert(species.into(), Quantity::rate_per_second(k_per_second, 1));
        Connection::isotropic(map).expect("already-canonical rate cannot fail dimension check")
    }

    /// `species_rates` maps a species id to a `RateSpec`; a bare scalar
    /// is broadcast to `(k, k)` with a warning, per spec.
    pub fn anisotropic(species_rates: BTreeMap<String, RateSpec>) -> Result<Connection> {
        let mut rates = BTreeMap::new();
        for (s, spec) in species_rates {
            let (k_out, k_in) = match spec {
                RateSpec::Pair(out, inn) => (out, inn),
                RateSpec::Scalar(k) => {
                    log::warn!("anisotropic connection for species {s:?}: scalar rate broadcast to (k, k)");
                    (k, k)
                }
            };
            let k_out = k_out.into_canonical(Dimension::rate_for_order(1))?;
            let k_in = k_in.into_canonical(Dimension::rate_for_order(1))?;
            rates.insert(s, (k_out, k_in));
        }
        Ok(Connection::Anisotropic { rates })
    }

    pub fn div_by_v(species_rates: BTreeMap<String, (Quantity, Quantity)>, spatial_dim: u8) -> Result<Connection> {
        let mut rates = BTreeMap::new();
        for (s, (out, inn)) in species_rates {
            let expected = Dimension::transport_for_spatial_dim(spatial_dim);
            let k_out = out.into_canonical(expected)?;
            let k_in = inn.into_canonical(expected)?;
            rates.insert(s, (k_out, k_in));
        }
        Ok(Connection::DivByV { rates, spatial_dim })
    }

    pub fn ficks(
        species_d: BTreeMap<String, Quantity>,
        surface_area: Option<f64>,
        ic_distance: Option<f64>,
        spatial_dim: u8,
    ) -> Result<Connection> {
        let mut diffusion = BTreeMap::new();
        for (s, d) in species_d {
            diffusion.insert(s, d.into_canonical(DIFFUSION_DIM)?);
        }
        Ok(Connection::Ficks { diffusion, surface_area, ic_distance, spatial_dim })
    }

    pub fn res(
        species_d: BTreeMap<String, Quantity>,
        face: Face,
        surface_area: Option<f64>,
        ic_distance: Option<f64>,
    ) -> Result<Connection> {
        let mut diffusion = BTreeMap::new();
        for (s, d) in species_d {
            diffusion.insert(s, d.into_canonical(DIFFUSION_DIM)?);
        }
        Ok(Connection::Res { diffusion, face, surface_area, ic_distance })
    }

    /// The set of species this connection carries transport rates for.
    pub fn species(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            Connection::Isotropic { rates } | Connection::Anisotropic { rates } | Connection::DivByV { rates, .. } => {
                Box::new(rates.keys().map(String::as_str))
            }
            Connection::Ficks { diffusion, .. } | Connection::Res { diffusion, .. } => {
                Box::new(diffusion.keys().map(String::as_str))
            }
        }
    }

    /// Resolves a `Ficks` or `Res` connection into its concrete
    /// `DivByV` form: `k = D * A / dx`. Requires `surface_area` and
    /// `ic_distance` to already be set (the flattener fills these in
    /// from compartment geometry before calling `resolve`).
    pub fn resolve(&self) -> Result<Connection> {
        match self {
            Connection::Ficks { diffusion, surface_area, ic_distance, spatial_dim } => {
                let (a, dx) = surface_area.zip(*ic_distance).ok_or(RxnError::UnresolvedFicks)?;
                let mut rates = BTreeMap::new();
                for (s, d) in diffusion {
                    let k = d * a / dx;
                    rates.insert(s.clone(), (k, k));
                }
                Ok(Connection::DivByV { rates, spatial_dim: *spatial_dim })
            }
            Connection::Res { diffusion, surface_area, ic_distance, .. } => {
                let (a, dx) = surface_area.zip(*ic_distance).ok_or(RxnError::UnresolvedFicks)?;
                let mut rates = BTreeMap::new();
                for (s, d) in diffusion {
                    let k = d * a / dx;
                    rates.insert(s.clone(), (k, k));
                }
                Ok(Connection::DivByV { rates, spatial_dim: 3 })
            }
            other => Ok(other.clone()),
        }
    }

    pub fn is_div_by_v(&self) -> bool {
        matches!(self, Connection::DivByV { .. })
    }

    /// The `(k_out, k_in)` pair for `species`, if this connection
    /// carries a rate for it. `Ficks`/`Res` connections must be
    /// `resolve()`d first.
    pub fn rate_pair(&self, species: &str) -> Option<(f64, f64)> {
        match self {
            Connection::Isotropic { rates } | Connection::Anisotropic { rates } | Connection::DivByV { rates, .. } => {
                rates.get(species).copied()
            }
            Connection::Ficks { .. } | Connection::Res { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isotropic_broadcasts_scalar_to_symmetric_pair() {
        let mut map = BTreeMap::new();
        map.insert("A".to_string(), Quantity::rate_per_second(0.5, 1));
        let conn = Connection::isotropic(map).unwrap();
        assert_eq!(conn.rate_pair("A"), Some((0.5, 0.5)));
    }

    #[test]
    fn ficks_resolve_requires_geometry() {
        let mut d = BTreeMap::new();
        d.insert("A".to_string(), Quantity::new(1.0, DIFFUSION_DIM));
        let conn = Connection::ficks(d, None, None, 1).unwrap();
        assert!(conn.resolve().is_err());
    }

    #[test]
    fn ficks_resolve_computes_da_over_dx() {
        let mut d = BTreeMap::new();
        d.insert("A".to_string(), Quantity::new(2.0, DIFFUSION_DIM));
        let conn = Connection::ficks(d, Some(4.0), Some(2.0), 1).unwrap();
        let resolved = conn.resolve().unwrap();
        assert!(resolved.is_div_by_v());
        assert_eq!(resolved.rate_pair("A"), Some((4.0, 4.0)));
    }
}
