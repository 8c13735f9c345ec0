//! Dimension-checked physical quantities and canonical-unit coercion.
//!
//! The canonical units used by the rest of the crate are seconds for
//! time, nanometers for length, and number density (molecules per cubic
//! nanometer) for concentration. Every rate constant is coerced to its
//! canonical unit exactly once, when the owning `Reaction` or
//! `Connection` is constructed; after that the simulation core only
//! ever touches bare `f64` magnitudes (see `crate::deriv`,
//! `crate::gillespie`). A full physical-unit registry — spanning
//! arbitrary user units and runtime-defined dimensions — is treated as
//! an external capability; this module only needs to know the handful
//! of dimensions this domain actually uses.

use crate::error::{Result, RxnError};

/// Number of molecules per mole.
pub const AVOGADRO: f64 = 6.022e23;
/// Cubic nanometers per liter (1 L = 1e-3 m^3 = 1e-3 * (1e9 nm)^3).
pub const CUBIC_NM_PER_LITER: f64 = 1e24;

/// A physical dimension expressed as integer exponents of this domain's
/// three base dimensions: length, time, and amount (molecule/mole
/// count). Concentration is `amount / length^3`, so it is represented
/// here, not as a fourth base dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimension {
    pub length: i32,
    pub time: i32,
    pub amount: i32,
}

impl Dimension {
    pub const DIMENSIONLESS: Dimension = Dimension { length: 0, time: 0, amount: 0 };
    pub const TIME: Dimension = Dimension { length: 0, time: 1, amount: 0 };
    /// The dimension of a first-order rate constant / inverse duration.
    pub const INVERSE_TIME: Dimension = Dimension { length: 0, time: -1, amount: 0 };
    pub const LENGTH: Dimension = Dimension { length: 1, time: 0, amount: 0 };
    pub const CONCENTRATION: Dimension = Dimension { length: -3, time: 0, amount: 1 };

    /// Dimension of a reaction rate constant of the given order:
    /// `(concentration)^(1-order) * time^-1`.
    pub fn rate_for_order(order: u32) -> Dimension {
        let k = 1 - order as i32;
        Dimension { length: -3 * k, time: -1, amount: k }
    }

    /// Dimension of a transport coefficient over a face of the given
    /// spatial dimensionality: `length^d / time`.
    pub fn transport_for_spatial_dim(spatial_dim: u8) -> Dimension {
        Dimension { length: spatial_dim as i32, time: -1, amount: 0 }
    }
}

/// A dimensioned quantity: a bare magnitude paired with the dimension it
/// was constructed in canonical units for. Constructors perform the
/// unit conversion to canonical units immediately, so `magnitude` is
/// always already expressed in seconds / nanometers / number density
/// once a `Quantity` exists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    magnitude: f64,
    dimension: Dimension,
}

impl Quantity {
    pub fn new(magnitude: f64, dimension: Dimension) -> Self {
        Quantity { magnitude, dimension }
    }

    pub fn dimensionless(v: f64) -> Self {
        Self::new(v, Dimension::DIMENSIONLESS)
    }

    pub fn seconds(v: f64) -> Self {
        Self::new(v, Dimension::TIME)
    }

    pub fn minutes(v: f64) -> Self {
        Self::new(v * 60.0, Dimension::TIME)
    }

    pub fn hours(v: f64) -> Self {
        Self::new(v * 3600.0, Dimension::TIME)
    }

    pub fn nanometers(v: f64) -> Self {
        Self::new(v, Dimension::LENGTH)
    }

    pub fn micrometers(v: f64) -> Self {
        Self::new(v * 1e3, Dimension::LENGTH)
    }

    pub fn millimeters(v: f64) -> Self {
        Self::new(v * 1e6, Dimension::LENGTH)
    }

    /// A concentration given in molar (mol/L), converted to the
    /// canonical number-density unit (molecules/nm^3).
    pub fn molar(v: f64) -> Self {
        Self::new(v * AVOGADRO / CUBIC_NM_PER_LITER, Dimension::CONCENTRATION)
    }

    pub fn millimolar(v: f64) -> Self {
        Self::molar(v * 1e-3)
    }

    pub fn micromolar(v: f64) -> Self {
        Self::molar(v * 1e-6)
    }

    /// A concentration already given as a number density (molecules per
    /// cubic nanometer); passed straight through.
    pub fn per_cubic_nanometer(v: f64) -> Self {
        Self::new(v, Dimension::CONCENTRATION)
    }

    /// A reaction rate constant of the given order, already expressed in
    /// canonical units (number density rather than molar).
    pub fn rate_per_second(v: f64, order: u32) -> Self {
        Self::new(v, Dimension::rate_for_order(order))
    }

    /// A reaction rate constant of the given order, expressed with
    /// molar concentration units, converted to canonical number density.
    pub fn rate_molar_per_second(v: f64, order: u32) -> Self {
        let k = 1 - order as i32;
        let factor = (AVOGADRO / CUBIC_NM_PER_LITER).powi(k);
        Self::new(v * factor, Dimension::rate_for_order(order))
    }

    /// A transport coefficient of `length^spatial_dim / time`, already
    /// in canonical (nanometer, second) units.
    pub fn transport(v: f64, spatial_dim: u8) -> Self {
        Self::new(v, Dimension::transport_for_spatial_dim(spatial_dim))
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Coerces this quantity to the expected dimension, returning the
    /// bare canonical-unit magnitude, or a dimensional-mismatch error.
    pub fn into_canonical(self, expected: Dimension) -> Result<f64> {
        if self.dimension == expected {
            Ok(self.magnitude)
        } else {
            Err(RxnError::DimensionalMismatch { expected, found: self.dimension })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn molar_to_number_density() {
        let q = Quantity::molar(1.0);
        assert!((q.magnitude() - 0.6022).abs() < 1e-6);
        assert_eq!(q.dimension(), Dimension::CONCENTRATION);
    }

    #[test]
    fn first_order_rate_dimension_is_inverse_time() {
        assert_eq!(Dimension::rate_for_order(1), Dimension::INVERSE_TIME);
    }

    #[test]
    fn zeroth_order_rate_dimension_is_concentration_over_time() {
        let dim = Dimension::rate_for_order(0);
        assert_eq!(dim.length, Dimension::CONCENTRATION.length);
        assert_eq!(dim.amount, 1);
        assert_eq!(dim.time, -1);
    }

    #[test]
    fn mismatched_dimension_is_rejected() {
        let q = Quantity::seconds(1.0);
        assert!(q.into_canonical(Dimension::LENGTH).is_err());
    }

    #[test]
    fn minutes_convert_to_canonical_seconds() {
        let q = Quantity::minutes(2.0);
        assert_eq!(q.into_canonical(Dimension::TIME).unwrap(), 120.0);
    }
}
