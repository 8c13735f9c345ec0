//! Reaction objects describe an immutable relationship between a set of
//! reactant species and a set of product species, each carrying a
//! stoichiometric multiplicity, together with forward and reverse rate
//! constants.

use crate::error::{Result, RxnError};
use crate::species::Species;
use crate::units::{Dimension, Quantity};

/// An immutable chemical reaction. Reactants and products are ordered
/// lists of species, each paired with a positive stoichiometric
/// multiplicity. The reaction order on a given side is the sum of that
/// side's multiplicities; it determines the expected dimensionality of
/// the corresponding rate constant (see `crate::units::Dimension`).
#[derive(Debug, Clone)]
pub struct Reaction {
    pub id: String,
    pub reactants: Vec<Species>,
    pub stoich_r: Vec<u32>,
    pub products: Vec<Species>,
    pub stoich_p: Vec<u32>,
    pub kf: f64,
    pub kr: f64,
}

impl Reaction {
    /// Validates stoichiometry list lengths, species, and rate
    /// non-negativity, coerces `kf`/`kr` to the canonical unit matching
    /// their side's reaction order, and warns if both rates are zero.
    pub fn new(
        id: impl Into<String>,
        reactants: Vec<Species>,
        stoich_r: Vec<u32>,
        products: Vec<Species>,
        stoich_p: Vec<u32>,
        kf: Quantity,
        kr: Quantity,
    ) -> Result<Self> {
        let id = id.into();

        if reactants.len() != stoich_r.len() {
            return Err(RxnError::StoichiometryLengthMismatch {
                species_len: reactants.len(),
                stoich_len: stoich_r.len(),
            });
        }
        if products.len() != stoich_p.len() {
            return Err(RxnError::StoichiometryLengthMismatch {
                species_len: products.len(),
                stoich_len: stoich_p.len(),
            });
        }

        let order_f: u32 = stoich_r.iter().sum();
        let order_r: u32 = stoich_p.iter().sum();

        let kf_mag = kf.into_canonical(Dimension::rate_for_order(order_f))?;
        let kr_mag = kr.into_canonical(Dimension::rate_for_order(order_r))?;

        if kf_mag < 0.0 {
            return Err(RxnError::NegativeRate(kf_mag));
        }
        if kr_mag < 0.0 {
            return Err(RxnError::NegativeRate(kr_mag));
        }
        if kf_mag == 0.0 && kr_mag == 0.0 {
            log::warn!("reaction {id:?}: both forward and reverse rates are zero");
        }

        Ok(Reaction { id, reactants, stoich_r, products, stoich_p, kf: kf_mag, kr: kr_mag })
    }

    /// The reactant-side reaction order (sum of reactant stoichiometries).
    pub fn reactant_order(&self) -> u32 {
        self.stoich_r.iter().sum()
    }

    /// The product-side reaction order (sum of product stoichiometries).
    pub fn product_order(&self) -> u32 {
        self.stoich_p.iter().sum()
    }

    pub fn reactant_ids(&self) -> impl Iterator<Item = &str> {
        self.reactants.iter().map(|s| s.id.as_str())
    }

    pub fn product_ids(&self) -> impl Iterator<Item = &str> {
        self.products.iter().map(|s| s.id.as_str())
    }

    /// Stable diagnostic text, e.g. `2 A + B <--> C // kf = 1 // kr = 0.1`.
    pub fn display(&self) -> String {
        let mut out = String::new();
        for (i, r) in self.reactants.iter().enumerate() {
            if i > 0 {
                out.push_str("+ ");
            }
            if self.stoich_r[i] > 1 {
                out.push_str(&format!("{} {} ", self.stoich_r[i], r.id));
            } else {
                out.push_str(&format!("{} ", r.id));
            }
        }

        let mut rate_str = String::new();
        if self.kr > 0.0 {
            out.push('<');
            rate_str.push_str(&format!(" // kr = {}", self.kr));
        }
        out.push_str("---");
        if self.kf > 0.0 {
            out.push_str("> ");
            rate_str.push_str(&format!(" // kf = {}", self.kf));
        }

        for (i, p) in self.products.iter().enumerate() {
            if i > 0 {
                out.push_str("+ ");
            }
            if self.stoich_p[i] > 1 {
                out.push_str(&format!("{} {} ", self.stoich_p[i], p.id));
            } else {
                out.push_str(&format!("{} ", p.id));
            }
        }

        out + &rate_str
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn species(id: &str) -> Species {
        Species::new(id)
    }

    #[test]
    fn construction_validates_stoichiometry_lengths() {
        let err = Reaction::new(
            "bad",
            vec![species("A")],
            vec![1, 1],
            vec![],
            vec![],
            Quantity::rate_per_second(1.0, 1),
            Quantity::rate_per_second(0.0, 0),
        );
        assert!(matches!(err, Err(RxnError::StoichiometryLengthMismatch { .. })));
    }

    #[test]
    fn negative_rate_is_rejected() {
        let err = Reaction::new(
            "bad",
            vec![species("A")],
            vec![1],
            vec![],
            vec![],
            Quantity::rate_per_second(-1.0, 1),
            Quantity::rate_per_second(0.0, 0),
        );
        assert!(matches!(err, Err(RxnError::NegativeRate(_))));
    }

    #[test]
    fn dimerization_requires_second_order_rate_dimension() {
        // 2A -> C should expect a second-order rate dimension for kf.
        let err = Reaction::new(
            "dimerize",
            vec![species("A")],
            vec![2],
            vec![species("C")],
            vec![1],
            Quantity::rate_per_second(1.0, 1), // wrong order
            Quantity::rate_per_second(0.0, 0),
        );
        assert!(matches!(err, Err(RxnError::DimensionalMismatch { .. })));
    }

    #[test]
    fn valid_reaction_computes_orders() {
        let r = Reaction::new(
            "dimerize",
            vec![species("A")],
            vec![2],
            vec![species("C")],
            vec![1],
            Quantity::rate_per_second(1e-3, 2),
            Quantity::rate_per_second(0.0, 1),
        )
        .unwrap();
        assert_eq!(r.reactant_order(), 2);
        assert_eq!(r.product_order(), 1);
    }
}
