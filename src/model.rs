//! `Model` assembles compartment arrays and standalone compartments
//! into one network; `flatten()` turns that into a `FlatModel` with a
//! single flat namespace and all `Ficks`/`Res` connections resolved to
//! concrete `DivByV` rates.

use std::collections::BTreeMap;

use crate::array::{Array1D, Array2D, Array3D};
use crate::compartment::{Compartment, Extent, FaceKey};
use crate::connection::{Connection, Face};
use crate::error::{Result, RxnError};
use crate::reaction::Reaction;

/// One of the three grid dimensionalities a `Model` can hold.
#[derive(Debug, Clone)]
pub enum ArrayMember {
    D1(Array1D),
    D2(Array2D),
    D3(Array3D),
}

impl ArrayMember {
    pub fn array_id(&self) -> &str {
        match self {
            ArrayMember::D1(a) => &a.array_id,
            ArrayMember::D2(a) => &a.array_id,
            ArrayMember::D3(a) => &a.array_id,
        }
    }

    pub fn periodic(&self) -> Vec<bool> {
        match self {
            ArrayMember::D1(a) => vec![a.periodic],
            ArrayMember::D2(a) => vec![a.periodic.0, a.periodic.1],
            ArrayMember::D3(a) => vec![a.periodic.0, a.periodic.1, a.periodic.2],
        }
    }

    pub fn box_len(&self) -> Vec<f64> {
        match self {
            ArrayMember::D1(a) => vec![a.box_len],
            ArrayMember::D2(a) => vec![a.box_len.0, a.box_len.1],
            ArrayMember::D3(a) => vec![a.box_len.0, a.box_len.1, a.box_len.2],
        }
    }

    pub fn compartments(&self) -> Box<dyn Iterator<Item = &Compartment> + '_> {
        match self {
            ArrayMember::D1(a) => Box::new(a.compartments.values()),
            ArrayMember::D2(a) => Box::new(a.compartments.values()),
            ArrayMember::D3(a) => Box::new(a.compartments.values()),
        }
    }
}

/// A hierarchical model: compartment arrays plus standalone
/// compartments, not yet given a single flat namespace.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub compartments: BTreeMap<String, Compartment>,
    pub arrays: BTreeMap<String, ArrayMember>,
    pub periodic: Option<Vec<bool>>,
    pub box_len: Option<Vec<f64>>,
}

impl Model {
    pub fn new() -> Self {
        Model::default()
    }

    pub fn add_compartment(&mut self, c: Compartment) -> Result<()> {
        if self.compartments.contains_key(&c.id) {
            return Err(RxnError::DuplicateCompartment(c.id.clone()));
        }
        self.compartments.insert(c.id.clone(), c);
        Ok(())
    }

    pub fn add_array(&mut self, array: ArrayMember) -> Result<()> {
        let periodic = array.periodic();
        let mut box_len = array.box_len();

        match (&self.periodic, &self.box_len) {
            (None, None) => {
                self.periodic = Some(periodic);
                self.box_len = Some(box_len);
            }
            (Some(existing_periodic), Some(existing_box_len)) => {
                if existing_periodic != &periodic {
                    return Err(RxnError::PeriodicityMismatch {
                        existing: existing_periodic.clone(),
                        incoming: periodic,
                    });
                }
                let mut merged = existing_box_len.clone();
                for i in 0..merged.len() {
                    if merged[i] != box_len[i] {
                        if periodic[i] {
                            return Err(RxnError::PeriodicLengthMismatch {
                                existing: merged[i],
                                incoming: box_len[i],
                            });
                        }
                        merged[i] += box_len[i];
                    }
                }
                box_len = merged;
                self.box_len = Some(box_len);
            }
            _ => unreachable!("periodic and box_len are always set together"),
        }

        if self.arrays.contains_key(array.array_id()) {
            return Err(RxnError::DuplicateArray(array.array_id().to_string()));
        }
        self.arrays.insert(array.array_id().to_string(), array);
        Ok(())
    }

    /// Flattens this model: merges all compartments (standalone and
    /// from every array) into a single flat namespace, then resolves
    /// every `Ficks`/`Res` connection into a concrete `DivByV` rate.
    pub fn flatten(&self) -> Result<FlatModel> {
        let mut flat = FlatModel::new();
        flat.add_compartments(self.compartments.values().cloned())?;
        for array in self.arrays.values() {
            flat.add_compartments(array.compartments().cloned())?;
        }

        let missing = flat.find_missing_compartments();
        if !missing.is_empty() {
            return Err(RxnError::UnknownNeighbors(missing));
        }

        let to_resolve: Vec<(String, String)> = flat
            .compartments
            .iter()
            .flat_map(|(owner, c)| {
                c.connections
                    .iter()
                    .filter(|(_, conn)| matches!(conn, Connection::Ficks { .. } | Connection::Res { .. }))
                    .map(|(neighbor, _)| (owner.clone(), neighbor.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();

        for (owner, neighbor) in to_resolve {
            self.resolve_edge(&mut flat, &owner, &neighbor)?;
        }

        Ok(flat)
    }

    fn resolve_edge(&self, flat: &mut FlatModel, owner: &str, neighbor: &str) -> Result<()> {
        let conn = match flat.compartments.get(owner).and_then(|c| c.connections.get(neighbor)) {
            Some(c) => c.clone(),
            None => return Ok(()),
        };

        match &conn {
            Connection::Ficks { surface_area, ic_distance, .. } => {
                let area = match surface_area {
                    Some(a) => *a,
                    None => self.adjoining_face_area(flat, owner, neighbor)?,
                };
                let dist = match ic_distance {
                    Some(d) => *d,
                    None => self.center_distance(flat, owner, neighbor)?,
                };
                let resolved = conn.with_geometry(Some(area), Some(dist)).resolve()?;
                flat.compartments.get_mut(owner).unwrap().connect(neighbor, resolved.clone(), false);
                flat.compartments.get_mut(neighbor).unwrap().connect(owner, resolved, false);
                Ok(())
            }
            Connection::Res { face, surface_area, ic_distance, .. } => {
                let face = *face;
                let area = match surface_area {
                    Some(a) => *a,
                    None => self.face_area(flat, owner, face)?,
                };
                let dist = match ic_distance {
                    Some(d) => *d,
                    None => self.face_extent(flat, owner, face)?,
                };
                let resolved = conn.with_geometry(Some(area), Some(dist)).resolve()?;
                flat.compartments.get_mut(owner).unwrap().connect(neighbor, resolved, false);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn adjoining_face_area(&self, flat: &FlatModel, owner: &str, neighbor: &str) -> Result<f64> {
        let c1 = &flat.compartments[owner];
        let c2 = &flat.compartments[neighbor];
        let (sa1, sa2) = match (&c1.extent, &c2.extent) {
            (Extent::Volumetric { surface_area: sa1, .. }, Extent::Volumetric { surface_area: sa2, .. }) => {
                (sa1, sa2)
            }
            _ => return Err(RxnError::UnresolvableAdjoiningFace(owner.to_string(), neighbor.to_string())),
        };
        let r1 = c1.extent.ranges();
        let r2 = c2.extent.ranges();

        let face = if adjoins(r1[0], r2[0]) {
            FaceKey::Yz
        } else if adjoins(r1[1], r2[1]) {
            FaceKey::Xz
        } else if adjoins(r1[2], r2[2]) {
            FaceKey::Xy
        } else {
            return Err(RxnError::UnresolvableAdjoiningFace(owner.to_string(), neighbor.to_string()));
        };

        Ok(sa1[&face].min(sa2[&face]))
    }

    fn center_distance(&self, flat: &FlatModel, owner: &str, neighbor: &str) -> Result<f64> {
        let c1 = &flat.compartments[owner];
        let c2 = &flat.compartments[neighbor];
        let center1 = c1.extent.center();
        let center2 = c2.extent.center();

        let mut acc = 0.0;
        for i in 0..center1.len().min(center2.len()) {
            let mut dc = center1[i] - center2[i];
            if let (Some(periodic), Some(box_len)) = (&self.periodic, &self.box_len) {
                if i < periodic.len() && periodic[i] {
                    if dc * 2.0 < -box_len[i] {
                        dc += box_len[i];
                    } else if dc * 2.0 > box_len[i] {
                        dc -= box_len[i];
                    }
                }
            }
            acc += dc * dc;
        }
        Ok(acc.sqrt())
    }

    fn face_area(&self, flat: &FlatModel, owner: &str, face: Face) -> Result<f64> {
        let c1 = &flat.compartments[owner];
        match &c1.extent {
            Extent::Volumetric { surface_area, .. } => {
                let key = match face {
                    Face::X => FaceKey::Yz,
                    Face::Y => FaceKey::Xz,
                    Face::Z => FaceKey::Xy,
                };
                Ok(surface_area[&key])
            }
            _ => Err(RxnError::UnresolvableAdjoiningFace(owner.to_string(), "<reservoir>".to_string())),
        }
    }

    fn face_extent(&self, flat: &FlatModel, owner: &str, face: Face) -> Result<f64> {
        let c1 = &flat.compartments[owner];
        let ranges = c1.extent.ranges();
        let idx = match face {
            Face::X => 0,
            Face::Y => 1,
            Face::Z => 2,
        };
        ranges
            .get(idx)
            .map(|(lo, hi)| hi - lo)
            .ok_or_else(|| RxnError::UnresolvableAdjoiningFace(owner.to_string(), "<reservoir>".to_string()))
    }
}

fn adjoins(a: (f64, f64), b: (f64, f64)) -> bool {
    a.1 == b.0 || a.0 == b.1
}

impl Connection {
    /// Returns a copy of this `Ficks`/`Res` connection with its
    /// geometry filled in, ready for `resolve()`. A no-op for already
    /// concrete connection types.
    fn with_geometry(self, area: Option<f64>, dist: Option<f64>) -> Connection {
        match self {
            Connection::Ficks { diffusion, spatial_dim, .. } => {
                Connection::Ficks { diffusion, surface_area: area, ic_distance: dist, spatial_dim }
            }
            Connection::Res { diffusion, face, .. } => {
                Connection::Res { diffusion, face, surface_area: area, ic_distance: dist }
            }
            other => other,
        }
    }
}

/// A node in a pure-data graph export of a `FlatModel`: a flat
/// compartment id plus its 2D orthographic projection coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub vis_x: f64,
    pub vis_y: f64,
}

/// A directed edge in a pure-data graph export, carrying the resolved
/// outgoing per-species rate.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub species_rates: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphExport {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// A model with a single flat compartment namespace and fully resolved
/// connections. Produced by `Model::flatten()`.
#[derive(Debug, Clone, Default)]
pub struct FlatModel {
    pub compartments: BTreeMap<String, Compartment>,
}

impl FlatModel {
    pub fn new() -> Self {
        FlatModel::default()
    }

    pub fn n_compartments(&self) -> usize {
        self.compartments.len()
    }

    /// Renames `c` to its flat id (dropping the array id) and inserts
    /// it. Errors on a flat-id collision.
    pub fn add_compartment(&mut self, c: Compartment) -> Result<()> {
        let flat_id = c.flat_id();
        if self.compartments.contains_key(&flat_id) {
            return Err(RxnError::DuplicateCompartment(flat_id));
        }
        let renamed = c.rekey(Some(&flat_id), true);
        self.compartments.insert(flat_id, renamed);
        Ok(())
    }

    pub fn add_compartments(&mut self, compartments: impl IntoIterator<Item = Compartment>) -> Result<()> {
        for c in compartments {
            self.add_compartment(c)?;
        }
        Ok(())
    }

    /// Connection targets that refer to a compartment id absent from
    /// this model.
    pub fn find_missing_compartments(&self) -> Vec<String> {
        let mut missing = Vec::new();
        for c in self.compartments.values() {
            for neighbor in c.connections.keys() {
                if !self.compartments.contains_key(neighbor) {
                    missing.push(neighbor.clone());
                }
            }
        }
        missing
    }

    /// Adds `rxn` to `targets` (flat ids), or to every compartment if
    /// `targets` is `None`.
    pub fn add_reaction_to(&mut self, rxn: &Reaction, targets: Option<&[String]>) -> Result<()> {
        match targets {
            Some(ids) => {
                for id in ids {
                    let c = self
                        .compartments
                        .get_mut(id)
                        .ok_or_else(|| RxnError::UnknownNeighbors(vec![id.clone()]))?;
                    c.add_reaction(rxn.clone())?;
                }
            }
            None => {
                for c in self.compartments.values_mut() {
                    c.add_reaction(rxn.clone())?;
                }
            }
        }
        Ok(())
    }

    /// Exports a pure-data directed graph: compartments as nodes
    /// (positioned by an orthographic `x,y,z -> x,y` projection), and
    /// connections as edges carrying their resolved per-species rates.
    pub fn to_graph_export(&self) -> GraphExport {
        const ALPHA: f64 = 0.7;
        const BETA: f64 = 1.2;

        let mut nodes = Vec::new();
        for (id, c) in &self.compartments {
            let center = c.extent.center();
            let x = center.first().copied().unwrap_or(0.0);
            let y = center.get(1).copied().unwrap_or(0.0);
            let z = center.get(2).copied().unwrap_or(0.0);
            nodes.push(GraphNode { id: id.clone(), vis_x: x - ALPHA * y, vis_y: z + BETA * y });
        }

        let mut edges = Vec::new();
        for (id, c) in &self.compartments {
            for (neighbor, conn) in &c.connections {
                let mut species_rates = BTreeMap::new();
                for s in conn.species() {
                    if let Some((k_out, _)) = conn.rate_pair(s) {
                        species_rates.insert(s.to_string(), k_out);
                    }
                }
                edges.push(GraphEdge { from: id.clone(), to: neighbor.clone(), species_rates });
            }
        }

        GraphExport { nodes, edges }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Quantity;
    use std::collections::BTreeMap as Map;

    #[test]
    fn flatten_merges_standalone_and_array_compartments() {
        let mut model = Model::new();
        model.add_compartment(Compartment::point("main")).unwrap();
        let conn = Connection::isotropic_scalar("A", 0.1);
        let arr = Array1D::new("bulk", &[0.0, 1.0, 2.0], &conn, false);
        model.add_array(ArrayMember::D1(arr)).unwrap();

        let flat = model.flatten().unwrap();
        assert_eq!(flat.n_compartments(), 3);
        assert!(flat.compartments.contains_key("main"));
        assert!(flat.compartments.contains_key("bulk-0"));
        assert!(flat.compartments.contains_key("bulk-1"));
    }

    #[test]
    fn flatten_detects_missing_neighbor() {
        let mut model = Model::new();
        let mut c = Compartment::point("a");
        c.connect("ghost", Connection::isotropic_scalar("A", 0.1), false);
        model.add_compartment(c).unwrap();

        let err = model.flatten();
        assert!(matches!(err, Err(RxnError::UnknownNeighbors(_))));
    }

    #[test]
    fn ficks_resolves_using_adjoining_face_area() {
        let mut model = Model::new();

        let mut sa1 = Map::new();
        sa1.insert(FaceKey::Yz, 4.0);
        sa1.insert(FaceKey::Xz, 4.0);
        sa1.insert(FaceKey::Xy, 4.0);
        let e1 = Extent::Volumetric { x: (0.0, 2.0), y: (0.0, 2.0), z: (0.0, 2.0), surface_area: sa1.clone() };
        let e2 = Extent::Volumetric { x: (2.0, 4.0), y: (0.0, 2.0), z: (0.0, 2.0), surface_area: sa1 };

        let mut c1 = Compartment::new("c1", e1, None);
        let c2 = Compartment::new("c2", e2, None);

        let mut d = Map::new();
        d.insert("A".to_string(), Quantity::new(1.0, crate::units::Dimension { length: 2, time: -1, amount: 0 }));
        let ficks = Connection::ficks(d, None, None, 3).unwrap();
        c1.connect("c2", ficks, false);

        model.add_compartment(c1).unwrap();
        model.add_compartment(c2).unwrap();

        let flat = model.flatten().unwrap();
        let resolved = flat.compartments["c1"].connections.get("c2").unwrap();
        assert!(resolved.is_div_by_v());
        // area = 4.0, distance = 2.0 => k = D*A/dx = 1*4/2 = 2.0
        assert_eq!(resolved.rate_pair("A"), Some((2.0, 2.0)));
        // symmetric: c2 also got the resolved connection back
        assert!(flat.compartments["c2"].connections["c1"].is_div_by_v());
    }
}
