//! Compartment arrays: regular grids of compartments wired to their
//! nearest neighbors, built in one call instead of one `connect()` at a
//! time.

use std::collections::BTreeMap;

use crate::compartment::id::join_indices;
use crate::compartment::{Compartment, Extent, FaceKey};
use crate::connection::Connection;
use crate::reaction::Reaction;

/// Applies `rxn` to every compartment in `compartments`.
pub fn add_rxn_to_array<'a>(
    compartments: impl IntoIterator<Item = &'a mut Compartment>,
    rxn: &Reaction,
) -> crate::error::Result<()> {
    for c in compartments {
        c.add_reaction(rxn.clone())?;
    }
    Ok(())
}

/// Applies each reaction in `rxns` to every compartment in
/// `compartments`.
pub fn add_rxns_to_array<'a>(
    compartments: impl IntoIterator<Item = &'a mut Compartment> + Clone,
    rxns: &[Reaction],
) -> crate::error::Result<()> {
    for r in rxns {
        add_rxn_to_array(compartments.clone(), r)?;
    }
    Ok(())
}

/// Overwrites every outgoing connection whose neighbor flat id starts
/// with `neighbor_prefix` with `new_conn`.
fn change_connections_matching<'a>(
    compartments: impl IntoIterator<Item = &'a mut Compartment>,
    neighbor_prefix: &str,
    new_conn: &Connection,
) {
    for c in compartments {
        let matching: Vec<String> =
            c.connections.keys().filter(|k| k.starts_with(neighbor_prefix)).cloned().collect();
        for k in matching {
            c.connect(k, new_conn.clone(), false);
        }
    }
}

fn array_prefix(array_id: &str) -> String {
    format!("{array_id}-")
}

/// A 1D grid of compartments connected in sequence. `positions` gives
/// the cell boundaries (so `positions.len() - 1` compartments are
/// built).
#[derive(Debug, Clone)]
pub struct Array1D {
    pub array_id: String,
    pub box_len: f64,
    pub periodic: bool,
    pub n: usize,
    pub compartments: BTreeMap<usize, Compartment>,
}

impl Array1D {
    pub fn new(array_id: impl Into<String>, positions: &[f64], conn_type: &Connection, periodic: bool) -> Self {
        let array_id = array_id.into();
        let n = positions.len() - 1;
        let box_len = positions[n] - positions[0];

        let mut compartments = BTreeMap::new();
        for i in 0..n {
            let extent = Extent::Linear { x: (positions[i], positions[i + 1]) };
            compartments.insert(i, Compartment::new(join_indices(&[i]), extent, Some(array_id.clone())));
        }

        let mut arr = Array1D { array_id, box_len, periodic, n, compartments };
        for i in 0..n {
            if i > 0 {
                arr.wire(i, i - 1, conn_type);
            }
            if i < n - 1 {
                arr.wire(i, i + 1, conn_type);
            }
        }
        if periodic && n > 1 {
            arr.wire(0, n - 1, conn_type);
            arr.wire(n - 1, 0, conn_type);
        }
        arr
    }

    fn wire(&mut self, from: usize, to: usize, conn_type: &Connection) {
        let neighbor_id = self.compartments[&to].flat_id();
        self.compartments.get_mut(&from).unwrap().connect(neighbor_id, conn_type.clone(), true);
    }

    /// Connects this array to `other`, index-for-index, in both
    /// directions. Both arrays must have the same length.
    pub fn stack(&mut self, other: &mut Array1D, conn_type: &Connection) {
        assert_eq!(self.n, other.n, "stacked 1D arrays must have the same length");
        for i in 0..self.n {
            let other_id = other.compartments[&i].flat_id();
            self.compartments.get_mut(&i).unwrap().connect(other_id, conn_type.clone(), true);
            let self_id = self.compartments[&i].flat_id();
            other.compartments.get_mut(&i).unwrap().connect(self_id, conn_type.clone(), true);
        }
    }

    pub fn add_rxn_to_array(&mut self, rxn: &Reaction) -> crate::error::Result<()> {
        add_rxn_to_array(self.compartments.values_mut(), rxn)
    }

    pub fn change_all_intra_connection_type(&mut self, new_ctype: &Connection) {
        let prefix = array_prefix(&self.array_id);
        change_connections_matching(self.compartments.values_mut(), &prefix, new_ctype);
    }

    pub fn change_all_inter_connection_type(&mut self, other_array_id: &str, new_ctype: &Connection) {
        let prefix = array_prefix(other_array_id);
        change_connections_matching(self.compartments.values_mut(), &prefix, new_ctype);
    }
}

/// A 2D grid of compartments connected to their 4 in-plane neighbors.
#[derive(Debug, Clone)]
pub struct Array2D {
    pub array_id: String,
    pub box_len: (f64, f64),
    pub periodic: (bool, bool),
    pub nx: usize,
    pub ny: usize,
    pub compartments: BTreeMap<(usize, usize), Compartment>,
}

impl Array2D {
    pub fn new(
        array_id: impl Into<String>,
        x_pos: &[f64],
        y_pos: &[f64],
        conn_type: &Connection,
        periodic: (bool, bool),
    ) -> Self {
        let array_id = array_id.into();
        let nx = x_pos.len() - 1;
        let ny = y_pos.len() - 1;
        let box_len = (x_pos[nx] - x_pos[0], y_pos[ny] - y_pos[0]);

        let mut compartments = BTreeMap::new();
        for i in 0..nx {
            for j in 0..ny {
                let extent =
                    Extent::Planar { x: (x_pos[i], x_pos[i + 1]), y: (y_pos[j], y_pos[j + 1]) };
                compartments.insert((i, j), Compartment::new(join_indices(&[i, j]), extent, Some(array_id.clone())));
            }
        }

        let mut arr = Array2D { array_id, box_len, periodic, nx, ny, compartments };
        for i in 0..nx {
            for j in 0..ny {
                if i > 0 {
                    arr.wire((i, j), (i - 1, j), conn_type);
                }
                if i < nx - 1 {
                    arr.wire((i, j), (i + 1, j), conn_type);
                }
                if j > 0 {
                    arr.wire((i, j), (i, j - 1), conn_type);
                }
                if j < ny - 1 {
                    arr.wire((i, j), (i, j + 1), conn_type);
                }
            }
        }
        if periodic.0 && nx > 1 {
            for j in 0..ny {
                arr.wire((0, j), (nx - 1, j), conn_type);
                arr.wire((nx - 1, j), (0, j), conn_type);
            }
        }
        if periodic.1 && ny > 1 {
            for i in 0..nx {
                arr.wire((i, 0), (i, ny - 1), conn_type);
                arr.wire((i, ny - 1), (i, 0), conn_type);
            }
        }
        arr
    }

    fn wire(&mut self, from: (usize, usize), to: (usize, usize), conn_type: &Connection) {
        let neighbor_id = self.compartments[&to].flat_id();
        self.compartments.get_mut(&from).unwrap().connect(neighbor_id, conn_type.clone(), true);
    }

    pub fn stack(&mut self, other: &mut Array2D, conn_type: &Connection) {
        assert_eq!(self.nx, other.nx, "stacked 2D arrays must match in x");
        assert_eq!(self.ny, other.ny, "stacked 2D arrays must match in y");
        for i in 0..self.nx {
            for j in 0..self.ny {
                let other_id = other.compartments[&(i, j)].flat_id();
                self.compartments.get_mut(&(i, j)).unwrap().connect(other_id, conn_type.clone(), true);
                let self_id = self.compartments[&(i, j)].flat_id();
                other.compartments.get_mut(&(i, j)).unwrap().connect(self_id, conn_type.clone(), true);
            }
        }
    }

    pub fn add_rxn_to_array(&mut self, rxn: &Reaction) -> crate::error::Result<()> {
        add_rxn_to_array(self.compartments.values_mut(), rxn)
    }

    pub fn change_all_intra_connection_type(&mut self, new_ctype: &Connection) {
        let prefix = array_prefix(&self.array_id);
        change_connections_matching(self.compartments.values_mut(), &prefix, new_ctype);
    }

    pub fn change_all_inter_connection_type(&mut self, other_array_id: &str, new_ctype: &Connection) {
        let prefix = array_prefix(other_array_id);
        change_connections_matching(self.compartments.values_mut(), &prefix, new_ctype);
    }
}

/// Which face of a `Array3D` a join or stack operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendFace {
    XNeg,
    XPos,
    YNeg,
    YPos,
    ZNeg,
    ZPos,
}

/// A 3D grid of cubic compartments connected to their 6 face neighbors.
#[derive(Debug, Clone)]
pub struct Array3D {
    pub array_id: String,
    pub box_len: (f64, f64, f64),
    pub periodic: (bool, bool, bool),
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub compartments: BTreeMap<(usize, usize, usize), Compartment>,
}

impl Array3D {
    pub fn new(
        array_id: impl Into<String>,
        x_pos: &[f64],
        y_pos: &[f64],
        z_pos: &[f64],
        conn_type: &Connection,
        periodic: (bool, bool, bool),
    ) -> Self {
        let array_id = array_id.into();
        let nx = x_pos.len() - 1;
        let ny = y_pos.len() - 1;
        let nz = z_pos.len() - 1;
        let box_len = (x_pos[nx] - x_pos[0], y_pos[ny] - y_pos[0], z_pos[nz] - z_pos[0]);

        let mut compartments = BTreeMap::new();
        for i in 0..nx {
            let lx = x_pos[i + 1] - x_pos[i];
            for j in 0..ny {
                let ly = y_pos[j + 1] - y_pos[j];
                for k in 0..nz {
                    let lz = z_pos[k + 1] - z_pos[k];
                    let mut surface_area = BTreeMap::new();
                    surface_area.insert(FaceKey::Xy, lx * ly);
                    surface_area.insert(FaceKey::Yz, ly * lz);
                    surface_area.insert(FaceKey::Xz, lx * lz);
                    let extent = Extent::Volumetric {
                        x: (x_pos[i], x_pos[i + 1]),
                        y: (y_pos[j], y_pos[j + 1]),
                        z: (z_pos[k], z_pos[k + 1]),
                        surface_area,
                    };
                    compartments.insert(
                        (i, j, k),
                        Compartment::new(join_indices(&[i, j, k]), extent, Some(array_id.clone())),
                    );
                }
            }
        }

        let mut arr = Array3D { array_id, box_len, periodic, nx, ny, nz, compartments };
        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    if i > 0 {
                        arr.wire((i, j, k), (i - 1, j, k), conn_type);
                    }
                    if i < nx - 1 {
                        arr.wire((i, j, k), (i + 1, j, k), conn_type);
                    }
                    if j > 0 {
                        arr.wire((i, j, k), (i, j - 1, k), conn_type);
                    }
                    if j < ny - 1 {
                        arr.wire((i, j, k), (i, j + 1, k), conn_type);
                    }
                    if k > 0 {
                        arr.wire((i, j, k), (i, j, k - 1), conn_type);
                    }
                    if k < nz - 1 {
                        arr.wire((i, j, k), (i, j, k + 1), conn_type);
                    }
                }
            }
        }
        if periodic.0 && nx > 1 {
            for j in 0..ny {
                for k in 0..nz {
                    arr.wire((0, j, k), (nx - 1, j, k), conn_type);
                    arr.wire((nx - 1, j, k), (0, j, k), conn_type);
                }
            }
        }
        if periodic.1 && ny > 1 {
            for i in 0..nx {
                for k in 0..nz {
                    arr.wire((i, 0, k), (i, ny - 1, k), conn_type);
                    arr.wire((i, ny - 1, k), (i, 0, k), conn_type);
                }
            }
        }
        if periodic.2 && nz > 1 {
            for i in 0..nx {
                for j in 0..ny {
                    arr.wire((i, j, 0), (i, j, nz - 1), conn_type);
                    arr.wire((i, j, nz - 1), (i, j, 0), conn_type);
                }
            }
        }
        arr
    }

    fn wire(&mut self, from: (usize, usize, usize), to: (usize, usize, usize), conn_type: &Connection) {
        let neighbor_id = self.compartments[&to].flat_id();
        self.compartments.get_mut(&from).unwrap().connect(neighbor_id, conn_type.clone(), true);
    }

    /// Joins `other` to one face of this array. `append_side` names the
    /// face of `self` that adjoins `other`; the opposite face of
    /// `other` is used.
    pub fn join3d(
        &mut self,
        other: &mut Array3D,
        conn_type: &Connection,
        append_side: AppendFace,
    ) -> crate::error::Result<()> {
        let (face1, face2) = match append_side {
            AppendFace::XNeg | AppendFace::XPos => ((self.ny, self.nz), (other.ny, other.nz)),
            AppendFace::YNeg | AppendFace::YPos => ((self.nx, self.nz), (other.nx, other.nz)),
            AppendFace::ZNeg | AppendFace::ZPos => ((self.nx, self.ny), (other.nx, other.ny)),
        };
        if face1 != face2 {
            return Err(crate::error::RxnError::FaceShapeMismatch(face1, face2));
        }

        match append_side {
            AppendFace::XNeg | AppendFace::XPos => {
                let (xi, xo) =
                    if append_side == AppendFace::XNeg { (0, other.nx - 1) } else { (self.nx - 1, 0) };
                for j in 0..self.ny {
                    for k in 0..self.nz {
                        let other_id = other.compartments[&(xo, j, k)].flat_id();
                        self.compartments.get_mut(&(xi, j, k)).unwrap().connect(other_id, conn_type.clone(), true);
                        let self_id = self.compartments[&(xi, j, k)].flat_id();
                        other.compartments.get_mut(&(xo, j, k)).unwrap().connect(self_id, conn_type.clone(), true);
                    }
                }
            }
            AppendFace::YNeg | AppendFace::YPos => {
                let (yi, yo) =
                    if append_side == AppendFace::YNeg { (0, other.ny - 1) } else { (self.ny - 1, 0) };
                for i in 0..self.nx {
                    for k in 0..self.nz {
                        let other_id = other.compartments[&(i, yo, k)].flat_id();
                        self.compartments.get_mut(&(i, yi, k)).unwrap().connect(other_id, conn_type.clone(), true);
                        let self_id = self.compartments[&(i, yi, k)].flat_id();
                        other.compartments.get_mut(&(i, yo, k)).unwrap().connect(self_id, conn_type.clone(), true);
                    }
                }
            }
            AppendFace::ZNeg | AppendFace::ZPos => {
                let (zi, zo) =
                    if append_side == AppendFace::ZNeg { (0, other.nz - 1) } else { (self.nz - 1, 0) };
                for i in 0..self.nx {
                    for j in 0..self.ny {
                        let other_id = other.compartments[&(i, j, zo)].flat_id();
                        self.compartments.get_mut(&(i, j, zi)).unwrap().connect(other_id, conn_type.clone(), true);
                        let self_id = self.compartments[&(i, j, zi)].flat_id();
                        other.compartments.get_mut(&(i, j, zo)).unwrap().connect(self_id, conn_type.clone(), true);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn add_rxn_to_array(&mut self, rxn: &Reaction) -> crate::error::Result<()> {
        add_rxn_to_array(self.compartments.values_mut(), rxn)
    }

    pub fn change_all_intra_connection_type(&mut self, new_ctype: &Connection) {
        let prefix = array_prefix(&self.array_id);
        change_connections_matching(self.compartments.values_mut(), &prefix, new_ctype);
    }

    pub fn change_all_inter_connection_type(&mut self, other_array_id: &str, new_ctype: &Connection) {
        let prefix = array_prefix(other_array_id);
        change_connections_matching(self.compartments.values_mut(), &prefix, new_ctype);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array1d_wires_interior_neighbors_but_not_ends() {
        let conn = Connection::isotropic_scalar("A", 0.1);
        let arr = Array1D::new("bulk", &[0.0, 1.0, 2.0, 3.0], &conn, false);
        assert_eq!(arr.n, 3);
        assert_eq!(arr.compartments[&0].connections.len(), 1);
        assert_eq!(arr.compartments[&1].connections.len(), 2);
        assert_eq!(arr.compartments[&2].connections.len(), 1);
    }

    #[test]
    fn array1d_periodic_wraps_ends() {
        let conn = Connection::isotropic_scalar("A", 0.1);
        let arr = Array1D::new("ring", &[0.0, 1.0, 2.0, 3.0], &conn, true);
        assert_eq!(arr.compartments[&0].connections.len(), 2);
        assert_eq!(arr.compartments[&2].connections.len(), 2);
    }

    #[test]
    fn array3d_face_mismatch_is_rejected() {
        let conn = Connection::isotropic_scalar("A", 0.1);
        let mut a = Array3D::new("a", &[0.0, 1.0, 2.0], &[0.0, 1.0], &[0.0, 1.0], &conn, (false, false, false));
        let mut b = Array3D::new("b", &[0.0, 1.0], &[0.0, 1.0, 2.0, 3.0], &[0.0, 1.0], &conn, (false, false, false));
        assert!(a.join3d(&mut b, &conn, AppendFace::XPos).is_err());
    }
}
