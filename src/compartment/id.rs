//! Construction of fully-qualified flat compartment identifiers.

/// Joins a compartment's array id (if any) and its own id into the flat
/// identifier used as the key space of a `FlatModel`:
/// `{array_id}-{joined_indices}`, or just the bare id when there is no
/// owning array.
pub fn make_id(array_id: Option<&str>, comp_id: &str) -> String {
    match array_id {
        Some(a) => format!("{a}-{comp_id}"),
        None => comp_id.to_string(),
    }
}

/// Joins a tuple of grid indices with underscores, e.g. `(1, 2, 3)` ->
/// `"1_2_3"`.
pub fn join_indices(indices: &[usize]) -> String {
    indices.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("_")
}
