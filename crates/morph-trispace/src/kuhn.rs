// ─────────────────────────────────────────────────────────────────────
// Morph Kernel — Canonical Simplex Encoding
// ─────────────────────────────────────────────────────────────────────
//! Kuhn triangulation of the unit d-cube.
//!
//! The cube splits into d! corner simplices, one per axis permutation:
//! the simplex for π holds the points with x_{π(0)} ≥ x_{π(1)} ≥ … ≥
//! x_{π(d−1)}. A permutation doubles as the simplex encoding; corners
//! are cube vertices expressed as axis bitmasks.

use crate::numeric::near;

/// Canonical simplex containing `p`: axes sorted by coordinate,
/// descending, stable by axis index on exact ties.
pub fn point_to_simplex(p: &[f64]) -> Vec<usize> {
    let mut axes: Vec<usize> = (0..p.len()).collect();
    axes.sort_by(|&a, &b| p[b].partial_cmp(&p[a]).unwrap_or(std::cmp::Ordering::Equal));
    axes
}

/// The d+1 corners of a canonical simplex as cube-vertex bitmasks:
/// the running unions of the permutation's axes, origin first.
pub fn simplex_corners(perm: &[usize]) -> Vec<u32> {
    let mut corners = Vec::with_capacity(perm.len() + 1);
    let mut mask = 0u32;
    corners.push(mask);
    for &axis in perm {
        mask |= 1 << axis;
        corners.push(mask);
    }
    corners
}

/// Coordinates of a cube vertex bitmask in d dimensions.
pub fn corner_coords(mask: u32, dims: usize) -> Vec<f64> {
    (0..dims)
        .map(|axis| if mask & (1 << axis) != 0 { 1.0 } else { 0.0 })
        .collect()
}

/// Every canonical simplex whose closure contains `p`.
///
/// Coordinates equal within tolerance are interchangeable in the
/// descending sort, so each run of near-equal coordinates contributes
/// all of its orderings. The stable-sorted permutation comes first.
pub fn adjacent_simplices(p: &[f64]) -> Vec<Vec<usize>> {
    let primary = point_to_simplex(p);

    // Runs of near-equal coordinates in the sorted order
    let mut runs: Vec<Vec<usize>> = Vec::new();
    for &axis in &primary {
        match runs.last_mut() {
            Some(run) if near(p[run[0]], p[axis]) => run.push(axis),
            _ => runs.push(vec![axis]),
        }
    }

    let mut out: Vec<Vec<usize>> = vec![Vec::with_capacity(p.len())];
    for run in &runs {
        let perms = permutations(run);
        let mut next = Vec::with_capacity(out.len() * perms.len());
        for prefix in &out {
            for perm in &perms {
                let mut combined = prefix.clone();
                combined.extend_from_slice(perm);
                next.push(combined);
            }
        }
        out = next;
    }
    out
}

/// All orderings of `items`, identity first.
fn permutations(items: &[usize]) -> Vec<Vec<usize>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for (i, &head) in items.iter().enumerate() {
        let mut rest: Vec<usize> = items.to_vec();
        rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head);
            out.push(tail);
        }
    }
    out
}
