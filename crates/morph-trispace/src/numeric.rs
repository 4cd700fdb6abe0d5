// ─────────────────────────────────────────────────────────────────────
// Morph Kernel — Dense Numeric Routines
// ─────────────────────────────────────────────────────────────────────
//! Small dense linear algebra for barycentric solves, plus the ULP
//! comparison used for boundary classification.
//!
//! Matrices are flat row-major `Vec<f64>`; systems stay tiny (a rig
//! rarely spans more than ~10 sliders per space), so a direct LU with
//! partial pivoting is both simple and fast.

use morph_types::{EPS, ULPS};

/// Pivot magnitude below which a system is treated as singular.
const PIVOT_TOL: f64 = 1e-12;

/// True when `a` and `b` are within `max_ulps` representable doubles.
///
/// Exact equality (including `+0 == -0`) short-circuits; values of
/// opposite sign are never ULP-equal; NaN is equal to nothing.
pub fn ulps_eq(a: f64, b: f64, max_ulps: i64) -> bool {
    if a == b {
        return true;
    }
    if a.is_nan() || b.is_nan() {
        return false;
    }
    if a.is_sign_positive() != b.is_sign_positive() {
        return false;
    }
    let ia = a.to_bits() as i64;
    let ib = b.to_bits() as i64;
    (ia - ib).abs() <= max_ulps
}

/// Boundary classification: absolute tolerance `EPS`, backed by a 4-ULP
/// check for values too large for the absolute test to be meaningful.
pub fn near(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPS || ulps_eq(a, b, ULPS)
}

/// Solve `a · x = b` in place for an n×n row-major matrix.
///
/// Performs LU factorisation with partial pivoting; `a` and `b` are
/// destroyed. Returns false when a pivot falls below tolerance (the
/// system is singular), in which case `b` is meaningless.
pub fn lu_solve(a: &mut [f64], b: &mut [f64], n: usize) -> bool {
    debug_assert_eq!(a.len(), n * n);
    debug_assert_eq!(b.len(), n);

    for col in 0..n {
        // Partial pivot: largest magnitude in this column at or below the diagonal
        let mut pivot_row = col;
        let mut pivot_mag = a[col * n + col].abs();
        for row in (col + 1)..n {
            let mag = a[row * n + col].abs();
            if mag > pivot_mag {
                pivot_mag = mag;
                pivot_row = row;
            }
        }
        if pivot_mag < PIVOT_TOL {
            return false;
        }
        if pivot_row != col {
            for k in 0..n {
                a.swap(col * n + k, pivot_row * n + k);
            }
            b.swap(col, pivot_row);
        }

        let pivot = a[col * n + col];
        for row in (col + 1)..n {
            let factor = a[row * n + col] / pivot;
            if factor == 0.0 {
                continue;
            }
            a[row * n + col] = 0.0;
            for k in (col + 1)..n {
                a[row * n + k] -= factor * a[col * n + k];
            }
            b[row] -= factor * b[col];
        }
    }

    // Back substitution
    for col in (0..n).rev() {
        let mut sum = b[col];
        for k in (col + 1)..n {
            sum -= a[col * n + k] * b[k];
        }
        b[col] = sum / a[col * n + col];
    }
    true
}

/// Barycentric coordinates of `p` against a d-simplex given by `corners`
/// (d+1 points of dimension d).
///
/// Solves the (d+1)×(d+1) system whose columns are the corners augmented
/// with the Σβ = 1 constraint row. Returns `None` for a degenerate
/// simplex (linearly dependent corners).
pub fn barycentric(corners: &[Vec<f64>], p: &[f64]) -> Option<Vec<f64>> {
    let d = p.len();
    debug_assert_eq!(corners.len(), d + 1);
    let n = d + 1;

    let mut a = vec![0.0; n * n];
    for (c, corner) in corners.iter().enumerate() {
        debug_assert_eq!(corner.len(), d);
        for (r, &coord) in corner.iter().enumerate() {
            a[r * n + c] = coord;
        }
        a[d * n + c] = 1.0;
    }

    let mut rhs = vec![0.0; n];
    rhs[..d].copy_from_slice(p);
    rhs[d] = 1.0;

    if lu_solve(&mut a, &mut rhs, n) {
        Some(rhs)
    } else {
        None
    }
}

/// True when every barycentric coordinate lies in `[-EPS, 1 + EPS]`,
/// i.e. the queried point is inside the simplex or on its boundary.
pub fn contains(coords: &[f64]) -> bool {
    coords.iter().all(|&b| (-EPS..=1.0 + EPS).contains(&b))
}
