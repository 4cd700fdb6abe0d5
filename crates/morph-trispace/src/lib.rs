// ─────────────────────────────────────────────────────────────────────
// Morph Kernel — Triangulation Subsystem
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Piecewise-linear simplicial spaces over groups of floaters.
//!
//! A `TriSpace` tiles the unit cube of one slider orthant with the d!
//! canonical corner simplices (Kuhn triangulation), injects the member
//! floater points as extra vertices, and answers point-location queries
//! with barycentric weights for the members.
//!
//! Architecture:
//!   - numeric: ULP comparison, dense LU solve, barycentric coordinates
//!   - kuhn:    canonical simplex encoding and point location
//!   - space:   floater grouping, incremental subdivision, evaluation

pub mod kuhn;
pub mod numeric;
pub mod space;

pub use numeric::{barycentric, ulps_eq};
pub use space::{build_spaces, FloaterSpec, TriSpace};
