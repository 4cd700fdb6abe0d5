// ─────────────────────────────────────────────────────────────────────
// Morph Kernel — Solver Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Type definitions, rig definition schemas, and error hierarchy for the
//! Morph Kernel — a blendshape combination solver for deformable rigs.

pub mod definition;
pub mod error;

pub use definition::{
    ComboDef, ControlKind, CtrlRef, FloaterDef, Interp, ProgressionDef, RigDefinition, SliderDef,
    TraversalDef,
};
pub use error::{MorphError, MorphResult};

/// Tolerance for near-zero comparisons throughout the solver.
pub const EPS: f64 = 1e-6;

/// Maximum ULP distance for boundary classification in the triangulation.
pub const ULPS: i64 = 4;

/// Clamping ceiling for rectified slider magnitudes.
pub const MAXVAL: f64 = 1.0;
