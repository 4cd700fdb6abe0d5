// ─────────────────────────────────────────────────────────────────────
// Morph Kernel — Blendshape Combination Solver Core
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Entity graph and solve pipeline of the Morph Kernel.
//!
//! A rig maps a vector of animator-facing slider values to a vector of
//! blendshape weights. Between the two sit the compositional
//! controllers: progressions (1-D curves), combos (multi-slider
//! conjunctions), traversals (controller-driven drive × amplitude), and
//! floaters (barycentric coordinates inside a triangulated slider
//! subspace, provided by `morph-trispace`).
//!
//! Architecture:
//!   - Shape / Progression: terminal entities and their curves
//!   - Rectified / rectify: input normalisation
//!   - Slider / Combo / Traversal / Floater: controller variants
//!   - RigSolver: arena owner, build + solve orchestrator

pub mod controller;
pub mod progression;
pub mod rectify;
pub mod shape;
pub mod solver;

pub use controller::{Combo, ControllerCore, Floater, Slider, Traversal};
pub use progression::Progression;
pub use rectify::{rectify, Rectified};
pub use shape::Shape;
pub use solver::RigSolver;

pub use morph_types::{Interp, MorphError, MorphResult, RigDefinition, EPS, MAXVAL};
