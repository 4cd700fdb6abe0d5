// ─────────────────────────────────────────────────────────────────────
// Morph Kernel — Shape Controllers
// ─────────────────────────────────────────────────────────────────────
//! The four controller variants — sliders, combos, traversals, and
//! floaters — as sibling structs over a shared `ControllerCore`.
//!
//! Each variant knows how to compute its (value, multiplier) scratch
//! pair from the rectified solve context; weight emission through the
//! progression is implemented once on the core. No class hierarchy:
//! cross-references are typed indices resolved by the owning solver.

use morph_types::{CtrlRef, EPS};

use crate::progression::Progression;
use crate::rectify::Rectified;

/// State shared by every controller variant.
#[derive(Debug, Clone)]
pub struct ControllerCore {
    name: String,
    enabled: bool,
    pub(crate) value: f64,
    pub(crate) multiplier: f64,
    /// Progression arena index.
    prog: usize,
}

impl ControllerCore {
    pub fn new(name: impl Into<String>, prog: usize) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            value: 0.0,
            multiplier: 1.0,
            prog,
        }
    }

    /// Reset the scratch pair to its pre-solve state.
    pub fn clear(&mut self) {
        self.value = 0.0;
        self.multiplier = 1.0;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Emit this controller's weighted shapes into the accumulator.
    /// Quiet or disabled controllers contribute nothing; no clamping
    /// is applied to the accumulator.
    pub fn solve_into(&self, progs: &[Progression], accumulator: &mut [f64]) {
        if !self.enabled || self.value.abs() < EPS {
            return;
        }
        for (shape, weight) in progs[self.prog].output(self.value, self.multiplier) {
            accumulator[shape] += weight;
        }
    }
}

/// Controller reading one input-vector position directly.
#[derive(Debug, Clone)]
pub struct Slider {
    pub core: ControllerCore,
    /// Input vector position (equal to the slider's arena index).
    input: usize,
}

impl Slider {
    pub fn new(name: impl Into<String>, prog: usize, input: usize) -> Self {
        Self {
            core: ControllerCore::new(name, prog),
            input,
        }
    }

    pub fn input(&self) -> usize {
        self.input
    }

    /// Sign-restored magnitude, so two-sided progressions can tell the
    /// half-axes apart. Never errors.
    pub fn store_value(&mut self, ctx: &Rectified) {
        let v = ctx.values[self.input];
        self.core.value = if ctx.inverses[self.input] { -v } else { v };
    }
}

/// Multi-slider conjunction: fires when every participating slider is
/// pushed toward its signed target.
#[derive(Debug, Clone)]
pub struct Combo {
    pub core: ControllerCore,
    exact: bool,
    /// (slider arena index, signed target) pairs.
    states: Vec<(usize, f64)>,
}

impl Combo {
    pub fn new(
        name: impl Into<String>,
        prog: usize,
        exact: bool,
        states: Vec<(usize, f64)>,
    ) -> Self {
        Self {
            core: ControllerCore::new(name, prog),
            exact,
            states,
        }
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }

    pub fn set_exact(&mut self, exact: bool) {
        self.exact = exact;
    }

    pub fn states(&self) -> &[(usize, f64)] {
        &self.states
    }

    /// Exact mode takes the minimum of the normalised participations
    /// (crisp, hard-edged); smooth mode takes their product. A slider
    /// pushed against its target's sign zeroes the combo either way.
    pub fn store_value(&mut self, ctx: &Rectified) {
        let mut value = if self.exact { f64::INFINITY } else { 1.0 };
        for &(slider, target) in &self.states {
            let w = if ctx.inverses[slider] != (target < 0.0) || target.abs() < EPS {
                0.0
            } else {
                (ctx.values[slider] / target.abs()).min(1.0)
            };
            if self.exact {
                value = value.min(w);
            } else {
                value *= w;
            }
        }
        self.core.value = if value.is_finite() { value } else { 0.0 };
    }
}

/// Controller whose drive and amplitude come from two other controllers.
#[derive(Debug, Clone)]
pub struct Traversal {
    pub core: ControllerCore,
    pub progress_ctrl: CtrlRef,
    pub multiplier_ctrl: CtrlRef,
}

impl Traversal {
    pub fn new(
        name: impl Into<String>,
        prog: usize,
        progress_ctrl: CtrlRef,
        multiplier_ctrl: CtrlRef,
    ) -> Self {
        Self {
            core: ControllerCore::new(name, prog),
            progress_ctrl,
            multiplier_ctrl,
        }
    }
}

/// Controller whose value is a barycentric coordinate assigned by the
/// owning `TriSpace` during the space stage.
#[derive(Debug, Clone)]
pub struct Floater {
    pub core: ControllerCore,
    /// (slider arena index, signed target) pairs.
    states: Vec<(usize, f64)>,
}

impl Floater {
    pub fn new(name: impl Into<String>, prog: usize, states: Vec<(usize, f64)>) -> Self {
        Self {
            core: ControllerCore::new(name, prog),
            states,
        }
    }

    pub fn states(&self) -> &[(usize, f64)] {
        &self.states
    }
}
