// ─────────────────────────────────────────────────────────────────────
// Morph Kernel — Progression Curves
// ─────────────────────────────────────────────────────────────────────
//! 1-D interpolation curves over (shape, t) knots.
//!
//! Given a driving scalar and a multiplier, a progression emits a list
//! of (shape index, weight) pairs. Two interpolation modes: piecewise
//! linear, and a Catmull-Rom cubic with reflected end control points.
//!
//! A shapeless *rest knot* is inserted at t = 0 when the definition has
//! none there, so a single-knot progression `[(A, 1.0)]` produces the
//! identity ramp, and two-sided progressions stay quiet at rest. Weight
//! attributed to the rest knot is discarded.

use morph_types::{Interp, MorphError, MorphResult, EPS};

#[derive(Debug, Clone)]
struct Knot {
    /// None marks the synthetic rest knot.
    shape: Option<usize>,
    t: f64,
}

/// One interpolation curve over sorted knots.
#[derive(Debug, Clone)]
pub struct Progression {
    name: String,
    knots: Vec<Knot>,
    interp: Interp,
    /// True when the curve extends into negative t: the drive keeps its
    /// sign so the two half-axes address different knots. Single-sided
    /// curves are driven by the magnitude instead.
    signed: bool,
}

impl Progression {
    /// Build from definition knots. Sorts by t, injects the rest knot,
    /// and rejects duplicate t values.
    pub fn new(
        name: impl Into<String>,
        def_knots: &[(usize, f64)],
        interp: Interp,
    ) -> MorphResult<Self> {
        let name = name.into();
        if def_knots.is_empty() {
            return Err(MorphError::Definition(format!(
                "progression {name:?} has no knots"
            )));
        }

        let mut knots: Vec<Knot> = def_knots
            .iter()
            .map(|&(shape, t)| Knot {
                shape: Some(shape),
                t,
            })
            .collect();
        knots.sort_by(|a, b| a.t.partial_cmp(&b.t).unwrap_or(std::cmp::Ordering::Equal));

        if knots.windows(2).any(|w| (w[1].t - w[0].t).abs() < EPS) {
            return Err(MorphError::Definition(format!(
                "progression {name:?} has duplicate knot parameters"
            )));
        }

        let signed = knots.first().map_or(false, |k| k.t < -EPS);

        if !knots.iter().any(|k| k.t.abs() <= EPS) {
            let rest = Knot {
                shape: None,
                t: 0.0,
            };
            let pos = knots.partition_point(|k| k.t < 0.0);
            knots.insert(pos, rest);
        }

        Ok(Self {
            name,
            knots,
            interp,
            signed,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interp(&self) -> Interp {
        self.interp
    }

    /// Evaluate the curve at drive value `t` scaled by `mul`.
    ///
    /// Pairs with |weight| < EPS and rest-knot pairs are dropped.
    pub fn output(&self, t: f64, mul: f64) -> Vec<(usize, f64)> {
        let drive = if self.signed { t } else { t.abs() };
        let weighted = match self.interp {
            Interp::Linear => self.linear_output(drive),
            Interp::Spline => self.spline_output(drive),
        };
        weighted
            .into_iter()
            .filter_map(|(shape, w)| {
                let w = w * mul;
                match shape {
                    Some(s) if w.abs() >= EPS => Some((s, w)),
                    _ => None,
                }
            })
            .collect()
    }

    /// Interval of `drive`, or the clamped end knot.
    fn locate(&self, drive: f64) -> Result<usize, usize> {
        let idx = self.knots.partition_point(|k| k.t <= drive);
        if idx == 0 {
            Err(0)
        } else if idx == self.knots.len() {
            Err(self.knots.len() - 1)
        } else {
            Ok(idx - 1)
        }
    }

    fn linear_output(&self, drive: f64) -> Vec<(Option<usize>, f64)> {
        match self.locate(drive) {
            Err(end) => vec![(self.knots[end].shape, 1.0)],
            Ok(i) => {
                let k0 = &self.knots[i];
                let k1 = &self.knots[i + 1];
                let u = (drive - k0.t) / (k1.t - k0.t);
                vec![(k0.shape, 1.0 - u), (k1.shape, u)]
            }
        }
    }

    /// Catmull-Rom over (k_{i-1}, k_i, k_{i+1}, k_{i+2}) at the local
    /// parameter u. A missing end control point is its reflection
    /// (P_{-1} = 2 P_0 - P_1), folded into the real end weights.
    fn spline_output(&self, drive: f64) -> Vec<(Option<usize>, f64)> {
        let i = match self.locate(drive) {
            Err(end) => return vec![(self.knots[end].shape, 1.0)],
            Ok(i) => i,
        };
        let k1 = &self.knots[i];
        let k2 = &self.knots[i + 1];
        let u = (drive - k1.t) / (k2.t - k1.t);

        let u2 = u * u;
        let u3 = u2 * u;
        let b0 = 0.5 * (-u3 + 2.0 * u2 - u);
        let mut b1 = 0.5 * (3.0 * u3 - 5.0 * u2 + 2.0);
        let mut b2 = 0.5 * (-3.0 * u3 + 4.0 * u2 + u);
        let b3 = 0.5 * (u3 - u2);

        let mut out = Vec::with_capacity(4);
        match i.checked_sub(1).and_then(|p| self.knots.get(p)) {
            Some(k0) => out.push((k0.shape, b0)),
            None => {
                b1 += 2.0 * b0;
                b2 -= b0;
            }
        }
        match self.knots.get(i + 2) {
            Some(k3) => out.push((k3.shape, b3)),
            None => {
                b2 += 2.0 * b3;
                b1 -= b3;
            }
        }
        out.push((k1.shape, b1));
        out.push((k2.shape, b2));
        out
    }
}
