// ─────────────────────────────────────────────────────────────────────
// Morph Kernel — Rig Solver (Build + Solve Orchestrator)
// ─────────────────────────────────────────────────────────────────────
//! Arena owner and solve-pipeline orchestrator.
//!
//! `RigSolver` owns every entity; cross-references are typed indices, so
//! nothing dangles and nothing is pointer-shaped. One solve pass:
//!   1. Clear every controller's scratch pair
//!   2. Rectify the raw input
//!   3. Store slider values
//!   4. Store combo values
//!   5. Evaluate the TriSpaces → floater values
//!   6. Store traversal values (topological order)
//!   7. Accumulate sliders, combos, floaters, traversals into the
//!      output weight vector, in stored index order

use morph_trispace::{build_spaces, FloaterSpec, TriSpace};
use morph_types::{ControlKind, CtrlRef, MorphError, MorphResult, RigDefinition};

use crate::controller::{Combo, Floater, Slider, Traversal};
use crate::progression::Progression;
use crate::rectify::rectify;
use crate::shape::Shape;

/// Top-level aggregator: owns the entity graph, answers `solve`.
///
/// Not safe for concurrent solves — callers wanting parallelism keep
/// one instance per thread.
#[derive(Debug, Default)]
pub struct RigSolver {
    shapes: Vec<Shape>,
    progs: Vec<Progression>,
    sliders: Vec<Slider>,
    combos: Vec<Combo>,
    traversals: Vec<Traversal>,
    floaters: Vec<Floater>,
    spaces: Vec<TriSpace>,
    /// Traversal evaluation order: referenced before referencing.
    traversal_order: Vec<usize>,

    /// True once an entity graph has been built successfully.
    pub built: bool,
    /// True once a JSON document has been ingested (even if the build
    /// then failed).
    pub loaded: bool,
    pub has_parse_error: bool,
    pub parse_error: String,
    pub parse_error_offset: usize,
}

impl RigSolver {
    /// An empty, unbuilt solver. `solve` returns an empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest a JSON rig definition (either schema version).
    ///
    /// Never panics and never returns an error: any failure — malformed
    /// JSON, dangling reference, traversal cycle — leaves the solver in
    /// a degenerate empty state with the parse status set.
    pub fn from_json(src: &str) -> Self {
        let result = RigDefinition::from_json(src).and_then(Self::from_definition);
        match result {
            Ok(mut solver) => {
                solver.loaded = true;
                solver
            }
            Err(e) => {
                log::error!("rig construction failed: {e}");
                let mut solver = Self::new();
                solver.loaded = true;
                solver.has_parse_error = true;
                solver.parse_error = e.to_string();
                if let MorphError::Parse { offset, .. } = e {
                    solver.parse_error_offset = offset;
                }
                solver
            }
        }
    }

    /// Build the entity graph from a schema-normalised definition.
    pub fn from_definition(def: RigDefinition) -> MorphResult<Self> {
        def.validate()?;

        let shapes: Vec<Shape> = def
            .shapes
            .iter()
            .enumerate()
            .map(|(i, name)| Shape::new(name.clone(), i))
            .collect();

        let progs: Vec<Progression> = def
            .progressions
            .iter()
            .map(|p| Progression::new(p.name.clone(), &p.knots, p.interp))
            .collect::<MorphResult<_>>()?;

        let sliders: Vec<Slider> = def
            .sliders
            .iter()
            .enumerate()
            .map(|(i, s)| Slider::new(s.name.clone(), s.progression_index, i))
            .collect();

        let combos: Vec<Combo> = def
            .combos
            .iter()
            .map(|c| {
                Combo::new(
                    c.name.clone(),
                    c.progression_index,
                    c.exact,
                    c.pairs.clone(),
                )
            })
            .collect();

        let traversals: Vec<Traversal> = def
            .traversals
            .iter()
            .map(|t| {
                Traversal::new(
                    t.name.clone(),
                    t.progression_index,
                    t.progress_ctrl,
                    t.multiplier_ctrl,
                )
            })
            .collect();

        let traversal_order = order_traversals(&traversals)?;

        let floaters: Vec<Floater> = def
            .floaters
            .iter()
            .map(|f| Floater::new(f.name.clone(), f.progression_index, f.pairs.clone()))
            .collect();

        let specs: Vec<FloaterSpec> = floaters
            .iter()
            .enumerate()
            .map(|(id, f)| FloaterSpec {
                id,
                sliders: f.states().iter().map(|&(s, _)| s).collect(),
                targets: f.states().iter().map(|&(_, t)| t).collect(),
            })
            .collect();
        let spaces = build_spaces(&specs);

        log::debug!(
            "built rig: {} shapes, {} progressions, {} sliders, {} combos, {} traversals, {} floaters in {} spaces",
            shapes.len(),
            progs.len(),
            sliders.len(),
            combos.len(),
            traversals.len(),
            floaters.len(),
            spaces.len()
        );

        Ok(Self {
            shapes,
            progs,
            sliders,
            combos,
            traversals,
            floaters,
            spaces,
            traversal_order,
            built: true,
            loaded: false,
            has_parse_error: false,
            parse_error: String::new(),
            parse_error_offset: 0,
        })
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn slider_count(&self) -> usize {
        self.sliders.len()
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn sliders_mut(&mut self) -> &mut [Slider] {
        &mut self.sliders
    }

    pub fn combos_mut(&mut self) -> &mut [Combo] {
        &mut self.combos
    }

    /// Reset every controller's scratch pair. Idempotent.
    pub fn clear_values(&mut self) {
        for s in &mut self.sliders {
            s.core.clear();
        }
        for c in &mut self.combos {
            c.core.clear();
        }
        for t in &mut self.traversals {
            t.core.clear();
        }
        for f in &mut self.floaters {
            f.core.clear();
        }
    }

    /// Override every combo's resolution mode.
    pub fn set_exact_solve(&mut self, exact: bool) {
        for combo in &mut self.combos {
            combo.set_exact(exact);
        }
    }

    fn ctrl_value(&self, r: CtrlRef) -> f64 {
        match r.kind {
            ControlKind::Slider => self.sliders[r.index].core.value(),
            ControlKind::Combo => self.combos[r.index].core.value(),
            ControlKind::Traversal => self.traversals[r.index].core.value(),
        }
    }

    /// Map one raw slider vector to the shape weight vector.
    ///
    /// An unbuilt solver answers with the empty zero vector; a built one
    /// rejects mis-sized input with a `Dimension` error and leaves no
    /// state behind otherwise (the scratch fields are cleared on entry
    /// of every pass).
    pub fn solve(&mut self, raw: &[f64]) -> MorphResult<Vec<f64>> {
        if !self.built {
            return Ok(vec![0.0; self.shapes.len()]);
        }
        if raw.len() != self.sliders.len() {
            return Err(MorphError::Dimension {
                expected: self.sliders.len(),
                got: raw.len(),
            });
        }

        self.clear_values();
        let ctx = rectify(raw);

        for slider in &mut self.sliders {
            slider.store_value(&ctx);
        }
        for combo in &mut self.combos {
            combo.store_value(&ctx);
        }

        for space in &self.spaces {
            // Reduce the input to the space's orthant: a slider pushed
            // against the orthant sign contributes a zero coordinate.
            let point: Vec<f64> = space
                .dims()
                .iter()
                .zip(space.signs())
                .map(|(&dim, &negative)| {
                    if ctx.inverses[dim] == negative {
                        ctx.values[dim]
                    } else {
                        0.0
                    }
                })
                .collect();
            for (id, weight) in space.evaluate(&point) {
                self.floaters[id].core.value = weight;
            }
        }

        for k in 0..self.traversal_order.len() {
            let ti = self.traversal_order[k];
            let progress = self.ctrl_value(self.traversals[ti].progress_ctrl);
            let multiplier = self.ctrl_value(self.traversals[ti].multiplier_ctrl);
            let trav = &mut self.traversals[ti];
            trav.core.value = progress;
            trav.core.multiplier = multiplier;
        }

        let mut accumulator = vec![0.0; self.shapes.len()];
        for slider in &self.sliders {
            slider.core.solve_into(&self.progs, &mut accumulator);
        }
        for combo in &self.combos {
            combo.core.solve_into(&self.progs, &mut accumulator);
        }
        for floater in &self.floaters {
            floater.core.solve_into(&self.progs, &mut accumulator);
        }
        for trav in &self.traversals {
            trav.core.solve_into(&self.progs, &mut accumulator);
        }
        Ok(accumulator)
    }
}

/// Topological order over traversal→traversal references (Kahn's
/// algorithm). Sliders and combos are stored before any traversal runs,
/// so only edges between traversals constrain the order.
fn order_traversals(traversals: &[Traversal]) -> MorphResult<Vec<usize>> {
    let n = traversals.len();
    let mut indegree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

    for (i, trav) in traversals.iter().enumerate() {
        for r in [trav.progress_ctrl, trav.multiplier_ctrl] {
            if r.kind == ControlKind::Traversal {
                if r.index == i {
                    return Err(MorphError::Cycle(format!(
                        "traversal {:?} references itself",
                        trav.core.name()
                    )));
                }
                indegree[i] += 1;
                dependents[r.index].push(i);
            }
        }
    }

    let mut queue: Vec<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    let mut head = 0;
    while head < queue.len() {
        let i = queue[head];
        head += 1;
        order.push(i);
        for &dep in &dependents[i] {
            indegree[dep] -= 1;
            if indegree[dep] == 0 {
                queue.push(dep);
            }
        }
    }

    if order.len() != n {
        let stuck: Vec<&str> = (0..n)
            .filter(|&i| indegree[i] > 0)
            .map(|i| traversals[i].core.name())
            .collect();
        return Err(MorphError::Cycle(format!(
            "traversal cycle through {stuck:?}"
        )));
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use morph_types::{
        ComboDef, FloaterDef, Interp, ProgressionDef, SliderDef, TraversalDef,
    };

    fn prog(name: &str, knots: &[(usize, f64)]) -> ProgressionDef {
        ProgressionDef {
            name: name.to_string(),
            knots: knots.to_vec(),
            interp: Interp::Linear,
        }
    }

    fn slider(name: &str, prog: usize) -> SliderDef {
        SliderDef {
            name: name.to_string(),
            progression_index: prog,
        }
    }

    /// One slider driving one shape through the identity progression.
    fn identity_rig() -> RigDefinition {
        RigDefinition {
            shapes: vec!["A".to_string()],
            progressions: vec![prog("pA", &[(0, 1.0)])],
            sliders: vec![slider("a", 0)],
            ..Default::default()
        }
    }

    /// Sliders a, b on shapes A, B plus combo ab on shape AB.
    fn combo_rig(exact: bool) -> RigDefinition {
        RigDefinition {
            shapes: vec!["A".to_string(), "B".to_string(), "AB".to_string()],
            progressions: vec![
                prog("pA", &[(0, 1.0)]),
                prog("pB", &[(1, 1.0)]),
                prog("pAB", &[(2, 1.0)]),
            ],
            sliders: vec![slider("a", 0), slider("b", 1)],
            combos: vec![ComboDef {
                name: "ab".to_string(),
                progression_index: 2,
                exact,
                pairs: vec![(0, 1.0), (1, 1.0)],
            }],
            ..Default::default()
        }
    }

    // ── Scenarios ─────────────────────────────────────────────────

    #[test]
    fn test_single_slider_identity() {
        let mut rig = RigSolver::from_definition(identity_rig()).unwrap();
        assert_eq!(rig.solve(&[0.5]).unwrap(), vec![0.5]);
        assert_eq!(rig.solve(&[-0.5]).unwrap(), vec![0.5]);
        assert_eq!(rig.solve(&[1.5]).unwrap(), vec![1.0]);
    }

    #[test]
    fn test_exact_combo() {
        let mut rig = RigSolver::from_definition(combo_rig(true)).unwrap();
        let out = rig.solve(&[0.8, 0.6]).unwrap();
        assert!((out[2] - 0.6).abs() < 1e-12, "AB = {}", out[2]);
        let out = rig.solve(&[0.8, -0.6]).unwrap();
        assert_eq!(out[2], 0.0, "sign mismatch mutes the combo");
        assert!((out[1] - 0.6).abs() < 1e-12, "slider B still fires");
    }

    #[test]
    fn test_smooth_combo() {
        let mut rig = RigSolver::from_definition(combo_rig(false)).unwrap();
        let out = rig.solve(&[0.8, 0.6]).unwrap();
        assert!((out[2] - 0.48).abs() < 1e-12, "AB = {}", out[2]);
    }

    #[test]
    fn test_set_exact_solve_overrides() {
        let mut rig = RigSolver::from_definition(combo_rig(true)).unwrap();
        rig.set_exact_solve(false);
        let out = rig.solve(&[0.8, 0.6]).unwrap();
        assert!((out[2] - 0.48).abs() < 1e-12);
    }

    #[test]
    fn test_traversal_progress_times_multiplier() {
        let def = RigDefinition {
            shapes: vec!["A".to_string(), "B".to_string(), "S".to_string()],
            progressions: vec![
                prog("pA", &[(0, 1.0)]),
                prog("pB", &[(1, 1.0)]),
                prog("pS", &[(2, 1.0)]),
            ],
            sliders: vec![slider("a", 0), slider("b", 1)],
            traversals: vec![TraversalDef {
                name: "t".to_string(),
                progression_index: 2,
                progress_ctrl: CtrlRef {
                    kind: ControlKind::Slider,
                    index: 0,
                },
                multiplier_ctrl: CtrlRef {
                    kind: ControlKind::Slider,
                    index: 1,
                },
            }],
            ..Default::default()
        };
        let mut rig = RigSolver::from_definition(def).unwrap();
        let out = rig.solve(&[0.5, 1.0]).unwrap();
        assert!((out[2] - 0.5).abs() < 1e-12, "S = {}", out[2]);
        // Half-strength multiplier scales the traversal output.
        let out = rig.solve(&[0.5, 0.5]).unwrap();
        assert!((out[2] - 0.25).abs() < 1e-12, "S = {}", out[2]);
    }

    #[test]
    fn test_floater_pair_barycentric() {
        let def = RigDefinition {
            shapes: vec!["F1".to_string(), "F2".to_string()],
            progressions: vec![prog("p1", &[(0, 1.0)]), prog("p2", &[(1, 1.0)])],
            sliders: vec![slider("a", 0), slider("b", 1)],
            floaters: vec![
                FloaterDef {
                    name: "f1".to_string(),
                    progression_index: 0,
                    pairs: vec![(0, 1.0), (1, 0.0)],
                },
                FloaterDef {
                    name: "f2".to_string(),
                    progression_index: 1,
                    pairs: vec![(0, 0.5), (1, 0.5)],
                },
            ],
            ..Default::default()
        };
        // The slider progressions point at the same shapes, so keep the
        // sliders disabled and watch the floaters alone.
        let mut rig = RigSolver::from_definition(def).unwrap();
        for s in rig.sliders_mut() {
            s.core.set_enabled(false);
        }
        let out = rig.solve(&[0.75, 0.25]).unwrap();
        assert!((out[0] - 0.5).abs() < 1e-9, "F1 = {}", out[0]);
        assert!((out[1] - 0.5).abs() < 1e-9, "F2 = {}", out[1]);
        // Away from the members, on a cube corner: floaters quiet.
        let out = rig.solve(&[0.0, 0.0]).unwrap();
        assert_eq!(out, vec![0.0, 0.0]);
    }

    #[test]
    fn test_dangling_reference_sets_parse_status() {
        let src = r#"{
            "encoding_version": 2,
            "shapes": ["A"],
            "progressions": [{"name": "p", "knots": [[0, 1.0]], "interp": "linear"}],
            "sliders": [{"name": "s", "progression_index": 5}]
        }"#;
        let mut rig = RigSolver::from_json(src);
        assert!(!rig.built);
        assert!(rig.loaded);
        assert!(rig.has_parse_error);
        assert!(rig.parse_error.contains("progression"));
        assert_eq!(rig.solve(&[]).unwrap(), Vec::<f64>::new());
        assert_eq!(rig.solve(&[0.5, 0.5]).unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn test_malformed_json_sets_offset() {
        let rig = RigSolver::from_json("{\n  \"shapes\": [,]\n}");
        assert!(rig.has_parse_error);
        assert!(rig.parse_error_offset > 0);
        assert!(!rig.built);
    }

    // ── Invariants ────────────────────────────────────────────────

    #[test]
    fn test_output_length_matches_shapes() {
        let mut rig = RigSolver::from_definition(combo_rig(true)).unwrap();
        assert_eq!(rig.solve(&[0.1, 0.2]).unwrap().len(), rig.shape_count());
    }

    #[test]
    fn test_zero_in_zero_out() {
        let mut rig = RigSolver::from_definition(combo_rig(true)).unwrap();
        assert_eq!(rig.solve(&[0.0, 0.0]).unwrap(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_solve_is_pure() {
        let mut rig = RigSolver::from_definition(combo_rig(false)).unwrap();
        let a = rig.solve(&[0.3, 0.9]).unwrap();
        let b = rig.solve(&[0.3, 0.9]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sign_symmetry() {
        let def = RigDefinition {
            shapes: vec!["Neg".to_string(), "Pos".to_string()],
            progressions: vec![prog("p", &[(0, -1.0), (1, 1.0)])],
            sliders: vec![slider("a", 0)],
            ..Default::default()
        };
        let mut rig = RigSolver::from_definition(def).unwrap();
        let pos = rig.solve(&[1.0]).unwrap();
        let neg = rig.solve(&[-1.0]).unwrap();
        assert_eq!(pos, vec![0.0, 1.0]);
        assert_eq!(neg, vec![1.0, 0.0]);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut rig = RigSolver::from_definition(identity_rig()).unwrap();
        let err = rig.solve(&[0.5, 0.5]).unwrap_err();
        assert!(matches!(
            err,
            MorphError::Dimension {
                expected: 1,
                got: 2
            }
        ));
    }

    #[test]
    fn test_clear_values_idempotent() {
        let mut rig = RigSolver::from_definition(combo_rig(true)).unwrap();
        rig.solve(&[0.5, 0.5]).unwrap();
        rig.clear_values();
        rig.clear_values();
        let out = rig.solve(&[0.5, 0.5]).unwrap();
        assert!((out[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_nan_input_is_zero() {
        let mut rig = RigSolver::from_definition(identity_rig()).unwrap();
        assert_eq!(rig.solve(&[f64::NAN]).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_disabled_slider_is_silent() {
        let mut rig = RigSolver::from_definition(identity_rig()).unwrap();
        rig.sliders_mut()[0].core.set_enabled(false);
        assert_eq!(rig.solve(&[0.9]).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_disabled_combo_leaves_sliders_alone() {
        let mut rig = RigSolver::from_definition(combo_rig(true)).unwrap();
        rig.combos_mut()[0].core.set_enabled(false);
        let out = rig.solve(&[0.8, 0.6]).unwrap();
        assert_eq!(out[2], 0.0);
        assert!((out[0] - 0.8).abs() < 1e-12);
        assert!((out[1] - 0.6).abs() < 1e-12);
    }

    // ── Traversal ordering ────────────────────────────────────────

    fn chained_traversal_rig(progress_of_t1: CtrlRef) -> RigDefinition {
        RigDefinition {
            shapes: vec!["A".to_string(), "T0".to_string(), "T1".to_string()],
            progressions: vec![
                prog("pA", &[(0, 1.0)]),
                prog("pT0", &[(1, 1.0)]),
                prog("pT1", &[(2, 1.0)]),
            ],
            sliders: vec![slider("a", 0)],
            traversals: vec![
                TraversalDef {
                    name: "t0".to_string(),
                    progression_index: 1,
                    progress_ctrl: CtrlRef {
                        kind: ControlKind::Slider,
                        index: 0,
                    },
                    multiplier_ctrl: CtrlRef {
                        kind: ControlKind::Slider,
                        index: 0,
                    },
                },
                TraversalDef {
                    name: "t1".to_string(),
                    progression_index: 2,
                    progress_ctrl: progress_of_t1,
                    multiplier_ctrl: CtrlRef {
                        kind: ControlKind::Slider,
                        index: 0,
                    },
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_traversal_chain_resolves_in_order() {
        let def = chained_traversal_rig(CtrlRef {
            kind: ControlKind::Traversal,
            index: 0,
        });
        let mut rig = RigSolver::from_definition(def).unwrap();
        let out = rig.solve(&[0.5]).unwrap();
        // Both traverse at value 0.5 (t1 reads t0's stored value, not
        // its emitted weight) scaled by the 0.5 multiplier.
        assert!((out[1] - 0.25).abs() < 1e-12, "T0 = {}", out[1]);
        assert!((out[2] - 0.25).abs() < 1e-12, "T1 = {}", out[2]);
    }

    #[test]
    fn test_traversal_self_reference_is_cycle() {
        let def = chained_traversal_rig(CtrlRef {
            kind: ControlKind::Traversal,
            index: 1,
        });
        let err = RigSolver::from_definition(def).unwrap_err();
        assert!(matches!(err, MorphError::Cycle(_)), "got {err:?}");
    }

    #[test]
    fn test_traversal_cycle_rejected() {
        // t0 ← t1 and t1 ← t0.
        let mut def = chained_traversal_rig(CtrlRef {
            kind: ControlKind::Traversal,
            index: 0,
        });
        def.traversals[0].progress_ctrl = CtrlRef {
            kind: ControlKind::Traversal,
            index: 1,
        };
        let err = RigSolver::from_definition(def).unwrap_err();
        assert!(matches!(err, MorphError::Cycle(_)), "got {err:?}");
    }

    // ── End-to-end JSON ───────────────────────────────────────────

    #[test]
    fn test_v1_json_end_to_end() {
        let src = r#"{
            "shapes": ["A", "B"],
            "progressions": [["pA", [[0, 1.0]], "linear"], ["pB", [[1, 1.0]], "linear"]],
            "sliders": [["a", 0], ["b", 1]]
        }"#;
        let mut rig = RigSolver::from_json(src);
        assert!(rig.built);
        assert!(!rig.has_parse_error);
        let out = rig.solve(&[0.25, 0.75]).unwrap();
        assert_eq!(out, vec![0.25, 0.75]);
    }

    #[test]
    fn test_v2_json_end_to_end() {
        let src = r#"{
            "encoding_version": 2,
            "shapes": ["A", "B", "AB"],
            "progressions": [
                {"name": "pA", "knots": [[0, 1.0]], "interp": "linear"},
                {"name": "pB", "knots": [[1, 1.0]], "interp": "linear"},
                {"name": "pAB", "knots": [[2, 1.0]], "interp": "linear"}
            ],
            "sliders": [
                {"name": "a", "progression_index": 0},
                {"name": "b", "progression_index": 1}
            ],
            "combos": [{
                "name": "ab",
                "progression_index": 2,
                "exact": true,
                "pairs": [[0, 1.0], [1, 1.0]]
            }]
        }"#;
        let mut rig = RigSolver::from_json(src);
        assert!(rig.built, "parse error: {}", rig.parse_error);
        let out = rig.solve(&[1.0, 1.0]).unwrap();
        assert_eq!(out, vec![1.0, 1.0, 1.0]);
    }
}
