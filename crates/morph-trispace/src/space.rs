// ─────────────────────────────────────────────────────────────────────
// Morph Kernel — TriSpace Construction and Evaluation
// ─────────────────────────────────────────────────────────────────────
//! Groups orthant-coherent floaters, subdivides the canonical simplices
//! around their target points, and answers point-location queries with
//! one barycentric weight per member.
//!
//! Geometry lives in the magnitude cube [0, 1]^d of a single orthant;
//! the orthant's sign pattern is carried on the space and applied by the
//! caller when it reduces a rectified input to space coordinates.

use morph_types::{EPS, MAXVAL};

use crate::kuhn::{adjacent_simplices, corner_coords, simplex_corners};
use crate::numeric::{barycentric, contains};

/// Spaces above this dimension are rejected: the canonical tiling has d!
/// simplices and a rig never legitimately spans this many sliders.
const MAX_DIMS: usize = 16;

/// One floater as the geometry crate sees it: an opaque id plus the
/// signed targets of its slider states.
#[derive(Debug, Clone)]
pub struct FloaterSpec {
    pub id: usize,
    pub sliders: Vec<usize>,
    pub targets: Vec<f64>,
}

/// A member point inside one space: floater id + magnitude coordinates.
#[derive(Debug, Clone)]
struct Member {
    id: usize,
    coords: Vec<f64>,
}

/// A corner of a user simplex: either a cube vertex (axis bitmask) or a
/// member floater point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Corner {
    Cube(u32),
    Member(usize),
}

#[derive(Debug, Clone)]
struct UserSimplex {
    corners: Vec<Corner>,
    /// Degenerate simplices are kept for index stability but never match.
    singular: bool,
}

/// The triangulated subspace shared by one coherent group of floaters.
#[derive(Debug, Clone)]
pub struct TriSpace {
    /// Participating slider indices, ascending.
    dims: Vec<usize>,
    /// Half-axis per dimension: true = negative targets.
    signs: Vec<bool>,
    members: Vec<Member>,
    /// Per canonical simplex (permutation encoding), the ordered list of
    /// user simplices covering it. Only simplices touched by a member
    /// point carry an entry.
    simplex_map: Vec<(Vec<usize>, Vec<UserSimplex>)>,
}

impl TriSpace {
    fn new(dims: Vec<usize>, signs: Vec<bool>, members: Vec<Member>) -> Self {
        let simplex_map = triangulate(&members, dims.len());
        log::debug!(
            "trispace over sliders {:?}: {} members, {} canonical entries",
            dims,
            members.len(),
            simplex_map.len()
        );
        Self {
            dims,
            signs,
            members,
            simplex_map,
        }
    }

    /// Participating slider indices, ascending.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Half-axis signature per dimension: true = negative half.
    pub fn signs(&self) -> &[bool] {
        &self.signs
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    fn resolve(&self, corner: Corner) -> Vec<f64> {
        match corner {
            Corner::Cube(mask) => corner_coords(mask, self.dims.len()),
            Corner::Member(m) => self.members[m].coords.clone(),
        }
    }

    /// Barycentric weights of `point` for every member floater.
    ///
    /// Locates the canonical simplex (descending coordinate sort, then
    /// ε-adjacent neighbours for boundary points), walks its user
    /// simplices in stored order, and reads the winner's member-corner
    /// weights. Members off the winning simplex — and every member when
    /// nothing matches — weigh 0.
    pub fn evaluate(&self, point: &[f64]) -> Vec<(usize, f64)> {
        debug_assert_eq!(point.len(), self.dims.len());
        let mut out: Vec<(usize, f64)> =
            self.members.iter().map(|m| (m.id, 0.0)).collect();

        for perm in adjacent_simplices(point) {
            let Some((_, simps)) = self.simplex_map.iter().find(|(p, _)| *p == perm) else {
                continue;
            };
            for simp in simps {
                if simp.singular {
                    continue;
                }
                let corners: Vec<Vec<f64>> =
                    simp.corners.iter().map(|&c| self.resolve(c)).collect();
                let Some(beta) = barycentric(&corners, point) else {
                    continue;
                };
                if !contains(&beta) {
                    continue;
                }
                for (k, corner) in simp.corners.iter().enumerate() {
                    if let Corner::Member(m) = corner {
                        let w = beta[k];
                        out[*m].1 = if w.abs() < EPS { 0.0 } else { w.min(1.0) };
                    }
                }
                return out;
            }
        }
        out
    }
}

/// Subdivide every canonical simplex touched by a member point.
///
/// Points are inserted one at a time. Each insertion finds the first
/// containing user simplex and splits it: every corner whose barycentric
/// weight exceeds `EPS` is replaced, in turn, by the new point. Corners
/// at weight ~0 would produce zero-volume slivers and are not emitted.
fn triangulate(members: &[Member], dims: usize) -> Vec<(Vec<usize>, Vec<UserSimplex>)> {
    let mut map: Vec<(Vec<usize>, Vec<UserSimplex>)> = Vec::new();

    let resolve = |corner: Corner| -> Vec<f64> {
        match corner {
            Corner::Cube(mask) => corner_coords(mask, dims),
            Corner::Member(m) => members[m].coords.clone(),
        }
    };

    for (m_idx, member) in members.iter().enumerate() {
        for perm in adjacent_simplices(&member.coords) {
            let entry = match map.iter().position(|(p, _)| *p == perm) {
                Some(pos) => pos,
                None => {
                    let corners = simplex_corners(&perm)
                        .into_iter()
                        .map(Corner::Cube)
                        .collect();
                    map.push((
                        perm.clone(),
                        vec![UserSimplex {
                            corners,
                            singular: false,
                        }],
                    ));
                    map.len() - 1
                }
            };

            let simps = &mut map[entry].1;
            let mut split_at: Option<(usize, Vec<f64>)> = None;
            for (si, simp) in simps.iter_mut().enumerate() {
                if simp.singular {
                    continue;
                }
                let corners: Vec<Vec<f64>> =
                    simp.corners.iter().map(|&c| resolve(c)).collect();
                let Some(beta) = barycentric(&corners, &member.coords) else {
                    log::warn!(
                        "degenerate user simplex while inserting floater {}; skipping it",
                        member.id
                    );
                    simp.singular = true;
                    continue;
                };
                if contains(&beta) {
                    split_at = Some((si, beta));
                    break;
                }
            }

            if let Some((si, beta)) = split_at {
                let parent = simps[si].clone();
                let mut subs = Vec::new();
                for (k, &w) in beta.iter().enumerate() {
                    if w > EPS {
                        let mut corners = parent.corners.clone();
                        corners[k] = Corner::Member(m_idx);
                        subs.push(UserSimplex {
                            corners,
                            singular: false,
                        });
                    }
                }
                simps.splice(si..si + 1, subs);
            }
        }
    }

    // Validation sweep: a split near a face can still leave a sliver
    // whose corner matrix fails to factor.
    for (perm, simps) in &mut map {
        for simp in simps.iter_mut() {
            if simp.singular {
                continue;
            }
            let corners: Vec<Vec<f64>> = simp.corners.iter().map(|&c| resolve(c)).collect();
            if barycentric(&corners, &corners[0]).is_none() {
                log::warn!("singular user simplex in canonical {perm:?}; skipped at solve");
                simp.singular = true;
            }
        }
    }

    map
}

/// Group floaters by (slider span, orthant signature) and triangulate
/// one `TriSpace` per group.
///
/// A zero target sits on the orthant boundary and counts as positive.
/// Floaters listing a slider twice, or spanning more sliders than the
/// tiling supports, are excluded with a warning; their values stay 0
/// for every input.
pub fn build_spaces(specs: &[FloaterSpec]) -> Vec<TriSpace> {
    struct Group {
        dims: Vec<usize>,
        signs: Vec<bool>,
        members: Vec<Member>,
    }
    let mut groups: Vec<Group> = Vec::new();

    for spec in specs {
        let mut pairs: Vec<(usize, f64)> = spec
            .sliders
            .iter()
            .copied()
            .zip(spec.targets.iter().copied())
            .collect();
        pairs.sort_by_key(|&(slider, _)| slider);

        if pairs.is_empty() || pairs.len() > MAX_DIMS {
            log::warn!(
                "floater {} spans {} sliders; excluded from triangulation",
                spec.id,
                pairs.len()
            );
            continue;
        }
        if pairs.windows(2).any(|w| w[0].0 == w[1].0) {
            log::warn!(
                "floater {} lists a slider twice; excluded from triangulation",
                spec.id
            );
            continue;
        }

        let dims: Vec<usize> = pairs.iter().map(|&(s, _)| s).collect();
        let signs: Vec<bool> = pairs.iter().map(|&(_, t)| t < 0.0).collect();
        let member = Member {
            id: spec.id,
            coords: pairs.iter().map(|&(_, t)| t.abs().min(MAXVAL)).collect(),
        };

        match groups
            .iter_mut()
            .find(|g| g.dims == dims && g.signs == signs)
        {
            Some(group) => group.members.push(member),
            None => groups.push(Group {
                dims,
                signs,
                members: vec![member],
            }),
        }
    }

    groups
        .into_iter()
        .map(|g| TriSpace::new(g.dims, g.signs, g.members))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: usize, sliders: &[usize], targets: &[f64]) -> FloaterSpec {
        FloaterSpec {
            id,
            sliders: sliders.to_vec(),
            targets: targets.to_vec(),
        }
    }

    fn weight(out: &[(usize, f64)], id: usize) -> f64 {
        out.iter().find(|(i, _)| *i == id).map(|(_, w)| *w).unwrap()
    }

    // ── Grouping ──────────────────────────────────────────────────

    #[test]
    fn test_grouping_same_span_same_orthant() {
        let spaces = build_spaces(&[
            spec(0, &[0, 1], &[1.0, 1.0]),
            spec(1, &[1, 0], &[0.5, 0.5]), // slider order does not matter
        ]);
        assert_eq!(spaces.len(), 1);
        assert_eq!(spaces[0].member_count(), 2);
        assert_eq!(spaces[0].dims(), &[0, 1]);
    }

    #[test]
    fn test_grouping_splits_orthants() {
        let spaces = build_spaces(&[
            spec(0, &[0, 1], &[1.0, 1.0]),
            spec(1, &[0, 1], &[1.0, -1.0]),
        ]);
        assert_eq!(spaces.len(), 2);
        assert_eq!(spaces[0].signs(), &[false, false]);
        assert_eq!(spaces[1].signs(), &[false, true]);
    }

    #[test]
    fn test_grouping_splits_spans() {
        let spaces = build_spaces(&[
            spec(0, &[0, 1], &[1.0, 1.0]),
            spec(1, &[0, 2], &[1.0, 1.0]),
        ]);
        assert_eq!(spaces.len(), 2);
    }

    #[test]
    fn test_zero_target_counts_as_positive() {
        let spaces = build_spaces(&[
            spec(0, &[0, 1], &[1.0, 0.0]),
            spec(1, &[0, 1], &[0.5, 0.5]),
        ]);
        assert_eq!(spaces.len(), 1, "zero target shares the positive orthant");
    }

    #[test]
    fn test_duplicate_slider_excluded() {
        let spaces = build_spaces(&[spec(0, &[1, 1], &[1.0, 0.5])]);
        assert!(spaces.is_empty());
    }

    // ── 1-D spaces ────────────────────────────────────────────────

    #[test]
    fn test_1d_member_peak() {
        let spaces = build_spaces(&[spec(7, &[0], &[0.5])]);
        let out = spaces[0].evaluate(&[0.5]);
        assert!((weight(&out, 7) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_1d_ramp_both_sides() {
        let spaces = build_spaces(&[spec(7, &[0], &[0.5])]);
        assert!((weight(&spaces[0].evaluate(&[0.25]), 7) - 0.5).abs() < 1e-9);
        assert!((weight(&spaces[0].evaluate(&[0.75]), 7) - 0.5).abs() < 1e-9);
        assert!(weight(&spaces[0].evaluate(&[1.0]), 7).abs() < 1e-9);
        assert!(weight(&spaces[0].evaluate(&[0.0]), 7).abs() < 1e-9);
    }

    // ── 2-D spaces ────────────────────────────────────────────────

    #[test]
    fn test_two_floaters_shared_segment() {
        // Members at (1, 0) and (0.5, 0.5); the query sits midway on
        // the segment between them.
        let spaces = build_spaces(&[
            spec(0, &[0, 1], &[1.0, 0.0]),
            spec(1, &[0, 1], &[0.5, 0.5]),
        ]);
        assert_eq!(spaces.len(), 1);
        let out = spaces[0].evaluate(&[0.75, 0.25]);
        assert!((weight(&out, 0) - 0.5).abs() < 1e-9, "got {out:?}");
        assert!((weight(&out, 1) - 0.5).abs() < 1e-9, "got {out:?}");
    }

    #[test]
    fn test_member_exact_hit() {
        let spaces = build_spaces(&[
            spec(0, &[0, 1], &[0.8, 0.2]),
            spec(1, &[0, 1], &[0.3, 0.3]),
        ]);
        let out = spaces[0].evaluate(&[0.8, 0.2]);
        assert!((weight(&out, 0) - 1.0).abs() < 1e-9, "got {out:?}");
        assert!(weight(&out, 1).abs() < 1e-9, "got {out:?}");
    }

    #[test]
    fn test_origin_is_quiet() {
        let spaces = build_spaces(&[spec(0, &[0, 1], &[0.5, 0.5])]);
        let out = spaces[0].evaluate(&[0.0, 0.0]);
        assert!(weight(&out, 0).abs() < 1e-9);
    }

    #[test]
    fn test_diagonal_member_reachable_from_both_sides() {
        // A member on the x0 = x1 face splits both canonical simplices.
        let spaces = build_spaces(&[spec(0, &[0, 1], &[0.5, 0.5])]);
        let above = spaces[0].evaluate(&[0.3, 0.5]);
        let below = spaces[0].evaluate(&[0.5, 0.3]);
        assert!(weight(&above, 0) > 0.0, "got {above:?}");
        assert!(weight(&below, 0) > 0.0, "got {below:?}");
        assert!((weight(&above, 0) - weight(&below, 0)).abs() < 1e-9);
    }

    #[test]
    fn test_partition_of_unity_with_cube_corners() {
        // Weight attributed to members plus cube corners must be a full
        // partition; the member share alone is bounded by it.
        let spaces = build_spaces(&[spec(0, &[0, 1], &[0.5, 0.25])]);
        for p in [[0.5, 0.25], [0.6, 0.2], [0.1, 0.05], [0.9, 0.85]] {
            let out = spaces[0].evaluate(&p);
            let w = weight(&out, 0);
            assert!((0.0..=1.0 + EPS).contains(&w), "w = {w} at {p:?}");
        }
    }

    #[test]
    fn test_evaluate_deterministic() {
        let spaces = build_spaces(&[
            spec(0, &[0, 1], &[0.5, 0.5]),
            spec(1, &[0, 1], &[0.5, 0.5]), // duplicate point
        ]);
        let a = spaces[0].evaluate(&[0.5, 0.5]);
        let b = spaces[0].evaluate(&[0.5, 0.5]);
        assert_eq!(a, b);
        let total: f64 = a.iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-9, "duplicate members split the peak: {a:?}");
    }

    // ── 3-D smoke ─────────────────────────────────────────────────

    #[test]
    fn test_3d_diagonal_member() {
        let spaces = build_spaces(&[spec(4, &[0, 1, 2], &[0.5, 0.5, 0.5])]);
        let out = spaces[0].evaluate(&[0.5, 0.5, 0.5]);
        assert!((weight(&out, 4) - 1.0).abs() < 1e-9);

        // Off the member, still inside the cube: weight in (0, 1).
        let out = spaces[0].evaluate(&[0.4, 0.3, 0.2]);
        let w = weight(&out, 4);
        assert!((0.0..1.0).contains(&w), "w = {w}");
    }

    #[test]
    fn test_3d_apex_quiet() {
        let spaces = build_spaces(&[spec(4, &[0, 1, 2], &[0.5, 0.5, 0.5])]);
        let out = spaces[0].evaluate(&[1.0, 1.0, 1.0]);
        assert!(weight(&out, 4).abs() < 1e-9);
    }

    // ── Negative orthants ─────────────────────────────────────────

    #[test]
    fn test_negative_orthant_coordinates_are_magnitudes() {
        let spaces = build_spaces(&[spec(0, &[0, 1], &[-0.5, -0.5])]);
        assert_eq!(spaces[0].signs(), &[true, true]);
        // Geometry is identical to the positive-orthant case.
        let out = spaces[0].evaluate(&[0.5, 0.5]);
        assert!((weight(&out, 0) - 1.0).abs() < 1e-9);
    }
}
