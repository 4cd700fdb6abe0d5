// ─────────────────────────────────────────────────────────────────────
// Morph Kernel — Rig Definition Schemas
// ─────────────────────────────────────────────────────────────────────
//! Serde data model for rig definitions.
//!
//! Two wire schemas are accepted:
//! - **v2** (current): object form, tagged with `"encoding_version": 2`
//!   (the legacy spelling `"encodingVersion"` is also accepted).
//! - **v1** (legacy): positional tuple arrays, no version tag.
//!
//! `RigDefinition::from_json` detects the version and normalises v1 into
//! the v2 model, so the solver only ever sees one shape of data.
//! `validate()` performs every structural check that does not require the
//! built entity graph: index ranges, knot counts, name uniqueness.

use std::collections::HashSet;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{MorphError, MorphResult};

/// Interpolation mode of a progression curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interp {
    Linear,
    Spline,
}

impl FromStr for Interp {
    type Err = MorphError;

    fn from_str(s: &str) -> MorphResult<Self> {
        match s {
            "linear" => Ok(Interp::Linear),
            "spline" => Ok(Interp::Spline),
            other => Err(MorphError::Definition(format!(
                "unknown interp tag {other:?}, expected \"linear\" or \"spline\""
            ))),
        }
    }
}

/// Which controller arena a `CtrlRef` points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Slider,
    Combo,
    Traversal,
}

impl FromStr for ControlKind {
    type Err = MorphError;

    fn from_str(s: &str) -> MorphResult<Self> {
        match s {
            "slider" => Ok(ControlKind::Slider),
            "combo" => Ok(ControlKind::Combo),
            "traversal" => Ok(ControlKind::Traversal),
            other => Err(MorphError::Definition(format!(
                "unknown controller kind {other:?}"
            ))),
        }
    }
}

/// Typed cross-reference to a controller: (arena, position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CtrlRef {
    pub kind: ControlKind,
    pub index: usize,
}

/// One interpolation curve: ordered (shape, t) knots plus an interp tag.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressionDef {
    pub name: String,
    /// `[shape_index, t]` pairs. Sorted by t at build time.
    pub knots: Vec<(usize, f64)>,
    pub interp: Interp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SliderDef {
    pub name: String,
    pub progression_index: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComboDef {
    pub name: String,
    pub progression_index: usize,
    /// Crisp min-of-absolute resolution when true, multiplicative when false.
    #[serde(default = "default_exact")]
    pub exact: bool,
    /// `[slider_index, signed_target]` pairs.
    pub pairs: Vec<(usize, f64)>,
}

fn default_exact() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct TraversalDef {
    pub name: String,
    pub progression_index: usize,
    pub progress_ctrl: CtrlRef,
    pub multiplier_ctrl: CtrlRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FloaterDef {
    pub name: String,
    pub progression_index: usize,
    /// `[slider_index, signed_target]` pairs.
    pub pairs: Vec<(usize, f64)>,
}

/// The full entity set of one rig, schema-normalised.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RigDefinition {
    #[serde(default, alias = "encodingVersion")]
    pub encoding_version: Option<u32>,
    /// Shape names; output index = position.
    #[serde(default)]
    pub shapes: Vec<String>,
    #[serde(default)]
    pub progressions: Vec<ProgressionDef>,
    #[serde(default)]
    pub sliders: Vec<SliderDef>,
    #[serde(default)]
    pub combos: Vec<ComboDef>,
    #[serde(default)]
    pub traversals: Vec<TraversalDef>,
    #[serde(default)]
    pub floaters: Vec<FloaterDef>,
}

// ─── v1 legacy schema ───────────────────────────────────────────────
//
// Positional tuple arrays:
//   progressions: [name, [[shape, t], ...], interp]
//   sliders:      [name, progression]
//   combos:       [name, progression, [[slider, target], ...]]
//   traversals:   [name, progression, kind, index, kind, index]
//   floaters:     [name, progression, [[slider, target], ...]]

#[derive(Debug, Deserialize)]
struct RigDefinitionV1 {
    #[serde(default)]
    shapes: Vec<String>,
    #[serde(default)]
    progressions: Vec<(String, Vec<(usize, f64)>, String)>,
    #[serde(default)]
    sliders: Vec<(String, usize)>,
    #[serde(default)]
    combos: Vec<(String, usize, Vec<(usize, f64)>)>,
    #[serde(default)]
    traversals: Vec<(String, usize, String, usize, String, usize)>,
    #[serde(default)]
    floaters: Vec<(String, usize, Vec<(usize, f64)>)>,
}

impl RigDefinitionV1 {
    fn upgrade(self) -> MorphResult<RigDefinition> {
        let progressions = self
            .progressions
            .into_iter()
            .map(|(name, knots, interp)| {
                Ok(ProgressionDef {
                    name,
                    knots,
                    interp: interp.parse()?,
                })
            })
            .collect::<MorphResult<Vec<_>>>()?;

        let traversals = self
            .traversals
            .into_iter()
            .map(|(name, progression_index, pk, pi, mk, mi)| {
                Ok(TraversalDef {
                    name,
                    progression_index,
                    progress_ctrl: CtrlRef {
                        kind: pk.parse()?,
                        index: pi,
                    },
                    multiplier_ctrl: CtrlRef {
                        kind: mk.parse()?,
                        index: mi,
                    },
                })
            })
            .collect::<MorphResult<Vec<_>>>()?;

        Ok(RigDefinition {
            encoding_version: Some(1),
            shapes: self.shapes,
            progressions,
            sliders: self
                .sliders
                .into_iter()
                .map(|(name, progression_index)| SliderDef {
                    name,
                    progression_index,
                })
                .collect(),
            combos: self
                .combos
                .into_iter()
                .map(|(name, progression_index, pairs)| ComboDef {
                    name,
                    progression_index,
                    exact: true,
                    pairs,
                })
                .collect(),
            traversals,
            floaters: self
                .floaters
                .into_iter()
                .map(|(name, progression_index, pairs)| FloaterDef {
                    name,
                    progression_index,
                    pairs,
                })
                .collect(),
        })
    }
}

/// Byte offset of (1-based) line/column into `src`.
fn byte_offset(src: &str, line: usize, column: usize) -> usize {
    let mut remaining = line.saturating_sub(1);
    let mut offset = 0usize;
    for (i, b) in src.bytes().enumerate() {
        if remaining == 0 {
            break;
        }
        if b == b'\n' {
            remaining -= 1;
            offset = i + 1;
        }
    }
    (offset + column.saturating_sub(1)).min(src.len())
}

fn parse_failure(src: &str, e: &serde_json::Error) -> MorphError {
    MorphError::Parse {
        message: e.to_string(),
        offset: byte_offset(src, e.line(), e.column()),
    }
}

impl RigDefinition {
    /// Decode a rig definition from JSON, accepting either schema version.
    pub fn from_json(src: &str) -> MorphResult<Self> {
        #[derive(Deserialize)]
        struct VersionProbe {
            #[serde(default, alias = "encodingVersion")]
            encoding_version: Option<u32>,
        }

        let probe: VersionProbe =
            serde_json::from_str(src).map_err(|e| parse_failure(src, &e))?;

        match probe.encoding_version {
            None | Some(1) => {
                let v1: RigDefinitionV1 =
                    serde_json::from_str(src).map_err(|e| parse_failure(src, &e))?;
                v1.upgrade()
            }
            Some(2) => serde_json::from_str(src).map_err(|e| parse_failure(src, &e)),
            Some(other) => Err(MorphError::Definition(format!(
                "unsupported encoding version {other}"
            ))),
        }
    }

    /// Structural validation: index ranges, knot counts, name uniqueness.
    ///
    /// Everything checkable without the built entity graph lives here, so
    /// the solver can reject a definition before allocating any arenas.
    pub fn validate(&self) -> MorphResult<()> {
        let mut names = HashSet::new();
        for shape in &self.shapes {
            if !names.insert(shape.as_str()) {
                return Err(MorphError::Definition(format!(
                    "duplicate shape name {shape:?}"
                )));
            }
        }

        for prog in &self.progressions {
            if prog.knots.is_empty() {
                return Err(MorphError::Definition(format!(
                    "progression {:?} has no knots",
                    prog.name
                )));
            }
            for &(shape, _) in &prog.knots {
                if shape >= self.shapes.len() {
                    return Err(MorphError::Reference(format!(
                        "progression {:?} references shape {shape}, but only {} shapes exist",
                        prog.name,
                        self.shapes.len()
                    )));
                }
            }
        }

        let check_prog = |name: &str, idx: usize| -> MorphResult<()> {
            if idx >= self.progressions.len() {
                return Err(MorphError::Reference(format!(
                    "controller {name:?} references progression {idx}, but only {} exist",
                    self.progressions.len()
                )));
            }
            Ok(())
        };
        let check_pairs = |name: &str, pairs: &[(usize, f64)]| -> MorphResult<()> {
            if pairs.is_empty() {
                return Err(MorphError::Definition(format!(
                    "controller {name:?} has an empty state list"
                )));
            }
            for &(slider, _) in pairs {
                if slider >= self.sliders.len() {
                    return Err(MorphError::Reference(format!(
                        "controller {name:?} references slider {slider}, but only {} exist",
                        self.sliders.len()
                    )));
                }
            }
            Ok(())
        };

        for slider in &self.sliders {
            check_prog(&slider.name, slider.progression_index)?;
        }
        for combo in &self.combos {
            check_prog(&combo.name, combo.progression_index)?;
            check_pairs(&combo.name, &combo.pairs)?;
        }
        for floater in &self.floaters {
            check_prog(&floater.name, floater.progression_index)?;
            check_pairs(&floater.name, &floater.pairs)?;
        }
        for trav in &self.traversals {
            check_prog(&trav.name, trav.progression_index)?;
            for ctrl in [trav.progress_ctrl, trav.multiplier_ctrl] {
                let count = match ctrl.kind {
                    ControlKind::Slider => self.sliders.len(),
                    ControlKind::Combo => self.combos.len(),
                    ControlKind::Traversal => self.traversals.len(),
                };
                if ctrl.index >= count {
                    return Err(MorphError::Reference(format!(
                        "traversal {:?} references {:?} {}, but only {count} exist",
                        trav.name, ctrl.kind, ctrl.index
                    )));
                }
            }
        }

        Ok(())
    }
}
