// ─────────────────────────────────────────────────────────────────────
// Morph Kernel — Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all Morph Kernel failures.
#[derive(Error, Debug)]
pub enum MorphError {
    /// Rig definition malformed. Carries the byte offset into the source
    /// document where decoding stopped.
    #[error("parse error at offset {offset}: {message}")]
    Parse { message: String, offset: usize },

    /// Dangling cross-reference in the entity graph.
    #[error("reference error: {0}")]
    Reference(String),

    /// Traversal controller graph has a cycle.
    #[error("cycle error: {0}")]
    Cycle(String),

    /// `solve` called with a wrong-length input vector.
    #[error("dimension error: expected {expected} slider values, got {got}")]
    Dimension { expected: usize, got: usize },

    /// Definition-level validation failure (bad interp tag, empty knot
    /// list, out-of-range index before any entity exists to dangle from).
    #[error("definition error: {0}")]
    Definition(String),
}

pub type MorphResult<T> = Result<T, MorphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let e = MorphError::Parse {
            message: "unexpected token".to_string(),
            offset: 42,
        };
        assert_eq!(e.to_string(), "parse error at offset 42: unexpected token");
    }

    #[test]
    fn test_dimension_error_display() {
        let e = MorphError::Dimension {
            expected: 4,
            got: 3,
        };
        assert!(e.to_string().contains("expected 4"));
        assert!(e.to_string().contains("got 3"));
    }
}
