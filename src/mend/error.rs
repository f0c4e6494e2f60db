//! Error types for the mending pipeline.
//!
//! Local numeric ambiguities (priority wrap order, patched bridging edges)
//! are handled with a logged warning and a documented fallback; anything that
//! would silently produce wrong physics (degenerate cell, missing element
//! data, unresolved atom placement) is a hard error.

use thiserror::Error;

use crate::model::types::Element;

/// Errors that can occur while building geometry, topology or joined
/// coordinates.
#[derive(Debug, Error)]
pub enum Error {
    /// Degenerate or invalid cell geometry.
    #[error("invalid cell geometry: {detail}")]
    Geometry {
        /// Description of the degeneracy.
        detail: String,
    },

    /// Element lacks the tabulated quantity a code path requires.
    ///
    /// The pipeline does not guess radii or masses; upstream may substitute
    /// its own value and re-call.
    #[error("no {quantity} tabulated for element '{element}'")]
    UnknownElement {
        /// Offending element.
        element: Element,
        /// What was asked for, e.g. "van-der-Waals radius".
        quantity: &'static str,
    },

    /// Dense-matrix operation requested above the size guard.
    ///
    /// A deliberate scale limit: the dense N² matrix is the simplest correct
    /// approach for typical molecular systems and is not optimised further.
    #[error("system too large for dense pair matrices: {atoms} atoms (limit {limit})")]
    TooManyAtoms {
        /// Atoms on the larger side of the pair matrix.
        atoms: usize,
        /// The configured guard.
        limit: usize,
    },

    /// Detected molecule partition does not match the expected count.
    ///
    /// Raised only under strict validation; lenient validation logs a
    /// warning and continues with the detected partition.
    #[error("molecule partition mismatch: expected {expected} molecules, found {found}")]
    BrokenTopology {
        /// Count the caller demanded.
        expected: usize,
        /// Count the flood fill produced.
        found: usize,
    },

    /// Joiner iteration budget exhausted for one molecule.
    ///
    /// Carries the partially placed positions for diagnostics; they must not
    /// be trusted as correct coordinates.
    #[error(
        "could not join molecule {molecule} after {iterations} iterations; \
         connectivity may be interrupted"
    )]
    JoinFailure {
        /// Molecule label in the molecule map.
        molecule: usize,
        /// Iterations spent before giving up.
        iterations: usize,
        /// Position buffer at abort time, molecule-local atom order.
        partial: Vec<[f64; 3]>,
    },
}

impl Error {
    pub(crate) fn geometry(detail: impl Into<String>) -> Self {
        Self::Geometry {
            detail: detail.into(),
        }
    }

    pub(crate) fn unknown_element(element: Element, quantity: &'static str) -> Self {
        Self::UnknownElement { element, quantity }
    }
}
