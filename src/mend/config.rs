//! Configuration for the mending pipeline.
//!
//! All tunables are threaded explicitly through [`MendConfig`]; the library
//! keeps no process-wide mutable state, so core behaviour is a pure function
//! of its inputs.

use super::join::TrajectoryMode;
use super::pbc::ImageMode;

/// How a mismatch between detected and expected molecule counts is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validation {
    /// Log a warning and continue with the detected partition.
    #[default]
    Lenient,
    /// Fail with [`Error::BrokenTopology`](super::Error::BrokenTopology).
    Strict,
}

/// Settings for topology detection and molecule joining.
///
/// # Examples
///
/// ```
/// use traj_mend::{ImageMode, MendConfig};
///
/// let default = MendConfig::default();
/// assert_eq!(default.bond_scale, 0.6);
///
/// let accurate = MendConfig {
///     image_mode: ImageMode::Accurate,
///     ..Default::default()
/// };
/// assert_eq!(accurate.image_mode, ImageMode::Accurate);
/// ```
#[derive(Debug, Clone)]
pub struct MendConfig {
    /// Scaling factor applied to the sum of van-der-Waals radii when
    /// thresholding bonds.
    pub bond_scale: f64,

    /// Minimum-image policy for skewed cells.
    pub image_mode: ImageMode,

    /// How multi-frame input is unwrapped.
    pub trajectory_mode: TrajectoryMode,

    /// Molecule-count validation severity.
    pub validation: Validation,

    /// Expected number of molecules, checked after partitioning if set.
    pub expected_molecules: Option<usize>,

    /// Axis priority for the cell-vector construction. The default `(0, 1, 2)`
    /// keeps the z axis as the unaligned one, the common convention.
    pub axis_priority: [usize; 3],
}

impl Default for MendConfig {
    fn default() -> Self {
        Self {
            bond_scale: 0.6,
            image_mode: ImageMode::Naive,
            trajectory_mode: TrajectoryMode::FastForward,
            validation: Validation::Lenient,
            expected_molecules: None,
            axis_priority: [0, 1, 2],
        }
    }
}
