//! Cell-vector construction and basis changes.
//!
//! The cell-vector matrix is built deterministically from the six cell
//! measures with a fixed axis priority: axis `priority[0]` lies exactly along
//! its own Cartesian coordinate, axis `priority[1]` in the plane it spans
//! with axis 0, and axis `priority[2]` fills the remaining dimension through
//! the spherical-angle relations. The default priority `(0, 1, 2)` keeps the
//! z axis as the one never forced orthogonal, the convention most simulation
//! codes share.

use nalgebra::Matrix3;

use super::error::Error;
use crate::model::cell::{Cell, LatticeSystem};

pub(crate) const DEFAULT_PRIORITY: [usize; 3] = [0, 1, 2];

/// Builds the 3×3 cell-vector matrix (rows are lattice vectors, angstrom).
///
/// # Errors
///
/// [`Error::Geometry`] if `priority` is not a permutation of `0..3`, any
/// angle lies outside (0°, 180°), or the resulting volume is non-positive.
pub fn cell_vectors(cell: &Cell, priority: [usize; 3]) -> Result<[[f64; 3]; 3], Error> {
    let mut seen = [false; 3];
    for &axis in &priority {
        if axis > 2 || seen[axis] {
            return Err(Error::geometry(format!(
                "axis priority {:?} is not a permutation of (0, 1, 2)",
                priority
            )));
        }
        seen[axis] = true;
    }
    for angle in cell.angles() {
        if !(angle > 0.0 && angle < 180.0) {
            return Err(Error::geometry(format!(
                "cell angle {angle} lies outside (0, 180) degrees"
            )));
        }
    }

    let abc = cell.lengths();
    let ang = cell.angles().map(f64::to_radians);
    let [v0, v1, v2] = priority;

    let mut m = [[0.0; 3]; 3];
    m[v0][v0] = abc[v0];
    m[v1][v1] = abc[v1] * ang[3 - v0 - v1].sin();
    m[v1][v0] = abc[v1] * ang[3 - v0 - v1].cos();
    m[v2][v2] = abc[v2] * ang[3 - v0 - v2].sin() * ang[3 - v1 - v2].sin();
    m[v2][v0] = abc[v2] * ang[3 - v0 - v2].cos();
    m[v2][v1] = abc[v2] * ang[3 - v1 - v2].cos();

    if cell_volume(&m) <= 0.0 {
        return Err(Error::geometry(format!(
            "cell [{cell}] has non-positive volume"
        )));
    }
    Ok(m)
}

/// Triple product of the lattice vectors.
pub fn cell_volume(vectors: &[[f64; 3]; 3]) -> f64 {
    let [a, b, c] = vectors;
    a[0] * (b[1] * c[2] - b[2] * c[1]) + a[1] * (b[2] * c[0] - b[0] * c[2])
        + a[2] * (b[0] * c[1] - b[1] * c[0])
}

/// Classifies the lattice system from the cell measures.
///
/// Lengths are compared after rounding to three decimals; the 90°/120° angle
/// category tests are exact. Absent cells and cells with any zero measure
/// classify as [`LatticeSystem::None`].
pub fn lattice_symmetry(cell: Option<&Cell>) -> LatticeSystem {
    let Some(cell) = cell else {
        return LatticeSystem::None;
    };
    if cell.to_array().iter().any(|&v| v == 0.0) {
        return LatticeSystem::None;
    }

    let abc = cell.lengths();
    let ang = cell.angles();
    let round3 = |x: f64| (x * 1000.0).round();
    let ab = round3(abc[0]) == round3(abc[1]);
    let bc = round3(abc[1]) == round3(abc[2]);
    let right_angles = ang.iter().filter(|&&a| a == 90.0).count();

    if right_angles == 3 {
        return if ab && bc {
            LatticeSystem::Cubic
        } else if !ab && !bc {
            LatticeSystem::Orthorhombic
        } else {
            LatticeSystem::Tetragonal
        };
    }

    if right_angles == 2 {
        let ab_ang = round3(ang[0]) == round3(ang[1]);
        let bc_ang = round3(ang[1]) == round3(ang[2]);
        if ang.contains(&120.0) && ((ab && ab_ang) || (bc && bc_ang)) {
            return LatticeSystem::Hexagonal;
        }
        if !ab && !bc {
            return LatticeSystem::Monoclinic;
        }
        log::warn!("unusual lattice [{cell}]; classifying as triclinic");
        return LatticeSystem::Triclinic;
    }

    if abc[0] == abc[1] && abc[1] == abc[2] && ang[0] == ang[1] && ang[1] == ang[2] {
        return LatticeSystem::Rhombohedral;
    }

    LatticeSystem::Triclinic
}

pub(crate) fn matrix_from(vectors: &[[f64; 3]; 3]) -> Matrix3<f64> {
    Matrix3::new(
        vectors[0][0],
        vectors[0][1],
        vectors[0][2],
        vectors[1][0],
        vectors[1][1],
        vectors[1][2],
        vectors[2][0],
        vectors[2][1],
        vectors[2][2],
    )
}

/// Row vector times matrix: `p @ m`, the basis-change product for row-major
/// lattice vectors.
pub(crate) fn row_mul(p: [f64; 3], m: &Matrix3<f64>) -> [f64; 3] {
    [
        p[0] * m[(0, 0)] + p[1] * m[(1, 0)] + p[2] * m[(2, 0)],
        p[0] * m[(0, 1)] + p[1] * m[(1, 1)] + p[2] * m[(2, 1)],
        p[0] * m[(0, 2)] + p[1] * m[(1, 2)] + p[2] * m[(2, 2)],
    ]
}

pub(crate) fn invert(m: &Matrix3<f64>) -> Result<Matrix3<f64>, Error> {
    m.try_inverse()
        .ok_or_else(|| Error::geometry("singular cell-vector matrix"))
}

fn basis_matrix(cell: &Cell, angular: bool) -> Result<Matrix3<f64>, Error> {
    let m = matrix_from(&cell_vectors(cell, DEFAULT_PRIORITY)?);
    if angular {
        // reciprocal (reduced) basis for angular quantities p × p or p × v
        Ok(invert(&m)?.transpose() * m.determinant())
    } else {
        Ok(m)
    }
}

/// Transforms Cartesian coordinates into the cell-vector basis.
///
/// With `angular` set the determinant-scaled inverse-transpose basis is used
/// instead, which transforms angular-momentum-like quantities (cross products
/// of positions or velocities) correctly under non-orthogonal cells.
pub fn to_fractional(
    positions: &[[f64; 3]],
    cell: &Cell,
    angular: bool,
) -> Result<Vec<[f64; 3]>, Error> {
    let inv = invert(&basis_matrix(cell, angular)?)?;
    Ok(positions.iter().map(|&p| row_mul(p, &inv)).collect())
}

/// Transforms cell-basis coordinates back into Cartesian space.
pub fn to_cartesian(
    fractional: &[[f64; 3]],
    cell: &Cell,
    angular: bool,
) -> Result<Vec<[f64; 3]>, Error> {
    let m = basis_matrix(cell, angular)?;
    Ok(fractional.iter().map(|&p| row_mul(p, &m)).collect())
}
