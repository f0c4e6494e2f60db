//! Minimum-image and wrapping primitives under periodic boundaries.
//!
//! Three interchangeable policies handle skewed cells:
//!
//! - [`ImageMode::Naive`] rounds fractional coordinates. Cheap, keeps the
//!   original cell shape, exact for distances below half the shortest
//!   spacing between lattice planes.
//! - [`ImageMode::Priority`] corrects one cell axis at a time in an
//!   auto-detected order (axes with more non-zero components first). Produces
//!   a rectangular-style wrap, near-minimal for common cells; ambiguous
//!   "general format" cells are handled best-effort with a warning.
//! - [`ImageMode::Accurate`] enumerates all 27 lattice translations and picks
//!   the shortest image. Correct minimum image at 27× the cost.
//!
//! Cells with all angles at 90° always take the closed-form branch; cells
//! with any non-positive length degenerate every operation to the identity.

use nalgebra::Matrix3;

use super::cell::{self, DEFAULT_PRIORITY};
use super::error::Error;
use crate::model::cell::Cell;

/// Minimum-image policy for skewed cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageMode {
    #[default]
    Naive,
    Priority,
    Accurate,
}

#[inline]
pub(crate) fn add(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub(crate) fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub(crate) fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub(crate) fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
pub(crate) fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

/// Precomputed wrap state for one cell, shared across batch operations so
/// the basis inversion and the priority-order detection run once.
pub(crate) enum Shifter {
    Identity,
    Orthorhombic([f64; 3]),
    Skewed {
        vectors: [[f64; 3]; 3],
        matrix: Matrix3<f64>,
        inverse: Matrix3<f64>,
        order: [usize; 3],
        mode: ImageMode,
    },
}

impl Shifter {
    pub(crate) fn new(cell: Option<&Cell>, mode: ImageMode) -> Result<Self, Error> {
        let Some(cell) = cell else {
            return Ok(Self::Identity);
        };
        if !cell.is_periodic() {
            return Ok(Self::Identity);
        }
        if cell.is_right_angled() {
            return Ok(Self::Orthorhombic(cell.lengths()));
        }
        let vectors = cell::cell_vectors(cell, DEFAULT_PRIORITY)?;
        let matrix = cell::matrix_from(&vectors);
        let inverse = cell::invert(&matrix)?;
        let order = auto_priority_order(&vectors);
        Ok(Self::Skewed {
            vectors,
            matrix,
            inverse,
            order,
            mode,
        })
    }

    /// Lattice translation to subtract from `delta` for its minimum image.
    pub(crate) fn shift(&self, delta: [f64; 3]) -> [f64; 3] {
        match self {
            Self::Identity => [0.0; 3],
            Self::Orthorhombic(l) => [
                (delta[0] / l[0]).round() * l[0],
                (delta[1] / l[1]).round() * l[1],
                (delta[2] / l[2]).round() * l[2],
            ],
            Self::Skewed {
                vectors,
                matrix,
                inverse,
                order,
                mode,
            } => match mode {
                ImageMode::Naive => {
                    let frac = cell::row_mul(delta, inverse);
                    cell::row_mul(frac.map(f64::round), matrix)
                }
                ImageMode::Priority => priority_shift(delta, vectors, *order),
                ImageMode::Accurate => accurate_shift(delta, vectors),
            },
        }
    }
}

/// Axis correction order for priority wrapping: axes sorted by descending
/// count of non-zero cell-vector components, so the most "diagonal" axes are
/// corrected last.
///
/// Cells in general format (more than one axis sharing the 2- or 3-component
/// class) cannot be ordered unambiguously; the sort order is kept best-effort
/// and a warning is logged.
pub fn auto_priority_order(vectors: &[[f64; 3]; 3]) -> [usize; 3] {
    let counts: Vec<usize> = vectors
        .iter()
        .map(|row| row.iter().filter(|&&c| c * c > 1e-8).count())
        .collect();

    let twos = counts.iter().filter(|&&n| n == 2).count();
    let threes = counts.iter().filter(|&&n| n == 3).count();
    if twos > 1 || threes > 1 {
        log::warn!(
            "cell vectors are in general format; transform into restricted \
             form to avoid priority-wrapping errors"
        );
    }

    let mut order = [0usize, 1, 2];
    order.sort_by_key(|&i| std::cmp::Reverse(counts[i]));
    order
}

/// Sequential per-axis correction in the given order.
pub fn priority_shift(delta: [f64; 3], vectors: &[[f64; 3]; 3], order: [usize; 3]) -> [f64; 3] {
    let mut d = delta;
    for &i in &order {
        let f = (d[i] / vectors[i][i]).round();
        for k in 0..3 {
            d[k] -= f * vectors[i][k];
        }
    }
    sub(delta, d)
}

fn accurate_shift(delta: [f64; 3], vectors: &[[f64; 3]; 3]) -> [f64; 3] {
    let mut best = [0.0; 3];
    let mut best_norm = norm(delta);
    for i in [0i32, 1, -1] {
        for j in [0i32, 1, -1] {
            for k in [0i32, 1, -1] {
                if i == 0 && j == 0 && k == 0 {
                    continue;
                }
                let mut lattice = [0.0; 3];
                for x in 0..3 {
                    lattice[x] = i as f64 * vectors[0][x]
                        + j as f64 * vectors[1][x]
                        + k as f64 * vectors[2][x];
                }
                let n = norm(sub(delta, lattice));
                if n < best_norm {
                    best_norm = n;
                    best = lattice;
                }
            }
        }
    }
    best
}

/// The lattice translation that maps `delta` onto its minimum image.
///
/// Subtracting the returned shift from `delta` yields the image vector. The
/// closed-form branch applies whenever all angles are 90°, regardless of
/// `mode`; degenerate cells return a zero shift.
pub fn minimum_image_shift(delta: [f64; 3], cell: &Cell, mode: ImageMode) -> Result<[f64; 3], Error> {
    Ok(Shifter::new(Some(cell), mode)?.shift(delta))
}

/// Minimum-image displacement `p1 - p0` plus a flag reporting whether the
/// raw difference was wrapped (i.e. the pair straddles a boundary).
pub fn displacement(
    p0: [f64; 3],
    p1: [f64; 3],
    cell: Option<&Cell>,
    mode: ImageMode,
) -> Result<([f64; 3], bool), Error> {
    let d = sub(p1, p0);
    let shift = Shifter::new(cell, mode)?.shift(d);
    Ok((sub(d, shift), shift != [0.0; 3]))
}

/// Maps positions into the canonical cell via the fractional-floor trick.
pub fn wrap_into_cell(positions: &[[f64; 3]], cell: &Cell) -> Result<Vec<[f64; 3]>, Error> {
    if !cell.is_periodic() {
        return Ok(positions.to_vec());
    }
    if cell.is_right_angled() {
        let l = cell.lengths();
        return Ok(positions
            .iter()
            .map(|p| {
                [
                    p[0] - (p[0] / l[0]).floor() * l[0],
                    p[1] - (p[1] / l[1]).floor() * l[1],
                    p[2] - (p[2] / l[2]).floor() * l[2],
                ]
            })
            .collect());
    }
    let matrix = cell::matrix_from(&cell::cell_vectors(cell, DEFAULT_PRIORITY)?);
    let inverse = cell::invert(&matrix)?;
    Ok(positions
        .iter()
        .map(|&p| {
            let frac = cell::row_mul(p, &inverse);
            sub(p, cell::row_mul(frac.map(f64::floor), &matrix))
        })
        .collect())
}

/// Single-point convenience for [`wrap_into_cell`].
pub fn wrap_point(position: [f64; 3], cell: &Cell) -> Result<[f64; 3], Error> {
    Ok(wrap_into_cell(std::slice::from_ref(&position), cell)?[0])
}

/// Removes periodic jumps from a trajectory by cumulative frame-to-frame
/// correction.
///
/// Frame-to-frame differences are wrapped to their minimum image and summed
/// back up starting from `reference` (the first frame if omitted). The
/// output keeps the input length; its first frame is the reference plus the
/// corrected step to the first input frame.
pub fn unwrap_frames(
    frames: &[Vec<[f64; 3]>],
    reference: Option<&[[f64; 3]]>,
    cell: Option<&Cell>,
    mode: ImageMode,
) -> Result<Vec<Vec<[f64; 3]>>, Error> {
    let shifter = Shifter::new(cell, mode)?;
    if matches!(shifter, Shifter::Identity) {
        return Ok(frames.to_vec());
    }
    let Some(first) = frames.first() else {
        return Ok(Vec::new());
    };
    let reference = reference.unwrap_or(first);

    let mut out: Vec<Vec<[f64; 3]>> = Vec::with_capacity(frames.len());
    let mut prev_raw: &[[f64; 3]] = reference;
    let mut prev_out: Vec<[f64; 3]> = reference.to_vec();
    for frame in frames {
        let mut cur = Vec::with_capacity(frame.len());
        for (atom, (&p, &q)) in frame.iter().zip(prev_raw.iter()).enumerate() {
            let d = sub(p, q);
            let step = sub(d, shifter.shift(d));
            cur.push(add(prev_out[atom], step));
        }
        prev_raw = frame;
        prev_out.clone_from(&cur);
        out.push(cur);
    }
    Ok(out)
}

/// Average atom positions over frames without periodic jumps, optionally
/// wrapped back into the cell.
pub fn mean_position(
    frames: &[Vec<[f64; 3]>],
    cell: Option<&Cell>,
    mode: ImageMode,
    wrap: bool,
) -> Result<Vec<[f64; 3]>, Error> {
    let unwrapped = unwrap_frames(frames, None, cell, mode)?;
    let Some(first) = unwrapped.first() else {
        return Ok(Vec::new());
    };
    let inv_n = 1.0 / unwrapped.len() as f64;
    let mut mean = vec![[0.0; 3]; first.len()];
    for frame in &unwrapped {
        for (m, p) in mean.iter_mut().zip(frame) {
            for k in 0..3 {
                m[k] += p[k] * inv_n;
            }
        }
    }
    match (wrap, cell) {
        (true, Some(c)) => wrap_into_cell(&mean, c),
        _ => Ok(mean),
    }
}

/// Bond angle p0–p1–p2 in radians, with p1 at the vertex, using
/// minimum-image displacement vectors.
pub fn angle_pbc(
    p0: [f64; 3],
    p1: [f64; 3],
    p2: [f64; 3],
    cell: Option<&Cell>,
    mode: ImageMode,
) -> Result<f64, Error> {
    let (v0, _) = displacement(p1, p0, cell, mode)?;
    let (v1, _) = displacement(p1, p2, cell, mode)?;
    let cosine = dot(v0, v1) / (norm(v0) * norm(v1));
    Ok(cosine.clamp(-1.0, 1.0).acos())
}

/// Dihedral angle of the chain p0–p1–p2–p3 in radians, signed, using
/// minimum-image displacement vectors.
pub fn dihedral_pbc(
    p0: [f64; 3],
    p1: [f64; 3],
    p2: [f64; 3],
    p3: [f64; 3],
    cell: Option<&Cell>,
    mode: ImageMode,
) -> Result<f64, Error> {
    let (b1, _) = displacement(p0, p1, cell, mode)?;
    let (b2, _) = displacement(p1, p2, cell, mode)?;
    let (b3, _) = displacement(p2, p3, cell, mode)?;
    let n1 = cross(b1, b2);
    let n2 = cross(b2, b3);
    let b2n = norm(b2);
    let y = dot(cross(n1, n2), [b2[0] / b2n, b2[1] / b2n, b2[2] / b2n]);
    let x = dot(n1, n2);
    Ok(y.atan2(x))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec_close(a: [f64; 3], b: [f64; 3], tol: f64) {
        for k in 0..3 {
            assert!((a[k] - b[k]).abs() <= tol, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn right_angles_agree_across_modes() {
        let cell = Cell::new(10.0, 12.0, 15.0, 90.0, 90.0, 90.0);
        let deltas = [
            [9.5, -11.0, 7.4],
            [0.1, 0.2, 0.3],
            [-14.9, 6.3, -7.6],
            [25.0, -24.5, 31.0],
        ];
        for d in deltas {
            let naive = minimum_image_shift(d, &cell, ImageMode::Naive).unwrap();
            let priority = minimum_image_shift(d, &cell, ImageMode::Priority).unwrap();
            let accurate = minimum_image_shift(d, &cell, ImageMode::Accurate).unwrap();
            let closed = [
                (d[0] / 10.0).round() * 10.0,
                (d[1] / 12.0).round() * 12.0,
                (d[2] / 15.0).round() * 15.0,
            ];
            assert_vec_close(naive, closed, 1e-12);
            assert_vec_close(priority, closed, 1e-12);
            assert_vec_close(accurate, closed, 1e-12);
        }
    }

    #[test]
    fn shift_is_periodicity_invariant() {
        let cell = Cell::new(10.0, 12.0, 15.0, 90.0, 105.0, 90.0);
        let vectors = cell::cell_vectors(&cell, DEFAULT_PRIORITY).unwrap();
        let d = [1.1, -2.3, 3.7];
        for mode in [ImageMode::Naive, ImageMode::Priority, ImageMode::Accurate] {
            let base = sub(d, minimum_image_shift(d, &cell, mode).unwrap());
            for t in [[1.0, 0.0, 0.0], [0.0, -1.0, 1.0], [1.0, 1.0, -1.0]] {
                let mut shifted = d;
                for (i, &n) in t.iter().enumerate() {
                    for k in 0..3 {
                        shifted[k] += n * vectors[i][k];
                    }
                }
                let image = sub(shifted, minimum_image_shift(shifted, &cell, mode).unwrap());
                assert_vec_close(image, base, 1e-9);
            }
        }
    }

    #[test]
    fn accurate_never_longer_than_naive() {
        let cell = Cell::new(8.0, 9.0, 10.0, 75.0, 95.0, 110.0);
        for d in [[4.2, -4.9, 5.1], [7.7, 7.1, -6.6], [-3.9, 4.4, 4.8]] {
            let naive = norm(sub(d, minimum_image_shift(d, &cell, ImageMode::Naive).unwrap()));
            let accurate = norm(sub(
                d,
                minimum_image_shift(d, &cell, ImageMode::Accurate).unwrap(),
            ));
            assert!(accurate <= naive + 1e-9);
        }
    }

    #[test]
    fn degenerate_cell_is_identity() {
        let cell = Cell::new(0.0, 0.0, 0.0, 90.0, 90.0, 90.0);
        assert_eq!(
            minimum_image_shift([3.0, -4.0, 5.0], &cell, ImageMode::Accurate).unwrap(),
            [0.0; 3]
        );
        let (d, broken) = displacement([0.0; 3], [9.0, 0.0, 0.0], Some(&cell), ImageMode::Naive)
            .unwrap();
        assert_eq!(d, [9.0, 0.0, 0.0]);
        assert!(!broken);
        assert_eq!(
            wrap_into_cell(&[[11.0, -2.0, 0.5]], &cell).unwrap(),
            vec![[11.0, -2.0, 0.5]]
        );
    }

    #[test]
    fn displacement_flags_wrapped_pairs() {
        let cell = Cell::cubic(10.0);
        let (d, broken) =
            displacement([0.1, 5.0, 5.0], [9.9, 5.0, 5.0], Some(&cell), ImageMode::Naive).unwrap();
        assert_vec_close(d, [-0.2, 0.0, 0.0], 1e-12);
        assert!(broken);

        let (d, broken) =
            displacement([1.0, 5.0, 5.0], [2.0, 5.0, 5.0], Some(&cell), ImageMode::Naive).unwrap();
        assert_vec_close(d, [1.0, 0.0, 0.0], 1e-12);
        assert!(!broken);
    }

    #[test]
    fn wrap_maps_into_cell() {
        let cell = Cell::cubic(10.0);
        let wrapped = wrap_into_cell(&[[12.5, -0.5, 9.9]], &cell).unwrap();
        assert_vec_close(wrapped[0], [2.5, 9.5, 9.9], 1e-12);

        let tric = Cell::new(9.0, 10.0, 11.0, 80.0, 95.0, 105.0);
        let vectors = cell::cell_vectors(&tric, DEFAULT_PRIORITY).unwrap();
        let p = [1.0, 2.0, 3.0];
        let mut outside = p;
        for k in 0..3 {
            outside[k] += 2.0 * vectors[0][k] - vectors[2][k];
        }
        let wrapped = wrap_into_cell(&[outside], &tric).unwrap();
        assert_vec_close(wrapped[0], p, 1e-9);
    }

    #[test]
    fn unwrap_recovers_smooth_path() {
        let cell = Cell::cubic(10.0);
        let frames: Vec<Vec<[f64; 3]>> = vec![
            vec![[9.8, 5.0, 5.0]],
            vec![[9.9, 5.0, 5.0]],
            vec![[0.05, 5.0, 5.0]],
            vec![[0.15, 5.0, 5.0]],
        ];
        let smooth = unwrap_frames(&frames, None, Some(&cell), ImageMode::Naive).unwrap();
        assert_vec_close(smooth[0][0], [9.8, 5.0, 5.0], 1e-12);
        assert_vec_close(smooth[2][0], [10.05, 5.0, 5.0], 1e-9);
        assert_vec_close(smooth[3][0], [10.15, 5.0, 5.0], 1e-9);
    }

    #[test]
    fn mean_of_boundary_hopper_stays_at_boundary() {
        let cell = Cell::cubic(10.0);
        let frames: Vec<Vec<[f64; 3]>> = vec![vec![[9.9, 5.0, 5.0]], vec![[0.1, 5.0, 5.0]]];
        let mean = mean_position(&frames, Some(&cell), ImageMode::Naive, true).unwrap();
        // naive average would sit mid-cell at x = 5; the unwrapped one is 10.0 → 0.0
        assert_vec_close(mean[0], [0.0, 5.0, 5.0], 1e-9);
    }

    #[test]
    fn angle_across_boundary() {
        let cell = Cell::cubic(10.0);
        // right angle at the vertex, one arm wrapped across x = 0
        let p1 = [0.1, 5.0, 5.0];
        let p0 = [9.6, 5.0, 5.0];
        let p2 = [0.1, 5.5, 5.0];
        let angle = angle_pbc(p0, p1, p2, Some(&cell), ImageMode::Naive).unwrap();
        assert!((angle - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn dihedral_sign_and_magnitude() {
        // staggered butane-like chain, no cell
        let p0 = [1.0, 1.0, 0.0];
        let p1 = [0.0, 0.0, 0.0];
        let p2 = [0.0, 0.0, 1.5];
        let p3 = [-1.0, 1.0, 1.5];
        let d = dihedral_pbc(p0, p1, p2, p3, None, ImageMode::Naive).unwrap();
        assert!((d.abs().to_degrees() - 90.0).abs() < 1e-6);
    }

    #[test]
    fn auto_order_prefers_dense_rows() {
        // monoclinic with priority (0,1,2): row 2 carries two components
        let cell = Cell::new(10.0, 12.0, 15.0, 90.0, 105.0, 90.0);
        let vectors = cell::cell_vectors(&cell, DEFAULT_PRIORITY).unwrap();
        let order = auto_priority_order(&vectors);
        assert_eq!(order[0], 2);
    }
}
