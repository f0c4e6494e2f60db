//! Centres of weight, rigid alignment and spread measures.
//!
//! Alignment uses the Kabsch algorithm: weighted cross-covariance, SVD, and
//! a determinant correction forcing a proper rotation (det = +1).

use nalgebra::{Matrix3, Vector3};

use crate::model::topology::MoleculeMap;

/// Weighted centroid of a position set.
///
/// # Panics
///
/// Panics if `positions` and `weights` differ in length or are empty.
pub fn center_of_weight(positions: &[[f64; 3]], weights: &[f64]) -> [f64; 3] {
    assert_eq!(positions.len(), weights.len());
    assert!(!positions.is_empty(), "centre of an empty set");
    let mut acc = [0.0; 3];
    let mut total = 0.0;
    for (p, &w) in positions.iter().zip(weights) {
        for k in 0..3 {
            acc[k] += p[k] * w;
        }
        total += w;
    }
    acc.map(|v| v / total)
}

/// One centre of weight per molecule-map group, indexed by label.
pub fn grouped_centers(
    positions: &[[f64; 3]],
    weights: &[f64],
    map: &MoleculeMap,
) -> Vec<[f64; 3]> {
    map.all_members()
        .iter()
        .map(|members| {
            let p: Vec<[f64; 3]> = members.iter().map(|&i| positions[i]).collect();
            let w: Vec<f64> = members.iter().map(|&i| weights[i]).collect();
            center_of_weight(&p, &w)
        })
        .collect()
}

/// Per-axis extent (max − min) of a position set.
pub fn atom_spread(positions: &[[f64; 3]]) -> [f64; 3] {
    let mut spread = [0.0; 3];
    for k in 0..3 {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for p in positions {
            min = min.min(p[k]);
            max = max.max(p[k]);
        }
        spread[k] = max - min;
    }
    spread
}

/// Optimal proper rotation aligning `mobile` onto `reference` (both already
/// centred), weighted per point.
///
/// Falls back to the identity when the SVD fails to produce factors, which
/// only happens for pathological covariance input.
pub fn kabsch_rotation(
    mobile: &[[f64; 3]],
    reference: &[[f64; 3]],
    weights: &[f64],
) -> [[f64; 3]; 3] {
    let mut h: Matrix3<f64> = Matrix3::zeros();
    for ((p, q), &w) in mobile.iter().zip(reference).zip(weights) {
        let x = Vector3::new(p[0], p[1], p[2]) * w;
        let y = Vector3::new(q[0], q[1], q[2]) * w;
        h += x * y.transpose();
    }

    let svd = h.svd(true, true);
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return identity(),
    };
    let mut r: Matrix3<f64> = v_t.transpose() * u.transpose();
    if r.determinant() < 0.0 {
        let mut v_t = v_t;
        v_t.row_mut(2).neg_mut();
        r = v_t.transpose() * u.transpose();
    }
    [
        [r[(0, 0)], r[(0, 1)], r[(0, 2)]],
        [r[(1, 0)], r[(1, 1)], r[(1, 2)]],
        [r[(2, 0)], r[(2, 1)], r[(2, 2)]],
    ]
}

fn identity() -> [[f64; 3]; 3] {
    [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
}

/// Applies a rotation matrix to a point: `r · p`.
pub fn rotate_point(r: &[[f64; 3]; 3], p: [f64; 3]) -> [f64; 3] {
    [
        r[0][0] * p[0] + r[0][1] * p[1] + r[0][2] * p[2],
        r[1][0] * p[0] + r[1][1] * p[1] + r[1][2] * p[2],
        r[2][0] * p[0] + r[2][1] * p[1] + r[2][2] * p[2],
    ]
}

/// Aligns every frame onto a reference by weighted rigid-body superposition.
///
/// Each frame is translated so the weighted centroid of the chosen subset
/// vanishes, rotated by the Kabsch solution for that subset, and shifted to
/// the reference centroid. The whole frame moves; only the subset steers.
/// Returns the per-frame rotation matrices, which [`rotate_frames`] can
/// replay onto auxiliary vector data such as velocities.
///
/// Without an explicit `reference`, the first frame's subset is used.
pub fn align_frames(
    frames: &mut [Vec<[f64; 3]>],
    weights: &[f64],
    reference: Option<&[[f64; 3]]>,
    subset: Option<&[usize]>,
) -> Vec<[[f64; 3]; 3]> {
    if frames.is_empty() {
        return Vec::new();
    }
    let take = |frame: &[[f64; 3]]| -> Vec<[f64; 3]> {
        match subset {
            Some(idx) => idx.iter().map(|&i| frame[i]).collect(),
            None => frame.to_vec(),
        }
    };
    let sub_weights: Vec<f64> = match subset {
        Some(idx) => idx.iter().map(|&i| weights[i]).collect(),
        None => weights.to_vec(),
    };

    let reference_sub = match reference {
        Some(r) => take(r),
        None => take(&frames[0]),
    };
    let com_ref = center_of_weight(&reference_sub, &sub_weights);
    let centred_ref: Vec<[f64; 3]> = reference_sub
        .iter()
        .map(|p| [p[0] - com_ref[0], p[1] - com_ref[1], p[2] - com_ref[2]])
        .collect();

    let mut rotations = Vec::with_capacity(frames.len());
    for frame in frames.iter_mut() {
        let mobile_sub = take(frame);
        let com = center_of_weight(&mobile_sub, &sub_weights);
        let centred_sub: Vec<[f64; 3]> = mobile_sub
            .iter()
            .map(|p| [p[0] - com[0], p[1] - com[1], p[2] - com[2]])
            .collect();
        let r = kabsch_rotation(&centred_sub, &centred_ref, &sub_weights);

        for p in frame.iter_mut() {
            let centred = [p[0] - com[0], p[1] - com[1], p[2] - com[2]];
            let rotated = rotate_point(&r, centred);
            *p = [
                rotated[0] + com_ref[0],
                rotated[1] + com_ref[1],
                rotated[2] + com_ref[2],
            ];
        }
        rotations.push(r);
    }
    rotations
}

/// Replays per-frame rotations onto auxiliary vector data (velocities,
/// moments) so it stays consistent with aligned positions. Pure vectors get
/// no translation.
pub fn rotate_frames(data: &mut [Vec<[f64; 3]>], rotations: &[[[f64; 3]; 3]]) {
    for (frame, r) in data.iter_mut().zip(rotations) {
        for v in frame.iter_mut() {
            *v = rotate_point(r, *v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotate_z(p: [f64; 3], degrees: f64) -> [f64; 3] {
        let (s, c) = degrees.to_radians().sin_cos();
        [c * p[0] - s * p[1], s * p[0] + c * p[1], p[2]]
    }

    #[test]
    fn weighted_centroid() {
        let c = center_of_weight(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]], &[3.0, 1.0]);
        assert!((c[0] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn centers_per_group() {
        let map = MoleculeMap::from_labels(vec![0, 1, 0]).unwrap();
        let centers = grouped_centers(
            &[[0.0, 0.0, 0.0], [5.0, 5.0, 5.0], [2.0, 0.0, 0.0]],
            &[1.0, 1.0, 1.0],
            &map,
        );
        assert_eq!(centers.len(), 2);
        assert!((centers[0][0] - 1.0).abs() < 1e-12);
        assert!((centers[1][0] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn spread_extents() {
        let s = atom_spread(&[[0.0, -1.0, 2.0], [3.0, 1.0, 2.0]]);
        assert_eq!(s, [3.0, 2.0, 0.0]);
    }

    #[test]
    fn kabsch_recovers_known_rotation() {
        let reference = vec![
            [1.0, 0.0, 0.0],
            [0.0, 1.5, 0.0],
            [0.0, 0.0, 2.0],
            [-1.0, -1.0, 0.5],
        ];
        let mobile: Vec<[f64; 3]> = reference.iter().map(|&p| rotate_z(p, -40.0)).collect();
        let w = vec![1.0; 4];
        let r = kabsch_rotation(&mobile, &reference, &w);
        // rotating mobile by r must reproduce the reference
        for (m, q) in mobile.iter().zip(&reference) {
            let back = rotate_point(&r, *m);
            for k in 0..3 {
                assert!((back[k] - q[k]).abs() < 1e-9);
            }
        }
        // proper rotation
        let det = r[0][0] * (r[1][1] * r[2][2] - r[1][2] * r[2][1])
            - r[0][1] * (r[1][0] * r[2][2] - r[1][2] * r[2][0])
            + r[0][2] * (r[1][0] * r[2][1] - r[1][1] * r[2][0]);
        assert!((det - 1.0).abs() < 1e-9);
    }

    #[test]
    fn align_undoes_rotation_and_drift() {
        let base = vec![
            [1.0, 0.0, 0.0],
            [0.0, 1.5, 0.0],
            [0.0, 0.0, 2.0],
            [-1.0, -1.0, 0.5],
        ];
        let moved: Vec<[f64; 3]> = base
            .iter()
            .map(|&p| {
                let r = rotate_z(p, 25.0);
                [r[0] + 3.0, r[1] - 1.0, r[2] + 0.5]
            })
            .collect();
        let mut frames = vec![base.clone(), moved];
        let w = vec![1.0; 4];
        let rotations = align_frames(&mut frames, &w, None, None);
        assert_eq!(rotations.len(), 2);
        for (p, q) in frames[1].iter().zip(&base) {
            for k in 0..3 {
                assert!((p[k] - q[k]).abs() < 1e-9, "{:?} != {:?}", frames[1], base);
            }
        }
    }

    #[test]
    fn subset_steers_whole_frame() {
        let base = vec![
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [-1.0, 0.0, 0.0],
            [9.0, 9.0, 9.0], // passenger atom, not in the subset
        ];
        let moved: Vec<[f64; 3]> = base.iter().map(|&p| rotate_z(p, 90.0)).collect();
        let mut frames = vec![moved];
        let w = vec![1.0; 4];
        align_frames(&mut frames, &w, Some(&base), Some(&[0, 1, 2]));
        for (p, q) in frames[0].iter().zip(&base) {
            for k in 0..3 {
                assert!((p[k] - q[k]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn velocities_rotate_without_translation() {
        let mut data = vec![vec![[1.0, 0.0, 0.0]]];
        let r = [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        rotate_frames(&mut data, &[r]);
        assert!((data[0][0][1] - 1.0).abs() < 1e-12);
        assert!(data[0][0][0].abs() < 1e-12);
    }
}
