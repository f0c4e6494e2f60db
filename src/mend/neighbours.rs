//! Dense pair matrices and covalent-neighbour detection.
//!
//! Bonds are thresholded at a scaled sum of van-der-Waals radii (default
//! factor 0.6), with one physically motivated override: every hydrogen is
//! force-matched to exactly one nearest heavy atom, so each hydrogen ends up
//! in exactly one bond no matter what the raw distances say.

use std::f64::consts::PI;

use super::error::Error;
use super::pbc::{self, ImageMode, Shifter};
use crate::model::cell::Cell;
use crate::model::topology::Connectivity;
use crate::model::types::Element;

/// Size guard for dense N² pair matrices.
pub const MAX_DENSE_ATOMS: usize = 10_000;

fn guard(n0: usize, n1: usize) -> Result<(), Error> {
    let atoms = n0.max(n1);
    if atoms > MAX_DENSE_ATOMS {
        return Err(Error::TooManyAtoms {
            atoms,
            limit: MAX_DENSE_ATOMS,
        });
    }
    Ok(())
}

/// N×N bond distance criteria: entry (i, j) is `scale · (r_vdw(i) + r_vdw(j))`.
///
/// # Errors
///
/// [`Error::UnknownElement`] if any element has no tabulated radius.
pub fn bond_threshold_matrix(elements: &[Element], scale: f64) -> Result<Vec<Vec<f64>>, Error> {
    let radii: Vec<f64> = elements
        .iter()
        .map(|&e| {
            e.vdw_radius()
                .ok_or_else(|| Error::unknown_element(e, "van-der-Waals radius"))
        })
        .collect::<Result<_, _>>()?;
    Ok(radii
        .iter()
        .map(|ri| radii.iter().map(|rj| scale * (ri + rj)).collect())
        .collect())
}

/// Pairwise minimum-image displacement vectors `p1[j] - p0[i]` plus flags
/// marking pairs whose raw difference was wrapped.
///
/// With `p1` omitted the matrix is computed within `p0`.
pub fn displacement_matrix(
    p0: &[[f64; 3]],
    p1: Option<&[[f64; 3]]>,
    cell: Option<&Cell>,
    mode: ImageMode,
) -> Result<(Vec<Vec<[f64; 3]>>, Vec<Vec<bool>>), Error> {
    let p1 = p1.unwrap_or(p0);
    guard(p0.len(), p1.len())?;
    let shifter = Shifter::new(cell, mode)?;

    let mut vectors = Vec::with_capacity(p0.len());
    let mut wrapped = Vec::with_capacity(p0.len());
    for &a in p0 {
        let mut vec_row = Vec::with_capacity(p1.len());
        let mut wrap_row = Vec::with_capacity(p1.len());
        for &b in p1 {
            let d = pbc::sub(b, a);
            let shift = shifter.shift(d);
            vec_row.push(pbc::sub(d, shift));
            wrap_row.push(shift != [0.0; 3]);
        }
        vectors.push(vec_row);
        wrapped.push(wrap_row);
    }
    Ok((vectors, wrapped))
}

/// Pairwise minimum-image distances between two position sets (or within one
/// set if `p1` is omitted).
pub fn distance_matrix(
    p0: &[[f64; 3]],
    p1: Option<&[[f64; 3]]>,
    cell: Option<&Cell>,
    mode: ImageMode,
) -> Result<Vec<Vec<f64>>, Error> {
    let (vectors, _) = displacement_matrix(p0, p1, cell, mode)?;
    Ok(vectors
        .into_iter()
        .map(|row| row.into_iter().map(pbc::norm).collect())
        .collect())
}

/// Full neighbour data for one frame: adjacency, displacement vectors and
/// the per-pair wrap mask the joiner's fast path consumes.
#[derive(Debug, Clone)]
pub struct NeighbourTable {
    /// Symmetric adjacency with zero diagonal.
    pub adjacency: Vec<Vec<bool>>,
    /// Minimum-image displacement `r_j - r_i` for every pair.
    pub vectors: Vec<Vec<[f64; 3]>>,
    /// True where the raw difference was wrapped across a boundary.
    pub wrapped: Vec<Vec<bool>>,
}

/// Builds the thresholded adjacency matrix with the hydrogen override.
///
/// Hydrogens are first cleared from the distance matrix and then reconnected
/// to their single nearest non-hydrogen atom (first argmin wins on ties), so
/// the subsequent threshold can only keep that one bond per hydrogen.
pub fn neighbour_matrix(
    positions: &[[f64; 3]],
    elements: &[Element],
    cell: Option<&Cell>,
    scale: f64,
) -> Result<NeighbourTable, Error> {
    let n = positions.len();
    let (vectors, wrapped) = displacement_matrix(positions, None, cell, ImageMode::Naive)?;

    let mut dist: Vec<Vec<f64>> = vectors
        .iter()
        .map(|row| row.iter().map(|&v| pbc::norm(v)).collect())
        .collect();
    for (i, row) in dist.iter_mut().enumerate() {
        for (j, d) in row.iter_mut().enumerate() {
            if i == j || *d == 0.0 {
                *d = f64::INFINITY;
            }
        }
    }

    // pick each hydrogen's partner from the uncleared distances
    let mut snaps: Vec<(usize, usize)> = Vec::new();
    for (h, e) in elements.iter().enumerate() {
        if !e.is_hydrogen() {
            continue;
        }
        let heavy = nearest_index(&dist[h], |j| !elements[j].is_hydrogen());
        // an all-hydrogen system has no heavy partner; fall back to any atom
        let partner = heavy.or_else(|| nearest_index(&dist[h], |j| j != h));
        if let Some(j) = partner {
            snaps.push((h, j));
        }
    }
    for (h, e) in elements.iter().enumerate() {
        if !e.is_hydrogen() {
            continue;
        }
        for j in 0..n {
            dist[h][j] = f64::INFINITY;
            dist[j][h] = f64::INFINITY;
        }
    }
    for &(h, j) in &snaps {
        dist[h][j] = 0.0;
        dist[j][h] = 0.0;
    }

    let crit = bond_threshold_matrix(elements, scale)?;
    let adjacency = dist
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row.iter()
                .enumerate()
                .map(|(j, &d)| d <= crit[i][j])
                .collect()
        })
        .collect();

    Ok(NeighbourTable {
        adjacency,
        vectors,
        wrapped,
    })
}

fn nearest_index<F: Fn(usize) -> bool>(row: &[f64], keep: F) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (j, &d) in row.iter().enumerate() {
        if !keep(j) || d.is_infinite() {
            continue;
        }
        if best.map_or(true, |(_, b)| d < b) {
            best = Some((j, d));
        }
    }
    best.map(|(j, _)| j)
}

/// Covalently bound neighbours per atom, in index order.
pub fn connectivity(
    positions: &[[f64; 3]],
    elements: &[Element],
    cell: Option<&Cell>,
    scale: f64,
) -> Result<Connectivity, Error> {
    let table = neighbour_matrix(positions, elements, cell, scale)?;
    Ok(Connectivity {
        neighbours: table
            .adjacency
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|(_, &a)| a)
                    .map(|(j, _)| j)
                    .collect()
            })
            .collect(),
    })
}

/// Index of the nearest atom in `p1` for every atom in `p0`, under periodic
/// boundaries. Indices listed in `ignore` are excluded as targets.
///
/// # Panics
///
/// Panics if `p1` is empty (or entirely ignored) while `p0` is not.
pub fn nearest_neighbour(
    p0: &[[f64; 3]],
    p1: &[[f64; 3]],
    cell: Option<&Cell>,
    ignore: Option<&[usize]>,
) -> Result<Vec<usize>, Error> {
    let mut dist = distance_matrix(p0, Some(p1), cell, ImageMode::Naive)?;
    if let Some(ignore) = ignore {
        for row in &mut dist {
            for &j in ignore {
                row[j] = f64::INFINITY;
            }
        }
    }
    Ok(dist
        .iter()
        .map(|row| {
            nearest_index(row, |_| true).expect("nearest_neighbour requires a non-empty target set")
        })
        .collect())
}

/// Geometric hydrogen-bond test between donor and acceptor heavy atoms.
///
/// Returns one flag per (donor, acceptor) pair: true when a hydrogen from
/// `hydrogens` sits within the donor–hydrogen–acceptor distance chain allowed
/// by `dist_crit` (angstrom) and the bend angle is at least `angle_crit`
/// (degrees).
pub fn is_hydrogen_bond(
    positions: &[[f64; 3]],
    donors: &[usize],
    acceptors: &[usize],
    hydrogens: &[usize],
    cell: Option<&Cell>,
    dist_crit: f64,
    angle_crit: f64,
) -> Result<Vec<Vec<bool>>, Error> {
    let ac = angle_crit.to_radians();
    // law of sines for the longest admissible donor-H-acceptor chain
    let chain_crit = dist_crit / ac.sin() * ((PI - ac) / 2.0).sin() * 2.0;

    let d_pos: Vec<[f64; 3]> = donors.iter().map(|&i| positions[i]).collect();
    let a_pos: Vec<[f64; 3]> = acceptors.iter().map(|&i| positions[i]).collect();
    let h_pos: Vec<[f64; 3]> = hydrogens.iter().map(|&i| positions[i]).collect();
    let dist_da = distance_matrix(&d_pos, Some(&a_pos), cell, ImageMode::Naive)?;
    let dist_dh = distance_matrix(&d_pos, Some(&h_pos), cell, ImageMode::Naive)?;
    let dist_ah = distance_matrix(&a_pos, Some(&h_pos), cell, ImageMode::Naive)?;

    let mut answer = vec![vec![false; acceptors.len()]; donors.len()];
    for (di, &donor) in donors.iter().enumerate() {
        for (ai, &acceptor) in acceptors.iter().enumerate() {
            if dist_da[di][ai] > dist_crit {
                continue;
            }
            let candidates: Vec<usize> = (0..hydrogens.len())
                .filter(|&h| dist_dh[di][h] <= chain_crit / 2.0)
                .collect();
            if candidates.is_empty() {
                log::warn!("no hydrogen atom found at donor {donor}");
                continue;
            }
            let h = candidates
                .iter()
                .copied()
                .min_by(|&a, &b| dist_ah[ai][a].total_cmp(&dist_ah[ai][b]))
                .unwrap_or(candidates[0]);
            if dist_dh[di][h] + dist_ah[ai][h] <= chain_crit {
                let angle = pbc::angle_pbc(
                    positions[donor],
                    positions[hydrogens[h]],
                    positions[acceptor],
                    cell,
                    ImageMode::Naive,
                )?;
                if angle >= ac {
                    answer[di][ai] = true;
                }
            }
        }
    }
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Water with the hydrogens squeezed close enough that the raw H-H
    /// distance falls below the H-H bond threshold.
    fn tight_water() -> (Vec<[f64; 3]>, Vec<Element>) {
        (
            vec![[0.0, 0.0, 0.0], [0.96, 0.0, 0.0], [0.2, 0.94, 0.0]],
            vec![Element::O, Element::H, Element::H],
        )
    }

    #[test]
    fn thresholds_scale_radius_sums() {
        let crit = bond_threshold_matrix(&[Element::O, Element::H], 0.6).unwrap();
        assert!((crit[0][1] - 0.6 * (1.52 + 1.20)).abs() < 1e-12);
        assert!((crit[0][1] - crit[1][0]).abs() < 1e-12);
    }

    #[test]
    fn missing_radius_is_an_error() {
        let err = bond_threshold_matrix(&[Element::Fe, Element::O], 0.6).unwrap_err();
        assert!(matches!(err, Error::UnknownElement { .. }));
    }

    #[test]
    fn distances_respect_periodicity() {
        let cell = Cell::cubic(10.0);
        let dist = distance_matrix(
            &[[0.5, 5.0, 5.0], [9.5, 5.0, 5.0]],
            None,
            Some(&cell),
            ImageMode::Naive,
        )
        .unwrap();
        assert!((dist[0][1] - 1.0).abs() < 1e-12);
        assert!((dist[1][0] - 1.0).abs() < 1e-12);
        assert_eq!(dist[0][0], 0.0);
    }

    #[test]
    fn dense_matrix_guard() {
        let many = vec![[0.0; 3]; MAX_DENSE_ATOMS + 1];
        let err = distance_matrix(&many, None, None, ImageMode::Naive).unwrap_err();
        assert!(matches!(err, Error::TooManyAtoms { atoms: 10_001, .. }));
    }

    #[test]
    fn hydrogen_override_blocks_hh_bonds() {
        let (pos, elements) = tight_water();
        // raw H-H distance is below the H-H threshold...
        let hh = pbc::norm(pbc::sub(pos[2], pos[1]));
        let crit = bond_threshold_matrix(&elements, 0.6).unwrap();
        assert!(hh < crit[1][2]);

        // ...but the override keeps each hydrogen on the oxygen only
        let conn = connectivity(&pos, &elements, None, 0.6).unwrap();
        assert_eq!(conn.neighbours[0], vec![1, 2]);
        assert_eq!(conn.neighbours[1], vec![0]);
        assert_eq!(conn.neighbours[2], vec![0]);
    }

    #[test]
    fn connectivity_is_symmetric() {
        let (pos, elements) = tight_water();
        let conn = connectivity(&pos, &elements, None, 0.6).unwrap();
        for (i, row) in conn.neighbours.iter().enumerate() {
            for &j in row {
                assert!(conn.are_bonded(j, i), "asymmetric pair ({i}, {j})");
            }
        }
    }

    #[test]
    fn wrapped_flags_mark_boundary_pairs() {
        let cell = Cell::cubic(10.0);
        let (_, wrapped) = displacement_matrix(
            &[[0.1, 5.0, 5.0], [9.9, 5.0, 5.0], [1.0, 5.0, 5.0]],
            None,
            Some(&cell),
            ImageMode::Naive,
        )
        .unwrap();
        assert!(wrapped[0][1]);
        assert!(wrapped[1][0]);
        assert!(!wrapped[0][2]);
    }

    #[test]
    fn nearest_neighbour_with_ignore() {
        let p0 = vec![[0.0, 0.0, 0.0]];
        let p1 = vec![[1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [3.0, 0.0, 0.0]];
        assert_eq!(nearest_neighbour(&p0, &p1, None, None).unwrap(), vec![0]);
        assert_eq!(
            nearest_neighbour(&p0, &p1, None, Some(&[0])).unwrap(),
            vec![1]
        );
    }

    #[test]
    fn hydrogen_bond_geometry() {
        // linear O-H···O arrangement donates; a perpendicular acceptor does not
        let pos = vec![
            [0.0, 0.0, 0.0],  // donor O
            [0.96, 0.0, 0.0], // H
            [2.8, 0.0, 0.0],  // acceptor in line
            [0.0, 2.8, 0.0],  // acceptor off axis
        ];
        let hb = is_hydrogen_bond(&pos, &[0], &[2, 3], &[1], None, 3.0, 130.0).unwrap();
        assert!(hb[0][0]);
        assert!(!hb[0][1]);
    }
}
