//! Joining molecules across periodic boundaries.
//!
//! Per molecule the joiner either takes a cheap fast path (no bond wraps
//! across a boundary: rigidly re-wrap the centre of weight) or grows a
//! spanning placement from a seed atom: every frontier atom gets the
//! weighted average of (placed neighbour position + periodic-corrected
//! displacement) over its placed neighbours. Internally disconnected
//! molecules are patched with a bridging edge at the nearest cut pair; an
//! iteration budget of one pass per atom bounds the loop.

use super::align;
use super::config::MendConfig;
use super::error::Error;
use super::neighbours::{self, NeighbourTable};
use super::pbc;
use crate::model::cell::Cell;
use crate::model::topology::MoleculeMap;
use crate::model::types::Element;

/// How multi-frame input is unwrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrajectoryMode {
    /// Join every frame independently with frame-specific displacement data.
    /// Correct for changing topologies, expensive.
    Frames,
    /// Join the first frame once, then track every atom by cumulative
    /// periodic shifts. Exact for immutable topologies and far cheaper.
    #[default]
    FastForward,
}

/// Joined single frame.
#[derive(Debug, Clone)]
pub struct JoinedFrame {
    /// Unwrapped positions, same atom order as the input.
    pub positions: Vec<[f64; 3]>,
    /// Per-molecule centres of weight, wrapped into the cell.
    pub centers: Vec<[f64; 3]>,
    /// Bridging edges synthesised for disconnected molecules.
    pub patched_edges: usize,
}

/// Joined trajectory.
#[derive(Debug, Clone)]
pub struct JoinedTrajectory {
    pub frames: Vec<Vec<[f64; 3]>>,
    /// `centers[frame][molecule]`.
    pub centers: Vec<Vec<[f64; 3]>>,
    pub patched_edges: usize,
}

fn resolve_weights(weights: Option<&[f64]>, n: usize) -> Vec<f64> {
    match weights {
        Some(w) => w.to_vec(),
        None => vec![1.0; n],
    }
}

/// Joins every molecule of one frame so that no bond crosses a periodic
/// boundary, then wraps each molecule's centre of weight back into the cell
/// as a rigid unit.
///
/// `weights` default to 1 (geometric centres). Without a periodic cell the
/// positions pass through unchanged and only centres are computed.
pub fn join_frame(
    positions: &[[f64; 3]],
    elements: &[Element],
    mol_map: &MoleculeMap,
    cell: Option<&Cell>,
    weights: Option<&[f64]>,
    config: &MendConfig,
) -> Result<JoinedFrame, Error> {
    let weights = resolve_weights(weights, positions.len());
    let cell = cell.filter(|c| c.is_periodic());

    let mut out = positions.to_vec();
    let mut patched = 0;

    if let Some(cell) = cell {
        for (mol, members) in mol_map.all_members().iter().enumerate() {
            if members.len() < 2 {
                continue;
            }
            let sub_pos: Vec<[f64; 3]> = members.iter().map(|&i| positions[i]).collect();
            let sub_elem: Vec<Element> = members.iter().map(|&i| elements[i]).collect();
            let sub_w: Vec<f64> = members.iter().map(|&i| weights[i]).collect();

            let table =
                neighbours::neighbour_matrix(&sub_pos, &sub_elem, Some(cell), config.bond_scale)?;
            if !any_bond_wrapped(&table) {
                continue;
            }
            let (placed, n_patched) = place_molecule(&sub_pos, &sub_w, &table, mol, members)?;
            patched += n_patched;
            for (k, &atom) in members.iter().enumerate() {
                out[atom] = placed[k];
            }
        }
    }

    let centers = rewrap_molecules(&mut out, mol_map, &weights, cell)?;
    Ok(JoinedFrame {
        positions: out,
        centers,
        patched_edges: patched,
    })
}

/// Joins a trajectory according to `config.trajectory_mode`.
pub fn join_trajectory(
    frames: &[Vec<[f64; 3]>],
    elements: &[Element],
    mol_map: &MoleculeMap,
    cell: Option<&Cell>,
    weights: Option<&[f64]>,
    config: &MendConfig,
) -> Result<JoinedTrajectory, Error> {
    let Some(first) = frames.first() else {
        return Ok(JoinedTrajectory {
            frames: Vec::new(),
            centers: Vec::new(),
            patched_edges: 0,
        });
    };

    match config.trajectory_mode {
        TrajectoryMode::Frames => {
            let mut out_frames = Vec::with_capacity(frames.len());
            let mut centers = Vec::with_capacity(frames.len());
            let mut patched = 0;
            for frame in frames {
                let joined = join_frame(frame, elements, mol_map, cell, weights, config)?;
                out_frames.push(joined.positions);
                centers.push(joined.centers);
                patched += joined.patched_edges;
            }
            Ok(JoinedTrajectory {
                frames: out_frames,
                centers,
                patched_edges: patched,
            })
        }
        TrajectoryMode::FastForward => {
            let weights = resolve_weights(weights, first.len());
            let reference = join_frame(first, elements, mol_map, cell, Some(&weights), config)?;
            let mut out_frames =
                pbc::unwrap_frames(frames, Some(&reference.positions), cell, config.image_mode)?;
            let cell = cell.filter(|c| c.is_periodic());
            let mut centers = Vec::with_capacity(out_frames.len());
            for frame in &mut out_frames {
                centers.push(rewrap_molecules(frame, mol_map, &weights, cell)?);
            }
            Ok(JoinedTrajectory {
                frames: out_frames,
                centers,
                patched_edges: reference.patched_edges,
            })
        }
    }
}

/// Unwraps one frame directly against an already-joined reference
/// configuration of the same atoms, without recomputing connectivity.
pub fn join_with_reference(
    positions: &[[f64; 3]],
    reference: &[[f64; 3]],
    mol_map: &MoleculeMap,
    cell: Option<&Cell>,
    weights: Option<&[f64]>,
    config: &MendConfig,
) -> Result<JoinedFrame, Error> {
    let weights = resolve_weights(weights, positions.len());
    let unwrapped = pbc::unwrap_frames(
        std::slice::from_ref(&positions.to_vec()),
        Some(reference),
        cell,
        config.image_mode,
    )?;
    let mut out = unwrapped.into_iter().next().unwrap_or_default();
    let cell = cell.filter(|c| c.is_periodic());
    let centers = rewrap_molecules(&mut out, mol_map, &weights, cell)?;
    Ok(JoinedFrame {
        positions: out,
        centers,
        patched_edges: 0,
    })
}

fn any_bond_wrapped(table: &NeighbourTable) -> bool {
    table
        .adjacency
        .iter()
        .zip(&table.wrapped)
        .any(|(adj_row, wrap_row)| {
            adj_row
                .iter()
                .zip(wrap_row)
                .any(|(&bonded, &wrapped)| bonded && wrapped)
        })
}

/// Wraps every molecule's centre of weight into the cell and translates the
/// molecule rigidly by the same shift. Returns the wrapped centres.
fn rewrap_molecules(
    frame: &mut [[f64; 3]],
    mol_map: &MoleculeMap,
    weights: &[f64],
    cell: Option<&Cell>,
) -> Result<Vec<[f64; 3]>, Error> {
    let mut centers = Vec::with_capacity(mol_map.n_molecules());
    for members in mol_map.all_members() {
        let sub_pos: Vec<[f64; 3]> = members.iter().map(|&i| frame[i]).collect();
        let sub_w: Vec<f64> = members.iter().map(|&i| weights[i]).collect();
        let c = align::center_of_weight(&sub_pos, &sub_w);
        match cell {
            Some(cell) => {
                let wrapped = pbc::wrap_point(c, cell)?;
                let delta = pbc::sub(wrapped, c);
                for &atom in &members {
                    frame[atom] = pbc::add(frame[atom], delta);
                }
                centers.push(wrapped);
            }
            None => centers.push(c),
        }
    }
    Ok(centers)
}

/// Grows a spanning placement over one (periodically broken) molecule.
///
/// Returns molecule-local unwrapped positions and the number of bridging
/// edges that had to be synthesised.
fn place_molecule(
    positions: &[[f64; 3]],
    weights: &[f64],
    table: &NeighbourTable,
    molecule: usize,
    atoms: &[usize],
) -> Result<(Vec<[f64; 3]>, usize), Error> {
    let n = positions.len();
    let mut adjacency = table.adjacency.clone();
    let vectors = &table.vectors;

    // seed: well-connected heavy atom, trusted as-is
    let mut seed = 0;
    let mut best = f64::INFINITY;
    for i in 0..n {
        let total: f64 = vectors[i].iter().map(|&v| pbc::dot(v, v)).sum();
        let score = total.sqrt() / weights[i];
        if score < best {
            best = score;
            seed = i;
        }
    }

    let mut buffer = positions.to_vec();
    let mut placed = vec![false; n];
    placed[seed] = true;
    let mut n_placed = 1;
    let mut iterations = 0;
    let mut patched = 0;

    while n_placed < n {
        let frontier: Vec<usize> = (0..n)
            .filter(|&j| !placed[j] && (0..n).any(|i| placed[i] && adjacency[i][j]))
            .collect();

        if frontier.is_empty() {
            // connectivity is interrupted: bridge the nearest cut pair
            let mut best = f64::INFINITY;
            let mut pair = (seed, seed);
            for i in (0..n).filter(|&i| placed[i]) {
                for j in (0..n).filter(|&j| !placed[j]) {
                    let d = pbc::norm(vectors[i][j]);
                    if d < best {
                        best = d;
                        pair = (i, j);
                    }
                }
            }
            adjacency[pair.0][pair.1] = true;
            adjacency[pair.1][pair.0] = true;
            patched += 1;
            log::warn!(
                "molecule {molecule}: connectivity interrupted; bridging atoms \
                 {} and {}",
                atoms[pair.0],
                atoms[pair.1]
            );
        } else {
            let mut updates = Vec::with_capacity(frontier.len());
            for &j in &frontier {
                let mut acc = [0.0; 3];
                let mut count = 0.0;
                for i in (0..n).filter(|&i| placed[i] && adjacency[i][j]) {
                    acc = pbc::add(acc, pbc::add(buffer[i], vectors[i][j]));
                    count += 1.0;
                }
                updates.push((j, acc.map(|v| v / count)));
            }
            for (j, p) in updates {
                buffer[j] = p;
                placed[j] = true;
                n_placed += 1;
            }
        }

        iterations += 1;
        if n_placed < n && iterations > n {
            return Err(Error::JoinFailure {
                molecule,
                iterations,
                partial: buffer,
            });
        }
    }
    Ok((buffer, patched))
}
