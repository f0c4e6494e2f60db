mod align;
mod cell;
mod config;
mod error;
mod join;
mod neighbours;
mod partition;
mod pbc;

pub use align::{
    align_frames, atom_spread, center_of_weight, grouped_centers, kabsch_rotation, rotate_frames,
    rotate_point,
};
pub use cell::{cell_vectors, cell_volume, lattice_symmetry, to_cartesian, to_fractional};
pub use config::{MendConfig, Validation};
pub use error::Error;
pub use join::{
    JoinedFrame, JoinedTrajectory, TrajectoryMode, join_frame, join_trajectory,
    join_with_reference,
};
pub use neighbours::{
    MAX_DENSE_ATOMS, NeighbourTable, bond_threshold_matrix, connectivity, displacement_matrix,
    distance_matrix, is_hydrogen_bond, nearest_neighbour, neighbour_matrix,
};
pub use partition::{connected_components, define_molecules, equivalence_classes, guess_atom_types};
pub use pbc::{
    ImageMode, angle_pbc, auto_priority_order, dihedral_pbc, displacement, mean_position,
    minimum_image_shift, priority_shift, unwrap_frames, wrap_into_cell, wrap_point,
};

use crate::model::system::System;
use crate::model::topology::MendedSystem;

/// Runs the full pipeline on a system: infer connectivity on the first
/// frame, partition atoms into molecules, and join every frame so no bond
/// crosses a periodic boundary.
///
/// Atomic masses are used as weights for the molecule centres.
pub fn mend(system: &System, config: &MendConfig) -> Result<MendedSystem, Error> {
    let weights = system.masses();
    let molecule_map = partition::define_molecules(
        system.positions(),
        &system.elements,
        system.cell.as_ref(),
        config,
    )?;

    let joined = join::join_trajectory(
        &system.frames,
        &system.elements,
        &molecule_map,
        system.cell.as_ref(),
        Some(&weights),
        config,
    )?;

    Ok(MendedSystem {
        frames: joined.frames,
        molecule_map,
        centers: joined.centers,
        patched_edges: joined.patched_edges,
    })
}
