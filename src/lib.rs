//! A pure Rust library for reconstructing molecules across periodic
//! boundaries in molecular dynamics trajectories. It infers covalent
//! topology from raw coordinates, partitions atoms into molecules, and
//! "mends" each molecule so that no bond crosses a cell boundary, with
//! numerically correct minimum-image and wrapping conventions for arbitrary
//! (triclinic) unit cells.
//!
//! # Features
//!
//! - **Topology inference** — covalent connectivity from scaled
//!   van-der-Waals distance criteria, with every hydrogen snapped to exactly
//!   one heavy atom
//! - **Molecule partitioning** — worklist flood fill producing a dense
//!   per-atom molecule map
//! - **Periodic mending** — seeded weighted-average placement joining split
//!   molecules; per-frame, fast-forward and reference trajectory modes
//! - **Geometry kernel** — cell vectors with axis priority, lattice-symmetry
//!   detection, fractional/Cartesian basis changes, three minimum-image
//!   policies (naive, priority, accurate)
//! - **Alignment** — weighted Kabsch superposition of frames, grouped
//!   centres of weight, atom spread
//!
//! # Quick Start
//!
//! The main entry point is the [`mend`] function, which takes a [`System`]
//! and [`MendConfig`] and produces a [`MendedSystem`]:
//!
//! ```
//! use traj_mend::{Cell, Element, MendConfig, System, mend};
//!
//! // A water molecule straddling the x = 0 wall of a 10 Å cubic cell:
//! // the oxygen sits at x = 0.3 while one hydrogen wrapped to x = 9.65.
//! let system = System::new(
//!     vec![Element::O, Element::H, Element::H],
//!     vec![
//!         [0.30, 5.00, 5.00],
//!         [9.65, 5.00, 5.00],
//!         [0.62, 5.93, 5.00],
//!     ],
//! )
//! .with_cell(Cell::cubic(10.0));
//!
//! let mended = mend(&system, &MendConfig::default())?;
//!
//! // One molecule, detected purely from geometry
//! assert_eq!(mended.molecule_map.n_molecules(), 1);
//!
//! // The wrapped hydrogen moved next to the oxygen: the O-H separation is
//! // now a direct 0.65 Å instead of a 9.35 Å jump across the cell
//! let p = &mended.frames[0];
//! let d01 = ((p[0][0] - p[1][0]).powi(2)
//!     + (p[0][1] - p[1][1]).powi(2)
//!     + (p[0][2] - p[1][2]).powi(2))
//! .sqrt();
//! assert!((d01 - 0.65).abs() < 1e-9);
//!
//! // The centre of mass lies inside the cell
//! let c = mended.centers[0][0];
//! assert!(c.iter().all(|&x| (0.0..10.0).contains(&x)));
//! # Ok::<(), traj_mend::MendError>(())
//! ```
//!
//! # Module Organization
//!
//! - [`io`] — XYZ trajectory reading/writing, PDB output with one residue
//!   block per molecule, TOML topology files
//! - [`mend`] — the mending pipeline entry point
//! - [`MendConfig`] — bond scaling, image mode, trajectory mode, validation
//!
//! # Data Types
//!
//! - [`System`] — element symbols, coordinate frames, optional cell
//! - [`Cell`] — cell descriptor (a, b, c, α, β, γ); degenerate cells mean
//!   "no periodicity"
//! - [`Element`] — chemical element with mass and van-der-Waals radius data
//! - [`MoleculeMap`] — dense per-atom molecule labels
//! - [`Connectivity`] — per-atom covalent neighbour lists
//! - [`MendedSystem`] — joined frames, molecule map, wrapped centres
//!
//! The numeric utilities ([`distance_matrix`], [`minimum_image_shift`],
//! [`wrap_into_cell`], [`connectivity`], [`align_frames`],
//! [`center_of_weight`], …) are exported directly for downstream physics.

mod mend;
mod model;

pub mod io;

pub use model::cell::{Cell, LatticeSystem};
pub use model::system::System;
pub use model::topology::{Connectivity, InvalidMoleculeMap, MendedSystem, MoleculeMap};
pub use model::types::{Element, ParseElementError, parse_symbols};

pub use mend::{
    ImageMode, JoinedFrame, JoinedTrajectory, MAX_DENSE_ATOMS, MendConfig, NeighbourTable,
    TrajectoryMode, Validation, align_frames, angle_pbc, atom_spread, auto_priority_order,
    bond_threshold_matrix, cell_vectors, cell_volume, center_of_weight, connected_components,
    connectivity, define_molecules, dihedral_pbc, displacement, displacement_matrix,
    distance_matrix, equivalence_classes, grouped_centers, guess_atom_types, is_hydrogen_bond,
    join_frame, join_trajectory, join_with_reference, kabsch_rotation, lattice_symmetry,
    mean_position, mend, minimum_image_shift, nearest_neighbour, neighbour_matrix, priority_shift,
    rotate_frames, rotate_point, to_cartesian, to_fractional, unwrap_frames, wrap_into_cell,
    wrap_point,
};

pub use mend::Error as MendError;
