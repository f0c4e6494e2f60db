//! File I/O for trajectories and topology metadata.
//!
//! The core pipeline is format-agnostic; this layer supplies the narrow
//! collaborators around it: multi-frame XYZ reading/writing, PDB output with
//! one residue block per molecule, and a TOML topology file carrying the
//! molecule map between runs.

use std::fmt;
use std::path::Path;

pub mod error;
pub mod pdb;
pub mod topo;
pub mod xyz;

pub use error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Xyz,
    Pdb,
    Topology,
}

impl Format {
    /// Infers the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("xyz") => Some(Format::Xyz),
            Some("pdb") => Some(Format::Pdb),
            Some("toml") => Some(Format::Topology),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Xyz => write!(f, "XYZ"),
            Format::Pdb => write!(f, "PDB"),
            Format::Topology => write!(f, "topology"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::from_path(Path::new("traj.xyz")), Some(Format::Xyz));
        assert_eq!(Format::from_path(Path::new("out.PDB")), Some(Format::Pdb));
        assert_eq!(
            Format::from_path(Path::new("system.toml")),
            Some(Format::Topology)
        );
        assert_eq!(Format::from_path(Path::new("notes.txt")), None);
    }
}
