use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("molecule map is not a dense enumeration starting at 0")]
pub struct InvalidMoleculeMap;

/// Per-atom integer partition labels grouping atoms into molecules.
///
/// Labels are a dense enumeration `0..n_molecules`: every value in that range
/// is used by at least one atom. The map is the partition key for centre
/// grouping, per-molecule joining and residue-block output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoleculeMap {
    labels: Vec<usize>,
    n_molecules: usize,
}

impl MoleculeMap {
    /// Validates density: `sorted(unique(labels)) == 0..n` must hold.
    pub fn from_labels(labels: Vec<usize>) -> Result<Self, InvalidMoleculeMap> {
        if labels.is_empty() {
            return Ok(Self {
                labels,
                n_molecules: 0,
            });
        }
        let n = labels.iter().max().copied().unwrap_or(0) + 1;
        let mut seen = vec![false; n];
        for &l in &labels {
            seen[l] = true;
        }
        if seen.iter().all(|&s| s) {
            Ok(Self {
                labels,
                n_molecules: n,
            })
        } else {
            Err(InvalidMoleculeMap)
        }
    }

    /// For labelings that are dense by construction (flood fill output).
    pub(crate) fn from_dense_labels(labels: Vec<usize>, n_molecules: usize) -> Self {
        debug_assert!(labels.iter().all(|&l| l < n_molecules.max(1)));
        Self {
            labels,
            n_molecules,
        }
    }

    #[inline]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    #[inline]
    pub fn n_molecules(&self) -> usize {
        self.n_molecules
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn label(&self, atom: usize) -> usize {
        self.labels[atom]
    }

    /// Atom indices belonging to molecule `molecule`, in input order.
    pub fn members(&self, molecule: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == molecule)
            .map(|(i, _)| i)
            .collect()
    }

    /// Member lists for all molecules at once, indexed by label.
    pub fn all_members(&self) -> Vec<Vec<usize>> {
        let mut members = vec![Vec::new(); self.n_molecules];
        for (atom, &l) in self.labels.iter().enumerate() {
            members[l].push(atom);
        }
        members
    }
}

/// Covalent neighbour lists, one ordered list of bonded atom indices per atom.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Connectivity {
    pub neighbours: Vec<Vec<usize>>,
}

impl Connectivity {
    pub fn atom_count(&self) -> usize {
        self.neighbours.len()
    }

    pub fn bond_count(&self) -> usize {
        self.neighbours.iter().map(Vec::len).sum::<usize>() / 2
    }

    pub fn are_bonded(&self, i: usize, j: usize) -> bool {
        self.neighbours[i].contains(&j)
    }
}

/// Output of the mending pipeline: joined coordinates plus the detected
/// partition and per-molecule centres of weight.
#[derive(Debug, Clone)]
pub struct MendedSystem {
    /// Joined frames, same shape as the input frames.
    pub frames: Vec<Vec<[f64; 3]>>,
    pub molecule_map: MoleculeMap,
    /// Per-frame, per-molecule centres of weight, wrapped into the cell.
    pub centers: Vec<Vec<[f64; 3]>>,
    /// Bridging edges synthesised for internally disconnected molecules.
    pub patched_edges: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_map_accepted() {
        let map = MoleculeMap::from_labels(vec![0, 0, 1, 2, 1]).unwrap();
        assert_eq!(map.n_molecules(), 3);
        assert_eq!(map.members(1), vec![2, 4]);
        assert_eq!(map.all_members(), vec![vec![0, 1], vec![2, 4], vec![3]]);
    }

    #[test]
    fn gapped_map_rejected() {
        assert!(MoleculeMap::from_labels(vec![0, 2, 2]).is_err());
        assert!(MoleculeMap::from_labels(vec![1, 1]).is_err());
    }

    #[test]
    fn empty_map() {
        let map = MoleculeMap::from_labels(Vec::new()).unwrap();
        assert_eq!(map.n_molecules(), 0);
        assert_eq!(map.atom_count(), 0);
    }

    #[test]
    fn connectivity_counts() {
        let conn = Connectivity {
            neighbours: vec![vec![1, 2], vec![0], vec![0]],
        };
        assert_eq!(conn.atom_count(), 3);
        assert_eq!(conn.bond_count(), 2);
        assert!(conn.are_bonded(0, 2));
        assert!(!conn.are_bonded(1, 2));
    }
}
