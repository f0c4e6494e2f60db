//! Partitioning atoms into molecules (and, more generally, labelling the
//! connected components of any per-atom neighbour relation).
//!
//! The fill runs on an explicit worklist with a visited check and a
//! decrementing atom budget, so large systems cannot exhaust the call stack
//! and the budget accounting stays visible.

use super::config::{MendConfig, Validation};
use super::error::Error;
use super::neighbours;
use crate::model::cell::Cell;
use crate::model::topology::{Connectivity, MoleculeMap};
use crate::model::types::Element;

/// Labels the connected components of `neighbours` with a dense enumeration
/// starting at 0. Components are numbered in order of their lowest atom
/// index.
pub fn connected_components(neighbours: &[Vec<usize>]) -> MoleculeMap {
    let n = neighbours.len();
    const UNASSIGNED: usize = usize::MAX;
    let mut labels = vec![UNASSIGNED; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut next_label = 0;
    let mut budget = n;

    for seed in 0..n {
        if labels[seed] != UNASSIGNED {
            continue;
        }
        labels[seed] = next_label;
        budget -= 1;
        stack.push(seed);
        while let Some(atom) = stack.pop() {
            for &nb in &neighbours[atom] {
                if labels[nb] == UNASSIGNED {
                    labels[nb] = next_label;
                    budget -= 1;
                    stack.push(nb);
                }
            }
            if budget == 0 {
                stack.clear();
                break;
            }
        }
        next_label += 1;
        if budget == 0 {
            break;
        }
    }
    MoleculeMap::from_dense_labels(labels, next_label)
}

/// Infers connectivity from geometry and partitions the atoms into
/// molecules.
///
/// With `config.expected_molecules` set, a count mismatch is logged under
/// [`Validation::Lenient`] and fails with [`Error::BrokenTopology`] under
/// [`Validation::Strict`].
pub fn define_molecules(
    positions: &[[f64; 3]],
    elements: &[Element],
    cell: Option<&Cell>,
    config: &MendConfig,
) -> Result<MoleculeMap, Error> {
    let conn = neighbours::connectivity(positions, elements, cell, config.bond_scale)?;
    let map = connected_components(&conn.neighbours);
    if let Some(expected) = config.expected_molecules {
        if map.n_molecules() != expected {
            match config.validation {
                Validation::Strict => {
                    return Err(Error::BrokenTopology {
                        expected,
                        found: map.n_molecules(),
                    });
                }
                Validation::Lenient => log::warn!(
                    "expected {expected} molecules but found {}; continuing with \
                     the detected partition",
                    map.n_molecules()
                ),
            }
        }
    }
    Ok(map)
}

/// Labels equivalence classes from a boolean N×N is-equivalent matrix, using
/// the same fill as the molecule partition. The class representative is the
/// first member found.
///
/// # Panics
///
/// Panics if `kernel` is not square.
pub fn equivalence_classes(kernel: &[Vec<bool>]) -> MoleculeMap {
    let n = kernel.len();
    let neighbours: Vec<Vec<usize>> = kernel
        .iter()
        .map(|row| {
            assert_eq!(row.len(), n, "equivalence kernel must be square");
            row.iter()
                .enumerate()
                .filter(|(_, &eq)| eq)
                .map(|(j, _)| j)
                .collect()
        })
        .collect();
    connected_components(&neighbours)
}

/// Assigns integer atom types by a connectivity similarity kernel.
///
/// Each atom's character is its own symbol plus, for `order >= 1`, the
/// sorted symbols of its bonded neighbours, plus, for `order >= 2`, the
/// sorted neighbour-shell characters one bond further out. Atoms with equal
/// characters share a type; types are a dense enumeration starting at 0.
pub fn guess_atom_types(
    positions: &[[f64; 3]],
    elements: &[Element],
    cell: Option<&Cell>,
    bond_scale: f64,
    order: usize,
) -> Result<Vec<usize>, Error> {
    let conn = neighbours::connectivity(positions, elements, cell, bond_scale)?;
    let characters = connectivity_characters(elements, &conn, order);

    let kernel: Vec<Vec<bool>> = characters
        .iter()
        .map(|a| characters.iter().map(|b| a == b).collect())
        .collect();
    Ok(equivalence_classes(&kernel).labels().to_vec())
}

fn connectivity_characters(
    elements: &[Element],
    conn: &Connectivity,
    order: usize,
) -> Vec<String> {
    let shell = |atom: usize| -> String {
        let mut symbols: Vec<&str> = conn.neighbours[atom]
            .iter()
            .map(|&j| elements[j].symbol())
            .collect();
        symbols.sort_unstable();
        symbols.join(",")
    };

    elements
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let mut character = e.symbol().to_string();
            if order >= 1 {
                character.push('|');
                character.push_str(&shell(i));
            }
            if order >= 2 {
                let mut second: Vec<String> =
                    conn.neighbours[i].iter().map(|&j| shell(j)).collect();
                second.sort_unstable();
                character.push('|');
                character.push_str(&second.join(";"));
            }
            character
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::Element::{C, H, O};

    #[test]
    fn components_are_densely_labelled() {
        // two fragments: 0-1-2 and 3-4
        let neighbours = vec![vec![1], vec![0, 2], vec![1], vec![4], vec![3]];
        let map = connected_components(&neighbours);
        assert_eq!(map.labels(), &[0, 0, 0, 1, 1]);
        assert_eq!(map.n_molecules(), 2);
    }

    #[test]
    fn isolated_atoms_get_own_labels() {
        let neighbours = vec![vec![], vec![], vec![]];
        let map = connected_components(&neighbours);
        assert_eq!(map.labels(), &[0, 1, 2]);
    }

    #[test]
    fn labels_ignore_neighbour_order() {
        // a ring: the fill direction must not change the partition
        let ring = vec![vec![1, 3], vec![0, 2], vec![1, 3], vec![2, 0]];
        let map = connected_components(&ring);
        assert_eq!(map.n_molecules(), 1);
        assert!(map.labels().iter().all(|&l| l == 0));
    }

    #[test]
    fn two_waters_partition_separately() {
        let positions = vec![
            [0.0, 0.0, 0.0],
            [0.96, 0.0, 0.0],
            [-0.24, 0.93, 0.0],
            [5.0, 5.0, 5.0],
            [5.96, 5.0, 5.0],
            [4.76, 5.93, 5.0],
        ];
        let elements = vec![O, H, H, O, H, H];
        let map =
            define_molecules(&positions, &elements, None, &MendConfig::default()).unwrap();
        assert_eq!(map.labels(), &[0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn strict_validation_rejects_count_mismatch() {
        let positions = vec![[0.0, 0.0, 0.0], [0.96, 0.0, 0.0], [-0.24, 0.93, 0.0]];
        let elements = vec![O, H, H];
        let config = MendConfig {
            expected_molecules: Some(2),
            validation: Validation::Strict,
            ..Default::default()
        };
        let err = define_molecules(&positions, &elements, None, &config).unwrap_err();
        assert!(matches!(
            err,
            Error::BrokenTopology {
                expected: 2,
                found: 1
            }
        ));

        let lenient = MendConfig {
            expected_molecules: Some(2),
            ..Default::default()
        };
        assert!(define_molecules(&positions, &elements, None, &lenient).is_ok());
    }

    #[test]
    fn equivalence_classes_from_kernel() {
        // atoms 0 and 2 equivalent, atom 1 alone
        let kernel = vec![
            vec![true, false, true],
            vec![false, true, false],
            vec![true, false, true],
        ];
        let map = equivalence_classes(&kernel);
        assert_eq!(map.labels(), &[0, 1, 0]);
    }

    #[test]
    fn atom_types_by_neighbour_shell() {
        // methanol-like chain: C bonded to O, both carrying hydrogens
        let positions = vec![
            [0.0, 0.0, 0.0],   // C
            [1.43, 0.0, 0.0],  // O
            [-0.5, 0.9, 0.0],  // H on C
            [-0.5, -0.9, 0.3], // H on C
            [-0.5, 0.0, -1.0], // H on C
            [1.9, 0.8, 0.0],   // H on O
        ];
        let elements = vec![C, O, H, H, H, H];

        // order 0: types by symbol only
        let t0 = guess_atom_types(&positions, &elements, None, 0.6, 0).unwrap();
        assert_eq!(t0, vec![0, 1, 2, 2, 2, 2]);

        // order 1: the hydroxyl hydrogen separates from the methyl ones
        let t1 = guess_atom_types(&positions, &elements, None, 0.6, 1).unwrap();
        assert_eq!(t1[2], t1[3]);
        assert_eq!(t1[3], t1[4]);
        assert_ne!(t1[2], t1[5]);
    }
}
