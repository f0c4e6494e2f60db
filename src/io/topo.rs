//! TOML topology files.
//!
//! A topology file carries the detected molecule map (plus symbols, cell and
//! optional weights) between runs, so expensive re-detection can be skipped
//! and different tools agree on the same partition.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::Error;
use crate::model::cell::Cell;
use crate::model::system::System;
use crate::model::topology::MoleculeMap;
use crate::model::types::{Element, parse_symbols};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyFile {
    /// Element symbols in atom order.
    pub symbols: Vec<String>,
    /// Cell measures `[a, b, c, alpha, beta, gamma]`, if periodic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell: Option<[f64; 6]>,
    /// Molecule label per atom, dense from 0.
    pub mol_map: Vec<usize>,
    /// Per-atom weights; absent means atomic masses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,
}

impl TopologyFile {
    pub fn new(system: &System, map: &MoleculeMap) -> Self {
        Self {
            symbols: system.elements.iter().map(|e| e.symbol().into()).collect(),
            cell: system.cell.map(|c| c.to_array()),
            mol_map: map.labels().to_vec(),
            weights: None,
        }
    }

    pub fn elements(&self) -> Result<Vec<Element>, Error> {
        parse_symbols(&self.symbols)
            .map_err(|e| Error::TopologyMismatch(e.to_string()))
    }

    pub fn molecule_map(&self) -> Result<MoleculeMap, Error> {
        MoleculeMap::from_labels(self.mol_map.clone())
            .map_err(|e| Error::TopologyMismatch(e.to_string()))
    }

    pub fn cell(&self) -> Option<Cell> {
        self.cell.map(Cell::from_array)
    }

    /// Checks the file against a structure: atom count and symbols must
    /// agree, or the map cannot be applied.
    pub fn matches(&self, system: &System) -> Result<(), Error> {
        if self.symbols.len() != system.atom_count() {
            return Err(Error::TopologyMismatch(format!(
                "topology lists {} atoms, structure has {}",
                self.symbols.len(),
                system.atom_count()
            )));
        }
        for (i, (sym, element)) in self.symbols.iter().zip(&system.elements).enumerate() {
            if sym != element.symbol() {
                return Err(Error::TopologyMismatch(format!(
                    "atom {i} is '{sym}' in the topology but '{}' in the structure",
                    element.symbol()
                )));
            }
        }
        Ok(())
    }
}

pub fn from_str(data: &str) -> Result<TopologyFile, Error> {
    Ok(toml::from_str(data)?)
}

pub fn to_string(topo: &TopologyFile) -> Result<String, Error> {
    Ok(toml::to_string_pretty(topo)?)
}

pub fn read_file(path: impl AsRef<Path>) -> Result<TopologyFile, Error> {
    from_str(&fs::read_to_string(path)?)
}

pub fn write_file(path: impl AsRef<Path>, topo: &TopologyFile) -> Result<(), Error> {
    fs::write(path, to_string(topo)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::Element::{H, O};

    fn sample() -> (System, MoleculeMap) {
        let system = System::new(
            vec![O, H, H],
            vec![[0.0, 0.0, 0.0], [0.96, 0.0, 0.0], [-0.24, 0.93, 0.0]],
        )
        .with_cell(Cell::cubic(10.0));
        let map = MoleculeMap::from_labels(vec![0, 0, 0]).unwrap();
        (system, map)
    }

    #[test]
    fn toml_round_trip() {
        let (system, map) = sample();
        let topo = TopologyFile::new(&system, &map);
        let text = to_string(&topo).unwrap();
        let back = from_str(&text).unwrap();
        assert_eq!(back, topo);
        assert_eq!(back.elements().unwrap(), system.elements);
        assert_eq!(back.molecule_map().unwrap().labels(), map.labels());
        assert_eq!(back.cell(), system.cell);
    }

    #[test]
    fn gapped_map_is_rejected() {
        let topo = TopologyFile {
            symbols: vec!["O".into(), "O".into()],
            cell: None,
            mol_map: vec![0, 2],
            weights: None,
        };
        assert!(matches!(
            topo.molecule_map(),
            Err(Error::TopologyMismatch(_))
        ));
    }

    #[test]
    fn bad_symbol_is_rejected() {
        let topo = TopologyFile {
            symbols: vec!["Oq".into()],
            cell: None,
            mol_map: vec![0],
            weights: None,
        };
        assert!(topo.elements().is_err());
    }

    #[test]
    fn structure_mismatch_is_detected() {
        let (system, map) = sample();
        let mut topo = TopologyFile::new(&system, &map);
        topo.symbols[1] = "N".into();
        let err = topo.matches(&system).unwrap_err();
        assert!(err.to_string().contains("atom 1"));

        topo.symbols.pop();
        assert!(topo.matches(&system).is_err());
    }

    #[test]
    fn parse_error_from_invalid_toml() {
        assert!(matches!(
            from_str("symbols = not valid"),
            Err(Error::TopologyParse(_))
        ));
    }
}
