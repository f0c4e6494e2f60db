//! PDB output with one residue block per molecule.
//!
//! Each molecule of the map becomes a residue (`MOL`, chain `A`, residue
//! number = molecule label + 1), so downstream viewers group atoms the same
//! way the partitioner did. Multi-frame systems are written as MODEL blocks;
//! a periodic cell becomes a CRYST1 record.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::error::Error;
use crate::model::system::System;
use crate::model::topology::MoleculeMap;

/// Writes the system in PDB format, grouping residues by the molecule map.
pub fn write<W: Write>(mut writer: W, system: &System, map: &MoleculeMap) -> Result<(), Error> {
    if map.atom_count() != system.atom_count() {
        return Err(Error::TopologyMismatch(format!(
            "molecule map covers {} atoms, structure has {}",
            map.atom_count(),
            system.atom_count()
        )));
    }

    if let Some(cell) = system.cell.filter(|c| c.is_periodic()) {
        writeln!(
            writer,
            "CRYST1{:>9.3}{:>9.3}{:>9.3}{:>7.2}{:>7.2}{:>7.2} P 1           1",
            cell.a, cell.b, cell.c, cell.alpha, cell.beta, cell.gamma
        )?;
    }

    let multi_frame = system.frame_count() > 1;
    for (frame_index, frame) in system.frames.iter().enumerate() {
        if multi_frame {
            writeln!(writer, "MODEL {:>8}", frame_index + 1)?;
        }
        for (atom, (element, p)) in system.elements.iter().zip(frame).enumerate() {
            writeln!(
                writer,
                "ATOM  {:>5} {:<4} {:<3} {}{:>4}    {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
                atom + 1,
                element.symbol(),
                "MOL",
                'A',
                map.label(atom) + 1,
                p[0],
                p[1],
                p[2],
                1.00,
                0.00,
                element.symbol()
            )?;
        }
        writeln!(writer, "TER")?;
        if multi_frame {
            writeln!(writer, "ENDMDL")?;
        }
    }
    writeln!(writer, "END")?;
    Ok(())
}

/// Writes the system to a PDB file.
pub fn write_file(
    path: impl AsRef<Path>,
    system: &System,
    map: &MoleculeMap,
) -> Result<(), Error> {
    write(BufWriter::new(File::create(path)?), system, map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cell::Cell;
    use crate::model::types::Element::{H, O};

    fn water_dimer() -> (System, MoleculeMap) {
        let system = System::new(
            vec![O, H, H, O, H, H],
            vec![
                [0.0, 0.0, 0.0],
                [0.96, 0.0, 0.0],
                [-0.24, 0.93, 0.0],
                [3.0, 0.0, 0.0],
                [3.96, 0.0, 0.0],
                [2.76, 0.93, 0.0],
            ],
        )
        .with_cell(Cell::cubic(10.0));
        let map = MoleculeMap::from_labels(vec![0, 0, 0, 1, 1, 1]).unwrap();
        (system, map)
    }

    #[test]
    fn residues_follow_the_molecule_map() {
        let (system, map) = water_dimer();
        let mut buf = Vec::new();
        write(&mut buf, &system, &map).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let atom_lines: Vec<&str> = text.lines().filter(|l| l.starts_with("ATOM")).collect();
        assert_eq!(atom_lines.len(), 6);
        // residue number sits in columns 23-26 (0-indexed 22..26)
        for line in &atom_lines[..3] {
            assert_eq!(line[22..26].trim(), "1");
        }
        for line in &atom_lines[3..] {
            assert_eq!(line[22..26].trim(), "2");
        }
    }

    #[test]
    fn cryst1_from_cell() {
        let (system, map) = water_dimer();
        let mut buf = Vec::new();
        write(&mut buf, &system, &map).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let cryst = text.lines().next().unwrap();
        assert!(cryst.starts_with("CRYST1"));
        assert_eq!(cryst[6..15].trim(), "10.000");
        assert!(text.ends_with("END\n"));
    }

    #[test]
    fn multi_frame_uses_models() {
        let (mut system, map) = water_dimer();
        system.frames.push(system.frames[0].clone());
        let mut buf = Vec::new();
        write(&mut buf, &system, &map).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.matches("MODEL ").count(), 2);
        assert_eq!(text.matches("ENDMDL").count(), 2);
    }

    #[test]
    fn map_length_must_match() {
        let (system, _) = water_dimer();
        let short = MoleculeMap::from_labels(vec![0, 0, 0]).unwrap();
        let err = write(&mut Vec::new(), &system, &short).unwrap_err();
        assert!(matches!(err, Error::TopologyMismatch(_)));
    }
}
