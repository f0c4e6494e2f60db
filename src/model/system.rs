use std::collections::BTreeMap;

use super::cell::Cell;
use super::types::Element;

/// A molecular system: element symbols, one or more coordinate frames and an
/// optional unit cell.
///
/// Atom ordering is shared by all parallel arrays (elements, positions,
/// molecule map, weights); nothing here owns long-lived state beyond the
/// arrays themselves.
#[derive(Debug, Clone, Default)]
pub struct System {
    pub elements: Vec<Element>,
    /// Coordinate frames in angstrom; `frames[f][atom]`.
    pub frames: Vec<Vec<[f64; 3]>>,
    pub cell: Option<Cell>,
}

impl System {
    /// Single-frame system.
    pub fn new(elements: Vec<Element>, positions: Vec<[f64; 3]>) -> Self {
        Self {
            elements,
            frames: vec![positions],
            cell: None,
        }
    }

    pub fn with_cell(mut self, cell: Cell) -> Self {
        self.cell = Some(cell);
        self
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// First frame, the conventional reference for topology detection.
    pub fn positions(&self) -> &[[f64; 3]] {
        &self.frames[0]
    }

    pub fn is_periodic(&self) -> bool {
        self.cell.is_some_and(|c| c.is_periodic())
    }

    /// Standard atomic masses, one per atom.
    pub fn masses(&self) -> Vec<f64> {
        self.elements.iter().map(|e| e.atomic_mass()).collect()
    }

    /// Hill-ordered molecular formula of the whole system, e.g. `C2H6O`.
    pub fn molecular_formula(&self) -> String {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for e in &self.elements {
            *counts.entry(e.symbol()).or_insert(0) += 1;
        }
        let mut formula = String::new();
        let mut push = |sym: &str, n: usize| {
            formula.push_str(sym);
            if n > 1 {
                formula.push_str(&n.to_string());
            }
        };
        if let Some(n) = counts.remove("C") {
            push("C", n);
            if let Some(n) = counts.remove("H") {
                push("H", n);
            }
        }
        for (sym, n) in counts {
            push(sym, n);
        }
        formula
    }
}
