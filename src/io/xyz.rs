//! Multi-frame XYZ trajectory reading and writing.
//!
//! Frames follow the plain XYZ convention: an atom-count line, a comment
//! line, then one `symbol x y z` record per atom. The writer emits the cell
//! on the comment line as `cell a b c alpha beta gamma`, and the reader
//! recognises the same token sequence in the first frame's comment.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;

use super::Format;
use super::error::Error;
use crate::model::cell::Cell;
use crate::model::system::System;
use crate::model::types::Element;

/// Reads a single- or multi-frame XYZ trajectory.
pub fn read<R: BufRead>(reader: R) -> Result<System, Error> {
    let mut elements: Vec<Element> = Vec::new();
    let mut frames: Vec<Vec<[f64; 3]>> = Vec::new();
    let mut cell: Option<Cell> = None;

    let mut lines = reader.lines();
    let mut line_no = 0usize;
    while let Some(count_line) = next_content_line(&mut lines, &mut line_no)? {
        let n: usize = count_line.trim().parse().map_err(|_| {
            Error::parse(
                Format::Xyz,
                line_no,
                format!("expected atom count, got '{}'", count_line.trim()),
            )
        })?;

        let comment = next_line(&mut lines, &mut line_no)?
            .ok_or_else(|| Error::parse(Format::Xyz, line_no, "missing comment line"))?;
        if frames.is_empty() {
            cell = parse_cell_comment(&comment);
        }

        let mut frame_elements = Vec::with_capacity(n);
        let mut positions = Vec::with_capacity(n);
        for _ in 0..n {
            let line = next_line(&mut lines, &mut line_no)?
                .ok_or_else(|| Error::parse(Format::Xyz, line_no, "truncated frame"))?;
            let (element, position) = parse_atom_record(&line, line_no)?;
            frame_elements.push(element);
            positions.push(position);
        }

        if frames.is_empty() {
            elements = frame_elements;
        } else if frame_elements != elements {
            return Err(Error::parse(
                Format::Xyz,
                line_no,
                "atom symbols differ between frames",
            ));
        }
        frames.push(positions);
    }

    if frames.is_empty() {
        return Err(Error::parse(Format::Xyz, line_no, "no frames found"));
    }
    Ok(System {
        elements,
        frames,
        cell,
    })
}

/// Reads an XYZ trajectory from a path.
pub fn read_file(path: impl AsRef<Path>) -> Result<System, Error> {
    read(BufReader::new(File::open(path)?))
}

/// Writes all frames of a system in XYZ format.
pub fn write<W: Write>(mut writer: W, system: &System) -> Result<(), Error> {
    for (index, frame) in system.frames.iter().enumerate() {
        writeln!(writer, "{}", system.atom_count())?;
        match system.cell {
            Some(cell) => writeln!(
                writer,
                "cell {} {} {} {} {} {}",
                cell.a, cell.b, cell.c, cell.alpha, cell.beta, cell.gamma
            )?,
            None => writeln!(writer, "frame {index}")?,
        }
        for (element, p) in system.elements.iter().zip(frame) {
            writeln!(
                writer,
                "{:<2} {:>15.8} {:>15.8} {:>15.8}",
                element.symbol(),
                p[0],
                p[1],
                p[2]
            )?;
        }
    }
    Ok(())
}

/// Writes a system to an XYZ file.
pub fn write_file(path: impl AsRef<Path>, system: &System) -> Result<(), Error> {
    write(BufWriter::new(File::create(path)?), system)
}

fn next_line<R: BufRead>(
    lines: &mut Lines<R>,
    line_no: &mut usize,
) -> Result<Option<String>, Error> {
    *line_no += 1;
    Ok(lines.next().transpose()?)
}

/// Next non-blank line; blank lines between frames are tolerated.
fn next_content_line<R: BufRead>(
    lines: &mut Lines<R>,
    line_no: &mut usize,
) -> Result<Option<String>, Error> {
    loop {
        match next_line(lines, line_no)? {
            None => return Ok(None),
            Some(line) if line.trim().is_empty() => continue,
            Some(line) => return Ok(Some(line)),
        }
    }
}

fn parse_atom_record(line: &str, line_no: usize) -> Result<(Element, [f64; 3]), Error> {
    let mut fields = line.split_whitespace();
    let symbol = fields
        .next()
        .ok_or_else(|| Error::parse(Format::Xyz, line_no, "empty atom record"))?;
    let element: Element = symbol.parse().map_err(|_| {
        Error::parse(Format::Xyz, line_no, format!("unknown element '{symbol}'"))
    })?;

    let mut position = [0.0; 3];
    for (k, slot) in position.iter_mut().enumerate() {
        let field = fields.next().ok_or_else(|| {
            Error::parse(Format::Xyz, line_no, "atom record has fewer than 3 coordinates")
        })?;
        *slot = field.parse().map_err(|_| {
            Error::parse(
                Format::Xyz,
                line_no,
                format!("invalid coordinate {} '{field}'", ["x", "y", "z"][k]),
            )
        })?;
    }
    Ok((element, position))
}

fn parse_cell_comment(comment: &str) -> Option<Cell> {
    let tokens: Vec<&str> = comment.split_whitespace().collect();
    let at = tokens.iter().position(|&t| t.eq_ignore_ascii_case("cell"))?;
    let values = tokens.get(at + 1..at + 7)?;
    let mut cell = [0.0; 6];
    for (slot, value) in cell.iter_mut().zip(values) {
        *slot = value.parse().ok()?;
    }
    Some(Cell::from_array(cell))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const WATER_TWO_FRAMES: &str = "\
3
cell 10.0 10.0 10.0 90.0 90.0 90.0
O   0.30000000  5.00000000  5.00000000
H   9.65000000  5.00000000  5.00000000
H   0.62000000  5.93000000  5.00000000
3
step 2
O   0.40000000  5.00000000  5.00000000
H   9.75000000  5.00000000  5.00000000
H   0.72000000  5.93000000  5.00000000
";

    #[test]
    fn reads_frames_and_cell() {
        let system = read(Cursor::new(WATER_TWO_FRAMES)).unwrap();
        assert_eq!(system.atom_count(), 3);
        assert_eq!(system.frame_count(), 2);
        assert_eq!(
            system.elements,
            vec![Element::O, Element::H, Element::H]
        );
        assert_eq!(system.cell, Some(Cell::cubic(10.0)));
        assert!((system.frames[1][0][0] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn round_trip() {
        let system = read(Cursor::new(WATER_TWO_FRAMES)).unwrap();
        let mut buf = Vec::new();
        write(&mut buf, &system).unwrap();
        let back = read(Cursor::new(buf)).unwrap();
        assert_eq!(back.elements, system.elements);
        assert_eq!(back.cell, system.cell);
        assert_eq!(back.frame_count(), system.frame_count());
        for (fa, fb) in back.frames.iter().zip(&system.frames) {
            for (p, q) in fa.iter().zip(fb) {
                for k in 0..3 {
                    assert!((p[k] - q[k]).abs() < 1e-8);
                }
            }
        }
    }

    #[test]
    fn bad_count_line() {
        let err = read(Cursor::new("three\ncomment\n")).unwrap_err();
        assert!(err.to_string().contains("expected atom count"));
        assert!(err.to_string().contains("line ~1"));
    }

    #[test]
    fn truncated_frame() {
        let err = read(Cursor::new("2\ncomment\nO 0 0 0\n")).unwrap_err();
        assert!(err.to_string().contains("truncated frame"));
    }

    #[test]
    fn unknown_symbol_names_the_line() {
        let err = read(Cursor::new("1\ncomment\nXx 0 0 0\n")).unwrap_err();
        assert!(err.to_string().contains("unknown element 'Xx'"));
        assert!(err.to_string().contains("line ~3"));
    }

    #[test]
    fn inconsistent_frames_rejected() {
        let data = "1\nc\nO 0 0 0\n1\nc\nN 0 0 0\n";
        let err = read(Cursor::new(data)).unwrap_err();
        assert!(err.to_string().contains("differ between frames"));
    }

    #[test]
    fn blank_lines_between_frames_tolerated() {
        let data = "1\nc\nO 0 0 0\n\n\n1\nc\nO 1 0 0\n";
        let system = read(Cursor::new(data)).unwrap();
        assert_eq!(system.frame_count(), 2);
    }

    #[test]
    fn comment_without_cell_gives_none() {
        let system = read(Cursor::new("1\njust a comment\nO 0 0 0\n")).unwrap();
        assert!(system.cell.is_none());
    }
}
