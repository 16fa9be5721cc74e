use crate::prelude::{GeomError, GeomResult};
use ndarray::{Array2, ArrayView2};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Parse a microphone-array XML document into a 3xN position table.
///
/// Every element tagged `pos` contributes one column, in document order. The
/// `x`, `y` and `z` attributes are required and must parse as floats; `Name`
/// is accepted and discarded. The whole document is parsed before anything
/// is returned, so a failure never yields a partial table.
pub fn read_positions(path: &Path) -> GeomResult<Array2<f64>> {
    let contents = fs::read_to_string(path)
        .map_err(|err| GeomError::Io(format!("reading {}: {}", path.display(), err)))?;

    let mut reader = Reader::from_str(&contents);
    reader.trim_text(true);

    let mut columns: Vec<[f64; 3]> = Vec::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => {
                depth += 1;
                if element.name().as_ref() == b"pos" {
                    columns.push(parse_pos_element(&element, columns.len())?);
                }
            }
            Ok(Event::Empty(element)) => {
                if element.name().as_ref() == b"pos" {
                    columns.push(parse_pos_element(&element, columns.len())?);
                }
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => {
                if depth > 0 {
                    return Err(GeomError::Parse(format!(
                        "{}: unexpected end of file inside an open element",
                        path.display()
                    )));
                }
                break;
            }
            Ok(_) => {}
            Err(err) => {
                return Err(GeomError::Parse(format!("{}: {}", path.display(), err)));
            }
        }
    }

    let mut table = Array2::zeros((3, columns.len()));
    for (index, xyz) in columns.iter().enumerate() {
        for (axis, value) in xyz.iter().enumerate() {
            table[[axis, index]] = *value;
        }
    }
    Ok(table)
}

fn parse_pos_element(element: &BytesStart, index: usize) -> GeomResult<[f64; 3]> {
    let mut coords = [None::<f64>; 3];
    for attribute in element.attributes() {
        let attribute = attribute
            .map_err(|err| GeomError::Parse(format!("pos element {}: {}", index, err)))?;
        let slot = match attribute.key.as_ref() {
            b"x" => 0,
            b"y" => 1,
            b"z" => 2,
            _ => continue,
        };
        let raw = attribute
            .unescape_value()
            .map_err(|err| GeomError::Parse(format!("pos element {}: {}", index, err)))?;
        let value = raw.trim().parse::<f64>().map_err(|_| {
            GeomError::Attribute(format!(
                "pos element {}: attribute {} is not a number: {:?}",
                index,
                ["x", "y", "z"][slot],
                raw
            ))
        })?;
        coords[slot] = Some(value);
    }

    let mut xyz = [0.0f64; 3];
    for (slot, coord) in coords.iter().enumerate() {
        xyz[slot] = coord.ok_or_else(|| {
            GeomError::Attribute(format!(
                "pos element {}: missing attribute {}",
                index,
                ["x", "y", "z"][slot]
            ))
        })?;
    }
    Ok(xyz)
}

/// Write a position table as a `MicArray` XML document.
///
/// The root carries the file stem as its `name`; columns are written as
/// empty `pos` elements renumbered `Point 1..M`. The target is created or
/// overwritten, UTF-8 encoded.
pub fn write_positions(path: &Path, positions: ArrayView2<f64>) -> GeomResult<()> {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = File::create(path)
        .map_err(|err| GeomError::Io(format!("creating {}: {}", path.display(), err)))?;
    let mut writer = Writer::new_with_indent(BufWriter::new(file), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.1", Some("utf-8"), None)))
        .map_err(|err| write_failed(path, err))?;

    let mut root = BytesStart::new("MicArray");
    root.push_attribute(("name", stem.as_str()));
    writer
        .write_event(Event::Start(root))
        .map_err(|err| write_failed(path, err))?;

    for index in 0..positions.ncols() {
        let mut pos = BytesStart::new("pos");
        pos.push_attribute(("Name", format!("Point {}", index + 1).as_str()));
        pos.push_attribute(("x", positions[[0, index]].to_string().as_str()));
        pos.push_attribute(("y", positions[[1, index]].to_string().as_str()));
        pos.push_attribute(("z", positions[[2, index]].to_string().as_str()));
        writer
            .write_event(Event::Empty(pos))
            .map_err(|err| write_failed(path, err))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("MicArray")))
        .map_err(|err| write_failed(path, err))?;

    let mut inner = writer.into_inner();
    inner.flush().map_err(|err| write_failed(path, err))?;
    Ok(())
}

fn write_failed<E: std::fmt::Display>(path: &Path, err: E) -> GeomError {
    GeomError::Io(format!("writing {}: {}", path.display(), err))
}
