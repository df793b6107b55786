//! Shared binary-line header parsing for the geometry and variable readers.

use crate::data::reader::ByteReader;
use crate::data::strutil::{starts_with, trim};
use crate::error::{EResult, EncasError};
use crate::mesh::elem::{parse_ghostable, ElementKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdMode {
    Off,
    Given,
    Assign,
    Ignore,
}

impl IdMode {
    fn parse(token: &[u8]) -> Option<IdMode> {
        match token {
            b"off" => Some(IdMode::Off),
            b"given" => Some(IdMode::Given),
            b"assign" => Some(IdMode::Assign),
            b"ignore" => Some(IdMode::Ignore),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GeometryHeader {
    pub node_id_mode: IdMode,
    pub element_id_mode: IdMode,
}

fn trim_nul(line: &[u8]) -> &[u8] {
    let end = line.iter().position(|&b| b == 0).unwrap_or(line.len());
    trim(&line[..end])
}

/// Parse the fixed six-record header: magic, two description lines, node id
/// mode, element id mode. Leaves the cursor positioned right after the
/// element-id line; the caller still needs to check for an optional
/// `extents` record before the first `part`.
pub fn parse_header(reader: &mut ByteReader) -> EResult<GeometryHeader> {
    let magic = reader.read_binary_line()?;
    if !starts_with(magic, b"C Binary") {
        return Err(rootcause::Report::new(EncasError::format(
            "geometry file does not begin with 'C Binary'",
        )));
    }
    reader.read_binary_line()?;
    reader.read_binary_line()?;

    let node_line = reader.read_binary_line()?;
    if !starts_with(node_line, b"node id ") {
        return Err(rootcause::Report::new(EncasError::format(
            "expected a 'node id <mode>' header line",
        )));
    }
    let node_id_mode = IdMode::parse(trim_nul(&node_line[8..]))
        .ok_or_else(|| rootcause::Report::new(EncasError::format("unrecognised node id mode")))?;

    let elem_line = reader.read_binary_line()?;
    if !starts_with(elem_line, b"element id ") {
        return Err(rootcause::Report::new(EncasError::format(
            "expected an 'element id <mode>' header line",
        )));
    }
    let element_id_mode = IdMode::parse(trim_nul(&elem_line[11..])).ok_or_else(|| {
        rootcause::Report::new(EncasError::format("unrecognised element id mode"))
    })?;

    Ok(GeometryHeader {
        node_id_mode,
        element_id_mode,
    })
}

/// Read the next binary line. If it is an `extents` record, consume its
/// trailing six floats and read the line after it; otherwise return the
/// line as-is so the caller can dispatch it as the first part record.
pub fn skip_extents_and_next_line<'a>(reader: &mut ByteReader<'a>) -> EResult<&'a [u8]> {
    let line = reader.read_binary_line()?;
    if starts_with(trim_nul(line), b"extents") {
        reader.read_f32_array(6)?;
        reader.read_binary_line()
    } else {
        Ok(line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind<'a> {
    Part,
    Coordinates,
    Block,
    Element(ElementKind, bool),
    Other(&'a [u8]),
}

/// Classify an 80-byte binary description line by its leading token.
pub fn classify(line: &[u8]) -> RecordKind<'_> {
    let token = trim_nul(line);
    if token == b"part" {
        return RecordKind::Part;
    }
    if token == b"coordinates" {
        return RecordKind::Coordinates;
    }
    if token == b"block" {
        return RecordKind::Block;
    }
    if let Some((kind, is_ghost)) = parse_ghostable(token) {
        return RecordKind::Element(kind, is_ghost);
    }
    RecordKind::Other(token)
}
