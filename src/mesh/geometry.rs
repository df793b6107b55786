//! Second pass over a geometry file: materialises vertex arrays and
//! 0-based connectivity, guided by the part sizes an earlier
//! [`crate::mesh::info::scan`] recorded.

use crate::data::reader::ByteReader;
use crate::error::{EResult, EncasError};
use crate::mesh::elem::ElementKind;
use crate::mesh::header::{self, IdMode, RecordKind};
use crate::mesh::info::MeshInfo;

#[derive(Debug, Clone, Copy)]
pub struct ElementBlock {
    pub kind: ElementKind,
    pub vertices_per_element: usize,
    pub len: usize,
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub struct MeshPart {
    pub part_number: i32,
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub z: Vec<f32>,
    pub element_blocks: Vec<ElementBlock>,
    /// Flat, 0-based connectivity, concatenated across element blocks in
    /// the order they appear in `element_blocks`.
    pub connectivity: Vec<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub parts: Vec<MeshPart>,
}

struct PartState {
    part_number: i32,
    x: Vec<f32>,
    y: Vec<f32>,
    z: Vec<f32>,
    blocks: Vec<ElementBlock>,
    connectivity: Vec<u32>,
}

impl PartState {
    fn new(part_number: i32, info: &crate::mesh::info::PartMeshInfo) -> Self {
        Self {
            part_number,
            x: Vec::with_capacity(info.num_coords),
            y: Vec::with_capacity(info.num_coords),
            z: Vec::with_capacity(info.num_coords),
            blocks: Vec::with_capacity(info.element_blocks.len()),
            connectivity: Vec::with_capacity(info.connectivity_length),
        }
    }

    fn finish(self) -> MeshPart {
        MeshPart {
            part_number: self.part_number,
            x: self.x,
            y: self.y,
            z: self.z,
            element_blocks: self.blocks,
            connectivity: self.connectivity,
        }
    }
}

/// Materialise a mesh from `bytes`, cross-checked against the part order and
/// sizes recorded in `info`.
pub fn load(bytes: &[u8], info: &MeshInfo) -> EResult<Mesh> {
    let mut reader = ByteReader::new(bytes);
    let gheader = header::parse_header(&mut reader)?;

    let mut parts = Vec::with_capacity(info.parts.len());
    let mut part_cursor = 0usize;
    let mut current: Option<PartState> = None;

    let mut next_line = Some(header::skip_extents_and_next_line(&mut reader)?);

    while let Some(line) = next_line.take() {
        match header::classify(line) {
            RecordKind::Part => {
                if let Some(state) = current.take() {
                    parts.push(state.finish());
                    part_cursor += 1;
                }
                let part_number = reader.read_i32()?;
                reader.read_binary_line()?;
                let expected = info.parts.get(part_cursor).ok_or_else(|| {
                    rootcause::Report::new(EncasError::consistency(
                        "geometry file has more parts than the mesh-info scan recorded",
                    ))
                })?;
                if expected.part_number != part_number {
                    return Err(rootcause::Report::new(EncasError::consistency(format!(
                        "part number mismatch: mesh-info recorded {} but geometry has {part_number}",
                        expected.part_number
                    ))));
                }
                current = Some(PartState::new(part_number, expected));
            }
            RecordKind::Coordinates => {
                let nn = reader.read_i32()? as usize;
                if matches!(gheader.node_id_mode, IdMode::Given | IdMode::Ignore) {
                    reader.advance(nn * 4)?;
                }
                let x = reader.read_f32_array(nn)?;
                let y = reader.read_f32_array(nn)?;
                let z = reader.read_f32_array(nn)?;
                let state = current.as_mut().ok_or_else(|| {
                    rootcause::Report::new(EncasError::format(
                        "'coordinates' record outside a 'part' record",
                    ))
                })?;
                state.x = x;
                state.y = y;
                state.z = z;
            }
            RecordKind::Block => {
                return Err(rootcause::Report::new(EncasError::unsupported(
                    "structured (\"block\") geometry is not implemented",
                )));
            }
            RecordKind::Element(kind, is_ghost) => {
                let ne = reader.read_i32()? as usize;
                if matches!(gheader.element_id_mode, IdMode::Given | IdMode::Ignore) {
                    reader.advance(ne * 4)?;
                }
                if matches!(kind, ElementKind::NSided | ElementKind::NFaced) {
                    return Err(rootcause::Report::new(EncasError::unsupported(format!(
                        "'{}' elements are not implemented",
                        kind.token()
                    ))));
                }
                let vpe = kind.vertices_per_element();
                if is_ghost {
                    reader.advance(ne * vpe * 4)?;
                } else {
                    let raw = reader.read_i32_array(ne * vpe)?;
                    let state = current.as_mut().ok_or_else(|| {
                        rootcause::Report::new(EncasError::format(
                            "element record outside a 'part' record",
                        ))
                    })?;
                    let offset = state.connectivity.len();
                    for v in raw {
                        let zero_based = v - 1;
                        if zero_based < 0 {
                            return Err(rootcause::Report::new(EncasError::consistency(
                                "connectivity index is not a positive 1-based index",
                            )));
                        }
                        state.connectivity.push(zero_based as u32);
                    }
                    state.blocks.push(ElementBlock {
                        kind,
                        vertices_per_element: vpe,
                        len: ne * vpe,
                        offset,
                    });
                }
            }
            RecordKind::Other(_) => break,
        }

        if reader.is_eof() {
            break;
        }
        next_line = Some(reader.read_binary_line()?);
    }

    if let Some(state) = current.take() {
        parts.push(state.finish());
    }

    Ok(Mesh { parts })
}
