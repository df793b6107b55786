//! First pass over a geometry file: records per-part element-type counts,
//! connectivity offsets, and vertex counts without materialising any data.
//! The format carries no section lengths, so this pass is what lets the
//! geometry loader (second pass, see [`crate::mesh::geometry`]) allocate
//! exact-sized arrays up front instead of growing them as it reads.

use crate::data::part_map::PartNumberMap;
use crate::data::reader::ByteReader;
use crate::error::{EResult, EncasError};
use crate::mesh::elem::ElementKind;
use crate::mesh::header::{self, IdMode, RecordKind};

#[derive(Debug, Clone, Copy)]
pub struct ElementBlockInfo {
    pub kind: ElementKind,
    pub count: u32,
    /// Offset into the part's flattened connectivity array.
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub struct PartMeshInfo {
    pub part_number: i32,
    pub element_blocks: Vec<ElementBlockInfo>,
    pub connectivity_length: usize,
    pub num_coords: usize,
}

#[derive(Debug, Clone)]
pub struct MeshInfo {
    pub parts: Vec<PartMeshInfo>,
    pub part_index: PartNumberMap,
}

struct PartBuilder {
    part_number: i32,
    num_coords: usize,
    blocks: Vec<ElementBlockInfo>,
    connectivity_length: usize,
}

impl PartBuilder {
    fn new(part_number: i32) -> Self {
        Self {
            part_number,
            num_coords: 0,
            blocks: Vec::new(),
            connectivity_length: 0,
        }
    }

    fn push_block(&mut self, kind: ElementKind, count: u32) {
        let offset = self.connectivity_length;
        self.blocks.push(ElementBlockInfo {
            kind,
            count,
            offset,
        });
        self.connectivity_length += count as usize * kind.vertices_per_element();
    }

    fn finish(self) -> PartMeshInfo {
        PartMeshInfo {
            part_number: self.part_number,
            element_blocks: self.blocks,
            connectivity_length: self.connectivity_length,
            num_coords: self.num_coords,
        }
    }
}

/// Scan a whole geometry file, recording per-part sizes without copying any
/// vertex or connectivity data.
pub fn scan(bytes: &[u8]) -> EResult<MeshInfo> {
    let mut reader = ByteReader::new(bytes);
    let gheader = header::parse_header(&mut reader)?;

    let mut parts = Vec::new();
    let mut part_index = PartNumberMap::default();
    let mut current: Option<PartBuilder> = None;

    let mut next_line = Some(header::skip_extents_and_next_line(&mut reader)?);

    while let Some(line) = next_line.take() {
        match header::classify(line) {
            RecordKind::Part => {
                if let Some(done) = current.take() {
                    part_index.insert(done.part_number, parts.len() as u32);
                    parts.push(done.finish());
                }
                let part_number = reader.read_i32()?;
                reader.read_binary_line()?;
                current = Some(PartBuilder::new(part_number));
            }
            RecordKind::Coordinates => {
                let part = current.as_mut().ok_or_else(|| {
                    rootcause::Report::new(EncasError::format(
                        "'coordinates' record outside a 'part' record",
                    ))
                })?;
                let nn = reader.read_i32()? as usize;
                part.num_coords = nn;
                if matches!(gheader.node_id_mode, IdMode::Given | IdMode::Ignore) {
                    reader.advance(nn * 4)?;
                }
                reader.advance(nn * 3 * 4)?;
            }
            RecordKind::Block => {
                return Err(rootcause::Report::new(EncasError::unsupported(
                    "structured (\"block\") geometry is not implemented",
                )));
            }
            RecordKind::Element(kind, is_ghost) => {
                if matches!(kind, ElementKind::NSided | ElementKind::NFaced) {
                    return Err(rootcause::Report::new(EncasError::unsupported(format!(
                        "'{}' elements are not implemented",
                        kind.token()
                    ))));
                }
                let part = current.as_mut().ok_or_else(|| {
                    rootcause::Report::new(EncasError::format(
                        "element record outside a 'part' record",
                    ))
                })?;
                let ne = reader.read_i32()? as usize;
                if matches!(gheader.element_id_mode, IdMode::Given | IdMode::Ignore) {
                    reader.advance(ne * 4)?;
                }
                let conn_len = ne * kind.vertices_per_element();
                reader.advance(conn_len * 4)?;
                if !is_ghost {
                    part.push_block(kind, ne as u32);
                }
            }
            RecordKind::Other(_) => break,
        }

        if reader.is_eof() {
            break;
        }
        next_line = Some(reader.read_binary_line()?);
    }

    if let Some(done) = current.take() {
        part_index.insert(done.part_number, parts.len() as u32);
        parts.push(done.finish());
    }

    Ok(MeshInfo { parts, part_index })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad80(s: &[u8]) -> Vec<u8> {
        let mut v = s.to_vec();
        v.resize(80, 0);
        v
    }

    fn single_tetra_geometry() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend(pad80(b"C Binary"));
        data.extend(pad80(b"desc1"));
        data.extend(pad80(b"desc2"));
        data.extend(pad80(b"node id off"));
        data.extend(pad80(b"element id off"));

        data.extend(pad80(b"part"));
        data.extend(1i32.to_le_bytes());
        data.extend(pad80(b"part description"));

        data.extend(pad80(b"coordinates"));
        data.extend(4i32.to_le_bytes());
        for v in [0.0f32, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0] {
            data.extend(v.to_le_bytes());
        }

        data.extend(pad80(b"tetra4"));
        data.extend(1i32.to_le_bytes());
        for v in [1i32, 2, 3, 4] {
            data.extend(v.to_le_bytes());
        }
        data
    }

    #[test]
    fn scans_single_part_single_tetra() {
        let data = single_tetra_geometry();
        let info = scan(&data).unwrap();
        assert_eq!(info.parts.len(), 1);
        let part = &info.parts[0];
        assert_eq!(part.part_number, 1);
        assert_eq!(part.num_coords, 4);
        assert_eq!(part.element_blocks.len(), 1);
        assert_eq!(part.element_blocks[0].kind, ElementKind::Tetra4);
        assert_eq!(part.element_blocks[0].count, 1);
        assert_eq!(part.element_blocks[0].offset, 0);
        assert_eq!(part.connectivity_length, 4);
        assert_eq!(info.part_index.get(1), Some(0));
    }

    #[test]
    fn ghost_blocks_are_skipped_but_not_recorded() {
        let mut data = Vec::new();
        data.extend(pad80(b"C Binary"));
        data.extend(pad80(b"desc1"));
        data.extend(pad80(b"desc2"));
        data.extend(pad80(b"node id off"));
        data.extend(pad80(b"element id off"));
        data.extend(pad80(b"part"));
        data.extend(1i32.to_le_bytes());
        data.extend(pad80(b"desc"));
        data.extend(pad80(b"coordinates"));
        data.extend(0i32.to_le_bytes());
        data.extend(pad80(b"g_tetra4"));
        data.extend(1i32.to_le_bytes());
        for v in [1i32, 2, 3, 4] {
            data.extend(v.to_le_bytes());
        }

        let info = scan(&data).unwrap();
        assert_eq!(info.parts[0].element_blocks.len(), 0);
        assert_eq!(info.parts[0].connectivity_length, 0);
    }

    #[test]
    fn block_keyword_is_rejected() {
        let mut data = Vec::new();
        data.extend(pad80(b"C Binary"));
        data.extend(pad80(b"desc1"));
        data.extend(pad80(b"desc2"));
        data.extend(pad80(b"node id off"));
        data.extend(pad80(b"element id off"));
        data.extend(pad80(b"part"));
        data.extend(1i32.to_le_bytes());
        data.extend(pad80(b"desc"));
        data.extend(pad80(b"block"));
        assert!(scan(&data).is_err());
    }
}
