//! Reads per-node and per-element variable payload files and projects them
//! onto a shell's compacted vertices.
//!
//! A variable file mirrors the part/element-block layout of its companion
//! geometry file exactly, but without any of the geometry's own size
//! prefixes — a per-node `coordinates` sub-record is `D · Nn` floats with
//! no leading node count, and a per-element sub-record is `D · Ne` floats
//! with no leading element count. The companion [`crate::mesh::geometry::Mesh`]
//! is therefore required just to know how many floats to read.

use crate::case::model::VariableKind;
use crate::data::part_map::PartNumberMap;
use crate::data::reader::ByteReader;
use crate::error::{EResult, EncasError};
use crate::mesh::geometry::Mesh;
use crate::mesh::header::{self, RecordKind};
use crate::mesh::shell::Shell;

/// Build a part-number → dense-index map from a materialised mesh, so a
/// variable file's `part <n>` records can be matched to `mesh.parts` by
/// their original part number rather than by file position.
fn build_part_index(mesh: &Mesh) -> PartNumberMap {
    let mut index = PartNumberMap::with_capacity(mesh.parts.len().max(1));
    for (i, part) in mesh.parts.iter().enumerate() {
        index.insert(part.part_number, i as u32);
    }
    index
}

fn lookup_dense_index(part_index: &PartNumberMap, part_number: i32) -> EResult<usize> {
    part_index.get(part_number).map(|idx| idx as usize).ok_or_else(|| {
        rootcause::Report::new(EncasError::consistency(format!(
            "part number {part_number} not present in mesh-info"
        )))
    })
}

/// Per-part offset of each mesh part within the concatenated V-space vertex
/// numbering (cumulative vertex count of all preceding parts, in
/// `mesh.parts` order).
fn part_vspace_offsets(mesh: &Mesh) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(mesh.parts.len());
    let mut running = 0usize;
    for part in &mesh.parts {
        offsets.push(running);
        running += part.x.len();
    }
    offsets
}

/// Number of scalar components carried per node/cell for `kind`.
pub fn component_count(kind: VariableKind) -> usize {
    match kind {
        VariableKind::ScalarPerNode | VariableKind::ScalarPerElement => 1,
        VariableKind::VectorPerNode | VariableKind::VectorPerElement => 3,
    }
}

fn is_per_node(kind: VariableKind) -> bool {
    matches!(kind, VariableKind::ScalarPerNode | VariableKind::VectorPerNode)
}

/// Total element count of a part (summed across its element-type blocks).
fn part_element_count(part: &crate::mesh::geometry::MeshPart) -> usize {
    part.element_blocks
        .iter()
        .map(|b| b.len / b.vertices_per_element)
        .sum()
}

/// Per-part offset of each mesh part within the concatenated per-element
/// "flat" numbering (cumulative element count of all preceding parts, in
/// `mesh.parts` order).
fn part_element_offsets(mesh: &Mesh) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(mesh.parts.len());
    let mut running = 0usize;
    for part in &mesh.parts {
        offsets.push(running);
        running += part_element_count(part);
    }
    offsets
}

/// Read a variable file and concatenate its payload verbatim, component
/// major: for a vector field the result is three contiguous blocks (one per
/// component), each the length appropriate to the field's node/element
/// granularity. Each part's data is written at the offset its part number
/// maps to in `mesh.parts`, not at its position in the file, so a variable
/// file whose parts are reordered (or a subset) relative to the geometry
/// still lands in the right place — or is rejected if a part number has no
/// match. No per-element averaging is performed — this is what the
/// flat-mesh exporter wants (§4.8) and also what per-node projection wants,
/// since per-node data is never averaged.
pub fn load_flat(bytes: &[u8], kind: VariableKind, mesh: &Mesh) -> EResult<Vec<f32>> {
    let mut reader = ByteReader::new(bytes);
    reader.read_binary_line()?;

    let d = component_count(kind);
    let per_node = is_per_node(kind);
    let part_index = build_part_index(mesh);

    let total: usize = if per_node {
        mesh.parts.iter().map(|p| p.x.len()).sum()
    } else {
        mesh.parts.iter().map(part_element_count).sum()
    };
    let offsets = if per_node {
        part_vspace_offsets(mesh)
    } else {
        part_element_offsets(mesh)
    };
    let mut component_buffers: Vec<Vec<f32>> = vec![vec![0.0; total]; d];

    while !reader.is_eof() {
        let line = reader.read_binary_line()?;
        match header::classify(line) {
            RecordKind::Part => {
                let part_number = reader.read_i32()?;
                let dense = lookup_dense_index(&part_index, part_number)?;
                let mesh_part = &mesh.parts[dense];
                let base = offsets[dense];

                if per_node {
                    let sub = reader.read_binary_line()?;
                    if !matches!(header::classify(sub), RecordKind::Coordinates) {
                        return Err(rootcause::Report::new(EncasError::format(
                            "expected a 'coordinates' record in a per-node variable file",
                        )));
                    }
                    let nn = mesh_part.x.len();
                    for buf in component_buffers.iter_mut() {
                        let values = reader.read_f32_array(nn)?;
                        buf[base..base + nn].copy_from_slice(&values);
                    }
                } else {
                    let mut local = 0usize;
                    for block in &mesh_part.element_blocks {
                        let sub = reader.read_binary_line()?;
                        match header::classify(sub) {
                            RecordKind::Element(k, false) if k == block.kind => {}
                            RecordKind::Element(_, true) => {
                                return Err(rootcause::Report::new(EncasError::format(
                                    "ghost element block present in a per-element variable file",
                                )));
                            }
                            _ => {
                                return Err(rootcause::Report::new(EncasError::format(
                                    "variable file element-block order does not match the geometry file",
                                )));
                            }
                        }
                        let ne = block.len / block.vertices_per_element;
                        for buf in component_buffers.iter_mut() {
                            let values = reader.read_f32_array(ne)?;
                            buf[base + local..base + local + ne].copy_from_slice(&values);
                        }
                        local += ne;
                    }
                }
            }
            _ => {
                return Err(rootcause::Report::new(EncasError::format(
                    "expected a 'part' record in variable file",
                )));
            }
        }
    }

    let mut out = Vec::with_capacity(component_buffers.iter().map(Vec::len).sum());
    for buf in component_buffers {
        out.extend(buf);
    }
    Ok(out)
}

/// Read a variable file into vertex space (length `component_count(kind) *
/// total_vertices`). Per-node data is a direct concatenation; per-element
/// data is accumulated per incident vertex corner and averaged with equal
/// weight.
pub fn load_to_vspace(bytes: &[u8], kind: VariableKind, mesh: &Mesh) -> EResult<Vec<f32>> {
    if is_per_node(kind) {
        return load_flat(bytes, kind, mesh);
    }

    let mut reader = ByteReader::new(bytes);
    reader.read_binary_line()?;

    let d = component_count(kind);
    let total_v: usize = mesh.parts.iter().map(|p| p.x.len()).sum();
    let mut sum = vec![0f32; d * total_v];
    let mut count = vec![0u32; total_v];

    let part_index = build_part_index(mesh);
    let offsets = part_vspace_offsets(mesh);

    while !reader.is_eof() {
        let line = reader.read_binary_line()?;
        match header::classify(line) {
            RecordKind::Part => {
                let part_number = reader.read_i32()?;
                let dense = lookup_dense_index(&part_index, part_number)?;
                let mesh_part = &mesh.parts[dense];
                let base = offsets[dense];

                for block in &mesh_part.element_blocks {
                    let sub = reader.read_binary_line()?;
                    match header::classify(sub) {
                        RecordKind::Element(k, false) if k == block.kind => {}
                        RecordKind::Element(_, true) => {
                            return Err(rootcause::Report::new(EncasError::format(
                                "ghost element block present in a per-element variable file",
                            )));
                        }
                        _ => {
                            return Err(rootcause::Report::new(EncasError::format(
                                "variable file element-block order does not match the geometry file",
                            )));
                        }
                    }
                    let vpe = block.vertices_per_element;
                    let ne = block.len / vpe;
                    let conn = &mesh_part.connectivity[block.offset..block.offset + block.len];

                    for comp in 0..d {
                        let values = reader.read_f32_array(ne)?;
                        for (cell, &value) in values.iter().enumerate() {
                            for corner in 0..vpe {
                                let local_v = conn[cell * vpe + corner] as usize;
                                sum[comp * total_v + base + local_v] += value;
                                if comp == 0 {
                                    count[base + local_v] += 1;
                                }
                            }
                        }
                    }
                }
            }
            _ => {
                return Err(rootcause::Report::new(EncasError::format(
                    "expected a 'part' record in variable file",
                )));
            }
        }
    }

    let mut out = vec![0f32; d * total_v];
    for n in 0..total_v {
        if count[n] > 0 {
            for comp in 0..d {
                out[comp * total_v + n] = sum[comp * total_v + n] / count[n] as f32;
            }
        }
    }
    Ok(out)
}

/// Project vertex-space data onto a shell's compacted vertices, component by
/// component.
pub fn project_onto_shell(vspace: &[f32], shell: &Shell, components: usize) -> Vec<f32> {
    let total_v = vspace.len() / components.max(1);
    let s = shell.original_index.len();
    let mut out = vec![0f32; components * s];
    for comp in 0..components {
        for (i, &orig) in shell.original_index.iter().enumerate() {
            out[comp * s + i] = vspace[comp * total_v + orig as usize];
        }
    }
    out
}
