//! Flat-mesh export: a single concatenated mesh plus unaveraged variable
//! payloads, for consumers that want the whole geometry rather than just
//! its shell.
//!
//! Per-element variable data here is **not** averaged onto vertices the way
//! [`crate::variable::load_to_vspace`] does it for shells; it is passed
//! through verbatim as [`crate::variable::load_flat`] already produces.
//! That is only a meaningful "one value per cell" mapping when every cell
//! in the mesh is a tetra4 (`connectivity.len() / 4` cells) — this exporter
//! does not check cell kind uniformity, matching the limitation inherited
//! from the source format; see the design notes for why this was not
//! generalised.

use crate::mesh::geometry::Mesh;

#[derive(Debug, Clone, Default)]
pub struct FlatMesh {
    pub vertices: Vec<[f32; 3]>,
    /// 0-based, globalised across parts (each part's connectivity offset
    /// by its cumulative vertex count).
    pub connectivity: Vec<u64>,
}

/// Concatenate every part of `mesh` into one vertex buffer and one
/// globalised connectivity array.
pub fn export(mesh: &Mesh) -> FlatMesh {
    let total_vertices: usize = mesh.parts.iter().map(|p| p.x.len()).sum();
    let mut vertices = Vec::with_capacity(total_vertices);
    let mut part_offsets = Vec::with_capacity(mesh.parts.len());
    for part in &mesh.parts {
        part_offsets.push(vertices.len() as u64);
        for i in 0..part.x.len() {
            vertices.push([part.x[i], part.y[i], part.z[i]]);
        }
    }

    let total_connectivity: usize = mesh.parts.iter().map(|p| p.connectivity.len()).sum();
    let mut connectivity = Vec::with_capacity(total_connectivity);
    for (part, &voff) in mesh.parts.iter().zip(&part_offsets) {
        connectivity.extend(part.connectivity.iter().map(|&idx| idx as u64 + voff));
    }

    FlatMesh {
        vertices,
        connectivity,
    }
}
