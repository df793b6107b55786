//! Shell extraction: concatenates parts, triangulates supported cell
//! kinds, deduplicates faces via [`FaceMap`] to find the boundary, and
//! compacts the result to a dense vertex/index buffer pair.

use crate::data::face_map::FaceMap;
use crate::error::EResult;
use crate::mesh::elem::{tessellate_tetra4, tessellate_tria3, ElementKind};
use crate::mesh::geometry::Mesh;

#[derive(Debug, Clone, Default)]
pub struct Shell {
    pub vertices: Vec<[f32; 3]>,
    /// For each compact vertex, its index in the pre-compaction concatenated
    /// vertex array. The handle variable projection uses to address raw
    /// per-vertex payloads.
    pub original_index: Vec<u32>,
    pub triangles: Vec<[u32; 3]>,
}

/// Extract the outer surface of `mesh`: the set of triangular faces that
/// belong to exactly one cell.
pub fn extract(mesh: &Mesh) -> EResult<Shell> {
    let total_vertices: usize = mesh.parts.iter().map(|p| p.x.len()).sum();
    let mut concat = Vec::with_capacity(total_vertices);
    let mut part_offsets = Vec::with_capacity(mesh.parts.len());
    for part in &mesh.parts {
        part_offsets.push(concat.len() as u32);
        for i in 0..part.x.len() {
            concat.push([part.x[i], part.y[i], part.z[i]]);
        }
    }

    let mut triangles: Vec<[u32; 3]> = Vec::new();
    for (part, &voff) in mesh.parts.iter().zip(&part_offsets) {
        for block in &part.element_blocks {
            let conn = &part.connectivity[block.offset..block.offset + block.len];
            match block.kind {
                ElementKind::Tria3 => {
                    for cell in conn.chunks_exact(3) {
                        let [tri] = tessellate_tria3(cell);
                        triangles.push([tri[0] + voff, tri[1] + voff, tri[2] + voff]);
                    }
                }
                ElementKind::Tetra4 => {
                    for cell in conn.chunks_exact(4) {
                        for tri in tessellate_tetra4(cell) {
                            triangles.push([tri[0] + voff, tri[1] + voff, tri[2] + voff]);
                        }
                    }
                }
                // Other kinds have no implemented tessellation: they
                // contribute no shell triangles, but `voff` still accounts
                // for their vertices via the concatenation step above.
                _ => {}
            }
        }
    }

    let mut faces = FaceMap::for_triangle_count(triangles.len());
    for &tri in &triangles {
        faces.increment(tri);
    }

    let mut used = vec![false; concat.len()];
    let mut boundary = Vec::new();
    for &tri in &triangles {
        if faces.get(tri) == Some(1) {
            boundary.push(tri);
            for v in tri {
                used[v as usize] = true;
            }
        }
    }

    let mut remap = vec![u32::MAX; concat.len()];
    let mut original_index = Vec::new();
    let mut vertices = Vec::new();
    for (old_idx, &is_used) in used.iter().enumerate() {
        if is_used {
            remap[old_idx] = vertices.len() as u32;
            original_index.push(old_idx as u32);
            vertices.push(concat[old_idx]);
        }
    }

    let triangles = boundary
        .into_iter()
        .map(|[a, b, c]| [remap[a as usize], remap[b as usize], remap[c as usize]])
        .collect();

    Ok(Shell {
        vertices,
        original_index,
        triangles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::geometry::{ElementBlock, MeshPart};

    fn tetra_part(part_number: i32, verts: [[f32; 3]; 4], conn: Vec<u32>, n_cells: usize) -> MeshPart {
        let x = verts.iter().map(|v| v[0]).collect();
        let y = verts.iter().map(|v| v[1]).collect();
        let z = verts.iter().map(|v| v[2]).collect();
        MeshPart {
            part_number,
            x,
            y,
            z,
            element_blocks: vec![ElementBlock {
                kind: ElementKind::Tetra4,
                vertices_per_element: 4,
                len: n_cells * 4,
                offset: 0,
            }],
            connectivity: conn,
        }
    }

    #[test]
    fn single_tetra_yields_four_triangles_and_all_vertices() {
        let part = tetra_part(
            1,
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            vec![0, 1, 2, 3],
            1,
        );
        let mesh = Mesh { parts: vec![part] };
        let shell = extract(&mesh).unwrap();
        assert_eq!(shell.vertices.len(), 4);
        assert_eq!(shell.triangles.len(), 4);
        assert_eq!(shell.original_index, vec![0, 1, 2, 3]);
    }

    #[test]
    fn two_tetras_sharing_a_face_dedupe_to_six_triangles_five_vertices() {
        // Two cells sharing face (1,2,3); vertex 4 is the apex of the second.
        let part = MeshPart {
            part_number: 1,
            x: vec![0.0, 1.0, 0.0, 0.0, 0.5],
            y: vec![0.0, 0.0, 1.0, 0.0, 0.5],
            z: vec![0.0, 0.0, 0.0, 1.0, 0.5],
            element_blocks: vec![ElementBlock {
                kind: ElementKind::Tetra4,
                vertices_per_element: 4,
                len: 8,
                offset: 0,
            }],
            connectivity: vec![0, 1, 2, 3, 1, 2, 3, 4],
        };
        let mesh = Mesh { parts: vec![part] };
        let shell = extract(&mesh).unwrap();
        assert_eq!(shell.triangles.len(), 6);
        assert_eq!(shell.vertices.len(), 5);
    }

    #[test]
    fn original_index_is_order_preserving() {
        let part = tetra_part(
            1,
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            vec![0, 1, 2, 3],
            1,
        );
        let mesh = Mesh { parts: vec![part] };
        let shell = extract(&mesh).unwrap();
        for w in shell.original_index.windows(2) {
            assert!(w[0] < w[1]);
        }
    }

    #[test]
    fn unsupported_element_kind_contributes_no_triangles() {
        let part = MeshPart {
            part_number: 1,
            x: vec![0.0, 1.0],
            y: vec![0.0, 0.0],
            z: vec![0.0, 0.0],
            element_blocks: vec![ElementBlock {
                kind: ElementKind::Bar2,
                vertices_per_element: 2,
                len: 2,
                offset: 0,
            }],
            connectivity: vec![0, 1],
        };
        let mesh = Mesh { parts: vec![part] };
        let shell = extract(&mesh).unwrap();
        assert!(shell.triangles.is_empty());
        assert!(shell.vertices.is_empty());
    }
}
