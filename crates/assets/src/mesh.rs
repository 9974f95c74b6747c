use serde::{Deserialize, Serialize};

/// CPU-side indexed triangle mesh: positions, per-vertex UVs and `u32` indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

// Six faces, four corners each. Faces: -z, +z, +x, -x, +y, -y.
const CUBE_POSITIONS: [[f32; 3]; 24] = [
    [-0.5, 0.5, -0.5],
    [-0.5, -0.5, -0.5],
    [0.5, -0.5, -0.5],
    [0.5, 0.5, -0.5],
    [-0.5, 0.5, 0.5],
    [-0.5, -0.5, 0.5],
    [0.5, -0.5, 0.5],
    [0.5, 0.5, 0.5],
    [0.5, 0.5, -0.5],
    [0.5, -0.5, -0.5],
    [0.5, -0.5, 0.5],
    [0.5, 0.5, 0.5],
    [-0.5, 0.5, -0.5],
    [-0.5, -0.5, -0.5],
    [-0.5, -0.5, 0.5],
    [-0.5, 0.5, 0.5],
    [-0.5, 0.5, 0.5],
    [-0.5, 0.5, -0.5],
    [0.5, 0.5, -0.5],
    [0.5, 0.5, 0.5],
    [-0.5, -0.5, 0.5],
    [-0.5, -0.5, -0.5],
    [0.5, -0.5, -0.5],
    [0.5, -0.5, 0.5],
];

const FACE_UVS: [[f32; 2]; 4] = [[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]];

fn cube_indices() -> Vec<u32> {
    (0..6u32)
        .flat_map(|face| {
            let b = face * 4;
            [b, b + 1, b + 3, b + 3, b + 1, b + 2]
        })
        .collect()
}

/// Map a face's corners onto one cell of a 3×3 texture atlas, inset slightly
/// so bilinear filtering does not bleed across cells.
fn atlas_cell(col: f32, row: f32) -> [[f32; 2]; 4] {
    const INSET: f32 = 0.01;
    let u0 = (col + INSET) / 3.0;
    let u1 = (col + 1.0 - INSET) / 3.0;
    let v0 = (row + INSET) / 3.0;
    let v1 = (row + 1.0 - INSET) / 3.0;
    [[u0, v0], [u0, v1], [u1, v1], [u1, v0]]
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Unit cube centred on the origin, every face mapped to the full texture.
    pub fn cube() -> Self {
        Self {
            positions: CUBE_POSITIONS.to_vec(),
            uvs: FACE_UVS.iter().copied().cycle().take(24).collect(),
            indices: cube_indices(),
        }
    }

    /// Unit cube textured from a 3×3 atlas: sides use the centre cell, the
    /// top face the cell above it and the bottom face the cell to its left.
    pub fn atlas_cube() -> Self {
        let side = atlas_cell(1.0, 1.0);
        let top = atlas_cell(1.0, 2.0);
        let bottom = atlas_cell(0.0, 1.0);
        let mut uvs = Vec::with_capacity(24);
        for _ in 0..4 {
            uvs.extend_from_slice(&side);
        }
        uvs.extend_from_slice(&top);
        uvs.extend_from_slice(&bottom);
        Self {
            positions: CUBE_POSITIONS.to_vec(),
            uvs,
            indices: cube_indices(),
        }
    }

    /// Unit quad in the XY plane facing +z.
    pub fn quad() -> Self {
        Self {
            positions: vec![
                [-0.5, 0.5, 0.0],
                [-0.5, -0.5, 0.0],
                [0.5, -0.5, 0.0],
                [0.5, 0.5, 0.0],
            ],
            uvs: FACE_UVS.to_vec(),
            indices: vec![0, 1, 2, 2, 3, 0],
        }
    }

    /// Structural sanity: matching attribute lengths, whole triangles and
    /// in-range indices.
    pub fn is_well_formed(&self) -> bool {
        let n = self.vertex_count() as u32;
        self.vertex_count() == self.uvs.len()
            && self.indices.len() % 3 == 0
            && self.indices.iter().all(|&i| i < n)
    }
}
