//! Cube geometry data
//!
//! One quad per face, four vertices each, stored as separate position,
//! normal and texture-coordinate arrays. Faces are ordered back, front,
//! left, right, bottom, top.

/// Vertices per face
pub const FACE_VERTICES: usize = 4;

/// Number of faces
pub const FACES: usize = 6;

/// Unit cube positions centred on the origin
#[rustfmt::skip]
pub const CUBE_POSITIONS: [f32; FACES * FACE_VERTICES * 3] = [
    -0.5, -0.5, -0.5,
     0.5, -0.5, -0.5,
     0.5,  0.5, -0.5,
    -0.5,  0.5, -0.5,

    -0.5, -0.5,  0.5,
     0.5, -0.5,  0.5,
     0.5,  0.5,  0.5,
    -0.5,  0.5,  0.5,

    -0.5,  0.5,  0.5,
    -0.5,  0.5, -0.5,
    -0.5, -0.5, -0.5,
    -0.5, -0.5,  0.5,

     0.5,  0.5,  0.5,
     0.5,  0.5, -0.5,
     0.5, -0.5, -0.5,
     0.5, -0.5,  0.5,

    -0.5, -0.5, -0.5,
     0.5, -0.5, -0.5,
     0.5, -0.5,  0.5,
    -0.5, -0.5,  0.5,

    -0.5,  0.5, -0.5,
     0.5,  0.5, -0.5,
     0.5,  0.5,  0.5,
    -0.5,  0.5,  0.5,
];

/// Face normals, repeated per vertex
#[rustfmt::skip]
pub const CUBE_NORMALS: [f32; FACES * FACE_VERTICES * 3] = [
     0.0,  0.0, -1.0,   0.0,  0.0, -1.0,   0.0,  0.0, -1.0,   0.0,  0.0, -1.0,
     0.0,  0.0,  1.0,   0.0,  0.0,  1.0,   0.0,  0.0,  1.0,   0.0,  0.0,  1.0,
    -1.0,  0.0,  0.0,  -1.0,  0.0,  0.0,  -1.0,  0.0,  0.0,  -1.0,  0.0,  0.0,
     1.0,  0.0,  0.0,   1.0,  0.0,  0.0,   1.0,  0.0,  0.0,   1.0,  0.0,  0.0,
     0.0, -1.0,  0.0,   0.0, -1.0,  0.0,   0.0, -1.0,  0.0,   0.0, -1.0,  0.0,
     0.0,  1.0,  0.0,   0.0,  1.0,  0.0,   0.0,  1.0,  0.0,   0.0,  1.0,  0.0,
];

/// Texture coordinates
#[rustfmt::skip]
pub const CUBE_TEX_COORDS: [f32; FACES * FACE_VERTICES * 2] = [
    0.0, 0.0,  1.0, 0.0,  1.0, 1.0,  0.0, 1.0,
    0.0, 0.0,  1.0, 0.0,  1.0, 1.0,  0.0, 1.0,
    1.0, 0.0,  1.0, 1.0,  0.0, 1.0,  0.0, 0.0,
    1.0, 0.0,  1.0, 1.0,  0.0, 1.0,  0.0, 0.0,
    0.0, 1.0,  1.0, 1.0,  1.0, 0.0,  0.0, 0.0,
    0.0, 1.0,  1.0, 1.0,  1.0, 0.0,  0.0, 0.0,
];

/// Two triangles per quad face: `0,1,2, 2,3,0` offset by `4 * face`
pub fn cube_indices() -> Vec<u32> {
    quad_indices(FACES)
}

/// Fan-triangulated indices for `quads` consecutive four-vertex quads
pub fn quad_indices(quads: usize) -> Vec<u32> {
    (0..quads as u32)
        .flat_map(|quad| {
            let base = quad * FACE_VERTICES as u32;
            [0, 1, 2, 2, 3, 0].map(|i| base + i)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_indices_literal() {
        #[rustfmt::skip]
        let expected: [u32; 36] = [
            0, 1, 2, 2, 3, 0,
            4, 5, 6, 6, 7, 4,
            8, 9, 10, 10, 11, 8,
            12, 13, 14, 14, 15, 12,
            16, 17, 18, 18, 19, 16,
            20, 21, 22, 22, 23, 20,
        ];
        assert_eq!(cube_indices(), expected.to_vec());
    }

    #[test]
    fn test_every_vertex_is_referenced() {
        let indices = cube_indices();
        let vertex_count = CUBE_POSITIONS.len() / 3;
        assert_eq!(vertex_count, 24);
        assert_eq!(CUBE_NORMALS.len() / 3, vertex_count);
        assert_eq!(CUBE_TEX_COORDS.len() / 2, vertex_count);
        assert!((0..vertex_count as u32).all(|v| indices.contains(&v)));
        assert!(indices.iter().all(|&i| (i as usize) < vertex_count));
    }

    #[test]
    fn test_normals_point_out_of_their_face() {
        for v in 0..CUBE_POSITIONS.len() / 3 {
            let p = &CUBE_POSITIONS[3 * v..3 * v + 3];
            let n = &CUBE_NORMALS[3 * v..3 * v + 3];
            let dot: f32 = p.iter().zip(n).map(|(a, b)| a * b).sum();
            assert!((dot - 0.5).abs() < 1e-6, "vertex {v}");
        }
    }
}
