/// Box-shaped scene props built through the dedup table
use nalgebra::{Point3, Vector3};

use crate::geometry::{Color, IndexedMesh, MeshBuilder, Triangle, Vertex, VertexLayout, WHITE};

/// Ivory, as used for the table top
pub const IVORY: Color = [255.0 / 256.0, 255.0 / 256.0, 240.0 / 256.0, 1.0];

/// Cube faces as (outward normal, right, up) with `right x up == normal`.
/// Order: front, back, top, bottom, right, left.
const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
    ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
    ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
];

/// Two triangles covering one square face, counter-clockwise when seen along `-normal`.
///
/// With `inward` set the normal and winding are flipped so the face is visible from inside.
fn quad(center: Point3<f32>, face: usize, half: f32, inward: bool) -> [Triangle; 2] {
    let (n, r, u) = FACES[face];
    let normal = Vector3::from(n);
    let right = Vector3::from(r) * half;
    let up = Vector3::from(u) * half;

    let shading_normal = if inward { -normal } else { normal };
    let corner = |offset: Vector3<f32>, s: f32, t: f32| {
        Vertex::from_parts(center + offset, shading_normal).with_texcoord(s, t)
    };

    let a = corner(-right - up, 0.0, 1.0);
    let b = corner(right - up, 1.0, 1.0);
    let c = corner(right + up, 1.0, 0.0);
    let d = corner(-right + up, 0.0, 0.0);

    if inward {
        [Triangle::new(a, c, b), Triangle::new(a, d, c)]
    } else {
        [Triangle::new(a, b, c), Triangle::new(a, c, d)]
    }
}

/// Cube centered at the origin with one flat color per face (front, back, top, bottom, right, left)
pub fn cube_with_face_colors(size: f32, face_colors: [Color; 6]) -> IndexedMesh {
    let half = size / 2.0;
    let mut builder = MeshBuilder::with_capacity(VertexLayout::PositionNormal, 24, 36);

    for (face, color) in face_colors.iter().enumerate() {
        let center = Point3::from(Vector3::from(FACES[face].0) * half);
        for triangle in quad(center, face, half, false) {
            builder.push_triangle(&triangle, *color);
        }
    }

    builder.finish()
}

/// Upward-facing square on the XZ plane at height `y`
pub fn square(size: f32, y: f32, color: Color) -> IndexedMesh {
    let mut builder = MeshBuilder::with_capacity(VertexLayout::PositionNormal, 4, 6);
    for triangle in quad(Point3::new(0.0, y, 0.0), 2, size / 2.0, false) {
        builder.push_triangle(&triangle, color);
    }
    builder.finish()
}

/// Textured cube seen from the inside, used as a sky box
pub fn interior_cube(size: f32) -> IndexedMesh {
    let half = size / 2.0;
    let mut builder = MeshBuilder::with_capacity(VertexLayout::PositionNormalTexcoord, 24, 36);

    for face in 0..FACES.len() {
        let center = Point3::from(Vector3::from(FACES[face].0) * half);
        for triangle in quad(center, face, half, true) {
            builder.push_triangle(&triangle, WHITE);
        }
    }

    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{face_normal, RED};
    use approx::assert_relative_eq;

    const COLORS: [Color; 6] = [
        [1.0, 0.0, 0.0, 1.0],
        [0.0, 1.0, 0.0, 1.0],
        [0.0, 0.0, 1.0, 1.0],
        [1.0, 0.0, 1.0, 1.0],
        [0.0, 1.0, 1.0, 1.0],
        [1.0, 1.0, 0.0, 1.0],
    ];

    #[test]
    fn test_cube_counts() {
        let cube = cube_with_face_colors(2.0, COLORS);
        assert_eq!(cube.triangle_count(), 12);
        // Corners are shared within a face but not across faces (normals differ)
        assert_eq!(cube.vertex_count(), 24);
        assert!(cube.is_consistent());
    }

    #[test]
    fn test_cube_winding_matches_normals() {
        let cube = cube_with_face_colors(2.0, COLORS);
        for [a, b, c] in cube.triangles() {
            let (a, b, c) = (a as usize, b as usize, c as usize);
            let winding = face_normal(&cube.position(a), &cube.position(b), &cube.position(c));
            assert_relative_eq!(winding, cube.normal(a), epsilon = 1e-6);
            // Outward: the normal points away from the center
            assert!(cube.position(a).coords.dot(&cube.normal(a)) > 0.0);
        }
    }

    #[test]
    fn test_cube_face_colors() {
        let cube = cube_with_face_colors(2.0, COLORS);
        // First face emitted is the front face
        assert_eq!(cube.color(0), COLORS[0]);
        assert_eq!(cube.color(23), COLORS[5]);
    }

    #[test]
    fn test_square() {
        let table = square(4.0, 0.0, RED);
        assert_eq!(table.vertex_count(), 4);
        assert_eq!(table.index_count(), 6);
        for i in 0..4 {
            assert_relative_eq!(table.normal(i), Vector3::y());
            assert_eq!(table.position(i).x.abs(), 2.0);
        }
    }

    #[test]
    fn test_interior_cube_faces_inward() {
        let sky = interior_cube(2.0);
        assert_eq!(sky.stride(), 8);
        for [a, b, c] in sky.triangles() {
            let (a, b, c) = (a as usize, b as usize, c as usize);
            assert!(sky.position(a).coords.dot(&sky.normal(a)) < 0.0);
            let winding = face_normal(&sky.position(a), &sky.position(b), &sky.position(c));
            assert_relative_eq!(winding, sky.normal(a), epsilon = 1e-6);
            assert!(sky.texcoord(a).is_some());
        }
    }
}
