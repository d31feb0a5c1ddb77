/// Vertex signatures, the dedup table and the indexed mesh it produces
use nalgebra::{Point3, Vector2, Vector3};
use rustc_hash::FxHashMap;

/// RGBA color, one per emitted vertex
pub type Color = [f32; 4];

pub const RED: Color = [1.0, 0.0, 0.0, 1.0];
pub const WHITE: Color = [1.0, 1.0, 1.0, 1.0];

/// One attribute inside an interleaved vertex, measured in floats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Shader attribute location
    pub location: u32,
    pub offset: usize,
    pub width: usize,
}

impl VertexAttribute {
    pub const POSITION: Self = Self {
        location: 0,
        offset: 0,
        width: 3,
    };
    pub const NORMAL: Self = Self {
        location: 2,
        offset: 3,
        width: 3,
    };
    pub const TEXCOORD: Self = Self {
        location: 3,
        offset: 6,
        width: 2,
    };

    /// This attribute's floats within one interleaved vertex
    pub fn read<'a>(&self, vertex: &'a [f32]) -> &'a [f32] {
        &vertex[self.offset..self.offset + self.width]
    }
}

/// Interleaved attribute layout: position, normal, then the optional texcoord
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexLayout {
    PositionNormal,
    PositionNormalTexcoord,
}

impl VertexLayout {
    /// Number of floats per vertex
    pub const fn stride(self) -> usize {
        match self {
            VertexLayout::PositionNormal => 6,
            VertexLayout::PositionNormalTexcoord => 8,
        }
    }

    pub const fn has_texcoord(self) -> bool {
        matches!(self, VertexLayout::PositionNormalTexcoord)
    }

    pub fn attributes(self) -> &'static [VertexAttribute] {
        match self {
            VertexLayout::PositionNormal => &[VertexAttribute::POSITION, VertexAttribute::NORMAL],
            VertexLayout::PositionNormalTexcoord => &[
                VertexAttribute::POSITION,
                VertexAttribute::NORMAL,
                VertexAttribute::TEXCOORD,
            ],
        }
    }

    /// Attribute bound to shader `location`, if this layout carries one
    pub fn attribute(self, location: u32) -> Option<VertexAttribute> {
        self.attributes()
            .iter()
            .find(|attribute| attribute.location == location)
            .copied()
    }
}

/// A 3D vertex with position, normal and optional texture coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
    pub texcoord: Option<Vector2<f32>>,
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32, nx: f32, ny: f32, nz: f32) -> Self {
        Self {
            position: Point3::new(x, y, z),
            normal: Vector3::new(nx, ny, nz),
            texcoord: None,
        }
    }

    pub fn from_parts(position: Point3<f32>, normal: Vector3<f32>) -> Self {
        Self {
            position,
            normal,
            texcoord: None,
        }
    }

    pub fn with_texcoord(mut self, u: f32, v: f32) -> Self {
        self.texcoord = Some(Vector2::new(u, v));
        self
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }
}

/// `normalize(cross(b - a, c - a))`; collinear input yields NaN components
pub fn face_normal(a: &Point3<f32>, b: &Point3<f32>, c: &Point3<f32>) -> Vector3<f32> {
    let edge1 = b - a;
    let edge2 = c - a;

    edge1.cross(&edge2).normalize()
}

/// Exact identity of a vertex as it will be stored: the bit patterns of its floats.
///
/// `0.0` and `-0.0` are distinct keys, and NaNs only merge with the same NaN payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VertexKey {
    position: [u32; 3],
    normal: [u32; 3],
    texcoord: Option<[u32; 2]>,
}

impl VertexKey {
    fn new(vertex: &Vertex, layout: VertexLayout) -> Self {
        let p = &vertex.position;
        let n = &vertex.normal;
        Self {
            position: [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()],
            normal: [n.x.to_bits(), n.y.to_bits(), n.z.to_bits()],
            texcoord: layout.has_texcoord().then(|| {
                let t = stored_texcoord(vertex);
                [t.x.to_bits(), t.y.to_bits()]
            }),
        }
    }
}

fn stored_texcoord(vertex: &Vertex) -> Vector2<f32> {
    vertex.texcoord.unwrap_or_else(Vector2::zeros)
}

/// Deduplicated, indexed triangle mesh ready for upload.
///
/// `attributes` holds `stride` floats per unique vertex, `colors` holds four, and every
/// value in `indices` is below the unique vertex count.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedMesh {
    layout: VertexLayout,
    attributes: Vec<f32>,
    colors: Vec<f32>,
    indices: Vec<u32>,
}

impl IndexedMesh {
    pub fn new(layout: VertexLayout) -> Self {
        Self {
            layout,
            attributes: Vec::new(),
            colors: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn layout(&self) -> VertexLayout {
        self.layout
    }

    pub fn stride(&self) -> usize {
        self.layout.stride()
    }

    pub fn attributes(&self) -> &[f32] {
        &self.attributes
    }

    pub fn colors(&self) -> &[f32] {
        &self.colors
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.attributes.len() / self.stride()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    fn vertex_floats(&self, index: usize) -> &[f32] {
        let stride = self.stride();
        &self.attributes[index * stride..(index + 1) * stride]
    }

    pub fn position(&self, index: usize) -> Point3<f32> {
        let p = VertexAttribute::POSITION.read(self.vertex_floats(index));
        Point3::new(p[0], p[1], p[2])
    }

    pub fn normal(&self, index: usize) -> Vector3<f32> {
        let n = VertexAttribute::NORMAL.read(self.vertex_floats(index));
        Vector3::new(n[0], n[1], n[2])
    }

    pub fn texcoord(&self, index: usize) -> Option<Vector2<f32>> {
        let t = self
            .layout
            .attribute(VertexAttribute::TEXCOORD.location)?
            .read(self.vertex_floats(index));
        Some(Vector2::new(t[0], t[1]))
    }

    pub fn color(&self, index: usize) -> Color {
        let c = &self.colors[index * 4..index * 4 + 4];
        [c[0], c[1], c[2], c[3]]
    }

    /// Index triples in winding order
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Overwrite every vertex color
    pub fn recolor(&mut self, color: Color) {
        for chunk in self.colors.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    /// Whether the attribute, color and index sequences agree with each other
    pub fn is_consistent(&self) -> bool {
        let count = self.vertex_count();
        self.attributes.len() % self.stride() == 0
            && self.colors.len() == count * 4
            && self.indices.len() % 3 == 0
            && self.indices.iter().all(|&i| (i as usize) < count)
    }
}

/// Dedup table scoped to a single mesh build.
///
/// Each unique vertex signature is appended to the output exactly once, in first-seen order.
pub struct MeshBuilder {
    lookup: FxHashMap<VertexKey, u32>,
    mesh: IndexedMesh,
}

impl MeshBuilder {
    pub fn new(layout: VertexLayout) -> Self {
        Self {
            lookup: FxHashMap::default(),
            mesh: IndexedMesh::new(layout),
        }
    }

    pub fn with_capacity(layout: VertexLayout, vertex_count: usize, index_count: usize) -> Self {
        let mut lookup = FxHashMap::default();
        lookup.reserve(vertex_count);
        Self {
            lookup,
            mesh: IndexedMesh {
                layout,
                attributes: Vec::with_capacity(vertex_count * layout.stride()),
                colors: Vec::with_capacity(vertex_count * 4),
                indices: Vec::with_capacity(index_count),
            },
        }
    }

    pub fn layout(&self) -> VertexLayout {
        self.mesh.layout
    }

    pub fn unique_vertex_count(&self) -> usize {
        self.lookup.len()
    }

    /// Index of `vertex`, appending its attributes and `color` if it has not been seen.
    ///
    /// Does not emit a triangle index.
    pub fn lookup_or_insert(&mut self, vertex: &Vertex, color: Color) -> u32 {
        let layout = self.mesh.layout;
        let key = VertexKey::new(vertex, layout);
        let next = self.lookup.len() as u32;
        let mesh = &mut self.mesh;

        *self.lookup.entry(key).or_insert_with(|| {
            let p = &vertex.position;
            let n = &vertex.normal;
            mesh.attributes.extend_from_slice(&[p.x, p.y, p.z, n.x, n.y, n.z]);
            if layout.has_texcoord() {
                let t = stored_texcoord(vertex);
                mesh.attributes.extend_from_slice(&[t.x, t.y]);
            }
            mesh.colors.extend_from_slice(&color);
            next
        })
    }

    /// Resolve all three corners and emit their indices in winding order
    pub fn push_triangle(&mut self, triangle: &Triangle, color: Color) -> [u32; 3] {
        let [a, b, c] = &triangle.vertices;
        let indices = [
            self.lookup_or_insert(a, color),
            self.lookup_or_insert(b, color),
            self.lookup_or_insert(c, color),
        ];
        self.mesh.indices.extend_from_slice(&indices);
        indices
    }

    pub fn finish(self) -> IndexedMesh {
        log::debug!(
            "built indexed mesh: {} unique vertices, {} triangles, stride {}",
            self.mesh.vertex_count(),
            self.mesh.triangle_count(),
            self.mesh.stride(),
        );
        self.mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn corner(x: f32, y: f32, z: f32) -> Vertex {
        Vertex::new(x, y, z, 0.0, 0.0, 1.0)
    }

    #[test]
    fn test_duplicate_signatures_share_an_index() {
        let mut builder = MeshBuilder::new(VertexLayout::PositionNormal);
        let signatures = [
            corner(0.0, 0.0, 0.0),
            corner(1.0, 0.0, 0.0),
            corner(0.0, 0.0, 0.0),
            corner(0.0, 1.0, 0.0),
            corner(1.0, 0.0, 0.0),
            corner(0.0, 0.0, 0.0),
        ];

        let indices: Vec<u32> = signatures
            .iter()
            .map(|v| builder.lookup_or_insert(v, RED))
            .collect();

        assert_eq!(indices, vec![0, 1, 0, 2, 1, 0]);
        assert_eq!(builder.unique_vertex_count(), 3);

        let mesh = builder.finish();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.attributes().len(), 3 * 6);
        assert_eq!(mesh.colors().len(), 3 * 4);
        assert_eq!(mesh.position(2), Point3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_attributes_tile_the_stride() {
        for layout in [VertexLayout::PositionNormal, VertexLayout::PositionNormalTexcoord] {
            let mut offset = 0;
            for attribute in layout.attributes() {
                assert_eq!(attribute.offset, offset, "{layout:?}");
                offset += attribute.width;
            }
            assert_eq!(offset, layout.stride(), "{layout:?}");
        }

        assert_eq!(VertexLayout::PositionNormal.attribute(3), None);
        assert_eq!(
            VertexLayout::PositionNormalTexcoord.attribute(3),
            Some(VertexAttribute::TEXCOORD)
        );
        assert_eq!(VertexLayout::PositionNormal.attribute(1), None);

        let vertex = [1.0, 2.0, 3.0, 0.0, 0.0, 1.0, 0.25, 0.75];
        assert_eq!(VertexAttribute::NORMAL.read(&vertex), &[0.0, 0.0, 1.0]);
        assert_eq!(VertexAttribute::TEXCOORD.read(&vertex), &[0.25, 0.75]);
    }

    #[test]
    fn test_normal_is_part_of_the_signature() {
        let mut builder = MeshBuilder::new(VertexLayout::PositionNormal);
        let up = Vertex::new(0.0, 0.0, 0.0, 0.0, 1.0, 0.0);
        let side = Vertex::new(0.0, 0.0, 0.0, 1.0, 0.0, 0.0);

        assert_eq!(builder.lookup_or_insert(&up, RED), 0);
        assert_eq!(builder.lookup_or_insert(&side, RED), 1);
        assert_eq!(builder.lookup_or_insert(&up, WHITE), 0);

        // First color wins for a shared vertex
        let mesh = builder.finish();
        assert_eq!(mesh.color(0), RED);
    }

    #[test]
    fn test_signed_zero_is_distinct() {
        let mut builder = MeshBuilder::new(VertexLayout::PositionNormal);
        let a = builder.lookup_or_insert(&corner(0.0, 0.0, 0.0), RED);
        let b = builder.lookup_or_insert(&corner(-0.0, 0.0, 0.0), RED);
        assert_ne!(a, b);
    }

    #[test]
    fn test_texcoord_layout() {
        let mut builder = MeshBuilder::new(VertexLayout::PositionNormalTexcoord);
        let a = corner(0.0, 0.0, 0.0).with_texcoord(0.25, 0.75);
        let b = corner(0.0, 0.0, 0.0).with_texcoord(0.5, 0.75);
        let bare = corner(0.0, 0.0, 0.0);

        builder.lookup_or_insert(&a, RED);
        builder.lookup_or_insert(&b, RED);
        builder.lookup_or_insert(&bare, RED);
        // Missing texcoords are stored as zero and dedup against an explicit zero
        let zero = corner(0.0, 0.0, 0.0).with_texcoord(0.0, 0.0);
        assert_eq!(builder.lookup_or_insert(&zero, RED), 2);

        let mesh = builder.finish();
        assert_eq!(mesh.stride(), 8);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.texcoord(1), Some(Vector2::new(0.5, 0.75)));
        assert_eq!(mesh.texcoord(2), Some(Vector2::zeros()));
    }

    #[test]
    fn test_push_triangle_keeps_winding() {
        let mut builder = MeshBuilder::new(VertexLayout::PositionNormal);
        let a = corner(0.0, 0.0, 0.0);
        let b = corner(1.0, 0.0, 0.0);
        let c = corner(0.0, 1.0, 0.0);
        let d = corner(1.0, 1.0, 0.0);

        builder.push_triangle(&Triangle::new(a, b, c), RED);
        builder.push_triangle(&Triangle::new(b, d, c), RED);
        let mesh = builder.finish();

        assert_eq!(mesh.indices(), &[0, 1, 2, 1, 3, 2]);
        assert_eq!(mesh.triangles().collect::<Vec<_>>(), vec![[0, 1, 2], [1, 3, 2]]);
        assert!(mesh.is_consistent());
        let max = mesh.indices().iter().copied().max();
        assert_eq!(max, Some(mesh.vertex_count() as u32 - 1));
    }

    #[test]
    fn test_face_normal() {
        let normal = face_normal(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(2.0, 0.0, 0.0),
            &Point3::new(0.0, 3.0, 0.0),
        );
        assert_relative_eq!(normal, Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_recolor() {
        let mut builder = MeshBuilder::new(VertexLayout::PositionNormal);
        builder.push_triangle(
            &Triangle::new(corner(0.0, 0.0, 0.0), corner(1.0, 0.0, 0.0), corner(0.0, 1.0, 0.0)),
            RED,
        );
        let mut mesh = builder.finish();
        mesh.recolor(WHITE);
        assert!((0..3).all(|i| mesh.color(i) == WHITE));
    }
}
