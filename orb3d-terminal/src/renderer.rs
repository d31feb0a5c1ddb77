/// ASCII rasterizer that stands in for the graphics device
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::{Point3, Vector3};
use orb3d_core::error::{Error, Result};
use orb3d_core::geometry::VertexAttribute;
use orb3d_core::gpu::{Drawable, GraphicsBackend, MeshBuffers};
use orb3d_core::scene::{DrawItem, FrameUniforms};
use orb3d_core::Transform;
use std::io::Write;

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

const AMBIENT: f32 = 0.15;
const SPECULAR_STRENGTH: f32 = 0.5;
/// Smallest barycentric weight still counted as an edge in wireframe mode
const EDGE_WIDTH: f32 = 0.06;
/// Vertices closer to the eye plane than this are treated as behind the camera
const MIN_CLIP_W: f32 = 1e-4;

/// Handle of a mesh held by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshId(usize);

/// Mesh data copied out of the interleaved buffers at upload time
struct StoredMesh {
    positions: Vec<Point3<f32>>,
    normals: Vec<Vector3<f32>>,
    colors: Vec<[f32; 4]>,
    indices: Vec<u32>,
}

impl StoredMesh {
    fn from_buffers(buffers: &MeshBuffers<'_>) -> Result<Self> {
        let attribute = |location| {
            buffers.layout.attribute(location).ok_or_else(|| {
                Error::Backend(format!(
                    "{:?} has no attribute at location {location}",
                    buffers.layout
                ))
            })
        };
        let position = attribute(VertexAttribute::POSITION.location)?;
        let normal = attribute(VertexAttribute::NORMAL.location)?;

        let (positions, normals) = buffers
            .attributes
            .chunks_exact(buffers.stride())
            .map(|v| {
                let (p, n) = (position.read(v), normal.read(v));
                (Point3::new(p[0], p[1], p[2]), Vector3::new(n[0], n[1], n[2]))
            })
            .unzip::<_, _, Vec<_>, Vec<_>>();

        let colors = buffers
            .colors
            .map(|c| c.chunks_exact(4).map(|c| [c[0], c[1], c[2], c[3]]).collect())
            .unwrap_or_default();

        if let Some(&bad) = buffers.indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(Error::Backend(format!(
                "index {bad} out of range for {} vertices",
                positions.len()
            )));
        }

        Ok(Self {
            positions,
            normals,
            colors,
            indices: buffers.indices.to_vec(),
        })
    }

    fn color(&self, index: usize) -> [f32; 4] {
        self.colors.get(index).copied().unwrap_or([1.0; 4])
    }
}

/// Character, color and depth buffers
struct Canvas {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
    color_buffer: Vec<Color>,
}

impl Canvas {
    fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
            color_buffer: vec![Color::Reset; size],
        }
    }

    fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
        self.color_buffer.fill(Color::Reset);
    }

    fn rasterize_triangle(
        &mut self,
        coords: &[(f32, f32, f32); 3],
        character: char,
        color: Color,
        wireframe: bool,
    ) {
        let (v0, v1, v2) = (coords[0], coords[1], coords[2]);

        // Bounding box, clipped to the screen
        let min_x = (v0.0.min(v1.0).min(v2.0).floor() as i32).max(0);
        let max_x = (v0.0.max(v1.0).max(v2.0).ceil() as i32).min(self.width as i32 - 1);
        let min_y = (v0.1.min(v1.1).min(v2.1).floor() as i32).max(0);
        let max_y = (v0.1.max(v1.1).max(v2.1).ceil() as i32).min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                let Some((w0, w1, w2)) =
                    barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), (px, py))
                else {
                    continue;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                if wireframe && w0.min(w1).min(w2) > EDGE_WIDTH {
                    continue;
                }

                let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                if depth > 1.0 {
                    continue;
                }

                let idx = y as usize * self.width + x as usize;
                if depth < self.depth_buffer[idx] {
                    self.depth_buffer[idx] = depth;
                    self.char_buffer[idx] = character;
                    self.color_buffer[idx] = color;
                }
            }
        }
    }
}

/// Terminal renderer that owns uploaded meshes and rasterizes draw items into characters
pub struct AsciiRenderer {
    canvas: Canvas,
    meshes: Vec<Option<StoredMesh>>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            canvas: Canvas::new(width, height),
            meshes: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.canvas.width
    }

    pub fn height(&self) -> usize {
        self.canvas.height
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.canvas = Canvas::new(width, height);
    }

    pub fn clear(&mut self) {
        self.canvas.clear();
    }

    /// Number of meshes uploaded and not yet released
    pub fn live_meshes(&self) -> usize {
        self.meshes.iter().filter(|m| m.is_some()).count()
    }

    /// Character at a cell, mostly for inspection
    pub fn cell(&self, x: usize, y: usize) -> Option<char> {
        (x < self.canvas.width && y < self.canvas.height)
            .then(|| self.canvas.char_buffer[y * self.canvas.width + x])
    }

    pub fn render(
        &mut self,
        drawable: &Drawable<MeshId>,
        item: &DrawItem,
        uniforms: &FrameUniforms,
        wireframe: bool,
    ) {
        let Some(mesh) = drawable
            .handle()
            .and_then(|id| self.meshes.get(id.0))
            .and_then(Option::as_ref)
        else {
            log::warn!("draw of {:?} skipped: mesh is not uploaded", item.mesh);
            return;
        };

        let mvp = Transform::mvp_matrix(&item.model, &uniforms.view, &uniforms.projection);
        let (width, height) = (self.canvas.width as f32, self.canvas.height as f32);

        'triangles: for corners in mesh.indices.chunks_exact(3) {
            let corners = [corners[0] as usize, corners[1] as usize, corners[2] as usize];

            let mut screen = [(0.0, 0.0, 0.0); 3];
            for (slot, &i) in screen.iter_mut().zip(&corners) {
                let clip = mvp * mesh.positions[i].to_homogeneous();
                if clip.w < MIN_CLIP_W {
                    continue 'triangles;
                }
                let ndc = clip.xyz() / clip.w;
                *slot = (
                    (ndc.x + 1.0) * 0.5 * width,
                    (1.0 - ndc.y) * 0.5 * height,
                    ndc.z,
                );
            }

            let centroid = corners
                .iter()
                .fold(Vector3::zeros(), |acc: Vector3<f32>, &i| {
                    acc + mesh.positions[i].coords
                })
                / 3.0;
            let world_position = item.model.transform_point(&Point3::from(centroid));
            let normal = corners
                .iter()
                .fold(Vector3::zeros(), |acc: Vector3<f32>, &i| acc + mesh.normals[i]);
            let brightness = (item.normal * normal)
                .try_normalize(1e-6)
                .map_or(AMBIENT, |n| shade(&n, &world_position, uniforms));

            let base = corners.iter().fold([0.0f32; 4], |mut acc, &i| {
                let c = mesh.color(i);
                for (a, v) in acc.iter_mut().zip(c) {
                    *a += v / 3.0;
                }
                acc
            });

            self.canvas.rasterize_triangle(
                &screen,
                luminosity_char(brightness),
                shaded_color(base, brightness),
                wireframe,
            );
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let canvas = &self.canvas;
        for y in 0..canvas.height {
            for x in 0..canvas.width {
                let idx = y * canvas.width + x;
                writer.queue(SetForegroundColor(canvas.color_buffer[idx]))?;
                writer.queue(Print(canvas.char_buffer[idx]))?;
            }
            if y + 1 < canvas.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

impl GraphicsBackend for AsciiRenderer {
    type Handle = MeshId;

    fn upload(&mut self, buffers: &MeshBuffers<'_>) -> Result<MeshId> {
        let mesh = StoredMesh::from_buffers(buffers)?;
        let id = match self.meshes.iter().position(Option::is_none) {
            Some(free) => {
                self.meshes[free] = Some(mesh);
                free
            }
            None => {
                self.meshes.push(Some(mesh));
                self.meshes.len() - 1
            }
        };
        log::debug!("uploaded mesh {id} with {} indices", buffers.indices.len());
        Ok(MeshId(id))
    }

    fn release(&mut self, handle: MeshId) {
        if let Some(slot) = self.meshes.get_mut(handle.0) {
            *slot = None;
        }
    }
}

/// Ambient, diffuse and specular terms folded into one brightness value
fn shade(normal: &Vector3<f32>, position: &Point3<f32>, uniforms: &FrameUniforms) -> f32 {
    let intensity = uniforms.light_color.max();
    let Some(to_light) = (uniforms.light_position - position).try_normalize(1e-6) else {
        return AMBIENT * intensity;
    };
    let diffuse = normal.dot(&to_light).max(0.0);

    let specular = (uniforms.viewer_position - position)
        .try_normalize(1e-6)
        .map_or(0.0, |to_viewer| {
            let reflected = normal * (2.0 * normal.dot(&to_light)) - to_light;
            reflected.dot(&to_viewer).max(0.0).powf(uniforms.shininess) * SPECULAR_STRENGTH
        });

    ((AMBIENT + diffuse + specular) * intensity).clamp(0.0, 1.0)
}

/// Drawn cells never use the blank character
fn luminosity_char(brightness: f32) -> char {
    let last = LUMINOSITY_RAMP.len() - 1;
    let index = 1 + (brightness.clamp(0.0, 1.0) * (last - 1) as f32).round() as usize;
    LUMINOSITY_RAMP[index.min(last)]
}

fn shaded_color(base: [f32; 4], brightness: f32) -> Color {
    let channel = |c: f32| ((c * (0.3 + 0.7 * brightness)).clamp(0.0, 1.0) * 255.0) as u8;
    Color::Rgb {
        r: channel(base[0]),
        g: channel(base[1]),
        b: channel(base[2]),
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix3, Matrix4};
    use orb3d_core::geometry::{IndexedMesh, MeshBuilder, Triangle, Vertex, VertexLayout, RED};
    use orb3d_core::scene::MeshSlot;
    use orb3d_core::Projection;

    fn facing_triangle() -> IndexedMesh {
        let mut builder = MeshBuilder::new(VertexLayout::PositionNormal);
        builder.push_triangle(
            &Triangle::new(
                Vertex::new(-1.0, -1.0, 0.0, 0.0, 0.0, 1.0),
                Vertex::new(1.0, -1.0, 0.0, 0.0, 0.0, 1.0),
                Vertex::new(0.0, 1.0, 0.0, 0.0, 0.0, 1.0),
            ),
            RED,
        );
        builder.finish()
    }

    fn uniforms(eye: Point3<f32>, target: Point3<f32>) -> FrameUniforms {
        FrameUniforms {
            view: Transform::view_matrix(&eye, &target, &Vector3::y()),
            projection: Projection::new(40, 20).matrix(),
            light_color: Vector3::new(1.0, 1.0, 1.0),
            light_position: Point3::new(0.0, 0.0, 5.0),
            viewer_position: eye,
            shininess: 50.0,
        }
    }

    fn identity_item() -> DrawItem {
        DrawItem {
            mesh: MeshSlot::Table,
            model: Matrix4::identity(),
            normal: Matrix3::identity(),
        }
    }

    fn drawn_cells(renderer: &AsciiRenderer) -> usize {
        renderer.canvas.char_buffer.iter().filter(|&&c| c != ' ').count()
    }

    #[test]
    fn test_barycentric() {
        let (w0, w1, w2) =
            barycentric((0.0, 0.0), (4.0, 0.0), (0.0, 4.0), (1.0, 1.0)).unwrap();
        assert!((w0 - 0.5).abs() < 1e-6);
        assert!((w1 - 0.25).abs() < 1e-6);
        assert!((w2 - 0.25).abs() < 1e-6);

        assert!(barycentric((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (1.0, 0.0)).is_none());
    }

    #[test]
    fn test_upload_and_release() {
        let mut renderer = AsciiRenderer::new(10, 10);
        let a = Drawable::upload(&mut renderer, &facing_triangle()).unwrap();
        let b = Drawable::upload(&mut renderer, &facing_triangle()).unwrap();
        assert_eq!(renderer.live_meshes(), 2);

        a.release(&mut renderer);
        assert_eq!(renderer.live_meshes(), 1);

        // Freed slots are reused
        let c = Drawable::upload(&mut renderer, &facing_triangle()).unwrap();
        assert_eq!(c.handle(), Some(&MeshId(0)));

        b.release(&mut renderer);
        c.release(&mut renderer);
        assert_eq!(renderer.live_meshes(), 0);
    }

    #[test]
    fn test_upload_rejects_bad_indices() {
        let mut renderer = AsciiRenderer::new(10, 10);
        let attributes = [0.0; 12];
        let buffers = MeshBuffers {
            layout: VertexLayout::PositionNormal,
            attributes: &attributes,
            colors: None,
            indices: &[0, 1, 2],
        };
        assert!(matches!(renderer.upload(&buffers), Err(Error::Backend(_))));
        assert_eq!(renderer.live_meshes(), 0);
    }

    #[test]
    fn test_upload_reads_attributes_through_the_layout() {
        // Two textured vertices: position, normal, texcoord
        let attributes = [
            1.0, 2.0, 3.0, 0.0, 1.0, 0.0, 0.25, 0.5, //
            4.0, 5.0, 6.0, 1.0, 0.0, 0.0, 0.75, 1.0,
        ];
        let buffers = MeshBuffers {
            layout: VertexLayout::PositionNormalTexcoord,
            attributes: &attributes,
            colors: None,
            indices: &[0, 1, 1],
        };
        let mesh = StoredMesh::from_buffers(&buffers).unwrap();
        assert_eq!(mesh.positions, vec![Point3::new(1.0, 2.0, 3.0), Point3::new(4.0, 5.0, 6.0)]);
        assert_eq!(mesh.normals, vec![Vector3::y(), Vector3::x()]);
        assert_eq!(mesh.color(1), [1.0; 4]);
    }

    #[test]
    fn test_render_visible_triangle() {
        let mut renderer = AsciiRenderer::new(40, 20);
        let drawable = Drawable::upload(&mut renderer, &facing_triangle()).unwrap();
        let uniforms = uniforms(Point3::new(0.0, 0.0, 3.0), Point3::origin());

        renderer.render(&drawable, &identity_item(), &uniforms, false);
        assert!(drawn_cells(&renderer) > 20);
        let center = renderer.cell(20, 10).unwrap();
        assert_ne!(center, ' ');
        // Lit head-on: near the bright end of the ramp
        let position = LUMINOSITY_RAMP.iter().position(|&c| c == center).unwrap();
        assert!(position >= LUMINOSITY_RAMP.len() - 2);

        drawable.release(&mut renderer);
    }

    #[test]
    fn test_wireframe_leaves_interior_empty() {
        let mut renderer = AsciiRenderer::new(40, 20);
        let drawable = Drawable::upload(&mut renderer, &facing_triangle()).unwrap();
        let uniforms = uniforms(Point3::new(0.0, 0.0, 3.0), Point3::origin());

        renderer.render(&drawable, &identity_item(), &uniforms, false);
        let solid = drawn_cells(&renderer);

        renderer.clear();
        renderer.render(&drawable, &identity_item(), &uniforms, true);
        assert_eq!(renderer.cell(20, 10), Some(' '));
        assert!(drawn_cells(&renderer) > 0);
        assert!(drawn_cells(&renderer) < solid);

        drawable.release(&mut renderer);
    }

    #[test]
    fn test_triangle_behind_camera_is_skipped() {
        let mut renderer = AsciiRenderer::new(40, 20);
        let drawable = Drawable::upload(&mut renderer, &facing_triangle()).unwrap();
        let uniforms = uniforms(Point3::new(0.0, 0.0, 3.0), Point3::new(0.0, 0.0, 6.0));

        renderer.render(&drawable, &identity_item(), &uniforms, false);
        assert_eq!(drawn_cells(&renderer), 0);

        drawable.release(&mut renderer);
    }

    #[test]
    fn test_luminosity_char() {
        assert_eq!(luminosity_char(0.0), '.');
        assert_eq!(luminosity_char(1.0), '@');
        assert_eq!(luminosity_char(7.0), '@');
    }
}
