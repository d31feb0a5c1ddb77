/// Hand-off between built meshes and the graphics buffer owner
use crate::error::Result;
use crate::geometry::{IndexedMesh, VertexLayout};

/// Opaque id of a decoded texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Backend-agnostic view of one mesh's buffers
#[derive(Debug, Clone, Copy)]
pub struct MeshBuffers<'a> {
    pub layout: VertexLayout,
    pub attributes: &'a [f32],
    pub colors: Option<&'a [f32]>,
    pub indices: &'a [u32],
}

impl<'a> MeshBuffers<'a> {
    pub fn from_mesh(mesh: &'a IndexedMesh) -> Self {
        Self {
            layout: mesh.layout(),
            attributes: mesh.attributes(),
            colors: (!mesh.colors().is_empty()).then(|| mesh.colors()),
            indices: mesh.indices(),
        }
    }

    /// Floats per vertex
    pub fn stride(&self) -> usize {
        self.layout.stride()
    }
}

/// Owner of the actual vertex/color/index buffers
pub trait GraphicsBackend {
    /// Everything allocated for one mesh
    type Handle;

    /// Create all buffers for a mesh. On error nothing may remain allocated.
    fn upload(&mut self, buffers: &MeshBuffers<'_>) -> Result<Self::Handle>;

    /// Free every buffer behind `handle`
    fn release(&mut self, handle: Self::Handle);
}

/// An uploaded mesh plus what a draw call needs to size itself.
///
/// Must be given back through [`Drawable::release`]; the handle is freed as a whole.
#[derive(Debug)]
pub struct Drawable<H> {
    handle: Option<H>,
    index_count: u32,
    texture: Option<TextureId>,
}

impl<H> Drawable<H> {
    pub fn upload<B>(backend: &mut B, mesh: &IndexedMesh) -> Result<Self>
    where
        B: GraphicsBackend<Handle = H>,
    {
        let handle = backend.upload(&MeshBuffers::from_mesh(mesh))?;
        Ok(Self {
            handle: Some(handle),
            index_count: mesh.index_count() as u32,
            texture: None,
        })
    }

    pub fn with_texture(mut self, texture: Option<TextureId>) -> Self {
        self.texture = texture;
        self
    }

    pub fn handle(&self) -> Option<&H> {
        self.handle.as_ref()
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    pub fn release<B>(mut self, backend: &mut B)
    where
        B: GraphicsBackend<Handle = H>,
    {
        if let Some(handle) = self.handle.take() {
            backend.release(handle);
        }
    }
}

impl<H> Drop for Drawable<H> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            log::warn!(
                "drawable with {} indices dropped without releasing its buffers",
                self.index_count
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::geometry::{MeshBuilder, Triangle, Vertex, RED};

    /// Counts live buffers; a handle owns a vertex, a color and an index buffer
    #[derive(Default)]
    struct CountingBackend {
        live_buffers: usize,
        next_id: u32,
        fail: bool,
    }

    #[derive(Debug)]
    struct Handles {
        id: u32,
        buffers: usize,
    }

    impl GraphicsBackend for CountingBackend {
        type Handle = Handles;

        fn upload(&mut self, buffers: &MeshBuffers<'_>) -> Result<Handles> {
            if self.fail {
                return Err(Error::Backend("out of memory".into()));
            }
            let count = 2 + usize::from(buffers.colors.is_some());
            self.live_buffers += count;
            self.next_id += 1;
            Ok(Handles {
                id: self.next_id,
                buffers: count,
            })
        }

        fn release(&mut self, handle: Handles) {
            self.live_buffers -= handle.buffers;
        }
    }

    fn triangle_mesh() -> IndexedMesh {
        let mut builder = MeshBuilder::new(VertexLayout::PositionNormal);
        builder.push_triangle(
            &Triangle::new(
                Vertex::new(0.0, 0.0, 0.0, 0.0, 0.0, 1.0),
                Vertex::new(1.0, 0.0, 0.0, 0.0, 0.0, 1.0),
                Vertex::new(0.0, 1.0, 0.0, 0.0, 0.0, 1.0),
            ),
            RED,
        );
        builder.finish()
    }

    #[test]
    fn test_mesh_buffers_view() {
        let mesh = triangle_mesh();
        let buffers = MeshBuffers::from_mesh(&mesh);
        assert_eq!(buffers.stride(), 6);
        assert_eq!(buffers.attributes.len(), 18);
        assert_eq!(buffers.colors.map(<[f32]>::len), Some(12));
        assert_eq!(buffers.indices, &[0, 1, 2]);
    }

    #[test]
    fn test_upload_and_release_all_buffers() {
        let mut backend = CountingBackend::default();
        let drawable = Drawable::upload(&mut backend, &triangle_mesh()).unwrap();
        assert_eq!(drawable.index_count(), 3);
        assert_eq!(backend.live_buffers, 3);
        assert_eq!(drawable.handle().map(|h| h.id), Some(1));

        drawable.release(&mut backend);
        assert_eq!(backend.live_buffers, 0);
    }

    #[test]
    fn test_failed_upload_leaves_nothing_behind() {
        let mut backend = CountingBackend {
            fail: true,
            ..Default::default()
        };
        let result = Drawable::upload(&mut backend, &triangle_mesh());
        assert!(matches!(result, Err(Error::Backend(_))));
        assert_eq!(backend.live_buffers, 0);
    }

    #[test]
    fn test_texture_is_carried() {
        let mut backend = CountingBackend::default();
        let drawable = Drawable::upload(&mut backend, &triangle_mesh())
            .unwrap()
            .with_texture(Some(TextureId(7)));
        assert_eq!(drawable.texture(), Some(TextureId(7)));
        drawable.release(&mut backend);
    }
}
