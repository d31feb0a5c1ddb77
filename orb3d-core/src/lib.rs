/// orb3d Core Library - Mesh construction and per-frame transform logic
///
/// This library builds indexed, interleaved vertex buffers (UV tessellation, OBJ import,
/// box primitives) and computes the per-drawable matrices and uniforms of a small
/// interactive scene. Graphics buffers, windowing and input are reached through traits.

pub mod camera;
pub mod error;
pub mod geometry;
pub mod gpu;
pub mod obj;
pub mod primitives;
pub mod scene;
pub mod tessellate;
pub mod transform;

// Re-export commonly used types
pub use camera::{FollowCamera, PanCamera, Projection, ViewCamera};
pub use error::{Error, Result};
pub use geometry::{IndexedMesh, MeshBuilder, Triangle, Vertex, VertexLayout};
pub use gpu::{Drawable, GraphicsBackend, MeshBuffers};
pub use obj::ObjOptions;
pub use scene::{Action, Frame, InputState, Scene, SceneConfig, SceneDrawables, SceneMeshes};
pub use transform::{RotationState, Transform};
