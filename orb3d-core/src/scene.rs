/// Scene context: configuration, animation, input actions and per-frame transforms
use std::path::{Path, PathBuf};

use nalgebra::{Matrix3, Matrix4, Point3, Vector2, Vector3};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::camera::{FollowCamera, PanCamera, Projection, ViewCamera};
use crate::error::{Error, Result};
use crate::geometry::{Color, IndexedMesh, WHITE};
use crate::gpu::{Drawable, GraphicsBackend, TextureId};
use crate::obj::{self, ObjOptions};
use crate::primitives::{self, IVORY};
use crate::tessellate::{self, UvGrid};
use crate::transform::{RotationState, Transform};

/// Shader uniform names every frame is uploaded under
pub mod uniforms {
    pub const MODEL: &str = "uModel";
    pub const NORMAL: &str = "uNormal";
    pub const VIEW: &str = "uView";
    pub const PROJECTION: &str = "uProjection";
    pub const TEXTURE: &str = "uTexture";
    pub const LIGHT_COLOR: &str = "lightColor";
    pub const LIGHT_POSITION: &str = "lightPos";
    pub const VIEWER_POSITION: &str = "viewPos";
    pub const SHININESS: &str = "shininess";
}

const BUILTIN_ORBITER: &str = include_str!("../assets/orbiter.obj");

/// Every tunable constant of the scene
#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    /// Includes the tracked sphere at index 0
    pub sphere_count: usize,
    pub sphere_radius: f32,
    pub sphere_grid: UvGrid,
    pub sphere_height: f32,
    /// Side length of the square the spheres are spread over
    pub field_extent: f32,
    pub field_margin: f32,
    pub field_depth_offset: f32,
    pub tracked_step: f64,
    pub camera_step: f64,
    pub orbiter_scale: f32,
    pub orbiter_color: Color,
    pub orbit_radius: f32,
    pub orbit_height: f32,
    /// Degrees per second
    pub orbit_rate: f64,
    pub table_size: f32,
    pub table_color: Color,
    pub cube_size: f32,
    /// Front, back, top, bottom, right, left
    pub face_colors: [Color; 6],
    pub sky_box_scale: f32,
    pub light_color: Vector3<f32>,
    pub light_position: Point3<f32>,
    pub shininess: f32,
    pub projection: Projection,
    pub seed: u64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            sphere_count: 10,
            sphere_radius: 5.0,
            sphere_grid: UvGrid::default(),
            sphere_height: 5.0,
            field_extent: 180.0,
            field_margin: 5.0,
            field_depth_offset: -50.0,
            tracked_step: 0.2,
            camera_step: 1.0,
            orbiter_scale: 50.0,
            orbiter_color: WHITE,
            orbit_radius: 3.0,
            orbit_height: 2.0,
            orbit_rate: 10.0,
            table_size: 10.0,
            table_color: IVORY,
            cube_size: 1.0,
            face_colors: [
                [1.0, 0.0, 0.0, 1.0],
                [0.0, 1.0, 0.0, 1.0],
                [0.0, 0.0, 1.0, 1.0],
                [1.0, 0.0, 1.0, 1.0],
                [0.0, 1.0, 1.0, 1.0],
                [1.0, 1.0, 0.0, 1.0],
            ],
            sky_box_scale: 400.0,
            light_color: Vector3::new(1.0, 1.0, 1.0),
            light_position: Point3::new(5.0, 1.0, 0.0),
            shininess: 50.0,
            projection: Projection::default(),
            seed: 0,
        }
    }
}

/// Time accumulator driving the orbiter and the center cube
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitAnimation {
    pub enabled: bool,
    time: f64,
    rate: f64,
}

impl OrbitAnimation {
    pub fn new(rate: f64) -> Self {
        Self {
            enabled: true,
            time: 0.0,
            rate,
        }
    }

    /// Accumulate `dt` seconds; a disabled animation keeps its angle
    pub fn advance(&mut self, dt: f64) {
        if !self.enabled {
            return;
        }
        self.time += dt;
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Orbit angle in degrees
    pub fn angle(&self) -> f64 {
        self.time * self.rate
    }
}

/// Model matrix of the orbiting mesh at `angle` degrees.
///
/// The mesh faces along its direction of travel, bobs up and down and banks slightly.
pub fn orbiter_model(angle: f64, radius: f32, height: f32, scale: f32) -> Matrix4<f32> {
    let radius = f64::from(radius);
    let orbit = |degrees: f64| {
        let theta = degrees.to_radians();
        (radius * theta.sin(), radius * theta.cos())
    };

    let (x, z) = orbit(angle);
    let (next_x, next_z) = orbit(angle + 1.0);
    let face = (next_x - x).atan2(next_z - z);

    let wing_flap = (angle * 0.2).sin() * 0.3;
    let bank = ((angle * 0.1).sin() * 10.0).to_radians();

    Transform::translation_matrix(x as f32, height + wing_flap as f32, z as f32)
        * Transform::rotation_y(face as f32)
        * Transform::rotation_z(bank as f32)
        * Transform::scale_matrix(scale, scale, scale)
}

/// Which camera the view matrix is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveCamera {
    #[default]
    Pan,
    Follow,
}

impl ActiveCamera {
    pub fn toggled(self) -> Self {
        match self {
            ActiveCamera::Pan => ActiveCamera::Follow,
            ActiveCamera::Follow => ActiveCamera::Pan,
        }
    }
}

/// Logical input actions, independent of any key binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Tracked sphere: -Z
    MoveForward,
    /// Tracked sphere: +Z
    MoveBackward,
    /// Tracked sphere: -X
    MoveLeft,
    /// Tracked sphere: +X
    MoveRight,
    ToggleCamera,
    ToggleAnimation,
    ToggleWireframe,
    /// Follow camera only
    RotateLeft,
    /// Follow camera only
    RotateRight,
    CameraUp,
    CameraDown,
    PanForward,
    PanBackward,
    PanLeft,
    PanRight,
}

/// "Is this action active this tick"
pub trait InputState {
    fn is_active(&self, action: Action) -> bool;
}

impl InputState for [Action] {
    fn is_active(&self, action: Action) -> bool {
        self.contains(&action)
    }
}

/// Mesh a draw item refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshSlot {
    Sphere,
    Orbiter,
    Table,
    CenterCube,
    SkyBox,
}

impl MeshSlot {
    pub const ALL: [MeshSlot; 5] = [
        MeshSlot::Sphere,
        MeshSlot::Orbiter,
        MeshSlot::Table,
        MeshSlot::CenterCube,
        MeshSlot::SkyBox,
    ];
}

/// Every mesh the scene draws, built once at setup
#[derive(Debug, Clone)]
pub struct SceneMeshes {
    pub sphere: IndexedMesh,
    pub orbiter: IndexedMesh,
    pub table: IndexedMesh,
    pub center_cube: IndexedMesh,
    pub sky_box: IndexedMesh,
}

impl SceneMeshes {
    pub fn build(config: &SceneConfig, orbiter: IndexedMesh) -> Self {
        Self {
            sphere: tessellate::sphere(config.sphere_radius, &config.sphere_grid),
            orbiter,
            table: primitives::square(config.table_size, 0.0, config.table_color),
            center_cube: primitives::cube_with_face_colors(config.cube_size, config.face_colors),
            sky_box: primitives::interior_cube(1.0),
        }
    }

    /// Build all meshes, reading the orbiter from `orbiter_path` or the built-in model
    pub fn load(
        config: &SceneConfig,
        orbiter_path: Option<&Path>,
        options: ObjOptions,
    ) -> Result<Self> {
        let layout = options.vertex_layout();
        let orbiter = match orbiter_path {
            Some(path) => obj::load_obj_file(path, options, layout, config.orbiter_color)?,
            None => {
                let data = obj::parse_obj(BUILTIN_ORBITER, options)?;
                obj::build(&data, layout, config.orbiter_color)?
            }
        };
        log::info!(
            "orbiter mesh: {} vertices, {} triangles",
            orbiter.vertex_count(),
            orbiter.triangle_count()
        );

        Ok(Self::build(config, orbiter))
    }

    pub fn get(&self, slot: MeshSlot) -> &IndexedMesh {
        match slot {
            MeshSlot::Sphere => &self.sphere,
            MeshSlot::Orbiter => &self.orbiter,
            MeshSlot::Table => &self.table,
            MeshSlot::CenterCube => &self.center_cube,
            MeshSlot::SkyBox => &self.sky_box,
        }
    }
}

/// Uploaded counterparts of [`SceneMeshes`], one per [`MeshSlot`]
#[derive(Debug)]
pub struct SceneDrawables<H> {
    drawables: Vec<Drawable<H>>,
}

impl<H> SceneDrawables<H> {
    /// Upload every mesh. If any upload fails, the ones already made are released.
    pub fn upload<B>(
        backend: &mut B,
        meshes: &SceneMeshes,
        orbiter_texture: Option<TextureId>,
        sky_box_texture: Option<TextureId>,
    ) -> Result<Self>
    where
        B: GraphicsBackend<Handle = H>,
    {
        let mut drawables = Vec::with_capacity(MeshSlot::ALL.len());
        for slot in MeshSlot::ALL {
            let texture = match slot {
                MeshSlot::Orbiter => orbiter_texture,
                MeshSlot::SkyBox => sky_box_texture,
                _ => None,
            };
            match Drawable::upload(backend, meshes.get(slot)) {
                Ok(drawable) => drawables.push(drawable.with_texture(texture)),
                Err(e) => {
                    for drawable in drawables {
                        drawable.release(backend);
                    }
                    return Err(e);
                }
            }
        }
        Ok(Self { drawables })
    }

    pub fn get(&self, slot: MeshSlot) -> &Drawable<H> {
        &self.drawables[slot as usize]
    }

    pub fn release<B>(self, backend: &mut B)
    where
        B: GraphicsBackend<Handle = H>,
    {
        for drawable in self.drawables {
            drawable.release(backend);
        }
    }
}

/// Values shared by every draw in a frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameUniforms {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub light_color: Vector3<f32>,
    pub light_position: Point3<f32>,
    pub viewer_position: Point3<f32>,
    pub shininess: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub mesh: MeshSlot,
    pub model: Matrix4<f32>,
    pub normal: Matrix3<f32>,
}

impl DrawItem {
    pub fn new(mesh: MeshSlot, model: Matrix4<f32>) -> Result<Self> {
        Ok(Self {
            mesh,
            model,
            normal: Transform::normal_matrix(&model)?,
        })
    }
}

/// Everything needed to issue one frame's draw calls, in draw order
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub uniforms: FrameUniforms,
    pub draws: Vec<DrawItem>,
    pub wireframe: bool,
}

/// Mutable scene state: cameras, animation, sphere field and toggles
#[derive(Debug, Clone)]
pub struct Scene {
    config: SceneConfig,
    pan_camera: PanCamera,
    follow_camera: FollowCamera,
    active_camera: ActiveCamera,
    animation: OrbitAnimation,
    sphere_offsets: Vec<f32>,
    tracked_offset: Vector2<f64>,
    wireframe: bool,
}

impl Scene {
    pub fn new(config: SceneConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let span = (config.field_extent - 2.0 * config.field_margin).max(1.0) as u32;
        let sphere_offsets = (0..config.sphere_count)
            .map(|_| rng.gen_range(0..span) as f32)
            .collect();

        log::info!(
            "scene with {} spheres, seed {}",
            config.sphere_count,
            config.seed
        );

        Self {
            pan_camera: PanCamera::default(),
            follow_camera: FollowCamera::new(),
            active_camera: ActiveCamera::default(),
            animation: OrbitAnimation::new(config.orbit_rate),
            sphere_offsets,
            tracked_offset: Vector2::zeros(),
            wireframe: false,
            config,
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn pan_camera(&self) -> &PanCamera {
        &self.pan_camera
    }

    pub fn follow_camera(&self) -> &FollowCamera {
        &self.follow_camera
    }

    pub fn active_camera(&self) -> ActiveCamera {
        self.active_camera
    }

    pub fn set_active_camera(&mut self, camera: ActiveCamera) {
        self.active_camera = camera;
        self.sync_follow_camera();
    }

    pub fn animation(&self) -> &OrbitAnimation {
        &self.animation
    }

    pub fn wireframe(&self) -> bool {
        self.wireframe
    }

    pub fn tracked_offset(&self) -> Vector2<f64> {
        self.tracked_offset
    }

    /// Random X offset drawn for each sphere at setup
    pub fn sphere_offsets(&self) -> &[f32] {
        &self.sphere_offsets
    }

    /// Keep the projection's aspect ratio in sync with the viewport
    pub fn resize(&mut self, width: u32, height: u32) {
        self.config.projection.resize(width, height);
    }

    /// World position of sphere `index`; index 0 is the tracked sphere
    pub fn sphere_translation(&self, index: usize) -> Vector3<f32> {
        let c = &self.config;
        let (x, z) = if index == 0 {
            (self.tracked_offset.x as f32, self.tracked_offset.y as f32)
        } else {
            let row = c.field_extent / c.sphere_count as f32;
            (
                -c.field_extent / 2.0 + c.field_margin + self.sphere_offsets[index],
                -c.field_extent / 2.0 + (index as f32 + 0.5) * row,
            )
        };
        Vector3::new(x, c.sphere_height, z + c.field_depth_offset)
    }

    /// Apply one tick of input, then advance the animation by `dt` seconds
    pub fn update<I: InputState + ?Sized>(&mut self, dt: f64, input: &I) {
        if input.is_active(Action::ToggleCamera) {
            self.active_camera = self.active_camera.toggled();
            log::debug!("switched to {:?} camera", self.active_camera);
        }
        if input.is_active(Action::ToggleAnimation) {
            self.animation.enabled = !self.animation.enabled;
        }
        if input.is_active(Action::ToggleWireframe) {
            self.wireframe = !self.wireframe;
        }

        let step = self.config.tracked_step;
        if input.is_active(Action::MoveRight) {
            self.tracked_offset.x += step;
        }
        if input.is_active(Action::MoveForward) {
            self.tracked_offset.y -= step;
        }
        if input.is_active(Action::MoveBackward) {
            self.tracked_offset.y += step;
        }
        if input.is_active(Action::MoveLeft) {
            self.tracked_offset.x -= step;
        }

        match self.active_camera {
            ActiveCamera::Pan => self.update_pan_camera(input),
            ActiveCamera::Follow => self.update_follow_camera(input),
        }
        self.sync_follow_camera();

        self.animation.advance(dt);
    }

    fn update_pan_camera<I: InputState + ?Sized>(&mut self, input: &I) {
        let step = self.config.camera_step;
        let camera = &mut self.pan_camera;
        if input.is_active(Action::PanForward) {
            camera.move_forward(step);
        }
        if input.is_active(Action::PanBackward) {
            camera.move_backward(step);
        }
        if input.is_active(Action::PanLeft) {
            camera.strafe_left(step);
        }
        if input.is_active(Action::PanRight) {
            camera.strafe_right(step);
        }
        if input.is_active(Action::CameraUp) {
            camera.raise(step);
        }
        if input.is_active(Action::CameraDown) {
            camera.lower(step);
        }
    }

    /// The follow camera's ground is pinned to the tracked sphere, so panning changes distance
    fn update_follow_camera<I: InputState + ?Sized>(&mut self, input: &I) {
        let step = self.config.camera_step;
        let camera = &mut self.follow_camera;
        if input.is_active(Action::RotateLeft) {
            camera.rotate_left();
        }
        if input.is_active(Action::RotateRight) {
            camera.rotate_right();
        }
        if input.is_active(Action::CameraUp) {
            camera.increase_height();
        }
        if input.is_active(Action::CameraDown) {
            camera.decrease_height();
        }
        if input.is_active(Action::PanForward) {
            camera.set_view_distance(camera.view_distance() - step);
        }
        if input.is_active(Action::PanBackward) {
            camera.set_view_distance(camera.view_distance() + step);
        }
    }

    fn sync_follow_camera(&mut self) {
        if self.active_camera == ActiveCamera::Follow {
            let tracked = self.sphere_translation(0);
            self.follow_camera
                .set_ground_position(Vector2::new(f64::from(tracked.x), f64::from(tracked.z)));
        }
    }

    fn active_view(&self) -> &dyn ViewCamera {
        match self.active_camera {
            ActiveCamera::Pan => &self.pan_camera,
            ActiveCamera::Follow => &self.follow_camera,
        }
    }

    /// Transforms and uniforms for the current state.
    ///
    /// A singular model matrix fails the whole frame.
    pub fn frame(&self) -> Result<Frame> {
        let camera = self.active_view();
        let c = &self.config;

        let uniforms = FrameUniforms {
            view: camera.view_matrix(),
            projection: c.projection.matrix(),
            light_color: c.light_color,
            light_position: c.light_position,
            viewer_position: camera.eye(),
            shininess: c.shininess,
        };

        let unit = Vector3::repeat(1.0);
        let mut draws = Vec::with_capacity(c.sphere_count + 4);
        for index in 0..c.sphere_count {
            let model = Transform::model_matrix(
                &self.sphere_translation(index),
                &RotationState::zero(),
                &unit,
            );
            draws.push(DrawItem::new(MeshSlot::Sphere, model)?);
        }

        let angle = self.animation.angle();
        draws.push(DrawItem::new(
            MeshSlot::Orbiter,
            orbiter_model(angle, c.orbit_radius, c.orbit_height, c.orbiter_scale),
        )?);
        draws.push(DrawItem::new(MeshSlot::Table, Matrix4::identity())?);
        draws.push(DrawItem::new(
            MeshSlot::CenterCube,
            Transform::model_matrix(
                &Vector3::new(0.0, c.orbit_height, 0.0),
                &RotationState::new(0.0, angle.to_radians() as f32, 0.0),
                &unit,
            ),
        )?);
        draws.push(DrawItem::new(
            MeshSlot::SkyBox,
            Transform::model_matrix(
                &Vector3::zeros(),
                &RotationState::zero(),
                &Vector3::repeat(c.sky_box_scale),
            ),
        )?);

        Ok(Frame {
            uniforms,
            draws,
            wireframe: self.wireframe,
        })
    }
}

/// Check that a referenced file exists before setup goes any further
pub fn locate_resource(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        log::info!("found resource {}", path.display());
        Ok(path.to_path_buf())
    } else {
        Err(Error::ResourceMissing(path.to_path_buf()))
    }
}
