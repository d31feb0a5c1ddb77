/// Terminal front end: window, input and draw calls for the orb3d scene
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal,
};
use orb3d_core::gpu::TextureId;
use orb3d_core::scene::{Action, ActiveCamera, Scene, SceneDrawables, SceneMeshes};
use orb3d_core::Result;
use std::io::{stdout, Write};
use std::time::{Duration, Instant};

pub mod renderer;

pub use renderer::{AsciiRenderer, MeshId};

/// Terminal cells are about twice as tall as they are wide
const CELL_ASPECT: u32 = 2;

/// Logical action bound to a key, if any
pub fn action_for_key(code: KeyCode) -> Option<Action> {
    let action = match code {
        KeyCode::Char('w') => Action::MoveForward,
        KeyCode::Char('s') => Action::MoveBackward,
        KeyCode::Char('a') => Action::MoveLeft,
        KeyCode::Char('d') => Action::MoveRight,
        KeyCode::Up => Action::PanForward,
        KeyCode::Down => Action::PanBackward,
        KeyCode::Left => Action::PanLeft,
        KeyCode::Right => Action::PanRight,
        KeyCode::Char('r') | KeyCode::PageUp => Action::CameraUp,
        KeyCode::Char('f') | KeyCode::PageDown => Action::CameraDown,
        KeyCode::Char('j') => Action::RotateLeft,
        KeyCode::Char('l') => Action::RotateRight,
        KeyCode::Char('c') => Action::ToggleCamera,
        KeyCode::Char('p') => Action::ToggleAnimation,
        KeyCode::Char('x') => Action::ToggleWireframe,
        _ => return None,
    };
    Some(action)
}

/// Main application struct for terminal scene rendering
pub struct TerminalApp {
    scene: Scene,
    drawables: SceneDrawables<MeshId>,
    renderer: AsciiRenderer,
    running: bool,
    target_fps: u32,
    last_tick: Instant,
    last_fps_sample: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(
        mut scene: Scene,
        meshes: &SceneMeshes,
        orbiter_texture: Option<TextureId>,
        target_fps: u32,
    ) -> Result<Self> {
        let (width, height) = terminal::size()?;
        scene.resize(u32::from(width), u32::from(height) * CELL_ASPECT);

        let mut renderer = AsciiRenderer::new(width as usize, height as usize);
        let drawables = SceneDrawables::upload(&mut renderer, meshes, orbiter_texture, None)?;

        let now = Instant::now();
        Ok(Self {
            scene,
            drawables,
            renderer,
            running: true,
            target_fps: target_fps.max(1),
            last_tick: now,
            last_fps_sample: now,
            frame_count: 0,
            fps: 0.0,
        })
    }

    /// Run until the user quits, then release every uploaded mesh
    pub fn run(mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        self.drawables.release(&mut self.renderer);
        result
    }

    fn main_loop(&mut self) -> Result<()> {
        let target_frame_time = Duration::from_millis(1000 / u64::from(self.target_fps));

        while self.running {
            let frame_start = Instant::now();

            let actions = self.poll_actions()?;
            let dt = frame_start.duration_since(self.last_tick).as_secs_f64();
            self.last_tick = frame_start;
            self.scene.update(dt, &actions[..]);

            self.render()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            let now = Instant::now();
            if (now - self.last_fps_sample).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_fps_sample).as_secs_f32();
                self.frame_count = 0;
                self.last_fps_sample = now;
            }
        }

        Ok(())
    }

    /// Drain pending terminal events into this tick's active actions
    fn poll_actions(&mut self) -> Result<Vec<Action>> {
        let mut actions = Vec::new();
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(KeyEvent {
                    code,
                    kind: KeyEventKind::Press | KeyEventKind::Repeat,
                    ..
                }) => match code {
                    KeyCode::Char('q') | KeyCode::Esc => self.running = false,
                    code => actions.extend(action_for_key(code)),
                },
                Event::Resize(width, height) => {
                    self.renderer.resize(width as usize, height as usize);
                    self.scene
                        .resize(u32::from(width), u32::from(height) * CELL_ASPECT);
                }
                _ => {}
            }
        }
        Ok(actions)
    }

    fn render(&mut self) -> Result<()> {
        let frame = self.scene.frame()?;

        self.renderer.clear();
        for item in &frame.draws {
            self.renderer.render(
                self.drawables.get(item.mesh),
                item,
                &frame.uniforms,
                frame.wireframe,
            );
        }

        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;
        self.renderer.draw(&mut stdout)?;

        // UI overlay
        let camera = match self.scene.active_camera() {
            ActiveCamera::Pan => "pan",
            ActiveCamera::Follow => "follow",
        };
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "orb3d | FPS: {:.1} | {camera} camera | WASD=Ball Arrows=Pan R/F=Up/Down J/L=Turn C=Camera P=Pause X=Wire Q=Quit",
                self.fps
            )),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}
