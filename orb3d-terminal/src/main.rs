/// orb3d Terminal - Interactive sphere field with an orbiting mesh
///
/// Controls:
///   - WASD: Move the tracked sphere
///   - Arrow Keys: Pan the camera (follow camera: Up/Down change distance)
///   - R/F: Camera up/down, J/L: Turn the follow camera
///   - C: Switch camera, P: Pause animation, X: Wireframe
///   - Q/ESC: Quit
use std::path::PathBuf;

use clap::Parser;
use orb3d_core::gpu::TextureId;
use orb3d_core::scene::{self, Scene, SceneConfig, SceneMeshes};
use orb3d_core::ObjOptions;
use orb3d_terminal::TerminalApp;

#[derive(Debug, clap::Parser)]
#[command(version, about = "Render the orb3d scene in the terminal")]
struct Args {
    /// OBJ file for the orbiting mesh; a built-in model is used when omitted
    #[arg(long)]
    obj: Option<PathBuf>,

    /// Texture for the orbiting mesh (checked for existence only)
    #[arg(long)]
    texture: Option<PathBuf>,

    /// Seed for the sphere field layout
    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Use the basic importer: triangles only, no texture V flip
    #[arg(long)]
    flat: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let orbiter_texture = match &args.texture {
        Some(path) => {
            scene::locate_resource(path)?;
            Some(TextureId(0))
        }
        None => None,
    };

    let options = if args.flat {
        ObjOptions::BASIC
    } else {
        ObjOptions::TEXTURED
    };
    let config = SceneConfig {
        seed: args.seed,
        ..Default::default()
    };
    let meshes = SceneMeshes::load(&config, args.obj.as_deref(), options)?;

    let app = TerminalApp::new(Scene::new(config), &meshes, orbiter_texture, args.fps)?;
    app.run()?;

    println!("Thank you for using orb3d!");
    Ok(())
}
