/// Example: Load an OBJ file, print its indexed-mesh statistics and orbit it in the terminal
///
/// Usage: cargo run --example inspect_obj -- path/to/file.obj [--flat]
use std::env;
use std::path::Path;

use orb3d_core::geometry::WHITE;
use orb3d_core::obj;
use orb3d_core::scene::{Scene, SceneConfig, SceneMeshes};
use orb3d_core::ObjOptions;
use orb3d_terminal::TerminalApp;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1) else {
        eprintln!("Usage: {} <obj-file> [--flat]", args[0]);
        return Ok(());
    };
    let options = if args.iter().any(|a| a == "--flat") {
        ObjOptions::BASIC
    } else {
        ObjOptions::TEXTURED
    };

    let mesh = obj::load_obj_file(Path::new(path), options, options.vertex_layout(), WHITE)?;
    println!(
        "{}: {} unique vertices, {} triangles, stride {}",
        path,
        mesh.vertex_count(),
        mesh.triangle_count(),
        mesh.stride()
    );

    let config = SceneConfig::default();
    let meshes = SceneMeshes::build(&config, mesh);

    println!("Starting terminal renderer (press Q to quit)...");
    std::thread::sleep(std::time::Duration::from_secs(1));

    TerminalApp::new(Scene::new(config), &meshes, None, 30)?.run()?;
    Ok(())
}
