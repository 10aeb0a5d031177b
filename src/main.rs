use std::process::exit;

use clap::Parser;
use log::{error, info, warn};

use whitted::loader::load_scene;
use whitted::render::RenderSettings;
use whitted::session::{Backend, Display, Session};
use whitted::shader::NagaCompiler;

mod cli;
mod logger;
mod output;

use cli::Args;
use logger::init_logger;
use output::{save_frame, OutputFormat};

fn main() {
    let args = Args::parse();

    init_logger(args.debug_level.clone().into());

    info!("Whitted - Git Version {} ({})", env!("GIT_HASH"), env!("GIT_DATE"));

    let Some(format) = OutputFormat::from_path(&args.output) else {
        error!(
            "Unsupported file extension '{}'. Only .png and .exr formats are supported.",
            args.output.extension().unwrap_or_default().to_string_lossy()
        );
        exit(2);
    };

    let scene = match load_scene(&args.scene) {
        Ok(scene) => scene,
        Err(e) => {
            error!("Failed to load scene {}: {}", args.scene.display(), e);
            exit(1);
        }
    };
    let scene = match args.max_depth {
        Some(depth) => scene.with_max_depth(depth),
        None => scene,
    };
    info!(
        "Scene '{}': {} primitives, {} lights, {} materials, max depth {}",
        scene.name,
        scene.primitives.len(),
        scene.lights.len(),
        scene.materials.len(),
        scene.max_depth
    );

    let settings = RenderSettings {
        width: args.width,
        height: args.height,
        block_size: args.quality,
        show_progress: true,
        iterative: args.iterative,
    };

    let mut session = match Session::new(scene, NagaCompiler, settings) {
        Ok(session) => session,
        Err(e) => {
            error!("Shader generation failed: {}", e);
            exit(1);
        }
    };

    if let Some(path) = &args.emit_shader {
        match std::fs::write(path, session.generated_source()) {
            Ok(_) => info!("Generated shader written to {}", path.display()),
            Err(e) => warn!("Failed to write shader to {}: {}", path.display(), e),
        }
    }

    let backend = Backend::from(args.backend);
    session.set_backend(backend);
    let compile = (backend == Backend::Compiled || args.emit_shader.is_some()).then(|| session.request_compile());

    let Some(frame) = session.render_blocking() else {
        error!("Render was superseded before it completed");
        exit(1);
    };

    if let Some(handle) = compile {
        if handle.join().is_err() {
            error!("Shader compile thread panicked");
        }
        match session.display() {
            Display::Program(program) => info!(
                "Compiled program ready: {} functions, entry point present: {}",
                program.function_count(),
                program.has_entry_point()
            ),
            Display::Fallback(_) => warn!("Compiled backend unavailable, keeping the direct render"),
            Display::Compiling | Display::Frame(_) => {}
        }
    }

    save_frame(&frame, &args.output, format);
}
