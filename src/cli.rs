use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use whitted::session::Backend;

/// Custom enum for log levels that can be used with clap's ValueEnum
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Evaluator selection on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// Recursive evaluation on the CPU
    Direct,
    /// Unrolled shader, compiled in the background
    Compiled,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Direct => Backend::Direct,
            BackendArg::Compiled => Backend::Compiled,
        }
    }
}

/// Command line arguments structure using clap derive macros
#[derive(Parser)]
#[command(name = "whitted")]
#[command(about = "A Whitted ray tracer with a recursion-unrolling shader backend")]
pub struct Args {
    /// Scene description (JSON)
    #[arg(short, long, default_value = "scenes/default.json")]
    pub scene: PathBuf,

    /// Set the logging level (defaults to "info")
    #[arg(long, default_value = "info", help = "Set the logging level")]
    pub debug_level: LogLevel,

    /// Image width in pixels
    #[arg(long, default_value = "800")]
    pub width: u32,

    /// Image height in pixels
    #[arg(long, default_value = "600")]
    pub height: u32,

    /// Override the scene's reflection depth (at least 1)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_depth: Option<u32>,

    /// Block edge for reduced-quality rendering; 1 traces every pixel
    #[arg(long, short = 'q', default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub quality: u32,

    /// Evaluator feeding the display
    #[arg(long, value_enum, default_value = "direct")]
    pub backend: BackendArg,

    /// Write the generated shader source to this path
    #[arg(long)]
    pub emit_shader: Option<PathBuf>,

    /// Use the loop evaluator instead of recursion
    #[arg(long)]
    pub iterative: bool,

    /// Output file path (.png for 8-bit clamped, .exr for HDR linear)
    #[arg(short, long, default_value = "output.png")]
    pub output: PathBuf,
}
