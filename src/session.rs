//! Frame and shader lifecycle shared by the display layer and the workers.
//!
//! Renders and compiles run on background threads and hand their results
//! back through two slots:
//!
//! - [`FrameSlot`] swaps a finished frame in as a whole. A frame whose render
//!   was superseded by a newer request is dropped.
//! - [`ShaderSlot`] keeps at most one compile in flight and always exposes a
//!   complete program, or none.
//!
//! [`Session`] owns the scene snapshot and the camera, and decides what the
//! display should show for the selected [`Backend`].

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use crate::camera::Camera;
use crate::loader::{load_scene, SceneError};
use crate::render::{render, Frame, RenderSettings};
use crate::scene::Scene;
use crate::shader::{build_shader_source, FrameUniforms, ShaderCompiler};
use crate::transpile::TranspileError;

/// Latest completed frame plus the generation counter of render requests.
#[derive(Debug, Default)]
pub struct FrameSlot {
    frame: RwLock<Option<Arc<Frame>>>,
    generation: AtomicU64,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the generation for a new render request.
    pub fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Swaps `frame` in unless a newer render began after `generation`.
    pub fn publish(&self, generation: u64, frame: Frame) -> bool {
        let mut slot = self.frame.write();
        if self.generation.load(Ordering::Acquire) != generation {
            debug!("Dropping superseded frame {}", generation);
            return false;
        }
        *slot = Some(Arc::new(frame));
        true
    }

    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.frame.read().clone()
    }
}

/// Compile state of the restricted backend.
///
/// Programs carry the source generation they were built from, so a program
/// for a replaced scene is never taken for the current one.
#[derive(Debug)]
pub enum ShaderState<P> {
    Idle,
    Compiling { generation: u64, previous: Option<Arc<P>> },
    Ready { generation: u64, program: Arc<P> },
    Failed { diagnostic: String, previous: Option<Arc<P>> },
}

impl<P> ShaderState<P> {
    /// Last program that compiled, if any, whatever its generation.
    pub fn program(&self) -> Option<Arc<P>> {
        match self {
            ShaderState::Idle => None,
            ShaderState::Ready { program, .. } => Some(Arc::clone(program)),
            ShaderState::Compiling { previous, .. } | ShaderState::Failed { previous, .. } => previous.clone(),
        }
    }

    /// Program built from source `generation`.
    pub fn current(&self, generation: u64) -> Option<Arc<P>> {
        match self {
            ShaderState::Ready { generation: built, program } if *built == generation => Some(Arc::clone(program)),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct CompileRequest {
    source: Arc<String>,
    generation: u64,
}

/// Single-flight compile gate around the current [`ShaderState`].
///
/// A request arriving while a compile holds the gate is parked in `pending`,
/// replacing any older parked request, and the gate holder compiles it next.
pub struct ShaderSlot<P> {
    gate: Mutex<()>,
    pending: Mutex<Option<CompileRequest>>,
    state: RwLock<ShaderState<P>>,
}

impl<P> Default for ShaderSlot<P> {
    fn default() -> Self {
        Self {
            gate: Mutex::new(()),
            pending: Mutex::new(None),
            state: RwLock::new(ShaderState::Idle),
        }
    }
}

impl<P: Send + Sync + 'static> ShaderSlot<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles `source` on a background thread.
    ///
    /// The handle yields `false` when the request was handed to the compile
    /// already in flight.
    pub fn request<C>(self: &Arc<Self>, compiler: Arc<C>, source: Arc<String>, generation: u64) -> JoinHandle<bool>
    where
        C: ShaderCompiler<Program = P>,
    {
        let slot = Arc::clone(self);
        thread::spawn(move || slot.compile_now(compiler.as_ref(), source, generation))
    }

    /// Compiles on the calling thread, then drains requests parked meanwhile.
    /// Returns `false` if a compile was already in flight; that compile picks
    /// the request up when it finishes.
    pub fn compile_now<C>(&self, compiler: &C, source: Arc<String>, generation: u64) -> bool
    where
        C: ShaderCompiler<Program = P>,
    {
        *self.pending.lock() = Some(CompileRequest { source, generation });
        let mut compiled = false;
        loop {
            {
                let Some(_gate) = self.gate.try_lock() else {
                    debug!("Shader compile in flight, generation {} queued", generation);
                    return compiled;
                };
                loop {
                    let next = self.pending.lock().take();
                    let Some(request) = next else { break };
                    self.compile_one(compiler, &request);
                    compiled = true;
                }
            }
            // a request parked between the drain and the gate release
            if self.pending.lock().is_none() {
                return compiled;
            }
        }
    }

    fn compile_one<C>(&self, compiler: &C, request: &CompileRequest)
    where
        C: ShaderCompiler<Program = P>,
    {
        {
            let mut state = self.state.write();
            let previous = state.program();
            *state = ShaderState::Compiling {
                generation: request.generation,
                previous,
            };
        }

        let start = Instant::now();
        let result = compiler.compile(&request.source);
        let elapsed = start.elapsed();

        let mut state = self.state.write();
        match result {
            Ok(program) => {
                info!("Shader generation {} ready after {:.2?}", request.generation, elapsed);
                *state = ShaderState::Ready {
                    generation: request.generation,
                    program: Arc::new(program),
                };
            }
            Err(err) => {
                warn!("{}", err);
                let previous = state.program();
                *state = ShaderState::Failed {
                    diagnostic: err.diagnostic,
                    previous,
                };
            }
        }
    }

    pub fn program(&self) -> Option<Arc<P>> {
        self.state.read().program()
    }

    pub fn current(&self, generation: u64) -> Option<Arc<P>> {
        self.state.read().current(generation)
    }

    pub fn is_compiling(&self) -> bool {
        matches!(*self.state.read(), ShaderState::Compiling { .. })
    }

    /// Whether source `generation` is compiling or queued.
    pub fn is_compiling_for(&self, generation: u64) -> bool {
        let queued = self.pending.lock().as_ref().is_some_and(|r| r.generation == generation);
        queued || matches!(*self.state.read(), ShaderState::Compiling { generation: g, .. } if g == generation)
    }

    /// Diagnostic of the last failed compile.
    pub fn diagnostic(&self) -> Option<String> {
        match &*self.state.read() {
            ShaderState::Failed { diagnostic, .. } => Some(diagnostic.clone()),
            _ => None,
        }
    }
}

/// Which evaluator feeds the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Direct,
    Compiled,
}

/// What the display layer should present.
#[derive(Debug)]
pub enum Display<P> {
    /// Frame from the direct backend.
    Frame(Arc<Frame>),
    /// Complete compiled program for the current scene, or the previous
    /// program while the current one compiles.
    Program(Arc<P>),
    /// Compile in flight and nothing older to show.
    Compiling,
    /// Compiled backend unavailable; latest direct frame, if any.
    Fallback(Option<Arc<Frame>>),
}

/// Failure to swap in a new scene.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("shader generation failed: {0}")]
    Transpile(#[from] TranspileError),
}

/// Scene snapshot, camera and both backends.
pub struct Session<C: ShaderCompiler> {
    scene: Arc<Scene>,
    camera: Camera,
    settings: RenderSettings,
    backend: Backend,
    source: Arc<String>,
    generation: u64,
    compiler: Arc<C>,
    frames: Arc<FrameSlot>,
    shader: Arc<ShaderSlot<C::Program>>,
    render_lock: Arc<Mutex<()>>,
}

impl<C: ShaderCompiler> Session<C> {
    /// Generates the shader source up front; a grammar error in the shading
    /// template is fatal.
    pub fn new(scene: Scene, compiler: C, settings: RenderSettings) -> Result<Self, TranspileError> {
        let source = build_shader_source(&scene)?;
        Ok(Self {
            camera: scene.camera,
            scene: Arc::new(scene),
            settings,
            backend: Backend::Direct,
            source: Arc::new(source),
            generation: 0,
            compiler: Arc::new(compiler),
            frames: Arc::new(FrameSlot::new()),
            shader: Arc::new(ShaderSlot::new()),
            render_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut RenderSettings {
        &mut self.settings
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn set_backend(&mut self, backend: Backend) {
        if self.backend != backend {
            info!("Switching to {:?} backend", backend);
            self.backend = backend;
        }
    }

    /// Generated shader text for the current scene.
    pub fn generated_source(&self) -> &str {
        &self.source
    }

    /// Uniform block for the compiled backend at the current camera pose.
    pub fn uniforms(&self) -> FrameUniforms {
        FrameUniforms::new(&self.camera, self.settings.width, self.settings.height)
    }

    /// Starts a direct render in the background. The handle yields whether
    /// the frame was published.
    pub fn request_render(&self) -> JoinHandle<bool> {
        let generation = self.frames.begin();
        let scene = Arc::clone(&self.scene);
        let camera = self.camera;
        let settings = self.settings;
        let frames = Arc::clone(&self.frames);
        let render_lock = Arc::clone(&self.render_lock);
        thread::spawn(move || {
            let _serial = render_lock.lock();
            let frame = render(&scene, &camera, &settings);
            frames.publish(generation, frame)
        })
    }

    /// Renders on the calling thread and returns the published frame.
    pub fn render_blocking(&self) -> Option<Arc<Frame>> {
        let generation = self.frames.begin();
        let _serial = self.render_lock.lock();
        let frame = render(&self.scene, &self.camera, &self.settings);
        if self.frames.publish(generation, frame) {
            self.frames.latest()
        } else {
            None
        }
    }

    /// Compiles the generated source in the background.
    pub fn request_compile(&self) -> JoinHandle<bool> {
        self.shader
            .request(Arc::clone(&self.compiler), Arc::clone(&self.source), self.generation)
    }

    pub fn latest_frame(&self) -> Option<Arc<Frame>> {
        self.frames.latest()
    }

    /// Program compiled from the current scene's source.
    pub fn program(&self) -> Option<Arc<C::Program>> {
        self.shader.current(self.generation)
    }

    pub fn compile_diagnostic(&self) -> Option<String> {
        self.shader.diagnostic()
    }

    pub fn display(&self) -> Display<C::Program> {
        match self.backend {
            Backend::Direct => match self.frames.latest() {
                Some(frame) => Display::Frame(frame),
                None => Display::Fallback(None),
            },
            Backend::Compiled => {
                if let Some(program) = self.shader.current(self.generation) {
                    Display::Program(program)
                } else if self.shader.is_compiling_for(self.generation) {
                    match self.shader.program() {
                        Some(previous) => Display::Program(previous),
                        None => Display::Compiling,
                    }
                } else {
                    Display::Fallback(self.frames.latest())
                }
            }
        }
    }

    /// Swaps in `scene`, resetting the camera to its pose. The current scene
    /// stays active if shader generation fails.
    ///
    /// Programs built for the old scene stop counting as current; the compiled
    /// backend falls back until [`Session::request_compile`] builds the new
    /// source.
    pub fn replace_scene(&mut self, scene: Scene) -> Result<(), TranspileError> {
        let source = build_shader_source(&scene)?;
        info!("Scene '{}' active", scene.name);
        self.camera = scene.camera;
        self.scene = Arc::new(scene);
        self.source = Arc::new(source);
        self.generation += 1;
        Ok(())
    }

    /// Loads and swaps in the scene at `path`.
    pub fn reload(&mut self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let scene = load_scene(path)?;
        self.replace_scene(scene)?;
        Ok(())
    }
}
