use std::time::Instant;

use thiserror::Error;

use crate::backend::{BackendError, MaterialHandle, RenderBackend, Viewport};
use crate::catalog::ShaderCatalog;
use crate::query::{LaunchParams, RunMode};
use crate::readiness::ReadinessFlag;
use crate::registry::{ResizeContext, UpdateContext};
use crate::uniforms::UniformMap;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unknown shader \"{0}\"")]
    UnknownShader(String),

    #[error("shader catalog is empty")]
    EmptyCatalog,

    #[error("render application has been disposed")]
    Disposed,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Lifecycle of the render application.
#[derive(Debug)]
enum AppState {
    Uninitialized,
    Active(ActiveShader),
    Disposed,
}

/// Resources owned by the shader currently on screen.
#[derive(Debug)]
struct ActiveShader {
    index: usize,
    material: MaterialHandle,
    uniforms: UniformMap,
}

/// Monotonic clock started on the first activation.
#[derive(Debug, Clone, Copy)]
struct FrameClock {
    start: Instant,
    last: Instant,
}

impl FrameClock {
    fn elapsed(&self, now: Instant) -> f32 {
        now.saturating_duration_since(self.start).as_secs_f32()
    }
}

/// Owns the drawing surface, the active shader and the animation clock.
///
/// At most one material is alive at any time: switching shaders releases
/// the previous material before the next one is created.
pub struct RenderApp<B: RenderBackend> {
    backend: B,
    catalog: ShaderCatalog,
    mode: RunMode,
    viewport: Viewport,
    state: AppState,
    clock: Option<FrameClock>,
    readiness: ReadinessFlag,
}

impl<B: RenderBackend> RenderApp<B> {
    /// Create the application without activating a shader.
    ///
    /// In capture mode `host_viewport` is ignored in favour of the fixed
    /// square requested by the URL.
    pub fn new(mut backend: B, catalog: ShaderCatalog, mode: RunMode, host_viewport: Viewport) -> Self {
        let viewport = match mode {
            RunMode::Thumbnail { size } => Viewport::square(size),
            RunMode::Interactive => host_viewport,
        };
        backend.set_viewport(viewport);
        let readiness = ReadinessFlag::new();
        if mode.is_capture() {
            backend.publish_readiness(readiness.state());
        }
        Self {
            backend,
            catalog,
            mode,
            viewport,
            state: AppState::Uninitialized,
            clock: None,
            readiness,
        }
    }

    /// Construct from URL launch parameters and activate the initial shader.
    pub fn launch(
        backend: B,
        catalog: ShaderCatalog,
        params: &LaunchParams,
        host_viewport: Viewport,
        now: Instant,
    ) -> Result<Self, AppError> {
        let initial = params
            .initial_shader(&catalog)
            .map(|definition| definition.id().to_string())
            .ok_or(AppError::EmptyCatalog)?;
        let mut app = Self::new(backend, catalog, params.mode, host_viewport);
        app.activate(&initial, now)?;
        Ok(app)
    }

    /// Make `id` the active shader. Returns `false` if it already was.
    pub fn activate(&mut self, id: &str, now: Instant) -> Result<bool, AppError> {
        if matches!(self.state, AppState::Disposed) {
            return Err(AppError::Disposed);
        }
        let index = self
            .catalog
            .position(id)
            .ok_or_else(|| AppError::UnknownShader(id.to_string()))?;
        if let AppState::Active(active) = &self.state {
            if active.index == index {
                return Ok(false);
            }
        }

        if let AppState::Active(previous) =
            std::mem::replace(&mut self.state, AppState::Uninitialized)
        {
            self.backend.release_material(previous.material);
        }

        let clock = *self.clock.get_or_insert(FrameClock {
            start: now,
            last: now,
        });
        let definition = &self.catalog.as_slice()[index];
        let program = definition.entry().program;
        let mut uniforms = program.create_uniforms();

        if let Some(hook) = program.resizable() {
            hook.on_resize(&mut ResizeContext {
                uniforms: &mut uniforms,
                size: self.viewport,
            });
        }
        if let Some(hook) = program.updatable() {
            hook.update(&mut UpdateContext {
                uniforms: &mut uniforms,
                elapsed_time: clock.elapsed(now),
                delta_time: 0.0,
                renderer: &self.backend,
            });
        }

        let material = self.backend.create_material(definition, &uniforms)?;
        tracing::info!(shader = id, "activated shader");
        self.state = AppState::Active(ActiveShader {
            index,
            material,
            uniforms,
        });
        Ok(true)
    }

    /// Advance one animation frame: run the update hook and draw once.
    pub fn tick(&mut self, now: Instant) -> Result<(), AppError> {
        let active = match &mut self.state {
            AppState::Active(active) => active,
            AppState::Uninitialized => return Ok(()),
            AppState::Disposed => return Err(AppError::Disposed),
        };
        let clock = self.clock.get_or_insert(FrameClock {
            start: now,
            last: now,
        });
        let delta_time = now.saturating_duration_since(clock.last).as_secs_f32();
        let elapsed_time = clock.elapsed(now);
        clock.last = now;

        let program = self.catalog.as_slice()[active.index].entry().program;
        if let Some(hook) = program.updatable() {
            hook.update(&mut UpdateContext {
                uniforms: &mut active.uniforms,
                elapsed_time,
                delta_time,
                renderer: &self.backend,
            });
        }
        self.backend.draw(active.material, &active.uniforms)?;

        if self.mode.is_capture() && self.readiness.mark_ready() {
            self.backend.publish_readiness(self.readiness.state());
            tracing::info!(
                shader = self.catalog.as_slice()[active.index].id(),
                "first capture frame rendered"
            );
        }
        Ok(())
    }

    /// Apply a host viewport change. Ignored in capture mode.
    pub fn resize(&mut self, size: Viewport) -> bool {
        if self.mode.is_capture() || matches!(self.state, AppState::Disposed) {
            return false;
        }
        self.viewport = size;
        self.backend.set_viewport(size);
        if let AppState::Active(active) = &mut self.state {
            let program = self.catalog.as_slice()[active.index].entry().program;
            if let Some(hook) = program.resizable() {
                hook.on_resize(&mut ResizeContext {
                    uniforms: &mut active.uniforms,
                    size,
                });
            }
        }
        true
    }

    /// Release the active material and stop accepting work.
    pub fn dispose(&mut self) {
        if let AppState::Active(active) = std::mem::replace(&mut self.state, AppState::Disposed) {
            self.backend.release_material(active.material);
        }
    }

    pub fn active_id(&self) -> Option<&str> {
        match &self.state {
            AppState::Active(active) => self.catalog.get(active.index).map(|d| d.id()),
            _ => None,
        }
    }

    pub fn uniforms(&self) -> Option<&UniformMap> {
        match &self.state {
            AppState::Active(active) => Some(&active.uniforms),
            _ => None,
        }
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self.state, AppState::Disposed)
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn readiness(&self) -> &ReadinessFlag {
        &self.readiness
    }

    pub fn catalog(&self) -> &ShaderCatalog {
        &self.catalog
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: RenderBackend> Drop for RenderApp<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backend::HeadlessBackend;
    use crate::readiness::Readiness;

    fn interactive() -> RenderApp<HeadlessBackend> {
        RenderApp::new(
            HeadlessBackend::new(),
            ShaderCatalog::builtin().unwrap(),
            RunMode::Interactive,
            Viewport::new(1280, 720),
        )
    }

    #[test]
    fn activation_seeds_uniforms_before_first_paint() {
        let mut app = interactive();
        let t0 = Instant::now();
        assert!(app.activate("gradation", t0).unwrap());

        let uniforms = app.uniforms().unwrap();
        assert_eq!(uniforms.vec2("u_resolution"), Some([1280.0, 720.0]));
        assert_eq!(uniforms.float("u_time"), Some(0.0));
        assert_eq!(app.backend().draws(), 0);
    }

    #[test]
    fn reactivating_same_shader_is_a_no_op() {
        let mut app = interactive();
        let t0 = Instant::now();
        app.activate("gradation", t0).unwrap();
        assert!(!app.activate("gradation", t0).unwrap());
        assert_eq!(app.backend().created(), 1);
    }

    #[test]
    fn tick_reports_elapsed_time_from_first_activation() {
        let mut app = interactive();
        let t0 = Instant::now();
        app.activate("gradation", t0).unwrap();
        app.tick(t0 + Duration::from_millis(500)).unwrap();
        app.tick(t0 + Duration::from_millis(1500)).unwrap();

        let time = app.backend().last_uniforms().unwrap().float("u_time").unwrap();
        assert!((time - 1.5).abs() < 1e-4);
        assert_eq!(app.backend().draws(), 2);
    }

    #[test]
    fn unknown_shader_is_rejected() {
        let mut app = interactive();
        let err = app.activate("missing", Instant::now()).unwrap_err();
        assert!(matches!(err, AppError::UnknownShader(id) if id == "missing"));
    }

    #[test]
    fn resize_updates_resolution_in_interactive_mode() {
        let mut app = interactive();
        app.activate("gradation", Instant::now()).unwrap();
        assert!(app.resize(Viewport::new(300, 200)));
        assert_eq!(app.uniforms().unwrap().vec2("u_resolution"), Some([300.0, 200.0]));
        assert_eq!(app.backend().viewport(), Some(Viewport::new(300, 200)));
    }

    #[test]
    fn capture_mode_fixes_viewport_and_marks_ready_after_first_frame() {
        let params = LaunchParams::from_query("mode=thumbnail&shader=gradation&size=256");
        let t0 = Instant::now();
        let mut app = RenderApp::launch(
            HeadlessBackend::new(),
            ShaderCatalog::builtin().unwrap(),
            &params,
            Viewport::new(1920, 1080),
            t0,
        )
        .unwrap();

        assert_eq!(app.viewport(), Viewport::square(256));
        assert!(!app.resize(Viewport::new(100, 100)));
        assert_eq!(app.viewport(), Viewport::square(256));
        assert!(!app.readiness().is_ready());
        assert_eq!(app.backend().published_readiness(), &[Readiness::Pending]);
        assert_eq!(
            app.backend().body_attribute(),
            Some(("data-thumbnail-ready", "pending"))
        );

        for frame in 1..=4 {
            app.tick(t0 + Duration::from_millis(16 * frame)).unwrap();
            assert!(app.readiness().is_ready());
        }
        assert_eq!(
            app.backend().published_readiness(),
            &[Readiness::Pending, Readiness::Ready]
        );
        assert_eq!(
            app.backend().body_attribute(),
            Some(("data-thumbnail-ready", "ready"))
        );
    }

    #[test]
    fn interactive_mode_never_publishes_readiness() {
        let mut app = interactive();
        let t0 = Instant::now();
        app.activate("gradation", t0).unwrap();
        app.tick(t0).unwrap();
        assert!(!app.readiness().is_ready());
        assert!(app.backend().published_readiness().is_empty());
    }

    #[test]
    fn dispose_releases_material_and_blocks_ticks() {
        let mut app = interactive();
        app.activate("gradation", Instant::now()).unwrap();
        app.dispose();
        assert_eq!(app.backend().live_materials(), 0);
        assert!(matches!(app.tick(Instant::now()), Err(AppError::Disposed)));
        assert!(matches!(
            app.activate("gradation", Instant::now()),
            Err(AppError::Disposed)
        ));
    }
}
