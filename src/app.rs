use std::sync::Arc;
use std::time::Instant;

use glam::Vec2;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::KeyCode;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::config::AppConfig;
use crate::globe::Globe;
use crate::gpu::{GpuContext, GpuError};
use crate::input::Input;
use crate::loader::ThreadedTextureLoader;
use crate::orbit_camera::OrbitControls;
use crate::renderer::SceneRenderer;
use crate::scene::Flow;

/// Errors that stop the app before or while it runs.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create the window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// Open the window and run the globe until it is closed.
///
/// Keys: `E` plays the explore transition, `C` the create transition and
/// `Escape` quits. Dragging with any mouse button recolors the globe; the
/// left button also orbits the camera.
pub fn run(config: AppConfig) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = TerrasphereApp::Pending { config };
    event_loop.run_app(&mut app)?;
    match app {
        TerrasphereApp::Failed(e) => Err(e),
        _ => Ok(()),
    }
}

enum TerrasphereApp {
    Pending {
        config: AppConfig,
    },
    Running {
        window: Arc<Window>,
        gpu: GpuContext,
        renderer: SceneRenderer,
        globe: Globe<ThreadedTextureLoader>,
        orbit: OrbitControls,
        input: Input,
        start_time: Instant,
        last_frame: Instant,
    },
    /// Startup failed; the error is returned from [`run`].
    Failed(AppError),
}

impl ApplicationHandler for TerrasphereApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let TerrasphereApp::Pending { config } = self else {
            return;
        };

        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));

        let started = event_loop
            .create_window(window_attrs)
            .map_err(AppError::from)
            .and_then(|window| {
                let window = Arc::new(window);
                let gpu = GpuContext::new(window.clone())?;
                Ok((window, gpu))
            });
        let (window, gpu) = match started {
            Ok(started) => started,
            Err(e) => {
                *self = TerrasphereApp::Failed(e);
                event_loop.exit();
                return;
            }
        };

        let renderer = SceneRenderer::new(&gpu);
        let mut orbit = OrbitControls::new().damping(config.damping);
        if config.auto_rotate_speed != 0.0 {
            orbit = orbit.auto_rotate(config.auto_rotate_speed);
        }
        let globe = Globe::new(
            config.clone(),
            ThreadedTextureLoader::new(),
            gpu.width(),
            gpu.height(),
        );
        log::info!("Press E to explore, C to create, Escape to quit");

        window.request_redraw();
        *self = TerrasphereApp::Running {
            window,
            gpu,
            renderer,
            globe,
            orbit,
            input: Input::new(),
            start_time: Instant::now(),
            last_frame: Instant::now(),
        };
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let TerrasphereApp::Running {
            window,
            gpu,
            renderer,
            globe,
            orbit,
            input,
            start_time,
            last_frame,
        } = self
        else {
            return;
        };

        input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                gpu.resize(size.width, size.height);
                globe.resize(size.width, size.height);
            }
            WindowEvent::MouseInput { state, .. } => match state {
                ElementState::Pressed => globe.pointer_down(),
                ElementState::Released if !input.any_mouse_down() => globe.pointer_up(),
                ElementState::Released => {}
            },
            WindowEvent::Focused(false) => globe.pointer_up(),
            WindowEvent::CursorMoved { position, .. } => {
                globe.pointer_moved(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let time = start_time.elapsed().as_secs_f32();
                let dt = now.duration_since(*last_frame).as_secs_f32();
                *last_frame = now;

                if input.key_pressed(KeyCode::Escape) {
                    event_loop.exit();
                    return;
                }
                if input.key_pressed(KeyCode::KeyE) {
                    globe.trigger(Flow::Explore);
                }
                if input.key_pressed(KeyCode::KeyC) {
                    globe.trigger(Flow::Create);
                }

                orbit.update(
                    globe.camera_mut(),
                    input,
                    dt,
                    gpu.height() as f32,
                );
                globe.update(time);

                match renderer.render(gpu, globe.scene()) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        gpu.reconfigure();
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("GPU out of memory, exiting");
                        event_loop.exit();
                        return;
                    }
                    Err(e) => log::warn!("Skipping frame: {}", e),
                }

                input.begin_frame();
                window.request_redraw();
            }
            _ => {}
        }
    }
}
