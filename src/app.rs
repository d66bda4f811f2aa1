//! Windowed shell around a [`Session`]
//!
//! Owns the winit event loop, the wgpu [`RenderEngine`] and the imgui overlay.
//! Window events are translated into [`InputEvent`]s; loader completions wake
//! the loop through a user event so the app can sleep in `ControlFlow::Wait`.

use std::{
    sync::{Arc, Mutex},
    task::{Context, Waker},
};

use anyhow::Context as _;
use futures::task::{waker, ArcWake};
use log::{debug, error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::{
    config::ViewerConfig,
    gfx::{loader::DirectorySource, rendering::RenderEngine},
    session::{InputEvent, Session},
    ui::{InstructionPanel, UiManager},
};

/// Pixel scroll deltas are converted to lines at this rate
const PIXELS_PER_LINE: f64 = 40.0;

/// Events posted to the winit loop from outside it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// A background load finished; poll the session
    LoadProgress,
}

/// Wakes the event loop when a load future is ready to be polled again
struct LoopWaker {
    proxy: Mutex<EventLoopProxy<AppEvent>>,
}

impl ArcWake for LoopWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        let Ok(proxy) = arc_self.proxy.lock() else {
            return;
        };
        // The loop may already have exited
        let _ = proxy.send_event(AppEvent::LoadProgress);
    }
}

pub struct ViewerApp {
    event_loop: EventLoop<AppEvent>,
    state: AppState,
}

struct AppState {
    session: Session,
    waker: Waker,
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    ui_manager: Option<UiManager>,
    panel: InstructionPanel,
    cursor: (f32, f32),
    failure: Option<anyhow::Error>,
}

impl ViewerApp {
    /// Create the event loop and start loading the static mesh
    pub fn new(config: ViewerConfig) -> anyhow::Result<Self> {
        let event_loop = EventLoop::<AppEvent>::with_user_event()
            .build()
            .context("Failed to create event loop")?;

        let proxy = event_loop.create_proxy();
        let waker = waker(Arc::new(LoopWaker {
            proxy: Mutex::new(proxy),
        }));

        info!("Serving assets from {}", config.assets.origin.display());
        let source = Arc::new(DirectorySource::new(config.assets.origin.clone()));
        let session = Session::new(config, source);

        Ok(Self {
            event_loop,
            state: AppState {
                session,
                waker,
                window: None,
                render_engine: None,
                ui_manager: None,
                panel: InstructionPanel::new(),
                cursor: (0.0, 0.0),
                failure: None,
            },
        })
    }

    /// Run until the window closes
    pub fn run(self) -> anyhow::Result<()> {
        let ViewerApp {
            event_loop,
            mut state,
        } = self;

        event_loop.set_control_flow(ControlFlow::Wait);
        event_loop
            .run_app(&mut state)
            .context("Event loop terminated abnormally")?;

        match state.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl AppState {
    /// Drive outstanding loads and forward what they produced
    fn poll_session(&mut self) {
        let mut cx = Context::from_waker(&self.waker);
        let _ = self.session.poll_loads(&mut cx);

        for event in self.session.drain_events() {
            debug!("Session event: {:?}", event);
            self.panel.handle_event(&event);
        }
        self.request_redraw_if_needed();
    }

    fn handle_input(&mut self, input: InputEvent) {
        // The session records whether the input needs a redraw
        self.session.handle_input(input);
        self.poll_session();
    }

    fn request_redraw_if_needed(&mut self) {
        if self.session.take_redraw_request() {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key_code: KeyCode) {
        match key_code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::KeyR => {
                if self.session.retry_static_load() {
                    self.panel.retrying();
                    self.session.request_redraw();
                    self.poll_session();
                }
            }
            _ => {}
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(render_engine)) = (self.window.as_ref(), self.render_engine.as_mut())
        else {
            return;
        };

        let camera = &mut self.session.camera_manager_mut().camera;
        camera.update_view_proj();
        let camera_uniform = camera.uniform;

        render_engine.sync_scene(self.session.scene(), self.session.manipulator());
        render_engine.update(camera_uniform);

        let panel = &self.panel;
        let result = match self.ui_manager.as_mut() {
            Some(ui_manager) => render_engine.render_frame(Some(
                |device: &wgpu::Device,
                 queue: &wgpu::Queue,
                 encoder: &mut wgpu::CommandEncoder,
                 view: &wgpu::TextureView| {
                    ui_manager.draw(device, queue, encoder, window, view, |ui| panel.draw(ui));
                },
            )),
            None => render_engine.render_frame(
                None::<fn(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView)>,
            ),
        };

        match result {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("Surface lost, reconfiguring");
                render_engine.reconfigure();
                window.request_redraw();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("GPU out of memory");
                self.failure = Some(anyhow::anyhow!("GPU out of memory"));
                event_loop.exit();
            }
            Err(err) => warn!("Skipping frame: {}", err),
        }
    }
}

impl ApplicationHandler<AppEvent> for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match event_loop.create_window(
            WindowAttributes::default()
                .with_title("Socket Viewer")
                .with_inner_size(winit::dpi::LogicalSize::new(1200, 800)),
        ) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                error!("Failed to create window: {}", err);
                self.failure = Some(anyhow::Error::new(err).context("Failed to create window"));
                event_loop.exit();
                return;
            }
        };

        let PhysicalSize { width, height } = window.inner_size();
        let display = self.session.config().display;
        let renderer = match pollster::block_on(RenderEngine::new(window.clone(), width, height, &display)) {
            Ok(renderer) => renderer,
            Err(err) => {
                error!("Failed to initialise renderer: {:#}", err);
                self.failure = Some(err);
                event_loop.exit();
                return;
            }
        };

        let mut ui_manager = UiManager::new(
            renderer.device(),
            renderer.queue(),
            renderer.surface_format(),
            &window,
        );
        ui_manager.update_display_size(width, height);

        self.ui_manager = Some(ui_manager);
        self.render_engine = Some(renderer);
        self.window = Some(window);

        self.handle_input(InputEvent::Resized { width, height });
        self.session.request_redraw();
        self.poll_session();
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            AppEvent::LoadProgress => self.poll_session(),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.clone() else {
            return;
        };

        let ui_captured = match self.ui_manager.as_mut() {
            Some(ui_manager) => ui_manager.handle_input(&window, window_id, &event),
            None => false,
        };
        if ui_captured {
            window.request_redraw();
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Some(render_engine) = self.render_engine.as_mut() {
                    render_engine.resize(width, height);
                }
                if let Some(ui_manager) = self.ui_manager.as_mut() {
                    ui_manager.update_display_size(width, height);
                }
                self.handle_input(InputEvent::Resized { width, height });
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } if !ui_captured => self.handle_key(event_loop, key_code),
            WindowEvent::ModifiersChanged(modifiers) => {
                self.handle_input(InputEvent::Modifiers {
                    shift: modifiers.state().shift_key(),
                });
            }
            WindowEvent::CursorMoved { position, .. } => {
                let (x, y) = (position.x as f32, position.y as f32);
                self.cursor = (x, y);
                self.handle_input(InputEvent::PointerMoved { x, y });
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let (x, y) = self.cursor;
                match state {
                    ElementState::Pressed if !ui_captured => {
                        self.handle_input(InputEvent::PointerPressed { x, y })
                    }
                    // Releases always reach the session so drags cannot get stuck
                    ElementState::Released => {
                        self.handle_input(InputEvent::PointerReleased { x, y })
                    }
                    ElementState::Pressed => {}
                }
            }
            WindowEvent::MouseWheel { delta, .. } if !ui_captured => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => (position.y / PIXELS_PER_LINE) as f32,
                };
                self.handle_input(InputEvent::Scroll { lines });
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}
