//! Viewer session
//!
//! [`Session`] owns every piece of interaction state: the scene, the camera,
//! the outstanding loads, the placement engine and the manipulator. The
//! windowing shell feeds it [`InputEvent`]s, polls its loads and drains
//! [`SessionEvent`]s; nothing in here touches the GPU or the window, so the
//! whole pick-and-place flow runs headless in tests.

use std::{
    sync::Arc,
    task::{Context, Poll},
};

use futures::FutureExt;
use log::{debug, info, warn};

use crate::{
    config::ViewerConfig,
    error::{AssetError, ViewerError},
    gfx::{
        camera::{CameraController, CameraManager, OrthographicCamera, Viewport},
        geometry::MeshGeometry,
        gizmos::TranslateGizmo,
        loader::{AssetSource, LoadFuture, MeshLoader},
        picking::{ObjectPicker, Ray},
        resources::material::Material,
        scene::{ObjectId, ObjectTransform, Scene},
    },
    placement::{PlacementCompleted, PlacementEngine},
};

/// Viewport size assumed until the shell reports the real one
const INITIAL_VIEWPORT: (f32, f32) = (800.0, 600.0);

/// Pointer and window input in physical pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerPressed { x: f32, y: f32 },
    PointerMoved { x: f32, y: f32 },
    PointerReleased { x: f32, y: f32 },
    /// Wheel movement in lines, positive away from the user
    Scroll { lines: f32 },
    Modifiers { shift: bool },
    Resized { width: u32, height: u32 },
}

/// Notifications for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StaticMeshReady { object: ObjectId },
    PlacementCompleted(PlacementCompleted),
    AssetLoadFailed { path: String, message: String },
}

impl SessionEvent {
    fn load_failed(error: &AssetError) -> Self {
        SessionEvent::AssetLoadFailed {
            path: error.path().to_string(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PointerPress {
    origin: (f32, f32),
    on_handle: bool,
    beyond_slop: bool,
}

pub struct Session {
    config: ViewerConfig,
    loader: MeshLoader,
    scene: Scene,
    camera_manager: CameraManager,
    picker: ObjectPicker,
    placement: PlacementEngine,
    manipulator: TranslateGizmo,
    viewport: Viewport,
    static_load: Option<LoadFuture>,
    static_failed: bool,
    picking_enabled: bool,
    press: Option<PointerPress>,
    events: Vec<SessionEvent>,
    redraw_requested: bool,
}

impl Session {
    /// Create a session and start loading the static mesh
    pub fn new(config: ViewerConfig, source: Arc<dyn AssetSource>) -> Self {
        let loader = MeshLoader::new(source).with_timeout(config.assets.load_timeout);
        let viewport = Viewport::new(INITIAL_VIEWPORT.0, INITIAL_VIEWPORT.1);

        let camera = OrthographicCamera::from_config(&config.camera, viewport.aspect());
        let controller = CameraController::new(config.camera.rotate_speed, config.camera.zoom_speed);

        let mut placement = PlacementEngine::new(&config);
        if config.placement.preload {
            placement.preload(&loader);
        }

        let static_load = Some(loader.load(&config.assets.static_mesh));

        Self {
            manipulator: TranslateGizmo::new(config.snap_increment),
            camera_manager: CameraManager::new(camera, controller),
            picker: ObjectPicker::new(),
            scene: Scene::new(),
            static_load,
            static_failed: false,
            picking_enabled: true,
            press: None,
            events: Vec::new(),
            redraw_requested: true,
            placement,
            viewport,
            loader,
            config,
        }
    }

    /// Same as [`Session::new`] with a known viewport size
    pub fn with_viewport(config: ViewerConfig, source: Arc<dyn AssetSource>, width: u32, height: u32) -> Self {
        let mut session = Self::new(config, source);
        session.resize(width, height);
        session
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera_manager(&self) -> &CameraManager {
        &self.camera_manager
    }

    pub fn camera_manager_mut(&mut self) -> &mut CameraManager {
        &mut self.camera_manager
    }

    pub fn manipulator(&self) -> &TranslateGizmo {
        &self.manipulator
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn picking_enabled(&self) -> bool {
        self.picking_enabled
    }

    pub fn is_static_loaded(&self) -> bool {
        self.scene.is_sealed()
    }

    pub fn is_static_loading(&self) -> bool {
        self.static_load.is_some()
    }

    /// Drive the outstanding loads. `Ready` once none remain.
    pub fn poll_loads(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        if let Some(load) = &mut self.static_load {
            if let Poll::Ready(outcome) = load.poll_unpin(cx) {
                self.static_load = None;
                match outcome {
                    Ok(geometry) => self.install_static(geometry),
                    Err(err) => {
                        warn!("Static mesh failed to load: {}", err);
                        self.static_failed = true;
                        self.events.push(SessionEvent::load_failed(&err));
                    }
                }
                self.redraw_requested = true;
            }
        }

        let placement_idle = loop {
            match self
                .placement
                .poll(cx, &mut self.scene, &mut self.manipulator)
            {
                Poll::Ready(Some(Ok(completed))) => {
                    self.events.push(SessionEvent::PlacementCompleted(completed));
                    self.redraw_requested = true;
                }
                Poll::Ready(Some(Err(err))) => {
                    // Let the user pick again
                    self.picking_enabled = true;
                    if let ViewerError::AssetLoadFailure(asset) = &err {
                        self.events.push(SessionEvent::load_failed(asset));
                    } else {
                        warn!("Placement failed: {}", err);
                    }
                    self.redraw_requested = true;
                }
                Poll::Ready(None) => break true,
                Poll::Pending => break false,
            }
        };

        if self.static_load.is_none() && placement_idle {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }

    /// Restart a static mesh load that failed. Returns false if there is
    /// nothing to retry.
    pub fn retry_static_load(&mut self) -> bool {
        if !self.static_failed || self.static_load.is_some() {
            return false;
        }
        info!("Retrying static mesh load");
        self.static_failed = false;
        self.static_load = Some(self.loader.load(&self.config.assets.static_mesh));
        true
    }

    /// Apply one input event. Returns true when the view needs redrawing.
    pub fn handle_input(&mut self, event: InputEvent) -> bool {
        let changed = match event {
            InputEvent::PointerPressed { x, y } => self.pointer_pressed(x, y),
            InputEvent::PointerMoved { x, y } => self.pointer_moved(x, y),
            InputEvent::PointerReleased { x, y } => self.pointer_released(x, y),
            InputEvent::Scroll { lines } => self
                .camera_manager
                .controller
                .scroll(lines, &mut self.camera_manager.camera),
            InputEvent::Modifiers { shift } => {
                self.camera_manager.controller.set_shift_held(shift);
                false
            }
            InputEvent::Resized { width, height } => self.resize(width, height),
        };
        self.redraw_requested |= changed;
        changed
    }

    /// Events produced since the last call
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Returns and clears the pending redraw flag
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }

    pub fn request_redraw(&mut self) {
        self.redraw_requested = true;
    }

    fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            debug!("Ignoring zero-sized viewport {}x{}", width, height);
            return false;
        }
        self.viewport = Viewport::new(width as f32, height as f32);
        self.camera_manager.camera.resize_projection(width, height);
        true
    }

    fn pointer_ray(&self, x: f32, y: f32) -> Option<Ray> {
        self.picker
            .screen_to_ray((x, y), self.viewport, &self.camera_manager.camera)
    }

    fn pointer_pressed(&mut self, x: f32, y: f32) -> bool {
        let mut on_handle = false;
        if let (Some(ray), Some(movable)) = (self.pointer_ray(x, y), self.scene.movable()) {
            if let Some(axis) = self.manipulator.pick_handle(&ray, movable) {
                on_handle = self.manipulator.begin_drag(axis, &ray, movable);
            }
        }

        if on_handle {
            self.camera_manager
                .controller
                .set_enabled(self.manipulator.camera_interaction_enabled());
        } else {
            self.camera_manager.controller.pointer_pressed((x, y));
        }

        self.press = Some(PointerPress {
            origin: (x, y),
            on_handle,
            beyond_slop: false,
        });
        on_handle
    }

    fn pointer_moved(&mut self, x: f32, y: f32) -> bool {
        let Some(press) = &mut self.press else {
            return false;
        };
        let slop = self.config.click_slop;
        if distance(press.origin, (x, y)) > slop {
            press.beyond_slop = true;
        }

        if press.on_handle {
            let Some(ray) = self.pointer_ray(x, y) else {
                return false;
            };
            return match self.scene.movable_mut() {
                Some(movable) => self.manipulator.drag(&ray, movable),
                None => false,
            };
        }

        self.camera_manager
            .controller
            .pointer_moved((x, y), &mut self.camera_manager.camera)
    }

    fn pointer_released(&mut self, x: f32, y: f32) -> bool {
        let Some(press) = self.press.take() else {
            return false;
        };

        if press.on_handle {
            self.manipulator.end_drag();
            self.camera_manager
                .controller
                .set_enabled(self.manipulator.camera_interaction_enabled());
            return true;
        }

        self.camera_manager.controller.pointer_released();
        let is_click = !press.beyond_slop && distance(press.origin, (x, y)) <= self.config.click_slop;
        if is_click {
            self.click(x, y)
        } else {
            false
        }
    }

    fn click(&mut self, x: f32, y: f32) -> bool {
        if !self.picking_enabled {
            debug!("Click at ({}, {}) ignored, picking disabled", x, y);
            return false;
        }

        let Some(hit) = self.picker.pick(
            (x, y),
            self.viewport,
            &self.camera_manager.camera,
            self.scene.socketables(),
        ) else {
            debug!("Click at ({}, {}) hit nothing", x, y);
            return false;
        };

        match self.placement.place_at(hit, &self.loader) {
            Ok(()) => {
                self.picking_enabled = false;
                true
            }
            Err(err) => {
                debug!("Placement rejected: {}", err);
                self.picking_enabled = false;
                false
            }
        }
    }

    fn install_static(&mut self, geometry: Arc<MeshGeometry>) {
        let scale = self.config.world_scale;
        let pose = self.config.static_pose;
        let transform = ObjectTransform {
            position: pose.position(geometry.bounding_sphere().radius, scale),
            rotation: pose.rotation,
            scale,
        };

        match self
            .scene
            .add_socketable("Scapula", geometry, transform, Material::bone())
        {
            Ok(object) => {
                self.scene.seal();
                info!("Static mesh ready at {:?}", transform.position);
                self.events.push(SessionEvent::StaticMeshReady { object });
            }
            Err(err) => warn!("Static mesh not registered: {}", err),
        }
    }
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{CameraConfig, MeshLift, StaticMeshPose},
        gfx::{
            geometry::{generate_box, generate_sphere},
            gizmos::ManipulatorState,
            loader::{test_fixtures::binary_stl, MemorySource},
        },
    };
    use cgmath::{InnerSpace, Vector3, Zero};
    use futures::future;

    /// 100 mm cube at the origin, seen head-on through a 4x4 unit window
    fn config() -> ViewerConfig {
        ViewerConfig::default()
            .with_static_mesh("cube.stl")
            .with_movable_mesh("ball.stl")
            .with_static_pose(StaticMeshPose {
                rotation: Vector3::zero(),
                lift: MeshLift::Fixed(Vector3::zero()),
            })
            .with_camera(CameraConfig {
                frustum_size: 4.0,
                zoom: 1.0,
                position: Vector3::new(0.0, 0.0, 10.0),
                ..CameraConfig::default()
            })
    }

    fn source() -> MemorySource {
        MemorySource::new()
            .with_asset("cube.stl", binary_stl(&generate_box([50.0, 50.0, 50.0])))
            .with_asset("ball.stl", binary_stl(&generate_sphere(20.0, 16, 8)))
    }

    fn session_with(config: ViewerConfig, source: MemorySource) -> Session {
        Session::with_viewport(config, Arc::new(source), 400, 400)
    }

    fn settle(session: &mut Session) {
        pollster::block_on(future::poll_fn(|cx| session.poll_loads(cx)));
    }

    fn click(session: &mut Session, x: f32, y: f32) -> bool {
        session.handle_input(InputEvent::PointerPressed { x, y });
        session.handle_input(InputEvent::PointerReleased { x, y })
    }

    /// Session with the cube loaded and the ball placed at (0.2, 0.1, 0.6)
    fn placed_session() -> Session {
        let mut session = session_with(config(), source());
        settle(&mut session);
        assert!(click(&mut session, 210.0, 200.0));
        settle(&mut session);
        session.drain_events();
        session
    }

    #[test]
    fn test_pick_before_static_load_is_a_noop() {
        let mut session = session_with(config(), source());
        assert!(session.is_static_loading());

        // Nothing registered yet, so the click finds no candidates
        assert!(!click(&mut session, 200.0, 200.0));
        assert!(session.picking_enabled());

        settle(&mut session);
        assert!(session.is_static_loaded());
    }

    #[test]
    fn test_click_places_movable_object() {
        let mut session = session_with(config(), source());
        settle(&mut session);

        let events = session.drain_events();
        assert!(matches!(events.as_slice(), [SessionEvent::StaticMeshReady { .. }]));

        // Pixel (210, 200) is world (0.1, 0.0); the cube face is at z = 0.5
        assert!(click(&mut session, 210.0, 200.0));
        assert!(!session.picking_enabled());
        settle(&mut session);

        let events = session.drain_events();
        let [SessionEvent::PlacementCompleted(completed)] = events.as_slice() else {
            panic!("unexpected events {:?}", events);
        };
        let expected = Vector3::new(0.2, 0.1, 0.6);
        assert!((completed.position - expected).magnitude() < 1e-4);

        let movable = session.scene().movable().unwrap();
        assert_eq!(movable.transform.scale, 0.01);
        assert_eq!(
            session.manipulator().state(),
            ManipulatorState::Attached { target: movable.id }
        );
    }

    #[test]
    fn test_second_click_does_not_place_again() {
        let mut session = placed_session();

        assert!(!click(&mut session, 190.0, 190.0));
        settle(&mut session);

        assert!(session.drain_events().is_empty());
        assert_eq!(session.scene().object_count(), 2);
    }

    #[test]
    fn test_handle_drag_moves_in_increments() {
        let mut session = placed_session();
        let yaw = session.camera_manager().camera.yaw;

        // World (0.4, 0.1) sits on the X handle
        session.handle_input(InputEvent::PointerPressed { x: 240.0, y: 190.0 });
        assert!(session.manipulator().is_dragging());
        assert!(!session.camera_manager().controller.is_enabled());

        // Pointer to world x = 0.5: raw offset 0.1 along X
        assert!(session.handle_input(InputEvent::PointerMoved { x: 250.0, y: 190.0 }));
        let position = session.scene().movable().unwrap().position();
        assert!((position - Vector3::new(0.3, 0.1, 0.6)).magnitude() < 1e-4);

        // Tiny move: still snapped to the same step
        session.handle_input(InputEvent::PointerMoved { x: 251.0, y: 191.0 });
        let position = session.scene().movable().unwrap().position();
        assert!((position.x - 0.3).abs() < 1e-4);

        assert!(session.handle_input(InputEvent::PointerReleased { x: 251.0, y: 191.0 }));
        assert!(!session.manipulator().is_dragging());
        assert!(session.camera_manager().controller.is_enabled());
        assert_eq!(session.camera_manager().camera.yaw, yaw);
    }

    #[test]
    fn test_drag_is_not_a_click() {
        let mut session = session_with(config(), source());
        settle(&mut session);

        session.handle_input(InputEvent::PointerPressed { x: 210.0, y: 200.0 });
        session.handle_input(InputEvent::PointerMoved { x: 260.0, y: 200.0 });
        session.handle_input(InputEvent::PointerReleased { x: 210.0, y: 200.0 });

        assert!(session.picking_enabled());
        assert!(session.placement.is_ready());
    }

    #[test]
    fn test_static_load_failure_and_retry() {
        let mut session = session_with(config(), MemorySource::new());
        settle(&mut session);

        let events = session.drain_events();
        assert!(matches!(
            events.as_slice(),
            [SessionEvent::AssetLoadFailed { path, .. }] if path == "cube.stl"
        ));
        assert!(!session.is_static_loaded());
        assert_eq!(session.scene().object_count(), 0);

        assert!(session.retry_static_load());
        assert!(!session.retry_static_load());
        settle(&mut session);
        assert_eq!(session.drain_events().len(), 1);
    }

    #[test]
    fn test_malformed_static_mesh_registers_nothing() {
        let mut truncated = binary_stl(&generate_box([50.0, 50.0, 50.0]));
        truncated.truncate(200);

        for bytes in [truncated, b"solid cube\nfacet normal 0 0 x\n".to_vec()] {
            let source = source().with_asset("cube.stl", bytes);
            let mut session = session_with(config(), source);
            settle(&mut session);

            let events = session.drain_events();
            assert!(matches!(
                events.as_slice(),
                [SessionEvent::AssetLoadFailed { path, message }]
                    if path == "cube.stl" && message.contains("malformed")
            ));
            assert!(!session.is_static_loaded());
            assert_eq!(session.scene().object_count(), 0);
            // Clicks have nothing to hit
            assert!(!click(&mut session, 200.0, 200.0));
        }
    }

    #[test]
    fn test_malformed_movable_leaves_registry_unchanged() {
        let source = source().with_asset("ball.stl", b"solid ball\nfacet normal nope\n".to_vec());
        let mut session = session_with(config(), source);
        settle(&mut session);
        session.drain_events();

        assert!(click(&mut session, 210.0, 200.0));
        settle(&mut session);

        let events = session.drain_events();
        assert!(matches!(
            events.as_slice(),
            [SessionEvent::AssetLoadFailed { path, .. }] if path == "ball.stl"
        ));
        assert_eq!(session.scene().object_count(), 1);
        assert!(session.scene().movable().is_none());
        assert!(session.picking_enabled());
        assert_eq!(session.manipulator().state(), ManipulatorState::Idle);
    }

    #[test]
    fn test_resize_rescales_horizontal_extent() {
        let mut session = session_with(config(), source());
        let (top, bottom) = {
            let camera = &session.camera_manager().camera;
            (camera.top, camera.bottom)
        };

        assert!(session.handle_input(InputEvent::Resized { width: 800, height: 400 }));
        let camera = &session.camera_manager().camera;
        assert_eq!((camera.top, camera.bottom), (top, bottom));
        assert_eq!(camera.right, top * 2.0);
        assert_eq!(camera.left, bottom * 2.0);
        assert_eq!(session.viewport(), Viewport::new(800.0, 400.0));

        assert!(!session.handle_input(InputEvent::Resized { width: 0, height: 400 }));
    }

    #[test]
    fn test_redraw_flag_is_reactive() {
        let mut session = session_with(config(), source());
        assert!(session.take_redraw_request());
        assert!(!session.take_redraw_request());

        session.handle_input(InputEvent::Scroll { lines: 1.0 });
        assert!(session.take_redraw_request());
    }
}
