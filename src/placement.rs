//! Placement of the movable object at a picked surface point
//!
//! [`PlacementEngine::place_at`] only starts the work: it claims the single
//! placement slot and kicks off the movable mesh load. Everything that mutates
//! the scene happens later, in [`PlacementEngine::poll`], once the mesh is
//! available.

use std::{
    sync::Arc,
    task::{Context, Poll},
};

use cgmath::Vector3;
use futures::{future, FutureExt};
use log::{debug, info, warn};

use crate::{
    config::{PlacementOffset, ViewerConfig},
    error::ViewerError,
    gfx::{
        geometry::MeshGeometry,
        gizmos::{snap_to_increment, TranslateGizmo},
        loader::{LoadFuture, MeshLoader},
        picking::PickResult,
        resources::material::Material,
        scene::{ObjectId, ObjectTransform, Scene},
    },
};

/// Emitted once the movable object exists and the manipulator holds it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementCompleted {
    pub object: ObjectId,
    pub position: Vector3<f32>,
}

enum PlacementState {
    Ready,
    Loading { pick: PickResult, load: LoadFuture },
    Placed(ObjectId),
}

pub struct PlacementEngine {
    state: PlacementState,
    movable_path: String,
    world_scale: f32,
    offset: PlacementOffset,
    resident: Option<Arc<MeshGeometry>>,
    preload: Option<LoadFuture>,
}

impl PlacementEngine {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            state: PlacementState::Ready,
            movable_path: config.assets.movable_mesh.clone(),
            world_scale: config.world_scale,
            offset: config.placement.offset,
            resident: None,
            preload: None,
        }
    }

    /// Start fetching the movable mesh ahead of the first pick
    pub fn preload(&mut self, loader: &MeshLoader) {
        if self.resident.is_none() && self.preload.is_none() {
            debug!("Preloading movable mesh {}", self.movable_path);
            self.preload = Some(loader.load(&self.movable_path));
        }
    }

    /// True while no placement is in flight or done
    pub fn is_ready(&self) -> bool {
        matches!(self.state, PlacementState::Ready)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, PlacementState::Loading { .. })
    }

    pub fn placed_object(&self) -> Option<ObjectId> {
        match self.state {
            PlacementState::Placed(id) => Some(id),
            _ => None,
        }
    }

    /// Claim the placement slot for `pick` and begin loading the movable mesh
    ///
    /// Returns [`ViewerError::AlreadyPlaced`] while a placement is loading or
    /// after one has completed.
    pub fn place_at(&mut self, pick: PickResult, loader: &MeshLoader) -> Result<(), ViewerError> {
        if !self.is_ready() {
            debug!("Rejecting placement at {:?}, slot already taken", pick.point);
            return Err(ViewerError::AlreadyPlaced);
        }

        let load = if let Some(geometry) = &self.resident {
            future::ready(Ok(Arc::clone(geometry))).boxed()
        } else if let Some(preload) = self.preload.take() {
            preload
        } else {
            loader.load(&self.movable_path)
        };

        info!("Placing movable object at {:?} on {}", pick.point, pick.object);
        self.state = PlacementState::Loading { pick, load };
        Ok(())
    }

    /// Drive outstanding loads and finish a placement once its mesh arrives.
    ///
    /// `Ready(None)` means there is nothing left to wait for. On failure the
    /// engine returns to ready and nothing is registered.
    pub fn poll(
        &mut self,
        cx: &mut Context<'_>,
        scene: &mut Scene,
        manipulator: &mut TranslateGizmo,
    ) -> Poll<Option<Result<PlacementCompleted, ViewerError>>> {
        self.poll_preload(cx);

        let PlacementState::Loading { load, .. } = &mut self.state else {
            return if self.preload.is_some() {
                Poll::Pending
            } else {
                Poll::Ready(None)
            };
        };

        let outcome = match load.poll_unpin(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(outcome) => outcome,
        };

        let PlacementState::Loading { pick, .. } =
            std::mem::replace(&mut self.state, PlacementState::Ready)
        else {
            return Poll::Ready(None);
        };

        let result = match outcome {
            Ok(geometry) => {
                self.resident = Some(Arc::clone(&geometry));
                self.finalize(pick, geometry, scene, manipulator)
            }
            Err(err) => {
                warn!("Placement aborted: {}", err);
                Err(ViewerError::from(err))
            }
        };

        if let Ok(completed) = &result {
            self.state = PlacementState::Placed(completed.object);
        }
        Poll::Ready(Some(result))
    }

    /// Position for the movable object given the pick and its mesh
    pub fn placement_position(&self, pick: &PickResult, geometry: &MeshGeometry) -> Vector3<f32> {
        match self.offset {
            PlacementOffset::Flat(amount) => pick.point + Vector3::new(amount, amount, amount),
            PlacementOffset::SurfaceNormal { radius } => {
                let radius =
                    radius.unwrap_or(geometry.bounding_sphere().radius * self.world_scale);
                pick.point + pick.normal * radius
            }
        }
    }

    fn poll_preload(&mut self, cx: &mut Context<'_>) {
        let Some(preload) = &mut self.preload else {
            return;
        };
        if let Poll::Ready(outcome) = preload.poll_unpin(cx) {
            self.preload = None;
            match outcome {
                Ok(geometry) => {
                    debug!("Movable mesh resident");
                    self.resident = Some(geometry);
                }
                // The first pick will try again
                Err(err) => warn!("Preloading movable mesh failed: {}", err),
            }
        }
    }

    fn finalize(
        &self,
        pick: PickResult,
        geometry: Arc<MeshGeometry>,
        scene: &mut Scene,
        manipulator: &mut TranslateGizmo,
    ) -> Result<PlacementCompleted, ViewerError> {
        // Start on the drag lattice so every snapped step is a whole increment
        let position = snap_to_increment(
            self.placement_position(&pick, &geometry),
            manipulator.snap_increment(),
        );
        let transform = ObjectTransform {
            position,
            scale: self.world_scale,
            ..Default::default()
        };

        let object = scene.insert_movable("Implant", geometry, transform, Material::implant())?;
        manipulator.attach(object);

        info!("Placement completed: {} at {:?}", object, position);
        Ok(PlacementCompleted { object, position })
    }
}
