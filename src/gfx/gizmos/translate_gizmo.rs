use cgmath::{Matrix4, Vector3};
use log::{debug, info};

use crate::gfx::{
    picking::{Aabb, Ray},
    scene::{Object, ObjectId},
};

/// World axis a handle translates along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn unit(self) -> Vector3<f32> {
        match self {
            Axis::X => Vector3::unit_x(),
            Axis::Y => Vector3::unit_y(),
            Axis::Z => Vector3::unit_z(),
        }
    }

    /// Conventional red/green/blue handle colour
    pub fn color(self) -> [f32; 3] {
        match self {
            Axis::X => [0.9, 0.2, 0.2],
            Axis::Y => [0.2, 0.9, 0.2],
            Axis::Z => [0.2, 0.3, 0.9],
        }
    }
}

/// Attachment and drag state of the manipulator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ManipulatorState {
    Idle,
    Attached {
        target: ObjectId,
    },
    Dragging {
        target: ObjectId,
        axis: Axis,
        /// Object position when the drag began
        start_position: Vector3<f32>,
        /// Axis parameter of the grab point, relative to `start_position`
        grab_parameter: f32,
    },
}

/// Round every component of `position` to the nearest multiple of `increment`.
///
/// A non-positive increment disables snapping.
pub fn snap_to_increment(position: Vector3<f32>, increment: f32) -> Vector3<f32> {
    if increment <= 0.0 {
        return position;
    }
    Vector3::new(
        (position.x / increment).round() * increment,
        (position.y / increment).round() * increment,
        (position.z / increment).round() * increment,
    )
}

/// Three-axis translation manipulator with snapping
///
/// Attaches once to a single object and moves it along world X, Y or Z.
/// Rotation and scale of the target are never touched.
#[derive(Debug, Clone)]
pub struct TranslateGizmo {
    state: ManipulatorState,
    snap_increment: f32,
    handle_length: f32,
    handle_thickness: f32,
}

impl TranslateGizmo {
    pub fn new(snap_increment: f32) -> Self {
        Self {
            state: ManipulatorState::Idle,
            snap_increment,
            handle_length: 0.45,
            handle_thickness: 0.04,
        }
    }

    pub fn state(&self) -> ManipulatorState {
        self.state
    }

    pub fn snap_increment(&self) -> f32 {
        self.snap_increment
    }

    /// The attached object, if any
    pub fn target(&self) -> Option<ObjectId> {
        match self.state {
            ManipulatorState::Idle => None,
            ManipulatorState::Attached { target } | ManipulatorState::Dragging { target, .. } => {
                Some(target)
            }
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, ManipulatorState::Dragging { .. })
    }

    /// Orbit and pan must stay off while a handle is being dragged
    pub fn camera_interaction_enabled(&self) -> bool {
        !self.is_dragging()
    }

    /// Attach to `target`. Only the first attachment succeeds.
    pub fn attach(&mut self, target: ObjectId) -> bool {
        match self.state {
            ManipulatorState::Idle => {
                info!("Manipulator attached to {}", target);
                self.state = ManipulatorState::Attached { target };
                true
            }
            _ => {
                debug!("Manipulator already attached, ignoring {}", target);
                false
            }
        }
    }

    /// World-space boxes of the three handles around `object`
    pub fn handle_boxes(&self, object: &Object) -> [(Axis, Aabb); 3] {
        Axis::ALL.map(|axis| (axis, self.handle_box(axis, object.position())))
    }

    /// Model matrices mapping a unit cube (-0.5..0.5) onto each handle
    pub fn handle_transforms(&self, object: &Object) -> [(Axis, Matrix4<f32>); 3] {
        self.handle_boxes(object).map(|(axis, aabb)| {
            let size = aabb.size();
            let transform = Matrix4::from_translation(aabb.center())
                * Matrix4::from_nonuniform_scale(size.x, size.y, size.z);
            (axis, transform)
        })
    }

    /// Nearest handle of the attached `object` under `ray`
    pub fn pick_handle(&self, ray: &Ray, object: &Object) -> Option<Axis> {
        if self.target() != Some(object.id) {
            return None;
        }

        self.handle_boxes(object)
            .into_iter()
            .filter_map(|(axis, aabb)| aabb.intersect_ray(ray).map(|t| (axis, t)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(axis, _)| axis)
    }

    /// `Attached -> Dragging` along `axis`, grabbing the point under `ray`
    pub fn begin_drag(&mut self, axis: Axis, ray: &Ray, object: &Object) -> bool {
        let ManipulatorState::Attached { target } = self.state else {
            debug!("Ignoring drag start in state {:?}", self.state);
            return false;
        };
        if target != object.id {
            debug!("Ignoring drag start on unattached {}", object.id);
            return false;
        }

        let start_position = object.position();
        let Some(grab_parameter) = ray.closest_axis_parameter(start_position, axis.unit()) else {
            debug!("Pointer ray parallel to {:?} axis, drag not started", axis);
            return false;
        };

        debug!("Drag started on {:?} axis at {:?}", axis, start_position);
        self.state = ManipulatorState::Dragging {
            target,
            axis,
            start_position,
            grab_parameter,
        };
        true
    }

    /// Follow the pointer ray along the dragged axis
    pub fn drag(&mut self, ray: &Ray, object: &mut Object) -> bool {
        let ManipulatorState::Dragging {
            axis,
            start_position,
            grab_parameter,
            ..
        } = self.state
        else {
            debug!("Ignoring drag update without an active drag");
            return false;
        };

        let Some(parameter) = ray.closest_axis_parameter(start_position, axis.unit()) else {
            return false;
        };
        self.drag_offset(axis.unit() * (parameter - grab_parameter), object)
    }

    /// Move the target to `start_position + raw_offset`, snapped on every axis
    pub fn drag_offset(&mut self, raw_offset: Vector3<f32>, object: &mut Object) -> bool {
        let ManipulatorState::Dragging {
            target,
            start_position,
            ..
        } = self.state
        else {
            debug!("Ignoring drag offset without an active drag");
            return false;
        };
        if target != object.id {
            debug!("Ignoring drag offset for unattached {}", object.id);
            return false;
        }

        let snapped = snap_to_increment(start_position + raw_offset, self.snap_increment);
        if snapped == object.position() {
            return false;
        }
        object.set_translation(snapped);
        true
    }

    /// `Dragging -> Attached`
    pub fn end_drag(&mut self) -> bool {
        match self.state {
            ManipulatorState::Dragging { target, .. } => {
                debug!("Drag ended on {}", target);
                self.state = ManipulatorState::Attached { target };
                true
            }
            _ => false,
        }
    }

    fn handle_box(&self, axis: Axis, origin: Vector3<f32>) -> Aabb {
        let half = self.handle_thickness / 2.0;
        let along = axis.unit() * (self.handle_length / 2.0);
        let across = Vector3::new(half, half, half) - axis.unit() * half;
        Aabb::from_center(origin + along, across + axis.unit() * (self.handle_length / 2.0))
    }
}
