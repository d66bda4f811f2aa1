//! # Gizmo System
//!
//! Interactive manipulators drawn on top of scene objects. The viewer has a
//! single one, [`TranslateGizmo`], which moves the placed object along the
//! world axes in fixed increments.
//!
//! ## State machine
//!
//! ```text
//! Idle --attach--> Attached --begin_drag--> Dragging
//!                     ^                        |
//!                     +-------end_drag---------+
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use socket_viewer::gfx::gizmos::{Axis, TranslateGizmo};
//! use socket_viewer::gfx::scene::ObjectId;
//!
//! let mut gizmo = TranslateGizmo::new(0.05);
//! gizmo.attach(ObjectId(1));
//! assert!(gizmo.camera_interaction_enabled());
//! ```

pub mod translate_gizmo;

// Re-export main types
pub use translate_gizmo::{snap_to_increment, Axis, ManipulatorState, TranslateGizmo};
