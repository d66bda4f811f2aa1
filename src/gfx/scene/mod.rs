//! # Scene Registry
//!
//! Holds the objects the viewer draws and picks against. The registry is a
//! pure model: it owns geometry handles, transforms and materials, while the
//! renderer keeps its GPU buffers keyed by [`ObjectId`].
//!
//! ## Key Components
//!
//! - [`Scene`] - Socketable meshes plus at most one movable object
//! - [`Object`] - Shared geometry with a transform and material
//! - [`ObjectTransform`] - Position, Euler rotation and uniform scale
//! - [`Vertex3D`] - GPU vertex layout shared by mesh and line pipelines
//!
//! ## Lifecycle
//!
//! Socketables are added while the static asset loads, then the scene is
//! sealed. The movable object is inserted once, by the placement engine.

pub mod object;
pub mod scene;
pub mod vertex;

// Re-export main types
pub use object::{Object, ObjectId, ObjectTransform};
pub use scene::Scene;
pub use vertex::Vertex3D;
