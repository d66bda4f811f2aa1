//! # Prelude
//!
//! Commonly used types in one import.
//!
//! ```no_run
//! use socket_viewer::prelude::*;
//!
//! let config = ViewerConfig::default().with_snap_increment(0.1);
//! let session = Session::new(config, std::sync::Arc::new(DirectorySource::new("media")));
//! assert!(session.is_static_loading());
//! ```

// Re-export core application types
pub use crate::app::ViewerApp;
pub use crate::config::{PlacementOffset, StaticMeshPose, ViewerConfig};
pub use crate::error::{AssetError, ViewerError};
pub use crate::placement::PlacementCompleted;
pub use crate::session::{InputEvent, Session, SessionEvent};

// Re-export graphics and scene types
pub use crate::gfx::camera::{CameraManager, OrthographicCamera, Viewport};
pub use crate::gfx::geometry::MeshGeometry;
pub use crate::gfx::gizmos::{Axis, ManipulatorState, TranslateGizmo};
pub use crate::gfx::loader::{AssetSource, DirectorySource, MemorySource, MeshLoader};
pub use crate::gfx::picking::{ObjectPicker, PickResult, Ray};
pub use crate::gfx::scene::{Object, ObjectId, Scene};

// Re-export common external dependencies
pub use cgmath::{InnerSpace, Vector3, Zero};
