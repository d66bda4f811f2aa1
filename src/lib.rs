// src/lib.rs
//! Socket Viewer
//!
//! Pick a point on a static surface mesh and place a movable implant proxy
//! there, then nudge it along the world axes in fixed increments. Built on
//! wgpu and winit; the interaction core in [`session`] runs without a window.

pub mod app;
pub mod config;
pub mod error;
pub mod gfx;
pub mod placement;
pub mod prelude;
pub mod session;
pub mod ui;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::ViewerApp;
pub use config::ViewerConfig;
pub use session::{InputEvent, Session, SessionEvent};
