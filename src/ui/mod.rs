//! # User Interface Module
//!
//! Dear ImGui overlay for the viewer. The [`UiManager`] owns the imgui
//! context and its winit/wgpu integration; the [`InstructionPanel`] reacts to
//! [`SessionEvent`](crate::session::SessionEvent)s and tells the user what to
//! do next.
//!
//! ## Input Handling
//!
//! Pointer events the overlay wants are not forwarded to the session, so
//! clicking on the panel never places an implant.

pub mod manager;
pub mod panel;

// Re-export main types
pub use manager::UiManager;
pub use panel::{InstructionPanel, InstructionStep};
