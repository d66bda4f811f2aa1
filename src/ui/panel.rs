// src/ui/panel.rs
//! Instruction overlay
//!
//! Shows the user which step of the pick-and-place flow they are on. The
//! panel only learns about progress through [`SessionEvent`]s.

use crate::session::SessionEvent;

/// Where the user is in the pick-and-place flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionStep {
    LoadingScene,
    PickPoint,
    AdjustPosition,
}

impl InstructionStep {
    pub fn text(self) -> &'static str {
        match self {
            InstructionStep::LoadingScene => "Loading scapula...",
            InstructionStep::PickPoint => {
                "Step 1: Click on the scapula where the implant should be socketed."
            }
            InstructionStep::AdjustPosition => {
                "Step 2: Drag the coloured handles to adjust the implant position."
            }
        }
    }
}

pub struct InstructionPanel {
    step: InstructionStep,
    last_error: Option<String>,
}

impl Default for InstructionPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl InstructionPanel {
    pub fn new() -> Self {
        Self {
            step: InstructionStep::LoadingScene,
            last_error: None,
        }
    }

    pub fn step(&self) -> InstructionStep {
        self.step
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Advances the step or records the error carried by `event`
    pub fn handle_event(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::StaticMeshReady { .. } => {
                self.step = InstructionStep::PickPoint;
                self.last_error = None;
            }
            SessionEvent::PlacementCompleted(_) => {
                self.step = InstructionStep::AdjustPosition;
                self.last_error = None;
            }
            SessionEvent::AssetLoadFailed { message, .. } => {
                self.last_error = Some(message.clone());
            }
        }
    }

    /// Clears the error shown after a failed scene load once a retry starts
    pub fn retrying(&mut self) {
        if self.step == InstructionStep::LoadingScene {
            self.last_error = None;
        }
    }

    pub fn draw(&self, ui: &imgui::Ui) {
        let display_size = ui.io().display_size;
        if display_size[0] <= 0.0 || display_size[1] <= 0.0 {
            return;
        }
        let panel_width = (display_size[0] * 0.4).clamp(320.0, 560.0);

        ui.window("Instructions")
            .position([20.0, 20.0], imgui::Condition::FirstUseEver)
            .size([panel_width, 0.0], imgui::Condition::Always)
            .resizable(false)
            .collapsible(false)
            .build(|| {
                ui.text_wrapped(self.step.text());

                if let Some(error) = &self.last_error {
                    ui.separator();
                    ui.text_colored([1.0, 0.4, 0.4, 1.0], "Loading failed");
                    ui.text_wrapped(error);
                    if self.step == InstructionStep::LoadingScene {
                        ui.text_disabled("Press R to retry.");
                    }
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{gfx::scene::ObjectId, placement::PlacementCompleted};
    use cgmath::Vector3;

    fn load_failed() -> SessionEvent {
        SessionEvent::AssetLoadFailed {
            path: "Scapula (2).stl".to_string(),
            message: "asset not found: Scapula (2).stl".to_string(),
        }
    }

    #[test]
    fn test_steps_follow_session_events() {
        let mut panel = InstructionPanel::new();
        assert_eq!(panel.step(), InstructionStep::LoadingScene);

        panel.handle_event(&SessionEvent::StaticMeshReady { object: ObjectId(1) });
        assert_eq!(panel.step(), InstructionStep::PickPoint);
        assert!(panel.step().text().starts_with("Step 1"));

        panel.handle_event(&SessionEvent::PlacementCompleted(PlacementCompleted {
            object: ObjectId(2),
            position: Vector3::new(0.0, 0.0, 0.0),
        }));
        assert_eq!(panel.step(), InstructionStep::AdjustPosition);
        assert!(panel.step().text().starts_with("Step 2"));
    }

    #[test]
    fn test_load_failure_keeps_step_and_shows_error() {
        let mut panel = InstructionPanel::new();
        panel.handle_event(&load_failed());
        assert_eq!(panel.step(), InstructionStep::LoadingScene);
        assert_eq!(panel.last_error(), Some("asset not found: Scapula (2).stl"));

        panel.retrying();
        assert_eq!(panel.last_error(), None);

        panel.handle_event(&load_failed());
        panel.handle_event(&SessionEvent::StaticMeshReady { object: ObjectId(1) });
        assert_eq!(panel.last_error(), None);
    }

    #[test]
    fn test_movable_failure_keeps_pick_step() {
        let mut panel = InstructionPanel::new();
        panel.handle_event(&SessionEvent::StaticMeshReady { object: ObjectId(1) });
        panel.handle_event(&load_failed());

        assert_eq!(panel.step(), InstructionStep::PickPoint);
        panel.retrying();
        // Only a failed scene load is cleared by a retry
        assert!(panel.last_error().is_some());
    }
}
