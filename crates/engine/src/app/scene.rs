use crate::world::Vec2;

use super::input::ActionStates;
use super::{Canvas, InputAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Exit,
}

/// Input state for one fixed tick.
///
/// Held state persists across ticks; `*_pressed` edges and wheel steps are reported
/// on exactly one tick. The cursor is in canvas (logical) coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    held: ActionStates,
    pressed: ActionStates,
    cursor_position: Option<Vec2>,
    left_mouse_down: bool,
    right_mouse_down: bool,
    left_click_pressed: bool,
    wheel_steps: i32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        quit_requested: bool,
        held: ActionStates,
        pressed: ActionStates,
        cursor_position: Option<Vec2>,
        left_mouse_down: bool,
        right_mouse_down: bool,
        left_click_pressed: bool,
        wheel_steps: i32,
    ) -> Self {
        Self {
            quit_requested,
            held,
            pressed,
            cursor_position,
            left_mouse_down,
            right_mouse_down,
            left_click_pressed,
            wheel_steps,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.held.is_down(action)
    }

    pub fn was_pressed(&self, action: InputAction) -> bool {
        self.pressed.is_down(action)
    }

    pub fn cursor_position(&self) -> Option<Vec2> {
        self.cursor_position
    }

    pub fn left_mouse_down(&self) -> bool {
        self.left_mouse_down
    }

    pub fn right_mouse_down(&self) -> bool {
        self.right_mouse_down
    }

    pub fn left_click_pressed(&self) -> bool {
        self.left_click_pressed
    }

    /// Wheel notches this tick. Positive is wheel up (away from the user).
    pub fn wheel_steps(&self) -> i32 {
        self.wheel_steps
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.held.set(action, is_down);
        self
    }

    /// Marks `action` as held and newly pressed this tick.
    pub fn with_action_pressed(mut self, action: InputAction) -> Self {
        self.held.set(action, true);
        self.pressed.set(action, true);
        self
    }

    pub fn with_cursor_position(mut self, cursor_position: Option<Vec2>) -> Self {
        self.cursor_position = cursor_position;
        self
    }

    pub fn with_left_mouse_down(mut self, is_down: bool) -> Self {
        self.left_mouse_down = is_down;
        self
    }

    pub fn with_right_mouse_down(mut self, is_down: bool) -> Self {
        self.right_mouse_down = is_down;
        self
    }

    pub fn with_left_click_pressed(mut self, left_click_pressed: bool) -> Self {
        self.left_click_pressed = left_click_pressed;
        self
    }

    pub fn with_wheel_steps(mut self, wheel_steps: i32) -> Self {
        self.wheel_steps = wheel_steps;
        self
    }
}

/// One interactive mode driven by the loop runner: fixed-step `update`, then `render`
/// into the logical canvas once per frame.
pub trait Scene {
    fn load(&mut self);
    fn update(&mut self, input: &InputSnapshot) -> SceneCommand;
    fn render(&mut self, canvas: &mut Canvas);
    fn unload(&mut self);
    fn debug_title(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressed_builder_also_marks_held() {
        let snapshot = InputSnapshot::empty().with_action_pressed(InputAction::ToggleGrid);
        assert!(snapshot.is_down(InputAction::ToggleGrid));
        assert!(snapshot.was_pressed(InputAction::ToggleGrid));
        assert!(!snapshot.was_pressed(InputAction::Autotile));
    }

    #[test]
    fn held_builder_does_not_report_an_edge() {
        let snapshot = InputSnapshot::empty().with_action_down(InputAction::MoveLeft, true);
        assert!(snapshot.is_down(InputAction::MoveLeft));
        assert!(!snapshot.was_pressed(InputAction::MoveLeft));
    }
}
