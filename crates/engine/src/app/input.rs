use winit::keyboard::{KeyCode, PhysicalKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    Jump,
    /// Either shift key.
    Modifier,
    ToggleGrid,
    Autotile,
    /// Only meaningful together with [`InputAction::Modifier`].
    Save,
    Quit,
}

const ACTION_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveLeft => 0,
            InputAction::MoveRight => 1,
            InputAction::MoveUp => 2,
            InputAction::MoveDown => 3,
            InputAction::Jump => 4,
            InputAction::Modifier => 5,
            InputAction::ToggleGrid => 6,
            InputAction::Autotile => 7,
            InputAction::Save => 8,
            InputAction::Quit => 9,
        }
    }
}

/// Actions bound to a physical key position. WASD follows key position, so the
/// same keys sit under ZQSD on an AZERTY layout.
pub(crate) fn actions_for_key(key: PhysicalKey) -> &'static [InputAction] {
    let PhysicalKey::Code(code) = key else {
        return &[];
    };
    match code {
        KeyCode::KeyA | KeyCode::ArrowLeft => &[InputAction::MoveLeft],
        KeyCode::KeyD | KeyCode::ArrowRight => &[InputAction::MoveRight],
        KeyCode::KeyW => &[InputAction::MoveUp],
        KeyCode::ArrowUp => &[InputAction::MoveUp, InputAction::Jump],
        KeyCode::KeyS => &[InputAction::MoveDown, InputAction::Save],
        KeyCode::ArrowDown => &[InputAction::MoveDown],
        KeyCode::Space => &[InputAction::Jump],
        KeyCode::ShiftLeft | KeyCode::ShiftRight => &[InputAction::Modifier],
        KeyCode::KeyG => &[InputAction::ToggleGrid],
        KeyCode::KeyT => &[InputAction::Autotile],
        KeyCode::Escape => &[InputAction::Quit],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrow_up_moves_and_jumps() {
        assert_eq!(
            actions_for_key(PhysicalKey::Code(KeyCode::ArrowUp)),
            &[InputAction::MoveUp, InputAction::Jump]
        );
    }

    #[test]
    fn both_shift_keys_are_the_modifier() {
        for code in [KeyCode::ShiftLeft, KeyCode::ShiftRight] {
            assert_eq!(
                actions_for_key(PhysicalKey::Code(code)),
                &[InputAction::Modifier]
            );
        }
    }

    #[test]
    fn save_is_bound_to_s_only() {
        assert!(actions_for_key(PhysicalKey::Code(KeyCode::KeyS)).contains(&InputAction::Save));
        assert!(!actions_for_key(PhysicalKey::Code(KeyCode::ArrowDown))
            .contains(&InputAction::Save));
    }

    #[test]
    fn unbound_keys_map_to_nothing() {
        assert!(actions_for_key(PhysicalKey::Code(KeyCode::KeyP)).is_empty());
    }
}
