use winsys::input::KeyCode;

use std::collections::HashMap;

/// Logical command a key binding resolves to; desktop selection carries
/// its target index as payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    FocusNext,
    Close,
    ToggleShade,
    Move,
    Resize,
    Minimize,
    Maximize,
    NextDesktop,
    Desktop(usize),
    RootMenu,
    WindowMenu,
    Restart,
    Exit,
}

pub type KeyBindings = HashMap<KeyCode, KeyCommand>;

/// When keyboard focus follows a client: on click, or on pointer entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusModel {
    Click,
    Sloppy,
}
