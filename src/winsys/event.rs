pub use crate::Result;

use crate::geometry::Pos;
use crate::geometry::Region;
use crate::hints::Desktop;
use crate::input::ButtonEvent;
use crate::input::KeyCode;
use crate::input::MotionEvent;
use crate::window::Colormap;
use crate::window::IcccmWindowState;
use crate::window::Layer;
use crate::window::Window;

/// The abstract event vocabulary the dispatch core consumes. Backends
/// translate raw display-server events into these; anything they cannot
/// express is dropped at the translation boundary.
#[derive(Debug, Clone, Copy)]
pub enum Event {
    Button {
        event: ButtonEvent,
    },
    Key {
        key_code: KeyCode,
        subwindow: Option<Window>,
    },
    Motion {
        event: MotionEvent,
    },
    Enter {
        window: Window,
        pos: Pos,
    },
    Leave {
        window: Window,
    },
    Create {
        window: Window,
    },
    MapRequest {
        window: Window,
    },
    Unmap {
        window: Window,
    },
    Destroy {
        window: Window,
    },
    ConfigureRequest {
        window: Window,
        changes: ConfigureChanges,
    },
    Configure {
        window: Window,
        region: Region,
    },
    Property {
        window: Window,
        kind: PropertyKind,
        on_root: bool,
    },
    Command {
        window: Window,
        command: ClientCommand,
    },
    ColormapChange {
        window: Window,
        colormap: Colormap,
        new: bool,
    },
    Expose {
        window: Window,
        count: u16,
    },
    Shape {
        window: Window,
    },
}

/// The fields a configure request actually asked to change; unset fields
/// must be left alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigureChanges {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub w: Option<i32>,
    pub h: Option<i32>,
    pub border_width: Option<u32>,
    pub sibling: Option<Window>,
    pub stack_mode: Option<StackMode>,
}

#[derive(Debug, Copy, Clone, PartialOrd, Ord, PartialEq, Eq)]
pub enum StackMode {
    Above,
    Below,
}

#[derive(Debug, Copy, Clone, PartialOrd, Ord, PartialEq, Eq)]
pub enum PropertyKind {
    Name,
    NormalHints,
    ColormapWindows,
    ManagerRestart,
    ManagerExit,
}

#[derive(Debug, Copy, Clone, PartialOrd, Ord, PartialEq, Eq)]
pub enum ToggleAction {
    Toggle,
    Add,
    Remove,
}

/// State bits addressable through a multi-flag toggle message.
#[derive(Debug, Copy, Clone, PartialOrd, Ord, PartialEq, Eq)]
pub enum StateToggle {
    Sticky,
    MaximizedHorz,
    MaximizedVert,
    Shaded,
}

/// Mask/value pair of the legacy flags message; only masked fields are
/// to be applied.
#[derive(Debug, Default, Clone, Copy)]
pub struct WinFlags {
    pub sticky: bool,
    pub no_list: bool,
}

/// Typed client-message commands.
#[derive(Debug, Clone, Copy)]
pub enum ClientCommand {
    SetFlags {
        mask: WinFlags,
        values: WinFlags,
    },
    SetLayer {
        layer: Layer,
    },
    SetLifecycle {
        state: IcccmWindowState,
    },
    Activate,
    SetDesktop {
        desktop: Desktop,
    },
    Close,
    ChangeState {
        action: ToggleAction,
        toggles: [Option<StateToggle>; 2],
    },
}
