pub use crate::Result;

use crate::event::ConfigureChanges;
use crate::event::Event;
use crate::geometry::Extents;
use crate::geometry::Pos;
use crate::geometry::Region;
use crate::hints::ClientState;
use crate::hints::Protocols;
use crate::hints::SizeHints;
use crate::input::KeyCode;
use crate::window::Colormap;
use crate::window::Layer;
use crate::window::Window;

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum CursorKind {
    Default,
    Move,
    ResizeNorth,
    ResizeSouth,
    ResizeEast,
    ResizeWest,
    ResizeNorthEast,
    ResizeNorthWest,
    ResizeSouthEast,
    ResizeSouthWest,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WindowAttributes {
    pub override_redirect: bool,
    pub viewable: bool,
}

/// The narrow interface between the dispatch core and the display
/// server. Every method is total from the caller's point of view:
/// display-side failures surface as absent values, never as panics.
pub trait Connection {
    // Event intake
    fn poll_event(&self) -> Option<Event>;
    fn await_event(
        &self,
        timeout_ms: i32,
    ) -> bool;
    fn flush(&self) -> bool;

    // Registration transaction: no events are delivered between suspend
    // and resume, so a first-map race cannot interleave with readback.
    fn suspend_event_delivery(&self);
    fn resume_event_delivery(&self);

    // Environment
    fn root_region(&self) -> Region;
    fn top_level_windows(&self) -> Vec<Window>;
    fn window_attributes(
        &self,
        window: Window,
    ) -> Option<WindowAttributes>;
    fn get_window_geometry(
        &self,
        window: Window,
    ) -> Result<Region>;
    fn warp_pointer(
        &self,
        window: Window,
        pos: Pos,
    );
    fn init_wm_properties(
        &self,
        wm_name: &str,
        desktop_count: usize,
    );
    fn cleanup(&self);

    // Window manipulation
    fn create_frame(
        &self,
        region: Region,
    ) -> Window;
    fn destroy_window(
        &self,
        window: Window,
    );
    fn reparent_window(
        &self,
        window: Window,
        parent: Window,
        pos: Pos,
    );
    fn map_window(
        &self,
        window: Window,
    );
    fn unmap_window(
        &self,
        window: Window,
    );
    fn raise_window(
        &self,
        window: Window,
    );
    fn stack_window_above(
        &self,
        window: Window,
        sibling: Option<Window>,
    );
    fn stack_window_below(
        &self,
        window: Window,
        sibling: Option<Window>,
    );
    fn configure_window(
        &self,
        window: Window,
        changes: &ConfigureChanges,
    );
    fn move_resize_window(
        &self,
        window: Window,
        region: Region,
    );
    fn focus_window(
        &self,
        window: Window,
    );
    fn unfocus(&self);
    fn define_cursor(
        &self,
        window: Window,
        cursor: CursorKind,
    );
    fn grab_pointer(
        &self,
        window: Window,
    );
    fn release_pointer(&self);
    fn grab_buttons(
        &self,
        window: Window,
    );
    fn replay_pointer(&self);
    fn grab_keys(
        &self,
        key_codes: &[KeyCode],
    );
    fn close_window(
        &self,
        window: Window,
    ) -> bool;
    fn kill_window(
        &self,
        window: Window,
    ) -> bool;
    fn apply_shape(
        &self,
        window: Window,
        frame: Window,
    );

    // Hint layer
    fn read_name(
        &self,
        window: Window,
    ) -> String;
    fn read_size_hints(
        &self,
        window: Window,
    ) -> Option<SizeHints>;
    fn read_protocols(
        &self,
        window: Window,
    ) -> Protocols;
    fn read_colormaps(
        &self,
        window: Window,
    ) -> Vec<Colormap>;
    fn read_layer(
        &self,
        window: Window,
    ) -> Option<Layer>;
    fn read_state(
        &self,
        window: Window,
        already_mapped: bool,
    ) -> ClientState;
    fn write_state(
        &self,
        window: Window,
        state: &ClientState,
    );
    fn write_frame_extents(
        &self,
        window: Window,
        extents: Extents,
    );
    fn write_current_desktop(
        &self,
        index: usize,
    );
    fn update_client_list(
        &self,
        clients: &[Window],
    );
    fn install_colormap(
        &self,
        colormap: Colormap,
    );
}
