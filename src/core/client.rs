use crate::border::BorderAction;

use winsys::geometry::Region;
use winsys::hints::ClientState;
use winsys::hints::Protocols;
use winsys::hints::SizeHints;
use winsys::window::Colormap;
use winsys::window::Window;

use std::cell::Cell;
use std::cell::RefCell;

/// Phase argument to a client's transition hook: `Starting` announces a
/// state- or geometry-changing operation about to take control of the
/// client, `Ending` that the client is going away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Starting,
    Ending,
}

pub type TransitionHook = Box<dyn FnMut(HookPhase)>;

/// One managed top-level window. The registry is the sole owner; all
/// other code addresses clients by id and re-resolves on every dispatch.
pub struct ManagedClient {
    window: Window,
    frame: Window,
    name: RefCell<String>,
    region: Cell<Region>,
    saved_region: Cell<Option<Region>>,
    state: Cell<ClientState>,
    size_hints: Cell<Option<SizeHints>>,
    protocols: Cell<Protocols>,
    colormap: Cell<Option<Colormap>>,
    border_action: Cell<BorderAction>,
    controller: RefCell<Option<TransitionHook>>,
    expected_unmaps: Cell<u8>,
}

impl ManagedClient {
    pub fn new(
        window: Window,
        frame: Window,
        name: impl Into<String>,
        region: Region,
        state: ClientState,
    ) -> Self {
        Self {
            window,
            frame,
            name: RefCell::new(name.into()),
            region: Cell::new(region),
            saved_region: Cell::new(None),
            state: Cell::new(state),
            size_hints: Cell::new(None),
            protocols: Cell::new(Default::default()),
            colormap: Cell::new(None),
            border_action: Cell::new(Default::default()),
            controller: RefCell::new(None),
            expected_unmaps: Cell::new(0),
        }
    }

    #[inline]
    pub fn window(&self) -> Window {
        self.window
    }

    #[inline]
    pub fn frame(&self) -> Window {
        self.frame
    }

    #[inline]
    pub fn windows(&self) -> (Window, Window) {
        (self.window, self.frame)
    }

    #[inline]
    pub fn set_name(
        &self,
        name: impl Into<String>,
    ) {
        self.name.replace(name.into());
    }

    #[inline]
    pub fn name(&self) -> String {
        self.name.borrow().to_owned()
    }

    #[inline]
    pub fn region(&self) -> Region {
        self.region.get()
    }

    #[inline]
    pub fn set_region(
        &self,
        region: Region,
    ) {
        self.region.set(region);
    }

    #[inline]
    pub fn saved_region(&self) -> Option<Region> {
        self.saved_region.get()
    }

    #[inline]
    pub fn set_saved_region(
        &self,
        region: Region,
    ) {
        self.saved_region.set(Some(region));
    }

    #[inline]
    pub fn take_saved_region(&self) -> Option<Region> {
        self.saved_region.replace(None)
    }

    #[inline]
    pub fn state(&self) -> ClientState {
        self.state.get()
    }

    #[inline]
    pub fn set_state(
        &self,
        state: ClientState,
    ) {
        self.state.set(state);
    }

    /// Update the state in place through a closure; saves the get/set
    /// dance at call sites.
    #[inline]
    pub fn with_state(
        &self,
        update: impl FnOnce(&mut ClientState),
    ) -> ClientState {
        let mut state = self.state.get();
        update(&mut state);
        self.state.set(state);
        state
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state.get().status.active
    }

    #[inline]
    pub fn size_hints(&self) -> Option<SizeHints> {
        self.size_hints.get()
    }

    #[inline]
    pub fn set_size_hints(
        &self,
        size_hints: Option<SizeHints>,
    ) {
        self.size_hints.set(size_hints);
    }

    #[inline]
    pub fn protocols(&self) -> Protocols {
        self.protocols.get()
    }

    #[inline]
    pub fn set_protocols(
        &self,
        protocols: Protocols,
    ) {
        self.protocols.set(protocols);
    }

    #[inline]
    pub fn colormap(&self) -> Option<Colormap> {
        self.colormap.get()
    }

    #[inline]
    pub fn set_colormap(
        &self,
        colormap: Option<Colormap>,
    ) {
        self.colormap.set(colormap);
    }

    #[inline]
    pub fn border_action(&self) -> BorderAction {
        self.border_action.get()
    }

    #[inline]
    pub fn set_border_action(
        &self,
        action: BorderAction,
    ) {
        self.border_action.set(action);
    }

    #[inline]
    pub fn set_controller(
        &self,
        hook: TransitionHook,
    ) {
        self.controller.replace(Some(hook));
    }

    /// The hook is single-shot: taking it transfers the obligation to
    /// call it, so a destroy followed by a late unmap fires it once.
    #[inline]
    pub fn take_controller(&self) -> Option<TransitionHook> {
        self.controller.borrow_mut().take()
    }

    #[inline]
    pub fn expect_unmap(&self) {
        self.expected_unmaps.set(self.expected_unmaps.get() + 1);
    }

    #[inline]
    pub fn consume_unmap_if_expecting(&self) -> bool {
        let expected_unmaps = self.expected_unmaps.get();
        let expecting = expected_unmaps > 0;

        if expecting {
            self.expected_unmaps.set(expected_unmaps - 1);
        }

        expecting
    }
}

impl PartialEq for ManagedClient {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.window == other.window
    }
}

pub struct Hex32(pub u32);

impl std::fmt::Debug for Hex32 {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{:#0x}", &self.0)
    }
}

impl std::fmt::Debug for ManagedClient {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ManagedClient")
            .field("window", &Hex32(self.window))
            .field("frame", &Hex32(self.frame))
            .field("name", &self.name)
            .field("region", &self.region)
            .field("saved_region", &self.saved_region)
            .field("state", &self.state)
            .field("size_hints", &self.size_hints)
            .field("protocols", &self.protocols)
            .field("colormap", &self.colormap)
            .field("border_action", &self.border_action)
            .field("expected_unmaps", &self.expected_unmaps)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use winsys::hints::ClientState;

    fn client() -> ManagedClient {
        ManagedClient::new(
            0x100,
            0x200,
            "client",
            Region::new(0, 0, 100, 100),
            ClientState::default(),
        )
    }

    #[test]
    fn controller_is_single_shot() {
        let client = client();

        client.set_controller(Box::new(|_| {}));

        assert!(client.take_controller().is_some());
        assert!(client.take_controller().is_none());
    }

    #[test]
    fn expected_unmaps_are_consumed_one_by_one() {
        let client = client();

        client.expect_unmap();
        client.expect_unmap();

        assert!(client.consume_unmap_if_expecting());
        assert!(client.consume_unmap_if_expecting());
        assert!(!client.consume_unmap_if_expecting());
    }
}
