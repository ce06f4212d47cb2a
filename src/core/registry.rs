use crate::client::ManagedClient;

use winsys::window::Window;

use std::collections::HashMap;

/// Owner of all managed clients, addressable by content-window id and by
/// decoration-window id. Lookups are total; removal is idempotent.
pub struct ClientRegistry {
    client_map: HashMap<Window, ManagedClient>,
    frame_map: HashMap<Window, Window>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            client_map: HashMap::new(),
            frame_map: HashMap::new(),
        }
    }

    #[inline]
    pub fn get(
        &self,
        window: Window,
    ) -> Option<&ManagedClient> {
        self.client_map.get(&window)
    }

    #[inline]
    pub fn from_frame(
        &self,
        frame: Window,
    ) -> Option<&ManagedClient> {
        self.frame_map
            .get(&frame)
            .and_then(|window| self.client_map.get(window))
    }

    #[inline]
    pub fn lookup_any(
        &self,
        id: Window,
    ) -> Option<&ManagedClient> {
        self.get(id).or_else(|| self.from_frame(id))
    }

    #[inline]
    pub fn window_for_frame(
        &self,
        frame: Window,
    ) -> Option<Window> {
        self.frame_map.get(&frame).copied()
    }

    pub fn insert(
        &mut self,
        client: ManagedClient,
    ) {
        self.frame_map.insert(client.frame(), client.window());
        self.client_map.insert(client.window(), client);
    }

    pub fn remove(
        &mut self,
        window: Window,
    ) -> Option<ManagedClient> {
        self.client_map.remove(&window).map(|client| {
            self.frame_map.remove(&client.frame());
            client
        })
    }

    /// Content-window ids of every registered client, in id order.
    pub fn windows(&self) -> Vec<Window> {
        let mut windows: Vec<Window> = self.client_map.keys().copied().collect();
        windows.sort_unstable();
        windows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.client_map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.client_map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use winsys::geometry::Region;
    use winsys::hints::ClientState;

    fn client(
        window: Window,
        frame: Window,
    ) -> ManagedClient {
        ManagedClient::new(
            window,
            frame,
            "client",
            Region::new(0, 0, 100, 100),
            ClientState::default(),
        )
    }

    #[test]
    fn both_ids_resolve_to_the_same_entity() {
        let mut registry = ClientRegistry::new();

        registry.insert(client(0x100, 0x200));
        registry.insert(client(0x300, 0x400));

        let by_window = registry.get(0x100).unwrap();
        let by_frame = registry.from_frame(0x200).unwrap();

        assert!(by_window == by_frame);
        assert_eq!(registry.lookup_any(0x100).unwrap().window(), 0x100);
        assert_eq!(registry.lookup_any(0x200).unwrap().window(), 0x100);
        assert_eq!(registry.window_for_frame(0x400), Some(0x300));
    }

    #[test]
    fn unknown_ids_resolve_to_nothing() {
        let registry = ClientRegistry::new();

        assert!(registry.get(0x1).is_none());
        assert!(registry.from_frame(0x1).is_none());
        assert!(registry.lookup_any(0x1).is_none());
    }

    #[test]
    fn removal_forgets_both_ids_and_is_idempotent() {
        let mut registry = ClientRegistry::new();

        registry.insert(client(0x100, 0x200));

        assert!(registry.remove(0x100).is_some());
        assert!(registry.remove(0x100).is_none());
        assert!(registry.get(0x100).is_none());
        assert!(registry.from_frame(0x200).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn windows_come_back_in_id_order() {
        let mut registry = ClientRegistry::new();

        registry.insert(client(0x300, 0x301));
        registry.insert(client(0x100, 0x101));
        registry.insert(client(0x200, 0x201));

        assert_eq!(registry.windows(), vec![0x100, 0x200, 0x300]);
    }
}
