use winsys::event::Event;
use winsys::geometry::Pos;
use winsys::window::Window;

/// A UI collaborator (tray, dialog host, swallowed-window host, popup
/// host, decorator). Each is offered first refusal on events the core
/// does not classify, and receives the explicit refresh notifications.
pub trait EventSink {
    /// Returns true when the sink consumed the event.
    fn consume_event(
        &mut self,
        event: &Event,
    ) -> bool;

    /// Periodic idle callback; fires at least once a second.
    fn tick(&mut self) {}

    fn redraw_frame(
        &mut self,
        _window: Window,
    ) {
    }

    fn update_taskbar(&mut self) {}

    fn update_pager(&mut self) {}
}

/// Menu collaborator, anchored near a click.
pub trait MenuHost {
    fn show_root_menu(
        &mut self,
        pos: Pos,
    );

    fn show_window_menu(
        &mut self,
        window: Window,
        pos: Pos,
    );
}

/// The registered collaborators, in first-refusal order. Popup hosts are
/// special: they see every event so transient popups can dismiss on any
/// activity.
pub struct Surfaces {
    handlers: Vec<Box<dyn EventSink>>,
    popups: Vec<Box<dyn EventSink>>,
    menus: Option<Box<dyn MenuHost>>,
}

impl Surfaces {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            popups: Vec::new(),
            menus: None,
        }
    }

    pub fn add_handler(
        &mut self,
        sink: Box<dyn EventSink>,
    ) {
        self.handlers.push(sink);
    }

    pub fn add_popup(
        &mut self,
        sink: Box<dyn EventSink>,
    ) {
        self.popups.push(sink);
    }

    pub fn set_menu_host(
        &mut self,
        menus: Box<dyn MenuHost>,
    ) {
        self.menus = Some(menus);
    }

    pub fn offer(
        &mut self,
        event: &Event,
    ) -> bool {
        for handler in &mut self.handlers {
            if handler.consume_event(event) {
                return true;
            }
        }

        false
    }

    pub fn offer_popups(
        &mut self,
        event: &Event,
    ) -> bool {
        let mut handled = false;

        for popup in &mut self.popups {
            handled |= popup.consume_event(event);
        }

        handled
    }

    pub fn tick(&mut self) {
        for handler in &mut self.handlers {
            handler.tick();
        }

        for popup in &mut self.popups {
            popup.tick();
        }
    }

    pub fn redraw_frame(
        &mut self,
        window: Window,
    ) {
        for handler in &mut self.handlers {
            handler.redraw_frame(window);
        }
    }

    pub fn update_taskbar(&mut self) {
        for handler in &mut self.handlers {
            handler.update_taskbar();
        }
    }

    pub fn update_pager(&mut self) {
        for handler in &mut self.handlers {
            handler.update_pager();
        }
    }

    pub fn show_root_menu(
        &mut self,
        pos: Pos,
    ) {
        if let Some(menus) = &mut self.menus {
            menus.show_root_menu(pos);
        }
    }

    pub fn show_window_menu(
        &mut self,
        window: Window,
        pos: Pos,
    ) {
        if let Some(menus) = &mut self.menus {
            menus.show_window_menu(window, pos);
        }
    }
}
