use crate::binding::FocusModel;
use crate::binding::KeyBindings;
use crate::binding::KeyCommand;
use crate::border;
use crate::border::BorderAction;
use crate::client::HookPhase;
use crate::client::ManagedClient;
use crate::doubleclick::DoubleClickDetector;
use crate::doubleclick::DOUBLE_CLICK_DELTA;
use crate::registry::ClientRegistry;
use crate::sink::Surfaces;

use winsys::connection::Connection;
use winsys::connection::CursorKind;
use winsys::event::ClientCommand;
use winsys::event::ConfigureChanges;
use winsys::event::Event;
use winsys::event::PropertyKind;
use winsys::event::StateToggle;
use winsys::event::ToggleAction;
use winsys::geometry::Corner;
use winsys::geometry::Dim;
use winsys::geometry::Edge;
use winsys::geometry::Pos;
use winsys::geometry::Region;
use winsys::hints::Desktop;
use winsys::input::Button;
use winsys::input::ButtonEvent;
use winsys::input::ButtonEventKind;
use winsys::input::Grip;
use winsys::input::KeyCode;
use winsys::input::MotionEvent;
use winsys::window::Colormap;
use winsys::window::IcccmWindowState;
use winsys::window::Layer;
use winsys::window::Window;

use std::cell::Cell;
use std::cmp;
use std::rc::Rc;

/// Longest the dispatch loop blocks before yielding to the idle tick.
const EVENT_WAIT_MS: i32 = 1000;

const DESKTOP_COUNT: usize = 4;

const MIN_CLIENT_DIM: Dim = Dim {
    w: 75,
    h: 50,
};

pub struct Model<'a> {
    conn: &'a dyn Connection,
    registry: ClientRegistry,
    surfaces: Surfaces,
    focus_model: FocusModel,
    show_menu_on_root: bool,
    double_click: DoubleClickDetector,
    desktop_count: usize,
    current_desktop: usize,
    active: Option<Window>,
    running: bool,
    restart: bool,
}

impl<'a> Model<'a> {
    pub fn new(
        conn: &'a dyn Connection,
        key_bindings: &KeyBindings,
    ) -> Self {
        Self::init(
            Self {
                conn,
                registry: ClientRegistry::new(),
                surfaces: Surfaces::new(),
                focus_model: FocusModel::Sloppy,
                show_menu_on_root: true,
                double_click: DoubleClickDetector::new(),
                desktop_count: DESKTOP_COUNT,
                current_desktop: 0,
                active: None,
                running: true,
                restart: false,
            },
            key_bindings,
        )
    }

    fn init(
        mut model: Self,
        key_bindings: &KeyBindings,
    ) -> Self {
        info!("initializing window manager");

        model.conn.init_wm_properties(WM_NAME!(), model.desktop_count);
        model.conn.write_current_desktop(0);
        model
            .conn
            .grab_keys(&key_bindings.keys().copied().collect::<Vec<KeyCode>>());

        // adopt windows that predate the manager
        for window in model.conn.top_level_windows() {
            let manageable = model
                .conn
                .window_attributes(window)
                .map_or(false, |attributes| {
                    !attributes.override_redirect && attributes.viewable
                });

            if manageable {
                if let Some(window) = model.manage(window, true) {
                    if let Some(client) = model.registry.get(window) {
                        model.conn.map_window(client.frame());
                    }
                }
            }
        }

        model.restack_clients();
        model.conn.flush();

        model
    }

    pub fn run(
        &mut self,
        mut key_bindings: KeyBindings,
    ) {
        while let Some(event) = self.next_event() {
            self.process_input(event, &mut key_bindings);
            self.conn.flush();
        }

        info!("shutting down window manager");

        self.conn.cleanup();
        self.conn.flush();
    }

    /// Blocks for the next input event. Bookkeeping events are handled
    /// internally, then offered to the UI collaborators; the idle tick
    /// runs at least once a second and once per handled event.
    fn next_event(&mut self) -> Option<Event> {
        loop {
            if !self.running {
                return None;
            }

            let event = match self.conn.poll_event() {
                Some(event) => event,
                None => {
                    if !self.conn.await_event(EVENT_WAIT_MS) {
                        self.surfaces.tick();
                    }

                    continue;
                },
            };

            self.surfaces.tick();
            trace!("received event: {:?}", event);

            let mut handled = self.route(event);

            if !handled {
                handled = self.surfaces.offer(&event);
            }

            handled |= self.surfaces.offer_popups(&event);

            if !handled {
                return Some(event);
            }
        }
    }

    /// Core classification. Input events are left for the command
    /// dispatcher and report unhandled here.
    fn route(
        &mut self,
        event: Event,
    ) -> bool {
        match event {
            // creation alone does not make a window eligible; management
            // starts at the first map request, so creates go to the
            // collaborators that track unmanaged windows
            Event::Create {
                ..
            } => false,
            Event::MapRequest {
                window,
            } => {
                self.handle_map_request(window);
                true
            },
            Event::Unmap {
                window,
            } => {
                self.handle_unmap(window);
                true
            },
            Event::Destroy {
                window,
            } => self.handle_destroy(window),
            Event::ConfigureRequest {
                window,
                changes,
            } => {
                self.handle_configure_request(window, changes);
                true
            },
            Event::Configure {
                window,
                ..
            } => {
                self.handle_configure_notify(window);
                true
            },
            Event::Property {
                window,
                kind,
                on_root,
            } => self.handle_property(window, kind, on_root),
            Event::Command {
                window,
                command,
            } => {
                self.handle_command(window, command);
                true
            },
            Event::ColormapChange {
                window,
                colormap,
                new,
            } => {
                self.handle_colormap(window, colormap, new);
                true
            },
            Event::Expose {
                window,
                count,
            } => self.handle_expose(window, count),
            Event::Shape {
                window,
            } => {
                self.handle_shape(window);
                true
            },
            Event::Button {
                ..
            }
            | Event::Key {
                ..
            }
            | Event::Motion {
                ..
            }
            | Event::Enter {
                ..
            }
            | Event::Leave {
                ..
            } => false,
        }
    }

    fn process_input(
        &mut self,
        event: Event,
        key_bindings: &mut KeyBindings,
    ) {
        match event {
            Event::Button {
                event,
            } => self.handle_button(event),
            Event::Key {
                key_code,
                subwindow,
            } => self.handle_key(key_code, subwindow, key_bindings),
            Event::Motion {
                event,
            } => self.handle_motion(event),
            Event::Enter {
                window,
                pos,
            } => self.handle_enter(window, pos),
            Event::Leave {
                window,
            } => self.handle_leave(window),
            _ => {},
        }
    }

    pub fn exit(&mut self) {
        info!("exit requested");
        self.running = false;
    }

    pub fn restart(&mut self) {
        info!("restart requested");
        self.restart = true;
        self.running = false;
    }

    #[inline]
    pub fn must_restart(&self) -> bool {
        self.restart
    }

    #[inline]
    pub fn set_show_menu_on_root(
        &mut self,
        show: bool,
    ) {
        self.show_menu_on_root = show;
    }

    #[inline]
    pub fn set_focus_model(
        &mut self,
        focus_model: FocusModel,
    ) {
        self.focus_model = focus_model;
    }

    #[inline]
    pub fn surfaces_mut(&mut self) -> &mut Surfaces {
        &mut self.surfaces
    }

    // Registration

    fn manage(
        &mut self,
        window: Window,
        already_mapped: bool,
    ) -> Option<Window> {
        let attributes = self.conn.window_attributes(window)?;

        if attributes.override_redirect {
            return None;
        }

        self.conn.suspend_event_delivery();
        let result = self.register_client(window, already_mapped);
        self.conn.resume_event_delivery();

        result
    }

    fn register_client(
        &mut self,
        window: Window,
        already_mapped: bool,
    ) -> Option<Window> {
        let geometry = match self.conn.get_window_geometry(window) {
            Ok(geometry) => geometry,
            // destroyed between the event and its processing
            Err(_) => return None,
        };

        let mut state = self.conn.read_state(window, already_mapped);

        if let Desktop::Index(index) = state.desktop {
            if index >= self.desktop_count {
                state.desktop = Desktop::Index(self.current_desktop);
            }
        }

        let name = self.conn.read_name(window);
        let size_hints = self.conn.read_size_hints(window);
        let protocols = self.conn.read_protocols(window);
        let colormap = self.conn.read_colormaps(window).first().copied();

        let geometry = geometry.with_minimum_dim(&MIN_CLIENT_DIM);
        let extents = border::frame_extents(state.border);

        let frame = self.conn.create_frame(Region {
            pos: geometry.pos,
            dim: geometry.dim + extents,
        });

        let client = ManagedClient::new(window, frame, name, geometry, state);
        client.set_size_hints(size_hints);
        client.set_protocols(protocols);
        client.set_colormap(colormap);

        info!("managing client {:#0x}", window);

        self.registry.insert(client);

        self.conn.reparent_window(window, frame, Pos {
            x: extents.left,
            y: extents.top,
        });
        self.conn.write_frame_extents(window, extents);
        self.conn.write_state(window, &state);
        self.conn.grab_buttons(window);
        self.conn.update_client_list(&self.registry.windows());

        self.surfaces.update_taskbar();
        self.surfaces.update_pager();

        Some(window)
    }

    fn remove_client(
        &mut self,
        window: Window,
    ) {
        if let Some(client) = self.registry.get(window) {
            if let Some(mut hook) = client.take_controller() {
                hook(HookPhase::Ending);
            }
        }

        if let Some(client) = self.registry.remove(window) {
            info!("removing client {:#0x}", window);

            self.conn.destroy_window(client.frame());
            self.conn.update_client_list(&self.registry.windows());

            if self.active == Some(window) {
                self.active = None;
                self.conn.unfocus();
            }

            self.surfaces.update_taskbar();
            self.surfaces.update_pager();
        }
    }

    // Event handlers

    fn handle_map_request(
        &mut self,
        window: Window,
    ) {
        debug!("MAP_REQUEST for window {:#0x}", window);

        if self.registry.get(window).is_some() {
            self.restore(window);
            self.restack_clients();
            return;
        }

        if self.manage(window, false).is_some() {
            self.restore(window);
        } else {
            // not manageable; let it map bare rather than dropping it
            self.conn.map_window(window);
        }

        self.restack_clients();
    }

    fn handle_unmap(
        &mut self,
        window: Window,
    ) {
        debug!("UNMAP for window {:#0x}", window);

        let client = match self.registry.get(window) {
            Some(client) => client,
            None => return,
        };

        if client.consume_unmap_if_expecting() {
            return;
        }

        if let Some(mut hook) = client.take_controller() {
            hook(HookPhase::Ending);
        }

        if client.state().status.mapped {
            let frame = client.frame();

            client.with_state(|state| state.status.mapped = false);
            self.conn.unmap_window(frame);
        }
    }

    fn handle_destroy(
        &mut self,
        window: Window,
    ) -> bool {
        debug!("DESTROY for window {:#0x}", window);

        if self.registry.get(window).is_none() {
            return false;
        }

        self.remove_client(window);

        true
    }

    fn handle_configure_request(
        &mut self,
        window: Window,
        changes: ConfigureChanges,
    ) {
        debug!("CONFIGURE_REQUEST for window {:#0x}", window);

        let region = match self.registry.get(window) {
            Some(client) => {
                if let Some(mut hook) = client.take_controller() {
                    hook(HookPhase::Starting);
                }

                let current = client.region();
                let mut region = current;

                if let Some(x) = changes.x {
                    region.pos.x = x;
                }

                if let Some(y) = changes.y {
                    region.pos.y = y;
                }

                if let Some(w) = changes.w {
                    region.dim.w = w;
                }

                if let Some(h) = changes.h {
                    region.dim.h = h;
                }

                if region == current {
                    return;
                }

                Some(region)
            },
            None => None,
        };

        match region {
            Some(region) => {
                self.apply_client_geometry(window, region);
                self.surfaces.update_pager();
            },
            // pass-through for windows not under management
            None => self.conn.configure_window(window, &changes),
        }
    }

    fn handle_configure_notify(
        &mut self,
        window: Window,
    ) {
        if let Some(client) = self.registry.get(window) {
            if client.state().status.shaped {
                self.conn.apply_shape(client.window(), client.frame());
            }
        }
    }

    fn handle_property(
        &mut self,
        window: Window,
        kind: PropertyKind,
        on_root: bool,
    ) -> bool {
        debug!("PROPERTY for window {:#0x} of kind {:?}", window, kind);

        if on_root {
            match kind {
                PropertyKind::ManagerRestart => self.restart(),
                PropertyKind::ManagerExit => self.exit(),
                _ => {},
            }

            return true;
        }

        let is_dialog = match self.registry.get(window) {
            Some(client) => client.state().status.dialog,
            None => return true,
        };

        let mut changed = false;

        match kind {
            PropertyKind::Name => {
                let name = self.conn.read_name(window);

                if let Some(client) = self.registry.get(window) {
                    client.set_name(name);
                    changed = true;
                }
            },
            PropertyKind::NormalHints => {
                let size_hints = self.conn.read_size_hints(window);

                if let Some(client) = self.registry.get(window) {
                    client.set_size_hints(size_hints);
                    changed = true;
                }
            },
            PropertyKind::ColormapWindows => {
                let colormap = self.conn.read_colormaps(window).first().copied();

                if let Some(client) = self.registry.get(window) {
                    client.set_colormap(colormap);
                }

                if let Some(colormap) = colormap {
                    self.conn.install_colormap(colormap);
                }
            },
            _ => {},
        }

        if changed {
            self.surfaces.redraw_frame(window);
            self.surfaces.update_taskbar();
            self.surfaces.update_pager();
        }

        !is_dialog
    }

    fn handle_command(
        &mut self,
        window: Window,
        command: ClientCommand,
    ) {
        debug!("COMMAND for window {:#0x}: {:?}", window, command);

        if self.registry.get(window).is_none() {
            return;
        }

        match command {
            ClientCommand::SetFlags {
                mask,
                values,
            } => {
                if mask.sticky {
                    if values.sticky {
                        self.stick(window);
                    } else {
                        self.unstick(window);
                    }
                }

                if mask.no_list {
                    let persist = self.registry.get(window).map(|client| {
                        client.with_state(|state| state.status.no_list = values.no_list)
                    });

                    if let Some(state) = persist {
                        self.conn.write_state(window, &state);
                        self.surfaces.update_taskbar();
                        self.surfaces.update_pager();
                    }
                }
            },
            ClientCommand::SetLayer {
                layer,
            } => self.set_layer(window, layer),
            ClientCommand::SetLifecycle {
                state,
            } => {
                if let Some(client) = self.registry.get(window) {
                    if let Some(mut hook) = client.take_controller() {
                        hook(HookPhase::Starting);
                    }
                }

                match state {
                    IcccmWindowState::Withdrawn => self.withdraw(window),
                    IcccmWindowState::Iconic => self.minimize(window),
                    IcccmWindowState::Normal => self.restore(window),
                }
            },
            ClientCommand::Activate => {
                self.restore(window);
                self.focus(window);
            },
            ClientCommand::SetDesktop {
                desktop,
            } => match desktop {
                Desktop::All => self.stick(window),
                Desktop::Index(index) => {
                    if index >= self.desktop_count {
                        debug!("desktop {} out of range for window {:#0x}", index, window);
                        return;
                    }

                    if let Some(client) = self.registry.get(window) {
                        if let Some(mut hook) = client.take_controller() {
                            hook(HookPhase::Starting);
                        }
                    }

                    self.set_client_desktop(window, index);
                },
            },
            ClientCommand::Close => self.close_client(window),
            ClientCommand::ChangeState {
                action,
                toggles,
            } => {
                // up to two sub-actions, applied independently
                let mut action_stick = false;
                let mut action_maximize = false;
                let mut action_shade = false;

                for toggle in toggles.iter().flatten() {
                    match toggle {
                        StateToggle::Sticky => action_stick = true,
                        StateToggle::MaximizedHorz | StateToggle::MaximizedVert => {
                            action_maximize = true
                        },
                        StateToggle::Shaded => action_shade = true,
                    }
                }

                let state = match self.registry.get(window) {
                    Some(client) => client.state(),
                    None => return,
                };

                match action {
                    ToggleAction::Remove => {
                        if action_stick {
                            self.unstick(window);
                        }
                        if action_maximize && state.status.is_maximized() {
                            self.maximize(window);
                        }
                        if action_shade {
                            self.unshade(window);
                        }
                    },
                    ToggleAction::Add => {
                        if action_stick {
                            self.stick(window);
                        }
                        if action_maximize && !state.status.is_maximized() {
                            self.maximize(window);
                        }
                        if action_shade {
                            self.shade(window);
                        }
                    },
                    ToggleAction::Toggle => {
                        if action_stick {
                            if state.is_sticky() {
                                self.unstick(window);
                            } else {
                                self.stick(window);
                            }
                        }
                        if action_maximize {
                            self.maximize(window);
                        }
                        if action_shade {
                            if state.status.shaded {
                                self.unshade(window);
                            } else {
                                self.shade(window);
                            }
                        }
                    },
                }
            },
        }
    }

    fn handle_colormap(
        &mut self,
        window: Window,
        colormap: Colormap,
        new: bool,
    ) {
        // only installs of a new colormap are processed by contract
        if !new {
            return;
        }

        if let Some(client) = self.registry.get(window) {
            client.set_colormap(Some(colormap));

            if client.is_active() {
                self.conn.install_colormap(colormap);
            }
        }
    }

    fn handle_expose(
        &mut self,
        window: Window,
        count: u16,
    ) -> bool {
        if count > 0 {
            return true;
        }

        if let Some(window) = self.registry.window_for_frame(window) {
            self.surfaces.redraw_frame(window);
            return true;
        }

        match self.registry.get(window) {
            Some(client) => !client.state().status.dialog,
            None => false,
        }
    }

    fn handle_shape(
        &mut self,
        window: Window,
    ) {
        if let Some(client) = self.registry.get(window) {
            client.with_state(|state| state.status.shaped = true);
            self.conn.apply_shape(client.window(), client.frame());
        }
    }

    // Command dispatch

    fn handle_button(
        &mut self,
        event: ButtonEvent,
    ) {
        if let Some(window) = self.registry.window_for_frame(event.window) {
            if event.kind == ButtonEventKind::Press {
                self.raise_client(window);

                if self.focus_model == FocusModel::Click {
                    self.focus(window);
                }
            }

            match event.button {
                Button::Left => self.dispatch_border_button(window, event),
                Button::Middle => {
                    if event.kind == ButtonEventKind::Press {
                        self.move_client_interactive(window, event.root_pos);
                    }
                },
                Button::Right => {
                    if event.kind == ButtonEventKind::Press {
                        let anchor = match self.registry.get(window) {
                            Some(client) => {
                                let extents = border::frame_extents(client.state().border);
                                let origin = client.region().pos;

                                Pos {
                                    x: origin.x + event.pos.x - extents.left,
                                    y: origin.y + event.pos.y - extents.top,
                                }
                            },
                            None => event.root_pos,
                        };

                        self.surfaces.show_window_menu(window, anchor);
                    }
                },
                _ => {},
            }
        } else if event.on_root {
            if self.show_menu_on_root && event.kind == ButtonEventKind::Press {
                self.surfaces.show_root_menu(event.root_pos);
            }
        } else if self.registry.get(event.window).is_some() {
            let window = event.window;

            match event.button {
                Button::Left | Button::Middle | Button::Right => {
                    self.raise_client(window);

                    if self.focus_model == FocusModel::Click {
                        self.focus(window);
                    }
                },
                _ => {},
            }

            // hand the click back to the application
            self.conn.replay_pointer();
        }

        self.surfaces.update_pager();
    }

    fn dispatch_border_button(
        &mut self,
        window: Window,
        event: ButtonEvent,
    ) {
        let action = match self.registry.get(window) {
            Some(client) => {
                let state = client.state();

                if !state.border.outline {
                    return;
                }

                let frame_dim = client.region().dim + border::frame_extents(state.border);

                border::resolve(state.border, frame_dim, event.pos)
            },
            None => return,
        };

        let press = event.kind == ButtonEventKind::Press;

        match action {
            BorderAction::Resize(grip) => {
                if press {
                    self.resize_client_interactive(window, grip, event.root_pos);
                }
            },
            BorderAction::Move => {
                if press {
                    if self.double_click.is_double(event.time, event.pos) {
                        self.toggle_shade(window);
                        self.double_click.disarm();
                    } else if self.move_client_interactive(window, event.root_pos) {
                        self.double_click.disarm();
                    } else {
                        self.double_click.arm(event.time, event.pos);
                    }
                }
            },
            BorderAction::Close => {
                if !press {
                    self.close_client(window);
                }
            },
            BorderAction::Maximize => {
                if !press {
                    self.maximize(window);
                }
            },
            BorderAction::Minimize => {
                if !press {
                    self.minimize(window);
                }
            },
            BorderAction::None => {},
        }
    }

    fn handle_key(
        &mut self,
        key_code: KeyCode,
        subwindow: Option<Window>,
        key_bindings: &mut KeyBindings,
    ) {
        let target = match self.focus_model {
            FocusModel::Click => subwindow.and_then(|subwindow| {
                self.registry
                    .lookup_any(subwindow)
                    .map(|client| client.window())
            }),
            FocusModel::Sloppy => self.active,
        };

        let command = match key_bindings.get(&key_code) {
            Some(&command) => command,
            None => {
                debug!("unbound key {:?}", key_code);
                return;
            },
        };

        match command {
            KeyCommand::FocusNext => self.focus_next(),
            KeyCommand::Close => {
                if let Some(window) = target {
                    self.close_client(window);
                }
            },
            KeyCommand::ToggleShade => {
                if let Some(window) = target {
                    self.toggle_shade(window);
                }
            },
            KeyCommand::Move => {
                if let Some(window) = target {
                    self.move_client_keyboard(window);
                }
            },
            KeyCommand::Resize => {
                if let Some(window) = target {
                    self.resize_client_keyboard(window);
                }
            },
            KeyCommand::Minimize => {
                if let Some(window) = target {
                    self.minimize(window);
                }
            },
            KeyCommand::Maximize => {
                if let Some(window) = target {
                    self.maximize(window);
                }
            },
            KeyCommand::NextDesktop => {
                let next = (self.current_desktop + 1) % self.desktop_count;
                self.change_current_desktop(next);
            },
            KeyCommand::Desktop(index) => self.change_current_desktop(index),
            KeyCommand::RootMenu => self.surfaces.show_root_menu(Pos::default()),
            KeyCommand::WindowMenu => {
                if let Some(window) = target {
                    let pos = self
                        .registry
                        .get(window)
                        .map_or(Pos::default(), |client| client.region().pos);

                    self.surfaces.show_window_menu(window, pos);
                }
            },
            KeyCommand::Restart => self.restart(),
            KeyCommand::Exit => self.exit(),
        }
    }

    fn handle_motion(
        &mut self,
        event: MotionEvent,
    ) {
        if let Some(window) = self.registry.window_for_frame(event.window) {
            self.update_frame_cursor(window, event.pos, false);
        }
    }

    fn handle_enter(
        &mut self,
        window: Window,
        pos: Pos,
    ) {
        let focus_target = match self.registry.lookup_any(window) {
            Some(client) => {
                if !client.is_active() && self.focus_model == FocusModel::Sloppy {
                    Some(client.window())
                } else {
                    None
                }
            },
            None => return,
        };

        if let Some(target) = focus_target {
            self.focus(target);
        }

        if let Some(window) = self.registry.window_for_frame(window) {
            self.update_frame_cursor(window, pos, true);
        } else if let Some(client) = self.registry.get(window) {
            // back over the content area; the frame cursor is stale
            if client.border_action() != BorderAction::None {
                let frame = client.frame();

                client.set_border_action(BorderAction::None);
                self.conn.define_cursor(frame, CursorKind::Default);
            }
        }
    }

    fn handle_leave(
        &mut self,
        window: Window,
    ) {
        if let Some(client) = self.registry.from_frame(window) {
            let frame = client.frame();

            client.set_border_action(BorderAction::None);
            self.conn.define_cursor(frame, CursorKind::Default);
        }
    }

    fn update_frame_cursor(
        &mut self,
        window: Window,
        pos: Pos,
        force: bool,
    ) {
        let update = match self.registry.get(window) {
            Some(client) => {
                let state = client.state();

                if !state.border.outline {
                    None
                } else {
                    let frame_dim = client.region().dim + border::frame_extents(state.border);
                    let action = border::resolve(state.border, frame_dim, pos);

                    if force || client.border_action() != action {
                        client.set_border_action(action);
                        Some((client.frame(), border::cursor_for(action)))
                    } else {
                        None
                    }
                }
            },
            None => None,
        };

        if let Some((frame, cursor)) = update {
            self.conn.define_cursor(frame, cursor);
        }
    }

    // State machine transitions

    pub fn minimize(
        &mut self,
        window: Window,
    ) {
        let persist = match self.registry.get(window) {
            Some(client) => {
                let (content, frame) = client.windows();

                if client.state().status.mapped {
                    client.expect_unmap();
                    self.conn.unmap_window(content);
                    self.conn.unmap_window(frame);
                }

                Some(client.with_state(|state| {
                    state.status.minimized = true;
                    state.status.mapped = false;
                    state.status.active = false;
                }))
            },
            None => None,
        };

        if let Some(state) = persist {
            self.conn.write_state(window, &state);

            if self.active == Some(window) {
                self.active = None;
                self.conn.unfocus();
            }

            self.surfaces.update_taskbar();
            self.surfaces.update_pager();
        }
    }

    pub fn restore(
        &mut self,
        window: Window,
    ) {
        let restored = match self.registry.get(window) {
            Some(client) => {
                let frame = client.frame();
                let state = client.with_state(|state| {
                    state.status.minimized = false;
                    state.status.withdrawn = false;
                    state.status.mapped = true;
                });

                self.conn.map_window(window);
                self.conn.map_window(frame);
                self.conn.write_state(window, &state);

                true
            },
            None => false,
        };

        if restored {
            self.raise_client(window);

            if self.focus_model == FocusModel::Click {
                self.focus(window);
            }

            self.surfaces.update_taskbar();
            self.surfaces.update_pager();
        }
    }

    pub fn shade(
        &mut self,
        window: Window,
    ) {
        let persist = self
            .registry
            .get(window)
            .map(|client| client.with_state(|state| state.status.shaded = true));

        if let Some(state) = persist {
            self.conn.write_state(window, &state);
            self.surfaces.redraw_frame(window);
        }
    }

    pub fn unshade(
        &mut self,
        window: Window,
    ) {
        let persist = self
            .registry
            .get(window)
            .map(|client| client.with_state(|state| state.status.shaded = false));

        if let Some(state) = persist {
            self.conn.write_state(window, &state);
            self.surfaces.redraw_frame(window);
        }
    }

    pub fn toggle_shade(
        &mut self,
        window: Window,
    ) {
        let shaded = match self.registry.get(window) {
            Some(client) => client.state().status.shaded,
            None => return,
        };

        if shaded {
            self.unshade(window);
        } else {
            self.shade(window);
        }
    }

    /// Both axes toggle together; a second call restores the geometry
    /// remembered by the first.
    pub fn maximize(
        &mut self,
        window: Window,
    ) {
        let (target, maximizing) = match self.registry.get(window) {
            Some(client) => {
                let state = client.state();

                if state.status.is_maximized() {
                    (client.take_saved_region(), false)
                } else {
                    client.set_saved_region(client.region());

                    let extents = border::frame_extents(state.border);
                    let root = self.conn.root_region();

                    (
                        Some(Region {
                            pos: root.pos,
                            dim: root.dim - extents,
                        }),
                        true,
                    )
                }
            },
            None => return,
        };

        if let Some(region) = target {
            self.apply_client_geometry(window, region);
        }

        let persist = self.registry.get(window).map(|client| {
            client.with_state(|state| {
                state.status.maximized_horz = maximizing;
                state.status.maximized_vert = maximizing;
            })
        });

        if let Some(state) = persist {
            self.conn.write_state(window, &state);
            self.surfaces.redraw_frame(window);
            self.surfaces.update_pager();
        }
    }

    pub fn stick(
        &mut self,
        window: Window,
    ) {
        let update = self.registry.get(window).map(|client| {
            (
                client.frame(),
                client.with_state(|state| state.desktop = Desktop::All),
            )
        });

        if let Some((frame, state)) = update {
            self.conn.write_state(window, &state);

            // sticky clients are visible wherever the manager is
            if state.status.mapped {
                self.conn.map_window(frame);
            }

            self.surfaces.update_taskbar();
            self.surfaces.update_pager();
        }
    }

    pub fn unstick(
        &mut self,
        window: Window,
    ) {
        let current = self.current_desktop;
        let persist = self
            .registry
            .get(window)
            .map(|client| client.with_state(|state| state.desktop = Desktop::Index(current)));

        if let Some(state) = persist {
            self.conn.write_state(window, &state);
            self.surfaces.update_taskbar();
            self.surfaces.update_pager();
        }
    }

    fn set_client_desktop(
        &mut self,
        window: Window,
        index: usize,
    ) {
        let update = self.registry.get(window).map(|client| {
            (
                client.frame(),
                client.with_state(|state| state.desktop = Desktop::Index(index)),
            )
        });

        if let Some((frame, state)) = update {
            self.conn.write_state(window, &state);

            if state.status.mapped {
                if index == self.current_desktop {
                    self.conn.map_window(frame);
                } else {
                    self.conn.unmap_window(frame);
                }
            }

            self.surfaces.update_taskbar();
            self.surfaces.update_pager();
        }
    }

    pub fn withdraw(
        &mut self,
        window: Window,
    ) {
        let persist = match self.registry.get(window) {
            Some(client) => {
                let (content, frame) = client.windows();

                if client.state().status.mapped {
                    client.expect_unmap();
                    self.conn.unmap_window(content);
                    self.conn.unmap_window(frame);
                }

                Some(client.with_state(|state| {
                    state.status.withdrawn = true;
                    state.status.mapped = false;
                    state.status.active = false;
                }))
            },
            None => None,
        };

        if let Some(state) = persist {
            self.conn.write_state(window, &state);

            if self.active == Some(window) {
                self.active = None;
                self.conn.unfocus();
            }

            self.surfaces.update_taskbar();
            self.surfaces.update_pager();
        }
    }

    pub fn set_layer(
        &mut self,
        window: Window,
        layer: Layer,
    ) {
        let persist = self
            .registry
            .get(window)
            .map(|client| client.with_state(|state| state.layer = layer));

        if let Some(state) = persist {
            self.conn.write_state(window, &state);
            self.restack_clients();
        }
    }

    pub fn close_client(
        &mut self,
        window: Window,
    ) {
        let protocols = match self.registry.get(window) {
            Some(client) => client.protocols(),
            None => return,
        };

        if protocols.delete_window {
            self.conn.close_window(window);
        } else {
            self.conn.kill_window(window);
        }
    }

    pub fn focus(
        &mut self,
        window: Window,
    ) {
        if self.active == Some(window) || self.registry.get(window).is_none() {
            return;
        }

        if let Some(previous) = self.active.take() {
            if let Some(client) = self.registry.get(previous) {
                client.with_state(|state| state.status.active = false);
            }

            self.surfaces.redraw_frame(previous);
        }

        let colormap = match self.registry.get(window) {
            Some(client) => {
                client.with_state(|state| state.status.active = true);
                client.colormap()
            },
            None => None,
        };

        self.active = Some(window);
        self.conn.focus_window(window);

        if let Some(colormap) = colormap {
            self.conn.install_colormap(colormap);
        }

        self.surfaces.redraw_frame(window);
        self.surfaces.update_taskbar();
    }

    pub fn focus_next(&mut self) {
        let current = self.current_desktop;
        let candidates: Vec<Window> = self
            .registry
            .windows()
            .into_iter()
            .filter(|&window| {
                self.registry.get(window).map_or(false, |client| {
                    let state = client.state();

                    state.status.mapped
                        && !state.status.no_list
                        && (state.is_sticky() || state.desktop.index() == Some(current))
                })
            })
            .collect();

        if candidates.is_empty() {
            return;
        }

        let next = self
            .active
            .and_then(|active| candidates.iter().position(|&window| window == active))
            .map_or(candidates[0], |index| {
                candidates[(index + 1) % candidates.len()]
            });

        self.raise_client(next);
        self.focus(next);
    }

    pub fn raise_client(
        &mut self,
        window: Window,
    ) {
        if let Some(client) = self.registry.get(window) {
            self.conn.raise_window(client.frame());
        }
    }

    pub fn change_current_desktop(
        &mut self,
        index: usize,
    ) {
        if index >= self.desktop_count {
            debug!("desktop {} out of range", index);
            return;
        }

        if index == self.current_desktop {
            return;
        }

        self.current_desktop = index;

        for window in self.registry.windows() {
            let visibility = self.registry.get(window).map(|client| {
                let state = client.state();

                (
                    client.frame(),
                    state.status.mapped,
                    state.is_sticky() || state.desktop.index() == Some(index),
                )
            });

            if let Some((frame, mapped, visible)) = visibility {
                if mapped {
                    if visible {
                        self.conn.map_window(frame);
                    } else {
                        self.conn.unmap_window(frame);
                    }
                }
            }
        }

        self.conn.write_current_desktop(index);
        self.surfaces.update_taskbar();
        self.surfaces.update_pager();
    }

    /// Re-apply the layer order: higher layers stacked above lower ones,
    /// id order within a layer.
    fn restack_clients(&mut self) {
        let mut frames: Vec<(usize, Window, Window)> = self
            .registry
            .windows()
            .into_iter()
            .filter_map(|window| {
                self.registry
                    .get(window)
                    .map(|client| (client.state().layer.index(), window, client.frame()))
            })
            .collect();

        frames.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let mut previous: Option<Window> = None;

        for (_, _, frame) in frames {
            match previous {
                None => self.conn.raise_window(frame),
                Some(sibling) => self.conn.stack_window_below(frame, Some(sibling)),
            }

            previous = Some(frame);
        }
    }

    /// Reconfigure decoration and content so the content never exceeds
    /// the frame after any single step: shrink content first, then fit
    /// the frame, then grow content to its final size.
    fn apply_client_geometry(
        &mut self,
        window: Window,
        region: Region,
    ) {
        let (frame, old, extents) = match self.registry.get(window) {
            Some(client) => (
                client.frame(),
                client.region(),
                border::frame_extents(client.state().border),
            ),
            None => return,
        };

        let inner_pos = Pos {
            x: extents.left,
            y: extents.top,
        };

        let clamped = Dim {
            w: cmp::min(old.dim.w, region.dim.w),
            h: cmp::min(old.dim.h, region.dim.h),
        };

        if clamped != old.dim {
            self.conn.move_resize_window(window, Region {
                pos: inner_pos,
                dim: clamped,
            });
        }

        self.conn.move_resize_window(frame, Region {
            pos: region.pos,
            dim: region.dim + extents,
        });

        if clamped != region.dim {
            self.conn.move_resize_window(window, Region {
                pos: inner_pos,
                dim: region.dim,
            });
        }

        if let Some(client) = self.registry.get(window) {
            client.set_region(region);
        }
    }

    // Interactive move/resize pumps. These own the pointer until the
    // button is released; bookkeeping events keep flowing through the
    // ordinary handlers, and the client's transition hook cancels the
    // pump if the client goes away mid-drag.

    fn next_pump_event(&mut self) -> Option<Event> {
        loop {
            if !self.running {
                return None;
            }

            match self.conn.poll_event() {
                Some(event) => return Some(event),
                None => {
                    if !self.conn.await_event(EVENT_WAIT_MS) {
                        self.surfaces.tick();
                    }
                },
            }
        }
    }

    /// Returns true when an actual drag happened; a press-release
    /// within the click tolerance is a plain click.
    pub fn move_client_interactive(
        &mut self,
        window: Window,
        start: Pos,
    ) -> bool {
        let origin = match self.registry.get(window) {
            Some(client) => client.region().pos,
            None => return false,
        };

        let cancelled = Rc::new(Cell::new(false));

        if let Some(client) = self.registry.get(window) {
            let flag = Rc::clone(&cancelled);

            client.set_controller(Box::new(move |_phase| flag.set(true)));
            self.conn.grab_pointer(client.frame());
        }

        let mut moved = false;

        while !cancelled.get() {
            let event = match self.next_pump_event() {
                Some(event) => event,
                None => break,
            };

            match event {
                Event::Button {
                    event,
                } => {
                    if event.kind == ButtonEventKind::Release {
                        break;
                    }
                },
                Event::Motion {
                    event,
                } => {
                    let delta = event.root_pos - start;

                    if !moved
                        && (delta.x.abs() > DOUBLE_CLICK_DELTA
                            || delta.y.abs() > DOUBLE_CLICK_DELTA)
                    {
                        moved = true;
                    }

                    if moved {
                        let dim = match self.registry.get(window) {
                            Some(client) => client.region().dim,
                            None => break,
                        };

                        self.apply_client_geometry(window, Region {
                            pos: origin + delta,
                            dim,
                        });
                    }
                },
                Event::Enter {
                    ..
                }
                | Event::Leave {
                    ..
                }
                | Event::Key {
                    ..
                } => {},
                other => {
                    self.route(other);
                },
            }
        }

        self.conn.release_pointer();

        if let Some(client) = self.registry.get(window) {
            drop(client.take_controller());
        }

        self.surfaces.update_pager();

        moved
    }

    pub fn resize_client_interactive(
        &mut self,
        window: Window,
        grip: Grip,
        start: Pos,
    ) {
        let initial = match self.registry.get(window) {
            Some(client) => client.region(),
            None => return,
        };

        let cancelled = Rc::new(Cell::new(false));

        if let Some(client) = self.registry.get(window) {
            let flag = Rc::clone(&cancelled);

            client.set_controller(Box::new(move |_phase| flag.set(true)));
            self.conn.grab_pointer(client.frame());
        }

        while !cancelled.get() {
            let event = match self.next_pump_event() {
                Some(event) => event,
                None => break,
            };

            match event {
                Event::Button {
                    event,
                } => {
                    if event.kind == ButtonEventKind::Release {
                        break;
                    }
                },
                Event::Motion {
                    event,
                } => {
                    let delta = event.root_pos - start;
                    let region = self.constrain_region(window, resize_region(initial, grip, delta));

                    self.apply_client_geometry(window, region);
                },
                Event::Enter {
                    ..
                }
                | Event::Leave {
                    ..
                }
                | Event::Key {
                    ..
                } => {},
                other => {
                    self.route(other);
                },
            }
        }

        self.conn.release_pointer();

        if let Some(client) = self.registry.get(window) {
            drop(client.take_controller());
        }

        self.surfaces.update_pager();
    }

    pub fn move_client_keyboard(
        &mut self,
        window: Window,
    ) {
        let start = match self.registry.get(window) {
            Some(client) => {
                let region = client.region();
                let center = Pos {
                    x: region.dim.w / 2,
                    y: region.dim.h / 2,
                };

                self.conn.warp_pointer(client.frame(), center);

                region.pos + center
            },
            None => return,
        };

        self.move_client_interactive(window, start);
    }

    pub fn resize_client_keyboard(
        &mut self,
        window: Window,
    ) {
        let start = match self.registry.get(window) {
            Some(client) => {
                let region = client.region();
                let extents = border::frame_extents(client.state().border);
                let corner = Pos {
                    x: region.dim.w + extents.left + extents.right,
                    y: region.dim.h + extents.top + extents.bottom,
                };

                self.conn.warp_pointer(client.frame(), corner);

                region.pos + corner
            },
            None => return,
        };

        self.resize_client_interactive(window, Grip::Corner(Corner::BottomRight), start);
    }

    fn constrain_region(
        &self,
        window: Window,
        region: Region,
    ) -> Region {
        let mut region = region.with_minimum_dim(&MIN_CLIENT_DIM);

        if let Some(client) = self.registry.get(window) {
            if let Some(size_hints) = client.size_hints() {
                size_hints.apply(&mut region.dim);
            }
        }

        region
    }
}

fn resize_region(
    initial: Region,
    grip: Grip,
    delta: Pos,
) -> Region {
    let mut region = initial;

    let stretch_right = matches!(
        grip,
        Grip::Edge(Edge::Right) | Grip::Corner(Corner::TopRight) | Grip::Corner(Corner::BottomRight)
    );
    let stretch_bottom = matches!(
        grip,
        Grip::Edge(Edge::Bottom)
            | Grip::Corner(Corner::BottomLeft)
            | Grip::Corner(Corner::BottomRight)
    );

    if grip.is_left_grip() {
        region.pos.x += delta.x;
        region.dim.w -= delta.x;
    } else if stretch_right {
        region.dim.w += delta.x;
    }

    if grip.is_top_grip() {
        region.pos.y += delta.y;
        region.dim.h -= delta.y;
    } else if stretch_bottom {
        region.dim.h += delta.y;
    }

    region
}

#[cfg(test)]
mod tests {
    use super::*;

    use winsys::connection::WindowAttributes;
    use winsys::geometry::Extents;
    use winsys::hints::ClientState;
    use winsys::hints::Protocols;
    use winsys::hints::SizeHints;
    use winsys::time::TimeSample;
    use winsys::Result;

    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        MoveResize(Window, Region),
        Map(Window),
        Unmap(Window),
        Destroy(Window),
        Raise(Window),
        Focus(Window),
        Unfocus,
        CloseProtocol(Window),
        Kill(Window),
        WriteState(Window),
        Replay,
    }

    struct MockConnection {
        calls: RefCell<Vec<Call>>,
        script: RefCell<VecDeque<Event>>,
        geometries: RefCell<HashMap<Window, Region>>,
        states: RefCell<HashMap<Window, ClientState>>,
        next_frame: Cell<Window>,
    }

    impl MockConnection {
        fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                script: RefCell::new(VecDeque::new()),
                geometries: RefCell::new(HashMap::new()),
                states: RefCell::new(HashMap::new()),
                next_frame: Cell::new(0xF000),
            }
        }

        fn add_window(
            &self,
            window: Window,
            region: Region,
        ) {
            self.geometries.borrow_mut().insert(window, region);
        }

        fn push_event(
            &self,
            event: Event,
        ) {
            self.script.borrow_mut().push_back(event);
        }

        fn record(
            &self,
            call: Call,
        ) {
            self.calls.borrow_mut().push(call);
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }

        fn clear_calls(&self) {
            self.calls.borrow_mut().clear();
        }
    }

    impl Connection for MockConnection {
        fn poll_event(&self) -> Option<Event> {
            self.script.borrow_mut().pop_front()
        }

        fn await_event(
            &self,
            _timeout_ms: i32,
        ) -> bool {
            panic!("event pump starved: test script exhausted");
        }

        fn flush(&self) -> bool {
            true
        }

        fn suspend_event_delivery(&self) {}

        fn resume_event_delivery(&self) {}

        fn root_region(&self) -> Region {
            Region::new(0, 0, 1280, 800)
        }

        fn top_level_windows(&self) -> Vec<Window> {
            Vec::new()
        }

        fn window_attributes(
            &self,
            window: Window,
        ) -> Option<WindowAttributes> {
            self.geometries
                .borrow()
                .get(&window)
                .map(|_| WindowAttributes {
                    override_redirect: false,
                    viewable: false,
                })
        }

        fn get_window_geometry(
            &self,
            window: Window,
        ) -> Result<Region> {
            self.geometries
                .borrow()
                .get(&window)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("no such window"))
        }

        fn warp_pointer(
            &self,
            _window: Window,
            _pos: Pos,
        ) {
        }

        fn init_wm_properties(
            &self,
            _wm_name: &str,
            _desktop_count: usize,
        ) {
        }

        fn cleanup(&self) {}

        fn create_frame(
            &self,
            _region: Region,
        ) -> Window {
            let frame = self.next_frame.get();
            self.next_frame.set(frame + 1);
            frame
        }

        fn destroy_window(
            &self,
            window: Window,
        ) {
            self.record(Call::Destroy(window));
        }

        fn reparent_window(
            &self,
            _window: Window,
            _parent: Window,
            _pos: Pos,
        ) {
        }

        fn map_window(
            &self,
            window: Window,
        ) {
            self.record(Call::Map(window));
        }

        fn unmap_window(
            &self,
            window: Window,
        ) {
            self.record(Call::Unmap(window));
        }

        fn raise_window(
            &self,
            window: Window,
        ) {
            self.record(Call::Raise(window));
        }

        fn stack_window_above(
            &self,
            _window: Window,
            _sibling: Option<Window>,
        ) {
        }

        fn stack_window_below(
            &self,
            _window: Window,
            _sibling: Option<Window>,
        ) {
        }

        fn configure_window(
            &self,
            _window: Window,
            _changes: &ConfigureChanges,
        ) {
        }

        fn move_resize_window(
            &self,
            window: Window,
            region: Region,
        ) {
            self.record(Call::MoveResize(window, region));
        }

        fn focus_window(
            &self,
            window: Window,
        ) {
            self.record(Call::Focus(window));
        }

        fn unfocus(&self) {
            self.record(Call::Unfocus);
        }

        fn define_cursor(
            &self,
            _window: Window,
            _cursor: CursorKind,
        ) {
        }

        fn grab_pointer(
            &self,
            _window: Window,
        ) {
        }

        fn release_pointer(&self) {}

        fn grab_buttons(
            &self,
            _window: Window,
        ) {
        }

        fn replay_pointer(&self) {
            self.record(Call::Replay);
        }

        fn grab_keys(
            &self,
            _key_codes: &[KeyCode],
        ) {
        }

        fn close_window(
            &self,
            window: Window,
        ) -> bool {
            self.record(Call::CloseProtocol(window));
            true
        }

        fn kill_window(
            &self,
            window: Window,
        ) -> bool {
            self.record(Call::Kill(window));
            true
        }

        fn apply_shape(
            &self,
            _window: Window,
            _frame: Window,
        ) {
        }

        fn read_name(
            &self,
            _window: Window,
        ) -> String {
            "client".to_owned()
        }

        fn read_size_hints(
            &self,
            _window: Window,
        ) -> Option<SizeHints> {
            None
        }

        fn read_protocols(
            &self,
            _window: Window,
        ) -> Protocols {
            Protocols::default()
        }

        fn read_colormaps(
            &self,
            _window: Window,
        ) -> Vec<Colormap> {
            Vec::new()
        }

        fn read_layer(
            &self,
            _window: Window,
        ) -> Option<Layer> {
            None
        }

        fn read_state(
            &self,
            window: Window,
            already_mapped: bool,
        ) -> ClientState {
            let mut state = self
                .states
                .borrow()
                .get(&window)
                .copied()
                .unwrap_or_default();
            state.status.mapped = already_mapped;
            state
        }

        fn write_state(
            &self,
            window: Window,
            state: &ClientState,
        ) {
            self.states.borrow_mut().insert(window, *state);
            self.record(Call::WriteState(window));
        }

        fn write_frame_extents(
            &self,
            _window: Window,
            _extents: Extents,
        ) {
        }

        fn write_current_desktop(
            &self,
            _index: usize,
        ) {
        }

        fn update_client_list(
            &self,
            _clients: &[Window],
        ) {
        }

        fn install_colormap(
            &self,
            _colormap: Colormap,
        ) {
        }
    }

    const WINDOW: Window = 0x100;

    fn mapped_model<'a>(conn: &'a MockConnection) -> Model<'a> {
        conn.add_window(WINDOW, Region::new(30, 40, 200, 150));

        let bindings = KeyBindings::new();
        let mut model = Model::new(conn, &bindings);

        model.handle_map_request(WINDOW);
        conn.clear_calls();

        model
    }

    fn press(
        window: Window,
        pos: Pos,
        ms: u64,
    ) -> ButtonEvent {
        ButtonEvent {
            kind: ButtonEventKind::Press,
            button: Button::Left,
            window,
            subwindow: None,
            on_root: false,
            pos,
            root_pos: pos,
            time: TimeSample {
                seconds: ms / 1000,
                ms: (ms % 1000) as u16,
            },
        }
    }

    fn release_event() -> Event {
        Event::Button {
            event: ButtonEvent {
                kind: ButtonEventKind::Release,
                button: Button::Left,
                window: 0,
                subwindow: None,
                on_root: false,
                pos: Pos::default(),
                root_pos: Pos::default(),
                time: TimeSample::ZERO,
            },
        }
    }

    #[test]
    fn registration_resolves_both_ids_to_one_entity() {
        let conn = MockConnection::new();
        let model = mapped_model(&conn);

        let client = model.registry.get(WINDOW).unwrap();
        let frame = client.frame();

        assert!(model.registry.from_frame(frame).unwrap() == client);
        assert!(client.state().status.mapped);
        assert_eq!(client.region(), Region::new(30, 40, 200, 150));
    }

    #[test]
    fn unmanageable_map_request_maps_the_window_bare() {
        let conn = MockConnection::new();
        let bindings = KeyBindings::new();
        let mut model = Model::new(&conn, &bindings);

        // no geometry registered: the window vanished mid-flight
        model.handle_map_request(0x999);

        assert!(model.registry.is_empty());
        assert!(conn.calls().contains(&Call::Map(0x999)));
    }

    #[test]
    fn maximize_is_an_involution() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        let before = model.registry.get(WINDOW).unwrap().region();

        model.maximize(WINDOW);

        let state = model.registry.get(WINDOW).unwrap().state();
        assert!(state.status.maximized_horz);
        assert!(state.status.maximized_vert);
        assert_ne!(model.registry.get(WINDOW).unwrap().region(), before);

        model.maximize(WINDOW);

        let state = model.registry.get(WINDOW).unwrap().state();
        assert!(!state.status.is_maximized());
        assert_eq!(model.registry.get(WINDOW).unwrap().region(), before);
    }

    /// Replays the recorded reconfiguration steps, asserting that the
    /// content never exceeds the frame interior after any of them.
    fn assert_content_within_frame(
        calls: &[Call],
        frame: Window,
        initial_content: Dim,
        initial_frame: Dim,
        extents: Extents,
    ) {
        let mut content = initial_content;
        let mut frame_dim = initial_frame;

        for call in calls {
            if let Call::MoveResize(window, region) = call {
                if *window == frame {
                    frame_dim = region.dim;
                } else if *window == WINDOW {
                    content = region.dim;
                }

                assert!(
                    content.w + extents.left + extents.right <= frame_dim.w
                        && content.h + extents.top + extents.bottom <= frame_dim.h,
                    "content {:?} exceeds frame {:?} after {:?}",
                    content,
                    frame_dim,
                    call
                );
            }
        }
    }

    #[test]
    fn enlarging_configure_request_resizes_frame_before_content() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        let client = model.registry.get(WINDOW).unwrap();
        let frame = client.frame();
        let extents = border::frame_extents(client.state().border);

        model.handle_configure_request(WINDOW, ConfigureChanges {
            w: Some(400),
            h: Some(300),
            ..Default::default()
        });

        let moves: Vec<Call> = conn
            .calls()
            .into_iter()
            .filter(|call| matches!(call, Call::MoveResize(..)))
            .collect();

        assert_eq!(moves.len(), 2);
        assert!(matches!(moves[0], Call::MoveResize(window, _) if window == frame));
        assert!(matches!(moves[1], Call::MoveResize(window, _) if window == WINDOW));

        assert_content_within_frame(
            &moves,
            frame,
            Dim {
                w: 200,
                h: 150,
            },
            Dim {
                w: 200,
                h: 150,
            } + extents,
            extents,
        );

        assert_eq!(
            model.registry.get(WINDOW).unwrap().region(),
            Region::new(30, 40, 400, 300)
        );
    }

    #[test]
    fn shrinking_configure_request_resizes_content_before_frame() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        let client = model.registry.get(WINDOW).unwrap();
        let frame = client.frame();
        let extents = border::frame_extents(client.state().border);

        model.handle_configure_request(WINDOW, ConfigureChanges {
            w: Some(100),
            h: Some(80),
            ..Default::default()
        });

        let moves: Vec<Call> = conn
            .calls()
            .into_iter()
            .filter(|call| matches!(call, Call::MoveResize(..)))
            .collect();

        assert_eq!(moves.len(), 2);
        assert!(matches!(moves[0], Call::MoveResize(window, _) if window == WINDOW));
        assert!(matches!(moves[1], Call::MoveResize(window, _) if window == frame));

        assert_content_within_frame(
            &moves,
            frame,
            Dim {
                w: 200,
                h: 150,
            },
            Dim {
                w: 200,
                h: 150,
            } + extents,
            extents,
        );
    }

    #[test]
    fn mixed_configure_request_keeps_content_within_frame() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        let client = model.registry.get(WINDOW).unwrap();
        let frame = client.frame();
        let extents = border::frame_extents(client.state().border);

        // wider but shorter
        model.handle_configure_request(WINDOW, ConfigureChanges {
            w: Some(400),
            h: Some(80),
            ..Default::default()
        });

        assert_content_within_frame(
            &conn.calls(),
            frame,
            Dim {
                w: 200,
                h: 150,
            },
            Dim {
                w: 200,
                h: 150,
            } + extents,
            extents,
        );
    }

    #[test]
    fn identical_configure_request_changes_nothing() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        model.handle_configure_request(WINDOW, ConfigureChanges {
            x: Some(30),
            y: Some(40),
            w: Some(200),
            h: Some(150),
            ..Default::default()
        });

        assert!(conn
            .calls()
            .iter()
            .all(|call| !matches!(call, Call::MoveResize(..))));
    }

    #[test]
    fn desktop_assignment_one_past_the_end_is_rejected() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        model.set_client_desktop(WINDOW, 1);

        model.handle_command(WINDOW, ClientCommand::SetDesktop {
            desktop: Desktop::Index(DESKTOP_COUNT),
        });

        assert_eq!(
            model.registry.get(WINDOW).unwrap().state().desktop,
            Desktop::Index(1)
        );
    }

    #[test]
    fn desktop_assignment_clears_stickiness() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        model.stick(WINDOW);
        assert!(model.registry.get(WINDOW).unwrap().state().is_sticky());

        model.handle_command(WINDOW, ClientCommand::SetDesktop {
            desktop: Desktop::Index(2),
        });

        let state = model.registry.get(WINDOW).unwrap().state();
        assert!(!state.is_sticky());
        assert_eq!(state.desktop, Desktop::Index(2));
    }

    #[test]
    fn controller_fires_exactly_once_across_destroy_and_late_unmap() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        let fired = Rc::new(Cell::new(0u32));
        let observed = Rc::new(Cell::new(None));

        {
            let fired = Rc::clone(&fired);
            let observed = Rc::clone(&observed);

            model
                .registry
                .get(WINDOW)
                .unwrap()
                .set_controller(Box::new(move |phase| {
                    fired.set(fired.get() + 1);
                    observed.set(Some(phase));
                }));
        }

        assert!(model.handle_destroy(WINDOW));
        model.handle_unmap(WINDOW);

        assert_eq!(fired.get(), 1);
        assert_eq!(observed.get(), Some(HookPhase::Ending));
        assert!(model.registry.is_empty());
    }

    #[test]
    fn client_unmap_fires_the_hook_and_unmaps_the_frame() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        let frame = model.registry.get(WINDOW).unwrap().frame();
        let fired = Rc::new(Cell::new(0u32));

        {
            let fired = Rc::clone(&fired);

            model
                .registry
                .get(WINDOW)
                .unwrap()
                .set_controller(Box::new(move |_| fired.set(fired.get() + 1)));
        }

        model.handle_unmap(WINDOW);

        assert_eq!(fired.get(), 1);
        assert!(!model.registry.get(WINDOW).unwrap().state().status.mapped);
        assert!(conn.calls().contains(&Call::Unmap(frame)));
    }

    #[test]
    fn self_induced_unmaps_are_consumed_silently() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        model.minimize(WINDOW);
        conn.clear_calls();

        // the server echoes the unmap we caused
        model.handle_unmap(WINDOW);

        assert!(conn.calls().is_empty());
        assert!(model.registry.get(WINDOW).unwrap().state().status.minimized);
    }

    #[test]
    fn minimize_then_restore_round_trips_visibility() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        let frame = model.registry.get(WINDOW).unwrap().frame();

        model.minimize(WINDOW);

        let state = model.registry.get(WINDOW).unwrap().state();
        assert!(state.status.minimized);
        assert!(!state.status.mapped);
        assert!(conn.calls().contains(&Call::Unmap(WINDOW)));
        assert!(conn.calls().contains(&Call::Unmap(frame)));

        conn.clear_calls();
        model.restore(WINDOW);

        let state = model.registry.get(WINDOW).unwrap().state();
        assert!(!state.status.minimized);
        assert!(!state.status.withdrawn);
        assert!(state.status.mapped);
        assert!(conn.calls().contains(&Call::Map(WINDOW)));
        assert!(conn.calls().contains(&Call::Map(frame)));
    }

    #[test]
    fn withdraw_keeps_the_client_registered() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        model.withdraw(WINDOW);

        let state = model.registry.get(WINDOW).unwrap().state();
        assert!(state.status.withdrawn);
        assert!(!state.status.mapped);
        assert_eq!(model.registry.len(), 1);
    }

    #[test]
    fn double_click_on_the_title_toggles_shade() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        let frame = model.registry.get(WINDOW).unwrap().frame();
        let title_pos = Pos {
            x: 100,
            y: 10,
        };

        // first press starts a move pump that ends as a pure click
        conn.push_event(release_event());
        model.handle_button(press(frame, title_pos, 1000));

        assert!(!model.registry.get(WINDOW).unwrap().state().status.shaded);

        // second press nearby and in time: shade instead of move
        model.handle_button(press(
            frame,
            Pos {
                x: 102,
                y: 11,
            },
            1200,
        ));

        assert!(model.registry.get(WINDOW).unwrap().state().status.shaded);
    }

    #[test]
    fn slow_presses_each_start_their_own_move() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        let frame = model.registry.get(WINDOW).unwrap().frame();
        let title_pos = Pos {
            x: 100,
            y: 10,
        };

        conn.push_event(release_event());
        model.handle_button(press(frame, title_pos, 1000));

        // well past the double-click window: another plain click
        conn.push_event(release_event());
        model.handle_button(press(frame, title_pos, 3000));

        assert!(!model.registry.get(WINDOW).unwrap().state().status.shaded);
    }

    #[test]
    fn completed_drag_disarms_the_double_click() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        let frame = model.registry.get(WINDOW).unwrap().frame();
        let title_pos = Pos {
            x: 100,
            y: 10,
        };

        // drag past the click tolerance before releasing
        conn.push_event(Event::Motion {
            event: MotionEvent {
                window: frame,
                on_root: false,
                pos: title_pos,
                root_pos: Pos {
                    x: 150,
                    y: 60,
                },
            },
        });
        conn.push_event(release_event());
        model.handle_button(press(frame, title_pos, 1000));

        assert_eq!(
            model.registry.get(WINDOW).unwrap().region().pos,
            Pos {
                x: 30 + 50,
                y: 40 + 50,
            }
        );

        // a quick second press is not a double-click after a drag
        conn.push_event(release_event());
        model.handle_button(press(frame, title_pos, 1100));

        assert!(!model.registry.get(WINDOW).unwrap().state().status.shaded);
    }

    #[test]
    fn content_clicks_raise_and_replay() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        let frame = model.registry.get(WINDOW).unwrap().frame();

        let mut event = press(WINDOW, Pos::default(), 0);
        event.on_root = false;
        model.handle_button(event);

        assert!(conn.calls().contains(&Call::Raise(frame)));
        assert!(conn.calls().contains(&Call::Replay));
    }

    #[test]
    fn close_uses_the_delete_protocol_when_offered() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        model.close_client(WINDOW);
        assert!(conn.calls().contains(&Call::Kill(WINDOW)));

        model.registry.get(WINDOW).unwrap().set_protocols(Protocols {
            delete_window: true,
            take_focus: false,
        });

        conn.clear_calls();
        model.close_client(WINDOW);

        assert!(conn.calls().contains(&Call::CloseProtocol(WINDOW)));
        assert!(!conn.calls().contains(&Call::Kill(WINDOW)));
    }

    #[test]
    fn desktop_switch_hides_and_shows_the_right_frames() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        conn.add_window(0x300, Region::new(0, 0, 100, 100));
        model.handle_map_request(0x300);
        model.set_client_desktop(0x300, 1);

        let frame_a = model.registry.get(WINDOW).unwrap().frame();
        let frame_b = model.registry.get(0x300).unwrap().frame();

        conn.clear_calls();
        model.change_current_desktop(1);

        assert!(conn.calls().contains(&Call::Unmap(frame_a)));
        assert!(conn.calls().contains(&Call::Map(frame_b)));

        conn.clear_calls();
        model.change_current_desktop(DESKTOP_COUNT);

        assert!(conn.calls().is_empty());
    }

    #[test]
    fn sticky_clients_survive_desktop_switches() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        model.stick(WINDOW);

        let frame = model.registry.get(WINDOW).unwrap().frame();

        conn.clear_calls();
        model.change_current_desktop(2);

        assert!(!conn.calls().contains(&Call::Unmap(frame)));
    }

    #[test]
    fn state_toggle_message_applies_two_sub_actions_independently() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        model.handle_command(WINDOW, ClientCommand::ChangeState {
            action: ToggleAction::Add,
            toggles: [Some(StateToggle::Sticky), Some(StateToggle::Shaded)],
        });

        let state = model.registry.get(WINDOW).unwrap().state();
        assert!(state.is_sticky());
        assert!(state.status.shaded);

        model.handle_command(WINDOW, ClientCommand::ChangeState {
            action: ToggleAction::Remove,
            toggles: [Some(StateToggle::Sticky), Some(StateToggle::Shaded)],
        });

        let state = model.registry.get(WINDOW).unwrap().state();
        assert!(!state.is_sticky());
        assert!(!state.status.shaded);
    }

    #[test]
    fn both_maximize_toggles_in_one_message_act_once() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        model.handle_command(WINDOW, ClientCommand::ChangeState {
            action: ToggleAction::Toggle,
            toggles: [
                Some(StateToggle::MaximizedHorz),
                Some(StateToggle::MaximizedVert),
            ],
        });

        assert!(model
            .registry
            .get(WINDOW)
            .unwrap()
            .state()
            .status
            .is_maximized());
    }

    #[test]
    fn stale_colormap_notifications_are_ignored() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        model.handle_colormap(WINDOW, 0x42, false);
        assert_eq!(model.registry.get(WINDOW).unwrap().colormap(), None);

        model.handle_colormap(WINDOW, 0x42, true);
        assert_eq!(model.registry.get(WINDOW).unwrap().colormap(), Some(0x42));
    }

    #[test]
    fn click_focus_commands_without_a_target_are_no_ops() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        model.set_focus_model(FocusModel::Click);

        let mut bindings = KeyBindings::new();
        let key_code = KeyCode {
            mask: 0,
            code: 24,
        };
        bindings.insert(key_code, KeyCommand::Close);

        model.handle_key(key_code, None, &mut bindings);

        assert!(conn.calls().is_empty());
    }

    #[test]
    fn focus_cycling_moves_between_mapped_clients() {
        let conn = MockConnection::new();
        let mut model = mapped_model(&conn);

        conn.add_window(0x300, Region::new(0, 0, 100, 100));
        model.handle_map_request(0x300);
        conn.clear_calls();

        model.focus(WINDOW);
        model.focus_next();

        assert_eq!(model.active, Some(0x300));

        model.focus_next();

        assert_eq!(model.active, Some(WINDOW));
    }
}
