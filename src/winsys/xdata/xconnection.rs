use crate::connection::Connection;
use crate::connection::CursorKind;
use crate::connection::WindowAttributes;
use crate::event::ClientCommand;
use crate::event::ConfigureChanges;
use crate::event::Event;
use crate::event::PropertyKind;
use crate::event::StackMode;
use crate::event::StateToggle;
use crate::event::ToggleAction;
use crate::event::WinFlags;
use crate::geometry::Extents;
use crate::geometry::Pos;
use crate::geometry::Region;
use crate::hints::ClientState;
use crate::hints::Desktop;
use crate::hints::Protocols;
use crate::hints::SizeHints;
use crate::input::Button;
use crate::input::ButtonEvent;
use crate::input::ButtonEventKind;
use crate::input::KeyCode;
use crate::input::MotionEvent;
use crate::time::TimeSample;
use crate::window::Colormap;
use crate::window::IcccmWindowState;
use crate::window::Layer;
use crate::window::Window;
use crate::Result;

use std::cell::Cell;
use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::os::unix::io::RawFd;

use x11rb::connection;
use x11rb::cursor::Handle as CursorHandle;
use x11rb::errors::ReplyError;
use x11rb::properties;
use x11rb::protocol::shape;
use x11rb::protocol::xproto;
use x11rb::protocol::xproto::ConnectionExt;
use x11rb::protocol::xproto::EventMask;
use x11rb::protocol::xproto::ModMask;
use x11rb::protocol::xproto::CLIENT_MESSAGE_EVENT;
use x11rb::protocol::ErrorKind;
use x11rb::protocol::Event as XEvent;
use x11rb::resource_manager::Database;
use x11rb::wrapper::ConnectionExt as _;

use anyhow::anyhow;
use log::debug;

use nix::poll::poll;
use nix::poll::PollFd;
use nix::poll::PollFlags;

type Atom = u32;

// Legacy WIN_STATE bits still sent by pagers and older toolkits.
const WIN_STATE_STICKY: u32 = 1 << 0;
const WIN_STATE_HIDDEN: u32 = 1 << 4;

// ICCCM WM_STATE / WM_CHANGE_STATE codes.
const ICCCM_WITHDRAWN: u32 = 0;
const ICCCM_NORMAL: u32 = 1;
const ICCCM_ICONIC: u32 = 3;

const ALL_DESKTOPS: u32 = 0xFFFFFFFF;

x11rb::atom_manager! {
    pub Atoms: AtomsCookie {
        Any,
        ATOM,
        CARDINAL,
        WINDOW,
        UTF8_STRING,

        // ICCCM client properties
        WM_NAME,
        WM_NORMAL_HINTS,
        WM_PROTOCOLS,
        WM_DELETE_WINDOW,
        WM_TAKE_FOCUS,
        WM_COLORMAP_WINDOWS,

        // ICCCM window manager properties
        WM_STATE,
        WM_CHANGE_STATE,

        // EWMH root properties
        _NET_SUPPORTED,
        _NET_SUPPORTING_WM_CHECK,
        _NET_CLIENT_LIST,
        _NET_NUMBER_OF_DESKTOPS,
        _NET_CURRENT_DESKTOP,
        _NET_ACTIVE_WINDOW,
        _NET_CLOSE_WINDOW,

        // EWMH application properties
        _NET_WM_NAME,
        _NET_WM_DESKTOP,
        _NET_WM_STATE,
        _NET_FRAME_EXTENTS,
        _NET_WM_WINDOW_OPACITY,

        // EWMH window states
        _NET_WM_STATE_STICKY,
        _NET_WM_STATE_MAXIMIZED_VERT,
        _NET_WM_STATE_MAXIMIZED_HORZ,
        _NET_WM_STATE_SHADED,
        _NET_WM_STATE_HIDDEN,
        _NET_WM_STATE_SKIP_TASKBAR,
        _NET_WM_STATE_ABOVE,
        _NET_WM_STATE_BELOW,

        // EWMH window types
        _NET_WM_WINDOW_TYPE,
        _NET_WM_WINDOW_TYPE_DESKTOP,
        _NET_WM_WINDOW_TYPE_DOCK,
        _NET_WM_WINDOW_TYPE_DIALOG,
        _NET_WM_WINDOW_TYPE_NORMAL,

        // Legacy wm-hints
        _WIN_STATE,
        _WIN_LAYER,

        // Manager control properties
        _LINTEL_RESTART,
        _LINTEL_EXIT,
    }
}

pub struct XConnection<'conn, Conn: connection::Connection> {
    conn: &'conn Conn,
    atoms: Atoms,
    toggle_map: HashMap<Atom, StateToggle>,
    screen: xproto::Screen,
    screen_num: usize,
    fd: RawFd,
    check_window: Window,
    database: Option<Database>,
    cursors: RefCell<HashMap<CursorKind, u32>>,
    pending: RefCell<VecDeque<Event>>,
    pointer_grabbed: Cell<bool>,
    root_event_mask: EventMask,
    window_event_mask: EventMask,
    frame_event_mask: EventMask,
}

impl<'conn, Conn: connection::Connection> XConnection<'conn, Conn> {
    pub fn new(
        conn: &'conn Conn,
        screen_num: usize,
        fd: RawFd,
    ) -> Result<Self> {
        let screen = conn.setup().roots[screen_num].clone();
        let root = screen.root;

        let aux = xproto::ChangeWindowAttributesAux::default()
            .event_mask(EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY);

        let res = conn.change_window_attributes(root, &aux)?.check();
        if let Err(ReplyError::X11Error(err)) = res {
            if err.error_kind == ErrorKind::Access {
                return Err(anyhow!("another window manager is already running"));
            } else {
                return Err(anyhow!("unable to set up window manager"));
            }
        }

        let atoms = Atoms::new(conn)?.reply()?;

        let toggle_map: HashMap<Atom, StateToggle> = map!(
            atoms._NET_WM_STATE_STICKY => StateToggle::Sticky,
            atoms._NET_WM_STATE_MAXIMIZED_VERT => StateToggle::MaximizedVert,
            atoms._NET_WM_STATE_MAXIMIZED_HORZ => StateToggle::MaximizedHorz,
            atoms._NET_WM_STATE_SHADED => StateToggle::Shaded,
        );

        let check_window = conn.generate_id()?;
        conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            check_window,
            root,
            -1,
            -1,
            1,
            1,
            0,
            xproto::WindowClass::INPUT_ONLY,
            x11rb::COPY_FROM_PARENT,
            &xproto::CreateWindowAux::default().override_redirect(1),
        )?;

        let database = Database::new_from_default(conn).ok();

        let root_event_mask: EventMask = EventMask::PROPERTY_CHANGE
            | EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::STRUCTURE_NOTIFY
            | EventMask::BUTTON_PRESS
            | EventMask::COLOR_MAP_CHANGE;

        let window_event_mask: EventMask = EventMask::PROPERTY_CHANGE
            | EventMask::STRUCTURE_NOTIFY
            | EventMask::ENTER_WINDOW
            | EventMask::COLOR_MAP_CHANGE;

        let frame_event_mask: EventMask = EventMask::STRUCTURE_NOTIFY
            | EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::BUTTON_PRESS
            | EventMask::BUTTON_RELEASE
            | EventMask::POINTER_MOTION
            | EventMask::ENTER_WINDOW
            | EventMask::LEAVE_WINDOW
            | EventMask::EXPOSURE;

        Ok(Self {
            conn,
            atoms,
            toggle_map,
            screen,
            screen_num,
            fd,
            check_window,
            database,
            cursors: RefCell::new(HashMap::new()),
            pending: RefCell::new(VecDeque::new()),
            pointer_grabbed: Cell::new(false),
            root_event_mask,
            window_event_mask,
            frame_event_mask,
        })
    }

    #[inline]
    fn sync(&self) {
        drop(self.conn.get_input_focus().map(|cookie| cookie.reply()));
    }

    fn translate(
        &self,
        event: &XEvent,
    ) -> Option<Event> {
        match event {
            XEvent::ButtonPress(e) => self.on_button_press(e),
            XEvent::ButtonRelease(e) => self.on_button_release(e),
            XEvent::MotionNotify(e) => self.on_motion_notify(e),
            XEvent::KeyPress(e) => self.on_key_press(e),
            XEvent::EnterNotify(e) => self.on_enter_notify(e),
            XEvent::LeaveNotify(e) => self.on_leave_notify(e),
            XEvent::CreateNotify(e) => self.on_create_notify(e),
            XEvent::MapRequest(e) => self.on_map_request(e),
            XEvent::UnmapNotify(e) => self.on_unmap_notify(e),
            XEvent::DestroyNotify(e) => self.on_destroy_notify(e),
            XEvent::ConfigureRequest(e) => self.on_configure_request(e),
            XEvent::ConfigureNotify(e) => self.on_configure_notify(e),
            XEvent::PropertyNotify(e) => self.on_property_notify(e),
            XEvent::ClientMessage(e) => self.on_client_message(e),
            XEvent::ColormapNotify(e) => self.on_colormap_notify(e),
            XEvent::Expose(e) => self.on_expose(e),
            XEvent::ShapeNotify(e) => self.on_shape_notify(e),
            _ => None,
        }
    }

    /// Only the newest queued motion sample matters; drain the queue up
    /// to the next non-motion event.
    fn coalesce_motion(
        &self,
        event: MotionEvent,
    ) -> Event {
        let mut latest = event;

        while let Ok(Some(raw)) = self.conn.poll_for_event() {
            match self.translate(&raw) {
                Some(Event::Motion {
                    event,
                }) => latest = event,
                Some(other) => {
                    self.pending.borrow_mut().push_back(other);
                    break;
                },
                None => {},
            }
        }

        Event::Motion {
            event: latest,
        }
    }

    #[inline]
    fn input_mask(
        &self,
        state: u16,
    ) -> u16 {
        state
            & (u16::from(ModMask::CONTROL)
                | u16::from(ModMask::SHIFT)
                | u16::from(ModMask::M1)
                | u16::from(ModMask::M4))
    }

    fn button_event(
        &self,
        kind: ButtonEventKind,
        event: &xproto::ButtonPressEvent,
    ) -> Option<Event> {
        Some(Event::Button {
            event: ButtonEvent {
                kind,
                button: Button::from_detail(event.detail)?,
                window: event.event,
                subwindow: if event.child == x11rb::NONE {
                    None
                } else {
                    Some(event.child)
                },
                on_root: event.event == self.screen.root,
                pos: Pos {
                    x: event.event_x as i32,
                    y: event.event_y as i32,
                },
                root_pos: Pos {
                    x: event.root_x as i32,
                    y: event.root_y as i32,
                },
                time: TimeSample::from_server_ms(event.time),
            },
        })
    }

    #[inline]
    fn on_button_press(
        &self,
        event: &xproto::ButtonPressEvent,
    ) -> Option<Event> {
        self.button_event(ButtonEventKind::Press, event)
    }

    #[inline]
    fn on_button_release(
        &self,
        event: &xproto::ButtonReleaseEvent,
    ) -> Option<Event> {
        self.button_event(ButtonEventKind::Release, event)
    }

    #[inline]
    fn on_motion_notify(
        &self,
        event: &xproto::MotionNotifyEvent,
    ) -> Option<Event> {
        Some(Event::Motion {
            event: MotionEvent {
                window: event.event,
                on_root: event.event == self.screen.root,
                pos: Pos {
                    x: event.event_x as i32,
                    y: event.event_y as i32,
                },
                root_pos: Pos {
                    x: event.root_x as i32,
                    y: event.root_y as i32,
                },
            },
        })
    }

    #[inline]
    fn on_key_press(
        &self,
        event: &xproto::KeyPressEvent,
    ) -> Option<Event> {
        Some(Event::Key {
            key_code: KeyCode {
                mask: self.input_mask(event.state),
                code: event.detail,
            },
            subwindow: if event.child == x11rb::NONE {
                None
            } else {
                Some(event.child)
            },
        })
    }

    #[inline]
    fn on_enter_notify(
        &self,
        event: &xproto::EnterNotifyEvent,
    ) -> Option<Event> {
        Some(Event::Enter {
            window: event.event,
            pos: Pos {
                x: event.event_x as i32,
                y: event.event_y as i32,
            },
        })
    }

    #[inline]
    fn on_leave_notify(
        &self,
        event: &xproto::LeaveNotifyEvent,
    ) -> Option<Event> {
        Some(Event::Leave {
            window: event.event,
        })
    }

    #[inline]
    fn on_create_notify(
        &self,
        event: &xproto::CreateNotifyEvent,
    ) -> Option<Event> {
        Some(Event::Create {
            window: event.window,
        })
    }

    #[inline]
    fn on_map_request(
        &self,
        event: &xproto::MapRequestEvent,
    ) -> Option<Event> {
        Some(Event::MapRequest {
            window: event.window,
        })
    }

    #[inline]
    fn on_unmap_notify(
        &self,
        event: &xproto::UnmapNotifyEvent,
    ) -> Option<Event> {
        Some(Event::Unmap {
            window: event.window,
        })
    }

    #[inline]
    fn on_destroy_notify(
        &self,
        event: &xproto::DestroyNotifyEvent,
    ) -> Option<Event> {
        Some(Event::Destroy {
            window: event.window,
        })
    }

    fn on_configure_request(
        &self,
        event: &xproto::ConfigureRequestEvent,
    ) -> Option<Event> {
        let mut changes = ConfigureChanges::default();

        if event.value_mask & u16::from(xproto::ConfigWindow::X) != 0 {
            changes.x = Some(event.x as i32);
        }

        if event.value_mask & u16::from(xproto::ConfigWindow::Y) != 0 {
            changes.y = Some(event.y as i32);
        }

        if event.value_mask & u16::from(xproto::ConfigWindow::WIDTH) != 0 {
            changes.w = Some(event.width as i32);
        }

        if event.value_mask & u16::from(xproto::ConfigWindow::HEIGHT) != 0 {
            changes.h = Some(event.height as i32);
        }

        if event.value_mask & u16::from(xproto::ConfigWindow::BORDER_WIDTH) != 0 {
            changes.border_width = Some(event.border_width as u32);
        }

        if event.value_mask & u16::from(xproto::ConfigWindow::SIBLING) != 0
            && event.sibling != x11rb::NONE
        {
            changes.sibling = Some(event.sibling);
        }

        if event.value_mask & u16::from(xproto::ConfigWindow::STACK_MODE) != 0 {
            changes.stack_mode = match event.stack_mode {
                xproto::StackMode::ABOVE => Some(StackMode::Above),
                xproto::StackMode::BELOW => Some(StackMode::Below),
                _ => None,
            };
        }

        Some(Event::ConfigureRequest {
            window: event.window,
            changes,
        })
    }

    #[inline]
    fn on_configure_notify(
        &self,
        event: &xproto::ConfigureNotifyEvent,
    ) -> Option<Event> {
        Some(Event::Configure {
            window: event.window,
            region: Region::new(
                event.x as i32,
                event.y as i32,
                event.width as i32,
                event.height as i32,
            ),
        })
    }

    fn on_property_notify(
        &self,
        event: &xproto::PropertyNotifyEvent,
    ) -> Option<Event> {
        let on_root = event.window == self.screen.root;

        let kind = if event.atom == self.atoms.WM_NAME || event.atom == self.atoms._NET_WM_NAME {
            PropertyKind::Name
        } else if event.atom == self.atoms.WM_NORMAL_HINTS {
            PropertyKind::NormalHints
        } else if event.atom == self.atoms.WM_COLORMAP_WINDOWS {
            PropertyKind::ColormapWindows
        } else if on_root && event.atom == self.atoms._LINTEL_RESTART {
            PropertyKind::ManagerRestart
        } else if on_root && event.atom == self.atoms._LINTEL_EXIT {
            PropertyKind::ManagerExit
        } else {
            return None;
        };

        Some(Event::Property {
            window: event.window,
            kind,
            on_root,
        })
    }

    fn on_client_message(
        &self,
        event: &xproto::ClientMessageEvent,
    ) -> Option<Event> {
        if event.format != 32 {
            return None;
        }

        let data = event.data.as_data32();
        let window = event.window;

        let command = if event.type_ == self.atoms._WIN_STATE {
            ClientCommand::SetFlags {
                mask: WinFlags {
                    sticky: data[0] & WIN_STATE_STICKY != 0,
                    no_list: data[0] & WIN_STATE_HIDDEN != 0,
                },
                values: WinFlags {
                    sticky: data[1] & WIN_STATE_STICKY != 0,
                    no_list: data[1] & WIN_STATE_HIDDEN != 0,
                },
            }
        } else if event.type_ == self.atoms._WIN_LAYER {
            match Layer::from_index(data[0] as usize) {
                Some(layer) => ClientCommand::SetLayer {
                    layer,
                },
                None => {
                    debug!("bad layer {} for window {:#0x}", data[0], window);
                    return None;
                },
            }
        } else if event.type_ == self.atoms.WM_CHANGE_STATE {
            let state = match data[0] {
                ICCCM_WITHDRAWN => IcccmWindowState::Withdrawn,
                ICCCM_NORMAL => IcccmWindowState::Normal,
                ICCCM_ICONIC => IcccmWindowState::Iconic,
                _ => {
                    debug!("bad WM_CHANGE_STATE value {}", data[0]);
                    return None;
                },
            };

            ClientCommand::SetLifecycle {
                state,
            }
        } else if event.type_ == self.atoms._NET_ACTIVE_WINDOW {
            ClientCommand::Activate
        } else if event.type_ == self.atoms._NET_WM_DESKTOP {
            ClientCommand::SetDesktop {
                desktop: if data[0] == ALL_DESKTOPS {
                    Desktop::All
                } else {
                    Desktop::Index(data[0] as usize)
                },
            }
        } else if event.type_ == self.atoms._NET_CLOSE_WINDOW {
            ClientCommand::Close
        } else if event.type_ == self.atoms._NET_WM_STATE {
            let action = match data[0] {
                0 => ToggleAction::Remove,
                1 => ToggleAction::Add,
                2 => ToggleAction::Toggle,
                _ => {
                    debug!("bad state-toggle action {}", data[0]);
                    return None;
                },
            };

            let toggles = [
                self.toggle_map.get(&data[1]).copied(),
                self.toggle_map.get(&data[2]).copied(),
            ];

            if toggles.iter().all(Option::is_none) {
                debug!("state-toggle without a recognized state for {:#0x}", window);
                return None;
            }

            ClientCommand::ChangeState {
                action,
                toggles,
            }
        } else {
            debug!("unknown client message type {} for {:#0x}", event.type_, window);
            return None;
        };

        Some(Event::Command {
            window,
            command,
        })
    }

    #[inline]
    fn on_colormap_notify(
        &self,
        event: &xproto::ColormapNotifyEvent,
    ) -> Option<Event> {
        Some(Event::ColormapChange {
            window: event.window,
            colormap: event.colormap,
            new: event.new,
        })
    }

    #[inline]
    fn on_expose(
        &self,
        event: &xproto::ExposeEvent,
    ) -> Option<Event> {
        Some(Event::Expose {
            window: event.window,
            count: event.count,
        })
    }

    #[inline]
    fn on_shape_notify(
        &self,
        event: &shape::NotifyEvent,
    ) -> Option<Event> {
        Some(Event::Shape {
            window: event.affected_window,
        })
    }

    fn window_is_any_of_types(
        &self,
        window: Window,
        types: &[Atom],
    ) -> bool {
        self.conn
            .get_property(
                false,
                window,
                self.atoms._NET_WM_WINDOW_TYPE,
                self.atoms.ATOM,
                0,
                std::u32::MAX,
            )
            .map_or(false, |cookie| {
                cookie.reply().map_or(false, |reply| {
                    reply.value32().map_or(false, |mut window_types| {
                        window_types.any(|type_| types.contains(&type_))
                    })
                })
            })
    }

    fn window_is_any_of_states(
        &self,
        window: Window,
        states: &[Atom],
    ) -> bool {
        self.conn
            .get_property(
                false,
                window,
                self.atoms._NET_WM_STATE,
                self.atoms.ATOM,
                0,
                std::u32::MAX,
            )
            .map_or(false, |cookie| {
                cookie.reply().map_or(false, |reply| {
                    reply.value32().map_or(false, |mut window_states| {
                        window_states.any(|state| states.contains(&state))
                    })
                })
            })
    }

    fn get_cardinal_property(
        &self,
        window: Window,
        property: Atom,
    ) -> Option<u32> {
        self.conn
            .get_property(false, window, property, self.atoms.CARDINAL, 0, 1)
            .ok()?
            .reply()
            .ok()
            .and_then(|reply| reply.value32().and_then(|mut values| values.next()))
    }

    fn send_protocol_client_message(
        &self,
        window: Window,
        atom: Atom,
    ) -> Result<()> {
        let data = [atom, x11rb::CURRENT_TIME, 0, 0, 0];

        let event = xproto::ClientMessageEvent {
            response_type: CLIENT_MESSAGE_EVENT,
            format: 32,
            sequence: 0,
            window,
            type_: self.atoms.WM_PROTOCOLS,
            data: data.into(),
        };

        self.conn
            .send_event(false, window, EventMask::NO_EVENT, &event)?;

        Ok(())
    }

    fn cursor_id(
        &self,
        cursor: CursorKind,
    ) -> Option<u32> {
        if let Some(&id) = self.cursors.borrow().get(&cursor) {
            return Some(id);
        }

        let name = match cursor {
            CursorKind::Default => "left_ptr",
            CursorKind::Move => "fleur",
            CursorKind::ResizeNorth => "top_side",
            CursorKind::ResizeSouth => "bottom_side",
            CursorKind::ResizeEast => "right_side",
            CursorKind::ResizeWest => "left_side",
            CursorKind::ResizeNorthEast => "top_right_corner",
            CursorKind::ResizeNorthWest => "top_left_corner",
            CursorKind::ResizeSouthEast => "bottom_right_corner",
            CursorKind::ResizeSouthWest => "bottom_left_corner",
        };

        let database = self.database.as_ref()?;

        CursorHandle::new(self.conn, self.screen_num, database)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .and_then(|handle| handle.load_cursor(self.conn, name).ok())
            .map(|id| {
                self.cursors.borrow_mut().insert(cursor, id);
                id
            })
    }

    fn read_net_wm_state(
        &self,
        window: Window,
        state: &mut ClientState,
    ) {
        let states: Vec<Atom> = self
            .conn
            .get_property(
                false,
                window,
                self.atoms._NET_WM_STATE,
                self.atoms.ATOM,
                0,
                std::u32::MAX,
            )
            .map_or(Vec::with_capacity(0), |cookie| {
                cookie.reply().map_or(Vec::with_capacity(0), |reply| {
                    reply
                        .value32()
                        .map_or(Vec::with_capacity(0), |values| values.collect())
                })
            });

        for atom in states {
            if atom == self.atoms._NET_WM_STATE_STICKY {
                state.desktop = Desktop::All;
            } else if atom == self.atoms._NET_WM_STATE_SHADED {
                state.status.shaded = true;
            } else if atom == self.atoms._NET_WM_STATE_MAXIMIZED_HORZ {
                state.status.maximized_horz = true;
            } else if atom == self.atoms._NET_WM_STATE_MAXIMIZED_VERT {
                state.status.maximized_vert = true;
            } else if atom == self.atoms._NET_WM_STATE_HIDDEN {
                state.status.minimized = true;
            } else if atom == self.atoms._NET_WM_STATE_SKIP_TASKBAR {
                state.status.no_list = true;
            }
        }
    }
}

impl<'conn, Conn: connection::Connection> Connection for XConnection<'conn, Conn> {
    fn poll_event(&self) -> Option<Event> {
        if let Some(event) = self.pending.borrow_mut().pop_front() {
            return Some(event);
        }

        loop {
            let raw = self.conn.poll_for_event().ok().flatten()?;

            match self.translate(&raw) {
                Some(Event::Motion {
                    event,
                }) => return Some(self.coalesce_motion(event)),
                Some(event) => return Some(event),
                None => {},
            }
        }
    }

    fn await_event(
        &self,
        timeout_ms: i32,
    ) -> bool {
        if !self.pending.borrow().is_empty() {
            return true;
        }

        let mut fds = [PollFd::new(self.fd, PollFlags::POLLIN)];

        match poll(&mut fds, timeout_ms) {
            Ok(ready) => ready > 0,
            Err(_) => false,
        }
    }

    #[inline]
    fn flush(&self) -> bool {
        self.conn.flush().is_ok()
    }

    fn suspend_event_delivery(&self) {
        drop(self.conn.grab_server());
        self.sync();
    }

    fn resume_event_delivery(&self) {
        drop(self.conn.ungrab_server());
        self.sync();
    }

    #[inline]
    fn root_region(&self) -> Region {
        Region::new(
            0,
            0,
            self.screen.width_in_pixels as i32,
            self.screen.height_in_pixels as i32,
        )
    }

    fn top_level_windows(&self) -> Vec<Window> {
        self.conn
            .query_tree(self.screen.root)
            .map_or(Vec::with_capacity(0), |cookie| {
                cookie
                    .reply()
                    .map_or(Vec::with_capacity(0), |reply| reply.children)
            })
    }

    fn window_attributes(
        &self,
        window: Window,
    ) -> Option<WindowAttributes> {
        self.conn
            .get_window_attributes(window)
            .ok()?
            .reply()
            .ok()
            .map(|reply| WindowAttributes {
                override_redirect: reply.override_redirect,
                viewable: reply.map_state == xproto::MapState::VIEWABLE,
            })
    }

    fn get_window_geometry(
        &self,
        window: Window,
    ) -> Result<Region> {
        let reply = self.conn.get_geometry(window)?.reply()?;

        Ok(Region::new(
            reply.x as i32,
            reply.y as i32,
            reply.width as i32,
            reply.height as i32,
        ))
    }

    fn warp_pointer(
        &self,
        window: Window,
        pos: Pos,
    ) {
        drop(
            self.conn
                .warp_pointer(x11rb::NONE, window, 0, 0, 0, 0, pos.x as i16, pos.y as i16),
        );
    }

    fn init_wm_properties(
        &self,
        wm_name: &str,
        desktop_count: usize,
    ) {
        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            self.screen.root,
            self.atoms._NET_SUPPORTED,
            xproto::AtomEnum::ATOM,
            &[
                self.atoms._NET_SUPPORTING_WM_CHECK,
                self.atoms._NET_CLIENT_LIST,
                self.atoms._NET_NUMBER_OF_DESKTOPS,
                self.atoms._NET_CURRENT_DESKTOP,
                self.atoms._NET_ACTIVE_WINDOW,
                self.atoms._NET_CLOSE_WINDOW,
                self.atoms._NET_WM_NAME,
                self.atoms._NET_WM_DESKTOP,
                self.atoms._NET_WM_STATE,
                self.atoms._NET_FRAME_EXTENTS,
            ],
        ));

        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            self.screen.root,
            self.atoms._NET_SUPPORTING_WM_CHECK,
            xproto::AtomEnum::WINDOW,
            &[self.check_window],
        ));

        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            self.check_window,
            self.atoms._NET_SUPPORTING_WM_CHECK,
            xproto::AtomEnum::WINDOW,
            &[self.check_window],
        ));

        drop(self.conn.change_property8(
            xproto::PropMode::REPLACE,
            self.check_window,
            self.atoms._NET_WM_NAME,
            self.atoms.UTF8_STRING,
            wm_name.as_bytes(),
        ));

        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            self.screen.root,
            self.atoms._NET_NUMBER_OF_DESKTOPS,
            xproto::AtomEnum::CARDINAL,
            &[desktop_count as u32],
        ));

        self.flush();
    }

    fn cleanup(&self) {
        drop(
            self.conn
                .ungrab_key(xproto::Grab::ANY, self.screen.root, xproto::ModMask::ANY),
        );

        drop(self.conn.destroy_window(self.check_window));

        drop(
            self.conn
                .delete_property(self.screen.root, self.atoms._NET_ACTIVE_WINDOW),
        );

        drop(
            self.conn
                .delete_property(self.screen.root, self.atoms._NET_SUPPORTING_WM_CHECK),
        );

        drop(
            self.conn
                .delete_property(self.screen.root, self.atoms._NET_SUPPORTED),
        );

        drop(
            self.conn
                .delete_property(self.screen.root, self.atoms._NET_CLIENT_LIST),
        );

        self.flush();
    }

    fn create_frame(
        &self,
        region: Region,
    ) -> Window {
        const ERR: &str = "unable to create frame";

        let frame = self.conn.generate_id().expect(ERR);
        let aux = xproto::CreateWindowAux::new()
            .override_redirect(1)
            .background_pixel(self.screen.black_pixel)
            .event_mask(self.frame_event_mask);

        self.conn
            .create_window(
                x11rb::COPY_DEPTH_FROM_PARENT,
                frame,
                self.screen.root,
                region.pos.x as i16,
                region.pos.y as i16,
                region.dim.w as u16,
                region.dim.h as u16,
                0,
                xproto::WindowClass::INPUT_OUTPUT,
                0,
                &aux,
            )
            .expect(ERR);

        self.flush();

        frame
    }

    #[inline]
    fn destroy_window(
        &self,
        window: Window,
    ) {
        drop(self.conn.destroy_window(window));
    }

    fn reparent_window(
        &self,
        window: Window,
        parent: Window,
        pos: Pos,
    ) {
        drop(self.conn.change_window_attributes(
            window,
            &xproto::ChangeWindowAttributesAux::default().event_mask(self.window_event_mask),
        ));

        drop(self.conn.change_save_set(xproto::SetMode::INSERT, window));

        drop(self.conn.configure_window(
            window,
            &xproto::ConfigureWindowAux::default().border_width(0),
        ));

        drop(
            self.conn
                .reparent_window(window, parent, pos.x as i16, pos.y as i16),
        );
    }

    #[inline]
    fn map_window(
        &self,
        window: Window,
    ) {
        drop(self.conn.map_window(window));
    }

    #[inline]
    fn unmap_window(
        &self,
        window: Window,
    ) {
        drop(self.conn.unmap_window(window));
    }

    #[inline]
    fn raise_window(
        &self,
        window: Window,
    ) {
        drop(self.conn.configure_window(
            window,
            &xproto::ConfigureWindowAux::default().stack_mode(xproto::StackMode::ABOVE),
        ));
    }

    fn stack_window_above(
        &self,
        window: Window,
        sibling: Option<Window>,
    ) {
        let mut aux = xproto::ConfigureWindowAux::default().stack_mode(xproto::StackMode::ABOVE);

        if let Some(sibling) = sibling {
            aux = aux.sibling(sibling);
        }

        drop(self.conn.configure_window(window, &aux));
    }

    fn stack_window_below(
        &self,
        window: Window,
        sibling: Option<Window>,
    ) {
        let mut aux = xproto::ConfigureWindowAux::default().stack_mode(xproto::StackMode::BELOW);

        if let Some(sibling) = sibling {
            aux = aux.sibling(sibling);
        }

        drop(self.conn.configure_window(window, &aux));
    }

    fn configure_window(
        &self,
        window: Window,
        changes: &ConfigureChanges,
    ) {
        let mut aux = xproto::ConfigureWindowAux::default();

        if let Some(x) = changes.x {
            aux = aux.x(x);
        }

        if let Some(y) = changes.y {
            aux = aux.y(y);
        }

        if let Some(w) = changes.w {
            aux = aux.width(w as u32);
        }

        if let Some(h) = changes.h {
            aux = aux.height(h as u32);
        }

        if let Some(border_width) = changes.border_width {
            aux = aux.border_width(border_width);
        }

        if let Some(sibling) = changes.sibling {
            aux = aux.sibling(sibling);
        }

        if let Some(stack_mode) = changes.stack_mode {
            aux = aux.stack_mode(match stack_mode {
                StackMode::Above => xproto::StackMode::ABOVE,
                StackMode::Below => xproto::StackMode::BELOW,
            });
        }

        drop(self.conn.configure_window(window, &aux));
    }

    fn move_resize_window(
        &self,
        window: Window,
        region: Region,
    ) {
        drop(
            self.conn.configure_window(
                window,
                &xproto::ConfigureWindowAux::default()
                    .x(region.pos.x)
                    .y(region.pos.y)
                    .width(region.dim.w as u32)
                    .height(region.dim.h as u32),
            ),
        );
    }

    fn focus_window(
        &self,
        window: Window,
    ) {
        drop(
            self.conn
                .set_input_focus(xproto::InputFocus::PARENT, window, x11rb::CURRENT_TIME),
        );

        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            self.screen.root,
            self.atoms._NET_ACTIVE_WINDOW,
            xproto::AtomEnum::WINDOW,
            &[window],
        ));
    }

    fn unfocus(&self) {
        drop(self.conn.set_input_focus(
            xproto::InputFocus::PARENT,
            self.check_window,
            x11rb::CURRENT_TIME,
        ));

        drop(
            self.conn
                .delete_property(self.screen.root, self.atoms._NET_ACTIVE_WINDOW),
        );
    }

    fn define_cursor(
        &self,
        window: Window,
        cursor: CursorKind,
    ) {
        if let Some(cursor_id) = self.cursor_id(cursor) {
            drop(self.conn.change_window_attributes(
                window,
                &xproto::ChangeWindowAttributesAux::default().cursor(cursor_id),
            ));
        }
    }

    fn grab_pointer(
        &self,
        _window: Window,
    ) {
        if !self.pointer_grabbed.get() {
            let grabbed = self
                .conn
                .grab_pointer(
                    false,
                    self.screen.root,
                    u32::from(
                        EventMask::POINTER_MOTION
                            | EventMask::BUTTON_PRESS
                            | EventMask::BUTTON_RELEASE,
                    ) as u16,
                    xproto::GrabMode::ASYNC,
                    xproto::GrabMode::ASYNC,
                    x11rb::NONE,
                    x11rb::NONE,
                    x11rb::CURRENT_TIME,
                )
                .is_ok();

            self.pointer_grabbed.set(grabbed);
        }
    }

    fn release_pointer(&self) {
        if self.pointer_grabbed.get() {
            drop(self.conn.ungrab_pointer(x11rb::CURRENT_TIME));
            self.pointer_grabbed.set(false);
        }
    }

    fn grab_buttons(
        &self,
        window: Window,
    ) {
        drop(self.conn.grab_button(
            true,
            window,
            u32::from(EventMask::BUTTON_PRESS) as u16,
            xproto::GrabMode::SYNC,
            xproto::GrabMode::ASYNC,
            x11rb::NONE,
            x11rb::NONE,
            xproto::ButtonIndex::ANY,
            xproto::ModMask::ANY,
        ));
    }

    #[inline]
    fn replay_pointer(&self) {
        drop(
            self.conn
                .allow_events(xproto::Allow::REPLAY_POINTER, x11rb::CURRENT_TIME),
        );
    }

    fn grab_keys(
        &self,
        key_codes: &[KeyCode],
    ) {
        for &extra in &[
            0u16,
            u16::from(ModMask::M2),
            u16::from(ModMask::LOCK),
            u16::from(ModMask::M2) | u16::from(ModMask::LOCK),
        ] {
            for key_code in key_codes {
                drop(self.conn.grab_key(
                    false,
                    self.screen.root,
                    key_code.mask | extra,
                    key_code.code,
                    xproto::GrabMode::ASYNC,
                    xproto::GrabMode::ASYNC,
                ));
            }
        }

        drop(self.conn.change_window_attributes(
            self.screen.root,
            &xproto::ChangeWindowAttributesAux::default().event_mask(self.root_event_mask),
        ));

        self.flush();
    }

    fn close_window(
        &self,
        window: Window,
    ) -> bool {
        self.send_protocol_client_message(window, self.atoms.WM_DELETE_WINDOW)
            .map_or(false, |_| self.flush())
    }

    fn kill_window(
        &self,
        window: Window,
    ) -> bool {
        self.conn
            .kill_client(window)
            .map_or(false, |_| self.flush())
    }

    fn apply_shape(
        &self,
        window: Window,
        frame: Window,
    ) {
        drop(shape::combine(
            self.conn,
            shape::SO::SET,
            shape::SK::BOUNDING,
            shape::SK::BOUNDING,
            frame,
            0,
            0,
            window,
        ));
    }

    fn read_name(
        &self,
        window: Window,
    ) -> String {
        static NO_NAME: &str = "";

        let net_name = self
            .conn
            .get_property(
                false,
                window,
                self.atoms._NET_WM_NAME,
                self.atoms.UTF8_STRING,
                0,
                std::u32::MAX,
            )
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .and_then(|reply| {
                reply
                    .value8()
                    .map(|value| value.collect::<Vec<u8>>())
                    .and_then(|bytes| String::from_utf8(bytes).ok())
            })
            .filter(|name| !name.is_empty());

        if let Some(name) = net_name {
            return name;
        }

        self.conn
            .get_property(
                false,
                window,
                self.atoms.WM_NAME,
                self.atoms.Any,
                0,
                std::u32::MAX,
            )
            .map_or(NO_NAME.to_owned(), |cookie| {
                cookie.reply().map_or(NO_NAME.to_owned(), |reply| {
                    std::str::from_utf8(
                        &reply
                            .value8()
                            .map_or(Vec::with_capacity(0), |value| value.collect::<Vec<u8>>()),
                    )
                    .map_or(NO_NAME.to_owned(), |name| name.to_owned())
                })
            })
    }

    fn read_size_hints(
        &self,
        window: Window,
    ) -> Option<SizeHints> {
        let size_hints = properties::WmSizeHints::get_normal_hints(self.conn, window)
            .ok()?
            .reply()
            .ok()?;

        let (by_user, pos) = size_hints.position.map_or((false, None), |(spec, x, y)| {
            (
                matches!(
                    spec,
                    properties::WmSizeHintsSpecification::UserSpecified
                ),
                if x > 0 || y > 0 {
                    Some(Pos {
                        x,
                        y,
                    })
                } else {
                    None
                },
            )
        });

        let positive = |value: i32| if value > 0 { Some(value) } else { None };

        let (min_width, min_height) = size_hints
            .min_size
            .map_or((None, None), |(w, h)| (positive(w), positive(h)));

        let (max_width, max_height) = size_hints
            .max_size
            .map_or((None, None), |(w, h)| (positive(w), positive(h)));

        let (base_width, base_height) = size_hints
            .base_size
            .map_or((None, None), |(w, h)| (positive(w), positive(h)));

        let (inc_width, inc_height) = size_hints
            .size_increment
            .map_or((None, None), |(w, h)| (positive(w), positive(h)));

        Some(SizeHints {
            by_user,
            pos,
            min_width: min_width.or(base_width),
            min_height: min_height.or(base_height),
            max_width,
            max_height,
            base_width,
            base_height,
            inc_width,
            inc_height,
        })
    }

    fn read_protocols(
        &self,
        window: Window,
    ) -> Protocols {
        let protocols: Vec<Atom> = self
            .conn
            .get_property(
                false,
                window,
                self.atoms.WM_PROTOCOLS,
                self.atoms.ATOM,
                0,
                std::u32::MAX,
            )
            .map_or(Vec::with_capacity(0), |cookie| {
                cookie.reply().map_or(Vec::with_capacity(0), |reply| {
                    reply
                        .value32()
                        .map_or(Vec::with_capacity(0), |values| values.collect())
                })
            });

        Protocols {
            delete_window: protocols.contains(&self.atoms.WM_DELETE_WINDOW),
            take_focus: protocols.contains(&self.atoms.WM_TAKE_FOCUS),
        }
    }

    fn read_colormaps(
        &self,
        window: Window,
    ) -> Vec<Colormap> {
        let mut colormaps = Vec::with_capacity(1);

        let window_colormap = self
            .conn
            .get_window_attributes(window)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .map(|reply| reply.colormap);

        if let Some(colormap) = window_colormap {
            colormaps.push(colormap);
        }

        let listed: Vec<Window> = self
            .conn
            .get_property(
                false,
                window,
                self.atoms.WM_COLORMAP_WINDOWS,
                self.atoms.WINDOW,
                0,
                std::u32::MAX,
            )
            .map_or(Vec::with_capacity(0), |cookie| {
                cookie.reply().map_or(Vec::with_capacity(0), |reply| {
                    reply
                        .value32()
                        .map_or(Vec::with_capacity(0), |values| values.collect())
                })
            });

        for listed_window in listed {
            if listed_window == window {
                continue;
            }

            let colormap = self
                .conn
                .get_window_attributes(listed_window)
                .ok()
                .and_then(|cookie| cookie.reply().ok())
                .map(|reply| reply.colormap);

            if let Some(colormap) = colormap {
                colormaps.push(colormap);
            }
        }

        colormaps
    }

    fn read_layer(
        &self,
        window: Window,
    ) -> Option<Layer> {
        if let Some(index) = self.get_cardinal_property(window, self.atoms._WIN_LAYER) {
            return Layer::from_index(index as usize);
        }

        if self.window_is_any_of_states(window, &[self.atoms._NET_WM_STATE_ABOVE]) {
            return Some(Layer::Above);
        }

        if self.window_is_any_of_states(window, &[self.atoms._NET_WM_STATE_BELOW]) {
            return Some(Layer::Below);
        }

        if self.window_is_any_of_types(window, &[self.atoms._NET_WM_WINDOW_TYPE_DOCK]) {
            return Some(Layer::TRAY_DEFAULT);
        }

        if self.window_is_any_of_types(window, &[self.atoms._NET_WM_WINDOW_TYPE_DESKTOP]) {
            return Some(Layer::Desktop);
        }

        None
    }

    fn read_state(
        &self,
        window: Window,
        already_mapped: bool,
    ) -> ClientState {
        let mut state = ClientState::default();

        state.status.mapped = already_mapped;

        self.read_net_wm_state(window, &mut state);

        if state.desktop == Desktop::default() {
            if let Some(desktop) = self.get_cardinal_property(window, self.atoms._NET_WM_DESKTOP) {
                state.desktop = if desktop == ALL_DESKTOPS {
                    Desktop::All
                } else {
                    Desktop::Index(desktop as usize)
                };
            }
        }

        if let Some(layer) = self.read_layer(window) {
            state.layer = layer;
            state.default_layer = layer;
        }

        if self.window_is_any_of_types(window, &[self.atoms._NET_WM_WINDOW_TYPE_DIALOG]) {
            state.status.dialog = true;
        }

        if let Some(opacity) = self.get_cardinal_property(window, self.atoms._NET_WM_WINDOW_OPACITY)
        {
            state.opacity = opacity;
        }

        state
    }

    fn write_state(
        &self,
        window: Window,
        state: &ClientState,
    ) {
        let icccm_state = if state.status.withdrawn {
            ICCCM_WITHDRAWN
        } else if state.status.minimized {
            ICCCM_ICONIC
        } else {
            ICCCM_NORMAL
        };

        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            window,
            self.atoms.WM_STATE,
            self.atoms.WM_STATE,
            &[icccm_state, x11rb::NONE],
        ));

        let mut net_states = Vec::with_capacity(6);

        if state.is_sticky() {
            net_states.push(self.atoms._NET_WM_STATE_STICKY);
        }

        if state.status.shaded {
            net_states.push(self.atoms._NET_WM_STATE_SHADED);
        }

        if state.status.maximized_horz {
            net_states.push(self.atoms._NET_WM_STATE_MAXIMIZED_HORZ);
        }

        if state.status.maximized_vert {
            net_states.push(self.atoms._NET_WM_STATE_MAXIMIZED_VERT);
        }

        if state.status.minimized {
            net_states.push(self.atoms._NET_WM_STATE_HIDDEN);
        }

        if state.status.no_list {
            net_states.push(self.atoms._NET_WM_STATE_SKIP_TASKBAR);
        }

        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            window,
            self.atoms._NET_WM_STATE,
            xproto::AtomEnum::ATOM,
            &net_states,
        ));

        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            window,
            self.atoms._NET_WM_DESKTOP,
            xproto::AtomEnum::CARDINAL,
            &[state.desktop.index().map_or(ALL_DESKTOPS, |i| i as u32)],
        ));

        let mut win_state = 0u32;

        if state.is_sticky() {
            win_state |= WIN_STATE_STICKY;
        }

        if state.status.no_list {
            win_state |= WIN_STATE_HIDDEN;
        }

        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            window,
            self.atoms._WIN_STATE,
            xproto::AtomEnum::CARDINAL,
            &[win_state],
        ));

        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            window,
            self.atoms._WIN_LAYER,
            xproto::AtomEnum::CARDINAL,
            &[state.layer.index() as u32],
        ));

        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            window,
            self.atoms._NET_WM_WINDOW_OPACITY,
            xproto::AtomEnum::CARDINAL,
            &[state.opacity],
        ));
    }

    fn write_frame_extents(
        &self,
        window: Window,
        extents: Extents,
    ) {
        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            window,
            self.atoms._NET_FRAME_EXTENTS,
            xproto::AtomEnum::CARDINAL,
            &[
                extents.left as u32,
                extents.right as u32,
                extents.top as u32,
                extents.bottom as u32,
            ],
        ));
    }

    fn write_current_desktop(
        &self,
        index: usize,
    ) {
        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            self.screen.root,
            self.atoms._NET_CURRENT_DESKTOP,
            xproto::AtomEnum::CARDINAL,
            &[index as u32],
        ));
    }

    fn update_client_list(
        &self,
        clients: &[Window],
    ) {
        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            self.screen.root,
            self.atoms._NET_CLIENT_LIST,
            xproto::AtomEnum::WINDOW,
            clients,
        ));
    }

    #[inline]
    fn install_colormap(
        &self,
        colormap: Colormap,
    ) {
        drop(self.conn.install_colormap(colormap));
    }
}
