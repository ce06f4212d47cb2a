#![deny(clippy::all)]
#![allow(dead_code)]

#[macro_use]
extern crate log;

#[allow(unused_imports)]
use simplelog::LevelFilter;
#[allow(unused_imports)]
use simplelog::SimpleLogger;

use winsys::xdata::xconnection::XConnection;
pub use winsys::Result;

#[macro_use]
mod macros;

mod binding;
mod border;
mod client;
mod doubleclick;
mod model;
mod registry;
mod sink;
mod util;

use binding::KeyBindings;
use binding::KeyCommand;
use model::Model;

use std::ffi::CString;
use std::os::unix::io::AsRawFd;

use nix::unistd::execvp;

pub fn main() -> Result<()> {
    #[cfg(debug_assertions)]
    SimpleLogger::init(LevelFilter::Debug, simplelog::Config::default())?;

    let (conn, screen_num) = x11rb::rust_connection::RustConnection::connect(None)?;
    let fd = conn.stream().as_raw_fd();
    let xconn = XConnection::new(&conn, screen_num, fd)?;

    let key_bindings = init_bindings();

    let mut model = Model::new(&xconn, &key_bindings);
    model.run(key_bindings);

    let must_restart = model.must_restart();
    drop(model);

    if must_restart {
        let arg0 = std::env::args()
            .next()
            .unwrap_or_else(|| WM_NAME!().to_owned());
        let program = CString::new(arg0)?;

        info!("restarting window manager");

        if execvp(&program, &[program.as_c_str()]).is_err() {
            error!("unable to restart window manager");
        }
    }

    Ok(())
}

// "[modifiers]-key" => command
fn init_bindings() -> KeyBindings {
    build_key_bindings!(
        "A-Tab" => KeyCommand::FocusNext,
        "A-F4" => KeyCommand::Close,

        "A-s" => KeyCommand::ToggleShade,
        "A-F7" => KeyCommand::Move,
        "A-F8" => KeyCommand::Resize,
        "A-F9" => KeyCommand::Minimize,
        "A-F10" => KeyCommand::Maximize,

        "A-Escape" => KeyCommand::RootMenu,
        "A-space" => KeyCommand::WindowMenu,

        "C-A-Right" => KeyCommand::NextDesktop,
        "A-1" => KeyCommand::Desktop(0),
        "A-2" => KeyCommand::Desktop(1),
        "A-3" => KeyCommand::Desktop(2),
        "A-4" => KeyCommand::Desktop(3),

        "C-A-r" => KeyCommand::Restart,
        "C-A-q" => KeyCommand::Exit,
    )
}
