use winsys::input::CodeMap;
use winsys::input::KeyCode;

use std::process::Command;

use x11rb::protocol::xproto::ModMask;

pub struct Util;

impl Util {
    /// Keysym-name to keycode table for the running display, as reported
    /// by xmodmap. Bindings are parsed against this at startup.
    pub fn system_keycodes() -> CodeMap {
        match Command::new("xmodmap").arg("-pke").output() {
            Err(e) => panic!("unable to fetch keycodes via xmodmap: {}", e),
            Ok(o) => match String::from_utf8(o.stdout) {
                Err(e) => panic!("invalid utf8 from xmodmap: {}", e),
                Ok(s) => s
                    .lines()
                    .flat_map(|l| {
                        let mut words = l.split_whitespace();
                        let key_code: u8 = words.nth(1).unwrap().parse().unwrap();

                        words.skip(1).map(move |name| (name.into(), key_code))
                    })
                    .collect::<CodeMap>(),
            },
        }
    }

    pub fn parse_key_binding(
        key_binding: impl Into<String>,
        keycodes: &CodeMap,
    ) -> Option<KeyCode> {
        let s = key_binding.into();
        let mut constituents: Vec<&str> = s.split('-').collect();

        match keycodes.get(constituents.remove(constituents.len() - 1)) {
            Some(&code) => {
                let mask = constituents
                    .iter()
                    .map(|&modifier| match modifier {
                        "A" | "Alt" | "Meta" => u16::from(ModMask::M1),
                        "M" | "Super" => u16::from(ModMask::M4),
                        "S" | "Shift" => u16::from(ModMask::SHIFT),
                        "C" | "Ctrl" | "Control" => u16::from(ModMask::CONTROL),
                        _ => panic!("invalid modifier: {}", s),
                    })
                    .fold(0, |acc, modifier| acc | modifier);

                Some(KeyCode {
                    mask,
                    code,
                })
            },
            None => None,
        }
    }
}
