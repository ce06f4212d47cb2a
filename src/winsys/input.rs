use crate::geometry::Corner;
use crate::geometry::Edge;
use crate::geometry::Pos;
use crate::time::TimeSample;
use crate::window::Window;

use std::collections::HashMap;

pub type CodeMap = HashMap<String, u8>;

#[derive(Debug, Copy, Clone, PartialOrd, Ord, PartialEq, Eq)]
pub enum Grip {
    Edge(Edge),
    Corner(Corner),
}

impl Grip {
    pub fn is_top_grip(&self) -> bool {
        *self == Grip::Edge(Edge::Top)
            || *self == Grip::Corner(Corner::TopLeft)
            || *self == Grip::Corner(Corner::TopRight)
    }

    pub fn is_left_grip(&self) -> bool {
        *self == Grip::Edge(Edge::Left)
            || *self == Grip::Corner(Corner::TopLeft)
            || *self == Grip::Corner(Corner::BottomLeft)
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Button {
    Left,
    Middle,
    Right,
    ScrollUp,
    ScrollDown,
}

impl Button {
    pub fn from_detail(detail: u8) -> Option<Self> {
        match detail {
            1 => Some(Self::Left),
            2 => Some(Self::Middle),
            3 => Some(Self::Right),
            4 => Some(Self::ScrollUp),
            5 => Some(Self::ScrollDown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct KeyCode {
    pub mask: u16,
    pub code: u8,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum ButtonEventKind {
    Press,
    Release,
}

#[derive(Debug, Clone, Copy)]
pub struct ButtonEvent {
    pub kind: ButtonEventKind,
    pub button: Button,
    pub window: Window,
    pub subwindow: Option<Window>,
    pub on_root: bool,
    pub pos: Pos,
    pub root_pos: Pos,
    pub time: TimeSample,
}

#[derive(Debug, Clone, Copy)]
pub struct MotionEvent {
    pub window: Window,
    pub on_root: bool,
    pub pos: Pos,
    pub root_pos: Pos,
}
