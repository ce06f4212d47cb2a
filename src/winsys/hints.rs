use crate::geometry::Dim;
use crate::geometry::Pos;
use crate::window::Layer;

/// Fully opaque, in the fixed-point scale used by the opacity hint.
pub const OPACITY_OPAQUE: u32 = 0xFFFFFFFF;

/// Per-client lifecycle and policy flags. Each flag is independent; the
/// combinations the manager considers illegal (withdrawn while mapped,
/// for instance) are enforced by the transitions that write them.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct StatusFlags {
    pub mapped: bool,
    pub minimized: bool,
    pub withdrawn: bool,
    pub shaded: bool,
    pub maximized_horz: bool,
    pub maximized_vert: bool,
    pub active: bool,
    pub no_list: bool,
    pub shaped: bool,
    pub dialog: bool,
}

impl StatusFlags {
    #[inline]
    pub fn is_maximized(&self) -> bool {
        self.maximized_horz || self.maximized_vert
    }
}

/// Decoration style. Without an outline there are no interactive border
/// regions at all.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BorderStyle {
    pub outline: bool,
    pub title: bool,
}

impl BorderStyle {
    pub const FULL: Self = Self {
        outline: true,
        title: true,
    };

    pub const NONE: Self = Self {
        outline: false,
        title: false,
    };
}

impl Default for BorderStyle {
    fn default() -> Self {
        Self::FULL
    }
}

/// Desktop assignment. `All` is the sticky sentinel; a client is sticky
/// exactly when it carries no concrete index, so sticky plus a concrete
/// desktop cannot be represented.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Desktop {
    Index(usize),
    All,
}

impl Desktop {
    #[inline]
    pub fn is_sticky(&self) -> bool {
        *self == Self::All
    }

    #[inline]
    pub fn index(&self) -> Option<usize> {
        match *self {
            Self::Index(index) => Some(index),
            Self::All => None,
        }
    }
}

impl Default for Desktop {
    fn default() -> Self {
        Self::Index(0)
    }
}

/// The state the hint layer reads from and writes back to the display
/// server for one client.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClientState {
    pub status: StatusFlags,
    pub border: BorderStyle,
    pub layer: Layer,
    pub default_layer: Layer,
    pub desktop: Desktop,
    pub opacity: u32,
}

impl ClientState {
    #[inline]
    pub fn is_sticky(&self) -> bool {
        self.desktop.is_sticky()
    }
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            status: Default::default(),
            border: Default::default(),
            layer: Default::default(),
            default_layer: Default::default(),
            desktop: Default::default(),
            opacity: OPACITY_OPAQUE,
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Protocols {
    pub delete_window: bool,
    pub take_focus: bool,
}

#[derive(Debug, Copy, Clone, PartialOrd)]
pub struct SizeHints {
    pub by_user: bool,
    pub pos: Option<Pos>,
    pub min_width: Option<i32>,
    pub min_height: Option<i32>,
    pub max_width: Option<i32>,
    pub max_height: Option<i32>,
    pub base_width: Option<i32>,
    pub base_height: Option<i32>,
    pub inc_width: Option<i32>,
    pub inc_height: Option<i32>,
}

impl SizeHints {
    pub fn apply(
        &self,
        dim: &mut Dim,
    ) {
        let mut dest_width = dim.w;
        let mut dest_height = dim.h;

        if let Some(min_width) = self.min_width {
            dest_width = std::cmp::max(dest_width, min_width);
        }

        if let Some(min_height) = self.min_height {
            dest_height = std::cmp::max(dest_height, min_height);
        }

        if let Some(max_width) = self.max_width {
            dest_width = std::cmp::min(dest_width, max_width);
        }

        if let Some(max_height) = self.max_height {
            dest_height = std::cmp::min(dest_height, max_height);
        }

        let base_width = self.base_width.unwrap_or(0);
        let base_height = self.base_height.unwrap_or(0);

        if let Some(inc_height) = self.inc_height {
            if inc_height > 0 && dest_height >= base_height {
                dest_height -= base_height;
                dest_height -= dest_height % inc_height;
                dest_height += base_height;
            }
        }

        if let Some(inc_width) = self.inc_width {
            if inc_width > 0 && dest_width >= base_width {
                dest_width -= base_width;
                dest_width -= dest_width % inc_width;
                dest_width += base_width;
            }
        }

        dim.w = std::cmp::max(dest_width, 0i32);
        dim.h = std::cmp::max(dest_height, 0i32);
    }
}

impl PartialEq for SizeHints {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.min_width == other.min_width
            && self.min_height == other.min_height
            && self.max_width == other.max_width
            && self.max_height == other.max_height
            && self.base_width == other.base_width
            && self.base_height == other.base_height
            && self.inc_width == other.inc_width
            && self.inc_height == other.inc_height
    }
}

impl Eq for SizeHints {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sticky_excludes_concrete_desktop() {
        let sticky = Desktop::All;
        let parked = Desktop::Index(2);

        assert!(sticky.is_sticky());
        assert_eq!(sticky.index(), None);
        assert!(!parked.is_sticky());
        assert_eq!(parked.index(), Some(2));
    }

    #[test]
    fn size_hints_clamp_and_snap() {
        let hints = SizeHints {
            by_user: false,
            pos: None,
            min_width: Some(100),
            min_height: Some(50),
            max_width: Some(800),
            max_height: None,
            base_width: Some(20),
            base_height: Some(20),
            inc_width: Some(10),
            inc_height: Some(10),
        };

        let mut dim = Dim {
            w: 1000,
            h: 43,
        };
        hints.apply(&mut dim);

        assert_eq!(dim.w, 800);
        assert_eq!(dim.h, 50);
    }
}
