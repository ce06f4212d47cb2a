use strum::EnumIter;
use strum::IntoEnumIterator;

pub type Window = u32;
pub type Colormap = u32;

#[derive(Debug, Copy, Clone, PartialOrd, Ord, PartialEq, Eq)]
pub enum IcccmWindowState {
    Withdrawn,
    Normal,
    Iconic,
}

/// Coarse stacking category, ordered bottom to top. Raising and lowering
/// never crosses a layer boundary.
#[derive(Debug, EnumIter, Copy, Clone, Hash, PartialOrd, Ord, PartialEq, Eq)]
pub enum Layer {
    Desktop,
    Below,
    Normal,
    Above,
}

impl Layer {
    pub const TRAY_DEFAULT: Self = Self::Above;

    #[inline]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::iter().nth(index)
    }

    #[inline]
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl Default for Layer {
    fn default() -> Self {
        Self::Normal
    }
}
