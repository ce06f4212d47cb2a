use winsys::connection::CursorKind;
use winsys::geometry::Corner;
use winsys::geometry::Dim;
use winsys::geometry::Edge;
use winsys::geometry::Extents;
use winsys::geometry::Pos;
use winsys::hints::BorderStyle;
use winsys::input::Grip;

pub const BORDER_WIDTH: i32 = 4;
pub const TITLE_HEIGHT: i32 = 20;

/// Corner resize zones reach this far along each edge and take priority
/// over the plain edge zones wherever the ranges overlap.
const CORNER_REACH: i32 = TITLE_HEIGHT;

/// Symbolic classification of a pointer position on a decoration frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderAction {
    None,
    Move,
    Resize(Grip),
    Close,
    Maximize,
    Minimize,
}

impl Default for BorderAction {
    fn default() -> Self {
        Self::None
    }
}

/// Decoration insets derived from the border style. No outline means no
/// decoration at all.
pub fn frame_extents(border: BorderStyle) -> Extents {
    if border.outline {
        Extents {
            left: BORDER_WIDTH,
            right: BORDER_WIDTH,
            top: if border.title {
                TITLE_HEIGHT
            } else {
                BORDER_WIDTH
            },
            bottom: BORDER_WIDTH,
        }
    } else {
        Extents::default()
    }
}

/// Hit-test a frame-relative pointer position against a frame of the
/// given outer dimensions. All zone boundaries are closed intervals.
pub fn resolve(
    border: BorderStyle,
    frame: Dim,
    pos: Pos,
) -> BorderAction {
    if !border.outline {
        return BorderAction::None;
    }

    let (x, y) = pos.values();
    let (w, h) = frame.values();

    let in_margin = x < BORDER_WIDTH || x >= w - BORDER_WIDTH || y < BORDER_WIDTH || y >= h - BORDER_WIDTH;

    if in_margin {
        if (x < CORNER_REACH && y < BORDER_WIDTH) || (x < BORDER_WIDTH && y < CORNER_REACH) {
            return BorderAction::Resize(Grip::Corner(Corner::TopLeft));
        }

        if (x >= w - CORNER_REACH && y < BORDER_WIDTH) || (x >= w - BORDER_WIDTH && y < CORNER_REACH)
        {
            return BorderAction::Resize(Grip::Corner(Corner::TopRight));
        }

        if (x < CORNER_REACH && y >= h - BORDER_WIDTH) || (x < BORDER_WIDTH && y >= h - CORNER_REACH)
        {
            return BorderAction::Resize(Grip::Corner(Corner::BottomLeft));
        }

        if (x >= w - CORNER_REACH && y >= h - BORDER_WIDTH)
            || (x >= w - BORDER_WIDTH && y >= h - CORNER_REACH)
        {
            return BorderAction::Resize(Grip::Corner(Corner::BottomRight));
        }

        return BorderAction::Resize(Grip::Edge(if y < BORDER_WIDTH {
            Edge::Top
        } else if y >= h - BORDER_WIDTH {
            Edge::Bottom
        } else if x < BORDER_WIDTH {
            Edge::Left
        } else {
            Edge::Right
        }));
    }

    if border.title && y < TITLE_HEIGHT {
        let right = w - BORDER_WIDTH;
        let inner_width = w - 2 * BORDER_WIDTH;

        if inner_width >= 2 * TITLE_HEIGHT && x >= right - TITLE_HEIGHT {
            return BorderAction::Close;
        }

        if inner_width >= 3 * TITLE_HEIGHT && x >= right - 2 * TITLE_HEIGHT {
            return BorderAction::Maximize;
        }

        if inner_width >= 4 * TITLE_HEIGHT && x >= right - 3 * TITLE_HEIGHT {
            return BorderAction::Minimize;
        }

        return BorderAction::Move;
    }

    BorderAction::None
}

pub fn cursor_for(action: BorderAction) -> CursorKind {
    match action {
        BorderAction::Move => CursorKind::Move,
        BorderAction::Resize(Grip::Edge(Edge::Top)) => CursorKind::ResizeNorth,
        BorderAction::Resize(Grip::Edge(Edge::Bottom)) => CursorKind::ResizeSouth,
        BorderAction::Resize(Grip::Edge(Edge::Left)) => CursorKind::ResizeWest,
        BorderAction::Resize(Grip::Edge(Edge::Right)) => CursorKind::ResizeEast,
        BorderAction::Resize(Grip::Corner(Corner::TopLeft)) => CursorKind::ResizeNorthWest,
        BorderAction::Resize(Grip::Corner(Corner::TopRight)) => CursorKind::ResizeNorthEast,
        BorderAction::Resize(Grip::Corner(Corner::BottomLeft)) => CursorKind::ResizeSouthWest,
        BorderAction::Resize(Grip::Corner(Corner::BottomRight)) => CursorKind::ResizeSouthEast,
        _ => CursorKind::Default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Dim = Dim {
        w: 400,
        h: 300,
    };

    fn full_border() -> BorderStyle {
        BorderStyle::FULL
    }

    #[test]
    fn no_outline_resolves_to_nothing() {
        let action = resolve(
            BorderStyle::NONE,
            FRAME,
            Pos {
                x: 0,
                y: 0,
            },
        );

        assert_eq!(action, BorderAction::None);
    }

    #[test]
    fn exact_corner_pixel_is_a_corner_grip() {
        let action = resolve(full_border(), FRAME, Pos {
            x: 0,
            y: 0,
        });

        assert_eq!(action, BorderAction::Resize(Grip::Corner(Corner::TopLeft)));
    }

    #[test]
    fn corner_reach_takes_priority_over_edges() {
        // Within both the top margin and the corner reach.
        let action = resolve(full_border(), FRAME, Pos {
            x: CORNER_REACH - 1,
            y: 1,
        });

        assert_eq!(action, BorderAction::Resize(Grip::Corner(Corner::TopLeft)));

        // Past the corner reach the top margin is a plain edge.
        let action = resolve(full_border(), FRAME, Pos {
            x: CORNER_REACH + 1,
            y: 1,
        });

        assert_eq!(action, BorderAction::Resize(Grip::Edge(Edge::Top)));
    }

    #[test]
    fn remaining_edges_resolve_to_their_grips() {
        let middle_y = FRAME.h / 2;

        let left = resolve(full_border(), FRAME, Pos {
            x: 1,
            y: middle_y,
        });
        let right = resolve(full_border(), FRAME, Pos {
            x: FRAME.w - 1,
            y: middle_y,
        });
        let bottom = resolve(full_border(), FRAME, Pos {
            x: FRAME.w / 2,
            y: FRAME.h - 1,
        });

        assert_eq!(left, BorderAction::Resize(Grip::Edge(Edge::Left)));
        assert_eq!(right, BorderAction::Resize(Grip::Edge(Edge::Right)));
        assert_eq!(bottom, BorderAction::Resize(Grip::Edge(Edge::Bottom)));
    }

    #[test]
    fn title_bar_middle_is_move() {
        let action = resolve(full_border(), FRAME, Pos {
            x: FRAME.w / 2,
            y: BORDER_WIDTH + TITLE_HEIGHT / 2,
        });

        assert_eq!(action, BorderAction::Move);
    }

    #[test]
    fn title_buttons_sit_right_to_left() {
        let right = FRAME.w - BORDER_WIDTH;
        let y = TITLE_HEIGHT / 2;

        let close = resolve(full_border(), FRAME, Pos {
            x: right - TITLE_HEIGHT / 2,
            y,
        });
        let maximize = resolve(full_border(), FRAME, Pos {
            x: right - TITLE_HEIGHT - TITLE_HEIGHT / 2,
            y,
        });
        let minimize = resolve(full_border(), FRAME, Pos {
            x: right - 2 * TITLE_HEIGHT - TITLE_HEIGHT / 2,
            y,
        });

        assert_eq!(close, BorderAction::Close);
        assert_eq!(maximize, BorderAction::Maximize);
        assert_eq!(minimize, BorderAction::Minimize);
    }

    #[test]
    fn narrow_frames_shed_buttons_before_the_move_zone() {
        // Too narrow for any button, but still draggable by the title.
        let narrow = Dim {
            w: 2 * BORDER_WIDTH + TITLE_HEIGHT,
            h: 100,
        };

        let action = resolve(full_border(), narrow, Pos {
            x: narrow.w - BORDER_WIDTH - 1,
            y: TITLE_HEIGHT / 2,
        });

        assert_eq!(action, BorderAction::Move);
    }

    #[test]
    fn interior_is_not_interactive() {
        let action = resolve(full_border(), FRAME, Pos {
            x: FRAME.w / 2,
            y: FRAME.h / 2,
        });

        assert_eq!(action, BorderAction::None);
    }

    #[test]
    fn untitled_outline_has_no_title_zones() {
        let border = BorderStyle {
            outline: true,
            title: false,
        };

        let action = resolve(border, FRAME, Pos {
            x: FRAME.w / 2,
            y: BORDER_WIDTH + 2,
        });

        assert_eq!(action, BorderAction::None);
    }
}
