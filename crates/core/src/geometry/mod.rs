//! Geometry primitives.
//!
//! Page-space math works on edge boxes (`BBox`, top-left origin) while the
//! public surface speaks `{x, y, w, h}` rectangles (`Rect`). Conversion into
//! the canonical 0-1000 grid lives in [`canonical`]; reading rectangles out
//! of loosely shaped JSON lives in [`extract`].

pub mod canonical;
pub mod extract;

use serde::{Deserialize, Serialize};

pub use canonical::{
    CANVAS_SIZE, Canonical, CoordSpace, GridRect, convert_to_canonical, to_thousand_grid,
};
pub use extract::{RectSource, extract_entry_rectangle, extract_rectangle};

/// Rounds to 3 decimal places; non-finite input becomes 0.
pub fn round_coord(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 1000.0).round() / 1000.0
}

/// An `{x, y, w, h}` rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.w.is_finite() && self.h.is_finite()
    }

    /// True for finite rectangles with strictly positive width and height.
    pub fn has_area(&self) -> bool {
        self.is_finite() && self.w > 0.0 && self.h > 0.0
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }
}

/// Width and height of the page the OCR coordinates refer to.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageBounds {
    pub width: f64,
    pub height: f64,
}

impl PageBounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    pub fn bbox(&self) -> BBox {
        BBox {
            x0: 0.0,
            top: 0.0,
            x1: self.width,
            bottom: self.height,
        }
    }
}

/// One of the two page axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub fn other(self) -> Self {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }
}

/// An edge box with a top-left origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl BBox {
    pub fn new(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            x0,
            top,
            x1,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x0 + self.x1) * 0.5, (self.top + self.bottom) * 0.5)
    }

    /// The `(low, high)` edges on `axis`.
    pub fn span(&self, axis: Axis) -> (f64, f64) {
        match axis {
            Axis::X => (self.x0, self.x1),
            Axis::Y => (self.top, self.bottom),
        }
    }

    pub fn extent(&self, axis: Axis) -> f64 {
        let (lo, hi) = self.span(axis);
        hi - lo
    }

    pub fn set_span(&mut self, axis: Axis, lo: f64, hi: f64) {
        match axis {
            Axis::X => {
                self.x0 = lo;
                self.x1 = hi;
            }
            Axis::Y => {
                self.top = lo;
                self.bottom = hi;
            }
        }
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            top: self.top.min(other.top),
            x1: self.x1.max(other.x1),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Grows the box by `margin` on all four sides.
    pub fn expand(&self, margin: f64) -> BBox {
        BBox {
            x0: self.x0 - margin,
            top: self.top - margin,
            x1: self.x1 + margin,
            bottom: self.bottom + margin,
        }
    }

    /// Clips the box to the page.
    pub fn clamp_to(&self, page: &PageBounds) -> BBox {
        BBox {
            x0: self.x0.clamp(0.0, page.width),
            top: self.top.clamp(0.0, page.height),
            x1: self.x1.clamp(0.0, page.width),
            bottom: self.bottom.clamp(0.0, page.height),
        }
    }

    /// True when `other` lies entirely inside this box.
    pub fn contains(&self, other: &BBox) -> bool {
        self.x0 <= other.x0
            && self.top <= other.top
            && self.x1 >= other.x1
            && self.bottom >= other.bottom
    }
}

/// Overlap extents `(x, y)` of two boxes, present only when both are
/// strictly positive. Boxes that merely touch do not overlap.
pub fn overlap_extents(a: &BBox, b: &BBox) -> Option<(f64, f64)> {
    let ox = a.x1.min(b.x1) - a.x0.max(b.x0);
    let oy = a.bottom.min(b.bottom) - a.top.max(b.top);
    if ox > 0.0 && oy > 0.0 {
        Some((ox, oy))
    } else {
        None
    }
}

/// True when the boxes share a region of positive area.
pub fn bbox_overlap_strict(a: &BBox, b: &BBox) -> bool {
    overlap_extents(a, b).is_some()
}
