//! Coordinate-space detection and conversion into thousand-space.
//!
//! Thousand-space is a 0-1000 grid on both axes, independent of the source
//! image resolution. Overlays are always emitted in it.

use serde::{Deserialize, Serialize};

use super::{BBox, PageBounds, Rect, round_coord};

/// Side length of the canonical canvas.
pub const CANVAS_SIZE: f64 = 1000.0;

/// Largest coordinate (of any edge) still read as a 0..1 ratio.
const RATIO_LIMIT: f64 = 1.2;
/// Largest coordinate still read as a 0..100 percentage.
const PERCENT_LIMIT: f64 = 100.5;
/// Largest coordinate still read as thousand-space.
const THOUSAND_LIMIT: f64 = 1200.0;
/// Slack allowed when checking a pixel rectangle against the image size.
const PIXEL_SLACK: f64 = 1.1;

/// The unit a rectangle's coordinates are expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordSpace {
    Ratio,
    Percent,
    Pixels,
    Thousand,
}

impl CoordSpace {
    /// Parses a unit label leniently ("pct", "percentage", "px",
    /// "normalized_ratio", "thousand-space", ...).
    pub fn from_label(label: &str) -> Option<Self> {
        let token: String = label
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        if token.is_empty() {
            return None;
        }
        if token == "ratio" || token.contains("normalizedratio") {
            Some(CoordSpace::Ratio)
        } else if token == "percent" || token == "percentage" || token.contains("pct") {
            Some(CoordSpace::Percent)
        } else if token == "pixels" || token == "pixel" || token == "px" {
            Some(CoordSpace::Pixels)
        } else if token.contains("thousand") {
            Some(CoordSpace::Thousand)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CoordSpace::Ratio => "ratio",
            CoordSpace::Percent => "percent",
            CoordSpace::Pixels => "pixels",
            CoordSpace::Thousand => "thousand",
        }
    }

    /// Infers the unit from the magnitude of the rectangle's edges.
    ///
    /// Pixel space is only recognised when the image size is known and the
    /// rectangle fits inside it.
    pub fn infer(rect: &Rect, image: Option<&PageBounds>) -> Option<Self> {
        if !rect.is_finite() {
            return None;
        }
        let non_negative = rect.x.min(rect.y).min(rect.w).min(rect.h) >= 0.0;
        if !non_negative {
            return None;
        }
        let max_coord = rect.right().max(rect.bottom()).max(rect.x).max(rect.y);
        if max_coord <= RATIO_LIMIT {
            return Some(CoordSpace::Ratio);
        }
        if max_coord <= PERCENT_LIMIT {
            return Some(CoordSpace::Percent);
        }
        if max_coord <= THOUSAND_LIMIT {
            return Some(CoordSpace::Thousand);
        }
        let image = image.filter(|page| page.is_valid())?;
        let fits = rect.right() <= image.width * PIXEL_SLACK
            && rect.bottom() <= image.height * PIXEL_SLACK;
        fits.then_some(CoordSpace::Pixels)
    }

    /// Multipliers `(sx, sy)` taking this unit to thousand-space.
    fn scale(&self, image: Option<&PageBounds>) -> Option<(f64, f64)> {
        match self {
            CoordSpace::Ratio => Some((CANVAS_SIZE, CANVAS_SIZE)),
            CoordSpace::Percent => Some((10.0, 10.0)),
            CoordSpace::Thousand => Some((1.0, 1.0)),
            CoordSpace::Pixels => {
                let image = image.filter(|page| page.is_valid())?;
                Some((CANVAS_SIZE / image.width, CANVAS_SIZE / image.height))
            }
        }
    }
}

/// A rectangle converted into thousand-space, with the unit it came from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Canonical {
    pub rect: Rect,
    pub space: CoordSpace,
}

/// Converts `rect` into thousand-space.
///
/// When `declared` is `None` the unit is inferred. Returns `None` for
/// non-finite or empty rectangles and for units that cannot be resolved
/// (pixel space without image dimensions). The origin is clamped into
/// `[0, 999]` and the size into `[1, 1000 - origin]`, rounded to 3 decimals.
pub fn convert_to_canonical(
    rect: &Rect,
    declared: Option<CoordSpace>,
    image: Option<&PageBounds>,
) -> Option<Canonical> {
    if !rect.has_area() {
        return None;
    }
    let space = match declared {
        Some(space) => space,
        None => CoordSpace::infer(rect, image)?,
    };
    let (sx, sy) = space.scale(image)?;

    let x = (rect.x * sx).clamp(0.0, CANVAS_SIZE - 1.0);
    let y = (rect.y * sy).clamp(0.0, CANVAS_SIZE - 1.0);
    let w = (rect.w * sx).clamp(1.0, CANVAS_SIZE - x);
    let h = (rect.h * sy).clamp(1.0, CANVAS_SIZE - y);

    Some(Canonical {
        rect: Rect::new(round_coord(x), round_coord(y), round_coord(w), round_coord(h)),
        space,
    })
}

/// An integer rectangle on the thousand-space grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl GridRect {
    pub fn right(&self) -> u32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }

    /// Strict overlap test; shared edges do not count.
    pub fn overlaps(&self, other: &GridRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Projects a page-space box onto the integer thousand-space grid.
///
/// Edges are scaled and rounded individually so that boxes sharing an edge
/// in page space still share it on the grid.
pub fn to_thousand_grid(bbox: &BBox, page: &PageBounds) -> GridRect {
    let sx = CANVAS_SIZE / page.width;
    let sy = CANVAS_SIZE / page.height;
    let (x0, x1) = grid_edges(bbox.x0 * sx, bbox.x1 * sx);
    let (y0, y1) = grid_edges(bbox.top * sy, bbox.bottom * sy);
    GridRect {
        x: x0,
        y: y0,
        w: x1 - x0,
        h: y1 - y0,
    }
}

fn grid_edges(lo: f64, hi: f64) -> (u32, u32) {
    let snap = |v: f64| {
        if v.is_finite() {
            v.round().clamp(0.0, CANVAS_SIZE) as u32
        } else {
            0
        }
    };
    let canvas = CANVAS_SIZE as u32;
    let lo = snap(lo).min(canvas - 1);
    let hi = snap(hi).max(lo + 1).min(canvas);
    (lo, hi)
}
