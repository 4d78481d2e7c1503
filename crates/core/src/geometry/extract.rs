//! Rectangle extraction from loosely shaped JSON.
//!
//! Upstream producers describe the same box in many ways: explicit
//! `{x, y, w, h}`, edge lists, centers, polygons or named corners, each with
//! several key spellings. Every shape is read into a [`RectSource`] variant
//! with a fixed key priority, and the first variant that yields a positive
//! area wins.

use serde_json::{Map, Value};

use super::Rect;

const X_KEYS: &[&str] = &["x", "left", "relativeX", "relative_x"];
const Y_KEYS: &[&str] = &["y", "top", "relativeY", "relative_y"];
const W_KEYS: &[&str] = &["w", "width", "relativeW", "relative_w"];
const H_KEYS: &[&str] = &["h", "height", "relativeH", "relative_h"];

const LEFT_KEYS: &[&str] = &["left", "x", "x0", "minX", "min_x", "l"];
const TOP_KEYS: &[&str] = &["top", "y", "y0", "minY", "min_y", "t"];
const RIGHT_KEYS: &[&str] = &["right", "x1", "maxX", "max_x", "r"];
const BOTTOM_KEYS: &[&str] = &["bottom", "y1", "maxY", "max_y", "b"];

const CENTER_X_KEYS: &[&str] = &["centerX", "center_x", "cx", "midX", "mid_x"];
const CENTER_Y_KEYS: &[&str] = &["centerY", "center_y", "cy", "midY", "mid_y"];

const POINT_X_KEYS: &[&str] = &["x", "left", "cx", "centerX", "center_x"];
const POINT_Y_KEYS: &[&str] = &["y", "top", "cy", "centerY", "center_y"];

const POINT_LIST_KEYS: &[&str] = &["vertices", "points", "polygon", "coords", "coordinates"];

const CORNER_KEYS: &[(&str, &str)] = &[
    ("topLeft", "top_left"),
    ("topRight", "top_right"),
    ("bottomRight", "bottom_right"),
    ("bottomLeft", "bottom_left"),
];

/// Nested keys searched by [`extract_entry_rectangle`], after the entry itself.
const NESTED_RECT_KEYS: &[&str] = &[
    "bounds",
    "bbox",
    "box",
    "rect",
    "region",
    "location",
    "position",
    "frame",
    "geometry",
    "boundingBox",
    "bounding_box",
    "coordinates",
];

/// One way of describing a rectangle.
#[derive(Clone, Debug, PartialEq)]
pub enum RectSource {
    /// Origin plus size.
    Explicit { x: f64, y: f64, w: f64, h: f64 },
    /// Four edges.
    Edges {
        left: f64,
        top: f64,
        right: f64,
        bottom: f64,
    },
    /// Center plus size.
    Center { cx: f64, cy: f64, w: f64, h: f64 },
    /// Bounding box of a point list (polygon, vertices or corners).
    Points(Vec<(f64, f64)>),
}

impl RectSource {
    /// Resolves the source into a rectangle with positive area.
    pub fn to_rect(&self) -> Option<Rect> {
        let rect = match *self {
            RectSource::Explicit { x, y, w, h } => Rect::new(x, y, w, h),
            RectSource::Edges {
                left,
                top,
                right,
                bottom,
            } => Rect::new(left, top, right - left, bottom - top),
            RectSource::Center { cx, cy, w, h } => Rect::new(cx - w / 2.0, cy - h / 2.0, w, h),
            RectSource::Points(ref points) => {
                if points.len() < 2 {
                    return None;
                }
                let (mut x0, mut y0) = (f64::INFINITY, f64::INFINITY);
                let (mut x1, mut y1) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
                for &(x, y) in points {
                    x0 = x0.min(x);
                    y0 = y0.min(y);
                    x1 = x1.max(x);
                    y1 = y1.max(y);
                }
                Rect::new(x0, y0, x1 - x0, y1 - y0)
            }
        };
        rect.has_area().then_some(rect)
    }

    /// Every shape found in `value`, in resolution priority order.
    pub fn candidates(value: &Value) -> Vec<RectSource> {
        match value {
            Value::Array(items) => point_list(items).into_iter().collect(),
            Value::Object(map) => object_candidates(map),
            _ => Vec::new(),
        }
    }
}

/// Reads a rectangle from one JSON value.
pub fn extract_rectangle(value: &Value) -> Option<Rect> {
    RectSource::candidates(value)
        .iter()
        .find_map(RectSource::to_rect)
}

/// Reads a rectangle from an overlay-like entry, looking at the entry itself
/// first and then at the usual nested geometry keys.
pub fn extract_entry_rectangle(entry: &Value) -> Option<Rect> {
    extract_rectangle(entry).or_else(|| {
        let map = entry.as_object()?;
        NESTED_RECT_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(extract_rectangle)
    })
}

/// Parses a number leniently: JSON numbers, numeric strings, and strings
/// carrying a unit suffix such as `"12px"`.
pub fn parse_finite_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<f64>().ok().or_else(|| {
                let digits: String = s
                    .chars()
                    .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.'))
                    .collect();
                digits.parse::<f64>().ok()
            })
        }
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn pick(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find_map(parse_finite_number)
}

fn object_candidates(map: &Map<String, Value>) -> Vec<RectSource> {
    let mut out = Vec::new();

    if let (Some(x), Some(y), Some(w), Some(h)) = (
        pick(map, X_KEYS),
        pick(map, Y_KEYS),
        pick(map, W_KEYS),
        pick(map, H_KEYS),
    ) {
        out.push(RectSource::Explicit { x, y, w, h });
    }

    if let (Some(left), Some(top), Some(right), Some(bottom)) = (
        pick(map, LEFT_KEYS),
        pick(map, TOP_KEYS),
        pick(map, RIGHT_KEYS),
        pick(map, BOTTOM_KEYS),
    ) {
        out.push(RectSource::Edges {
            left,
            top,
            right,
            bottom,
        });
    }

    if let (Some(cx), Some(cy), Some(w), Some(h)) = (
        pick(map, CENTER_X_KEYS),
        pick(map, CENTER_Y_KEYS),
        pick(map, W_KEYS),
        pick(map, H_KEYS),
    ) {
        out.push(RectSource::Center { cx, cy, w, h });
    }

    for key in POINT_LIST_KEYS {
        if let Some(Value::Array(items)) = map.get(*key) {
            out.extend(point_list(items));
        }
    }

    if let Some(Value::Object(corners)) = map.get("corners") {
        out.extend(corner_points(corners));
    }
    out.extend(corner_points(map));

    out
}

fn parse_point(value: &Value) -> Option<(f64, f64)> {
    match value {
        Value::Array(items) => {
            let x = parse_finite_number(items.first()?)?;
            let y = parse_finite_number(items.get(1)?)?;
            Some((x, y))
        }
        Value::Object(map) => Some((pick(map, POINT_X_KEYS)?, pick(map, POINT_Y_KEYS)?)),
        _ => None,
    }
}

fn point_list(items: &[Value]) -> Option<RectSource> {
    let points: Vec<(f64, f64)> = items.iter().filter_map(parse_point).collect();
    (points.len() >= 2).then_some(RectSource::Points(points))
}

fn corner_points(map: &Map<String, Value>) -> Option<RectSource> {
    let points: Vec<(f64, f64)> = CORNER_KEYS
        .iter()
        .filter_map(|(camel, snake)| map.get(*camel).or_else(|| map.get(*snake)))
        .filter_map(parse_point)
        .collect();
    (points.len() >= 2).then_some(RectSource::Points(points))
}
