//! platemap - dish bounding boxes and overlay reconciliation for menu photos.
//!
//! Takes OCR word boxes plus a grouping of those words into dishes and
//! produces one non-overlapping overlay per dish on a 0-1000 grid, keeping
//! the identities of overlays stored from an earlier scan.

pub mod dish;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod matcher;
pub mod params;
pub mod resolve;
pub mod trim;

pub use dish::{DishBox, DishGroup, Element, TrimmedDish, build_dish, build_dishes};
pub use engine::{AnalysisRequest, AnalysisResponse, Diagnostics, Mode, analyze};
pub use error::{EngineError, Result};
pub use geometry::{
    BBox, CoordSpace, GridRect, PageBounds, Rect, convert_to_canonical, extract_entry_rectangle,
    extract_rectangle,
};
pub use matcher::{DetectedDish, MatchOutcome, Overlay, PriorOverlay, match_overlays};
pub use params::{EngineParams, MatchParams, ResolveParams, TrimParams};
pub use resolve::{ResolveReport, resolve_overlaps};
pub use trim::{trim_outliers, trim_outliers_with};
