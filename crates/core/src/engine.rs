//! Analysis entry point.
//!
//! Sequences the pipeline for one menu page:
//! - resolve and trim each dish group's words
//! - build content and padded boxes
//! - resolve overlaps between padded boxes
//! - project onto the thousand-space grid
//! - reconcile against prior overlays (remap mode only)

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::dish::{DishGroup, Element, build_dishes};
use crate::error::{EngineError, Result};
use crate::geometry::{CoordSpace, PageBounds, to_thousand_grid};
use crate::matcher::{DetectedDish, MatchOutcome, Overlay, PriorSet, match_overlays};
use crate::params::{EngineParams, check_padding};
use crate::resolve::resolve_overlaps;

/// What the caller wants from an analysis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Every detected dish is reported as new.
    #[default]
    Detect,
    /// Detected dishes are matched against `priorOverlays`.
    Remap,
}

/// One page to analyze.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub elements: Vec<Element>,
    #[serde(default)]
    pub dish_groups: Vec<DishGroup>,
    /// Loosely shaped overlays from a previous analysis. Required for remap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_overlays: Option<Vec<Value>>,
    /// Margin around each dish in page units; the engine default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<f64>,
    pub page_bounds: PageBounds,
}

impl AnalysisRequest {
    /// A detect-mode request with no elements.
    pub fn new(page_bounds: PageBounds) -> Self {
        Self {
            mode: Mode::Detect,
            elements: Vec::new(),
            dish_groups: Vec::new(),
            prior_overlays: None,
            padding: None,
            page_bounds,
        }
    }
}

/// Counters describing what happened during an analysis.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub element_count: usize,
    pub dish_count: usize,
    pub matched_count: usize,
    pub dropped_dish_count: usize,
    pub trimmed_element_count: usize,
    pub unmatched_prior_count: usize,
    pub rejected_prior_count: usize,
    pub duplicate_prior_count: usize,
    pub resolver_passes: usize,
    pub residual_overlap_count: usize,
    pub prior_coord_modes: IndexMap<CoordSpace, usize>,
}

/// Overlays produced by an analysis.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    /// Detected dishes that kept a prior identity.
    pub updated_overlays: Vec<Overlay>,
    /// Detected dishes without a prior counterpart.
    pub new_overlays: Vec<Overlay>,
    pub diagnostics: Diagnostics,
}

/// Runs the full pipeline on one page.
///
/// Dishes are reported in reading order (top to bottom, then left to right
/// by padded box).
pub fn analyze(request: &AnalysisRequest, params: &EngineParams) -> Result<AnalysisResponse> {
    params.validate()?;
    let page = request.page_bounds;
    if !page.is_valid() {
        return Err(EngineError::InvalidPageBounds {
            width: page.width,
            height: page.height,
        });
    }
    let padding = request.padding.unwrap_or(params.default_padding);
    check_padding(padding)?;

    let priors = match request.mode {
        Mode::Detect => PriorSet::default(),
        Mode::Remap => {
            let entries = request
                .prior_overlays
                .as_deref()
                .ok_or(EngineError::MissingPriorOverlays)?;
            PriorSet::from_values(entries, &page)
        }
    };

    let mut build = build_dishes(
        &request.elements,
        &request.dish_groups,
        padding,
        &page,
        &params.trim,
    );
    let report = resolve_overlaps(&mut build.dishes, &page, &params.resolve);

    let detected: Vec<DetectedDish> = build
        .dishes
        .iter()
        .map(|dish| DetectedDish {
            name: dish.name.clone(),
            rect: to_thousand_grid(&dish.padded, &page),
        })
        .collect();
    let residual_overlap_count = count_grid_overlaps(&detected);

    let MatchOutcome {
        updated,
        new,
        unmatched_prior,
    } = match_overlays(&detected, &priors.overlays, &params.matching);

    let diagnostics = Diagnostics {
        element_count: request.elements.len(),
        dish_count: detected.len(),
        matched_count: updated.len(),
        dropped_dish_count: build.dropped,
        trimmed_element_count: build.trimmed_elements,
        unmatched_prior_count: unmatched_prior,
        rejected_prior_count: priors.rejected,
        duplicate_prior_count: priors.duplicates,
        resolver_passes: report.passes,
        residual_overlap_count,
        prior_coord_modes: priors.coord_modes(),
    };
    debug!(?diagnostics, mode = ?request.mode, "analysis finished");

    Ok(AnalysisResponse {
        updated_overlays: updated,
        new_overlays: new,
        diagnostics,
    })
}

fn count_grid_overlaps(detected: &[DetectedDish]) -> usize {
    detected
        .iter()
        .tuple_combinations()
        .filter(|(a, b)| a.rect.overlaps(&b.rect))
        .count()
}
