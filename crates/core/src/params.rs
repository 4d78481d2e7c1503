//! Engine parameters.
//!
//! Every numeric threshold the engine uses lives here so callers can tune a
//! run without touching the algorithms. The defaults are the production
//! values.

use crate::error::{EngineError, Result};

/// Default margin added around a dish's content rectangle, in page units.
pub const DEFAULT_PADDING: f64 = 8.0;

/// Parameters for outlier trimming of a dish's word boxes.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimParams {
    /// Disables trimming entirely when false.
    pub enabled: bool,

    /// Minimum vertical gap (page units) between consecutive word centers
    /// before the group is considered for a row split.
    pub row_gap_floor: f64,

    /// Row split threshold as a multiple of the median word height. The
    /// effective threshold is the larger of this and `row_gap_floor`.
    pub row_gap_height_ratio: f64,

    /// Share of elements the dominant row cluster must keep.
    pub row_split_min_share: f64,

    /// Robust z-score above which an element is discarded.
    pub max_robust_z: f64,

    /// Share of the original elements that must survive trimming; below it
    /// the original set is returned.
    pub min_keep_share: f64,
}

impl Default for TrimParams {
    fn default() -> Self {
        Self {
            enabled: true,
            row_gap_floor: 36.0,
            row_gap_height_ratio: 3.5,
            row_split_min_share: 0.6,
            max_robust_z: 4.0,
            min_keep_share: 0.4,
        }
    }
}

/// Parameters for the overlap resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveParams {
    /// Upper bound on resolver passes.
    pub max_passes: usize,

    /// Absolute floor on the span a guarded split may leave on the split axis.
    pub min_split_span: f64,

    /// Share of the pre-split span a guarded split must keep.
    pub min_split_span_ratio: f64,

    /// Share of the content span a guarded split must keep on the split axis.
    pub min_content_coverage: f64,
}

impl Default for ResolveParams {
    fn default() -> Self {
        Self {
            max_passes: 50,
            min_split_span: 8.0,
            min_split_span_ratio: 0.28,
            min_content_coverage: 0.65,
        }
    }
}

/// Parameters for overlay identity matching.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchParams {
    /// Minimum fuzzy score for a prior/detected pair to be considered.
    pub min_score: f64,

    /// Bonus when one normalized name contains the other.
    pub substring_bonus: f64,

    /// Bonus when both names start with the same token.
    pub first_token_bonus: f64,

    /// Minimum token length (in chars) for typo-tolerant token equality.
    pub typo_min_token_len: usize,

    /// Maximum Damerau-Levenshtein distance for two tokens to count as equal.
    pub typo_max_distance: usize,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            min_score: 0.35,
            substring_bonus: 0.15,
            first_token_bonus: 0.1,
            typo_min_token_len: 5,
            typo_max_distance: 1,
        }
    }
}

/// Full set of engine parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineParams {
    /// Padding used when a request does not carry its own.
    pub default_padding: f64,
    pub trim: TrimParams,
    pub resolve: ResolveParams,
    pub matching: MatchParams,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            default_padding: DEFAULT_PADDING,
            trim: TrimParams::default(),
            resolve: ResolveParams::default(),
            matching: MatchParams::default(),
        }
    }
}

impl EngineParams {
    /// Checks that every parameter is usable.
    pub fn validate(&self) -> Result<()> {
        check_padding(self.default_padding)?;
        check_ratio("trim.row_split_min_share", self.trim.row_split_min_share)?;
        check_ratio("trim.min_keep_share", self.trim.min_keep_share)?;
        check_non_negative("trim.row_gap_floor", self.trim.row_gap_floor)?;
        check_non_negative("trim.row_gap_height_ratio", self.trim.row_gap_height_ratio)?;
        check_non_negative("trim.max_robust_z", self.trim.max_robust_z)?;
        if self.resolve.max_passes == 0 {
            return Err(EngineError::InvalidParams {
                name: "resolve.max_passes",
                msg: "must be at least 1".to_string(),
            });
        }
        check_non_negative("resolve.min_split_span", self.resolve.min_split_span)?;
        check_ratio("resolve.min_split_span_ratio", self.resolve.min_split_span_ratio)?;
        check_ratio("resolve.min_content_coverage", self.resolve.min_content_coverage)?;
        check_non_negative("matching.min_score", self.matching.min_score)?;
        check_non_negative("matching.substring_bonus", self.matching.substring_bonus)?;
        check_non_negative("matching.first_token_bonus", self.matching.first_token_bonus)?;
        Ok(())
    }
}

/// Rejects negative or non-finite padding.
pub(crate) fn check_padding(padding: f64) -> Result<()> {
    if padding.is_finite() && padding >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidPadding(padding))
    }
}

fn check_non_negative(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidParams {
            name,
            msg: format!("must be non-negative and finite, got {value}"),
        })
    }
}

fn check_ratio(name: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EngineError::InvalidParams {
            name,
            msg: format!("must be between 0 and 1, got {value}"),
        })
    }
}
