//! Outlier trimming for a dish's word boxes.
//!
//! An LLM grouping occasionally sweeps a stray token or a whole neighbouring
//! line into a dish. Two filters run in sequence: a row split that drops a
//! detached line, then a robust (median/MAD) z-score filter on word centers.
//! When the evidence is weak the original set is returned untouched.

use ordered_float::OrderedFloat;
use tracing::debug;

use crate::dish::Element;
use crate::params::TrimParams;

/// Consistency constant relating MAD to the standard deviation of a normal
/// distribution.
const MAD_SCALE: f64 = 0.6745;

/// Trims outliers with the default parameters.
pub fn trim_outliers(elements: &[Element]) -> Vec<Element> {
    trim_outliers_with(elements, &TrimParams::default())
}

/// Trims outliers from `elements`, preserving input order.
pub fn trim_outliers_with(elements: &[Element], params: &TrimParams) -> Vec<Element> {
    trim_indices(elements, params)
        .into_iter()
        .map(|i| elements[i].clone())
        .collect()
}

/// Indices of the elements that survive trimming, in input order.
pub(crate) fn trim_indices(elements: &[Element], params: &TrimParams) -> Vec<usize> {
    let all: Vec<usize> = (0..elements.len()).collect();
    if !params.enabled || elements.len() <= 2 {
        return all;
    }

    let mut keep = split_rows(elements, &all, params).unwrap_or_else(|| all.clone());
    keep = robust_filter(elements, &keep, params.max_robust_z);

    let total = elements.len();
    if keep.len() < 2 || (keep.len() as f64) < params.min_keep_share * total as f64 {
        debug!(
            total,
            kept = keep.len(),
            "trim too aggressive, keeping original elements"
        );
        return all;
    }
    keep
}

/// Median of `values`; `None` when empty.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by_key(|v| OrderedFloat(*v));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Median absolute deviation around `center`.
pub fn median_abs_deviation(values: &[f64], center: f64) -> Option<f64> {
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&deviations)
}

/// Splits the group at its largest vertical gap and returns the dominant
/// cluster, if the gap is wide enough and the cluster is large enough.
fn split_rows(elements: &[Element], indices: &[usize], params: &TrimParams) -> Option<Vec<usize>> {
    let mut order = indices.to_vec();
    order.sort_by_key(|&i| OrderedFloat(elements[i].center().1));

    let (split_at, gap) = order
        .windows(2)
        .enumerate()
        .map(|(pos, pair)| (pos, elements[pair[1]].center().1 - elements[pair[0]].center().1))
        .fold(None, |best: Option<(usize, f64)>, (pos, gap)| match best {
            Some((_, best_gap)) if best_gap >= gap => best,
            _ => Some((pos, gap)),
        })?;

    let heights: Vec<f64> = order.iter().map(|&i| elements[i].bbox().height()).collect();
    let median_height = median(&heights).unwrap_or(0.0);
    let threshold = params
        .row_gap_floor
        .max(params.row_gap_height_ratio * median_height);
    if gap <= threshold {
        return None;
    }

    let (above, below) = order.split_at(split_at + 1);
    let dominant = if above.len() != below.len() {
        if above.len() > below.len() { above } else { below }
    } else if vertical_span(elements, below) < vertical_span(elements, above) {
        below
    } else {
        above
    };

    let share = dominant.len() as f64 / order.len() as f64;
    if dominant.len() < 2 || share < params.row_split_min_share {
        return None;
    }

    debug!(
        gap,
        threshold,
        kept = dominant.len(),
        dropped = order.len() - dominant.len(),
        "row split removed a detached line"
    );
    let mut kept = dominant.to_vec();
    kept.sort_unstable();
    Some(kept)
}

fn vertical_span(elements: &[Element], cluster: &[usize]) -> f64 {
    let top = cluster
        .iter()
        .map(|&i| elements[i].bbox().top)
        .fold(f64::INFINITY, f64::min);
    let bottom = cluster
        .iter()
        .map(|&i| elements[i].bbox().bottom)
        .fold(f64::NEG_INFINITY, f64::max);
    bottom - top
}

/// Drops elements whose robust z-score exceeds `max_z` on either axis.
/// Skipped entirely when either axis has no spread.
fn robust_filter(elements: &[Element], indices: &[usize], max_z: f64) -> Vec<usize> {
    let xs: Vec<f64> = indices.iter().map(|&i| elements[i].center().0).collect();
    let ys: Vec<f64> = indices.iter().map(|&i| elements[i].center().1).collect();

    let (Some(mx), Some(my)) = (median(&xs), median(&ys)) else {
        return indices.to_vec();
    };
    let mad_x = median_abs_deviation(&xs, mx).unwrap_or(0.0);
    let mad_y = median_abs_deviation(&ys, my).unwrap_or(0.0);
    let usable = |mad: f64| mad.is_finite() && mad > 0.0;
    if !usable(mad_x) || !usable(mad_y) {
        return indices.to_vec();
    }

    let kept: Vec<usize> = indices
        .iter()
        .zip(xs.iter().zip(&ys))
        .filter(|(_, (x, y))| {
            let zx = MAD_SCALE * (**x - mx).abs() / mad_x;
            let zy = MAD_SCALE * (**y - my).abs() / mad_y;
            zx <= max_z && zy <= max_z
        })
        .map(|(&i, _)| i)
        .collect();

    if kept.len() < indices.len() {
        debug!(
            dropped = indices.len() - kept.len(),
            "robust filter dropped outlying words"
        );
    }
    kept
}
