//! Overlay identity matching.
//!
//! Detected dishes are reconciled against the overlays stored from a
//! previous analysis so that a re-scanned menu keeps its overlay ids. An
//! exact pass pairs identical normalized names; a fuzzy pass pairs the rest
//! by token similarity, best score first.

use std::collections::VecDeque;

use indexmap::IndexMap;
use itertools::Itertools;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smol_str::SmolStr;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use crate::geometry::extract::parse_finite_number;
use crate::geometry::{
    CoordSpace, GridRect, PageBounds, Rect, convert_to_canonical, extract_entry_rectangle,
};
use crate::params::MatchParams;

/// Keys read for a prior overlay's id, in priority order.
const ID_KEYS: &[&str] = &["id", "name", "dishName", "item", "label", "title"];
/// Keys read for a prior overlay's display name, in priority order.
const NAME_KEYS: &[&str] = &["name", "dishName", "item", "label", "title", "id"];
/// Keys carrying a coordinate unit label.
const UNIT_KEYS: &[&str] = &["coordSpace", "coord_space", "space", "units", "unit"];
/// Keys carrying a numeric coordinate scale.
const SCALE_KEYS: &[&str] = &["scale", "coordinateScale"];
/// Nested objects also searched for unit labels and scale hints.
const UNIT_SCOPES: &[&str] = &["bounds", "bbox"];
/// A scale in this range marks thousand-space coordinates.
const THOUSAND_SCALE_RANGE: std::ops::RangeInclusive<f64> = 900.0..=1100.0;

/// Marks that join the letters of one word, as in "Chef's" or "B.B.Q.".
const IN_WORD_MARKS: &[char] = &['\'', '\u{2018}', '\u{2019}', '\u{02BC}', '`', '.'];

/// Normalizes a dish name for comparison: NFKC, lowercase, in-word marks
/// dropped, other punctuation to spaces, whitespace collapsed.
pub fn normalize_name(name: &str) -> String {
    name.nfkc()
        .flat_map(char::to_lowercase)
        .filter(|c| !IN_WORD_MARKS.contains(c))
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .join(" ")
}

/// A normalized name and its distinct tokens longer than one character.
#[derive(Clone, Debug, PartialEq)]
struct NameKey {
    normalized: String,
    tokens: Vec<SmolStr>,
}

impl NameKey {
    fn new(name: &str) -> Self {
        let normalized = normalize_name(name);
        let tokens = normalized
            .split(' ')
            .filter(|t| t.chars().count() > 1)
            .map(SmolStr::new)
            .unique()
            .collect();
        Self { normalized, tokens }
    }
}

fn tokens_equal(a: &str, b: &str, params: &MatchParams) -> bool {
    if a == b {
        return true;
    }
    a.chars().count() >= params.typo_min_token_len
        && b.chars().count() >= params.typo_min_token_len
        && strsim::damerau_levenshtein(a, b) <= params.typo_max_distance
}

/// Jaccard index over token sets where near-identical long tokens count as
/// shared.
fn soft_jaccard(a: &[SmolStr], b: &[SmolStr], params: &MatchParams) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let mut used = vec![false; b.len()];
    let mut pending = Vec::new();
    for token in a {
        match b.iter().position(|other| other == token) {
            Some(j) => used[j] = true,
            None => pending.push(token),
        }
    }
    for token in pending {
        let found = b
            .iter()
            .enumerate()
            .find(|(j, other)| !used[*j] && tokens_equal(token, other, params));
        if let Some((j, _)) = found {
            used[j] = true;
        }
    }
    let shared = used.iter().filter(|u| **u).count();
    shared as f64 / (a.len() + b.len() - shared) as f64
}

fn score(a: &NameKey, b: &NameKey, params: &MatchParams) -> f64 {
    if a.normalized.is_empty() || b.normalized.is_empty() {
        return 0.0;
    }
    let mut score = soft_jaccard(&a.tokens, &b.tokens, params);
    if a.normalized.contains(&b.normalized) || b.normalized.contains(&a.normalized) {
        score += params.substring_bonus;
    }
    let same_first = match (a.tokens.first(), b.tokens.first()) {
        (Some(x), Some(y)) => tokens_equal(x, y, params),
        _ => false,
    };
    if same_first {
        score += params.first_token_bonus;
    }
    score
}

/// Fuzzy similarity of two raw dish names.
pub fn similarity(a: &str, b: &str, params: &MatchParams) -> f64 {
    score(&NameKey::new(a), &NameKey::new(b), params)
}

/// A stored overlay from a previous analysis, already in thousand-space.
#[derive(Clone, Debug, PartialEq)]
pub struct PriorOverlay {
    pub id: String,
    pub name: String,
    pub rect: Rect,
    /// Unit the stored rectangle was written in.
    pub space: CoordSpace,
}

/// A resolved dish on the thousand-space grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetectedDish {
    pub name: String,
    pub rect: GridRect,
}

/// An output overlay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overlay {
    pub id: String,
    pub name: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub coord_space: CoordSpace,
}

impl Overlay {
    pub fn new(id: impl Into<String>, name: impl Into<String>, rect: GridRect) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
            coord_space: CoordSpace::Thousand,
        }
    }

    pub fn rect(&self) -> GridRect {
        GridRect {
            x: self.x,
            y: self.y,
            w: self.w,
            h: self.h,
        }
    }
}

fn first_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().filter_map(|key| map.get(*key)).find_map(|value| match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// The unit an entry declares for its geometry, if any.
fn declared_space(map: &Map<String, Value>) -> Option<CoordSpace> {
    let scopes = std::iter::once(map)
        .chain(UNIT_SCOPES.iter().filter_map(|key| map.get(*key)?.as_object()));
    for scope in scopes {
        let label = UNIT_KEYS
            .iter()
            .filter_map(|key| scope.get(*key)?.as_str())
            .find_map(CoordSpace::from_label);
        if label.is_some() {
            return label;
        }
        let thousand_hint = SCALE_KEYS
            .iter()
            .filter_map(|key| scope.get(*key))
            .filter_map(parse_finite_number)
            .any(|scale| THOUSAND_SCALE_RANGE.contains(&scale));
        if thousand_hint {
            return Some(CoordSpace::Thousand);
        }
    }
    None
}

/// Reads one loosely shaped prior overlay and converts it to thousand-space.
///
/// Returns `None` for entries without a name or without usable geometry.
/// `page` stands in for the image dimensions of pixel-space entries.
pub fn sanitize_prior_overlay(entry: &Value, page: &PageBounds) -> Option<PriorOverlay> {
    let map = entry.as_object()?;
    let id = first_text(map, ID_KEYS)?;
    let name = first_text(map, NAME_KEYS)?;
    let rect = extract_entry_rectangle(entry)?;
    let canonical = convert_to_canonical(&rect, declared_space(map), Some(page))?;
    Some(PriorOverlay {
        id,
        name,
        rect: canonical.rect,
        space: canonical.space,
    })
}

/// Result of sanitizing a prior overlay list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PriorSet {
    pub overlays: Vec<PriorOverlay>,
    /// Entries without a name or usable geometry.
    pub rejected: usize,
    /// Entries dropped as duplicates of an earlier normalized name.
    pub duplicates: usize,
}

impl PriorSet {
    /// Sanitizes `entries`, keeping the first overlay per normalized name.
    pub fn from_values(entries: &[Value], page: &PageBounds) -> Self {
        let mut set = PriorSet::default();
        let mut seen = FxHashSet::default();
        for entry in entries {
            let Some(overlay) = sanitize_prior_overlay(entry, page) else {
                set.rejected += 1;
                continue;
            };
            if seen.insert(normalize_name(&overlay.name)) {
                set.overlays.push(overlay);
            } else {
                set.duplicates += 1;
            }
        }
        if set.rejected > 0 || set.duplicates > 0 {
            debug!(
                kept = set.overlays.len(),
                rejected = set.rejected,
                duplicates = set.duplicates,
                "sanitized prior overlays"
            );
        }
        set
    }

    /// Number of kept overlays per source unit.
    pub fn coord_modes(&self) -> IndexMap<CoordSpace, usize> {
        let mut modes = IndexMap::new();
        for overlay in &self.overlays {
            *modes.entry(overlay.space).or_insert(0) += 1;
        }
        modes.sort_keys();
        modes
    }
}

/// Result of matching detected dishes against prior overlays.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatchOutcome {
    /// Detected dishes that kept a prior identity, in detected order.
    pub updated: Vec<Overlay>,
    /// Detected dishes with no prior counterpart, in detected order.
    pub new: Vec<Overlay>,
    /// Prior overlays no detected dish claimed.
    pub unmatched_prior: usize,
}

/// Pairs detected dishes with prior overlays.
///
/// Matched dishes take the prior id and name with the detected geometry.
/// Unmatched dishes become new overlays whose id is their name, suffixed
/// `" (2)"`, `" (3)"`, ... when it collides with a prior or earlier name.
pub fn match_overlays(
    detected: &[DetectedDish],
    prior: &[PriorOverlay],
    params: &MatchParams,
) -> MatchOutcome {
    let det_keys: Vec<NameKey> = detected.iter().map(|d| NameKey::new(&d.name)).collect();
    let prior_keys: Vec<NameKey> = prior.iter().map(|p| NameKey::new(&p.name)).collect();

    let mut pairing: Vec<Option<usize>> = vec![None; detected.len()];
    let mut prior_used = vec![false; prior.len()];

    let mut buckets: IndexMap<&str, VecDeque<usize>> = IndexMap::new();
    for (pi, key) in prior_keys.iter().enumerate() {
        if !key.normalized.is_empty() {
            buckets.entry(key.normalized.as_str()).or_default().push_back(pi);
        }
    }
    for (di, key) in det_keys.iter().enumerate() {
        if let Some(pi) = buckets
            .get_mut(key.normalized.as_str())
            .and_then(VecDeque::pop_front)
        {
            pairing[di] = Some(pi);
            prior_used[pi] = true;
        }
    }

    let mut candidates = Vec::new();
    for (pi, prior_key) in prior_keys.iter().enumerate() {
        if prior_used[pi] {
            continue;
        }
        for (di, det_key) in det_keys.iter().enumerate() {
            if pairing[di].is_some() {
                continue;
            }
            let score = score(prior_key, det_key, params);
            if score >= params.min_score {
                candidates.push((score, pi, di));
            }
        }
    }
    candidates.sort_by(|a, b| b.0.total_cmp(&a.0));
    for (score, pi, di) in candidates {
        if prior_used[pi] || pairing[di].is_some() {
            continue;
        }
        debug!(
            prior = %prior[pi].name,
            detected = %detected[di].name,
            score,
            "fuzzy overlay match"
        );
        pairing[di] = Some(pi);
        prior_used[pi] = true;
    }

    let mut taken: FxHashSet<String> = prior_keys.into_iter().map(|k| k.normalized).collect();
    let mut outcome = MatchOutcome::default();
    for (dish, paired) in detected.iter().zip(pairing) {
        match paired {
            Some(pi) => outcome
                .updated
                .push(Overlay::new(&prior[pi].id, &prior[pi].name, dish.rect)),
            None => {
                let name = unique_name(&dish.name, &mut taken);
                outcome.new.push(Overlay::new(&name, &name, dish.rect));
            }
        }
    }
    outcome.unmatched_prior = prior_used.iter().filter(|used| !**used).count();
    outcome
}

/// Returns `name`, or the first `"name (n)"` whose normalized form is free,
/// and reserves it.
fn unique_name(name: &str, taken: &mut FxHashSet<String>) -> String {
    if taken.insert(normalize_name(name)) {
        return name.to_string();
    }
    (2..)
        .map(|n| format!("{name} ({n})"))
        .find(|candidate| taken.insert(normalize_name(candidate)))
        .unwrap_or_else(|| name.to_string())
}
