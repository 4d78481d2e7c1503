//! Tests for overlay identity matching and prior overlay sanitizing.

use platemap_core::geometry::{CoordSpace, GridRect, PageBounds, Rect};
use platemap_core::matcher::{
    DetectedDish, MatchOutcome, PriorOverlay, PriorSet, match_overlays, normalize_name,
    similarity,
};
use platemap_core::params::MatchParams;
use serde_json::json;

fn detected(name: &str, x: u32) -> DetectedDish {
    DetectedDish {
        name: name.to_string(),
        rect: GridRect { x, y: 100, w: 50, h: 40 },
    }
}

fn prior(id: &str, name: &str) -> PriorOverlay {
    PriorOverlay {
        id: id.to_string(),
        name: name.to_string(),
        rect: Rect::new(0.0, 0.0, 10.0, 10.0),
        space: CoordSpace::Thousand,
    }
}

fn summary(outcome: &MatchOutcome) -> String {
    let render = |overlays: &[platemap_core::Overlay]| {
        overlays
            .iter()
            .map(|o| format!("{}@{}", o.id, o.x))
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "updated=[{}] new=[{}] unmatched={}",
        render(&outcome.updated),
        render(&outcome.new),
        outcome.unmatched_prior
    )
}

// ============================================================================
// Matching
// ============================================================================

#[test]
fn test_without_priors_everything_is_new() {
    let dishes = [detected("Soup", 10), detected("Salad", 20)];
    let outcome = match_overlays(&dishes, &[], &MatchParams::default());
    assert!(outcome.updated.is_empty());
    let names: Vec<&str> = outcome.new.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, ["Soup", "Salad"]);
    assert!(outcome.new.iter().all(|o| o.id == o.name));
    assert!(outcome.new.iter().all(|o| o.coord_space == CoordSpace::Thousand));
}

#[test]
fn test_exact_match_keeps_prior_identity() {
    let dishes = [detected("TOMATO soup!", 10)];
    let priors = [prior("soup-1", "Tomato Soup")];
    let outcome = match_overlays(&dishes, &priors, &MatchParams::default());

    assert_eq!(outcome.updated.len(), 1);
    let overlay = &outcome.updated[0];
    assert_eq!(overlay.id, "soup-1");
    assert_eq!(overlay.name, "Tomato Soup");
    assert_eq!(overlay.rect(), dishes[0].rect);
    assert_eq!(outcome.unmatched_prior, 0);
}

#[test]
fn test_typo_keeps_prior_name() {
    let dishes = [detected("Ceasar Salad", 10)];
    let priors = [prior("Caesar Salad", "Caesar Salad")];
    let outcome = match_overlays(&dishes, &priors, &MatchParams::default());

    assert!(outcome.new.is_empty());
    assert_eq!(outcome.updated[0].name, "Caesar Salad");
    assert_eq!(outcome.updated[0].x, 10);
}

#[test]
fn test_possessive_matches_exactly_without_apostrophe() {
    let dishes = [detected("Chefs Special", 10)];
    let priors = [prior("special-1", "Chef's Special")];
    let outcome = match_overlays(&dishes, &priors, &MatchParams::default());

    assert!(outcome.new.is_empty());
    assert_eq!(outcome.updated.len(), 1);
    assert_eq!(outcome.updated[0].id, "special-1");
    assert_eq!(outcome.updated[0].name, "Chef's Special");
    assert_eq!(normalize_name("Chef's Special"), "chefs special");
}

#[test]
fn test_unrelated_names_do_not_match() {
    let dishes = [detected("Tiramisu", 10)];
    let priors = [prior("Pad Thai", "Pad Thai")];
    let outcome = match_overlays(&dishes, &priors, &MatchParams::default());

    assert!(outcome.updated.is_empty());
    assert_eq!(outcome.new[0].name, "Tiramisu");
    assert_eq!(outcome.unmatched_prior, 1);
}

#[test]
fn test_exact_pass_runs_before_fuzzy_pass() {
    // "Chicken Soup" would fuzzily take "Chicken Soup Bowl" first if the
    // passes were interleaved.
    let dishes = [detected("Chicken Soup", 10), detected("Chicken Soup Bowl", 20)];
    let priors = [prior("a", "Chicken Soup Bowl"), prior("b", "Chicken Soup")];
    let outcome = match_overlays(&dishes, &priors, &MatchParams::default());
    insta::assert_snapshot!(summary(&outcome), @"updated=[b@10, a@20] new=[] unmatched=0");
}

#[test]
fn test_greedy_tie_break_order() {
    let dishes = [
        detected("Grilled Chicken Wrap", 10),
        detected("Chicken Salad", 20),
        detected("Lamb Special", 30),
    ];
    let priors = [
        prior("p0", "Grilled Chicken"),
        prior("p1", "Grilled Chicken Salad"),
        prior("p2", "Lamb Curry"),
        prior("p3", "Lamb Stew"),
    ];
    let outcome = match_overlays(&dishes, &priors, &MatchParams::default());
    insta::assert_snapshot!(summary(&outcome), @"updated=[p0@10, p1@20, p2@30] new=[] unmatched=1");
}

#[test]
fn test_new_names_are_suffixed_on_collision() {
    let dishes = [
        detected("Soup", 10),
        detected("Soup", 20),
        detected("soup", 30),
        detected("Bread", 40),
    ];
    let priors = [prior("Soup", "Soup")];
    let outcome = match_overlays(&dishes, &priors, &MatchParams::default());
    insta::assert_snapshot!(
        summary(&outcome),
        @"updated=[Soup@10] new=[Soup (2)@20, soup (3)@30, Bread@40] unmatched=0"
    );
}

#[test]
fn test_similarity_scores() {
    let params = MatchParams::default();
    assert!(similarity("Caesar Salad", "Ceasar Salad", &params) >= 1.0);
    // Typo-equal first tokens still earn the first-token bonus.
    let extended = similarity("Ceasar Salad", "Caesar Salad Bowl", &params);
    assert!((extended - (2.0 / 3.0 + params.first_token_bonus)).abs() < 1e-9);
    assert!(similarity("Soup", "Pasta", &params) < params.min_score);
    assert_eq!(similarity("", "Soup", &params), 0.0);
    assert_eq!(normalize_name("Mac & Cheese"), "mac cheese");
}

// ============================================================================
// Prior overlay sanitizing
// ============================================================================

#[test]
fn test_prior_overlays_are_sanitized() {
    let page = PageBounds::new(2000.0, 1000.0);
    let entries = vec![
        json!({"id": "Soup", "x": 10, "y": 20, "w": 30, "h": 40}),
        json!({"name": "Salad", "bounds": {"x": 0.1, "y": 0.1, "w": 0.2, "h": 0.2}}),
        json!({"dishName": "Steak", "coordSpace": "px", "left": 200, "top": 100, "width": 400, "height": 200}),
        json!({"title": "Pie", "scale": 1000, "x": 50, "y": 50, "w": 20, "h": 20}),
        json!({"id": "soup!", "x": 1, "y": 1, "w": 1, "h": 1}),
        json!({"name": "No geometry"}),
        json!({"x": 1, "y": 1, "w": 1, "h": 1}),
        json!("Soup"),
    ];
    let set = PriorSet::from_values(&entries, &page);

    assert_eq!(set.rejected, 3);
    assert_eq!(set.duplicates, 1);
    let got: Vec<(&str, Rect, CoordSpace)> = set
        .overlays
        .iter()
        .map(|o| (o.name.as_str(), o.rect, o.space))
        .collect();
    assert_eq!(
        got,
        vec![
            ("Soup", Rect::new(100.0, 200.0, 300.0, 400.0), CoordSpace::Percent),
            ("Salad", Rect::new(100.0, 100.0, 200.0, 200.0), CoordSpace::Ratio),
            ("Steak", Rect::new(100.0, 100.0, 200.0, 200.0), CoordSpace::Pixels),
            ("Pie", Rect::new(50.0, 50.0, 20.0, 20.0), CoordSpace::Thousand),
        ]
    );

    let modes: Vec<(CoordSpace, usize)> = set.coord_modes().into_iter().collect();
    assert_eq!(
        modes,
        vec![
            (CoordSpace::Ratio, 1),
            (CoordSpace::Percent, 1),
            (CoordSpace::Pixels, 1),
            (CoordSpace::Thousand, 1),
        ]
    );
}

#[test]
fn test_unit_label_on_nested_bounds() {
    let page = PageBounds::new(1000.0, 1000.0);
    let entries = vec![json!({
        "id": "Tart",
        "bbox": {"x": 10, "y": 10, "w": 10, "h": 10, "unit": "thousand-space"}
    })];
    let set = PriorSet::from_values(&entries, &page);
    assert_eq!(set.overlays[0].space, CoordSpace::Thousand);
    assert_eq!(set.overlays[0].rect, Rect::new(10.0, 10.0, 10.0, 10.0));
}

#[test]
fn test_prior_id_and_name_come_from_different_keys() {
    let page = PageBounds::new(1000.0, 1000.0);
    let entries = vec![json!({"id": 42, "name": "Fish Tacos", "x": 100, "y": 100, "w": 200, "h": 50})];
    let set = PriorSet::from_values(&entries, &page);
    assert_eq!(set.overlays[0].id, "42");
    assert_eq!(set.overlays[0].name, "Fish Tacos");
}
