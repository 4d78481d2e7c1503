//! Tests for rectangle extraction and thousand-space conversion.

use platemap_core::geometry::extract::parse_finite_number;
use platemap_core::geometry::{
    BBox, CoordSpace, GridRect, PageBounds, Rect, convert_to_canonical, extract_entry_rectangle,
    extract_rectangle, to_thousand_grid,
};
use serde_json::json;

// ============================================================================
// Rectangle extraction
// ============================================================================

#[test]
fn test_explicit_form_with_aliases() {
    let value = json!({"left": 10, "top": 20, "width": 30, "height": 40});
    assert_eq!(
        extract_rectangle(&value),
        Some(Rect::new(10.0, 20.0, 30.0, 40.0))
    );

    let relative = json!({"relative_x": 0.1, "relative_y": 0.2, "relativeW": 0.3, "relativeH": 0.4});
    assert_eq!(
        extract_rectangle(&relative),
        Some(Rect::new(0.1, 0.2, 0.3, 0.4))
    );
}

#[test]
fn test_edge_form_aliases() {
    let min_max = json!({"minX": 5, "minY": 6, "maxX": 15, "maxY": 26});
    assert_eq!(
        extract_rectangle(&min_max),
        Some(Rect::new(5.0, 6.0, 10.0, 20.0))
    );

    let short = json!({"l": 1, "t": 2, "r": 11, "b": 12});
    assert_eq!(
        extract_rectangle(&short),
        Some(Rect::new(1.0, 2.0, 10.0, 10.0))
    );
}

#[test]
fn test_center_form() {
    let value = json!({"cx": 50, "cy": 40, "w": 20, "h": 10});
    assert_eq!(
        extract_rectangle(&value),
        Some(Rect::new(40.0, 35.0, 20.0, 10.0))
    );
}

#[test]
fn test_point_lists() {
    let polygon = json!({"polygon": [[10, 10], [50, 12], [48, 40], [12, 38]]});
    assert_eq!(
        extract_rectangle(&polygon),
        Some(Rect::new(10.0, 10.0, 40.0, 30.0))
    );

    let vertices = json!({"vertices": [{"x": "3px", "y": "4"}, {"x": 13, "y": 24}]});
    assert_eq!(
        extract_rectangle(&vertices),
        Some(Rect::new(3.0, 4.0, 10.0, 20.0))
    );

    let bare = json!([[0, 0], [5, 5]]);
    assert_eq!(extract_rectangle(&bare), Some(Rect::new(0.0, 0.0, 5.0, 5.0)));
}

#[test]
fn test_single_point_is_not_a_rectangle() {
    let value = json!({"points": [[10, 10]]});
    assert_eq!(extract_rectangle(&value), None);
}

#[test]
fn test_corner_forms() {
    let nested = json!({"corners": {"topLeft": [10, 20], "bottomRight": [30, 60]}});
    assert_eq!(
        extract_rectangle(&nested),
        Some(Rect::new(10.0, 20.0, 20.0, 40.0))
    );

    let top_level = json!({"top_left": {"x": 1, "y": 1}, "bottom_right": {"x": 4, "y": 9}});
    assert_eq!(
        extract_rectangle(&top_level),
        Some(Rect::new(1.0, 1.0, 3.0, 8.0))
    );
}

#[test]
fn test_no_positive_area_form() {
    assert_eq!(extract_rectangle(&json!({"x": 1, "y": 1, "w": 0, "h": 0})), None);
    assert_eq!(extract_rectangle(&json!({"name": "Soup"})), None);
    assert_eq!(extract_rectangle(&json!("10,10,20,20")), None);
}

#[test]
fn test_entry_rectangle_looks_in_nested_keys() {
    let entry = json!({"id": "Soup", "boundingBox": {"x": 1, "y": 2, "w": 3, "h": 4}});
    assert_eq!(
        extract_entry_rectangle(&entry),
        Some(Rect::new(1.0, 2.0, 3.0, 4.0))
    );

    let top_level_wins = json!({
        "x": 10, "y": 10, "w": 10, "h": 10,
        "bounds": {"x": 1, "y": 2, "w": 3, "h": 4}
    });
    assert_eq!(
        extract_entry_rectangle(&top_level_wins),
        Some(Rect::new(10.0, 10.0, 10.0, 10.0))
    );
}

#[test]
fn test_parse_finite_number_rejects_non_numbers() {
    assert_eq!(parse_finite_number(&json!(7)), Some(7.0));
    assert_eq!(parse_finite_number(&json!("-2.5")), Some(-2.5));
    assert_eq!(parse_finite_number(&json!(true)), None);
    assert_eq!(parse_finite_number(&json!([1])), None);
}

// ============================================================================
// Canonical conversion
// ============================================================================

fn canonical(
    rect: Rect,
    declared: Option<CoordSpace>,
    image: Option<&PageBounds>,
) -> Option<(Rect, CoordSpace)> {
    convert_to_canonical(&rect, declared, image).map(|c| (c.rect, c.space))
}

#[test]
fn test_infer_ratio_percent_thousand() {
    assert_eq!(
        canonical(Rect::new(0.1, 0.2, 0.3, 0.4), None, None),
        Some((Rect::new(100.0, 200.0, 300.0, 400.0), CoordSpace::Ratio))
    );
    assert_eq!(
        canonical(Rect::new(10.0, 20.0, 30.0, 40.0), None, None),
        Some((Rect::new(100.0, 200.0, 300.0, 400.0), CoordSpace::Percent))
    );
    assert_eq!(
        canonical(Rect::new(100.0, 200.0, 300.0, 400.0), None, None),
        Some((Rect::new(100.0, 200.0, 300.0, 400.0), CoordSpace::Thousand))
    );
}

#[test]
fn test_infer_pixels_needs_image() {
    let image = PageBounds::new(2000.0, 1000.0);
    let rect = Rect::new(1500.0, 500.0, 300.0, 200.0);
    assert_eq!(
        canonical(rect, None, Some(&image)),
        Some((Rect::new(750.0, 500.0, 150.0, 200.0), CoordSpace::Pixels))
    );
    assert_eq!(canonical(rect, None, None), None);
    assert_eq!(canonical(rect, Some(CoordSpace::Pixels), None), None);
}

#[test]
fn test_pixels_outside_image_are_rejected() {
    let image = PageBounds::new(1300.0, 1300.0);
    let rect = Rect::new(1400.0, 10.0, 200.0, 10.0);
    assert_eq!(canonical(rect, None, Some(&image)), None);
}

#[test]
fn test_negative_values_are_not_inferred() {
    assert_eq!(canonical(Rect::new(-5.0, 10.0, 20.0, 20.0), None, None), None);
}

#[test]
fn test_declared_unit_overrides_magnitude() {
    let image = PageBounds::new(400.0, 200.0);
    assert_eq!(
        canonical(
            Rect::new(100.0, 50.0, 100.0, 50.0),
            Some(CoordSpace::Pixels),
            Some(&image)
        ),
        Some((Rect::new(250.0, 250.0, 250.0, 250.0), CoordSpace::Pixels))
    );
}

#[test]
fn test_conversion_clamps_into_canvas() {
    let (rect, _) = canonical(Rect::new(0.95, 0.0, 0.2, 0.5), None, None).unwrap();
    assert_eq!(rect, Rect::new(950.0, 0.0, 50.0, 500.0));

    let (tiny, _) = canonical(
        Rect::new(10.0, 10.0, 0.0001, 0.0001),
        Some(CoordSpace::Thousand),
        None,
    )
    .unwrap();
    assert_eq!(tiny, Rect::new(10.0, 10.0, 1.0, 1.0));
}

#[test]
fn test_canonicalization_is_idempotent() {
    let inputs = [
        Rect::new(0.123, 0.456, 0.2, 0.1),
        Rect::new(12.5, 40.25, 30.0, 9.75),
        Rect::new(333.333, 20.0, 100.5, 60.0),
    ];
    for rect in inputs {
        let (once, _) = canonical(rect, None, None).unwrap();
        let (twice, space) = canonical(once, None, None).unwrap();
        assert_eq!(once, twice, "re-converting {rect:?}");
        assert_eq!(space, CoordSpace::Thousand);
        let (declared, _) = canonical(once, Some(CoordSpace::Thousand), None).unwrap();
        assert_eq!(once, declared);
    }
}

// ============================================================================
// Thousand-space grid
// ============================================================================

#[test]
fn test_grid_scales_each_axis() {
    let page = PageBounds::new(2000.0, 1000.0);
    let grid = to_thousand_grid(&BBox::new(100.0, 50.0, 300.0, 150.0), &page);
    assert_eq!(
        grid,
        GridRect {
            x: 50,
            y: 50,
            w: 100,
            h: 100
        }
    );
}

#[test]
fn test_grid_stays_inside_canvas() {
    let page = PageBounds::new(640.0, 480.0);
    let grid = to_thousand_grid(&BBox::new(0.0, 0.0, 640.0, 480.0), &page);
    assert_eq!(grid.right(), 1000);
    assert_eq!(grid.bottom(), 1000);
}
