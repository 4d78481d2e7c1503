//! OCR elements, dish groups, and per-dish content/padded boxes.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{BBox, PageBounds};
use crate::params::TrimParams;
use crate::trim::trim_indices;

/// One OCR-detected word, in source pixel space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: i64,
    #[serde(default)]
    pub text: String,
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Element {
    pub fn new(
        id: i64,
        text: impl Into<String>,
        x_min: f64,
        y_min: f64,
        x_max: f64,
        y_max: f64,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x_min.is_finite()
            && self.y_min.is_finite()
            && self.x_max.is_finite()
            && self.y_max.is_finite()
    }

    /// Edge box with inverted edges put back in order.
    pub fn bbox(&self) -> BBox {
        BBox::new(
            self.x_min.min(self.x_max),
            self.y_min.min(self.y_max),
            self.x_min.max(self.x_max),
            self.y_min.max(self.y_max),
        )
    }

    pub fn center(&self) -> (f64, f64) {
        self.bbox().center()
    }
}

/// An LLM-proposed association of a dish name with OCR element ids.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DishGroup {
    pub name: String,
    #[serde(default)]
    pub element_ids: Vec<i64>,
}

impl DishGroup {
    pub fn new(name: impl Into<String>, element_ids: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            element_ids,
        }
    }
}

/// A dish group after outlier rejection.
///
/// `elements` keeps every resolved element for provenance; only `core`
/// drives geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct TrimmedDish {
    pub name: String,
    pub elements: Vec<Element>,
    pub core: Vec<Element>,
}

impl TrimmedDish {
    /// Number of elements removed by trimming.
    pub fn trimmed_count(&self) -> usize {
        self.elements.len() - self.core.len()
    }
}

/// A dish's content box and the padded box that must not overlap others.
#[derive(Clone, Debug, PartialEq)]
pub struct DishBox {
    pub name: String,
    pub content: BBox,
    pub padded: BBox,
    pub element_ids: Vec<i64>,
}

impl DishBox {
    /// Raw pad distances `[left, top, right, bottom]` from content edge to
    /// padded edge. Negative when the padded box cuts into the content.
    pub fn pads(&self) -> [f64; 4] {
        [
            self.content.x0 - self.padded.x0,
            self.content.top - self.padded.top,
            self.padded.x1 - self.content.x1,
            self.padded.bottom - self.content.bottom,
        ]
    }
}

/// Element lookup by id. The first element wins when ids repeat.
pub struct ElementIndex<'a> {
    by_id: FxHashMap<i64, &'a Element>,
}

impl<'a> ElementIndex<'a> {
    pub fn new(elements: &'a [Element]) -> Self {
        let mut by_id = FxHashMap::default();
        for element in elements.iter().filter(|e| e.is_finite()) {
            by_id.entry(element.id).or_insert(element);
        }
        Self { by_id }
    }

    /// Resolves a group's ids, skipping unknown and repeated ids.
    pub fn resolve(&self, group: &DishGroup) -> Vec<Element> {
        let mut seen = FxHashSet::default();
        group
            .element_ids
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| self.by_id.get(id).map(|e| (*e).clone()))
            .collect()
    }
}

/// Resolves a group's elements and trims its outliers.
pub fn trim_dish(
    group: &DishGroup,
    index: &ElementIndex<'_>,
    params: &TrimParams,
) -> TrimmedDish {
    let elements = index.resolve(group);
    let core = trim_indices(&elements, params)
        .into_iter()
        .map(|i| elements[i].clone())
        .collect();
    TrimmedDish {
        name: group.name.trim().to_string(),
        elements,
        core,
    }
}

/// Builds the content and padded boxes for one dish.
///
/// Returns `None` when no usable element remains.
pub fn build_dish(
    group: &DishGroup,
    trimmed: &[Element],
    padding: f64,
    page: &PageBounds,
) -> Option<DishBox> {
    let content = trimmed
        .iter()
        .filter(|e| e.is_finite())
        .map(Element::bbox)
        .reduce(|acc, b| acc.union(&b))?;
    let content = floor_size(content.clamp_to(page), page);
    let padded = content.expand(padding).clamp_to(page);

    Some(DishBox {
        name: group.name.trim().to_string(),
        content,
        padded,
        element_ids: trimmed.iter().map(|e| e.id).collect(),
    })
}

/// Gives the box at least one unit of width and height inside the page.
fn floor_size(mut bbox: BBox, page: &PageBounds) -> BBox {
    if bbox.width() < 1.0 {
        bbox.x1 = (bbox.x0 + 1.0).min(page.width);
        bbox.x0 = bbox.x0.min(bbox.x1 - 1.0).max(0.0);
    }
    if bbox.height() < 1.0 {
        bbox.bottom = (bbox.top + 1.0).min(page.height);
        bbox.top = bbox.top.min(bbox.bottom - 1.0).max(0.0);
    }
    bbox
}

/// Result of building every dish on a page.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DishBuild {
    pub dishes: Vec<DishBox>,
    /// Groups dropped for an empty name or no resolvable elements.
    pub dropped: usize,
    /// Elements removed by outlier trimming across all dishes.
    pub trimmed_elements: usize,
}

/// Trims and boxes every group.
pub fn build_dishes(
    elements: &[Element],
    groups: &[DishGroup],
    padding: f64,
    page: &PageBounds,
    params: &TrimParams,
) -> DishBuild {
    let index = ElementIndex::new(elements);
    let mut build = DishBuild::default();

    for group in groups {
        if group.name.trim().is_empty() {
            build.dropped += 1;
            continue;
        }
        let trimmed = trim_dish(group, &index, params);
        build.trimmed_elements += trimmed.trimmed_count();
        match build_dish(group, &trimmed.core, padding, page) {
            Some(dish) => build.dishes.push(dish),
            None => {
                debug!(dish = %trimmed.name, "no resolvable elements, dropping dish");
                build.dropped += 1;
            }
        }
    }
    build
}
