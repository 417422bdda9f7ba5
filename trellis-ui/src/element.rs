//! Headless native elements.
//!
//! An `Element` is the retained native object a view manager creates and
//! mutates through its property setters. Elements live in an `ElementTree`
//! arena keyed by view tag; parent/child links are tags, never references.

use std::collections::HashMap;

use trellis_api::{Map, Rect, Value, ViewTag};

/// 3D composite transform, created on first use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeTransform {
    pub translate_x: f64,
    pub translate_y: f64,
    pub translate_z: f64,
    pub rotation_x: f64,
    pub rotation_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Default for CompositeTransform {
    fn default() -> Self {
        Self {
            translate_x: 0.0,
            translate_y: 0.0,
            translate_z: 0.0,
            rotation_x: 0.0,
            rotation_y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

/// Resolved border thickness per side.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Thickness {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

/// Border width slots, in property-group order.
pub const BORDER_ALL: usize = 0;
pub const BORDER_LEFT: usize = 1;
pub const BORDER_RIGHT: usize = 2;
pub const BORDER_TOP: usize = 3;
pub const BORDER_BOTTOM: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: ViewTag,
    pub class_name: String,
    pub parent: Option<ViewTag>,
    pub children: Vec<ViewTag>,
    /// Rendered frame. Zero until the first layout lands.
    pub frame: Rect,
    pub opacity: f64,
    pub transform: Option<CompositeTransform>,
    pub background_color: Option<u32>,
    pub border_color: Option<u32>,
    pub border_radius: Option<f64>,
    /// `NaN` marks an unset slot.
    pub border_widths: [f64; 5],
    /// Manager-specific state (text content, font size, ...).
    pub attributes: Map,
}

impl Element {
    pub fn new(tag: ViewTag, class_name: impl Into<String>) -> Self {
        Self {
            tag,
            class_name: class_name.into(),
            parent: None,
            children: Vec::new(),
            frame: Rect::ZERO,
            opacity: 1.0,
            transform: None,
            background_color: None,
            border_color: None,
            border_radius: None,
            border_widths: [f64::NAN; 5],
            attributes: Map::new(),
        }
    }

    pub fn ensure_transform(&mut self) -> &mut CompositeTransform {
        self.transform.get_or_insert_with(CompositeTransform::default)
    }

    /// Current scale, `(1, 1)` without a transform.
    pub fn scale(&self) -> (f64, f64) {
        self.transform
            .map(|t| (t.scale_x, t.scale_y))
            .unwrap_or((1.0, 1.0))
    }

    /// Side widths fall back to `borderWidth`, then to zero.
    pub fn border_thickness(&self) -> Thickness {
        let side = |slot: usize| {
            let specific = self.border_widths[slot];
            let all = self.border_widths[BORDER_ALL];
            if !specific.is_nan() {
                specific
            } else if !all.is_nan() {
                all
            } else {
                0.0
            }
        };
        Thickness {
            left: side(BORDER_LEFT),
            right: side(BORDER_RIGHT),
            top: side(BORDER_TOP),
            bottom: side(BORDER_BOTTOM),
        }
    }

    /// Visual state as a structured value. Children are not included.
    pub fn describe(&self) -> Map {
        let mut out = Map::new();
        out.insert("tag".into(), Value::from(self.tag.0));
        out.insert("className".into(), Value::from(self.class_name.as_str()));
        out.insert("frame".into(), rect_value(&self.frame));
        out.insert("opacity".into(), Value::from(self.opacity));
        if let Some(t) = &self.transform {
            let transform = Value::from_iter([
                ("translateX", t.translate_x),
                ("translateY", t.translate_y),
                ("translateZ", t.translate_z),
                ("rotateX", t.rotation_x),
                ("rotateY", t.rotation_y),
                ("scaleX", t.scale_x),
                ("scaleY", t.scale_y),
            ]);
            out.insert("transform".into(), transform);
        }
        if let Some(color) = self.background_color {
            out.insert("backgroundColor".into(), Value::from(color as i64));
        }
        if let Some(color) = self.border_color {
            out.insert("borderColor".into(), Value::from(color as i64));
        }
        if let Some(radius) = self.border_radius {
            out.insert("borderRadius".into(), Value::from(radius));
        }
        let border = self.border_thickness();
        if border != Thickness::default() {
            let widths = Value::from_iter([
                ("left", border.left),
                ("right", border.right),
                ("top", border.top),
                ("bottom", border.bottom),
            ]);
            out.insert("border".into(), widths);
        }
        for (key, value) in &self.attributes {
            out.insert(key.clone(), value.clone());
        }
        out
    }
}

pub(crate) fn rect_value(rect: &Rect) -> Value {
    Value::from_iter([
        ("x", rect.x),
        ("y", rect.y),
        ("width", rect.width),
        ("height", rect.height),
    ])
}

/// Arena of live elements.
#[derive(Debug, Default)]
pub struct ElementTree {
    elements: HashMap<ViewTag, Element>,
}

impl ElementTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, element: Element) -> Option<Element> {
        self.elements.insert(element.tag, element)
    }

    pub fn get(&self, tag: ViewTag) -> Option<&Element> {
        self.elements.get(&tag)
    }

    pub fn get_mut(&mut self, tag: ViewTag) -> Option<&mut Element> {
        self.elements.get_mut(&tag)
    }

    pub fn remove(&mut self, tag: ViewTag) -> Option<Element> {
        self.elements.remove(&tag)
    }

    pub fn contains(&self, tag: ViewTag) -> bool {
        self.elements.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_element_is_unrendered() {
        let element = Element::new(ViewTag(1), "View");
        assert!(element.frame.is_empty());
        assert_eq!(element.opacity, 1.0);
        assert!(element.transform.is_none());
        assert_eq!(element.scale(), (1.0, 1.0));
    }

    #[test]
    fn test_border_thickness_fallback() {
        let mut element = Element::new(ViewTag(1), "View");
        assert_eq!(element.border_thickness(), Thickness::default());

        element.border_widths[BORDER_ALL] = 2.0;
        element.border_widths[BORDER_TOP] = 5.0;
        assert_eq!(
            element.border_thickness(),
            Thickness {
                left: 2.0,
                right: 2.0,
                top: 5.0,
                bottom: 2.0,
            }
        );
    }

    #[test]
    fn test_describe_includes_attributes() {
        let mut element = Element::new(ViewTag(4), "Text");
        element.attributes.insert("text".into(), Value::from("hi"));
        element.ensure_transform().scale_x = 2.0;

        let described = element.describe();
        assert_eq!(described.get("text"), Some(&Value::from("hi")));
        assert_eq!(described.get("tag"), Some(&Value::from(4i64)));
        let transform = described.get("transform").unwrap();
        assert_eq!(transform.get("scaleX"), Some(&Value::from(2.0)));
        assert!(!described.contains_key("border"));
    }

    #[test]
    fn test_tree_insert_remove() {
        let mut tree = ElementTree::new();
        tree.insert(Element::new(ViewTag(1), "View"));
        assert!(tree.contains(ViewTag(1)));
        assert_eq!(tree.len(), 1);
        assert!(tree.remove(ViewTag(1)).is_some());
        assert!(tree.is_empty());
    }
}
