//! Border and background properties for container views.

use crate::props::PropertyManifest;

/// Border width group, in slot order (see `Element::border_widths`).
pub const BORDER_WIDTH_PROPERTIES: [&str; 5] = [
    "borderWidth",
    "borderLeftWidth",
    "borderRightWidth",
    "borderTopWidth",
    "borderBottomWidth",
];

pub fn bordered_view_properties(manifest: &mut PropertyManifest) {
    manifest
        .nullable_double("borderRadius", |el, radius| el.border_radius = radius)
        .color("backgroundColor", |el, color| el.background_color = color)
        .color("borderColor", |el, color| el.border_color = color)
        .group_nullable_double(&BORDER_WIDTH_PROPERTIES, f64::NAN, |el, index, width| {
            el.border_widths[index] = width.unwrap_or(f64::NAN);
        })
        // exported so scripts see it; flattening is not modelled
        .boolean("collapsable", true, |_, _| {});
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{BORDER_ALL, BORDER_BOTTOM, Element, Thickness};
    use crate::manager::{ViewManager, ViewManagerDescriptor};
    use trellis_api::{Value, ViewTag};

    struct Boxed;

    impl ViewManager for Boxed {
        fn class_name(&self) -> &str {
            "Boxed"
        }

        fn declare_properties(&self, manifest: &mut PropertyManifest) {
            bordered_view_properties(manifest);
        }
    }

    fn setup() -> (ViewManagerDescriptor, Element) {
        let descriptor = ViewManagerDescriptor::new(Box::new(Boxed));
        let element = descriptor.manager().create_view(ViewTag(1));
        (descriptor, element)
    }

    #[test]
    fn test_border_width_group_slots() {
        let (descriptor, mut el) = setup();
        descriptor
            .apply_property(&mut el, "borderWidth", Some(&Value::from(1.0)))
            .unwrap();
        descriptor
            .apply_property(&mut el, "borderBottomWidth", Some(&Value::from(3.0)))
            .unwrap();
        assert_eq!(el.border_widths[BORDER_ALL], 1.0);
        assert_eq!(el.border_widths[BORDER_BOTTOM], 3.0);
        assert_eq!(
            el.border_thickness(),
            Thickness {
                left: 1.0,
                right: 1.0,
                top: 1.0,
                bottom: 3.0,
            }
        );

        descriptor.apply_property(&mut el, "borderBottomWidth", None).unwrap();
        assert!(el.border_widths[BORDER_BOTTOM].is_nan());
        assert_eq!(el.border_thickness().bottom, 1.0);
    }

    #[test]
    fn test_colors_and_radius() {
        let (descriptor, mut el) = setup();
        descriptor
            .apply_property(&mut el, "backgroundColor", Some(&Value::from(0xFF112233u32 as i64)))
            .unwrap();
        descriptor
            .apply_property(&mut el, "borderRadius", Some(&Value::from(4.0)))
            .unwrap();
        assert_eq!(el.background_color, Some(0xFF112233));
        assert_eq!(el.border_radius, Some(4.0));

        descriptor.apply_property(&mut el, "backgroundColor", None).unwrap();
        descriptor.apply_property(&mut el, "borderRadius", Some(&Value::Null)).unwrap();
        assert_eq!(el.background_color, None);
        assert_eq!(el.border_radius, None);
    }

    #[test]
    fn test_collapsable_is_accepted() {
        let (descriptor, mut el) = setup();
        let before = el.clone();
        assert!(descriptor
            .apply_property(&mut el, "collapsable", Some(&Value::Bool(false)))
            .unwrap());
        assert_eq!(el.tag, before.tag);
        assert_eq!(el.opacity, before.opacity);
    }
}
