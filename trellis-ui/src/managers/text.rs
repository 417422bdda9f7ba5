//! The `Text` leaf.

use trellis_api::Value;

use crate::manager::ViewManager;
use crate::managers::base_view_properties;
use crate::props::PropertyManifest;

pub struct TextViewManager;

impl ViewManager for TextViewManager {
    fn class_name(&self) -> &str {
        "Text"
    }

    fn declare_properties(&self, manifest: &mut PropertyManifest) {
        base_view_properties(manifest);
        manifest
            .nullable_string("text", |el, text| match text {
                Some(text) => {
                    el.attributes.insert("text".into(), Value::from(text));
                }
                None => {
                    el.attributes.remove("text");
                }
            })
            .color("color", |el, color| match color {
                Some(color) => {
                    el.attributes.insert("color".into(), Value::from(color as i64));
                }
                None => {
                    el.attributes.remove("color");
                }
            })
            .nullable_double("fontSize", |el, size| match size {
                Some(size) => {
                    el.attributes.insert("fontSize".into(), Value::from(size));
                }
                None => {
                    el.attributes.remove("fontSize");
                }
            })
            // 0 is unlimited
            .int("numberOfLines", 0, |el, lines| {
                if lines > 0 {
                    el.attributes.insert("numberOfLines".into(), Value::from(lines));
                } else {
                    el.attributes.remove("numberOfLines");
                }
            });
    }
}
