//! The `View` container.

use trellis_api::Value;

use crate::manager::{ChildManager, PanelChildren, ViewManager};
use crate::managers::{base_view_properties, bordered_view_properties};
use crate::props::PropertyManifest;

pub struct PanelViewManager;

impl ViewManager for PanelViewManager {
    fn class_name(&self) -> &str {
        "View"
    }

    fn declare_properties(&self, manifest: &mut PropertyManifest) {
        base_view_properties(manifest);
        bordered_view_properties(manifest);
        manifest.string("pointerEvents", "auto", |el, mode| {
            if mode == "auto" {
                el.attributes.remove("pointerEvents");
            } else {
                el.attributes.insert("pointerEvents".into(), Value::from(mode));
            }
        });
    }

    fn child_manager(&self) -> Option<&dyn ChildManager> {
        Some(&PanelChildren)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::ViewManagerDescriptor;
    use trellis_api::ViewTag;

    #[test]
    fn test_pointer_events() {
        let descriptor = ViewManagerDescriptor::new(Box::new(PanelViewManager));
        let mut el = descriptor.manager().create_view(ViewTag(2));
        descriptor
            .apply_property(&mut el, "pointerEvents", Some(&Value::from("box-none")))
            .unwrap();
        assert_eq!(el.attributes.get("pointerEvents"), Some(&Value::from("box-none")));
        assert!(descriptor
            .apply_property(&mut el, "pointerEvents", Some(&Value::from(1i64)))
            .is_err());

        descriptor.apply_property(&mut el, "pointerEvents", None).unwrap();
        assert!(el.attributes.get("pointerEvents").is_none());
    }
}
