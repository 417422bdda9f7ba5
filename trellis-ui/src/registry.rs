//! View manager registry for looking up managers by class name.

use std::collections::HashMap;

use trellis_api::{Map, Value};

use crate::error::UiError;
use crate::manager::{ViewManager, ViewManagerDescriptor};
use crate::managers::{PanelViewManager, TextViewManager};

/// Registry of view managers, keyed by class name.
///
/// Built before the UI thread starts and read-only afterwards.
pub struct ViewManagerRegistry {
    descriptors: HashMap<String, ViewManagerDescriptor>,
}

impl ViewManagerRegistry {
    /// Create a registry with the built-in managers registered.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(PanelViewManager);
        registry.register(TextViewManager);
        registry
    }

    pub fn empty() -> Self {
        Self {
            descriptors: HashMap::new(),
        }
    }

    /// Register a manager. A second registration for the same class name
    /// replaces the first.
    pub fn register<M: ViewManager + 'static>(&mut self, manager: M) {
        self.register_boxed(Box::new(manager));
    }

    pub fn register_boxed(&mut self, manager: Box<dyn ViewManager>) {
        let descriptor = ViewManagerDescriptor::new(manager);
        let class_name = descriptor.class_name().to_string();
        if self.descriptors.contains_key(&class_name) {
            tracing::warn!(
                class = %class_name,
                "view manager registered twice, last registration wins"
            );
        }
        tracing::debug!(class = %class_name, "view manager registered");
        self.descriptors.insert(class_name, descriptor);
    }

    /// Look up a descriptor by class name.
    pub fn resolve(&self, class_name: &str) -> Result<&ViewManagerDescriptor, UiError> {
        self.descriptors
            .get(class_name)
            .ok_or_else(|| UiError::UnknownViewClass(class_name.to_string()))
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.descriptors.contains_key(class_name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.descriptors.keys().map(String::as_str)
    }

    /// `{className: {nativeProps: {name: typeName}}}` for every manager.
    pub fn native_props(&self) -> Value {
        let classes: Map = self
            .descriptors
            .iter()
            .map(|(name, descriptor)| {
                let entry =
                    Value::from_iter([("nativeProps", Value::Map(descriptor.native_props()))]);
                (name.clone(), entry)
            })
            .collect();
        Value::Map(classes)
    }
}

impl Default for ViewManagerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::PropertyManifest;

    struct Custom(&'static str, f64);

    impl ViewManager for Custom {
        fn class_name(&self) -> &str {
            self.0
        }

        fn declare_properties(&self, manifest: &mut PropertyManifest) {
            manifest.double("opacity", self.1, |el, v| el.opacity = v);
        }
    }

    #[test]
    fn test_registry_new_has_builtins() {
        let registry = ViewManagerRegistry::new();
        assert!(registry.contains("View"));
        assert!(registry.contains("Text"));
        assert_eq!(registry.names().count(), 2);
    }

    #[test]
    fn test_registry_default_same_as_new() {
        assert_eq!(
            ViewManagerRegistry::default().names().count(),
            ViewManagerRegistry::new().names().count()
        );
    }

    #[test]
    fn test_resolve_unknown_class() {
        let registry = ViewManagerRegistry::empty();
        assert_eq!(
            registry.resolve("Slider").unwrap_err(),
            UiError::UnknownViewClass("Slider".into())
        );
    }

    #[test]
    fn test_duplicate_registration_last_wins() {
        let mut registry = ViewManagerRegistry::empty();
        registry.register(Custom("Box", 0.5));
        registry.register(Custom("Box", 0.75));
        assert_eq!(registry.names().count(), 1);

        let default = &registry.resolve("Box").unwrap().binding("opacity").unwrap().default;
        assert_eq!(default, &Value::from(0.75));
    }

    #[test]
    fn test_native_props_export() {
        let registry = ViewManagerRegistry::new();
        let exported = registry.native_props();
        let view = exported.get("View").and_then(|v| v.get("nativeProps")).unwrap();
        assert_eq!(view.get("backgroundColor"), Some(&Value::from("Color")));
        assert_eq!(view.get("borderLeftWidth"), Some(&Value::from("number")));
        let text = exported.get("Text").and_then(|v| v.get("nativeProps")).unwrap();
        assert_eq!(text.get("text"), Some(&Value::from("string")));
        assert_eq!(text.get("numberOfLines"), Some(&Value::from("int")));
        assert_eq!(view.get("pointerEvents"), Some(&Value::from("string")));
        assert!(text.get("borderRadius").is_none());
    }
}
