//! The view manager contract.
//!
//! A manager is a capability set: it declares its properties through a
//! `PropertyManifest` and, when its views host children, hands out a
//! `ChildManager`. Shared property tables live in `crate::managers`.

use std::collections::HashMap;

use trellis_api::{Map, Value, ViewTag};

use crate::element::{Element, ElementTree};
use crate::error::UiError;
use crate::props::{PropertyBinding, PropertyManifest};

/// Creates and configures one class of native view.
pub trait ViewManager: Send + Sync {
    /// Class name scripts refer to (`"View"`, `"Text"`, ...).
    fn class_name(&self) -> &str;

    /// Declares every stylable property. Called once, at registration.
    fn declare_properties(&self, manifest: &mut PropertyManifest);

    fn create_view(&self, tag: ViewTag) -> Element {
        Element::new(tag, self.class_name())
    }

    /// `None` for leaf views.
    fn child_manager(&self) -> Option<&dyn ChildManager> {
        None
    }

    /// Called right before the element is dropped.
    fn on_drop_view(&self, _element: &mut Element) {}
}

/// Child-hosting operations over the element tree.
pub trait ChildManager: Send + Sync {
    fn add_view(&self, tree: &mut ElementTree, parent: ViewTag, child: ViewTag, index: usize);

    fn remove_child_at(
        &self,
        tree: &mut ElementTree,
        parent: ViewTag,
        index: usize,
    ) -> Option<ViewTag>;

    fn child_count(&self, tree: &ElementTree, parent: ViewTag) -> usize;

    fn child_at(&self, tree: &ElementTree, parent: ViewTag, index: usize) -> Option<ViewTag>;

    fn remove_all_children(&self, tree: &mut ElementTree, parent: ViewTag);
}

/// Default container behaviour: children kept in order on the parent element.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanelChildren;

impl ChildManager for PanelChildren {
    fn add_view(&self, tree: &mut ElementTree, parent: ViewTag, child: ViewTag, index: usize) {
        if let Some(parent_element) = tree.get_mut(parent) {
            let index = index.min(parent_element.children.len());
            parent_element.children.insert(index, child);
        }
        if let Some(child_element) = tree.get_mut(child) {
            child_element.parent = Some(parent);
        }
    }

    fn remove_child_at(
        &self,
        tree: &mut ElementTree,
        parent: ViewTag,
        index: usize,
    ) -> Option<ViewTag> {
        let parent_element = tree.get_mut(parent)?;
        if index >= parent_element.children.len() {
            return None;
        }
        let child = parent_element.children.remove(index);
        if let Some(child_element) = tree.get_mut(child) {
            child_element.parent = None;
        }
        Some(child)
    }

    fn child_count(&self, tree: &ElementTree, parent: ViewTag) -> usize {
        tree.get(parent).map_or(0, |e| e.children.len())
    }

    fn child_at(&self, tree: &ElementTree, parent: ViewTag, index: usize) -> Option<ViewTag> {
        tree.get(parent).and_then(|e| e.children.get(index).copied())
    }

    fn remove_all_children(&self, tree: &mut ElementTree, parent: ViewTag) {
        let children = match tree.get_mut(parent) {
            Some(parent_element) => std::mem::take(&mut parent_element.children),
            None => return,
        };
        for child in children {
            if let Some(child_element) = tree.get_mut(child) {
                child_element.parent = None;
            }
        }
    }
}

/// A registered manager and its property bindings, built once.
pub struct ViewManagerDescriptor {
    manager: Box<dyn ViewManager>,
    bindings: HashMap<String, PropertyBinding>,
}

impl ViewManagerDescriptor {
    pub fn new(manager: Box<dyn ViewManager>) -> Self {
        let mut manifest = PropertyManifest::new();
        manager.declare_properties(&mut manifest);

        let mut bindings = HashMap::new();
        for binding in manifest.into_bindings() {
            if bindings.contains_key(&binding.name) {
                tracing::warn!(
                    class = manager.class_name(),
                    property = %binding.name,
                    "property declared twice, keeping the last declaration"
                );
            }
            bindings.insert(binding.name.clone(), binding);
        }

        Self { manager, bindings }
    }

    pub fn class_name(&self) -> &str {
        self.manager.class_name()
    }

    pub fn manager(&self) -> &dyn ViewManager {
        self.manager.as_ref()
    }

    pub fn binding(&self, name: &str) -> Option<&PropertyBinding> {
        self.bindings.get(name)
    }

    pub fn bindings(&self) -> impl Iterator<Item = &PropertyBinding> + '_ {
        self.bindings.values()
    }

    /// Applies one property. Unknown names are ignored and return `Ok(false)`.
    pub fn apply_property(
        &self,
        element: &mut Element,
        name: &str,
        raw: Option<&Value>,
    ) -> Result<bool, UiError> {
        match self.binding(name) {
            Some(binding) => binding.apply(element, raw).map(|()| true),
            None => Ok(false),
        }
    }

    /// Property name to script-visible type name.
    pub fn native_props(&self) -> Map {
        self.bindings
            .values()
            .map(|b| (b.name.clone(), Value::from(b.kind.type_name())))
            .collect()
    }
}

impl std::fmt::Debug for ViewManagerDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewManagerDescriptor")
            .field("class_name", &self.class_name())
            .field("bindings", &self.bindings.len())
            .finish()
    }
}
