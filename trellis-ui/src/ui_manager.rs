//! The UI manager.
//!
//! Replays batched operations against the shadow tree and the native
//! elements. Every mutating entry point must run on the thread that created
//! the manager; calls from anywhere else panic.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use trellis_api::{ChildInsert, Map, Rect, UiOperation, Value, ViewTag, parse_batch};

use crate::animation::{AnimatedProperty, LayoutAnimationManager};
use crate::element::{Element, ElementTree, rect_value};
use crate::error::UiError;
use crate::manager::ViewManagerDescriptor;
use crate::registry::ViewManagerRegistry;
use crate::shadow::{NodeState, ShadowNode, ShadowTree};

/// Class used for root containers.
pub const ROOT_VIEW_CLASS: &str = "View";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiManagerConfig {
    /// Interval between animation frames on the UI thread.
    pub frame_interval: Duration,
    /// Drop the layout animation config after every batch.
    pub reset_layout_animation_after_batch: bool,
}

impl Default for UiManagerConfig {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(16),
            reset_layout_animation_after_batch: true,
        }
    }
}

/// One batch item that did not apply.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    pub index: usize,
    pub error: UiError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub applied: usize,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct UiManager {
    registry: Arc<ViewManagerRegistry>,
    shadow: ShadowTree,
    elements: ElementTree,
    animations: LayoutAnimationManager,
    config: UiManagerConfig,
    owner: ThreadId,
}

/// Applies props one by one. A type mismatch is logged and skipped.
fn apply_props<'a>(
    descriptor: &ViewManagerDescriptor,
    element: &mut Element,
    props: impl Iterator<Item = (&'a str, Option<&'a Value>)>,
) {
    for (name, value) in props {
        if let Err(e) = descriptor.apply_property(element, name, value) {
            tracing::warn!(tag = %element.tag, class = descriptor.class_name(), "{}", e);
        }
    }
}

impl UiManager {
    pub fn new(registry: Arc<ViewManagerRegistry>, config: UiManagerConfig) -> Self {
        Self {
            registry,
            shadow: ShadowTree::new(),
            elements: ElementTree::new(),
            animations: LayoutAnimationManager::new(),
            config,
            owner: thread::current().id(),
        }
    }

    fn assert_ui_thread(&self) {
        assert_eq!(
            thread::current().id(),
            self.owner,
            "UI manager used off its UI thread"
        );
    }

    pub fn config(&self) -> &UiManagerConfig {
        &self.config
    }

    pub fn registry(&self) -> &ViewManagerRegistry {
        &self.registry
    }

    pub fn create_view(
        &mut self,
        tag: ViewTag,
        class_name: &str,
        props: &Map,
    ) -> Result<(), UiError> {
        self.assert_ui_thread();
        if self.shadow.contains(tag) {
            return Err(UiError::DuplicateTag(tag));
        }
        let registry = Arc::clone(&self.registry);
        let descriptor = registry.resolve(class_name)?;

        let mut element = descriptor.manager().create_view(tag);
        apply_props(
            descriptor,
            &mut element,
            props.iter().map(|(k, v)| (k.as_str(), Some(v))),
        );
        self.elements.insert(element);
        self.shadow
            .insert(ShadowNode::new(tag, class_name, props.clone()))?;

        tracing::debug!(%tag, class = class_name, props = props.len(), "created view");
        Ok(())
    }

    /// Replace-semantics diff against the last-applied props.
    pub fn update_view(&mut self, tag: ViewTag, props: &Map) -> Result<(), UiError> {
        self.assert_ui_thread();
        let registry = Arc::clone(&self.registry);
        let node = self.shadow.node_mut(tag)?;
        let descriptor = registry.resolve(&node.class_name)?;
        let element = self.elements.get_mut(tag).ok_or(UiError::UnknownTag(tag))?;

        let animated: Vec<AnimatedProperty> = props
            .keys()
            .chain(node.props.keys())
            .filter(|name| props.get(*name) != node.props.get(*name))
            .filter_map(|name| AnimatedProperty::driven_by(name))
            .collect();

        let changed = props
            .iter()
            .filter(|(name, value)| node.props.get(*name) != Some(*value))
            .map(|(name, value)| (name.as_str(), Some(value)));
        apply_props(descriptor, element, changed);

        let vanished = node
            .props
            .keys()
            .filter(|name| !props.contains_key(*name))
            .map(|name| (name.as_str(), None));
        apply_props(descriptor, element, vanished);
        if self.animations.is_animating(tag) {
            for property in animated {
                self.animations.retarget(element, property);
            }
        }

        node.props = props.clone();
        node.state = NodeState::Updated;
        tracing::debug!(%tag, props = props.len(), "updated view");
        Ok(())
    }

    /// Detaches `remove` and `moves` (highest index first), then inserts
    /// `add` in ascending index order. Nothing changes unless the whole
    /// operation is valid.
    pub fn manage_children(
        &mut self,
        parent: ViewTag,
        remove: &[usize],
        add: &[ChildInsert],
        moves: &[usize],
    ) -> Result<(), UiError> {
        self.assert_ui_thread();
        let registry = Arc::clone(&self.registry);
        let node = self.shadow.node(parent)?;
        let descriptor = registry.resolve(&node.class_name)?;
        let children = descriptor
            .manager()
            .child_manager()
            .ok_or_else(|| UiError::NotAContainer {
                tag: parent,
                class_name: node.class_name.clone(),
            })?;

        let count = node.children.len();
        let mut detach: Vec<usize> = remove.iter().chain(moves).copied().collect();
        detach.sort_unstable();
        if let Some(pair) = detach.windows(2).find(|w| w[0] == w[1]) {
            return Err(UiError::InvalidChildren {
                parent,
                reason: format!("index {} detached twice", pair[0]),
            });
        }
        if let Some(&highest) = detach.last() {
            if highest >= count {
                return Err(UiError::IndexOutOfRange {
                    parent,
                    index: highest,
                    count,
                });
            }
        }
        let detached: HashSet<ViewTag> = detach.iter().map(|&i| node.children[i]).collect();
        let moved: Vec<ViewTag> = moves.iter().map(|&i| node.children[i]).collect();

        let mut inserts = add.to_vec();
        inserts.sort_by_key(|insert| insert.index);
        let mut simulated = count - detach.len();
        let mut added = HashSet::new();
        for insert in &inserts {
            if insert.index > simulated {
                return Err(UiError::IndexOutOfRange {
                    parent,
                    index: insert.index,
                    count: simulated,
                });
            }
            let child = self.shadow.node(insert.tag)?;
            let invalid = |reason: String| UiError::InvalidChildren { parent, reason };
            if !added.insert(insert.tag) {
                return Err(invalid(format!("{} added twice", insert.tag)));
            }
            if child.is_root {
                return Err(invalid(format!("{} is a root view", insert.tag)));
            }
            if child.parent.is_some() && !detached.contains(&insert.tag) {
                return Err(invalid(format!("{} already has a parent", insert.tag)));
            }
            if self.shadow.is_self_or_ancestor(insert.tag, parent) {
                return Err(invalid(format!("{} is {} or its ancestor", insert.tag, parent)));
            }
            simulated += 1;
        }

        for &index in detach.iter().rev() {
            let parent_node = self.shadow.node_mut(parent)?;
            let child = parent_node.children.remove(index);
            if let Some(child_node) = self.shadow.get_mut(child) {
                child_node.parent = None;
            }
            children.remove_child_at(&mut self.elements, parent, index);
        }
        for insert in &inserts {
            self.shadow
                .node_mut(parent)?
                .children
                .insert(insert.index, insert.tag);
            self.shadow.node_mut(insert.tag)?.parent = Some(parent);
            children.add_view(&mut self.elements, parent, insert.tag, insert.index);
        }

        for tag in moved {
            if !added.contains(&tag) {
                tracing::warn!(%parent, child = %tag, "moved child was not re-added");
            }
        }

        tracing::debug!(
            %parent,
            detached = detach.len(),
            added = inserts.len(),
            "managed children"
        );
        Ok(())
    }

    /// Commits `rect` to the shadow node, then animates or applies it.
    pub fn update_layout(&mut self, tag: ViewTag, rect: Rect) -> Result<(), UiError> {
        self.assert_ui_thread();
        self.shadow.node_mut(tag)?.layout = rect;
        let element = self.elements.get_mut(tag).ok_or(UiError::UnknownTag(tag))?;
        if self.animations.should_animate(element) {
            self.animations.apply_layout_update(element, rect);
        } else {
            element.frame = rect;
        }
        Ok(())
    }

    /// Removes `tag` and its whole subtree, children first.
    pub fn remove_view(&mut self, tag: ViewTag) -> Result<(), UiError> {
        self.assert_ui_thread();
        let registry = Arc::clone(&self.registry);
        let node = self.shadow.node(tag)?;

        if let Some(parent) = node.parent {
            let parent_node = self.shadow.node_mut(parent)?;
            if let Some(index) = parent_node.children.iter().position(|&c| c == tag) {
                parent_node.children.remove(index);
                let parent_class = parent_node.class_name.clone();
                if let Some(children) = registry
                    .resolve(&parent_class)
                    .ok()
                    .and_then(|d| d.manager().child_manager())
                {
                    children.remove_child_at(&mut self.elements, parent, index);
                }
            }
        }

        let subtree = self.shadow.subtree_post_order(tag);
        for current in &subtree {
            self.animations.cancel(*current);
        }
        self.drop_element(&registry, tag);
        for current in &subtree {
            let Some(node) = self.shadow.remove(*current) else {
                continue;
            };
            // not reachable through the native children of `tag`
            if let Some(mut element) = self.elements.remove(*current) {
                if let Ok(descriptor) = registry.resolve(&node.class_name) {
                    descriptor.manager().on_drop_view(&mut element);
                }
            }
        }

        tracing::debug!(%tag, removed = subtree.len(), "removed view");
        Ok(())
    }

    /// Drops the element for `tag` and its native children, children first.
    fn drop_element(&mut self, registry: &ViewManagerRegistry, tag: ViewTag) {
        let Some(class_name) = self.elements.get(tag).map(|e| e.class_name.clone()) else {
            return;
        };
        let Ok(descriptor) = registry.resolve(&class_name) else {
            self.elements.remove(tag);
            return;
        };
        if let Some(children) = descriptor.manager().child_manager() {
            let count = children.child_count(&self.elements, tag);
            let hosted: Vec<ViewTag> = (0..count)
                .filter_map(|index| children.child_at(&self.elements, tag, index))
                .collect();
            for child in hosted {
                self.drop_element(registry, child);
            }
            children.remove_all_children(&mut self.elements, tag);
        }
        if let Some(mut element) = self.elements.remove(tag) {
            descriptor.manager().on_drop_view(&mut element);
        }
    }

    /// Creates a parentless root container with its frame already set.
    pub fn add_root_view(&mut self, tag: ViewTag, rect: Rect) -> Result<(), UiError> {
        self.create_view(tag, ROOT_VIEW_CLASS, &Map::new())?;
        let node = self.shadow.node_mut(tag)?;
        node.is_root = true;
        node.layout = rect;
        if let Some(element) = self.elements.get_mut(tag) {
            element.frame = rect;
        }
        Ok(())
    }

    pub fn configure_layout_animation(&mut self, config: &Value) {
        self.assert_ui_thread();
        self.animations.initialize_from_config(Some(config));
    }

    pub fn dispatch(&mut self, op: &UiOperation) -> Result<(), UiError> {
        match op {
            UiOperation::CreateView {
                tag,
                class_name,
                props,
            } => self.create_view(*tag, class_name, props),
            UiOperation::UpdateView { tag, props } => self.update_view(*tag, props),
            UiOperation::ManageChildren {
                parent,
                remove,
                add,
                moves,
            } => self.manage_children(*parent, remove, add, moves),
            UiOperation::UpdateLayout { tag, rect } => self.update_layout(*tag, *rect),
            UiOperation::RemoveView { tag } => self.remove_view(*tag),
            UiOperation::ConfigureLayoutAnimation { config } => {
                self.configure_layout_animation(config);
                Ok(())
            }
        }
    }

    /// Applies every item in order. Failed items are logged and reported;
    /// the rest of the batch still applies.
    pub fn apply_batch(&mut self, batch: &Value) -> BatchReport {
        self.assert_ui_thread();
        let mut report = BatchReport::default();

        match parse_batch(batch) {
            Ok(items) => {
                for (index, item) in items.into_iter().enumerate() {
                    let result = item
                        .map_err(UiError::from)
                        .and_then(|op| self.dispatch(&op));
                    match result {
                        Ok(()) => report.applied += 1,
                        Err(error) => {
                            tracing::error!(index, "batch item failed: {}", error);
                            report.failed.push(BatchFailure { index, error });
                        }
                    }
                }
            }
            Err(e) => {
                tracing::error!("malformed batch: {}", e);
                report.failed.push(BatchFailure {
                    index: 0,
                    error: e.into(),
                });
            }
        }

        if self.config.reset_layout_animation_after_batch {
            self.animations.reset();
        }
        report
    }

    /// Advances animations; returns how many are still running.
    pub fn tick(&mut self, now: Instant) -> usize {
        self.assert_ui_thread();
        self.animations.tick(&mut self.elements, now)
    }

    pub fn active_animations(&self) -> usize {
        self.animations.active()
    }

    pub fn is_animating(&self, tag: ViewTag) -> bool {
        self.animations.is_animating(tag)
    }

    pub fn animations(&self) -> &LayoutAnimationManager {
        &self.animations
    }

    pub fn node(&self, tag: ViewTag) -> Option<&ShadowNode> {
        self.shadow.get(tag)
    }

    pub fn element(&self, tag: ViewTag) -> Option<&Element> {
        self.elements.get(tag)
    }

    pub fn contains(&self, tag: ViewTag) -> bool {
        self.shadow.contains(tag)
    }

    pub fn len(&self) -> usize {
        self.shadow.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shadow.is_empty()
    }

    pub fn roots(&self) -> Vec<ViewTag> {
        self.shadow.roots()
    }

    /// Children in order, as the shadow tree records them.
    pub fn children(&self, tag: ViewTag) -> Option<&[ViewTag]> {
        self.shadow.get(tag).map(|n| n.children.as_slice())
    }

    /// Recursive dump of `tag`: element state, recorded props, layout and
    /// children.
    pub fn snapshot(&self, tag: ViewTag) -> Option<Value> {
        let node = self.shadow.get(tag)?;
        let mut out = self
            .elements
            .get(tag)
            .map(Element::describe)
            .unwrap_or_default();
        out.insert("layout".into(), rect_value(&node.layout));
        out.insert("props".into(), Value::Map(node.props.clone()));
        let children: Vec<Value> = node
            .children
            .iter()
            .filter_map(|&child| self.snapshot(child))
            .collect();
        out.insert("children".into(), Value::List(children));
        Some(Value::Map(out))
    }
}
