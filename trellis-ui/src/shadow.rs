//! The shadow tree: the authoritative, script-driven mirror of the UI.

use std::collections::HashMap;

use trellis_api::{Map, Rect, ViewTag};

use crate::error::UiError;

/// Lifecycle of a live node. A tag absent from the tree is either not yet
/// created or already removed; removal is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShadowNode {
    pub tag: ViewTag,
    pub class_name: String,
    pub parent: Option<ViewTag>,
    pub children: Vec<ViewTag>,
    /// Last-applied declared properties.
    pub props: Map,
    /// Last-committed layout.
    pub layout: Rect,
    pub state: NodeState,
    pub is_root: bool,
}

impl ShadowNode {
    pub fn new(tag: ViewTag, class_name: impl Into<String>, props: Map) -> Self {
        Self {
            tag,
            class_name: class_name.into(),
            parent: None,
            children: Vec::new(),
            props,
            layout: Rect::ZERO,
            state: NodeState::Created,
            is_root: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct ShadowTree {
    nodes: HashMap<ViewTag, ShadowNode>,
}

impl ShadowTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: ShadowNode) -> Result<(), UiError> {
        if self.nodes.contains_key(&node.tag) {
            return Err(UiError::DuplicateTag(node.tag));
        }
        self.nodes.insert(node.tag, node);
        Ok(())
    }

    pub fn get(&self, tag: ViewTag) -> Option<&ShadowNode> {
        self.nodes.get(&tag)
    }

    pub fn get_mut(&mut self, tag: ViewTag) -> Option<&mut ShadowNode> {
        self.nodes.get_mut(&tag)
    }

    pub(crate) fn node(&self, tag: ViewTag) -> Result<&ShadowNode, UiError> {
        self.nodes.get(&tag).ok_or(UiError::UnknownTag(tag))
    }

    pub(crate) fn node_mut(&mut self, tag: ViewTag) -> Result<&mut ShadowNode, UiError> {
        self.nodes.get_mut(&tag).ok_or(UiError::UnknownTag(tag))
    }

    pub fn remove(&mut self, tag: ViewTag) -> Option<ShadowNode> {
        self.nodes.remove(&tag)
    }

    pub fn contains(&self, tag: ViewTag) -> bool {
        self.nodes.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> Vec<ViewTag> {
        let mut roots: Vec<_> = self
            .nodes
            .values()
            .filter(|n| n.is_root)
            .map(|n| n.tag)
            .collect();
        roots.sort();
        roots
    }

    /// True when `candidate` is `tag` or one of its ancestors.
    pub fn is_self_or_ancestor(&self, candidate: ViewTag, tag: ViewTag) -> bool {
        let mut current = Some(tag);
        while let Some(t) = current {
            if t == candidate {
                return true;
            }
            current = self.nodes.get(&t).and_then(|n| n.parent);
        }
        false
    }

    /// `tag` and all its descendants, children before parents.
    pub fn subtree_post_order(&self, tag: ViewTag) -> Vec<ViewTag> {
        let mut order = Vec::new();
        let mut stack = vec![(tag, false)];
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                order.push(current);
                continue;
            }
            stack.push((current, true));
            if let Some(node) = self.nodes.get(&current) {
                for &child in node.children.iter().rev() {
                    stack.push((child, false));
                }
            }
        }
        order
    }
}
