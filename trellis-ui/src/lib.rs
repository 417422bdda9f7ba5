//! Trellis UI - The native side of the bridge.
//!
//! This crate contains:
//! - Headless native elements and the element tree
//! - View managers, property manifests and the registry
//! - The shadow tree and the UI manager replaying batches onto elements
//! - The layout animation manager
//! - The dedicated UI thread

pub mod animation;
pub mod managers;

mod element;
mod error;
mod manager;
mod props;
mod registry;
mod shadow;
mod thread;
mod ui_manager;

pub use animation::{AnimationState, LayoutAnimationManager, LayoutAnimationState};
pub use element::{CompositeTransform, Element, ElementTree, Thickness};
pub use error::UiError;
pub use manager::{ChildManager, PanelChildren, ViewManager, ViewManagerDescriptor};
pub use props::{PropArg, PropKind, PropertyBinding, PropertyManifest};
pub use registry::ViewManagerRegistry;
pub use shadow::{NodeState, ShadowNode, ShadowTree};
pub use thread::{UiEvent, UiEvents, UiHandle, UiThread};
pub use ui_manager::{BatchFailure, BatchReport, UiManager, UiManagerConfig};
