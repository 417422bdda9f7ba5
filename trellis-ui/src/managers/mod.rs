//! Shared property tables and the built-in view managers.

mod base;
mod bordered;
mod text;
mod view;

pub use base::base_view_properties;
pub use bordered::{BORDER_WIDTH_PROPERTIES, bordered_view_properties};
pub use text::TextViewManager;
pub use view::PanelViewManager;
