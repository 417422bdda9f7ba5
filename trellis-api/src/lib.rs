//! Trellis API - Shared types for the script/native UI bridge.
//!
//! Everything that crosses the boundary between the script thread and the UI
//! thread lives here: the structured `Value`, view tags, layout rectangles and
//! the UI batch protocol.

mod batch;
mod geometry;
mod value;

pub use batch::*;
pub use geometry::*;
pub use value::*;
