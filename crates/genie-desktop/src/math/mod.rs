//! Core geometry types
//!
//! Everything here lives in canvas space: the fixed-size design canvas that
//! the layout scaler maps onto the viewport.

mod rect;
mod size;
mod vec2;

pub use rect::Rect;
pub use size::Size;
pub use vec2::Vec2;
