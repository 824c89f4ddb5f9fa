//! Frame annotation: label banner and icon

mod glyphs;
mod icons;
mod renderer;

pub use icons::{IconSet, DEFAULT_ICON_SIZE};
pub use renderer::{blend, composite_icon, draw_text, OverlayRenderer, OverlayStyle, TEXT_PREFIX};
