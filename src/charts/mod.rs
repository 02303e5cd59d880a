//! Charts module - PNG rendering of analysis results

mod palette;
mod renderer;

pub use palette::{parse_hex, ColorError, Colors, Palette};
pub use renderer::{Axes, ChartRenderer, RenderError};
