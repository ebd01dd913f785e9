//! Terminal UI components.
//!
//! The mind map is painted from the retained scene onto a braille canvas;
//! one terminal cell stands for [`CELL_WIDTH_PX`] x [`CELL_HEIGHT_PX`]
//! screen px so the controller can stay in pixel units.
//! - [`style`]: Theming and colors

pub mod style;

mod overlays;
mod render;
mod status;

pub use render::{canvas_area, render};

/// Screen px covered by one terminal column.
pub const CELL_WIDTH_PX: f32 = 8.0;
/// Screen px covered by one terminal row.
pub const CELL_HEIGHT_PX: f32 = 18.0;
/// Rows reserved below the canvas for the status bar.
pub const STATUS_ROWS: u16 = 1;

/// Canvas size in screen px for a terminal of `width` x `height` cells.
pub fn canvas_px(width: u16, height: u16) -> (f32, f32) {
    (
        f32::from(width) * CELL_WIDTH_PX,
        f32::from(height.saturating_sub(STATUS_ROWS)) * CELL_HEIGHT_PX,
    )
}
