//! Theming and color definitions.
//!
//! Branch colours come from the render palette as true colour; chrome uses
//! ANSI colours so it follows the terminal's own theme.

use ratatui::style::{Color, Modifier, Style};

use crate::render::{Rgb, branch_color};

/// Colours for one theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub text: Color,
    pub dim_text: Color,
    pub badge: Color,
}

impl Palette {
    pub const fn for_theme(dark: bool) -> Self {
        if dark {
            Self {
                background: Color::Reset,
                text: Color::White,
                dim_text: Color::Indexed(245),
                badge: Color::Yellow,
            }
        } else {
            Self {
                background: Color::Reset,
                text: Color::Black,
                dim_text: Color::Indexed(244),
                badge: Color::Indexed(130),
            }
        }
    }
}

pub const fn to_color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

/// Edge and border colour of a branch.
pub const fn branch_style_color(branch: Option<usize>) -> Color {
    to_color(branch_color(branch))
}

/// Style for a node label at a given opacity.
pub fn label_style(palette: &Palette, strong: bool, opacity: f32) -> Style {
    let mut style = Style::default().fg(if opacity < 0.5 {
        palette.dim_text
    } else {
        palette.text
    });
    if strong {
        style = style.add_modifier(Modifier::BOLD);
    }
    if opacity < 0.5 {
        style = style.add_modifier(Modifier::DIM);
    }
    style
}
