//! Label wrapping and measurement.

use unicode_width::UnicodeWidthStr;

/// Measures label text in world units.
///
/// The layout engine only needs widths of single lines and a line height;
/// hosts with real fonts can supply their own implementation.
pub trait TextMeasure {
    /// Width of one line of text.
    fn line_width(&self, text: &str) -> f32;
    /// Height of one line of text.
    fn line_height(&self) -> f32;
}

/// Fixed-advance measurement based on terminal display width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceMeasure {
    pub char_width: f32,
    pub line_height: f32,
}

impl Default for MonospaceMeasure {
    fn default() -> Self {
        Self {
            char_width: 8.0,
            line_height: 18.0,
        }
    }
}

impl TextMeasure for MonospaceMeasure {
    fn line_width(&self, text: &str) -> f32 {
        text.width() as f32 * self.char_width
    }

    fn line_height(&self) -> f32 {
        self.line_height
    }
}

/// Word-wrap `text` to at most `max_chars` display columns per line.
///
/// Explicit newlines are kept. Words longer than the limit are split.
pub fn wrap_label(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        let mut current_width = 0;
        for word in paragraph.split_whitespace() {
            for piece in split_long_word(word, max_chars) {
                let piece_width = piece.width();
                if current_width > 0 && current_width + 1 + piece_width > max_chars {
                    lines.push(std::mem::take(&mut current));
                    current_width = 0;
                }
                if current_width > 0 {
                    current.push(' ');
                    current_width += 1;
                }
                current.push_str(piece);
                current_width += piece_width;
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

fn split_long_word(word: &str, max_chars: usize) -> Vec<&str> {
    if word.width() <= max_chars {
        return vec![word];
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut width = 0;
    for (idx, ch) in word.char_indices() {
        let ch_width = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + ch_width > max_chars && idx > start {
            pieces.push(&word[start..idx]);
            start = idx;
            width = 0;
        }
        width += ch_width;
    }
    pieces.push(&word[start..]);
    pieces
}
