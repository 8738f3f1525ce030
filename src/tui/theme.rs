//! Terminal colors

use crossterm::style::Color;

/// Colors used by the terminal renderer
pub struct Theme {
    /// Streamed answer text
    pub answer: Color,
    /// Feature and section headings
    pub heading: Color,
    /// Notices about the stream itself
    pub notice: Color,
    pub error: Color,
    pub success: Color,
    /// Secondary info such as URLs and counts
    pub dim: Color,
    /// Model names and suggestion bullets
    pub accent: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            answer: Color::White,
            heading: Color::Magenta,
            notice: Color::DarkYellow,
            error: Color::Red,
            success: Color::Green,
            dim: Color::DarkGrey,
            accent: Color::Cyan,
        }
    }
}
