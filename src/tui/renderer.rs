//! Terminal rendering with markdown support

use crossterm::cursor::{MoveToColumn, MoveUp};
use crossterm::execute;
use crossterm::style::{Color, Stylize};
use crossterm::terminal::{self, Clear, ClearType};
use std::io::{IsTerminal, Write};
use termimad::MadSkin;

use super::theme::Theme;
use crate::client::Outcome;
use crate::diagnose::Diagnosis;
use crate::relay::ModelReport;

/// Styled output for the command-line client
pub struct TerminalRenderer {
    theme: Theme,
    skin: MadSkin,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        let theme = Theme::default();
        let skin = Self::build_skin(&theme);
        Self { theme, skin }
    }

    fn build_skin(theme: &Theme) -> MadSkin {
        let mut skin = MadSkin::default();
        skin.set_headers_fg(to_termimad_color(theme.heading));
        skin.bold.set_fg(to_termimad_color(Color::White));
        skin.italic.set_fg(to_termimad_color(theme.notice));
        skin.inline_code.set_fg(to_termimad_color(Color::Green));
        skin.code_block.set_fg(to_termimad_color(Color::Green));
        skin
    }

    /// Heading printed before a streamed answer
    pub fn render_header(&self, feature: &str, relay_url: &str) {
        println!();
        println!(
            "  {} {} {}",
            feature.with(self.theme.heading),
            "via".with(self.theme.dim),
            relay_url.with(self.theme.dim)
        );
        println!();
    }

    /// Print a fragment as it arrives, without markdown processing
    pub fn render_delta(&self, text: &str) {
        print!("{}", text.with(self.theme.answer));
        let _ = std::io::stdout().flush();
    }

    /// Replace a streamed answer with its markdown rendering when it has any.
    ///
    /// The raw fragments are erased first so the answer appears once. When the
    /// streamed text has scrolled past the top of the screen, or stdout is not
    /// a terminal, the raw text is left as it is.
    pub fn render_markdown(&self, content: &str) {
        if !has_markdown_elements(content) || !std::io::stdout().is_terminal() {
            println!();
            return;
        }
        let Ok((width, height)) = terminal::size() else {
            println!();
            return;
        };
        let rows = streamed_rows(content, width);
        if rows >= height || self.erase_rows(rows).is_err() {
            println!();
            return;
        }
        self.skin.print_text(content);
    }

    /// Move to the first streamed row and clear everything below it
    fn erase_rows(&self, rows: u16) -> std::io::Result<()> {
        let mut stdout = std::io::stdout();
        if rows > 1 {
            execute!(stdout, MoveUp(rows - 1))?;
        }
        execute!(stdout, MoveToColumn(0), Clear(ClearType::FromCursorDown))
    }

    /// Report how a stream ended; the text itself was already streamed
    pub fn render_outcome(&self, outcome: &Outcome) {
        match outcome {
            Outcome::Answer(text) => {
                self.render_markdown(text);
                println!();
                self.render_success(&format!("{} characters received", text.chars().count()));
            }
            Outcome::Error { message, partial } => {
                if !partial.is_empty() {
                    println!();
                }
                self.render_error(message);
            }
            Outcome::Interrupted { partial } => {
                println!();
                self.render_notice(&format!(
                    "Stream ended early after {} characters",
                    partial.chars().count()
                ));
            }
        }
    }

    pub fn render_model_report(&self, report: &ModelReport) {
        println!();
        println!("  {}", "Model availability".with(self.theme.heading));
        for model in &report.available_models {
            println!(
                "  {} {}",
                "\u{2713}".with(self.theme.success),
                model.as_str().with(self.theme.accent)
            );
        }
        for probe in &report.unavailable_models {
            println!(
                "  {} {} {}",
                "\u{2717}".with(self.theme.error),
                probe.model.as_str().with(self.theme.accent),
                probe.error.as_deref().unwrap_or_default().with(self.theme.dim)
            );
        }
        println!();
        self.render_info(&format!(
            "{} of {} available. {}",
            report.available_models.len(),
            report.total_tested,
            report.recommendation
        ));
    }

    pub fn render_diagnosis(&self, diagnosis: &Diagnosis) {
        println!();
        println!(
            "  {} {}",
            "Category:".with(self.theme.dim),
            diagnosis.kind.label().with(self.theme.heading)
        );
        println!("  {}", diagnosis.message.as_str().with(self.theme.answer));
        println!();
        for suggestion in &diagnosis.suggestions {
            println!(
                "  {} {}",
                "\u{2022}".with(self.theme.accent),
                suggestion.as_str()
            );
        }
        if !diagnosis.doc_links.is_empty() {
            println!();
            for link in &diagnosis.doc_links {
                self.render_info(link);
            }
        }
        println!();
    }

    pub fn render_notice(&self, msg: &str) {
        println!(
            "  {} {}",
            "\u{25b6}".with(self.theme.notice),
            msg.with(self.theme.notice)
        );
    }

    pub fn render_error(&self, msg: &str) {
        println!(
            "  {} {}",
            "\u{2717}".with(self.theme.error),
            msg.with(self.theme.error)
        );
    }

    pub fn render_success(&self, msg: &str) {
        println!(
            "  {} {}",
            "\u{2713}".with(self.theme.success),
            msg.with(self.theme.success)
        );
    }

    pub fn render_info(&self, msg: &str) {
        println!("  {}", msg.with(self.theme.dim));
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether content has markdown worth re-rendering
fn has_markdown_elements(content: &str) -> bool {
    content.contains("```")
        || content.contains("# ")
        || content.contains("**")
        || content.contains("| ")
        || content.contains("- [")
}

/// Terminal rows occupied by streamed text at the given width
fn streamed_rows(content: &str, width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let rows: usize = content
        .split('\n')
        .map(|line| line.chars().count().div_ceil(width).max(1))
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

/// Convert a crossterm color to the crossterm version termimad re-exports
fn to_termimad_color(color: Color) -> termimad::crossterm::style::Color {
    use termimad::crossterm::style::Color as Mad;
    match color {
        Color::Black => Mad::Black,
        Color::DarkGrey => Mad::DarkGrey,
        Color::Red => Mad::Red,
        Color::DarkRed => Mad::DarkRed,
        Color::Green => Mad::Green,
        Color::DarkGreen => Mad::DarkGreen,
        Color::Yellow => Mad::Yellow,
        Color::DarkYellow => Mad::DarkYellow,
        Color::Blue => Mad::Blue,
        Color::DarkBlue => Mad::DarkBlue,
        Color::Magenta => Mad::Magenta,
        Color::DarkMagenta => Mad::DarkMagenta,
        Color::Cyan => Mad::Cyan,
        Color::DarkCyan => Mad::DarkCyan,
        Color::White => Mad::White,
        Color::Grey => Mad::Grey,
        _ => Mad::Reset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_detection() {
        assert!(has_markdown_elements("```rust\nfn main() {}\n```"));
        assert!(has_markdown_elements("## Fix"));
        assert!(!has_markdown_elements("plain answer"));
    }

    #[test]
    fn test_streamed_rows_counts_wrapped_lines() {
        assert_eq!(streamed_rows("short", 80), 1);
        assert_eq!(streamed_rows("## Fix\n\nuse `require`", 80), 3);
        assert_eq!(streamed_rows(&"x".repeat(81), 80), 2);
        assert_eq!(streamed_rows(&"x".repeat(80), 80), 1);
        // a trailing newline leaves the cursor on a fresh row
        assert_eq!(streamed_rows("done\n", 80), 2);
    }

    #[test]
    fn test_streamed_rows_saturates() {
        assert_eq!(streamed_rows(&"line\n".repeat(70_000), 80), u16::MAX);
        assert_eq!(streamed_rows("abc", 0), 3);
    }

    #[test]
    fn test_color_conversion() {
        assert_eq!(
            to_termimad_color(Color::Magenta),
            termimad::crossterm::style::Color::Magenta
        );
        assert_eq!(
            to_termimad_color(Color::Rgb { r: 1, g: 2, b: 3 }),
            termimad::crossterm::style::Color::Reset
        );
    }
}
