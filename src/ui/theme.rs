//! Styles for command output.
//!
//! stdout and stderr are detected separately: `make-seed --json > report.json`
//! still gets colored warnings on an attended terminal.

use console::Term;
use owo_colors::Style;
use std::sync::OnceLock;

static STDOUT_THEME: OnceLock<Theme> = OnceLock::new();
static STDERR_THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    pub heading: Style,
    /// Exported, written, fetched
    pub ok: Style,
    /// Failed nodes and fatal errors
    pub failed: Style,
    /// Missing blobs, partial runs
    pub caution: Style,
    pub accent: Style,
    /// Field labels in status lines and summaries
    pub label: Style,
}

impl Theme {
    /// Styled output only for an attended terminal with colors enabled
    pub fn for_term(term: &Term) -> Self {
        if term.is_term() && console::colors_enabled() {
            Self::styled()
        } else {
            Self::plain()
        }
    }

    pub fn styled() -> Self {
        Self {
            heading: Style::new().cyan().bold(),
            ok: Style::new().green().bold(),
            failed: Style::new().red().bold(),
            caution: Style::new().yellow(),
            accent: Style::new().magenta(),
            label: Style::new().bright_black(),
        }
    }

    pub fn plain() -> Self {
        Self {
            heading: Style::new(),
            ok: Style::new(),
            failed: Style::new(),
            caution: Style::new(),
            accent: Style::new(),
            label: Style::new(),
        }
    }
}

/// Theme for lines written to stdout
pub fn theme() -> &'static Theme {
    STDOUT_THEME.get_or_init(|| Theme::for_term(&Term::stdout()))
}

/// Theme for warnings and errors written to stderr
pub fn error_theme() -> &'static Theme {
    STDERR_THEME.get_or_init(|| Theme::for_term(&Term::stderr()))
}
