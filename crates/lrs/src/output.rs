//! Terminal output for the CLI.
//!
//! Everything goes to stderr so stdout stays free for piping.

use std::fmt::Display;

use console::{Style, Term};

pub(crate) struct Output {
    term: Term,
    label: Style,
    url: Style,
    failure: Style,
}

impl Output {
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            label: Style::new().dim(),
            url: Style::new().cyan().bold().underlined(),
            failure: Style::new().red().bold(),
        }
    }

    /// Headline announcing where the site is served.
    pub(crate) fn serving(&self, root: impl Display, url: &str) {
        self.line(&format!("Serving {root} at {}", self.url.apply_to(url)));
    }

    /// Indented `label: value` detail under the headline.
    pub(crate) fn detail(&self, label: &str, value: impl Display) {
        self.line(&format!("  {} {value}", self.label.apply_to(format!("{label}:"))));
    }

    pub(crate) fn error(&self, msg: &str) {
        self.line(&self.failure.apply_to(msg).to_string());
    }

    fn line(&self, text: &str) {
        // A closed stderr leaves nowhere to report to.
        let _ = self.term.write_line(text);
    }
}
