//! HTML markup handling
//!
//! Every string that ends up in the page goes through [`Markup`]. Text is
//! escaped unless a caller explicitly vouches for it with [`Markup::trusted`].

use std::fmt;

/// Escape text for inclusion in HTML element content or attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// A fragment of HTML that is safe to hand to `innerHTML`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markup(String);

impl Markup {
    /// Escape plain text
    pub fn escape(text: &str) -> Self {
        Self(escape_html(text))
    }

    /// Escape backend-authored text, keeping line breaks as `<br>`
    pub fn formatted(text: &str) -> Self {
        let lines: Vec<String> = text.lines().map(escape_html).collect();
        Self(lines.join("<br>"))
    }

    /// Wrap markup the caller has already vetted. Nothing is escaped.
    pub fn trusted(html: impl Into<String>) -> Self {
        Self(html.into())
    }

    /// Append another fragment
    pub fn push(&mut self, other: &Markup) {
        self.0.push_str(&other.0);
    }

    /// Append a fixed template fragment
    pub(crate) fn push_static(&mut self, html: &'static str) {
        self.0.push_str(html);
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
