// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Markdown → HTML converter backends.
//!
//! A backend parses markdown into some tree, hands headings, code blocks
//! and images to a [`TreeFilter`] in document order, and serializes the
//! filtered tree to HTML. Both backends emit the same markup shapes:
//! `<hN id="..">` headings, `a.footnote-ref` markers wrapping a `<sup>`
//! number, and a `section.footnotes` container whose `ol` holds `li#fnN`
//! items with `a.footnote-back` links.

mod cmark;
mod pandoc;

pub use cmark::Cmark;
pub use pandoc::Pandoc;

use crate::config::ConverterKind;
use crate::error::Result;
use crate::value::Map;

/// Per-node hooks applied while a backend walks its tree.
pub trait TreeFilter {
    /// Called for every heading in encounter order with the converter's
    /// slug; returns the id the heading is emitted with.
    fn heading(&mut self, level: u8, slug: &str) -> String;

    /// Replacement HTML for a code block, or `None` to keep it.
    fn code_block(&mut self, lang: Option<&str>, code: &str) -> Option<String>;

    /// Replacement HTML for an image, or `None` to keep it.
    fn image(&mut self, url: &str) -> Result<Option<String>>;
}

/// A filter that changes nothing.
#[derive(Debug, Default)]
pub struct Passthrough;

impl TreeFilter for Passthrough {
    fn heading(&mut self, _level: u8, slug: &str) -> String {
        slug.to_string()
    }

    fn code_block(&mut self, _lang: Option<&str>, _code: &str) -> Option<String> {
        None
    }

    fn image(&mut self, _url: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

#[derive(Debug, Default)]
pub struct Converted {
    pub html: String,
    /// Front matter from the markdown's metadata block.
    pub meta: Map,
}

pub trait MarkdownConverter {
    fn name(&self) -> &str;

    fn convert(&self, markdown: &str, filter: &mut dyn TreeFilter) -> Result<Converted>;
}

pub fn converter_for(kind: ConverterKind) -> Box<dyn MarkdownConverter> {
    match kind {
        ConverterKind::Pandoc => Box::new(Pandoc::default()),
        ConverterKind::Cmark => Box::new(Cmark::default()),
    }
}

/// Heading identifier in pandoc's `auto_identifiers` style.
///
/// Keeps alphanumerics, `_`, `-` and `.`, turns whitespace into `-`,
/// lowercases, and drops everything before the first letter. Falls back to
/// `section` when nothing is left.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.') {
            slug.extend(ch.to_lowercase());
        } else if ch.is_whitespace() {
            slug.push('-');
        }
    }
    match slug.find(|c: char| c.is_alphabetic()) {
        Some(first) => slug[first..].to_string(),
        None => "section".to_string(),
    }
}
