// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Section conversion: sandboxed template pass, markdown conversion, and
//! the tree filter that numbers headings, highlights code and sizes images.

use diagnostics::*;

use crate::convert::{MarkdownConverter, TreeFilter};
use crate::error::{Error, Result};
use crate::highlight::{Highlighter, strip_console_prompts};
use crate::images;
use crate::path_guard::ProjectRoot;
use crate::sandbox::Sandbox;
use crate::value::{Map, Value};

/// A heading as recorded during conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// Document-wide sequence number, starting at 1.
    pub seq: usize,
    pub level: u8,
    /// Local id: the slug with `seq` appended.
    pub id: String,
    pub section: String,
}

/// Filter for one section's tree.
pub struct SectionFilter<'a> {
    section: &'a str,
    root: &'a ProjectRoot,
    highlighter: Option<&'a dyn Highlighter>,
    seq: usize,
    headings: Vec<Heading>,
}

impl<'a> SectionFilter<'a> {
    /// `header_base` is the number of headings already seen in the build.
    pub fn new(
        section: &'a str,
        root: &'a ProjectRoot,
        highlighter: Option<&'a dyn Highlighter>,
        header_base: usize,
    ) -> Self {
        Self {
            section,
            root,
            highlighter,
            seq: header_base,
            headings: Vec::new(),
        }
    }

    pub fn into_headings(self) -> Vec<Heading> {
        self.headings
    }
}

impl TreeFilter for SectionFilter<'_> {
    fn heading(&mut self, level: u8, slug: &str) -> String {
        self.seq += 1;
        let id = format!("{}{}", slug, self.seq);
        self.headings.push(Heading {
            seq: self.seq,
            level,
            id: id.clone(),
            section: self.section.to_string(),
        });
        id
    }

    fn code_block(&mut self, lang: Option<&str>, code: &str) -> Option<String> {
        let highlighter = self.highlighter?;
        let lang = lang.unwrap_or("txt");
        match highlighter.highlight(code, lang) {
            Ok(html) if lang == "console" => Some(strip_console_prompts(&html)),
            Ok(html) => Some(html),
            Err(err) => {
                let section = self.section;
                let error = err.to_string();
                warn!(
                    "Highlighting {lang} block in {section} failed, keeping it as is: {error}",
                    lang,
                    section,
                    error: error.as_str()
                );
                None
            }
        }
    }

    fn image(&mut self, url: &str) -> Result<Option<String>> {
        images::placeholder(self.root, url)
    }
}

/// Result of converting one section body.
#[derive(Debug, Clone, Default)]
pub struct ConvertedSection {
    /// Markdown after the template pass, before conversion.
    pub markdown: String,
    pub html: String,
    pub headings: Vec<Heading>,
    pub meta: Map,
}

/// Runs the template pass and the converter for section bodies.
pub struct SectionConverter<'a> {
    pub converter: &'a dyn MarkdownConverter,
    pub highlighter: Option<&'a dyn Highlighter>,
    pub root: &'a ProjectRoot,
}

impl SectionConverter<'_> {
    /// Convert already-templated markdown.
    pub fn convert_markdown(
        &self,
        name: &str,
        markdown: String,
        header_base: usize,
    ) -> Result<ConvertedSection> {
        let mut filter = SectionFilter::new(name, self.root, self.highlighter, header_base);
        let converted = self
            .converter
            .convert(&markdown, &mut filter)
            .map_err(|err| match err {
                Error::Metadata { source, .. } => Error::Metadata {
                    section: name.to_string(),
                    source,
                },
                other => other,
            })?;
        let headings = filter.into_headings();
        let count = headings.len();
        let converter = self.converter.name();
        debug!(
            "Converted {name} with {converter}: {count} headings",
            name,
            converter,
            count
        );

        Ok(ConvertedSection {
            markdown,
            html: converted.html,
            headings,
            meta: converted.meta,
        })
    }

    /// Render `body` through the sandbox with `opts`, then convert it.
    pub fn convert(
        &self,
        name: &str,
        body: &str,
        opts: &Value,
        header_base: usize,
    ) -> Result<ConvertedSection> {
        let markdown = Sandbox::default().render(body, opts)?;
        self.convert_markdown(name, markdown, header_base)
    }
}
