// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Cross-section footnote numbering.
//!
//! Each converter run numbers its footnotes from 1. After namespacing, the
//! section's `.footnotes` container is pulled out of the body, its list is
//! made to start at the running number, reference markers are shifted by
//! the same offset, and the block joins the document-wide collection.
//! Sections must be absorbed in document order.

use diagnostics::*;

use crate::error::Result;
use crate::html::{self, Fragment};

/// Running footnote state for one build.
#[derive(Debug, Default, Clone)]
pub struct FootnoteCollection {
    seen: usize,
    blocks: Vec<String>,
}

impl FootnoteCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Footnotes numbered so far.
    pub fn count(&self) -> usize {
        self.seen
    }

    pub fn blocks(&self) -> &[String] {
        &self.blocks
    }

    /// All collected blocks, in document order.
    pub fn to_html(&self) -> String {
        self.blocks.join("\n")
    }

    /// Extract and renumber `fragment`'s footnotes. Returns the extracted
    /// block (also appended to the collection), or `None` when the section
    /// has no footnotes.
    pub fn absorb(&mut self, fragment: &Fragment, section: &str) -> Result<Option<String>> {
        let Some(container) = fragment.find(|n| html::has_class(n, "footnotes")) else {
            return Ok(None);
        };
        html::detach(&container);

        let offset = self.seen;
        let start = offset + 1;

        let mut items = 0;
        if let Some(list) = html::descendants(&container)
            .into_iter()
            .find(|n| html::has_tag(n, "ol"))
        {
            html::set_attr(&list, "start", &start.to_string());
            html::set_attr(
                &list,
                "style",
                &format!(
                    "counter-reset:list-item {}; counter-increment:list-item -1;",
                    start
                ),
            );
            items = list
                .children
                .borrow()
                .iter()
                .filter(|c| html::has_tag(c, "li"))
                .count();
        }
        html::remove_attr(&container, "id");

        for anchor in fragment.find_all(|n| html::has_class(n, "footnote-ref")) {
            retarget(&anchor, section);
            if let Some(sup) = html::descendants(&anchor)
                .into_iter()
                .find(|n| html::has_tag(n, "sup"))
            {
                let marker = html::text_content(&sup);
                match marker.trim().parse::<usize>() {
                    Ok(local) => html::set_text(&sup, &(offset + local).to_string()),
                    Err(_) => warn!(
                        "footnote marker {marker} in section {section} is not a number",
                        marker: marker.as_str(),
                        section
                    ),
                }
            }
        }

        for backlink in html::descendants(&container)
            .into_iter()
            .filter(|n| html::has_class(n, "footnote-back"))
        {
            retarget(&backlink, section);
        }

        let block = html::outer_html_as(&container, "div")?;
        self.seen += items;
        self.blocks.push(block.clone());
        debug!("Section {section} footnotes {start}..{end}", section, start, end: self.seen);
        Ok(Some(block))
    }
}

fn retarget(anchor: &markup5ever_rcdom::Handle, section: &str) {
    if let Some(href) = html::attr(anchor, "href")
        && let Some(target) = href.strip_prefix('#')
    {
        html::set_attr(anchor, "href", &format!("#{}-{}", section, target));
    }
}
