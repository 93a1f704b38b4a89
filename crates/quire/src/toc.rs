// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Table of contents rows and appendix lettering.

use diagnostics::*;

use crate::section::Heading;
use crate::value::{Map, Value};

/// Spreadsheet-style appendix label: `0 → A`, `25 → Z`, `26 → AA`,
/// `51 → AZ`, `52 → BA`, `675 → YZ`, `676 → AAA`.
///
/// Every digit but the last is read with `A` standing for both 0 and 1, so
/// labels are unique for `n < 702`.
pub fn appendix_letter(n: usize) -> String {
    let mut digits = Vec::new();
    let mut rest = n;
    loop {
        digits.push(rest % 26);
        rest /= 26;
        if rest == 0 {
            break;
        }
    }

    let mut label = String::with_capacity(digits.len());
    for (i, digit) in digits.iter().enumerate().rev() {
        let offset = if i == 0 { *digit } else { digit.saturating_sub(1) };
        label.push(char::from(b'A' + offset as u8));
    }
    label
}

/// One TOC entry.
#[derive(Debug, Clone)]
pub struct TocRow {
    pub title: String,
    /// Namespaced target id (`{section}-{heading id}`).
    pub anchor: String,
    pub subsection: bool,
    pub appendix: Option<String>,
    /// Section options, available to the TOC template alongside the row keys.
    pub options: Map,
}

impl TocRow {
    /// Template view: the section options overlaid with `name` (the anchor),
    /// `title`, `issubsection` and, for appendix rows, `appendix_n`.
    pub fn to_value(&self) -> Value {
        let mut value = Value::Map(self.options.clone());
        value.insert("name", self.anchor.as_str());
        value.insert("anchor", self.anchor.as_str());
        value.insert("title", self.title.as_str());
        value.insert("issubsection", self.subsection);
        if let Some(letter) = &self.appendix {
            value.insert("appendix_n", letter.as_str());
        }
        value
    }
}

/// Ordered TOC rows plus appendix state for one build.
#[derive(Debug, Default, Clone)]
pub struct TocTracker {
    rows: Vec<TocRow>,
    appendix: bool,
    letters_used: usize,
}

impl TocTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[TocRow] {
        &self.rows
    }

    pub fn in_appendix(&self) -> bool {
        self.appendix
    }

    pub fn set_appendix(&mut self, on: bool) {
        debug!("Appendix mode {on}", on);
        self.appendix = on;
    }

    fn next_letter(&mut self) -> Option<String> {
        if !self.appendix {
            return None;
        }
        let letter = appendix_letter(self.letters_used);
        self.letters_used += 1;
        Some(letter)
    }

    /// Rows for a content section's headings at or above `max_level`.
    /// In appendix mode the section's first level-1 heading takes the next
    /// letter.
    pub fn add_headings(
        &mut self,
        section: &str,
        title: &str,
        headings: &[Heading],
        max_level: u8,
        options: &Map,
    ) -> usize {
        let mut lettered = false;
        let mut added = 0;
        for heading in headings {
            if heading.level > max_level {
                continue;
            }
            let appendix = if !lettered && heading.level == 1 {
                lettered = true;
                self.next_letter()
            } else {
                None
            };
            self.rows.push(TocRow {
                title: title.to_string(),
                anchor: format!("{}-{}", section, heading.id),
                subsection: heading.level != 1,
                appendix,
                options: options.clone(),
            });
            added += 1;
        }
        added
    }

    /// A single top-level row for a titled block (template kinds, column
    /// titles).
    pub fn add_titled(&mut self, anchor: &str, title: &str, options: &Map) {
        let appendix = self.next_letter();
        self.rows.push(TocRow {
            title: title.to_string(),
            anchor: anchor.to_string(),
            subsection: false,
            appendix,
            options: options.clone(),
        });
    }

    /// The context `templates/toc.html` renders against.
    pub fn context(&self) -> Value {
        let mut context = Value::map();
        context.insert(
            "sections",
            self.rows.iter().map(TocRow::to_value).collect::<Vec<_>>(),
        );
        context
    }
}
