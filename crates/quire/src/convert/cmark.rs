// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! In-process converter on pulldown-cmark.
//!
//! Works on the event stream the same way the heading-anchor pass does:
//! buffer the events of a heading, code block or footnote definition,
//! then emit replacement `Html` events. Footnotes are numbered in order of
//! first reference and rendered as one trailing `section.footnotes`.

use std::collections::HashMap;

use pulldown_cmark::{
    CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html::push_html,
};

use super::{Converted, MarkdownConverter, TreeFilter, slugify};
use crate::error::{Error, Result};
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct Cmark;

impl MarkdownConverter for Cmark {
    fn name(&self) -> &str {
        "cmark"
    }

    fn convert(&self, markdown: &str, filter: &mut dyn TreeFilter) -> Result<Converted> {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_HEADING_ATTRIBUTES
            | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS;

        let mut walk = Walk::new(filter);
        for event in Parser::new_ext(markdown, options) {
            walk.event(event)?;
        }
        walk.finish()
    }
}

struct HeadingBuf<'a> {
    level: u8,
    explicit_id: Option<String>,
    text: String,
    events: Vec<Event<'a>>,
}

struct CodeBuf {
    lang: Option<String>,
    fenced_info: Option<String>,
    text: String,
}

struct Walk<'a, 'f> {
    filter: &'f mut dyn TreeFilter,
    out: Vec<Event<'a>>,
    heading: Option<HeadingBuf<'a>>,
    code: Option<CodeBuf>,
    skipping_image: bool,
    footnote: Option<(String, Vec<Event<'a>>)>,
    definitions: HashMap<String, Vec<Event<'a>>>,
    numbers: HashMap<String, usize>,
    order: Vec<String>,
    metadata: Option<String>,
    in_metadata: bool,
}

impl<'a, 'f> Walk<'a, 'f> {
    fn new(filter: &'f mut dyn TreeFilter) -> Self {
        Self {
            filter,
            out: Vec::new(),
            heading: None,
            code: None,
            skipping_image: false,
            footnote: None,
            definitions: HashMap::new(),
            numbers: HashMap::new(),
            order: Vec::new(),
            metadata: None,
            in_metadata: false,
        }
    }

    /// Route an output event to the innermost open buffer.
    fn emit(&mut self, event: Event<'a>) {
        if let Some(heading) = self.heading.as_mut() {
            heading.events.push(event);
        } else if let Some((_, events)) = self.footnote.as_mut() {
            events.push(event);
        } else {
            self.out.push(event);
        }
    }

    fn event(&mut self, event: Event<'a>) -> Result<()> {
        match event {
            Event::Start(Tag::MetadataBlock(_)) => {
                self.in_metadata = true;
            }
            Event::End(TagEnd::MetadataBlock(_)) => {
                self.in_metadata = false;
            }
            Event::Text(text) if self.in_metadata => {
                self.metadata.get_or_insert_with(String::new).push_str(&text);
            }

            Event::Start(Tag::CodeBlock(kind)) => {
                let fenced_info = match &kind {
                    CodeBlockKind::Fenced(info) => Some(info.to_string()),
                    CodeBlockKind::Indented => None,
                };
                let lang = fenced_info
                    .as_deref()
                    .and_then(|info| info.split_whitespace().next())
                    .map(|lang| lang.trim_start_matches('.').to_string());
                self.code = Some(CodeBuf {
                    lang,
                    fenced_info,
                    text: String::new(),
                });
            }
            Event::Text(text) if self.code.is_some() => {
                if let Some(code) = self.code.as_mut() {
                    code.text.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(code) = self.code.take() {
                    match self.filter.code_block(code.lang.as_deref(), &code.text) {
                        Some(html) => self.emit(Event::Html(html.into())),
                        None => {
                            let kind = match code.fenced_info {
                                Some(info) => CodeBlockKind::Fenced(info.into()),
                                None => CodeBlockKind::Indented,
                            };
                            self.emit(Event::Start(Tag::CodeBlock(kind)));
                            self.emit(Event::Text(code.text.into()));
                            self.emit(Event::End(TagEnd::CodeBlock));
                        }
                    }
                }
            }

            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => match self.filter.image(&dest_url)? {
                Some(html) => {
                    self.skipping_image = true;
                    self.emit(Event::InlineHtml(html.into()));
                }
                None => self.emit(Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                })),
            },
            Event::End(TagEnd::Image) if self.skipping_image => {
                self.skipping_image = false;
            }
            _ if self.skipping_image => {}

            Event::Start(Tag::Heading { level, id, .. }) => {
                self.heading = Some(HeadingBuf {
                    level: level_number(level),
                    explicit_id: id.map(|id| id.to_string()),
                    text: String::new(),
                    events: Vec::new(),
                });
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(heading) = self.heading.take() {
                    let slug = match heading.explicit_id {
                        Some(id) => id,
                        None => slugify(&heading.text),
                    };
                    let id = self.filter.heading(heading.level, &slug);
                    self.emit(Event::Html(
                        format!("<h{} id=\"{}\">", heading.level, escape_attr(&id)).into(),
                    ));
                    for inner in heading.events {
                        self.emit(inner);
                    }
                    self.emit(Event::Html(format!("</h{}>\n", heading.level).into()));
                }
            }
            Event::Text(text) if self.heading.is_some() => {
                if let Some(heading) = self.heading.as_mut() {
                    heading.text.push_str(&text);
                    heading.events.push(Event::Text(text));
                }
            }
            Event::Code(code) if self.heading.is_some() => {
                if let Some(heading) = self.heading.as_mut() {
                    heading.text.push_str(&code);
                    heading.events.push(Event::Code(code));
                }
            }

            Event::FootnoteReference(label) => {
                let html = self.reference(&label);
                self.emit(Event::InlineHtml(html.into()));
            }
            Event::Start(Tag::FootnoteDefinition(label)) => {
                self.footnote = Some((label.to_string(), Vec::new()));
            }
            Event::End(TagEnd::FootnoteDefinition) => {
                if let Some((label, events)) = self.footnote.take() {
                    _ = self.definitions.insert(label, events);
                }
            }

            other => self.emit(other),
        }
        Ok(())
    }

    fn reference(&mut self, label: &CowStr<'a>) -> String {
        let label = label.to_string();
        match self.numbers.get(&label) {
            Some(n) => format!(
                "<a href=\"#fn{n}\" class=\"footnote-ref\" role=\"doc-noteref\"><sup>{n}</sup></a>"
            ),
            None => {
                self.order.push(label.clone());
                let n = self.order.len();
                _ = self.numbers.insert(label, n);
                format!(
                    "<a href=\"#fn{n}\" class=\"footnote-ref\" id=\"fnref{n}\" role=\"doc-noteref\"><sup>{n}</sup></a>"
                )
            }
        }
    }

    fn finish(mut self) -> Result<Converted> {
        let mut html = String::new();
        push_html(&mut html, std::mem::take(&mut self.out).into_iter());

        if !self.order.is_empty() {
            html.push_str(
                "<section id=\"footnotes\" class=\"footnotes footnotes-end-of-document\" role=\"doc-endnotes\">\n<hr />\n<ol>\n",
            );
            for (i, label) in self.order.iter().enumerate() {
                let n = i + 1;
                let mut note = String::new();
                if let Some(events) = self.definitions.remove(label) {
                    push_html(&mut note, events.into_iter());
                }
                let backlink = format!(
                    "<a href=\"#fnref{n}\" class=\"footnote-back\" role=\"doc-backlink\">↩︎</a>"
                );
                let trimmed = note.trim_end();
                match trimmed.strip_suffix("</p>") {
                    Some(body) => note = format!("{body}{backlink}</p>"),
                    None => {
                        note.truncate(trimmed.len());
                        note.push_str(&backlink);
                    }
                }
                html.push_str(&format!("<li id=\"fn{n}\">{note}</li>\n"));
            }
            html.push_str("</ol>\n</section>\n");
        }

        let meta = match self.metadata {
            Some(yaml) if !yaml.trim().is_empty() => {
                let parsed: serde_yaml_ng::Value =
                    serde_yaml_ng::from_str(&yaml).map_err(|source| Error::Metadata {
                        section: String::new(),
                        source,
                    })?;
                match Value::from_yaml(&parsed) {
                    Value::Map(map) => map,
                    _ => Default::default(),
                }
            }
            _ => Default::default(),
        };

        Ok(Converted { html, meta })
    }
}

fn level_number(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
