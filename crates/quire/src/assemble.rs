// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Document assembly.
//!
//! A [`Builder`] holds what a build needs (config, project root, converter,
//! highlighter). Each [`Builder::assemble`] call runs one `BuildSession`,
//! which owns the running header count, the footnote collection and the
//! TOC tracker, and walks the configured sections exactly once in order.
//! TOC placeholders are filled in after the walk, when every row is known.

use std::time::Instant;

use diagnostics::*;

use crate::config::{DocumentConfig, SectionKind, SectionSpec, TemplateFormat};
use crate::convert::{MarkdownConverter, converter_for};
use crate::error::{Error, Result};
use crate::footnotes::FootnoteCollection;
use crate::highlight::{ExternalHighlight, Highlighter};
use crate::html::Fragment;
use crate::namespace::namespace_ids;
use crate::path_guard::ProjectRoot;
use crate::sandbox::Sandbox;
use crate::section::{Heading, SectionConverter};
use crate::toc::{TocRow, TocTracker};
use crate::value::{Map, Value, map_from_toml};

pub const BASE_TEMPLATE: &str = "templates/base.html";
pub const SECTION_TEMPLATE: &str = "templates/section.html";
pub const TOC_TEMPLATE: &str = "templates/toc.html";

/// Output of the section walk, before the outer `base.html` pass.
#[derive(Debug, Clone, Default)]
pub struct AssembledDocument {
    pub body: String,
    /// Every section's extracted footnote block, in document order.
    pub footnotes: String,
    pub toc: Vec<TocRow>,
    pub heading_count: usize,
    pub footnote_count: usize,
}

pub struct Builder {
    config: DocumentConfig,
    root: ProjectRoot,
    converter: Box<dyn MarkdownConverter>,
    highlighter: Option<Box<dyn Highlighter>>,
    debug_markdown: bool,
}

impl Builder {
    pub fn new(config: DocumentConfig) -> Result<Self> {
        let root = ProjectRoot::new(config.project_dir())?;
        let kind = config.converter().map_err(|message| Error::InvalidSetting {
            key: "converter".to_string(),
            message,
        })?;
        let highlighter: Option<Box<dyn Highlighter>> = if config.highlighting_enabled() {
            Some(Box::new(ExternalHighlight::from_config(&config)))
        } else {
            None
        };

        Ok(Self {
            converter: converter_for(kind),
            highlighter,
            config,
            root,
            debug_markdown: false,
        })
    }

    pub fn with_converter(mut self, converter: Box<dyn MarkdownConverter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_highlighter(mut self, highlighter: Option<Box<dyn Highlighter>>) -> Self {
        self.highlighter = highlighter;
        self
    }

    /// Expose each section's pre-conversion markdown as `debug_markdown`.
    pub fn with_debug_markdown(mut self, on: bool) -> Self {
        self.debug_markdown = on;
        self
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    pub fn root(&self) -> &ProjectRoot {
        &self.root
    }

    /// Walk every section in order and produce the document body.
    pub fn assemble(&self) -> Result<AssembledDocument> {
        BuildSession::new(self).run()
    }

    /// Render `templates/base.html` around an assembled document.
    pub fn render_base(&self, doc: &AssembledDocument) -> Result<String> {
        let template = self.root.read_to_string(BASE_TEMPLATE)?;
        let mut context = self.config.context();
        context.insert("body", doc.body.as_str());
        context.insert("footnotes", doc.footnotes.as_str());
        context.insert(
            "toc",
            doc.toc.iter().map(TocRow::to_value).collect::<Vec<_>>(),
        );
        Ok(Sandbox::default().render(&template, &context)?)
    }

    /// Assemble and apply the outer template.
    pub fn render_html(&self) -> Result<String> {
        let doc = self.assemble()?;
        self.render_base(&doc)
    }
}

enum Piece {
    Rendered(String),
    Toc,
}

/// A converted, namespaced and footnote-stripped fragment.
struct Fragmented {
    html: String,
    footnotes: String,
    headings: Vec<Heading>,
    meta: Map,
}

/// Options a section renders with. `local` holds only the section's own
/// layers (entry keys, `conf` file, front matter) so lookups such as the
/// TOC title never fall through to the document config.
struct SectionOptions {
    opts: Value,
    local: Map,
}

impl SectionOptions {
    fn apply_front_matter(&mut self, meta: &Map) {
        self.opts.overlay(meta);
        self.local.extend(meta.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

struct BuildSession<'b> {
    builder: &'b Builder,
    sandbox: Sandbox,
    headers: usize,
    footnotes: FootnoteCollection,
    toc: TocTracker,
    pieces: Vec<Piece>,
    section_template: Option<String>,
}

impl<'b> BuildSession<'b> {
    fn new(builder: &'b Builder) -> Self {
        Self {
            builder,
            sandbox: Sandbox::default(),
            headers: 0,
            footnotes: FootnoteCollection::new(),
            toc: TocTracker::new(),
            pieces: Vec::new(),
            section_template: None,
        }
    }

    fn run(mut self) -> Result<AssembledDocument> {
        let started = Instant::now();
        let builder = self.builder;
        let sections = &builder.config.sections;

        for (index, spec) in sections.iter().enumerate() {
            match &spec.kind {
                SectionKind::Content if spec.cont => {
                    // Already appended to the preceding content section.
                }
                SectionKind::Content => self.content(index, spec)?,
                SectionKind::Toc => self.pieces.push(Piece::Toc),
                SectionKind::AppendixStart => self.toc.set_appendix(true),
                SectionKind::AppendixEnd => self.toc.set_appendix(false),
                SectionKind::Template(kind) => self.template(index, spec, kind)?,
            }
        }

        let toc_html = if self.pieces.iter().any(|p| matches!(p, Piece::Toc)) {
            let template = builder.root.read_to_string(TOC_TEMPLATE)?;
            self.sandbox.render(&template, &self.toc.context())?
        } else {
            String::new()
        };

        let mut body = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Rendered(html) => body.push_str(html),
                Piece::Toc => body.push_str(&toc_html),
            }
            body.push('\n');
        }

        let section_count = sections.len();
        let rows = self.toc.rows().len();
        let footnotes = self.footnotes.count();
        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            "Assembled {section_count} sections: {rows} TOC rows, {footnotes} footnotes in {elapsed_ms}ms",
            section_count,
            rows,
            footnotes,
            elapsed_ms
        );

        Ok(AssembledDocument {
            body,
            footnotes: self.footnotes.to_html(),
            toc: self.toc.rows().to_vec(),
            heading_count: self.headers,
            footnote_count: footnotes,
        })
    }

    /// Options for one section entry: document config, then the entry's own
    /// keys, then its `conf` file. Front matter is applied after conversion.
    fn section_options(&self, spec: &SectionSpec) -> Result<SectionOptions> {
        let builder = self.builder;
        let config = builder.config.to_map();

        let mut local = spec.to_map();
        if let Some(conf) = &spec.conf {
            let text = builder.root.read_to_string(conf)?;
            let table: toml::Table = toml::from_str(&text).map_err(|source| Error::Config {
                path: conf.into(),
                source,
            })?;
            local.extend(map_from_toml(&table));
        }

        let mut opts = Value::Map(config.clone());
        opts.overlay(&local);
        opts.insert("config", config);
        if let Some(name) = &spec.name {
            opts.insert("section_name", name.as_str());
        }
        if self.toc.in_appendix() {
            opts.insert("appendix", true);
        }
        Ok(SectionOptions { opts, local })
    }

    fn read_section(
        &self,
        index: usize,
        spec: &SectionSpec,
    ) -> Result<(String, SectionOptions, String)> {
        let Some(name) = spec.name.clone() else {
            return Err(Error::invalid_section(index, "content sections need a `name`"));
        };
        let options = self.section_options(spec)?;
        let raw = self
            .builder
            .root
            .read_to_string(format!("sections/{}.md", name))?;
        let markdown = self.sandbox.render(&raw, &options.opts)?;
        Ok((name, options, markdown))
    }

    fn content(&mut self, index: usize, spec: &SectionSpec) -> Result<()> {
        let builder = self.builder;
        let (name, mut section, mut markdown) = self.read_section(index, spec)?;

        for (next_index, next) in builder.config.sections.iter().enumerate().skip(index + 1) {
            if next.kind != SectionKind::Content || !next.cont {
                break;
            }
            let (next_name, _, more) = self.read_section(next_index, next)?;
            debug!("Continuing {name} with {next_name}", name: &*name, next_name: &*next_name);
            markdown.push_str("\n\n");
            markdown.push_str(&more);
        }

        if builder.debug_markdown {
            section.opts.insert("debug_markdown", markdown.as_str());
        }

        let fragment = self.convert_fragment(&name, markdown)?;
        section.apply_front_matter(&fragment.meta);
        let title = title_of(&section.local, &name);
        let mut opts = section.opts;
        let options = opts.as_map().cloned().unwrap_or_default();

        if section.local.contains_key("columns") {
            match own_title(&section.local) {
                Some(column_title) => self.toc.add_titled(
                    &format!("{}-columns-title", name),
                    column_title,
                    &options,
                ),
                None => opts.insert("title", ""),
            }
        }
        self.toc.add_headings(
            &name,
            &title,
            &fragment.headings,
            toc_level(&opts),
            &options,
        );

        opts.insert("html", fragment.html);
        opts.insert("footnotes", fragment.footnotes);
        let snapshot = opts.clone();
        opts.insert("opts", snapshot);

        let template = match &spec.alt {
            Some(alt) => builder.root.read_to_string(format!("templates/{}.html", alt))?,
            None => self.section_template()?,
        };
        let rendered = self.sandbox.render(&template, &opts)?;
        self.pieces.push(Piece::Rendered(rendered));
        Ok(())
    }

    /// Any other section kind renders `templates/{kind}.{format}`.
    fn template(&mut self, index: usize, spec: &SectionSpec, kind: &str) -> Result<()> {
        let builder = self.builder;
        let path = format!("templates/{}.{}", kind, spec.format.extension());
        let mut source = builder.root.read_to_string(&path)?;
        let mut section = self.section_options(spec)?;

        if spec.format == TemplateFormat::Md {
            let name = spec.name.clone().unwrap_or_else(|| kind.to_string());
            if spec.name.is_none() {
                section.opts.insert("section_name", name.as_str());
            }
            let markdown = self.sandbox.render(&source, &section.opts)?;
            if builder.debug_markdown {
                section.opts.insert("debug_markdown", markdown.as_str());
            }

            let fragment = self.convert_fragment(&name, markdown)?;
            section.apply_front_matter(&fragment.meta);
            let title = title_of(&section.local, &name);
            let opts = &mut section.opts;
            let options = opts.as_map().cloned().unwrap_or_default();
            self.toc.add_headings(
                &name,
                &title,
                &fragment.headings,
                toc_level(&opts),
                &options,
            );
            opts.insert("html", fragment.html.as_str());
            opts.insert("footnotes", fragment.footnotes);
            source = fragment.html;
        }

        let opts = &section.opts;
        let rendered = self.sandbox.render(&source, opts)?;
        self.pieces.push(Piece::Rendered(rendered));

        if !spec.kind.is_cover()
            && let Some(title) = own_title(&section.local)
        {
            let options = opts.as_map().cloned().unwrap_or_default();
            self.toc.add_titled(kind, title, &options);
        }
        debug!("Rendered {kind} section #{index}", kind: &*kind, index);
        Ok(())
    }

    /// Convert, namespace and strip footnotes, advancing the running
    /// counters. Front matter comes back in `meta`.
    fn convert_fragment(&mut self, name: &str, markdown: String) -> Result<Fragmented> {
        let builder = self.builder;
        let converter = SectionConverter {
            converter: builder.converter.as_ref(),
            highlighter: builder.highlighter.as_deref(),
            root: &builder.root,
        };
        let converted = converter.convert_markdown(name, markdown, self.headers)?;
        self.headers += converted.headings.len();

        let fragment = Fragment::parse(&converted.html);
        namespace_ids(&fragment, name);
        let footnotes = self.footnotes.absorb(&fragment, name)?.unwrap_or_default();
        let html = fragment.to_html()?;

        let headings = converted.headings.len();
        let total = self.footnotes.count();
        debug!("Section {name}: {headings} headings, footnotes now {total}", name, headings, total);

        Ok(Fragmented {
            html,
            footnotes,
            headings: converted.headings,
            meta: converted.meta,
        })
    }

    fn section_template(&mut self) -> Result<String> {
        if let Some(template) = &self.section_template {
            return Ok(template.clone());
        }
        let template = self.builder.root.read_to_string(SECTION_TEMPLATE)?;
        self.section_template = Some(template.clone());
        Ok(template)
    }
}

/// A non-empty `title` set by the section itself.
fn own_title(local: &Map) -> Option<&str> {
    local
        .get("title")
        .and_then(Value::as_str)
        .filter(|title| !title.is_empty())
}

/// TOC title: the section's own `title`, falling back to its name.
fn title_of(local: &Map, name: &str) -> String {
    own_title(local).unwrap_or(name).to_string()
}

fn toc_level(opts: &Value) -> u8 {
    opts.get("toc_header_level")
        .and_then(Value::as_int)
        .map_or(1, |level| level.clamp(1, 9) as u8)
}
