// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Document configuration, parsed from `<project>.toml`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::value::{Map, Value, map_from_toml};

/// Settings every document starts from; config files override them.
pub const DEFAULTS: &[(&str, &str)] = &[
    ("highlight", "monokai"),
    ("highlight_plaintext", "solarized-dark"),
    ("highlight_font", "'DejaVu Sans Mono', monospace"),
    ("highlight_style", "border-radius: 2px; overflow-x: auto;"),
    ("highlight_padding", "padding: 0.5rem 1rem 0.5rem 1rem;"),
    (
        "highlight_padding_lines",
        "padding: 0.25rem 0.5rem 0.25rem 0.5rem;",
    ),
    ("highlight_line_length", "74"),
];

/// Top-level document configuration.
///
/// ```toml
/// title = "Security Assessment"
/// converter = "pandoc"
///
/// [[sections]]
/// type = "cover"
///
/// [[sections]]
/// type = "toc"
///
/// [[sections]]
/// type = "section"
/// name = "intro"
/// title = "Introduction"
///
/// [[sections]]
/// type = "appendix_start"
///
/// [[sections]]
/// type = "section"
/// name = "tools"
/// conf = "sections/tools.toml"
/// ```
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    /// Merged top-level keys (defaults, then each file in order).
    pub values: toml::Table,
    pub sections: Vec<SectionSpec>,
    /// The first config file; its directory is the project root.
    pub source: PathBuf,
}

/// One `[[sections]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SectionSpec {
    #[serde(rename = "type")]
    pub kind: SectionKind,
    #[serde(default)]
    pub name: Option<String>,
    /// Append this section's markdown to the preceding content section.
    #[serde(default)]
    pub cont: bool,
    /// Project-relative TOML file overlaid on this section's options.
    #[serde(default)]
    pub conf: Option<String>,
    /// Alternate section template under `templates/`.
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub format: TemplateFormat,
    /// Every other key (`title`, `toc_header_level`, `columns`, free-form).
    #[serde(flatten)]
    pub options: toml::Table,
}

/// Section kind, from the `type` key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum SectionKind {
    Content,
    Toc,
    AppendixStart,
    AppendixEnd,
    /// Any other kind renders `templates/{kind}.{format}`.
    Template(String),
}

impl From<String> for SectionKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "section" => SectionKind::Content,
            "toc" => SectionKind::Toc,
            "appendix_start" => SectionKind::AppendixStart,
            "appendix_end" => SectionKind::AppendixEnd,
            _ => SectionKind::Template(kind),
        }
    }
}

impl SectionKind {
    pub fn as_str(&self) -> &str {
        match self {
            SectionKind::Content => "section",
            SectionKind::Toc => "toc",
            SectionKind::AppendixStart => "appendix_start",
            SectionKind::AppendixEnd => "appendix_end",
            SectionKind::Template(kind) => kind,
        }
    }

    /// The cover page never gets a TOC row.
    pub fn is_cover(&self) -> bool {
        matches!(self, SectionKind::Template(kind) if kind == "cover")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateFormat {
    #[default]
    Html,
    Md,
}

impl TemplateFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TemplateFormat::Html => "html",
            TemplateFormat::Md => "md",
        }
    }
}

/// Which markdown converter backend a build uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterKind {
    Pandoc,
    Cmark,
}

impl std::str::FromStr for ConverterKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pandoc" => Ok(ConverterKind::Pandoc),
            "cmark" => Ok(ConverterKind::Cmark),
            other => Err(format!("unknown converter '{}' (expected pandoc or cmark)", other)),
        }
    }
}

impl DocumentConfig {
    /// Load and merge config files; later files override top-level keys.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let Some(first) = paths.first() else {
            return Err(Error::io(
                "",
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "no config files given"),
            ));
        };
        let first = first.as_ref();
        if !first.is_file() {
            return Err(Error::io(
                first,
                std::io::Error::new(std::io::ErrorKind::NotFound, "config is not a file"),
            ));
        }

        let mut tables = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
            let table: toml::Table = toml::from_str(&text).map_err(|source| Error::Config {
                path: path.to_path_buf(),
                source,
            })?;
            tables.push(table);
        }

        Self::from_tables(tables, first.to_path_buf())
    }

    /// Parse a single config document (used by tests and embedders).
    pub fn parse_str(text: &str, source: impl Into<PathBuf>) -> Result<Self> {
        let source = source.into();
        let table: toml::Table = toml::from_str(text).map_err(|e| Error::Config {
            path: source.clone(),
            source: e,
        })?;
        Self::from_tables(vec![table], source)
    }

    fn from_tables(tables: Vec<toml::Table>, source: PathBuf) -> Result<Self> {
        let mut values = toml::Table::new();
        for (key, value) in DEFAULTS {
            values.insert(key.to_string(), toml::Value::String(value.to_string()));
        }
        for table in tables {
            values.extend(table);
        }

        let sections = match values.get("sections") {
            Some(toml::Value::Array(entries)) => entries
                .iter()
                .enumerate()
                .map(|(index, entry)| {
                    entry
                        .clone()
                        .try_into::<SectionSpec>()
                        .map_err(|e| Error::invalid_section(index, e.to_string()))
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => return Err(Error::invalid_section(0, "`sections` must be an array")),
            None => Vec::new(),
        };

        Ok(Self {
            values,
            sections,
            source,
        })
    }

    /// Directory holding the first config file.
    pub fn project_dir(&self) -> PathBuf {
        match self.source.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// `<stem>.pdf` next to the first config file.
    pub fn pdf_path(&self) -> PathBuf {
        self.source.with_extension("pdf")
    }

    pub fn converter(&self) -> std::result::Result<ConverterKind, String> {
        match self.values.get("converter") {
            Some(toml::Value::String(s)) => s.parse(),
            Some(_) => Err("`converter` must be a string".to_string()),
            None => Ok(ConverterKind::Pandoc),
        }
    }

    /// `highlighter = "none"` turns off external highlighting.
    pub fn highlighting_enabled(&self) -> bool {
        !matches!(self.values.get("highlighter"), Some(toml::Value::String(s)) if s == "none")
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(toml::Value::as_str)
    }

    /// The merged config as a template map, without `sections`.
    pub fn to_map(&self) -> Map {
        let mut map = map_from_toml(&self.values);
        map.remove("sections");
        map
    }

    /// Template context for the document: config keys at the top level and
    /// again under `config` for unambiguous `config.key` paths.
    pub fn context(&self) -> Value {
        let map = self.to_map();
        let mut context = Value::Map(map.clone());
        context.insert("config", Value::Map(map));
        context
    }
}

impl SectionSpec {
    /// The section's own keys as a template map.
    pub fn to_map(&self) -> Map {
        let mut map = map_from_toml(&self.options);
        map.insert("type".to_string(), Value::from(self.kind.as_str()));
        if let Some(name) = &self.name {
            map.insert("name".to_string(), Value::from(name.as_str()));
        }
        if let Some(alt) = &self.alt {
            map.insert("alt".to_string(), Value::from(alt.as_str()));
        }
        if self.cont {
            map.insert("cont".to_string(), Value::Bool(true));
        }
        map
    }
}
