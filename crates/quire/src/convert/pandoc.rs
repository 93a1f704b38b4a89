// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! External pandoc backend.
//!
//! `pandoc -f markdown -t json` produces the AST, the filter runs over the
//! JSON in document order, and `pandoc -f json -t html --wrap=none`
//! renders the result. Either pandoc run exiting non-zero fails the build.

use serde_json::{Value as Json, json};

use super::{Converted, MarkdownConverter, TreeFilter};
use crate::error::Result;
use crate::tool;
use crate::value::{Map, Value};

#[derive(Debug, Clone)]
pub struct Pandoc {
    program: String,
}

impl Default for Pandoc {
    fn default() -> Self {
        Self::with_program("pandoc")
    }
}

impl Pandoc {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl MarkdownConverter for Pandoc {
    fn name(&self) -> &str {
        "pandoc"
    }

    fn convert(&self, markdown: &str, filter: &mut dyn TreeFilter) -> Result<Converted> {
        let ast = tool::run_checked(
            &self.program,
            &["-f", "markdown", "-t", "json"],
            markdown.as_bytes(),
        )?;
        let mut ast: Json = serde_json::from_slice(&ast)?;

        if let Some(blocks) = ast.get_mut("blocks") {
            filter_ast(blocks, filter)?;
        }
        let meta = ast.get("meta").map(meta_to_map).unwrap_or_default();

        let filtered = serde_json::to_vec(&ast)?;
        let html = tool::run_checked(
            &self.program,
            &["-f", "json", "-t", "html", "--wrap=none"],
            &filtered,
        )?;

        Ok(Converted {
            html: String::from_utf8_lossy(&html).into_owned(),
            meta,
        })
    }
}

/// Apply `filter` to every `Header`, `CodeBlock` and `Image` below `node`,
/// in document order.
pub fn filter_ast(node: &mut Json, filter: &mut dyn TreeFilter) -> Result<()> {
    if let Json::Array(items) = node {
        for item in items.iter_mut() {
            filter_ast(item, filter)?;
        }
        return Ok(());
    }

    let kind = node
        .get("t")
        .and_then(Json::as_str)
        .unwrap_or_default()
        .to_string();
    match kind.as_str() {
        "Header" => {
            let level = node.pointer("/c/0").and_then(Json::as_u64).unwrap_or(1);
            let level = u8::try_from(level).unwrap_or(u8::MAX);
            if let Some(id) = node.pointer_mut("/c/1/0") {
                let slug = id.as_str().unwrap_or_default().to_string();
                *id = Json::String(filter.heading(level, &slug));
            }
        }
        "CodeBlock" => {
            let lang = node
                .pointer("/c/0/1/0")
                .and_then(Json::as_str)
                .map(str::to_string);
            let code = node
                .pointer("/c/1")
                .and_then(Json::as_str)
                .unwrap_or_default()
                .to_string();
            if let Some(html) = filter.code_block(lang.as_deref(), &code) {
                *node = json!({ "t": "RawBlock", "c": ["html", html] });
            }
            return Ok(());
        }
        "Image" => {
            let url = node
                .pointer("/c/2/0")
                .and_then(Json::as_str)
                .unwrap_or_default()
                .to_string();
            if let Some(html) = filter.image(&url)? {
                *node = json!({ "t": "RawInline", "c": ["html", html] });
                return Ok(());
            }
        }
        _ => {}
    }

    if let Json::Object(obj) = node {
        for value in obj.values_mut() {
            filter_ast(value, filter)?;
        }
    }
    Ok(())
}

/// Flatten pandoc `meta` into template values.
pub fn meta_to_map(meta: &Json) -> Map {
    match meta.as_object() {
        Some(obj) => obj
            .iter()
            .map(|(k, v)| (k.clone(), meta_value(v)))
            .collect(),
        None => Map::new(),
    }
}

fn meta_value(value: &Json) -> Value {
    let content = value.get("c");
    match value.get("t").and_then(Json::as_str) {
        Some("MetaMap") => Value::Map(content.map(meta_to_map).unwrap_or_default()),
        Some("MetaList") => Value::List(
            content
                .and_then(Json::as_array)
                .map(|items| items.iter().map(meta_value).collect())
                .unwrap_or_default(),
        ),
        Some("MetaBool") => Value::Bool(content.and_then(Json::as_bool).unwrap_or(false)),
        Some("MetaString") => Value::from(content.and_then(Json::as_str).unwrap_or_default()),
        Some("MetaInlines") | Some("MetaBlocks") => {
            let mut text = String::new();
            if let Some(content) = content {
                stringify(content, &mut text);
            }
            Value::Str(text.trim().to_string())
        }
        _ => Value::Null,
    }
}

/// Plain text of a run of pandoc inlines or blocks.
fn stringify(node: &Json, out: &mut String) {
    match node {
        Json::Array(items) => items.iter().for_each(|item| stringify(item, out)),
        Json::Object(obj) => match obj.get("t").and_then(Json::as_str) {
            Some("Str") => out.push_str(obj.get("c").and_then(Json::as_str).unwrap_or_default()),
            Some("Space") | Some("SoftBreak") | Some("LineBreak") => out.push(' '),
            Some("Code") | Some("Math") | Some("RawInline") => {
                if let Some(text) = node.pointer("/c/1").and_then(Json::as_str) {
                    out.push_str(text);
                }
            }
            Some("Para") | Some("Plain") => {
                if !out.is_empty() && !out.ends_with(' ') {
                    out.push(' ');
                }
                if let Some(c) = obj.get("c") {
                    stringify(c, out);
                }
            }
            _ => {
                if let Some(c) = obj.get("c") {
                    stringify(c, out);
                }
            }
        },
        _ => {}
    }
}
