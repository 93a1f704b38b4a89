// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Logic-less `{{mustache}}` templates, evaluated by the `mustache` crate.
//!
//! Contexts are built as [`Value`] trees and handed to the evaluator as
//! [`mustache::Data`]. That evaluator will not interpolate maps or lists and
//! will not open a section on a string, so every context key is exposed
//! under derived names and each tag is rewritten to the matching one:
//!
//! - `{{name}}`, `{{{name}}}` and `{{& name}}` read `name@text`;
//! - `{{#name}}` and `{{^name}}` read `name@section`, where null, `false`,
//!   zero and empty strings are false and any other scalar is a one-item
//!   list, so `{{.}}` inside it is the scalar itself;
//! - `{{.}}` reads `@this`, the text of the innermost scope.
//!
//! Nested maps also stay under their plain key so dotted paths such as
//! `{{config.title}}` resolve. Partials and delimiter changes are rejected.

use std::cell::RefCell;
use std::collections::HashMap;

use mustache::Data;

use crate::value::{Lambda, Map, Value};

const TEXT_SUFFIX: &str = "@text";
const SECTION_SUFFIX: &str = "@section";
const THIS_KEY: &str = "@this";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unclosed tag starting at byte {0}")]
    UnclosedTag(usize),

    #[error("section {0:?} is never closed")]
    UnclosedSection(String),

    #[error("unsupported tag {0:?}")]
    Unsupported(String),

    #[error("{0}")]
    Evaluator(String),
}

impl TemplateError {
    fn evaluator(err: impl std::fmt::Display) -> Self {
        Self::Evaluator(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Escaped,
    Raw,
    Open,
    Inverted,
    Close,
    Comment,
}

#[derive(Debug)]
struct Tag<'s> {
    start: usize,
    end: usize,
    kind: TagKind,
    key: &'s str,
}

fn scan(source: &str) -> Result<Vec<Tag<'_>>, TemplateError> {
    let mut tags = Vec::new();
    let mut pos = 0;
    while let Some(found) = source[pos..].find("{{") {
        let start = pos + found;
        let (end, inner, triple) = if source[start + 2..].starts_with('{') {
            let close = source[start + 3..]
                .find("}}}")
                .ok_or(TemplateError::UnclosedTag(start))?;
            (start + 3 + close + 3, &source[start + 3..start + 3 + close], true)
        } else {
            let close = source[start + 2..]
                .find("}}")
                .ok_or(TemplateError::UnclosedTag(start))?;
            (start + 2 + close + 2, &source[start + 2..start + 2 + close], false)
        };

        let inner = inner.trim();
        let rest = inner.get(1..).unwrap_or("").trim();
        let (kind, key) = match inner.chars().next() {
            _ if triple => (TagKind::Raw, inner),
            Some('#') => (TagKind::Open, rest),
            Some('^') => (TagKind::Inverted, rest),
            Some('/') => (TagKind::Close, rest),
            Some('!') => (TagKind::Comment, rest),
            Some('&') => (TagKind::Raw, rest),
            Some('>' | '=') => return Err(TemplateError::Unsupported(inner.to_string())),
            _ => (TagKind::Escaped, inner),
        };
        tags.push(Tag {
            start,
            end,
            kind,
            key,
        });
        pos = end;
    }
    Ok(tags)
}

/// Index of the tag closing the section opened at `open`.
fn matching_close(tags: &[Tag<'_>], open: usize) -> Result<usize, TemplateError> {
    let mut depth = 0usize;
    for (index, tag) in tags.iter().enumerate().skip(open + 1) {
        match tag.kind {
            TagKind::Open | TagKind::Inverted => depth += 1,
            TagKind::Close if depth == 0 => return Ok(index),
            TagKind::Close => depth -= 1,
            _ => {}
        }
    }
    Err(TemplateError::UnclosedSection(tags[open].key.to_string()))
}

fn text_key(key: &str) -> String {
    if key == "." {
        THIS_KEY.to_string()
    } else {
        format!("{key}{TEXT_SUFFIX}")
    }
}

fn section_key(key: &str) -> Result<String, TemplateError> {
    if key == "." {
        return Err(TemplateError::Unsupported(format!("#{key}")));
    }
    Ok(format!("{key}{SECTION_SUFFIX}"))
}

/// Rewrite every tag of `source` to the derived key names.
///
/// `replace` sees each tag key first. When it returns text, a variable tag
/// becomes that text, a section becomes that text in place of its whole
/// body, and an inverted section is dropped along with its body.
pub(crate) fn rewrite<F>(source: &str, replace: F) -> Result<String, TemplateError>
where
    F: Fn(&str) -> Option<String>,
{
    let tags = scan(source)?;
    let mut out = String::with_capacity(source.len() + tags.len() * SECTION_SUFFIX.len());
    let mut pos = 0;
    let mut index = 0;

    while let Some(tag) = tags.get(index) {
        out.push_str(&source[pos..tag.start]);
        pos = tag.end;
        index += 1;

        if tag.kind == TagKind::Comment {
            out.push_str(&source[tag.start..tag.end]);
            continue;
        }

        if let Some(replacement) = replace(tag.key) {
            match tag.kind {
                TagKind::Open | TagKind::Inverted => {
                    let close = matching_close(&tags, index - 1)?;
                    if tag.kind == TagKind::Open {
                        out.push_str(&replacement);
                    }
                    pos = tags[close].end;
                    index = close + 1;
                }
                _ => out.push_str(&replacement),
            }
            continue;
        }

        match tag.kind {
            TagKind::Escaped => out.push_str(&["{{", &text_key(tag.key), "}}"].concat()),
            TagKind::Raw => out.push_str(&["{{{", &text_key(tag.key), "}}}"].concat()),
            TagKind::Open => out.push_str(&["{{#", &section_key(tag.key)?, "}}"].concat()),
            TagKind::Inverted => out.push_str(&["{{^", &section_key(tag.key)?, "}}"].concat()),
            TagKind::Close => out.push_str(&["{{/", &section_key(tag.key)?, "}}"].concat()),
            TagKind::Comment => {}
        }
    }

    out.push_str(&source[pos..]);
    Ok(out)
}

/// The evaluator's view of `context`. Lambdas become [`Data::Fun`].
pub(crate) fn to_data(context: &Value) -> Data {
    scope(context)
}

/// True for the derived key a section tag reads.
pub(crate) fn is_section_key(key: &str) -> bool {
    key.ends_with(SECTION_SUFFIX)
}

fn scope(value: &Value) -> Data {
    match value {
        Value::Map(map) => Data::Map(scope_map(map)),
        other => Data::Map(HashMap::from([(THIS_KEY.to_string(), text(other))])),
    }
}

fn scope_map(map: &Map) -> HashMap<String, Data> {
    let mut scope = HashMap::with_capacity(map.len() * 3 + 1);
    scope.insert(THIS_KEY.to_string(), Data::String(String::new()));
    for (key, value) in map {
        if let Value::Map(inner) = value {
            scope.insert(key.clone(), Data::Map(scope_map(inner)));
        }
        scope.insert(format!("{key}{TEXT_SUFFIX}"), text(value));
        scope.insert(format!("{key}{SECTION_SUFFIX}"), section(value));
    }
    scope
}

fn text(value: &Value) -> Data {
    match value {
        Value::Lambda(lambda) => function(lambda),
        other => Data::String(other.to_text().into_owned()),
    }
}

/// Section form of a value.
pub(crate) fn section(value: &Value) -> Data {
    match value {
        Value::Bool(b) => Data::Bool(*b),
        Value::List(items) => Data::Vec(items.iter().map(scope).collect()),
        Value::Map(map) if !map.is_empty() => Data::Map(scope_map(map)),
        Value::Lambda(lambda) => function(lambda),
        other if other.is_truthy() => Data::Vec(vec![scope(other)]),
        _ => Data::Bool(false),
    }
}

fn function(lambda: &Lambda) -> Data {
    let lambda = lambda.clone();
    Data::Fun(RefCell::new(Box::new(move |text: String| lambda.call(&text))))
}

/// Compile an already rewritten template and render it.
pub(crate) fn evaluate(source: &str, data: &Data) -> Result<String, TemplateError> {
    let template = mustache::compile_str(source).map_err(TemplateError::evaluator)?;
    let mut out = Vec::with_capacity(source.len());
    template
        .render_data(&mut out, data)
        .map_err(TemplateError::evaluator)?;
    String::from_utf8(out).map_err(TemplateError::evaluator)
}

/// Render without a sandbox. Lambdas in the context are invoked.
pub fn render(source: &str, context: &Value) -> Result<String, TemplateError> {
    let source = rewrite(source, |_| None)?;
    evaluate(&source, &to_data(context))
}
