// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Restricted resource fetching for the PDF renderer.
//!
//! The renderer may only load local files under the project root. Before
//! it runs, the final HTML is parsed and everything it could fetch is
//! resolved: URL-bearing attributes on any element, `url()` and `@import`
//! in `<style>` blocks and `style` attributes, and, following each local
//! stylesheet, the references inside it. A remote URL or an escaping path
//! fails the build.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use diagnostics::*;
use regex::Regex;

use crate::error::{Error, Result};
use crate::html::{self, Fragment};
use crate::path_guard::ProjectRoot;

/// Attributes whose value is a single fetched URL.
const URL_ATTRIBUTES: &[&str] = &["src", "href", "data", "poster", "background"];

/// Elements whose `href` is a link to follow, not a resource to load.
const NAVIGATION_ELEMENTS: &[&str] = &["a", "area"];

static CSS_REFERENCES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^)\s]*))\s*\)"#,
        r#"(?i)@import\s+(?:"([^"]*)"|'([^']*)')"#,
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Every `url()` and `@import` target in a piece of CSS.
pub fn css_references(css: &str) -> Vec<String> {
    let mut refs = Vec::new();
    for pattern in CSS_REFERENCES.iter() {
        for caps in pattern.captures_iter(css) {
            if let Some(m) = caps.iter().skip(1).flatten().next() {
                refs.push(m.as_str().to_string());
            }
        }
    }
    refs
}

/// Candidate URLs of a `srcset` value (`a.png 1x, b.png 2x`).
fn srcset_urls(srcset: &str) -> impl Iterator<Item = String> + '_ {
    srcset
        .split(',')
        .filter_map(|candidate| candidate.split_whitespace().next())
        .map(str::to_string)
}

/// Every resource reference in `html`, in document order.
pub fn resource_references(html: &str) -> Vec<String> {
    let document = Fragment::parse_document(html);
    let mut refs = Vec::new();
    for node in document.elements() {
        let tag = html::tag(&node).unwrap_or_default();
        for (name, value) in html::attrs(&node) {
            match name.as_str() {
                "href" if NAVIGATION_ELEMENTS.contains(&tag) => {}
                "srcset" => refs.extend(srcset_urls(&value)),
                "style" => refs.extend(css_references(&value)),
                name if URL_ATTRIBUTES.contains(&name) => refs.push(value),
                _ => {}
            }
        }
        if tag == "style" {
            refs.extend(css_references(&html::text_content(&node)));
        }
    }
    refs.retain(|r| !r.trim().is_empty());
    refs
}

/// Map one reference to a file under the project root.
///
/// `file://` URLs and scheme-less paths are local; anything with another
/// scheme (`http:`, `https:`, `data:`, ...) is refused.
pub fn resolve_resource(root: &ProjectRoot, reference: &str) -> Result<PathBuf> {
    resolve_from(root, root.path(), reference)
}

/// As [`resolve_resource`], with relative paths taken from `base`.
fn resolve_from(root: &ProjectRoot, base: &Path, reference: &str) -> Result<PathBuf> {
    let reference = reference.trim();
    let local = match reference.strip_prefix("file://") {
        Some(path) => Path::new(path),
        None => match url::Url::parse(reference) {
            Err(url::ParseError::RelativeUrlWithoutBase) => Path::new(reference),
            _ => {
                return Err(Error::RemoteUrl {
                    url: reference.to_string(),
                });
            }
        },
    };
    let path = local
        .to_str()
        .and_then(|p| p.split(['?', '#']).next())
        .unwrap_or_default();
    if Path::new(path).is_absolute() {
        root.resolve(path)
    } else {
        root.resolve(base.join(path))
    }
}

fn is_stylesheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("css"))
}

/// Resolve every resource in `html` and in the local stylesheets it
/// reaches, failing on the first one that is not a local project file.
pub fn check_resources(root: &ProjectRoot, html: &str) -> Result<Vec<PathBuf>> {
    let mut resolved: Vec<PathBuf> = Vec::new();
    let mut pending: VecDeque<(PathBuf, String)> = resource_references(html)
        .into_iter()
        .map(|reference| (root.path().to_path_buf(), reference))
        .collect();

    while let Some((base, reference)) = pending.pop_front() {
        let path = resolve_from(root, &base, &reference)?;
        if resolved.contains(&path) {
            continue;
        }
        if is_stylesheet(&path) && path.is_file() {
            let css = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
            let dir = path.parent().unwrap_or(root.path()).to_path_buf();
            pending.extend(
                css_references(&css)
                    .into_iter()
                    .filter(|r| !r.trim().is_empty())
                    .map(|r| (dir.clone(), r)),
            );
        }
        resolved.push(path);
    }

    let count = resolved.len();
    debug!("Resolved {count} local resources", count);
    Ok(resolved)
}
