// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Document-wide anchor uniqueness.
//!
//! Sections are converted independently, so two of them can both emit
//! `id="overview1"` or `id="fn1"`. Every id in a section fragment is
//! rewritten to `{section}-{id}`; `article` elements (the section template
//! root) keep theirs.

use crate::html::{self, Fragment};

/// Move ids from `<section id=..>` wrappers onto their leading heading,
/// then prefix every remaining id with the section name.
pub fn namespace_ids(fragment: &Fragment, section: &str) -> usize {
    relocate_wrapper_ids(fragment);

    let mut renamed = 0;
    for node in fragment.find_all(|n| !html::has_tag(n, "article")) {
        if let Some(id) = html::attr(&node, "id") {
            html::set_attr(&node, "id", &format!("{}-{}", section, id));
            renamed += 1;
        }
    }
    renamed
}

fn relocate_wrapper_ids(fragment: &Fragment) {
    for wrapper in fragment.find_all(|n| html::has_tag(n, "section")) {
        let Some(id) = html::attr(&wrapper, "id") else {
            continue;
        };
        let children = html::meaningful_children(&wrapper);
        if let Some(first) = children.first()
            && html::is_heading(first)
        {
            html::set_attr(first, "id", &id);
            html::remove_attr(&wrapper, "id");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn ids(fragment: &Fragment) -> Vec<String> {
        fragment
            .elements()
            .filter_map(|n| html::attr(&n, "id"))
            .collect()
    }

    #[test]
    fn test_prefixes_ids() {
        let frag = Fragment::parse("<h1 id=\"scope1\">Scope</h1><p id=\"x\">text</p>");
        assert_eq!(namespace_ids(&frag, "intro"), 2);
        assert_eq!(ids(&frag), vec!["intro-scope1", "intro-x"]);
    }

    #[test]
    fn test_article_id_untouched() {
        let frag = Fragment::parse("<article id=\"intro\"><h1 id=\"a1\">A</h1></article>");
        namespace_ids(&frag, "intro");
        assert_eq!(ids(&frag), vec!["intro", "intro-a1"]);
    }

    #[test]
    fn test_wrapper_id_moves_to_heading() {
        let frag = Fragment::parse(
            "<section id=\"findings\" class=\"level2\">\n<h2>Findings</h2>\n<p>x</p>\n</section>\
             <section id=\"other\"><p>no heading</p></section>",
        );
        namespace_ids(&frag, "apx");
        let html = frag.to_html().expect("serialize");
        assert!(html.contains("<section class=\"level2\">"), "{html}");
        assert!(html.contains("<h2 id=\"apx-findings\">Findings</h2>"), "{html}");
        assert!(html.contains("<section id=\"apx-other\">"), "{html}");
    }

    #[test]
    fn test_identical_local_ids_become_unique() {
        let a = Fragment::parse("<h1 id=\"overview1\">O</h1><li id=\"fn1\">n</li>");
        let b = Fragment::parse("<h1 id=\"overview1\">O</h1><li id=\"fn1\">n</li>");
        namespace_ids(&a, "intro");
        namespace_ids(&b, "details");

        let all: Vec<String> = ids(&a).into_iter().chain(ids(&b)).collect();
        let unique: HashSet<&String> = all.iter().collect();
        assert_eq!(all.len(), 4);
        assert_eq!(unique.len(), all.len());
    }
}
