// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! End-to-end assembly over temporary projects, using the built-in
//! CommonMark backend and no highlighter.

use std::collections::HashSet;
use std::path::PathBuf;

use quire::html::{self, Fragment};
use quire::{Builder, DocumentConfig, Error};

const SECTION_HTML: &str = "<article id=\"{{section_name}}\">{{{html}}}</article>";
const TOC_HTML: &str =
    "{{#sections}}[{{anchor}}|{{title}}|{{appendix_n}}|{{issubsection}}]\n{{/sections}}";
const BASE_HTML: &str = "<html><head><title>{{title}}</title></head><body>{{{body}}}<div class=\"notes\">{{{footnotes}}}</div></body></html>";

struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    /// A project whose config is `report.toml` = common header + `sections`.
    fn new(sections: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let project = Self { dir };
        project.write(
            "report.toml",
            &format!(
                "title = \"Assessment\"\nclient = \"ACME\"\nconverter = \"cmark\"\nhighlighter = \"none\"\n\n{}",
                sections
            ),
        );
        project.write("templates/section.html", SECTION_HTML);
        project.write("templates/toc.html", TOC_HTML);
        project.write("templates/base.html", BASE_HTML);
        project
    }

    fn write(&self, relative: &str, contents: &str) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, contents).expect("write");
    }

    fn config_path(&self) -> PathBuf {
        self.dir.path().join("report.toml")
    }

    fn builder(&self) -> Builder {
        let config = DocumentConfig::load(&[self.config_path()]).expect("config");
        Builder::new(config).expect("builder")
    }
}

fn all_ids(html: &str) -> Vec<String> {
    Fragment::parse(html)
        .elements()
        .filter_map(|n| html::attr(&n, "id"))
        .collect()
}

#[test]
fn test_appendix_letter_on_third_row() {
    let project = Project::new(
        r#"
[[sections]]
type = "toc"

[[sections]]
type = "section"
name = "intro"
title = "Introduction"

[[sections]]
type = "appendix_start"

[[sections]]
type = "section"
name = "apx1"
title = "Tooling"
"#,
    );
    project.write(
        "sections/intro.md",
        "# Overview\n\nPrepared for {{config.client}}.[^a]\n\n# Findings\n\nNone.\n\n[^a]: Engagement letter.\n",
    );
    project.write("sections/apx1.md", "# Tools\n\nList.\n");

    let doc = project.builder().assemble().expect("assemble");

    let rows: Vec<(&str, Option<&str>)> = doc
        .toc
        .iter()
        .map(|r| (r.anchor.as_str(), r.appendix.as_deref()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("intro-overview1", None),
            ("intro-findings2", None),
            ("apx1-tools3", Some("A")),
        ]
    );
    assert_eq!(doc.heading_count, 3);
    assert_eq!(doc.footnote_count, 1);

    // The TOC placeholder is spliced at its original position.
    assert!(
        doc.body
            .starts_with("[intro-overview1|Introduction||false]\n[intro-findings2|Introduction||false]\n[apx1-tools3|Tooling|A|false]\n"),
        "{}",
        doc.body
    );
    assert!(doc.body.contains("<h1 id=\"apx1-tools3\">Tools</h1>"), "{}", doc.body);
    assert!(doc.body.contains("Prepared for ACME."), "{}", doc.body);
}

#[test]
fn test_identical_local_ids_stay_unique() {
    let project = Project::new(
        r#"
[[sections]]
type = "section"
name = "a"

[[sections]]
type = "section"
name = "b"
"#,
    );
    let body = "# Summary\n\n<div id=\"box\">Boxed</div>\n\nText.[^1]\n\n[^1]: Note.\n";
    project.write("sections/a.md", body);
    project.write("sections/b.md", body);

    let builder = project.builder();
    let doc = builder.assemble().expect("assemble");
    let html = builder.render_base(&doc).expect("base");

    let ids = all_ids(&html);
    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(ids.len(), unique.len(), "duplicate ids in {ids:?}");
    for id in ["a-box", "b-box", "a-fn1", "b-fn1", "a-summary1", "b-summary2"] {
        assert!(ids.contains(&id.to_string()), "{id} missing from {ids:?}");
    }
    assert!(ids.contains(&"a".to_string()));
}

#[test]
fn test_footnotes_numbered_across_sections() {
    let counts = [2usize, 0, 3, 1];
    let mut sections = String::new();
    let mut files = Vec::new();
    for (i, count) in counts.iter().enumerate() {
        let name = format!("s{i}");
        sections.push_str(&format!("[[sections]]\ntype = \"section\"\nname = \"{name}\"\n\n"));
        let mut body = String::from("Body");
        let mut defs = String::new();
        for j in 1..=*count {
            body.push_str(&format!(" ref[^n{j}]"));
            defs.push_str(&format!("[^n{j}]: Note {j} of {name}.\n\n"));
        }
        files.push((name, format!("{body}\n\n{defs}")));
    }
    let project = Project::new(&sections);
    for (name, body) in &files {
        project.write(&format!("sections/{name}.md"), body);
    }

    let doc = project.builder().assemble().expect("assemble");
    assert_eq!(doc.footnote_count, 6);

    let body = Fragment::parse(&doc.body);
    let markers: Vec<(String, String)> = body
        .find_all(|n| html::has_class(n, "footnote-ref"))
        .iter()
        .map(|a| {
            (
                html::attr(a, "href").unwrap_or_default(),
                html::text_content(a),
            )
        })
        .collect();
    assert_eq!(
        markers,
        vec![
            ("#s0-fn1".to_string(), "1".to_string()),
            ("#s0-fn2".to_string(), "2".to_string()),
            ("#s2-fn1".to_string(), "3".to_string()),
            ("#s2-fn2".to_string(), "4".to_string()),
            ("#s2-fn3".to_string(), "5".to_string()),
            ("#s3-fn1".to_string(), "6".to_string()),
        ]
    );

    // No footnote list is left inline.
    assert!(body.find(|n| html::has_class(n, "footnotes")).is_none());

    let notes = Fragment::parse(&doc.footnotes);
    let starts: Vec<String> = notes
        .find_all(|n| html::has_tag(n, "ol"))
        .iter()
        .filter_map(|ol| html::attr(ol, "start"))
        .collect();
    assert_eq!(starts, vec!["1", "3", "6"]);
    let backlinks: Vec<String> = notes
        .find_all(|n| html::has_class(n, "footnote-back"))
        .iter()
        .filter_map(|a| html::attr(a, "href"))
        .collect();
    assert_eq!(backlinks[0], "#s0-fnref1");
    assert_eq!(backlinks[5], "#s3-fnref1");
}

#[test]
fn test_continuation_joins_markdown() {
    let project = Project::new(
        r#"
[[sections]]
type = "section"
name = "main"
title = "Main"

[[sections]]
type = "section"
name = "more"
cont = true
"#,
    );
    project.write("sections/main.md", "# Main\n\nFirst part.");
    project.write("sections/more.md", "# Extra\n\nSecond part.\n");

    let doc = project.builder().assemble().expect("assemble");
    assert_eq!(doc.body.matches("<article").count(), 1, "{}", doc.body);
    assert!(doc.body.contains("<h1 id=\"main-extra2\">Extra</h1>"), "{}", doc.body);
    assert_eq!(doc.toc.len(), 2);
    assert!(doc.toc.iter().all(|r| r.title == "Main"));
}

#[test]
fn test_template_kinds() {
    let project = Project::new(
        r#"
[[sections]]
type = "cover"
title = "Cover Page"

[[sections]]
type = "toc"

[[sections]]
type = "appendix_start"

[[sections]]
type = "scope"
title = "Scope of Work"

[[sections]]
type = "notes"
format = "md"
title = "Notes"
"#,
    );
    project.write("templates/cover.html", "<div class=\"cover\">{{title}} for {{client}}</div>");
    project.write("templates/scope.html", "<div id=\"scope\">{{title}}</div>");
    project.write("templates/notes.md", "# Remarks\n\nFor {{client}}.\n");

    let doc = project.builder().assemble().expect("assemble");
    assert!(doc.body.starts_with("<div class=\"cover\">Cover Page for ACME</div>\n"), "{}", doc.body);
    assert!(doc.body.contains("<h1 id=\"notes-remarks1\">Remarks</h1>"), "{}", doc.body);
    assert!(doc.body.contains("<p>For ACME.</p>"), "{}", doc.body);

    let rows: Vec<(&str, &str, Option<&str>)> = doc
        .toc
        .iter()
        .map(|r| (r.anchor.as_str(), r.title.as_str(), r.appendix.as_deref()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("scope", "Scope of Work", Some("A")),
            ("notes-remarks1", "Notes", Some("B")),
            ("notes", "Notes", Some("C")),
        ]
    );
}

#[test]
fn test_toc_level_and_subsections() {
    let project = Project::new(
        r#"
[[sections]]
type = "section"
name = "body"
title = "Body"
toc_header_level = 2
"#,
    );
    project.write("sections/body.md", "# One\n\n## Two\n\n### Three\n");
    let doc = project.builder().assemble().expect("assemble");
    let rows: Vec<(&str, bool)> = doc
        .toc
        .iter()
        .map(|r| (r.anchor.as_str(), r.subsection))
        .collect();
    assert_eq!(rows, vec![("body-one1", false), ("body-two2", true)]);
}

#[test]
fn test_untitled_sections_use_their_name() {
    let project = Project::new(
        r#"
[[sections]]
type = "section"
name = "tools"

[[sections]]
type = "section"
name = "grid"
columns = 2

[[sections]]
type = "section"
name = "matrix"
title = "Matrix"
columns = 2
"#,
    );
    project.write("sections/tools.md", "# Tools\n");
    project.write("sections/grid.md", "# Grid\n");
    project.write("sections/matrix.md", "# Layout\n");

    let doc = project.builder().assemble().expect("assemble");
    let rows: Vec<(&str, &str)> = doc
        .toc
        .iter()
        .map(|r| (r.anchor.as_str(), r.title.as_str()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("tools-tools1", "tools"),
            ("grid-grid2", "grid"),
            ("matrix-columns-title", "Matrix"),
            ("matrix-layout3", "Matrix"),
        ]
    );
}

#[test]
fn test_option_precedence() {
    let project = Project::new(
        r#"
shade = "document"
tone = "document"
mood = "document"

[[sections]]
type = "section"
name = "s"
conf = "sections/s.toml"
shade = "entry"
tone = "entry"
"#,
    );
    project.write("sections/s.toml", "tone = \"conf\"\n");
    project.write(
        "sections/s.md",
        "---\nmood: front\n---\n\n{{shade}} {{tone}} {{config.tone}}\n",
    );
    project.write(
        "templates/section.html",
        "<article id=\"{{section_name}}\" data-mood=\"{{mood}}\">{{{html}}}</article>",
    );

    let doc = project.builder().assemble().expect("assemble");
    assert!(doc.body.contains("<p>entry conf document</p>"), "{}", doc.body);
    assert!(doc.body.contains("data-mood=\"front\""), "{}", doc.body);
}

#[test]
fn test_path_escape_is_fatal() {
    let project = Project::new(
        r#"
[[sections]]
type = "section"
name = "../../../etc/passwd"
"#,
    );
    let err = project.builder().assemble().unwrap_err();
    assert!(matches!(err, Error::PathEscape { .. }), "{err}");

    let project = Project::new(
        r#"
[[sections]]
type = "section"
name = "ok"
conf = "../outside.toml"
"#,
    );
    project.write("sections/ok.md", "text\n");
    let err = project.builder().assemble().unwrap_err();
    assert!(matches!(err, Error::PathEscape { .. }), "{err}");
}

#[test]
fn test_sandbox_applies_to_sections() {
    let project = Project::new(
        r#"
[[sections]]
type = "section"
name = "s"
"#,
    );
    project.write("sections/s.md", "{{config.__class__}} {{a.__init__}} {{title}}\n");
    let doc = project.builder().assemble().expect("assemble");
    assert!(
        doc.body.contains("<p>[sandboxed] [sandboxed] Assessment</p>"),
        "{}",
        doc.body
    );
}

#[test]
fn test_missing_name_is_invalid_section() {
    let project = Project::new("[[sections]]\ntype = \"section\"\n");
    let err = project.builder().assemble().unwrap_err();
    assert!(matches!(err, Error::InvalidSection { index: 0, .. }), "{err}");
}

#[test]
fn test_render_base_wraps_body_and_notes() {
    let project = Project::new(
        r#"
[[sections]]
type = "section"
name = "s"
"#,
    );
    project.write("sections/s.md", "Hello.[^x]\n\n[^x]: There.\n");
    let html = project.builder().render_html().expect("render");
    assert!(html.starts_with("<html><head><title>Assessment</title></head><body><article id=\"s\">"), "{html}");
    assert!(html.contains("<div class=\"notes\"><div class=\"footnotes"), "{html}");
    assert!(html.contains("There."), "{html}");
}

#[test]
fn test_local_image_placeholder() {
    let project = Project::new(
        r#"
[[sections]]
type = "section"
name = "s"
"#,
    );
    std::fs::create_dir_all(project.dir.path().join("img")).expect("mkdir");
    image::RgbImage::new(200, 100)
        .save(project.dir.path().join("img/chart.png"))
        .expect("png");
    project.write("sections/s.md", "![chart](./img/chart.png?scale=50)\n");

    let doc = project.builder().assemble().expect("assemble");
    assert!(doc.body.contains("width:50%"), "{}", doc.body);
    assert!(doc.body.contains("img/chart.png"), "{}", doc.body);
}
