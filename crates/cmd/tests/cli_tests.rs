// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use cmd::commands::build::build_with_renderer;
use cmd::common::ConverterChoice;
use cmd::{BuildOptions, create_command};
use quire::{PdfRenderer, ProjectRoot};

/// Records what it was asked to render instead of producing a PDF.
#[derive(Default)]
struct RecordingRenderer {
    calls: RefCell<Vec<(String, PathBuf)>>,
}

impl PdfRenderer for RecordingRenderer {
    fn render(&self, html: &str, root: &ProjectRoot, output: &Path) -> quire::Result<()> {
        _ = quire::fetch::check_resources(root, html)?;
        self.calls
            .borrow_mut()
            .push((html.to_string(), output.to_path_buf()));
        Ok(())
    }
}

fn new_project(parent: &Path) -> PathBuf {
    create_command(&parent.join("acme"), None).expect("create")
}

fn cmark_options(config: PathBuf) -> BuildOptions {
    BuildOptions {
        emit_html: Some(config.with_extension("html")),
        configs: vec![config],
        converter: Some(ConverterChoice::Cmark),
        pdf: true,
        debug_markdown: false,
    }
}

#[test]
fn test_create_then_build_default_project() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let config = new_project(tmp.path());
    assert_eq!(config.file_name().and_then(|n| n.to_str()), Some("acme.toml"));

    let renderer = RecordingRenderer::default();
    let output = build_with_renderer(&cmark_options(config.clone()), &renderer)?;

    let html_path = output.html.expect("html written");
    assert_eq!(html_path, config.with_extension("html"));
    assert_eq!(output.pdf, Some(config.with_extension("pdf")));

    let html = std::fs::read_to_string(&html_path)?;
    assert!(html.contains("Appendix A: Tools"), "{html}");
    assert!(html.contains("This report was prepared for Client."), "{html}");
    assert!(html.contains("id=\"intro-overview1\""), "{html}");
    assert!(html.contains("class=\"endnotes\""), "{html}");

    let calls = renderer.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, html);
    Ok(())
}

#[test]
fn test_later_config_overrides_earlier() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let config = new_project(tmp.path());
    let local = tmp.path().join("acme/local.toml");
    std::fs::write(&local, "client = \"Globex\"\n")?;

    let mut options = cmark_options(config);
    options.configs.push(local);
    options.pdf = false;
    let output = build_with_renderer(&options, &RecordingRenderer::default())?;
    assert_eq!(output.pdf, None);

    let html = std::fs::read_to_string(output.html.expect("html"))?;
    assert!(html.contains("prepared for Globex."), "{html}");
    Ok(())
}

#[test]
fn test_remote_stylesheet_fails_build() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let config = new_project(tmp.path());
    let base = tmp.path().join("acme/templates/base.html");
    std::fs::write(
        &base,
        "<html><head><link rel=\"stylesheet\" href=\"https://cdn.example.com/x.css\"></head><body>{{{body}}}</body></html>",
    )?;

    let renderer = RecordingRenderer::default();
    let err = build_with_renderer(&cmark_options(config), &renderer).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("Failed to render PDF"), "{message}");
    assert!(message.contains("cdn.example.com"), "{message}");
    assert!(renderer.calls.borrow().is_empty());
    Ok(())
}

#[test]
fn test_create_refuses_existing_directory() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let err = create_command(tmp.path(), None).unwrap_err();
    assert!(format!("{err:#}").contains("already exists"));
    Ok(())
}

#[test]
fn test_create_from_missing_template() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let missing = tmp.path().join("nope");
    assert!(create_command(&tmp.path().join("p"), Some(&missing)).is_err());
    assert!(!tmp.path().join("p").exists());
    Ok(())
}

#[test]
fn test_missing_config_is_an_error() {
    let options = BuildOptions {
        configs: vec![PathBuf::from("/nonexistent/quire/report.toml")],
        ..BuildOptions::default()
    };
    let err = build_with_renderer(&options, &RecordingRenderer::default()).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to load config"));
}
