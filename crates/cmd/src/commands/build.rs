// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use diagnostics::*;
use quire::convert::converter_for;
use quire::{Builder, DocumentConfig, PdfRenderer, WeasyPrint};

use crate::common::ConverterChoice;

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Config files, merged in order. The first one names the project.
    pub configs: Vec<PathBuf>,
    /// Also write the final HTML here.
    pub emit_html: Option<PathBuf>,
    /// Replaces the config's `converter` setting.
    pub converter: Option<ConverterChoice>,
    /// Render `<stem>.pdf`.
    pub pdf: bool,
    pub debug_markdown: bool,
}

/// Files a build wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutput {
    pub html: Option<PathBuf>,
    pub pdf: Option<PathBuf>,
}

pub fn build_command(options: &BuildOptions) -> Result<BuildOutput> {
    build_with_renderer(options, &WeasyPrint::default())
}

/// Build with an explicit PDF renderer.
pub fn build_with_renderer(
    options: &BuildOptions,
    renderer: &dyn PdfRenderer,
) -> Result<BuildOutput> {
    let started = Instant::now();
    let config = DocumentConfig::load(&options.configs).context("Failed to load config")?;
    let pdf_path = config.pdf_path();

    let mut builder = Builder::new(config)
        .context("Failed to set up build")?
        .with_debug_markdown(options.debug_markdown);
    if let Some(choice) = options.converter {
        builder = builder.with_converter(converter_for(choice.into()));
    }

    let html = builder.render_html().context("Failed to assemble document")?;
    let mut output = BuildOutput::default();

    if let Some(html_path) = &options.emit_html {
        std::fs::write(html_path, &html)
            .with_context(|| format!("Failed to write {}", html_path.display()))?;
        let path = html_path.display().to_string();
        info!("Wrote {path}", path: path.as_str());
        output.html = Some(html_path.clone());
    }

    if options.pdf {
        renderer
            .render(&html, builder.root(), &pdf_path)
            .context("Failed to render PDF")?;
        output.pdf = Some(pdf_path);
    }

    let elapsed_ms = started.elapsed().as_millis() as u64;
    info!("Build finished in {elapsed_ms}ms", elapsed_ms);
    Ok(output)
}
