// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! PDF rendering of the final HTML.

use std::path::Path;

use diagnostics::*;

use crate::error::Result;
use crate::fetch;
use crate::path_guard::ProjectRoot;
use crate::tool;

pub trait PdfRenderer {
    /// Render `html` to `output`. Relative resources resolve against `root`.
    fn render(&self, html: &str, root: &ProjectRoot, output: &Path) -> Result<()>;
}

/// Runs `weasyprint --base-url ROOT - OUTPUT` with the document on stdin.
///
/// Resources are checked before the renderer starts, so a document that
/// references anything outside the project never reaches it.
#[derive(Debug, Clone)]
pub struct WeasyPrint {
    program: String,
}

impl Default for WeasyPrint {
    fn default() -> Self {
        Self {
            program: "weasyprint".to_string(),
        }
    }
}

impl WeasyPrint {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl PdfRenderer for WeasyPrint {
    fn render(&self, html: &str, root: &ProjectRoot, output: &Path) -> Result<()> {
        let resources = fetch::check_resources(root, html)?;
        let base = root.path().to_string_lossy();
        let target = output.to_string_lossy();
        _ = tool::run_checked(
            &self.program,
            &["--base-url", &base, "-", &target],
            html.as_bytes(),
        )?;

        let count = resources.len();
        info!("Wrote {target} ({count} local resources)", target: &*target, count);
        Ok(())
    }
}
