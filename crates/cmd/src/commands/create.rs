// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Create a project directory, from the bundled defaults or from
/// `template`. Returns the new project's config file.
pub fn create_command(project: &Path, template: Option<&Path>) -> Result<PathBuf> {
    if let Some(template) = template
        && !template.is_dir()
    {
        anyhow::bail!("Template {} is not a directory", template.display());
    }
    quire::project::create(project, template)
        .with_context(|| format!("Failed to create project {}", project.display()))
}
