// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! New project scaffolding.
//!
//! A project is a directory holding `{name}.toml`, `templates/` and
//! `sections/`. It is created either from the bundled defaults or by
//! copying an existing template project.

use std::fs;
use std::path::{Path, PathBuf};

use diagnostics::*;

use crate::error::{Error, Result};

/// Files written for a project created without a template directory.
pub const DEFAULT_FILES: &[(&str, &str)] = &[
    ("project.toml", include_str!("../static/project.toml")),
    ("style.css", include_str!("../static/style.css")),
    ("templates/base.html", include_str!("../static/templates/base.html")),
    ("templates/cover.html", include_str!("../static/templates/cover.html")),
    ("templates/section.html", include_str!("../static/templates/section.html")),
    ("templates/toc.html", include_str!("../static/templates/toc.html")),
    ("sections/intro.md", include_str!("../static/sections/intro.md")),
    ("sections/tools.md", include_str!("../static/sections/tools.md")),
];

const PROJECT_CONFIG: &str = "project.toml";

/// Create a project at `project` and return the path of its config file.
///
/// The target must not exist. With `template`, that directory is copied
/// (minus any top-level `.git`); its `project.toml` becomes `{name}.toml`.
pub fn create(project: &Path, template: Option<&Path>) -> Result<PathBuf> {
    if project.exists() {
        return Err(Error::AlreadyExists {
            path: project.to_path_buf(),
        });
    }
    let name = project
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::InvalidSetting {
            key: "project".to_string(),
            message: format!("{} has no directory name", project.display()),
        })?;

    match template {
        Some(template) => {
            copy_tree(template, project, true)?;
            let from = template.display().to_string();
            info!("Copied template {from}", from: from.as_str());
        }
        None => write_defaults(project)?,
    }

    let config = project.join(format!("{}.toml", name));
    let generic = project.join(PROJECT_CONFIG);
    if generic.is_file() {
        fs::rename(&generic, &config).map_err(|e| Error::io(&generic, e))?;
    } else {
        warn!("Template has no {file}, writing the default one", file: PROJECT_CONFIG);
        fs::write(&config, DEFAULT_FILES[0].1).map_err(|e| Error::io(&config, e))?;
    }

    let path = config.display().to_string();
    info!("Created project {name} at {path}", name, path: path.as_str());
    Ok(config)
}

fn write_defaults(project: &Path) -> Result<()> {
    for (relative, contents) in DEFAULT_FILES {
        let target = project.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        fs::write(&target, contents).map_err(|e| Error::io(&target, e))?;
    }
    Ok(())
}

fn copy_tree(from: &Path, to: &Path, top: bool) -> Result<()> {
    fs::create_dir_all(to).map_err(|e| Error::io(to, e))?;
    let entries = fs::read_dir(from).map_err(|e| Error::io(from, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(from, e))?;
        let source = entry.path();
        if top && entry.file_name() == ".git" {
            continue;
        }
        let target = to.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| Error::io(&source, e))?;
        if file_type.is_dir() {
            copy_tree(&source, &target, false)?;
        } else {
            _ = fs::copy(&source, &target).map_err(|e| Error::io(&source, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DocumentConfig;

    #[test]
    fn test_create_from_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let project = dir.path().join("nested/acme-report");
        let config = create(&project, None).expect("create");

        assert_eq!(config, project.join("acme-report.toml"));
        assert!(!project.join(PROJECT_CONFIG).exists());
        for (relative, _) in &DEFAULT_FILES[1..] {
            assert!(project.join(relative).is_file(), "{relative}");
        }

        let parsed = DocumentConfig::load(&[&config]).expect("default config parses");
        assert_eq!(parsed.sections.len(), 6);
    }

    #[test]
    fn test_existing_target_refused() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = create(dir.path(), None).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
    }

    #[test]
    fn test_create_from_template_skips_git() {
        let dir = tempfile::tempdir().expect("tempdir");
        let template = dir.path().join("tpl");
        fs::create_dir_all(template.join(".git")).expect("mkdir");
        fs::create_dir_all(template.join("sections")).expect("mkdir");
        fs::write(template.join(".git/HEAD"), "ref").expect("write");
        fs::write(template.join("project.toml"), "title = \"T\"\n").expect("write");
        fs::write(template.join("sections/a.md"), "# A\n").expect("write");

        let project = dir.path().join("client");
        let config = create(&project, Some(&template)).expect("create");
        assert_eq!(fs::read_to_string(config).expect("read"), "title = \"T\"\n");
        assert!(project.join("sections/a.md").is_file());
        assert!(!project.join(".git").exists());
    }

    #[test]
    fn test_template_without_config_gets_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let template = dir.path().join("tpl");
        fs::create_dir_all(&template).expect("mkdir");
        let config = create(&dir.path().join("x"), Some(&template)).expect("create");
        assert_eq!(fs::read_to_string(config).expect("read"), DEFAULT_FILES[0].1);
    }
}
