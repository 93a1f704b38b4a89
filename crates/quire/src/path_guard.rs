// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Confines every file a build touches to the project directory.
//!
//! Section sources, `conf` overlays, templates and local images all go
//! through [`ProjectRoot::resolve`]. The check is lexical first, so
//! `../../etc/passwd` is rejected before anything is opened; targets that
//! already exist are then canonicalized so a symlink cannot point back out.

use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// The directory a build is confined to.
#[derive(Debug, Clone)]
pub struct ProjectRoot {
    root: PathBuf,
}

impl ProjectRoot {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let root = root.canonicalize().map_err(|e| Error::io(root, e))?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` (relative to the root, or absolute) to an absolute
    /// path strictly below the root.
    pub fn resolve<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        let requested = path.as_ref();
        let joined = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            self.root.join(requested)
        };
        let target = normalize(&joined);

        if target == self.root || !target.starts_with(&self.root) {
            return Err(Error::path_escape(requested));
        }

        if let Ok(real) = target.canonicalize()
            && !real.starts_with(&self.root)
        {
            return Err(Error::path_escape(requested));
        }

        Ok(target)
    }

    /// Read a project file as UTF-8 after confining it.
    pub fn read_to_string<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        let target = self.resolve(path)?;
        std::fs::read_to_string(&target).map_err(|e| Error::io(&target, e))
    }

    /// Express a confined absolute path relative to the root.
    pub fn relative<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        path.strip_prefix(&self.root).ok()
    }
}

/// Lexically remove `.` and `..` components.
///
/// `..` never climbs above a root component, so an escaping relative path
/// normalizes to something outside the project rather than erroring here.
pub fn normalize<P: AsRef<Path>>(path: P) -> PathBuf {
    let mut components: Vec<Component> = Vec::new();

    for component in path.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    _ = components.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            _ => components.push(component),
        }
    }

    components.into_iter().collect()
}
