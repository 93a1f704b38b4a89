// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

// Error types for document builds
use std::path::{Path, PathBuf};

use crate::template::TemplateError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid path {path:?} references outside of project directory")]
    PathEscape { path: PathBuf },

    #[error("{tool} exited with {status}: {stderr}")]
    ExternalTool {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path:?}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("failed to serialize HTML: {0}")]
    Html(#[source] std::io::Error),

    #[error("converter produced malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bad front matter in section {section}: {source}")]
    Metadata {
        section: String,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("cannot read image {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid url {url:?}: only local project files may be fetched")]
    RemoteUrl { url: String },

    #[error("section #{index}: {message}")]
    InvalidSection { index: usize, message: String },

    #[error("invalid value for `{key}`: {message}")]
    InvalidSetting { key: String, message: String },

    #[error("path {path:?} already exists")]
    AlreadyExists { path: PathBuf },
}

impl Error {
    pub fn path_escape<P: AsRef<Path>>(path: P) -> Self {
        Error::PathEscape {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn io<P: AsRef<Path>>(path: P, source: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn spawn<S: Into<String>>(tool: S, source: std::io::Error) -> Self {
        Error::Spawn {
            tool: tool.into(),
            source,
        }
    }

    /// Build an `ExternalTool` error from a finished process.
    pub fn external_tool<S: Into<String>>(tool: S, output: &std::process::Output) -> Self {
        Error::ExternalTool {
            tool: tool.into(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    pub fn invalid_section<S: Into<String>>(index: usize, message: S) -> Self {
        Error::InvalidSection {
            index,
            message: message.into(),
        }
    }
}
