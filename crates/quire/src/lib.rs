// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Document assembly and cross-referencing.
//!
//! A document is an ordered list of sections declared in a TOML config.
//! Each section's markdown is templated in a sandbox, converted to HTML on
//! its own, and then stitched into one document:
//!
//! - element ids are prefixed with the section name so they stay unique,
//! - footnotes are renumbered into one document-wide sequence,
//! - headings feed a table of contents with lettered appendices.
//!
//! Every file a build reads, and every resource the PDF renderer loads,
//! must live under the project directory.

pub mod assemble;
pub mod config;
pub mod convert;
pub mod error;
pub mod fetch;
pub mod footnotes;
pub mod highlight;
pub mod html;
pub mod images;
pub mod namespace;
pub mod path_guard;
pub mod pdf;
pub mod project;
pub mod sandbox;
pub mod section;
pub mod template;
pub mod toc;
pub mod tool;
pub mod value;

pub use assemble::{AssembledDocument, Builder};
pub use config::{ConverterKind, DocumentConfig, SectionKind, SectionSpec};
pub use convert::{Cmark, MarkdownConverter, Pandoc};
pub use error::{Error, Result};
pub use highlight::{ExternalHighlight, Highlighter};
pub use path_guard::ProjectRoot;
pub use pdf::{PdfRenderer, WeasyPrint};
pub use sandbox::Sandbox;
pub use value::{Map, Value};
