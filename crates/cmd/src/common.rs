// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use clap::ValueEnum;
use quire::ConverterKind;

/// Markdown backend selectable on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConverterChoice {
    /// External pandoc, via its JSON AST
    Pandoc,
    /// Built-in CommonMark parser
    Cmark,
}

impl From<ConverterChoice> for ConverterKind {
    fn from(choice: ConverterChoice) -> Self {
        match choice {
            ConverterChoice::Pandoc => ConverterKind::Pandoc,
            ConverterChoice::Cmark => ConverterKind::Cmark,
        }
    }
}

/// Start logging. `--debug` wins over `QUIRE_LOG`.
pub fn init_logging(debug: bool) {
    if debug {
        diagnostics::init_with_level("debug");
    } else {
        diagnostics::init_diagnostics();
    }
}
