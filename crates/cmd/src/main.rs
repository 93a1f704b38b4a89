// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use diagnostics::*;

use cmd::common::{ConverterChoice, init_logging};
use cmd::{BuildOptions, build_command, create_command};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "quire")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Log per-section details to stderr (overrides QUIRE_LOG) and expose
    /// each section's templated markdown to templates as `debug_markdown`
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a document from its config files
    Build {
        /// Config files; later files override top-level keys of earlier ones
        #[arg(required = true)]
        configs: Vec<PathBuf>,
        /// Also write the final HTML to this path
        #[arg(short = 'E', long, value_name = "PATH")]
        emit_html: Option<PathBuf>,
        /// Markdown backend, overriding the config's `converter`
        #[arg(long, value_enum)]
        converter: Option<ConverterChoice>,
        /// Stop after the HTML; do not run the PDF renderer
        #[arg(long)]
        no_pdf: bool,
    },
    /// Create a new project directory
    Create {
        /// Directory to create; its name becomes the config file's stem
        project: PathBuf,
        /// Existing project to copy instead of the bundled defaults
        #[arg(short, long)]
        template: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match cli.command {
        Commands::Build {
            configs,
            emit_html,
            converter,
            no_pdf,
        } => {
            let options = BuildOptions {
                configs,
                emit_html,
                converter,
                pdf: !no_pdf,
                debug_markdown: cli.debug,
            };
            _ = build_command(&options)?;
        }
        Commands::Create { project, template } => {
            let config = create_command(&project, template.as_deref())?;
            let config = config.display().to_string();
            info!("Project config at {config}", config: config.as_str());
        }
    }
    Ok(())
}
