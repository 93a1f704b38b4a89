// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Code block highlighting through the external `highlight` tool.

use crate::config::DocumentConfig;
use crate::error::{Error, Result};
use crate::tool;

pub trait Highlighter {
    /// Highlighted HTML for `code` in language `lang`.
    fn highlight(&self, code: &str, lang: &str) -> Result<String>;
}

/// `highlight -s THEME -O html --inline-css -S LANG --font FONT -f --enclose-pre`
#[derive(Debug, Clone)]
pub struct ExternalHighlight {
    program: String,
    theme: String,
    plaintext_theme: String,
    font: String,
}

impl ExternalHighlight {
    pub fn from_config(config: &DocumentConfig) -> Self {
        let get = |key: &str| config.get_str(key).unwrap_or_default().to_string();
        let font = [
            get("highlight_font"),
            get("highlight_padding"),
            get("highlight_style"),
        ]
        .iter()
        .map(|part| part.trim().trim_end_matches(';'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("; ");

        Self {
            program: "highlight".to_string(),
            theme: get("highlight"),
            plaintext_theme: get("highlight_plaintext"),
            font,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn arguments<'a>(&'a self, lang: &'a str) -> Vec<&'a str> {
        let plain = matches!(lang, "txt" | "console");
        let syntax = match lang {
            "console" => "bash",
            other => other,
        };
        vec![
            "-s",
            if plain {
                self.plaintext_theme.as_str()
            } else {
                self.theme.as_str()
            },
            "-O",
            "html",
            "--inline-css",
            "-S",
            syntax,
            "--font",
            self.font.as_str(),
            "-f",
            "--enclose-pre",
        ]
    }
}

impl Highlighter for ExternalHighlight {
    fn highlight(&self, code: &str, lang: &str) -> Result<String> {
        let out = tool::run_checked(&self.program, &self.arguments(lang), code.as_bytes())?;
        String::from_utf8(out).map_err(|e| Error::ExternalTool {
            tool: self.program.clone(),
            status: "invalid UTF-8 output".to_string(),
            stderr: e.to_string(),
        })
    }
}

/// Remove a leading `$$ ` from each line of a highlighted console block,
/// between the opening tag and `</pre>`.
pub fn strip_console_prompts(html: &str) -> String {
    let start = html.find('>').map_or(0, |i| i + 1);
    let end = html.find("</pre>").unwrap_or(html.len());
    if end < start {
        return html.to_string();
    }

    let body = html[start..end]
        .split('\n')
        .map(|line| line.strip_prefix("$$ ").unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}{}{}", &html[..start], body, &html[end..])
}
