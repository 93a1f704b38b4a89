// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

// Synchronous external tool invocation with piped stdin/stdout/stderr.
use std::io::Write;
use std::process::{Command, Output, Stdio};

use diagnostics::*;

use crate::error::{Error, Result};

/// Run `program args...` feeding `input` on stdin, and wait for it.
pub fn run(program: &str, args: &[&str], input: &[u8]) -> Result<Output> {
    let joined = args.join(" ");
    debug!("Running {program} {joined}", program, joined: joined.as_str());

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::spawn(program, e))?;

    // Write on a separate thread so a large output cannot fill the pipe
    // while we are still writing.
    let writer = child.stdin.take().map(|mut stdin| {
        let input = input.to_vec();
        std::thread::spawn(move || stdin.write_all(&input))
    });

    let output = child
        .wait_with_output()
        .map_err(|e| Error::spawn(program, e))?;

    if let Some(writer) = writer
        && let Ok(Err(e)) = writer.join()
        && output.status.success()
    {
        return Err(Error::spawn(program, e));
    }

    Ok(output)
}

/// Like [`run`], but a non-zero exit is an [`Error::ExternalTool`].
pub fn run_checked(program: &str, args: &[&str], input: &[u8]) -> Result<Vec<u8>> {
    let output = run(program, args, input)?;
    if !output.status.success() {
        return Err(Error::external_tool(program, &output));
    }
    Ok(output.stdout)
}
