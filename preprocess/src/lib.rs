//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the shadertools-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// spp - streaming C-style preprocessor for shader sources
//

use std::io::Write;
use std::path::PathBuf;

use error::{PreprocessError, Result};

pub mod error;

mod defines;
mod expand;
mod expr;
mod lexer;
mod output;
mod preprocessor;
mod state;
mod strings;
mod token;

pub use output::{preprocess, PreprocessData, SourceError};
pub use preprocessor::{
    FileIncluder, IncludeHandler, IncludeKind, PpToken, Preprocessor, PreprocessorDefine,
};
pub use token::Token;

/// `name[=val]`, as handed to `-D`.
#[derive(Debug, Clone)]
pub struct ArgumentDefine {
    pub name: String,
    pub value: String,
}

fn parse_argument_define(value: &str) -> std::result::Result<ArgumentDefine, String> {
    let mut split = value.splitn(2, '=');
    let name = split.next().unwrap_or_default();
    if name.is_empty() {
        return Err("macro name is empty".to_string());
    }
    Ok(ArgumentDefine {
        name: name.to_string(),
        value: split.next().unwrap_or_default().to_string(),
    })
}

#[derive(Debug, clap::Parser, Clone)]
#[command(version, about)]
pub struct Args {
    /// `name[=val]`
    ///
    /// Define `name` to `val` (or to nothing if `=val` is omitted)
    /// before the source is read, as if by #define.
    #[arg(short = 'D', long = "define", value_parser = parse_argument_define)]
    pub define: Vec<ArgumentDefine>,

    /// Treat `;` to end-of-line as a comment, as in assembly sources.
    #[arg(short = 'a', long)]
    pub asm_comments: bool,

    /// Input files; standard input when omitted.
    pub files: Vec<PathBuf>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            define: Vec::default(),
            asm_comments: false,
            files: Vec::default(),
        }
    }
}

fn run_one<STDOUT: Write, STDERR: Write>(
    stdout: &mut STDOUT,
    stderr: &mut STDERR,
    filename: &str,
    source: &str,
    defines: &[PreprocessorDefine],
    asm_comments: bool,
) -> Result<usize> {
    let data = preprocess(
        filename,
        source,
        defines,
        asm_comments,
        Some(Box::new(FileIncluder)),
    );
    for err in &data.errors {
        writeln!(
            stderr,
            "{}:{}: {}",
            err.filename.as_deref().unwrap_or("<unknown>"),
            err.line,
            err.error
        )?;
    }
    stdout.write_all(data.output.as_bytes())?;
    Ok(data.errors.len())
}

pub fn run<STDOUT: Write, STDERR: Write>(
    mut stdout: STDOUT,
    mut stderr: STDERR,
    args: Args,
) -> Result<()> {
    let defines: Vec<PreprocessorDefine> = args
        .define
        .iter()
        .map(|d| PreprocessorDefine {
            identifier: d.name.clone(),
            definition: d.value.clone(),
        })
        .collect();

    let mut error_count = 0;
    if args.files.is_empty() {
        let source = std::io::read_to_string(std::io::stdin())?;
        error_count += run_one(
            &mut stdout,
            &mut stderr,
            "<stdin>",
            &source,
            &defines,
            args.asm_comments,
        )?;
    } else {
        for path in &args.files {
            let source = std::fs::read_to_string(path)?;
            error_count += run_one(
                &mut stdout,
                &mut stderr,
                &path.to_string_lossy(),
                &source,
                &defines,
                args.asm_comments,
            )?;
        }
    }

    if error_count > 0 {
        return Err(PreprocessError::Semantic(format!(
            "{} preprocessing error(s)",
            error_count
        )));
    }
    Ok(())
}
