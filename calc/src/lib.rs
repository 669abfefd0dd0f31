//
// Copyright (c) 2025 Hemi Labs, Inc.
//
// This file is part of the shadertools-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// scalc - line-at-a-time expression calculator. Each input line runs
// through the shader preprocessor, the generated expression parser and
// the numeric evaluator.
//

use std::io::{BufRead, Write};

use shadertools_preprocess::{Preprocessor, PreprocessorDefine, Token};

mod calc_util;

pub use calc_util::ast::{Expr, Operator};
pub use calc_util::interpreter::run_expr;
pub use calc_util::parser::{parse_expression, ParseError};

#[derive(thiserror::Error, Debug)]
pub enum CalcError {
    #[error("{0}")]
    Preprocess(String),
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("Error processing io: {0}")]
    Io(#[from] std::io::Error),
}

/// `name[=val]`, as handed to `-D`.
#[derive(Debug, Clone)]
pub struct ArgumentDefine {
    pub name: String,
    pub value: String,
}

fn parse_argument_define(value: &str) -> Result<ArgumentDefine, String> {
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
    /// before each line is evaluated, as if by #define.
    #[arg(short = 'D', long = "define", value_parser = parse_argument_define)]
    pub define: Vec<ArgumentDefine>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            define: Vec::default(),
        }
    }
}

/// Run one source line through the full pipeline: preprocess, parse,
/// evaluate. Returns None when the line preprocesses to nothing.
pub fn evaluate_line(
    filename: &str,
    source: &str,
    defines: &[PreprocessorDefine],
) -> Result<Option<(Expr, f64)>, CalcError> {
    let mut pp = Preprocessor::new(filename, source, defines, false, None);

    // The concatenated lexemes of the post-expansion stream reparse
    // cleanly, so the generated parser takes them as flat text.
    let mut text = String::new();
    loop {
        let t = pp.next_token();
        match t.token {
            Token::Eoi => break,
            Token::PreprocessingError => return Err(CalcError::Preprocess(t.text)),
            Token::BadChars => {
                return Err(CalcError::Preprocess("bad chars from lexer".to_string()))
            }
            Token::Char(b'\n') => {} // pragma newlines carry nothing here
            _ => {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(&t.text);
            }
        }
    }
    if text.trim().is_empty() {
        return Ok(None);
    }

    let expr = parse_expression(&text)?;
    let value = run_expr(&expr);
    Ok(Some((expr, value)))
}

pub fn run<STDOUT: Write, STDERR: Write>(
    mut stdout: STDOUT,
    mut stderr: STDERR,
    args: Args,
) -> Result<(), CalcError> {
    let defines: Vec<PreprocessorDefine> = args
        .define
        .iter()
        .map(|d| PreprocessorDefine {
            identifier: d.name.clone(),
            definition: d.value.clone(),
        })
        .collect();

    let stdin = std::io::stdin();
    let mut handle = stdin.lock();
    let mut line = String::new();
    loop {
        line.clear();
        if handle.read_line(&mut line)? == 0 {
            break;
        }
        if matches!(line.trim_end_matches(&['\r', '\n'][..]), "q" | "quit") {
            break;
        }
        match evaluate_line("<stdin>", &line, &defines) {
            Ok(Some((expr, value))) => {
                log::debug!("parse complete!\n{}", expr.tree());
                writeln!(stdout, "{}", value)?;
            }
            Ok(None) => {}
            Err(error) => writeln!(stderr, "{}", error)?,
        }
    }
    Ok(())
}
