//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the shadertools-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Top-level preprocess API: pump the whole translation unit into a flat
// text buffer, re-flowing newlines and indentation for readability.
//

use crate::preprocessor::{IncludeHandler, PpToken, Preprocessor, PreprocessorDefine};
use crate::token::Token;

#[cfg(windows)]
const ENDLINE: &str = "\r\n";
#[cfg(not(windows))]
const ENDLINE: &str = "\n";

/// One collected error: where, and what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    pub filename: Option<String>,
    pub line: u32,
    pub error: String,
}

/// Result of a full preprocess run.
#[derive(Debug)]
pub struct PreprocessData {
    pub output: String,
    pub errors: Vec<SourceError>,
}

fn indent_buffer(buffer: &mut String, n: usize, newline: bool) {
    if newline {
        for _ in 0..n {
            buffer.push_str("    ");
        }
    } else {
        buffer.push(' ');
    }
}

/// Run the pump to completion over `source`, producing flat text plus
/// the accumulated error list.
///
/// The preprocessor itself swallows newlines, so structure is re-imposed
/// here: a newline after each `;`, and `{`/`}` get their own lines with
/// block indentation, which keeps the token stream mostly readable.
pub fn preprocess(
    filename: &str,
    source: &str,
    defines: &[PreprocessorDefine],
    asm_comments: bool,
    includer: Option<Box<dyn IncludeHandler>>,
) -> PreprocessData {
    let mut pp = Preprocessor::new(filename, source, defines, asm_comments, includer);

    let mut buffer = String::new();
    let mut errors = Vec::new();
    let mut nl = true;
    let mut indent = 0usize;

    loop {
        let PpToken { token, text } = pp.next_token();
        let mut isnewline = false;

        match token {
            Token::Eoi => break,
            Token::Char(b'}') | Token::Char(b';') => {
                if token == Token::Char(b'}') && indent > 0 {
                    indent -= 1;
                }
                indent_buffer(&mut buffer, indent, nl);
                buffer.push_str(&text);
                buffer.push_str(ENDLINE);
                isnewline = true;
            }
            Token::Char(b'\n') => {
                // only #pragma lines let a newline through
                buffer.push_str(ENDLINE);
                isnewline = true;
            }
            Token::Char(b'{') => {
                buffer.push_str(ENDLINE);
                indent_buffer(&mut buffer, indent, true);
                buffer.push('{');
                buffer.push_str(ENDLINE);
                indent += 1;
                isnewline = true;
            }
            Token::PreprocessingError => {
                let (fname, line) = pp.source_position();
                errors.push(SourceError {
                    filename: fname.map(|f| f.to_string()),
                    line,
                    error: text,
                });
            }
            _ => {
                indent_buffer(&mut buffer, indent, nl);
                buffer.push_str(&text);
            }
        }

        nl = isnewline;
    }

    PreprocessData {
        output: buffer,
        errors,
    }
}
