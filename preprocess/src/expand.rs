//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the shadertools-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Macro expansion: argument collection, '#' stringification, '##'
// concatenation and replacement-frame assembly.
//

use std::rc::Rc;

use crate::defines::Define;
use crate::error::{PreprocessError, Result};
use crate::preprocessor::{Preprocessor, RECURSION_MAX};
use crate::token::Token;

/// Collected macro arguments reuse the `Define` record: `definition`
/// carries the pre-expanded text, `original` the raw lexemes for `#`.
fn find_macro_arg<'a>(args: &'a [Define], name: &str) -> Option<&'a Define> {
    args.iter().find(|a| &*a.identifier == name)
}

impl Preprocessor {
    /// An identifier was just lexed from the top frame. If it names a
    /// macro, push its replacement as a new source frame and return
    /// true; the pump (or expression reducer) then goes around again.
    pub(crate) fn handle_identifier(&mut self) -> Result<bool> {
        if self.recursion_count >= RECURSION_MAX {
            return Err(PreprocessError::Semantic("Recursing macros".into()));
        }
        self.recursion_count += 1;

        let (sym, fname, line) = {
            let st = self.top_ref();
            (st.token_text().to_string(), st.filename.clone(), st.line)
        };
        let Some(def) = self.find_define(&sym) else {
            return Ok(false); // just send the token through unchanged
        };
        if def.paramcount != 0 {
            return self.handle_macro_args(&sym, &def);
        }
        self.push_source(fname, Rc::clone(&def.definition), line);
        Ok(true)
    }

    /// Function-like invocation. Collects `(...)` arguments and pushes
    /// the assembled replacement; if no `(` follows, the identifier is
    /// not a call and goes through unchanged.
    fn handle_macro_args(&mut self, sym: &str, def: &Define) -> Result<bool> {
        let expected = if def.paramcount < 0 {
            0
        } else {
            def.paramcount as usize
        };

        let saved = self.top_ref().save();
        if self.top().lex() != Token::Char(b'(') {
            self.top().restore(saved); // gcc abandons replacement, too
            return Ok(false);
        }

        self.top().report_whitespace = true;
        let args = self.collect_macro_args(sym, def, expected);
        self.top().report_whitespace = false;
        let args = args?;

        self.replace_and_push_macro(def, &args)?;
        Ok(true)
    }

    fn collect_macro_args(
        &mut self,
        sym: &str,
        def: &Define,
        expected: usize,
    ) -> Result<Vec<Define>> {
        let mut args: Vec<Define> = Vec::new();
        let mut saw_params = 0usize;
        let mut void_call = false;
        let mut paren = 1i32;

        while paren > 0 {
            let mut buffer = String::new();
            let mut origbuffer = String::new();
            let mut t = self.top().lex();
            loop {
                match t {
                    Token::Char(b'(') => paren += 1,
                    Token::Char(b')') => {
                        paren -= 1;
                        if paren < 1 {
                            break; // end of macro call
                        }
                    }
                    Token::Char(b',') if paren == 1 => break, // next argument
                    Token::IncompleteComment | Token::Eoi => {
                        self.top().pushback();
                        return Err(PreprocessError::Semantic("Unterminated macro list".into()));
                    }
                    _ => {}
                }

                if t == Token::Char(b' ') {
                    // collapse runs, and drop leading whitespace so void
                    // calls read back empty
                    if !buffer.is_empty() {
                        buffer.push(' ');
                        origbuffer.push(' ');
                    }
                } else {
                    let text = self.top_ref().token_text().to_string();
                    if t == Token::Identifier {
                        // object-like macros pre-expand here; ones with
                        // arguments replace correctly later
                        match self.find_define(&text) {
                            Some(inner) if inner.paramcount == 0 => {
                                buffer.push_str(&inner.definition)
                            }
                            _ => buffer.push_str(&text),
                        }
                    } else {
                        buffer.push_str(&text);
                    }
                    origbuffer.push_str(&text);
                }
                t = self.top().lex();
            }

            if buffer.is_empty() {
                void_call = saw_params == 0 && paren == 0;
            }
            if saw_params < expected {
                args.push(Define {
                    identifier: Rc::clone(&def.parameters[saw_params]),
                    definition: Rc::from(buffer.trim_end_matches(' ')),
                    original: Some(Rc::from(origbuffer.trim_end_matches(' '))),
                    parameters: Vec::new(),
                    paramcount: 0,
                });
            }
            saw_params += 1;
        }

        // "a()" should match "#define a()"
        if expected == 0 && saw_params == 1 && void_call {
            saw_params = 0;
        }
        if saw_params != expected {
            return Err(PreprocessError::Semantic(format!(
                "macro '{}' passed {} arguments, but requires {}",
                sym, saw_params, expected
            )));
        }
        Ok(args)
    }

    /// Push the stored definition as a scratch frame and re-lex it into
    /// the final replacement text: single spaces between tokens, `##`
    /// joining neighbors, `#` quoting a parameter's original lexemes,
    /// parameters replaced by their collected text. The assembled buffer
    /// then becomes the live source frame.
    fn replace_and_push_macro(&mut self, def: &Define, args: &[Define]) -> Result<()> {
        let (fname, line) = {
            let st = self.top_ref();
            (st.filename.clone(), st.line)
        };
        self.push_source(fname, Rc::clone(&def.definition), line);

        let mut buffer = String::new();
        loop {
            let mut token = self.top().lex();
            if token == Token::Eoi {
                break;
            }

            let mut wantorig = false;
            if token == Token::HashHash {
                // concatenate: drop the space, take the next token verbatim
                wantorig = true;
                token = self.top().lex();
                if token == Token::Eoi {
                    break; // '##' at the end was rejected at define time
                }
            } else if !buffer.is_empty() {
                buffer.push(' ');
            }

            if token == Token::Char(b'#') {
                // stringify
                token = self.top().lex();
                if token == Token::Eoi {
                    buffer.push_str("\"\"");
                    break;
                }
                let text = self.top_ref().token_text().to_string();
                buffer.push('"');
                if token == Token::Identifier {
                    match find_macro_arg(args, &text) {
                        Some(arg) => buffer.push_str(arg.original.as_deref().unwrap_or("")),
                        None => buffer.push_str(&text),
                    }
                } else {
                    buffer.push_str(&text);
                }
                buffer.push('"');
                continue;
            }

            let text = self.top_ref().token_text().to_string();
            if token == Token::Identifier {
                if let Some(arg) = find_macro_arg(args, &text) {
                    if !wantorig {
                        // a parameter right before '##' keeps its raw form
                        let next = self.top().lex();
                        self.top().pushback();
                        wantorig = next == Token::HashHash;
                    }
                    if wantorig {
                        buffer.push_str(arg.original.as_deref().unwrap_or(""));
                    } else {
                        buffer.push_str(&arg.definition);
                    }
                    continue;
                }
            }
            buffer.push_str(&text);
        }

        self.pop_source(); // ditch the scratch frame
        let (fname, line) = {
            let st = self.top_ref();
            (st.filename.clone(), st.line)
        };
        self.push_source(fname, Rc::from(buffer), line);
        Ok(())
    }
}
