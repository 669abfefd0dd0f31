//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the shadertools-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Preprocessor context and token pump: include stack management,
// directive dispatch, conditional skipping and error surfacing.
//

use std::io;
use std::path::Path;
use std::rc::Rc;

use crate::defines::{Define, DefineTable};
use crate::error::{PreprocessError, Result};
use crate::state::{Conditional, IncludeState};
use crate::strings::StringCache;
use crate::token::Token;

/// Macro expansion depth cap.
pub const RECURSION_MAX: u32 = 256;

/// Error messages are clamped to this many bytes.
const FAILSTR_MAX: usize = 255;

/// Whether an `#include` used `"..."` or `<...>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    Local,
    System,
}

/// Resolves `#include` directives to file contents. The returned buffer
/// is owned by the include frame and released when the frame pops.
pub trait IncludeHandler {
    fn open(&mut self, kind: IncludeKind, filename: &str, parent: Option<&str>)
        -> io::Result<String>;
}

/// Default handler: local includes resolve relative to the including
/// file's directory first, then the working directory; system includes
/// resolve from the working directory.
pub struct FileIncluder;

impl IncludeHandler for FileIncluder {
    fn open(
        &mut self,
        kind: IncludeKind,
        filename: &str,
        parent: Option<&str>,
    ) -> io::Result<String> {
        if kind == IncludeKind::Local {
            if let Some(dir) = parent.and_then(|p| Path::new(p).parent()) {
                let candidate = dir.join(filename);
                if candidate.exists() {
                    return std::fs::read_to_string(candidate);
                }
            }
        }
        std::fs::read_to_string(filename)
    }
}

/// A macro supplied up front, materialized as a `#define` line in the
/// synthetic "<predefined macros>" source frame.
#[derive(Debug, Clone)]
pub struct PreprocessorDefine {
    pub identifier: String,
    pub definition: String,
}

/// One token of pump output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpToken {
    pub token: Token,
    pub text: String,
}

pub struct Preprocessor {
    include_stack: Vec<IncludeState>,
    pub(crate) defines: DefineTable,
    filename_cache: StringCache,
    /// Synthetic `__FILE__` still active (a `#define`/`#undef` of the
    /// name permanently disables it).
    file_macro: bool,
    line_macro: bool,
    /// Sticky error; the next `next_token` call surfaces and clears it.
    failstr: Option<String>,
    pub(crate) recursion_count: u32,
    asm_comments: bool,
    parsing_pragma: bool,
    includer: Option<Box<dyn IncludeHandler>>,
}

fn require_newline(state: &mut IncludeState) -> bool {
    let token = state.lex();
    state.pushback(); // rewind no matter what
    matches!(
        token,
        Token::IncompleteComment | Token::Eoi | Token::Char(b'\n')
    )
}

impl Preprocessor {
    pub fn new(
        filename: &str,
        source: &str,
        defines: &[PreprocessorDefine],
        asm_comments: bool,
        includer: Option<Box<dyn IncludeHandler>>,
    ) -> Self {
        let mut pp = Self {
            include_stack: Vec::new(),
            defines: DefineTable::new(),
            filename_cache: StringCache::new(),
            file_macro: true,
            line_macro: true,
            failstr: None,
            recursion_count: 0,
            asm_comments,
            parsing_pragma: false,
            includer,
        };
        let fname = pp.filename_cache.intern(filename);
        pp.push_source(Some(fname), Rc::from(source), 1);

        // The predefined block rides on top of the primary source, so
        // the usual directive parser sorts it out first.
        if !defines.is_empty() {
            let mut block = String::new();
            for d in defines {
                block.push_str("#define ");
                block.push_str(&d.identifier);
                block.push(' ');
                block.push_str(&d.definition);
                block.push('\n');
            }
            let fname = pp.filename_cache.intern("<predefined macros>");
            pp.push_source(Some(fname), Rc::from(block), 1);
        }
        pp
    }

    pub(crate) fn top(&mut self) -> &mut IncludeState {
        self.include_stack.last_mut().expect("include stack underflow")
    }

    pub(crate) fn top_ref(&self) -> &IncludeState {
        self.include_stack.last().expect("include stack underflow")
    }

    pub(crate) fn depth(&self) -> usize {
        self.include_stack.len()
    }

    pub(crate) fn push_source(&mut self, filename: Option<Rc<str>>, source: Rc<str>, line: u32) {
        log::trace!("push_source {:?}, {} bytes", filename, source.len());
        self.include_stack
            .push(IncludeState::new(filename, source, line, self.asm_comments));
    }

    pub(crate) fn pop_source(&mut self) {
        let state = self.include_stack.pop().expect("more pops than pushes");
        log::trace!("pop_source {:?}", state.filename);
    }

    /// Record an error; the next pump call returns it as a
    /// `PreprocessingError` token.
    pub(crate) fn fail(&mut self, msg: impl Into<String>) {
        let mut msg = msg.into();
        if msg.len() > FAILSTR_MAX {
            let mut end = FAILSTR_MAX;
            while !msg.is_char_boundary(end) {
                end -= 1;
            }
            msg.truncate(end);
        }
        self.failstr = Some(msg);
    }

    pub(crate) fn fail_err(&mut self, err: PreprocessError) {
        self.fail(err.to_string());
    }

    /// Look up a macro. `__FILE__` and `__LINE__` are synthesized from
    /// the current source position on every call, as owned copies.
    pub(crate) fn find_define(&self, sym: &str) -> Option<Define> {
        if self.file_macro && sym == "__FILE__" {
            let fname = self
                .include_stack
                .last()
                .and_then(|s| s.filename.clone())
                .unwrap_or_else(|| Rc::from(""));
            return Some(Define::object("__FILE__", format!("\"{}\"", fname)));
        }
        if self.line_macro && sym == "__LINE__" {
            let line = self.include_stack.last().map_or(0, |s| s.line);
            return Some(Define::object("__LINE__", line.to_string()));
        }
        self.defines.find(sym).cloned()
    }

    /// Number of user-defined macros (the synthetic pair not included).
    pub fn define_count(&self) -> usize {
        self.defines.len()
    }

    pub fn is_defined(&self, sym: &str) -> bool {
        self.find_define(sym).is_some()
    }

    /// Filename and line of the current source position.
    pub fn source_position(&self) -> (Option<Rc<str>>, u32) {
        match self.include_stack.last() {
            Some(st) => (st.filename.clone(), st.line),
            None => (None, 0),
        }
    }

    // ------------------------------------------------------------------
    // Directive handlers
    // ------------------------------------------------------------------

    fn handle_pp_include(&mut self) -> Result<()> {
        let token = self.top().lex();
        let (kind, filename) = match token {
            Token::StringLiteral => {
                let text = self.top_ref().token_text();
                (IncludeKind::Local, text[1..text.len() - 1].to_string())
            }
            Token::Char(b'<') => {
                // every byte between the brackets is part of the filename
                let name = {
                    let st = self.top();
                    let src = Rc::clone(&st.source);
                    let bytes = src.as_bytes();
                    let start = st.pos;
                    let mut closed = false;
                    while st.pos < bytes.len() {
                        let c = bytes[st.pos];
                        if c == b'\r' || c == b'\n' {
                            break;
                        }
                        st.pos += 1;
                        if c == b'>' {
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        return Err(PreprocessError::Directive(
                            "Invalid #include directive".into(),
                        ));
                    }
                    src[start..st.pos - 1].to_string()
                };
                (IncludeKind::System, name)
            }
            _ => {
                return Err(PreprocessError::Directive(
                    "Invalid #include directive".into(),
                ))
            }
        };
        if !require_newline(self.top()) {
            return Err(PreprocessError::Directive(
                "Invalid #include directive".into(),
            ));
        }

        let parent = self.top_ref().filename.clone();
        let Some(includer) = self.includer.as_mut() else {
            return Err(PreprocessError::Semantic(
                "Saw #include, but no include callbacks defined".into(),
            ));
        };
        let data = includer
            .open(kind, &filename, parent.as_deref())
            .map_err(|_| PreprocessError::Semantic("Include callback failed".into()))?;
        let fname = self.filename_cache.intern(&filename);
        self.push_source(Some(fname), Rc::from(data), 1);
        Ok(())
    }

    fn handle_pp_line(&mut self) -> Result<()> {
        let invalid = || PreprocessError::Directive("Invalid #line directive".into());
        if self.top().lex() != Token::IntLiteral {
            return Err(invalid());
        }
        let linenum: u32 = self
            .top_ref()
            .token_text()
            .parse()
            .map_err(|_| invalid())?;
        match self.top().lex() {
            Token::Char(b'\n') => {
                self.top().line = linenum;
            }
            Token::Eoi | Token::IncompleteComment => {
                self.top().pushback();
                self.top().line = linenum;
            }
            Token::StringLiteral => {
                let text = self.top_ref().token_text();
                let fname = text[1..text.len() - 1].to_string();
                match self.top().lex() {
                    Token::Char(b'\n') => {}
                    Token::Eoi | Token::IncompleteComment => self.top().pushback(),
                    _ => return Err(invalid()),
                }
                let cached = self.filename_cache.intern(&fname);
                let st = self.top();
                st.filename = Some(cached);
                st.line = linenum;
            }
            _ => return Err(invalid()),
        }
        Ok(())
    }

    fn handle_pp_error(&mut self) {
        let mut failstr = String::from("#error");
        let mut avail = FAILSTR_MAX - failstr.len();
        self.top().report_whitespace = true;
        loop {
            match self.top().lex() {
                Token::Char(b'\n') => {
                    // report the error on the directive's own line
                    let st = self.top();
                    st.line = st.line.saturating_sub(1);
                    st.pushback();
                    break;
                }
                Token::IncompleteComment | Token::Eoi => {
                    self.top().pushback();
                    break;
                }
                Token::Char(b' ') => {
                    if avail > 0 {
                        failstr.push(' ');
                        avail -= 1;
                    }
                }
                _ => {
                    let text = self.top_ref().token_text();
                    let mut end = avail.min(text.len());
                    while !text.is_char_boundary(end) {
                        end -= 1;
                    }
                    failstr.push_str(&text[..end]);
                    avail -= end;
                }
            }
        }
        self.top().report_whitespace = false;
        self.failstr = Some(failstr);
    }

    fn handle_pp_define(&mut self) -> Result<()> {
        if self.top().lex() != Token::Identifier {
            return Err(PreprocessError::Directive(
                "Macro names must be identifiers".into(),
            ));
        }
        let sym = self.top_ref().token_text().to_string();
        if sym == "defined" {
            return Err(PreprocessError::Directive(
                "'defined' cannot be used as a macro name".into(),
            ));
        }
        // Redefining a synthetic macro reports the clash and disables the
        // synthetic form for the rest of the unit; the directive still
        // defines an ordinary macro of that name.
        if sym == "__FILE__" && self.file_macro {
            self.fail(format!("'{}' already defined", sym));
            self.file_macro = false;
        } else if sym == "__LINE__" && self.line_macro {
            self.fail(format!("'{}' already defined", sym));
            self.line_macro = false;
        }

        // "#define a(b)" is different than "#define a (b)"
        let first = {
            let st = self.top();
            st.report_whitespace = true;
            let t = st.lex();
            st.report_whitespace = false;
            t
        };
        let mut parameters: Vec<Rc<str>> = Vec::new();
        let mut paramcount = 0i32;
        match first {
            Token::Char(b' ') => {
                self.top().lex();
            }
            Token::Char(b'(') => {
                loop {
                    if self.top().lex() != Token::Identifier {
                        break;
                    }
                    let name = Rc::from(self.top_ref().token_text());
                    parameters.push(name);
                    if self.top().lex() != Token::Char(b',') {
                        break;
                    }
                }
                if self.top_ref().tokenval != Token::Char(b')') {
                    return Err(PreprocessError::Directive(
                        "syntax error in macro parameter list".into(),
                    ));
                }
                paramcount = if parameters.is_empty() {
                    -1 // "#define a()" takes arguments, all zero of them
                } else {
                    parameters.len() as i32
                };
                self.top().lex();
            }
            _ => {}
        }
        self.top().pushback();

        // The replacement is the rest of the logical line, tokens joined
        // by single spaces.
        let mut buffer = String::new();
        self.top().report_whitespace = true;
        loop {
            match self.top().lex() {
                Token::IncompleteComment | Token::Eoi => {
                    self.top().pushback();
                    break;
                }
                Token::Char(b'\n') => break,
                Token::Char(b' ') => {
                    if !buffer.is_empty() {
                        buffer.push(' ');
                    }
                }
                _ => {
                    let text = self.top_ref().token_text().to_string();
                    buffer.push_str(&text);
                }
            }
        }
        self.top().report_whitespace = false;

        let mut hashhash_error = false;
        if buffer.starts_with("##") {
            hashhash_error = true;
            buffer.drain(..2);
        }
        let trimmed = buffer.trim_end().len();
        if buffer[..trimmed].ends_with("##") {
            hashhash_error = true;
            buffer.truncate(trimmed - 2);
        }
        if hashhash_error {
            self.fail("'##' cannot appear at either end of a macro expansion");
        }

        let def = Define {
            identifier: Rc::from(sym.as_str()),
            definition: Rc::from(buffer),
            original: None,
            parameters,
            paramcount,
        };
        if !self.defines.insert(def) {
            return Err(PreprocessError::Semantic(format!(
                "'{}' already defined",
                sym
            )));
        }
        Ok(())
    }

    fn handle_pp_undef(&mut self) -> Result<()> {
        if self.top().lex() != Token::Identifier {
            return Err(PreprocessError::Directive(
                "Macro names must be identifiers".into(),
            ));
        }
        let sym = self.top_ref().token_text().to_string();
        if !require_newline(self.top()) {
            return Err(PreprocessError::Directive("Invalid #undef directive".into()));
        }
        if sym == "__FILE__" && self.file_macro {
            self.fail(format!("undefining \"{}\"", sym));
            self.file_macro = false;
        } else if sym == "__LINE__" && self.line_macro {
            self.fail(format!("undefining \"{}\"", sym));
            self.line_macro = false;
        }
        self.defines.remove(&sym);
        Ok(())
    }

    fn push_conditional(&mut self, ctype: Token, chosen: bool) {
        let st = self.top();
        let parent_skipping = st.skipping();
        st.conditional_stack.push(Conditional {
            ctype,
            linenum: st.line.saturating_sub(1),
            skipping: parent_skipping || !chosen,
            chosen,
        });
    }

    fn handle_pp_ifdef(&mut self, ctype: Token) -> Result<()> {
        debug_assert!(matches!(ctype, Token::PpIfdef | Token::PpIfndef));
        if self.top().lex() != Token::Identifier {
            return Err(PreprocessError::Directive(
                "Macro names must be identifiers".into(),
            ));
        }
        let sym = self.top_ref().token_text().to_string();
        if !require_newline(self.top()) {
            return Err(PreprocessError::Directive(
                if ctype == Token::PpIfdef {
                    "Invalid #ifdef directive"
                } else {
                    "Invalid #ifndef directive"
                }
                .into(),
            ));
        }
        let found = self.find_define(&sym).is_some();
        let chosen = if ctype == Token::PpIfdef { found } else { !found };
        self.push_conditional(ctype, chosen);
        Ok(())
    }

    fn handle_pp_if(&mut self) -> Result<()> {
        let chosen = self.reduce_expression()?;
        self.push_conditional(Token::PpIf, chosen);
        Ok(())
    }

    fn handle_pp_elif(&mut self) -> Result<()> {
        let rc = self.reduce_expression()?;
        let st = self.top();
        let n = st.conditional_stack.len();
        if n == 0 {
            return Err(PreprocessError::Semantic("#elif without #if".into()));
        }
        if st.conditional_stack[n - 1].ctype == Token::PpElse {
            return Err(PreprocessError::Semantic("#elif after #else".into()));
        }
        let parent_skipping = n >= 2 && st.conditional_stack[n - 2].skipping;
        let cond = &mut st.conditional_stack[n - 1];
        cond.ctype = Token::PpElif;
        cond.skipping = parent_skipping || cond.chosen || !rc;
        if !cond.chosen {
            cond.chosen = rc;
        }
        Ok(())
    }

    fn handle_pp_else(&mut self) -> Result<()> {
        if !require_newline(self.top()) {
            return Err(PreprocessError::Directive("Invalid #else directive".into()));
        }
        let st = self.top();
        let n = st.conditional_stack.len();
        if n == 0 {
            return Err(PreprocessError::Semantic("#else without #if".into()));
        }
        if st.conditional_stack[n - 1].ctype == Token::PpElse {
            return Err(PreprocessError::Semantic("#else after #else".into()));
        }
        let parent_skipping = n >= 2 && st.conditional_stack[n - 2].skipping;
        let cond = &mut st.conditional_stack[n - 1];
        cond.ctype = Token::PpElse;
        cond.skipping = parent_skipping || cond.chosen;
        cond.chosen = true;
        Ok(())
    }

    fn handle_pp_endif(&mut self) -> Result<()> {
        if !require_newline(self.top()) {
            return Err(PreprocessError::Directive(
                "Invalid #endif directive".into(),
            ));
        }
        if self.top().conditional_stack.pop().is_none() {
            return Err(PreprocessError::Semantic("Unmatched #endif".into()));
        }
        Ok(())
    }

    /// Failed directives abandon the rest of their line, so parsing
    /// resumes cleanly at the next newline.
    fn skip_to_eol(&mut self) {
        // A handler that failed after consuming its newline is already
        // at the resume point.
        if self.top_ref().tokenval == Token::Char(b'\n') && !self.top_ref().pushedback {
            return;
        }
        loop {
            match self.top().lex() {
                Token::Char(b'\n') => break,
                Token::Eoi | Token::IncompleteComment => {
                    self.top().pushback();
                    break;
                }
                _ => {}
            }
        }
    }

    fn unterminated_pp_condition(&mut self) {
        let cond = self
            .top()
            .conditional_stack
            .pop()
            .expect("conditional stack empty");
        let msg = match cond.ctype {
            Token::PpIf => "Unterminated #if",
            Token::PpIfdef => "Unterminated #ifdef",
            Token::PpIfndef => "Unterminated #ifndef",
            Token::PpElse => "Unterminated #else",
            _ => "Unterminated #elif",
        };
        log::debug!("{} opened on line {}", msg, cond.linenum);
        self.fail(msg);
    }

    // ------------------------------------------------------------------
    // The pump
    // ------------------------------------------------------------------

    /// Produce the next post-expansion token. Errors surface as a
    /// `PreprocessingError` token carrying the message; the stream then
    /// resumes. `Eoi` means the translation unit is finished.
    pub fn next_token(&mut self) -> PpToken {
        loop {
            if let Some(msg) = self.failstr.take() {
                return PpToken {
                    token: Token::PreprocessingError,
                    text: msg,
                };
            }
            if self.include_stack.is_empty() {
                return PpToken {
                    token: Token::Eoi,
                    text: String::new(),
                };
            }

            let skipping = self.top_ref().skipping();
            let token = self.top().lex();
            if token != Token::Identifier {
                self.recursion_count = 0;
            }

            match token {
                Token::Eoi => {
                    if !self.top_ref().conditional_stack.is_empty() {
                        self.unterminated_pp_condition();
                    } else {
                        self.pop_source(); // resume after the parent's #include line
                    }
                    continue;
                }
                Token::IncompleteComment => {
                    self.fail("Incomplete multiline comment");
                    continue;
                }

                // Conditionals are processed even while skipping, so the
                // chain's #else/#elif/#endif are honored.
                Token::PpIfdef | Token::PpIfndef => {
                    if let Err(e) = self.handle_pp_ifdef(token) {
                        self.fail_err(e);
                        self.skip_to_eol();
                    }
                    continue;
                }
                Token::PpIf => {
                    if let Err(e) = self.handle_pp_if() {
                        self.fail_err(e);
                        self.skip_to_eol();
                    }
                    continue;
                }
                Token::PpElif => {
                    if let Err(e) = self.handle_pp_elif() {
                        self.fail_err(e);
                        self.skip_to_eol();
                    }
                    continue;
                }
                Token::PpEndif => {
                    if let Err(e) = self.handle_pp_endif() {
                        self.fail_err(e);
                        self.skip_to_eol();
                    }
                    continue;
                }
                Token::PpElse => {
                    if let Err(e) = self.handle_pp_else() {
                        self.fail_err(e);
                        self.skip_to_eol();
                    }
                    continue;
                }

                _ if skipping => continue,

                Token::PpInclude => {
                    if let Err(e) = self.handle_pp_include() {
                        self.fail_err(e);
                        self.skip_to_eol();
                    }
                    continue;
                }
                Token::PpLine => {
                    if let Err(e) = self.handle_pp_line() {
                        self.fail_err(e);
                        self.skip_to_eol();
                    }
                    continue;
                }
                Token::PpError => {
                    self.handle_pp_error();
                    continue;
                }
                Token::PpDefine => {
                    if let Err(e) = self.handle_pp_define() {
                        self.fail_err(e);
                        self.skip_to_eol();
                    }
                    continue;
                }
                Token::PpUndef => {
                    if let Err(e) = self.handle_pp_undef() {
                        self.fail_err(e);
                        self.skip_to_eol();
                    }
                    continue;
                }
                Token::PpPragma => {
                    // opaque passthrough: the directive, its body and the
                    // closing newline all reach the consumer
                    self.parsing_pragma = true;
                }
                Token::Identifier => match self.handle_identifier() {
                    Ok(true) => continue, // pushed a replacement frame
                    Ok(false) => {}
                    Err(e) => {
                        self.fail_err(e);
                        continue;
                    }
                },
                Token::Char(b'\n') => {
                    if self.parsing_pragma {
                        self.parsing_pragma = false;
                    } else {
                        // the preprocessor is line oriented; nothing else
                        // gets newlines
                        continue;
                    }
                }
                _ => {}
            }

            let st = self.top_ref();
            return PpToken {
                token,
                text: st.token_text().to_string(),
            };
        }
    }
}
