//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the shadertools-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Streaming tokenizer, one token per call, over the top include frame.
//

use std::rc::Rc;

use crate::state::IncludeState;
use crate::token::Token;

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// Bytes that may begin a token the lexer understands. Anything else
/// starts a `BadChars` run.
fn is_known_start(c: u8) -> bool {
    is_ident_start(c)
        || c.is_ascii_digit()
        || matches!(
            c,
            b'"' | b'\''
                | b'(' | b')' | b'[' | b']' | b'{' | b'}'
                | b',' | b'.' | b';' | b':' | b'?' | b'~'
                | b'!' | b'+' | b'-' | b'*' | b'/' | b'%'
                | b'<' | b'>' | b'=' | b'&' | b'|' | b'^' | b'#'
        )
}

impl IncludeState {
    /// Lex the next token, honoring the one-slot pushback.
    pub fn lex(&mut self) -> Token {
        if self.pushedback {
            self.pushedback = false;
            return self.tokenval;
        }
        self.scan()
    }

    fn set_token(&mut self, start: usize, len: usize, token: Token) -> Token {
        self.token_start = start;
        self.token_len = len;
        self.tokenval = token;
        // A whitespace token leaves line_start alone: spaces before a '#'
        // do not stop it from opening a directive.
        if token != Token::Char(b' ') {
            self.line_start = token == Token::Char(b'\n');
        }
        token
    }

    fn scan(&mut self) -> Token {
        let source = Rc::clone(&self.source);
        let bytes = source.as_bytes();

        // Whitespace, comments and line splices. A run of any of these
        // becomes a single synthetic ' ' token when whitespace reporting
        // is on (splices excepted: they vanish entirely).
        let ws_start = self.pos;
        let mut saw_ws = false;
        loop {
            match bytes.get(self.pos).copied() {
                Some(b' ' | b'\t' | 0x0b | 0x0c) => {
                    self.pos += 1;
                    saw_ws = true;
                }
                Some(b'\\') => match bytes.get(self.pos + 1).copied() {
                    Some(b'\n') => {
                        self.pos += 2;
                        self.line += 1;
                    }
                    Some(b'\r') => {
                        self.pos += 2;
                        if bytes.get(self.pos) == Some(&b'\n') {
                            self.pos += 1;
                        }
                        self.line += 1;
                    }
                    _ => break,
                },
                Some(b'/') if bytes.get(self.pos + 1) == Some(&b'/') => {
                    self.pos += 2;
                    while let Some(&c) = bytes.get(self.pos) {
                        if c == b'\n' || c == b'\r' {
                            break;
                        }
                        self.pos += 1;
                    }
                    saw_ws = true;
                }
                Some(b'/') if bytes.get(self.pos + 1) == Some(&b'*') => {
                    let comment_start = self.pos;
                    self.pos += 2;
                    let mut closed = false;
                    while self.pos < bytes.len() {
                        if bytes[self.pos] == b'\n' {
                            self.line += 1;
                            self.pos += 1;
                        } else if bytes[self.pos] == b'*' && bytes.get(self.pos + 1) == Some(&b'/')
                        {
                            self.pos += 2;
                            closed = true;
                            break;
                        } else {
                            self.pos += 1;
                        }
                    }
                    if !closed {
                        return self.set_token(
                            comment_start,
                            bytes.len() - comment_start,
                            Token::IncompleteComment,
                        );
                    }
                    saw_ws = true;
                }
                Some(b';') if self.asm_comments => {
                    self.pos += 1;
                    while let Some(&c) = bytes.get(self.pos) {
                        if c == b'\n' || c == b'\r' {
                            break;
                        }
                        self.pos += 1;
                    }
                    saw_ws = true;
                }
                _ => break,
            }
        }
        if saw_ws && self.report_whitespace {
            // The lexeme is the raw run; it may not actually point to ' '.
            return self.set_token(ws_start, self.pos - ws_start, Token::Char(b' '));
        }

        let start = self.pos;
        let Some(&c) = bytes.get(self.pos) else {
            return self.set_token(start, 0, Token::Eoi);
        };
        self.pos += 1;

        match c {
            b'\n' => {
                self.line += 1;
                self.set_token(start, 1, Token::Char(b'\n'))
            }
            b'\r' => {
                if bytes.get(self.pos) == Some(&b'\n') {
                    self.pos += 1;
                }
                self.line += 1;
                self.set_token(start, self.pos - start, Token::Char(b'\n'))
            }
            _ if is_ident_start(c) => {
                while bytes.get(self.pos).copied().is_some_and(is_ident_char) {
                    self.pos += 1;
                }
                self.set_token(start, self.pos - start, Token::Identifier)
            }
            b'0'..=b'9' => self.scan_number(bytes, start),
            b'.' if bytes.get(self.pos).copied().is_some_and(|b| b.is_ascii_digit()) => {
                self.scan_number(bytes, start)
            }
            b'"' | b'\'' => self.scan_string(bytes, start, c),
            b'#' => {
                if self.line_start {
                    if let Some(tok) = self.scan_directive(&source, bytes) {
                        return tok;
                    }
                }
                if bytes.get(self.pos) == Some(&b'#') {
                    self.pos += 1;
                    return self.set_token(start, 2, Token::HashHash);
                }
                self.set_token(start, 1, Token::Char(b'#'))
            }
            b'<' => match (bytes.get(self.pos).copied(), bytes.get(self.pos + 1).copied()) {
                (Some(b'<'), Some(b'=')) => {
                    self.pos += 2;
                    self.set_token(start, 3, Token::ShlAssign)
                }
                (Some(b'<'), _) => {
                    self.pos += 1;
                    self.set_token(start, 2, Token::LeftShift)
                }
                (Some(b'='), _) => {
                    self.pos += 1;
                    self.set_token(start, 2, Token::Lte)
                }
                _ => self.set_token(start, 1, Token::Char(b'<')),
            },
            b'>' => match (bytes.get(self.pos).copied(), bytes.get(self.pos + 1).copied()) {
                (Some(b'>'), Some(b'=')) => {
                    self.pos += 2;
                    self.set_token(start, 3, Token::ShrAssign)
                }
                (Some(b'>'), _) => {
                    self.pos += 1;
                    self.set_token(start, 2, Token::RightShift)
                }
                (Some(b'='), _) => {
                    self.pos += 1;
                    self.set_token(start, 2, Token::Gte)
                }
                _ => self.set_token(start, 1, Token::Char(b'>')),
            },
            b'=' | b'!' | b'*' | b'/' | b'%' | b'^' => {
                if bytes.get(self.pos) == Some(&b'=') {
                    self.pos += 1;
                    let tok = match c {
                        b'=' => Token::Equal,
                        b'!' => Token::NotEqual,
                        b'*' => Token::MulAssign,
                        b'/' => Token::DivAssign,
                        b'%' => Token::ModAssign,
                        _ => Token::XorAssign,
                    };
                    self.set_token(start, 2, tok)
                } else {
                    self.set_token(start, 1, Token::Char(c))
                }
            }
            b'&' | b'|' | b'+' | b'-' => {
                let next = bytes.get(self.pos).copied();
                if next == Some(c) {
                    self.pos += 1;
                    let tok = match c {
                        b'&' => Token::LogicalAnd,
                        b'|' => Token::LogicalOr,
                        b'+' => Token::Increment,
                        _ => Token::Decrement,
                    };
                    self.set_token(start, 2, tok)
                } else if next == Some(b'=') {
                    self.pos += 1;
                    let tok = match c {
                        b'&' => Token::AndAssign,
                        b'|' => Token::OrAssign,
                        b'+' => Token::AddAssign,
                        _ => Token::SubAssign,
                    };
                    self.set_token(start, 2, tok)
                } else {
                    self.set_token(start, 1, Token::Char(c))
                }
            }
            b'(' | b')' | b'[' | b']' | b'{' | b'}' | b',' | b'.' | b';' | b':' | b'?' | b'~' => {
                self.set_token(start, 1, Token::Char(c))
            }
            _ => {
                while let Some(&b2) = bytes.get(self.pos) {
                    if is_known_start(b2) || b2.is_ascii_whitespace() {
                        break;
                    }
                    self.pos += 1;
                }
                self.set_token(start, self.pos - start, Token::BadChars)
            }
        }
    }

    /// Numbers: decimal, hex and octal integers; floats with optional
    /// fraction, exponent and `f`/`h` suffix. The first character has
    /// already been consumed.
    fn scan_number(&mut self, bytes: &[u8], start: usize) -> Token {
        let first = bytes[start];
        if first == b'0'
            && matches!(bytes.get(self.pos).copied(), Some(b'x' | b'X'))
            && bytes
                .get(self.pos + 1)
                .is_some_and(|b| b.is_ascii_hexdigit())
        {
            self.pos += 1;
            while bytes.get(self.pos).is_some_and(|b| b.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            return self.set_token(start, self.pos - start, Token::IntLiteral);
        }

        let mut float = first == b'.';
        while bytes.get(self.pos).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if !float && bytes.get(self.pos) == Some(&b'.') {
            float = true;
            self.pos += 1;
            while bytes.get(self.pos).is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(bytes.get(self.pos).copied(), Some(b'e' | b'E')) {
            let mut p = self.pos + 1;
            if matches!(bytes.get(p).copied(), Some(b'+' | b'-')) {
                p += 1;
            }
            if bytes.get(p).is_some_and(|b| b.is_ascii_digit()) {
                float = true;
                self.pos = p;
                while bytes.get(self.pos).is_some_and(|b| b.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }
        if float && matches!(bytes.get(self.pos).copied(), Some(b'f' | b'F' | b'h' | b'H')) {
            self.pos += 1;
        }
        let tok = if float {
            Token::FloatLiteral
        } else {
            Token::IntLiteral
        };
        self.set_token(start, self.pos - start, tok)
    }

    /// Single- or double-quoted literal with backslash escapes. The
    /// lexeme keeps its quotes. Running into a newline or the end of the
    /// buffer before the closing quote yields `BadChars`.
    fn scan_string(&mut self, bytes: &[u8], start: usize, delim: u8) -> Token {
        let mut escape = false;
        loop {
            match bytes.get(self.pos).copied() {
                None | Some(b'\n' | b'\r') => {
                    return self.set_token(start, self.pos - start, Token::BadChars);
                }
                Some(c) => {
                    self.pos += 1;
                    if escape {
                        escape = false;
                    } else if c == b'\\' {
                        escape = true;
                    } else if c == delim {
                        break;
                    }
                }
            }
        }
        self.set_token(start, self.pos - start, Token::StringLiteral)
    }

    /// A '#' has been consumed at the start of a logical line. If an
    /// identifier (after optional blanks) names a directive, promote to
    /// the corresponding `Pp*` token spanning `#` through the keyword.
    fn scan_directive(&mut self, source: &str, bytes: &[u8]) -> Option<Token> {
        let start = self.pos - 1;
        let mut p = self.pos;
        while matches!(bytes.get(p).copied(), Some(b' ' | b'\t')) {
            p += 1;
        }
        let id_start = p;
        while bytes.get(p).copied().is_some_and(is_ident_char) {
            p += 1;
        }
        let tok = match &source[id_start..p] {
            "include" => Token::PpInclude,
            "line" => Token::PpLine,
            "define" => Token::PpDefine,
            "undef" => Token::PpUndef,
            "if" => Token::PpIf,
            "ifdef" => Token::PpIfdef,
            "ifndef" => Token::PpIfndef,
            "else" => Token::PpElse,
            "elif" => Token::PpElif,
            "endif" => Token::PpEndif,
            "error" => Token::PpError,
            "pragma" => Token::PpPragma,
            _ => return None,
        };
        self.pos = p;
        Some(self.set_token(start, p - start, tok))
    }
}
