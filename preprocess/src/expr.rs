//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the shadertools-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Constant-expression evaluation for #if and #elif: shunting-yard to
// reverse Polish notation, then interpretation on a bounded i64 stack.
//

use crate::error::{PreprocessError, Result};
use crate::preprocessor::Preprocessor;
use crate::token::Token;

const OUTPUT_MAX: usize = 128;
const OPSTACK_MAX: usize = 64;
const RPN_STACK_MAX: usize = 128;

#[derive(Debug, Clone, Copy)]
enum RpnToken {
    Value(i64),
    Operator(Token),
}

/// Operator precedence, low to high. Anything not listed is not legal
/// in a conditional expression.
fn find_precedence(token: Token) -> i32 {
    match token {
        Token::LogicalOr => 0,
        Token::LogicalAnd => 1,
        Token::Char(b'|') => 2,
        Token::Char(b'^') => 3,
        Token::Char(b'&') => 4,
        Token::NotEqual => 5,
        Token::Equal => 6,
        Token::Char(b'<') | Token::Char(b'>') | Token::Lte | Token::Gte => 7,
        Token::LeftShift | Token::RightShift => 8,
        Token::Char(b'-') | Token::Char(b'+') => 9,
        Token::Char(b'%') | Token::Char(b'/') | Token::Char(b'*') => 10,
        Token::UnaryPlus | Token::UnaryMinus | Token::Char(b'!') | Token::Char(b'~') => 11,
        _ => -1,
    }
}

/// Decimal, hex (0x) or octal (leading 0) integer literal text.
fn token_to_int(text: &str) -> Result<i64> {
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else if text.len() > 1 && text.starts_with('0') {
        i64::from_str_radix(&text[1..], 8)
    } else {
        text.parse()
    };
    parsed.map_err(|_| PreprocessError::Directive("Invalid expression".into()))
}

fn too_complex() -> PreprocessError {
    PreprocessError::Directive("#if expression too complex".into())
}

fn push_output(output: &mut Vec<RpnToken>, token: RpnToken) -> Result<()> {
    if output.len() >= OUTPUT_MAX {
        return Err(too_complex());
    }
    output.push(token);
    Ok(())
}

fn push_opstack(stack: &mut Vec<Token>, token: Token) -> Result<()> {
    if stack.len() >= OPSTACK_MAX {
        return Err(too_complex());
    }
    stack.push(token);
    Ok(())
}

/// Interpret the postfix form with C semantics: truncating division,
/// logical operators yielding 0/1. Division or modulo by zero (and
/// i64::MIN / -1) is an error rather than a trap.
fn interpret_rpn(tokens: &[RpnToken]) -> Option<i64> {
    let mut stack: Vec<i64> = Vec::new();
    for t in tokens {
        match *t {
            RpnToken::Value(v) => {
                if stack.len() >= RPN_STACK_MAX {
                    return None;
                }
                stack.push(v);
            }
            RpnToken::Operator(op) => match op {
                Token::Char(b'!') => {
                    let v = stack.pop()?;
                    stack.push((v == 0) as i64);
                }
                Token::Char(b'~') => {
                    let v = stack.pop()?;
                    stack.push(!v);
                }
                Token::UnaryMinus => {
                    let v = stack.pop()?;
                    stack.push(v.wrapping_neg());
                }
                Token::UnaryPlus => {
                    stack.last()?;
                }
                _ => {
                    let right = stack.pop()?;
                    let left = stack.pop()?;
                    let value = match op {
                        Token::LogicalOr => (left != 0 || right != 0) as i64,
                        Token::LogicalAnd => (left != 0 && right != 0) as i64,
                        Token::Char(b'|') => left | right,
                        Token::Char(b'^') => left ^ right,
                        Token::Char(b'&') => left & right,
                        Token::NotEqual => (left != right) as i64,
                        Token::Equal => (left == right) as i64,
                        Token::Char(b'<') => (left < right) as i64,
                        Token::Char(b'>') => (left > right) as i64,
                        Token::Lte => (left <= right) as i64,
                        Token::Gte => (left >= right) as i64,
                        Token::LeftShift => left.wrapping_shl(right as u32),
                        Token::RightShift => left.wrapping_shr(right as u32),
                        Token::Char(b'-') => left.wrapping_sub(right),
                        Token::Char(b'+') => left.wrapping_add(right),
                        Token::Char(b'%') => left.checked_rem(right)?,
                        Token::Char(b'/') => left.checked_div(right)?,
                        Token::Char(b'*') => left.wrapping_mul(right),
                        _ => return None,
                    };
                    stack.push(value);
                }
            },
        }
    }
    if stack.len() == 1 {
        Some(stack[0])
    } else {
        None
    }
}

impl Preprocessor {
    /// Parse and evaluate the constant expression of an `#if`/`#elif`,
    /// consuming tokens through the end of the logical line. Identifiers
    /// expand as macros first; any that remain unresolved become zero.
    /// `defined X` and `defined(X)` test presence without expanding.
    pub(crate) fn reduce_expression(&mut self) -> Result<bool> {
        let start_depth = self.depth();
        let mut output: Vec<RpnToken> = Vec::new();
        let mut stack: Vec<Token> = Vec::new();
        let mut previous = Token::Unknown;

        loop {
            let mut token = self.top().lex();
            let mut isleft = true;
            match token {
                Token::Char(b'!') | Token::Char(b'~') => isleft = false,
                Token::Char(b'-') | Token::Char(b'+') => {
                    // unary unless what came before can end an operand
                    if !matches!(previous, Token::IntLiteral | Token::Char(b')')) {
                        isleft = false;
                        token = if token == Token::Char(b'-') {
                            Token::UnaryMinus
                        } else {
                            Token::UnaryPlus
                        };
                    }
                }
                _ => {}
            }
            if token != Token::Identifier {
                self.recursion_count = 0;
            }

            match token {
                Token::Eoi => {
                    if self.depth() > start_depth {
                        // a macro expansion frame ran dry mid-expression
                        self.pop_source();
                        continue;
                    }
                    break;
                }
                Token::Char(b'\n') => break,
                Token::Identifier => {
                    if self.handle_identifier()? {
                        continue; // go again with the new source frame
                    }
                    if self.top_ref().token_text() == "defined" {
                        let mut t = self.top().lex();
                        let paren = t == Token::Char(b'(');
                        if paren {
                            t = self.top().lex();
                        }
                        if t != Token::Identifier {
                            return Err(PreprocessError::Directive(
                                "operator 'defined' requires an identifier".into(),
                            ));
                        }
                        let name = self.top_ref().token_text().to_string();
                        let found = self.find_define(&name).is_some();
                        if paren && self.top().lex() != Token::Char(b')') {
                            return Err(PreprocessError::Directive("Unmatched ')'".into()));
                        }
                        push_output(&mut output, RpnToken::Value(found as i64))?;
                        continue;
                    }
                    // can't replace the identifier? It becomes zero.
                    token = Token::IntLiteral;
                    push_output(&mut output, RpnToken::Value(0))?;
                }
                Token::IntLiteral => {
                    let v = token_to_int(self.top_ref().token_text())?;
                    push_output(&mut output, RpnToken::Value(v))?;
                }
                Token::Char(b'(') => push_opstack(&mut stack, token)?,
                Token::Char(b')') => {
                    let mut matched = false;
                    while let Some(t) = stack.pop() {
                        if t == Token::Char(b'(') {
                            matched = true;
                            break;
                        }
                        push_output(&mut output, RpnToken::Operator(t))?;
                    }
                    if !matched {
                        return Err(PreprocessError::Directive("Unmatched ')'".into()));
                    }
                }
                _ => {
                    let precedence = find_precedence(token);
                    if precedence < 0 {
                        // bogus token, or two operators together
                        self.top().pushback();
                        return Err(PreprocessError::Directive("Invalid expression".into()));
                    }
                    while let Some(&t) = stack.last() {
                        let p = find_precedence(t);
                        if p >= 0 && ((isleft && precedence <= p) || (!isleft && precedence < p)) {
                            stack.pop();
                            push_output(&mut output, RpnToken::Operator(t))?;
                        } else {
                            break;
                        }
                    }
                    push_opstack(&mut stack, token)?;
                }
            }
            previous = token;
        }

        while let Some(t) = stack.pop() {
            if t == Token::Char(b'(') {
                return Err(PreprocessError::Directive("Unmatched '('".into()));
            }
            push_output(&mut output, RpnToken::Operator(t))?;
        }

        match interpret_rpn(&output) {
            Some(v) => Ok(v != 0),
            None => Err(PreprocessError::Directive("Invalid expression".into())),
        }
    }
}
