//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the shadertools-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Token kinds shared by the preprocessor and the calculator front end.
//

/// A token kind produced by the lexer.
///
/// Single-byte punctuators ride in `Char` as their byte value (this
/// includes the significant `'\n'` and, when whitespace reporting is on,
/// a synthetic `' '`). Multi-character operators and the preprocessor
/// directives get their own variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Char(u8),

    // Two- and three-character operators
    LeftShift,  // <<
    RightShift, // >>
    Lte,        // <=
    Gte,        // >=
    Equal,      // ==
    NotEqual,   // !=
    LogicalAnd, // &&
    LogicalOr,  // ||
    Increment,  // ++
    Decrement,  // --
    AddAssign,  // +=
    SubAssign,  // -=
    MulAssign,  // *=
    DivAssign,  // /=
    ModAssign,  // %=
    AndAssign,  // &=
    OrAssign,   // |=
    XorAssign,  // ^=
    ShlAssign,  // <<=
    ShrAssign,  // >>=
    HashHash,   // ##

    Identifier,
    IntLiteral,
    FloatLiteral,
    StringLiteral,

    // Directives, promoted from a '#' at the start of a logical line
    PpInclude,
    PpLine,
    PpDefine,
    PpUndef,
    PpIf,
    PpIfdef,
    PpIfndef,
    PpElse,
    PpElif,
    PpEndif,
    PpError,
    PpPragma,

    // Internal to the conditional-expression reducer
    UnaryPlus,
    UnaryMinus,

    IncompleteComment,
    BadChars,
    Eoi,
    PreprocessingError,
    Unknown,
}

impl Token {
    /// Canonical spelling for operator tokens, used in diagnostics.
    pub fn text(&self) -> &'static str {
        match self {
            Token::LeftShift => "<<",
            Token::RightShift => ">>",
            Token::Lte => "<=",
            Token::Gte => ">=",
            Token::Equal => "==",
            Token::NotEqual => "!=",
            Token::LogicalAnd => "&&",
            Token::LogicalOr => "||",
            Token::Increment => "++",
            Token::Decrement => "--",
            Token::AddAssign => "+=",
            Token::SubAssign => "-=",
            Token::MulAssign => "*=",
            Token::DivAssign => "/=",
            Token::ModAssign => "%=",
            Token::AndAssign => "&=",
            Token::OrAssign => "|=",
            Token::XorAssign => "^=",
            Token::ShlAssign => "<<=",
            Token::ShrAssign => ">>=",
            Token::HashHash => "##",
            _ => "",
        }
    }
}
