//
// Copyright (c) 2025 Hemi Labs, Inc.
//
// This file is part of the shadertools-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use std::fmt::Write;

/// Operator tags carried by interior AST nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    // unary
    Negate,
    Complement,
    Not,
    // binary
    Multiply,
    Divide,
    Modulo,
    Add,
    Subtract,
    LeftShift,
    RightShift,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Equal,
    NotEqual,
    BinaryAnd,
    BinaryXor,
    BinaryOr,
    LogicalAnd,
    LogicalOr,
    // ternary
    Conditional,
}

/// Expression tree: unary/binary/ternary interior nodes over
/// identifier, integer, float and string leaves.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Unary {
        op: Operator,
        operand: Box<Expr>,
    },
    Binary {
        op: Operator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Ternary {
        op: Operator,
        left: Box<Expr>,
        center: Box<Expr>,
        right: Box<Expr>,
    },
    Identifier(String),
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),
}

impl Expr {
    pub fn unary(op: Operator, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: Operator, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn ternary(op: Operator, left: Expr, center: Expr, right: Expr) -> Self {
        Expr::Ternary {
            op,
            left: Box::new(left),
            center: Box::new(center),
            right: Box::new(right),
        }
    }

    /// Structural dump, one node per line, children indented.
    pub fn tree(&self) -> String {
        let mut out = String::new();
        self.write_tree(&mut out, 0);
        out
    }

    fn write_tree(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str("    ");
        }
        out.push_str("Expression ");
        match self {
            Expr::Unary { op, operand } => {
                let _ = writeln!(out, "{:?}", op);
                operand.write_tree(out, depth + 1);
            }
            Expr::Binary { op, left, right } => {
                let _ = writeln!(out, "{:?}", op);
                left.write_tree(out, depth + 1);
                right.write_tree(out, depth + 1);
            }
            Expr::Ternary {
                op,
                left,
                center,
                right,
            } => {
                let _ = writeln!(out, "{:?}", op);
                left.write_tree(out, depth + 1);
                center.write_tree(out, depth + 1);
                right.write_tree(out, depth + 1);
            }
            Expr::Identifier(name) => {
                out.push_str("Identifier\n");
                Self::write_leaf(out, depth + 1, name);
            }
            Expr::IntLiteral(value) => {
                out.push_str("IntLiteral\n");
                Self::write_leaf(out, depth + 1, &value.to_string());
            }
            Expr::FloatLiteral(value) => {
                out.push_str("FloatLiteral\n");
                Self::write_leaf(out, depth + 1, &value.to_string());
            }
            Expr::StringLiteral(value) => {
                out.push_str("StringLiteral\n");
                Self::write_leaf(out, depth + 1, &format!("\"{}\"", value));
            }
        }
    }

    fn write_leaf(out: &mut String, depth: usize, text: &str) {
        for _ in 0..depth {
            out.push_str("    ");
        }
        let _ = writeln!(out, "({})", text);
    }
}
