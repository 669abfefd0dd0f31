//
// Copyright (c) 2025 Hemi Labs, Inc.
//
// This file is part of the shadertools-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use super::ast::{Expr, Operator};

fn truth(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Numerically evaluate an expression tree.
///
/// Arithmetic runs in f64. Bitwise, shift and modulo operators coerce
/// through i64 and back. Logical operators and comparisons yield
/// 1.0/0.0; the conditional picks its arm by `!= 0.0`. Identifiers and
/// string literals have no storage behind them and read as 0.
pub fn run_expr(expr: &Expr) -> f64 {
    match expr {
        Expr::IntLiteral(value) => *value as f64,
        Expr::FloatLiteral(value) => *value,
        Expr::StringLiteral(_) | Expr::Identifier(_) => 0.0,
        Expr::Unary { op, operand } => {
            let value = run_expr(operand);
            match op {
                Operator::Negate => -value,
                Operator::Complement => !(value as i64) as f64,
                Operator::Not => truth(value == 0.0),
                _ => unreachable!("not a unary operator"),
            }
        }
        Expr::Binary { op, left, right } => {
            let l = run_expr(left);
            let r = run_expr(right);
            match op {
                Operator::Multiply => l * r,
                Operator::Divide => l / r,
                Operator::Modulo => {
                    let rhs = r as i64;
                    if rhs == 0 {
                        0.0
                    } else {
                        ((l as i64) % rhs) as f64
                    }
                }
                Operator::Add => l + r,
                Operator::Subtract => l - r,
                Operator::LeftShift => ((l as i64).wrapping_shl((r as i64) as u32)) as f64,
                Operator::RightShift => ((l as i64).wrapping_shr((r as i64) as u32)) as f64,
                Operator::LessThan => truth(l < r),
                Operator::GreaterThan => truth(l > r),
                Operator::LessThanOrEqual => truth(l <= r),
                Operator::GreaterThanOrEqual => truth(l >= r),
                Operator::Equal => truth(l == r),
                Operator::NotEqual => truth(l != r),
                Operator::BinaryAnd => ((l as i64) & (r as i64)) as f64,
                Operator::BinaryXor => ((l as i64) ^ (r as i64)) as f64,
                Operator::BinaryOr => ((l as i64) | (r as i64)) as f64,
                Operator::LogicalAnd => truth(l != 0.0 && r != 0.0),
                Operator::LogicalOr => truth(l != 0.0 || r != 0.0),
                _ => unreachable!("not a binary operator"),
            }
        }
        Expr::Ternary {
            left,
            center,
            right,
            ..
        } => {
            if run_expr(left) != 0.0 {
                run_expr(center)
            } else {
                run_expr(right)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::super::parser::parse_expression;
    use super::*;

    fn eval(input: &str) -> f64 {
        run_expr(&parse_expression(input).expect("error parsing expression"))
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1+2*3"), 7.0);
        assert_eq!(eval("(1+2)*3"), 9.0);
        assert_eq!(eval("10-2-3"), 5.0);
        assert_eq!(eval("7/2"), 3.5);
        assert_eq!(eval("1.5 + 2.5"), 4.0);
    }

    #[test]
    fn test_integer_coercions() {
        assert_eq!(eval("5 % 2"), 1.0);
        assert_eq!(eval("1 << 4"), 16.0);
        assert_eq!(eval("256 >> 4"), 16.0);
        assert_eq!(eval("3 & 2"), 2.0);
        assert_eq!(eval("1 | 2"), 3.0);
        assert_eq!(eval("3 ^ 1"), 2.0);
        assert_eq!(eval("~0"), -1.0);
    }

    #[test]
    fn test_logical() {
        assert_eq!(eval("1 && 2"), 1.0);
        assert_eq!(eval("1 && 0"), 0.0);
        assert_eq!(eval("0 || 3"), 1.0);
        assert_eq!(eval("!0"), 1.0);
        assert_eq!(eval("!5"), 0.0);
        assert_eq!(eval("2 != 3"), 1.0);
        assert_eq!(eval("2 == 3"), 0.0);
    }

    #[test]
    fn test_conditional() {
        assert_eq!(eval("(1<2) ? 10 : 20"), 10.0);
        assert_eq!(eval("(1>2) ? 10 : 20"), 20.0);
        assert_eq!(eval("0 ? 1 : 0 ? 2 : 3"), 3.0);
    }

    #[test]
    fn test_leaves_without_storage() {
        assert_eq!(eval("foo"), 0.0);
        assert_eq!(eval("\"str\""), 0.0);
        assert_eq!(eval("foo + 1"), 1.0);
    }

    #[test]
    fn test_division_edges() {
        assert_eq!(eval("1/0"), f64::INFINITY);
        assert_eq!(eval("5 % 0"), 0.0);
    }

    #[test]
    fn test_negation() {
        assert_eq!(eval("-3+5"), 2.0);
        assert_eq!(eval("-(2*3)"), -6.0);
    }
}
