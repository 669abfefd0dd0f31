//
// Copyright (c) 2025 Hemi Labs, Inc.
//
// This file is part of the shadertools-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use pest::{iterators::Pair, pratt_parser::PrattParser, Parser};

use super::ast::{Expr, Operator};

#[derive(pest_derive::Parser)]
#[grammar = "calc_util/grammar.pest"]
pub struct CalcParser;

pub type PestError = pest::error::Error<Rule>;

lazy_static::lazy_static! {
    static ref PRATT_PARSER: PrattParser<Rule> = {
        use pest::pratt_parser::{Assoc, Op};

        // Precedence is defined lowest to highest
        PrattParser::new()
            .op(Op::infix(Rule::lor, Assoc::Left))
            .op(Op::infix(Rule::land, Assoc::Left))
            .op(Op::infix(Rule::bor, Assoc::Left))
            .op(Op::infix(Rule::bxor, Assoc::Left))
            .op(Op::infix(Rule::band, Assoc::Left))
            .op(Op::infix(Rule::neq, Assoc::Left))
            .op(Op::infix(Rule::eq, Assoc::Left))
            .op(Op::infix(Rule::lt, Assoc::Left)
                | Op::infix(Rule::gt, Assoc::Left)
                | Op::infix(Rule::leq, Assoc::Left)
                | Op::infix(Rule::geq, Assoc::Left))
            .op(Op::infix(Rule::shl, Assoc::Left) | Op::infix(Rule::shr, Assoc::Left))
            .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
            .op(Op::infix(Rule::mul, Assoc::Left)
                | Op::infix(Rule::div, Assoc::Left)
                | Op::infix(Rule::modulus, Assoc::Left))
            .op(Op::prefix(Rule::neg)
                | Op::prefix(Rule::pos)
                | Op::prefix(Rule::complement)
                | Op::prefix(Rule::not))
    };
}

#[derive(Debug)]
pub struct ParseError {
    pub error: Box<PestError>,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for ParseError {}

impl From<PestError> for ParseError {
    fn from(error: PestError) -> Self {
        Self {
            error: Box::new(error),
        }
    }
}

type ParseResult<T> = Result<T, ParseError>;

fn custom_error(span: pest::Span, message: &str) -> ParseError {
    PestError::new_from_span(
        pest::error::ErrorVariant::CustomError {
            message: message.to_string(),
        },
        span,
    )
    .into()
}

fn first_child(pair: Pair<Rule>) -> Pair<Rule> {
    pair.into_inner().next().unwrap()
}

fn parse_int(pair: Pair<Rule>) -> ParseResult<Expr> {
    let text = pair.as_str();
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else if text.len() > 1 && text.starts_with('0') {
        i64::from_str_radix(&text[1..], 8)
    } else {
        text.parse()
    };
    match parsed {
        Ok(value) => Ok(Expr::IntLiteral(value)),
        Err(_) => Err(custom_error(pair.as_span(), "integer constant out of range")),
    }
}

fn parse_float(pair: Pair<Rule>) -> ParseResult<Expr> {
    let text = pair.as_str().trim_end_matches(&['f', 'F', 'h', 'H'][..]);
    match text.parse::<f64>() {
        Ok(value) => Ok(Expr::FloatLiteral(value)),
        Err(_) => Err(custom_error(pair.as_span(), "malformed float constant")),
    }
}

fn parse_primary(pair: Pair<Rule>) -> ParseResult<Expr> {
    let inner = first_child(pair);
    match inner.as_rule() {
        Rule::int => parse_int(inner),
        Rule::float => parse_float(inner),
        Rule::string => {
            let text = inner.as_str();
            Ok(Expr::StringLiteral(text[1..text.len() - 1].to_string()))
        }
        Rule::identifier => Ok(Expr::Identifier(inner.as_str().to_string())),
        Rule::paren => parse_expr(first_child(inner)),
        _ => unreachable!(),
    }
}

fn parse_arith(pair: Pair<Rule>) -> ParseResult<Expr> {
    PRATT_PARSER
        .map_primary(|primary| match primary.as_rule() {
            Rule::primary => parse_primary(primary),
            _ => unreachable!(),
        })
        .map_prefix(|op, rhs| {
            let rhs = rhs?;
            Ok(match op.as_rule() {
                Rule::neg => Expr::unary(Operator::Negate, rhs),
                Rule::pos => rhs, // unary plus drops out of the tree
                Rule::complement => Expr::unary(Operator::Complement, rhs),
                Rule::not => Expr::unary(Operator::Not, rhs),
                _ => unreachable!(),
            })
        })
        .map_infix(|left, op, right| {
            let operator = match op.as_rule() {
                Rule::lor => Operator::LogicalOr,
                Rule::land => Operator::LogicalAnd,
                Rule::bor => Operator::BinaryOr,
                Rule::bxor => Operator::BinaryXor,
                Rule::band => Operator::BinaryAnd,
                Rule::neq => Operator::NotEqual,
                Rule::eq => Operator::Equal,
                Rule::lt => Operator::LessThan,
                Rule::gt => Operator::GreaterThan,
                Rule::leq => Operator::LessThanOrEqual,
                Rule::geq => Operator::GreaterThanOrEqual,
                Rule::shl => Operator::LeftShift,
                Rule::shr => Operator::RightShift,
                Rule::add => Operator::Add,
                Rule::sub => Operator::Subtract,
                Rule::mul => Operator::Multiply,
                Rule::div => Operator::Divide,
                Rule::modulus => Operator::Modulo,
                _ => unreachable!(),
            };
            Ok(Expr::binary(operator, left?, right?))
        })
        .parse(pair.into_inner())
}

fn parse_expr(pair: Pair<Rule>) -> ParseResult<Expr> {
    // expression -> conditional -> arith ("?" expression ":" expression)?
    let conditional = first_child(pair);
    let mut inner = conditional.into_inner();
    let cond = parse_arith(inner.next().unwrap())?;
    match (inner.next(), inner.next()) {
        (Some(center), Some(right)) => Ok(Expr::ternary(
            Operator::Conditional,
            cond,
            parse_expr(center)?,
            parse_expr(right)?,
        )),
        _ => Ok(cond),
    }
}

/// Parse one complete expression.
pub fn parse_expression(text: &str) -> Result<Expr, ParseError> {
    let mut pairs = CalcParser::parse(Rule::program, text)?;
    let program = pairs.next().unwrap();
    parse_expr(first_child(program))
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(input: &str) -> Expr {
        parse_expression(input).expect("error parsing expression")
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse("42"), Expr::IntLiteral(42));
        assert_eq!(parse("0x2a"), Expr::IntLiteral(42));
        assert_eq!(parse("052"), Expr::IntLiteral(42));
        assert_eq!(parse("1.5"), Expr::FloatLiteral(1.5));
        assert_eq!(parse("2.5f"), Expr::FloatLiteral(2.5));
        assert_eq!(parse("1e3"), Expr::FloatLiteral(1000.0));
        assert_eq!(
            parse("\"hi there\""),
            Expr::StringLiteral("hi there".to_string())
        );
        assert_eq!(parse("foo"), Expr::Identifier("foo".to_string()));
    }

    #[test]
    fn test_precedence() {
        // 1+2*3 parses as 1+(2*3)
        assert_eq!(
            parse("1+2*3"),
            Expr::binary(
                Operator::Add,
                Expr::IntLiteral(1),
                Expr::binary(Operator::Multiply, Expr::IntLiteral(2), Expr::IntLiteral(3)),
            )
        );
        // shifts bind tighter than comparisons
        assert_eq!(
            parse("1<<4 == 16"),
            Expr::binary(
                Operator::Equal,
                Expr::binary(Operator::LeftShift, Expr::IntLiteral(1), Expr::IntLiteral(4)),
                Expr::IntLiteral(16),
            )
        );
    }

    #[test]
    fn test_left_associativity() {
        assert_eq!(
            parse("10-2-3"),
            Expr::binary(
                Operator::Subtract,
                Expr::binary(Operator::Subtract, Expr::IntLiteral(10), Expr::IntLiteral(2)),
                Expr::IntLiteral(3),
            )
        );
    }

    #[test]
    fn test_parens_override() {
        assert_eq!(
            parse("(1+2)*3"),
            Expr::binary(
                Operator::Multiply,
                Expr::binary(Operator::Add, Expr::IntLiteral(1), Expr::IntLiteral(2)),
                Expr::IntLiteral(3),
            )
        );
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(
            parse("-x"),
            Expr::unary(Operator::Negate, Expr::Identifier("x".to_string()))
        );
        assert_eq!(
            parse("~0"),
            Expr::unary(Operator::Complement, Expr::IntLiteral(0))
        );
        assert_eq!(
            parse("!!1"),
            Expr::unary(
                Operator::Not,
                Expr::unary(Operator::Not, Expr::IntLiteral(1))
            )
        );
        // unary plus vanishes
        assert_eq!(parse("+7"), Expr::IntLiteral(7));
    }

    #[test]
    fn test_ternary() {
        let expr = parse("1 ? 2 : 3");
        assert_eq!(
            expr,
            Expr::ternary(
                Operator::Conditional,
                Expr::IntLiteral(1),
                Expr::IntLiteral(2),
                Expr::IntLiteral(3),
            )
        );
        // else arm nests to the right
        let expr = parse("1 ? 2 : 0 ? 3 : 4");
        match expr {
            Expr::Ternary { right, .. } => assert!(matches!(*right, Expr::Ternary { .. })),
            other => panic!("expected ternary, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_errors() {
        parse_expression("1 +").unwrap_err();
        parse_expression("(1").unwrap_err();
        parse_expression("1 = 2").unwrap_err();
        parse_expression("").unwrap_err();
    }
}
