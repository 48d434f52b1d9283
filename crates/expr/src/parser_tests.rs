// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parses_dotted_path() {
    assert_eq!(
        parse("job.result").unwrap(),
        Expr::Path(vec!["job".into(), "result".into()])
    );
}

#[test]
fn parses_coalesce_as_lowest_precedence() {
    let expr = parse("a == b ?? c").unwrap();
    match expr {
        Expr::Binary(left, BinaryOp::Coalesce, right) => {
            assert!(matches!(*left, Expr::Binary(_, BinaryOp::Eq, _)));
            assert_eq!(*right, Expr::Path(vec!["c".into()]));
        }
        other => panic!("expected coalesce at top, got {other:?}"),
    }
}

#[test]
fn parses_arithmetic_precedence() {
    let expr = parse("1 + 2 * 3").unwrap();
    assert_eq!(
        expr,
        Expr::Binary(
            Box::new(Expr::Number(1.0)),
            BinaryOp::Add,
            Box::new(Expr::Binary(
                Box::new(Expr::Number(2.0)),
                BinaryOp::Mul,
                Box::new(Expr::Number(3.0))
            ))
        )
    );
}

#[test]
fn parses_parenthesized_expression() {
    let expr = parse("(1 + 2) * 3").unwrap();
    assert_eq!(
        expr,
        Expr::Binary(
            Box::new(Expr::Binary(
                Box::new(Expr::Number(1.0)),
                BinaryOp::Add,
                Box::new(Expr::Number(2.0))
            )),
            BinaryOp::Mul,
            Box::new(Expr::Number(3.0))
        )
    );
}

#[test]
fn parses_unary_not_and_neg() {
    assert_eq!(
        parse("!x").unwrap(),
        Expr::Unary(UnaryOp::Not, Box::new(Expr::Path(vec!["x".into()])))
    );
    assert_eq!(
        parse("-5").unwrap(),
        Expr::Unary(UnaryOp::Neg, Box::new(Expr::Number(5.0)))
    );
}

#[test]
fn parses_function_call_with_args() {
    assert_eq!(
        parse("contains(x, 'a')").unwrap(),
        Expr::Call(
            "contains".into(),
            vec![Expr::Path(vec!["x".into()]), Expr::Str("a".into())]
        )
    );
}

#[test]
fn parses_call_with_no_args() {
    assert_eq!(parse("length()").unwrap(), Expr::Call("length".into(), vec![]));
}

#[test]
fn trailing_garbage_is_an_error() {
    assert!(parse("1 2").is_err());
}
