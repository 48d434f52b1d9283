// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn lexes_identifiers_and_dots() {
    let tokens = lex("a.b.c").unwrap();
    assert_eq!(
        tokens,
        vec![
            Token::Ident("a".into()),
            Token::Dot,
            Token::Ident("b".into()),
            Token::Dot,
            Token::Ident("c".into()),
            Token::Eof,
        ]
    );
}

#[test]
fn lexes_coalesce_and_literals() {
    let tokens = lex("x ?? 'fallback'").unwrap();
    assert_eq!(
        tokens,
        vec![
            Token::Ident("x".into()),
            Token::Coalesce,
            Token::Str("fallback".into()),
            Token::Eof,
        ]
    );
}

#[test]
fn lexes_keywords() {
    assert_eq!(lex("true").unwrap()[0], Token::True);
    assert_eq!(lex("false").unwrap()[0], Token::False);
    assert_eq!(lex("null").unwrap()[0], Token::Null);
}

#[test]
fn lexes_comparison_and_logical_operators() {
    let tokens = lex("a == b && c != d || e").unwrap();
    assert!(tokens.contains(&Token::EqEq));
    assert!(tokens.contains(&Token::AndAnd));
    assert!(tokens.contains(&Token::NotEq));
    assert!(tokens.contains(&Token::OrOr));
}

#[test]
fn lexes_escaped_quote_in_string() {
    let tokens = lex(r#"'a\'b'"#).unwrap();
    assert_eq!(tokens[0], Token::Str("a'b".to_string()));
}

#[test]
fn unterminated_string_is_an_error() {
    assert!(lex("'unterminated").is_err());
}

#[test]
fn lexes_number_literal() {
    assert_eq!(lex("42").unwrap()[0], Token::Number(42.0));
    assert_eq!(lex("3.5").unwrap()[0], Token::Number(3.5));
}
