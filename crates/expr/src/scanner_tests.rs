// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn finds_simple_command_substitution() {
    let spans = find_command_substitutions("echo $(date)");
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].whole("echo $(date)"), "$(date)");
    assert_eq!(spans[0].inner("echo $(date)"), "date");
}

#[test]
fn handles_nested_parens() {
    let s = "$(echo $(echo 1))";
    let spans = find_command_substitutions(s);
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].whole(s), s);
}

#[test]
fn unmatched_close_paren_inside_double_quotes_does_not_close_early() {
    let s = r#"$(echo ")")"#;
    let spans = find_command_substitutions(s);
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].whole(s), s);
}

#[test]
fn unmatched_close_paren_inside_single_quotes_does_not_close_early() {
    let s = "$(echo ')')";
    let spans = find_command_substitutions(s);
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].whole(s), s);
}

#[test]
fn backslash_escapes_a_quote_inside_double_quotes() {
    let s = r#"$(echo "a\"b)")"#;
    let spans = find_command_substitutions(s);
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].whole(s), s);
}

#[test]
fn unmatched_open_paren_is_left_as_literal() {
    let spans = find_command_substitutions("prefix $(unclosed");
    assert!(spans.is_empty());
}

#[test]
fn finds_multiple_non_overlapping_spans() {
    let s = "$(one) mid $(two)";
    let spans = find_command_substitutions(s);
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].inner(s), "one");
    assert_eq!(spans[1].inner(s), "two");
}

#[test]
fn finds_expression_span() {
    let s = "hello ${{ name }}!";
    let spans = find_expression_spans(s);
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].expr_inner(s), "name");
}

#[test]
fn expression_span_with_coalesce() {
    let s = "${{ x ?? y }}";
    let spans = find_expression_spans(s);
    assert_eq!(spans[0].expr_inner(s), "x ?? y");
}

#[test]
fn no_spans_in_plain_text() {
    assert!(find_command_substitutions("plain text").is_empty());
    assert!(find_expression_spans("plain text").is_empty());
}
