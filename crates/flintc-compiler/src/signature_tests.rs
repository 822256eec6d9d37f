//! Signature matcher tests.

use flintc_core::TokenKind;

use crate::lexer::lex;
use crate::signature::{
    self as sig, Pat, Signature, balanced_range_extraction, balanced_range_extraction_all,
    get_leading_indents, get_match_ranges, match_until, tokens_contain, tokens_match,
};

fn toks(source: &str) -> Vec<flintc_core::Token> {
    lex("test.ft", source).expect("lexes")
}

#[test]
fn contain_finds_interior_matches() {
    let tokens = toks("const def f() -> int:\n");
    assert!(tokens_contain(&tokens, &sig::function_definition()));
    assert!(!tokens_contain(&tokens, &sig::data_definition()));
}

#[test]
fn exact_match_requires_full_span() {
    let tokens = toks("x\n");
    let ident_only = Signature(vec![Pat::Kind(TokenKind::Identifier)]);
    assert!(!tokens_match(&tokens, &ident_only)); // trailing Eol
    assert!(tokens_match(&tokens[..1], &ident_only));
}

#[test]
fn star_quantifier_is_greedy() {
    let tokens = toks("a.b.c\n");
    let reference = sig::reference();
    let ranges = get_match_ranges(&tokens, &reference);
    assert_eq!(ranges.len(), 1);
    assert_eq!(ranges[0], (0, 5)); // a . b . c
}

#[test]
fn alternation_matches_either_branch() {
    let term = sig::statement_terminator();
    assert!(tokens_contain(&toks("x;\n"), &term));
    assert!(tokens_contain(&toks("x:\n"), &term));
    assert!(!tokens_contain(&toks("x\n"), &term));
}

#[test]
fn match_until_includes_the_terminator() {
    let tokens = toks("int x = 1; y = 2;\n");
    let range = match_until(&tokens, &sig::statement_terminator()).unwrap();
    assert_eq!(range.0, 0);
    assert_eq!(tokens[range.1 - 1].kind, TokenKind::Semicolon);
    assert_eq!(tokens[range.1].lexeme, "y");
}

#[test]
fn balanced_extraction_handles_nesting() {
    let tokens = toks("f(g(a, b), c)\n");
    let range =
        balanced_range_extraction(&tokens, TokenKind::LeftParen, TokenKind::RightParen).unwrap();
    assert_eq!(tokens[range.0].kind, TokenKind::LeftParen);
    assert_eq!(tokens[range.1 - 1].kind, TokenKind::RightParen);
    // The outermost group spans everything between the first '(' and the
    // final ')'.
    assert_eq!(range, (1, tokens.len() - 1));
}

#[test]
fn balanced_extraction_reports_unclosed() {
    let tokens = toks("f(g(a)\n");
    assert_eq!(
        balanced_range_extraction(&tokens, TokenKind::LeftParen, TokenKind::RightParen),
        None
    );
}

#[test]
fn balanced_extraction_all_finds_sibling_groups() {
    let tokens = toks("(a) + (b)\n");
    let ranges =
        balanced_range_extraction_all(&tokens, TokenKind::LeftParen, TokenKind::RightParen);
    assert_eq!(ranges.len(), 2);
}

#[test]
fn leading_indents_per_line() {
    let tokens = toks("def f() -> int:\n        return 1;\n");
    assert_eq!(get_leading_indents(&tokens, 1), Some(0));
    assert_eq!(get_leading_indents(&tokens, 2), Some(2));
    assert_eq!(get_leading_indents(&tokens, 3), None);
}

#[test]
fn opt_quantifier_allows_absence() {
    let with_modifier = toks("const def f() -> int:\n");
    let without = toks("def f() -> int:\n");
    let pattern = Signature(vec![
        Pat::Opt(vec![Pat::Kind(TokenKind::Const)]),
        Pat::Kind(TokenKind::Def),
    ]);
    assert!(tokens_contain(&with_modifier, &pattern));
    assert!(tokens_contain(&without, &pattern));
}
