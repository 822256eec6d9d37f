//! Lexer tests.

use flintc_core::TokenKind;
use indoc::indoc;

use crate::lexer::lex;

fn kinds(source: &str) -> Vec<TokenKind> {
    lex("test.ft", source)
        .expect("lexes")
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

#[test]
fn keywords_and_punctuation() {
    let got = kinds("def main() -> int:\n");
    assert_eq!(
        got,
        vec![
            TokenKind::Def,
            TokenKind::Identifier,
            TokenKind::LeftParen,
            TokenKind::RightParen,
            TokenKind::Arrow,
            TokenKind::TypeInt,
            TokenKind::Colon,
            TokenKind::Eol,
        ]
    );
}

#[test]
fn indentation_becomes_leading_tokens() {
    let source = indoc! {"
        def f() -> int:
            return 1;
    "};
    let tokens = lex("test.ft", source).unwrap();
    let second_line: Vec<_> = tokens.iter().filter(|t| t.line == 2).collect();
    assert_eq!(second_line[0].kind, TokenKind::Indent);
    assert_eq!(second_line[1].kind, TokenKind::Return);
    // Four spaces count as one level.
    assert_eq!(
        second_line
            .iter()
            .filter(|t| t.kind == TokenKind::Indent)
            .count(),
        1
    );
}

#[test]
fn tabs_also_indent() {
    let tokens = lex("test.ft", "def f() -> int:\n\t\treturn 1;\n").unwrap();
    let indents = tokens
        .iter()
        .filter(|t| t.line == 2 && t.kind == TokenKind::Indent)
        .count();
    assert_eq!(indents, 2);
}

#[test]
fn lines_and_columns_are_one_based() {
    let tokens = lex("test.ft", "def f() -> int:\n").unwrap();
    assert_eq!(tokens[0].line, 1);
    assert_eq!(tokens[0].column, 1);
    let name = &tokens[1];
    assert_eq!(name.lexeme, "f");
    assert_eq!(name.column, 5);
}

#[test]
fn string_and_char_lexemes_drop_quotes() {
    let tokens = lex("test.ft", "x := \"hello\";\ny := 'c';\n").unwrap();
    let s = tokens.iter().find(|t| t.kind == TokenKind::StrValue).unwrap();
    assert_eq!(s.lexeme, "hello");
    let c = tokens.iter().find(|t| t.kind == TokenKind::CharValue).unwrap();
    assert_eq!(c.lexeme, "c");
}

#[test]
fn literal_kinds() {
    let got = kinds("1 2.5 true false\n");
    assert_eq!(
        got,
        vec![
            TokenKind::IntValue,
            TokenKind::FlintValue,
            TokenKind::True,
            TokenKind::False,
            TokenKind::Eol,
        ]
    );
}

#[test]
fn comments_and_blank_lines_vanish() {
    let source = indoc! {"
        // a file comment

        def f() -> int:
            // inner comment
            return 1;
    "};
    let tokens = lex("test.ft", source).unwrap();
    assert!(tokens.iter().all(|t| t.kind != TokenKind::Div));
    // Only the def line and the return line survive.
    let lines: std::collections::BTreeSet<u32> = tokens.iter().map(|t| t.line).collect();
    assert_eq!(lines.len(), 2);
}

#[test]
fn unknown_characters_are_fatal() {
    let err = lex("test.ft", "def f£x\n").unwrap_err();
    assert_eq!(err.line, 1);
    assert!(matches!(
        err.kind,
        crate::ParseErrorKind::UnexpectedToken { .. }
    ));
}
