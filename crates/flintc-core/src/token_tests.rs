//! Tests for token kind classification.

use super::TokenKind;

#[test]
fn binary_operator_classification() {
    assert!(TokenKind::Plus.is_binary_operator());
    assert!(TokenKind::EqualEqual.is_binary_operator());
    assert!(TokenKind::Less.is_binary_operator());
    assert!(!TokenKind::Equal.is_binary_operator());
    assert!(!TokenKind::Arrow.is_binary_operator());
}

#[test]
fn precedence_ordering() {
    assert!(TokenKind::Mult.precedence() > TokenKind::Plus.precedence());
    assert!(TokenKind::Plus.precedence() > TokenKind::Less.precedence());
    assert!(TokenKind::Less.precedence() > TokenKind::EqualEqual.precedence());
}

#[test]
fn literal_classification() {
    assert!(TokenKind::IntValue.is_literal());
    assert!(TokenKind::True.is_literal());
    assert!(TokenKind::StrValue.is_literal());
    assert!(!TokenKind::Identifier.is_literal());
}

#[test]
fn primitive_type_classification() {
    assert!(TokenKind::TypeInt.is_primitive_type());
    assert!(TokenKind::Flint.is_primitive_type());
    assert!(!TokenKind::Identifier.is_primitive_type());
}
