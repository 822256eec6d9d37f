//! Lexer for Flint source files.
//!
//! Indentation is significant, so tokenization runs per line: a pre-pass
//! turns leading indentation (one tab or four spaces per level) into
//! `Indent` tokens, `logos` scans the rest of the line, and every physical
//! line is closed with an `Eol` token. String and char lexemes are stored
//! without their quotes.

use flintc_core::{Token, TokenKind};
use logos::Logos;

use crate::diagnostics::{ParseError, ParseErrorKind};

/// Tokenize a whole source file. Lines and columns are 1-based.
pub fn lex(file: &str, source: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    for (line_idx, line) in source.lines().enumerate() {
        let line_no = line_idx as u32 + 1;
        let (indents, rest_start) = leading_indents(line);
        let rest = &line[rest_start..];

        let mut line_tokens = Vec::new();
        let mut lexer = TokenKind::lexer(rest);
        while let Some(result) = lexer.next() {
            let span = lexer.span();
            let column = indents + span.start as u32 + 1;
            match result {
                Ok(kind) => {
                    let lexeme = match kind {
                        TokenKind::StrValue | TokenKind::CharValue => {
                            lexer.slice()[1..lexer.slice().len() - 1].to_string()
                        }
                        _ => lexer.slice().to_string(),
                    };
                    line_tokens.push(Token::new(kind, lexeme, line_no, column));
                }
                Err(()) => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnexpectedToken {
                            lexeme: lexer.slice().to_string(),
                        },
                        file,
                        line_no,
                        column,
                    ));
                }
            }
        }
        // Blank and comment-only lines carry no layout information.
        if line_tokens.is_empty() {
            continue;
        }
        for level in 0..indents {
            tokens.push(Token::new(TokenKind::Indent, "\t", line_no, level + 1));
        }
        tokens.extend(line_tokens);
        let eol_column = indents + rest.len() as u32 + 1;
        tokens.push(Token::new(TokenKind::Eol, "\n", line_no, eol_column));
    }
    Ok(tokens)
}

/// Count leading indentation levels (tab or four spaces each) and return the
/// byte offset where the line content starts.
fn leading_indents(line: &str) -> (u32, usize) {
    let bytes = line.as_bytes();
    let mut levels = 0u32;
    let mut pos = 0usize;
    loop {
        if bytes.get(pos) == Some(&b'\t') {
            levels += 1;
            pos += 1;
        } else if bytes.len() >= pos + 4 && bytes[pos..pos + 4] == *b"    " {
            levels += 1;
            pos += 4;
        } else {
            break;
        }
    }
    (levels, pos)
}
