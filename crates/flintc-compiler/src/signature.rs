//! Token signature matching.
//!
//! Signatures are sequences of token-kind atoms with regex-like quantifiers
//! and alternations, matched over token slices. All matching is
//! cursor-based; the input is never mutated, which keeps lookahead and
//! backtracking cheap.

use flintc_core::{Token, TokenKind};

/// One atom of a signature.
#[derive(Debug, Clone)]
pub enum Pat {
    Kind(TokenKind),
    AnyOf(&'static [TokenKind]),
    /// Any single token.
    Any,
    Opt(Vec<Pat>),
    Star(Vec<Pat>),
    Alt(Vec<Vec<Pat>>),
}

/// A signature: a sequence of atoms matched in order.
#[derive(Debug, Clone)]
pub struct Signature(pub Vec<Pat>);

/// Half-open token index range.
pub type Range = (usize, usize);

const TYPE_KINDS: &[TokenKind] = &[
    TokenKind::TypeInt,
    TokenKind::Flint,
    TokenKind::TypeStr,
    TokenKind::TypeBool,
    TokenKind::TypeChar,
    TokenKind::TypeVoid,
    TokenKind::Identifier,
];

/// Single token that can denote a type.
pub fn type_token() -> Pat {
    Pat::AnyOf(TYPE_KINDS)
}

pub fn is_type_token(kind: TokenKind) -> bool {
    TYPE_KINDS.contains(&kind)
}

// Match `pats` starting at `pos`; returns all possible end positions,
// longest first (greedy quantifiers with backtracking).
fn match_seq(tokens: &[Token], pos: usize, pats: &[Pat]) -> Vec<usize> {
    let Some((first, rest)) = pats.split_first() else {
        return vec![pos];
    };
    let mut ends = Vec::new();
    for mid in match_pat(tokens, pos, first) {
        for end in match_seq(tokens, mid, rest) {
            if !ends.contains(&end) {
                ends.push(end);
            }
        }
    }
    ends
}

fn match_pat(tokens: &[Token], pos: usize, pat: &Pat) -> Vec<usize> {
    match pat {
        Pat::Kind(kind) => match tokens.get(pos) {
            Some(t) if t.kind == *kind => vec![pos + 1],
            _ => vec![],
        },
        Pat::AnyOf(kinds) => match tokens.get(pos) {
            Some(t) if kinds.contains(&t.kind) => vec![pos + 1],
            _ => vec![],
        },
        Pat::Any => {
            if pos < tokens.len() {
                vec![pos + 1]
            } else {
                vec![]
            }
        }
        Pat::Opt(inner) => {
            let mut ends = match_seq(tokens, pos, inner);
            if !ends.contains(&pos) {
                ends.push(pos);
            }
            ends
        }
        Pat::Star(inner) => {
            let mut ends = vec![pos];
            let mut frontier = vec![pos];
            while let Some(p) = frontier.pop() {
                for next in match_seq(tokens, p, inner) {
                    if next > p && !ends.contains(&next) {
                        ends.push(next);
                        frontier.push(next);
                    }
                }
            }
            ends.sort_unstable_by(|a, b| b.cmp(a));
            ends
        }
        Pat::Alt(branches) => {
            let mut ends = Vec::new();
            for branch in branches {
                for end in match_seq(tokens, pos, branch) {
                    if !ends.contains(&end) {
                        ends.push(end);
                    }
                }
            }
            ends
        }
    }
}

/// Whether the signature matches somewhere within the slice.
pub fn tokens_contain(tokens: &[Token], sig: &Signature) -> bool {
    (0..=tokens.len()).any(|pos| !match_seq(tokens, pos, &sig.0).is_empty())
}

/// Whether the signature matches the slice exactly, start to end.
pub fn tokens_match(tokens: &[Token], sig: &Signature) -> bool {
    match_seq(tokens, 0, &sig.0).contains(&tokens.len())
}

/// All non-overlapping match ranges, left to right, greedy.
pub fn get_match_ranges(tokens: &[Token], sig: &Signature) -> Vec<Range> {
    let mut ranges = Vec::new();
    let mut pos = 0;
    while pos < tokens.len() {
        match match_seq(tokens, pos, &sig.0).first() {
            Some(&end) if end > pos => {
                ranges.push((pos, end));
                pos = end;
            }
            _ => pos += 1,
        }
    }
    ranges
}

/// First match range at or after the start of the slice.
pub fn get_next_match_range(tokens: &[Token], sig: &Signature) -> Option<Range> {
    for pos in 0..tokens.len() {
        if let Some(&end) = match_seq(tokens, pos, &sig.0).first()
            && end > pos
        {
            return Some((pos, end));
        }
    }
    None
}

pub fn tokens_contain_in_range(tokens: &[Token], sig: &Signature, range: Range) -> bool {
    tokens_contain(&tokens[range.0..range.1], sig)
}

pub fn get_match_ranges_in_range(tokens: &[Token], sig: &Signature, range: Range) -> Vec<Range> {
    get_match_ranges(&tokens[range.0..range.1], sig)
        .into_iter()
        .map(|(a, b)| (a + range.0, b + range.0))
        .collect()
}

/// Lazy match from the start of the slice up to and including the first
/// match of `stop`. This is how statements are split on their terminator.
pub fn match_until(tokens: &[Token], stop: &Signature) -> Option<Range> {
    for pos in 0..tokens.len() {
        if let Some(&end) = match_seq(tokens, pos, &stop.0).first()
            && end > pos
        {
            return Some((0, end));
        }
    }
    None
}

/// First paren-balanced span `[open .. matching close]`, inclusive of both
/// delimiters. `None` when no balanced group exists.
pub fn balanced_range_extraction(
    tokens: &[Token],
    open: TokenKind,
    close: TokenKind,
) -> Option<Range> {
    let start = tokens.iter().position(|t| t.kind == open)?;
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate().skip(start) {
        if tok.kind == open {
            depth += 1;
        } else if tok.kind == close {
            depth -= 1;
            if depth == 0 {
                return Some((start, i + 1));
            }
        }
    }
    None
}

/// All top-level balanced spans, left to right.
pub fn balanced_range_extraction_all(
    tokens: &[Token],
    open: TokenKind,
    close: TokenKind,
) -> Vec<Range> {
    let mut ranges = Vec::new();
    let mut pos = 0;
    while pos < tokens.len() {
        match balanced_range_extraction(&tokens[pos..], open, close) {
            Some((a, b)) => {
                ranges.push((pos + a, pos + b));
                pos += b;
            }
            None => break,
        }
    }
    ranges
}

/// Number of leading `Indent` tokens of the given source line. `None` when
/// the line has no tokens.
pub fn get_leading_indents(tokens: &[Token], line: u32) -> Option<u32> {
    let start = tokens.iter().position(|t| t.line == line)?;
    let mut indents = 0;
    for tok in &tokens[start..] {
        if tok.line != line {
            break;
        }
        if tok.kind == TokenKind::Indent {
            indents += 1;
        } else {
            break;
        }
    }
    Some(indents)
}

/// Token index range of one source line.
pub fn get_line_token_range(tokens: &[Token], line: u32) -> Option<Range> {
    let start = tokens.iter().position(|t| t.line == line)?;
    let end = tokens[start..]
        .iter()
        .position(|t| t.line != line)
        .map(|i| start + i)
        .unwrap_or(tokens.len());
    Some((start, end))
}

/// Drop layout tokens (`Indent`, `Eol`) from a slice.
pub fn strip_layout(tokens: &[Token]) -> Vec<Token> {
    tokens
        .iter()
        .filter(|t| !matches!(t.kind, TokenKind::Indent | TokenKind::Eol))
        .cloned()
        .collect()
}

// The signatures the parser classifies with.

pub fn use_statement() -> Signature {
    Signature(vec![Pat::Kind(TokenKind::Use)])
}

pub fn function_definition() -> Signature {
    Signature(vec![
        Pat::Kind(TokenKind::Def),
        Pat::Kind(TokenKind::Identifier),
        Pat::Kind(TokenKind::LeftParen),
    ])
}

pub fn data_definition() -> Signature {
    Signature(vec![Pat::Kind(TokenKind::Data), Pat::Kind(TokenKind::Identifier)])
}

pub fn func_definition() -> Signature {
    Signature(vec![Pat::Kind(TokenKind::Func), Pat::Kind(TokenKind::Identifier)])
}

pub fn entity_definition() -> Signature {
    Signature(vec![Pat::Kind(TokenKind::Entity), Pat::Kind(TokenKind::Identifier)])
}

pub fn enum_definition() -> Signature {
    Signature(vec![Pat::Kind(TokenKind::Enum), Pat::Kind(TokenKind::Identifier)])
}

pub fn error_definition() -> Signature {
    Signature(vec![Pat::Kind(TokenKind::Error), Pat::Kind(TokenKind::Identifier)])
}

pub fn variant_definition() -> Signature {
    Signature(vec![Pat::Kind(TokenKind::Variant), Pat::Kind(TokenKind::Identifier)])
}

/// `data: Name` on one line marks a modular entity body; the monolithic form
/// puts nothing after the colon.
pub fn entity_body_modular() -> Signature {
    Signature(vec![
        Pat::Kind(TokenKind::Data),
        Pat::Kind(TokenKind::Colon),
        Pat::Kind(TokenKind::Identifier),
    ])
}

pub fn entity_body_constructor() -> Signature {
    Signature(vec![
        Pat::Kind(TokenKind::Identifier),
        Pat::Kind(TokenKind::LeftParen),
        Pat::Star(vec![Pat::AnyOf(&[TokenKind::Identifier, TokenKind::Comma])]),
        Pat::Kind(TokenKind::RightParen),
    ])
}

/// Dotted reference: `ident(.ident)*`, with `flint` allowed as the root.
pub fn reference() -> Signature {
    Signature(vec![
        Pat::AnyOf(&[TokenKind::Identifier, TokenKind::Flint]),
        Pat::Star(vec![Pat::Kind(TokenKind::Dot), Pat::Kind(TokenKind::Identifier)]),
    ])
}

pub fn declaration_explicit() -> Signature {
    Signature(vec![
        type_token(),
        Pat::Kind(TokenKind::Identifier),
        Pat::Kind(TokenKind::Equal),
    ])
}

pub fn declaration_inferred() -> Signature {
    Signature(vec![
        Pat::Kind(TokenKind::Identifier),
        Pat::Kind(TokenKind::ColonEqual),
    ])
}

pub fn assignment() -> Signature {
    Signature(vec![Pat::Kind(TokenKind::Identifier), Pat::Kind(TokenKind::Equal)])
}

pub fn return_statement() -> Signature {
    Signature(vec![Pat::Kind(TokenKind::Return)])
}

pub fn throw_statement() -> Signature {
    Signature(vec![Pat::Kind(TokenKind::Throw)])
}

pub fn function_call() -> Signature {
    Signature(vec![
        Pat::Kind(TokenKind::Identifier),
        Pat::Kind(TokenKind::LeftParen),
    ])
}

pub fn if_statement() -> Signature {
    Signature(vec![Pat::Kind(TokenKind::If)])
}

pub fn else_statement() -> Signature {
    Signature(vec![Pat::Kind(TokenKind::Else)])
}

pub fn while_loop() -> Signature {
    Signature(vec![Pat::Kind(TokenKind::While)])
}

pub fn for_loop() -> Signature {
    Signature(vec![Pat::Kind(TokenKind::For)])
}

pub fn catch_statement() -> Signature {
    Signature(vec![Pat::Kind(TokenKind::Catch)])
}

/// Statement terminator: `;` for flat statements, `:` for scoped ones.
pub fn statement_terminator() -> Signature {
    Signature(vec![Pat::Alt(vec![
        vec![Pat::Kind(TokenKind::Semicolon)],
        vec![Pat::Kind(TokenKind::Colon)],
    ])])
}
