//! Expression constructors.

use flintc_core::{Token, TokenKind};

use crate::ast::{BinaryOpNode, CallId, ExpressionNode, LiteralValue, VariableNode};
use crate::diagnostics::{ParseError, ParseErrorKind};
use crate::signature as sig;

use super::Parser;

impl Parser<'_> {
    pub(super) fn create_expression(
        &mut self,
        scope: crate::ast::ScopeId,
        tokens: &[Token],
    ) -> Result<ExpressionNode, ParseError> {
        let anchor = tokens.first().cloned();
        let mut toks = sig::strip_layout(tokens);
        while toks.last().is_some_and(|t| t.kind == TokenKind::Semicolon) {
            toks.pop();
        }
        // Surrounding parens are transparent, but only when they wrap the
        // whole expression.
        while toks.first().is_some_and(|t| t.kind == TokenKind::LeftParen)
            && sig::balanced_range_extraction(&toks, TokenKind::LeftParen, TokenKind::RightParen)
                == Some((0, toks.len()))
        {
            toks = toks[1..toks.len() - 1].to_vec();
        }
        if toks.is_empty() {
            return Err(self.err_at(ParseErrorKind::UndefinedExpression, anchor.as_ref()));
        }
        let mut depth = 0i32;
        for tok in &toks {
            match tok.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                return Err(self.err_at(ParseErrorKind::UnclosedParen, Some(tok)));
            }
        }
        if depth != 0 {
            return Err(self.err_at(ParseErrorKind::UnclosedParen, toks.first()));
        }

        if is_whole_call(&toks) {
            let call_id = self.create_call_expression(scope, &toks)?;
            return Ok(ExpressionNode::Call(call_id));
        }
        if let Some(idx) = top_level_operator(&toks)
            && idx > 0
        {
            return self.create_binary_op(scope, &toks);
        }
        if toks.first().is_some_and(|t| t.kind == TokenKind::Minus) {
            return Err(self.err_at(
                ParseErrorKind::NotImplementedYet {
                    what: "unary operators".to_string(),
                },
                toks.first(),
            ));
        }
        if toks.iter().any(|t| t.kind.is_literal()) {
            return self.create_literal(&toks);
        }
        if toks.len() == 1 && toks[0].kind == TokenKind::Identifier {
            return self.create_variable(scope, &toks[0]);
        }
        Err(self.err_at(ParseErrorKind::UndefinedExpression, toks.first()))
    }

    fn create_variable(
        &mut self,
        scope: crate::ast::ScopeId,
        token: &Token,
    ) -> Result<ExpressionNode, ParseError> {
        let Some((type_str, _)) = self.session.scopes.variable(scope, &token.lexeme) else {
            return Err(self.err_at(
                ParseErrorKind::VarNotDeclared {
                    name: token.lexeme.clone(),
                },
                Some(token),
            ));
        };
        Ok(ExpressionNode::Variable(VariableNode {
            name: token.lexeme.clone(),
            type_str: type_str.clone(),
        }))
    }

    fn create_literal(&mut self, tokens: &[Token]) -> Result<ExpressionNode, ParseError> {
        let tok = tokens
            .iter()
            .find(|t| t.kind.is_literal())
            .expect("caller checked for a literal");
        let (value, type_str) = match tok.kind {
            TokenKind::IntValue => {
                let v = tok.lexeme.parse::<i64>().map_err(|_| {
                    self.err_at(
                        ParseErrorKind::UnknownLiteral {
                            lexeme: tok.lexeme.clone(),
                        },
                        Some(tok),
                    )
                })?;
                (LiteralValue::Int(v), "int")
            }
            TokenKind::FlintValue => {
                let v = tok.lexeme.parse::<f64>().map_err(|_| {
                    self.err_at(
                        ParseErrorKind::UnknownLiteral {
                            lexeme: tok.lexeme.clone(),
                        },
                        Some(tok),
                    )
                })?;
                (LiteralValue::Flint(v), "flint")
            }
            TokenKind::StrValue => (LiteralValue::Str(tok.lexeme.clone()), "str"),
            TokenKind::True => (LiteralValue::Bool(true), "bool"),
            TokenKind::False => (LiteralValue::Bool(false), "bool"),
            TokenKind::CharValue => (
                LiteralValue::Char(tok.lexeme.chars().next().unwrap_or('\0')),
                "char",
            ),
            _ => {
                return Err(self.err_at(
                    ParseErrorKind::UnknownLiteral {
                        lexeme: tok.lexeme.clone(),
                    },
                    Some(tok),
                ));
            }
        };
        Ok(ExpressionNode::Literal {
            value,
            type_str: type_str.to_string(),
        })
    }

    /// Splits at the first operator unless the second binds looser; operand
    /// types must agree.
    fn create_binary_op(
        &mut self,
        scope: crate::ast::ScopeId,
        tokens: &[Token],
    ) -> Result<ExpressionNode, ParseError> {
        let mut first_op: Option<(usize, TokenKind)> = None;
        let mut second_op: Option<(usize, TokenKind)> = None;
        let mut i = 0;
        while i < tokens.len() {
            let tok = &tokens[i];
            if tok.kind == TokenKind::LeftParen
                || (tok.kind == TokenKind::Identifier
                    && tokens.get(i + 1).is_some_and(|t| t.kind == TokenKind::LeftParen))
            {
                // Skip over grouped and call sub-expressions.
                let group = sig::balanced_range_extraction(
                    &tokens[i..],
                    TokenKind::LeftParen,
                    TokenKind::RightParen,
                )
                .ok_or_else(|| self.err_at(ParseErrorKind::UnclosedParen, Some(tok)))?;
                i += group.1;
                continue;
            }
            if tok.kind.is_binary_operator() {
                if first_op.is_none() {
                    first_op = Some((i, tok.kind));
                } else {
                    second_op = Some((i, tok.kind));
                    break;
                }
            }
            i += 1;
        }

        let (first_idx, first_kind) =
            first_op.ok_or_else(|| self.err_at(ParseErrorKind::UndefinedExpression, tokens.first()))?;
        let (split_idx, operator) = match second_op {
            Some((second_idx, second_kind))
                if first_kind.precedence() > second_kind.precedence() =>
            {
                (second_idx, second_kind)
            }
            _ => (first_idx, first_kind),
        };

        let lhs = self.create_expression(scope, &tokens[..split_idx])?;
        let rhs = self.create_expression(scope, &tokens[split_idx + 1..])?;
        let lhs_type = lhs.type_str(&self.session.calls);
        let rhs_type = rhs.type_str(&self.session.calls);
        if lhs_type != rhs_type {
            return Err(self.err_at(
                ParseErrorKind::ExprBinopTypeMismatch {
                    lhs: lhs_type,
                    rhs: rhs_type,
                },
                tokens.get(split_idx),
            ));
        }

        Ok(ExpressionNode::Binary(BinaryOpNode {
            operator,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            type_str: lhs_type,
        }))
    }

    /// Shared base of call statements and call expressions; registers the
    /// call and remembers it as the most recent one.
    pub(super) fn create_call_expression(
        &mut self,
        scope: crate::ast::ScopeId,
        tokens: &[Token],
    ) -> Result<CallId, ParseError> {
        let arg_range = sig::balanced_range_extraction(
            tokens,
            TokenKind::LeftParen,
            TokenKind::RightParen,
        )
        .ok_or_else(|| self.err_at(ParseErrorKind::UnclosedParen, tokens.first()))?;

        let function_name = tokens
            .iter()
            .find(|t| t.kind == TokenKind::Identifier)
            .map(|t| t.lexeme.clone())
            .ok_or_else(|| self.err_at(ParseErrorKind::UndefinedExpression, tokens.first()))?;

        let inner = &tokens[arg_range.0 + 1..arg_range.1 - 1];
        let mut arguments = Vec::new();
        for segment in split_top_level_commas(inner) {
            let expr = self.create_expression(scope, segment)?;
            arguments.push(expr);
        }

        let return_type = self.session.function_types.get(&function_name).cloned();
        let call_id =
            self.session
                .calls
                .register(scope, function_name, arguments, return_type);
        self.last_parsed_call = Some(call_id);
        Ok(call_id)
    }
}

/// `name(...)` covering the whole slice.
fn is_whole_call(tokens: &[Token]) -> bool {
    tokens.len() >= 3
        && tokens[0].kind == TokenKind::Identifier
        && tokens[1].kind == TokenKind::LeftParen
        && sig::balanced_range_extraction(tokens, TokenKind::LeftParen, TokenKind::RightParen)
            == Some((1, tokens.len()))
}

/// First binary operator outside any parenthesized group.
fn top_level_operator(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate() {
        match tok.kind {
            TokenKind::LeftParen => depth += 1,
            TokenKind::RightParen => depth = depth.saturating_sub(1),
            k if depth == 0 && k.is_binary_operator() => return Some(i),
            _ => {}
        }
    }
    None
}

/// Split on commas at paren depth zero; empty input yields no segments.
fn split_top_level_commas(tokens: &[Token]) -> Vec<&[Token]> {
    if tokens.is_empty() {
        return Vec::new();
    }
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, tok) in tokens.iter().enumerate() {
        match tok.kind {
            TokenKind::LeftParen => depth += 1,
            TokenKind::RightParen => depth = depth.saturating_sub(1),
            TokenKind::Comma if depth == 0 => {
                segments.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&tokens[start..]);
    segments
}
