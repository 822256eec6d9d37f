//! Statement constructors.
//!
//! Bodies split on the statement terminator signature `(; | :)`:
//! colon-terminated statements are scoped (if/else, loops, catch) and pull
//! their own body block; semicolon-terminated statements are flat.

use flintc_core::{Token, TokenKind};

use crate::ast::{
    AssignmentNode, CatchNode, DeclarationNode, ElseBranch, IfNode, ReturnNode, ScopeId,
    StatementNode, ThrowNode, WhileNode,
};
use crate::diagnostics::{ParseError, ParseErrorKind};
use crate::signature as sig;

use super::Parser;

impl Parser<'_> {
    pub(super) fn create_body(
        &mut self,
        scope: ScopeId,
        tokens: &[Token],
    ) -> Result<Vec<StatementNode>, ParseError> {
        let mut statements = Vec::new();
        let terminator = sig::statement_terminator();
        let mut cursor = 0usize;
        while let Some((_, end)) = sig::match_until(&tokens[cursor..], &terminator) {
            let stmt_end = cursor + end;
            let statement_tokens = &tokens[cursor..stmt_end];
            cursor = stmt_end;
            let statement = if statement_tokens.last().is_some_and(|t| t.kind == TokenKind::Colon)
            {
                self.create_scoped_statement(
                    scope,
                    statement_tokens,
                    tokens,
                    &mut cursor,
                    &mut statements,
                )?
            } else {
                self.create_statement(scope, statement_tokens)?
            };
            statements.push(statement);
        }
        Ok(statements)
    }

    pub(super) fn create_statement(
        &mut self,
        scope: ScopeId,
        tokens: &[Token],
    ) -> Result<StatementNode, ParseError> {
        let toks = sig::strip_layout(tokens);
        if sig::tokens_contain(&toks, &sig::declaration_explicit()) {
            self.create_declaration(scope, &toks, false)
        } else if sig::tokens_contain(&toks, &sig::declaration_inferred()) {
            self.create_declaration(scope, &toks, true)
        } else if sig::tokens_contain(&toks, &sig::assignment()) {
            self.create_assignment(scope, &toks)
        } else if sig::tokens_contain(&toks, &sig::return_statement()) {
            self.create_return(scope, &toks)
        } else if sig::tokens_contain(&toks, &sig::throw_statement()) {
            self.create_throw(scope, &toks)
        } else if sig::tokens_contain(&toks, &sig::function_call()) {
            self.create_call_statement(scope, &toks)
        } else {
            Err(self.err_at(ParseErrorKind::UndefinedStatement, toks.first()))
        }
    }

    fn create_scoped_statement(
        &mut self,
        scope: ScopeId,
        definition: &[Token],
        tokens: &[Token],
        cursor: &mut usize,
        statements: &mut Vec<StatementNode>,
    ) -> Result<StatementNode, ParseError> {
        let first_line = definition
            .iter()
            .find(|t| t.kind != TokenKind::Eol)
            .map(|t| t.line)
            .unwrap_or(1);
        let indent_lvl = sig::get_leading_indents(definition, first_line).unwrap_or(0);
        let scoped_body = self
            .get_body_tokens(indent_lvl, tokens, cursor)
            .map_err(|e| ParseError {
                kind: ParseErrorKind::ScopedStatementMissingBody,
                ..e
            })?;

        if sig::tokens_contain(definition, &sig::if_statement())
            || sig::tokens_contain(definition, &sig::else_statement())
        {
            // Gather the whole if-chain: contiguous same-indent `else if` /
            // `else` headers belong to this statement, not to new ones.
            let mut chain: Vec<(Vec<Token>, Vec<Token>)> =
                vec![(definition.to_vec(), scoped_body)];
            loop {
                if *cursor >= tokens.len() {
                    break;
                }
                let line = tokens[*cursor].line;
                let Some((start, end)) = sig::get_line_token_range(&tokens[*cursor..], line)
                else {
                    break;
                };
                let next_range = (*cursor + start, *cursor + end);
                // Only an `else`-carrying header continues the chain; a bare
                // `if` opens its own statement.
                if !sig::tokens_contain_in_range(
                    tokens,
                    &sig::else_statement(),
                    next_range,
                ) {
                    break;
                }
                let next_definition = tokens[next_range.0..next_range.1].to_vec();
                *cursor = next_range.1;
                let next_body = self
                    .get_body_tokens(indent_lvl, tokens, cursor)
                    .map_err(|e| ParseError {
                        kind: ParseErrorKind::ScopedStatementMissingBody,
                        ..e
                    })?;
                chain.push((next_definition, next_body));
            }
            let if_node = self.create_if(scope, &mut chain)?;
            return Ok(StatementNode::If(if_node));
        }
        if sig::tokens_contain(definition, &sig::for_loop()) {
            return Err(self.err_at(
                ParseErrorKind::NotImplementedYet {
                    what: "for loops".to_string(),
                },
                definition.first(),
            ));
        }
        if sig::tokens_contain(definition, &sig::while_loop()) {
            let node = self.create_while_loop(scope, definition, &scoped_body)?;
            return Ok(StatementNode::While(node));
        }
        if sig::tokens_contain(definition, &sig::catch_statement()) {
            let node = self.create_catch(scope, definition, &scoped_body, statements)?;
            return Ok(StatementNode::Catch(node));
        }
        if sig::tokens_contain(definition, &sig::function_call()) {
            return self.create_call_statement(scope, &sig::strip_layout(definition));
        }
        Err(self.err_at(ParseErrorKind::UndefinedStatement, definition.first()))
    }

    /// Consumes the head of the chain and recurses on the tail.
    fn create_if(
        &mut self,
        scope: ScopeId,
        chain: &mut Vec<(Vec<Token>, Vec<Token>)>,
    ) -> Result<IfNode, ParseError> {
        debug_assert!(!chain.is_empty());
        let (definition, body) = chain.remove(0);

        let mut has_if = false;
        let mut has_else = false;
        let mut cond_start = definition.len();
        for (i, tok) in definition.iter().enumerate() {
            match tok.kind {
                TokenKind::Else => has_else = true,
                TokenKind::If => {
                    has_if = true;
                    cond_start = i + 1;
                    break;
                }
                _ => {}
            }
        }
        if has_else && !has_if {
            return Err(self.err_at(ParseErrorKind::DanglingElse, definition.first()));
        }

        // Condition runs to the `:` that opened the scope.
        let cond_end = definition
            .iter()
            .rposition(|t| t.kind == TokenKind::Colon)
            .unwrap_or(definition.len());
        let condition = self.create_expression(scope, &definition[cond_start..cond_end])?;

        let then_scope = self.session.scopes.child_of(scope);
        let body_statements = self.create_body(then_scope, &body)?;
        self.session.scopes.set_body(then_scope, body_statements);

        let else_branch = if chain.is_empty() {
            None
        } else if sig::tokens_contain(&chain[0].0, &sig::if_statement()) {
            Some(ElseBranch::If(Box::new(self.create_if(scope, chain)?)))
        } else {
            let (_, else_body) = chain.remove(0);
            let else_scope = self.session.scopes.child_of(scope);
            let else_statements = self.create_body(else_scope, &else_body)?;
            self.session.scopes.set_body(else_scope, else_statements);
            Some(ElseBranch::Scope(else_scope))
        };

        Ok(IfNode {
            condition,
            then_scope,
            else_branch,
        })
    }

    fn create_while_loop(
        &mut self,
        scope: ScopeId,
        definition: &[Token],
        body: &[Token],
    ) -> Result<WhileNode, ParseError> {
        let cond_start = definition
            .iter()
            .position(|t| t.kind == TokenKind::While)
            .map(|i| i + 1)
            .unwrap_or(0);
        let cond_end = definition
            .iter()
            .rposition(|t| t.kind == TokenKind::Colon)
            .unwrap_or(definition.len());
        let condition = self.create_expression(scope, &definition[cond_start..cond_end])?;

        let body_scope = self.session.scopes.child_of(scope);
        let body_statements = self.create_body(body_scope, body)?;
        self.session.scopes.set_body(body_scope, body_statements);

        Ok(WhileNode {
            condition,
            scope: body_scope,
        })
    }

    /// The left side of `catch` is itself a complete un-scoped statement; it
    /// is parsed first and pushed ahead of the catch block.
    fn create_catch(
        &mut self,
        scope: ScopeId,
        definition: &[Token],
        body: &[Token],
        statements: &mut Vec<StatementNode>,
    ) -> Result<CatchNode, ParseError> {
        let catch_idx = definition
            .iter()
            .position(|t| t.kind == TokenKind::Catch)
            .ok_or_else(|| self.err_at(ParseErrorKind::UndefinedStatement, definition.first()))?;

        let left_of_catch = &definition[..catch_idx];
        let lhs = self.create_statement(scope, left_of_catch)?;
        statements.push(lhs);

        let last_call = self
            .last_parsed_call
            .ok_or_else(|| self.err_at(ParseErrorKind::UndefinedStatement, definition.first()))?;
        self.session.calls.get_mut(last_call).has_catch = true;

        let var_name = definition[catch_idx + 1..]
            .iter()
            .take_while(|t| t.kind != TokenKind::Colon)
            .find(|t| t.kind == TokenKind::Identifier)
            .map(|t| t.lexeme.clone());

        let body_scope = self.session.scopes.child_of(scope);
        if let Some(name) = &var_name {
            self.session
                .scopes
                .add_variable(body_scope, name, "int", body_scope);
        }
        let body_statements = self.create_body(body_scope, body)?;
        self.session.scopes.set_body(body_scope, body_statements);

        Ok(CatchNode {
            var_name,
            scope: body_scope,
            call_id: last_call,
        })
    }

    fn create_declaration(
        &mut self,
        scope: ScopeId,
        tokens: &[Token],
        is_inferred: bool,
    ) -> Result<StatementNode, ParseError> {
        let (type_str, name, rhs_start) = if is_inferred {
            let name_tok = tokens
                .first()
                .filter(|t| t.kind == TokenKind::Identifier)
                .ok_or_else(|| self.err_at(ParseErrorKind::UndefinedStatement, tokens.first()))?;
            if tokens.get(1).map(|t| t.kind) != Some(TokenKind::ColonEqual) {
                return Err(self.err_at(ParseErrorKind::UndefinedStatement, tokens.first()));
            }
            (None, name_tok.lexeme.clone(), 2)
        } else {
            let (_, lhs_end) = sig::match_until(tokens, &equal_sign())
                .ok_or_else(|| self.err_at(ParseErrorKind::UndefinedStatement, tokens.first()))?;
            let lhs = &tokens[..lhs_end];
            if lhs.len() < 3 {
                return Err(self.err_at(ParseErrorKind::UndefinedStatement, tokens.first()));
            }
            let name_tok = &lhs[lhs.len() - 2];
            if name_tok.kind != TokenKind::Identifier {
                return Err(self.err_at(
                    ParseErrorKind::UnexpectedToken {
                        lexeme: name_tok.lexeme.clone(),
                    },
                    Some(name_tok),
                ));
            }
            let type_str: String = lhs[..lhs.len() - 2]
                .iter()
                .map(|t| t.lexeme.as_str())
                .collect();
            (Some(type_str), name_tok.lexeme.clone(), lhs_end)
        };

        let initializer = self.create_expression(scope, &tokens[rhs_start..])?;
        let type_str = match type_str {
            Some(t) => t,
            None => {
                let inferred = initializer.type_str(&self.session.calls);
                if inferred.is_empty() {
                    let callee = initializer
                        .as_call()
                        .map(|id| self.session.calls.get(id).function_name.clone())
                        .unwrap_or_default();
                    return Err(self.err_at(
                        ParseErrorKind::UnresolvedCallType {
                            name: name.clone(),
                            callee,
                        },
                        tokens.first(),
                    ));
                }
                inferred
            }
        };

        if !self
            .session
            .scopes
            .add_variable(scope, &name, &type_str, scope)
        {
            return Err(self.err_at(
                ParseErrorKind::VariableShadowed { name },
                tokens.first(),
            ));
        }

        Ok(StatementNode::Declaration(DeclarationNode {
            type_str,
            name,
            initializer,
        }))
    }

    fn create_assignment(
        &mut self,
        scope: ScopeId,
        tokens: &[Token],
    ) -> Result<StatementNode, ParseError> {
        for (i, tok) in tokens.iter().enumerate() {
            if tok.kind == TokenKind::Identifier
                && tokens.get(i + 1).is_some_and(|t| t.kind == TokenKind::Equal)
            {
                let expression = self.create_expression(scope, &tokens[i + 2..])?;
                let Some((type_str, _)) = self.session.scopes.variable(scope, &tok.lexeme)
                else {
                    return Err(self.err_at(
                        ParseErrorKind::VarNotDeclared {
                            name: tok.lexeme.clone(),
                        },
                        Some(tok),
                    ));
                };
                return Ok(StatementNode::Assignment(AssignmentNode {
                    type_str: type_str.clone(),
                    name: tok.lexeme.clone(),
                    expression,
                }));
            }
        }
        Err(self.err_at(ParseErrorKind::UndefinedStatement, tokens.first()))
    }

    fn create_return(
        &mut self,
        scope: ScopeId,
        tokens: &[Token],
    ) -> Result<StatementNode, ParseError> {
        let return_idx = tokens
            .iter()
            .position(|t| t.kind == TokenKind::Return)
            .ok_or_else(|| self.err_at(ParseErrorKind::UndefinedStatement, tokens.first()))?;
        let rest = trim_terminators(&tokens[return_idx + 1..]);
        let value = if rest.is_empty() {
            None
        } else {
            Some(self.create_expression(scope, rest)?)
        };
        Ok(StatementNode::Return(ReturnNode { value }))
    }

    fn create_throw(
        &mut self,
        scope: ScopeId,
        tokens: &[Token],
    ) -> Result<StatementNode, ParseError> {
        let throw_idx = tokens
            .iter()
            .position(|t| t.kind == TokenKind::Throw)
            .ok_or_else(|| self.err_at(ParseErrorKind::UndefinedStatement, tokens.first()))?;
        let value = self.create_expression(scope, &tokens[throw_idx + 1..])?;
        let value_type = value.type_str(&self.session.calls);
        if value_type != "int" {
            return Err(self.err_at(
                ParseErrorKind::ThrowTypeNotInt { found: value_type },
                tokens.get(throw_idx),
            ));
        }
        Ok(StatementNode::Throw(ThrowNode { value }))
    }

    fn create_call_statement(
        &mut self,
        scope: ScopeId,
        tokens: &[Token],
    ) -> Result<StatementNode, ParseError> {
        let call_id = self.create_call_expression(scope, tokens)?;
        Ok(StatementNode::Call(call_id))
    }
}

fn equal_sign() -> sig::Signature {
    sig::Signature(vec![sig::Pat::Kind(TokenKind::Equal)])
}

fn trim_terminators(tokens: &[Token]) -> &[Token] {
    let mut end = tokens.len();
    while end > 0 && tokens[end - 1].kind == TokenKind::Semicolon {
        end -= 1;
    }
    &tokens[..end]
}
