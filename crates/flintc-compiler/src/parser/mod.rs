//! Recursive structural parser.
//!
//! The top-level loop peels one *definition line* off the token stream,
//! determines its indentation, extracts the more-indented *body block* that
//! follows, classifies the definition by signature, and dispatches to the
//! matching constructor. Bodies recurse the same way for statements.
//!
//! All errors are fatal: parsing stops at the first violation and nothing
//! partial is recorded into the session.

mod definitions;
mod expressions;
mod statements;

#[cfg(test)]
mod definitions_tests;
#[cfg(test)]
mod expressions_tests;
#[cfg(test)]
mod statements_tests;

use flintc_core::{Token, TokenKind};
use tracing::debug;

use crate::ParseSession;
use crate::ast::{CallId, FileNode};
use crate::diagnostics::{ParseError, ParseErrorKind};
use crate::lexer::lex;
use crate::signature as sig;

/// Parse one file's source into the session.
pub fn parse_file(
    session: &mut ParseSession,
    file_name: &str,
    source: &str,
) -> Result<(), ParseError> {
    let tokens = lex(file_name, source)?;
    debug!(file = file_name, tokens = tokens.len(), "parsing file");

    let mut parser = Parser {
        session,
        file: file_name.to_string(),
        last_parsed_call: None,
    };
    let mut file_node = FileNode::new(file_name);
    let file_hash = flintc_core::type_id(file_name);
    let mut cursor = 0usize;
    while cursor < tokens.len() {
        parser.add_next_definition(&mut file_node, &tokens, &mut cursor, file_hash)?;
    }
    parser.session.files.push(file_node);
    Ok(())
}

pub(crate) struct Parser<'s> {
    pub(crate) session: &'s mut ParseSession,
    pub(crate) file: String,
    /// Most recently registered call site; `catch` binds to it.
    pub(crate) last_parsed_call: Option<CallId>,
}

impl Parser<'_> {
    /// Error positioned at a token (or at the file start when none is left).
    pub(crate) fn err_at(&self, kind: ParseErrorKind, token: Option<&Token>) -> ParseError {
        let (line, column) = token.map_or((1, 1), |t| (t.line, t.column));
        ParseError::new(kind, self.file.clone(), line, column)
    }

    fn add_next_definition(
        &mut self,
        file_node: &mut FileNode,
        tokens: &[Token],
        cursor: &mut usize,
        file_hash: u32,
    ) -> Result<(), ParseError> {
        let (def_start, def_end) = get_definition_tokens(tokens, *cursor);
        *cursor = def_end;
        let definition = &tokens[def_start..def_end];

        let indentation = definition
            .iter()
            .take_while(|t| t.kind == TokenKind::Indent)
            .count() as u32;

        if sig::tokens_contain(definition, &sig::use_statement()) {
            if indentation > 0 {
                return Err(self.err_at(
                    ParseErrorKind::UseStatementNotAtTopLevel,
                    definition.first(),
                ));
            }
            file_node.imports.push(self.create_import(definition)?);
        } else if sig::tokens_contain(definition, &sig::function_definition()) {
            let body = self.get_body_tokens(indentation, tokens, cursor)?;
            let function = self.create_function(definition, &body)?;
            file_node
                .definitions
                .push(crate::ast::Definition::Function(function));
        } else if sig::tokens_contain(definition, &sig::data_definition()) {
            let body = self.get_body_tokens(indentation, tokens, cursor)?;
            let data = self.create_data(definition, &body, file_hash)?;
            file_node.definitions.push(crate::ast::Definition::Data(data));
        } else if sig::tokens_contain(definition, &sig::func_definition()) {
            let body = self.get_body_tokens(indentation, tokens, cursor)?;
            let func = self.create_func(definition, &body)?;
            file_node
                .definitions
                .push(crate::ast::Definition::FuncModule(func));
        } else if sig::tokens_contain(definition, &sig::entity_definition()) {
            let body = self.get_body_tokens(indentation, tokens, cursor)?;
            let (entity, monolithic) = self.create_entity(definition, &body, file_hash)?;
            file_node
                .definitions
                .push(crate::ast::Definition::Entity(entity));
            if let Some((data, func)) = monolithic {
                file_node.definitions.push(crate::ast::Definition::Data(data));
                file_node
                    .definitions
                    .push(crate::ast::Definition::FuncModule(func));
            }
        } else if sig::tokens_contain(definition, &sig::enum_definition()) {
            let body = self.get_body_tokens(indentation, tokens, cursor)?;
            let node = self.create_enum(definition, &body)?;
            file_node.definitions.push(crate::ast::Definition::Enum(node));
        } else if sig::tokens_contain(definition, &sig::error_definition()) {
            let body = self.get_body_tokens(indentation, tokens, cursor)?;
            let node = self.create_error(definition, &body)?;
            file_node
                .definitions
                .push(crate::ast::Definition::ErrorSet(node));
        } else if sig::tokens_contain(definition, &sig::variant_definition()) {
            let body = self.get_body_tokens(indentation, tokens, cursor)?;
            let node = self.create_variant(definition, &body)?;
            file_node
                .definitions
                .push(crate::ast::Definition::Variant(node));
        } else {
            return Err(self.err_at(ParseErrorKind::UnexpectedDefinition, definition.first()));
        }
        Ok(())
    }

    /// Consecutive lines at `cursor` whose indentation is strictly greater
    /// than the definition's. Advances the cursor past the body.
    pub(crate) fn get_body_tokens(
        &self,
        definition_indentation: u32,
        tokens: &[Token],
        cursor: &mut usize,
    ) -> Result<Vec<Token>, ParseError> {
        let start = *cursor;
        let mut end = start;
        let mut saw_line = false;
        while end < tokens.len() {
            // The previous line's Eol leads the region; it carries no
            // indentation information.
            if tokens[end].kind == TokenKind::Eol {
                end += 1;
                continue;
            }
            let line = tokens[end].line;
            let indents = sig::get_leading_indents(&tokens[end..], line).unwrap_or(0);
            if indents <= definition_indentation {
                break;
            }
            saw_line = true;
            while end < tokens.len() && tokens[end].line == line {
                end += 1;
            }
        }
        if !saw_line {
            return Err(self.err_at(ParseErrorKind::MissingBody, tokens.get(start)));
        }
        *cursor = end;
        Ok(tokens[start..end].to_vec())
    }
}

/// All tokens sharing the first line at `start` (trailing `Eol` included).
fn get_definition_tokens(tokens: &[Token], start: usize) -> (usize, usize) {
    let line = tokens[start].line;
    let mut end = start;
    while end < tokens.len() && tokens[end].line == line {
        end += 1;
    }
    (start, end)
}
