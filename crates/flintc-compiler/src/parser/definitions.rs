//! Definition constructors: function, data, func module, entity, enum,
//! error set, variant, import.

use flintc_core::{Token, TokenKind};

use crate::ast::{
    DataNode, EntityNode, EnumNode, ErrorNode, FuncNode, FunctionNode, ImportNode, ImportPath,
    LinkNode, VariantNode,
};
use crate::diagnostics::{ParseError, ParseErrorKind};
use crate::signature as sig;

use super::Parser;

impl Parser<'_> {
    pub(super) fn create_function(
        &mut self,
        definition: &[Token],
        body: &[Token],
    ) -> Result<FunctionNode, ParseError> {
        let mut name = String::new();
        let mut parameters: Vec<(String, String)> = Vec::new();
        let mut return_types: Vec<String> = Vec::new();
        let mut is_aligned = false;
        let mut is_const = false;

        let mut begin_params = false;
        let mut begin_returns = false;
        let mut i = 0;
        while i < definition.len() {
            let tok = &definition[i];
            let next = definition.get(i + 1);
            match tok.kind {
                TokenKind::Aligned => is_aligned = true,
                TokenKind::Const if name.is_empty() => is_const = true,
                TokenKind::Def => {
                    if let Some(next) = next {
                        name = next.lexeme.clone();
                    }
                }
                TokenKind::LeftParen if !begin_returns => begin_params = true,
                TokenKind::RightParen if begin_params => begin_params = false,
                TokenKind::Arrow => {
                    // Either a single return type or a parenthesized list.
                    if let Some(next) = next
                        && sig::is_type_token(next.kind)
                    {
                        return_types.push(next.lexeme.clone());
                        break;
                    }
                    begin_returns = true;
                }
                _ => {}
            }
            if begin_params
                && sig::is_type_token(tok.kind)
                && next.is_some_and(|n| n.kind == TokenKind::Identifier)
            {
                parameters.push((tok.lexeme.clone(), next.unwrap().lexeme.clone()));
            }
            if begin_returns {
                if sig::is_type_token(tok.kind) {
                    return_types.push(tok.lexeme.clone());
                }
                if tok.kind == TokenKind::RightParen {
                    break;
                }
            }
            i += 1;
        }

        let scope = self.session.scopes.root();
        for (param_type, param_name) in &parameters {
            if !self
                .session
                .scopes
                .add_variable(scope, param_name, param_type, scope)
            {
                return Err(self.err_at(
                    ParseErrorKind::VarFromRequiresList {
                        name: param_name.clone(),
                    },
                    definition.first(),
                ));
            }
        }

        // Visible before the body parses, so recursive calls resolve.
        self.session
            .function_types
            .insert(name.clone(), return_types.concat());

        let statements = self.create_body(scope, body)?;
        self.session.scopes.set_body(scope, statements);

        Ok(FunctionNode {
            is_aligned,
            is_const,
            name,
            parameters,
            return_types,
            scope,
        })
    }

    pub(super) fn create_data(
        &mut self,
        definition: &[Token],
        body: &[Token],
        file_hash: u32,
    ) -> Result<DataNode, ParseError> {
        let mut is_shared = false;
        let mut is_immutable = false;
        let mut is_aligned = false;
        let mut name = String::new();

        for (i, tok) in definition.iter().enumerate() {
            match tok.kind {
                TokenKind::Shared => is_shared = true,
                TokenKind::Immutable => {
                    is_immutable = true;
                    // immutable data is shared by default
                    is_shared = true;
                }
                TokenKind::Aligned => is_aligned = true,
                TokenKind::Data => {
                    if let Some(next) = definition.get(i + 1) {
                        name = next.lexeme.clone();
                    }
                }
                _ => {}
            }
        }

        let mut fields: Vec<(String, String)> = Vec::new();
        let mut default_values: Vec<(String, String)> = Vec::new();
        let mut constructor_order: Vec<String> = Vec::new();

        let mut parsing_constructor = false;
        let mut i = 0;
        while i < body.len() {
            let tok = &body[i];
            let next = body.get(i + 1);
            if sig::is_type_token(tok.kind)
                && next.is_some_and(|n| n.kind == TokenKind::Identifier)
                && !parsing_constructor
            {
                let field_name = next.unwrap().lexeme.clone();
                fields.push((tok.lexeme.clone(), field_name.clone()));
                if body.get(i + 2).is_some_and(|t| t.kind == TokenKind::Equal)
                    && let Some(value) = body.get(i + 3)
                {
                    default_values.push((field_name, value.lexeme.clone()));
                }
                i += 2;
                continue;
            }
            if tok.kind == TokenKind::Identifier
                && next.is_some_and(|n| n.kind == TokenKind::LeftParen)
            {
                if tok.lexeme != name {
                    return Err(self.err_at(
                        ParseErrorKind::ConstructorNameMismatch {
                            expected: name,
                            found: tok.lexeme.clone(),
                        },
                        Some(tok),
                    ));
                }
                parsing_constructor = true;
                i += 1;
            }
            if parsing_constructor && tok.kind == TokenKind::Identifier && tok.lexeme != name {
                constructor_order.push(tok.lexeme.clone());
            }
            if tok.kind == TokenKind::RightParen {
                break;
            }
            i += 1;
        }

        Ok(DataNode {
            is_shared,
            is_immutable,
            is_aligned,
            name,
            fields,
            default_values,
            constructor_order,
            file_hash,
        })
    }

    pub(super) fn create_func(
        &mut self,
        definition: &[Token],
        body: &[Token],
    ) -> Result<FuncNode, ParseError> {
        let mut name = String::new();
        let mut required_data: Vec<(String, String)> = Vec::new();

        let mut requires_data = false;
        for (i, tok) in definition.iter().enumerate() {
            let next = definition.get(i + 1);
            if tok.kind == TokenKind::Func
                && next.is_some_and(|n| n.kind == TokenKind::Identifier)
            {
                name = next.unwrap().lexeme.clone();
            }
            if tok.kind == TokenKind::Requires {
                requires_data = true;
            }
            if requires_data
                && tok.kind == TokenKind::Identifier
                && next.is_some_and(|n| n.kind == TokenKind::Identifier)
            {
                required_data.push((tok.lexeme.clone(), next.unwrap().lexeme.clone()));
            }
        }

        // Each line at the top of the body opens a nested function.
        let mut functions = Vec::new();
        let mut cursor = 0usize;
        while cursor < body.len() {
            let line = body[cursor].line;
            let (start, end) =
                sig::get_line_token_range(&body[cursor..], line).unwrap_or((0, 0));
            let def_start = cursor + start;
            let def_end = cursor + end;
            cursor = def_end;
            let func_definition = &body[def_start..def_end];
            if func_definition
                .iter()
                .all(|t| matches!(t.kind, TokenKind::Indent | TokenKind::Eol))
            {
                continue;
            }
            let leading_indents = sig::get_leading_indents(func_definition, line).unwrap_or(0);
            let func_body = self.get_body_tokens(leading_indents, body, &mut cursor)?;
            functions.push(self.create_function(func_definition, &func_body)?);
        }

        Ok(FuncNode {
            name,
            required_data,
            functions,
        })
    }

    pub(super) fn create_entity(
        &mut self,
        definition: &[Token],
        body: &[Token],
        file_hash: u32,
    ) -> Result<(EntityNode, Option<(DataNode, FuncNode)>), ParseError> {
        let is_modular = sig::tokens_contain(body, &sig::entity_body_modular());

        let mut name = String::new();
        let mut parent_entities: Vec<(String, String)> = Vec::new();
        let mut extract_parents = false;
        for (i, tok) in definition.iter().enumerate() {
            let next = definition.get(i + 1);
            if tok.kind == TokenKind::Entity
                && next.is_some_and(|n| n.kind == TokenKind::Identifier)
            {
                name = next.unwrap().lexeme.clone();
            }
            if tok.kind == TokenKind::LeftParen
                && next.is_some_and(|n| n.kind == TokenKind::Identifier)
            {
                extract_parents = true;
            }
            if extract_parents
                && tok.kind == TokenKind::Identifier
                && next.is_some_and(|n| n.kind == TokenKind::Identifier)
            {
                parent_entities.push((tok.lexeme.clone(), next.unwrap().lexeme.clone()));
            }
        }

        let mut data_modules: Vec<String> = Vec::new();
        let mut func_modules: Vec<String> = Vec::new();
        let mut links: Vec<LinkNode> = Vec::new();
        let mut monolithic: Option<(DataNode, FuncNode)> = None;

        if is_modular {
            let mut extracting_data = false;
            let mut extracting_func = false;
            let mut i = 0;
            while i < body.len() {
                let tok = &body[i];
                match tok.kind {
                    TokenKind::Data => extracting_data = true,
                    TokenKind::Func => extracting_func = true,
                    TokenKind::Link => {
                        let link_indentation =
                            sig::get_leading_indents(body, tok.line).unwrap_or(0);
                        let (_, line_end) =
                            sig::get_line_token_range(body, tok.line).unwrap_or((i, i + 1));
                        let mut link_cursor = line_end;
                        let link_tokens =
                            self.get_body_tokens(link_indentation, body, &mut link_cursor)?;
                        links = self.create_links(&link_tokens)?;
                    }
                    TokenKind::Identifier if extracting_data => {
                        data_modules.push(tok.lexeme.clone());
                        if body.get(i + 1).is_some_and(|n| n.kind == TokenKind::Semicolon) {
                            extracting_data = false;
                        }
                    }
                    TokenKind::Identifier if extracting_func => {
                        func_modules.push(tok.lexeme.clone());
                        if body.get(i + 1).is_some_and(|n| n.kind == TokenKind::Semicolon) {
                            extracting_func = false;
                        }
                    }
                    _ => {}
                }
                i += 1;
            }
        } else {
            let mut data_node: Option<DataNode> = None;
            let mut func_node: Option<FuncNode> = None;
            let mut i = 0;
            while i < body.len() {
                let tok = &body[i];
                if tok.kind == TokenKind::Data {
                    let leading_indents = sig::get_leading_indents(body, tok.line).unwrap_or(0);
                    let (_, line_end) =
                        sig::get_line_token_range(body, tok.line).unwrap_or((i, i + 1));
                    let mut data_cursor = line_end;
                    let data_body = self.get_body_tokens(leading_indents, body, &mut data_cursor)?;
                    let data_definition = vec![
                        Token::new(TokenKind::Data, "data", tok.line, tok.column),
                        Token::new(
                            TokenKind::Identifier,
                            format!("{name}__D"),
                            tok.line,
                            tok.column,
                        ),
                    ];
                    data_node = Some(self.create_data(&data_definition, &data_body, file_hash)?);
                    data_modules.push(format!("{name}__D"));
                    i = data_cursor;
                    continue;
                }
                if tok.kind == TokenKind::Func {
                    let leading_indents = sig::get_leading_indents(body, tok.line).unwrap_or(0);
                    let (_, line_end) =
                        sig::get_line_token_range(body, tok.line).unwrap_or((i, i + 1));
                    let mut func_cursor = line_end;
                    let func_body = self.get_body_tokens(leading_indents, body, &mut func_cursor)?;
                    let line = tok.line;
                    let func_definition = vec![
                        Token::new(TokenKind::Func, "func", line, 1),
                        Token::new(TokenKind::Identifier, format!("{name}__F"), line, 1),
                        Token::new(TokenKind::Requires, "requires", line, 1),
                        Token::new(TokenKind::LeftParen, "(", line, 1),
                        Token::new(TokenKind::Identifier, format!("{name}__D"), line, 1),
                        Token::new(TokenKind::Identifier, "d", line, 1),
                        Token::new(TokenKind::RightParen, ")", line, 1),
                        Token::new(TokenKind::Colon, ":", line, 1),
                    ];
                    func_node = Some(self.create_func(&func_definition, &func_body)?);
                    func_modules.push(format!("{name}__F"));
                    i = func_cursor;
                    continue;
                }
                i += 1;
            }
            if let (Some(data), Some(func)) = (data_node, func_node) {
                monolithic = Some((data, func));
            }
        }

        // The constructor is the line-initial `Name(...)` at entity-body
        // indent; nested function bodies can contain call statements that
        // would otherwise match the same shape.
        let line_initial = |start: usize| -> bool {
            let line = body[start].line;
            body[..start]
                .iter()
                .rev()
                .take_while(|t| t.line == line)
                .all(|t| t.kind == TokenKind::Indent)
                && sig::get_leading_indents(body, line) == Some(1)
        };
        let mut constructor_order: Vec<String> = Vec::new();
        if let Some((ctor_start, ctor_end)) = sig::get_match_ranges(body, &sig::entity_body_constructor())
            .into_iter()
            .find(|&(start, _)| line_initial(start))
        {
            for i in ctor_start..ctor_end {
                let tok = &body[i];
                if tok.kind != TokenKind::Identifier {
                    continue;
                }
                if body.get(i + 1).is_some_and(|n| n.kind == TokenKind::LeftParen) {
                    if tok.lexeme != name {
                        return Err(self.err_at(
                            ParseErrorKind::EntityConstructorNameMismatch {
                                expected: name,
                                found: tok.lexeme.clone(),
                            },
                            Some(tok),
                        ));
                    }
                    continue;
                }
                constructor_order.push(tok.lexeme.clone());
            }
        }

        Ok((
            EntityNode {
                name,
                data_modules,
                func_modules,
                links,
                parent_entities,
                constructor_order,
            },
            monolithic,
        ))
    }

    fn create_links(&mut self, body: &[Token]) -> Result<Vec<LinkNode>, ParseError> {
        let mut links = Vec::new();
        let mut cursor = 0usize;
        while cursor < body.len() {
            let line = body[cursor].line;
            let (start, end) = sig::get_line_token_range(&body[cursor..], line).unwrap_or((0, 0));
            let line_tokens = &body[cursor + start..cursor + end];
            cursor += end;
            if line_tokens
                .iter()
                .any(|t| t.kind == TokenKind::Arrow)
            {
                links.push(self.create_link(line_tokens)?);
            }
        }
        Ok(links)
    }

    fn create_link(&mut self, tokens: &[Token]) -> Result<LinkNode, ParseError> {
        let references = sig::get_match_ranges(tokens, &sig::reference());
        if references.len() < 2 {
            return Err(self.err_at(
                ParseErrorKind::UnexpectedToken {
                    lexeme: tokens.first().map(|t| t.lexeme.clone()).unwrap_or_default(),
                },
                tokens.first(),
            ));
        }
        let collect = |range: (usize, usize)| -> Vec<String> {
            tokens[range.0..range.1]
                .iter()
                .filter(|t| t.kind == TokenKind::Identifier)
                .map(|t| t.lexeme.clone())
                .collect()
        };
        Ok(LinkNode {
            from: collect(references[0]),
            to: collect(references[1]),
        })
    }

    pub(super) fn create_enum(
        &mut self,
        definition: &[Token],
        body: &[Token],
    ) -> Result<EnumNode, ParseError> {
        let name = self.definition_name(definition, TokenKind::Enum);
        let values = self.comma_separated_values(body)?;
        Ok(EnumNode { name, values })
    }

    pub(super) fn create_error(
        &mut self,
        definition: &[Token],
        body: &[Token],
    ) -> Result<ErrorNode, ParseError> {
        let mut name = String::new();
        let mut parent: Option<String> = None;
        for (i, tok) in definition.iter().enumerate() {
            if tok.kind == TokenKind::Error
                && definition.get(i + 1).is_some_and(|n| n.kind == TokenKind::Identifier)
            {
                name = definition[i + 1].lexeme.clone();
            }
            if tok.kind == TokenKind::LeftParen {
                if definition.get(i + 1).is_some_and(|n| n.kind == TokenKind::Identifier)
                    && definition
                        .get(i + 2)
                        .is_some_and(|n| n.kind == TokenKind::RightParen)
                {
                    parent = Some(definition[i + 1].lexeme.clone());
                    break;
                }
                return Err(
                    self.err_at(ParseErrorKind::CanOnlyExtendFromSingleErrorSet, Some(tok))
                );
            }
        }
        let values = self.comma_separated_values(body)?;
        Ok(ErrorNode::new(name, parent, values))
    }

    pub(super) fn create_variant(
        &mut self,
        definition: &[Token],
        body: &[Token],
    ) -> Result<VariantNode, ParseError> {
        let name = self.definition_name(definition, TokenKind::Variant);
        let possible_types = self.comma_separated_values(body)?;
        Ok(VariantNode {
            name,
            possible_types,
        })
    }

    pub(super) fn create_import(&mut self, tokens: &[Token]) -> Result<ImportNode, ParseError> {
        if let Some(tok) = tokens.iter().find(|t| t.kind == TokenKind::StrValue) {
            return Ok(ImportNode {
                path: ImportPath::File(tok.lexeme.clone()),
            });
        }
        let ranges = sig::get_match_ranges(tokens, &sig::reference());
        let Some(&(start, end)) = ranges.first() else {
            return Err(self.err_at(
                ParseErrorKind::UnexpectedToken {
                    lexeme: tokens.first().map(|t| t.lexeme.clone()).unwrap_or_default(),
                },
                tokens.first(),
            ));
        };
        let mut path = Vec::new();
        if tokens[start].kind == TokenKind::Flint {
            path.push("flint".to_string());
        }
        for tok in &tokens[start..end] {
            if tok.kind == TokenKind::Identifier {
                path.push(tok.lexeme.clone());
            }
        }
        Ok(ImportNode {
            path: ImportPath::Modules(path),
        })
    }

    fn definition_name(&self, definition: &[Token], keyword: TokenKind) -> String {
        for (i, tok) in definition.iter().enumerate() {
            if tok.kind == keyword
                && let Some(next) = definition.get(i + 1)
                && next.kind == TokenKind::Identifier
            {
                return next.lexeme.clone();
            }
        }
        String::new()
    }

    /// `A, B, C;` lists as enum/error/variant bodies use them. The list may
    /// span lines; each value must be followed by `,` or the closing `;`.
    /// Variant cases may be type keywords, so any type token qualifies.
    fn comma_separated_values(&self, body: &[Token]) -> Result<Vec<String>, ParseError> {
        let mut values = Vec::new();
        let stripped = sig::strip_layout(body);
        for (i, tok) in stripped.iter().enumerate() {
            if !sig::is_type_token(tok.kind) {
                continue;
            }
            match stripped.get(i + 1).map(|t| t.kind) {
                Some(TokenKind::Comma) => values.push(tok.lexeme.clone()),
                Some(TokenKind::Semicolon) => {
                    values.push(tok.lexeme.clone());
                    break;
                }
                _ => {
                    return Err(self.err_at(
                        ParseErrorKind::UnexpectedToken {
                            lexeme: tok.lexeme.clone(),
                        },
                        Some(tok),
                    ));
                }
            }
        }
        Ok(values)
    }
}
