//! Source renderer for parsed files.
//!
//! Prints a `FileNode` back to surface syntax. Re-parsing the output yields
//! a structurally equal AST, which the round-trip tests lean on. A catch
//! statement re-joins the statement that was split off to its left during
//! parsing.

use flintc_core::TokenKind;

use crate::ParseSession;
use crate::ast::{
    DataNode, Definition, ElseBranch, EntityNode, EnumNode, ErrorNode, ExpressionNode, FileNode,
    FuncNode, FunctionNode, IfNode, ImportPath, LiteralValue, ScopeId, StatementNode, VariantNode,
};

pub fn print_file(session: &ParseSession, file: &FileNode) -> String {
    let printer = Printer { session };
    let mut out = String::new();
    for import in &file.imports {
        match &import.path {
            ImportPath::File(path) => out.push_str(&format!("use \"{path}\"\n")),
            ImportPath::Modules(path) => out.push_str(&format!("use {}\n", path.join("."))),
        }
    }
    for definition in &file.definitions {
        match definition {
            Definition::Function(node) => printer.print_function(&mut out, node, 0),
            Definition::Data(node) => printer.print_data(&mut out, node),
            Definition::FuncModule(node) => printer.print_func_module(&mut out, node),
            Definition::Entity(node) => printer.print_entity(&mut out, node),
            Definition::Enum(node) => printer.print_enum(&mut out, node),
            Definition::Variant(node) => printer.print_variant(&mut out, node),
            Definition::ErrorSet(node) => printer.print_error(&mut out, node),
        }
    }
    out
}

struct Printer<'s> {
    session: &'s ParseSession,
}

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push('\t');
    }
}

fn operator_lexeme(op: TokenKind) -> &'static str {
    match op {
        TokenKind::Plus => "+",
        TokenKind::Minus => "-",
        TokenKind::Mult => "*",
        TokenKind::Div => "/",
        TokenKind::Mod => "%",
        TokenKind::Less => "<",
        TokenKind::Greater => ">",
        TokenKind::LessEqual => "<=",
        TokenKind::GreaterEqual => ">=",
        TokenKind::EqualEqual => "==",
        TokenKind::NotEqual => "!=",
        _ => "?",
    }
}

impl Printer<'_> {
    fn print_function(&self, out: &mut String, node: &FunctionNode, level: usize) {
        indent(out, level);
        if node.is_const {
            out.push_str("const ");
        }
        if node.is_aligned {
            out.push_str("aligned ");
        }
        let params: Vec<String> = node
            .parameters
            .iter()
            .map(|(ty, name)| format!("{ty} {name}"))
            .collect();
        let returns = match node.return_types.len() {
            0 => "void".to_string(),
            1 => node.return_types[0].clone(),
            _ => format!("({})", node.return_types.join(", ")),
        };
        out.push_str(&format!(
            "def {}({}) -> {}:\n",
            node.name,
            params.join(", "),
            returns
        ));
        self.print_scope(out, node.scope, level + 1);
    }

    fn print_data(&self, out: &mut String, node: &DataNode) {
        if node.is_immutable {
            out.push_str("immutable ");
        } else if node.is_shared {
            out.push_str("shared ");
        }
        if node.is_aligned {
            out.push_str("aligned ");
        }
        out.push_str(&format!("data {}:\n", node.name));
        for (ty, name) in &node.fields {
            indent(out, 1);
            match node.default_values.iter().find(|(n, _)| n == name) {
                Some((_, value)) => out.push_str(&format!("{ty} {name} = {value};\n")),
                None => out.push_str(&format!("{ty} {name};\n")),
            }
        }
        if !node.constructor_order.is_empty() {
            indent(out, 1);
            out.push_str(&format!(
                "{}({});\n",
                node.name,
                node.constructor_order.join(", ")
            ));
        }
    }

    fn print_func_module(&self, out: &mut String, node: &FuncNode) {
        let requires: Vec<String> = node
            .required_data
            .iter()
            .map(|(ty, name)| format!("{ty} {name}"))
            .collect();
        out.push_str(&format!(
            "func {} requires ({}):\n",
            node.name,
            requires.join(", ")
        ));
        for function in &node.functions {
            self.print_function(out, function, 1);
        }
    }

    fn print_entity(&self, out: &mut String, node: &EntityNode) {
        if node.parent_entities.is_empty() {
            out.push_str(&format!("entity {}:\n", node.name));
        } else {
            let parents: Vec<String> = node
                .parent_entities
                .iter()
                .map(|(ty, name)| format!("{ty} {name}"))
                .collect();
            out.push_str(&format!("entity {}({}):\n", node.name, parents.join(", ")));
        }
        if !node.data_modules.is_empty() {
            indent(out, 1);
            out.push_str(&format!("data: {};\n", node.data_modules.join(", ")));
        }
        if !node.func_modules.is_empty() {
            indent(out, 1);
            out.push_str(&format!("func: {};\n", node.func_modules.join(", ")));
        }
        if !node.links.is_empty() {
            indent(out, 1);
            out.push_str("link:\n");
            for link in &node.links {
                indent(out, 2);
                out.push_str(&format!(
                    "{} -> {};\n",
                    link.from.join("."),
                    link.to.join(".")
                ));
            }
        }
        if !node.constructor_order.is_empty() {
            indent(out, 1);
            out.push_str(&format!(
                "{}({});\n",
                node.name,
                node.constructor_order.join(", ")
            ));
        }
    }

    fn print_enum(&self, out: &mut String, node: &EnumNode) {
        out.push_str(&format!("enum {}:\n", node.name));
        indent(out, 1);
        out.push_str(&format!("{};\n", node.values.join(", ")));
    }

    fn print_variant(&self, out: &mut String, node: &VariantNode) {
        out.push_str(&format!("variant {}:\n", node.name));
        indent(out, 1);
        out.push_str(&format!("{};\n", node.possible_types.join(", ")));
    }

    fn print_error(&self, out: &mut String, node: &ErrorNode) {
        match &node.parent {
            Some(parent) => out.push_str(&format!("error {}({}):\n", node.name, parent)),
            None => out.push_str(&format!("error {}:\n", node.name)),
        }
        indent(out, 1);
        out.push_str(&format!("{};\n", node.values.join(", ")));
    }

    fn print_scope(&self, out: &mut String, scope: ScopeId, level: usize) {
        let body = &self.session.scopes.get(scope).body;
        let mut i = 0;
        while i < body.len() {
            // A catch absorbs the statement to its left back onto one line.
            if let Some(StatementNode::Catch(catch)) = body.get(i + 1) {
                indent(out, level);
                let mut lhs = String::new();
                self.print_flat_statement(&mut lhs, &body[i]);
                let lhs = lhs.trim_end_matches(";\n").to_string();
                match &catch.var_name {
                    Some(name) => out.push_str(&format!("{lhs} catch {name}:\n")),
                    None => out.push_str(&format!("{lhs} catch:\n")),
                }
                self.print_scope(out, catch.scope, level + 1);
                i += 2;
                continue;
            }
            match &body[i] {
                StatementNode::If(node) => self.print_if(out, node, level, false),
                StatementNode::While(node) => {
                    indent(out, level);
                    out.push_str(&format!(
                        "while {}:\n",
                        self.print_expression(&node.condition)
                    ));
                    self.print_scope(out, node.scope, level + 1);
                }
                StatementNode::For(_) | StatementNode::Catch(_) => {}
                other => {
                    indent(out, level);
                    self.print_flat_statement(out, other);
                }
            }
            i += 1;
        }
    }

    fn print_if(&self, out: &mut String, node: &IfNode, level: usize, is_elif: bool) {
        indent(out, level);
        let keyword = if is_elif { "else if" } else { "if" };
        out.push_str(&format!(
            "{keyword} {}:\n",
            self.print_expression(&node.condition)
        ));
        self.print_scope(out, node.then_scope, level + 1);
        match &node.else_branch {
            Some(ElseBranch::If(next)) => self.print_if(out, next.as_ref(), level, true),
            Some(ElseBranch::Scope(scope)) => {
                indent(out, level);
                out.push_str("else:\n");
                self.print_scope(out, *scope, level + 1);
            }
            None => {}
        }
    }

    fn print_flat_statement(&self, out: &mut String, statement: &StatementNode) {
        match statement {
            StatementNode::Return(node) => match &node.value {
                Some(value) => {
                    out.push_str(&format!("return {};\n", self.print_expression(value)))
                }
                None => out.push_str("return;\n"),
            },
            StatementNode::Throw(node) => {
                out.push_str(&format!("throw {};\n", self.print_expression(&node.value)))
            }
            StatementNode::Declaration(node) => out.push_str(&format!(
                "{} {} = {};\n",
                node.type_str,
                node.name,
                self.print_expression(&node.initializer)
            )),
            StatementNode::Assignment(node) => out.push_str(&format!(
                "{} = {};\n",
                node.name,
                self.print_expression(&node.expression)
            )),
            StatementNode::Call(id) => {
                out.push_str(&format!("{};\n", self.print_call(*id)));
            }
            StatementNode::If(_)
            | StatementNode::While(_)
            | StatementNode::For(_)
            | StatementNode::Catch(_) => {}
        }
    }

    fn print_expression(&self, expression: &ExpressionNode) -> String {
        match expression {
            ExpressionNode::Variable(node) => node.name.clone(),
            ExpressionNode::Literal { value, .. } => match value {
                LiteralValue::Int(v) => v.to_string(),
                LiteralValue::Flint(v) => format!("{v:?}"),
                LiteralValue::Str(s) => format!("\"{s}\""),
                LiteralValue::Bool(v) => v.to_string(),
                LiteralValue::Char(c) => format!("'{c}'"),
            },
            ExpressionNode::Unary(node) => format!(
                "{}{}",
                operator_lexeme(node.operator),
                self.print_expression(&node.operand)
            ),
            ExpressionNode::Binary(node) => format!(
                "{} {} {}",
                self.print_operand(&node.lhs),
                operator_lexeme(node.operator),
                self.print_operand(&node.rhs)
            ),
            ExpressionNode::Call(id) => self.print_call(*id),
        }
    }

    /// Nested operations keep their grouping through explicit parens.
    fn print_operand(&self, expression: &ExpressionNode) -> String {
        match expression {
            ExpressionNode::Binary(_) => format!("({})", self.print_expression(expression)),
            other => self.print_expression(other),
        }
    }

    fn print_call(&self, id: crate::ast::CallId) -> String {
        let call = self.session.calls.get(id);
        let args: Vec<String> = call
            .arguments
            .iter()
            .map(|a| self.print_expression(a))
            .collect();
        format!("{}({})", call.function_name, args.join(", "))
    }
}
