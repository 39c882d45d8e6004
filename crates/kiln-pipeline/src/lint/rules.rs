//! Individual lint rules.

use oxc_ast::ast::{
    BinaryExpression, BinaryOperator, DebuggerStatement, Directive, StringLiteral,
    VariableDeclaration, VariableDeclarationKind,
};
use oxc_ast_visit::{Visit, walk};
use oxc_span::GetSpan;

/// A rule violation at a byte offset of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Violation {
    pub rule: &'static str,
    pub offset: usize,
    pub message: String,
}

/// AST rules: `no-debugger`, `no-var-keyword`, `triple-equals`, `quotemark`.
pub(crate) struct AstRules<'s> {
    source: &'s str,
    pub violations: Vec<Violation>,
}

impl<'s> AstRules<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            source,
            violations: Vec::new(),
        }
    }

    fn report(&mut self, rule: &'static str, offset: u32, message: impl Into<String>) {
        self.violations.push(Violation {
            rule,
            offset: offset as usize,
            message: message.into(),
        });
    }
}

impl<'a> Visit<'a> for AstRules<'_> {
    fn visit_debugger_statement(&mut self, stmt: &DebuggerStatement) {
        self.report("no-debugger", stmt.span.start, "Use of debugger statements is forbidden");
    }

    fn visit_variable_declaration(&mut self, decl: &VariableDeclaration<'a>) {
        if decl.kind == VariableDeclarationKind::Var {
            self.report(
                "no-var-keyword",
                decl.span.start,
                "Forbidden 'var' keyword, use 'let' or 'const' instead",
            );
        }
        walk::walk_variable_declaration(self, decl);
    }

    fn visit_binary_expression(&mut self, expr: &BinaryExpression<'a>) {
        let message = match expr.operator {
            BinaryOperator::Equality => Some("== should be ==="),
            BinaryOperator::Inequality => Some("!= should be !=="),
            _ => None,
        };
        if let Some(message) = message {
            let start = expr.left.span().end;
            let end = expr.right.span().start;
            let between = self.source.get(start as usize..end as usize).unwrap_or("");
            let operator = between.find(['=', '!']).unwrap_or(0) as u32;
            self.report("triple-equals", start + operator, message);
        }
        walk::walk_binary_expression(self, expr);
    }

    // Prologue directives such as 'use strict' are exempt from quotemark.
    fn visit_directive(&mut self, _directive: &Directive<'a>) {}

    fn visit_string_literal(&mut self, lit: &StringLiteral<'a>) {
        if self.source.as_bytes().get(lit.span.start as usize) == Some(&b'\'') {
            self.report("quotemark", lit.span.start, "' should be \"");
        }
    }
}

/// Line rules: `no-trailing-whitespace` and `max-line-length`.
pub(crate) fn line_rules(source: &str, max_line_length: usize) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut offset = 0;

    for raw in source.split_inclusive('\n') {
        let line = raw.trim_end_matches(['\n', '\r']);

        let trimmed = line.trim_end_matches([' ', '\t']);
        if trimmed.len() < line.len() {
            violations.push(Violation {
                rule: "no-trailing-whitespace",
                offset: offset + trimmed.len(),
                message: "trailing whitespace".to_string(),
            });
        }

        if max_line_length > 0 && line.chars().count() > max_line_length {
            violations.push(Violation {
                rule: "max-line-length",
                offset,
                message: format!("Exceeds maximum line length of {}", max_line_length),
            });
        }

        offset += raw.len();
    }

    violations
}

/// One-based line and column of a byte offset.
pub(crate) fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}
