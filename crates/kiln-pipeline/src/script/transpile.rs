//! Per-module TypeScript to JavaScript compilation with oxc.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    ExportAllDeclaration, ExportNamedDeclaration, Expression, ImportDeclaration, ImportExpression,
};
use oxc_ast_visit::{Visit, walk};
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{TransformOptions, Transformer};
use std::path::Path;

use crate::error::{PipelineError, Result};

/// JavaScript produced from one source module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transpiled {
    pub code: String,
    /// Source map JSON mapping `code` back to the module source.
    pub map: Option<String>,
    /// Import specifiers as written, in source order, type-only imports excluded.
    pub imports: Vec<String>,
}

/// Compile one module. Type annotations are stripped; everything else is
/// left for the bundler.
pub fn transpile(path: &Path, source: &str) -> Result<Transpiled> {
    let allocator = Allocator::default();
    let source_type = SourceType::from_path(path)
        .map_err(|e| PipelineError::compile(format!("{}: {}", path.display(), e)))?;

    let parsed = Parser::new(&allocator, source, source_type).parse();
    if !parsed.errors.is_empty() {
        return Err(PipelineError::Compile {
            diagnostics: parsed
                .errors
                .iter()
                .map(|e| format!("{}: {}", path.display(), e))
                .collect(),
        });
    }
    let mut program = parsed.program;

    let mut collector = ImportCollector::default();
    collector.visit_program(&program);

    let scoping = SemanticBuilder::new().build(&program).semantic.into_scoping();
    let transformed = Transformer::new(&allocator, path, &TransformOptions::default())
        .build_with_scoping(scoping, &mut program);
    if !transformed.errors.is_empty() {
        return Err(PipelineError::Compile {
            diagnostics: transformed
                .errors
                .iter()
                .map(|e| format!("{}: {}", path.display(), e))
                .collect(),
        });
    }

    let generated = Codegen::new()
        .with_options(CodegenOptions {
            source_map_path: Some(path.to_path_buf()),
            ..CodegenOptions::default()
        })
        .build(&program);

    Ok(Transpiled {
        code: generated.code,
        map: generated.map.map(|map| map.to_json_string()),
        imports: collector.imports,
    })
}

/// Collects static and literal dynamic import specifiers.
#[derive(Default)]
struct ImportCollector {
    imports: Vec<String>,
}

impl ImportCollector {
    fn push(&mut self, specifier: &str) {
        if !self.imports.iter().any(|s| s == specifier) {
            self.imports.push(specifier.to_string());
        }
    }
}

impl<'a> Visit<'a> for ImportCollector {
    fn visit_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
        if !decl.import_kind.is_type() {
            self.push(decl.source.value.as_str());
        }
    }

    fn visit_export_named_declaration(&mut self, decl: &ExportNamedDeclaration<'a>) {
        if let Some(source) = &decl.source
            && !decl.export_kind.is_type()
        {
            self.push(source.value.as_str());
        }
        walk::walk_export_named_declaration(self, decl);
    }

    fn visit_export_all_declaration(&mut self, decl: &ExportAllDeclaration<'a>) {
        if !decl.export_kind.is_type() {
            self.push(decl.source.value.as_str());
        }
    }

    fn visit_import_expression(&mut self, expr: &ImportExpression<'a>) {
        if let Expression::StringLiteral(literal) = &expr.source {
            self.push(literal.value.as_str());
        }
        walk::walk_import_expression(self, expr);
    }
}
