// src/script/module.rs

//! Per-module analysis and module-syntax lowering.
//!
//! A module is parsed with `oxc_parser`, transpiled (see
//! [`crate::script::transpile`]) and the printed code parsed again. The
//! result is a [`ModuleUnit`] holding the module's requests (in source order)
//! and its body rewritten so it can run as a CommonJS-style function inside
//! the bundle:
//!
//! - `import` declarations become `var` bindings over `require(...)`;
//! - `export` keywords are stripped and the exported names are published as
//!   getters through `__export(exports, {...})` at the top of the module;
//! - `export default <expr>` binds `__default`;
//! - re-exports read through the required module;
//! - for targets that need it, untagged template literals become
//!   `"...".concat(...)` calls.
//!
//! Every rewrite keeps the number of line breaks of the text it replaces, so
//! line `n` of the body is line `n` of the transpiled code.

use std::collections::BTreeSet;
use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, CallExpression, Declaration, ExportAllDeclaration, ExportDefaultDeclaration,
    ExportDefaultDeclarationKind, ExportNamedDeclaration, Expression, ImportDeclaration,
    ImportDeclarationSpecifier, ModuleExportName, Statement, StaticMemberExpression,
    TaggedTemplateExpression, TemplateLiteral,
};
use oxc_ast_visit::{Visit, walk};
use oxc_diagnostics::OxcDiagnostic;
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};

use crate::errors::CompileError;
use crate::paths;
use crate::script::transpile::{ScriptTarget, transpile};

/// A module ready to be placed in the bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleUnit {
    /// Distinct module requests in order of first appearance.
    pub requests: Vec<String>,
    /// Text placed on the wrapper's opening line, before the body.
    pub prologue: String,
    /// Lowered body.
    pub body: String,
    /// For each line of `body`, the 0-based source line it came from.
    pub lines: Vec<Option<u32>>,
    /// Runtime helpers (`babelHelpers.<name>`) the body calls.
    pub helpers: BTreeSet<String>,
}

/// Parse, transpile and lower `source`, read from `path`.
pub fn lower_module(
    path: &Path,
    source: &str,
    target: &ScriptTarget,
) -> Result<ModuleUnit, CompileError> {
    match paths::extension(path).as_deref() {
        Some("json") => lower_json(path, source),
        ext => lower_script(path, source, source_type_for(ext), target),
    }
}

fn source_type_for(ext: Option<&str>) -> SourceType {
    match ext {
        Some("mjs") => SourceType::mjs(),
        Some("cjs") => SourceType::cjs(),
        _ => SourceType::unambiguous(),
    }
}

fn lower_json(path: &Path, source: &str) -> Result<ModuleUnit, CompileError> {
    if let Err(err) = serde_json::from_str::<serde_json::Value>(source) {
        let frame = source_frame(path, source, line_col_to_offset(source, err.line(), err.column()));
        return Err(CompileError::Syntax {
            message: format!("invalid JSON in {}: {err}", path.display()),
            frame: Some(frame),
        });
    }

    let body = format!("module.exports = {};", source.trim_end());
    let lines = (0..body.split('\n').count() as u32).map(Some).collect();
    Ok(ModuleUnit {
        requests: Vec::new(),
        prologue: String::new(),
        body,
        lines,
        helpers: BTreeSet::new(),
    })
}

fn lower_script(
    path: &Path,
    source: &str,
    source_type: SourceType,
    target: &ScriptTarget,
) -> Result<ModuleUnit, CompileError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type).parse();

    if let Some(diagnostic) = ret.errors.first() {
        return Err(syntax_error(path, source, diagnostic));
    }
    if ret.panicked {
        return Err(CompileError::Syntax {
            message: format!("{}: parser gave up", path.display()),
            frame: None,
        });
    }

    let is_esm = ret.module_record.has_module_syntax;
    let transpiled = transpile(&allocator, path, ret.program, target)?;

    let printed_type = if is_esm {
        SourceType::mjs()
    } else {
        SourceType::cjs()
    };
    let printed_allocator = Allocator::default();
    let printed = Parser::new(&printed_allocator, &transpiled.code, printed_type).parse();
    if let Some(diagnostic) = printed.errors.first() {
        return Err(CompileError::transform(format!(
            "transpiled {} does not parse: {}",
            path.display(),
            diagnostic.message
        )));
    }

    let mut lowering = Lowering::new(&transpiled.code);
    for statement in &printed.program.body {
        lowering.statement(statement);
    }

    let mut scan = BodyScan::new(target.lowers_templates());
    scan.visit_program(&printed.program);
    for request in &scan.requests {
        lowering.request(request);
    }
    lowering.edits.append(&mut scan.edits);

    let mut unit = lowering.finish(is_esm, transpiled.lines);
    unit.helpers = scan.helpers;
    Ok(unit)
}

#[derive(Debug)]
struct Edit {
    span: Span,
    text: String,
}

struct Lowering<'s> {
    source: &'s str,
    edits: Vec<Edit>,
    getters: Vec<(String, String)>,
    requests: Vec<String>,
    next_binding: usize,
}

impl<'s> Lowering<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            edits: Vec::new(),
            getters: Vec::new(),
            requests: Vec::new(),
            next_binding: 0,
        }
    }

    fn request(&mut self, specifier: &str) {
        if !self.requests.iter().any(|r| r == specifier) {
            self.requests.push(specifier.to_string());
        }
    }

    fn binding(&mut self) -> String {
        let name = format!("__module{}", self.next_binding);
        self.next_binding += 1;
        name
    }

    fn replace(&mut self, span: Span, text: String) {
        self.edits.push(Edit { span, text });
    }

    fn getter(&mut self, exported: &str, expr: String) {
        self.getters.push((exported.to_string(), expr));
    }

    fn statement(&mut self, statement: &Statement<'_>) {
        match statement {
            Statement::ImportDeclaration(decl) => self.import(decl),
            Statement::ExportNamedDeclaration(decl) => self.export_named(decl),
            Statement::ExportDefaultDeclaration(decl) => self.export_default(decl),
            Statement::ExportAllDeclaration(decl) => self.export_all(decl),
            _ => {}
        }
    }

    fn import(&mut self, decl: &ImportDeclaration<'_>) {
        if decl.import_kind.is_type() {
            self.replace(decl.span, String::new());
            return;
        }

        let specifier = decl.source.value.as_str();
        self.request(specifier);

        let specifiers = match &decl.specifiers {
            Some(list) if !list.is_empty() => list,
            _ => {
                self.replace(decl.span, format!("require({});", js_string(specifier)));
                return;
            }
        };

        let module = self.binding();
        let mut text = format!("var {module} = require({});", js_string(specifier));
        for spec in specifiers {
            match spec {
                ImportDeclarationSpecifier::ImportSpecifier(s) => {
                    if s.import_kind.is_type() {
                        continue;
                    }
                    let imported = s.imported.name();
                    let local = s.local.name.as_str();
                    if imported.as_str() == "default" {
                        text.push_str(&format!(" var {local} = __importDefault({module});"));
                    } else {
                        text.push_str(&format!(
                            " var {local} = {module}[{}];",
                            js_string(imported.as_str())
                        ));
                    }
                }
                ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                    text.push_str(&format!(
                        " var {} = __importDefault({module});",
                        s.local.name
                    ));
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                    text.push_str(&format!(" var {} = {module};", s.local.name));
                }
            }
        }
        self.replace(decl.span, text);
    }

    fn export_named(&mut self, decl: &ExportNamedDeclaration<'_>) {
        if decl.export_kind.is_type() {
            self.replace(decl.span, String::new());
            return;
        }

        if let Some(declaration) = &decl.declaration {
            if declaration.is_typescript_syntax() {
                self.replace(decl.span, String::new());
                return;
            }
            // Keep the declaration, drop the `export` keyword in front of it.
            let start = declaration.span().start;
            self.replace(Span::new(decl.span.start, start), String::new());
            for name in declared_names(declaration) {
                self.getter(&name, name.clone());
            }
            return;
        }

        match &decl.source {
            Some(source) => {
                let specifier = source.value.as_str();
                self.request(specifier);
                let module = self.binding();
                for spec in &decl.specifiers {
                    if spec.export_kind.is_type() {
                        continue;
                    }
                    let exported = spec.exported.name();
                    let expr = member_of(&module, &spec.local);
                    self.getter(exported.as_str(), expr);
                }
                self.replace(
                    decl.span,
                    format!("var {module} = require({});", js_string(specifier)),
                );
            }
            None => {
                for spec in &decl.specifiers {
                    if spec.export_kind.is_type() {
                        continue;
                    }
                    let exported = spec.exported.name();
                    let local = spec.local.name();
                    self.getter(exported.as_str(), local.to_string());
                }
                self.replace(decl.span, String::new());
            }
        }
    }

    fn export_default(&mut self, decl: &ExportDefaultDeclaration<'_>) {
        let (named, inner) = match &decl.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                (func.id.as_ref().map(|id| id.name.to_string()), func.span)
            }
            ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                (class.id.as_ref().map(|id| id.name.to_string()), class.span)
            }
            ExportDefaultDeclarationKind::TSInterfaceDeclaration(_) => {
                self.replace(decl.span, String::new());
                return;
            }
            other => {
                // Expression: `export default <expr>;` -> `var __default = <expr>;`
                let start = other.span().start;
                self.replace(
                    Span::new(decl.span.start, start),
                    "var __default = ".to_string(),
                );
                self.getter("default", "__default".to_string());
                return;
            }
        };

        match named {
            Some(name) => {
                self.replace(Span::new(decl.span.start, inner.start), String::new());
                self.getter("default", name);
            }
            None => {
                // Anonymous function or class: bind it, it has no name to export.
                self.replace(
                    Span::new(decl.span.start, inner.start),
                    "var __default = ".to_string(),
                );
                self.replace(Span::new(inner.end, inner.end), ";".to_string());
                self.getter("default", "__default".to_string());
            }
        }
    }

    fn export_all(&mut self, decl: &ExportAllDeclaration<'_>) {
        if decl.export_kind.is_type() {
            self.replace(decl.span, String::new());
            return;
        }

        let specifier = decl.source.value.as_str();
        self.request(specifier);

        match &decl.exported {
            Some(name) => {
                let module = self.binding();
                self.getter(name.name().as_str(), module.clone());
                self.replace(
                    decl.span,
                    format!("var {module} = require({});", js_string(specifier)),
                );
            }
            None => {
                self.replace(
                    decl.span,
                    format!("__exportStar(exports, require({}));", js_string(specifier)),
                );
            }
        }
    }

    fn finish(mut self, is_esm: bool, lines: Vec<Option<u32>>) -> ModuleUnit {
        let mut prologue = String::new();
        if is_esm {
            prologue.push_str("\"use strict\"; __export(exports, {");
            for (i, (name, expr)) in self.getters.iter().enumerate() {
                if i > 0 {
                    prologue.push_str(", ");
                }
                prologue.push_str(&format!(
                    "{}: function () {{ return {expr}; }}",
                    js_string(name)
                ));
            }
            prologue.push_str("});");
        }

        self.edits.sort_by_key(|e| (e.span.start, e.span.end));

        let mut body = String::with_capacity(self.source.len());
        let mut cursor = 0usize;
        for edit in &self.edits {
            let start = edit.span.start as usize;
            let end = edit.span.end as usize;
            if start < cursor {
                continue;
            }
            body.push_str(&self.source[cursor..start]);
            body.push_str(&edit.text);
            // Keep original line breaks so lines stay aligned.
            let replaced = &self.source[start..end];
            for _ in 0..replaced.matches('\n').count() {
                body.push('\n');
            }
            cursor = end;
        }
        body.push_str(&self.source[cursor..]);

        ModuleUnit {
            requests: self.requests,
            prologue,
            body,
            lines,
            helpers: BTreeSet::new(),
        }
    }
}

/// Names bound by an exported declaration.
fn declared_names(declaration: &Declaration<'_>) -> Vec<String> {
    match declaration {
        Declaration::VariableDeclaration(var) => var
            .declarations
            .iter()
            .flat_map(|d| d.id.get_binding_identifiers())
            .map(|id| id.name.to_string())
            .collect(),
        Declaration::FunctionDeclaration(func) => func
            .id
            .as_ref()
            .map(|id| vec![id.name.to_string()])
            .unwrap_or_default(),
        Declaration::ClassDeclaration(class) => class
            .id
            .as_ref()
            .map(|id| vec![id.name.to_string()])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn member_of(module: &str, local: &ModuleExportName<'_>) -> String {
    let name = local.name();
    if name.as_str() == "default" {
        format!("__importDefault({module})")
    } else {
        format!("{module}[{}]", js_string(name.as_str()))
    }
}

/// Whole-program scan of the printed code: `require("literal")` calls,
/// helper references and, when enabled, template literal rewrites.
struct BodyScan {
    lower_templates: bool,
    requests: Vec<String>,
    helpers: BTreeSet<String>,
    edits: Vec<Edit>,
}

impl BodyScan {
    fn new(lower_templates: bool) -> Self {
        Self {
            lower_templates,
            requests: Vec::new(),
            helpers: BTreeSet::new(),
            edits: Vec::new(),
        }
    }

    /// `` `a${x}b` `` -> `"a".concat(x, "b")`. Only the text between the
    /// expressions is replaced, so nested literals rewrite independently.
    fn template(&mut self, it: &TemplateLiteral<'_>) {
        if it.quasis.iter().any(|q| q.lone_surrogates) {
            return;
        }
        let strings: Vec<String> = it
            .quasis
            .iter()
            .map(|q| js_string(q.value.cooked.as_ref().unwrap_or(&q.value.raw).as_str()))
            .collect();

        let n = it.expressions.len();
        if strings.len() != n + 1 {
            return;
        }
        if n == 0 {
            self.edits.push(Edit {
                span: it.span,
                text: format!("({})", strings[0]),
            });
            return;
        }

        for i in 0..=n {
            let start = if i == 0 { it.span.start } else { it.expressions[i - 1].span().end };
            let end = if i == n { it.span.end } else { it.expressions[i].span().start };
            let text = if i == 0 {
                format!("{}.concat(", strings[0])
            } else if i == n {
                format!(", {})", strings[n])
            } else {
                format!(", {}, ", strings[i])
            };
            self.edits.push(Edit {
                span: Span::new(start, end),
                text,
            });
        }
    }
}

impl<'a> Visit<'a> for BodyScan {
    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if let Expression::Identifier(callee) = &it.callee {
            if callee.name.as_str() == "require" && it.arguments.len() == 1 {
                if let Some(Argument::StringLiteral(lit)) = it.arguments.first() {
                    self.requests.push(lit.value.to_string());
                }
            }
        }
        walk::walk_call_expression(self, it);
    }

    fn visit_static_member_expression(&mut self, it: &StaticMemberExpression<'a>) {
        if let Expression::Identifier(object) = &it.object {
            if object.name.as_str() == "babelHelpers" {
                self.helpers.insert(it.property.name.to_string());
            }
        }
        walk::walk_static_member_expression(self, it);
    }

    fn visit_template_literal(&mut self, it: &TemplateLiteral<'a>) {
        if self.lower_templates {
            self.template(it);
        }
        walk::walk_template_literal(self, it);
    }

    fn visit_tagged_template_expression(&mut self, it: &TaggedTemplateExpression<'a>) {
        // The tag receives the literal's parts; leave the literal itself alone.
        self.visit_expression(&it.tag);
        for expr in &it.quasi.expressions {
            self.visit_expression(expr);
        }
    }
}

fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

fn syntax_error(path: &Path, source: &str, diagnostic: &OxcDiagnostic) -> CompileError {
    let offset = diagnostic
        .labels
        .as_ref()
        .and_then(|labels| labels.first())
        .map(|label| label.offset());

    match offset {
        Some(offset) => {
            let (line, col) = line_col(source, offset);
            CompileError::Syntax {
                message: format!("{} ({}:{}:{})", diagnostic.message, path.display(), line, col),
                frame: Some(source_frame(path, source, offset)),
            }
        }
        None => CompileError::Syntax {
            message: format!("{} ({})", diagnostic.message, path.display()),
            frame: None,
        },
    }
}

/// 1-based line and column of byte `offset`.
fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source[..floor_char_boundary(source, offset)];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let col = before[line_start..].chars().count() + 1;
    (line, col)
}

fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    let col_bytes: usize = source[line_start..]
        .chars()
        .take(column.saturating_sub(1))
        .map(char::len_utf8)
        .sum();
    line_start + col_bytes
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// `path:line:col`, the offending line and a caret under the column.
pub fn source_frame(path: &Path, source: &str, offset: usize) -> String {
    let (line, col) = line_col(source, offset);
    let text = source.lines().nth(line - 1).unwrap_or("");
    let gutter = line.to_string();
    let pad = " ".repeat(gutter.len());
    format!(
        "{}:{line}:{col}\n{gutter} | {text}\n{pad} | {}^",
        path.display(),
        " ".repeat(col - 1)
    )
}
