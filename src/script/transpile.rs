// src/script/transpile.rs

//! Syntax lowering through `oxc_transformer`.
//!
//! Each module is parsed, transformed towards the configured target and
//! printed back with `oxc_codegen`. The printed code keeps its `import` and
//! `export` statements; module syntax is lowered afterwards by
//! [`crate::script::module`].

use std::fmt;
use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_semantic::SemanticBuilder;
use oxc_transformer::{ArrowFunctionsOptions, HelperLoaderMode, TransformOptions, Transformer};

use crate::errors::CompileError;

/// Target used when `[scripts.compiler].target` is not set.
pub const DEFAULT_TARGET: &str = "es5";

/// What transpiled code has to run on.
///
/// `es5` lowers everything the transformer implements past ES5 (arrow
/// functions, `??`, optional chaining, class fields, object rest/spread,
/// async functions) and template literals. Classes, `let`/`const` and
/// destructuring without rest are kept. Any other value is handed to
/// `oxc_transformer` as an esbuild-style target list (`es2017`,
/// `chrome58,firefox57`).
#[derive(Clone)]
pub struct ScriptTarget {
    name: String,
    options: TransformOptions,
    lower_templates: bool,
}

impl fmt::Debug for ScriptTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptTarget")
            .field("name", &self.name)
            .field("lower_templates", &self.lower_templates)
            .finish()
    }
}

impl Default for ScriptTarget {
    fn default() -> Self {
        Self::es5()
    }
}

impl ScriptTarget {
    pub fn parse(name: &str) -> Result<Self, String> {
        let name = name.trim();
        if name.eq_ignore_ascii_case(DEFAULT_TARGET) {
            return Ok(Self::es5());
        }
        let mut options = TransformOptions::from_target(name)?;
        options.helper_loader.mode = HelperLoaderMode::External;
        Ok(Self {
            name: name.to_string(),
            options,
            lower_templates: false,
        })
    }

    fn es5() -> Self {
        // The transformer's lowest preset is es2015, which keeps arrows.
        let mut options = TransformOptions::from_target("es2015").unwrap_or_default();
        options.env.es2015.arrow_function = Some(ArrowFunctionsOptions::default());
        options.helper_loader.mode = HelperLoaderMode::External;
        Self {
            name: DEFAULT_TARGET.to_string(),
            options,
            lower_templates: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether untagged template literals are rewritten to string
    /// concatenation after the transform.
    pub fn lowers_templates(&self) -> bool {
        self.lower_templates
    }
}

/// Transformed module text plus, per line of that text, the 0-based line of
/// the original source it was printed from.
#[derive(Debug)]
pub struct Transpiled {
    pub code: String,
    pub lines: Vec<Option<u32>>,
}

/// Transform `program` in place and print it.
pub fn transpile<'a>(
    allocator: &'a Allocator,
    path: &Path,
    mut program: Program<'a>,
    target: &ScriptTarget,
) -> Result<Transpiled, CompileError> {
    let semantic = SemanticBuilder::new()
        .with_excess_capacity(2.0)
        .build(&program);
    if let Some(err) = semantic.errors.first() {
        return Err(CompileError::transform(format!(
            "{} ({})",
            err.message,
            path.display()
        )));
    }
    let scoping = semantic.semantic.into_scoping();

    let ret = Transformer::new(allocator, path, &target.options)
        .build_with_scoping(scoping, &mut program);
    if let Some(err) = ret.errors.first() {
        return Err(CompileError::transform(format!(
            "{} ({})",
            err.message,
            path.display()
        )));
    }

    let printed = Codegen::new()
        .with_options(CodegenOptions {
            source_map_path: Some(path.to_path_buf()),
            ..CodegenOptions::default()
        })
        .build(&program);

    let line_count = printed.code.split('\n').count();
    let mut lines: Vec<Option<u32>> = vec![None; line_count];
    if let Some(map) = &printed.map {
        // First token on a generated line decides where the line came from.
        let mut first_col: Vec<u32> = vec![u32::MAX; line_count];
        for token in map.get_tokens() {
            let dst = token.get_dst_line() as usize;
            if dst < line_count && token.get_dst_col() < first_col[dst] {
                first_col[dst] = token.get_dst_col();
                lines[dst] = Some(token.get_src_line());
            }
        }
    }

    Ok(Transpiled {
        code: printed.code,
        lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn run(src: &str, target: &ScriptTarget) -> Transpiled {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, src, SourceType::mjs()).parse();
        assert!(ret.errors.is_empty());
        transpile(&allocator, Path::new("a.mjs"), ret.program, target).unwrap()
    }

    #[test]
    fn es5_lowers_modern_syntax() {
        let out = run(
            "const f = (x) => x ?? 1;\nconst o = { ...{ a: 1 } };\nclass A { #p = 1; get p() { return this.#p; } }\n",
            &ScriptTarget::default(),
        );
        assert!(!out.code.contains("=>"), "{}", out.code);
        assert!(!out.code.contains("??"), "{}", out.code);
        assert!(!out.code.contains("#p"), "{}", out.code);
        assert!(!out.code.contains("..."), "{}", out.code);
        assert!(out.code.contains("babelHelpers.objectSpread2"), "{}", out.code);
    }

    #[test]
    fn newer_targets_keep_supported_syntax() {
        let target = ScriptTarget::parse("es2020").unwrap();
        let out = run("const f = (x) => x ?? 1;\n", &target);
        assert!(out.code.contains("=>"));
        assert!(out.code.contains("??"));
        assert!(!target.lowers_templates());
    }

    #[test]
    fn lines_point_back_at_the_source() {
        let out = run("\n\nconst a = 1;\nconsole.log(a);\n", &ScriptTarget::default());
        let first = out.code.lines().position(|l| l.contains("const a")).unwrap();
        assert_eq!(out.lines[first], Some(2));
        assert_eq!(out.lines[first + 1], Some(3));
    }

    #[test]
    fn unknown_target_is_rejected() {
        assert!(ScriptTarget::parse("netscape4").is_err());
        assert_eq!(ScriptTarget::parse("ES5").unwrap().name(), "es5");
    }
}
