// tests/script_pipeline.rs

mod common;
use crate::common::{init_tracing, list_files};

use std::error::Error;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use assetforge::errors::{CompileError, CompileErrorKind};
use assetforge::pipeline::Pipeline;
use assetforge::script::ScriptPipeline;
use assetforge::types::PipelineKind;
use assetforge_test_utils::{PipelineConfigBuilder, ProjectFixture, RecordingReporter};

type TestResult = Result<(), Box<dyn Error>>;

fn pipeline(fixture: &ProjectFixture) -> (ScriptPipeline, Arc<RecordingReporter>) {
    let reporter = Arc::new(RecordingReporter::new());
    (ScriptPipeline::new(fixture.paths(), reporter.clone()), reporter)
}

/// Stdout of `node <bundle>`, or `None` when node is not installed.
fn run_with_node(bundle: &Path) -> Result<Option<String>, Box<dyn Error>> {
    let output = match Command::new("node").arg(bundle).output() {
        Ok(output) => output,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            eprintln!("node not found, not executing {}", bundle.display());
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };
    assert!(
        output.status.success(),
        "bundle failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(Some(String::from_utf8(output.stdout)?))
}

fn app(fixture: &ProjectFixture) {
    fixture.write(
        "src/scripts/main.js",
        "import greet, { name } from './greet.mjs';\n\
         const util = require('./util');\n\
         console.log(greet(name), util.twice(2));\n",
    );
    fixture.write(
        "src/scripts/greet.mjs",
        "export const name = 'world';\nexport default function greet(n) {\n  return `hello ${n}`;\n}\n",
    );
    fixture.write(
        "src/scripts/util.js",
        "exports.twice = function (x) { return x * 2; };\n",
    );
}

#[tokio::test]
async fn bundles_esm_and_commonjs_modules() -> TestResult {
    init_tracing();
    let fixture = ProjectFixture::new();
    app(&fixture);

    let (pipeline, reporter) = pipeline(&fixture);
    let config = PipelineConfigBuilder::new("src/scripts", "main.js", "build/js/bundle.js").build();
    let result = pipeline.compile(config).await?;

    assert_eq!(result.pipeline, PipelineKind::Scripts);
    assert_eq!(result.output_path, fixture.path("build/js/bundle.js"));
    assert!(result.source_map_path.is_none());

    let bundle = fixture.read("build/js/bundle.js");
    assert!(bundle.starts_with("(function () {\n"));
    assert!(bundle.contains("0: [function (require, module, exports) {"));
    assert!(bundle.contains("{\"./greet.mjs\": 1, \"./util\": 2}"), "{bundle}");
    assert!(bundle.contains("var __module0 = require(\"./greet.mjs\");"));
    assert!(bundle.contains("\"name\": function () { return name; }"));
    assert!(bundle.contains("exports.twice = function"));
    assert!(bundle.ends_with("__load(0);\n})();\n"));
    assert!(!bundle.contains("export "), "{bundle}");

    let events = reporter.compiled();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].file, "main.js");
    Ok(())
}

#[tokio::test]
async fn bundle_runs_and_links_modules() -> TestResult {
    init_tracing();
    let fixture = ProjectFixture::new();
    app(&fixture);
    fixture.write(
        "src/scripts/reexport.mjs",
        "export { default as hello } from './greet.mjs';\nexport * from './greet.mjs';\n",
    );
    fixture.write(
        "src/scripts/main.js",
        "import greet, { name } from './greet.mjs';\n\
         import * as all from './reexport.mjs';\n\
         const util = require('./util');\n\
         const cjsView = require('./greet.mjs');\n\
         console.log(greet(name), util.twice(2));\n\
         console.log(all.hello('again'), all.name, typeof cjsView.default, cjsView.__esModule);\n",
    );

    let (pipeline, _) = pipeline(&fixture);
    let config = PipelineConfigBuilder::new("src/scripts", "main.js", "build/app.js").build();
    pipeline.compile(config).await?;

    if let Some(stdout) = run_with_node(&fixture.path("build/app.js"))? {
        assert_eq!(stdout, "hello world 4\nhello again world function true\n");
    }
    Ok(())
}

#[tokio::test]
async fn modern_syntax_is_transpiled() -> TestResult {
    init_tracing();
    let fixture = ProjectFixture::new();
    fixture.write(
        "src/main.mjs",
        "import { Counter } from './counter.mjs';\n\
         const pick = (o) => o?.value ?? 'none';\n\
         const c = new Counter();\n\
         c.bump();\n\
         c.bump();\n\
         const merged = { ...{ a: 1 }, b: 2 };\n\
         console.log(`${pick({ value: c.count })}|${pick(null)}|${JSON.stringify(merged)}`);\n",
    );
    fixture.write(
        "src/counter.mjs",
        "export class Counter {\n  #n = 0;\n  bump() { this.#n += 1; }\n  get count() { return this.#n; }\n}\n",
    );

    let (pipeline, _) = pipeline(&fixture);
    let config = PipelineConfigBuilder::new("src", "main.mjs", "out/app.js").build();
    pipeline.compile(config).await?;

    let bundle = fixture.read("out/app.js");
    for construct in ["=>", "??", "?.", "#n", "...", "`"] {
        assert!(!bundle.contains(construct), "{construct} survived:\n{bundle}");
    }
    assert!(bundle.contains("var babelHelpers = {};"), "{bundle}");
    assert!(bundle.contains("babelHelpers.classPrivateFieldInitSpec = function"));
    assert!(bundle.contains("babelHelpers.objectSpread2 = function"));

    if let Some(stdout) = run_with_node(&fixture.path("out/app.js"))? {
        assert_eq!(stdout, "2|none|{\"a\":1,\"b\":2}\n");
    }
    Ok(())
}

#[tokio::test]
async fn newer_target_keeps_supported_syntax() -> TestResult {
    init_tracing();
    let fixture = ProjectFixture::new();
    fixture.write("src/main.js", "const f = (x) => x ?? `none`;\nconsole.log(f(null));\n");

    let (pipeline, _) = pipeline(&fixture);
    let config = PipelineConfigBuilder::new("src", "main.js", "out/app.js")
        .target("es2020")
        .build();
    pipeline.compile(config).await?;

    let bundle = fixture.read("out/app.js");
    assert!(bundle.contains("=>") && bundle.contains("??"), "{bundle}");
    assert!(!bundle.contains("babelHelpers"));
    Ok(())
}

#[tokio::test]
async fn configured_extensions_resolve_extensionless_requests() -> TestResult {
    init_tracing();
    let fixture = ProjectFixture::new();
    fixture.write("src/scripts/index.es6", "import { label } from './widget';\nconsole.log(label);\n");
    fixture.write("src/scripts/widget.es6", "export const label = 'widget';\n");

    let (pipeline, _) = pipeline(&fixture);
    let plain = PipelineConfigBuilder::new("src/scripts", "index.es6", "build/main.js").build();
    let err = pipeline.compile(plain).await.unwrap_err();
    assert_eq!(err.kind(), CompileErrorKind::Resolution);

    let config = PipelineConfigBuilder::new("src/scripts", "index.es6", "build/main.js")
        .extension(".es6")
        .build();
    pipeline.compile(config).await?;
    let bundle = fixture.read("build/main.js");
    assert!(bundle.contains("{\"./widget\": 1}"), "{bundle}");

    if let Some(stdout) = run_with_node(&fixture.path("build/main.js"))? {
        assert_eq!(stdout, "widget\n");
    }
    Ok(())
}

#[tokio::test]
async fn bare_specifiers_resolve_through_node_modules() -> TestResult {
    init_tracing();
    let fixture = ProjectFixture::new();
    fixture.write("src/main.js", "import lib from 'tiny-lib';\nlib();\n");
    fixture.write(
        "node_modules/tiny-lib/package.json",
        "{\"name\": \"tiny-lib\", \"main\": \"lib/index.js\"}",
    );
    fixture.write("node_modules/tiny-lib/lib/index.js", "module.exports = function () {};\n");

    let (pipeline, _) = pipeline(&fixture);
    let config = PipelineConfigBuilder::new("src", "main.js", "out/app.js").build();
    pipeline.compile(config).await?;

    let bundle = fixture.read("out/app.js");
    assert!(bundle.contains("{\"tiny-lib\": 1}"), "{bundle}");
    assert!(bundle.contains("module.exports = function"));
    Ok(())
}

#[tokio::test]
async fn source_map_points_back_to_modules() -> TestResult {
    init_tracing();
    let fixture = ProjectFixture::new();
    app(&fixture);

    let (pipeline, _) = pipeline(&fixture);
    let config = PipelineConfigBuilder::new("src/scripts", "main.js", "build/js/bundle.js")
        .source_map(true)
        .build();
    let result = pipeline.compile(config).await?;

    assert_eq!(result.source_map_path, Some(fixture.path("build/js/bundle.js.map")));
    let bundle = fixture.read("build/js/bundle.js");
    assert!(bundle.ends_with("//# sourceMappingURL=bundle.js.map\n"));

    let map: serde_json::Value = serde_json::from_str(&fixture.read("build/js/bundle.js.map"))?;
    assert_eq!(map["version"], 3);
    assert_eq!(map["file"], "bundle.js");
    let sources: Vec<&str> = map["sources"]
        .as_array()
        .ok_or("sources is not an array")?
        .iter()
        .filter_map(|s| s.as_str())
        .collect();
    assert_eq!(
        sources,
        vec![
            "../../src/scripts/main.js",
            "../../src/scripts/greet.mjs",
            "../../src/scripts/util.js",
        ]
    );
    assert_eq!(map["sourcesContent"].as_array().map(Vec::len), Some(3));
    assert!(map["mappings"].as_str().is_some_and(|m| m.contains("AAAA")));
    Ok(())
}

#[tokio::test]
async fn syntax_error_has_a_source_frame() -> TestResult {
    init_tracing();
    let fixture = ProjectFixture::new();
    fixture.write("src/main.js", "import './broken.js';\n");
    fixture.write("src/broken.js", "const ok = 1;\nconst = 2;\n");

    let (pipeline, reporter) = pipeline(&fixture);
    let config = PipelineConfigBuilder::new("src", "main.js", "out/app.js")
        .source_map(true)
        .build();
    let err = pipeline.compile(config).await.unwrap_err();

    assert_eq!(err.kind(), CompileErrorKind::Syntax);
    let frame = err.source_frame().ok_or("missing frame")?;
    assert!(frame.contains("broken.js:2:"), "{frame}");
    assert!(frame.contains("2 | const = 2;"), "{frame}");
    assert!(frame.lines().last().is_some_and(|l| l.ends_with('^')));

    assert!(list_files(&fixture.path("out")).is_empty());
    assert!(reporter.compiled().is_empty());
    Ok(())
}

#[tokio::test]
async fn unresolved_import_is_a_resolution_error() -> TestResult {
    init_tracing();
    let fixture = ProjectFixture::new();
    fixture.write("src/main.js", "import { x } from './missing';\n");

    let (pipeline, _) = pipeline(&fixture);
    let config = PipelineConfigBuilder::new("src", "main.js", "out/app.js").build();
    let err = pipeline.compile(config).await.unwrap_err();

    assert!(matches!(err, CompileError::Resolution { .. }), "{err:?}");
    assert!(err.to_string().contains("./missing"), "{err}");
    assert!(!fixture.exists("out/app.js"));
    Ok(())
}

#[tokio::test]
async fn failed_compile_keeps_previous_bundle() -> TestResult {
    init_tracing();
    let fixture = ProjectFixture::new();
    fixture.write("src/main.js", "console.log(1);\n");

    let (pipeline, _) = pipeline(&fixture);
    let config = PipelineConfigBuilder::new("src", "main.js", "out/app.js")
        .source_map(true)
        .build();
    pipeline.compile(config.clone()).await?;
    let bundle = fixture.read("out/app.js");
    let map = fixture.read("out/app.js.map");

    fixture.write("src/main.js", "console.log(;\n");
    assert!(pipeline.compile(config).await.is_err());

    assert_eq!(fixture.read("out/app.js"), bundle);
    assert_eq!(fixture.read("out/app.js.map"), map);
    assert_eq!(list_files(&fixture.path("out")).len(), 2);
    Ok(())
}

#[tokio::test]
async fn compiling_twice_is_deterministic() -> TestResult {
    init_tracing();
    let fixture = ProjectFixture::new();
    app(&fixture);

    let (pipeline, _) = pipeline(&fixture);
    let config = PipelineConfigBuilder::new("src/scripts", "main.js", "build/bundle.js")
        .source_map(true)
        .build();

    pipeline.compile(config.clone()).await?;
    let first = std::fs::read(fixture.path("build/bundle.js"))?;
    pipeline.compile(config).await?;
    let second = std::fs::read(fixture.path("build/bundle.js"))?;

    assert_eq!(first, second);
    Ok(())
}
