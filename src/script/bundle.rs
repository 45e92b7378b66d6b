// src/script/bundle.rs

//! Module graph discovery and bundle emission.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::errors::CompileError;
use crate::paths::{normalize, relative_between};
use crate::script::helpers;
use crate::script::module::{ModuleUnit, lower_module};
use crate::script::resolve::{Extensions, resolve_specifier};
use crate::script::transpile::ScriptTarget;
use crate::sourcemap::SourceMapBuilder;

/// How modules are found and transpiled while building a graph.
#[derive(Debug, Clone, Default)]
pub struct GraphOptions {
    pub target: ScriptTarget,
    pub extensions: Extensions,
}

#[derive(Debug)]
pub struct GraphModule {
    pub path: PathBuf,
    pub source: String,
    pub unit: ModuleUnit,
    /// Request -> module id, in request order.
    pub deps: Vec<(String, usize)>,
}

/// All modules reachable from an entry point.
///
/// Node indices double as module ids: the entry is 0 and the rest follow in
/// breadth-first discovery order, which only depends on the sources.
#[derive(Debug)]
pub struct ModuleGraph {
    graph: DiGraph<GraphModule, ()>,
}

impl ModuleGraph {
    pub fn build(entry: &Path, options: &GraphOptions) -> Result<Self, CompileError> {
        let entry = normalize(entry);
        if !entry.is_file() {
            return Err(CompileError::resolution(format!(
                "entry module {} does not exist",
                entry.display()
            )));
        }

        let mut graph: DiGraph<GraphModule, ()> = DiGraph::new();
        let mut index: HashMap<PathBuf, NodeIndex> = HashMap::new();
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();

        let root = graph.add_node(load_module(&entry, &options.target)?);
        index.insert(entry, root);
        queue.push_back(root);

        while let Some(node) = queue.pop_front() {
            let importer = graph[node].path.clone();
            let requests = graph[node].unit.requests.clone();
            let mut deps = Vec::with_capacity(requests.len());

            for request in requests {
                let resolved = resolve_specifier(&importer, &request, &options.extensions)?;
                let dep = match index.get(&resolved) {
                    Some(&existing) => existing,
                    None => {
                        let added = graph.add_node(load_module(&resolved, &options.target)?);
                        index.insert(resolved, added);
                        queue.push_back(added);
                        added
                    }
                };
                graph.update_edge(node, dep, ());
                deps.push((request, dep.index()));
            }

            graph[node].deps = deps;
        }

        let cycles = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .count();
        if cycles > 0 {
            debug!(cycles, "module graph contains import cycles");
        }
        debug!(modules = graph.node_count(), "module graph built");

        Ok(Self { graph })
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn modules(&self) -> impl Iterator<Item = &GraphModule> {
        self.graph.node_indices().map(move |i| &self.graph[i])
    }

    /// Runtime helpers used anywhere in the graph.
    pub fn helpers(&self) -> BTreeSet<&str> {
        self.modules()
            .flat_map(|m| m.unit.helpers.iter().map(String::as_str))
            .collect()
    }
}

fn load_module(path: &Path, target: &ScriptTarget) -> Result<GraphModule, CompileError> {
    let source = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => {
            CompileError::resolution(format!("module {} disappeared", path.display()))
        }
        _ => CompileError::io(format!("reading module {:?}", path), e),
    })?;
    let unit = lower_module(path, &source, target)?;
    Ok(GraphModule {
        path: path.to_path_buf(),
        source,
        unit,
        deps: Vec::new(),
    })
}

const RUNTIME: &str = r#"var __cache = {};
function __load(id) {
  var cached = __cache[id];
  if (cached) return cached.exports;
  var module = __cache[id] = { exports: {} };
  var entry = __modules[id];
  entry[0].call(module.exports, function (request) {
    var dep = entry[1][request];
    if (dep === undefined) throw new Error("Cannot find module '" + request + "'");
    return __load(dep);
  }, module, module.exports);
  return module.exports;
}
function __export(target, getters) {
  Object.defineProperty(target, "__esModule", { value: true });
  for (var name in getters) {
    Object.defineProperty(target, name, { enumerable: true, get: getters[name] });
  }
}
function __exportStar(target, source) {
  Object.keys(source).forEach(function (name) {
    if (name === "default" || Object.prototype.hasOwnProperty.call(target, name)) return;
    Object.defineProperty(target, name, { enumerable: true, get: function () { return source[name]; } });
  });
}
function __importDefault(mod) {
  return mod && mod.__esModule ? mod["default"] : mod;
}"#;

/// Where the bundle and its map end up, for map-relative paths.
#[derive(Debug, Clone)]
pub struct MapTarget {
    pub output: PathBuf,
    pub map: PathBuf,
}

#[derive(Debug)]
pub struct Bundle {
    pub code: String,
    pub map: Option<String>,
}

struct LineWriter {
    out: String,
    line: usize,
}

impl LineWriter {
    fn push_line(&mut self, text: &str) -> usize {
        let at = self.line;
        self.out.push_str(text);
        self.out.push('\n');
        self.line += 1;
        at
    }
}

pub fn emit(graph: &ModuleGraph, target: Option<&MapTarget>) -> Result<Bundle, CompileError> {
    let helper_source = helpers::prelude(graph.helpers())?;

    let mut w = LineWriter {
        out: String::new(),
        line: 0,
    };
    let mut map = target.map(|t| {
        let file = t
            .output
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        SourceMapBuilder::new(file)
    });
    let out_dir = target
        .and_then(|t| t.output.parent())
        .map(Path::to_path_buf)
        .unwrap_or_default();

    w.push_line("(function () {");
    w.push_line("var __modules = {");

    for (id, module) in graph.modules().enumerate() {
        let source_idx = map.as_mut().map(|m| {
            m.add_source(relative_between(&out_dir, &module.path), module.source.clone())
        });

        w.push_line(&format!(
            "{id}: [function (require, module, exports) {{{}",
            module.unit.prologue
        ));
        for (idx, text) in module.unit.body.split('\n').enumerate() {
            let generated = w.push_line(text);
            let original = module.unit.lines.get(idx).copied().flatten();
            if let (Some(m), Some(src), Some(line)) = (map.as_mut(), source_idx, original) {
                m.map_line(generated, src, line as usize);
            }
        }

        let deps = module
            .deps
            .iter()
            .map(|(request, dep)| format!("{}: {dep}", js_key(request)))
            .collect::<Vec<_>>()
            .join(", ");
        w.push_line(&format!("}}, {{{deps}}}],"));
    }

    w.push_line("};");
    for line in RUNTIME.lines() {
        w.push_line(line);
    }
    if let Some(helper_source) = &helper_source {
        for line in helper_source.lines() {
            w.push_line(line);
        }
    }
    w.push_line("__load(0);");
    w.push_line("})();");

    let map_json = match (map, target) {
        (Some(m), Some(t)) => {
            let name = t
                .map
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            w.push_line(&format!("//# sourceMappingURL={name}"));
            Some(m.to_json())
        }
        _ => None,
    };

    Ok(Bundle {
        code: w.out,
        map: map_json,
    })
}

fn js_key(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn shared_dependency_is_bundled_once() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "main.js", "require('./a');\nrequire('./b');\n");
        write(root, "a.js", "module.exports = require('./shared');\n");
        write(root, "b.js", "module.exports = require('./shared');\n");
        write(root, "shared.js", "module.exports = 1;\n");

        let graph = ModuleGraph::build(&root.join("main.js"), &GraphOptions::default()).unwrap();
        assert_eq!(graph.len(), 4);
        let order: Vec<_> = graph
            .modules()
            .map(|m| m.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(order, vec!["main.js", "a.js", "b.js", "shared.js"]);
    }

    #[test]
    fn cycles_are_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "a.mjs", "import { b } from './b.mjs';\nexport const a = 1;\n");
        write(root, "b.mjs", "import { a } from './a.mjs';\nexport const b = 2;\n");

        let graph = ModuleGraph::build(&root.join("a.mjs"), &GraphOptions::default()).unwrap();
        assert_eq!(graph.len(), 2);
        let a = graph.modules().next().unwrap();
        assert_eq!(a.deps, vec![("./b.mjs".to_string(), 1)]);
    }

    #[test]
    fn emitted_lines_map_back_to_sources() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "src/main.js", "var x = 1;\nconsole.log(x);\n");

        let graph = ModuleGraph::build(&root.join("src/main.js"), &GraphOptions::default()).unwrap();
        let target = MapTarget {
            output: root.join("build/bundle.js"),
            map: root.join("build/bundle.js.map"),
        };
        let bundle = emit(&graph, Some(&target)).unwrap();

        assert!(bundle.code.starts_with("(function () {\nvar __modules = {\n0: [function"));
        assert!(bundle.code.ends_with("//# sourceMappingURL=bundle.js.map\n"));

        let map: serde_json::Value = serde_json::from_str(&bundle.map.unwrap()).unwrap();
        assert_eq!(map["file"], "bundle.js");
        assert_eq!(map["sources"][0], "../src/main.js");
        // Lines 0-2 are the wrapper; line 3 is `var x = 1;`.
        assert_eq!(map["mappings"], ";;;AAAA;AACA");
    }

    #[test]
    fn missing_entry_is_a_resolution_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModuleGraph::build(&dir.path().join("nope.js"), &GraphOptions::default()).unwrap_err();
        assert_eq!(err.kind(), crate::errors::CompileErrorKind::Resolution);
    }
}
