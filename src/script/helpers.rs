// src/script/helpers.rs

//! Runtime helpers referenced by transpiled modules.
//!
//! The transpiler calls helpers as `babelHelpers.<name>(...)`. The bundle
//! defines a `babelHelpers` object holding exactly the helpers its modules
//! use, plus whatever those helpers call themselves.

use std::collections::BTreeSet;

use crate::errors::CompileError;

struct Helper {
    name: &'static str,
    requires: &'static [&'static str],
    source: &'static str,
}

/// Emission order. A helper only ever requires helpers listed before it.
const HELPERS: &[Helper] = &[
    Helper {
        name: "typeof",
        requires: &[],
        source: r#"babelHelpers["typeof"] = function (o) {
  return typeof Symbol == "function" && typeof Symbol.iterator == "symbol"
    ? typeof o
    : o && typeof Symbol == "function" && o.constructor === Symbol && o !== Symbol.prototype ? "symbol" : typeof o;
};"#,
    },
    Helper {
        name: "toPrimitive",
        requires: &["typeof"],
        source: r#"babelHelpers.toPrimitive = function (t, r) {
  if (babelHelpers["typeof"](t) != "object" || !t) return t;
  var e = typeof Symbol == "function" ? t[Symbol.toPrimitive] : undefined;
  if (e !== undefined) {
    var i = e.call(t, r || "default");
    if (babelHelpers["typeof"](i) != "object") return i;
    throw new TypeError("@@toPrimitive must return a primitive value.");
  }
  return (r === "string" ? String : Number)(t);
};"#,
    },
    Helper {
        name: "toPropertyKey",
        requires: &["typeof", "toPrimitive"],
        source: r#"babelHelpers.toPropertyKey = function (t) {
  var i = babelHelpers.toPrimitive(t, "string");
  return babelHelpers["typeof"](i) == "symbol" ? i : i + "";
};"#,
    },
    Helper {
        name: "defineProperty",
        requires: &["toPropertyKey"],
        source: r#"babelHelpers.defineProperty = function (e, r, t) {
  r = babelHelpers.toPropertyKey(r);
  if (r in e) {
    Object.defineProperty(e, r, { value: t, enumerable: true, configurable: true, writable: true });
  } else {
    e[r] = t;
  }
  return e;
};"#,
    },
    Helper {
        name: "objectSpread2",
        requires: &["defineProperty"],
        source: r#"babelHelpers.objectSpread2 = function (e) {
  for (var r = 1; r < arguments.length; r++) {
    var t = arguments[r] != null ? arguments[r] : {};
    var keys = Object.keys(Object(t));
    if (typeof Object.getOwnPropertySymbols == "function") {
      keys = keys.concat(Object.getOwnPropertySymbols(Object(t)).filter(function (s) {
        return Object.getOwnPropertyDescriptor(t, s).enumerable;
      }));
    }
    keys.forEach(function (k) { babelHelpers.defineProperty(e, k, t[k]); });
  }
  return e;
};"#,
    },
    Helper {
        name: "extends",
        requires: &[],
        source: r#"babelHelpers["extends"] = Object.assign ? Object.assign.bind() : function (n) {
  for (var e = 1; e < arguments.length; e++) {
    var t = arguments[e];
    for (var r in t) if ({}.hasOwnProperty.call(t, r)) n[r] = t[r];
  }
  return n;
};"#,
    },
    Helper {
        name: "objectWithoutPropertiesLoose",
        requires: &[],
        source: r#"babelHelpers.objectWithoutPropertiesLoose = function (r, e) {
  if (r == null) return {};
  var t = {};
  for (var n in r) {
    if ({}.hasOwnProperty.call(r, n)) {
      if (e.indexOf(n) !== -1) continue;
      t[n] = r[n];
    }
  }
  return t;
};"#,
    },
    Helper {
        name: "objectWithoutProperties",
        requires: &["objectWithoutPropertiesLoose"],
        source: r#"babelHelpers.objectWithoutProperties = function (e, t) {
  if (e == null) return {};
  var i = babelHelpers.objectWithoutPropertiesLoose(e, t);
  if (Object.getOwnPropertySymbols) {
    var n = Object.getOwnPropertySymbols(e);
    for (var r = 0; r < n.length; r++) {
      var o = n[r];
      if (t.indexOf(o) === -1 && {}.propertyIsEnumerable.call(e, o)) i[o] = e[o];
    }
  }
  return i;
};"#,
    },
    Helper {
        name: "objectDestructuringEmpty",
        requires: &[],
        source: r#"babelHelpers.objectDestructuringEmpty = function (t) {
  if (t == null) throw new TypeError("Cannot destructure " + t);
};"#,
    },
    Helper {
        name: "checkPrivateRedeclaration",
        requires: &[],
        source: r#"babelHelpers.checkPrivateRedeclaration = function (e, t) {
  if (t.has(e)) throw new TypeError("Cannot initialize the same private elements twice on an object");
};"#,
    },
    Helper {
        name: "classPrivateFieldInitSpec",
        requires: &["checkPrivateRedeclaration"],
        source: r#"babelHelpers.classPrivateFieldInitSpec = function (e, t, a) {
  babelHelpers.checkPrivateRedeclaration(e, t);
  t.set(e, a);
};"#,
    },
    Helper {
        name: "classPrivateMethodInitSpec",
        requires: &["checkPrivateRedeclaration"],
        source: r#"babelHelpers.classPrivateMethodInitSpec = function (e, a) {
  babelHelpers.checkPrivateRedeclaration(e, a);
  a.add(e);
};"#,
    },
    Helper {
        name: "assertClassBrand",
        requires: &[],
        source: r#"babelHelpers.assertClassBrand = function (e, t, n) {
  if (typeof e == "function" ? e === t : e.has(t)) return arguments.length < 3 ? t : n;
  throw new TypeError("Private element is not present on this object");
};"#,
    },
    Helper {
        name: "classPrivateFieldGet2",
        requires: &["assertClassBrand"],
        source: r#"babelHelpers.classPrivateFieldGet2 = function (s, a) {
  return s.get(babelHelpers.assertClassBrand(s, a));
};"#,
    },
    Helper {
        name: "classPrivateFieldSet2",
        requires: &["assertClassBrand"],
        source: r#"babelHelpers.classPrivateFieldSet2 = function (s, a, r) {
  s.set(babelHelpers.assertClassBrand(s, a), r);
  return r;
};"#,
    },
    Helper {
        name: "toSetter",
        requires: &[],
        source: r#"babelHelpers.toSetter = function (t, e, n) {
  e || (e = []);
  var r = e.length++;
  return Object.defineProperty({}, "_", { set: function (o) { e[r] = o; t.apply(n, e); } });
};"#,
    },
    Helper {
        name: "classPrivateFieldLooseKey",
        requires: &[],
        source: r#"babelHelpers.classPrivateFieldLooseKey = (function () {
  var id = 0;
  return function (e) { return "__private_" + id++ + "_" + e; };
})();"#,
    },
    Helper {
        name: "classPrivateFieldLooseBase",
        requires: &[],
        source: r#"babelHelpers.classPrivateFieldLooseBase = function (e, t) {
  if (!{}.hasOwnProperty.call(e, t)) throw new TypeError("attempted to use private field on non-instance");
  return e;
};"#,
    },
    Helper {
        name: "getPrototypeOf",
        requires: &[],
        source: r#"babelHelpers.getPrototypeOf = function (t) {
  return Object.getPrototypeOf(t);
};"#,
    },
    Helper {
        name: "superPropBase",
        requires: &["getPrototypeOf"],
        source: r#"babelHelpers.superPropBase = function (t, o) {
  while (!{}.hasOwnProperty.call(t, o) && (t = babelHelpers.getPrototypeOf(t)) !== null);
  return t;
};"#,
    },
    Helper {
        name: "get",
        requires: &["superPropBase"],
        source: r#"babelHelpers.get = typeof Reflect != "undefined" && Reflect.get ? Reflect.get.bind() : function (e, t, r) {
  var p = babelHelpers.superPropBase(e, t);
  if (p) {
    var n = Object.getOwnPropertyDescriptor(p, t);
    return n.get ? n.get.call(arguments.length < 3 ? e : r) : n.value;
  }
};"#,
    },
    Helper {
        name: "superPropGet",
        requires: &["get", "getPrototypeOf"],
        source: r#"babelHelpers.superPropGet = function (t, o, e, r) {
  var p = babelHelpers.get(babelHelpers.getPrototypeOf(1 & r ? t.prototype : t), o, e);
  return 2 & r && typeof p == "function" ? function (a) { return p.apply(e, a); } : p;
};"#,
    },
    Helper {
        name: "superPropSet",
        requires: &["getPrototypeOf"],
        source: r#"babelHelpers.superPropSet = function (t, e, o, r, p, f) {
  var ok = Reflect.set(babelHelpers.getPrototypeOf(f ? t.prototype : t), e, o, r);
  if (!ok && p) throw new TypeError("failed to set property");
  return o;
};"#,
    },
    Helper {
        name: "readOnlyError",
        requires: &[],
        source: r#"babelHelpers.readOnlyError = function (r) {
  throw new TypeError('"' + r + '" is read-only');
};"#,
    },
    Helper {
        name: "writeOnlyError",
        requires: &[],
        source: r#"babelHelpers.writeOnlyError = function (r) {
  throw new TypeError('"' + r + '" is write-only');
};"#,
    },
    Helper {
        name: "checkInRHS",
        requires: &[],
        source: r#"babelHelpers.checkInRHS = function (e) {
  if (Object(e) !== e) throw new TypeError("right-hand side of 'in' should be an object, got " + (e !== null ? typeof e : "null"));
  return e;
};"#,
    },
    Helper {
        name: "asyncToGenerator",
        requires: &[],
        source: r#"babelHelpers.asyncToGenerator = (function () {
  function step(g, resolve, reject, next, fail, key, arg) {
    try {
      var info = g[key](arg), value = info.value;
    } catch (err) {
      reject(err);
      return;
    }
    if (info.done) resolve(value); else Promise.resolve(value).then(next, fail);
  }
  return function (fn) {
    return function () {
      var self = this, args = arguments;
      return new Promise(function (resolve, reject) {
        var g = fn.apply(self, args);
        function next(v) { step(g, resolve, reject, next, fail, "next", v); }
        function fail(e) { step(g, resolve, reject, next, fail, "throw", e); }
        next(undefined);
      });
    };
  };
})();"#,
    },
    Helper {
        name: "taggedTemplateLiteral",
        requires: &[],
        source: r#"babelHelpers.taggedTemplateLiteral = function (e, t) {
  t || (t = e.slice(0));
  return Object.freeze(Object.defineProperties(e, { raw: { value: Object.freeze(t) } }));
};"#,
    },
];

fn lookup(name: &str) -> Option<&'static Helper> {
    HELPERS.iter().find(|h| h.name == name)
}

/// Source defining `babelHelpers` with `used` and their dependencies, or
/// `None` when nothing is used.
pub fn prelude<'a>(used: impl IntoIterator<Item = &'a str>) -> Result<Option<String>, CompileError> {
    let mut needed: BTreeSet<&'static str> = BTreeSet::new();
    let mut stack: Vec<&'static Helper> = Vec::new();

    for name in used {
        let helper = lookup(name).ok_or_else(|| {
            CompileError::transform(format!(
                "transpiled code needs runtime helper '{name}', which bundles cannot provide"
            ))
        })?;
        stack.push(helper);
    }

    while let Some(helper) = stack.pop() {
        if !needed.insert(helper.name) {
            continue;
        }
        stack.extend(helper.requires.iter().filter_map(|r| lookup(r)));
    }

    if needed.is_empty() {
        return Ok(None);
    }

    let mut out = String::from("var babelHelpers = {};");
    for helper in HELPERS.iter().filter(|h| needed.contains(h.name)) {
        out.push('\n');
        out.push_str(helper.source);
    }
    Ok(Some(out))
}
