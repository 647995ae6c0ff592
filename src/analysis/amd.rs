//! AMD module analysis using tree-sitter for JavaScript.
//!
//! Finds `define(...)` and `require([...], callback)` calls, pairs each
//! dependency path with the factory parameter at the same position and
//! reports the pairs whose parameter is never referenced in the factory body.
//! The optimized text drops those pairs from both the dependency array and
//! the parameter list.

use regex::Regex;
use tree_sitter::{Node, Parser, Tree, TreeCursor};

use super::{AnalysisError, AnalysisOutput, AnalysisResult, Analyzer, ModuleAnalysis};
use crate::options::CheckOptions;

/// The AMD entry point a call expression uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    /// `define([deps], factory)` and its variants
    Define,
    /// `require([deps], callback)`
    Require,
}

/// A dependency path that is never reported or removed.
#[derive(Debug)]
enum ExceptPattern {
    Exact(String),
    Pattern(Regex),
}

impl ExceptPattern {
    fn parse(entry: &str) -> AnalysisResult<Self> {
        if entry.len() > 1 && entry.starts_with('/') && entry.ends_with('/') {
            let inner = &entry[1..entry.len() - 1];
            Regex::new(inner)
                .map(ExceptPattern::Pattern)
                .map_err(|source| AnalysisError::InvalidPattern {
                    pattern: entry.to_string(),
                    source,
                })
        } else {
            Ok(ExceptPattern::Exact(entry.to_string()))
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            ExceptPattern::Exact(exact) => exact == path,
            ExceptPattern::Pattern(re) => re.is_match(path),
        }
    }
}

/// A byte range of the source to replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Edit {
    start: usize,
    end: usize,
    replacement: &'static str,
}

/// Analyzer for AMD dependency usage in JavaScript source.
pub struct AmdAnalyzer {
    parser: Parser,
    /// The `exceptsPaths` entries `excepts` was compiled from.
    excepts_source: Vec<String>,
    excepts: Vec<ExceptPattern>,
}

impl AmdAnalyzer {
    /// Create a new AmdAnalyzer.
    pub fn new() -> AnalysisResult<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_javascript::LANGUAGE.into())
            .map_err(|_| AnalysisError::LanguageInit)?;

        Ok(Self {
            parser,
            excepts_source: Vec::new(),
            excepts: Vec::new(),
        })
    }

    /// Analyze source code with the currently configured exceptions.
    pub fn analyze_source(&mut self, source: &str) -> AnalysisResult<AnalysisOutput> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or(AnalysisError::ParseFailed)?;

        check_syntax(&tree)?;

        let mut results = Vec::new();
        let mut edits = Vec::new();
        let mut cursor = tree.root_node().walk();
        self.visit_node(&mut cursor, source, &mut results, &mut edits);

        Ok(AnalysisOutput {
            results,
            optimized_content: apply_edits(source, edits),
        })
    }

    /// Recompile the excepted paths if they changed since the last call.
    fn set_excepts(&mut self, entries: &[String]) -> AnalysisResult<()> {
        if self.excepts_source.as_slice() == entries {
            return Ok(());
        }

        self.excepts = entries
            .iter()
            .map(|e| ExceptPattern::parse(e))
            .collect::<AnalysisResult<Vec<_>>>()?;
        self.excepts_source = entries.to_vec();
        Ok(())
    }

    fn is_excepted(&self, path: &str) -> bool {
        self.excepts.iter().any(|e| e.matches(path))
    }

    /// Recursively visit nodes to find module calls, outer modules first.
    fn visit_node(
        &self,
        cursor: &mut TreeCursor,
        source: &str,
        results: &mut Vec<ModuleAnalysis>,
        edits: &mut Vec<Edit>,
    ) {
        let node = cursor.node();

        if node.kind() == "call_expression" {
            if let Some((module, module_edits)) = self.parse_module_call(&node, source) {
                results.push(module);
                edits.extend(module_edits);
            }
        }

        if cursor.goto_first_child() {
            loop {
                self.visit_node(cursor, source, results, edits);
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
            cursor.goto_parent();
        }
    }

    /// Parse a `define` or `require` call into a module report and its edits.
    fn parse_module_call(
        &self,
        node: &Node,
        source: &str,
    ) -> Option<(ModuleAnalysis, Vec<Edit>)> {
        let callee = node.child_by_field_name("function")?;
        if callee.kind() != "identifier" {
            return None;
        }

        let kind = match node_text(&callee, source)? {
            "define" => CallKind::Define,
            "require" => CallKind::Require,
            _ => return None,
        };

        let args_node = node.child_by_field_name("arguments")?;
        let args = list_items(&args_node);
        let mut rest = args.as_slice();

        // define('id', ...)
        let mut module_id = None;
        if kind == CallKind::Define {
            if let Some(first) = rest.first().filter(|n| n.kind() == "string") {
                module_id = extract_string_value(first, source);
                rest = &rest[1..];
            }
        }

        let deps = match rest.first() {
            Some(first) if first.kind() == "array" => {
                let deps = *first;
                rest = &rest[1..];
                Some(deps)
            }
            _ => None,
        };

        match kind {
            // require('x') is CommonJS, not a module
            CallKind::Require if deps.is_none() => return None,
            CallKind::Define if args.is_empty() => return None,
            _ => {}
        }

        let path_nodes = deps.map(|d| list_items(&d)).unwrap_or_default();
        let paths: Vec<String> = path_nodes
            .iter()
            .map(|n| path_value(n, source))
            .collect();

        let factory = rest.first().copied().filter(is_function);
        let (param_nodes, bare_param) = factory
            .map(|f| factory_params(&f))
            .unwrap_or_default();
        let dependencies: Vec<String> = param_nodes
            .iter()
            .map(|n| param_name(n, source))
            .collect();

        let body = factory.and_then(|f| f.child_by_field_name("body"));

        let pairs = paths.len().min(dependencies.len());
        let mut removed_paths = vec![false; path_nodes.len()];
        let mut removed_params = vec![false; param_nodes.len()];
        let mut unused_paths = Vec::new();
        let mut unused_dependencies = Vec::new();

        for i in 0..pairs {
            // Destructured or defaulted parameters are left alone
            if param_nodes[i].kind() != "identifier" || self.is_excepted(&paths[i]) {
                continue;
            }

            let used = body.is_some_and(|b| references(&b, &dependencies[i], source));
            if !used {
                removed_paths[i] = true;
                removed_params[i] = true;
                unused_paths.push(paths[i].clone());
                unused_dependencies.push(dependencies[i].clone());
            }
        }

        let mut module_edits = removal_edits(&path_nodes, &removed_paths);
        if bare_param && removed_params.first() == Some(&true) {
            // `a => ...` becomes `() => ...`
            module_edits.push(Edit {
                start: param_nodes[0].start_byte(),
                end: param_nodes[0].end_byte(),
                replacement: "()",
            });
        } else {
            module_edits.extend(removal_edits(&param_nodes, &removed_params));
        }

        let module = ModuleAnalysis {
            module_id,
            paths,
            dependencies,
            unused_paths,
            unused_dependencies,
            line: node.start_position().row + 1,
        };

        Some((module, module_edits))
    }
}

impl Analyzer for AmdAnalyzer {
    fn analyze(&mut self, source: &str, options: &CheckOptions) -> AnalysisResult<AnalysisOutput> {
        self.set_excepts(&options.excepts_paths)?;
        self.analyze_source(source)
    }
}

/// Fail on the first syntax error in the tree.
fn check_syntax(tree: &Tree) -> AnalysisResult<()> {
    let root = tree.root_node();
    if !root.has_error() {
        return Ok(());
    }

    let node = first_error(root).unwrap_or(root);
    let position = node.start_position();
    Err(AnalysisError::Syntax {
        line: position.row + 1,
        column: position.column + 1,
    })
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }

    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|c| c.has_error())
        .find_map(first_error)
}

/// Named children of a list-like node (arguments, array, parameters), minus comments.
fn list_items<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let items: Vec<_> = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect();
    items
}

fn is_function(node: &Node) -> bool {
    matches!(
        node.kind(),
        "function_expression" | "function" | "arrow_function" | "generator_function"
    )
}

/// Parameter nodes of a factory, and whether it is a bare arrow parameter.
fn factory_params<'t>(factory: &Node<'t>) -> (Vec<Node<'t>>, bool) {
    if let Some(params) = factory.child_by_field_name("parameters") {
        (list_items(&params), false)
    } else if let Some(param) = factory.child_by_field_name("parameter") {
        (vec![param], true)
    } else {
        (Vec::new(), false)
    }
}

fn param_name(node: &Node, source: &str) -> String {
    let target = match node.kind() {
        // b = 1
        "assignment_pattern" => node.child_by_field_name("left").unwrap_or(*node),
        _ => *node,
    };
    node_text(&target, source).unwrap_or_default().to_string()
}

fn path_value(node: &Node, source: &str) -> String {
    match node.kind() {
        "string" | "template_string" => extract_string_value(node, source),
        _ => node_text(node, source).map(|s| s.to_string()),
    }
    .unwrap_or_default()
}

/// Whether `name` is referenced anywhere under `node`.
fn references(node: &Node, name: &str, source: &str) -> bool {
    if matches!(node.kind(), "identifier" | "shorthand_property_identifier")
        && node_text(node, source) == Some(name)
    {
        return true;
    }

    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| references(&child, name, source));
    found
}

/// Edits removing the flagged items of a comma-separated list.
///
/// An item followed by a kept item is removed up to the start of its
/// successor. A trailing run of removed items is removed from the end of the
/// last kept item, so no dangling separator remains.
fn removal_edits(items: &[Node], removed: &[bool]) -> Vec<Edit> {
    let n = items.len();
    let mut trailing = n;
    while trailing > 0 && removed[trailing - 1] {
        trailing -= 1;
    }

    let mut edits: Vec<Edit> = (0..trailing)
        .filter(|&i| removed[i])
        .map(|i| Edit {
            start: items[i].start_byte(),
            end: items[i + 1].start_byte(),
            replacement: "",
        })
        .collect();

    if trailing < n {
        let start = if trailing == 0 {
            items[0].start_byte()
        } else {
            items[trailing - 1].end_byte()
        };
        edits.push(Edit {
            start,
            end: items[n - 1].end_byte(),
            replacement: "",
        });
    }

    edits
}

/// Apply edits back to front; an edit overlapping one already applied is skipped.
fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));

    let mut output = source.to_string();
    let mut floor = usize::MAX;
    for edit in edits {
        if edit.end > floor || edit.start > edit.end || edit.end > output.len() {
            continue;
        }
        output.replace_range(edit.start..edit.end, edit.replacement);
        floor = edit.start;
    }
    output
}

/// Extract the text content of a node.
fn node_text<'a>(node: &Node, source: &'a str) -> Option<&'a str> {
    source.get(node.start_byte()..node.end_byte())
}

/// Extract string value (removes quotes).
fn extract_string_value(node: &Node, source: &str) -> Option<String> {
    let text = node_text(node, source)?;
    let trimmed = text
        .trim_start_matches(['"', '\'', '`'])
        .trim_end_matches(['"', '\'', '`']);
    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(source: &str) -> AnalysisOutput {
        let mut analyzer = AmdAnalyzer::new().unwrap();
        analyzer.analyze_source(source).unwrap()
    }

    fn analyze_with(source: &str, options: &CheckOptions) -> AnalysisResult<AnalysisOutput> {
        let mut analyzer = AmdAnalyzer::new().unwrap();
        analyzer.analyze(source, options)
    }

    // ===== Detection =====

    #[test]
    fn test_all_dependencies_used() {
        let source = "define(['./a', './b'], function (a, b) { return a + b; });";
        let output = analyze(source);

        assert_eq!(output.results.len(), 1);
        let module = &output.results[0];
        assert_eq!(module.paths, vec!["./a", "./b"]);
        assert_eq!(module.dependencies, vec!["a", "b"]);
        assert!(module.unused_paths.is_empty());
        assert!(module.unused_dependencies.is_empty());
        assert_eq!(output.optimized_content, source);
    }

    #[test]
    fn test_unused_last_dependency() {
        let output = analyze("define(['a', 'b'], function (a, b) { a(); });");

        assert_eq!(output.results[0].unused_paths, vec!["b"]);
        assert_eq!(output.results[0].unused_dependencies, vec!["b"]);
        assert_eq!(
            output.optimized_content,
            "define(['a'], function (a) { a(); });"
        );
    }

    #[test]
    fn test_unused_middle_dependency() {
        let output = analyze("define(['a', 'b', 'c'], function (a, b, c) { return a(c); });");

        assert_eq!(output.results[0].unused_dependencies, vec!["b"]);
        assert_eq!(
            output.optimized_content,
            "define(['a', 'c'], function (a, c) { return a(c); });"
        );
    }

    #[test]
    fn test_all_dependencies_unused() {
        let output = analyze("define(['a', 'b'], function (a, b) { return 1; });");

        assert_eq!(output.results[0].unused_paths, vec!["a", "b"]);
        assert_eq!(
            output.optimized_content,
            "define([], function () { return 1; });"
        );
    }

    #[test]
    fn test_named_module() {
        let output = analyze("define('app/main', ['jquery'], function ($) { $('body'); });");

        let module = &output.results[0];
        assert_eq!(module.module_id.as_deref(), Some("app/main"));
        assert_eq!(module.paths, vec!["jquery"]);
        assert_eq!(module.dependencies, vec!["$"]);
        assert!(!module.has_unused());
    }

    #[test]
    fn test_paths_without_parameters_are_not_unused() {
        let source = "define(['a', 'css!style'], function (a) { a(); });";
        let output = analyze(source);

        assert_eq!(output.results[0].paths.len(), 2);
        assert!(output.results[0].unused_paths.is_empty());
        assert_eq!(output.optimized_content, source);
    }

    #[test]
    fn test_property_name_is_not_a_reference() {
        let output = analyze("define(['a', 'b'], function (a, b) { return a.b; });");
        assert_eq!(output.results[0].unused_dependencies, vec!["b"]);
    }

    #[test]
    fn test_shorthand_property_is_a_reference() {
        let output = analyze("define(['a', 'b'], function (a, b) { return { a: a, b }; });");
        assert!(output.results[0].unused_dependencies.is_empty());
    }

    #[test]
    fn test_arrow_function_factory() {
        let output = analyze("define(['a', 'b'], (a, b) => a);");

        assert_eq!(output.results[0].unused_dependencies, vec!["b"]);
        assert_eq!(output.optimized_content, "define(['a'], (a) => a);");
    }

    #[test]
    fn test_bare_arrow_parameter() {
        let output = analyze("require(['a'], a => 1);");

        assert_eq!(output.results[0].unused_dependencies, vec!["a"]);
        assert_eq!(output.optimized_content, "require([], () => 1);");
    }

    // ===== Module shapes =====

    #[test]
    fn test_nested_require_is_separate_module() {
        let source = r#"define(['a'], function (a) {
    require(['b', 'c'], function (b, c) { b(); });
    return a;
});"#;
        let output = analyze(source);

        assert_eq!(output.results.len(), 2);
        assert!(output.results[0].unused_dependencies.is_empty());
        assert_eq!(output.results[1].paths, vec!["b", "c"]);
        assert_eq!(output.results[1].unused_dependencies, vec!["c"]);
        assert_eq!(output.results[1].line, 2);
        assert_eq!(
            output.optimized_content,
            r#"define(['a'], function (a) {
    require(['b'], function (b) { b(); });
    return a;
});"#
        );
    }

    #[test]
    fn test_commonjs_require_is_not_a_module() {
        let output = analyze("var x = require('x');");
        assert!(output.results.is_empty());
    }

    #[test]
    fn test_factory_only_define() {
        let output = analyze("define(function (require) { return {}; });");

        assert_eq!(output.results.len(), 1);
        assert!(output.results[0].paths.is_empty());
        assert_eq!(output.results[0].dependencies, vec!["require"]);
        assert!(!output.results[0].has_unused());
    }

    #[test]
    fn test_object_define() {
        let output = analyze("define({ name: 'config' });");

        assert_eq!(output.results.len(), 1);
        assert!(output.results[0].dependencies.is_empty());
    }

    #[test]
    fn test_no_modules() {
        let source = "function plain() { return 1; }";
        let output = analyze(source);

        assert!(output.results.is_empty());
        assert_eq!(output.optimized_content, source);
    }

    #[test]
    fn test_multiple_modules_edited_together() {
        let source = "define(['a'], function (a) {});\nrequire(['b', 'c'], function (b, c) { c(); });";
        let output = analyze(source);

        assert_eq!(output.results.len(), 2);
        assert_eq!(
            output.optimized_content,
            "define([], function () {});\nrequire(['c'], function (c) { c(); });"
        );
    }

    // ===== Options =====

    #[test]
    fn test_excepted_exact_path() {
        let options = CheckOptions {
            excepts_paths: vec!["b".to_string()],
            ..CheckOptions::default()
        };
        let source = "define(['a', 'b'], function (a, b) { a(); });";
        let output = analyze_with(source, &options).unwrap();

        assert!(output.results[0].unused_paths.is_empty());
        assert_eq!(output.optimized_content, source);
    }

    #[test]
    fn test_excepted_pattern() {
        let options = CheckOptions {
            excepts_paths: vec!["/^text!/".to_string()],
            ..CheckOptions::default()
        };
        let output = analyze_with(
            "define(['text!tpl.html', 'b'], function (tpl, b) {});",
            &options,
        )
        .unwrap();

        assert_eq!(output.results[0].unused_paths, vec!["b"]);
    }

    #[test]
    fn test_invalid_pattern() {
        let options = CheckOptions {
            excepts_paths: vec!["/[/".to_string()],
            ..CheckOptions::default()
        };
        let result = analyze_with("define([], function () {});", &options);
        assert!(matches!(result, Err(AnalysisError::InvalidPattern { .. })));
    }

    // ===== Errors =====

    #[test]
    fn test_syntax_error() {
        let mut analyzer = AmdAnalyzer::new().unwrap();
        let result = analyzer.analyze_source("define(['a'], function (a) {");
        assert!(matches!(result, Err(AnalysisError::Syntax { .. })));
    }

    // ===== Edits =====

    #[test]
    fn test_apply_edits_skips_overlap() {
        let edits = vec![
            Edit { start: 0, end: 3, replacement: "" },
            Edit { start: 2, end: 5, replacement: "" },
        ];
        assert_eq!(apply_edits("abcdef", edits), "abf");
    }
}
