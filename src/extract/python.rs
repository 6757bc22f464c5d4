//! Python extraction adapter, built on `tree-sitter-python`.
//!
//! Qualified names use `.` as the scope separator (module path is not
//! tracked across files; the containing class, if any, is joined with the
//! function's simple name — `Class.method`, or just the simple name for a
//! module-level function).

use tree_sitter::{Node, Parser};

use super::{ExtractedFile, FunctionCall, FunctionDef, Language, LanguageExtractor, VariableDef};

pub struct PythonExtractor {
    parser: Parser,
}

impl PythonExtractor {
    pub fn new() -> Self {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .expect("tree-sitter-python grammar is compatible with this tree-sitter version");
        Self { parser }
    }
}

impl Default for PythonExtractor {
    fn default() -> Self {
        Self::new()
    }
}

struct Ctx {
    /// Dot-joined scope path (class names) currently open.
    scope: Vec<String>,
}

impl LanguageExtractor for PythonExtractor {
    fn extract(&mut self, _file_path: &str, source: &str) -> Option<ExtractedFile> {
        let tree = self.parser.parse(source, None)?;
        let mut out = ExtractedFile::default();
        let mut ctx = Ctx { scope: Vec::new() };
        walk(tree.root_node(), source.as_bytes(), &mut ctx, None, &mut out);
        Some(out)
    }

    fn language(&self) -> Language {
        Language::Python
    }
}

fn node_text<'a>(node: Node, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or("")
}

fn qualify(ctx: &Ctx, name: &str) -> String {
    if ctx.scope.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", ctx.scope.join("."), name)
    }
}

fn walk(node: Node, src: &[u8], ctx: &mut Ctx, current_fn: Option<&str>, out: &mut ExtractedFile) {
    match node.kind() {
        "class_definition" => {
            let name = node
                .child_by_field_name("name")
                .map(|n| node_text(n, src).to_string())
                .unwrap_or_default();
            ctx.scope.push(name);
            if let Some(body) = node.child_by_field_name("body") {
                for child in body.children(&mut body.walk()) {
                    walk(child, src, ctx, current_fn, out);
                }
            }
            ctx.scope.pop();
            return;
        }
        "function_definition" => {
            let simple_name = node
                .child_by_field_name("name")
                .map(|n| node_text(n, src).to_string())
                .unwrap_or_default();
            let qualified_name = qualify(ctx, &simple_name);
            let containing_class = ctx.scope.last().cloned();
            let param_types = node
                .child_by_field_name("parameters")
                .map(|params| {
                    params
                        .children(&mut params.walk())
                        .filter(|c| c.kind() == "identifier" || c.kind() == "typed_parameter")
                        .map(|c| node_text(c, src).to_string())
                        .collect()
                })
                .unwrap_or_default();

            out.functions.push(FunctionDef {
                simple_name,
                qualified_name: qualified_name.clone(),
                containing_class,
                namespace_path: ctx.scope.clone(),
                param_types,
                start_line: node.start_position().row as u32 + 1,
                end_line: node.end_position().row as u32 + 1,
            });

            if let Some(body) = node.child_by_field_name("body") {
                for child in body.children(&mut body.walk()) {
                    walk(child, src, ctx, Some(&qualified_name), out);
                }
            }
            return;
        }
        "call" => {
            if let Some(func) = node.child_by_field_name("function") {
                let (name, qualified_name) = callee_name(func, src);
                if let Some(caller) = current_fn {
                    out.calls.push((
                        caller.to_string(),
                        FunctionCall {
                            name,
                            qualified_name,
                            line: node.start_position().row as u32 + 1,
                        },
                    ));
                }
            }
        }
        "assignment" => {
            if let (Some(left), Some(right)) =
                (node.child_by_field_name("left"), node.child_by_field_name("right"))
            {
                if left.kind() == "identifier" {
                    let simple_name = node_text(left, src).to_string();
                    let qualified_name = match current_fn {
                        Some(f) => format!("{f}.{simple_name}"),
                        None => qualify(ctx, &simple_name),
                    };
                    let (value_source, from_function_call) = describe_rhs(right, src);

                    out.variables.push(VariableDef {
                        name: simple_name,
                        qualified_name,
                        containing_func: current_fn.map(|s| s.to_string()),
                        value_source,
                        from_function_call,
                        line: node.start_position().row as u32 + 1,
                    });
                }
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, src, ctx, current_fn, out);
    }
}

fn callee_name(func: Node, src: &[u8]) -> (String, String) {
    match func.kind() {
        "attribute" => {
            let attr = func
                .child_by_field_name("attribute")
                .map(|n| node_text(n, src).to_string())
                .unwrap_or_default();
            (attr, node_text(func, src).replace('.', "."))
        }
        _ => {
            let name = node_text(func, src).to_string();
            (name.clone(), name)
        }
    }
}

/// Describes the right-hand side of an assignment for data-flow purposes
/// (Phase 3 step 3): a call yields `(callee_name, true)`; anything
/// else yields a textual synthetic-source name.
fn describe_rhs(right: Node, src: &[u8]) -> (Option<String>, bool) {
    match right.kind() {
        "call" => {
            let func = right.child_by_field_name("function");
            let (name, _) = func.map(|f| callee_name(f, src)).unwrap_or_default();
            (Some(name), true)
        }
        "identifier" => (Some(node_text(right, src).to_string()), false),
        "attribute" => (Some(node_text(right, src).to_string()), false),
        _ => (Some(node_text(right, src).to_string()), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_module_level_function() {
        let mut ex = PythonExtractor::new();
        let result = ex.extract("m.py", "def make():\n return 1\n").unwrap();
        assert_eq!(result.functions.len(), 1);
        assert_eq!(result.functions[0].qualified_name, "make");
    }

    #[test]
    fn extracts_data_flow_scenario_s5() {
        let mut ex = PythonExtractor::new();
        let source = "def make():\n return 1\ndef use():\n x = make()\n";
        let result = ex.extract("m.py", source).unwrap();
        assert_eq!(result.functions.len(), 2);
        assert_eq!(result.variables.len(), 1);
        let var = &result.variables[0];
        assert_eq!(var.qualified_name, "use.x");
        assert_eq!(var.value_source.as_deref(), Some("make"));
        assert!(var.from_function_call);
    }

    #[test]
    fn extracts_call_inside_function() {
        let mut ex = PythonExtractor::new();
        let source = "def a():\n b()\ndef b():\n pass\n";
        let result = ex.extract("m.py", source).unwrap();
        assert_eq!(result.calls.len(), 1);
        assert_eq!(result.calls[0].0, "a");
        assert_eq!(result.calls[0].1.name, "b");
    }

    #[test]
    fn class_methods_are_qualified_with_class_name() {
        let mut ex = PythonExtractor::new();
        let source = "class Foo:\n def bar(self):\n pass\n";
        let result = ex.extract("m.py", source).unwrap();
        assert_eq!(result.functions[0].qualified_name, "Foo.bar");
        assert_eq!(result.functions[0].containing_class.as_deref(), Some("Foo"));
    }
}
