//! C++ extraction adapter, built on `tree-sitter-cpp`.
//!
//! Qualified names use `::` as the scope separator and include enclosing
//! `namespace`/`class`/`struct` scopes, plus out-of-line method
//! definitions written as `Class::method` in the declarator itself.

use tree_sitter::{Node, Parser};

use super::{ExtractedFile, FunctionCall, FunctionDef, Language, LanguageExtractor, VariableDef};

pub struct CppExtractor {
    parser: Parser,
}

impl CppExtractor {
    pub fn new() -> Self {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_cpp::LANGUAGE.into())
            .expect("tree-sitter-cpp grammar is compatible with this tree-sitter version");
        Self { parser }
    }
}

impl Default for CppExtractor {
    fn default() -> Self {
        Self::new()
    }
}

struct Ctx {
    scope: Vec<String>,
}

impl LanguageExtractor for CppExtractor {
    fn extract(&mut self, _file_path: &str, source: &str) -> Option<ExtractedFile> {
        let tree = self.parser.parse(source, None)?;
        let mut out = ExtractedFile::default();
        let mut ctx = Ctx { scope: Vec::new() };
        walk(tree.root_node(), source.as_bytes(), &mut ctx, None, &mut out);
        Some(out)
    }

    fn language(&self) -> Language {
        Language::Cpp
    }
}

fn node_text<'a>(node: Node, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or("")
}

fn declarator_name(node: Node, src: &[u8]) -> Option<String> {
    match node.kind() {
        "identifier" | "field_identifier" | "qualified_identifier" => {
            Some(node_text(node, src).to_string())
        }
        "function_declarator" | "pointer_declarator" | "reference_declarator" | "array_declarator" => {
            node.child_by_field_name("declarator")
                .and_then(|d| declarator_name(d, src))
        }
        "init_declarator" => node
            .child_by_field_name("declarator")
            .and_then(|d| declarator_name(d, src)),
        _ => None,
    }
}

fn find_function_declarator(node: Node) -> Option<Node> {
    if node.kind() == "function_declarator" {
        return Some(node);
    }
    node.child_by_field_name("declarator")
        .and_then(find_function_declarator)
}

fn qualify(ctx: &Ctx, name: &str) -> String {
    if ctx.scope.is_empty() {
        name.to_string()
    } else {
        format!("{}::{}", ctx.scope.join("::"), name)
    }
}

fn walk(node: Node, src: &[u8], ctx: &mut Ctx, current_fn: Option<&str>, out: &mut ExtractedFile) {
    match node.kind() {
        "namespace_definition" | "class_specifier" | "struct_specifier" => {
            let name = node
                .child_by_field_name("name")
                .map(|n| node_text(n, src).to_string());
            if let Some(name) = name.clone() {
                ctx.scope.push(name);
            }
            if let Some(body) = node.child_by_field_name("body") {
                let mut cursor = body.walk();
                for child in body.children(&mut cursor) {
                    walk(child, src, ctx, current_fn, out);
                }
            }
            if name.is_some() {
                ctx.scope.pop();
            }
            return;
        }
        "function_definition" => {
            let declarator = node.child_by_field_name("declarator");
            let raw_name = declarator
                .and_then(|d| declarator_name(d, src))
                .unwrap_or_default();

            // An out-of-line `Class::method` declarator already carries its
            // own scope; an in-class declarator gets the enclosing scope
            // prepended.
            let (qualified_name, simple_name, containing_class) = if raw_name.contains("::") {
                let simple = raw_name.rsplit("::").next().unwrap_or(&raw_name).to_string();
                let class = raw_name
                    .rsplit_once("::")
                    .map(|(prefix, _)| prefix.to_string());
                (raw_name.clone(), simple, class)
            } else {
                (qualify(ctx, &raw_name), raw_name.clone(), ctx.scope.last().cloned())
            };

            let param_types = declarator
                .and_then(find_function_declarator)
                .and_then(|fd| fd.child_by_field_name("parameters"))
                .map(|params| {
                    params
                        .children(&mut params.walk())
                        .filter(|c| c.kind() == "parameter_declaration")
                        .map(|c| node_text(c, src).trim().to_string())
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
                let mut cursor = body.walk();
                for child in body.children(&mut cursor) {
                    walk(child, src, ctx, Some(&qualified_name), out);
                }
            }
            return;
        }
        "call_expression" => {
            if let Some(func) = node.child_by_field_name("function") {
                if let Some(caller) = current_fn {
                    let name = node_text(func, src).to_string();
                    out.calls.push((
                        caller.to_string(),
                        FunctionCall {
                            name: name.clone(),
                            qualified_name: name,
                            line: node.start_position().row as u32 + 1,
                        },
                    ));
                }
            }
        }
        "assignment_expression" => {
            if let (Some(left), Some(right)) =
                (node.child_by_field_name("left"), node.child_by_field_name("right"))
            {
                if let Some(name) = declarator_name(left, src).or_else(|| {
                    (left.kind() == "identifier").then(|| node_text(left, src).to_string())
                }) {
                    push_variable(name, right, current_fn, node, src, out);
                }
            }
        }
        "init_declarator" => {
            if let (Some(declarator), Some(value)) =
                (node.child_by_field_name("declarator"), node.child_by_field_name("value"))
            {
                if let Some(name) = declarator_name(declarator, src) {
                    push_variable(name, value, current_fn, node, src, out);
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

fn push_variable(
    name: String,
    rhs: Node,
    current_fn: Option<&str>,
    site: Node,
    src: &[u8],
    out: &mut ExtractedFile,
) {
    let qualified_name = match current_fn {
        Some(f) => format!("{f}::{name}"),
        None => name.clone(),
    };
    let (value_source, from_function_call) = match rhs.kind() {
        "call_expression" => {
            let callee = rhs
                .child_by_field_name("function")
                .map(|f| node_text(f, src).to_string());
            (callee, true)
        }
        "identifier" | "qualified_identifier" => (Some(node_text(rhs, src).to_string()), false),
        _ => (Some(node_text(rhs, src).to_string()), false),
    };

    out.variables.push(VariableDef {
        name,
        qualified_name,
        containing_func: current_fn.map(|s| s.to_string()),
        value_source,
        from_function_call,
        line: site.start_position().row as u32 + 1,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_namespaced_function() {
        let mut ex = CppExtractor::new();
        let result = ex
            .extract("a.cpp", "namespace ns { void f() { g(); } }")
            .unwrap();
        assert_eq!(result.functions[0].qualified_name, "ns::f");
    }

    #[test]
    fn extracts_method_in_class_body() {
        let mut ex = CppExtractor::new();
        let result = ex
            .extract("a.cpp", "class Foo { void bar() { baz(); } };")
            .unwrap();
        assert_eq!(result.functions[0].qualified_name, "Foo::bar");
        assert_eq!(result.functions[0].containing_class.as_deref(), Some("Foo"));
    }

    #[test]
    fn extracts_out_of_line_method_definition() {
        let mut ex = CppExtractor::new();
        let result = ex
            .extract("a.cpp", "void Foo::bar() { baz(); }")
            .unwrap();
        assert_eq!(result.functions[0].qualified_name, "Foo::bar");
    }
}
