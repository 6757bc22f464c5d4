//! C extraction adapter, built on `tree-sitter-c`.
//!
//! Qualified names use `::` as the scope separator. A top-level function
//! has no natural scope in C, so the indexer (not this adapter — see
//! `crate::indexing::pipeline`) prefixes it with the file basename; this
//! adapter reports the bare simple name as `qualified_name`.

use tree_sitter::{Node, Parser};

use super::{ExtractedFile, FunctionCall, FunctionDef, Language, LanguageExtractor, VariableDef};

pub struct CExtractor {
    parser: Parser,
}

impl CExtractor {
    pub fn new() -> Self {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_c::LANGUAGE.into())
            .expect("tree-sitter-c grammar is compatible with this tree-sitter version");
        Self { parser }
    }
}

impl Default for CExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageExtractor for CExtractor {
    fn extract(&mut self, _file_path: &str, source: &str) -> Option<ExtractedFile> {
        let tree = self.parser.parse(source, None)?;
        let mut out = ExtractedFile::default();
        walk(tree.root_node(), source.as_bytes(), None, &mut out);
        Some(out)
    }

    fn language(&self) -> Language {
        Language::C
    }
}

fn node_text<'a>(node: Node, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or("")
}

/// Descends through pointer/array/parenthesized declarator wrappers to
/// find the innermost identifier naming a function or variable.
fn declarator_name(node: Node, src: &[u8]) -> Option<String> {
    match node.kind() {
        "identifier" | "field_identifier" => Some(node_text(node, src).to_string()),
        "function_declarator" | "pointer_declarator" | "array_declarator" | "parenthesized_declarator" => {
            node.child_by_field_name("declarator")
                .and_then(|d| declarator_name(d, src))
        }
        "init_declarator" => node
            .child_by_field_name("declarator")
            .and_then(|d| declarator_name(d, src)),
        _ => None,
    }
}

pub(super) fn walk(node: Node, src: &[u8], current_fn: Option<&str>, out: &mut ExtractedFile) {
    match node.kind() {
        "function_definition" => {
            let declarator = node.child_by_field_name("declarator");
            let simple_name = declarator
                .and_then(|d| declarator_name(d, src))
                .unwrap_or_default();
            let param_types = declarator
                .and_then(|d| find_function_declarator(d))
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
                simple_name: simple_name.clone(),
                qualified_name: simple_name.clone(),
                containing_class: None,
                namespace_path: Vec::new(),
                param_types,
                start_line: node.start_position().row as u32 + 1,
                end_line: node.end_position().row as u32 + 1,
            });

            if let Some(body) = node.child_by_field_name("body") {
                let mut cursor = body.walk();
                for child in body.children(&mut cursor) {
                    walk(child, src, Some(&simple_name), out);
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
        walk(child, src, current_fn, out);
    }
}

fn find_function_declarator(node: Node) -> Option<Node> {
    if node.kind() == "function_declarator" {
        return Some(node);
    }
    node.child_by_field_name("declarator")
        .and_then(find_function_declarator)
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
        "identifier" => (Some(node_text(rhs, src).to_string()), false),
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
    fn extracts_top_level_function() {
        let mut ex = CExtractor::new();
        let result = ex.extract("a.c", "void a(){ b(); }").unwrap();
        assert_eq!(result.functions.len(), 1);
        assert_eq!(result.functions[0].simple_name, "a");
    }

    #[test]
    fn extracts_call_inside_function() {
        let mut ex = CExtractor::new();
        let result = ex
            .extract("a.c", "void a(){ b(); }\nvoid b(){}\n")
            .unwrap();
        assert_eq!(result.calls.len(), 1);
        assert_eq!(result.calls[0].0, "a");
        assert_eq!(result.calls[0].1.name, "b");
    }

    #[test]
    fn scenario_s1_two_file_chain_single_file_half() {
        let mut ex = CExtractor::new();
        let result = ex.extract("a.c", "void a(){ b(); }").unwrap();
        assert_eq!(result.functions[0].qualified_name, "a");
    }
}
