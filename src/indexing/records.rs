//! Thread-local record shapes produced by Phase 2 extraction, merged
//! into global accumulators under one mutex per stream.

#[derive(Debug, Clone)]
pub struct FunctionRecord {
    pub qualified_name: String,
    pub file_path: String,
    pub param_types: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CallRecord {
    pub caller_name: String,
    pub callee_name: String,
}

#[derive(Debug, Clone)]
pub struct VariableRecord {
    pub qualified_name: String,
    pub value_source: Option<String>,
    pub from_function_call: bool,
}

/// Tail segment of a qualified name after the final scope separator
/// (`::` or `.`), matching the "short name" glossary entry.
pub fn short_name(qualified: &str) -> &str {
    let after_dot = qualified.rfind('.').map(|i| i + 1);
    let after_colon = qualified.rfind("::").map(|i| i + 2);
    let cut = after_dot.into_iter().chain(after_colon).max().unwrap_or(0);
    &qualified[cut..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_strips_cpp_scope() {
        assert_eq!(short_name("ns::Foo::bar"), "bar");
    }

    #[test]
    fn short_name_strips_python_scope() {
        assert_eq!(short_name("module.Class.method"), "method");
    }

    #[test]
    fn short_name_is_identity_when_unscoped() {
        assert_eq!(short_name("bare"), "bare");
    }
}
