//! Grep — outside the cross-reference core. Reuses the indexed file
//! list for a parallel fan-out read; touches no graph state.

use std::sync::Mutex;

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::error::{ErrorContext, PioneerError, PioneerResult};

#[derive(Debug, Clone)]
pub struct GrepMatch {
    pub path: String,
    pub line_number: usize,
    pub line: String,
}

enum Matcher {
    Plain { needle: String, ignore_case: bool },
    Regex(Regex),
}

impl Matcher {
    fn new(pattern: &str, use_regex: bool, ignore_case: bool) -> PioneerResult<Self> {
        if use_regex {
            let re = RegexBuilder::new(pattern)
                .case_insensitive(ignore_case)
                .build()
                .map_err(|_| PioneerError::BadRegex {
                    pattern: pattern.to_string(),
                })?;
            Ok(Matcher::Regex(re))
        } else {
            Ok(Matcher::Plain {
                needle: if ignore_case { pattern.to_lowercase() } else { pattern.to_string() },
                ignore_case,
            })
        }
    }

    fn is_match(&self, line: &str) -> bool {
        match self {
            Matcher::Regex(re) => re.is_match(line),
            Matcher::Plain { needle, ignore_case } => {
                if *ignore_case {
                    line.to_lowercase().contains(needle.as_str())
                } else {
                    line.contains(needle.as_str())
                }
            }
        }
    }
}

/// Searches every file in `paths` for `pattern`, fanning out across
/// `std::thread::scope` the same way Phase 2 extraction does. A
/// per-file I/O error is logged and the file is skipped, never fatal.
pub fn run(paths: &[String], pattern: &str, use_regex: bool, ignore_case: bool) -> PioneerResult<Vec<GrepMatch>> {
    let matcher = Matcher::new(pattern, use_regex, ignore_case)?;
    let results = Mutex::new(Vec::new());
    let worker_count = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4).min(paths.len().max(1));
    let chunk_size = paths.len().div_ceil(worker_count.max(1)).max(1);

    std::thread::scope(|scope| {
        for chunk in paths.chunks(chunk_size) {
            let matcher = &matcher;
            let results = &results;
            scope.spawn(move || {
                let mut local = Vec::new();
                for path in chunk {
                    match std::fs::read_to_string(path).with_path(path.clone()) {
                        Ok(contents) => {
                            for (idx, line) in contents.lines().enumerate() {
                                if matcher.is_match(line) {
                                    local.push(GrepMatch {
                                        path: path.clone(),
                                        line_number: idx + 1,
                                        line: line.to_string(),
                                    });
                                }
                            }
                        }
                        Err(err) => warn!(target: "query", path = %path, error = %err, "skipping unreadable file during grep"),
                    }
                }
                results.lock().expect("results mutex not poisoned").extend(local);
            });
        }
    });

    let mut out = results.into_inner().expect("results mutex not poisoned");
    out.sort_by(|a, b| (a.path.as_str(), a.line_number).cmp(&(b.path.as_str(), b.line_number)));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn plain_substring_match() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.c");
        fs::write(&file, "int main() {\n return 0;\n}\n").unwrap();

        let matches = run(&[file.to_string_lossy().to_string()], "return", false, false).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].line_number, 2);
    }

    #[test]
    fn regex_match_is_case_insensitive_when_flagged() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.c");
        fs::write(&file, "FOO\nbar\n").unwrap();

        let matches = run(&[file.to_string_lossy().to_string()], "foo", true, true).unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn bad_regex_is_reported() {
        let err = run(&[], "(", true, false).unwrap_err();
        assert!(matches!(err, PioneerError::BadRegex {.. }));
    }
}
