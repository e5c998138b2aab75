//! Candidate input handling.
//!
//! Raw input comes from command arguments, stdin or a file. It is split into
//! tokens, each token is reduced to a host key for the scope decision, and
//! the original token is kept for submission when accepted.

use crate::scope::{decide, Decision, ScopeContext};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("No input given")]
    Empty,
    #[error("Failed to read file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read stdin: {0}")]
    Stdin(#[source] std::io::Error),
}

/// Where the raw candidate text comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
    Inline(String),
}

impl InputSource {
    /// Resolve command arguments: `-` reads stdin, `@path` or `*.txt` reads
    /// a file, anything else is taken literally.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, InputError> {
        let first = args.first().map(|a| a.as_ref()).ok_or(InputError::Empty)?;

        if first == "-" {
            Ok(InputSource::Stdin)
        } else if first.starts_with('@') || first.ends_with(".txt") {
            let path = first.strip_prefix('@').unwrap_or(first);
            Ok(InputSource::File(PathBuf::from(path)))
        } else {
            let joined = args.iter().map(|a| a.as_ref()).collect::<Vec<_>>().join(" ");
            Ok(InputSource::Inline(joined))
        }
    }

    pub fn read(&self) -> Result<String, InputError> {
        match self {
            InputSource::Stdin => {
                let mut buffer = String::new();
                std::io::stdin()
                    .read_to_string(&mut buffer)
                    .map_err(InputError::Stdin)?;
                Ok(buffer)
            }
            InputSource::File(path) => {
                std::fs::read_to_string(path).map_err(|source| InputError::File {
                    path: path.clone(),
                    source,
                })
            }
            InputSource::Inline(text) => Ok(text.clone()),
        }
    }
}

/// Split raw input on any whitespace, dropping empty tokens.
pub fn tokenize(raw: &str) -> Vec<&str> {
    raw.split_whitespace().collect()
}

/// Host part used for the scope decision (`host:annotation` → `host`).
pub fn evaluation_key(token: &str) -> &str {
    match token.find(':') {
        Some(idx) => &token[..idx],
        None => token,
    }
}

/// Outcome of filtering one batch of candidates
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    /// Accepted tokens as given, in input order
    pub accepted: Vec<String>,
    pub accepted_count: usize,
    pub total_count: usize,
    /// Rejected tokens with the decision that rejected them
    #[serde(skip)]
    pub rejected: Vec<(String, Decision)>,
}

impl BatchResult {
    /// Input was present but nothing survived filtering
    pub fn is_filtered_out(&self) -> bool {
        self.accepted.is_empty() && self.total_count > 0
    }

    pub fn rejected_count(&self) -> usize {
        self.total_count - self.accepted_count
    }

    /// Accepted tokens in the newline separated form the API expects
    pub fn joined(&self) -> String {
        self.accepted.join("\n")
    }
}

/// Run every token of `raw` through the scope decision.
///
/// With `allow_out_of_scope` the decision is skipped and every token passes.
pub fn filter_batch(raw: &str, ctx: &ScopeContext, allow_out_of_scope: bool) -> BatchResult {
    let tokens = tokenize(raw);
    let total_count = tokens.len();

    if allow_out_of_scope {
        let accepted: Vec<String> = tokens.into_iter().map(str::to_string).collect();
        return BatchResult {
            accepted_count: accepted.len(),
            accepted,
            total_count,
            rejected: Vec::new(),
        };
    }

    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for token in tokens {
        let decision = decide(evaluation_key(token), ctx);
        if decision.accepted {
            accepted.push(token.to_string());
        } else {
            rejected.push((token.to_string(), decision));
        }
    }

    BatchResult {
        accepted_count: accepted.len(),
        accepted,
        total_count,
        rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::DecisionReason;
    use std::io::Write;

    fn ctx() -> ScopeContext {
        ScopeContext::from_lists("acme", ["b.com"], Vec::<String>::new())
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("a.com\nb.com  c.com\r\n\t d.com \n\n"),
            vec!["a.com", "b.com", "c.com", "d.com"]
        );
        assert!(tokenize("  \n\t").is_empty());
    }

    #[test]
    fn test_evaluation_key() {
        assert_eq!(evaluation_key("b.com:1.2.3.4"), "b.com");
        assert_eq!(evaluation_key("b.com:8443"), "b.com");
        assert_eq!(evaluation_key("b.com"), "b.com");
        assert_eq!(evaluation_key(":1.2.3.4"), "");
    }

    #[test]
    fn test_filter_batch_keeps_original_tokens() {
        let result = filter_batch("a.com\nb.com b.com:1.2.3.4", &ctx(), false);
        assert_eq!(result.accepted, vec!["b.com", "b.com:1.2.3.4"]);
        assert_eq!(result.accepted_count, 2);
        assert_eq!(result.total_count, 3);
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].0, "a.com");
        assert_eq!(result.rejected[0].1.reason, DecisionReason::NoInScopeMatch);
    }

    #[test]
    fn test_filter_batch_annotated_only() {
        let result = filter_batch("a.com\nb.com:1.2.3.4", &ctx(), false);
        assert_eq!(result.accepted, vec!["b.com:1.2.3.4"]);
        assert_eq!(result.total_count, 2);
        assert_eq!(result.rejected_count(), 1);
    }

    #[test]
    fn test_filter_batch_everything_filtered_out() {
        let result = filter_batch("x.org y.org", &ctx(), false);
        assert!(result.accepted.is_empty());
        assert_eq!(result.total_count, 2);
        assert!(result.is_filtered_out());
    }

    #[test]
    fn test_filter_batch_empty_input() {
        let result = filter_batch(" \n ", &ctx(), false);
        assert_eq!(result.total_count, 0);
        assert!(!result.is_filtered_out());
    }

    #[test]
    fn test_allow_out_of_scope_passes_everything() {
        let strict = ScopeContext::from_lists("acme", ["*.acme.com"], ["*"]);
        let result = filter_batch("x.org a.com:1.1.1.1 shop.acme.com", &strict, true);
        assert_eq!(result.accepted, vec!["x.org", "a.com:1.1.1.1", "shop.acme.com"]);
        assert_eq!(result.accepted_count, 3);
        assert!(result.rejected.is_empty());
    }

    #[test]
    fn test_joined() {
        let result = filter_batch("b.com a.com sub.b.com", &ctx(), false);
        assert_eq!(result.joined(), "b.com\nsub.b.com");
    }

    #[test]
    fn test_input_source_from_args() {
        assert_eq!(InputSource::from_args(&["-"]).unwrap(), InputSource::Stdin);
        assert_eq!(
            InputSource::from_args(&["@domains.list"]).unwrap(),
            InputSource::File(PathBuf::from("domains.list"))
        );
        assert_eq!(
            InputSource::from_args(&["domains.txt"]).unwrap(),
            InputSource::File(PathBuf::from("domains.txt"))
        );
        assert_eq!(
            InputSource::from_args(&["*.a.com", "*.b.com"]).unwrap(),
            InputSource::Inline("*.a.com *.b.com".to_string())
        );
        assert!(matches!(
            InputSource::from_args::<&str>(&[]),
            Err(InputError::Empty)
        ));
    }

    #[test]
    fn test_read_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a.com\nb.com").unwrap();

        let source = InputSource::File(file.path().to_path_buf());
        assert_eq!(source.read().unwrap(), "a.com\nb.com\n");
    }

    #[test]
    fn test_read_missing_file() {
        let source = InputSource::File(PathBuf::from("/nonexistent/bbrf/input.txt"));
        assert!(matches!(source.read(), Err(InputError::File { .. })));
    }
}
