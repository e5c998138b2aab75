//! Scope rules for a single company.
//!
//! A [`ScopeContext`] is built once per batch from the in-scope and
//! out-of-scope pattern lists and is never mutated afterwards. Decisions are
//! made by the stateless [`decide`] function.

pub mod decision;
pub mod matching;

pub use decision::{decide, Decision, DecisionReason};
pub use matching::{matches, Pattern, PatternKind};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowercase and trim, applied to patterns and candidates alike.
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Which of the two scope lists a pattern belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    In,
    Out,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::In => "in",
            ScopeKind::Out => "out",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered collection of patterns, evaluated as a set.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .filter(|p| !p.as_ref().trim().is_empty())
            .map(|p| Pattern::new(p.as_ref()))
            .collect();

        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    /// First pattern matching an already normalized candidate
    pub fn find_match(&self, normalized_candidate: &str) -> Option<&Pattern> {
        self.patterns
            .iter()
            .find(|p| p.matches_normalized(normalized_candidate))
    }
}

/// In-scope and out-of-scope rules of one company, fixed for a batch.
#[derive(Debug, Clone)]
pub struct ScopeContext {
    company: String,
    in_scope: PatternSet,
    out_scope: PatternSet,
}

impl ScopeContext {
    pub fn new(company: impl Into<String>, in_scope: PatternSet, out_scope: PatternSet) -> Self {
        Self {
            company: company.into(),
            in_scope,
            out_scope,
        }
    }

    /// Context with no rules at all; every candidate is accepted by default.
    pub fn empty(company: impl Into<String>) -> Self {
        Self::new(company, PatternSet::default(), PatternSet::default())
    }

    pub fn from_lists<I, O, S, T>(company: impl Into<String>, in_scope: I, out_scope: O) -> Self
    where
        I: IntoIterator<Item = S>,
        O: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self::new(
            company,
            PatternSet::new(in_scope),
            PatternSet::new(out_scope),
        )
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn in_scope(&self) -> &PatternSet {
        &self.in_scope
    }

    pub fn out_scope(&self) -> &PatternSet {
        &self.out_scope
    }

    pub fn has_rules(&self) -> bool {
        !self.in_scope.is_empty() || !self.out_scope.is_empty()
    }
}
