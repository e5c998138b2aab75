use super::normalize;
use regex::Regex;

/// Shape of a scope rule, derived from its text
#[derive(Debug, Clone)]
pub enum PatternKind {
    /// No `*`; matches itself and any subdomain of itself.
    Exact,
    /// `*.suffix`; matches the suffix domain or any subdomain of it.
    WildcardPrefix { suffix: String },
    /// `*` anywhere else, anchored glob over the whole candidate.
    Glob(GlobMatcher),
}

/// Compiled form of a general wildcard pattern
#[derive(Debug, Clone)]
pub enum GlobMatcher {
    Compiled(Regex),
    /// Used when the regex cannot be built; same semantics, no regex engine.
    Simple,
}

/// A normalized scope rule.
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    kind: PatternKind,
}

impl Pattern {
    pub fn new(pattern: &str) -> Self {
        let raw = normalize(pattern);

        let kind = if !raw.contains('*') {
            PatternKind::Exact
        } else if let Some(suffix) = raw.strip_prefix("*.") {
            PatternKind::WildcardPrefix {
                suffix: suffix.to_string(),
            }
        } else {
            PatternKind::Glob(compile_glob(&raw))
        };

        Self { raw, kind }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> &PatternKind {
        &self.kind
    }

    /// Match a candidate that has already gone through [`normalize`].
    pub fn matches_normalized(&self, candidate: &str) -> bool {
        if self.raw == candidate {
            return true;
        }

        match &self.kind {
            PatternKind::WildcardPrefix { suffix } => {
                candidate == suffix || is_subdomain_of(candidate, suffix)
            }
            PatternKind::Glob(GlobMatcher::Compiled(regex)) => regex.is_match(candidate),
            PatternKind::Glob(GlobMatcher::Simple) => simple_glob_match(candidate, &self.raw),
            // An empty rule would otherwise match anything ending in "."
            PatternKind::Exact => !self.raw.is_empty() && is_subdomain_of(candidate, &self.raw),
        }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.matches_normalized(&normalize(candidate))
    }
}

/// Check a single candidate against a single pattern.
///
/// Both sides are normalized first. Evaluation order:
/// 1. identical strings match
/// 2. `*.suffix` matches `suffix` and anything ending in `.suffix`
/// 3. any other `*` pattern is an anchored glob
/// 4. a pattern without `*` also matches its subdomains
pub fn matches(candidate: &str, pattern: &str) -> bool {
    Pattern::new(pattern).matches(candidate)
}

fn is_subdomain_of(candidate: &str, parent: &str) -> bool {
    candidate.len() > parent.len()
        && candidate.ends_with(parent)
        && candidate.as_bytes()[candidate.len() - parent.len() - 1] == b'.'
}

fn compile_glob(pattern: &str) -> GlobMatcher {
    let expr = format!("^{}$", regex::escape(pattern).replace(r"\*", ".*"));

    match Regex::new(&expr) {
        Ok(regex) => GlobMatcher::Compiled(regex),
        Err(e) => {
            log::warn!("Could not compile scope pattern '{pattern}', using simple glob: {e}");
            GlobMatcher::Simple
        }
    }
}

/// Anchored `*` glob without regex. `*` matches any run of characters,
/// everything else must match literally.
pub(crate) fn simple_glob_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let (mut t, mut p) = (0, 0);
    let mut star: Option<usize> = None;
    let mut resume = 0;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            resume = t;
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            t += 1;
            p += 1;
        } else if let Some(s) = star {
            // Let the last star swallow one more character
            p = s + 1;
            resume += 1;
            t = resume;
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
