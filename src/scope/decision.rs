//! Scope decision for a single candidate.
//!
//! Out-of-scope rules are checked first and always win. With no in-scope
//! rules the world is open (accept); once an allowlist exists, anything not
//! on it is rejected.

use super::{normalize, ScopeContext};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionReason {
    OutOfScopeMatch,
    InScopeMatch,
    NoRulesDefaultAccept,
    NoInScopeMatch,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::OutOfScopeMatch => "OUT_OF_SCOPE_MATCH",
            DecisionReason::InScopeMatch => "IN_SCOPE_MATCH",
            DecisionReason::NoRulesDefaultAccept => "NO_RULES_DEFAULT_ACCEPT",
            DecisionReason::NoInScopeMatch => "NO_IN_SCOPE_MATCH",
        }
    }

    pub fn is_accepting(&self) -> bool {
        matches!(
            self,
            DecisionReason::InScopeMatch | DecisionReason::NoRulesDefaultAccept
        )
    }

    /// Short human readable explanation
    pub fn describe(&self) -> &'static str {
        match self {
            DecisionReason::OutOfScopeMatch => "matches an out-of-scope rule",
            DecisionReason::InScopeMatch => "matches an in-scope rule",
            DecisionReason::NoRulesDefaultAccept => "no in-scope rules defined",
            DecisionReason::NoInScopeMatch => "not covered by any in-scope rule",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Normalized candidate the decision was made for
    pub candidate: String,
    pub accepted: bool,
    pub reason: DecisionReason,
    /// Rule responsible for the decision, if one matched
    pub matched_pattern: Option<String>,
}

impl Decision {
    fn new(candidate: String, reason: DecisionReason, matched_pattern: Option<String>) -> Self {
        Self {
            candidate,
            accepted: reason.is_accepting(),
            reason,
            matched_pattern,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.accepted { "accept" } else { "reject" };
        write!(f, "{} {}: {}", verdict, self.candidate, self.reason.describe())?;
        if let Some(pattern) = &self.matched_pattern {
            write!(f, " ({pattern})")?;
        }
        Ok(())
    }
}

/// Decide whether `candidate` is in scope for `ctx`.
pub fn decide(candidate: &str, ctx: &ScopeContext) -> Decision {
    let candidate = normalize(candidate);

    if let Some(pattern) = ctx.out_scope().find_match(&candidate) {
        let pattern = pattern.as_str().to_string();
        return Decision::new(candidate, DecisionReason::OutOfScopeMatch, Some(pattern));
    }

    if let Some(pattern) = ctx.in_scope().find_match(&candidate) {
        let pattern = pattern.as_str().to_string();
        return Decision::new(candidate, DecisionReason::InScopeMatch, Some(pattern));
    }

    if ctx.in_scope().is_empty() {
        Decision::new(candidate, DecisionReason::NoRulesDefaultAccept, None)
    } else {
        Decision::new(candidate, DecisionReason::NoInScopeMatch, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn acme() -> ScopeContext {
        ScopeContext::from_lists("acme", ["*.acme.com"], ["dev.acme.com"])
    }

    #[test]
    fn test_acme_scenario() {
        let ctx = acme();

        let shop = decide("shop.acme.com", &ctx);
        assert!(shop.accepted);
        assert_eq!(shop.reason, DecisionReason::InScopeMatch);
        assert_eq!(shop.matched_pattern.as_deref(), Some("*.acme.com"));

        let dev = decide("dev.acme.com", &ctx);
        assert!(!dev.accepted);
        assert_eq!(dev.reason, DecisionReason::OutOfScopeMatch);
        assert_eq!(dev.matched_pattern.as_deref(), Some("dev.acme.com"));

        let apex = decide("acme.com", &ctx);
        assert!(apex.accepted);
        assert_eq!(apex.reason, DecisionReason::InScopeMatch);
    }

    #[test]
    fn test_out_of_scope_covers_subdomains() {
        let ctx = acme();
        let decision = decide("api.dev.acme.com", &ctx);
        assert_eq!(decision.reason, DecisionReason::OutOfScopeMatch);
    }

    #[test]
    fn test_out_of_scope_wins_over_in_scope() {
        let ctx = ScopeContext::from_lists("acme", ["shop.acme.com"], ["shop.acme.com"]);
        let decision = decide("shop.acme.com", &ctx);
        assert!(!decision.accepted);
        assert_eq!(decision.reason, DecisionReason::OutOfScopeMatch);
    }

    #[test]
    fn test_default_accept_without_rules() {
        let ctx = ScopeContext::empty("acme");
        let decision = decide("whatever.example.org", &ctx);
        assert!(decision.accepted);
        assert_eq!(decision.reason, DecisionReason::NoRulesDefaultAccept);
        assert_eq!(decision.matched_pattern, None);
    }

    #[test]
    fn test_default_accept_with_only_out_of_scope_rules() {
        let ctx = ScopeContext::from_lists("acme", Vec::<String>::new(), ["blog.acme.com"]);
        assert_eq!(
            decide("shop.acme.com", &ctx).reason,
            DecisionReason::NoRulesDefaultAccept
        );
        assert_eq!(
            decide("blog.acme.com", &ctx).reason,
            DecisionReason::OutOfScopeMatch
        );
    }

    #[test]
    fn test_closed_world() {
        let ctx = ScopeContext::from_lists("acme", ["*.example.com"], Vec::<String>::new());
        let decision = decide("example.net", &ctx);
        assert!(!decision.accepted);
        assert_eq!(decision.reason, DecisionReason::NoInScopeMatch);
    }

    #[test]
    fn test_case_insensitive() {
        let ctx = ScopeContext::from_lists("acme", ["*.Example.com"], ["Internal.example.COM"]);
        assert_eq!(
            decide("API.Example.COM", &ctx),
            decide("api.example.com", &ctx)
        );
        assert_eq!(
            decide("  INTERNAL.example.com ", &ctx).reason,
            DecisionReason::OutOfScopeMatch
        );
    }

    #[test]
    fn test_reason_serialization() {
        let json = serde_json::to_string(&DecisionReason::NoRulesDefaultAccept).unwrap();
        assert_eq!(json, "\"NO_RULES_DEFAULT_ACCEPT\"");
        assert_eq!(DecisionReason::OutOfScopeMatch.to_string(), "OUT_OF_SCOPE_MATCH");
    }

    #[test]
    fn test_decision_display() {
        let decision = decide("dev.acme.com", &acme());
        assert_eq!(
            decision.to_string(),
            "reject dev.acme.com: matches an out-of-scope rule (dev.acme.com)"
        );
    }

    proptest! {
        #[test]
        fn prop_no_rules_accepts_everything(d in "[a-zA-Z0-9.-]{1,32}") {
            let decision = decide(&d, &ScopeContext::empty("any"));
            prop_assert!(decision.accepted);
            prop_assert_eq!(decision.reason, DecisionReason::NoRulesDefaultAccept);
        }

        #[test]
        fn prop_exclusion_precedence(sub in "[a-z]{1,8}", base in "[a-z]{1,8}\\.[a-z]{2,3}") {
            let domain = format!("{sub}.{base}");
            let ctx = ScopeContext::from_lists("any", [format!("*.{base}")], [domain.clone()]);
            let decision = decide(&domain, &ctx);
            prop_assert!(!decision.accepted);
            prop_assert_eq!(decision.reason, DecisionReason::OutOfScopeMatch);
        }
    }
}
