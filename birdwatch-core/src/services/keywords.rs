// src/services/keywords.rs

use regex::{Regex, RegexBuilder};

use crate::Error;

/// One configured keyword pattern. Patterns are regexes searched
/// case-insensitively anywhere in the post text; a plain word therefore
/// behaves as a substring match. Compiled once at load, immutable after.
#[derive(Debug, Clone)]
pub struct KeywordRule {
    pattern: String,
    regex: Regex,
}

impl KeywordRule {
    pub fn compile(pattern: &str) -> Result<Self, Error> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::Config(format!("bad keyword pattern '{pattern}': {e}")))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Compiles the whole list, preserving configured order.
    pub fn compile_all(patterns: &[String]) -> Result<Vec<Self>, Error> {
        patterns.iter().map(|p| Self::compile(p)).collect()
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Returns the first rule, in configured order, whose pattern occurs in
/// `text`. Position within the text does not matter; list order wins.
pub fn first_match<'a>(text: &str, rules: &'a [KeywordRule]) -> Option<&'a KeywordRule> {
    rules.iter().find(|rule| rule.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(patterns: &[&str]) -> Vec<KeywordRule> {
        patterns
            .iter()
            .map(|p| KeywordRule::compile(p).unwrap())
            .collect()
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let rules = rules(&["delay"]);
        let hit = first_match("Flight 100 DELAY announced", &rules);
        assert_eq!(hit.map(KeywordRule::pattern), Some("delay"));
    }

    #[test]
    fn test_configured_order_wins_over_text_order() {
        // "cancel" appears first in the text, but "delay" is first in the
        // configured list, so "delay" is reported.
        let rules = rules(&["delay", "cancel"]);
        let hit = first_match("cancelled... no wait, just a delay", &rules);
        assert_eq!(hit.map(KeywordRule::pattern), Some("delay"));
    }

    #[test]
    fn test_no_match_returns_none() {
        let rules = rules(&["delay", "cancel"]);
        assert!(first_match("on time today", &rules).is_none());
    }

    #[test]
    fn test_regex_patterns_are_supported() {
        let rules = rules(&[r"gate \d+"]);
        let hit = first_match("now boarding at Gate 42", &rules);
        assert_eq!(hit.map(KeywordRule::pattern), Some(r"gate \d+"));
    }

    #[test]
    fn test_substring_search_not_full_match() {
        let rules = rules(&["delay"]);
        assert!(first_match("undelayed", &rules).is_some());
    }

    #[test]
    fn test_bad_pattern_is_config_error() {
        let err = KeywordRule::compile("((").unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {err:?}");
    }
}
