//! Malformed-line detection
//!
//! Some VIPP idioms survive translation as text that is not valid DocDEF.
//! Emitted lines matching a configured pattern are wrapped in a comment so
//! the program still loads.

use regex::Regex;
use tracing::warn;

use crate::config::MalformedConfig;

/// Compiled malformed-line patterns
#[derive(Debug, Clone)]
pub struct MalformedDetector {
    patterns: Vec<Regex>,
}

impl MalformedDetector {
    /// Compile every configured pattern. Invalid patterns are logged and skipped.
    pub fn new(config: &MalformedConfig) -> Self {
        let patterns = config
            .all_patterns()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    warn!("Ignoring malformed-line pattern {:?}: {}", pattern, e);
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    /// True when `line` is code (not blank, not a comment) matching a pattern.
    pub fn is_malformed(&self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("/*") || trimmed.starts_with("//") {
            return false;
        }
        self.patterns.iter().any(|p| p.is_match(line))
    }

    /// Return `line`, commented out if it is malformed.
    pub fn sanitize(&self, line: &str) -> String {
        if self.is_malformed(line) {
            format!("/* {} */", line)
        } else {
            line.to_string()
        }
    }
}

impl Default for MalformedDetector {
    fn default() -> Self {
        Self::new(&MalformedConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_patterns() {
        let detector = MalformedDetector::default();
        assert!(detector.is_malformed("X = -;"));
        assert!(detector.is_malformed("A = =;"));
        assert!(detector.is_malformed("PAGEBRK IF"));
        assert!(detector.is_malformed("{ /VAR_A 1 SETVAR }"));
        assert!(detector.is_malformed("1 2 3 4 5 SETPAGENUMBER"));
        assert!(detector.is_malformed("(x) VSUB SH"));
        assert!(!detector.is_malformed("VAR_A = 1;"));
        assert!(!detector.is_malformed("IF ISTRUE(VAR_A == 'X');"));
    }

    #[test]
    fn test_comparison_literal_assignment() {
        let detector = MalformedDetector::default();
        assert!(detector.is_malformed("PREFIX eq (STMTTP) = VAR_X;"));
        assert!(detector.is_malformed("X = FLD3 ne (A)"));
        assert!(!detector.is_malformed("PREFIX eq (STMTTP)"));
    }

    #[test]
    fn test_comments_and_blank_lines_pass() {
        let detector = MalformedDetector::default();
        assert!(!detector.is_malformed("/* X = -; */"));
        assert!(!detector.is_malformed("// PAGEBRK IF"));
        assert!(!detector.is_malformed("   "));
    }

    #[test]
    fn test_sanitize_wraps() {
        let detector = MalformedDetector::default();
        assert_eq!(detector.sanitize("X = -;"), "/* X = -; */");
        assert_eq!(detector.sanitize("X = 1;"), "X = 1;");
    }

    #[test]
    fn test_extra_patterns() {
        let mut config = MalformedConfig::default();
        config.extra_patterns.push("^LEGACY".to_string());
        config.extra_patterns.push("(".to_string());
        let detector = MalformedDetector::new(&config);
        assert!(detector.is_malformed("LEGACY 1;"));
        assert!(!detector.is_malformed("NEW 1;"));
    }
}
