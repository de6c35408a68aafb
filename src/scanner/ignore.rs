use globset::{GlobBuilder, GlobMatcher};

use crate::{Result, SnapSyncError};

struct IgnorePattern {
    negated: bool,
    matcher: GlobMatcher,
}

/// Ordered glob matcher for path exclusion.
///
/// Patterns are shell-style globs (`*`, `?`, `[...]`) matched against
/// forward-slash paths relative to the scan root; a leading `!` negates. The
/// last matching pattern decides.
pub struct PathIgnorer {
    patterns: Vec<IgnorePattern>,
}

impl PathIgnorer {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let (negated, body) = match pattern.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, pattern.as_str()),
            };
            if body.is_empty() {
                return Err(SnapSyncError::InvalidPattern(pattern.clone()));
            }
            // literal_separator keeps * and ? from crossing path boundaries.
            let matcher = GlobBuilder::new(body)
                .literal_separator(true)
                .build()?
                .compile_matcher();
            compiled.push(IgnorePattern { negated, matcher });
        }
        Ok(Self { patterns: compiled })
    }

    pub fn ignored(&self, path: &str) -> bool {
        let mut ignored = false;
        for pattern in &self.patterns {
            if pattern.matcher.is_match(path) {
                ignored = !pattern.negated;
            }
        }
        ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ignorer(patterns: &[&str]) -> PathIgnorer {
        let owned: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        PathIgnorer::new(&owned).expect("compile failed")
    }

    #[test]
    fn no_patterns_ignores_nothing() {
        let ignorer = ignorer(&[]);
        assert!(!ignorer.ignored("anything"));
    }

    #[test]
    fn simple_glob() {
        let ignorer = ignorer(&["*.log"]);
        assert!(ignorer.ignored("b.log"));
        assert!(!ignorer.ignored("a.txt"));
    }

    #[test]
    fn star_does_not_cross_separators() {
        let ig = ignorer(&["*.log"]);
        assert!(!ig.ignored("sub/b.log"));
        assert!(ignorer(&["sub/*.log"]).ignored("sub/b.log"));
    }

    #[test]
    fn last_match_wins() {
        let ignorer = ignorer(&["*.log", "!keep.log"]);
        assert!(ignorer.ignored("b.log"));
        assert!(!ignorer.ignored("keep.log"));

        let reignored = super::PathIgnorer::new(&[
            "*.log".to_string(),
            "!keep.log".to_string(),
            "keep.*".to_string(),
        ])
        .unwrap();
        assert!(reignored.ignored("keep.log"));
    }

    #[test]
    fn character_class() {
        let ignorer = ignorer(&["file[0-9].tmp"]);
        assert!(ignorer.ignored("file3.tmp"));
        assert!(!ignorer.ignored("filex.tmp"));
    }

    #[test]
    fn malformed_pattern_fails() {
        assert!(PathIgnorer::new(&["[".to_string()]).is_err());
    }

    #[test]
    fn empty_and_bare_negation_fail() {
        assert!(PathIgnorer::new(&["".to_string()]).is_err());
        assert!(PathIgnorer::new(&["!".to_string()]).is_err());
    }
}
