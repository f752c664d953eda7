//! Keyword highlighting of reactor names.
//!
//! A keyword is a shell-style wildcard pattern (`*`, `?`, `[abc]`, `[!abc]`)
//! matched case-insensitively anywhere in the name, i.e. as if it were
//! written `*keyword*`. Rules are kept in color-priority order and the first
//! matching rule wins.

use regex::{Regex, RegexBuilder};

use crate::color::Rgb;
use crate::error::{Error, Result};

/// One compiled keyword → color rule.
#[derive(Debug, Clone)]
pub struct HighlightRule {
    keyword: String,
    color: Rgb,
    matcher: Regex,
}

impl HighlightRule {
    /// Compiles a keyword.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if the translated pattern is rejected
    /// by the regex engine.
    pub fn new(keyword: &str, color: Rgb) -> Result<Self> {
        let pattern = format!("^.*{}.*$", glob_to_regex(keyword));
        let matcher = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()
            .map_err(|e| Error::InvalidPattern {
                pattern: keyword.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            keyword: keyword.to_string(),
            color,
            matcher,
        })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    /// True when the keyword occurs in `name`.
    pub fn matches(&self, name: &str) -> bool {
        self.matcher.is_match(name)
    }
}

/// Ordered set of highlight rules.
#[derive(Debug, Clone, Default)]
pub struct HighlightRules {
    rules: Vec<HighlightRule>,
}

impl HighlightRules {
    /// Builds rules from `(keyword, color)` pairs in priority order.
    ///
    /// Blank keywords are skipped. Keywords that fail to compile are logged
    /// and skipped so that one bad field does not disable the others.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, Rgb)>) -> Self {
        let rules = pairs
            .into_iter()
            .filter(|(keyword, _)| !keyword.trim().is_empty())
            .filter_map(|(keyword, color)| match HighlightRule::new(keyword.trim(), color) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    log::warn!("ignoring highlight keyword: {e}");
                    None
                }
            })
            .collect();
        Self { rules }
    }

    /// Index of the first rule matching `name`.
    pub fn match_index(&self, name: &str) -> Option<usize> {
        self.rules.iter().position(|rule| rule.matches(name))
    }

    /// Color of the first rule matching `name`.
    pub fn match_color(&self, name: &str) -> Option<Rgb> {
        self.match_index(name).map(|i| self.rules[i].color)
    }

    pub fn rules(&self) -> &[HighlightRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Translates a shell wildcard pattern into an unanchored regex fragment.
fn glob_to_regex(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::with_capacity(glob.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                // Find the closing bracket; a `]` right after `[` or `[!` is literal.
                let mut j = i + 1;
                if j < chars.len() && chars[j] == '!' {
                    j += 1;
                }
                if j < chars.len() && chars[j] == ']' {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']' {
                    j += 1;
                }
                if j >= chars.len() {
                    out.push_str(r"\[");
                } else {
                    let mut class: String = chars[i + 1..j].iter().collect();
                    class = class.replace('\\', r"\\");
                    if let Some(rest) = class.strip_prefix('!') {
                        class = format!("^{rest}");
                    } else if class.starts_with('^') {
                        class.insert(0, '\\');
                    }
                    class = class.replace('[', r"\[");
                    out.push('[');
                    out.push_str(&class);
                    out.push(']');
                    i = j;
                }
            }
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = Rgb::new(255, 0, 0);
    const BLUE: Rgb = Rgb::new(0, 0, 255);

    #[test]
    fn test_first_rule_wins() {
        let rules = HighlightRules::from_pairs([("glu*", RED), ("*ctrl", BLUE)]);
        assert_eq!(rules.match_color("glucose_ctrl"), Some(RED));
        assert_eq!(rules.match_color("lactose_ctrl"), Some(BLUE));
        assert_eq!(rules.match_color("lactose"), None);
    }

    #[test]
    fn test_substring_case_insensitive() {
        let rule = HighlightRule::new("GLU", RED).unwrap();
        assert!(rule.matches("d-glucose"));
        assert!(rule.matches("Glu"));
        assert!(!rule.matches("gl"));
    }

    #[test]
    fn test_wildcards() {
        let rule = HighlightRule::new("a?c", RED).unwrap();
        assert!(rule.matches("xxabcxx"));
        assert!(!rule.matches("ac"));

        let rule = HighlightRule::new("rep[12]", RED).unwrap();
        assert!(rule.matches("strain_rep2"));
        assert!(!rule.matches("strain_rep3"));

        let rule = HighlightRule::new("rep[!12]", RED).unwrap();
        assert!(rule.matches("strain_rep3"));
        assert!(!rule.matches("strain_rep1"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let rule = HighlightRule::new("a.b(1)", RED).unwrap();
        assert!(rule.matches("xa.b(1)"));
        assert!(!rule.matches("axb(1)"));

        // Unclosed bracket is a literal '['
        let rule = HighlightRule::new("[wt", RED).unwrap();
        assert!(rule.matches("strain [wt]"));
    }

    #[test]
    fn test_blank_keywords_skipped() {
        let rules = HighlightRules::from_pairs([("", RED), ("  ", BLUE)]);
        assert!(rules.is_empty());
        assert_eq!(rules.match_index("anything"), None);
    }
}
