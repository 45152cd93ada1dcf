//! Wildcard matching for policy actions, resources and principals
//!
//! Supports the two IAM wildcards over the whole string:
//! - `*` - Matches any run of characters, including `/` and the empty run
//! - `?` - Matches exactly one character
//!
//! Unlike URL routing, resource ARNs are not split into segments, so
//! `arn:aws:s3:::site/*` covers `arn:aws:s3:::site/a/b/c`.

/// Pattern matcher for policy strings
pub struct PatternMatcher;

impl PatternMatcher {
    /// Check if a value matches a pattern (case-sensitive)
    ///
    /// # Examples
    /// ```
    /// use spa_gateway::iam::PatternMatcher;
    ///
    /// assert!(PatternMatcher::matches("arn:aws:s3:::site/*", "arn:aws:s3:::site/a/b.css"));
    /// assert!(PatternMatcher::matches("execute-api:/*/*/*", "execute-api:/prod/GET/"));
    /// assert!(!PatternMatcher::matches("arn:aws:s3:::site/*", "arn:aws:s3:::other/x"));
    /// ```
    pub fn matches(pattern: &str, value: &str) -> bool {
        let pattern: Vec<char> = pattern.chars().collect();
        let value: Vec<char> = value.chars().collect();
        Self::match_chars(&pattern, &value)
    }

    /// Check if a value matches a pattern, ignoring ASCII and Unicode case
    ///
    /// Used for action names, which IAM treats case-insensitively.
    pub fn matches_ignore_case(pattern: &str, value: &str) -> bool {
        Self::matches(&pattern.to_lowercase(), &value.to_lowercase())
    }

    /// Greedy match with single-star backtracking.
    ///
    /// Runs in O(pattern * value) worst case with no recursion, so hostile
    /// patterns cannot blow the stack.
    fn match_chars(pattern: &[char], value: &[char]) -> bool {
        let mut p = 0;
        let mut v = 0;
        let mut star: Option<usize> = None;
        let mut resume = 0;

        while v < value.len() {
            if p < pattern.len() && (pattern[p] == '?' || pattern[p] == value[v]) {
                p += 1;
                v += 1;
            } else if p < pattern.len() && pattern[p] == '*' {
                star = Some(p);
                resume = v;
                p += 1;
            } else if let Some(star_pos) = star {
                // Let the last star swallow one more character and retry
                p = star_pos + 1;
                resume += 1;
                v = resume;
            } else {
                return false;
            }
        }

        // Trailing stars match the empty run
        while p < pattern.len() && pattern[p] == '*' {
            p += 1;
        }

        p == pattern.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(PatternMatcher::matches("s3:GetObject", "s3:GetObject"));
        assert!(!PatternMatcher::matches("s3:GetObject", "s3:GetObjectAcl"));
        assert!(!PatternMatcher::matches("s3:GetObject", "s3:Get"));
    }

    #[test]
    fn test_star_crosses_slashes() {
        assert!(PatternMatcher::matches(
            "arn:aws:s3:::site/*",
            "arn:aws:s3:::site/css/theme.css"
        ));
        assert!(PatternMatcher::matches(
            "arn:aws:s3:::site/*",
            "arn:aws:s3:::site/"
        ));
        assert!(!PatternMatcher::matches(
            "arn:aws:s3:::site/*",
            "arn:aws:s3:::site"
        ));
    }

    #[test]
    fn test_multiple_stars() {
        let pattern = "execute-api:/*/*/*";
        assert!(PatternMatcher::matches(pattern, "execute-api:/prod/GET/"));
        assert!(PatternMatcher::matches(pattern, "execute-api:/prod/GET/a/b/c"));
        assert!(!PatternMatcher::matches(pattern, "execute-api:/prod"));
        assert!(PatternMatcher::matches("a*b*c", "aXXbYYc"));
        assert!(!PatternMatcher::matches("a*b*c", "acb"));
    }

    #[test]
    fn test_question_mark() {
        assert!(PatternMatcher::matches("file-?.txt", "file-1.txt"));
        assert!(!PatternMatcher::matches("file-?.txt", "file-12.txt"));
        assert!(!PatternMatcher::matches("file-?.txt", "file-.txt"));
    }

    #[test]
    fn test_lone_star_matches_everything() {
        assert!(PatternMatcher::matches("*", ""));
        assert!(PatternMatcher::matches("*", "anything/at/all"));
        assert!(PatternMatcher::matches("**", "x"));
    }

    #[test]
    fn test_empty_pattern() {
        assert!(PatternMatcher::matches("", ""));
        assert!(!PatternMatcher::matches("", "x"));
    }

    #[test]
    fn test_ignore_case() {
        assert!(PatternMatcher::matches_ignore_case("s3:List*", "s3:listbucket"));
        assert!(PatternMatcher::matches_ignore_case(
            "execute-api:Invoke",
            "EXECUTE-API:invoke"
        ));
        assert!(!PatternMatcher::matches("s3:List*", "s3:listbucket"));
    }

    #[test]
    fn test_backtracking_after_partial_match() {
        // First "ab" candidate fails, second succeeds
        assert!(PatternMatcher::matches("*abc", "ababc"));
        assert!(PatternMatcher::matches("role-id:*", "role-id:session"));
        assert!(!PatternMatcher::matches("role-id:*", "role-idx"));
    }
}
