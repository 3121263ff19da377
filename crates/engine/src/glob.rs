// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ant-style glob matching for the artifact collector (§4.6).
//!
//! `?` matches one character excluding `/`; `*` matches zero or more
//! characters excluding `/`; `**` matches zero or more characters including
//! `/` (i.e. it can span path segments). There is no crate in the corpus
//! that implements this exact grammar, so the matcher is hand-rolled:
//! segment-by-segment recursion for `**`, a small wildcard DP for `?`/`*`
//! within one segment. Because matching works on literal characters rather
//! than a regex, there's nothing to escape — `.`, `(`, and friends compare
//! as plain bytes.

/// The result of [`compile`]: where to start a directory walk and how deep
/// to go before falling back to full pattern matching on each candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPattern {
    pub pattern: String,
    pub base_prefix: String,
    /// `None` means unbounded (the pattern contains `**`).
    pub max_depth: Option<usize>,
    pub is_literal: bool,
}

/// Split `pattern` into its literal base prefix and wildcard remainder
/// (§4.6 step 1).
pub fn compile(pattern: &str) -> CompiledPattern {
    let segments: Vec<&str> = pattern.split('/').collect();
    let mut literal_count = 0;
    for segment in &segments {
        if segment.contains('*') || segment.contains('?') {
            break;
        }
        literal_count += 1;
    }
    let base_prefix = segments[..literal_count].join("/");
    let is_literal = literal_count == segments.len();
    let max_depth = if pattern.contains("**") {
        None
    } else {
        Some(segments.len() - literal_count)
    };
    CompiledPattern { pattern: pattern.to_string(), base_prefix, max_depth, is_literal }
}

/// Whether `path` (relative, `/`-separated) matches `pattern`.
pub fn matches(pattern: &str, path: &str) -> bool {
    let pattern_segments: Vec<&str> = pattern.split('/').collect();
    let path_segments: Vec<&str> = path.split('/').collect();
    match_segments(&pattern_segments, &path_segments)
}

fn match_segments(pattern: &[&str], path: &[&str]) -> bool {
    match pattern.first() {
        None => path.is_empty(),
        Some(&"**") => {
            match_segments(&pattern[1..], path)
                || (!path.is_empty() && match_segments(pattern, &path[1..]))
        }
        Some(segment) => {
            if path.is_empty() {
                return false;
            }
            segment_matches(segment, path[0]) && match_segments(&pattern[1..], &path[1..])
        }
    }
}

/// Wildcard match within one path segment (`?`/`*`, no `/`).
fn segment_matches(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (plen, tlen) = (p.len(), t.len());

    let mut dp = vec![vec![false; tlen + 1]; plen + 1];
    dp[0][0] = true;
    for i in 1..=plen {
        if p[i - 1] == '*' {
            dp[i][0] = dp[i - 1][0];
        }
    }
    for i in 1..=plen {
        for j in 1..=tlen {
            dp[i][j] = match p[i - 1] {
                '*' => dp[i - 1][j] || dp[i][j - 1],
                '?' => dp[i - 1][j - 1],
                c => dp[i - 1][j - 1] && c == t[j - 1],
            };
        }
    }
    dp[plen][tlen]
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// A single path segment free of `/`, `*`, and `?`, so any path built
    /// from it can only be matched as a literal, never accidentally as a
    /// wildcard.
    fn segment() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_]{1,6}"
    }

    fn path(max_segments: usize) -> impl Strategy<Value = Vec<String>> {
        proptest::collection::vec(segment(), 1..=max_segments)
    }

    proptest! {
        #[test]
        fn a_literal_path_always_matches_itself(segments in path(5)) {
            let joined = segments.join("/");
            prop_assert!(matches(&joined, &joined));
        }

        #[test]
        fn double_star_alone_matches_any_path(segments in path(5)) {
            let joined = segments.join("/");
            prop_assert!(matches("**", &joined));
        }

        #[test]
        fn trailing_double_star_matches_any_suffix(
            prefix in path(3),
            suffix in path(3),
        ) {
            let pattern = format!("{}/**", prefix.join("/"));
            let full = format!("{}/{}", prefix.join("/"), suffix.join("/"));
            prop_assert!(matches(&pattern, &full));
        }

        #[test]
        fn star_within_a_segment_never_crosses_a_slash(
            prefix in path(2),
            a in segment(),
            b in segment(),
        ) {
            let pattern = format!("{}/*", prefix.join("/"));
            let nested = format!("{}/{a}/{b}", prefix.join("/"));
            prop_assert!(!matches(&pattern, &nested));
        }
    }
}
