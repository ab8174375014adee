use regex::Regex;

/// Translates a simple shell-style glob (`*` and `?` wildcards, no character classes) into an
/// anchored regex. Used for `tagFilesAllowed` pattern matching (§4.E.5) — kept on the existing
/// `regex` dependency rather than pulling in a dedicated glob crate.
pub fn glob_to_regex(pattern: &str) -> Regex {
    let mut out = String::with_capacity(pattern.len() + 2);
    out.push('^');
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    Regex::new(&out).unwrap()
}

/// True if `candidate` matches `pattern`. An empty pattern or a bare `*` always matches (§4.E.5).
pub fn glob_matches(pattern: &str, candidate: &str) -> bool {
    if pattern.is_empty() || pattern == "*" {
        return true;
    }
    glob_to_regex(pattern).is_match(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_anything() {
        assert!(glob_matches("*", "anything/at/all.txt"));
        assert!(glob_matches("", "anything"));
    }

    #[test]
    fn wildcard_within_pattern() {
        assert!(glob_matches("custom/*.txt", "custom/foo.txt"));
        assert!(!glob_matches("custom/*.txt", "other/foo.txt"));
    }

    #[test]
    fn literal_dot_is_escaped() {
        assert!(!glob_matches("bag-info.txt", "bag-infoXtxt"));
        assert!(glob_matches("bag-info.txt", "bag-info.txt"));
    }
}
