//! Glob-style URI prefix matching.
//!
//! A pattern is a `|`-separated list of alternatives. Within an alternative:
//!
//! | token | matches                                              |
//! |-------|------------------------------------------------------|
//! | `?`   | exactly one byte                                     |
//! | `*`   | the longest run of bytes without `/`, backtracking   |
//! | `**`  | the longest run of any bytes, backtracking           |
//! | `$`   | end of subject (zero width)                          |
//! | other | itself                                               |
//!
//! Alternatives are tried left to right and the first one that matches a
//! prefix of the subject wins, even if a later one would consume more.

/// Matches `pattern` against a prefix of `subject`.
///
/// Returns the number of subject bytes consumed by the first matching
/// alternative, or `None` when no alternative matches.
///
/// ```
/// use tether::routing::matcher::match_prefix;
///
/// assert_eq!(match_prefix(b"/api", b"/api/users"), Some(4));
/// assert_eq!(match_prefix(b"**.cgi$", b"/bin/x.cgi"), Some(10));
/// assert_eq!(match_prefix(b"/a/", b"/ab/c"), None);
/// ```
pub fn match_prefix(pattern: &[u8], subject: &[u8]) -> Option<usize> {
    pattern
        .split(|&b| b == b'|')
        .find_map(|alternative| match_alternative(alternative, subject))
}

/// `&str` convenience wrapper around [`match_prefix`].
pub fn match_prefix_str(pattern: &str, subject: &str) -> Option<usize> {
    match_prefix(pattern.as_bytes(), subject.as_bytes())
}

// Each recursion consumes at least one pattern byte, so depth is bounded by
// the pattern length.
fn match_alternative(pattern: &[u8], subject: &[u8]) -> Option<usize> {
    let mut i = 0;
    let mut j = 0;

    while i < pattern.len() {
        match pattern[i] {
            b'?' if j < subject.len() => {}
            b'$' => return (j == subject.len()).then_some(j),
            b'*' => {
                i += 1;
                let rest = &subject[j..];
                let mut len = if pattern.get(i) == Some(&b'*') {
                    i += 1;
                    rest.len()
                } else {
                    rest.iter().position(|&b| b == b'/').unwrap_or(rest.len())
                };

                if i == pattern.len() {
                    return Some(j + len);
                }

                loop {
                    if let Some(tail) = match_alternative(&pattern[i..], &rest[len..]) {
                        return Some(j + len + tail);
                    }
                    if len == 0 {
                        return None;
                    }
                    len -= 1;
                }
            }
            literal => {
                if subject.get(j) != Some(&literal) {
                    return None;
                }
            }
        }
        i += 1;
        j += 1;
    }

    Some(j)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_mark_needs_a_byte() {
        assert_eq!(match_prefix(b"?", b""), None);
        assert_eq!(match_prefix(b"a?", b"ab"), Some(2));
    }

    #[test]
    fn empty_alternative_matches_empty_prefix() {
        assert_eq!(match_prefix(b"", b"anything"), Some(0));
        assert_eq!(match_prefix(b"x|", b"abc"), Some(0));
    }

    #[test]
    fn adversarial_pattern_terminates() {
        let pattern = b"*a*a*a*a*a*a*b";
        let subject = b"aaaaaaaaaaaaaaaaaaaa";
        assert_eq!(match_prefix(pattern, subject), None);
    }
}
