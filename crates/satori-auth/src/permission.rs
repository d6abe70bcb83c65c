//! Wildcard permission matching.

const WILDCARD: &str = "*";
const SEPARATOR: char = ':';

/// Matches a granted permission `pattern` against a required
/// `permission`.
///
/// Rules, checked in order:
///
/// 1. `pattern == "*"` or exact equality matches.
/// 2. A pattern ending in `:*` matches any permission starting with the
///    pattern minus the trailing `*` (`user:*` matches `user:add` and
///    `user:profile:edit`).
/// 3. A pattern containing `*` elsewhere is matched segment-wise on `:`;
///    segment counts must be equal and each pattern segment must be `*`
///    or equal (`user:*:view` matches `user:1:view`).
/// 4. Anything else does not match.
///
/// This is a closed, total function: no regex, no backtracking.
#[must_use]
pub fn matches(pattern: &str, permission: &str) -> bool {
    if pattern == WILDCARD || pattern == permission {
        return true;
    }

    if let Some(prefix) = pattern.strip_suffix(":*") {
        // Keep the separator in the prefix so "user:*" does not match
        // "userx:add".
        return permission.starts_with(&pattern[..prefix.len() + 1]);
    }

    if pattern.contains(WILDCARD) {
        let pattern_parts: Vec<&str> = pattern.split(SEPARATOR).collect();
        let permission_parts: Vec<&str> = permission.split(SEPARATOR).collect();
        if pattern_parts.len() != permission_parts.len() {
            return false;
        }
        return pattern_parts
            .iter()
            .zip(&permission_parts)
            .all(|(pat, perm)| *pat == WILDCARD || pat == perm);
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_global_wildcard() {
        assert!(matches("*", "user:read"));
        assert!(matches("user:read", "user:read"));
        assert!(!matches("user:read", "admin:read"));
    }

    #[test]
    fn test_trailing_wildcard_is_prefix_match() {
        assert!(matches("user:*", "user:delete"));
        assert!(matches("user:*", "user:profile:edit"));
        assert!(!matches("user:*", "userx:delete"));
        assert!(!matches("user:*", "admin:delete"));
    }

    #[test]
    fn test_inner_wildcard_is_segment_match() {
        assert!(matches("user:*:view", "user:1:view"));
        assert!(!matches("user:*:view", "user:1:edit"));
        assert!(!matches("user:*:view", "user:1:2:view"));
        assert!(matches("*:read", "doc:read"));
    }

    #[test]
    fn test_no_wildcard_no_partial_match() {
        assert!(!matches("user", "user:read"));
        assert!(!matches("user:read", "user"));
    }
}
