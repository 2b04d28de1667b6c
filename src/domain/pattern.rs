//! Service name filtering with simple `*` glob patterns.
//!
//! A name is mirrored when it matches at least one include pattern and
//! no exclude pattern. Excludes always win.

use tracing::trace;

/// Match `name` against a simple pattern.
///
/// `*` matches any (possibly empty) run of characters; any number of
/// wildcards may appear. Without a wildcard the match is exact.
/// Matching is case-sensitive.
pub fn simple_match(pattern: &str, name: &str) -> bool {
    let Some(first) = pattern.find('*') else {
        return pattern == name;
    };

    if first == 0 {
        if pattern.len() == 1 {
            return true;
        }
        let rest = &pattern[1..];
        let Some(next) = rest.find('*') else {
            return name.ends_with(rest);
        };
        let part = &rest[..next];
        let tail = &rest[next..];
        if part.is_empty() {
            return simple_match(tail, name);
        }

        // Try every occurrence of `part`, overlapping ones included.
        let mut from = 0;
        while let Some(offset) = name[from..].find(part) {
            let at = from + offset;
            if simple_match(tail, &name[at + part.len()..]) {
                return true;
            }
            from = at + name[at..].chars().next().map_or(1, char::len_utf8);
        }
        return false;
    }

    let prefix = &pattern[..first];
    name.starts_with(prefix) && simple_match(&pattern[first..], &name[first..])
}

/// Whether `name` matches any of `patterns`.
pub fn matches_any<S: AsRef<str>>(name: &str, patterns: &[S]) -> bool {
    patterns.iter().any(|p| simple_match(p.as_ref(), name))
}

/// Include/exclude rule deciding which services get mirrored.
///
/// Loaded once from configuration and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceFilter {
    /// Patterns a service must match to be mirrored.
    services: Vec<String>,
    /// Patterns that veto mirroring.
    ignored_services: Vec<String>,
}

impl Default for ServiceFilter {
    fn default() -> Self {
        Self {
            services: vec!["*".to_string()],
            ignored_services: Vec::new(),
        }
    }
}

impl ServiceFilter {
    /// Build a filter from include and exclude pattern lists.
    pub fn new(services: Vec<String>, ignored_services: Vec<String>) -> Self {
        Self {
            services,
            ignored_services,
        }
    }

    /// Include patterns.
    pub fn services(&self) -> &[String] {
        &self.services
    }

    /// Exclude patterns.
    pub fn ignored_services(&self) -> &[String] {
        &self.ignored_services
    }

    /// Decide whether a service should be mirrored.
    pub fn should_register(&self, service_id: &str) -> bool {
        let included = matches_any(service_id, &self.services)
            && !matches_any(service_id, &self.ignored_services);
        if !included {
            trace!(service = %service_id, "Ignoring discovered service");
        }
        included
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_without_wildcard() {
        assert!(simple_match("orders", "orders"));
        assert!(!simple_match("orders", "orders-v2"));
        assert!(!simple_match("Orders", "orders"));
    }

    #[test]
    fn test_single_star_matches_everything() {
        assert!(simple_match("*", ""));
        assert!(simple_match("*", "anything"));
    }

    #[test]
    fn test_prefix_suffix_and_substring_forms() {
        assert!(simple_match("pay*", "payments"));
        assert!(!simple_match("pay*", "prepay"));
        assert!(simple_match("*-internal", "payments-internal"));
        assert!(!simple_match("*-internal", "payments-internal-v2"));
        assert!(simple_match("*ment*", "payments"));
        assert!(!simple_match("*ment*", "orders"));
        assert!(simple_match("foo*bar", "foo-and-bar"));
        assert!(simple_match("foo*bar", "foobar"));
        assert!(!simple_match("foo*bar", "foo-and-baz"));
    }

    #[test]
    fn test_overlapping_occurrences_are_tried() {
        // First "ab" occurrence fails, the overlapping later one succeeds.
        assert!(simple_match("*ab*b", "aabab"));
        assert!(simple_match("*aa*x", "aaax"));
        assert!(simple_match("**", "x"));
    }

    #[test]
    fn test_non_ascii_names() {
        assert!(simple_match("*é*", "café-service"));
        assert!(simple_match("dü*", "dünn"));
    }

    #[test]
    fn test_default_filter_includes_everything() {
        let filter = ServiceFilter::default();
        assert!(filter.should_register("orders"));
        assert!(filter.should_register("payments-internal"));
    }

    #[test]
    fn test_exclude_overrides_include() {
        let filter = ServiceFilter::new(
            vec!["pay*".to_string()],
            vec!["*-internal".to_string()],
        );
        assert!(filter.should_register("payments"));
        assert!(!filter.should_register("payments-internal"));
        assert!(!filter.should_register("orders"));
    }

    #[test]
    fn test_empty_include_list_registers_nothing() {
        let filter = ServiceFilter::new(Vec::new(), Vec::new());
        assert!(!filter.should_register("orders"));
    }
}
