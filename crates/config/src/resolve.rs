use std::collections::HashSet;

use crate::defaults::DEFAULT_PROFILE;

/// First value that is not blank, trimmed.
pub fn first_non_empty<'a, I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    values
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Pick the profile: explicit value (flag or env), then the configured default,
/// then `"default"`.
pub fn choose_profile(requested: Option<&str>, configured_default: &str) -> String {
    first_non_empty([requested, Some(configured_default)])
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
}

/// Pick scopes from a comma separated override, falling back to the configured set.
///
/// The result is deduplicated and may be empty; callers substitute the built-in
/// defaults in that case.
pub fn choose_scopes(raw: Option<&str>, configured: &[String]) -> Vec<String> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => parse_scope_list(raw),
        None => unique_scopes(configured.iter().map(String::as_str)),
    }
}

pub fn parse_scope_list(raw: &str) -> Vec<String> {
    unique_scopes(raw.split(','))
}

/// Trim, drop blanks and deduplicate, keeping the first occurrence order.
pub fn unique_scopes<'a, I>(scopes: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    scopes
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(*s))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_non_empty_skips_blank_and_none() {
        assert_eq!(
            first_non_empty([None, Some("  "), Some(" b "), Some("c")]),
            Some("b".to_string())
        );
        assert_eq!(first_non_empty([None, Some("")]), None);
    }

    #[test]
    fn profile_precedence() {
        assert_eq!(choose_profile(Some("work"), "home"), "work");
        assert_eq!(choose_profile(Some(" "), "home"), "home");
        assert_eq!(choose_profile(None, ""), "default");
    }

    #[test]
    fn scopes_from_override_are_deduplicated() {
        let configured = vec!["x".to_string()];
        assert_eq!(
            choose_scopes(Some("a, b,,a ,c"), &configured),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn scopes_fall_back_to_configured() {
        let configured = vec!["x".to_string(), " x ".to_string(), "y".to_string()];
        assert_eq!(choose_scopes(None, &configured), vec!["x", "y"]);
        assert_eq!(choose_scopes(Some("  "), &configured), vec!["x", "y"]);
        assert!(choose_scopes(None, &[]).is_empty());
    }
}
