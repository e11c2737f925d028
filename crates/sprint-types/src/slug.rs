//! Prompt slug normalization.

use serde_json::Value;

/// Slug used when a label normalizes to nothing.
pub const UNKNOWN_SLUG: &str = "unknown";

/// Lowercase a label and join its `[a-z0-9]` runs with single hyphens.
///
/// Never returns an empty string.
pub fn slugify(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_sep = false;
    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_sep && !out.is_empty() {
                out.push('-');
            }
            pending_sep = false;
            out.push(c);
        } else {
            pending_sep = true;
        }
    }
    if out.is_empty() {
        UNKNOWN_SLUG.to_string()
    } else {
        out
    }
}

/// Derive a prompt slug from a `prompt_name`/`prompt` event field.
///
/// All-digit values become `prompt-<n>`; other values are slugified. Null or
/// blank values yield `None` so the caller can keep searching.
pub fn prompt_slug_from_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    if text.is_empty() {
        return None;
    }
    if text.chars().all(|c| c.is_ascii_digit()) {
        return Some(format!("prompt-{text}"));
    }
    Some(slugify(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn slugify_basic_labels() {
        assert_eq!(slugify("Loki Prompt 13"), "loki-prompt-13");
        assert_eq!(slugify("__Demo__"), "demo");
        assert_eq!(slugify("a///b"), "a-b");
        assert_eq!(slugify("ÄBC"), "bc");
    }

    #[test]
    fn slugify_falls_back_to_unknown() {
        assert_eq!(slugify(""), "unknown");
        assert_eq!(slugify("---"), "unknown");
        assert_eq!(slugify("!!!"), "unknown");
    }

    #[test]
    fn numeric_prompt_values() {
        assert_eq!(prompt_slug_from_value(&json!("13")), Some("prompt-13".into()));
        assert_eq!(prompt_slug_from_value(&json!(7)), Some("prompt-7".into()));
        assert_eq!(prompt_slug_from_value(&json!(" 42 ")), Some("prompt-42".into()));
    }

    #[test]
    fn textual_prompt_values() {
        assert_eq!(
            prompt_slug_from_value(&json!("Grafana Fixups")),
            Some("grafana-fixups".into())
        );
        assert_eq!(prompt_slug_from_value(&json!(null)), None);
        assert_eq!(prompt_slug_from_value(&json!("   ")), None);
    }

    proptest! {
        #[test]
        fn slug_is_never_empty_and_well_formed(label in ".{0,40}") {
            let slug = slugify(&label);
            prop_assert!(!slug.is_empty());
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        }

        #[test]
        fn slugify_is_idempotent(label in ".{0,40}") {
            let once = slugify(&label);
            prop_assert_eq!(slugify(&once), once.clone());
        }
    }
}
