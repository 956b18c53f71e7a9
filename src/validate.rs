//! Structural checks for documents read back from storage and for values
//! typed in by the user.

use std::collections::HashSet;

use serde_json::Value;
use url::Url;

pub const MAX_NOTES_CHARS: usize = 100_000;

const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];
const PRIORITIES: [&str; 3] = ["normal", "important", "urgent"];
const STATUSES: [&str; 2] = ["pending", "completed"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl Validation {
    fn from_errors(errors: Vec<String>) -> Self {
        Validation {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Validates an AppData blob. There is no partial repair: callers discard
/// the whole document when `valid` is false.
pub fn validate(blob: &Value) -> Validation {
    let Some(doc) = blob.as_object() else {
        return Validation::from_errors(vec!["data is not an object".into()]);
    };
    let mut errors = Vec::new();

    if let Some(categories) = doc.get("bookmarks").and_then(Value::as_array) {
        for (idx, category) in categories.iter().enumerate() {
            let name_ok = category
                .get("category")
                .and_then(Value::as_str)
                .is_some_and(|s| !s.is_empty());
            if !name_ok {
                errors.push(format!("bookmark {idx}: invalid category"));
            }
            match category.get("apps").and_then(Value::as_array) {
                None => errors.push(format!("bookmark {idx}: apps must be a list")),
                Some(apps) => {
                    for (app_idx, app) in apps.iter().enumerate() {
                        let name = non_empty_str(app, "name");
                        let url = non_empty_str(app, "url");
                        if name.is_none() || url.is_none() {
                            errors.push(format!(
                                "bookmark {idx}, app {app_idx}: missing name or url"
                            ));
                        }
                        if let Some(url) = url {
                            if !is_valid_url(url) {
                                errors.push(format!("bookmark {idx}, app {app_idx}: invalid url"));
                            }
                        }
                    }
                }
            }
        }
    }

    if let Some(tasks) = doc.get("tasks").and_then(Value::as_array) {
        let mut seen = HashSet::new();
        for (idx, task) in tasks.iter().enumerate() {
            let id = non_empty_str(task, "id");
            if id.is_none() || non_empty_str(task, "title").is_none() {
                errors.push(format!("task {idx}: missing id or title"));
            }
            if let Some(id) = id {
                if !seen.insert(id) {
                    errors.push(format!("task {idx}: duplicate id {id}"));
                }
            }
            let priority_ok = task
                .get("priority")
                .and_then(Value::as_str)
                .is_some_and(|p| PRIORITIES.contains(&p));
            if !priority_ok {
                errors.push(format!("task {idx}: invalid priority"));
            }
            if let Some(status) = task.get("status") {
                let status_ok = status.as_str().is_some_and(|s| STATUSES.contains(&s));
                if !status_ok {
                    errors.push(format!("task {idx}: invalid status"));
                }
            }
        }
    }

    if let Some(notes) = doc.get("notes") {
        match notes.as_str() {
            None if !notes.is_null() => errors.push("notes: must be a string".into()),
            Some(text) if text.chars().count() > MAX_NOTES_CHARS => errors.push(format!(
                "notes: too large (max {MAX_NOTES_CHARS} characters)"
            )),
            _ => {}
        }
    }

    Validation::from_errors(errors)
}

fn non_empty_str<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Accepts absolute http and https urls only.
pub fn is_valid_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(parsed) => {
            let allowed = ALLOWED_SCHEMES.contains(&parsed.scheme());
            if !allowed {
                tracing::debug!(scheme = parsed.scheme(), "url scheme not allowed");
            }
            allowed
        }
        Err(_) => false,
    }
}

/// `#RRGGBB`, case-insensitive.
pub fn is_hex_color(raw: &str) -> bool {
    let Some(hex) = raw.strip_prefix('#') else {
        return false;
    };
    hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

pub fn sanitize_color(raw: &str, fallback: &str) -> String {
    if is_hex_color(raw) {
        raw.to_string()
    } else {
        fallback.to_string()
    }
}

/// Keeps `[a-z0-9-]` (case-insensitive) from an icon name.
pub fn clean_icon(raw: &str, fallback: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}

/// Parses `#RRGGBB` into its components.
pub fn parse_hex_color(raw: &str) -> Option<(u8, u8, u8)> {
    if !is_hex_color(raw) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&raw[i..i + 2], 16).ok();
    Some((channel(1)?, channel(3)?, channel(5)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_default_shaped_document() {
        let doc = serde_json::to_value(crate::model::AppData::default()).unwrap();
        let result = validate(&doc);
        assert!(result.valid, "{:?}", result.errors);
    }

    #[test]
    fn rejects_non_object() {
        let result = validate(&json!([1, 2, 3]));
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn rejects_bookmark_with_bad_protocol() {
        let doc = json!({
            "bookmarks": [{
                "category": "x",
                "apps": [{"name": "bad", "url": "file:///etc/passwd"}]
            }]
        });
        let result = validate(&doc);
        assert!(!result.valid);
        assert!(result.errors[0].contains("invalid url"));
    }

    #[test]
    fn reports_missing_fields_and_apps_shape() {
        let doc = json!({
            "bookmarks": [
                {"category": "", "apps": "nope"},
                {"category": "ok", "apps": [{"name": "", "url": "https://a.b"}]}
            ]
        });
        let result = validate(&doc);
        assert_eq!(result.errors.len(), 3, "{:?}", result.errors);
    }

    #[test]
    fn rejects_task_without_priority() {
        let doc = json!({"tasks": [{"id": "1", "title": "t"}]});
        let result = validate(&doc);
        assert!(!result.valid);
        assert_eq!(result.errors, vec!["task 0: invalid priority".to_string()]);
    }

    #[test]
    fn rejects_duplicate_task_ids() {
        let doc = json!({"tasks": [
            {"id": "1", "title": "a", "priority": "normal"},
            {"id": "1", "title": "b", "priority": "urgent"}
        ]});
        let result = validate(&doc);
        assert!(!result.valid);
        assert!(result.errors[0].contains("duplicate id"));
    }

    #[test]
    fn notes_must_be_a_bounded_string() {
        assert!(!validate(&json!({"notes": 42})).valid);
        let long = "x".repeat(MAX_NOTES_CHARS + 1);
        assert!(!validate(&json!({ "notes": long })).valid);
        let exact = "x".repeat(MAX_NOTES_CHARS);
        assert!(validate(&json!({ "notes": exact })).valid);
    }

    #[test]
    fn url_allow_list() {
        assert!(is_valid_url("https://example.com/path?q=1"));
        assert!(is_valid_url("http://localhost:8080"));
        assert!(!is_valid_url("javascript:alert(1)"));
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url("example.com"));
        assert!(!is_valid_url(""));
    }

    #[test]
    fn hex_colors() {
        assert!(is_hex_color("#6366f1"));
        assert!(is_hex_color("#ABCDEF"));
        assert!(!is_hex_color("6366f1"));
        assert!(!is_hex_color("#fff"));
        assert!(!is_hex_color("#ggg000"));
        assert_eq!(sanitize_color("red", "#000000"), "#000000");
        assert_eq!(parse_hex_color("#10a37f"), Some((0x10, 0xa3, 0x7f)));
    }
}
