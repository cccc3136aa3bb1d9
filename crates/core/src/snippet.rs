//! Integration snippet shown for an event.

use crate::placeholder::Placeholder;

/// Value used in the snippet for placeholders without a default.
const SAMPLE_VALUE: &str = "value";

/// Example recipient used in the snippet.
const SAMPLE_RECIPIENT: &str = "user@example.com";

/// Build a curl command that triggers `event_slug` with an API key.
///
/// `api_base` is the public API root (for example `http://localhost:8000/api`).
/// Each placeholder of the bound template appears in `data`, using its default
/// value or a sample value when the default is empty.
#[must_use]
pub fn trigger_snippet(api_base: &str, event_slug: &str, placeholders: &[Placeholder]) -> String {
    let data = placeholders
        .iter()
        .map(|p| {
            let value = if p.default_value.is_empty() {
                SAMPLE_VALUE
            } else {
                p.default_value.as_str()
            };
            format!("\n      \"{}\": \"{}\"", escape(&p.name), escape(value))
        })
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "curl -X POST {base}/events/trigger/ \\\n  \
         -H \"X-API-Key: YOUR_API_KEY\" \\\n  \
         -H \"Content-Type: application/json\" \\\n  \
         -d '{{\n    \
         \"event\": \"{slug}\",\n    \
         \"recipient\": \"{SAMPLE_RECIPIENT}\",\n    \
         \"data\": {{{data}\n    }}\n  }}'",
        base = api_base.trim_end_matches('/'),
        slug = escape(event_slug),
    )
}

/// Escape a value for a JSON string inside a single-quoted shell argument.
fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\'', "'\\''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_without_placeholders() {
        let snippet = trigger_snippet("http://localhost:8000/api/", "signup", &[]);
        assert_eq!(
            snippet,
            "curl -X POST http://localhost:8000/api/events/trigger/ \\\n  \
             -H \"X-API-Key: YOUR_API_KEY\" \\\n  \
             -H \"Content-Type: application/json\" \\\n  \
             -d '{\n    \"event\": \"signup\",\n    \"recipient\": \"user@example.com\",\n    \"data\": {\n    }\n  }'"
        );
    }

    #[test]
    fn test_snippet_uses_defaults_or_sample_value() {
        let snippet = trigger_snippet(
            "https://api.xyno.io/api",
            "order-shipped",
            &[
                Placeholder {
                    name: "name".to_string(),
                    default_value: "Ada".to_string(),
                },
                Placeholder::new("tracking"),
            ],
        );
        assert!(snippet.contains("\"event\": \"order-shipped\""));
        assert!(snippet.contains("\n      \"name\": \"Ada\",\n      \"tracking\": \"value\""));
    }

    #[test]
    fn test_snippet_escapes_quotes() {
        let snippet = trigger_snippet(
            "http://x/api",
            "e",
            &[Placeholder {
                name: "q".to_string(),
                default_value: "it's \"quoted\"".to_string(),
            }],
        );
        assert!(snippet.contains(r#""q": "it'\''s \"quoted\"""#));
    }
}
