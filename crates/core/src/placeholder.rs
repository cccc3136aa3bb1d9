//! Template placeholders.
//!
//! Placeholders are `{{name}}` markers in a template's subject or HTML that
//! are substituted at send time. Each carries a default value used when the
//! trigger payload omits it. Names are restricted to `[a-z0-9_]`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A placeholder and its default value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placeholder {
    pub name: String,
    #[serde(default)]
    pub default_value: String,
}

impl Placeholder {
    /// Create a placeholder with an empty default.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_value: String::new(),
        }
    }
}

/// Errors raised while editing a placeholder list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaceholderError {
    #[error("Placeholder name cannot be empty")]
    Empty,
    #[error("Placeholder \"{0}\" already exists")]
    Duplicate(String),
}

/// Normalize user input into a placeholder name.
///
/// Trims, lowercases and replaces every character outside `[a-z0-9_]` with
/// an underscore.
///
/// # Errors
///
/// Returns [`PlaceholderError::Empty`] when nothing remains after trimming.
pub fn normalize_placeholder_name(raw: &str) -> Result<String, PlaceholderError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PlaceholderError::Empty);
    }

    Ok(trimmed
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect())
}

/// Ordered placeholder list with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceholderSet(Vec<Placeholder>);

impl PlaceholderSet {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a placeholder from raw user input.
    ///
    /// Returns the normalized name that was added.
    ///
    /// # Errors
    ///
    /// Returns an error if the normalized name is empty or already present.
    pub fn add(&mut self, raw_name: &str) -> Result<String, PlaceholderError> {
        let name = normalize_placeholder_name(raw_name)?;
        if self.contains(&name) {
            return Err(PlaceholderError::Duplicate(name));
        }
        self.0.push(Placeholder::new(name.clone()));
        Ok(name)
    }

    /// Remove a placeholder by exact name. Returns whether one was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|p| p.name != name);
        self.0.len() != before
    }

    /// Set the default value of an existing placeholder.
    pub fn set_default(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self.0.iter_mut().find(|p| p.name == name) {
            Some(placeholder) => {
                placeholder.default_value = value.into();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|p| p.name == name)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Placeholder] {
        &self.0
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Placeholder> {
        self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Placeholder>> for PlaceholderSet {
    /// Later duplicates are dropped.
    fn from(placeholders: Vec<Placeholder>) -> Self {
        let mut set = Self::new();
        for placeholder in placeholders {
            if !set.contains(&placeholder.name) {
                set.0.push(placeholder);
            }
        }
        set
    }
}

/// Prefilled data for a test send: every placeholder mapped to its default.
#[must_use]
pub fn placeholder_defaults(placeholders: &[Placeholder]) -> BTreeMap<String, String> {
    placeholders
        .iter()
        .map(|p| (p.name.clone(), p.default_value.clone()))
        .collect()
}

/// Names of all `{{name}}` markers in `text`, sorted and deduplicated.
///
/// A name is one or more word characters with no surrounding whitespace.
#[must_use]
pub fn detect_placeholders(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };
        let candidate = &after[..end];
        if !candidate.is_empty() && candidate.chars().all(|c| c.is_alphanumeric() || c == '_') {
            names.push(candidate.to_string());
            rest = &after[end + 2..];
        } else {
            rest = &rest[start + 1..];
        }
    }

    names.sort();
    names.dedup();
    names
}

/// Substitute `{{name}}` markers with values from `context`.
///
/// Markers without a value in `context` are left untouched.
#[must_use]
pub fn render_placeholders(text: &str, context: &BTreeMap<String, String>) -> String {
    context.iter().fold(text.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{{{key}}}}}"), value)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_placeholder_name() {
        assert_eq!(normalize_placeholder_name("  User Name ").unwrap(), "user_name");
        assert_eq!(normalize_placeholder_name("order-id#2").unwrap(), "order_id_2");
        assert_eq!(normalize_placeholder_name("first_name").unwrap(), "first_name");
        assert_eq!(normalize_placeholder_name("   "), Err(PlaceholderError::Empty));
    }

    #[test]
    fn test_add_rejects_duplicates_after_normalization() {
        let mut set = PlaceholderSet::new();
        assert_eq!(set.add("User Name").unwrap(), "user_name");

        let err = set.add("user name").unwrap_err();
        assert_eq!(err.to_string(), "Placeholder \"user_name\" already exists");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_remove_and_set_default() {
        let mut set = PlaceholderSet::from(vec![Placeholder::new("a"), Placeholder::new("b")]);
        assert!(set.set_default("b", "bee"));
        assert!(!set.set_default("c", "sea"));
        assert!(set.remove("a"));
        assert!(!set.remove("a"));

        assert_eq!(
            set.into_vec(),
            vec![Placeholder {
                name: "b".to_string(),
                default_value: "bee".to_string()
            }]
        );
    }

    #[test]
    fn test_from_vec_drops_duplicates() {
        let set = PlaceholderSet::from(vec![
            Placeholder::new("x"),
            Placeholder::new("x"),
            Placeholder::new("y"),
        ]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_placeholder_defaults() {
        let defaults = placeholder_defaults(&[
            Placeholder {
                name: "name".to_string(),
                default_value: "there".to_string(),
            },
            Placeholder::new("code"),
        ]);
        assert_eq!(defaults.get("name").unwrap(), "there");
        assert_eq!(defaults.get("code").unwrap(), "");
    }

    #[test]
    fn test_detect_placeholders() {
        let found = detect_placeholders(
            "Hi {{name}}, your code is {{ code }} {{code}} {{name}} {{{{bad}}",
        );
        assert_eq!(found, vec!["bad".to_string(), "code".to_string(), "name".to_string()]);
        assert!(detect_placeholders("no markers {{ here").is_empty());
    }

    #[test]
    fn test_render_placeholders() {
        let mut context = BTreeMap::new();
        context.insert("name".to_string(), "Ada".to_string());
        assert_eq!(
            render_placeholders("Hi {{name}}, {{missing}}", &context),
            "Hi Ada, {{missing}}"
        );
    }
}
