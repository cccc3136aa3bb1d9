//! Template builder helpers.
//!
//! A template stores two representations of its body: `html_content`, the
//! document actually sent, and `design_json`, the editor's own project data
//! used to reopen the template for editing. Three kinds of stored design
//! exist:
//!
//! - native project data written by the current editor
//! - legacy designs from the previous editor, which cannot be loaded natively
//!   and are reopened from their HTML instead
//! - no design at all, for templates created by uploading raw HTML
//!
//! The visual editor itself is an external collaborator. It is modelled by
//! the [`DesignEditor`] trait; [`HtmlDocumentEditor`] is the plain HTML/CSS
//! implementation used by the dashboard.

use serde_json::Value;

use crate::models::TemplateInput;

/// Validation errors raised before a builder save reaches the API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DesignError {
    #[error("Template name is required")]
    MissingName,
    #[error("Subject line is required")]
    MissingSubject,
}

/// Whether `design` is in the previous editor's format.
///
/// Recognised by truthy `body` and `counters` fields. This is a heuristic:
/// any native project that happens to carry both fields is misclassified.
#[must_use]
pub fn is_legacy_design(design: &Value) -> bool {
    is_truthy(design.get("body")) && is_truthy(design.get("counters"))
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

/// How a stored template should be opened in the builder.
#[derive(Debug, Clone, PartialEq)]
pub enum DesignSource {
    /// Current editor project data, loaded as-is. The HTML is kept for
    /// editors that cannot interpret the project.
    Native { project: Value, html: String },
    /// Previous editor format, reopened from its HTML.
    Legacy { html: String },
    /// Uploaded HTML with no design.
    ImportedHtml { html: String },
    /// New template.
    Blank,
}

impl DesignSource {
    /// Classify a stored template's design.
    #[must_use]
    pub fn classify(design_json: Option<&Value>, html_content: &str) -> Self {
        match design_json {
            Some(Value::Null) | None if html_content.is_empty() => Self::Blank,
            Some(Value::Null) | None => Self::ImportedHtml {
                html: html_content.to_string(),
            },
            Some(design) if is_legacy_design(design) => Self::Legacy {
                html: html_content.to_string(),
            },
            Some(design) => Self::Native {
                project: design.clone(),
                html: html_content.to_string(),
            },
        }
    }

    /// Whether the builder should show the "imported HTML" notice.
    #[must_use]
    pub const fn is_imported(&self) -> bool {
        matches!(self, Self::Legacy { .. } | Self::ImportedHtml { .. })
    }
}

/// Editor output captured at save time.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedDesign {
    pub html: String,
    pub css: String,
    pub project_data: Value,
}

/// Capability surface of the visual editor.
pub trait DesignEditor {
    /// Replace the editor contents with a stored design.
    fn load_document(&mut self, source: &DesignSource);

    /// Body HTML as currently edited.
    fn html(&self) -> String;

    /// Stylesheet as currently edited.
    fn css(&self) -> String;

    /// Project data to persist as `design_json`.
    fn project_data(&self) -> Value;

    /// Append an HTML fragment (for example a brand component).
    fn insert_fragment(&mut self, html: &str);

    fn serialize(&self) -> SerializedDesign {
        SerializedDesign {
            html: self.html(),
            css: self.css(),
            project_data: self.project_data(),
        }
    }
}

/// Project-data marker written by [`HtmlDocumentEditor`].
pub const HTML_EDITOR_FORMAT: &str = "xyno-html";

/// Plain HTML/CSS document editor.
///
/// Project data is `{"editor": "xyno-html", "html": ..., "css": ...}`.
/// Native projects in any other format are reopened from their HTML.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlDocumentEditor {
    html: String,
    css: String,
}

impl HtmlDocumentEditor {
    #[must_use]
    pub fn new(html: impl Into<String>, css: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            css: css.into(),
        }
    }

    /// Open a stored template.
    #[must_use]
    pub fn open(design_json: Option<&Value>, html_content: &str) -> Self {
        let mut editor = Self::default();
        editor.load_document(&DesignSource::classify(design_json, html_content));
        editor
    }
}

impl DesignEditor for HtmlDocumentEditor {
    fn load_document(&mut self, source: &DesignSource) {
        match source {
            DesignSource::Native { project, html } => {
                let is_own = project.get("editor").and_then(Value::as_str) == Some(HTML_EDITOR_FORMAT);
                if is_own {
                    self.html = project
                        .get("html")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    self.css = project
                        .get("css")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                } else {
                    self.html.clone_from(html);
                    self.css.clear();
                }
            }
            DesignSource::Legacy { html } | DesignSource::ImportedHtml { html } => {
                self.html.clone_from(html);
                self.css.clear();
            }
            DesignSource::Blank => {
                self.html.clear();
                self.css.clear();
            }
        }
    }

    fn html(&self) -> String {
        self.html.clone()
    }

    fn css(&self) -> String {
        self.css.clone()
    }

    fn project_data(&self) -> Value {
        serde_json::json!({
            "editor": HTML_EDITOR_FORMAT,
            "html": self.html,
            "css": self.css,
        })
    }

    fn insert_fragment(&mut self, html: &str) {
        if let Some(pos) = self.html.rfind("</body>") {
            self.html.insert_str(pos, html);
        } else {
            self.html.push_str(html);
        }
    }
}

/// Build the complete HTML document saved with a template.
///
/// Content that is already a document (contains `<body` or `<html`) gets the
/// stylesheet injected before `</head>`, or a new head inserted before
/// `<body`. Anything else is wrapped in a fresh document.
#[must_use]
pub fn assemble_document(html: &str, css: &str) -> String {
    let style = format!("<style>{css}</style>");
    let is_document = html.contains("<body") || html.contains("<html");

    if is_document && html.contains("</head>") {
        html.replacen("</head>", &format!("{style}</head>"), 1)
    } else if is_document && html.contains("<body") {
        html.replacen("<body", &format!("<head>{style}</head><body"), 1)
    } else {
        format!("<!DOCTYPE html><html><head>{style}</head><body>{html}</body></html>")
    }
}

/// Template metadata plus editor output, ready to be validated and saved.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDraft {
    pub name: String,
    pub subject: String,
    pub design: SerializedDesign,
}

impl TemplateDraft {
    /// # Errors
    ///
    /// Returns an error if the name or subject is blank.
    pub fn validate(&self) -> Result<(), DesignError> {
        if self.name.trim().is_empty() {
            return Err(DesignError::MissingName);
        }
        if self.subject.trim().is_empty() {
            return Err(DesignError::MissingSubject);
        }
        Ok(())
    }

    /// Validate and build the create/update payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or subject is blank.
    pub fn into_input(self) -> Result<TemplateInput, DesignError> {
        self.validate()?;
        Ok(TemplateInput {
            name: self.name,
            subject: self.subject,
            html_content: assemble_document(&self.design.html, &self.design.css),
            design_json: Some(self.design.project_data),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_legacy_design() {
        assert!(is_legacy_design(&json!({"body": {"rows": []}, "counters": {"u_row": 1}})));
        assert!(!is_legacy_design(&json!({"body": {"rows": []}})));
        assert!(!is_legacy_design(&json!({"body": null, "counters": {}})));
        assert!(!is_legacy_design(&json!({"body": {}, "counters": 0})));
        assert!(!is_legacy_design(&json!({"pages": [], "styles": []})));
    }

    #[test]
    fn test_classify() {
        let legacy = json!({"body": {"rows": []}, "counters": {"u_row": 1}});
        let native = json!({"pages": [{"frames": []}]});

        assert_eq!(DesignSource::classify(None, ""), DesignSource::Blank);
        assert_eq!(
            DesignSource::classify(None, "<p>hi</p>"),
            DesignSource::ImportedHtml {
                html: "<p>hi</p>".to_string()
            }
        );
        assert!(DesignSource::classify(Some(&legacy), "<p>old</p>").is_imported());
        assert!(matches!(
            DesignSource::classify(Some(&native), "<p>new</p>"),
            DesignSource::Native { .. }
        ));
        assert!(!DesignSource::classify(Some(&native), "").is_imported());
    }

    #[test]
    fn test_assemble_wraps_fragment() {
        assert_eq!(
            assemble_document("<p>Hi</p>", "p{color:red}"),
            "<!DOCTYPE html><html><head><style>p{color:red}</style></head><body><p>Hi</p></body></html>"
        );
    }

    #[test]
    fn test_assemble_injects_into_existing_head() {
        let html = "<html><head><title>t</title></head><body>x</body></html>";
        assert_eq!(
            assemble_document(html, "a{}"),
            "<html><head><title>t</title><style>a{}</style></head><body>x</body></html>"
        );
    }

    #[test]
    fn test_assemble_inserts_head_before_body() {
        assert_eq!(
            assemble_document("<body>x</body>", "b{}"),
            "<head><style>b{}</style></head><body>x</body>"
        );
    }

    #[test]
    fn test_assemble_html_without_head_or_body() {
        assert_eq!(
            assemble_document("<html>x</html>", ""),
            "<!DOCTYPE html><html><head><style></style></head><body><html>x</html></body></html>"
        );
    }

    #[test]
    fn test_editor_round_trips_own_project() {
        let mut editor = HtmlDocumentEditor::new("<h1>Hello</h1>", "h1{margin:0}");
        editor.insert_fragment("<footer>brand</footer>");
        let saved = editor.serialize();

        let reopened = HtmlDocumentEditor::open(Some(&saved.project_data), "<ignored/>");
        assert_eq!(reopened.html(), "<h1>Hello</h1><footer>brand</footer>");
        assert_eq!(reopened.css(), "h1{margin:0}");
    }

    #[test]
    fn test_editor_opens_foreign_projects_from_html() {
        let legacy = json!({"body": {"rows": []}, "counters": {"u_row": 1}});
        let editor = HtmlDocumentEditor::open(Some(&legacy), "<p>legacy</p>");
        assert_eq!(editor.html(), "<p>legacy</p>");
        assert!(editor.css().is_empty());
    }

    #[test]
    fn test_insert_fragment_inside_body() {
        let mut editor = HtmlDocumentEditor::new("<html><body><p>a</p></body></html>", "");
        editor.insert_fragment("<p>b</p>");
        assert_eq!(editor.html(), "<html><body><p>a</p><p>b</p></body></html>");
    }

    #[test]
    fn test_draft_validation() {
        let design = HtmlDocumentEditor::default().serialize();
        let draft = TemplateDraft {
            name: "  ".to_string(),
            subject: "Hi".to_string(),
            design: design.clone(),
        };
        assert_eq!(draft.validate(), Err(DesignError::MissingName));

        let draft = TemplateDraft {
            name: "Welcome".to_string(),
            subject: String::new(),
            design: design.clone(),
        };
        assert_eq!(draft.into_input(), Err(DesignError::MissingSubject));

        let input = TemplateDraft {
            name: "Welcome".to_string(),
            subject: "Hi {{name}}".to_string(),
            design,
        }
        .into_input()
        .unwrap();
        assert!(input.html_content.starts_with("<!DOCTYPE html>"));
        assert_eq!(input.design_json.unwrap()["editor"], HTML_EDITOR_FORMAT);
    }
}
