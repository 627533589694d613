//! View rendering interface.
//!
//! Template engines live outside this crate. The dispatcher only needs a way
//! to turn a list of template names plus data into a body, which it uses for
//! the not-found page. `PlainRenderer` is the built-in fallback: a fixed set
//! of short texts with `{{key}}` substitution.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use crate::context::ContextData;

/// Data passed to a view.
pub type RenderData = serde_json::Map<String, Value>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown template: {0}")]
    UnknownTemplate(String),
}

pub trait Renderer: Send + Sync + 'static {
    /// Render the named templates, in order, into one body.
    fn render(&self, names: &[&str], data: &RenderData, context: Option<&ContextData>) -> Result<String, RenderError>;
}

/// Renderer backed by in-memory text templates.
#[derive(Debug, Clone)]
pub struct PlainRenderer {
    templates: HashMap<String, String>,
}

impl PlainRenderer {
    /// Renderer without any template.
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    pub fn with_template(mut self, name: impl Into<String>, body: impl Into<String>) -> Self {
        self.templates.insert(name.into(), body.into());
        self
    }
}

impl Default for PlainRenderer {
    fn default() -> Self {
        Self::empty()
            .with_template("404.tmpl", "Not Found")
            .with_template("500.tmpl", "Internal Server Error")
    }
}

impl Renderer for PlainRenderer {
    fn render(&self, names: &[&str], data: &RenderData, _context: Option<&ContextData>) -> Result<String, RenderError> {
        let mut out = String::new();
        for name in names {
            let template = self
                .templates
                .get(*name)
                .ok_or_else(|| RenderError::UnknownTemplate(name.to_string()))?;
            out.push_str(&substitute(template, data));
        }
        Ok(out)
    }
}

/// Replace `{{key}}` markers with values from `data`. Unknown keys render empty.
fn substitute(template: &str, data: &RenderData) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        match data.get(after[..end].trim()) {
            Some(Value::String(s)) => out.push_str(s),
            Some(Value::Null) | None => {}
            Some(other) => out.push_str(&other.to_string()),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> RenderData {
        match value {
            Value::Object(map) => map,
            _ => RenderData::new(),
        }
    }

    #[test]
    fn test_default_templates() {
        let r = PlainRenderer::default();
        assert_eq!(r.render(&["404.tmpl"], &RenderData::new(), None).unwrap(), "Not Found");
    }

    #[test]
    fn test_unknown_template() {
        let r = PlainRenderer::empty();
        let err = r.render(&["404.tmpl"], &RenderData::new(), None).unwrap_err();
        assert!(matches!(err, RenderError::UnknownTemplate(name) if name == "404.tmpl"));
    }

    #[test]
    fn test_substitution_and_concatenation() {
        let r = PlainRenderer::empty()
            .with_template("head", "[{{ title }}]")
            .with_template("body", "Hello {{name}}, you are {{age}}{{missing}}");
        let out = r
            .render(&["head", "body"], &data(json!({"title": "t", "name": "Ann", "age": 30})), None)
            .unwrap();
        assert_eq!(out, "[t]Hello Ann, you are 30");
    }

    #[test]
    fn test_unterminated_marker_kept() {
        assert_eq!(substitute("a {{b", &RenderData::new()), "a {{b");
    }
}
