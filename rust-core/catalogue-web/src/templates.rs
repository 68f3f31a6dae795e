//! # Templates
//!
//! Handlebars registry for the site's views and partials.
//!
//! Helpers available to every template:
//!
//! - `{{#if (eq a b)}}`: loose equality, `5` equals `"5"`
//! - `{{#if (gt a b)}}`: numeric comparison, string order when both are text
//! - `{{#each (split actors ", ")}}`: split text into a list

use crate::error::{Result, WebError};
use handlebars::{handlebars_helper, Handlebars};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

const TEMPLATE_EXTENSION: &str = "hbs";
const PARTIALS_DIR: &str = "partials";

handlebars_helper!(eq_helper: |a: Json, b: Json| loose_eq(a, b));
handlebars_helper!(gt_helper: |a: Json, b: Json| loose_gt(a, b));
handlebars_helper!(split_helper: |value: Json, separator: str| split_value(value, separator));

/// Template registry
pub struct Templates {
    registry: Handlebars<'static>,
}

impl Default for Templates {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.registry.get_templates().keys().collect();
        names.sort();
        f.debug_struct("Templates").field("templates", &names).finish()
    }
}

impl Templates {
    /// Create an empty registry with the helpers installed
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.register_helper("eq", Box::new(eq_helper));
        registry.register_helper("gt", Box::new(gt_helper));
        registry.register_helper("split", Box::new(split_helper));
        Self { registry }
    }

    /// Load every `*.hbs` in `dir` as a template and every
    /// `dir/partials/*.hbs` as a partial, named by file stem
    ///
    /// # Errors
    ///
    /// Returns `WebError::TemplateDir` if `dir` can't be read and
    /// `WebError::Template` if a file doesn't compile.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut templates = Self::new();

        let partials = dir.join(PARTIALS_DIR);
        if partials.is_dir() {
            for (name, path) in template_files(&partials)? {
                let source = read_source(&path)?;
                templates.register_partial(&name, &source)?;
                debug!(partial = %name, "Registered partial");
            }
        }

        for (name, path) in template_files(dir)? {
            let source = read_source(&path)?;
            templates.register_template(&name, &source)?;
            debug!(template = %name, "Registered template");
        }

        Ok(templates)
    }

    /// Register a template from source
    ///
    /// # Errors
    ///
    /// Returns `WebError::Template` if the source doesn't compile
    pub fn register_template(&mut self, name: &str, source: &str) -> Result<()> {
        self.registry.register_template_string(name, source)?;
        Ok(())
    }

    /// Register a partial from source
    ///
    /// # Errors
    ///
    /// Returns `WebError::Template` if the source doesn't compile
    pub fn register_partial(&mut self, name: &str, source: &str) -> Result<()> {
        self.registry.register_partial(name, source)?;
        Ok(())
    }

    /// Whether a template is registered under `name`
    #[must_use]
    pub fn has_template(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }

    /// Render a template with `data` as the root context
    ///
    /// # Errors
    ///
    /// Returns `WebError::Render` if the template is missing or fails
    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String> {
        Ok(self.registry.render(name, data)?)
    }
}

fn template_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let dir_error = |source| WebError::TemplateDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(dir_error)? {
        let path = entry.map_err(dir_error)?.path();
        let is_template = path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext == TEMPLATE_EXTENSION);
        if !is_template {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.push((stem.to_string(), path.clone()));
        }
    }
    files.sort();
    Ok(files)
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| WebError::TemplateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Numeric reading of a value for loose comparison
///
/// Blank text counts as zero and booleans as 0/1.
fn loose_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse().ok()
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(x), Value::String(y)) => x == y,
        _ => match (loose_number(a), loose_number(b)) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
    }
}

fn loose_gt(a: &Value, b: &Value) -> bool {
    if let (Value::String(x), Value::String(y)) = (a, b) {
        return x > y;
    }
    match (loose_number(a), loose_number(b)) {
        (Some(x), Some(y)) => x > y,
        _ => false,
    }
}

fn split_value(value: &Value, separator: &str) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) if s.is_empty() => Vec::new(),
        Value::String(s) if separator.is_empty() => vec![s.clone()],
        Value::String(s) => s.split(separator).map(str::to_string).collect(),
        other => vec![other.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scratch_views(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("catalogue-views-{name}-{}", std::process::id()));
        std::fs::create_dir_all(dir.join(PARTIALS_DIR)).unwrap();
        dir
    }

    #[test]
    fn test_loose_eq() {
        assert!(loose_eq(&json!(5), &json!("5")));
        assert!(loose_eq(&json!(1.0), &json!(1)));
        assert!(loose_eq(&json!(true), &json!(1)));
        assert!(loose_eq(&json!(null), &json!(null)));
        assert!(!loose_eq(&json!(null), &json!(0)));
        assert!(!loose_eq(&json!("NaN"), &json!("nan")));
        assert!(!loose_eq(&json!("NaN"), &json!(0)));
        assert!(loose_eq(&json!("PG"), &json!("PG")));
    }

    #[test]
    fn test_loose_gt() {
        assert!(loose_gt(&json!(10), &json!(9)));
        assert!(loose_gt(&json!("10"), &json!(9)));
        assert!(!loose_gt(&json!("10"), &json!("9")));
        assert!(!loose_gt(&json!(null), &json!(0)));
        assert!(!loose_gt(&json!("NaN"), &json!(0)));
    }

    #[test]
    fn test_split_value() {
        assert_eq!(
            split_value(&json!("PENELOPE GUINESS, NICK WAHLBERG"), ", "),
            vec!["PENELOPE GUINESS", "NICK WAHLBERG"]
        );
        assert!(split_value(&json!(null), ", ").is_empty());
        assert!(split_value(&json!(""), "|").is_empty());
        assert_eq!(split_value(&json!(7), ","), vec!["7"]);
    }

    #[test]
    fn test_helpers_in_templates() {
        let mut templates = Templates::new();
        templates
            .register_template(
                "t",
                "{{#if (eq id \"1\")}}first{{/if}}|{{#if (gt length 100)}}long{{/if}}|{{#each (split actors \", \")}}[{{this}}]{{/each}}",
            )
            .unwrap();
        let html = templates
            .render(
                "t",
                &json!({"id": 1, "length": 120, "actors": "A B, C D"}),
            )
            .unwrap();
        assert_eq!(html, "first|long|[A B][C D]");
    }

    #[test]
    fn test_html_is_escaped() {
        let mut templates = Templates::new();
        templates.register_template("t", "{{title}}").unwrap();
        let html = templates
            .render("t", &json!({"title": "<b>ACE</b>"}))
            .unwrap();
        assert_eq!(html, "&lt;b&gt;ACE&lt;/b&gt;");
    }

    #[test]
    fn test_from_dir_loads_templates_and_partials() {
        let dir = scratch_views("load");
        std::fs::write(dir.join("index.hbs"), "{{> nav}}<h1>{{common.title}}</h1>").unwrap();
        std::fs::write(dir.join(PARTIALS_DIR).join("nav.hbs"), "<nav></nav>").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let templates = Templates::from_dir(&dir).unwrap();
        assert!(templates.has_template("index"));
        assert!(!templates.has_template("notes"));

        let html = templates
            .render("index", &json!({"common": {"title": "Sakila"}}))
            .unwrap();
        assert_eq!(html, "<nav></nav><h1>Sakila</h1>");

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_from_dir_missing() {
        let err = Templates::from_dir("/nonexistent/views").unwrap_err();
        assert!(matches!(err, WebError::TemplateDir { .. }));
    }

    #[test]
    fn test_render_unknown_template() {
        let templates = Templates::new();
        let err = templates.render("missing", &json!({})).unwrap_err();
        assert!(matches!(err, WebError::Render(_)));
    }
}
