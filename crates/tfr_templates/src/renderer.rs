//! `{{variable}}` template rendering.

use std::collections::HashMap;

use regex::{Captures, Regex};

use crate::error::{TemplateError, TemplateResult};

/// Renders templates by substituting `{{name}}` placeholders.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    variable_pattern: Regex,
}

impl TemplateRenderer {
    /// Create a new template renderer.
    pub fn new() -> TemplateResult<Self> {
        Ok(Self {
            // Match {{variable_name}} pattern
            variable_pattern: Regex::new(r"\{\{([a-zA-Z_][a-zA-Z0-9_]*)\}\}")?,
        })
    }

    /// Render content by replacing variables.
    ///
    /// Placeholders without a value are left in place.
    pub fn render_content(&self, content: &str, variables: &HashMap<String, String>) -> String {
        self.variable_pattern
            .replace_all(content, |caps: &Captures| {
                let var_name = &caps[1];
                variables
                    .get(var_name)
                    .cloned()
                    .unwrap_or_else(|| format!("{{{{{}}}}}", var_name))
            })
            .to_string()
    }

    /// Render content, failing on the first placeholder without a value.
    pub fn render_strict(
        &self,
        content: &str,
        variables: &HashMap<String, String>,
    ) -> TemplateResult<String> {
        if let Some(missing) = self
            .variables_in(content)
            .into_iter()
            .find(|name| !variables.contains_key(name))
        {
            return Err(TemplateError::MissingVariable(missing));
        }
        Ok(self.render_content(content, variables))
    }

    /// Names of all placeholders in `content`, in order of appearance.
    pub fn variables_in(&self, content: &str) -> Vec<String> {
        self.variable_pattern
            .captures_iter(content)
            .map(|caps| caps[1].to_string())
            .collect()
    }
}

/// Escape a value for use inside a double-quoted HCL string.
///
/// Template sequences (`${`, `%{`) are escaped too so values are taken
/// literally.
pub fn escape_hcl(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                escaped.push(c);
                escaped.push(c);
            }
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_content() {
        let renderer = TemplateRenderer::new().unwrap();
        let vars = vars(&[("name", "network"), ("ref", "a1b2c3")]);

        let rendered = renderer.render_content("Repo: {{name}} at {{ref}}", &vars);
        assert_eq!(rendered, "Repo: network at a1b2c3");
    }

    #[test]
    fn test_unknown_placeholder_is_kept() {
        let renderer = TemplateRenderer::new().unwrap();
        let rendered = renderer.render_content("{{name}} {{other}}", &vars(&[("name", "x")]));
        assert_eq!(rendered, "x {{other}}");
    }

    #[test]
    fn test_render_strict_reports_missing() {
        let renderer = TemplateRenderer::new().unwrap();
        let result = renderer.render_strict("{{bucket}}", &HashMap::new());
        assert!(matches!(result, Err(TemplateError::MissingVariable(v)) if v == "bucket"));
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let renderer = TemplateRenderer::new().unwrap();
        let rendered = renderer.render_content("{{a}}", &vars(&[("a", "{{b}}"), ("b", "no")]));
        assert_eq!(rendered, "{{b}}");
    }

    #[test]
    fn test_escape_hcl() {
        assert_eq!(escape_hcl(r#"plain"#), "plain");
        assert_eq!(escape_hcl(r#"a"b\c"#), r#"a\"b\\c"#);
        assert_eq!(escape_hcl("line\nbreak"), "line\\nbreak");
        assert_eq!(escape_hcl("${var.x} %{if}"), "$${var.x} %%{if}");
        assert_eq!(escape_hcl("cost $5 100%"), "cost $5 100%");
    }
}
