//! Template rendering for résumés.
//!
//! LaTeX sources collide with the default Jinja delimiters, so
//! [`LatexRenderer`] uses word delimiters instead:
//!
//! | Construct | Syntax |
//! |-----------|--------|
//! | statement | `block{ for job in experiences }endblock` |
//! | variable  | `var{ applicant_name }endvar` |
//! | comment   | `comment{ ... }endcomment` |
//! | line statement | `\%- if summary` |
//! | line comment | `\%# note` |

use std::fmt;

use minijinja::syntax::SyntaxConfig;
use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde_json::Value;

#[derive(Debug)]
pub struct RenderError(minijinja::Error);

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "template error: {}", self.0)
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<minijinja::Error> for RenderError {
    fn from(err: minijinja::Error) -> Self {
        RenderError(err)
    }
}

/// Fills a template string from a context value.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, context: &Value) -> Result<String, RenderError>;
}

/// Jinja rendering for LaTeX sources.
///
/// Blocks are trimmed, nothing is HTML escaped, and every string in the
/// context is LaTeX escaped before rendering.
pub struct LatexRenderer {
    env: Environment<'static>,
}

impl LatexRenderer {
    pub fn new() -> Result<Self, RenderError> {
        let syntax = SyntaxConfig::builder()
            .block_delimiters("block{", "}endblock")
            .variable_delimiters("var{", "}endvar")
            .comment_delimiters("comment{", "}endcomment")
            .line_statement_prefix("\\%-")
            .line_comment_prefix("\\%#")
            .build()?;
        let mut env = Environment::new();
        env.set_syntax(syntax);
        env.set_trim_blocks(true);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        Ok(Self { env })
    }
}

impl TemplateRenderer for LatexRenderer {
    fn render(&self, template: &str, context: &Value) -> Result<String, RenderError> {
        let context = escape_context(context);
        Ok(self.env.render_str(template, context)?)
    }
}

/// Escape the characters LaTeX treats specially.
pub fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            '%' | '&' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// Copy of `context` with every string escaped, however deeply nested.
/// Object keys are left alone.
pub fn escape_context(context: &Value) -> Value {
    match context {
        Value::String(s) => Value::String(escape_latex(s)),
        Value::Array(items) => Value::Array(items.iter().map(escape_context).collect()),
        Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), escape_context(v))).collect()),
        other => other.clone(),
    }
}
