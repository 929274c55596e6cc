//! Placeholder interpolation against the run context
//!
//! Syntax: `{{ path }}` inserts the value at `path` (dot-separated keys,
//! numeric segments index arrays); `{{ json path }}` inserts its JSON
//! serialization. Rendering fails closed: a placeholder that cannot be
//! resolved is an error, never an empty string.

use serde_json::Value;
use thiserror::Error;

use crate::workflow::types::Context;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("placeholder '{0}' does not resolve against the context")]
    Unresolved(String),
    #[error("unterminated placeholder starting at byte {0}")]
    Unterminated(usize),
    #[error("empty placeholder at byte {0}")]
    EmptyPlaceholder(usize),
    #[error("unknown template helper '{0}'")]
    UnknownHelper(String),
}

/// Render `template` against `context`
pub fn render(template: &str, context: &Context) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];
        let end = after_open
            .find(CLOSE)
            .ok_or(TemplateError::Unterminated(offset + start))?;

        let expr = after_open[..end].trim();
        if expr.is_empty() {
            return Err(TemplateError::EmptyPlaceholder(offset + start));
        }
        out.push_str(&evaluate(expr, context)?);

        let consumed = start + OPEN.len() + end + CLOSE.len();
        offset += consumed;
        rest = &rest[consumed..];
    }

    out.push_str(rest);
    Ok(out)
}

fn evaluate(expr: &str, context: &Context) -> Result<String, TemplateError> {
    let mut parts = expr.split_whitespace();
    let (helper, path) = match (parts.next(), parts.next(), parts.next()) {
        (Some(path), None, _) => (None, path),
        (Some(helper), Some(path), None) => (Some(helper), path),
        _ => return Err(TemplateError::Unresolved(expr.to_string())),
    };

    let value = lookup(context, path).ok_or_else(|| TemplateError::Unresolved(expr.to_string()))?;

    match helper {
        None => Ok(display(value)),
        Some("json") => Ok(value.to_string()),
        Some(other) => Err(TemplateError::UnknownHelper(other.to_string())),
    }
}

/// Resolve a dot path such as `user.addresses.0.city`
pub fn lookup<'a>(context: &'a Context, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = context.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> Context {
        json!({
            "userId": 7,
            "user": { "name": "Ada", "tags": ["admin", "ops"], "manager": null },
            "todo": { "id": 3, "done": false }
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn interpolates_paths_and_array_indices() {
        let rendered = render(
            "https://api.test/users/{{userId}}/{{ user.tags.1 }}?name={{user.name}}",
            &context(),
        )
        .unwrap();
        assert_eq!(rendered, "https://api.test/users/7/ops?name=Ada");
    }

    #[test]
    fn json_helper_embeds_structured_values() {
        let rendered = render(r#"{"todo": {{json todo}}, "who": {{json user.name}}}"#, &context())
            .unwrap();
        let parsed: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed, json!({ "todo": { "id": 3, "done": false }, "who": "Ada" }));
    }

    #[test]
    fn null_renders_empty_but_is_resolved() {
        assert_eq!(render("[{{user.manager}}]", &context()).unwrap(), "[]");
        assert_eq!(render("{{json user.manager}}", &context()).unwrap(), "null");
    }

    #[test]
    fn text_without_placeholders_passes_through() {
        assert_eq!(render("plain } { text", &Context::new()).unwrap(), "plain } { text");
    }

    #[test]
    fn fails_closed() {
        let ctx = context();
        assert_eq!(
            render("{{missing}}", &ctx),
            Err(TemplateError::Unresolved("missing".into()))
        );
        assert_eq!(
            render("{{user.tags.9}}", &ctx),
            Err(TemplateError::Unresolved("user.tags.9".into()))
        );
        assert_eq!(render("ab{{userId", &ctx), Err(TemplateError::Unterminated(2)));
        assert_eq!(render("{{  }}", &ctx), Err(TemplateError::EmptyPlaceholder(0)));
        assert_eq!(
            render("{{upper user.name}}", &ctx),
            Err(TemplateError::UnknownHelper("upper".into()))
        );
    }

    #[test]
    fn error_message_shows_placeholder() {
        assert_eq!(
            TemplateError::Unresolved("a.b".into()).to_string(),
            "placeholder 'a.b' does not resolve against the context"
        );
    }
}
