//! Claim Template Engine: expands `{{ dotted.path }}` placeholders against a
//! [`TemplateContext`] and parses the result as a JSON object.

mod context;

pub use context::{TemplateContext, TemplateValue};

use serde_json::Value;

/// Failure while resolving a placeholder or parsing the rendered text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// `identity.entity.*` was referenced but no entity is present in the
    /// context. The orchestrator treats this specially — it becomes
    /// `invalid-subject-token` with reason "no entity" rather than
    /// `template-invalid`.
    #[error("identity.entity.* referenced but no entity is present")]
    EntityRequired,

    /// An unrecognized path under `identity.entity.*`.
    #[error("unknown entity path: {0}")]
    UnknownEntityPath(String),

    /// A placeholder root that matches none of the recognized namespaces.
    #[error("unrecognized placeholder: {0}")]
    UnknownPath(String),

    /// A `time.now.plus/minus.<duration>` suffix that doesn't parse.
    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    /// An unterminated `{{` with no matching `}}`.
    #[error("unterminated placeholder")]
    UnterminatedPlaceholder,

    /// The fully rendered text did not parse as a JSON object.
    #[error("rendered template is not a JSON object: {0}")]
    NotJsonObject(String),
}

/// Render `template` against `ctx`, returning the parsed JSON object.
///
/// # Errors
///
/// See [`TemplateError`].
pub fn render(template: &str, ctx: &TemplateContext<'_>) -> Result<Value, TemplateError> {
    let rendered = expand(template, ctx)?;
    let value: Value = serde_json::from_str(&rendered)
        .map_err(|e| TemplateError::NotJsonObject(e.to_string()))?;
    if !value.is_object() {
        return Err(TemplateError::NotJsonObject(
            "rendered value is not a JSON object".to_string(),
        ));
    }
    Ok(value)
}

fn expand(template: &str, ctx: &TemplateContext<'_>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let end = after_open
            .find("}}")
            .ok_or(TemplateError::UnterminatedPlaceholder)?;
        let path = after_open[..end].trim();
        let value = resolve(ctx, path)?;
        out.push_str(&render_piece(&value));
        rest = &after_open[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Render a single resolved value for splicing into the template text.
///
/// Templates supply their own literal quotes around string placeholders
/// (as in `"sub":"{{identity.entity.name}}"`), so a string renders as its
/// JSON-escaped *content* only, without the outer quote characters — the
/// template's own quotes provide those. Numbers and booleans render
/// unquoted; arrays and objects render as complete, verbatim JSON, which is
/// why a template never puts literal quotes around those placeholders.
fn render_piece(value: &TemplateValue) -> String {
    match value {
        TemplateValue::Null => "null".to_string(),
        TemplateValue::Bool(b) => b.to_string(),
        TemplateValue::Number(n) => n.to_string(),
        TemplateValue::String(s) => {
            let quoted = serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string());
            quoted
                .strip_prefix('"')
                .and_then(|q| q.strip_suffix('"'))
                .unwrap_or(&quoted)
                .to_string()
        }
        TemplateValue::Array(_) | TemplateValue::Object(_) => {
            serde_json::to_string(&value.to_json()).unwrap_or_else(|_| "null".to_string())
        }
    }
}

fn resolve(ctx: &TemplateContext<'_>, path: &str) -> Result<TemplateValue, TemplateError> {
    let segments: Vec<&str> = path.split('.').collect();
    match segments.as_slice() {
        ["identity", "entity", rest @ ..] => resolve_entity_path(ctx, rest),
        ["identity", "subject", rest @ ..] => Ok(resolve_subject_path(ctx, rest)),
        ["time", "now"] => Ok(TemplateValue::Number(ctx.now_unix.into())),
        ["time", "now", "plus", duration] => {
            Ok(TemplateValue::Number((ctx.now_unix + parse_duration(duration)?).into()))
        }
        ["time", "now", "minus", duration] => {
            Ok(TemplateValue::Number((ctx.now_unix - parse_duration(duration)?).into()))
        }
        _ => Err(TemplateError::UnknownPath(path.to_string())),
    }
}

fn resolve_entity_path(
    ctx: &TemplateContext<'_>,
    segments: &[&str],
) -> Result<TemplateValue, TemplateError> {
    let entity = ctx.entity.ok_or(TemplateError::EntityRequired)?;
    match segments {
        ["id"] => Ok(TemplateValue::String(entity.id.clone())),
        ["name"] => Ok(TemplateValue::String(entity.name.clone())),
        ["metadata", key] => Ok(TemplateValue::String(
            entity.metadata.get(*key).cloned().unwrap_or_default(),
        )),
        ["aliases", accessor, field @ ("name" | "id")] => {
            let value = entity.aliases.get(*accessor).map(|alias| {
                if *field == "name" {
                    alias.name.clone()
                } else {
                    alias.id.clone()
                }
            });
            Ok(TemplateValue::String(value.unwrap_or_default()))
        }
        ["groups", "names"] => Ok(TemplateValue::Array(
            entity
                .groups
                .iter()
                .map(|g| TemplateValue::String(g.name.clone()))
                .collect(),
        )),
        ["groups", "ids"] => Ok(TemplateValue::Array(
            entity
                .groups
                .iter()
                .map(|g| TemplateValue::String(g.id.clone()))
                .collect(),
        )),
        _ => Err(TemplateError::UnknownEntityPath(
            std::iter::once("identity.entity")
                .chain(segments.iter().copied())
                .collect::<Vec<_>>()
                .join("."),
        )),
    }
}

fn resolve_subject_path(ctx: &TemplateContext<'_>, segments: &[&str]) -> TemplateValue {
    match segments {
        [claim] => ctx
            .subject_claims
            .get(*claim)
            .cloned()
            .map(TemplateValue::from_json)
            .unwrap_or(TemplateValue::Null),
        _ => TemplateValue::Null,
    }
}

fn parse_duration(spec: &str) -> Result<i64, TemplateError> {
    if spec.is_empty() {
        return Err(TemplateError::InvalidDuration(spec.to_string()));
    }
    let (digits, unit) = spec.split_at(spec.len() - 1);
    let amount: i64 = digits
        .parse()
        .map_err(|_| TemplateError::InvalidDuration(spec.to_string()))?;
    let seconds_per_unit = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        _ => return Err(TemplateError::InvalidDuration(spec.to_string())),
    };
    Ok(amount * seconds_per_unit)
}
