//! Tagged-tree variable namespace for the claim template engine.
//!
//! Per the redesign note on reflection-driven template variables: the
//! context is an explicit tree of typed values rather than a runtime
//! attribute walk, so dotted-path lookup and JSON-aware rendering are two
//! clearly separated steps. Grounded in the claims-extraction shape of
//! `trysoma-soma/crates/identity/src/logic/token_mapping/template/apply.rs`
//! (`serde_json::Map` lookups feeding a normalized result), adapted into an
//! explicit tagged enum per this engine's own variable namespace.

use crate::identity::Entity;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// A value in the template variable namespace.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    /// JSON `null`.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON number.
    Number(Number),
    /// JSON string; rendered with surrounding quotes and escaping.
    String(String),
    /// JSON array, rendered verbatim.
    Array(Vec<TemplateValue>),
    /// JSON object, rendered verbatim.
    Object(BTreeMap<String, TemplateValue>),
}

impl TemplateValue {
    /// Convert an arbitrary `serde_json::Value` into a `TemplateValue`,
    /// preserving type fidelity (used for subject-token claims, whose shape
    /// is not known ahead of time).
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert back to `serde_json::Value`, for whole-value (array/object)
    /// rendering.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(map) => {
                let mut out = Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), v.to_json());
                }
                Value::Object(out)
            }
        }
    }
}

/// The full variable namespace available to a single render: the resolved
/// caller entity (if any), the verified subject token's claims, and the
/// current time.
pub struct TemplateContext<'a> {
    pub(super) entity: Option<&'a Entity>,
    pub(super) subject_claims: &'a Map<String, Value>,
    pub(super) now_unix: i64,
}

impl<'a> TemplateContext<'a> {
    /// Construct a context from the resolved entity (or `None` if the
    /// identity resolver reported no entity), the subject token's claim
    /// map, and the current Unix time in seconds.
    #[must_use]
    pub fn new(
        entity: Option<&'a Entity>,
        subject_claims: &'a Map<String, Value>,
        now_unix: i64,
    ) -> Self {
        Self {
            entity,
            subject_claims,
            now_unix,
        }
    }
}
