//! Field contracts for the four append-only logs.
//!
//! Each row must carry every listed field with the listed primitive type.
//! Extra fields are allowed.

use serde_json::{Map, Value};
use sprint_types::LogKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Str,
    /// Integer; booleans and floats do not qualify.
    Int,
}

impl FieldKind {
    fn name(self) -> &'static str {
        match self {
            FieldKind::Str => "string",
            FieldKind::Int => "integer",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldKind::Str => value.is_string(),
            FieldKind::Int => value.is_i64() || value.is_u64(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn str_field(name: &'static str) -> FieldRule {
    FieldRule {
        name,
        kind: FieldKind::Str,
    }
}

const fn int_field(name: &'static str) -> FieldRule {
    FieldRule {
        name,
        kind: FieldKind::Int,
    }
}

pub const RUN_FIELDS: &[FieldRule] = &[
    str_field("prompt_slug"),
    str_field("run_id"),
    int_field("run_seq"),
    str_field("run_key"),
    str_field("run_ref"),
    str_field("status"),
    str_field("source_family"),
    str_field("source_prompt_label"),
    str_field("source_run_label"),
    str_field("source_run_path"),
    int_field("file_count"),
    int_field("total_bytes"),
    str_field("indexed_utc"),
];

pub const STATE_FIELDS: &[FieldRule] = &[
    str_field("prompt_slug"),
    str_field("run_id"),
    int_field("run_seq"),
    str_field("run_key"),
    str_field("run_ref"),
    str_field("status"),
    str_field("indexed_utc"),
];

pub const HISTORY_FIELDS: &[FieldRule] = &[
    str_field("event"),
    str_field("prompt_slug"),
    str_field("run_id"),
    int_field("run_seq"),
    str_field("run_key"),
    str_field("run_ref"),
    str_field("status"),
    str_field("indexed_utc"),
];

pub const ARTIFACT_FIELDS: &[FieldRule] = &[
    str_field("prompt_slug"),
    str_field("run_id"),
    int_field("run_seq"),
    str_field("run_key"),
    str_field("run_ref"),
    str_field("file_name"),
    str_field("rel_path"),
    str_field("source_abs"),
    int_field("bytes"),
    str_field("sha256"),
    str_field("indexed_utc"),
];

pub fn rules_for(kind: LogKind) -> &'static [FieldRule] {
    match kind {
        LogKind::Runs => RUN_FIELDS,
        LogKind::State => STATE_FIELDS,
        LogKind::History => HISTORY_FIELDS,
        LogKind::Artifacts => ARTIFACT_FIELDS,
    }
}

/// JSON type name used in violation messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Every contract violation of `row`, in rule order.
pub fn validate_row(row: &Map<String, Value>, rules: &[FieldRule]) -> Vec<String> {
    rules
        .iter()
        .filter_map(|rule| match row.get(rule.name) {
            None => Some(format!("missing field `{}`", rule.name)),
            Some(value) if !rule.kind.accepts(value) => Some(format!(
                "field `{}` expected {} got {}",
                rule.name,
                rule.kind.name(),
                json_type_name(value)
            )),
            Some(_) => None,
        })
        .collect()
}
