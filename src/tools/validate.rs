use serde_json::{Map, Value};

use crate::descriptor::ToolDescriptor;

/// Parse a model-produced arguments string into an object.
/// Blank input counts as `{}`.
pub fn parse_arguments(raw: &str) -> Result<Map<String, Value>, String> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {}", json_kind(&other))),
        Err(e) => Err(format!("arguments are not valid JSON: {e}")),
    }
}

/// Check parsed arguments against a descriptor. A required parameter that is
/// absent or `null` is missing. Undeclared keys pass through.
pub fn validate_arguments(
    descriptor: &ToolDescriptor,
    args: &Map<String, Value>,
    check_types: bool,
) -> Result<(), String> {
    let missing: Vec<&str> = descriptor
        .required
        .iter()
        .filter(|name| args.get(name.as_str()).map_or(true, Value::is_null))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(format!("missing required parameters: {}", missing.join(", ")));
    }

    if !check_types {
        return Ok(());
    }

    for (name, spec) in &descriptor.parameters {
        let Some(value) = args.get(name) else {
            continue;
        };
        // Optional parameters may be sent as explicit nulls.
        if value.is_null() {
            continue;
        }
        if !spec.param_type.matches(value) {
            return Err(format!(
                "parameter '{name}' must be {}, got {}",
                spec.param_type.as_str(),
                json_kind(value)
            ));
        }
        if let Some(allowed) = &spec.allowed {
            if !allowed.contains(value) {
                return Err(format!("parameter '{name}' must be one of {}", Value::Array(allowed.clone())));
            }
        }
    }

    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
