use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::RegistryError;

/// JSON type a parameter is declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::Array => "array",
        }
    }

    /// Whether `value` has this type. `integer` only accepts integral numbers.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Object => value.is_object(),
            ParamType::Array => value.is_array(),
        }
    }
}

/// Type and constraint metadata for one parameter. Keys other than
/// `type`, `description` and `enum` are kept verbatim in `constraints`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
    #[serde(flatten)]
    pub constraints: Map<String, Value>,
}

impl ParameterSpec {
    pub fn new(param_type: ParamType) -> Self {
        Self {
            param_type,
            description: None,
            allowed: None,
            constraints: Map::new(),
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::new(ParamType::String).describe(description)
    }

    pub fn integer(description: impl Into<String>) -> Self {
        Self::new(ParamType::Integer).describe(description)
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self::new(ParamType::Number).describe(description)
    }

    pub fn boolean(description: impl Into<String>) -> Self {
        Self::new(ParamType::Boolean).describe(description)
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Restrict the parameter to a fixed set of values.
    pub fn one_of(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.allowed = Some(values.into_iter().collect());
        self
    }

    /// Attach an extra JSON-schema keyword (e.g. `minLength`, `items`).
    pub fn constraint(mut self, key: impl Into<String>, value: Value) -> Self {
        self.constraints.insert(key.into(), value);
        self
    }
}

/// What the model is told about a tool: its name, purpose and parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterSpec>,
    #[serde(default)]
    pub required: Vec<String>,
    /// Line to speak or show while the tool runs. Never sent to the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub announcement: Option<String>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: BTreeMap::new(),
            required: Vec::new(),
            announcement: None,
        }
    }

    /// Declare an optional parameter.
    pub fn param(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        self.parameters.insert(name.into(), spec);
        self
    }

    /// Declare a parameter and mark it required.
    pub fn required_param(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        let name = name.into();
        if !self.required.contains(&name) {
            self.required.push(name.clone());
        }
        self.parameters.insert(name, spec);
        self
    }

    pub fn announce(mut self, text: impl Into<String>) -> Self {
        self.announcement = Some(text.into());
        self
    }

    /// Check the name is a valid function name and every required
    /// parameter is declared.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if !is_valid_tool_name(&self.name) {
            return Err(self.invalid("name must be 1-64 characters of [A-Za-z0-9_-]"));
        }
        if let Some(missing) = self
            .required
            .iter()
            .find(|r| !self.parameters.contains_key(r.as_str()))
        {
            return Err(self.invalid(format!("required parameter '{missing}' is not declared")));
        }
        Ok(())
    }

    fn invalid(&self, reason: impl Into<String>) -> RegistryError {
        RegistryError::InvalidDescriptor {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }

    /// JSON-schema object describing the parameters.
    pub fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": self.parameters,
            "required": self.required,
        })
    }

    /// OpenAI function-calling tool definition.
    pub fn to_openai(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters_schema(),
            }
        })
    }

    /// Anthropic tool definition.
    pub fn to_anthropic(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "input_schema": self.parameters_schema(),
        })
    }

    /// Parse either the native shape or an OpenAI `{"type":"function","function":{...}}` definition.
    pub fn from_json(value: Value) -> Result<Self, RegistryError> {
        let shape: DescriptorShape =
            serde_json::from_value(value).map_err(|e| RegistryError::Load(e.to_string()))?;
        let descriptor = shape.into_descriptor();
        descriptor.validate()?;
        Ok(descriptor)
    }
}

/// 1-64 characters of `[A-Za-z0-9_-]`, the function-name rule model APIs enforce.
pub(crate) fn is_valid_tool_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DescriptorShape {
    OpenAi { function: OpenAiFunction },
    Native(ToolDescriptor),
}

#[derive(Deserialize)]
struct OpenAiFunction {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    parameters: OpenAiParameters,
}

#[derive(Deserialize, Default)]
struct OpenAiParameters {
    #[serde(default)]
    properties: BTreeMap<String, ParameterSpec>,
    #[serde(default)]
    required: Vec<String>,
}

impl DescriptorShape {
    fn into_descriptor(self) -> ToolDescriptor {
        match self {
            DescriptorShape::Native(d) => d,
            DescriptorShape::OpenAi { function } => ToolDescriptor {
                name: function.name,
                description: function.description,
                parameters: function.parameters.properties,
                required: function.parameters.required,
                announcement: None,
            },
        }
    }
}

/// Load a JSON array of tool descriptors from disk. Entries may use the
/// native or the OpenAI shape; each one is validated.
pub async fn load_descriptors(path: impl AsRef<Path>) -> Result<Vec<ToolDescriptor>, RegistryError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RegistryError::Load(format!("{}: {e}", path.display())))?;
    let entries: Vec<Value> =
        serde_json::from_str(&text).map_err(|e| RegistryError::Load(e.to_string()))?;
    entries.into_iter().map(ToolDescriptor::from_json).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_descriptor() -> ToolDescriptor {
        ToolDescriptor::new("send_whatsapp_message", "Send an order confirmation")
            .required_param("order_summary", ParameterSpec::string("The order"))
            .required_param("phone_number", ParameterSpec::string("E.164 number"))
    }

    #[test]
    fn openai_shape() {
        let tool = order_descriptor().to_openai();
        assert_eq!(tool["type"], "function");
        assert_eq!(tool["function"]["name"], "send_whatsapp_message");
        assert_eq!(tool["function"]["parameters"]["type"], "object");
        assert_eq!(
            tool["function"]["parameters"]["properties"]["phone_number"]["type"],
            "string"
        );
        assert_eq!(
            tool["function"]["parameters"]["required"],
            json!(["order_summary", "phone_number"])
        );
    }

    #[test]
    fn anthropic_shape_has_input_schema() {
        let tool = order_descriptor().to_anthropic();
        assert_eq!(tool["name"], "send_whatsapp_message");
        assert!(tool["input_schema"]["properties"]["order_summary"].is_object());
        assert!(tool.get("parameters").is_none());
    }

    #[test]
    fn announcement_is_not_advertised() {
        let tool = order_descriptor().announce("One moment").to_openai();
        assert!(!tool.to_string().contains("One moment"));
    }

    #[test]
    fn rejects_undeclared_required() {
        let mut d = order_descriptor();
        d.required.push("ghost".into());
        let err = d.validate().unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn rejects_bad_names() {
        assert!(ToolDescriptor::new("", "x").validate().is_err());
        assert!(ToolDescriptor::new("has space", "x").validate().is_err());
        assert!(ToolDescriptor::new("a".repeat(65), "x").validate().is_err());
        assert!(ToolDescriptor::new("get-events_2", "x").validate().is_ok());
    }

    #[test]
    fn required_param_is_not_duplicated() {
        let d = ToolDescriptor::new("t", "")
            .required_param("a", ParameterSpec::string("first"))
            .required_param("a", ParameterSpec::string("second"));
        assert_eq!(d.required, vec!["a".to_string()]);
        assert_eq!(d.parameters["a"].description.as_deref(), Some("second"));
    }

    #[test]
    fn from_json_accepts_openai_definition() {
        let raw = json!({
            "type": "function",
            "function": {
                "name": "send_whatsapp_reminder",
                "description": "Send a reminder",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "reminder_text": {"type": "string", "maxLength": 500}
                    },
                    "required": ["reminder_text"]
                }
            }
        });
        let d = ToolDescriptor::from_json(raw).unwrap();
        assert_eq!(d.name, "send_whatsapp_reminder");
        assert_eq!(d.required, vec!["reminder_text".to_string()]);
        assert_eq!(
            d.parameters["reminder_text"].constraints["maxLength"],
            json!(500)
        );
    }

    #[test]
    fn from_json_accepts_native_definition() {
        let raw = json!({
            "name": "pick_size",
            "description": "Pick a size",
            "parameters": {"size": {"type": "string", "enum": ["S", "M", "L"]}},
            "required": ["size"],
            "announcement": "Let me note that"
        });
        let d = ToolDescriptor::from_json(raw).unwrap();
        assert_eq!(d.parameters["size"].allowed.as_ref().unwrap().len(), 3);
        assert_eq!(d.announcement.as_deref(), Some("Let me note that"));
    }

    #[test]
    fn optional_params_render_types_and_constraints() {
        let d = ToolDescriptor::new("set_reminder", "Schedule a reminder")
            .required_param("reminder_text", ParameterSpec::string("What to say"))
            .param(
                "delay_minutes",
                ParameterSpec::number("Minutes from now").constraint("minimum", json!(0)),
            )
            .param("urgent", ParameterSpec::boolean("Send immediately"));
        let schema = d.parameters_schema();
        assert_eq!(schema["properties"]["delay_minutes"]["type"], "number");
        assert_eq!(schema["properties"]["delay_minutes"]["minimum"], 0);
        assert_eq!(schema["properties"]["urgent"]["type"], "boolean");
        assert_eq!(schema["required"], json!(["reminder_text"]));
    }

    #[test]
    fn param_types_match_values() {
        assert!(ParamType::Integer.matches(&json!(3)));
        assert!(!ParamType::Integer.matches(&json!(3.5)));
        assert!(ParamType::Number.matches(&json!(3.5)));
        assert!(!ParamType::String.matches(&json!(1)));
        assert!(ParamType::Array.matches(&json!([])));
    }

    #[tokio::test]
    async fn loads_descriptor_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        let tools = json!([
            order_descriptor(),
            {
                "type": "function",
                "function": {"name": "get_calendar_events", "description": "Today's events"}
            }
        ]);
        tokio::fs::write(&path, tools.to_string()).await.unwrap();

        let loaded = load_descriptors(&path).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], order_descriptor());
        assert_eq!(loaded[1].name, "get_calendar_events");
        assert!(loaded[1].parameters.is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_descriptors(dir.path().join("nope.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Load(_)));
    }
}
