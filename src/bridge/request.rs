//! Execution request schema.
//!
//! The calling application serializes its crew records as-is, so ids arrive
//! as strings or integers and booleans may arrive as `0`/`1`. Everything it
//! sends is declared here; any other field is rejected at parse time.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::crew::{AgentLlm, Process};

/// Input variables substituted into `{name}` placeholders.
pub type InputVariables = Map<String, Value>;

/// Opaque identifier accepted as a JSON string or integer.
///
/// Compares by its text form, so `1` and `"1"` name the same object, but
/// serializes back exactly as the caller sent it.
#[derive(Debug, Clone)]
pub struct DescriptorId {
    key: String,
    raw: Value,
}

impl DescriptorId {
    pub fn new(id: impl Into<String>) -> Self {
        let key = id.into();
        Self {
            raw: Value::String(key.clone()),
            key,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// The id as it appeared in the request.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl PartialEq for DescriptorId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for DescriptorId {}

impl Hash for DescriptorId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for DescriptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl Serialize for DescriptorId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DescriptorId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => DescriptorId::new(s),
            RawId::Signed(n) => DescriptorId {
                key: n.to_string(),
                raw: Value::from(n),
            },
            RawId::Unsigned(n) => DescriptorId {
                key: n.to_string(),
                raw: Value::from(n),
            },
        })
    }
}

/// Crew configuration as sent by the calling application.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrewConfig {
    pub id: DescriptorId,
    #[serde(default)]
    pub name: Option<String>,
    pub process_type: Process,
    pub agents: Vec<AgentDescriptor>,
    pub tasks: Vec<TaskDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentDescriptor {
    pub id: DescriptorId,
    #[serde(default)]
    pub name: Option<String>,
    pub role: String,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub backstory: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub allow_delegation: bool,
    #[serde(default, deserialize_with = "flag")]
    pub verbose: bool,
    #[serde(default)]
    pub max_iterations: Option<u32>,
    /// Tool names; accepted for compatibility, agents run without tools
    #[serde(default)]
    pub tools: Option<Value>,
    #[serde(default)]
    pub llm_config: Option<Value>,
}

impl AgentDescriptor {
    /// Name used in log messages.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.role)
    }

    /// Per-agent model overrides from `llm_config` (`model`, `temperature`).
    pub fn llm_overrides(&self) -> AgentLlm {
        let Some(Value::Object(map)) = self.llm_config.as_ref() else {
            return AgentLlm::default();
        };
        AgentLlm {
            model: map
                .get("model")
                .and_then(Value::as_str)
                .filter(|m| !m.trim().is_empty())
                .map(str::to_string),
            temperature: map.get("temperature").and_then(Value::as_f64),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskDescriptor {
    #[serde(default)]
    pub id: Option<DescriptorId>,
    #[serde(default)]
    pub name: Option<String>,
    pub description: String,
    #[serde(default)]
    pub expected_output: Option<String>,
    #[serde(default)]
    pub agent_id: Option<DescriptorId>,
    #[serde(default)]
    pub context: Option<Value>,
    /// Ordering hints; tasks always run in list order
    #[serde(default)]
    pub dependencies: Option<Value>,
}

/// Everything one bridge invocation works on.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub execution_id: String,
    pub crew: CrewConfig,
    pub inputs: InputVariables,
}

/// Parse a crew configuration.
pub fn parse_crew_config(json: &str) -> Result<CrewConfig, serde_json::Error> {
    serde_json::from_str(json)
}

/// Parse input variables; they must form a JSON object (`null` means none).
pub fn parse_input_variables(json: &str) -> Result<InputVariables, String> {
    match serde_json::from_str::<Value>(json).map_err(|e| e.to_string())? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        // an empty PHP array encodes as []
        Value::Array(items) if items.is_empty() => Ok(Map::new()),
        other => Err(format!(
            "input variables must be a JSON object, got {}",
            json_type_name(&other)
        )),
    }
}

/// Replace `{name}` placeholders with input values in one left-to-right
/// pass. Unknown placeholders are left untouched and substituted values are
/// never scanned again.
pub fn interpolate(template: &str, inputs: &InputVariables) -> String {
    if inputs.is_empty() || !template.contains('{') {
        return template.to_string();
    }
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after
            .find('}')
            .map(|close| &after[..close])
            .filter(|key| !key.contains('{'))
            .and_then(|key| inputs.get(key).map(|value| (key.len(), value)));

        match value {
            Some((key_len, value)) => {
                match value {
                    Value::String(s) => out.push_str(s),
                    Value::Null => {}
                    other => out.push_str(&other.to_string()),
                }
                rest = &after[key_len + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Boolean that also accepts `0`/`1` and `null` (false).
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(b),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(D::Error::custom(format!("expected a boolean, got {}", n))),
        },
        Some(other) => Err(D::Error::custom(format!(
            "expected a boolean, got {}",
            json_type_name(&other)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CALLER_PAYLOAD: &str = r#"{
        "id": 7,
        "name": "Blog crew",
        "process_type": "sequential",
        "agents": [
            {"id": 1, "name": "Res", "role": "Researcher", "goal": "Find facts", "backstory": null,
             "allow_delegation": 0, "verbose": true, "max_iterations": 15, "tools": [], "llm_config": []},
            {"id": "w-2", "role": "Writer", "llm_config": {"model": "gpt-4o", "temperature": 0.3}}
        ],
        "tasks": [
            {"id": 10, "name": "research", "description": "Research {topic}", "expected_output": "Notes",
             "agent_id": 1, "context": [], "dependencies": []},
            {"description": "Write about {topic}", "agent_id": "w-2"}
        ]
    }"#;

    #[test]
    fn parses_payload_from_calling_application() {
        let config = parse_crew_config(CALLER_PAYLOAD).unwrap();
        assert_eq!(config.id.as_str(), "7");
        assert_eq!(config.process_type, Process::Sequential);
        assert_eq!(config.agents.len(), 2);
        assert_eq!(config.tasks.len(), 2);

        let res = &config.agents[0];
        assert_eq!(res.display_name(), "Res");
        assert!(res.backstory.is_none());
        assert!(!res.allow_delegation);
        assert!(res.verbose);
        assert_eq!(res.llm_overrides(), AgentLlm::default());

        let writer = &config.agents[1];
        assert_eq!(writer.id.as_str(), "w-2");
        assert_eq!(writer.display_name(), "Writer");
        assert_eq!(writer.llm_overrides().model.as_deref(), Some("gpt-4o"));
        assert_eq!(writer.llm_overrides().temperature, Some(0.3));

        assert_eq!(config.tasks[0].agent_id.as_ref().unwrap().as_str(), "1");
        assert!(config.tasks[1].expected_output.is_none());
    }

    #[test]
    fn rejects_unknown_fields_with_their_name() {
        let err = parse_crew_config(
            r#"{"id": 1, "process_type": "sequential", "agents": [], "tasks": [], "priority": 3}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("priority"));
    }

    #[test]
    fn rejects_missing_required_fields() {
        let err = parse_crew_config(
            r#"{"id": 1, "process_type": "sequential", "agents": [{"id": 1}], "tasks": []}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("role"));

        let err = parse_crew_config(r#"{"id": 1, "agents": [], "tasks": []}"#).unwrap_err();
        assert!(err.to_string().contains("process_type"));
    }

    #[test]
    fn rejects_unknown_process_type() {
        assert!(parse_crew_config(
            r#"{"id": 1, "process_type": "parallel", "agents": [], "tasks": []}"#
        )
        .is_err());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_crew_config("{not json").is_err());
    }

    #[test]
    fn flag_rejects_other_numbers() {
        let err = parse_crew_config(
            r#"{"id": 1, "process_type": "sequential", "tasks": [],
                "agents": [{"id": 1, "role": "R", "allow_delegation": 2}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("expected a boolean"));
    }

    #[test]
    fn input_variables_shapes() {
        assert!(parse_input_variables("{}").unwrap().is_empty());
        assert!(parse_input_variables("[]").unwrap().is_empty());
        assert!(parse_input_variables("null").unwrap().is_empty());
        assert_eq!(
            parse_input_variables(r#"{"topic": "AI"}"#).unwrap()["topic"],
            "AI"
        );
        assert!(parse_input_variables("[1, 2]").is_err());
        assert!(parse_input_variables("\"text\"").is_err());
        assert!(parse_input_variables("{broken").is_err());
    }

    #[test]
    fn interpolate_replaces_known_placeholders_only() {
        let inputs = json!({"topic": "AI trends", "count": 3, "none": null})
            .as_object()
            .unwrap()
            .clone();
        assert_eq!(
            interpolate("Top {count} {topic} for {audience}{none}", &inputs),
            "Top 3 AI trends for {audience}"
        );
        assert_eq!(interpolate("plain", &inputs), "plain");
        assert_eq!(interpolate("{{topic}}", &inputs), "{AI trends}");
        assert_eq!(interpolate("{topic", &inputs), "{topic");
        assert_eq!(interpolate("{topic}", &Map::new()), "{topic}");
    }

    #[test]
    fn interpolated_values_are_not_rescanned() {
        let inputs = json!({"a": "literal {b}", "b": "INJECTED", "z": "{a}"})
            .as_object()
            .unwrap()
            .clone();
        assert_eq!(
            interpolate("Write about {a}", &inputs),
            "Write about literal {b}"
        );
        assert_eq!(interpolate("{z} and {b}", &inputs), "{a} and INJECTED");
    }

    #[test]
    fn ids_match_across_types_and_echo_as_sent() {
        let config = parse_crew_config(CALLER_PAYLOAD).unwrap();
        assert_eq!(config.id.raw(), &json!(7));
        assert_eq!(serde_json::to_value(&config.id).unwrap(), json!(7));
        assert_eq!(config.agents[1].id.raw(), &json!("w-2"));
        assert_eq!(config.tasks[0].agent_id.as_ref().unwrap(), &DescriptorId::new("1"));
    }
}
