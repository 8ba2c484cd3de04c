use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON Schema / tool parameter definitions are intentionally untyped.
pub type JsonSchema = Value;

/// Free-form JSON payloads where the protocol is open-ended.
pub type ArbitraryJson = Value;

/// A tool advertised to the remote model inside `session.update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Tool {
    #[serde(rename = "function")]
    Function {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        parameters: JsonSchema,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoiceMode {
    Auto,
    None,
    Required,
}

/// Payload of the one `session.update` sent after the control channel opens.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoiceMode>,
}

/// Conversation items this bridge creates. Only the function-result shape is
/// ever sent; the enum stays open for the same reason the event enums do.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Item {
    FunctionCallOutput {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        call_id: String,
        output: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn function_tool_serializes_with_type_tag() {
        let tool = Tool::Function {
            name: "store_search".to_string(),
            description: Some("d".to_string()),
            parameters: json!({}),
        };
        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["type"], "function");
        assert_eq!(value["name"], "store_search");
        assert_eq!(value["parameters"], json!({}));
    }

    #[test]
    fn tool_choice_auto_is_lowercase() {
        let serialized = serde_json::to_string(&ToolChoiceMode::Auto).unwrap();
        assert_eq!(serialized, "\"auto\"");
    }

    #[test]
    fn session_update_omits_unset_fields() {
        let update = SessionUpdate {
            voice: Some("verse".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value, json!({"voice": "verse"}));
    }
}
