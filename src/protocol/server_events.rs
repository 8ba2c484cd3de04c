use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::models::ArbitraryJson;

/// Error payload the remote API attaches to `error` events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteError {
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub code: Option<String>,
    pub message: String,
}

/// Events read from the control channel.
///
/// The only shape the bridge acts on is the completed function call; anything
/// else that parses as JSON but not as a known variant lands in `Unknown` so
/// callers can log it and move on.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    Error {
        event_id: Option<String>,
        error: RemoteError,
    },
    FunctionCallArgumentsDone {
        event_id: Option<String>,
        call_id: String,
        name: String,
        arguments: String,
    },
    Unknown(ArbitraryJson),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum ServerEventRepr {
    #[serde(rename = "error")]
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        error: RemoteError,
    },
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        call_id: String,
        name: String,
        arguments: String,
    },
}

impl From<ServerEventRepr> for ServerEvent {
    fn from(repr: ServerEventRepr) -> Self {
        match repr {
            ServerEventRepr::Error { event_id, error } => Self::Error { event_id, error },
            ServerEventRepr::FunctionCallArgumentsDone { event_id, call_id, name, arguments } => {
                Self::FunctionCallArgumentsDone { event_id, call_id, name, arguments }
            }
        }
    }
}

impl Serialize for ServerEvent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Unknown(value) => value.serialize(serializer),
            Self::Error { event_id, error } => ServerEventRepr::Error {
                event_id: event_id.clone(),
                error: error.clone(),
            }
            .serialize(serializer),
            Self::FunctionCallArgumentsDone { event_id, call_id, name, arguments } => {
                ServerEventRepr::FunctionCallArgumentsDone {
                    event_id: event_id.clone(),
                    call_id: call_id.clone(),
                    name: name.clone(),
                    arguments: arguments.clone(),
                }
                .serialize(serializer)
            }
        }
    }
}

impl<'de> Deserialize<'de> for ServerEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = ArbitraryJson::deserialize(deserializer)?;
        match ServerEventRepr::deserialize(value.clone()) {
            Ok(repr) => Ok(repr.into()),
            Err(err) => {
                tracing::debug!("unrecognized server event shape: {err}");
                Ok(Self::Unknown(value))
            }
        }
    }
}

impl ServerEvent {
    /// The `type` tag of the event, when present.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Error { .. } => Some("error"),
            Self::FunctionCallArgumentsDone { .. } => {
                Some("response.function_call_arguments.done")
            }
            Self::Unknown(value) => value.get("type").and_then(|v| v.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn function_call_done_round_trips() {
        let raw = json!({
            "type": "response.function_call_arguments.done",
            "event_id": "evt_1",
            "call_id": "call_1",
            "name": "store_search",
            "arguments": "{\"q\":\"milk\"}"
        });
        let event: ServerEvent = serde_json::from_value(raw.clone()).unwrap();
        match &event {
            ServerEvent::FunctionCallArgumentsDone { call_id, name, arguments, .. } => {
                assert_eq!(call_id, "call_1");
                assert_eq!(name, "store_search");
                assert_eq!(arguments, "{\"q\":\"milk\"}");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(serde_json::to_value(&event).unwrap(), raw);
    }

    #[test]
    fn unrecognized_shape_falls_back_to_unknown() {
        let event: ServerEvent =
            serde_json::from_value(json!({"type": "session.created", "session": {}})).unwrap();
        assert!(matches!(event, ServerEvent::Unknown(_)));
        assert_eq!(event.kind(), Some("session.created"));
    }

    #[test]
    fn missing_type_tag_is_unknown_not_error() {
        let event: ServerEvent = serde_json::from_value(json!({"hello": "world"})).unwrap();
        assert!(matches!(event, ServerEvent::Unknown(_)));
        assert_eq!(event.kind(), None);
    }
}
