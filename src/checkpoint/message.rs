//! Messages stored in the `messages` channel

use serde_json::{Map, Value};

use super::codec::DecodeError;

/// A chat message as found in a checkpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Serialized class name, e.g. `HumanMessage` or `ToolMessage`
    pub class_name: String,
    /// Type tag: `human`, `ai`, `tool`, `system`, ...
    pub message_type: String,
    pub content: Value,
    pub kind: MessageKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageKind {
    /// Output of a tool invocation
    ToolResult {
        tool_call_id: String,
        artifact: Value,
        status: Option<String>,
    },
    Generic,
}

impl Message {
    /// Recognise a message in any of the shapes the saver leaves behind.
    /// Unrecognised values become an `Unknown` message carrying the raw value.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) if is_constructor(map) => {
                let class_name = map
                    .get("id")
                    .and_then(Value::as_array)
                    .and_then(|id| id.last())
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown")
                    .to_string();
                let empty = Map::new();
                let kwargs = map.get("kwargs").and_then(Value::as_object).unwrap_or(&empty);
                let message_type = kwargs
                    .get("type")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| type_for_class(&class_name));
                Self::from_fields(class_name, message_type, kwargs)
            }
            Value::Object(map) if map.contains_key("type") => {
                let message_type = map
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Self::from_fields(class_for_type(&message_type), message_type, map)
            }
            Value::Array(pair) if pair.len() == 2 => match pair[0].as_str() {
                Some(role) => {
                    let message_type = match role {
                        "user" => "human",
                        "assistant" => "ai",
                        other => other,
                    }
                    .to_string();
                    Self::generic(class_for_type(&message_type), message_type, pair[1].clone())
                }
                None => Self::unknown(value),
            },
            Value::String(text) => Self::generic(
                "HumanMessage".to_string(),
                "human".to_string(),
                Value::String(text.clone()),
            ),
            _ => Self::unknown(value),
        }
    }

    fn from_fields(class_name: String, message_type: String, fields: &Map<String, Value>) -> Self {
        let content = fields.get("content").cloned().unwrap_or(Value::Null);
        let kind = if class_name.starts_with("ToolMessage") || message_type == "tool" {
            MessageKind::ToolResult {
                tool_call_id: fields
                    .get("tool_call_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                artifact: fields.get("artifact").cloned().unwrap_or(Value::Null),
                status: fields
                    .get("status")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }
        } else {
            MessageKind::Generic
        };

        Self {
            class_name,
            message_type,
            content,
            kind,
        }
    }

    fn generic(class_name: String, message_type: String, content: Value) -> Self {
        Self {
            class_name,
            message_type,
            content,
            kind: MessageKind::Generic,
        }
    }

    fn unknown(value: &Value) -> Self {
        Self::generic("Unknown".to_string(), String::new(), value.clone())
    }

    pub fn is_tool_result(&self) -> bool {
        matches!(self.kind, MessageKind::ToolResult { .. })
    }

    /// Content as display text: strings verbatim, anything else as compact JSON
    pub fn content_text(&self) -> String {
        render_value(&self.content)
    }
}

/// Parse the value of a `messages` channel
pub fn parse_messages(channel: &Value) -> Result<Vec<Message>, DecodeError> {
    match channel {
        Value::Array(items) => Ok(items.iter().map(Message::from_value).collect()),
        other => Err(DecodeError::Shape(format!(
            "messages channel is not a list: {}",
            render_value(other)
        ))),
    }
}

pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_constructor(map: &Map<String, Value>) -> bool {
    map.contains_key("lc") && map.get("type").and_then(Value::as_str) == Some("constructor")
}

fn class_for_type(message_type: &str) -> String {
    match message_type {
        "human" => "HumanMessage",
        "ai" => "AIMessage",
        "tool" => "ToolMessage",
        "system" => "SystemMessage",
        "function" => "FunctionMessage",
        "chat" => "ChatMessage",
        "remove" => "RemoveMessage",
        // Chunk classes use their class name as the type tag
        other if other.ends_with("MessageChunk") => other,
        _ => "Message",
    }
    .to_string()
}

fn type_for_class(class_name: &str) -> String {
    match class_name {
        "HumanMessage" => "human",
        "AIMessage" => "ai",
        "ToolMessage" => "tool",
        "SystemMessage" => "system",
        "FunctionMessage" => "function",
        "ChatMessage" => "chat",
        "RemoveMessage" => "remove",
        other => other,
    }
    .to_string()
}
