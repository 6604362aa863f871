use serde::{Deserialize, Serialize};

/// Default model requested when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "LongCat-Flash-Lite";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Canonical request payload for chat-completions endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    /// Requested delivery mode. Providers are not guaranteed to honor it;
    /// response normalization never depends on this flag.
    #[serde(default)]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: false,
            temperature: None,
        }
    }

    #[must_use]
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatMessage, ChatRequest, DEFAULT_MODEL};

    #[test]
    fn serialized_request_omits_unset_temperature() {
        let request = ChatRequest::new(DEFAULT_MODEL, vec![ChatMessage::user("hi")]);
        let json = serde_json::to_value(&request).expect("request should serialize");

        assert_eq!(json["model"], DEFAULT_MODEL);
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn stream_flag_round_trips() {
        let request =
            ChatRequest::new(DEFAULT_MODEL, vec![ChatMessage::user("hi")]).with_stream(true);
        let json = serde_json::to_string(&request).expect("request should serialize");
        let parsed: ChatRequest = serde_json::from_str(&json).expect("request should parse");

        assert!(parsed.stream);
    }
}
