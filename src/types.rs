// src/types.rs
use serde::{Deserialize, Serialize};

// =============================================================================
// OPENAI-COMPATIBLE API TYPES (OpenAI, llama.cpp)
// =============================================================================
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self { role: "system".into(), content: content.into() }
    }

    pub fn user(content: &str) -> Self {
        Self { role: "user".into(), content: content.into() }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    pub usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessageResponse {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatUsage {
    #[serde(default)]
    pub total_tokens: u64,
}

/// `{"error": {"message", "type", "code"}}`
#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

// =============================================================================
// ANTHROPIC MESSAGES API TYPES
// =============================================================================
#[derive(Debug, Serialize)]
pub struct ClaudeRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ClaudeMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct ClaudeMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ClaudeResponse {
    #[serde(default)]
    pub content: Vec<ClaudeContentBlock>,
    pub usage: Option<ClaudeUsage>,
}

#[derive(Debug, Deserialize)]
pub struct ClaudeContentBlock {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClaudeUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

/// `{"type": "error", "error": {"type", "message"}}`
#[derive(Debug, Deserialize)]
pub struct ClaudeError {
    pub error: Option<ApiErrorDetail>,
}

// =============================================================================
// VERTEX AI generateContent TYPES
// =============================================================================
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexRequest {
    pub contents: Vec<VertexContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<VertexGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VertexContent {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<VertexPart>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VertexPart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexResponse {
    #[serde(default)]
    pub candidates: Vec<VertexCandidate>,
    pub usage_metadata: Option<VertexUsage>,
}

#[derive(Debug, Deserialize)]
pub struct VertexCandidate {
    pub content: Option<VertexContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexUsage {
    #[serde(default)]
    pub total_token_count: u64,
}

/// `{"error": {"code", "message", "status"}}`
#[derive(Debug, Deserialize)]
pub struct VertexError {
    pub error: Option<VertexErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct VertexErrorDetail {
    pub code: Option<i64>,
    pub message: Option<String>,
    pub status: Option<String>,
}

// =============================================================================
// OAUTH2 TOKEN TYPES
// =============================================================================
#[derive(Debug, Serialize)]
pub struct JwtClaims<'a> {
    pub iss: &'a str,
    pub sub: &'a str,
    pub aud: &'a str,
    pub iat: i64,
    pub exp: i64,
    pub scope: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: Option<String>,
}

// =============================================================================
// MODULE TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_request_omits_unset_fields() {
        let req = ChatCompletionRequest {
            model: "default".into(),
            messages: vec![ChatMessage::user("hi")],
            temperature: None,
            max_tokens: None,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value, json!({"model": "default", "messages": [{"role": "user", "content": "hi"}]}));
    }

    #[test]
    fn vertex_request_uses_camel_case() {
        let req = VertexRequest {
            contents: vec![VertexContent {
                role: Some("user".into()),
                parts: vec![VertexPart { text: Some("p".into()) }],
            }],
            generation_config: Some(VertexGenerationConfig {
                temperature: Some(0.5),
                max_output_tokens: Some(64),
            }),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 64);
        assert_eq!(value["contents"][0]["parts"][0]["text"], "p");
    }

    #[test]
    fn vertex_response_tolerates_missing_candidates() {
        let resp: VertexResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.candidates.is_empty());
        assert!(resp.usage_metadata.is_none());
    }

    #[test]
    fn claude_error_parses_nested_message() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let err: ClaudeError = serde_json::from_str(body).unwrap();
        assert_eq!(err.error.unwrap().message.as_deref(), Some("Overloaded"));
    }
}
