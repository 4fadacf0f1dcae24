//! Generative-language assistant.
//!
//! Wraps the Gemini `generateContent` endpoint behind [`GeminiClient`]. The
//! public [`GeminiClient::generate`] never fails: transport, status and
//! parsing problems are logged and replaced by a fixed Spanish fallback so
//! the console always has something to show.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::AssistantConfig;
use crate::error::{AppError, AppResult};

pub const EMPTY_REPLY: &str = "Lo siento, no pude procesar esa solicitud.";
pub const UNAVAILABLE_REPLY: &str =
    "El asistente está descansando en este momento. Por favor, inténtalo más tarde.";
pub const GREETING: &str =
    "¡Hola! Soy tu asistente de seguridad de Menta Verde. ¿En qué puedo ayudarte hoy?";

const TEMPERATURE: f32 = 0.7;

/// System instruction profile for a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    #[default]
    Security,
    Sql,
}

impl Persona {
    pub fn instructions(self) -> &'static str {
        match self {
            Persona::Sql => {
                "Eres un experto en bases de datos MySQL. Proporciona código SQL válido y \
                 optimizado. Explica conceptos como normalización e índices de forma breve y \
                 clara en español."
            }
            Persona::Security => {
                "Eres un asistente de seguridad servicial para Menta Verde. Sé conciso, \
                 profesional y amable. Ayuda a los usuarios con problemas de inicio de sesión y \
                 mejores prácticas de seguridad en español."
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("parse error: {0}")]
    Parse(String),
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(String::from),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

impl GenerateRequest {
    fn new(prompt: &str, persona: Persona) -> Self {
        Self {
            system_instruction: Content::text(None, persona.instructions()),
            contents: vec![Content::text(Some("user"), prompt)],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// Text parts of the first candidate, concatenated.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| content.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct GeminiClient {
    http: reqwest::Client,
    config: AssistantConfig,
}

impl GeminiClient {
    pub fn new(config: AssistantConfig) -> Result<Self, AiError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }

    #[instrument(skip(self, prompt), fields(model = %self.config.model))]
    async fn complete(&self, prompt: &str, persona: Persona) -> Result<String, AiError> {
        let api_key = self.config.api_key.as_deref().ok_or(AiError::MissingApiKey)?;

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&GenerateRequest::new(prompt, persona))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| AiError::Parse(format!("Failed to parse response: {e}")))?;
        Ok(parsed.text())
    }

    /// Completion text for `prompt`, or one of the fixed fallback replies.
    pub async fn generate(&self, prompt: &str, persona: Persona) -> String {
        match self.complete(prompt, persona).await {
            Ok(text) if text.is_empty() => EMPTY_REPLY.to_string(),
            Ok(text) => {
                debug!(chars = text.len(), ?persona, "assistant replied");
                text
            }
            Err(e) => {
                warn!(error = %e, ?persona, "assistant request failed");
                UNAVAILABLE_REPLY.to_string()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Chat transcript
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Clears the loading flag when the request finishes or is dropped.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct AssistantState {
    pub client: GeminiClient,
    transcript: Mutex<Vec<ChatMessage>>,
    loading: AtomicBool,
}

impl AssistantState {
    pub fn new(config: AssistantConfig) -> Result<Self, AiError> {
        Ok(Self {
            client: GeminiClient::new(config)?,
            transcript: Mutex::new(vec![ChatMessage::assistant(GREETING)]),
            loading: AtomicBool::new(false),
        })
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn transcript(&self) -> AppResult<Vec<ChatMessage>> {
        self.transcript
            .lock()
            .map(|t| t.clone())
            .map_err(|e| AppError::Storage(e.to_string()))
    }

    fn push(&self, message: ChatMessage) -> AppResult<()> {
        self.transcript
            .lock()
            .map_err(|e| AppError::Storage(e.to_string()))?
            .push(message);
        Ok(())
    }

    /// Send a chat message with the security persona.
    ///
    /// Blank input, or input while a reply is pending, leaves the
    /// transcript untouched.
    pub async fn send(&self, input: &str) -> AppResult<Vec<ChatMessage>> {
        let message = input.trim();
        if message.is_empty() {
            return self.transcript();
        }
        if self
            .loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("chat message ignored while a reply is pending");
            return self.transcript();
        }
        let _loading = LoadingGuard(&self.loading);

        self.push(ChatMessage {
            role: ChatRole::User,
            content: message.to_string(),
        })?;
        let reply = self.client.generate(message, Persona::Security).await;
        self.push(ChatMessage::assistant(reply))?;
        self.transcript()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(api_key: Option<&str>, base_url: &str) -> AssistantConfig {
        AssistantConfig {
            api_key: api_key.map(String::from),
            model: "gemini-3-flash-preview".into(),
            base_url: base_url.into(),
            timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(GenerateRequest::new("¿Qué es 2FA?", Persona::Sql)).unwrap();
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            Persona::Sql.instructions()
        );
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "¿Qué es 2FA?");
        let temperature = body["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let parsed: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                { "content": { "role": "model", "parts": [{ "text": "CREATE TABLE " }, { "text": "citas (...);" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        }))
        .unwrap();
        assert_eq!(parsed.text(), "CREATE TABLE citas (...);");

        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.text(), "");
    }

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new(config(Some("k"), "https://example.test")).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://example.test/v1beta/models/gemini-3-flash-preview:generateContent"
        );
    }

    #[tokio::test]
    async fn test_missing_key_falls_back() {
        let client = GeminiClient::new(config(None, "http://127.0.0.1:9")).unwrap();
        assert_eq!(client.generate("hola", Persona::Security).await, UNAVAILABLE_REPLY);
    }

    #[tokio::test]
    async fn test_unreachable_service_falls_back() {
        let client = GeminiClient::new(config(Some("test-key"), "http://127.0.0.1:9")).unwrap();
        assert_eq!(client.generate("hola", Persona::Sql).await, UNAVAILABLE_REPLY);
    }

    #[tokio::test]
    async fn test_chat_transcript() {
        let state = AssistantState::new(config(None, "http://127.0.0.1:9")).unwrap();
        assert_eq!(state.transcript().unwrap(), vec![ChatMessage::assistant(GREETING)]);

        assert_eq!(state.send("   ").await.unwrap().len(), 1);

        let transcript = state.send(" ¿Cómo cambio mi contraseña? ").await.unwrap();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[1].role, ChatRole::User);
        assert_eq!(transcript[1].content, "¿Cómo cambio mi contraseña?");
        assert_eq!(transcript[2].content, UNAVAILABLE_REPLY);
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn test_chat_ignores_input_while_loading() {
        let state = AssistantState::new(config(None, "http://127.0.0.1:9")).unwrap();
        state.loading.store(true, Ordering::SeqCst);
        assert_eq!(state.send("hola").await.unwrap().len(), 1);
    }
}
