// Generative Extractor - LLM chat-completions fallback
//
// One prompt asks for all six fields as JSON. Confidence: fixed 0.6, below
// the default fusion threshold (0.7), so generative-only evidence is
// rejected unless the threshold is lowered.
//
// Failures (no key, network, timeout, non-2xx, malformed body) surface as
// `EngineError::ExternalService`; the pipeline logs them and continues with
// the other extractors. No retry.

use crate::tier1::FieldExtractor;
use crate::types::{EngineError, EngineResult, ExtractorKind, FieldCandidate, FieldName};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Fixed confidence for every generative candidate
pub const GENERATIVE_CONFIDENCE: f64 = 0.6;

/// Values the service uses to say "not found"
const UNKNOWN_SENTINELS: &[&str] = &["unknown", "none", "n/a", "null"];

/// Generative service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerativeConfig {
    pub enabled: bool,
    /// OpenAI-compatible chat-completions URL
    pub endpoint: String,
    pub model: String,
    pub temperature: f64,
    pub timeout_secs: u64,
    /// Environment variable holding the bearer token
    pub api_key_env: String,
    /// TOML fallback for the bearer token (ENV takes priority)
    pub api_key: Option<String>,
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama3-70b-8192".to_string(),
            temperature: 0.1,
            timeout_secs: 10,
            api_key_env: "GROQ_API_KEY".to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    content: String,
}

pub struct GenerativeExtractor {
    client: reqwest::Client,
    config: GenerativeConfig,
    api_key: Option<String>,
}

impl GenerativeExtractor {
    /// Create extractor; resolves the API key from ENV → TOML
    ///
    /// A missing key is not an error: the extractor reports itself
    /// unavailable.
    pub fn new(config: GenerativeConfig) -> EngineResult<Self> {
        let api_key =
            pcomp_common::config::resolve_api_key(&config.api_key_env, config.api_key.as_deref());
        Self::with_api_key(config, api_key)
    }

    /// Create extractor with an explicit key (bypasses ENV/TOML resolution)
    pub fn with_api_key(config: GenerativeConfig, api_key: Option<String>) -> EngineResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EngineError::ExternalService(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    /// Request a completion and return the raw message content
    async fn request_completion(&self, api_key: &str, text: &str) -> EngineResult<String> {
        let prompt = build_prompt(text);
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::ExternalService(format!("Generative request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(EngineError::ExternalService(format!(
                "Generative service returned error: {}",
                response.status()
            )));
        }

        let completion: ChatResponse = response.json().await.map_err(|e| {
            EngineError::ExternalService(format!("Failed to parse generative response: {}", e))
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                EngineError::ExternalService("Generative response has no choices".to_string())
            })
    }
}

/// Prompt requesting all six fields as a flat JSON object
fn build_prompt(text: &str) -> String {
    format!(
        "Extract the following fields from this product description. Return as JSON:\n\
         - Material (e.g., TMT, OPC, PC Strand)\n\
         - Grade (e.g., Fe500, OPC 43, Class I)\n\
         - Diameter (in mm)\n\
         - Length (in mm)\n\
         - Form (e.g., Loose, Bag, Coil)\n\
         - Standard (e.g., IS 1786, ASTM)\n\
         \n\
         Text: {}\n\
         \n\
         Return only the JSON object, no other text. Use \"Unknown\" for fields that are not present.",
        text
    )
}

/// Parse message content (a flat JSON object) into candidates
///
/// Tolerates a surrounding markdown code fence. Unknown keys, empty
/// values and "unknown" sentinels are dropped; non-string scalars are
/// stringified.
pub fn parse_completion(content: &str) -> EngineResult<Vec<FieldCandidate>> {
    let json = strip_code_fence(content);
    let object: serde_json::Map<String, Value> = serde_json::from_str(json).map_err(|e| {
        EngineError::ExternalService(format!("Generative content is not a JSON object: {}", e))
    })?;

    let mut candidates = Vec::new();
    for (key, value) in &object {
        let Some(field) = FieldName::from_generative_key(key) else {
            debug!("Ignoring unknown generative key '{}'", key);
            continue;
        };

        let value = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => continue,
        };

        if value.is_empty() || is_unknown(&value) {
            continue;
        }

        candidates.push(FieldCandidate::new(
            field,
            value,
            GENERATIVE_CONFIDENCE,
            ExtractorKind::Generative,
        ));
    }

    Ok(candidates)
}

fn is_unknown(value: &str) -> bool {
    UNKNOWN_SENTINELS
        .iter()
        .any(|sentinel| sentinel.eq_ignore_ascii_case(value))
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[async_trait]
impl FieldExtractor for GenerativeExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Generative
    }

    async fn extract(&self, text: &str) -> EngineResult<Vec<FieldCandidate>> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(EngineError::ExternalService(format!(
                "Generative service unavailable: {} not set",
                self.config.api_key_env
            )));
        };

        // Client timeout covers the request; this bounds body streaming too
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let content = tokio::time::timeout(timeout, self.request_completion(api_key, text))
            .await
            .map_err(|_| {
                EngineError::ExternalService(format!(
                    "Generative request timed out after {}s",
                    self.config.timeout_secs
                ))
            })??;

        let candidates = parse_completion(&content)?;
        debug!("Generative service produced {} candidates", candidates.len());
        Ok(candidates)
    }

    fn is_available(&self) -> bool {
        self.config.enabled && self.api_key.is_some()
    }

    fn confidence_range(&self) -> (f64, f64) {
        (GENERATIVE_CONFIDENCE, GENERATIVE_CONFIDENCE)
    }
}
