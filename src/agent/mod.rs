pub mod credentials;
pub mod format;
pub mod response;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::config::AgentSettings;
use crate::error::{AgentError, ConfigError};
use credentials::{ServiceAccountKey, TokenProvider};

/// Hard deadline for one detect-intent call. Timeouts are terminal, never
/// retried.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

const API_ERROR_ANSWER: &str =
    "Sorry, I encountered an error with the AI service. Please try again in a moment.";
const GENERIC_ERROR_ANSWER: &str =
    "Sorry, I encountered an error processing your request. Please try again.";
const NO_MATCH_ANSWER: &str =
    "I couldn't generate a proper response for your query. Please try rephrasing or ask about a different topic.";

/// Regions with a dedicated service endpoint. Anything else goes through
/// the global endpoint.
const REGIONAL_ENDPOINTS: &[&str] = &[
    "us-central1",
    "us-east1",
    "us-west1",
    "europe-west1",
    "europe-west2",
    "europe-west3",
    "asia-northeast1",
    "asia-southeast1",
    "australia-southeast1",
];

/// The one value returned across the system boundary. `answer` is never
/// empty; `sources` is reserved and currently always empty.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResult {
    pub answer: String,
    pub sources: Vec<String>,
}

/// Seam between the gateway and whatever answers questions. The gateway
/// only ever sees this trait, so tests can inject a stub.
#[async_trait]
pub trait ConversationalAgent: Send + Sync {
    async fn chat(&self, query: &str) -> anyhow::Result<ChatResult>;
    fn project_id(&self) -> &str;
    fn agent_id(&self) -> &str;
}

/// Client for the managed conversational agent. Configuration is fixed at
/// construction; the only interior mutability is the token cache inside
/// `TokenProvider`, which is safe for concurrent use.
pub struct DialogAgent {
    settings: AgentSettings,
    endpoint: String,
    http: reqwest::Client,
    tokens: TokenProvider,
}

impl DialogAgent {
    /// Build the client and validate credentials by fetching an initial
    /// token. Any failure here leaves the agent disabled without taking
    /// the process down.
    pub async fn new(settings: AgentSettings) -> Result<Self, ConfigError> {
        let key = ServiceAccountKey::from_file(&settings.credentials_path)?;

        let http = reqwest::Client::builder()
            .timeout(CALL_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::InvalidCredentials(e.to_string()))?;

        let tokens = TokenProvider::new(key, http.clone())?;
        tokens
            .access_token()
            .await
            .map_err(|e| ConfigError::InvalidCredentials(e.to_string()))?;

        let endpoint = regional_endpoint(&settings.agent_location);
        info!(
            "Agent client initialized: project={}, agent={}, endpoint={}",
            settings.project_id, settings.agent_id, endpoint
        );

        Ok(Self {
            settings,
            endpoint,
            http,
            tokens,
        })
    }

    fn session_path(&self, query: &str) -> String {
        format!(
            "projects/{}/locations/{}/agents/{}/sessions/{}",
            self.settings.project_id,
            self.settings.agent_location,
            self.settings.agent_id,
            session_id(query)
        )
    }

    async fn detect_intent(&self, query: &str) -> Result<Value, AgentError> {
        let token = self.tokens.access_token().await?;
        let session = self.session_path(query);
        debug!("Session path: {session}");

        let url = format!("{}/v3/{}:detectIntent", self.endpoint, session);
        let body = json!({
            "queryInput": {
                "text": {"text": query},
                "languageCode": self.settings.language_code,
            }
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AgentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

}

/// Fallback answer for a well-formed reply that carried no text: topic-aware
/// when the query mentions a configured keyword, generic otherwise.
fn no_answer_fallback(query: &str, keywords: &[String]) -> String {
    let lowered = query.to_lowercase();
    for keyword in keywords {
        if lowered.contains(&keyword.to_lowercase()) {
            return format!(
                "I understand you're asking about {keyword} documents. However, I'm currently \
                 unable to retrieve the specific {keyword} information from our knowledge base. \
                 Please try rephrasing your question or contact support directly for the most \
                 up-to-date {keyword} documents."
            );
        }
    }
    NO_MATCH_ANSWER.to_string()
}

#[async_trait]
impl ConversationalAgent for DialogAgent {
    async fn chat(&self, query: &str) -> anyhow::Result<ChatResult> {
        info!("Query to agent: {query}");

        let answer = match self.detect_intent(query).await {
            Ok(raw) => match response::extract_answer(&raw, &self.settings.fallback_keywords) {
                Some(text) => {
                    info!("Extracted answer ({} chars)", text.len());
                    text
                }
                None => {
                    warn!("No usable text in agent response for query: {query}");
                    no_answer_fallback(query, &self.settings.fallback_keywords)
                }
            },
            Err(AgentError::Api { status, message }) => {
                error!("Agent API error (status {status}): {message}");
                API_ERROR_ANSWER.to_string()
            }
            Err(e) => {
                error!("Agent call failed: {e}");
                GENERIC_ERROR_ANSWER.to_string()
            }
        };

        Ok(ChatResult {
            answer: format::format_answer(&answer),
            sources: Vec::new(),
        })
    }

    fn project_id(&self) -> &str {
        &self.settings.project_id
    }

    fn agent_id(&self) -> &str {
        &self.settings.agent_id
    }
}

/// Per-call session identifier: second-granularity timestamp plus a bounded
/// hash of the query. Collision avoidance only; never parsed downstream.
fn session_id(query: &str) -> String {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    format!("session_{}_{}", Utc::now().timestamp(), hasher.finish() % 10_000)
}

fn regional_endpoint(location: &str) -> String {
    if REGIONAL_ENDPOINTS.contains(&location) {
        format!("https://{location}-dialogflow.googleapis.com")
    } else {
        "https://dialogflow.googleapis.com".to_string()
    }
}
