use thiserror::Error;

/// Startup configuration problems. These disable the agent client but the
/// HTTP server keeps running so `/health` can report the failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("credentials file not found: {0}")]
    CredentialsNotFound(String),

    #[error("failed to load credentials: {0}")]
    InvalidCredentials(String),
}

/// Failures talking to the external agent service. Never propagated to the
/// gateway as-is; `DialogAgent::chat` maps each kind to a fixed apology
/// answer.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("agent request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("token exchange failed: {0}")]
    Auth(String),
}
