use std::env;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Server-level settings. Always constructible; defaults cover every field
/// so the process can serve `/health` even when the agent is misconfigured.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub debug: bool,
}

impl ServerSettings {
    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5000);
        let debug = env::var("DEBUG")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        Self { host, port, debug }
    }
}

/// Settings for the external agent, loaded once at startup and immutable
/// for the process lifetime. Missing required variables disable the agent
/// client but never kill the process.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub credentials_path: PathBuf,
    pub project_id: String,
    pub agent_id: String,
    pub agent_location: String,
    pub language_code: String,
    pub fallback_keywords: Vec<String>,
}

impl AgentSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let credentials = require_var("GOOGLE_APPLICATION_CREDENTIALS")?;
        let project_id = require_var("GCP_PROJECT_ID")?;
        let agent_id = require_var("AGENT_ID")?;
        let agent_location =
            env::var("AGENT_LOCATION").unwrap_or_else(|_| "us-central1".to_string());
        let language_code = env::var("LANGUAGE_CODE").unwrap_or_else(|_| "en".to_string());
        let fallback_keywords = env::var("FALLBACK_KEYWORDS")
            .unwrap_or_else(|_| "Pekeliling".to_string())
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        let credentials_path = resolve_credentials_path(&credentials)
            .ok_or_else(|| ConfigError::CredentialsNotFound(credentials.clone()))?;

        Ok(Self {
            credentials_path,
            project_id,
            agent_id,
            agent_location,
            language_code,
            fallback_keywords,
        })
    }
}

fn require_var(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

/// Resolve a possibly-relative credentials path. Tries the path as given,
/// then relative to the executable directory, the current working directory,
/// and a `credentials/` subfolder of the working directory. First hit wins.
pub fn resolve_credentials_path(raw: &str) -> Option<PathBuf> {
    let given = Path::new(raw);
    if given.exists() {
        return Some(given.to_path_buf());
    }
    if given.is_absolute() {
        return None;
    }

    let exe_dir = env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()));
    let cwd = env::current_dir().ok();

    let mut candidates = Vec::new();
    if let Some(dir) = exe_dir {
        candidates.push(dir.join(given));
    }
    if let Some(dir) = cwd {
        candidates.push(dir.join(given));
        if let Some(name) = given.file_name() {
            candidates.push(dir.join("credentials").join(name));
        }
    }

    candidates.into_iter().find(|p| p.exists())
}
