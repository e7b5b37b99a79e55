use std::sync::Arc;

use crate::agent::ConversationalAgent;
use crate::rate_limit::SharedRateLimiter;

/// Shared application state. The agent is injected as an optional handle:
/// `None` means startup configuration failed and the gateway degrades to
/// 503/unhealthy responses instead of dying.
#[derive(Clone)]
pub struct AppState {
    pub agent: Option<Arc<dyn ConversationalAgent>>,
    pub init_error: Option<String>,
    pub limiter: SharedRateLimiter,
}

impl AppState {
    pub fn new(
        agent: Option<Arc<dyn ConversationalAgent>>,
        init_error: Option<String>,
        limiter: SharedRateLimiter,
    ) -> Self {
        Self {
            agent,
            init_error,
            limiter,
        }
    }
}
