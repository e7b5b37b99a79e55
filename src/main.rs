mod agent;
mod config;
mod error;
mod rate_limit;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use agent::{ConversationalAgent, DialogAgent};
use config::{AgentSettings, ServerSettings};
use state::AppState;

/// Per-client quota on the chat endpoint.
const PREDICT_REQUESTS_PER_MINUTE: u32 = 10;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let server = ServerSettings::from_env();

    let filter = if server.debug {
        "chatbot_backend=debug,tower_http=debug"
    } else {
        "chatbot_backend=info,tower_http=info"
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Agent initialization failures disable the client but keep the server
    // up so /health can report what went wrong.
    let (agent, init_error): (Option<Arc<dyn ConversationalAgent>>, Option<String>) =
        match AgentSettings::from_env() {
            Ok(settings) => match DialogAgent::new(settings).await {
                Ok(agent) => {
                    info!("Vertex AI chatbot initialized successfully");
                    (Some(Arc::new(agent)), None)
                }
                Err(e) => {
                    error!("Error initializing chatbot: {e}");
                    (None, Some(e.to_string()))
                }
            },
            Err(e) => {
                error!("Error initializing chatbot: {e}");
                (None, Some(e.to_string()))
            }
        };

    let state = AppState::new(
        agent,
        init_error,
        rate_limit::create_limiter(PREDICT_REQUESTS_PER_MINUTE),
    );

    let app = routes::create_routes(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", server.host, server.port).parse()?;
    info!("Starting chatbot server on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
