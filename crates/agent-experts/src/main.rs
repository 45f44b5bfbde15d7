//! The `agent-experts` HTTP server.

#[macro_use]
extern crate tracing;

use std::net::SocketAddr;
use std::process::ExitCode;

use agent_experts::server::{self, AppState};
use agent_experts::{AgentManager, Settings, ToolContext};
use agent_experts_gemini_model::{GeminiConfigBuilder, GeminiProvider};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.to_lowercase()));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!("starting {} v{}", settings.app_name, settings.app_version);
    debug!("settings: {settings:?}");
    if settings.upstreams.openweather_api_key.is_none() {
        warn!("OPENWEATHER_API_KEY is not set, weather lookups will fail");
    }
    if settings.require_api_key && settings.api_keys.is_empty() {
        warn!("API keys are required but none are configured");
    }

    let ctx = ToolContext::new(settings.upstreams.clone());
    let agents = settings.google_api_key.as_deref().map(|api_key| {
        let mut config = GeminiConfigBuilder::with_api_key(api_key);
        if let Some(model) = &settings.gemini_model {
            config = config.with_model(model);
        }
        if let Some(base_url) = &settings.gemini_base_url {
            config = config.with_base_url(base_url);
        }
        let provider = GeminiProvider::new(config.build());
        info!("agents use model {}", provider.config().model());
        AgentManager::new(provider, &ctx)
            .with_max_query_length(settings.max_query_length)
    });
    if agents.is_none() {
        warn!("GOOGLE_API_KEY is not set, agent endpoints are disabled");
    }

    let addr = format!("{}:{}", settings.host, settings.port);
    let mut state = AppState::new(settings, ctx);
    if let Some(agents) = agents {
        state = state.with_agents(agents);
    }
    let app = server::router(state);

    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {addr}: {err}");
            return ExitCode::FAILURE;
        }
    };
    info!("listening on {addr}");

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;
    if let Err(err) = served {
        error!("server error: {err}");
        return ExitCode::FAILURE;
    }
    info!("server stopped");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}
