//! The HTTP API.
//!
//! Every domain has direct tool endpoints and an agent endpoint under its
//! prefix (`/city-info`, `/crypto` and `/law`). The unprefixed routes of
//! older clients are kept.

mod error;
mod middleware;
mod routes;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ErrorCode};
pub use middleware::RateLimiter;
pub use routes::{AgentReply, ConvertTimeRequest, QueryRequest, validate_query};

use crate::agent_manager::AgentManager;
use crate::config::Settings;
use crate::services::{CityInfoService, CryptoService, LawService};
use crate::tools::ToolContext;

/// State shared by the handlers.
#[derive(Clone)]
pub struct AppState {
    settings: Arc<Settings>,
    agents: Option<AgentManager>,
    city: CityInfoService,
    crypto: CryptoService,
    law: LawService,
    rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Creates the state of a server without agents, the agent endpoints
    /// answer 503 until [`with_agents`](Self::with_agents) is called.
    pub fn new(settings: Settings, ctx: ToolContext) -> Self {
        let rate_limiter = RateLimiter::new(
            settings.rate_limit_requests,
            settings.rate_limit_window,
        );
        Self {
            settings: Arc::new(settings),
            agents: None,
            city: CityInfoService::new(ctx.clone()),
            crypto: CryptoService::new(ctx),
            law: LawService,
            rate_limiter: Arc::new(rate_limiter),
        }
    }

    /// Serves the agent endpoints with `agents`.
    #[inline]
    pub fn with_agents(mut self, agents: AgentManager) -> Self {
        self.agents = Some(agents);
        self
    }

    /// Returns the settings of the server.
    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-api-key"),
        ]);

    if settings.allowed_origins.is_empty() || settings.allows_any_origin() {
        cors.allow_origin(AllowOrigin::any())
    } else {
        let origins: Vec<HeaderValue> = settings
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

/// Builds the router of the API with its middleware.
///
/// Client addresses for rate limiting come from [`ConnectInfo`], serve the
/// router with `into_make_service_with_connect_info::<SocketAddr>()`.
/// Without it all clients share one limit.
///
/// [`ConnectInfo`]: axum::extract::ConnectInfo
pub fn router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(&state.settings);

    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/agents", get(routes::list_agents))
        .route("/agents/{key}", get(routes::describe_agent))
        // City information
        .route("/city-info/weather/{city}", get(routes::weather))
        .route("/city-info/time/{city}", get(routes::current_time))
        .route("/city-info/time/convert", post(routes::convert_time))
        .route("/city-info/coordinates/{city}", get(routes::coordinates))
        .route("/city-info/population/{city}", get(routes::population))
        .route("/city-info/agent", post(routes::city_info_agent))
        // Cryptocurrencies
        .route("/crypto/price/{crypto}", get(routes::crypto_price))
        .route(
            "/crypto/price-change/{crypto}/{days}",
            get(routes::price_change),
        )
        .route("/crypto/trend/{crypto}", get(routes::trend))
        .route("/crypto/agent", post(routes::crypto_agent))
        // Law
        .route("/law/jurisdiction/{jurisdiction}", get(routes::jurisdiction))
        .route("/law/statute/{query}", get(routes::statute))
        .route("/law/cases/{law_area}", get(routes::cases))
        .route("/law/definition/{term}", get(routes::definition))
        .route("/law/agent", post(routes::law_agent))
        // Legacy
        .route("/city-info", post(routes::legacy_city_info_agent))
        .route("/crypto", post(routes::legacy_crypto_agent))
        .route("/law", post(routes::legacy_law_agent))
        .route("/weather/{city}", get(routes::legacy_weather))
        .route("/time/{city}", get(routes::legacy_time))
        .route("/coordinates/{city}", get(routes::legacy_coordinates))
        .route("/population/{city}", get(routes::legacy_population))
        .route("/crypto-price/{crypto}", get(routes::legacy_crypto_price))
        .fallback(routes::not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_api_key,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer),
        )
        .with_state(state)
}
