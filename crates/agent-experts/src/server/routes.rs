use agent_experts_model::TokenUsage;
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{ApiError, AppState};
use crate::agent_manager::{ResponseMetadata, ResponseStatus};
use crate::outcome::ToolOutcome;
use crate::tools::city::{
    Coordinates, CurrentTime, Population, TimeConversion, WeatherReport,
};
use crate::tools::crypto::{
    CryptoPrice, PriceChangeSummary, TrendPrediction, validate_days,
};
use crate::tools::law::{
    JurisdictionInfo, LegalDefinition, RecentCases, StatuteInfo,
};

/// Keys of the agents, also the services the API offers.
const SERVICES: [&str; 3] = ["city_info", "crypto", "law"];

/// Substrings rejected in agent queries, matched case-insensitively.
const UNSAFE_PATTERNS: &[&str] =
    &["<script", "javascript:", "vbscript:", "onerror=", "onload="];

type ToolResponse<T> = Result<Json<ToolOutcome<T>>, ApiError>;

/// Checks an agent query and returns it trimmed.
pub fn validate_query(
    query: &str,
    max_length: usize,
) -> Result<&str, ApiError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request(
            "Query cannot be empty or whitespace only",
        ));
    }
    if query.chars().count() > max_length {
        return Err(ApiError::bad_request(format!(
            "Query is too long. Please keep it under {max_length} characters."
        )));
    }
    let lowered = query.to_lowercase();
    if let Some(pattern) = UNSAFE_PATTERNS.iter().find(|p| lowered.contains(*p))
    {
        return Err(ApiError::bad_request(format!(
            "Query contains potentially harmful content: {pattern}"
        )));
    }
    Ok(query)
}

fn required<'a>(value: &'a str, message: &str) -> Result<&'a str, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ApiError::bad_request(message))
    } else {
        Ok(value)
    }
}

fn respond<T>(outcome: ToolOutcome<T>) -> ToolResponse<T> {
    match outcome {
        ToolOutcome::Error { error_message } => {
            Err(ApiError::execution(error_message))
        }
        success => Ok(Json(success)),
    }
}

pub(super) async fn root() -> Json<Value> {
    Json(json!({
        "message": "AI Agent Experts API",
        "endpoints": {
            "/city-info": "City information expert agent",
            "/crypto": "Cryptocurrency expert agent",
            "/law": "Legal expert agent",
            "/agents": "Available agents",
            "/health": "Service health",
        },
        "description": "This API provides access to AI agents for city \
                        information, cryptocurrency data, and legal expertise.",
    }))
}

pub(super) async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "available_services": SERVICES,
        "version": state.settings.app_version,
    }))
}

pub(super) async fn list_agents(State(state): State<AppState>) -> Json<Value> {
    let agents = state
        .agents
        .as_ref()
        .map(|m| m.available_agents())
        .unwrap_or_default();
    Json(json!({
        "count": agents.len(),
        "agents": agents,
    }))
}

pub(super) async fn describe_agent(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let manager =
        state.agents.as_ref().ok_or_else(ApiError::agents_unavailable)?;
    let agent = manager
        .agent(&key)
        .ok_or_else(|| ApiError::agent_not_found(&key))?;
    Ok(Json(json!({
        "key": key,
        "name": agent.name(),
        "description": agent.description(),
        "tools": agent.tool_names(),
    })))
}

// City information

pub(super) async fn weather(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> ToolResponse<WeatherReport> {
    let city = required(&city, "City name cannot be empty")?;
    respond(state.city.get_weather(city).await)
}

pub(super) async fn current_time(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> ToolResponse<CurrentTime> {
    let city = required(&city, "City name cannot be empty")?;
    respond(state.city.get_current_time(city))
}

pub(super) async fn coordinates(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> ToolResponse<Coordinates> {
    let city = required(&city, "City name cannot be empty")?;
    respond(state.city.get_coordinates(city).await)
}

pub(super) async fn population(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> ToolResponse<Population> {
    let city = required(&city, "City name cannot be empty")?;
    respond(state.city.get_population(city).await)
}

/// Body of `POST /city-info/time/convert`.
#[derive(Debug, Deserialize)]
pub struct ConvertTimeRequest {
    /// City the time is given in.
    pub from_city: String,
    /// City to convert the time to.
    pub to_city: String,
    /// Time of day, `HH:MM`.
    pub time: String,
}

pub(super) async fn convert_time(
    State(state): State<AppState>,
    payload: Result<Json<ConvertTimeRequest>, JsonRejection>,
) -> ToolResponse<TimeConversion> {
    let Json(request) = payload?;
    let from_city =
        required(&request.from_city, "Source city cannot be empty")?;
    let to_city =
        required(&request.to_city, "Destination city cannot be empty")?;
    let time = required(&request.time, "Time cannot be empty")?;
    respond(state.city.convert_time(from_city, to_city, time))
}

// Cryptocurrencies

pub(super) async fn crypto_price(
    State(state): State<AppState>,
    Path(crypto): Path<String>,
) -> ToolResponse<CryptoPrice> {
    let crypto = required(&crypto, "Cryptocurrency name cannot be empty")?;
    respond(state.crypto.get_price(crypto).await)
}

pub(super) async fn price_change(
    State(state): State<AppState>,
    path: Result<Path<(String, i64)>, PathRejection>,
) -> ToolResponse<PriceChangeSummary> {
    let Path((crypto, days)) = path?;
    let crypto = required(&crypto, "Cryptocurrency name cannot be empty")?;
    validate_days(days).map_err(ApiError::bad_request)?;
    respond(state.crypto.get_price_change_summary(crypto, days).await)
}

pub(super) async fn trend(
    State(state): State<AppState>,
    Path(crypto): Path<String>,
) -> ToolResponse<TrendPrediction> {
    let crypto = required(&crypto, "Cryptocurrency name cannot be empty")?;
    respond(state.crypto.predict_trend(crypto).await)
}

// Law

pub(super) async fn jurisdiction(
    State(state): State<AppState>,
    Path(jurisdiction): Path<String>,
) -> ToolResponse<JurisdictionInfo> {
    let jurisdiction =
        required(&jurisdiction, "Jurisdiction cannot be empty")?;
    respond(state.law.get_jurisdiction_info(jurisdiction))
}

pub(super) async fn statute(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> ToolResponse<StatuteInfo> {
    let query = required(&query, "Statute query cannot be empty")?;
    respond(state.law.get_statute_info(query))
}

pub(super) async fn cases(
    State(state): State<AppState>,
    Path(law_area): Path<String>,
) -> ToolResponse<RecentCases> {
    let law_area = required(&law_area, "Law area cannot be empty")?;
    respond(state.law.get_recent_cases(law_area))
}

pub(super) async fn definition(
    State(state): State<AppState>,
    Path(term): Path<String>,
) -> ToolResponse<LegalDefinition> {
    let term = required(&term, "Term cannot be empty")?;
    respond(state.law.get_legal_definition(term))
}

// Agents

/// Body of the agent endpoints.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// Natural-language question.
    pub query: String,
}

/// Answer of an agent endpoint.
#[derive(Debug, Serialize)]
pub struct AgentReply {
    status: ResponseStatus,
    content: Option<String>,
    usage: Option<TokenUsage>,
    metadata: Option<ResponseMetadata>,
}

async fn run_agent(
    state: AppState,
    key: &str,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<AgentReply>, ApiError> {
    let Json(request) = payload?;
    if request.query.is_empty() {
        return Err(ApiError::unprocessable(
            "Query should have at least 1 character",
        ));
    }
    if request.query.trim().is_empty() {
        return Err(ApiError::bad_request("Query cannot be empty"));
    }
    let query =
        validate_query(&request.query, state.settings.max_query_length)?;
    let manager = state
        .agents
        .as_ref()
        .ok_or_else(ApiError::agents_unavailable)?;

    let response = manager.run_agent(key, query).await;
    if !response.is_success() {
        return Err(ApiError::execution(
            response
                .error_message
                .unwrap_or_else(|| "Agent execution failed".to_owned()),
        ));
    }
    Ok(Json(AgentReply {
        status: response.status,
        content: response.content,
        usage: response.usage,
        metadata: response.metadata,
    }))
}

pub(super) async fn city_info_agent(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<AgentReply>, ApiError> {
    run_agent(state, "city_info", payload).await
}

pub(super) async fn crypto_agent(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<AgentReply>, ApiError> {
    run_agent(state, "crypto", payload).await
}

pub(super) async fn law_agent(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<AgentReply>, ApiError> {
    run_agent(state, "law", payload).await
}

// Legacy routes, kept for older clients.

async fn run_legacy_agent(
    state: AppState,
    key: &str,
    label: &str,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let manager = state
        .agents
        .as_ref()
        .ok_or_else(ApiError::agents_unavailable)?;
    let response = manager.run_agent(key, &request.query).await;
    if !response.is_success() {
        let reason = response.error_message.unwrap_or_default();
        return Err(ApiError::execution(format!(
            "Error running {label} agent: {reason}"
        )));
    }
    Ok(Json(json!({
        "status": "success",
        "result": {
            "content": response.content,
            "usage": response.usage,
        },
    })))
}

pub(super) async fn legacy_city_info_agent(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    run_legacy_agent(state, "city_info", "city info", payload).await
}

pub(super) async fn legacy_crypto_agent(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    run_legacy_agent(state, "crypto", "crypto", payload).await
}

pub(super) async fn legacy_law_agent(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    run_legacy_agent(state, "law", "law", payload).await
}

pub(super) async fn legacy_weather(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Json<ToolOutcome<WeatherReport>> {
    Json(state.city.get_weather(&city).await)
}

pub(super) async fn legacy_time(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Json<ToolOutcome<CurrentTime>> {
    Json(state.city.get_current_time(&city))
}

pub(super) async fn legacy_coordinates(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Json<ToolOutcome<Coordinates>> {
    Json(state.city.get_coordinates(&city).await)
}

pub(super) async fn legacy_population(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Json<ToolOutcome<Population>> {
    Json(state.city.get_population(&city).await)
}

pub(super) async fn legacy_crypto_price(
    State(state): State<AppState>,
    Path(crypto): Path<String>,
) -> Json<ToolOutcome<CryptoPrice>> {
    Json(state.crypto.get_price(&crypto).await)
}

pub(super) async fn not_found() -> ApiError {
    ApiError::not_found()
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;

    #[test]
    fn test_validate_query() {
        assert_eq!(
            validate_query("  weather in Paris? ", 100).unwrap(),
            "weather in Paris?"
        );

        let err = validate_query(" \t", 100).unwrap_err();
        assert_eq!(err.detail(), "Query cannot be empty or whitespace only");

        let err = validate_query("abcdef", 5).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.detail(),
            "Query is too long. Please keep it under 5 characters."
        );
    }

    #[test]
    fn test_validate_query_rejects_unsafe_content() {
        let err =
            validate_query("hi <SCRIPT>alert(1)</script>", 100).unwrap_err();
        assert_eq!(
            err.detail(),
            "Query contains potentially harmful content: <script"
        );
        let err = validate_query("open JavaScript:void(0)", 100).unwrap_err();
        assert!(err.detail().ends_with("javascript:"));
        assert!(validate_query("is javascript a good language?", 100).is_ok());
    }

    #[test]
    fn test_error_outcomes_become_server_errors() {
        let err = respond::<()>(ToolOutcome::error("boom")).unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.detail(), "boom");
        assert!(respond(ToolOutcome::Success(1)).is_ok());
    }
}
