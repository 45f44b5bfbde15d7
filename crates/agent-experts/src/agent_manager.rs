//! Registry of the expert agents, running queries against them.

use std::collections::BTreeMap;

use agent_experts_core::{Agent, AgentBuilder, RetryPolicy, ToolInvocation};
use agent_experts_model::{ModelProvider, TokenUsage};
use serde::Serialize;

use crate::experts::{city_info_expert, crypto_expert, law_expert};
use crate::tools::ToolContext;

/// Default limit of a query, in characters.
pub const DEFAULT_MAX_QUERY_LENGTH: usize = 1000;
const LOGGED_QUERY_CHARS: usize = 100;

/// Whether an agent run succeeded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// The agent answered.
    Success,
    /// The query was rejected or the agent failed.
    Error,
}

/// Context of an answer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResponseMetadata {
    /// Key of the agent that answered.
    pub agent: String,
    /// Tools called while answering.
    pub tool_calls: Vec<ToolInvocation>,
}

/// Outcome of [`AgentManager::run_agent`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AgentResponse {
    /// Success or error.
    pub status: ResponseStatus,
    /// The answer.
    pub content: Option<String>,
    /// Tokens consumed, if the model reported any.
    pub usage: Option<TokenUsage>,
    /// Why the run failed.
    pub error_message: Option<String>,
    /// Context of the answer.
    pub metadata: Option<ResponseMetadata>,
}

impl AgentResponse {
    /// Creates an error response.
    pub fn error<S: Into<String>>(message: S) -> Self {
        Self {
            status: ResponseStatus::Error,
            content: None,
            usage: None,
            error_message: Some(message.into()),
            metadata: None,
        }
    }

    /// Whether the agent answered.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

/// Holds the expert agents under their keys (`city_info`, `crypto` and
/// `law`) and runs queries against them.
///
/// Agents keep no state between runs, every query starts a new
/// conversation.
#[derive(Clone)]
pub struct AgentManager {
    agents: BTreeMap<String, Agent>,
    max_query_length: usize,
}

impl AgentManager {
    /// Creates the three experts over `provider`.
    pub fn new<P>(provider: P, ctx: &ToolContext) -> Self
    where
        P: ModelProvider + Clone + 'static,
    {
        Self::with_retry_policy(provider, ctx, RetryPolicy::default())
    }

    /// Creates the three experts over `provider`, retrying failed model
    /// requests with `retry_policy`.
    pub fn with_retry_policy<P>(
        provider: P,
        ctx: &ToolContext,
        retry_policy: RetryPolicy,
    ) -> Self
    where
        P: ModelProvider + Clone + 'static,
    {
        let builder = || {
            AgentBuilder::with_model_provider(provider.clone())
                .with_retry_policy(retry_policy)
        };
        let agents = BTreeMap::from([
            ("city_info".to_owned(), city_info_expert(builder(), ctx)),
            ("crypto".to_owned(), crypto_expert(builder(), ctx)),
            ("law".to_owned(), law_expert(builder())),
        ]);
        info!("initialized agent manager with {} agents", agents.len());

        Self {
            agents,
            max_query_length: DEFAULT_MAX_QUERY_LENGTH,
        }
    }

    /// Sets the longest accepted query, in characters.
    #[inline]
    pub fn with_max_query_length(mut self, max_query_length: usize) -> Self {
        self.max_query_length = max_query_length;
        self
    }

    /// Returns the longest accepted query, in characters.
    #[inline]
    pub fn max_query_length(&self) -> usize {
        self.max_query_length
    }

    /// Returns the agent registered under `key`.
    #[inline]
    pub fn agent(&self, key: &str) -> Option<&Agent> {
        self.agents.get(key)
    }

    /// Returns the keys of the registered agents.
    pub fn available_agents(&self) -> Vec<&str> {
        self.agents.keys().map(String::as_str).collect()
    }

    /// Answers `query` with the agent registered under `agent_key`.
    ///
    /// Never fails: rejected queries, unknown agents and failed runs all
    /// become error responses.
    pub async fn run_agent(&self, agent_key: &str, query: &str) -> AgentResponse {
        let query = query.trim();
        if query.is_empty() {
            return AgentResponse::error(
                "Query cannot be empty or whitespace only",
            );
        }
        if query.chars().count() > self.max_query_length {
            return AgentResponse::error(format!(
                "Query is too long. Please keep it under {} characters.",
                self.max_query_length
            ));
        }
        let Some(agent) = self.agent(agent_key) else {
            return AgentResponse::error(format!(
                "Agent '{agent_key}' not found. Available agents: {}",
                self.available_agents().join(", ")
            ));
        };

        let preview: String = query.chars().take(LOGGED_QUERY_CHARS).collect();
        info!("running agent '{agent_key}' with query: {preview}...");

        match agent.run(query).await {
            Ok(output) => {
                info!("agent '{agent_key}' completed successfully");
                AgentResponse {
                    status: ResponseStatus::Success,
                    content: Some(output.content).filter(|c| !c.is_empty()),
                    usage: output.usage,
                    error_message: None,
                    metadata: Some(ResponseMetadata {
                        agent: agent_key.to_owned(),
                        tool_calls: output.tool_calls,
                    }),
                }
            }
            Err(err) => {
                error!("error running agent '{agent_key}': {err}");
                AgentResponse::error(err.to_string())
            }
        }
    }

    /// Runs the city information expert.
    #[inline]
    pub async fn run_city_info_agent(&self, query: &str) -> AgentResponse {
        self.run_agent("city_info", query).await
    }

    /// Runs the cryptocurrency expert.
    #[inline]
    pub async fn run_crypto_agent(&self, query: &str) -> AgentResponse {
        self.run_agent("crypto", query).await
    }

    /// Runs the legal expert.
    #[inline]
    pub async fn run_law_agent(&self, query: &str) -> AgentResponse {
        self.run_agent("law", query).await
    }
}
