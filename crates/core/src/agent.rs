//! The tool-calling loop of an expert agent.

mod builder;

use std::sync::Arc;

use agent_experts_model::{
    AssistantMessage, ErrorKind as ModelErrorKind, ModelFinishReason,
    TokenUsage, ToolCallRequest, ToolCallResult,
};
use futures_util::future::join_all;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::Instrument;

use crate::conversation::Conversation;
use crate::model_client::ModelClient;
use crate::tool::{Error as ToolError, Executor as ToolExecutor, ToolResult};
pub use builder::AgentBuilder;

/// Errors that end an agent run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The model provider failed, after retries if the failure was
    /// transient.
    #[error("model request failed ({kind}): {message}")]
    Model {
        /// The kind reported by the provider.
        kind: ModelErrorKind,
        /// The provider's error message.
        message: String,
    },
    /// The model kept requesting tools without producing an answer.
    #[error("the agent did not produce an answer within {0} turns")]
    TurnLimitExceeded(usize),
}

/// A tool call made while answering a query.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolInvocation {
    /// Name of the tool.
    pub name: String,
    /// Arguments the model passed.
    pub arguments: Value,
    /// Whether the tool returned a result rather than an error.
    pub succeeded: bool,
}

/// The final answer of an agent run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AgentOutput {
    /// The text of the last model turn.
    pub content: String,
    /// Token usage summed over every model turn, if the provider reported
    /// any.
    pub usage: Option<TokenUsage>,
    /// Tool calls in the order the model requested them.
    pub tool_calls: Vec<ToolInvocation>,
    /// Why the model ended its last turn, `None` if the stream ended
    /// without saying.
    pub finish_reason: Option<ModelFinishReason>,
}

struct AgentInner {
    name: String,
    description: String,
    instruction: String,
    model_client: ModelClient,
    tool_executor: ToolExecutor,
    max_turns: usize,
}

/// An agent with a model, an instruction and a set of tools.
///
/// Agents are cheap to clone and can serve concurrent runs, each run keeps
/// its own conversation.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

impl Agent {
    fn from_builder(builder: AgentBuilder) -> Self {
        let AgentBuilder {
            mut model_client,
            name,
            description,
            instruction,
            tools,
            max_turns,
            retry_policy,
        } = builder;
        model_client.set_retry_policy(retry_policy);

        let inner = AgentInner {
            name,
            description,
            instruction,
            model_client,
            tool_executor: ToolExecutor::with_tools(tools),
            max_turns,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Returns the name of the agent.
    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the description of the agent.
    #[inline]
    pub fn description(&self) -> &str {
        &self.inner.description
    }

    /// Returns the system instruction of the agent.
    #[inline]
    pub fn instruction(&self) -> &str {
        &self.inner.instruction
    }

    /// Returns the names of the registered tools, sorted.
    pub fn tool_names(&self) -> Vec<String> {
        self.inner
            .tool_executor
            .definitions()
            .into_iter()
            .map(|d| d.name)
            .collect()
    }

    /// Answers `input`, calling tools as the model requests them.
    ///
    /// Each turn sends the whole conversation to the model. When the model
    /// requests tools, they run concurrently and their results are appended
    /// in request order before the next turn. The run ends with the first
    /// turn that requests no tools.
    pub async fn run<S: Into<String>>(
        &self,
        input: S,
    ) -> Result<AgentOutput, Error> {
        let span = info_span!("agent run", agent = %self.inner.name);
        self.run_inner(input.into()).instrument(span).await
    }

    async fn run_inner(&self, input: String) -> Result<AgentOutput, Error> {
        let inner = &self.inner;
        let mut conversation = Conversation::with_instruction(&inner.instruction);
        conversation.push_user_input(input);

        let tools = inner.tool_executor.definitions();
        let mut usage: Option<TokenUsage> = None;
        let mut invocations = vec![];

        for turn in 1..=inner.max_turns {
            debug!("starting turn {turn}");
            let request = agent_experts_model::ModelRequest {
                messages: conversation.messages(),
                tools: tools.clone(),
            };
            let resp =
                inner.model_client.send_request(request).await.map_err(
                    |err| Error::Model {
                        kind: err.kind(),
                        message: err.to_string(),
                    },
                )?;
            if let Some(delta) = resp.usage {
                *usage.get_or_insert_default() += delta;
            }

            let tool_calls = resp.tool_calls;
            match resp.finish_reason {
                None => warn!("model response ended without a finish reason"),
                Some(ModelFinishReason::ToolCalls) if tool_calls.is_empty() => {
                    warn!(
                        "model finished for tool calls without requesting any"
                    )
                }
                _ => {}
            }
            conversation.push_assistant_message(AssistantMessage {
                content: resp.transcript.clone(),
                tool_calls: tool_calls.clone(),
            });
            if tool_calls.is_empty() {
                info!(turns = turn, tools = invocations.len(), "agent answered");
                return Ok(AgentOutput {
                    content: resp.transcript,
                    usage,
                    tool_calls: invocations,
                    finish_reason: resp.finish_reason,
                });
            }

            let results = self.run_tools(tool_calls.clone()).await;
            for (req, result) in tool_calls.into_iter().zip(results) {
                invocations.push(ToolInvocation {
                    name: req.name.clone(),
                    arguments: req.arguments,
                    succeeded: result.is_ok(),
                });
                conversation.push_tool_result(ToolCallResult {
                    id: req.id,
                    name: req.name,
                    content: tool_result_content(result),
                });
            }
        }

        warn!("turn limit ({}) exceeded", inner.max_turns);
        Err(Error::TurnLimitExceeded(inner.max_turns))
    }

    async fn run_tools(&self, requests: Vec<ToolCallRequest>) -> Vec<ToolResult> {
        let mut handles = Vec::with_capacity(requests.len());
        self.inner.tool_executor.handle_requests(requests, |id, fut| {
            let span = debug_span!("tool", %id);
            handles.push(tokio::spawn(fut.instrument(span)));
        });

        join_all(handles)
            .await
            .into_iter()
            .map(|joined| {
                joined.unwrap_or_else(|err| {
                    error!("tool task failed: {err}");
                    Err(ToolError::execution_error()
                        .with_reason(format!("tool task failed: {err}")))
                })
            })
            .collect()
    }
}

fn tool_result_content(result: ToolResult) -> String {
    match result {
        Ok(Value::String(text)) => text,
        Ok(value) => value.to_string(),
        Err(err) => json!({
            "status": "error",
            "error_message": err.reason(),
        })
        .to_string(),
    }
}
