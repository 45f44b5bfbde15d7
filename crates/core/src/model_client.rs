use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;
use std::time::Duration;

use agent_experts_model::{
    ModelFinishReason, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent, TokenUsage, ToolCallRequest,
};
use backoff::ExponentialBackoffBuilder;
use tracing::Instrument;

type SendRequestResult =
    Result<ModelClientResponse, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn = Arc<dyn Fn(ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// How a failed model request is retried.
///
/// Only transient provider errors (rate limits, unavailability) are
/// retried. The delay grows exponentially from `initial_interval`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_interval: Duration,
    multiplier: f64,
    max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_secs(1),
            multiplier: 2.0,
            max_interval: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy that sends every request exactly once.
    #[inline]
    pub fn never() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Sets the total number of attempts, including the first one.
    #[inline]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the delay before the first retry.
    #[inline]
    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    /// Sets the factor applied to the delay after each retry.
    #[inline]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Returns the total number of attempts.
    #[inline]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the backoff schedule of this policy, without jitter and
    /// without an elapsed time limit. Callers count attempts themselves.
    pub fn backoff(&self) -> backoff::ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_multiplier(self.multiplier)
            .with_max_interval(self.max_interval.max(self.initial_interval))
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build()
    }
}

/// A wrapper around a model provider that provides a type-erased interface
/// for the other modules, and retries transient failures.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    retry_policy: RetryPolicy,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self {
            handler_fn,
            retry_policy: RetryPolicy::default(),
        }
    }

    #[inline]
    pub fn set_retry_policy(&mut self, retry_policy: RetryPolicy) {
        self.retry_policy = retry_policy;
    }

    /// Sends a request and returns the fully received response.
    ///
    /// A request failing with a transient error is sent again until the
    /// retry policy runs out of attempts.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    pub async fn send_request(
        &self,
        req: ModelRequest,
    ) -> Result<ModelClientResponse, Box<dyn ModelProviderError>> {
        let max_attempts = self.retry_policy.max_attempts;
        let mut attempt = 0;
        let operation = || {
            attempt += 1;
            let is_last_attempt = attempt >= max_attempts;
            let current_attempt = attempt;
            let fut = (self.handler_fn)(req.clone());
            async move {
                fut.await.map_err(|err| {
                    if err.kind().is_transient() && !is_last_attempt {
                        warn!(
                            "model request failed on attempt {current_attempt}/{max_attempts}, retrying: {err}"
                        );
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        };
        backoff::future::retry(self.retry_policy.backoff(), operation).await
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug)]
pub struct ModelClientResponse {
    /// The text generated by the model.
    pub transcript: String,
    /// Tool calls requested by the model.
    pub tool_calls: Vec<ToolCallRequest>,
    /// Token usage, if the provider reported any.
    pub usage: Option<TokenUsage>,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(Box::new(err));
        }
    };

    let mut transcript = String::new();
    let mut tool_calls = Vec::new();
    let mut usage: Option<TokenUsage> = None;
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(event) => event,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(Box::new(err));
            }
        };

        let Some(event) = event else {
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(msg) => {
                transcript.push_str(&msg);
            }
            ModelResponseEvent::ToolCall(req) => {
                tool_calls.push(req);
            }
            ModelResponseEvent::Usage(delta) => {
                *usage.get_or_insert_default() += delta;
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    trace!("finished a request");

    Ok(ModelClientResponse {
        transcript,
        tool_calls,
        usage,
        finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use agent_experts_model::{ErrorKind, ModelMessage};
    use agent_experts_test_model::{
        PresetEvent, PresetResponse, ScriptedModelProvider,
    };

    use super::*;

    fn request() -> ModelRequest {
        ModelRequest {
            messages: vec![ModelMessage::User("Hi".to_owned())],
            tools: vec![],
        }
    }

    fn fast_retries() -> RetryPolicy {
        RetryPolicy::default().with_initial_interval(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_send_request() {
        let model_provider = ScriptedModelProvider::default();
        for _ in 0..3 {
            model_provider.add_turn(PresetResponse::with_events([
                PresetEvent::MessageDelta("How ".to_owned()),
                PresetEvent::MessageDelta("are ".to_owned()),
                PresetEvent::MessageDelta("you?".to_owned()),
                PresetEvent::Usage(TokenUsage {
                    prompt_tokens: 3,
                    completion_tokens: 3,
                    total_tokens: 6,
                }),
            ]));
        }

        let model_client = ModelClient::new(model_provider);

        for _ in 0..3 {
            let resp = model_client.send_request(request()).await.unwrap();
            assert_eq!(resp.transcript, "How are you?");
            assert_eq!(resp.usage.unwrap().total_tokens, 6);
            assert_eq!(resp.finish_reason, Some(ModelFinishReason::Stop));
            assert!(resp.tool_calls.is_empty());
        }
    }

    #[tokio::test]
    async fn test_error_handling() {
        let model_provider = ScriptedModelProvider::default();
        let model_client = ModelClient::new(model_provider.clone());
        let err = model_client.send_request(request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        // Non-transient errors are not retried.
        assert_eq!(model_provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let model_provider = ScriptedModelProvider::default();
        model_provider.add_turn(PresetResponse::text("finally").with_failures(2));

        let mut model_client = ModelClient::new(model_provider.clone());
        model_client.set_retry_policy(fast_retries());
        let resp = model_client.send_request(request()).await.unwrap();
        assert_eq!(resp.transcript, "finally");
        assert_eq!(model_provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let model_provider = ScriptedModelProvider::default();
        model_provider.add_turn(PresetResponse::text("never").with_failures(0));

        let mut model_client = ModelClient::new(model_provider.clone());
        model_client.set_retry_policy(fast_retries());
        let err = model_client.send_request(request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert_eq!(model_provider.requests().len(), 3);
    }
}
