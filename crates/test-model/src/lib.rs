//! A scripted in-process model for testing agents without a network.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use agent_experts_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct ScriptedResponse {
    events: Vec<PresetEvent>,
    has_tool_call: bool,
    event_idx: usize,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for ScriptedResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();

        let Some(sleep) = &mut this.sleep else {
            this.sleep = Some(Box::pin(sleep(this.delay)));
            return Pin::new(this).poll_next_event(cx);
        };
        ready!(sleep.as_mut().poll(cx));
        this.sleep = None;

        let idx = this.event_idx;
        this.event_idx += 1;
        let event = match this.events.get(idx) {
            Some(PresetEvent::MessageDelta(msg)) => {
                ModelResponseEvent::MessageDelta(msg.clone())
            }
            Some(PresetEvent::ToolCall(req)) => {
                ModelResponseEvent::ToolCall(req.clone())
            }
            Some(PresetEvent::Usage(usage)) => ModelResponseEvent::Usage(*usage),
            None if idx == this.events.len() => {
                ModelResponseEvent::Completed(if this.has_tool_call {
                    ModelFinishReason::ToolCalls
                } else {
                    ModelFinishReason::Stop
                })
            }
            // In case this method is called after completion.
            None => return Poll::Ready(Ok(None)),
        };
        Poll::Ready(Ok(Some(event)))
    }
}

#[derive(Default)]
struct Script {
    turns: VecDeque<PresetResponse>,
    failed_attempts: u64,
    requests: Vec<ModelRequest>,
}

/// A local fake model for testing purpose.
///
/// Every request consumes the next scripted turn in order, no matter what
/// the request contains. A turn configured with failures is retried in
/// place: it only gets consumed once the failures are exhausted. When the
/// script runs out, requests fail with a non-transient error.
///
/// Clones share the same script, so a test can keep one handle to inspect
/// [`requests`](Self::requests) while the agent owns another.
#[derive(Clone, Default)]
pub struct ScriptedModelProvider {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl ScriptedModelProvider {
    /// Appends a turn to the script.
    #[inline]
    pub fn add_turn(&self, preset: PresetResponse) {
        self.lock().turns.push_back(preset);
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns every request received so far, including failed attempts.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock().requests.clone()
    }

    /// Returns the number of turns not consumed yet.
    pub fn remaining_turns(&self) -> usize {
        self.lock().turns.len()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_turn(&self, req: &ModelRequest) -> Result<PresetResponse, Error> {
        let mut script = self.lock();
        script.requests.push(req.clone());

        let Some(turn) = script.turns.front() else {
            return Err(Error {
                message: "no enough turns",
                kind: ErrorKind::Other,
            });
        };
        match turn.failures {
            Some(0) => Err(Error {
                message: "scripted permanent failure",
                kind: ErrorKind::RateLimitExceeded,
            }),
            Some(failures) if script.failed_attempts < failures => {
                script.failed_attempts += 1;
                Err(Error {
                    message: "scripted transient failure",
                    kind: ErrorKind::Unavailable,
                })
            }
            _ => {
                script.failed_attempts = 0;
                script.turns.pop_front().ok_or(Error {
                    message: "no enough turns",
                    kind: ErrorKind::Other,
                })
            }
        }
    }
}

impl ModelProvider for ScriptedModelProvider {
    type Error = crate::Error;
    type Response = ScriptedResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let delay = self.delay.unwrap_or(Duration::from_millis(1));
        let resp = self.next_turn(req).map(|turn| ScriptedResponse {
            has_tool_call: turn.has_tool_call(),
            events: turn.events,
            event_idx: 0,
            delay,
            sleep: None,
        });
        ready(resp)
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use agent_experts_model::{ModelMessage, ToolCallRequest};
    use serde_json::json;

    use super::*;

    async fn collect_response(
        resp: ScriptedResponse,
    ) -> (String, Option<ToolCallRequest>, ModelFinishReason) {
        let mut resp = pin!(resp);
        let mut msg = String::new();
        let mut tool_call = None;
        loop {
            let event = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
                .await
                .unwrap()
                .unwrap();
            match event {
                ModelResponseEvent::Completed(reason) => {
                    return (msg, tool_call, reason);
                }
                ModelResponseEvent::MessageDelta(delta) => {
                    msg.push_str(&delta);
                }
                ModelResponseEvent::ToolCall(req) => tool_call = Some(req),
                ModelResponseEvent::Usage(_) => {}
            }
        }
    }

    fn user_request(text: &str) -> ModelRequest {
        ModelRequest {
            messages: vec![ModelMessage::User(text.to_owned())],
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn test_turns_are_consumed_in_order() {
        let provider = ScriptedModelProvider::default();
        provider.add_turn(PresetResponse::with_events([
            PresetEvent::MessageDelta("Checking ".to_owned()),
            PresetEvent::ToolCall(ToolCallRequest {
                id: "call_1".to_owned(),
                name: "get_crypto_price".to_owned(),
                arguments: json!({ "crypto": "btc" }),
            }),
        ]));
        provider.add_turn(PresetResponse::text("Bitcoin is up."));

        let resp = provider
            .send_request(&user_request("price of btc?"))
            .await
            .unwrap();
        let (msg, tool_call, reason) = collect_response(resp).await;
        assert_eq!(msg, "Checking ");
        assert_eq!(tool_call.unwrap().arguments, json!({ "crypto": "btc" }));
        assert_eq!(reason, ModelFinishReason::ToolCalls);

        let resp = provider
            .send_request(&user_request("and now?"))
            .await
            .unwrap();
        let (msg, tool_call, reason) = collect_response(resp).await;
        assert_eq!(msg, "Bitcoin is up.");
        assert!(tool_call.is_none());
        assert_eq!(reason, ModelFinishReason::Stop);

        assert_eq!(provider.requests().len(), 2);
        assert_eq!(provider.remaining_turns(), 0);
    }

    #[tokio::test]
    async fn test_failures_before_success() {
        let provider = ScriptedModelProvider::default();
        provider.add_turn(PresetResponse::text("ok").with_failures(2));

        for _ in 0..2 {
            let err = provider
                .send_request(&user_request("hi"))
                .await
                .err()
                .unwrap();
            assert!(err.kind().is_transient());
        }
        assert!(provider.send_request(&user_request("hi")).await.is_ok());
        assert_eq!(provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_script() {
        let provider = ScriptedModelProvider::default();
        let err = provider
            .send_request(&user_request("hi"))
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Other);
    }
}
