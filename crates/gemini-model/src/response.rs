use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use agent_experts_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    ToolCallRequest,
};
use pin_project_lite::pin_project;
use serde_json::Value;

use crate::io::{Sse, SseError};
use crate::proto::{ChatCompletionChunk, ErrorBody, ErrorEnvelope, ToolCall};
use crate::{Error, error_kind_for_status};

struct PartialState {
    sse: Sse,
    tool_calls: Vec<ToolCall>,
    // Tool calls before this index have been emitted already. Arguments
    // arrive in fragments, so tool calls are only emitted when the choice
    // finishes or the stream ends.
    emitted_tool_calls: usize,
    finish_reason: Option<ModelFinishReason>,
    // Events produced by the last chunk but not yet returned to the caller.
    pending_events: VecDeque<ModelResponseEvent>,
    done: bool,
}

impl PartialState {
    fn apply_chunk(&mut self, chunk: ChatCompletionChunk) {
        // The order of events is important. Always emit the message delta
        // first, then completed tool calls, then usage. The completed event
        // is emitted when the stream ends.
        for choice in chunk.choices {
            if let Some(content) =
                choice.delta.content.filter(|c| !c.is_empty())
            {
                self.pending_events
                    .push_back(ModelResponseEvent::MessageDelta(content));
            }
            if let Some(reasoning) = choice.delta.reasoning_content {
                trace!("got reasoning content: {reasoning}");
            }
            for tool_call in choice.delta.tool_calls.into_iter().flatten() {
                self.merge_tool_call(tool_call);
            }
            if let Some(finish_reason) = choice.finish_reason {
                self.finish_reason = Some(if finish_reason == "tool_calls" {
                    ModelFinishReason::ToolCalls
                } else {
                    ModelFinishReason::Stop
                });
                self.flush_tool_calls();
            }
        }
        if let Some(usage) = chunk.usage {
            self.pending_events
                .push_back(ModelResponseEvent::Usage(usage.into()));
        }
    }

    fn merge_tool_call(&mut self, tool_call: ToolCall) {
        // Fragments are matched by index. Some servers omit the index, in
        // which case the id, or else the last open tool call, is used.
        let existing = match (tool_call.index, &tool_call.id) {
            (Some(index), _) => {
                self.tool_calls.iter().position(|t| t.index == Some(index))
            }
            (None, Some(id)) => self
                .tool_calls
                .iter()
                .position(|t| t.id.as_ref() == Some(id)),
            (None, None) => self
                .tool_calls
                .len()
                .checked_sub(1)
                .filter(|idx| *idx >= self.emitted_tool_calls),
        };
        let Some(partial) = existing.map(|idx| &mut self.tool_calls[idx]) else {
            self.tool_calls.push(tool_call);
            return;
        };

        // Patch the partial tool call.
        if partial.id.is_none() {
            partial.id = tool_call.id;
        }
        if partial.r#type.is_none() {
            partial.r#type = tool_call.r#type;
        }
        if let Some(function) = tool_call.function {
            match partial.function {
                Some(ref mut partial_func) => {
                    if let Some(name) = function.name {
                        partial_func
                            .name
                            .get_or_insert_default()
                            .push_str(&name);
                    }
                    if let Some(arguments) = function.arguments {
                        partial_func
                            .arguments
                            .get_or_insert_default()
                            .push_str(&arguments);
                    }
                }
                None => partial.function = Some(function),
            }
        }
    }

    fn flush_tool_calls(&mut self) {
        for (idx, tool_call) in
            self.tool_calls.iter().enumerate().skip(self.emitted_tool_calls)
        {
            self.pending_events
                .push_back(ModelResponseEvent::ToolCall(make_request(
                    idx, tool_call,
                )));
        }
        self.emitted_tool_calls = self.tool_calls.len();
    }

    fn finish(&mut self) {
        self.flush_tool_calls();
        let finish_reason = self.finish_reason.unwrap_or({
            if self.tool_calls.is_empty() {
                ModelFinishReason::Stop
            } else {
                ModelFinishReason::ToolCalls
            }
        });
        self.pending_events
            .push_back(ModelResponseEvent::Completed(finish_reason));
        self.done = true;
    }
}

fn make_request(idx: usize, tool_call: &ToolCall) -> ToolCallRequest {
    let id = tool_call
        .id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| format!("call_{idx}"));
    let function = tool_call.function.as_ref();
    let name = function.and_then(|f| f.name.clone()).unwrap_or_default();
    // Undecodable arguments are passed through as a string, the tool
    // executor reports them back to the model as invalid input.
    let arguments = match function.and_then(|f| f.arguments.as_deref()) {
        None => Value::Object(Default::default()),
        Some(args) if args.trim().is_empty() => {
            Value::Object(Default::default())
        }
        Some(args) => serde_json::from_str(args)
            .unwrap_or_else(|_| Value::String(args.to_owned())),
    };
    ToolCallRequest {
        id,
        name,
        arguments,
    }
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    /// A streamed chat completion from Gemini.
    pub struct GeminiResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl GeminiResponse {
    #[inline]
    pub(crate) fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            tool_calls: Default::default(),
            emitted_tool_calls: 0,
            finish_reason: None,
            pending_events: Default::default(),
            done: false,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
        }
    }
}

impl ModelResponse for GeminiResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future for
        // the next event.
        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(
    mut partial_state: PartialState,
) -> Result<(Option<ModelResponseEvent>, PartialState), Error> {
    loop {
        if let Some(event) = partial_state.pending_events.pop_front() {
            return Ok((Some(event), partial_state));
        }
        if partial_state.done {
            return Ok((None, partial_state));
        }

        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => {
                partial_state.finish();
                continue;
            }
            Err(SseError::ChunksError(err)) => {
                return Err(Error::new(
                    format!("stream interrupted: {}", err.0),
                    ErrorKind::Unavailable,
                ));
            }
            Err(SseError::InvalidPayload) => {
                return Err(Error::new(
                    "invalid event stream payload",
                    ErrorKind::Other,
                ));
            }
        };
        trace!("got sse event: {sse_event}");
        if sse_event.trim() == "[DONE]" {
            partial_state.finish();
            continue;
        }

        match serde_json::from_str::<ChatCompletionChunk>(&sse_event) {
            Ok(ChatCompletionChunk {
                error: Some(body), ..
            }) => return Err(model_error(body)),
            Ok(chunk) => partial_state.apply_chunk(chunk),
            Err(err) => return Err(stream_error(&sse_event, err)),
        }
    }
}

fn model_error(body: ErrorBody) -> Error {
    let kind = body
        .code
        .map(error_kind_for_status)
        .unwrap_or(ErrorKind::Other);
    Error::new(format!("model error: {}", body.message), kind)
}

fn stream_error(payload: &str, parse_err: serde_json::Error) -> Error {
    match serde_json::from_str::<ErrorEnvelope>(payload)
        .ok()
        .and_then(ErrorEnvelope::into_body)
    {
        Some(body) => model_error(body),
        None => Error::new(
            format!("malformed chunk: {parse_err}"),
            ErrorKind::Other,
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use agent_experts_model::{ModelProviderError, TokenUsage};
    use bytes::Bytes;
    use serde_json::json;

    use super::*;
    use crate::io::Chunks;

    async fn collect_events(
        parts: Vec<Bytes>,
    ) -> Result<Vec<ModelResponseEvent>, Error> {
        let sse = Sse::new(Chunks::from_vec_deque(parts.into()));
        let mut resp = pin!(GeminiResponse::from_sse(sse));
        let mut events = vec![];
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?
        {
            events.push(event);
        }
        Ok(events)
    }

    #[tokio::test]
    async fn test_fixture_events() {
        let events = collect_events(vec![Bytes::from_static(include_bytes!(
            "../fixtures/test_response.txt"
        ))])
        .await
        .unwrap();

        let text: String = events
            .iter()
            .filter_map(|e| match e {
                ModelResponseEvent::MessageDelta(delta) => Some(delta.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Let me look that up for you.");

        let tool_calls: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ModelResponseEvent::ToolCall(req) => Some(req.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            tool_calls,
            vec![
                ToolCallRequest {
                    id: "call_weather".to_owned(),
                    name: "get_weather".to_owned(),
                    arguments: json!({ "city": "Tokyo" }),
                },
                ToolCallRequest {
                    id: "call_time".to_owned(),
                    name: "get_current_time".to_owned(),
                    arguments: json!({ "city": "Tokyo" }),
                },
            ]
        );

        let tail = &events[events.len() - 2..];
        assert_eq!(
            tail,
            [
                ModelResponseEvent::Usage(TokenUsage {
                    prompt_tokens: 120,
                    completion_tokens: 31,
                    total_tokens: 151,
                }),
                ModelResponseEvent::Completed(ModelFinishReason::ToolCalls),
            ]
        );
    }

    #[tokio::test]
    async fn test_tool_calls_without_index() {
        let events = collect_events(vec![Bytes::from_static(
            br#"data: {"choices":[{"delta":{"tool_calls":[{"id":"a","type":"function","function":{"name":"get_crypto_price","arguments":"{\"crypto\":\"btc\"}"}},{"id":"b","type":"function","function":{"name":"get_crypto_price","arguments":"{\"crypto\":\"eth\"}"}}]},"finish_reason":"tool_calls"}]}

data: [DONE]

"#,
        )])
        .await
        .unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[1],
            ModelResponseEvent::ToolCall(req) if req.id == "b"
                && req.arguments == json!({ "crypto": "eth" })
        ));
        assert_eq!(
            events[2],
            ModelResponseEvent::Completed(ModelFinishReason::ToolCalls)
        );
    }

    #[tokio::test]
    async fn test_stream_without_finish_reason() {
        let events = collect_events(vec![Bytes::from_static(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n",
        )])
        .await
        .unwrap();
        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("Hi".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_arguments_are_kept_raw() {
        let events = collect_events(vec![Bytes::from_static(
            br#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"name":"get_weather","arguments":"{oops"}}]},"finish_reason":"tool_calls"}]}

"#,
        )])
        .await
        .unwrap();
        assert_eq!(
            events[0],
            ModelResponseEvent::ToolCall(ToolCallRequest {
                id: "call_0".to_owned(),
                name: "get_weather".to_owned(),
                arguments: Value::String("{oops".to_owned()),
            })
        );
    }

    #[tokio::test]
    async fn test_error_inside_stream() {
        let err = collect_events(vec![Bytes::from_static(
            b"data: {\"error\":{\"message\":\"Resource exhausted\",\"code\":429}}\n\n",
        )])
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert!(err.message().contains("Resource exhausted"));
    }

    #[tokio::test]
    async fn test_error_after_partial_content() {
        let err = collect_events(vec![
            Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            ),
            Bytes::from_static(
                b"data: {\"error\":{\"message\":\"The model is overloaded\",\"code\":503}}\n\n",
            ),
        ])
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert!(err.message().contains("overloaded"));
    }

    #[tokio::test]
    async fn test_error_list_inside_stream() {
        let err = collect_events(vec![Bytes::from_static(
            b"data: [{\"error\":{\"message\":\"Bad key\",\"code\":400}}]\n\n",
        )])
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert!(err.message().contains("Bad key"));
    }
}
