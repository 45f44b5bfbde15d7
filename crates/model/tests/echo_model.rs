use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::{poll_fn, ready};
use std::pin::{Pin, pin};
use std::task::{self, Poll, ready};
use std::time::Duration;

use agent_experts_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
    TokenUsage,
};
use tokio::time::{Sleep, sleep};

#[derive(Debug)]
struct EchoModelError(ErrorKind);

impl Display for EchoModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for EchoModelError {}

impl ModelProviderError for EchoModelError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Streams back the last user message word by word.
#[derive(Debug)]
struct EchoResponse {
    words: VecDeque<String>,
    usage_sent: bool,
    done: bool,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for EchoResponse {
    type Error = EchoModelError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };
        if let Some(sleep) = &mut this.sleep {
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;

            if let Some(mut word) = this.words.pop_front() {
                if !this.words.is_empty() {
                    word.push(' ');
                }
                return Poll::Ready(Ok(Some(
                    ModelResponseEvent::MessageDelta(word),
                )));
            }
            if !this.usage_sent {
                this.usage_sent = true;
                return Poll::Ready(Ok(Some(ModelResponseEvent::Usage(
                    TokenUsage {
                        prompt_tokens: 1,
                        completion_tokens: 1,
                        total_tokens: 2,
                    },
                ))));
            }
            if !this.done {
                this.done = true;
                return Poll::Ready(Ok(Some(ModelResponseEvent::Completed(
                    ModelFinishReason::Stop,
                ))));
            }
            return Poll::Ready(Ok(None));
        }
        this.sleep = Some(Box::pin(sleep(Duration::from_millis(1))));
        Pin::new(this).poll_next_event(cx)
    }
}

struct EchoProvider;

impl ModelProvider for EchoProvider {
    type Error = EchoModelError;
    type Response = EchoResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let last_user = req.messages.iter().rev().find_map(|m| match m {
            ModelMessage::User(text) => Some(text.clone()),
            _ => None,
        });
        let result = match last_user {
            Some(text) => Ok(EchoResponse {
                words: format!("You asked: {text}")
                    .split(' ')
                    .map(ToString::to_string)
                    .collect(),
                usage_sent: false,
                done: false,
                sleep: None,
            }),
            None => Err(EchoModelError(ErrorKind::Other)),
        };
        ready(result)
    }
}

#[tokio::test]
async fn test_echo_provider_streams_events() {
    let provider = EchoProvider;
    let req = ModelRequest {
        messages: vec![
            ModelMessage::System("Be brief.".to_owned()),
            ModelMessage::User("weather in Paris".to_owned()),
        ],
        tools: vec![],
    };
    let resp = provider.send_request(&req).await.unwrap();
    let mut resp = pin!(resp);

    let mut text = String::new();
    let mut usage = None;
    let mut finish = None;
    while let Some(event) =
        poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await.unwrap()
    {
        match event {
            ModelResponseEvent::MessageDelta(delta) => text.push_str(&delta),
            ModelResponseEvent::Usage(u) => usage = Some(u),
            ModelResponseEvent::Completed(reason) => finish = Some(reason),
            ModelResponseEvent::ToolCall(_) => unreachable!(),
        }
    }

    assert_eq!(text, "You asked: weather in Paris");
    assert_eq!(usage.unwrap().total_tokens, 2);
    assert_eq!(finish, Some(ModelFinishReason::Stop));
}

#[tokio::test]
async fn test_echo_provider_requires_user_message() {
    let provider = EchoProvider;
    let req = ModelRequest {
        messages: vec![ModelMessage::System("Be brief.".to_owned())],
        tools: vec![],
    };
    let err = provider.send_request(&req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
}
