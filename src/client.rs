use crate::{
    config::Config,
    error::{Error, Result},
    prompt::{Prompt, SYSTEM_INSTRUCTION},
};
use reqwest::{StatusCode, blocking::Client};
use serde::{Deserialize, Serialize};
use std::{thread, time::Duration};
use tracing::{debug, trace, warn};

/// A single chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Chat model name
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// System message
    pub system: String,

    /// Rendered user prompt
    pub prompt: String,
}

impl ChatRequest {
    /// Creates a request from a structured prompt.
    #[must_use]
    pub fn new(model: impl Into<String>, temperature: f32, prompt: &Prompt) -> Self {
        Self {
            model: model.into(),
            temperature,
            system: SYSTEM_INSTRUCTION.to_string(),
            prompt: prompt.render(),
        }
    }
}

/// Token accounting reported by the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: u64,

    /// Tokens in the reply
    #[serde(default)]
    pub completion_tokens: u64,

    /// Prompt and reply together
    #[serde(default)]
    pub total_tokens: u64,
}

/// Text of a completion plus optional usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    /// Reply text
    pub text: String,

    /// Token usage, when the API reports it
    pub usage: Option<TokenUsage>,
}

impl ChatReply {
    /// Creates a reply without usage information.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// Something that can answer chat completion requests.
///
/// Every call is one round trip; retries are layered on top by
/// [`complete_with_retry`].
pub trait ChatClient {
    /// Sends one request and returns the reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Request`] if the call fails for any reason.
    fn complete(&self, request: &ChatRequest) -> Result<ChatReply>;
}

impl<C: ChatClient + ?Sized> ChatClient for Box<C> {
    fn complete(&self, request: &ChatRequest) -> Result<ChatReply> {
        (**self).complete(request)
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [WireMessage<'a>; 2],
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireReplyMessage,
}

#[derive(Deserialize)]
struct WireReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct WireErrorBody {
    error: WireError,
}

#[derive(Deserialize)]
struct WireError {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenAiClient {
    http: Client,
    endpoint: String,
    token: String,
}

impl OpenAiClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client can't be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}/chat/completions",
                config.api_base_url.trim_end_matches('/')
            ),
            token: config.token.clone(),
        })
    }
}

impl ChatClient for OpenAiClient {
    fn complete(&self, request: &ChatRequest) -> Result<ChatReply> {
        let body = WireRequest {
            model: &request.model,
            temperature: request.temperature,
            messages: [
                WireMessage {
                    role: "system",
                    content: &request.system,
                },
                WireMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
        };

        trace!("POST {} ({} prompt chars)", self.endpoint, request.prompt.len());

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&body)
            .send()?;

        let status = response.status();
        let text = response.text()?;

        if !status.is_success() {
            return Err(Error::request(api_error_message(status, &text)));
        }

        parse_reply(&text)
    }
}

/// Decodes a successful response body.
fn parse_reply(body: &str) -> Result<ChatReply> {
    let response: WireResponse = serde_json::from_str(body)
        .map_err(|e| Error::request(format!("malformed response: {e}")))?;

    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| Error::request("response contained no message content"))?;

    Ok(ChatReply {
        text,
        usage: response.usage,
    })
}

/// Builds a readable message from an error response.
fn api_error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<WireErrorBody>(body) {
        Ok(WireErrorBody { error }) => match error.code {
            Some(code) if !code.is_null() => format!("{status} ({code}): {}", error.message),
            _ => format!("{status}: {}", error.message),
        },
        Err(_) => status.to_string(),
    }
}

/// How often and how patiently a failed completion is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure
    pub max_retries: u32,

    /// Pause between attempts
    pub delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Creates the policy configured for a run.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_retries, config.retry_delay)
    }

    /// Total number of attempts, first one included.
    #[must_use]
    pub const fn max_attempts(self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::ZERO)
    }
}

/// Sends a request, retrying the same request on failure.
///
/// Failed attempts are logged with `warn!`.
///
/// # Errors
///
/// Returns [`Error::Completion`] carrying the last failure once
/// `policy.max_attempts()` attempts have failed.
pub fn complete_with_retry<C: ChatClient + ?Sized>(
    client: &C,
    request: &ChatRequest,
    policy: RetryPolicy,
) -> Result<ChatReply> {
    complete_with_retry_notify(client, request, policy, |attempt, attempts, err| {
        warn!("Completion attempt {attempt}/{attempts} failed: {err}");
    })
}

/// Like [`complete_with_retry`], but hands every failed attempt to
/// `on_failure(attempt, max_attempts, error)` instead of logging it.
///
/// # Errors
///
/// Returns [`Error::Completion`] carrying the last failure once
/// `policy.max_attempts()` attempts have failed.
pub fn complete_with_retry_notify<C, F>(
    client: &C,
    request: &ChatRequest,
    policy: RetryPolicy,
    mut on_failure: F,
) -> Result<ChatReply>
where
    C: ChatClient + ?Sized,
    F: FnMut(u32, u32, &Error),
{
    let attempts = policy.max_attempts();
    let mut last_error = None;

    for attempt in 1..=attempts {
        match client.complete(request) {
            Ok(reply) => {
                if attempt > 1 {
                    debug!("Completion succeeded on attempt {attempt}/{attempts}");
                }
                return Ok(reply);
            }
            Err(err) => {
                on_failure(attempt, attempts, &err);
                last_error = Some(err);

                if attempt < attempts && !policy.delay.is_zero() {
                    thread::sleep(policy.delay);
                }
            }
        }
    }

    let message = match last_error {
        Some(Error::Request { message }) => message,
        Some(other) => other.to_string(),
        None => "no attempt was made".to_string(),
    };

    Err(Error::Completion { attempts, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::time::Instant;

    /// Fails a fixed number of times, then answers.
    struct FlakyClient {
        failures: u32,
        calls: Cell<u32>,
    }

    impl FlakyClient {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: Cell::new(0),
            }
        }
    }

    impl ChatClient for FlakyClient {
        fn complete(&self, _request: &ChatRequest) -> Result<ChatReply> {
            let call = self.calls.get() + 1;
            self.calls.set(call);

            if call <= self.failures {
                Err(Error::request(format!("failure {call}")))
            } else {
                Ok(ChatReply::from_text("- Line 1: ok"))
            }
        }
    }

    fn request() -> ChatRequest {
        ChatRequest::new("gpt-test", 0.0, &Prompt::new().with("body", "hello"))
    }

    #[test]
    fn test_succeeds_after_three_failures() {
        let client = FlakyClient::new(3);
        let reply = complete_with_retry(&client, &request(), RetryPolicy::default()).unwrap();

        assert_eq!(reply.text, "- Line 1: ok");
        assert_eq!(client.calls.get(), 4);
    }

    #[test]
    fn test_fails_after_retries_exhausted() {
        let client = FlakyClient::new(5);
        let err = complete_with_retry(&client, &request(), RetryPolicy::default()).unwrap_err();

        assert!(err.is_completion());
        assert_eq!(client.calls.get(), 4);

        match err {
            Error::Completion { attempts, message } => {
                assert_eq!(attempts, 4);
                assert_eq!(message, "failure 4");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_no_retries() {
        let client = FlakyClient::new(1);
        let result = complete_with_retry(&client, &request(), RetryPolicy::new(0, Duration::ZERO));

        assert!(result.is_err());
        assert_eq!(client.calls.get(), 1);
    }

    #[test]
    fn test_retry_delay_between_attempts() {
        // records when each attempt arrives and always fails
        struct TimedClient {
            calls: RefCell<Vec<Instant>>,
        }

        impl ChatClient for TimedClient {
            fn complete(&self, _request: &ChatRequest) -> Result<ChatReply> {
                self.calls.borrow_mut().push(Instant::now());
                Err(Error::request("429 Too Many Requests"))
            }
        }

        let client = TimedClient {
            calls: RefCell::new(Vec::new()),
        };
        let delay = Duration::from_millis(40);

        let err = complete_with_retry(&client, &request(), RetryPolicy::new(2, delay)).unwrap_err();
        assert!(err.is_completion());

        let calls = client.calls.borrow();
        assert_eq!(calls.len(), 3);
        for pair in calls.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= delay);
        }
    }

    #[test]
    fn test_notify_sees_every_failed_attempt() {
        let client = FlakyClient::new(2);
        let mut failures = Vec::new();

        let reply = complete_with_retry_notify(
            &client,
            &request(),
            RetryPolicy::default(),
            |attempt, attempts, err| failures.push((attempt, attempts, err.to_string())),
        )
        .unwrap();

        assert_eq!(reply.text, "- Line 1: ok");
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].0, 1);
        assert_eq!(failures[1].1, 4);
        assert!(failures[1].2.contains("failure 2"));
    }

    #[test]
    fn test_request_carries_system_and_prompt() {
        let prompt = Prompt::new().with("a", "first").with("b", "second");
        let request = ChatRequest::new("gpt-test", 0.3, &prompt);

        assert_eq!(request.prompt, "first\n\nsecond");
        assert_eq!(request.system, SYSTEM_INSTRUCTION);
    }

    #[test]
    fn test_parse_reply() {
        let body = r#"{
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "- Line 1: hi"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;

        let reply = parse_reply(body).unwrap();
        assert_eq!(reply.text, "- Line 1: hi");
        assert_eq!(reply.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_parse_reply_without_choices() {
        let err = parse_reply(r#"{"choices": []}"#).unwrap_err();
        assert!(err.to_string().contains("no message content"));

        let err = parse_reply("not json").unwrap_err();
        assert!(err.to_string().contains("malformed response"));
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error", "code": "invalid_api_key"}}"#;
        let message = api_error_message(StatusCode::UNAUTHORIZED, body);

        assert!(message.contains("401"));
        assert!(message.contains("invalid_api_key"));
        assert!(message.contains("Incorrect API key provided"));

        let message = api_error_message(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(message.contains("502"));
    }
}
