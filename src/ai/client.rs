//! HTTP plumbing shared by all provider adapters
//!
//! Adapters build an [`HttpRequest`]; [`AiClient`] sends it through a
//! [`Transport`], retries transient failures once, and maps HTTP status codes
//! onto [`AnalysisError`]. Uses ureq (sync HTTP), no async runtime needed.

use crate::ai::{AiResult, AnalysisError};
use crate::credentials::Secret;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Header value that may carry a credential
#[derive(Debug, Clone)]
pub enum HeaderValue {
    Plain(String),
    Secret(Secret),
}

impl HeaderValue {
    pub fn as_str(&self) -> &str {
        match self {
            HeaderValue::Plain(v) => v,
            HeaderValue::Secret(s) => s.expose(),
        }
    }
}

/// A JSON POST to a provider endpoint
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, HeaderValue)>,
    pub body: String,
}

impl HttpRequest {
    pub fn post_json<T: Serialize>(url: impl Into<String>, body: &T) -> AiResult<Self> {
        let body = serde_json::to_string(body).map_err(|e| {
            AnalysisError::InvalidConfig(format!("cannot encode request body: {}", e))
        })?;
        Ok(Self {
            url: url.into(),
            headers: Vec::new(),
            body,
        })
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .push((name.into(), HeaderValue::Plain(value.into())));
        self
    }

    pub fn secret_header(mut self, name: impl Into<String>, value: Secret) -> Self {
        self.headers.push((name.into(), HeaderValue::Secret(value)));
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Secret values attached to this request, for scrubbing error text.
    ///
    /// Scheme-prefixed values (`Bearer <token>`) also yield the bare token.
    pub fn secrets(&self) -> impl Iterator<Item = &str> {
        self.headers
            .iter()
            .filter_map(|(_, v)| match v {
                HeaderValue::Secret(s) if !s.is_empty() => Some(s.expose()),
                _ => None,
            })
            .flat_map(|value| {
                let token = value
                    .split_once(' ')
                    .map(|(_, token)| token.trim())
                    .filter(|token| !token.is_empty());
                std::iter::once(value).chain(token)
            })
    }
}

/// Raw status and body; non-2xx statuses are not errors at this layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Timeouts and dropped connections are worth one more attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Timeout | TransportError::Connection(_))
    }
}

/// One synchronous HTTP exchange
pub trait Transport {
    fn send(&self, request: &HttpRequest, timeout: Duration) -> Result<HttpResponse, TransportError>;
}

/// Production transport over ureq
#[derive(Debug, Default, Clone, Copy)]
pub struct UreqTransport;

fn make_agent(timeout: Duration) -> ureq::Agent {
    ureq::config::Config::builder()
        .http_status_as_error(false) // Status codes are classified by AiClient
        .timeout_global(Some(timeout))
        .build()
        .new_agent()
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest, timeout: Duration) -> Result<HttpResponse, TransportError> {
        let agent = make_agent(timeout);
        let mut req = agent
            .post(request.url.as_str())
            .header("Content-Type", "application/json");
        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        let response = req
            .send(request.body.as_bytes())
            .map_err(classify_ureq_error)?;

        let status = response.status().as_u16();
        let body = response
            .into_body()
            .read_to_string()
            .map_err(classify_ureq_error)?;

        Ok(HttpResponse { status, body })
    }
}

fn classify_ureq_error(error: ureq::Error) -> TransportError {
    match error {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        ureq::Error::Io(e) if e.kind() == std::io::ErrorKind::TimedOut => TransportError::Timeout,
        ureq::Error::Io(e) => TransportError::Connection(e.to_string()),
        other => TransportError::Other(other.to_string()),
    }
}

/// Bounded retry for transient failures (network, 429, 5xx)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff: Duration::from_millis(500),
        }
    }
}

pub fn should_retry_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Unified LLM client: transport plus retry and status classification
pub struct AiClient {
    transport: Box<dyn Transport>,
    retry: RetryPolicy,
}

impl Default for AiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl AiClient {
    pub fn new() -> Self {
        Self::with_transport(Box::new(UreqTransport), RetryPolicy::default())
    }

    pub fn with_transport(transport: Box<dyn Transport>, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    /// Send a request and return the body of a 2xx response.
    ///
    /// 401/403 and other 4xx (except 429) fail immediately. 429, 5xx and
    /// transient network failures are retried up to `max_retries` times with
    /// a fixed backoff; the thread sleeps for the backoff.
    pub fn execute(&self, request: &HttpRequest, timeout: Duration) -> AiResult<String> {
        let mut attempt = 0;
        loop {
            let failure = match self.transport.send(request, timeout) {
                Ok(response) if (200..300).contains(&response.status) => {
                    debug!("HTTP {} from {}", response.status, request.url);
                    return Ok(response.body);
                }
                Ok(response) => {
                    let error = classify_status(response.status, &response.body, request);
                    if !should_retry_status(response.status) {
                        return Err(error);
                    }
                    error
                }
                Err(e) if e.is_transient() => match e {
                    TransportError::Timeout => AnalysisError::Timeout {
                        seconds: timeout.as_secs(),
                    },
                    other => AnalysisError::ProviderUnavailable {
                        reason: redact(&other.to_string(), request),
                    },
                },
                Err(e) => {
                    return Err(AnalysisError::ProviderUnavailable {
                        reason: redact(&e.to_string(), request),
                    })
                }
            };

            if attempt >= self.retry.max_retries {
                return Err(failure);
            }
            attempt += 1;
            warn!(
                "Request to {} failed ({}); retrying in {:?}",
                request.url, failure, self.retry.backoff
            );
            if !self.retry.backoff.is_zero() {
                std::thread::sleep(self.retry.backoff);
            }
        }
    }
}

/// Map a non-2xx response onto the error taxonomy
fn classify_status(status: u16, body: &str, request: &HttpRequest) -> AnalysisError {
    // Redact first: truncation can split a key
    let message = truncate_message(redact(&provider_message(body), request));
    match status {
        401 | 403 => AnalysisError::AuthenticationFailed { status, message },
        429 => AnalysisError::ProviderUnavailable {
            reason: format!("rate limited (HTTP 429): {}", message),
        },
        400..=499 => AnalysisError::InvalidRequest { status, message },
        500..=599 => AnalysisError::ProviderUnavailable {
            reason: format!("HTTP {}: {}", status, message),
        },
        _ => AnalysisError::ProviderUnavailable {
            reason: format!("unexpected HTTP {}", status),
        },
    }
}

const MAX_ERROR_MESSAGE: usize = 300;

/// Best-effort human message from a provider error body.
///
/// OpenAI-style and Anthropic-style bodies both nest it at `error.message`.
fn provider_message(body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(|m| m.as_str().map(str::to_string))
        });

    let text = from_json.unwrap_or_else(|| body.trim().to_string());
    if text.is_empty() {
        return "no error details".to_string();
    }
    text
}

fn truncate_message(text: String) -> String {
    if text.chars().count() > MAX_ERROR_MESSAGE {
        let truncated: String = text.chars().take(MAX_ERROR_MESSAGE).collect();
        return format!("{}... [truncated]", truncated);
    }
    text
}

/// Replace every secret sent with `request` by `***`
fn redact(text: &str, request: &HttpRequest) -> String {
    request
        .secrets()
        .fold(text.to_string(), |acc, secret| acc.replace(secret, "***"))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport for retry and orchestrator tests

    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    pub struct ScriptedTransport {
        replies: Rc<RefCell<VecDeque<Result<HttpResponse, TransportError>>>>,
        pub requests: Rc<RefCell<Vec<HttpRequest>>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, status: u16, body: impl Into<String>) -> Self {
            self.replies.borrow_mut().push_back(Ok(HttpResponse {
                status,
                body: body.into(),
            }));
            self
        }

        pub fn fail(self, error: TransportError) -> Self {
            self.replies.borrow_mut().push_back(Err(error));
            self
        }

        pub fn calls(&self) -> usize {
            self.requests.borrow().len()
        }

        pub fn last_request(&self) -> Option<HttpRequest> {
            self.requests.borrow().last().cloned()
        }

        pub fn client(&self) -> AiClient {
            AiClient::with_transport(
                Box::new(self.clone()),
                RetryPolicy {
                    max_retries: 1,
                    backoff: Duration::ZERO,
                },
            )
        }
    }

    impl Transport for ScriptedTransport {
        fn send(
            &self,
            request: &HttpRequest,
            _timeout: Duration,
        ) -> Result<HttpResponse, TransportError> {
            self.requests.borrow_mut().push(request.clone());
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Other("no scripted reply".into())))
        }
    }
}
