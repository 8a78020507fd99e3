use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::{is_auth_message, AppError};

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";
const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 2048;
const BACKOFF_BASE_MS: u64 = 1000;
const BACKOFF_CAP_MS: u64 = 5000;

/// Raw wire response: status plus unparsed body. Interpretation of the body
/// (including error bodies) belongs to the client, not the transport.
#[derive(Debug, Clone)]
pub struct WireResponse {
    pub status: u16,
    pub body: String,
}

/// Seam between the retry/timeout state machine and the actual network.
/// Production uses [`HttpTransport`]; tests inject stubs so the full retry
/// behavior is observable without any real traffic.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn post_chat(
        &self,
        endpoint: &str,
        api_key: &str,
        body: &Value,
    ) -> Result<WireResponse, AppError>;
}

/// reqwest-backed transport. No client-side timeout is configured here; the
/// per-call deadline is enforced by the race in [`AiService::call`].
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn post_chat(
        &self,
        endpoint: &str,
        api_key: &str,
        body: &Value,
    ) -> Result<WireResponse, AppError> {
        let response = self
            .client
            .post(endpoint)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(body)
            .send()
            .await
            .map_err(|err| AppError::Network(err.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| AppError::Network(err.to_string()))?;

        Ok(WireResponse { status, body })
    }
}

/// Per-call overrides. `retry` defaults to true; disabling it limits the
/// call to a single attempt regardless of the configured retry budget.
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub retry: bool,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            model: None,
            temperature: None,
            max_tokens: None,
            retry: true,
        }
    }
}

/// The client-side slice of the app config, captured once per call so that
/// a concurrent `reconfigure` never affects a call already in flight.
#[derive(Debug, Clone)]
struct ClientConfig {
    api_base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
    max_retries: u32,
}

impl ClientConfig {
    fn from_app(config: &AppConfig) -> Self {
        Self {
            api_base_url: config.api_base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.api_model.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
            max_retries: config.max_retries,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}{CHAT_COMPLETIONS_PATH}",
            self.api_base_url.trim_end_matches('/')
        )
    }
}

/// Backoff before retry attempt `attempt` (2-based): 1s, 2s, 4s, capped at 5s.
fn backoff_delay(attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(2).min(16);
    Duration::from_millis((BACKOFF_BASE_MS << exp).min(BACKOFF_CAP_MS))
}

/// Client for an OpenAI-compatible chat-completions endpoint: per-call
/// config snapshot, timeout race, and sequential retry with capped
/// exponential backoff.
pub struct AiService {
    config: RwLock<ClientConfig>,
    transport: Arc<dyn ChatTransport>,
}

impl AiService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_transport(config, Arc::new(HttpTransport::new()))
    }

    pub fn with_transport(config: &AppConfig, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            config: RwLock::new(ClientConfig::from_app(config)),
            transport,
        }
    }

    /// Replace the client configuration wholesale. Takes effect for all
    /// subsequent calls; calls already in flight keep their snapshot.
    pub fn reconfigure(&self, config: &AppConfig) {
        let mut guard = self
            .config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = ClientConfig::from_app(config);
    }

    /// Send one prompt and return the model's text.
    ///
    /// Fails fast with `AppError::Config` when no key or endpoint is
    /// configured. Transient failures are retried up to the configured
    /// budget with backoff; auth failures abort immediately. A timed-out
    /// request is abandoned, not cancelled: the transport may still
    /// complete it after this call has already returned `Timeout`.
    pub async fn call(&self, prompt: &str, options: CallOptions) -> Result<String, AppError> {
        let config = self
            .config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        if config.api_key.is_empty() {
            return Err(AppError::Config("API key is not configured".to_string()));
        }
        if config.api_base_url.is_empty() {
            return Err(AppError::Config(
                "API endpoint is not configured".to_string(),
            ));
        }

        let endpoint = config.endpoint();
        let body = json!({
            "model": options.model.as_deref().unwrap_or(&config.model),
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            "max_tokens": options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });

        let max_attempts = if options.retry {
            config.max_retries + 1
        } else {
            1
        };

        let mut attempt = 1;
        loop {
            if attempt > 1 {
                let delay = backoff_delay(attempt);
                debug!(
                    "retrying chat completion ({attempt}/{max_attempts}) after {}ms",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let err = match self.attempt(&config, &endpoint, &body).await {
                Ok(text) => return Ok(text),
                Err(err) => err,
            };

            warn!("chat completion attempt {attempt}/{max_attempts} failed: {err}");

            if attempt >= max_attempts || !err.is_retryable() {
                return Err(err);
            }
            attempt += 1;
        }
    }

    /// One request raced against the configured deadline. The request runs
    /// as a detached task so a timer win leaves it running unobserved.
    async fn attempt(
        &self,
        config: &ClientConfig,
        endpoint: &str,
        body: &Value,
    ) -> Result<String, AppError> {
        let transport = Arc::clone(&self.transport);
        let endpoint = endpoint.to_string();
        let api_key = config.api_key.clone();
        let body = body.clone();

        let mut request =
            tokio::spawn(async move { transport.post_chat(&endpoint, &api_key, &body).await });

        let response = tokio::select! {
            joined = &mut request => match joined {
                Ok(result) => result?,
                Err(err) => return Err(AppError::Network(format!("request task failed: {err}"))),
            },
            _ = tokio::time::sleep(config.timeout) => return Err(AppError::Timeout),
        };

        interpret_response(&response)
    }
}

/// Validate the wire response shape and pull out the completion text.
fn interpret_response(response: &WireResponse) -> Result<String, AppError> {
    let ok = (200..300).contains(&response.status);

    if !ok {
        let message = serde_json::from_str::<Value>(&response.body)
            .ok()
            .and_then(|body| {
                body.get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| format!("HTTP status {}", response.status));

        if response.status == 401 || is_auth_message(&message) {
            return Err(AppError::Auth(message));
        }
        return Err(AppError::Http {
            status: response.status,
            message,
        });
    }

    let body: Value = serde_json::from_str(&response.body)
        .map_err(|err| AppError::Network(format!("malformed response body: {err}")))?;

    if let Some(content) = body["choices"][0]["message"]["content"]
        .as_str()
        .filter(|content| !content.is_empty())
    {
        return Ok(content.to_string());
    }

    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        if is_auth_message(&message) {
            return Err(AppError::Auth(message));
        }
        return Err(AppError::Http {
            status: response.status,
            message,
        });
    }

    Err(AppError::EmptyResult)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn completion_body(content: &str) -> String {
        json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        })
        .to_string()
    }

    fn configured() -> AppConfig {
        AppConfig {
            api_key: "sk-test".to_string(),
            api_base_url: "https://api.example.com/v1".to_string(),
            ..AppConfig::default()
        }
    }

    /// Scripted transport: pops one canned response per call and records
    /// when each call happened (paused-clock instants).
    struct StubTransport {
        responses: Mutex<VecDeque<Result<WireResponse, AppError>>>,
        calls: Mutex<Vec<Instant>>,
    }

    impl StubTransport {
        fn new(responses: Vec<Result<WireResponse, AppError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatTransport for StubTransport {
        async fn post_chat(
            &self,
            _endpoint: &str,
            _api_key: &str,
            _body: &Value,
        ) -> Result<WireResponse, AppError> {
            self.calls.lock().unwrap().push(Instant::now());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AppError::Network("stub exhausted".to_string())))
        }
    }

    /// Transport that never completes; only the timeout can win.
    struct HangingTransport;

    #[async_trait]
    impl ChatTransport for HangingTransport {
        async fn post_chat(
            &self,
            _endpoint: &str,
            _api_key: &str,
            _body: &Value,
        ) -> Result<WireResponse, AppError> {
            std::future::pending().await
        }
    }

    #[test]
    fn backoff_doubles_and_caps_at_five_seconds() {
        assert_eq!(backoff_delay(2), Duration::from_millis(1000));
        assert_eq!(backoff_delay(3), Duration::from_millis(2000));
        assert_eq!(backoff_delay(4), Duration::from_millis(4000));
        assert_eq!(backoff_delay(5), Duration::from_millis(5000));
        assert_eq!(backoff_delay(50), Duration::from_millis(5000));
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let mut config = configured();
        config.api_base_url = "https://api.example.com/v1/".to_string();
        let client = ClientConfig::from_app(&config);
        assert_eq!(client.endpoint(), "https://api.example.com/v1/chat/completions");
    }

    #[tokio::test]
    async fn missing_key_fails_without_any_network_call() {
        let transport = StubTransport::new(vec![]);
        let mut config = configured();
        config.api_key = String::new();
        let service = AiService::with_transport(&config, transport.clone());

        let err = service.call("hi", CallOptions::default()).await.unwrap_err();

        assert!(matches!(err, AppError::Config(_)));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_endpoint_fails_without_any_network_call() {
        let transport = StubTransport::new(vec![]);
        let mut config = configured();
        config.api_base_url = String::new();
        let service = AiService::with_transport(&config, transport.clone());

        let err = service.call("hi", CallOptions::default()).await.unwrap_err();

        assert!(matches!(err, AppError::Config(_)));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn successful_call_returns_completion_text() {
        let transport = StubTransport::new(vec![Ok(WireResponse {
            status: 200,
            body: completion_body("hello there"),
        })]);
        let service = AiService::with_transport(&configured(), transport.clone());

        let text = service.call("hi", CallOptions::default()).await.unwrap();

        assert_eq!(text, "hello there");
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn request_body_carries_prompt_and_defaults() {
        struct CapturingTransport {
            body: Mutex<Option<Value>>,
        }

        #[async_trait]
        impl ChatTransport for CapturingTransport {
            async fn post_chat(
                &self,
                _endpoint: &str,
                _api_key: &str,
                body: &Value,
            ) -> Result<WireResponse, AppError> {
                *self.body.lock().unwrap() = Some(body.clone());
                Ok(WireResponse {
                    status: 200,
                    body: completion_body("ok"),
                })
            }
        }

        let transport = Arc::new(CapturingTransport {
            body: Mutex::new(None),
        });
        let service = AiService::with_transport(&configured(), transport.clone());
        service.call("classify this", CallOptions::default()).await.unwrap();

        let body = transport.body.lock().unwrap().clone().unwrap();
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "classify this");
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["max_tokens"], 2048);
    }

    #[tokio::test(start_paused = true)]
    async fn http_500_is_retried_with_backoff_until_exhausted() {
        let failure = || {
            Ok(WireResponse {
                status: 500,
                body: "{}".to_string(),
            })
        };
        let transport = StubTransport::new(vec![failure(), failure(), failure()]);
        let service = AiService::with_transport(&configured(), transport.clone());

        let err = service.call("hi", CallOptions::default()).await.unwrap_err();

        assert!(matches!(err, AppError::Http { status: 500, .. }));
        let times = transport.call_times();
        assert_eq!(times.len(), 3);
        assert!(times[1] - times[0] >= Duration::from_millis(1000));
        assert!(times[2] - times[1] >= Duration::from_millis(2000));
        assert!(times[2] - times[1] <= Duration::from_millis(5000));
    }

    #[tokio::test]
    async fn http_401_is_never_retried() {
        let transport = StubTransport::new(vec![Ok(WireResponse {
            status: 401,
            body: r#"{"error":{"message":"Incorrect API key provided"}}"#.to_string(),
        })]);
        let service = AiService::with_transport(&configured(), transport.clone());

        let err = service.call("hi", CallOptions::default()).await.unwrap_err();

        assert!(matches!(err, AppError::Auth(_)));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_disabled_makes_a_single_attempt() {
        let transport = StubTransport::new(vec![Ok(WireResponse {
            status: 500,
            body: "{}".to_string(),
        })]);
        let service = AiService::with_transport(&configured(), transport.clone());

        let options = CallOptions {
            retry: false,
            ..CallOptions::default()
        };
        let err = service.call("hi", options).await.unwrap_err();

        assert!(matches!(err, AppError::Http { status: 500, .. }));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_then_success_recovers() {
        let transport = StubTransport::new(vec![
            Err(AppError::Network("connection reset".to_string())),
            Ok(WireResponse {
                status: 200,
                body: completion_body("recovered"),
            }),
        ]);
        let service = AiService::with_transport(&configured(), transport.clone());

        let text = service.call("hi", CallOptions::default()).await.unwrap();

        assert_eq!(text, "recovered");
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_request_times_out() {
        let service = AiService::with_transport(&configured(), Arc::new(HangingTransport));

        let options = CallOptions {
            retry: false,
            ..CallOptions::default()
        };
        let started = Instant::now();
        let err = service.call("hi", options).await.unwrap_err();

        assert!(matches!(err, AppError::Timeout));
        assert!(started.elapsed() >= Duration::from_millis(30_000));
    }

    #[test]
    fn non_2xx_uses_error_body_message() {
        let err = interpret_response(&WireResponse {
            status: 429,
            body: r#"{"error":{"message":"rate limited"}}"#.to_string(),
        })
        .unwrap_err();
        match err {
            AppError::Http { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "rate limited");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_2xx_without_json_body_uses_generic_message() {
        let err = interpret_response(&WireResponse {
            status: 503,
            body: "<html>bad gateway</html>".to_string(),
        })
        .unwrap_err();
        match err {
            AppError::Http { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "HTTP status 503");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn ok_body_with_error_field_is_surfaced() {
        let err = interpret_response(&WireResponse {
            status: 200,
            body: r#"{"error":{"message":"model overloaded"}}"#.to_string(),
        })
        .unwrap_err();
        assert!(matches!(err, AppError::Http { status: 200, .. }));
    }

    #[test]
    fn ok_body_without_content_is_empty_result() {
        let err = interpret_response(&WireResponse {
            status: 200,
            body: r#"{"choices":[]}"#.to_string(),
        })
        .unwrap_err();
        assert!(matches!(err, AppError::EmptyResult));

        let err = interpret_response(&WireResponse {
            status: 200,
            body: r#"{"choices":[{"message":{"content":""}}]}"#.to_string(),
        })
        .unwrap_err();
        assert!(matches!(err, AppError::EmptyResult));
    }

    #[tokio::test]
    async fn reconfigure_applies_to_subsequent_calls() {
        let transport = StubTransport::new(vec![]);
        let mut config = configured();
        let service = AiService::with_transport(&config, transport.clone());

        config.api_key = String::new();
        service.reconfigure(&config);

        let err = service.call("hi", CallOptions::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert_eq!(transport.call_count(), 0);
    }
}
