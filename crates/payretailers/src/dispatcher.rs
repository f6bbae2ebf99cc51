//! Request dispatcher: one logical API call with bounded retries.
//!
//! Transport failures and 5xx responses are retried on the policy's schedule.
//! 4xx responses end the loop at once. Whatever comes out of the loop is
//! normalized to parsed JSON or a [`PayRetailersError`].

use serde_json::Value;

use crate::config::{ClientConfig, RetryPolicy};
use crate::constants::SUBSCRIPTION_KEY_HEADER;
use crate::error::{classify, ErrorDetail, PayRetailersError, Result};
use crate::transport::{ApiRequest, ApiResponse, HttpMethod, Transport, TransportError};

pub struct Dispatcher<T: Transport> {
    transport: T,
    base_url: String,
    headers: Vec<(String, String)>,
    retry: RetryPolicy,
}

impl<T: Transport> Dispatcher<T> {
    /// Build a dispatcher for the configured environment. The Basic token is
    /// computed once here.
    pub fn new(transport: T, config: &ClientConfig) -> Self {
        let headers = vec![
            ("accept".to_string(), "application/json".to_string()),
            ("content-type".to_string(), "application/json".to_string()),
            (
                SUBSCRIPTION_KEY_HEADER.to_string(),
                config.credentials.subscription_key.clone(),
            ),
            (
                "authorization".to_string(),
                config.credentials.basic_auth_header(),
            ),
        ];

        Self {
            transport,
            base_url: config.environment.base_url().to_string(),
            headers,
            retry: config.retry.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Execute `method path` and return the parsed JSON body.
    pub async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        query: &[(&str, &str)],
    ) -> Result<Value> {
        let request = ApiRequest {
            method,
            url: format!("{}{}", self.base_url, path),
            headers: self.headers.clone(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.cloned(),
        };

        tracing::debug!(method = %method, url = %request.url, "sending request");
        if let Some(payload) = &request.body {
            tracing::debug!(payload = %payload, "request payload");
        }

        let response = self.execute_with_retry(&request).await?;

        tracing::info!(status = response.status, "response status");
        tracing::info!(body = %response.body, "response body");

        if !response.is_success() {
            return Err(error_from_response(&response));
        }

        parse_success_body(&response)
    }

    /// Run the retry loop. Returns the last response obtained, or a
    /// `Connection` error when the final attempt produced none.
    async fn execute_with_retry(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let attempts = self.retry.attempts();
        let mut last: Option<ApiResponse> = None;

        for attempt in 1..=attempts {
            let outcome = self.transport.execute(request).await;
            let exhausted = attempt == attempts;

            match outcome {
                Ok(response) if response.is_server_error() => {
                    tracing::info!(attempt, status = response.status, body = %response.body, "server error response");
                    if exhausted {
                        tracing::error!(
                            url = %request.url,
                            status = response.status,
                            attempts,
                            "request failed with server error after all attempts"
                        );
                        last = Some(response);
                        break;
                    }
                    self.back_off(attempt, &format!("HTTP {}", response.status))
                        .await;
                    last = Some(response);
                }
                Ok(response) => {
                    last = Some(response);
                    break;
                }
                Err(e) => {
                    if exhausted {
                        tracing::error!(
                            url = %request.url,
                            attempts,
                            error = %e,
                            "request failed after all attempts due to connection error"
                        );
                        return Err(connection_error(&e));
                    }
                    self.back_off(attempt, &e.to_string()).await;
                }
            }
        }

        last.ok_or_else(|| {
            PayRetailersError::connection(
                "No response received from PayRetailers API after all attempts.",
            )
        })
    }

    async fn back_off(&self, attempt: u32, reason: &str) {
        let delay = self.retry.delay_for(attempt);
        tracing::warn!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            reason = %reason,
            "retrying PayRetailers API request"
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

fn connection_error(e: &TransportError) -> PayRetailersError {
    PayRetailersError::connection(format!("PayRetailers API Unreachable: {e}"))
}

/// Build the typed error for a response with status >= 400.
///
/// `code`/`error_code` and `message`/`description` are read from a JSON body;
/// otherwise the status number and raw body text stand in.
pub(crate) fn error_from_response(response: &ApiResponse) -> PayRetailersError {
    let parsed = serde_json::from_str::<Value>(&response.body).ok();
    let field = |names: &[&str]| -> Option<String> {
        let obj = parsed.as_ref()?.as_object()?;
        names.iter().find_map(|name| match obj.get(*name)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    };

    let code = field(&["code", "error_code"]).unwrap_or_else(|| response.status.to_string());
    let message = field(&["message", "description"]).unwrap_or_else(|| response.body.clone());

    tracing::error!(code = %code, message = %message, "API error");

    if response.status == 401 {
        return PayRetailersError::Authentication(
            ErrorDetail::new(format!("Authentication failed: {message}"))
                .with_code(code)
                .with_status(response.status),
        );
    }

    classify(&code, &message, Some(response.status))
}

fn parse_success_body(response: &ApiResponse) -> Result<Value> {
    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&response.body).map_err(|e| {
        PayRetailersError::Api(
            ErrorDetail::new(format!("invalid JSON in response body: {e}"))
                .with_status(response.status),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, Environment};
    use crate::error::ErrorKind;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned outcomes and records every request it sees.
    struct Scripted {
        outcomes: Mutex<VecDeque<std::result::Result<ApiResponse, TransportError>>>,
        seen: Mutex<Vec<ApiRequest>>,
    }

    impl Scripted {
        fn new(outcomes: Vec<std::result::Result<ApiResponse, TransportError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    impl Transport for Scripted {
        async fn execute(
            &self,
            request: &ApiRequest,
        ) -> std::result::Result<ApiResponse, TransportError> {
            self.seen.lock().unwrap().push(request.clone());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Connect("script exhausted".into())))
        }
    }

    fn dispatcher(outcomes: Vec<std::result::Result<ApiResponse, TransportError>>) -> Dispatcher<Scripted> {
        let config = ClientConfig::new(
            Credentials::new("shop", "secret", "sub-key"),
            Environment::Sandbox,
        )
        .with_retry(RetryPolicy::immediate(3));
        Dispatcher::new(Scripted::new(outcomes), &config)
    }

    fn ok(status: u16, body: &str) -> std::result::Result<ApiResponse, TransportError> {
        Ok(ApiResponse::new(status, body))
    }

    fn refused() -> std::result::Result<ApiResponse, TransportError> {
        Err(TransportError::Connect("connection refused".into()))
    }

    #[tokio::test]
    async fn test_success_returns_parsed_body() {
        let d = dispatcher(vec![ok(200, r#"{"uid":"abc","status":"PENDING"}"#)]);
        let body = d.send(HttpMethod::Get, "transactions/abc", None, &[]).await.unwrap();
        assert_eq!(body["uid"], "abc");
        assert_eq!(d.transport().calls(), 1);
    }

    #[tokio::test]
    async fn test_request_carries_headers_url_and_query() {
        let d = dispatcher(vec![ok(200, "{}")]);
        d.send(HttpMethod::Get, "paywalls", None, &[("trackingId", "t-1")])
            .await
            .unwrap();

        let seen = d.transport().seen.lock().unwrap();
        let req = &seen[0];
        assert_eq!(req.url, "https://api-sandbox.payretailers.com/payments/v2/paywalls");
        assert_eq!(req.query, vec![("trackingId".to_string(), "t-1".to_string())]);
        assert_eq!(req.header("accept"), Some("application/json"));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("Ocp-Apim-Subscription-Key"), Some("sub-key"));
        assert_eq!(req.header("authorization"), Some("Basic c2hvcDpzZWNyZXQ="));
    }

    #[tokio::test]
    async fn test_post_sends_body() {
        let d = dispatcher(vec![ok(201, r#"{"id":"1"}"#)]);
        let payload = serde_json::json!({"amount": "1000"});
        d.send(HttpMethod::Post, "transactions", Some(&payload), &[])
            .await
            .unwrap();
        let seen = d.transport().seen.lock().unwrap();
        assert_eq!(seen[0].method, HttpMethod::Post);
        assert_eq!(seen[0].body.as_ref(), Some(&payload));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let d = dispatcher(vec![
            ok(400, r#"{"code":"INVALID_AMOUNT","message":"too small"}"#),
            ok(200, "{}"),
        ]);
        let err = d.send(HttpMethod::Post, "transactions", None, &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.code(), Some("INVALID_AMOUNT"));
        assert_eq!(err.message(), "too small");
        assert_eq!(err.status(), Some(400));
        assert_eq!(d.transport().calls(), 1);
    }

    #[tokio::test]
    async fn test_401_is_authentication_regardless_of_code() {
        let d = dispatcher(vec![ok(
            401,
            r#"{"code":"PAYMENT_METHOD_NOT_ALLOWED","message":"bad key"}"#,
        )]);
        let err = d.send(HttpMethod::Get, "shop-balance", None, &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(err.status(), Some(401));
        assert!(err.message().contains("bad key"));
        assert_eq!(d.transport().calls(), 1);
    }

    #[tokio::test]
    async fn test_unstructured_error_body_uses_status_and_text() {
        let d = dispatcher(vec![ok(404, "Not Found")]);
        let err = d.send(HttpMethod::Get, "transactions/x", None, &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Api);
        assert_eq!(err.code(), Some("404"));
        assert_eq!(err.message(), "Not Found");
    }

    #[tokio::test]
    async fn test_alternate_error_fields() {
        let d = dispatcher(vec![ok(
            422,
            r#"{"error_code":"BLOCKED_BY_CUSTOMER_LIMIT_RULE","description":"limit hit"}"#,
        )]);
        let err = d.send(HttpMethod::Post, "transactions", None, &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransactionCreation);
        assert_eq!(err.message(), "limit hit");
    }

    #[tokio::test]
    async fn test_server_error_is_retried_then_succeeds() {
        let d = dispatcher(vec![ok(502, "bad gateway"), ok(200, r#"{"ok":true}"#)]);
        let body = d.send(HttpMethod::Get, "shop-balance", None, &[]).await.unwrap();
        assert_eq!(body["ok"], true);
        assert_eq!(d.transport().calls(), 2);
    }

    #[tokio::test]
    async fn test_server_error_exhausted_is_classified() {
        let d = dispatcher(vec![
            ok(500, "boom"),
            ok(503, "boom"),
            ok(500, r#"{"code":"INTERNAL","message":"still down"}"#),
        ]);
        let err = d.send(HttpMethod::Get, "shop-balance", None, &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Api);
        assert_eq!(err.code(), Some("INTERNAL"));
        assert_eq!(err.status(), Some(500));
        assert_eq!(d.transport().calls(), 3);
    }

    #[tokio::test]
    async fn test_transport_failure_on_every_attempt_is_connection_error() {
        let d = dispatcher(vec![refused(), refused(), refused(), ok(200, "{}")]);
        let err = d.send(HttpMethod::Get, "shop-balance", None, &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(err.message().contains("connection refused"));
        assert_eq!(d.transport().calls(), 3);
    }

    #[tokio::test]
    async fn test_transport_failure_then_success() {
        let d = dispatcher(vec![
            Err(TransportError::Timeout("30s".into())),
            ok(200, r#"{"balance":10}"#),
        ]);
        let body = d.send(HttpMethod::Get, "shop-balance", None, &[]).await.unwrap();
        assert_eq!(body["balance"], 10);
    }

    #[tokio::test]
    async fn test_server_error_then_transport_failure_is_connection_error() {
        let d = dispatcher(vec![ok(500, "boom"), ok(500, "boom"), refused()]);
        let err = d.send(HttpMethod::Get, "shop-balance", None, &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[tokio::test]
    async fn test_empty_success_body_is_null() {
        let d = dispatcher(vec![ok(204, "")]);
        let body = d.send(HttpMethod::Patch, "payout/ref", None, &[]).await.unwrap();
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn test_non_json_success_body_is_api_error() {
        let d = dispatcher(vec![ok(200, "<html>maintenance</html>")]);
        let err = d.send(HttpMethod::Get, "shop-balance", None, &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Api);
        assert_eq!(err.status(), Some(200));
    }

    #[tokio::test]
    async fn test_single_attempt_policy() {
        let config = ClientConfig::new(
            Credentials::new("shop", "secret", "sub"),
            Environment::Production,
        )
        .with_retry(RetryPolicy::immediate(1));
        let d = Dispatcher::new(Scripted::new(vec![refused(), ok(200, "{}")]), &config);

        let err = d.send(HttpMethod::Get, "shop-balance", None, &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert_eq!(d.transport().calls(), 1);
        assert_eq!(d.base_url(), "https://api.payretailers.com/payments/v2/");
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_sleeps_follow_policy_schedule() {
        let config = ClientConfig::new(
            Credentials::new("shop", "secret", "sub"),
            Environment::Production,
        )
        .with_retry(RetryPolicy::with_max_attempts(4));
        let d = Dispatcher::new(Scripted::new(vec![refused(); 4]), &config);

        let started = tokio::time::Instant::now();
        let err = d.send(HttpMethod::Get, "shop-balance", None, &[]).await.unwrap_err();
        let elapsed = started.elapsed();

        let schedule = config.retry.schedule();
        assert_eq!(
            schedule,
            [
                std::time::Duration::from_secs(4),
                std::time::Duration::from_secs(8),
                std::time::Duration::from_secs(10),
            ]
        );
        let expected: std::time::Duration = schedule.iter().sum();
        assert!(elapsed >= expected, "slept {elapsed:?}, expected {expected:?}");
        assert!(elapsed < expected + std::time::Duration::from_secs(1));
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert_eq!(d.transport().calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_backoff_uses_default_schedule() {
        let config = ClientConfig::new(
            Credentials::new("shop", "secret", "sub"),
            Environment::Production,
        );
        let d = Dispatcher::new(
            Scripted::new(vec![ok(503, "busy"), ok(503, "busy"), ok(200, "{}")]),
            &config,
        );

        let started = tokio::time::Instant::now();
        d.send(HttpMethod::Get, "shop-balance", None, &[]).await.unwrap();
        let elapsed = started.elapsed();

        // 4s then 8s
        assert!(elapsed >= std::time::Duration::from_secs(12));
        assert!(elapsed < std::time::Duration::from_secs(13));
    }
}
