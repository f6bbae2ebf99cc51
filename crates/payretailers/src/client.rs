//! PayRetailers API client.
//!
//! Every operation goes through the [`Dispatcher`]. Transaction creation adds
//! the H2H landing-info enrichment on top: for live transactions paid with a
//! method tag, the client fetches landing info and attaches it under the
//! `"h2h"` key. Enrichment never fails the call. A failed fetch blacklists the
//! tag for 24 hours so later transactions skip the extra request.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::config::{ClientConfig, Environment};
use crate::constants::{BLACKLIST_DURATION, H2H_RESPONSE_KEY, LANDING_INFO_PATH};
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::h2h_cache::{unix_now, H2hBlacklist};
use crate::models::{Country, Currency, PaywallRequest, PayoutRequest, TransactionRequest};
use crate::transport::{HttpMethod, ReqwestTransport, Transport};

/// Client for the PayRetailers payments API.
///
/// Owns its HTTP connection pool; the pool is released when the client is
/// dropped or [`close`](Self::close)d.
pub struct PayRetailersClient<T: Transport = ReqwestTransport> {
    dispatcher: Dispatcher<T>,
    environment: Environment,
    blacklist: Mutex<H2hBlacklist>,
}

impl PayRetailersClient<ReqwestTransport> {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self::with_transport(ReqwestTransport::new()?, config))
    }

    /// Build a client from `PAYRETAILERS_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }
}

impl<T: Transport> PayRetailersClient<T> {
    /// Create a client over a custom transport. Loads the H2H blacklist from
    /// `config.h2h_cache_path`.
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        let blacklist = H2hBlacklist::open(&config.h2h_cache_path);
        tracing::debug!(
            environment = ?config.environment,
            cache = %config.h2h_cache_path.display(),
            blacklisted = blacklist.len(),
            "PayRetailers client ready"
        );

        Self {
            dispatcher: Dispatcher::new(transport, &config),
            environment: config.environment,
            blacklist: Mutex::new(blacklist),
        }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn is_sandbox(&self) -> bool {
        self.environment.is_sandbox()
    }

    pub fn base_url(&self) -> &str {
        self.dispatcher.base_url()
    }

    pub fn transport(&self) -> &T {
        self.dispatcher.transport()
    }

    /// Expiry (Unix seconds) of the blacklist entry for `tag`, if any.
    pub fn blacklist_expiry(&self, tag: &str) -> Option<f64> {
        self.lock_blacklist().expiry(tag)
    }

    fn lock_blacklist(&self) -> MutexGuard<'_, H2hBlacklist> {
        self.blacklist.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write unsaved blacklist changes on a blocking thread. The lock is
    /// released before the write starts.
    async fn persist_blacklist(&self) {
        let pending = self.lock_blacklist().take_pending();
        let Some(pending) = pending else {
            return;
        };
        if let Err(e) = tokio::task::spawn_blocking(move || pending.save()).await {
            tracing::warn!(error = %e, "H2H blacklist write task failed");
        }
    }

    /// Release the connection pool.
    pub fn close(self) {
        tracing::debug!("closing PayRetailers client");
    }

    /// Create a transaction, enriching it with landing info when possible.
    ///
    /// Only errors from the creation call itself are returned. A `FAILED`
    /// status in the body is logged and returned as-is.
    pub async fn create_transaction(&self, request: &TransactionRequest) -> Result<Value> {
        let payload = serde_json::to_value(request)?;
        let mut response = self
            .dispatcher
            .send(HttpMethod::Post, "transactions", Some(&payload), &[])
            .await?;

        let status = response
            .get("status")
            .and_then(Value::as_str)
            .map(str::to_ascii_uppercase);

        let is_live = match status.as_deref() {
            Some("MISSING_INFO") => {
                tracing::warn!(
                    "Transaction created with status 'MISSING_INFO'. \
                     The payer data provided was insufficient or invalid. \
                     Please provide full customer details (first_name, last_name, personal_id) \
                     to increase conversion rates."
                );
                true
            }
            Some("PENDING") => true,
            Some("FAILED") => {
                let reason = response.get("message").cloned().unwrap_or_default();
                tracing::error!(status = "FAILED", reason = %reason, "Transaction failed creation");
                false
            }
            _ => false,
        };

        let Some(tag) = request.payment_method_tag() else {
            return Ok(response);
        };

        if self.is_sandbox() {
            tracing::warn!("H2H Integration (Get Landing Info) skipped in Sandbox mode.");
        } else if is_live {
            self.enrich_with_landing_info(&mut response, tag).await;
        }

        Ok(response)
    }

    async fn enrich_with_landing_info(&self, response: &mut Value, tag: &str) {
        let blacklisted = self.lock_blacklist().is_blacklisted(tag, unix_now());
        self.persist_blacklist().await;
        if blacklisted {
            tracing::debug!(
                payment_method = %tag,
                "Payment method is in H2H blacklist. Skipping landing info."
            );
            return;
        }

        let Some(transaction_id) = transaction_id(response) else {
            return;
        };

        match self.get_landing_info(&transaction_id).await {
            Ok(Some(info)) if has_content(&info) => {
                if let Some(fields) = response.as_object_mut() {
                    fields.insert(H2H_RESPONSE_KEY.to_string(), info);
                }
                self.lock_blacklist().clear(tag);
                self.persist_blacklist().await;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    payment_method = %tag,
                    error = %e,
                    "Failed to fetch Landing Info. Adding to blacklist."
                );
                self.lock_blacklist()
                    .blacklist(tag, unix_now(), BLACKLIST_DURATION);
                self.persist_blacklist().await;
            }
        }
    }

    /// Landing info for an H2H transaction. Not available in sandbox, where
    /// this returns `Ok(None)` without a request.
    pub async fn get_landing_info(&self, transaction_id: &str) -> Result<Option<Value>> {
        if self.is_sandbox() {
            tracing::warn!("get_landing_info is NOT available in Sandbox environment.");
            return Ok(None);
        }

        let path = format!(
            "{LANDING_INFO_PATH}/{}",
            urlencoding::encode(transaction_id)
        );
        self.dispatcher
            .send(HttpMethod::Get, &path, None, &[])
            .await
            .map(Some)
    }

    pub async fn create_paywall(&self, request: &PaywallRequest) -> Result<Value> {
        let payload = serde_json::to_value(request)?;
        self.dispatcher
            .send(HttpMethod::Post, "paywalls", Some(&payload), &[])
            .await
    }

    pub async fn create_payout(&self, request: &PayoutRequest) -> Result<Value> {
        let payload = serde_json::to_value(request)?;
        self.dispatcher
            .send(HttpMethod::Post, "payout", Some(&payload), &[])
            .await
    }

    pub async fn get_transaction(&self, uid: &str) -> Result<Value> {
        let path = format!("transactions/{}", urlencoding::encode(uid));
        self.dispatcher.send(HttpMethod::Get, &path, None, &[]).await
    }

    pub async fn get_transaction_by_tracking_id(&self, tracking_id: &str) -> Result<Value> {
        self.dispatcher
            .send(HttpMethod::Get, "transactions", None, &[("trackingId", tracking_id)])
            .await
    }

    pub async fn get_paywall_by_uid(&self, uid: &str) -> Result<Value> {
        let path = format!("paywalls/{}", urlencoding::encode(uid));
        self.dispatcher.send(HttpMethod::Get, &path, None, &[]).await
    }

    pub async fn get_paywall_by_tracking_id(&self, tracking_id: &str) -> Result<Value> {
        self.dispatcher
            .send(HttpMethod::Get, "paywalls", None, &[("trackingId", tracking_id)])
            .await
    }

    /// Payout details by the merchant's external reference.
    pub async fn get_payout_details(&self, external_reference: &str) -> Result<Value> {
        let path = format!("payout/{}", urlencoding::encode(external_reference));
        self.dispatcher.send(HttpMethod::Get, &path, None, &[]).await
    }

    /// Available payment methods. Filters that are `None` are not sent.
    pub async fn get_payment_methods(
        &self,
        country: Option<Country>,
        currency: Option<Currency>,
        channel: Option<&str>,
    ) -> Result<Value> {
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(country) = country {
            query.push(("country", country.as_str()));
        }
        if let Some(currency) = currency {
            query.push(("currency", currency.as_str()));
        }
        if let Some(channel) = channel.filter(|c| !c.is_empty()) {
            query.push(("channel", channel));
        }

        self.dispatcher
            .send(HttpMethod::Get, "paymentMethods", None, &query)
            .await
    }

    pub async fn get_shop_balance(&self) -> Result<Value> {
        if self.is_sandbox() {
            tracing::warn!("get_shop_balance is NOT available in Sandbox environment.");
        }
        self.dispatcher
            .send(HttpMethod::Get, "shop-balance", None, &[])
            .await
    }
}

/// Transaction id from `id`, falling back to `uid`.
fn transaction_id(response: &Value) -> Option<String> {
    ["id", "uid"].iter().find_map(|key| match response.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transaction_id_prefers_id_then_uid() {
        assert_eq!(
            transaction_id(&json!({"id": "a", "uid": "b"})).as_deref(),
            Some("a")
        );
        assert_eq!(
            transaction_id(&json!({"id": "", "uid": "b"})).as_deref(),
            Some("b")
        );
        assert_eq!(transaction_id(&json!({"id": 42})).as_deref(), Some("42"));
        assert_eq!(transaction_id(&json!({"status": "PENDING"})), None);
    }

    #[test]
    fn test_has_content() {
        assert!(has_content(&json!({"url": "x"})));
        assert!(!has_content(&json!({})));
        assert!(!has_content(&Value::Null));
        assert!(!has_content(&json!("")));
        assert!(has_content(&json!([1])));
    }
}
