//! Country-bound client.
//!
//! [`CountryClient`] fixes a country and its default currency, checks
//! payment-method tags before anything is sent, and fills in the defaults the
//! plain client leaves to the caller.

use std::collections::BTreeSet;

use serde_json::Value;
use tokio::sync::OnceCell;

use crate::client::PayRetailersClient;
use crate::config::{ClientConfig, Environment};
use crate::error::{PayRetailersError, Result};
use crate::models::{Country, Currency, Customer, Language, PaywallRequest, TransactionRequest};
use crate::transport::{ReqwestTransport, Transport};

/// Tags accepted by the sandbox for `country`.
pub fn sandbox_payment_methods(country: Country) -> &'static [&'static str] {
    match country {
        Country::Ar => &["ONLINE", "CASH"],
        Country::Br => &["ONLINE", "PIX", "BOLETO"],
        Country::Cl
        | Country::Co
        | Country::Cr
        | Country::Ec
        | Country::Mx
        | Country::Pe => &["ONLINE", "CREDIT_CARD", "CASH"],
        _ => &["ONLINE"],
    }
}

/// Check `tag` against `allowed` and return it owned.
pub fn validate_tag(
    tag: Option<&str>,
    allowed: &[&str],
    country: Country,
    environment: Environment,
) -> Result<String> {
    let listed = allowed.join(", ");
    let tag = tag.filter(|t| !t.is_empty());

    match (tag, environment.is_sandbox()) {
        (None, true) => Err(PayRetailersError::validation(format!(
            "Payment Method Tag is required for Sandbox. Available tags for {country}: {listed}"
        ))),
        (None, false) => Err(PayRetailersError::validation(format!(
            "Payment Method Tag is required. Active methods found for {country}: {listed}"
        ))),
        (Some(tag), true) if !allowed.contains(&tag) => Err(PayRetailersError::validation(format!(
            "Invalid Payment Method Tag '{tag}' for {country} Sandbox. Available: {listed}"
        ))),
        (Some(tag), false) if !allowed.contains(&tag) => Err(PayRetailersError::validation(format!(
            "Invalid Payment Method Tag '{tag}'. Active methods for {country} are: {listed}"
        ))),
        (Some(tag), _) => Ok(tag.to_string()),
    }
}

/// Optional payer details. The country always comes from the wrapper.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayerDetails {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub personal_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    pub device_id: Option<String>,
    pub ip: Option<String>,
}

impl PayerDetails {
    fn into_customer(self, email: String, country: Country) -> Customer {
        Customer {
            first_name: self.first_name,
            last_name: self.last_name,
            personal_id: self.personal_id,
            phone: self.phone,
            address: self.address,
            city: self.city,
            zip_code: self.zip_code,
            device_id: self.device_id,
            ip: self.ip,
            ..Customer::new(email, country)
        }
    }
}

/// Inputs for [`CountryClient::create_transaction`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionParams {
    pub amount: String,
    pub description: String,
    pub tracking_id: String,
    pub notification_url: String,
    pub customer_email: String,
    pub payer: PayerDetails,
    /// Defaults to the country's currency.
    pub currency: Option<Currency>,
    pub payment_method_tag: Option<String>,
    pub return_url: Option<String>,
    pub language: Language,
    pub test_mode: bool,
}

impl TransactionParams {
    pub fn new(
        amount: impl ToString,
        description: impl Into<String>,
        tracking_id: impl Into<String>,
        notification_url: impl Into<String>,
        customer_email: impl Into<String>,
    ) -> Self {
        Self {
            amount: amount.to_string(),
            description: description.into(),
            tracking_id: tracking_id.into(),
            notification_url: notification_url.into(),
            customer_email: customer_email.into(),
            ..Self::default()
        }
    }

    pub fn with_payer(mut self, payer: PayerDetails) -> Self {
        self.payer = payer;
        self
    }

    pub fn with_payment_method_tag(mut self, tag: impl Into<String>) -> Self {
        self.payment_method_tag = Some(tag.into());
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }
}

/// Inputs for [`CountryClient::create_paywall`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaywallParams {
    pub amount: String,
    pub description: String,
    pub tracking_id: String,
    pub notification_url: String,
    pub customer_email: String,
    pub payer: PayerDetails,
    pub currency: Option<Currency>,
    pub payment_channel_type_code: Option<String>,
    pub return_url: Option<String>,
    pub language: Language,
    pub test_mode: bool,
}

impl PaywallParams {
    pub fn new(
        amount: impl ToString,
        description: impl Into<String>,
        tracking_id: impl Into<String>,
        notification_url: impl Into<String>,
        customer_email: impl Into<String>,
    ) -> Self {
        Self {
            amount: amount.to_string(),
            description: description.into(),
            tracking_id: tracking_id.into(),
            notification_url: notification_url.into(),
            customer_email: customer_email.into(),
            ..Self::default()
        }
    }

    pub fn with_payer(mut self, payer: PayerDetails) -> Self {
        self.payer = payer;
        self
    }
}

/// A [`PayRetailersClient`] bound to one country.
pub struct CountryClient<T: Transport = ReqwestTransport> {
    client: PayRetailersClient<T>,
    country: Country,
    default_currency: Currency,
    production_tags: OnceCell<BTreeSet<String>>,
}

impl CountryClient<ReqwestTransport> {
    pub fn new(config: ClientConfig, country: Country) -> Result<Self> {
        Ok(Self::with_client(PayRetailersClient::new(config)?, country))
    }
}

impl<T: Transport> CountryClient<T> {
    pub fn with_client(client: PayRetailersClient<T>, country: Country) -> Self {
        Self {
            client,
            country,
            default_currency: country.default_currency(),
            production_tags: OnceCell::new(),
        }
    }

    pub fn country(&self) -> Country {
        self.country
    }

    pub fn default_currency(&self) -> Currency {
        self.default_currency
    }

    pub fn client(&self) -> &PayRetailersClient<T> {
        &self.client
    }

    pub fn is_sandbox(&self) -> bool {
        self.client.is_sandbox()
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    /// Active tags in production, fetched on first use and kept for the
    /// lifetime of the wrapper. A failed fetch is not cached.
    async fn production_tags(&self) -> Result<&BTreeSet<String>> {
        self.production_tags
            .get_or_try_init(|| async {
                let methods = self
                    .client
                    .get_payment_methods(Some(self.country), Some(self.default_currency), None)
                    .await?;

                let tags: BTreeSet<String> = methods
                    .get("list")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .filter_map(|m| m.get("paymentMethodTag").and_then(Value::as_str))
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect();

                tracing::debug!(country = %self.country, count = tags.len(), "cached payment methods");
                Ok::<_, PayRetailersError>(tags)
            })
            .await
    }

    /// Check a payment-method tag for this country. Sandbox uses the static
    /// list; production asks the API once.
    pub async fn validate_payment_method_tag(&self, tag: Option<&str>) -> Result<String> {
        let environment = self.client.environment();
        if environment.is_sandbox() {
            return validate_tag(tag, sandbox_payment_methods(self.country), self.country, environment);
        }

        let tags = self.production_tags().await?;
        let allowed: Vec<&str> = tags.iter().map(String::as_str).collect();
        validate_tag(tag, &allowed, self.country, environment)
    }

    pub async fn create_transaction(&self, params: TransactionParams) -> Result<Value> {
        let customer = params.payer.into_customer(params.customer_email, self.country);
        if !customer.is_complete() {
            tracing::warn!(
                "Creating transaction with missing Customer info (first_name, last_name, or personal_id). \
                 Status 'missing_info' expected. Consider providing these fields to increase conversion."
            );
        }

        let tag = self
            .validate_payment_method_tag(params.payment_method_tag.as_deref())
            .await?;

        let currency = params.currency.unwrap_or(self.default_currency);

        let mut builder = TransactionRequest::builder(params.amount, currency, customer)
            .description(params.description)
            .tracking_id(params.tracking_id)
            .notification_url(params.notification_url)
            .language(params.language)
            .test_mode(params.test_mode)
            .payment_method_tag(tag);
        if let Some(url) = params.return_url {
            builder = builder.return_url(url);
        }

        self.client.create_transaction(&builder.build()?).await
    }

    pub async fn create_paywall(&self, params: PaywallParams) -> Result<Value> {
        let customer = params.payer.into_customer(params.customer_email, self.country);
        if !customer.is_complete() {
            tracing::warn!(
                "Creating paywall with missing Customer info. \
                 Status 'missing_info' expected. Consider providing these fields to increase conversion."
            );
        }

        let currency = params.currency.unwrap_or(self.default_currency);

        let mut builder = PaywallRequest::builder(params.amount, currency, customer)
            .description(params.description)
            .tracking_id(params.tracking_id)
            .notification_url(params.notification_url)
            .language(params.language)
            .test_mode(params.test_mode);
        if let Some(url) = params.return_url {
            builder = builder.return_url(url);
        }
        if let Some(code) = params.payment_channel_type_code {
            builder = builder.payment_channel_type_code(code);
        }

        self.client.create_paywall(&builder.build()?).await
    }

    pub async fn get_transaction(&self, uid: &str) -> Result<Value> {
        self.client.get_transaction(uid).await
    }

    pub async fn get_transaction_by_tracking_id(&self, tracking_id: &str) -> Result<Value> {
        self.client.get_transaction_by_tracking_id(tracking_id).await
    }

    pub async fn get_paywall_by_uid(&self, uid: &str) -> Result<Value> {
        self.client.get_paywall_by_uid(uid).await
    }

    pub async fn get_paywall_by_tracking_id(&self, tracking_id: &str) -> Result<Value> {
        self.client.get_paywall_by_tracking_id(tracking_id).await
    }

    pub async fn get_shop_balance(&self) -> Result<Value> {
        self.client.get_shop_balance().await
    }

    /// Payment methods. `country` and `currency` default to this wrapper's.
    pub async fn get_payment_methods(
        &self,
        country: Option<Country>,
        currency: Option<Currency>,
        channel: Option<&str>,
    ) -> Result<Value> {
        self.client
            .get_payment_methods(
                Some(country.unwrap_or(self.country)),
                Some(currency.unwrap_or(self.default_currency)),
                channel,
            )
            .await
    }
}
