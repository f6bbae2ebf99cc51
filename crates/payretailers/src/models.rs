//! Request models sent to the gateway.
//!
//! Each request is built through a builder whose `build()` validates the
//! input, so a constructed request is always well-formed. Serialization uses
//! the gateway's field names; unset optional fields are omitted.

use serde::{Deserialize, Serialize};

use crate::error::{PayRetailersError, Result};
use crate::validation::validate_personal_id;

macro_rules! code_enum {
    ($(#[$meta:meta])* $name:ident, $label:literal { $($variant:ident => $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $code)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $code,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = PayRetailersError;

            fn from_str(s: &str) -> Result<Self> {
                let wanted = s.trim().to_ascii_uppercase();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| {
                        PayRetailersError::validation(format!("unknown {} code: {s}", $label))
                    })
            }
        }
    };
}

code_enum!(
    /// ISO country codes the gateway operates in.
    Country, "country" {
        Ar => "AR",
        Br => "BR",
        Cl => "CL",
        Co => "CO",
        Cr => "CR",
        Ec => "EC",
        Sv => "SV",
        Mx => "MX",
        Pa => "PA",
        Pe => "PE",
        Gt => "GT",
        Bf => "BF",
        Cm => "CM",
        Ci => "CI",
        Gh => "GH",
        Ke => "KE",
        Rw => "RW",
        Sn => "SN",
        Tz => "TZ",
        Ug => "UG",
        Ng => "NG",
        Za => "ZA",
    }
);

code_enum!(
    /// Currency codes accepted by the gateway.
    Currency, "currency" {
        Ars => "ARS",
        Brl => "BRL",
        Clp => "CLP",
        Cop => "COP",
        Crc => "CRC",
        Usd => "USD",
        Mxn => "MXN",
        Pen => "PEN",
        Gtq => "GTQ",
        Rw => "RW",
        Tzs => "TZS",
        Ugx => "UGX",
        Xof => "XOF",
        Xaf => "XAF",
        Ghs => "GHS",
        Kes => "KES",
        Ngn => "NGN",
        Zar => "ZAR",
        Eur => "EUR",
        Usdt => "USDT",
        Usdc => "USDC",
    }
);

code_enum!(
    /// Checkout page language.
    Language, "language" {
        En => "EN",
        Es => "ES",
        Pt => "PT",
    }
);

impl Default for Language {
    fn default() -> Self {
        Language::Es
    }
}

impl Country {
    /// Local currency used when a request does not name one.
    pub fn default_currency(&self) -> Currency {
        match self {
            Country::Ar => Currency::Ars,
            Country::Br => Currency::Brl,
            Country::Cl => Currency::Clp,
            Country::Co => Currency::Cop,
            Country::Cr => Currency::Crc,
            Country::Ec | Country::Sv | Country::Pa => Currency::Usd,
            Country::Mx => Currency::Mxn,
            Country::Pe => Currency::Pen,
            Country::Gt => Currency::Gtq,
            Country::Bf | Country::Ci | Country::Sn => Currency::Xof,
            Country::Cm => Currency::Xaf,
            Country::Gh => Currency::Ghs,
            Country::Ke => Currency::Kes,
            Country::Rw => Currency::Rw,
            Country::Tz => Currency::Tzs,
            Country::Ug => Currency::Ugx,
            Country::Ng => Currency::Ngn,
            Country::Za => Currency::Zar,
        }
    }
}

fn require(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PayRetailersError::validation(format!("{field} is required")));
    }
    Ok(())
}

/// Payer details attached to transactions and paywalls.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal_id: Option<String>,
    pub country: Country,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(rename = "zip", skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
}

impl Customer {
    pub fn new(email: impl Into<String>, country: Country) -> Self {
        Self {
            first_name: None,
            last_name: None,
            email: email.into(),
            personal_id: None,
            country,
            phone: None,
            device_id: None,
            ip: None,
            address: None,
            city: None,
            zip_code: None,
        }
    }

    pub fn with_name(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self.last_name = Some(last_name.into());
        self
    }

    pub fn with_personal_id(mut self, personal_id: impl Into<String>) -> Self {
        self.personal_id = Some(personal_id.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>, city: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self.city = Some(city.into());
        self
    }

    pub fn with_zip_code(mut self, zip_code: impl Into<String>) -> Self {
        self.zip_code = Some(zip_code.into());
        self
    }

    pub fn with_device(mut self, device_id: impl Into<String>, ip: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self.ip = Some(ip.into());
        self
    }

    /// True when first name, last name and personal id are all present.
    pub fn is_complete(&self) -> bool {
        [&self.first_name, &self.last_name, &self.personal_id]
            .iter()
            .all(|f| f.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }

    /// Email must be present; a personal id must match the country's format.
    pub fn validate(&self) -> Result<()> {
        require(&self.email, "customer email")?;
        if let Some(id) = &self.personal_id {
            validate_personal_id(self.country, id)?;
        }
        Ok(())
    }
}

/// Fields shared by transactions and paywalls.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct Checkout {
    amount: String,
    currency: Currency,
    description: String,
    tracking_id: String,
    notification_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    return_url: Option<String>,
    language: Language,
    test_mode: bool,
    customer: Customer,
}

impl Checkout {
    fn new(amount: String, currency: Currency, customer: Customer) -> Self {
        Self {
            amount,
            currency,
            description: String::new(),
            tracking_id: String::new(),
            notification_url: String::new(),
            return_url: None,
            language: Language::default(),
            test_mode: false,
            customer,
        }
    }

    fn validate(&self) -> Result<()> {
        require(&self.amount, "amount")?;
        require(&self.description, "description")?;
        require(&self.tracking_id, "tracking id")?;
        require(&self.notification_url, "notification url")?;
        self.customer.validate()
    }
}

/// Body of `POST transactions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    #[serde(flatten)]
    checkout: Checkout,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_method_tag_name: Option<String>,
}

impl TransactionRequest {
    /// Start a request. `amount` is sent as its string form.
    pub fn builder(
        amount: impl ToString,
        currency: Currency,
        customer: Customer,
    ) -> TransactionRequestBuilder {
        TransactionRequestBuilder {
            request: TransactionRequest {
                checkout: Checkout::new(amount.to_string(), currency, customer),
                payment_method_tag_name: None,
            },
        }
    }

    pub fn amount(&self) -> &str {
        &self.checkout.amount
    }

    pub fn currency(&self) -> Currency {
        self.checkout.currency
    }

    pub fn tracking_id(&self) -> &str {
        &self.checkout.tracking_id
    }

    pub fn customer(&self) -> &Customer {
        &self.checkout.customer
    }

    /// Payment-method tag (e.g. `PIX`), if one was chosen.
    pub fn payment_method_tag(&self) -> Option<&str> {
        self.payment_method_tag_name
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }
}

pub struct TransactionRequestBuilder {
    request: TransactionRequest,
}

impl TransactionRequestBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.request.checkout.description = description.into();
        self
    }

    pub fn tracking_id(mut self, tracking_id: impl Into<String>) -> Self {
        self.request.checkout.tracking_id = tracking_id.into();
        self
    }

    pub fn notification_url(mut self, url: impl Into<String>) -> Self {
        self.request.checkout.notification_url = url.into();
        self
    }

    pub fn return_url(mut self, url: impl Into<String>) -> Self {
        self.request.checkout.return_url = Some(url.into());
        self
    }

    pub fn language(mut self, language: Language) -> Self {
        self.request.checkout.language = language;
        self
    }

    pub fn test_mode(mut self, test_mode: bool) -> Self {
        self.request.checkout.test_mode = test_mode;
        self
    }

    pub fn payment_method_tag(mut self, tag: impl Into<String>) -> Self {
        self.request.payment_method_tag_name = Some(tag.into());
        self
    }

    pub fn build(self) -> Result<TransactionRequest> {
        self.request.checkout.validate()?;
        Ok(self.request)
    }
}

/// Body of `POST paywalls`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaywallRequest {
    #[serde(flatten)]
    checkout: Checkout,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_channel_type_code: Option<String>,
}

impl PaywallRequest {
    pub fn builder(amount: impl ToString, currency: Currency, customer: Customer) -> PaywallRequestBuilder {
        PaywallRequestBuilder {
            request: PaywallRequest {
                checkout: Checkout::new(amount.to_string(), currency, customer),
                payment_channel_type_code: None,
            },
        }
    }

    pub fn amount(&self) -> &str {
        &self.checkout.amount
    }

    pub fn tracking_id(&self) -> &str {
        &self.checkout.tracking_id
    }

    pub fn customer(&self) -> &Customer {
        &self.checkout.customer
    }
}

pub struct PaywallRequestBuilder {
    request: PaywallRequest,
}

impl PaywallRequestBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.request.checkout.description = description.into();
        self
    }

    pub fn tracking_id(mut self, tracking_id: impl Into<String>) -> Self {
        self.request.checkout.tracking_id = tracking_id.into();
        self
    }

    pub fn notification_url(mut self, url: impl Into<String>) -> Self {
        self.request.checkout.notification_url = url.into();
        self
    }

    pub fn return_url(mut self, url: impl Into<String>) -> Self {
        self.request.checkout.return_url = Some(url.into());
        self
    }

    pub fn language(mut self, language: Language) -> Self {
        self.request.checkout.language = language;
        self
    }

    pub fn test_mode(mut self, test_mode: bool) -> Self {
        self.request.checkout.test_mode = test_mode;
        self
    }

    pub fn payment_channel_type_code(mut self, code: impl Into<String>) -> Self {
        self.request.payment_channel_type_code = Some(code.into());
        self
    }

    pub fn build(self) -> Result<PaywallRequest> {
        self.request.checkout.validate()?;
        Ok(self.request)
    }
}

/// Body of `POST payout`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRequest {
    amount: f64,
    currency_code: Currency,
    country: Country,
    bank_name: String,
    account_number: String,
    account_agency_number: String,
    payout_account_type_code: String,
    beneficiary_first_name: String,
    beneficiary_last_name: String,
    document_type: String,
    document_number: String,
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    external_reference: Option<String>,
    #[serde(rename = "NotificationUrl", skip_serializing_if = "Option::is_none")]
    notification_url: Option<String>,
    #[serde(rename = "PaymentReason", skip_serializing_if = "Option::is_none")]
    payment_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recipient_pix_key: Option<String>,
    test_mode: bool,
}

impl PayoutRequest {
    pub fn builder(amount: f64, currency: Currency, country: Country) -> PayoutRequestBuilder {
        PayoutRequestBuilder {
            request: PayoutRequest {
                amount,
                currency_code: currency,
                country,
                bank_name: String::new(),
                account_number: String::new(),
                account_agency_number: "-".to_string(),
                payout_account_type_code: "-".to_string(),
                beneficiary_first_name: String::new(),
                beneficiary_last_name: String::new(),
                document_type: String::new(),
                document_number: String::new(),
                email: String::new(),
                city: None,
                external_reference: None,
                notification_url: None,
                payment_reason: None,
                recipient_pix_key: None,
                test_mode: false,
            },
        }
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn external_reference(&self) -> Option<&str> {
        self.external_reference.as_deref()
    }
}

pub struct PayoutRequestBuilder {
    request: PayoutRequest,
}

impl PayoutRequestBuilder {
    pub fn bank_account(mut self, bank_name: impl Into<String>, account_number: impl Into<String>) -> Self {
        self.request.bank_name = bank_name.into();
        self.request.account_number = account_number.into();
        self
    }

    pub fn account_agency_number(mut self, agency: impl Into<String>) -> Self {
        self.request.account_agency_number = agency.into();
        self
    }

    pub fn payout_account_type_code(mut self, code: impl Into<String>) -> Self {
        self.request.payout_account_type_code = code.into();
        self
    }

    pub fn beneficiary(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.request.beneficiary_first_name = first_name.into();
        self.request.beneficiary_last_name = last_name.into();
        self
    }

    pub fn document(mut self, document_type: impl Into<String>, number: impl Into<String>) -> Self {
        self.request.document_type = document_type.into();
        self.request.document_number = number.into();
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.request.email = email.into();
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.request.city = Some(city.into());
        self
    }

    pub fn external_reference(mut self, reference: impl Into<String>) -> Self {
        self.request.external_reference = Some(reference.into());
        self
    }

    pub fn notification_url(mut self, url: impl Into<String>) -> Self {
        self.request.notification_url = Some(url.into());
        self
    }

    pub fn payment_reason(mut self, reason: impl Into<String>) -> Self {
        self.request.payment_reason = Some(reason.into());
        self
    }

    pub fn recipient_pix_key(mut self, key: impl Into<String>) -> Self {
        self.request.recipient_pix_key = Some(key.into());
        self
    }

    pub fn test_mode(mut self, test_mode: bool) -> Self {
        self.request.test_mode = test_mode;
        self
    }

    pub fn build(self) -> Result<PayoutRequest> {
        let r = &self.request;
        if !r.amount.is_finite() || r.amount <= 0.0 {
            return Err(PayRetailersError::validation(format!(
                "payout amount must be a positive number, got {}",
                r.amount
            )));
        }
        require(&r.bank_name, "bank name")?;
        require(&r.account_number, "account number")?;
        require(&r.beneficiary_first_name, "beneficiary first name")?;
        require(&r.beneficiary_last_name, "beneficiary last name")?;
        require(&r.document_type, "document type")?;
        require(&r.document_number, "document number")?;
        require(&r.email, "email")?;
        Ok(self.request)
    }
}
