//! Async client SDK for the PayRetailers payments gateway.
//!
//! Creates transactions, paywalls and payouts, and looks them up again. Calls
//! are authenticated with HTTP Basic plus a subscription key and retried with
//! exponential back-off on transport failures and 5xx responses.
//!
//! # H2H enrichment
//!
//! When a live transaction is created with a payment-method tag in
//! production, the client also fetches its landing info (e.g. a PIX QR code)
//! and attaches it under the `"h2h"` key. Tags whose landing info cannot be
//! fetched are blacklisted for 24 hours in a small JSON file.
//!
//! # Quick example
//!
//! ```no_run
//! use payretailers::{ClientConfig, Country, CountryClient, PayerDetails, TransactionParams};
//!
//! # #[tokio::main]
//! # async fn main() -> payretailers::Result<()> {
//! let client = CountryClient::new(ClientConfig::from_env()?, Country::Br)?;
//!
//! let params = TransactionParams::new(
//!     "100.00",
//!     "Order #1",
//!     "order-1",
//!     "https://shop.example.com/webhooks/payretailers",
//!     "buyer@example.com",
//! )
//! .with_payer(PayerDetails {
//!     first_name: Some("Ana".into()),
//!     last_name: Some("Silva".into()),
//!     personal_id: Some("123.456.789-00".into()),
//!     ..Default::default()
//! })
//! .with_payment_method_tag("PIX");
//!
//! let transaction = client.create_transaction(params).await?;
//! if let Some(h2h) = transaction.get("h2h") {
//!     println!("landing info: {h2h}");
//! }
//! # Ok(())
//! # }
//! ```

// Configuration and errors
pub mod config;
pub mod constants;
pub mod error;

// Request plumbing
pub mod dispatcher;
pub mod transport;

// Domain
pub mod client;
pub mod country;
pub mod h2h_cache;
pub mod models;
pub mod validation;

// Re-exports
pub use client::PayRetailersClient;
pub use config::{ClientConfig, Credentials, Environment, RetryPolicy};
pub use country::{
    sandbox_payment_methods, CountryClient, PayerDetails, PaywallParams, TransactionParams,
};
pub use error::{ErrorDetail, ErrorKind, PayRetailersError, Result};
pub use models::{
    Country, Currency, Customer, Language, PaywallRequest, PayoutRequest, TransactionRequest,
};
pub use transport::{ApiRequest, ApiResponse, HttpMethod, ReqwestTransport, Transport, TransportError};
pub use validation::validate_personal_id;
