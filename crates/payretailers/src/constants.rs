use std::time::Duration;

/// Production API base URL.
pub const PRODUCTION_URL: &str = "https://api.payretailers.com/payments/v2/";

/// Sandbox API base URL.
pub const SANDBOX_URL: &str = "https://api-sandbox.payretailers.com/payments/v2/";

/// Header carrying the API subscription key.
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Per-request timeout for the HTTP client.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default location of the H2H blacklist file, relative to the working directory.
pub const DEFAULT_H2H_CACHE_PATH: &str = "payretailers_h2h_cache.json";

/// How long a payment method stays blacklisted after a failed landing-info fetch.
pub const BLACKLIST_DURATION: Duration = Duration::from_secs(86_400);

/// Response key under which landing info is attached to a created transaction.
pub const H2H_RESPONSE_KEY: &str = "h2h";

/// Landing-info endpoint prefix; the transaction id is appended.
pub const LANDING_INFO_PATH: &str = "public/transactions/landing-info";
