//! Error taxonomy for the SDK and the upstream error-code lookup.

use std::fmt;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PayRetailersError>;

/// The kind of failure, independent of the message or upstream code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input, rejected locally or by the gateway.
    Validation,
    /// Credentials rejected (HTTP 401).
    Authentication,
    /// Network unreachable, timeout, or no response after all retries.
    Connection,
    /// Business-rule rejection of a transaction.
    TransactionCreation,
    /// Business-rule rejection of a payout.
    PayoutCreation,
    /// Anything the gateway reports that has no specific mapping.
    Api,
    /// Programmer error, such as an unsupported HTTP method.
    InvalidArgument,
    /// Missing or malformed client configuration.
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation error",
            ErrorKind::Authentication => "authentication error",
            ErrorKind::Connection => "connection error",
            ErrorKind::TransactionCreation => "transaction creation error",
            ErrorKind::PayoutCreation => "payout creation error",
            ErrorKind::Api => "api error",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::Config => "config error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message, upstream code and HTTP status attached to every error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub message: String,
    pub code: Option<String>,
    pub status: Option<u16>,
}

impl ErrorDetail {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            status: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{code}] {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Errors returned by every SDK operation.
///
/// Each variant is one [`ErrorKind`]; the payload is never mutated after the
/// error is created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayRetailersError {
    #[error("validation error: {0}")]
    Validation(ErrorDetail),

    #[error("authentication error: {0}")]
    Authentication(ErrorDetail),

    #[error("connection error: {0}")]
    Connection(ErrorDetail),

    #[error("transaction creation error: {0}")]
    TransactionCreation(ErrorDetail),

    #[error("payout creation error: {0}")]
    PayoutCreation(ErrorDetail),

    #[error("api error: {0}")]
    Api(ErrorDetail),

    #[error("invalid argument: {0}")]
    InvalidArgument(ErrorDetail),

    #[error("config error: {0}")]
    Config(ErrorDetail),
}

impl PayRetailersError {
    /// Build an error of the given kind.
    pub fn new(kind: ErrorKind, detail: ErrorDetail) -> Self {
        match kind {
            ErrorKind::Validation => Self::Validation(detail),
            ErrorKind::Authentication => Self::Authentication(detail),
            ErrorKind::Connection => Self::Connection(detail),
            ErrorKind::TransactionCreation => Self::TransactionCreation(detail),
            ErrorKind::PayoutCreation => Self::PayoutCreation(detail),
            ErrorKind::Api => Self::Api(detail),
            ErrorKind::InvalidArgument => Self::InvalidArgument(detail),
            ErrorKind::Config => Self::Config(detail),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(ErrorDetail::new(message))
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(ErrorDetail::new(message))
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(ErrorDetail::new(message))
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(ErrorDetail::new(message))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Connection(_) => ErrorKind::Connection,
            Self::TransactionCreation(_) => ErrorKind::TransactionCreation,
            Self::PayoutCreation(_) => ErrorKind::PayoutCreation,
            Self::Api(_) => ErrorKind::Api,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    pub fn detail(&self) -> &ErrorDetail {
        match self {
            Self::Validation(d)
            | Self::Authentication(d)
            | Self::Connection(d)
            | Self::TransactionCreation(d)
            | Self::PayoutCreation(d)
            | Self::Api(d)
            | Self::InvalidArgument(d)
            | Self::Config(d) => d,
        }
    }

    pub fn message(&self) -> &str {
        &self.detail().message
    }

    /// Upstream error code, when the gateway supplied one.
    pub fn code(&self) -> Option<&str> {
        self.detail().code.as_deref()
    }

    /// HTTP status of the response that produced this error.
    pub fn status(&self) -> Option<u16> {
        self.detail().status
    }
}

/// Upstream error codes with a specific kind. Everything else is [`ErrorKind::Api`].
pub const ERROR_CODE_MAP: &[(&str, ErrorKind)] = &[
    ("001_VALIDATION_ERROR", ErrorKind::Validation),
    ("BLOCKED_BY_CUSTOMER_LIMIT_RULE", ErrorKind::TransactionCreation),
    ("CUSTOMER_INVALID_AGE", ErrorKind::Validation),
    ("CUSTOMER_INVALID_ID", ErrorKind::Validation),
    ("INVALID_AMOUNT", ErrorKind::Validation),
    ("PAYMENT_METHOD_NOT_ALLOWED", ErrorKind::TransactionCreation),
    ("TRANSACTION_MAX_AMOUNT", ErrorKind::Validation),
    ("TRANSACTION_MIN_AMOUNT", ErrorKind::Validation),
    ("TRANSACTION_INVALID_FIELD_COUNTRY", ErrorKind::Validation),
    ("TRANSACTION_INVALID_FIELD_CURRENCY", ErrorKind::Validation),
];

/// Look up the kind for an upstream error code (exact match).
pub fn kind_for_code(code: &str) -> ErrorKind {
    ERROR_CODE_MAP
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, kind)| *kind)
        .unwrap_or(ErrorKind::Api)
}

/// Turn an upstream failure into a typed error.
///
/// HTTP 401 is always [`PayRetailersError::Authentication`], whatever the code.
pub fn classify(code: &str, message: &str, http_status: Option<u16>) -> PayRetailersError {
    let kind = if http_status == Some(401) {
        ErrorKind::Authentication
    } else {
        kind_for_code(code)
    };

    let mut detail = ErrorDetail::new(message).with_code(code);
    detail.status = http_status;
    PayRetailersError::new(kind, detail)
}

impl From<serde_json::Error> for PayRetailersError {
    fn from(e: serde_json::Error) -> Self {
        PayRetailersError::validation(format!("failed to serialize request: {e}"))
    }
}
