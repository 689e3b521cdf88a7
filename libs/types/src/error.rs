//! Canonical error codes and conversion errors
//!
//! [`ErrorCode`] is the closed taxonomy every venue error is mapped into. Codes a venue reports
//! that no adapter table knows about pass through as [`ErrorCode::Native`] so nothing is lost.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Canonical error code shared by all venues
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ErrorCode {
    /// Missing, wrong or insufficient API credentials
    Unauthorized,
    /// Too many requests, a cool-down is required
    RateLimit,
    /// The client address is banned for a while
    IpBan,
    /// Symbol unknown to the venue
    WrongSymbol,
    /// Limit out of the venue's accepted range
    WrongLimit,
    /// Some other parameter value was rejected
    WrongParam,
    /// Failure inside this library or its transport
    AppError,
    /// Failure in an application database layer
    AppDbError,
    /// Venue-native code with no canonical mapping
    Native(String),
}

impl ErrorCode {
    /// Stable wire token of the code
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::Unauthorized => "any1",
            ErrorCode::RateLimit => "any:ratelim",
            ErrorCode::IpBan => "any:ipban",
            ErrorCode::WrongSymbol => "any:wrsymbol",
            ErrorCode::WrongLimit => "any:wrlimit",
            ErrorCode::WrongParam => "any:wrparval",
            ErrorCode::AppError => "any:apperr",
            ErrorCode::AppDbError => "any:appdberr",
            ErrorCode::Native(code) => code,
        }
    }

    /// Human readable description, `None` for native codes
    pub fn default_message(&self) -> Option<&'static str> {
        let message = match self {
            ErrorCode::Unauthorized => {
                "Unauthorized. May be wrong api_key or api_secret or not defined at all."
            }
            ErrorCode::RateLimit => "Rate limit reached. We must make a delay for a while.",
            ErrorCode::IpBan => "IP address banned. We must make a delay for a while.",
            ErrorCode::WrongSymbol => {
                "Wrong symbol. May be this symbol is not supported by platform or its name is wrong."
            }
            ErrorCode::WrongLimit => "Wrong limit. May be too big.",
            ErrorCode::WrongParam => "Wrong param value.",
            ErrorCode::AppError => "App error!",
            ErrorCode::AppDbError => "App error! It's likely that app made wrong request to DB.",
            ErrorCode::Native(_) => return None,
        };
        Some(message)
    }

    /// Codes that should start a client-side cool-down
    pub fn is_throttling(&self) -> bool {
        matches!(self, ErrorCode::RateLimit | ErrorCode::IpBan)
    }

    /// Parse a wire token; unknown tokens become [`ErrorCode::Native`]
    pub fn from_token(token: &str) -> Self {
        match token {
            "any1" => ErrorCode::Unauthorized,
            "any:ratelim" => ErrorCode::RateLimit,
            "any:ipban" => ErrorCode::IpBan,
            "any:wrsymbol" => ErrorCode::WrongSymbol,
            "any:wrlimit" => ErrorCode::WrongLimit,
            "any:wrparval" => ErrorCode::WrongParam,
            "any:apperr" => ErrorCode::AppError,
            "any:appdberr" => ErrorCode::AppDbError,
            other => ErrorCode::Native(other.to_string()),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ErrorCode {
    fn from(token: String) -> Self {
        ErrorCode::from_token(&token)
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        code.as_str().to_string()
    }
}

/// Canonical error returned in place of data when a venue call fails
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Error with the code's default message followed by venue details
    pub fn with_details(code: ErrorCode, details: impl AsRef<str>) -> Self {
        let message = match code.default_message() {
            Some(prefix) => format!("{}{}", prefix, details.as_ref()),
            None => details.as_ref().to_string(),
        };
        Self { code, message }
    }
}

/// Errors converting between tokens, raw values and canonical types
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypesError {
    /// Token does not name any variant of the target enum
    #[error("Unknown {kind} token: '{token}'")]
    UnknownToken { kind: &'static str, token: String },

    /// Raw value cannot be stored in the named field
    #[error("Invalid value for field {field}: {value}")]
    InvalidFieldValue { field: String, value: String },

    /// Positional row does not match the field list
    #[error("Row has {found} values, item format expects {expected}")]
    RowLength { expected: usize, found: usize },
}
