//! Core types for the Okta Verify authenticator.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Enrollment data
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Transaction data carried by an enrollment QR code.
///
/// All three fields are non-empty once parsed. The value is consumed by one
/// enrollment attempt and then dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct VerifyData {
    /// One-time transaction token, sent back as `Authorization: OTDT <t>`.
    pub t: String,
    /// Authenticator (factor) id.
    pub f: String,
    /// Issuer host, e.g. `acme.okta.com`.
    pub domain: String,
}

impl fmt::Debug for VerifyData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyData")
            .field("t", &mask_secret(&self.t))
            .field("f", &self.f)
            .field("domain", &self.domain)
            .finish()
    }
}

/// The provider's public signing key metadata. Both fields are opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainKey {
    pub kid: String,
    pub n: String,
}

/// Seed material issued by the provider at the end of enrollment.
///
/// Wiped from memory on drop; `Debug` never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret(Zeroizing<String>);

impl SharedSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    /// Borrow the raw seed text. Callers must not log the result.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    /// Log-safe form. Only the length of the seed is shown.
    pub fn masked(&self) -> String {
        format!("<{} chars>", self.expose().chars().count())
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecret({})", self.masked())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Generated codes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A generated one-time code plus its validity window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCode {
    /// Zero-padded decimal code.
    pub code: String,
    /// Seconds until the current time-step expires.
    pub remaining_seconds: u32,
    /// Time-step length in seconds.
    pub period: u32,
    /// Elapsed share of the current step, 0..=99.
    pub progress_percent: u8,
    /// Time-step counter the code was computed for.
    pub counter: u64,
}

/// What the refresh task publishes on every tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickSnapshot {
    /// `None` while no usable secret is stored.
    pub code: Option<String>,
    pub seconds_remaining: u32,
    pub progress_percent: u8,
}

impl From<&GeneratedCode> for TickSnapshot {
    fn from(code: &GeneratedCode) -> Self {
        Self {
            code: Some(code.code.clone()),
            seconds_remaining: code.remaining_seconds,
            progress_percent: code.progress_percent,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Error type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Broad failure class, used for reporting and for deciding whether a
/// failure is user-visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Bad input: scheme, query parameters, pattern, configuration, or an
    /// overlapping enrollment.
    Validation,
    /// Non-200 status or the request never completed.
    Transport,
    /// A response body that is not the expected JSON shape.
    Parse,
    /// Secret unset or undecodable.
    State,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Transport => write!(f, "transport"),
            Self::Parse => write!(f, "parse"),
            Self::State => write!(f, "state"),
        }
    }
}

/// Crate-level error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("No QR code could be read from the image: {0}")]
    Unreadable(String),
    #[error("Invalid QR code URL schema. Expected 'oktaverify', got '{0}'")]
    InvalidScheme(String),
    #[error("Invalid QR code URL: {0}")]
    InvalidUri(String),
    #[error("Missing required parameter '{0}' in QR code URL")]
    MissingParameter(&'static str),
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(String),
    #[error("An enrollment is already in progress")]
    EnrollmentInProgress,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Request to {url} failed: {message}")]
    Connection { url: String, message: String },
    #[error("Failed to fetch domain keys. HTTP Status: {0}")]
    KeyFetchFailed(u16),
    #[error("Failed to create Okta authenticator. HTTP Status: {0}")]
    EnrollmentFailed(u16),

    #[error("No keys found in the response")]
    NoKeysFound,
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Shared secret is not set")]
    Unset,
    #[error("Stored shared secret cannot be decoded: {0}")]
    DecodeError(String),
    #[error("Shared secret is not valid base-32")]
    InvalidSecret,
}

impl VerifyError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unreadable(_)
            | Self::InvalidScheme(_)
            | Self::InvalidUri(_)
            | Self::MissingParameter(_)
            | Self::InvalidPattern(_)
            | Self::EnrollmentInProgress
            | Self::InvalidConfig(_) => ErrorCategory::Validation,
            Self::Connection { .. } | Self::KeyFetchFailed(_) | Self::EnrollmentFailed(_) => {
                ErrorCategory::Transport
            }
            Self::NoKeysFound | Self::MalformedResponse(_) => ErrorCategory::Parse,
            Self::Unset | Self::DecodeError(_) | Self::InvalidSecret => ErrorCategory::State,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::KeyFetchFailed(s) | Self::EnrollmentFailed(s) => Some(*s),
            _ => None,
        }
    }
}

impl From<VerifyError> for String {
    fn from(e: VerifyError) -> String {
        e.to_string()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Mask a secret for logging: keep the first and last two characters.
/// Anything of six characters or fewer is fully masked.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 6 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 4), tail)
}
