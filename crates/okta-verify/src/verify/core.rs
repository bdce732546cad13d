//! TOTP generation: RFC 4226 (HOTP) truncation over RFC 6238 time steps.
//!
//! Okta Verify seeds are Base-32 text. The generator reads the text back
//! from the [`SecretStore`], Base-32-decodes it into the HMAC-SHA1 key and
//! derives a 6-digit code for the 30-second step containing "now".

use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha1::Sha1;
use zeroize::Zeroizing;

use crate::verify::constants::{TOTP_DIGITS, TOTP_PERIOD};
use crate::verify::secret::SecretStore;
use crate::verify::types::*;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Raw HMAC-OTP (RFC 4226 §5.3)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compute an HOTP code for the given raw key bytes and counter.
pub fn hotp_raw(key: &[u8], counter: u64, digits: u8) -> Result<String, VerifyError> {
    let mut mac = Hmac::<Sha1>::new_from_slice(key).map_err(|_| VerifyError::InvalidSecret)?;
    mac.update(&counter.to_be_bytes());
    Ok(truncate(&mac.finalize().into_bytes(), digits))
}

/// Dynamic truncation per RFC 4226 §5.3.
fn truncate(hmac_result: &[u8], digits: u8) -> String {
    let offset = (hmac_result[hmac_result.len() - 1] & 0x0f) as usize;
    let binary = ((hmac_result[offset] as u32 & 0x7f) << 24)
        | ((hmac_result[offset + 1] as u32) << 16)
        | ((hmac_result[offset + 2] as u32) << 8)
        | (hmac_result[offset + 3] as u32);
    let code = binary % 10u32.pow(digits as u32);
    format!("{:0>width$}", code, width = digits as usize)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Time steps
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Time-step counter for a unix timestamp.
pub fn time_step_at(unix_seconds: u64, period: u32) -> u64 {
    unix_seconds / period as u64
}

/// Seconds remaining in the step containing `unix_seconds` (1..=period).
pub fn seconds_remaining_at(unix_seconds: u64, period: u32) -> u32 {
    let p = period as u64;
    (p - (unix_seconds % p)) as u32
}

/// Elapsed share of the current step as a whole percentage (0..=99).
pub fn progress_percent_at(unix_seconds: u64, period: u32) -> u8 {
    let elapsed = period - seconds_remaining_at(unix_seconds, period);
    (elapsed * 100 / period) as u8
}

/// Current unix timestamp in seconds.
pub fn current_unix_time() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Seeds
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Decode a base-32 seed (case-insensitive, spaces/dashes ignored,
/// padding optional) into HMAC key bytes.
pub fn decode_base32_seed(seed: &str) -> Result<Zeroizing<Vec<u8>>, VerifyError> {
    let cleaned = Zeroizing::new(
        seed.chars()
            .filter(|c| !matches!(c, ' ' | '-' | '='))
            .collect::<String>()
            .to_uppercase(),
    );
    if cleaned.is_empty() {
        return Err(VerifyError::InvalidSecret);
    }
    base32::decode(base32::Alphabet::Rfc4648 { padding: false }, &cleaned)
        .filter(|key| !key.is_empty())
        .map(Zeroizing::new)
        .ok_or(VerifyError::InvalidSecret)
}

/// Generate a code from a base-32 seed at an explicit timestamp.
pub fn generate_totp_at(seed: &str, unix_seconds: u64) -> Result<GeneratedCode, VerifyError> {
    let key = decode_base32_seed(seed)?;
    let counter = time_step_at(unix_seconds, TOTP_PERIOD);
    Ok(GeneratedCode {
        code: hotp_raw(&key, counter, TOTP_DIGITS)?,
        remaining_seconds: seconds_remaining_at(unix_seconds, TOTP_PERIOD),
        period: TOTP_PERIOD,
        progress_percent: progress_percent_at(unix_seconds, TOTP_PERIOD),
        counter,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Generator over the secret store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Produces codes from whatever seed the store currently holds.
#[derive(Debug, Clone)]
pub struct TotpGenerator {
    store: Arc<SecretStore>,
}

impl TotpGenerator {
    pub fn new(store: Arc<SecretStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<SecretStore> {
        &self.store
    }

    /// Current code, or `None` when the store is unset or its seed is
    /// unusable. Never an error.
    pub fn generate(&self) -> Option<GeneratedCode> {
        self.generate_at(current_unix_time())
    }

    pub fn generate_at(&self, unix_seconds: u64) -> Option<GeneratedCode> {
        match self.try_generate_at(unix_seconds) {
            Ok(code) => Some(code),
            Err(e) => {
                log::debug!("TOTP unavailable: {}", e);
                None
            }
        }
    }

    /// Like [`generate_at`](Self::generate_at) but reports why no code
    /// could be produced.
    pub fn try_generate_at(&self, unix_seconds: u64) -> Result<GeneratedCode, VerifyError> {
        let raw = self.store.decode()?;
        let seed = std::str::from_utf8(&raw).map_err(|_| VerifyError::InvalidSecret)?;
        generate_totp_at(seed, unix_seconds)
    }
}
