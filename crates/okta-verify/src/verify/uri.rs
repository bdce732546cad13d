//! `oktaverify://` enrollment URI parsing and generation.
//!
//! Format: `oktaverify://<opaque>?t=TOKEN&f=FACTOR_ID&issuer=DOMAIN`
//!
//! The query is unordered and unknown keys are ignored. Each pair is split on
//! its first `=` only, so values may themselves contain `=`; keys and values
//! are percent-decoded.

use std::collections::HashMap;

use url::form_urlencoded;

use crate::verify::constants::ENROLLMENT_SCHEME;
use crate::verify::types::*;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Parse
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse an enrollment URI into [`VerifyData`].
pub fn parse_enrollment_uri(uri: &str) -> Result<VerifyData, VerifyError> {
    let url = url::Url::parse(uri.trim()).map_err(|e| VerifyError::InvalidUri(e.to_string()))?;

    if url.scheme() != ENROLLMENT_SCHEME {
        return Err(VerifyError::InvalidScheme(url.scheme().to_string()));
    }

    let mut params = parse_query(url.query().unwrap_or_default());

    let t = take_required(&mut params, "t")?;
    let f = take_required(&mut params, "f")?;
    let domain = take_required(&mut params, "issuer")?;

    Ok(VerifyData { t, f, domain })
}

/// Decode a raw query string. `form_urlencoded` splits each pair on its
/// first `=` and maps `+` to a space. Later duplicates win.
fn parse_query(query: &str) -> HashMap<String, String> {
    form_urlencoded::parse(query.as_bytes()).into_owned().collect()
}

fn take_required(
    params: &mut HashMap<String, String>,
    name: &'static str,
) -> Result<String, VerifyError> {
    match params.remove(name) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(VerifyError::MissingParameter(name)),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Generate
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Build the enrollment URI a provider would embed in its QR code.
pub fn build_enrollment_uri(data: &VerifyData) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("t", &data.t)
        .append_pair("f", &data.f)
        .append_pair("issuer", &data.domain)
        .finish();
    format!("{}://enroll?{}", ENROLLMENT_SCHEME, query)
}
