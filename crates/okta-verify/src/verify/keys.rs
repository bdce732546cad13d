//! Domain key fetcher: `GET https://{domain}/oauth2/v1/keys`.

use serde_json::Value;

use crate::verify::constants::KEYS_PATH;
use crate::verify::transport::{HttpRequest, HttpTransport};
use crate::verify::types::*;

/// URL of the provider's JWKS endpoint.
pub fn keys_url(domain: &str) -> String {
    format!("https://{}{}", domain, KEYS_PATH)
}

/// Fetch the provider's key set and return the first key's `kid` and `n`.
///
/// One attempt, no retry. Timeouts are whatever the transport enforces.
pub async fn fetch_domain_key(
    transport: &dyn HttpTransport,
    domain: &str,
) -> Result<DomainKey, VerifyError> {
    let url = keys_url(domain);
    log::info!("Fetching domain keys from {}", url);

    let resp = transport.send(HttpRequest::get(&url)).await?;
    if resp.status != 200 {
        return Err(VerifyError::KeyFetchFailed(resp.status));
    }

    parse_keys_response(&resp.body)
}

/// Extract the first key from a JWKS document.
pub fn parse_keys_response(body: &str) -> Result<DomainKey, VerifyError> {
    let doc: Value = serde_json::from_str(body)
        .map_err(|e| VerifyError::MalformedResponse(format!("keys response is not JSON: {}", e)))?;

    let first = doc
        .get("keys")
        .and_then(Value::as_array)
        .and_then(|keys| keys.first())
        .ok_or(VerifyError::NoKeysFound)?;

    Ok(DomainKey {
        kid: string_field(first, "kid")?,
        n: string_field(first, "n")?,
    })
}

fn string_field(key: &Value, name: &str) -> Result<String, VerifyError> {
    key.get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| VerifyError::MalformedResponse(format!("key is missing '{}'", name)))
}
