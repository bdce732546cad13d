//! Device enrollment client.
//!
//! Turns a scanned enrollment payload into a provider-issued seed:
//!
//! 1. decode the QR image (optional, when starting from an image)
//! 2. parse the `oktaverify://` URI
//! 3. `GET /oauth2/v1/keys` for the domain key
//! 4. `POST /idp/authenticators` registering a simulated device
//!
//! Steps run strictly in sequence and any failure aborts the whole run.
//! Nothing here touches the secret store; committing the returned
//! [`SharedSecret`] is the caller's decision.

use std::sync::Arc;

use serde_json::Value;

use crate::verify::constants::*;
use crate::verify::device::EnrollmentRequest;
use crate::verify::keys;
use crate::verify::qr;
use crate::verify::transport::{HttpRequest, HttpTransport};
use crate::verify::types::*;
use crate::verify::uri;

/// URL of the authenticator registration endpoint.
pub fn authenticators_url(domain: &str) -> String {
    format!("https://{}{}", domain, AUTHENTICATORS_PATH)
}

/// Enrollment protocol client over an [`HttpTransport`].
#[derive(Clone)]
pub struct EnrollmentClient {
    transport: Arc<dyn HttpTransport>,
}

impl EnrollmentClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Fetch the provider's first signing key.
    pub async fn fetch_domain_key(&self, domain: &str) -> Result<DomainKey, VerifyError> {
        keys::fetch_domain_key(self.transport.as_ref(), domain).await
    }

    /// Register the simulated device and return the issued seed.
    pub async fn create_authenticator(
        &self,
        device_name: &str,
        verify: &VerifyData,
        key: &DomainKey,
    ) -> Result<SharedSecret, VerifyError> {
        let url = authenticators_url(&verify.domain);
        let body = EnrollmentRequest::new(device_name, verify, key).to_json()?;

        let request = HttpRequest::post(&url, body)
            .with_header("Authorization", format!("{} {}", AUTHORIZATION_SCHEME, verify.t))
            .with_header("User-Agent", USER_AGENT)
            .with_header("Accept", ACCEPT)
            .with_header("Content-Type", CONTENT_TYPE_JSON);

        log::info!("Registering device '{}' with {}", device_name, url);
        let resp = self.transport.send(request).await?;
        if resp.status != 200 {
            return Err(VerifyError::EnrollmentFailed(resp.status));
        }

        let secret = parse_enrollment_response(&resp.body)?;
        log::info!("Authenticator created, shared secret {}", secret.masked());
        Ok(secret)
    }

    /// Run the network half of the sequence for already-parsed data.
    pub async fn enroll(
        &self,
        device_name: &str,
        verify: &VerifyData,
    ) -> Result<SharedSecret, VerifyError> {
        let key = self.fetch_domain_key(&verify.domain).await?;
        self.create_authenticator(device_name, verify, &key).await
    }

    /// Parse an enrollment URI, then enroll.
    pub async fn enroll_from_uri(
        &self,
        device_name: &str,
        enrollment_uri: &str,
    ) -> Result<SharedSecret, VerifyError> {
        let verify = uri::parse_enrollment_uri(enrollment_uri)?;
        self.enroll(device_name, &verify).await
    }

    /// Decode a QR image, then enroll.
    pub async fn enroll_from_qr(
        &self,
        device_name: &str,
        image: Vec<u8>,
    ) -> Result<SharedSecret, VerifyError> {
        let payload = tokio::task::spawn_blocking(move || qr::decode_qr_image(&image))
            .await
            .map_err(|e| VerifyError::Unreadable(format!("QR decode task failed: {}", e)))??;
        self.enroll_from_uri(device_name, &payload).await
    }
}

/// Extract `methods[0].sharedSecret` from the registration response.
pub fn parse_enrollment_response(body: &str) -> Result<SharedSecret, VerifyError> {
    let doc: Value = serde_json::from_str(body).map_err(|e| {
        VerifyError::MalformedResponse(format!("enrollment response is not JSON: {}", e))
    })?;

    doc.get("methods")
        .and_then(Value::as_array)
        .and_then(|methods| methods.first())
        .and_then(|method| method.get("sharedSecret"))
        .and_then(Value::as_str)
        .map(SharedSecret::new)
        .ok_or_else(|| {
            VerifyError::MalformedResponse("response has no methods[0].sharedSecret".into())
        })
}
