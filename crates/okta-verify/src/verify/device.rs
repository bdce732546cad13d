//! The simulated device registered during enrollment.
//!
//! Everything except the display name and the fetched key is a fixed
//! constant; the field names are the provider's wire names.

use serde::Serialize;

use crate::verify::constants::*;
use crate::verify::types::*;

/// Public key object embedded in the device record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientInstanceKey {
    pub alg: &'static str,
    pub e: &'static str,
    #[serde(rename = "okta:isFipsCompliant")]
    pub is_fips_compliant: bool,
    #[serde(rename = "okta:kpr")]
    pub key_protection: &'static str,
    pub kty: &'static str,
    #[serde(rename = "use")]
    pub key_use: &'static str,
    pub kid: String,
    pub n: String,
}

impl ClientInstanceKey {
    fn new(key: &DomainKey) -> Self {
        Self {
            alg: KEY_ALGORITHM,
            e: KEY_EXPONENT,
            is_fips_compliant: false,
            key_protection: KEY_PROTECTION,
            kty: KEY_TYPE,
            key_use: KEY_USE,
            kid: key.kid.clone(),
            n: key.n.clone(),
        }
    }
}

/// Immutable fingerprint of the simulated Android device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceFingerprint {
    client_instance_bundle_id: &'static str,
    client_instance_device_sdk_version: &'static str,
    client_instance_version: &'static str,
    client_instance_key: ClientInstanceKey,
    display_name: String,
    full_disk_encryption: bool,
    is_hardware_protection_enabled: bool,
    manufacturer: &'static str,
    model: &'static str,
    os_version: &'static str,
    platform: &'static str,
    root_privileges: bool,
    screen_lock: bool,
    secure_hardware_present: bool,
}

impl DeviceFingerprint {
    pub fn new(display_name: impl Into<String>, key: &DomainKey) -> Self {
        Self {
            client_instance_bundle_id: BUNDLE_ID,
            client_instance_device_sdk_version: DEVICE_SDK_VERSION,
            client_instance_version: CLIENT_VERSION,
            client_instance_key: ClientInstanceKey::new(key),
            display_name: display_name.into(),
            full_disk_encryption: false,
            is_hardware_protection_enabled: false,
            manufacturer: MANUFACTURER,
            model: MODEL,
            os_version: OS_VERSION,
            platform: PLATFORM,
            root_privileges: true,
            screen_lock: false,
            secure_hardware_present: false,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn key(&self) -> &ClientInstanceKey {
        &self.client_instance_key
    }
}

/// Authentication method requested for the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodRequest {
    is_fips_compliant: bool,
    support_user_verification: bool,
    #[serde(rename = "type")]
    method_type: &'static str,
}

impl Default for MethodRequest {
    fn default() -> Self {
        Self {
            is_fips_compliant: false,
            support_user_verification: false,
            method_type: METHOD_TYPE,
        }
    }
}

/// Body of `POST /idp/authenticators`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRequest {
    authenticator_id: String,
    device: DeviceFingerprint,
    key: &'static str,
    methods: Vec<MethodRequest>,
}

impl EnrollmentRequest {
    pub fn new(device_name: &str, verify: &VerifyData, key: &DomainKey) -> Self {
        Self {
            authenticator_id: verify.f.clone(),
            device: DeviceFingerprint::new(device_name, key),
            key: AUTHENTICATOR_KEY,
            methods: vec![MethodRequest::default()],
        }
    }

    pub fn device(&self) -> &DeviceFingerprint {
        &self.device
    }

    pub fn to_json(&self) -> Result<String, VerifyError> {
        serde_json::to_string(self)
            .map_err(|e| VerifyError::MalformedResponse(format!("cannot encode request: {}", e)))
    }
}
