//! Protocol literals shared by the enrollment client and the device record.
//!
//! The device values describe an Okta Verify 6.8.1 install on Android 7.1.1
//! and must be sent verbatim.

/// Scheme of enrollment QR payloads.
pub const ENROLLMENT_SCHEME: &str = "oktaverify";

/// Path of the provider's JWKS endpoint.
pub const KEYS_PATH: &str = "/oauth2/v1/keys";
/// Path of the authenticator registration endpoint.
pub const AUTHENTICATORS_PATH: &str = "/idp/authenticators";

/// Authorization scheme used with the QR transaction token.
pub const AUTHORIZATION_SCHEME: &str = "OTDT";

pub const USER_AGENT: &str =
    "D2DD7D3915.com.okta.android.auth/6.8.1 DeviceSDK/0.19.0 Android/7.1.1 unknown/Google";
pub const ACCEPT: &str = "application/json; charset=UTF-8";
pub const CONTENT_TYPE_JSON: &str = "application/json; charset=UTF-8";

/// Value of the `key` field of the registration envelope.
pub const AUTHENTICATOR_KEY: &str = "okta_verify";

// ── Device record ───────────────────────────────────────────────────

pub const BUNDLE_ID: &str = "com.okta.android.auth";
pub const DEVICE_SDK_VERSION: &str = "DeviceSDK 0.19.0";
pub const CLIENT_VERSION: &str = "6.8.1";
pub const MANUFACTURER: &str = "unknown";
pub const MODEL: &str = "Google";
pub const OS_VERSION: &str = "25";
pub const PLATFORM: &str = "ANDROID";

// ── Client instance key ─────────────────────────────────────────────

pub const KEY_ALGORITHM: &str = "RS256";
pub const KEY_EXPONENT: &str = "AQAB";
pub const KEY_TYPE: &str = "RSA";
pub const KEY_USE: &str = "sig";
pub const KEY_PROTECTION: &str = "SOFTWARE";

/// Authentication method registered for the device.
pub const METHOD_TYPE: &str = "totp";

// ── Code generation ─────────────────────────────────────────────────

pub const TOTP_PERIOD: u32 = 30;
pub const TOTP_DIGITS: u8 = 6;

/// Display name of the request-rewriting session action.
pub const SESSION_ACTION_NAME: &str = "Okta TOTP Handler";
/// Device name registered when the configuration does not supply one.
pub const DEFAULT_DEVICE_NAME: &str = "Burp";
