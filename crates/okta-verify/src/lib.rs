//! # Okta Verify software authenticator
//!
//! Enrolls as an Okta Verify TOTP device and keeps one-time codes flowing
//! into replayed requests:
//!
//! - **QR enrollment** – decode the `oktaverify://` QR code, fetch the
//!   domain key, register a simulated Android device, keep the issued seed
//! - **RFC 4226 / 6238** – 6-digit HMAC-SHA1 codes on a 30 s step
//! - **Secret store** – one guarded slot, Base64 at rest, zeroized on read
//! - **Refresh task** – owned periodic tick publishing the current code
//! - **Session mutation** – regex replace-all of the fresh code into
//!   outgoing request bodies, never failing the request

pub mod verify;
