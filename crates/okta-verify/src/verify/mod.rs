//! Okta Verify authenticator: sub-modules.

pub mod types;
pub mod constants;
pub mod qr;
pub mod uri;
pub mod transport;
pub mod keys;
pub mod device;
pub mod enroll;
pub mod secret;
pub mod core;
pub mod mutator;
pub mod ticker;
pub mod config;
pub mod service;

// Re-export top-level items for convenience.
pub use types::*;
pub use config::AuthenticatorConfig;
pub use enroll::EnrollmentClient;
pub use mutator::{Mutation, OutgoingRequest, RegexRule, SessionMutator, SkipReason};
pub use secret::SecretStore;
pub use service::{AuthenticatorService, AuthenticatorServiceState};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};
