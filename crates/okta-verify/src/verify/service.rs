//! High-level orchestrator: owns the shared state and the refresh task,
//! delegates to sub-modules.
//!
//! The methods here are the surface the host drives: the configuration
//! calls of the settings panel, the enrollment trigger, and the per-request
//! mutation hook of the replay pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::verify::config::AuthenticatorConfig;
use crate::verify::constants::SESSION_ACTION_NAME;
use crate::verify::core::TotpGenerator;
use crate::verify::enroll::EnrollmentClient;
use crate::verify::mutator::{
    validate_pattern, Mutation, OutgoingRequest, RegexRule, SessionMutator,
};
use crate::verify::secret::SecretStore;
use crate::verify::ticker::RefreshTicker;
use crate::verify::transport::{HttpTransport, ReqwestTransport};
use crate::verify::types::*;

/// Shared service handle.
pub type AuthenticatorServiceState = Arc<AuthenticatorService>;

/// One authenticator session: a single secret, a single pattern, one
/// refresh task.
pub struct AuthenticatorService {
    config: AuthenticatorConfig,
    store: Arc<SecretStore>,
    rule: Arc<RegexRule>,
    generator: TotpGenerator,
    mutator: SessionMutator,
    ticker: RefreshTicker,
    client: EnrollmentClient,
    active: AtomicBool,
    enrolling: AtomicBool,
}

impl AuthenticatorService {
    /// Service over the network, using a reqwest transport.
    pub fn new(config: AuthenticatorConfig) -> Result<Self, VerifyError> {
        let transport = ReqwestTransport::new(config.request_timeout())?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Service over a caller-supplied transport.
    pub fn with_transport(
        config: AuthenticatorConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, VerifyError> {
        config.validate()?;
        let store = Arc::new(SecretStore::new());
        let rule = Arc::new(RegexRule::new(&config.regex));
        let generator = TotpGenerator::new(store.clone());
        Ok(Self {
            mutator: SessionMutator::new(generator.clone()),
            ticker: RefreshTicker::new(generator.clone(), config.refresh_interval()),
            client: EnrollmentClient::new(transport),
            config,
            store,
            rule,
            generator,
            active: AtomicBool::new(false),
            enrolling: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &AuthenticatorConfig {
        &self.config
    }

    /// Name the host shows for the session action.
    pub fn action_name(&self) -> &'static str {
        SESSION_ACTION_NAME
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Configuration surface
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Store a seed typed by the user; blank clears it.
    pub fn set_shared_secret(&self, text: &str) {
        self.store.set(text);
        self.refresh_if_active();
    }

    /// Encoded seed for display, empty while unset.
    pub fn get_encoded_shared_secret(&self) -> String {
        self.store.current_encoded()
    }

    /// Put back a value previously returned by
    /// [`get_encoded_shared_secret`](Self::get_encoded_shared_secret).
    pub fn restore_encoded_shared_secret(&self, encoded: &str) {
        self.store.restore_encoded(encoded);
        self.refresh_if_active();
    }

    /// Store the session pattern. An invalid pattern is kept but warned
    /// about; requests then pass through unchanged.
    pub fn set_regex(&self, pattern: &str) {
        if let Err(e) = validate_pattern(pattern) {
            log::warn!("{}", e);
        }
        self.rule.set(pattern);
    }

    pub fn get_regex(&self) -> String {
        self.rule.get()
    }

    pub fn has_secret(&self) -> bool {
        self.store.is_set()
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Enrollment
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Enroll from a QR image. The secret is stored only on success.
    pub async fn enroll_from_qr(&self, image: Vec<u8>) -> Result<SharedSecret, VerifyError> {
        let _guard = EnrollmentGuard::acquire(&self.enrolling)?;
        let result = self.client.enroll_from_qr(&self.config.device_name, image).await;
        self.commit(result)
    }

    /// Enroll from an already-decoded `oktaverify://` URI.
    pub async fn enroll_from_uri(&self, uri: &str) -> Result<SharedSecret, VerifyError> {
        let _guard = EnrollmentGuard::acquire(&self.enrolling)?;
        let result = self.client.enroll_from_uri(&self.config.device_name, uri).await;
        self.commit(result)
    }

    pub fn is_enrolling(&self) -> bool {
        self.enrolling.load(Ordering::Acquire)
    }

    fn commit(
        &self,
        result: Result<SharedSecret, VerifyError>,
    ) -> Result<SharedSecret, VerifyError> {
        match result {
            Ok(secret) => {
                self.store.set_shared_secret(&secret);
                self.start();
                Ok(secret)
            }
            Err(e) => {
                log::error!("QR code error: {}", e);
                Err(e)
            }
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Codes & request mutation
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub fn current_code(&self) -> Option<GeneratedCode> {
        self.generator.generate()
    }

    /// Rewrite `request` under an explicit pattern. Never fails.
    pub fn mutate(&self, request: &OutgoingRequest, pattern: &str) -> OutgoingRequest {
        self.mutator.mutate(request, pattern)
    }

    /// Rewrite `request` under the configured pattern. Never fails.
    pub fn handle_request(&self, request: &OutgoingRequest) -> OutgoingRequest {
        self.mutate(request, &self.rule.get())
    }

    /// Like [`handle_request`](Self::handle_request) but reports what happened.
    pub fn process_request(&self, request: &OutgoingRequest) -> Mutation {
        self.mutator.process(request, &self.rule.get())
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Refresh task
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Start (or restart) the session's refresh task. Returns whether a
    /// task is now scheduled.
    pub fn start(&self) -> bool {
        self.active.store(true, Ordering::Release);
        self.ticker.start()
    }

    pub fn stop(&self) {
        self.active.store(false, Ordering::Release);
        self.ticker.stop();
    }

    /// Host is unloading.
    pub fn shutdown(&self) {
        self.stop();
        log::info!("{} stopped", SESSION_ACTION_NAME);
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_running()
    }

    pub fn subscribe(&self) -> watch::Receiver<TickSnapshot> {
        self.ticker.subscribe()
    }

    pub fn latest_snapshot(&self) -> TickSnapshot {
        self.ticker.latest()
    }

    fn refresh_if_active(&self) {
        if self.active.load(Ordering::Acquire) {
            self.ticker.start();
        }
    }
}

/// Holds the single enrollment slot; released on drop.
struct EnrollmentGuard<'a>(&'a AtomicBool);

impl<'a> EnrollmentGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, VerifyError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| VerifyError::EnrollmentInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for EnrollmentGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
