//! Session mutator: injects a fresh code into outgoing request bodies.
//!
//! Every failure degrades to passing the request through untouched; the
//! reason is logged and reported as a [`SkipReason`], never as an error.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use regex::bytes::{NoExpand, Regex};

use crate::verify::core::TotpGenerator;
use crate::verify::types::*;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Request model
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The slice of an intercepted request the mutator needs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutgoingRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl OutgoingRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Copy of this request carrying `body`. An existing `Content-Length`
    /// header is rewritten to the new length; `self` is left as it was.
    pub fn with_body(&self, body: Vec<u8>) -> Self {
        let len = body.len().to_string();
        let headers = self
            .headers
            .iter()
            .map(|(k, v)| {
                if k.eq_ignore_ascii_case("Content-Length") {
                    (k.clone(), len.clone())
                } else {
                    (k.clone(), v.clone())
                }
            })
            .collect();
        Self {
            method: self.method.clone(),
            url: self.url.clone(),
            headers,
            body,
        }
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Regex rule
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The user-supplied pattern locating the code in request bodies.
/// Empty means "do not rewrite".
#[derive(Debug, Default)]
pub struct RegexRule {
    pattern: RwLock<String>,
}

impl RegexRule {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: RwLock::new(pattern.to_string()),
        }
    }

    /// Replace the pattern. Not validated here; a bad pattern is reported
    /// by [`validate_pattern`] or skipped at request time.
    pub fn set(&self, pattern: &str) {
        *self.write() = pattern.to_string();
        log::info!("Regex updated.");
    }

    pub fn get(&self) -> String {
        self.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, String> {
        self.pattern.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, String> {
        self.pattern.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Compile `pattern` the way the mutator will.
pub fn validate_pattern(pattern: &str) -> Result<(), VerifyError> {
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| VerifyError::InvalidPattern(e.to_string()))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Mutation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Why a request was passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    CodeUnavailable,
    NoPattern,
    EmptyBody,
    InvalidPattern(String),
    NoMatch,
}

/// Outcome of one mutation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Applied {
        request: OutgoingRequest,
        replacements: usize,
    },
    Skipped(SkipReason),
}

impl Mutation {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// The request to forward: the rewritten one, or a copy of `original`.
    pub fn into_request(self, original: &OutgoingRequest) -> OutgoingRequest {
        match self {
            Self::Applied { request, .. } => request,
            Self::Skipped(_) => original.clone(),
        }
    }
}

/// Rewrites request bodies with codes from a [`TotpGenerator`].
#[derive(Debug, Clone)]
pub struct SessionMutator {
    generator: TotpGenerator,
}

impl SessionMutator {
    pub fn new(generator: TotpGenerator) -> Self {
        Self { generator }
    }

    /// The request to forward for `request` under `pattern`. Total: any
    /// failure yields an unchanged copy.
    pub fn mutate(&self, request: &OutgoingRequest, pattern: &str) -> OutgoingRequest {
        self.process(request, pattern).into_request(request)
    }

    /// Like [`mutate`](Self::mutate) but reports what happened.
    pub fn process(&self, request: &OutgoingRequest, pattern: &str) -> Mutation {
        match self.generator.generate() {
            Some(code) => apply_code(request, pattern, &code.code),
            None => {
                log::error!("TOTP generation failed. Request processing skipped.");
                Mutation::Skipped(SkipReason::CodeUnavailable)
            }
        }
    }
}

/// Replace every match of `pattern` in the body of `request` with `code`.
///
/// `code` is inserted literally; `$` in it is not a group reference.
pub fn apply_code(request: &OutgoingRequest, pattern: &str, code: &str) -> Mutation {
    if pattern.is_empty() {
        log::warn!("No regex pattern provided. Request processing skipped.");
        return Mutation::Skipped(SkipReason::NoPattern);
    }
    if request.body.is_empty() {
        log::info!("Request body is empty. No TOTP replacement applied.");
        return Mutation::Skipped(SkipReason::EmptyBody);
    }

    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => {
            log::error!("Error applying regex to request body: {}", e);
            return Mutation::Skipped(SkipReason::InvalidPattern(e.to_string()));
        }
    };

    let replacements = re.find_iter(&request.body).count();
    if replacements == 0 {
        log::warn!("No matching regex found in the request body. No changes made.");
        return Mutation::Skipped(SkipReason::NoMatch);
    }

    let body = re.replace_all(&request.body, NoExpand(code.as_bytes())).into_owned();
    log::info!("TOTP successfully applied to the request.");
    Mutation::Applied {
        request: request.with_body(body),
        replacements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::secret::SecretStore;
    use std::sync::Arc;

    fn post(body: &str) -> OutgoingRequest {
        OutgoingRequest::new("POST", "https://app.example/login", body)
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_header("Content-Length", body.len().to_string())
    }

    #[test]
    fn single_match_replaced() {
        let req = post("foo 123456 bar");
        let m = apply_code(&req, r"\d{6}", "654321");
        let out = m.into_request(&req);
        assert_eq!(out.body_text(), "foo 654321 bar");
        assert_eq!(req.body_text(), "foo 123456 bar");
    }

    #[test]
    fn every_match_replaced() {
        let req = post("a=111111&b=222222&c=333333");
        match apply_code(&req, r"\d{6}", "654321") {
            Mutation::Applied { request, replacements } => {
                assert_eq!(replacements, 3);
                assert_eq!(request.body_text(), "a=654321&b=654321&c=654321");
            }
            other => panic!("expected Applied, got {:?}", other),
        }
    }

    #[test]
    fn no_match_passes_through() {
        let req = post("foo 123456 bar");
        let m = apply_code(&req, "nomatch", "654321");
        assert_eq!(m, Mutation::Skipped(SkipReason::NoMatch));
        assert_eq!(m.into_request(&req), req);
    }

    #[test]
    fn empty_pattern_passes_through() {
        let req = post("foo 123456 bar");
        assert_eq!(apply_code(&req, "", "654321"), Mutation::Skipped(SkipReason::NoPattern));
    }

    #[test]
    fn empty_body_passes_through() {
        let req = OutgoingRequest::new("GET", "https://app.example/", Vec::new());
        assert_eq!(apply_code(&req, r"\d{6}", "654321"), Mutation::Skipped(SkipReason::EmptyBody));
    }

    #[test]
    fn invalid_pattern_passes_through() {
        let req = post("foo 123456 bar");
        let m = apply_code(&req, "(unclosed", "654321");
        assert!(matches!(m, Mutation::Skipped(SkipReason::InvalidPattern(_))));
        assert_eq!(m.into_request(&req).body_text(), "foo 123456 bar");
    }

    #[test]
    fn code_is_inserted_literally() {
        let req = post("otp=000000");
        let out = apply_code(&req, r"(\d{6})", "$1x").into_request(&req);
        assert_eq!(out.body_text(), "otp=$1x");
    }

    #[test]
    fn content_length_follows_body() {
        let req = post("otp=1&x=y");
        let out = apply_code(&req, r"otp=\d+", "otp=123456").into_request(&req);
        assert_eq!(out.body_text(), "otp=123456&x=y");
        assert_eq!(out.header("content-length"), Some("14"));
        assert_eq!(req.header("Content-Length"), Some("9"));
    }

    #[test]
    fn non_utf8_body_is_handled() {
        let mut body = vec![0xff, 0xfe];
        body.extend_from_slice(b" code=123456");
        let req = OutgoingRequest::new("POST", "https://app.example/", body);
        let out = apply_code(&req, r"\d{6}", "654321").into_request(&req);
        assert_eq!(&out.body[..2], &[0xff, 0xfe]);
        assert!(out.body.ends_with(b"code=654321"));
    }

    #[test]
    fn mutator_skips_without_secret() {
        let mutator = SessionMutator::new(TotpGenerator::new(Arc::new(SecretStore::new())));
        let req = post("foo 123456 bar");
        assert_eq!(mutator.process(&req, r"\d{6}"), Mutation::Skipped(SkipReason::CodeUnavailable));
        assert_eq!(mutator.mutate(&req, r"\d{6}"), req);
    }

    #[test]
    fn mutator_injects_current_code() {
        let store = Arc::new(SecretStore::new());
        store.set("JBSWY3DPEHPK3PXP");
        let mutator = SessionMutator::new(TotpGenerator::new(store));

        let req = post("otp=______");
        let out = mutator.mutate(&req, "______");
        let text = out.body_text();
        let code = text.trim_start_matches("otp=");
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    /// Records every log line emitted while tests in this binary run.
    struct Capture(std::sync::Mutex<Vec<(log::Level, String)>>);

    impl log::Log for Capture {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }
        fn log(&self, record: &log::Record) {
            self.0.lock().unwrap().push((record.level(), record.args().to_string()));
        }
        fn flush(&self) {}
    }

    static CAPTURE: Capture = Capture(std::sync::Mutex::new(Vec::new()));

    fn level_of(message: &str) -> Option<log::Level> {
        CAPTURE
            .0
            .lock()
            .unwrap()
            .iter()
            .find(|(_, m)| m.starts_with(message))
            .map(|(l, _)| *l)
    }

    #[test]
    fn misconfigured_pattern_skips_are_warnings() {
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(log::LevelFilter::Trace);

        let req = post("foo 123456 bar");
        apply_code(&req, "", "654321");
        apply_code(&req, "nomatch", "654321");

        assert_eq!(level_of("No regex pattern provided."), Some(log::Level::Warn));
        assert_eq!(level_of("No matching regex found"), Some(log::Level::Warn));
    }

    #[test]
    fn rule_cell() {
        let rule = RegexRule::default();
        assert!(rule.is_empty());
        rule.set(r"\d{6}");
        assert_eq!(rule.get(), r"\d{6}");
        rule.set("");
        assert!(rule.is_empty());
        assert!(validate_pattern(r"\d{6}").is_ok());
        assert_eq!(validate_pattern("(").unwrap_err().category(), ErrorCategory::Validation);
    }
}
