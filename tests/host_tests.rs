use app_lib::cli::{Cli, Command};
use app_lib::commands::{execute, format_snapshot, mutate, resolve_config};
use async_trait::async_trait;
use clap::Parser;
use okta_verify::verify::uri;
use okta_verify::verify::{
    AuthenticatorConfig, AuthenticatorService, HttpRequest, HttpResponse, HttpTransport,
    OutgoingRequest, TickSnapshot, VerifyData, VerifyError,
};
use std::sync::Arc;

/// Transport for tests that must never reach the network.
struct Offline;

#[async_trait]
impl HttpTransport for Offline {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, VerifyError> {
        Err(VerifyError::Connection { url: request.url, message: "offline".into() })
    }
}

fn offline_service(config: AuthenticatorConfig) -> AuthenticatorService {
    AuthenticatorService::with_transport(config, Arc::new(Offline)).unwrap()
}

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("okta-totp").chain(args.iter().copied())).unwrap()
}

#[test]
fn test_resolve_config_from_file_with_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"deviceName":"From File","regex":"otp=\\d+","refreshIntervalMs":250}"#)
        .unwrap();
    let path_arg = path.to_str().unwrap();

    let cli = parse(&["--config", path_arg, "code", "--seed", "JBSWY3DPEHPK3PXP"]);
    let config = resolve_config(&cli).unwrap();
    assert_eq!(config.device_name, "From File");
    assert_eq!(config.regex, "otp=\\d+");
    assert_eq!(config.refresh_interval_ms, 250);

    let cli = parse(&[
        "--config", path_arg, "--device-name", "CLI", "--timeout", "7", "code", "--seed", "X",
    ]);
    let config = resolve_config(&cli).unwrap();
    assert_eq!(config.device_name, "CLI");
    assert_eq!(config.request_timeout_secs, Some(7));
    assert_eq!(config.regex, "otp=\\d+");
}

#[test]
fn test_resolve_config_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let cli = parse(&["--config", path.to_str().unwrap(), "code", "--seed", "X"]);
    assert_eq!(resolve_config(&cli).unwrap(), AuthenticatorConfig::default());
}

#[test]
fn test_resolve_config_rejects_zero_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let cli = parse(&["--config", path.to_str().unwrap(), "--refresh-ms", "0", "code", "--seed", "X"]);
    let err = resolve_config(&cli).unwrap_err();
    assert!(err.contains("refreshIntervalMs"));
}

#[test]
fn test_mutate_writes_rewritten_body() {
    let service = offline_service(AuthenticatorConfig { regex: r"\d{6}".into(), ..Default::default() });
    service.set_shared_secret("JBSWY3DPEHPK3PXP");

    let request = OutgoingRequest::new("POST", "https://app.example/mfa", "pin=000000&next=/home");
    let mut out = Vec::new();
    mutate(&service, &request, &mut out).unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("pin="));
    assert!(text.ends_with("&next=/home"));
    assert_eq!(text.len(), request.body.len());
}

#[test]
fn test_mutate_without_secret_passes_body_through() {
    let service = offline_service(AuthenticatorConfig { regex: r"\d{6}".into(), ..Default::default() });
    let request = OutgoingRequest::new("POST", "https://app.example/mfa", "pin=000000");
    let mut out = Vec::new();
    mutate(&service, &request, &mut out).unwrap();
    assert_eq!(out, b"pin=000000");
}

#[tokio::test]
async fn test_qr_then_inspect() {
    let dir = tempfile::tempdir().unwrap();
    let png = dir.path().join("enroll.png");
    let link = uri::build_enrollment_uri(&VerifyData {
        t: "secret-transaction-token".into(),
        f: "autXYZ".into(),
        domain: "acme.okta.com".into(),
    });

    let cli = parse(&["qr", "--uri", &link, "--out", png.to_str().unwrap()]);
    let mut out = Vec::new();
    execute(&cli, &mut out).await.unwrap();
    assert!(png.exists());

    let cli = parse(&["inspect", png.to_str().unwrap()]);
    assert!(matches!(cli.command, Command::Inspect { .. }));
    let mut out = Vec::new();
    execute(&cli, &mut out).await.unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("acme.okta.com"));
    assert!(text.contains("autXYZ"));
    assert!(!text.contains("secret-transaction-token"));
}

#[tokio::test]
async fn test_qr_refuses_foreign_uri() {
    let dir = tempfile::tempdir().unwrap();
    let png = dir.path().join("x.png");
    let cli = parse(&["qr", "--uri", "https://acme.okta.com/", "--out", png.to_str().unwrap()]);
    let mut out = Vec::new();
    let err = execute(&cli, &mut out).await.unwrap_err();
    assert!(err.contains("oktaverify"));
    assert!(!png.exists());
}

#[test]
fn test_snapshot_line_without_code() {
    let line = format_snapshot(&TickSnapshot { code: None, seconds_remaining: 30, progress_percent: 0 });
    assert!(line.starts_with("------  30s"));
}
