//! Command handlers. Each writes its user-facing output to `out`;
//! diagnostics go through tracing.

use std::io::Write;

use okta_verify::verify::qr;
use okta_verify::verify::uri;
use okta_verify::verify::{
    AuthenticatorConfig, AuthenticatorService, Mutation, OutgoingRequest, TickSnapshot,
};

use crate::cli::{BodyArgs, Cli, Command, EnrollArgs, SecretArgs};

/// Config file merged with command-line overrides.
pub fn resolve_config(cli: &Cli) -> Result<AuthenticatorConfig, String> {
    let mut config = match cli.config.clone().or_else(AuthenticatorConfig::default_path) {
        Some(path) => AuthenticatorConfig::load(&path)?,
        None => AuthenticatorConfig::default(),
    };
    if let Some(name) = &cli.device_name {
        config.device_name = name.clone();
    }
    if let Some(regex) = &cli.regex {
        config.regex = regex.clone();
    }
    if let Some(secs) = cli.timeout {
        config.request_timeout_secs = Some(secs);
    }
    if let Some(ms) = cli.refresh_ms {
        config.refresh_interval_ms = ms;
    }
    config.validate()?;
    Ok(config)
}

pub async fn execute<W: Write>(cli: &Cli, out: &mut W) -> Result<(), String> {
    match &cli.command {
        Command::Inspect { image } => {
            let payload = qr::decode_qr_file(image)?;
            let data = uri::parse_enrollment_uri(&payload)?;
            writeln!(out, "{:#?}", data).map_err(io_error)
        }
        Command::Qr { uri: payload, out: path } => {
            uri::parse_enrollment_uri(payload)?;
            let png = qr::text_to_qr_png(payload, None)?;
            std::fs::write(path, png).map_err(|e| format!("{}: {}", path.display(), e))?;
            writeln!(out, "Wrote {}", path.display()).map_err(io_error)
        }
        command => {
            let service = AuthenticatorService::new(resolve_config(cli)?)?;
            let result = run_with_service(&service, command, out).await;
            service.shutdown();
            result
        }
    }
}

async fn run_with_service<W: Write>(
    service: &AuthenticatorService,
    command: &Command,
    out: &mut W,
) -> Result<(), String> {
    match command {
        Command::Enroll(args) => enroll(service, args, out).await,
        Command::Code { secret, json } => {
            load_secret(service, secret)?;
            let code = service
                .current_code()
                .ok_or("No usable shared secret. Enroll first or pass --secret/--seed.")?;
            if *json {
                let text = serde_json::to_string_pretty(&code).map_err(|e| e.to_string())?;
                writeln!(out, "{}", text).map_err(io_error)
            } else {
                writeln!(out, "{}  ({}s left)", code.code, code.remaining_seconds).map_err(io_error)
            }
        }
        Command::Watch { secret, ticks } => {
            load_secret(service, secret)?;
            watch(service, *ticks, out).await
        }
        Command::Mutate { secret, body } => {
            load_secret(service, secret)?;
            let request = OutgoingRequest::new("POST", "", read_body(body)?);
            mutate(service, &request, out)
        }
        Command::Inspect { .. } | Command::Qr { .. } => Ok(()),
    }
}

async fn enroll<W: Write>(
    service: &AuthenticatorService,
    args: &EnrollArgs,
    out: &mut W,
) -> Result<(), String> {
    let secret = match (&args.qr, &args.uri) {
        (Some(path), _) => {
            let image = std::fs::read(path).map_err(|e| format!("{}: {}", path.display(), e))?;
            service.enroll_from_qr(image).await?
        }
        (None, Some(link)) => service.enroll_from_uri(link).await?,
        (None, None) => return Err("pass --qr or --uri".into()),
    };
    tracing::info!(
        device = %service.config().device_name,
        secret = %secret.masked(),
        "Enrollment complete"
    );
    writeln!(out, "{}", service.get_encoded_shared_secret()).map_err(io_error)
}

/// Print snapshots until `ticks` have been shown or Ctrl-C.
pub async fn watch<W: Write>(
    service: &AuthenticatorService,
    ticks: Option<usize>,
    out: &mut W,
) -> Result<(), String> {
    let mut rx = service.subscribe();
    if !service.start() {
        return Err("No shared secret set. Enroll first or pass --secret/--seed.".into());
    }

    let mut shown = 0usize;
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                writeln!(out, "{}", format_snapshot(&snapshot)).map_err(io_error)?;
                out.flush().map_err(io_error)?;
                shown += 1;
                if ticks.map_or(false, |n| shown >= n) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    service.stop();
    Ok(())
}

pub fn mutate<W: Write>(
    service: &AuthenticatorService,
    request: &OutgoingRequest,
    out: &mut W,
) -> Result<(), String> {
    let forwarded = match service.process_request(request) {
        Mutation::Applied { request, replacements } => {
            tracing::debug!(replacements, "Body rewritten");
            request
        }
        Mutation::Skipped(reason) => {
            tracing::debug!(?reason, "Body left unchanged");
            request.clone()
        }
    };
    out.write_all(&forwarded.body).map_err(io_error)?;
    out.flush().map_err(io_error)
}

/// One line per tick: code, seconds left, a ten-cell progress bar.
pub fn format_snapshot(snapshot: &TickSnapshot) -> String {
    let filled = (snapshot.progress_percent as usize / 10).min(10);
    format!(
        "{}  {:>2}s  [{}{}] {:>2}%",
        snapshot.code.as_deref().unwrap_or("------"),
        snapshot.seconds_remaining,
        "#".repeat(filled),
        ".".repeat(10 - filled),
        snapshot.progress_percent,
    )
}

fn load_secret(service: &AuthenticatorService, args: &SecretArgs) -> Result<(), String> {
    match (&args.secret, &args.seed) {
        (Some(encoded), _) => service.restore_encoded_shared_secret(encoded),
        (None, Some(seed)) => service.set_shared_secret(seed),
        (None, None) => return Err("pass --secret or --seed".into()),
    }
    Ok(())
}

fn read_body(args: &BodyArgs) -> Result<Vec<u8>, String> {
    match (&args.body, &args.body_file) {
        (Some(text), _) => Ok(text.as_bytes().to_vec()),
        (None, Some(path)) => std::fs::read(path).map_err(|e| format!("{}: {}", path.display(), e)),
        (None, None) => Err("pass --body or --body-file".into()),
    }
}

fn io_error(e: std::io::Error) -> String {
    format!("output error: {}", e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_line() {
        let line = format_snapshot(&TickSnapshot {
            code: Some("123456".into()),
            seconds_remaining: 12,
            progress_percent: 60,
        });
        assert_eq!(line, "123456  12s  [######....] 60%");
        assert_eq!(format_snapshot(&TickSnapshot::default()), "------   0s  [..........]  0%");
    }
}
