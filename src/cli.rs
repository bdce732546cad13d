//! Command-line surface of the host.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "okta-totp", version, about = "Okta Verify TOTP handler for request replay")]
pub struct Cli {
    /// Config file (defaults to <config dir>/okta-totp/config.json).
    #[arg(long, global = true, env = "OKTA_TOTP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Display name registered with the provider.
    #[arg(long, global = true)]
    pub device_name: Option<String>,

    /// Pattern whose matches are replaced with the current code.
    #[arg(long, global = true)]
    pub regex: Option<String>,

    /// Request timeout in seconds (none by default).
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Refresh tick period in milliseconds.
    #[arg(long, global = true)]
    pub refresh_ms: Option<u64>,

    /// Log filter, e.g. `debug` or `okta_verify=trace`. Overrides RUST_LOG.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit JSON log lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Enroll as a new Okta Verify device and print the encoded shared secret.
    Enroll(EnrollArgs),
    /// Print the current code.
    Code {
        #[command(flatten)]
        secret: SecretArgs,
        /// Print the code with its window as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the code on every refresh tick.
    Watch {
        #[command(flatten)]
        secret: SecretArgs,
        /// Stop after this many ticks.
        #[arg(long)]
        ticks: Option<usize>,
    },
    /// Rewrite a request body and print the result.
    Mutate {
        #[command(flatten)]
        secret: SecretArgs,
        #[command(flatten)]
        body: BodyArgs,
    },
    /// Decode an enrollment QR image and show what it carries.
    Inspect {
        /// PNG or JPEG image.
        image: PathBuf,
    },
    /// Render an enrollment URI as a QR PNG.
    Qr {
        /// `oktaverify://` URI.
        #[arg(long)]
        uri: String,
        /// Output file.
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct EnrollArgs {
    /// QR code image (PNG or JPEG).
    #[arg(long)]
    pub qr: Option<PathBuf>,
    /// Enrollment URI read from the QR code.
    #[arg(long)]
    pub uri: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SecretArgs {
    /// Encoded shared secret as printed by `enroll`.
    #[arg(long, env = "OKTA_TOTP_SECRET", hide_env_values = true)]
    pub secret: Option<String>,
    /// Raw base-32 seed.
    #[arg(long, conflicts_with = "secret", hide_env_values = true, env = "OKTA_TOTP_SEED")]
    pub seed: Option<String>,
}

#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct BodyArgs {
    /// Body text.
    #[arg(long)]
    pub body: Option<String>,
    /// File holding the body.
    #[arg(long)]
    pub body_file: Option<PathBuf>,
}
