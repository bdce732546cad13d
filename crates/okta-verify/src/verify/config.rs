//! Authenticator configuration.
//!
//! Stored as camelCase JSON. Every field has a default, so a partial file
//! or no file at all is fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::verify::constants::DEFAULT_DEVICE_NAME;
use crate::verify::types::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthenticatorConfig {
    /// Display name registered with the provider.
    pub device_name: String,
    /// Refresh tick period.
    pub refresh_interval_ms: u64,
    /// Transport timeout; `None` waits indefinitely.
    pub request_timeout_secs: Option<u64>,
    /// Initial session pattern.
    pub regex: String,
}

impl Default for AuthenticatorConfig {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            refresh_interval_ms: 1000,
            request_timeout_secs: None,
            regex: String::new(),
        }
    }
}

impl AuthenticatorConfig {
    /// `<config dir>/okta-totp/config.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("okta-totp").join("config.json"))
    }

    /// Read and validate `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, VerifyError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(VerifyError::InvalidConfig(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            VerifyError::InvalidConfig(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), VerifyError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| VerifyError::InvalidConfig(format!("{}: {}", parent.display(), e)))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| VerifyError::InvalidConfig(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| VerifyError::InvalidConfig(format!("{}: {}", path.display(), e)))
    }

    pub fn validate(&self) -> Result<(), VerifyError> {
        if self.refresh_interval_ms == 0 {
            return Err(VerifyError::InvalidConfig(
                "refreshIntervalMs must be greater than zero".into(),
            ));
        }
        if self.device_name.trim().is_empty() {
            return Err(VerifyError::InvalidConfig("deviceName must not be empty".into()));
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = AuthenticatorConfig::default();
        assert_eq!(c.device_name, "Burp");
        assert_eq!(c.refresh_interval(), Duration::from_secs(1));
        assert_eq!(c.request_timeout(), None);
        assert!(c.regex.is_empty());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let c = AuthenticatorConfig::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(c, AuthenticatorConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"regex":"\\d{6}","requestTimeoutSecs":20}"#).unwrap();
        let c = AuthenticatorConfig::load(&path).unwrap();
        assert_eq!(c.regex, r"\d{6}");
        assert_eq!(c.request_timeout(), Some(Duration::from_secs(20)));
        assert_eq!(c.device_name, "Burp");
    }

    #[test]
    fn malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = AuthenticatorConfig::load(&path).unwrap_err();
        assert!(matches!(err, VerifyError::InvalidConfig(_)));
    }

    #[test]
    fn zero_interval_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"refreshIntervalMs":0}"#).unwrap();
        assert!(AuthenticatorConfig::load(&path).is_err());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let c = AuthenticatorConfig {
            device_name: "Laptop".into(),
            refresh_interval_ms: 500,
            request_timeout_secs: Some(5),
            regex: "otp=\\d+".into(),
        };
        c.save(&path).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"deviceName\""));
        assert_eq!(AuthenticatorConfig::load(&path).unwrap(), c);
    }

    #[test]
    fn default_path_shape() {
        if let Some(p) = AuthenticatorConfig::default_path() {
            assert!(p.ends_with("okta-totp/config.json"));
        }
    }
}
