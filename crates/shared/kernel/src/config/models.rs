use flash_vault::EnvelopeFormat;
use serde::Deserialize;
use std::path::PathBuf;

/// Top-level configuration of the `flash` tools.
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FlashConfig {
    pub log: LogConfig,
    pub vault: VaultConfig,
}

/// Logging sinks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level name (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: String,
    /// Directory for rolling log files; console only when unset.
    pub dir: Option<PathBuf>,
    /// JSON lines in the log file.
    pub json: bool,
}

/// Container defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Container path used when a command is not given one.
    pub container: PathBuf,
    pub format: EnvelopeFormat,
    /// Unix permission bits of written containers.
    pub file_mode: u32,
}

// --- Default ---

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_owned(), dir: None, json: false }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            container: PathBuf::from("auth.bin"),
            format: EnvelopeFormat::default(),
            file_mode: 0o600,
        }
    }
}
