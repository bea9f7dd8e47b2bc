mod models;

pub use models::{FlashConfig, LogConfig, VaultConfig};

use config::{Config, Environment, File, Map};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default configuration file stem, resolved against the working directory (`flash.toml`).
pub const DEFAULT_CONFIG: &str = "flash";

/// Prefix of environment overrides, e.g. `FLASH__VAULT__FORMAT=bound`.
pub const ENV_PREFIX: &str = "FLASH";

/// Custom error type for config loading.
#[flash_derive::flash_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Loads a configuration from an optional file plus environment overrides.
///
/// 1. **Base File**: the given path (required to exist), or `flash.toml` in the working
///    directory if present.
/// 2. **Environment Overrides**: variables prefixed with `FLASH__`; nested keys are separated
///    by double underscores (`FLASH__LOG__LEVEL` maps to `log.level`).
///
/// Keys missing from both layers fall back to `T`'s serde defaults.
///
/// # Errors
/// Returns [`ConfigError::Config`] if an explicit file is missing, a source is malformed, or the
/// merged values do not deserialize into `T`.
///
/// # Example
/// ```rust
/// use flash_kernel::config::{FlashConfig, load_config};
///
/// let cfg: FlashConfig = load_config(None::<&str>).unwrap_or_default();
/// assert_eq!(cfg.vault.container, std::path::PathBuf::from("auth.bin"));
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    load_layers(path, None)
}

/// Same as [`load_config`] but reads overrides from `env` instead of the process environment.
pub(crate) fn load_layers<T>(
    path: Option<impl AsRef<Path>>,
    env: Option<Map<String, String>>,
) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let (file, required) = path.map_or_else(
        || (PathBuf::from(DEFAULT_CONFIG), false),
        |p| (p.as_ref().to_path_buf(), true),
    );

    let builder = Config::builder()
        .add_source(File::from(file.as_path()).required(required))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .convert_case(config::Case::Snake)
                .try_parsing(true)
                .source(env),
        );

    debug!(path = %file.display(), required, "Loading configuration");

    let config = builder
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flash_vault::EnvelopeFormat;
    use std::io::Write;

    fn write_toml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_without_any_source() {
        let cfg: FlashConfig = load_layers(None::<&str>, Some(Map::new())).unwrap();
        assert_eq!(cfg.log.level, "info");
        assert!(cfg.log.dir.is_none());
        assert_eq!(cfg.vault.format, EnvelopeFormat::Detached);
        assert_eq!(cfg.vault.file_mode, 0o600);
    }

    #[test]
    fn file_values_are_applied() {
        let file = write_toml(
            r#"
            [log]
            level = "debug"
            json = true

            [vault]
            container = "node/auth.bin"
            format = "bound"
            file_mode = 0o640
            "#,
        );

        let cfg: FlashConfig = load_layers(Some(file.path()), Some(Map::new())).unwrap();
        assert_eq!(cfg.log.level, "debug");
        assert!(cfg.log.json);
        assert_eq!(cfg.vault.container, PathBuf::from("node/auth.bin"));
        assert_eq!(cfg.vault.format, EnvelopeFormat::Bound);
        assert_eq!(cfg.vault.file_mode, 0o640);
    }

    #[test]
    fn environment_overrides_file() {
        let file = write_toml("[log]\nlevel = \"debug\"\n");
        let env = Map::from([
            ("FLASH__LOG__LEVEL".to_owned(), "warn".to_owned()),
            ("FLASH__VAULT__FORMAT".to_owned(), "bound".to_owned()),
        ]);

        let cfg: FlashConfig = load_layers(Some(file.path()), Some(env)).unwrap();
        assert_eq!(cfg.log.level, "warn");
        assert_eq!(cfg.vault.format, EnvelopeFormat::Bound);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let result: Result<FlashConfig, _> =
            load_layers(Some("/definitely/not/here/flash.toml"), Some(Map::new()));
        assert!(matches!(result, Err(ConfigError::Config { .. })));
    }

    #[test]
    fn unknown_format_is_rejected() {
        let file = write_toml("[vault]\nformat = \"sealed\"\n");
        let result: Result<FlashConfig, _> = load_layers(Some(file.path()), Some(Map::new()));
        assert!(result.is_err());
    }
}
