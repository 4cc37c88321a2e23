//! TOML-based settings persistence.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\ScrcpyAudio\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/scrcpy-audio/config.toml` (or `~/.config/...`)
//! - macOS:    `~/Library/Application Support/ScrcpyAudio/config.toml`
//!
//! ```toml
//! [general]
//! log_level = "warn"
//!
//! [session]
//! host = "192.168.1.10"
//! port = 5555
//! buffer_ms = 200
//!
//! [tools]
//! tools_dir = "/opt/android/platform-tools"
//! ```
//!
//! Every section and field is optional; absent values take the
//! `#[serde(default = ...)]` helpers below.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use scrcpy_audio_core::{BufferSetting, Endpoint, DEFAULT_BUFFER_MS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::ports::{ConfigSaveError, ConfigStore};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level settings stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// Schema version string – bump when breaking changes are introduced.
    #[serde(default = "default_version")]
    pub version: String,
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Form values of the last successful connect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default = "default_buffer_ms")]
    pub buffer_ms: u32,
    /// Passed to scrcpy as `--audio-bit-rate`, e.g. `"128K"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_bit_rate: Option<String>,
}

/// Explicit tool locations; each overrides discovery for its tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adb_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrcpy_path: Option<PathBuf>,
    /// Folder scanned for both executables before the search path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools_dir: Option<PathBuf>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_version() -> String {
    "1.0".to_string()
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_buffer_ms() -> u32 {
    DEFAULT_BUFFER_MS
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            log_level: default_log_level(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            buffer_ms: default_buffer_ms(),
            audio_bit_rate: None,
        }
    }
}

impl SessionConfig {
    /// The saved buffer as a domain value.
    pub fn buffer(&self) -> BufferSetting {
        BufferSetting::from_millis(self.buffer_ms)
    }

    /// The saved endpoint, if both host and port were recorded.
    pub fn endpoint(&self) -> Option<Endpoint> {
        let host = self.host.as_deref()?;
        Endpoint::new(host, self.port?).ok()
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from `path`, returning the defaults if the file does not
/// exist yet.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Like [`load_config`], but never fails: an unreadable or malformed file
/// yields the defaults together with the error that caused the fallback.
pub fn load_or_default(path: &Path) -> (AppConfig, Option<ConfigError>) {
    match load_config(path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    }
}

/// Persists `config` to `path`, creating the parent directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory including the app subfolder.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("ScrcpyAudio"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("ScrcpyAudio")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("scrcpy-audio"))
    }
}

// ── ConfigStore adapter ───────────────────────────────────────────────────────

/// [`ConfigStore`] that rewrites the TOML file after each successful connect.
///
/// Holds the loaded config so that sections other than `[session]` are
/// written back unchanged.
pub struct TomlConfigStore {
    path: PathBuf,
    config: Mutex<AppConfig>,
}

impl TomlConfigStore {
    pub fn new(path: impl Into<PathBuf>, config: AppConfig) -> Self {
        Self {
            path: path.into(),
            config: Mutex::new(config),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for TomlConfigStore {
    fn save_last_session(
        &self,
        endpoint: &Endpoint,
        buffer: BufferSetting,
    ) -> Result<(), ConfigSaveError> {
        let mut config = self
            .config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        config.session.host = Some(endpoint.host().to_string());
        config.session.port = Some(endpoint.port());
        config.session.buffer_ms = buffer.millis();
        save_config(&self.path, &config).map_err(ConfigSaveError::new)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_config_path() -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("scrcpy_audio_cfg_{}", Uuid::new_v4()));
        let path = dir.join("nested").join("config.toml");
        (dir, path)
    }

    // ── AppConfig defaults ────────────────────────────────────────────────────

    #[test]
    fn test_default_buffer_is_200_ms() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.session.buffer_ms, 200);
        assert_eq!(cfg.session.buffer(), BufferSetting::from_millis(200));
    }

    #[test]
    fn test_default_log_level_is_warn() {
        assert_eq!(GeneralConfig::default().log_level, "warn");
    }

    #[test]
    fn test_default_has_no_saved_endpoint() {
        assert_eq!(AppConfig::default().session.endpoint(), None);
    }

    // ── TOML parsing ──────────────────────────────────────────────────────────

    #[test]
    fn test_empty_file_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_partial_session_overrides_defaults() {
        // Arrange
        let toml_str = r#"
[session]
host = "192.168.1.10"
port = 5555
"#;

        // Act
        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(
            cfg.session.endpoint(),
            Some(Endpoint::new("192.168.1.10", 5555).unwrap())
        );
        assert_eq!(cfg.session.buffer_ms, 200);
        assert_eq!(cfg.general.log_level, "warn");
    }

    #[test]
    fn test_unset_optional_fields_are_omitted() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).expect("serialize");

        assert!(!toml_str.contains("host"));
        assert!(!toml_str.contains("adb_path"));
        assert!(toml_str.contains("buffer_ms = 200"));
    }

    // ── load / save on disk ───────────────────────────────────────────────────

    #[test]
    fn test_load_config_returns_default_when_file_absent() {
        let (_dir, path) = temp_config_path();

        let cfg = load_config(&path).expect("absent file is not an error");

        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        // Arrange
        let (dir, path) = temp_config_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        // Act
        let (cfg, err) = load_or_default(&path);

        // Assert
        assert_eq!(cfg, AppConfig::default());
        assert!(matches!(err, Some(ConfigError::Parse(_))));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_creates_directory_and_round_trips() {
        // Arrange
        let (dir, path) = temp_config_path();
        let mut cfg = AppConfig::default();
        cfg.session.audio_bit_rate = Some("128K".to_string());
        cfg.tools.tools_dir = Some(PathBuf::from("/opt/android"));

        // Act
        save_config(&path, &cfg).expect("save");
        let loaded = load_config(&path).expect("load");

        // Assert
        assert_eq!(loaded, cfg);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_store_records_session_and_preserves_other_sections() {
        // Arrange
        let (dir, path) = temp_config_path();
        let mut initial = AppConfig::default();
        initial.general.log_level = "debug".to_string();
        initial.tools.adb_path = Some(PathBuf::from("/usr/local/bin/adb"));
        let store = TomlConfigStore::new(&path, initial);

        // Act
        store
            .save_last_session(
                &Endpoint::new("10.0.0.7", 5555).unwrap(),
                BufferSetting::from_millis(80),
            )
            .expect("save");

        // Assert
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded.session.host.as_deref(), Some("10.0.0.7"));
        assert_eq!(loaded.session.port, Some(5555));
        assert_eq!(loaded.session.buffer_ms, 80);
        assert_eq!(loaded.general.log_level, "debug");
        assert_eq!(loaded.tools.adb_path, Some(PathBuf::from("/usr/local/bin/adb")));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_store_reports_io_failure_with_typed_source() {
        use std::error::Error as _;

        // Arrange – the config "directory" is a regular file
        let (dir, _) = temp_config_path();
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let blocker = dir.join("blocker");
        std::fs::write(&blocker, b"").expect("create blocker");
        let store = TomlConfigStore::new(blocker.join("config.toml"), AppConfig::default());

        // Act
        let err = store
            .save_last_session(
                &Endpoint::new("10.0.0.7", 5555).unwrap(),
                BufferSetting::from_millis(80),
            )
            .unwrap_err();

        // Assert
        let source = err.source().expect("source");
        assert!(matches!(
            source.downcast_ref::<ConfigError>(),
            Some(ConfigError::Io { .. })
        ));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_config_file_path_ends_with_config_toml() {
        if let Ok(path) = config_file_path() {
            assert!(path.ends_with("config.toml"), "got {path:?}");
        }
    }
}
