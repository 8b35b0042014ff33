//! INI-style configuration and the typed settings the call core reads from it.
//!
//! ```text
//! # globals before the first section
//! display_name = "Ada"
//!
//! [Session]
//! handshake_timeout_ms = 10000
//! mesh = true
//!
//! [Media]
//! audio_device = mic-1
//!
//! [Logging]
//! log_path = ~/.rustycall/logs
//! ```

use std::{collections::HashMap, fmt, fs, path::PathBuf, time::Duration};

use crate::core::constants::{
    DEFAULT_HANDSHAKE_TIMEOUT_MS, DEFAULT_LOG_QUEUE_CAPACITY, DEFAULT_READER_POLL_MS,
};

#[derive(Debug)]
pub enum ConfigError {
    Read { path: String, reason: String },
    InvalidValue { section: String, key: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, reason } => write!(f, "error reading config {path}: {reason}"),
            Self::InvalidValue {
                section,
                key,
                value,
            } => write!(f, "invalid value for [{section}] {key}: {value:?}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Default)]
pub struct Config {
    pub globals: HashMap<String, String>,
    pub sections: HashMap<String, HashMap<String, String>>,
}

impl Config {
    /// Reads and parses a config file.
    ///
    /// # Errors
    /// Returns `ConfigError::Read` if the file cannot be read.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self::parse(&content))
    }

    /// Parses config text. Lines that are neither sections nor `key = value`
    /// pairs are ignored.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut cfg = Self::empty();
        let mut current_section: Option<String> = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                current_section = Some(name.trim().to_string());
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim().to_string();
                let value = value.trim().trim_matches('"').to_string();

                match &current_section {
                    None => {
                        cfg.globals.insert(key, value);
                    }
                    Some(sec) => {
                        cfg.sections
                            .entry(sec.clone())
                            .or_default()
                            .insert(key, value);
                    }
                }
            }
        }
        cfg
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|sec| sec.get(key))
            .map(String::as_str)
    }

    #[must_use]
    pub fn get_non_empty(&self, section: &str, key: &str) -> Option<&str> {
        self.get(section, key).filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn get_global(&self, key: &str) -> Option<&str> {
        self.globals.get(key).map(String::as_str)
    }

    /// Section value, then global value, then `default`.
    #[must_use]
    pub fn get_or_default<'a>(&'a self, section: &str, key: &str, default: &'a str) -> &'a str {
        self.get(section, key)
            .or_else(|| self.get_global(key))
            .unwrap_or(default)
    }

    /// # Errors
    /// Returns `ConfigError::InvalidValue` if the key is present but not a `u64`.
    pub fn get_u64(&self, section: &str, key: &str, default: u64) -> Result<u64, ConfigError> {
        match self.get_non_empty(section, key) {
            None => Ok(default),
            Some(raw) => raw
                .parse()
                .map_err(|_| invalid(section, key, raw)),
        }
    }

    /// Accepts `true/false`, `yes/no`, `on/off`, `1/0` (case-insensitive).
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for any other present value.
    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get_non_empty(section, key) {
            None => Ok(default),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(true),
                "false" | "no" | "off" | "0" => Ok(false),
                _ => Err(invalid(section, key, raw)),
            },
        }
    }
}

fn invalid(section: &str, key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_owned(),
        key: key.to_owned(),
        value: value.to_owned(),
    }
}

/// `[Logging]` settings consumed by [`crate::log::logger::Logger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub log_path: Option<String>,
    pub file_name: Option<String>,
    pub queue_capacity: usize,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_path: None,
            file_name: None,
            queue_capacity: DEFAULT_LOG_QUEUE_CAPACITY,
        }
    }
}

/// `[Media]` settings: preferred devices and which tracks a session starts with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSettings {
    pub audio_device: Option<String>,
    pub video_device: Option<String>,
    pub start_audio: bool,
    pub start_video: bool,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            audio_device: None,
            video_device: None,
            start_audio: true,
            start_video: true,
        }
    }
}

/// Typed settings for one call session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallConfig {
    /// How long a `Connecting` connection may wait for its answer.
    pub handshake_timeout: Duration,
    /// Granularity at which reader threads notice cancellation.
    pub reader_poll: Duration,
    /// Whether guests dial the other guests listed in the host's roster.
    pub mesh: bool,
    pub display_name: String,
    pub media: MediaSettings,
    pub logging: LoggingSettings,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_millis(DEFAULT_HANDSHAKE_TIMEOUT_MS),
            reader_poll: Duration::from_millis(DEFAULT_READER_POLL_MS),
            mesh: true,
            display_name: String::from("Guest"),
            media: MediaSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl CallConfig {
    /// Builds the typed settings, falling back to defaults for absent keys.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` when a present value cannot be parsed.
    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let opt = |section: &str, key: &str| cfg.get_non_empty(section, key).map(str::to_owned);

        let queue_capacity = cfg.get_u64(
            "Logging",
            "queue_capacity",
            defaults.logging.queue_capacity as u64,
        )?;

        Ok(Self {
            handshake_timeout: Duration::from_millis(cfg.get_u64(
                "Session",
                "handshake_timeout_ms",
                DEFAULT_HANDSHAKE_TIMEOUT_MS,
            )?),
            reader_poll: Duration::from_millis(
                cfg.get_u64("Session", "reader_poll_ms", DEFAULT_READER_POLL_MS)?
                    .max(1),
            ),
            mesh: cfg.get_bool("Session", "mesh", defaults.mesh)?,
            display_name: cfg
                .get_or_default("Session", "display_name", &defaults.display_name)
                .to_owned(),
            media: MediaSettings {
                audio_device: opt("Media", "audio_device"),
                video_device: opt("Media", "video_device"),
                start_audio: cfg.get_bool("Media", "start_audio", true)?,
                start_video: cfg.get_bool("Media", "start_video", true)?,
            },
            logging: LoggingSettings {
                log_path: opt("Logging", "log_path"),
                file_name: opt("Logging", "log_filename"),
                queue_capacity: usize::try_from(queue_capacity)
                    .map_err(|_| invalid("Logging", "queue_capacity", &queue_capacity.to_string()))?
                    .max(1),
            },
        })
    }

    /// Resolved log directory, if one is configured.
    #[must_use]
    pub fn log_dir(&self) -> Option<PathBuf> {
        self.logging.log_path.as_ref().map(PathBuf::from)
    }
}
