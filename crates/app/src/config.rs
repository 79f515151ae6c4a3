use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use exam_core::model::{SessionSettings, SettingsError};
use tracing::warn;
use url::Url;

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    MissingDocument,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::MissingDocument => {
                write!(f, "no test document given (pass a path or set EXAM_DOCUMENT)")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(raw: String, flag: &'static str) -> Result<T, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

/// Runner configuration: environment first, then command-line flags.
#[derive(Clone, Debug)]
pub struct Config {
    pub document: Option<PathBuf>,
    /// Base URL for audio references; the document's directory when unset.
    pub audio_base: Option<String>,
    pub duration_secs: Option<u32>,
    pub tick_ms: u64,
    pub auto_play: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            document: None,
            audio_base: None,
            duration_secs: None,
            tick_ms: 1_000,
            auto_play: false,
        }
    }
}

/// Accepts the usual spellings of a boolean switch.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse an environment value, logging and dropping one that does not parse.
fn checked<T>(key: &str, raw: Option<String>, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    let raw = raw?;
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    let parsed = parse(value);
    if parsed.is_none() {
        warn!(key, value, "ignoring invalid environment value");
    }
    parsed
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        Self {
            document: non_empty("EXAM_DOCUMENT").map(PathBuf::from),
            audio_base: non_empty("EXAM_AUDIO_BASE"),
            duration_secs: checked("EXAM_DURATION_SECS", var("EXAM_DURATION_SECS"), |v| {
                v.parse().ok()
            }),
            tick_ms: checked("EXAM_TICK_MS", var("EXAM_TICK_MS"), |v| v.parse().ok())
                .unwrap_or(default.tick_ms),
            auto_play: checked("EXAM_AUTO_PLAY", var("EXAM_AUTO_PLAY"), parse_flag)
                .unwrap_or(default.auto_play),
        }
    }

    /// Overlay command-line flags. A bare argument is the document path.
    ///
    /// # Errors
    ///
    /// Returns `ArgsError` for unknown flags, missing values, or bad numbers.
    pub fn apply_args(
        mut self,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut positional = false;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--audio-base" => self.audio_base = Some(require_value(args, "--audio-base")?),
                "--duration" => {
                    let value = require_value(args, "--duration")?;
                    self.duration_secs = Some(parse_number(value, "--duration")?);
                }
                "--tick-ms" => {
                    let value = require_value(args, "--tick-ms")?;
                    self.tick_ms = parse_number(value, "--tick-ms")?;
                }
                "--auto-play" => self.auto_play = true,
                // Read by the logging setup before the environment.
                "--verbose" | "-v" => {}
                _ if arg.starts_with('-') => return Err(ArgsError::UnknownArg(arg)),
                _ if !positional => {
                    self.document = Some(PathBuf::from(&arg));
                    positional = true;
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns `ArgsError::MissingDocument` when neither the environment nor
    /// the arguments named one.
    pub fn document_path(&self) -> Result<&Path, ArgsError> {
        self.document.as_deref().ok_or(ArgsError::MissingDocument)
    }

    /// # Errors
    ///
    /// Returns `SettingsError` for a zero duration or an out-of-range tick.
    pub fn settings(&self) -> Result<SessionSettings, SettingsError> {
        SessionSettings::new(self.duration_secs, self.tick_ms, self.auto_play, true)
    }

    /// Resolve the audio base, falling back to the document's directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the configured base is not a URL or the document
    /// directory cannot be expressed as one.
    pub fn audio_base_url(&self, document: &Path) -> anyhow::Result<Url> {
        if let Some(raw) = &self.audio_base {
            let mut url = Url::parse(raw)?;
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            return Ok(url);
        }

        let absolute = std::fs::canonicalize(document)?;
        let dir = absolute.parent().unwrap_or(&absolute);
        Url::from_directory_path(dir)
            .map_err(|()| anyhow::anyhow!("cannot build a file URL for {}", dir.display()))
    }
}
