//! Gateway configuration loading and credential access.
//!
//! Loads the `[whatsappgo]` table from `./whatsappgo.toml` (or
//! `$WHATSAPPGO_CONFIG_PATH`). Environment variables override file values;
//! file values override defaults.
//!
//! Precedence: env vars > config file > defaults.
//!
//! The resulting [`GatewayConfig`] is loaded once and handed to the driver;
//! nothing re-reads it per request.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::whatsapp::WhatsAppError;

/// Base URL of a locally running gateway.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Default config file name, resolved against the working directory.
const DEFAULT_CONFIG_FILE: &str = "whatsappgo.toml";

// ── Wire format ─────────────────────────────────────────────────

/// How inbound webhook bodies are encoded.
///
/// Fixed per adapter instance; never sniffed from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// `application/x-www-form-urlencoded` with bracketed nested keys.
    Form,
    /// `application/json` object with `Info`, `Text`, `Data`, ... fields.
    #[default]
    Json,
}

impl FromStr for WireFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "form" => Ok(Self::Form),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown wire format: {other:?}")),
        }
    }
}

// ── Question style ──────────────────────────────────────────────

/// How multiple-choice questions are rendered into plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStyle {
    /// One `"{value} - {label}"` line per option.
    #[default]
    Plain,
    /// WhatsApp bold markup around the value, substituted in place when the
    /// label already mentions it.
    Rich,
}

impl FromStr for QuestionStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(Self::Plain),
            "rich" => Ok(Self::Rich),
            other => Err(format!("unknown question style: {other:?}")),
        }
    }
}

// ── Gateway config ──────────────────────────────────────────────

/// Gateway connection settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bearer token for the gateway API.
    pub token: Option<String>,
    /// Gateway API base URL, without trailing slash.
    pub base_url: String,
    /// Encoding of inbound webhook bodies.
    pub wire_format: WireFormat,
    /// Rendering of outgoing questions.
    pub question_style: QuestionStyle,
    /// Timeout for outbound sends, in seconds.
    pub request_timeout_secs: u64,
    /// Timeout for attachment fetches, in seconds.
    pub fetch_timeout_secs: u64,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("token", &self.token.as_ref().map(|_| "__REDACTED__"))
            .field("base_url", &self.base_url)
            .field("wire_format", &self.wire_format)
            .field("question_style", &self.question_style)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .finish()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: DEFAULT_BASE_URL.to_owned(),
            wire_format: WireFormat::default(),
            question_style: QuestionStyle::default(),
            request_timeout_secs: 30,
            fetch_timeout_secs: 10,
        }
    }
}

/// On-disk layout: settings live under a `[whatsappgo]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    whatsappgo: GatewayConfig,
}

impl GatewayConfig {
    /// Build a config for the given token and base URL, defaults elsewhere.
    pub fn new(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let mut config = Self {
            token: Some(token.into()),
            base_url: base_url.into(),
            ..Self::default()
        };
        config.normalize();
        config
    }

    /// Replace the inbound wire format.
    #[must_use]
    pub fn with_wire_format(mut self, wire_format: WireFormat) -> Self {
        self.wire_format = wire_format;
        self
    }

    /// Replace the question rendering style.
    #[must_use]
    pub fn with_question_style(mut self, question_style: QuestionStyle) -> Self {
        self.question_style = question_style;
        self
    }

    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// Config file path: `$WHATSAPPGO_CONFIG_PATH` or `./whatsappgo.toml`.
    /// A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load using a custom env resolver (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = Self::config_path_with(&env);
        let mut config = match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading gateway config from file");
                Self::from_toml(&contents)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file found, using defaults");
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "failed to read config file {}: {e}",
                    path.display()
                ))
            }
        };
        config.apply_overrides(env);
        Ok(config)
    }

    /// Parse a TOML document holding a `[whatsappgo]` table.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML or has wrongly
    /// typed fields.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(toml_str).context("failed to parse config TOML")?;
        let mut config = file.whatsappgo;
        config.normalize();
        Ok(config)
    }

    /// Resolve the config file path from `$WHATSAPPGO_CONFIG_PATH`.
    fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        env("WHATSAPPGO_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Apply environment variable overrides (env > config > defaults).
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("WHATSAPPGO_TOKEN") {
            self.token = Some(v);
        }
        if let Some(v) = env("WHATSAPPGO_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = env("WHATSAPPGO_WIRE_FORMAT") {
            match v.parse() {
                Ok(format) => self.wire_format = format,
                Err(e) => tracing::warn!(
                    var = "WHATSAPPGO_WIRE_FORMAT",
                    value = %v,
                    error = %e,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("WHATSAPPGO_FETCH_TIMEOUT_SECS") {
            match v.parse() {
                Ok(n) => self.fetch_timeout_secs = n,
                Err(_) => tracing::warn!(
                    var = "WHATSAPPGO_FETCH_TIMEOUT_SECS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        self.normalize();
    }

    fn normalize(&mut self) {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if trimmed.len() != self.base_url.len() {
            self.base_url = trimmed.to_owned();
        }
    }

    /// Whether a usable token is present.
    pub fn is_configured(&self) -> bool {
        self.token
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty())
    }

    /// The gateway token.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::MissingCredential`] when the token is absent
    /// or blank.
    pub fn credential(&self) -> Result<&str, WhatsAppError> {
        match self.token.as_deref() {
            Some(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(WhatsAppError::MissingCredential),
        }
    }

    /// Join an endpoint path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Timeout for outbound sends.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Timeout for attachment fetches.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

// ── Tests ───────────────────────────────────────────────────────
