// MIT License - Copyright (c) 2026 Peter Wright
// Panel configuration

use std::fmt;
use std::time::Duration;

use crate::error::{Result, TuxedoError};

/// URL scheme used to reach the panel's web server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    /// Parse a scheme name, case-insensitively.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Some(Self::Http),
            "https" => Some(Self::Https),
            _ => None,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for one Tuxedo panel.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Display name used in log lines
    pub name: String,
    /// Panel host name or IP address
    pub host: String,
    /// Optional port; omitted from URLs when `None`
    pub port: Option<u16>,
    /// URL scheme (default: http)
    pub scheme: Scheme,
    /// Numeric alarm code, forwarded verbatim on arm/disarm
    pub alarm_code: String,
    /// Whether to run the background pollers
    pub polling: bool,
    /// Poll interval in milliseconds (default: 30000)
    pub poll_interval_ms: u64,
    /// Verbose logging of every request and reconciliation; see
    /// [`PanelConfig::log_level`]
    pub debug: bool,
    /// Re-fetch the panel home page before every arm/disarm
    pub refresh_before_command: bool,
    /// Keep-alive interval in milliseconds (default: 90000, 0 disables)
    pub keepalive_interval_ms: u64,
    /// Per-request timeout in milliseconds (default: 10000)
    pub request_timeout_ms: u64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            name: "Honeywell Security".to_string(),
            host: "192.168.1.100".to_string(),
            port: None,
            scheme: Scheme::Http,
            alarm_code: String::new(),
            polling: false,
            poll_interval_ms: 30_000,
            debug: false,
            refresh_before_command: false,
            keepalive_interval_ms: 90_000,
            request_timeout_ms: 10_000,
        }
    }
}

impl PanelConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> PanelConfigBuilder {
        PanelConfigBuilder::default()
    }

    /// `{scheme}://{host}[:{port}]`, without a trailing slash.
    pub fn base_url(&self) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}", self.scheme, self.host, port),
            None => format!("{}://{}", self.scheme, self.host),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn keepalive_interval(&self) -> Option<Duration> {
        (self.keepalive_interval_ms > 0).then(|| Duration::from_millis(self.keepalive_interval_ms))
    }

    /// Default log filter for this panel: `debug` when the debug flag is
    /// set, `info` otherwise.
    pub fn log_level(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Reject configurations the bridge cannot run with.
    ///
    /// A missing alarm code is allowed (status polling still works) but
    /// every arm/disarm will be refused by the panel.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(TuxedoError::InvalidConfig {
                reason: "host must not be empty".to_string(),
            });
        }
        if self.polling && self.poll_interval_ms == 0 {
            return Err(TuxedoError::InvalidConfig {
                reason: "poll_interval_ms must be greater than zero".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(TuxedoError::InvalidConfig {
                reason: "request_timeout_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for PanelConfig.
#[derive(Debug, Clone, Default)]
pub struct PanelConfigBuilder {
    config: PanelConfig,
}

impl PanelConfigBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: Option<u16>) -> Self {
        self.config.port = port;
        self
    }

    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.config.scheme = scheme;
        self
    }

    pub fn alarm_code(mut self, code: impl Into<String>) -> Self {
        self.config.alarm_code = code.into();
        self
    }

    pub fn polling(mut self, polling: bool) -> Self {
        self.config.polling = polling;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    pub fn refresh_before_command(mut self, refresh: bool) -> Self {
        self.config.refresh_before_command = refresh;
        self
    }

    pub fn keepalive_interval_ms(mut self, ms: u64) -> Self {
        self.config.keepalive_interval_ms = ms;
        self
    }

    pub fn request_timeout_ms(mut self, ms: u64) -> Self {
        self.config.request_timeout_ms = ms;
        self
    }

    pub fn build(self) -> PanelConfig {
        self.config
    }
}
