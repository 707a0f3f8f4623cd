//! Application error types with rich context

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {message}")]
    Http { message: String },

    // ─────────────────────────────────────────────────────────────
    // Terminal/TUI Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Terminal error: {message}")]
    Terminal { message: String },

    #[error("Failed to initialize terminal: {0}")]
    TerminalInit(String),

    // ─────────────────────────────────────────────────────────────
    // Device Bridge Errors
    // ─────────────────────────────────────────────────────────────
    #[error("adb not found. Install the Android platform-tools or set ANDROID_HOME.")]
    AdbNotFound,

    #[error("Device bridge error: {message}")]
    DeviceBridge { message: String },

    // ─────────────────────────────────────────────────────────────
    // Remote Session Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Automation session error: {message}")]
    Session { message: String },

    #[error("WebDriver error ({kind}): {message}")]
    WebDriver { kind: String, message: String },

    #[error("Element not found: {locator}")]
    ElementNotFound { locator: String },

    #[error("Timed out waiting for {what}")]
    Timeout { what: String },

    // ─────────────────────────────────────────────────────────────
    // Journey Errors
    // ─────────────────────────────────────────────────────────────
    #[error("[APP_NOT_FOUND]: {message}")]
    AppNotFound { app_id: String, message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel send error: {message}")]
    ChannelSend { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
        }
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self::Terminal {
            message: message.into(),
        }
    }

    pub fn device_bridge(message: impl Into<String>) -> Self {
        Self::DeviceBridge {
            message: message.into(),
        }
    }

    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    pub fn webdriver(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WebDriver {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn element_not_found(locator: impl Into<String>) -> Self {
        Self::ElementNotFound {
            locator: locator.into(),
        }
    }

    pub fn timeout(what: impl Into<String>) -> Self {
        Self::Timeout { what: what.into() }
    }

    /// App not installed or not launchable.
    ///
    /// Without a message the default wording names the package.
    pub fn app_not_found(app_id: impl Into<String>, message: Option<String>) -> Self {
        let app_id = app_id.into();
        let message = message.unwrap_or_else(|| {
            format!("The app '{}' was not found or cannot be opened.", app_id)
        });
        Self::AppNotFound { app_id, message }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            message: message.into(),
        }
    }

    /// Element lookups that ran out of time. These trigger the journey's
    /// single re-activation attempt.
    pub fn is_element_timeout(&self) -> bool {
        matches!(self, Error::ElementNotFound { .. } | Error::Timeout { .. })
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::DeviceBridge { .. }
                | Error::Session { .. }
                | Error::WebDriver { .. }
                | Error::ElementNotFound { .. }
                | Error::Timeout { .. }
                | Error::AppNotFound { .. }
                | Error::ChannelSend { .. }
        )
    }

    /// Check if this error should trigger application exit
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::TerminalInit(_) | Error::ConfigInvalid { .. })
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }
}
