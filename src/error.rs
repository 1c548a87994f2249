//! Error handling for the Vortex telemetry engine.

/// A specialized `Result` type for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// The main error type for telemetry and actuation plumbing.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A metric provider failed for this poll only
    #[error("Provider read failed: {0}")]
    Provider(String),

    /// A capability is missing for the lifetime of the process
    #[error("Capability unavailable: {0}")]
    Unavailable(String),

    /// A sample would break timestamp ordering within a channel
    #[error("Sample at {timestamp}s is older than the latest sample at {latest}s")]
    OutOfOrderSample { timestamp: f64, latest: f64 },

    /// Native tuning library failed to load or to execute
    #[error("Tuning library error: {0}")]
    Library(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),
}

impl TelemetryError {
    /// Create a new transient provider error
    pub fn provider_error(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a new unavailable-capability error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a new tuning library error
    pub fn library_error(msg: impl Into<String>) -> Self {
        Self::Library(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Whether this error marks a persistent absence rather than a one-off failure.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
