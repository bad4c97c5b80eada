use thiserror::Error;

/// Unified error type for the rotation engine
///
/// Every failure the engine can surface is a distinct variant, so callers can
/// special-case "no proxy left" vs. "bad proxy string" vs. "hook
/// misconfiguration" without string matching.
#[derive(Error, Debug)]
pub enum RotationError {
    // Proxy spec errors
    #[error("Invalid proxy URL: {0}")]
    InvalidProxySpec(String),

    #[error("Unsupported proxy scheme: {0}")]
    UnsupportedScheme(String),

    // Rotation errors
    #[error("No available proxy")]
    NoAvailableProxy,

    // Hook registration errors
    #[error("Hook '{name}' is already registered on this request")]
    HookCollision { name: String },

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for rotation engine operations
pub type Result<T> = std::result::Result<T, RotationError>;
