use thiserror::Error;

/// Errors with a fixed meaning on the bridge's surface
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The platform refused the session manager handshake
    #[error("media session manager unavailable: {0}")]
    ManagerUnavailable(String),

    /// The line following `-seek` was not a usable number of seconds
    #[error("Not a Correct input")]
    InvalidSeekInput,
}
