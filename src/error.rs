//! Error types for the breathing session engine.

/// Top-level error type for breathline.
///
/// Most of these never reach the session user: the synthesizer, narrator
/// and controller log host failures and continue with a reduced channel.
#[derive(Debug, thiserror::Error)]
pub enum BreathlineError {
    /// Audio device, stream or host audio subsystem error.
    #[error("audio error: {0}")]
    Audio(String),

    /// Host speech service error.
    #[error("speech error: {0}")]
    Speech(String),

    /// Pre-recorded cue lookup or decode error.
    #[error("cue error: {0}")]
    Cue(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Session log or preference persistence error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, BreathlineError>;
