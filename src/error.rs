//! Error handling for Deepwork
//!
//! Nothing in the session core is fatal. Persistence failures are logged by
//! the sync worker and audio unlock failures are deferred by the engine, so
//! most of these variants only surface at the CLI edge.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Deepwork operations
pub type Result<T> = std::result::Result<T, FocusError>;

/// Main error type for Deepwork operations
#[derive(Error, Debug)]
pub enum FocusError {
    // Audio Errors
    #[error("Audio output is locked until a user gesture unlocks it")]
    AudioLocked,

    #[error("Unknown audio node: {node}")]
    UnknownNode { node: u64 },

    #[error("Invalid audio connection: {reason}")]
    InvalidConnection { reason: String },

    #[error("Unknown soundscape profile: {name}")]
    UnknownProfile { name: String },

    #[error("Invalid render duration: {value} seconds")]
    InvalidDuration { value: f64 },

    // Session Errors
    #[error("Focus quality must be between 1 and 5, got {value}")]
    InvalidFocusQuality { value: u8 },

    #[error("Unknown session status: {name}")]
    UnknownStatus { name: String },

    // Persistence Errors
    #[error("Session store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    #[error("Session store rejected write ({status}): {body}")]
    StoreRejected { status: u16, body: String },

    // Configuration Errors
    #[error("Invalid configuration in {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl FocusError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            FocusError::AudioLocked => "AUDIO_LOCKED",
            FocusError::UnknownNode { .. } => "UNKNOWN_NODE",
            FocusError::InvalidConnection { .. } => "INVALID_CONNECTION",
            FocusError::UnknownProfile { .. } => "UNKNOWN_PROFILE",
            FocusError::InvalidDuration { .. } => "INVALID_DURATION",
            FocusError::InvalidFocusQuality { .. } => "INVALID_FOCUS_QUALITY",
            FocusError::UnknownStatus { .. } => "UNKNOWN_STATUS",
            FocusError::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
            FocusError::StoreRejected { .. } => "STORE_REJECTED",
            FocusError::Config { .. } => "CONFIG_ERROR",
            FocusError::Io(_) => "IO_ERROR",
            FocusError::Serialization(_) => "SERIALIZATION_ERROR",
            FocusError::Wav(_) => "WAV_ERROR",
        }
    }

    /// Check if this error is recoverable without user intervention
    ///
    /// Local state stays authoritative for all of these; the flag only says
    /// whether a later attempt of the same call can be expected to succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FocusError::AudioLocked
                | FocusError::StoreUnavailable { .. }
                | FocusError::StoreRejected { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            FocusError::AudioLocked => vec![
                "Interact with the app (click or key press) to allow audio",
                "Select the soundscape again after interacting",
            ],
            FocusError::UnknownProfile { .. } => vec![
                "Run 'deepwork-cli profiles' to list available soundscapes",
                "Available profiles: silence, brown-noise, rain, wind, cafe",
            ],
            FocusError::InvalidDuration { .. } => {
                vec!["Pass --seconds as a finite, non-negative number"]
            }
            FocusError::InvalidFocusQuality { .. } => {
                vec!["Rate the session with a whole number from 1 to 5"]
            }
            FocusError::StoreUnavailable { .. } => vec![
                "Check your network connection",
                "Your session is kept locally; it will not be lost from this run",
            ],
            FocusError::StoreRejected { .. } => vec![
                "Check DEEPWORK_STORE_KEY is valid",
                "Verify the store has focus_sessions and parking_lot_items tables",
            ],
            FocusError::Config { .. } => vec![
                "Check the configuration file is valid JSON",
                "Keep audio.sample_rate between 8000 and 192000",
                "Remove the file to fall back to defaults",
            ],
            _ => vec![],
        }
    }
}
