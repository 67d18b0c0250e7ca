use thiserror::Error;

use crate::audio::AudioError;

/// Reasons a session request is refused. Never retried by the engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no sound or background is selected")]
    NoAssetSelected,

    #[error("audio unavailable: {0}")]
    AudioUnavailable(String),

    #[error("a session is already active")]
    SessionAlreadyActive,

    #[error("invalid session config: {0}")]
    InvalidConfig(String),

    #[error("only a playing session with a timer can be extended")]
    NotExtendable,

    #[error("session engine has stopped")]
    EngineStopped,
}

impl From<AudioError> for SessionError {
    fn from(err: AudioError) -> Self {
        SessionError::AudioUnavailable(err.to_string())
    }
}
