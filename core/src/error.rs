//! Error taxonomy for the playback controller.
//!
//! Three families never mix: a [`ClassificationError`] means the source string
//! itself is unusable, a [`PlaybackFault`] is something the media surface
//! reported and may be retried, and a [`ControlError`] is a failed user
//! command that never touches the playback phase.

use thiserror::Error;

/// Reasons a source string could not be turned into a playable descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ClassificationError {
    /// Not an absolute URL with a network scheme
    #[error("invalid video URL format")]
    MalformedUrl,
    /// A recognized catalog host, but the path does not have a playable shape
    #[error("URL shape is not supported by this host")]
    UnsupportedHost,
    /// A recognized embed host, but no video identifier could be extracted
    #[error("no video identifier found in URL")]
    MissingIdentifier,
}

/// Abnormal signals from the underlying media surface
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackFault {
    /// Loading was aborted before the media became playable
    #[error("video playback was aborted")]
    Aborted,
    /// Network failure while fetching media data
    #[error("network error while loading video")]
    NetworkError,
    /// The media data could not be decoded
    #[error("video format could not be decoded")]
    DecodeError,
    /// The surface cannot play this kind of source at all
    #[error("video source not supported")]
    SourceNotSupported,
    /// Data starvation lasted long enough to be treated as a failure
    #[error("playback stalled")]
    Stalled,
    /// The surface refused to start playback
    #[error("error starting playback: {0}")]
    PlayRejected(String),
}

/// Failed user commands that are reported but swallowed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("error entering fullscreen mode: {0}")]
    Fullscreen(String),
    #[error("error downloading video: {0}")]
    Download(String),
}

/// Failure returned synchronously by a surface or frame implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SurfaceError {
    pub message: String,
}

impl SurfaceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Rejected configuration values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("retry base delay must be greater than zero")]
    ZeroRetryDelay,
    #[error("stall timeout must be greater than zero")]
    ZeroStallTimeout,
    #[error("seek step must be a positive number of seconds, got {0}")]
    InvalidSeekStep(f64),
    #[error("volume step must be within (0, 1], got {0}")]
    InvalidVolumeStep(f64),
    #[error("initial volume must be within [0, 1], got {0}")]
    InvalidInitialVolume(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_messages_are_human_readable() {
        assert_eq!(
            PlaybackFault::NetworkError.to_string(),
            "network error while loading video"
        );
        assert_eq!(
            PlaybackFault::PlayRejected("NotAllowedError".into()).to_string(),
            "error starting playback: NotAllowedError"
        );
    }

    #[test]
    fn test_surface_error_displays_message() {
        let err = SurfaceError::new("mpv is not running");
        assert_eq!(err.to_string(), "mpv is not running");
    }
}
