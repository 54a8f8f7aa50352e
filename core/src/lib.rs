pub mod config;
pub mod controller;
pub mod embed;
pub mod error;
pub mod events;
pub mod keymap;
pub mod media;
pub mod recovery;
pub mod session;
pub mod source;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-exports
pub use config::PlayerConfig;
pub use controller::PlaybackController;
pub use embed::{EmbedStatus, EmbeddedSession};
pub use error::{ClassificationError, ConfigError, ControlError, PlaybackFault, SurfaceError};
pub use events::{ControllerEvent, FailureReport};
pub use keymap::{KeyCommand, map_key};
pub use media::{EmbedFrame, FrameEvent, MediaErrorKind, MediaEvent, MediaSurface, SurfaceBinding};
pub use recovery::{RecoveryPolicy, RecoverySchedule, RetryDecision, Timer, TimerKind, TimerToken};
pub use session::{Phase, PlaybackSession, PlaybackState};
pub use source::{SourceDescriptor, SourceOrigin, SourceVariant, classify};
