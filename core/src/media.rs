//! Seams between the controller and the things that actually play media.
//!
//! A [`MediaSurface`] is the direct playback element; an [`EmbedFrame`] hosts
//! an externally served player. Both report back asynchronously by tagging
//! their events with the [`SurfaceBinding`] they were attached with.

use crate::error::{PlaybackFault, SurfaceError};

/// Generation token tying reported events to one attachment of a surface
///
/// Bindings are issued by the controller. Once a new binding is issued every
/// older one is stale, and events carrying it are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceBinding {
    generation: u64,
}

impl SurfaceBinding {
    pub(crate) fn new(generation: u64) -> Self {
        Self { generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Error classes a media surface can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaErrorKind {
    Aborted,
    Network,
    Decode,
    SourceNotSupported,
}

impl From<MediaErrorKind> for PlaybackFault {
    fn from(kind: MediaErrorKind) -> Self {
        match kind {
            MediaErrorKind::Aborted => PlaybackFault::Aborted,
            MediaErrorKind::Network => PlaybackFault::NetworkError,
            MediaErrorKind::Decode => PlaybackFault::DecodeError,
            MediaErrorKind::SourceNotSupported => PlaybackFault::SourceNotSupported,
        }
    }
}

/// Notifications from a direct media surface
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// First frame is available
    LoadedData,
    /// Duration became known or changed; non-finite values mean unknown
    DurationChanged(f64),
    /// Playback position moved
    TimeUpdate(f64),
    /// Playback is starved of data
    Waiting,
    /// Playback is running (again)
    Playing,
    /// End of stream reached
    Ended,
    /// Loading or playback failed
    Error(MediaErrorKind),
    /// Surface detected a stall on its own
    Stalled,
    /// A play request was refused after the fact
    PlayRejected(String),
    /// The host confirmed a fullscreen change
    FullscreenChanged(bool),
    /// The host refused a fullscreen request after the fact
    FullscreenRejected(String),
}

/// Direct playback element driven by a [`crate::PlaybackSession`]
///
/// Calls never block: anything that resolves later is reported through a
/// [`MediaEvent`] tagged with the current binding.
pub trait MediaSurface {
    /// Start reporting events tagged with `binding`
    fn attach(&mut self, binding: SurfaceBinding);

    /// Stop reporting events and release the loaded source
    fn detach(&mut self);

    /// Load a source from scratch
    fn load(&mut self, url: &str, autoplay: bool) -> Result<(), SurfaceError>;

    fn play(&mut self) -> Result<(), SurfaceError>;

    fn pause(&mut self);

    /// Seek to an absolute position in seconds
    fn seek(&mut self, position: f64);

    /// Set volume (0.0 - 1.0)
    fn set_volume(&mut self, volume: f64);

    fn set_muted(&mut self, muted: bool);

    fn request_fullscreen(&mut self) -> Result<(), SurfaceError>;

    fn exit_fullscreen(&mut self) -> Result<(), SurfaceError>;

    /// Trigger a best-effort save of `url`
    fn save(&mut self, url: &str) -> Result<(), SurfaceError>;
}

/// Coarse signals from an embed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    Loaded,
    Failed(String),
}

/// Host for externally served players
pub trait EmbedFrame {
    /// Show `embed_url`, reporting load results tagged with `binding`
    fn mount(&mut self, embed_url: &str, binding: SurfaceBinding) -> Result<(), SurfaceError>;

    fn unmount(&mut self);
}
