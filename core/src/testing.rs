//! Recording fakes for the media seams.
//!
//! [`RecordingSurface`] and [`RecordingFrame`] keep every call in a shared
//! log so a test can hand a boxed clone to the controller and still inspect
//! what happened through its own handle. Synchronous failures can be armed
//! per method.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::SurfaceError;
use crate::media::{EmbedFrame, MediaSurface, SurfaceBinding};

/// One call made against a [`RecordingSurface`]
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Attach(u64),
    Detach,
    Load { url: String, autoplay: bool },
    Play,
    Pause,
    Seek(f64),
    SetVolume(f64),
    SetMuted(bool),
    RequestFullscreen,
    ExitFullscreen,
    Save(String),
}

#[derive(Debug, Default)]
struct ArmedFailures {
    load: Option<String>,
    play: Option<String>,
    fullscreen: Option<String>,
    save: Option<String>,
}

#[derive(Debug, Default)]
struct SurfaceLog {
    calls: Vec<SurfaceCall>,
    failures: ArmedFailures,
}

/// [`MediaSurface`] that records calls; clones share one log
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    log: Rc<RefCell<SurfaceLog>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call recorded since creation or the last [`clear`](Self::clear)
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.log.borrow().calls.clone()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().calls.clear();
    }

    /// Number of `load` calls recorded
    pub fn load_count(&self) -> usize {
        self.log
            .borrow()
            .calls
            .iter()
            .filter(|call| matches!(call, SurfaceCall::Load { .. }))
            .count()
    }

    /// Make every following `load` fail with `message`
    pub fn fail_load(&self, message: &str) {
        self.log.borrow_mut().failures.load = Some(message.to_string());
    }

    /// Make every following `play` fail with `message`
    pub fn fail_play(&self, message: &str) {
        self.log.borrow_mut().failures.play = Some(message.to_string());
    }

    /// Make every following fullscreen enter or exit fail with `message`
    pub fn fail_fullscreen(&self, message: &str) {
        self.log.borrow_mut().failures.fullscreen = Some(message.to_string());
    }

    /// Make every following `save` fail with `message`
    pub fn fail_save(&self, message: &str) {
        self.log.borrow_mut().failures.save = Some(message.to_string());
    }

    /// Disarm all failures
    pub fn succeed(&self) {
        self.log.borrow_mut().failures = ArmedFailures::default();
    }

    fn record(&mut self, call: SurfaceCall) {
        self.log.borrow_mut().calls.push(call);
    }

    fn armed(failure: &Option<String>) -> Result<(), SurfaceError> {
        match failure {
            Some(message) => Err(SurfaceError::new(message.clone())),
            None => Ok(()),
        }
    }
}

impl MediaSurface for RecordingSurface {
    fn attach(&mut self, binding: SurfaceBinding) {
        self.record(SurfaceCall::Attach(binding.generation()));
    }

    fn detach(&mut self) {
        self.record(SurfaceCall::Detach);
    }

    fn load(&mut self, url: &str, autoplay: bool) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::Load {
            url: url.to_string(),
            autoplay,
        });
        Self::armed(&self.log.borrow().failures.load)
    }

    fn play(&mut self) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::Play);
        Self::armed(&self.log.borrow().failures.play)
    }

    fn pause(&mut self) {
        self.record(SurfaceCall::Pause);
    }

    fn seek(&mut self, position: f64) {
        self.record(SurfaceCall::Seek(position));
    }

    fn set_volume(&mut self, volume: f64) {
        self.record(SurfaceCall::SetVolume(volume));
    }

    fn set_muted(&mut self, muted: bool) {
        self.record(SurfaceCall::SetMuted(muted));
    }

    fn request_fullscreen(&mut self) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::RequestFullscreen);
        Self::armed(&self.log.borrow().failures.fullscreen)
    }

    fn exit_fullscreen(&mut self) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::ExitFullscreen);
        Self::armed(&self.log.borrow().failures.fullscreen)
    }

    fn save(&mut self, url: &str) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::Save(url.to_string()));
        Self::armed(&self.log.borrow().failures.save)
    }
}

/// One call made against a [`RecordingFrame`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameCall {
    Mount { embed_url: String, generation: u64 },
    Unmount,
}

#[derive(Debug, Default)]
struct FrameLog {
    calls: Vec<FrameCall>,
    mount_failure: Option<String>,
}

/// [`EmbedFrame`] that records calls; clones share one log
#[derive(Debug, Clone, Default)]
pub struct RecordingFrame {
    log: Rc<RefCell<FrameLog>>,
}

impl RecordingFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<FrameCall> {
        self.log.borrow().calls.clone()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().calls.clear();
    }

    /// Make every following `mount` fail with `message`
    pub fn fail_mount(&self, message: &str) {
        self.log.borrow_mut().mount_failure = Some(message.to_string());
    }
}

impl EmbedFrame for RecordingFrame {
    fn mount(&mut self, embed_url: &str, binding: SurfaceBinding) -> Result<(), SurfaceError> {
        let mut log = self.log.borrow_mut();
        log.calls.push(FrameCall::Mount {
            embed_url: embed_url.to_string(),
            generation: binding.generation(),
        });
        match &log.mount_failure {
            Some(message) => Err(SurfaceError::new(message.clone())),
            None => Ok(()),
        }
    }

    fn unmount(&mut self) {
        self.log.borrow_mut().calls.push(FrameCall::Unmount);
    }
}
