//! Playback controller.
//!
//! The controller owns the media surface and the embed frame, classifies
//! each new source and routes it to exactly one of them. Every callback from
//! the host re-enters here, and anything tagged with an older generation is
//! dropped before it reaches a session.

use crossterm::event::KeyEvent;
use log::{debug, info, warn};

use crate::config::PlayerConfig;
use crate::embed::{EmbedStatus, EmbeddedSession};
use crate::error::ClassificationError;
use crate::events::{ControllerEvent, FailureReport, Outbox};
use crate::keymap::{KeyCommand, map_key};
use crate::media::{EmbedFrame, FrameEvent, MediaEvent, MediaSurface, SurfaceBinding};
use crate::recovery::TimerToken;
use crate::session::{PlaybackSession, PlaybackState};
use crate::source::{CATALOG_GUIDANCE, SourceDescriptor, classify};

/// Whatever is currently bound to the controller
#[derive(Debug)]
enum Active {
    Idle,
    Direct(PlaybackSession),
    Embedded(EmbeddedSession),
    /// Classification failed; nothing is bound
    Rejected(FailureReport),
}

/// Playback controller for a single source at a time
pub struct PlaybackController {
    config: PlayerConfig,
    surface: Box<dyn MediaSurface>,
    frame: Box<dyn EmbedFrame>,
    descriptor: Option<SourceDescriptor>,
    active: Active,
    generation: u64,
    outbox: Outbox,
}

impl PlaybackController {
    pub fn new(
        config: PlayerConfig,
        surface: Box<dyn MediaSurface>,
        frame: Box<dyn EmbedFrame>,
    ) -> Self {
        Self {
            config,
            surface,
            frame,
            descriptor: None,
            active: Active::Idle,
            generation: 0,
            outbox: Outbox::default(),
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Current binding generation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Binding the current surface or frame was attached with
    pub fn binding(&self) -> SurfaceBinding {
        SurfaceBinding::new(self.generation)
    }

    pub fn descriptor(&self) -> Option<&SourceDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        match &self.active {
            Active::Direct(session) => Some(session),
            _ => None,
        }
    }

    pub fn state(&self) -> Option<&PlaybackState> {
        self.session().map(PlaybackSession::state)
    }

    pub fn embedded(&self) -> Option<&EmbeddedSession> {
        match &self.active {
            Active::Embedded(embedded) => Some(embedded),
            _ => None,
        }
    }

    /// The terminal failure to show, if the current source has one
    pub fn failure(&self) -> Option<FailureReport> {
        match &self.active {
            Active::Idle => None,
            Active::Direct(session) => session.failure(),
            Active::Embedded(embedded) => match &embedded.status {
                EmbedStatus::Failed(reason) => Some(embed_failure(reason)),
                _ => None,
            },
            Active::Rejected(report) => Some(report.clone()),
        }
    }

    /// Whether the keyboard map and time/volume commands apply
    pub fn has_direct_controls(&self) -> bool {
        matches!(self.active, Active::Direct(_))
    }

    /// Replace the current source, tearing down whatever was bound
    pub fn set_source(&mut self, source: &str) -> &SourceDescriptor {
        self.unbind();
        let generation = self.next_generation();
        let descriptor = classify(source, self.config.autoplay);
        info!("Source {} is {}", generation, descriptor);

        self.active = match &descriptor {
            SourceDescriptor::DirectStream { url, .. } => {
                self.surface.attach(SurfaceBinding::new(generation));
                let guidance = descriptor.is_catalog().then(|| CATALOG_GUIDANCE.to_string());
                Active::Direct(PlaybackSession::start(
                    url,
                    generation,
                    &self.config,
                    guidance,
                    self.surface.as_mut(),
                    &mut self.outbox,
                ))
            }
            SourceDescriptor::YouTubeEmbed { embed_url, .. }
            | SourceDescriptor::VimeoEmbed { embed_url, .. } => {
                Active::Embedded(self.mount(embed_url, generation))
            }
            SourceDescriptor::Invalid(reason) => {
                let report = rejection(*reason);
                warn!("Rejected source {:?}: {}", source, report.message);
                self.outbox.push(ControllerEvent::Failed(report.clone()));
                Active::Rejected(report)
            }
        };

        self.descriptor.insert(descriptor)
    }

    /// User-initiated "try again": reload the current source from scratch
    pub fn reset(&mut self) {
        let generation = self.generation + 1;
        match &mut self.active {
            Active::Direct(session) => {
                self.generation = generation;
                self.surface.detach();
                self.surface.attach(SurfaceBinding::new(generation));
                session.restart(generation, self.surface.as_mut(), &mut self.outbox);
            }
            Active::Embedded(embedded) => {
                self.generation = generation;
                self.frame.unmount();
                let url = embedded.embed_url.clone();
                self.active = Active::Embedded(self.mount(&url, generation));
            }
            Active::Rejected(_) | Active::Idle => {
                debug!("Nothing to reset");
            }
        }
    }

    /// Feed a media surface notification; returns whether it was applied
    pub fn handle_media_event(&mut self, binding: SurfaceBinding, event: MediaEvent) -> bool {
        if binding.generation() != self.generation {
            debug!(
                "Dropping {:?} from stale binding {} (current {})",
                event,
                binding.generation(),
                self.generation
            );
            return false;
        }
        match &mut self.active {
            Active::Direct(session) => {
                session.handle_event(event, self.surface.as_mut(), &mut self.outbox);
                true
            }
            _ => false,
        }
    }

    /// Feed an embed frame notification; returns whether it was applied
    pub fn handle_frame_event(&mut self, binding: SurfaceBinding, event: FrameEvent) -> bool {
        if binding.generation() != self.generation {
            debug!("Dropping {:?} from stale frame binding", event);
            return false;
        }
        let Active::Embedded(embedded) = &mut self.active else {
            return false;
        };
        if let Some(reason) = embedded.handle_event(event) {
            self.outbox
                .push(ControllerEvent::Failed(embed_failure(&reason)));
        }
        true
    }

    /// Resume after a scheduled timer elapsed; stale tokens are no-ops
    pub fn timer_elapsed(&mut self, token: TimerToken) -> bool {
        if token.generation != self.generation {
            debug!("Ignoring timer {:?} from an older source", token);
            return false;
        }
        match &mut self.active {
            Active::Direct(session) => {
                session.timer_elapsed(token, self.surface.as_mut(), &mut self.outbox)
            }
            _ => false,
        }
    }

    /// Apply a keyboard shortcut; returns whether the key was consumed
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        if !self.has_direct_controls() {
            return false;
        }
        let Some(command) = map_key(key) else {
            return false;
        };

        debug!("Key command {:?}", command);
        let seek_step = self.config.seek_step_secs;
        let volume_step = self.config.volume_step;
        match command {
            KeyCommand::SeekBackward => self.seek_relative(-seek_step),
            KeyCommand::SeekForward => self.seek_relative(seek_step),
            KeyCommand::TogglePlay => self.toggle_play_pause(),
            KeyCommand::ToggleMute => self.toggle_mute(),
            KeyCommand::ToggleFullscreen => self.toggle_fullscreen(),
            KeyCommand::JumpToStart => self.seek(0.0),
            KeyCommand::VolumeUp => self.adjust_volume(volume_step),
            KeyCommand::VolumeDown => self.adjust_volume(-volume_step),
        }
        true
    }

    pub fn toggle_play_pause(&mut self) {
        self.with_session(|session, surface, outbox| session.toggle_play_pause(surface, outbox));
    }

    pub fn play(&mut self) {
        self.with_session(|session, surface, outbox| session.play(surface, outbox));
    }

    pub fn pause(&mut self) {
        self.with_session(|session, surface, outbox| session.pause(surface, outbox));
    }

    /// Seek to an absolute position in seconds
    pub fn seek(&mut self, time: f64) {
        self.with_session(|session, surface, outbox| session.seek(time, surface, outbox));
    }

    pub fn seek_relative(&mut self, delta: f64) {
        self.with_session(|session, surface, outbox| session.seek_relative(delta, surface, outbox));
    }

    /// Set volume (0.0 - 1.0)
    pub fn set_volume(&mut self, volume: f64) {
        self.with_session(|session, surface, _| session.set_volume(volume, surface));
    }

    pub fn adjust_volume(&mut self, delta: f64) {
        self.with_session(|session, surface, _| {
            let volume = session.state().volume + delta;
            session.set_volume(volume, surface);
        });
    }

    pub fn toggle_mute(&mut self) {
        self.with_session(|session, surface, _| session.toggle_mute(surface));
    }

    pub fn toggle_fullscreen(&mut self) {
        self.with_session(|session, surface, outbox| session.toggle_fullscreen(surface, outbox));
    }

    /// Best-effort save of the current direct stream
    pub fn download(&mut self) {
        self.with_session(|session, surface, outbox| session.download(surface, outbox));
    }

    /// Take every notification queued since the last drain, in order
    pub fn drain_events(&mut self) -> Vec<ControllerEvent> {
        self.outbox.drain()
    }

    fn with_session<F>(&mut self, f: F)
    where
        F: FnOnce(&mut PlaybackSession, &mut dyn MediaSurface, &mut Outbox),
    {
        match &mut self.active {
            Active::Direct(session) => f(session, self.surface.as_mut(), &mut self.outbox),
            _ => debug!("Ignoring playback command without a direct stream"),
        }
    }

    fn mount(&mut self, embed_url: &str, generation: u64) -> EmbeddedSession {
        let mut embedded = EmbeddedSession::new(embed_url);
        if let Err(e) = self.frame.mount(embed_url, SurfaceBinding::new(generation)) {
            if let Some(reason) = embedded.handle_event(FrameEvent::Failed(e.message)) {
                self.outbox
                    .push(ControllerEvent::Failed(embed_failure(&reason)));
            }
        }
        embedded
    }

    /// Release the surface or frame bound to the current source
    fn unbind(&mut self) {
        match std::mem::replace(&mut self.active, Active::Idle) {
            Active::Direct(session) => {
                debug!("Detaching session {}", session.generation());
                self.surface.detach();
            }
            Active::Embedded(_) => self.frame.unmount(),
            Active::Rejected(_) | Active::Idle => {}
        }
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.unbind();
    }
}

fn rejection(reason: ClassificationError) -> FailureReport {
    FailureReport {
        message: reason.to_string(),
        retryable: false,
        guidance: (reason == ClassificationError::UnsupportedHost)
            .then(|| CATALOG_GUIDANCE.to_string()),
    }
}

fn embed_failure(reason: &str) -> FailureReport {
    FailureReport {
        message: format!("embedded player failed to load: {}", reason),
        retryable: true,
        guidance: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlaybackFault;
    use crate::media::MediaErrorKind;
    use crate::recovery::TimerKind;
    use crate::session::Phase;
    use crate::testing::{FrameCall, RecordingFrame, RecordingSurface, SurfaceCall};
    use crossterm::event::{KeyCode, KeyModifiers};

    fn controller(config: PlayerConfig) -> (PlaybackController, RecordingSurface, RecordingFrame) {
        let surface = RecordingSurface::new();
        let frame = RecordingFrame::new();
        let controller =
            PlaybackController::new(config, Box::new(surface.clone()), Box::new(frame.clone()));
        (controller, surface, frame)
    }

    fn retry_token(events: &[ControllerEvent]) -> Option<TimerToken> {
        events.iter().find_map(|event| match event {
            ControllerEvent::TimerScheduled(timer) if timer.token.kind == TimerKind::Retry => {
                Some(timer.token)
            }
            _ => None,
        })
    }

    #[test]
    fn test_direct_source_attaches_then_loads() {
        let (mut controller, surface, frame) = controller(PlayerConfig::default());
        controller.set_source("https://cdn.example.com/movie.mp4");

        let calls = surface.calls();
        assert_eq!(calls[0], SurfaceCall::Attach(1));
        assert!(calls.contains(&SurfaceCall::Load {
            url: "https://cdn.example.com/movie.mp4".into(),
            autoplay: false,
        }));
        assert!(frame.calls().is_empty());
        assert_eq!(controller.state().map(|s| s.phase), Some(Phase::Loading));
    }

    #[test]
    fn test_invalid_source_never_creates_session() {
        let (mut controller, surface, frame) = controller(PlayerConfig::default());
        controller.set_source("ftp://example.com/video");

        assert!(controller.session().is_none());
        assert!(surface.calls().is_empty());
        assert!(frame.calls().is_empty());
        let events = controller.drain_events();
        assert!(matches!(
            events.as_slice(),
            [ControllerEvent::Failed(FailureReport { retryable: false, .. })]
        ));
    }

    #[test]
    fn test_bad_catalog_shape_carries_guidance() {
        let (mut controller, _, _) = controller(PlayerConfig::default());
        controller.set_source("https://moviebox.ng/detail/123");
        let failure = controller.failure().unwrap();
        assert_eq!(failure.guidance.as_deref(), Some(CATALOG_GUIDANCE));
    }

    #[test]
    fn test_embed_source_mounts_frame() {
        let (mut controller, surface, frame) = controller(PlayerConfig::default());
        controller.set_source("https://youtu.be/abc123");

        assert_eq!(
            frame.calls(),
            vec![FrameCall::Mount {
                embed_url: "https://www.youtube.com/embed/abc123?autoplay=0&enablejsapi=1".into(),
                generation: 1,
            }]
        );
        assert!(surface.calls().is_empty());
        assert!(!controller.has_direct_controls());
    }

    #[test]
    fn test_embed_failure_is_terminal_without_retry() {
        let (mut controller, _, _) = controller(PlayerConfig::default());
        controller.set_source("https://vimeo.com/76979871");
        let b = controller.binding();
        controller.drain_events();

        assert!(controller.handle_frame_event(b, FrameEvent::Failed("refused".into())));
        let events = controller.drain_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ControllerEvent::Failed(_)));
        assert!(controller.embedded().unwrap().is_failed());
    }

    #[test]
    fn test_keys_ignored_for_embeds() {
        let (mut controller, _, _) = controller(PlayerConfig::default());
        controller.set_source("https://www.youtube.com/watch?v=abc123");
        let space = KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE);
        assert!(!controller.handle_key(&space));
    }

    #[test]
    fn test_keys_drive_direct_session() {
        let (mut controller, surface, _) = controller(PlayerConfig::default());
        controller.set_source("https://cdn.example.com/movie.mp4");
        let b = controller.binding();
        controller.handle_media_event(b, MediaEvent::DurationChanged(100.0));
        controller.handle_media_event(b, MediaEvent::LoadedData);
        surface.clear();

        let right = KeyEvent::new(KeyCode::Right, KeyModifiers::NONE);
        assert!(controller.handle_key(&right));
        assert_eq!(controller.state().unwrap().current_time, 10.0);

        let down = KeyEvent::new(KeyCode::Down, KeyModifiers::NONE);
        assert!(controller.handle_key(&down));
        assert!((controller.state().unwrap().volume - 0.9).abs() < 1e-9);

        let unbound = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE);
        assert!(!controller.handle_key(&unbound));
        assert_eq!(surface.calls()[0], SurfaceCall::Seek(10.0));
    }

    #[test]
    fn test_source_change_detaches_before_attaching() {
        let (mut controller, surface, _) = controller(PlayerConfig::default());
        controller.set_source("https://cdn.example.com/a.mp4");
        surface.clear();
        controller.set_source("https://cdn.example.com/b.mp4");

        let calls = surface.calls();
        assert_eq!(calls[0], SurfaceCall::Detach);
        assert_eq!(calls[1], SurfaceCall::Attach(2));
    }

    #[test]
    fn test_stale_binding_events_are_dropped() {
        let (mut controller, _, _) = controller(PlayerConfig::default());
        controller.set_source("https://cdn.example.com/a.mp4");
        let old = controller.binding();
        controller.set_source("https://cdn.example.com/b.mp4");

        assert!(!controller.handle_media_event(old, MediaEvent::LoadedData));
        assert_eq!(controller.state().unwrap().phase, Phase::Loading);
    }

    #[test]
    fn test_reset_from_errored_restarts_ladder() {
        let config = PlayerConfig {
            max_retries: 1,
            ..Default::default()
        };
        let (mut controller, surface, _) = controller(config);
        controller.set_source("https://cdn.example.com/a.mp4");

        let b = controller.binding();
        controller.handle_media_event(b, MediaEvent::Error(MediaErrorKind::Decode));
        let token = retry_token(&controller.drain_events()).unwrap();
        controller.timer_elapsed(token);
        controller.handle_media_event(b, MediaEvent::Error(MediaErrorKind::Decode));
        assert_eq!(controller.state().unwrap().phase, Phase::Errored);
        assert!(controller.failure().unwrap().retryable);

        surface.clear();
        controller.reset();
        let state = controller.state().unwrap();
        assert_eq!(state.phase, Phase::Loading);
        assert_eq!(state.fault_count, 0);
        assert_eq!(state.last_error, None);
        assert_eq!(surface.load_count(), 1);
        assert!(controller.failure().is_none());
    }

    #[test]
    fn test_reset_invalidates_pending_retry() {
        let (mut controller, surface, _) = controller(PlayerConfig::default());
        controller.set_source("https://cdn.example.com/a.mp4");
        let b = controller.binding();
        controller.handle_media_event(b, MediaEvent::Error(MediaErrorKind::Network));
        let token = retry_token(&controller.drain_events()).unwrap();

        controller.reset();
        surface.clear();
        assert!(!controller.timer_elapsed(token));
        assert!(surface.calls().is_empty());
    }

    #[test]
    fn test_load_failure_counts_as_fault() {
        let (mut controller, surface, _) = controller(PlayerConfig::default());
        surface.fail_load("mpv is not running");
        controller.set_source("https://cdn.example.com/a.mp4");

        let state = controller.state().unwrap();
        assert_eq!(state.phase, Phase::Recovering);
        assert_eq!(state.last_error, Some(PlaybackFault::Aborted));
    }

    #[test]
    fn test_drop_detaches_surface() {
        let (mut controller, surface, _) = controller(PlayerConfig::default());
        controller.set_source("https://cdn.example.com/a.mp4");
        drop(controller);
        assert_eq!(surface.calls().last(), Some(&SurfaceCall::Detach));
    }
}
