//! Playback session state machine.
//!
//! A [`PlaybackSession`] owns the playback state for one direct-stream
//! descriptor. It reacts to surface events and user commands strictly in
//! arrival order, and routes every fault through the [`RecoveryPolicy`].

use std::fmt;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::config::PlayerConfig;
use crate::error::{ControlError, PlaybackFault};
use crate::events::{ControllerEvent, FailureReport, Outbox};
use crate::media::{MediaEvent, MediaSurface};
use crate::recovery::{
    RecoveryPolicy, RecoverySchedule, RetryDecision, Timer, TimerKind, TimerToken,
};

/// Lifecycle phase of a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Loading,
    Ready,
    Playing,
    Paused,
    Buffering,
    Recovering,
    /// Terminal until an explicit reset
    Errored,
}

impl Phase {
    /// Phases where the user should see a loading indicator
    pub fn is_busy(&self) -> bool {
        matches!(self, Phase::Loading | Phase::Buffering | Phase::Recovering)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Loading => "loading",
            Phase::Ready => "ready",
            Phase::Playing => "playing",
            Phase::Paused => "paused",
            Phase::Buffering => "buffering",
            Phase::Recovering => "recovering",
            Phase::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Mirror of the media surface plus fault bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub phase: Phase,
    /// Position in seconds, within `[0, duration]` whenever duration is known
    pub current_time: f64,
    /// `None` until the surface reports a finite, positive duration
    pub duration: Option<f64>,
    pub volume: f64,
    pub muted: bool,
    pub is_fullscreen: bool,
    /// Consecutive faults since the last successful load
    pub fault_count: u32,
    pub last_error: Option<PlaybackFault>,
}

impl PlaybackState {
    fn new(volume: f64) -> Self {
        Self {
            phase: Phase::Loading,
            current_time: 0.0,
            duration: None,
            volume,
            muted: volume == 0.0,
            is_fullscreen: false,
            fault_count: 0,
            last_error: None,
        }
    }

    fn clamp_time(&self, time: f64) -> f64 {
        match self.duration {
            Some(duration) => time.clamp(0.0, duration),
            None => time.max(0.0),
        }
    }
}

/// Controller state for one direct-stream source
#[derive(Debug)]
pub struct PlaybackSession {
    url: String,
    generation: u64,
    policy: RecoveryPolicy,
    stall_timeout: Duration,
    guidance: Option<String>,
    state: PlaybackState,
    /// Whether the user wants playback running; survives reloads
    wants_playback: bool,
    /// Position to restore once a reload reaches `Ready`
    resume_at: Option<f64>,
    /// Last non-zero volume, restored when unmuting from zero
    last_volume: f64,
    /// Phase before an unconfirmed play request
    optimistic_from: Option<Phase>,
    pending_retry: Option<RecoverySchedule>,
    pending_stall: Option<TimerToken>,
    next_sequence: u64,
}

impl PlaybackSession {
    /// Create a session and issue the initial load against `surface`
    pub(crate) fn start(
        url: &str,
        generation: u64,
        config: &PlayerConfig,
        guidance: Option<String>,
        surface: &mut dyn MediaSurface,
        outbox: &mut Outbox,
    ) -> Self {
        let volume = config.initial_volume.clamp(0.0, 1.0);
        let mut session = Self {
            url: url.to_string(),
            generation,
            policy: RecoveryPolicy::from_config(config),
            stall_timeout: config.stall_timeout(),
            guidance,
            state: PlaybackState::new(volume),
            wants_playback: config.autoplay,
            resume_at: None,
            last_volume: if volume > 0.0 { volume } else { 1.0 },
            optimistic_from: None,
            pending_retry: None,
            pending_stall: None,
            next_sequence: 0,
        };

        info!("Starting playback session {} for {}", generation, url);
        surface.set_volume(session.state.volume);
        surface.set_muted(session.state.muted);
        outbox.push(ControllerEvent::PhaseChanged(Phase::Loading));
        session.load(surface, outbox);
        session
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Terminal failure shown once retries are exhausted
    pub fn failure(&self) -> Option<FailureReport> {
        (self.state.phase == Phase::Errored).then(|| self.failure_report())
    }

    /// The retry currently waiting on its timer, if any
    pub fn pending_retry(&self) -> Option<&RecoverySchedule> {
        self.pending_retry.as_ref()
    }

    /// Restart from `Loading` under a new generation with a fresh fault ladder
    pub(crate) fn restart(
        &mut self,
        generation: u64,
        surface: &mut dyn MediaSurface,
        outbox: &mut Outbox,
    ) {
        info!(
            "Manual reset of session {} (was {}, {} faults)",
            self.generation, self.state.phase, self.state.fault_count
        );
        self.generation = generation;
        self.cancel_timers();
        self.optimistic_from = None;
        self.state.fault_count = 0;
        self.state.last_error = None;
        self.remember_position();
        surface.set_volume(self.state.volume);
        surface.set_muted(self.state.muted);
        self.reload(surface, outbox);
    }

    /// Apply a notification from the media surface
    pub(crate) fn handle_event(
        &mut self,
        event: MediaEvent,
        surface: &mut dyn MediaSurface,
        outbox: &mut Outbox,
    ) {
        match event {
            MediaEvent::LoadedData => self.on_loaded(surface, outbox),
            MediaEvent::DurationChanged(duration) => {
                self.state.duration = (duration.is_finite() && duration > 0.0).then_some(duration);
                self.state.current_time = self.state.clamp_time(self.state.current_time);
                debug!("Duration is now {:?}", self.state.duration);
            }
            MediaEvent::TimeUpdate(time) => {
                if !time.is_finite()
                    || matches!(
                        self.state.phase,
                        Phase::Loading | Phase::Recovering | Phase::Errored
                    )
                {
                    return;
                }
                if self.state.phase == Phase::Playing && self.optimistic_from.is_none() {
                    self.clear_faults();
                }
                self.state.current_time = self.state.clamp_time(time);
                outbox.push(ControllerEvent::TimeUpdate(self.state.current_time));
            }
            MediaEvent::Waiting => {
                if matches!(self.state.phase, Phase::Playing | Phase::Paused) {
                    self.set_phase(Phase::Buffering, outbox);
                }
            }
            MediaEvent::Playing => self.on_playing(outbox),
            MediaEvent::Ended => {
                if matches!(self.state.phase, Phase::Playing | Phase::Buffering) {
                    if let Some(duration) = self.state.duration {
                        self.state.current_time = duration;
                    }
                    self.wants_playback = false;
                    self.optimistic_from = None;
                    self.set_phase(Phase::Paused, outbox);
                    info!("Playback of {} ended", self.url);
                    outbox.push(ControllerEvent::Ended);
                }
            }
            MediaEvent::Error(kind) => self.fault(kind.into(), surface, outbox),
            MediaEvent::Stalled => self.fault(PlaybackFault::Stalled, surface, outbox),
            MediaEvent::PlayRejected(reason) => {
                if self.optimistic_from.is_some() || self.state.phase == Phase::Playing {
                    self.reject_play(reason, surface, outbox);
                }
            }
            MediaEvent::FullscreenChanged(fullscreen) => self.state.is_fullscreen = fullscreen,
            MediaEvent::FullscreenRejected(reason) => {
                self.state.is_fullscreen = false;
                warn!("Fullscreen request rejected: {}", reason);
                outbox.push(ControllerEvent::Notice(ControlError::Fullscreen(reason)));
            }
        }
    }

    /// Handle an elapsed timer; stale tokens are ignored
    pub(crate) fn timer_elapsed(
        &mut self,
        token: TimerToken,
        surface: &mut dyn MediaSurface,
        outbox: &mut Outbox,
    ) -> bool {
        match token.kind {
            TimerKind::Retry => {
                let current = self.pending_retry.map(|schedule| schedule.token);
                if current != Some(token) || self.state.phase != Phase::Recovering {
                    debug!("Ignoring stale retry timer {:?}", token);
                    return false;
                }
                if let Some(schedule) = self.pending_retry.take() {
                    info!(
                        "Retry {} of {} for {}",
                        schedule.attempt,
                        self.policy.max_retries(),
                        self.url
                    );
                }
                self.reload(surface, outbox);
                true
            }
            TimerKind::StallCheck => {
                if self.pending_stall != Some(token) || self.state.phase != Phase::Buffering {
                    debug!("Ignoring stale stall check {:?}", token);
                    return false;
                }
                self.pending_stall = None;
                self.fault(PlaybackFault::Stalled, surface, outbox);
                true
            }
        }
    }

    pub(crate) fn toggle_play_pause(&mut self, surface: &mut dyn MediaSurface, outbox: &mut Outbox) {
        match self.state.phase {
            Phase::Ready | Phase::Paused => self.play(surface, outbox),
            Phase::Playing | Phase::Buffering => self.pause(surface, outbox),
            phase => debug!("Ignoring play/pause while {}", phase),
        }
    }

    /// Optimistically enter `Playing`; a refusal rolls back and counts as a fault
    pub(crate) fn play(&mut self, surface: &mut dyn MediaSurface, outbox: &mut Outbox) {
        let prior = self.state.phase;
        if !matches!(prior, Phase::Ready | Phase::Paused) {
            debug!("Ignoring play while {}", prior);
            return;
        }

        self.wants_playback = true;
        self.optimistic_from = Some(prior);
        self.set_phase(Phase::Playing, outbox);

        if let Err(e) = surface.play() {
            self.reject_play(e.message, surface, outbox);
        }
    }

    pub(crate) fn pause(&mut self, surface: &mut dyn MediaSurface, outbox: &mut Outbox) {
        if !matches!(self.state.phase, Phase::Playing | Phase::Buffering) {
            debug!("Ignoring pause while {}", self.state.phase);
            return;
        }
        surface.pause();
        self.wants_playback = false;
        self.optimistic_from = None;
        self.set_phase(Phase::Paused, outbox);
    }

    /// Seek to `time`, clamped to the known duration
    pub(crate) fn seek(&mut self, time: f64, surface: &mut dyn MediaSurface, outbox: &mut Outbox) {
        let Some(duration) = self.state.duration else {
            debug!("Ignoring seek to {} before duration is known", time);
            return;
        };
        if !time.is_finite() || matches!(self.state.phase, Phase::Recovering | Phase::Errored) {
            return;
        }

        let target = time.clamp(0.0, duration);
        surface.seek(target);
        self.state.current_time = target;
        outbox.push(ControllerEvent::TimeUpdate(target));
    }

    pub(crate) fn seek_relative(
        &mut self,
        delta: f64,
        surface: &mut dyn MediaSurface,
        outbox: &mut Outbox,
    ) {
        let target = self.state.current_time + delta;
        self.seek(target, surface, outbox);
    }

    pub(crate) fn set_volume(&mut self, volume: f64, surface: &mut dyn MediaSurface) {
        if volume.is_nan() {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        self.state.volume = volume;
        if volume == 0.0 {
            self.state.muted = true;
        } else {
            self.last_volume = volume;
            self.state.muted = false;
        }
        surface.set_volume(volume);
        surface.set_muted(self.state.muted);
    }

    pub(crate) fn toggle_mute(&mut self, surface: &mut dyn MediaSurface) {
        if self.state.muted {
            self.state.muted = false;
            if self.state.volume == 0.0 {
                self.state.volume = self.last_volume;
                surface.set_volume(self.state.volume);
            }
        } else {
            self.state.muted = true;
            if self.state.volume > 0.0 {
                self.last_volume = self.state.volume;
            }
        }
        surface.set_muted(self.state.muted);
    }

    /// Enter or leave fullscreen; failures never touch the fault counter
    pub(crate) fn toggle_fullscreen(&mut self, surface: &mut dyn MediaSurface, outbox: &mut Outbox) {
        let result = if self.state.is_fullscreen {
            surface.exit_fullscreen().map(|()| {
                self.state.is_fullscreen = false;
            })
        } else {
            surface.request_fullscreen().map(|()| {
                self.state.is_fullscreen = true;
            })
        };

        if let Err(e) = result {
            warn!("Fullscreen toggle failed: {}", e);
            outbox.push(ControllerEvent::Notice(ControlError::Fullscreen(e.message)));
        }
    }

    pub(crate) fn download(&mut self, surface: &mut dyn MediaSurface, outbox: &mut Outbox) {
        if let Err(e) = surface.save(&self.url) {
            warn!("Download of {} failed: {}", self.url, e);
            outbox.push(ControllerEvent::Notice(ControlError::Download(e.message)));
        }
    }

    fn on_loaded(&mut self, surface: &mut dyn MediaSurface, outbox: &mut Outbox) {
        if self.state.phase != Phase::Loading {
            return;
        }

        // With playback wanted, recovery counts only once the surface confirms it
        if !self.wants_playback {
            self.clear_faults();
        }

        if let Some(position) = self.resume_at.take() {
            let position = self.state.clamp_time(position);
            debug!("Restoring position {:.2}s after reload", position);
            surface.seek(position);
            self.state.current_time = position;
        }

        self.set_phase(Phase::Ready, outbox);

        if self.wants_playback {
            self.play(surface, outbox);
        }
    }

    fn on_playing(&mut self, outbox: &mut Outbox) {
        if matches!(
            self.state.phase,
            Phase::Ready | Phase::Playing | Phase::Paused | Phase::Buffering
        ) {
            self.clear_faults();
        }
        match self.state.phase {
            Phase::Buffering => {
                let next = if self.wants_playback {
                    Phase::Playing
                } else {
                    Phase::Paused
                };
                self.set_phase(next, outbox);
            }
            Phase::Ready | Phase::Paused => {
                // Surface started on its own (autoplay or native controls)
                self.wants_playback = true;
                self.set_phase(Phase::Playing, outbox);
            }
            _ => {}
        }
        self.optimistic_from = None;
    }

    /// Roll back an optimistic play and feed the refusal to recovery
    fn reject_play(&mut self, reason: String, surface: &mut dyn MediaSurface, outbox: &mut Outbox) {
        let prior = self.optimistic_from.take().unwrap_or(Phase::Paused);
        warn!("Play request rejected: {}", reason);
        self.set_phase(prior, outbox);
        self.fault(PlaybackFault::PlayRejected(reason), surface, outbox);
    }

    fn fault(&mut self, fault: PlaybackFault, surface: &mut dyn MediaSurface, outbox: &mut Outbox) {
        match self.state.phase {
            Phase::Errored => {
                debug!("Ignoring {:?} after giving up", fault);
                return;
            }
            Phase::Recovering => {
                // Trailing signals from the load that already failed
                debug!("Ignoring {:?} while a retry is pending", fault);
                return;
            }
            _ => {}
        }

        self.remember_position();
        self.cancel_timers();
        self.optimistic_from = None;
        self.state.fault_count = self.state.fault_count.saturating_add(1);
        warn!(
            "Playback fault {} on {}: {}",
            self.state.fault_count, self.url, fault
        );
        self.state.last_error = Some(fault);

        match self.policy.on_fault(self.state.fault_count) {
            RetryDecision::Retry(delay) => {
                let token = self.next_token(TimerKind::Retry);
                self.pending_retry = Some(RecoverySchedule {
                    attempt: self.state.fault_count,
                    delay,
                    token,
                });
                self.set_phase(Phase::Recovering, outbox);
                outbox.push(ControllerEvent::TimerScheduled(Timer { token, delay }));
            }
            RetryDecision::GiveUp => {
                surface.pause();
                self.wants_playback = false;
                self.set_phase(Phase::Errored, outbox);
                let report = self.failure_report();
                error!("Giving up on {}: {}", self.url, report.message);
                outbox.push(ControllerEvent::Failed(report));
            }
        }
    }

    fn clear_faults(&mut self) {
        if self.state.fault_count > 0 {
            info!("Recovered {} after {} faults", self.url, self.state.fault_count);
        }
        self.state.fault_count = 0;
        self.state.last_error = None;
    }

    fn failure_report(&self) -> FailureReport {
        let message = self
            .state
            .last_error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "error loading video".to_string());
        FailureReport {
            message,
            retryable: true,
            guidance: self.guidance.clone(),
        }
    }

    fn load(&mut self, surface: &mut dyn MediaSurface, outbox: &mut Outbox) {
        if let Err(e) = surface.load(&self.url, self.wants_playback) {
            warn!("Surface refused to load {}: {}", self.url, e);
            self.fault(PlaybackFault::Aborted, surface, outbox);
        }
    }

    fn reload(&mut self, surface: &mut dyn MediaSurface, outbox: &mut Outbox) {
        self.state.current_time = 0.0;
        self.state.duration = None;
        self.set_phase(Phase::Loading, outbox);
        self.load(surface, outbox);
    }

    /// Keep the playback position so a reload can pick up where it failed
    fn remember_position(&mut self) {
        if self.state.phase != Phase::Loading && self.state.current_time > 0.0 {
            self.resume_at = Some(self.state.current_time);
        }
    }

    fn set_phase(&mut self, phase: Phase, outbox: &mut Outbox) {
        let previous = self.state.phase;
        if previous == phase {
            return;
        }
        debug!("Session {}: {} -> {}", self.generation, previous, phase);
        self.state.phase = phase;

        if previous == Phase::Buffering {
            self.pending_stall = None;
        }
        if phase == Phase::Buffering {
            let token = self.next_token(TimerKind::StallCheck);
            self.pending_stall = Some(token);
            outbox.push(ControllerEvent::TimerScheduled(Timer {
                token,
                delay: self.stall_timeout,
            }));
        }

        outbox.push(ControllerEvent::PhaseChanged(phase));
        if matches!(phase, Phase::Ready | Phase::Playing | Phase::Paused) {
            outbox.push(ControllerEvent::TimeUpdate(self.state.current_time));
        }
    }

    fn cancel_timers(&mut self) {
        self.pending_retry = None;
        self.pending_stall = None;
    }

    fn next_token(&mut self, kind: TimerKind) -> TimerToken {
        self.next_sequence += 1;
        TimerToken {
            generation: self.generation,
            sequence: self.next_sequence,
            kind,
        }
    }
}
