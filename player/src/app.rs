use std::time::Instant;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{debug, info};
use marquee_core::{
    ControllerEvent, FailureReport, Phase, PlaybackController, SourceDescriptor, TimerToken,
};
use ratatui::style::Color;

use crate::commands;
use crate::events::HostEvent;

/// A controller timer waiting to fire
#[derive(Debug, Clone, Copy)]
struct PendingTimer {
    deadline: tokio::time::Instant,
    token: TimerToken,
}

// App state
pub struct App {
    /// Playback controller for the current source
    pub controller: PlaybackController,
    /// Raw source string as the user entered it
    pub source: Option<String>,
    /// Poster image URL shown until the current source is playing
    pub poster: Option<String>,
    /// Terminal failure for the current source, if any
    pub failure: Option<FailureReport>,
    /// Status message to display
    pub status_message: Option<(String, Instant, Color)>,
    /// Whether the app should exit
    pub should_quit: bool,
    /// Help dialog visibility
    pub show_help: bool,
    /// Whether command mode is active
    pub command_mode: bool,
    /// Command buffer for command mode
    pub command_buffer: String,
    /// Drives the spinner animation
    pub started: Instant,
    timers: Vec<PendingTimer>,
}

impl App {
    pub fn new(controller: PlaybackController) -> Self {
        Self {
            controller,
            source: None,
            poster: None,
            failure: None,
            status_message: None,
            should_quit: false,
            show_help: false,
            command_mode: false,
            command_buffer: String::new(),
            started: Instant::now(),
            timers: Vec::new(),
        }
    }

    /// Classify and open a new source
    pub fn open_source(&mut self, source: &str) {
        self.open_source_with_poster(source, None);
    }

    /// Open a source together with the poster image to show while it loads
    pub fn open_source_with_poster(&mut self, source: &str, poster: Option<String>) {
        info!("Opening {} (poster {:?})", source, poster);
        self.poster = poster;
        self.timers.clear();
        self.failure = None;
        self.source = Some(source.trim().to_string());

        let descriptor = self.controller.set_source(source);
        let message = match descriptor {
            SourceDescriptor::Invalid(reason) => (format!("Cannot play: {}", reason), Color::Red),
            descriptor if descriptor.is_embedded() => {
                (format!("Opening {} in browser", descriptor.variant()), Color::Green)
            }
            descriptor => (format!("Loading {}", descriptor.variant()), Color::Yellow),
        };
        self.set_status(message.0, message.1);
        self.pump_controller();
    }

    /// Manual "try again" for the current source
    pub fn retry(&mut self) {
        if self.failure.as_ref().is_some_and(|failure| !failure.retryable) {
            self.set_status("This source cannot be retried", Color::Red);
            return;
        }
        if self.controller.descriptor().is_none() {
            self.set_status("Nothing to retry", Color::Yellow);
            return;
        }

        self.timers.clear();
        self.failure = None;
        self.controller.reset();
        self.set_status("Retrying...", Color::Yellow);
        self.pump_controller();
    }

    /// Handle key event
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        // Check if we're in command mode
        if self.is_command_mode() {
            match key.code {
                KeyCode::Enter => {
                    let cmd = self.command_buffer.clone();
                    self.exit_command_mode();
                    commands::handle_command(self, &cmd)?;
                }
                KeyCode::Char(c) => self.add_to_command_buffer(c),
                KeyCode::Backspace => self.remove_from_command_buffer(),
                KeyCode::Esc => self.exit_command_mode(),
                _ => {}
            }
            return Ok(());
        }

        if self.show_help {
            // Any key closes the help overlay
            self.show_help = false;
            return Ok(());
        }

        // Playback shortcuts first, so they win over app keys
        if self.controller.handle_key(&key) {
            self.pump_controller();
            return Ok(());
        }

        if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
            return Ok(());
        }

        match key.code {
            KeyCode::Char(':') => self.enter_command_mode(),
            KeyCode::Char('o') => {
                self.enter_command_mode();
                self.command_buffer.push_str("open ");
            }
            KeyCode::Char('r') if self.failure.is_some() => self.retry(),
            KeyCode::Char('d') => self.download(),
            KeyCode::Char('?') | KeyCode::F(1) => self.show_help = true,
            KeyCode::Char('q') => self.should_quit = true,
            _ => debug!("Unhandled key {:?}", key.code),
        }
        Ok(())
    }

    pub fn download(&mut self) {
        if !self.controller.has_direct_controls() {
            self.set_status("Only direct streams can be downloaded", Color::Yellow);
            return;
        }
        self.controller.download();
        if !self.pump_controller() {
            self.set_status("Download started", Color::Green);
        }
    }

    /// Handle a notification from the surface, the frame or a download
    pub fn handle_host_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::Media(binding, event) => {
                self.controller.handle_media_event(binding, event);
            }
            HostEvent::Frame(binding, event) => {
                self.controller.handle_frame_event(binding, event);
            }
            HostEvent::Download(Ok(path)) => {
                self.set_status(format!("Saved to {}", path.display()), Color::Green);
            }
            HostEvent::Download(Err(e)) => {
                self.set_status(format!("Error downloading video: {}", e), Color::Red);
            }
        }
        self.pump_controller();
    }

    /// Earliest pending timer deadline
    pub fn next_deadline(&self) -> Option<tokio::time::Instant> {
        self.timers.iter().map(|timer| timer.deadline).min()
    }

    /// Fire every timer due at `now`, earliest first
    pub fn fire_due_timers(&mut self, now: tokio::time::Instant) {
        let (mut due, pending): (Vec<_>, Vec<_>) =
            self.timers.drain(..).partition(|timer| timer.deadline <= now);
        self.timers = pending;
        due.sort_by_key(|timer| timer.deadline);

        for timer in due {
            self.controller.timer_elapsed(timer.token);
        }
        self.pump_controller();
    }

    /// Apply everything the controller queued; returns whether a notice
    /// was shown
    pub fn pump_controller(&mut self) -> bool {
        let mut noticed = false;
        for event in self.controller.drain_events() {
            match event {
                ControllerEvent::TimerScheduled(timer) => {
                    self.timers.push(PendingTimer {
                        deadline: tokio::time::Instant::now() + timer.delay,
                        token: timer.token,
                    });
                }
                ControllerEvent::Failed(report) => {
                    self.failure = Some(report);
                }
                ControllerEvent::Notice(error) => {
                    self.set_status(error.to_string(), Color::Red);
                    noticed = true;
                }
                ControllerEvent::Ended => {
                    self.set_status("Playback finished", Color::Blue);
                }
                ControllerEvent::PhaseChanged(phase) => {
                    if phase == Phase::Recovering {
                        debug!("Recovering from playback fault");
                    } else if phase == Phase::Loading {
                        self.failure = None;
                    }
                }
                ControllerEvent::TimeUpdate(_) => {}
            }
        }
        noticed
    }

    /// Set a status message to display
    pub fn set_status<S: Into<String>>(&mut self, message: S, color: Color) {
        self.status_message = Some((message.into(), Instant::now(), color));
    }

    pub fn is_command_mode(&self) -> bool {
        self.command_mode
    }

    pub fn enter_command_mode(&mut self) {
        self.command_mode = true;
        self.command_buffer.clear();
    }

    pub fn exit_command_mode(&mut self) {
        self.command_mode = false;
        self.command_buffer.clear();
    }

    pub fn add_to_command_buffer(&mut self, c: char) {
        self.command_buffer.push(c);
    }

    pub fn remove_from_command_buffer(&mut self) {
        self.command_buffer.pop();
    }

    pub fn get_command_buffer(&self) -> &str {
        &self.command_buffer
    }
}
