//! Media surface backed by an external mpv process.
//!
//! mpv is started once in idle mode and driven over its JSON IPC socket.
//! A reader thread turns property changes and playback events into
//! [`MediaEvent`]s tagged with the binding that was current when they
//! arrived.

use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use marquee_core::{MediaErrorKind, MediaEvent, MediaSurface, SurfaceBinding, SurfaceError};
use serde_json::{Value, json};

use crate::download;
use crate::events::{HostEvent, HostSender};

/// Properties observed for every binding, in observer id order
const OBSERVED_PROPERTIES: &[&str] = &[
    "time-pos",
    "duration",
    "pause",
    "paused-for-cache",
    "eof-reached",
    "fullscreen",
];

/// Observer ids are `generation * OBSERVER_STRIDE + index`
const OBSERVER_STRIDE: u64 = 16;

/// How long to wait for mpv to create its IPC socket
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Requests whose failure must be reported back as an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingRequest {
    Load,
    Play,
    Fullscreen,
}

/// State shared with the reader thread
#[derive(Debug, Default)]
struct Shared {
    binding: Option<SurfaceBinding>,
    pending: HashMap<u64, (SurfaceBinding, PendingRequest)>,
    /// Last reported value of the `pause` property
    paused: bool,
    /// Playlist entry created by the current binding's latest `loadfile`
    entry: Option<i64>,
    /// Entry mpv most recently started
    started: Option<i64>,
}

impl Shared {
    fn rebind(&mut self, binding: Option<SurfaceBinding>) {
        self.binding = binding;
        self.paused = true;
        self.entry = None;
        self.started = None;
    }

    /// Whether file events for `entry` belong to the current load
    fn is_current_entry(&self, entry: Option<i64>) -> bool {
        entry.is_some() && entry == self.entry
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A running mpv process and the write half of its IPC connection
struct MpvProcess {
    child: Child,
    writer: UnixStream,
    socket_path: PathBuf,
}

impl MpvProcess {
    fn spawn(program: &Path, shared: Arc<Mutex<Shared>>, events: HostSender) -> Result<Self, SurfaceError> {
        let socket_path = std::env::temp_dir().join(format!("marquee-mpv-{}.sock", std::process::id()));
        let _ = fs::remove_file(&socket_path);

        let mut cmd = Command::new(program);
        cmd.arg(format!("--input-ipc-server={}", socket_path.display()))
            .arg("--idle=yes") // Stay alive between sources
            .arg("--keep-open=yes") // Pause at the end instead of unloading
            .arg("--pause=yes")
            .arg("--force-window=yes")
            .arg("--no-terminal")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        info!("Spawning {} with IPC socket {}", program.display(), socket_path.display());
        let mut child = cmd.spawn().map_err(|e| {
            SurfaceError::new(format!("failed to start {}: {}", program.display(), e))
        })?;

        let writer = match connect(&socket_path) {
            Ok(stream) => stream,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        };
        let reader = writer
            .try_clone()
            .map_err(|e| SurfaceError::new(format!("failed to clone IPC socket: {}", e)))?;

        thread::Builder::new()
            .name("mpv-ipc".into())
            .spawn(move || read_events(reader, shared, events))
            .map_err(|e| SurfaceError::new(format!("failed to start IPC reader: {}", e)))?;

        Ok(Self {
            child,
            writer,
            socket_path,
        })
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

impl Drop for MpvProcess {
    fn drop(&mut self) {
        let _ = writeln!(self.writer, "{}", json!({ "command": ["quit"] }));
        let _ = self.child.kill();
        let _ = self.child.wait();
        // Clean up socket file
        let _ = fs::remove_file(&self.socket_path);
    }
}

fn connect(socket_path: &Path) -> Result<UnixStream, SurfaceError> {
    let started = Instant::now();
    loop {
        match UnixStream::connect(socket_path) {
            Ok(stream) => return Ok(stream),
            Err(_) if started.elapsed() < CONNECT_TIMEOUT => {
                thread::sleep(Duration::from_millis(50));
            }
            Err(e) => {
                return Err(SurfaceError::new(format!(
                    "mpv IPC socket did not come up: {}",
                    e
                )));
            }
        }
    }
}

/// [`MediaSurface`] that plays direct streams in mpv
pub struct MpvSurface {
    program: PathBuf,
    events: HostSender,
    shared: Arc<Mutex<Shared>>,
    process: Option<MpvProcess>,
    binding: Option<SurfaceBinding>,
    next_request: u64,
}

impl MpvSurface {
    /// Create the surface; mpv itself is started on the first load
    pub fn new(program: impl Into<PathBuf>, events: HostSender) -> Self {
        Self {
            program: program.into(),
            events,
            shared: Arc::new(Mutex::new(Shared::default())),
            process: None,
            binding: None,
            next_request: 1,
        }
    }

    fn ensure_running(&mut self) -> Result<(), SurfaceError> {
        if let Some(process) = &mut self.process {
            if process.is_alive() {
                return Ok(());
            }
            warn!("mpv exited, restarting it");
        }
        self.process = None;

        let process = MpvProcess::spawn(&self.program, self.shared.clone(), self.events.clone())?;
        self.process = Some(process);
        if let Some(binding) = self.binding {
            self.observe(binding);
        }
        Ok(())
    }

    fn send(&mut self, args: Value, pending: Option<PendingRequest>) -> Result<(), SurfaceError> {
        let Some(process) = &mut self.process else {
            return Err(SurfaceError::new("mpv is not running"));
        };

        let request_id = self.next_request;
        self.next_request += 1;
        if let (Some(kind), Some(binding)) = (pending, self.binding) {
            lock(&self.shared).pending.insert(request_id, (binding, kind));
        }

        let command = json!({
            "command": args,
            "request_id": request_id,
        });
        debug!("mpv <- {}", command);
        writeln!(process.writer, "{}", command)
            .and_then(|()| process.writer.flush())
            .map_err(|e| {
                lock(&self.shared).pending.remove(&request_id);
                SurfaceError::new(format!("mpv IPC write failed: {}", e))
            })
    }

    /// Send a command whose failure only gets logged
    fn send_quiet(&mut self, args: Value) {
        if let Err(e) = self.send(args, None) {
            debug!("Dropped mpv command: {}", e);
        }
    }

    fn observe(&mut self, binding: SurfaceBinding) {
        let base = binding.generation() * OBSERVER_STRIDE;
        for (index, property) in OBSERVED_PROPERTIES.iter().enumerate() {
            self.send_quiet(json!(["observe_property", base + index as u64, property]));
        }
    }

    fn unobserve(&mut self, binding: SurfaceBinding) {
        let base = binding.generation() * OBSERVER_STRIDE;
        for index in 0..OBSERVED_PROPERTIES.len() {
            self.send_quiet(json!(["unobserve_property", base + index as u64]));
        }
    }
}

impl MediaSurface for MpvSurface {
    fn attach(&mut self, binding: SurfaceBinding) {
        debug!("Attaching mpv surface to binding {}", binding.generation());
        self.binding = Some(binding);
        lock(&self.shared).rebind(Some(binding));
        if self.process.is_some() {
            self.observe(binding);
        }
    }

    fn detach(&mut self) {
        let Some(binding) = self.binding.take() else {
            return;
        };
        debug!("Detaching mpv surface from binding {}", binding.generation());
        {
            let mut shared = lock(&self.shared);
            shared.rebind(None);
            shared.pending.clear();
        }
        self.unobserve(binding);
        self.send_quiet(json!(["stop"]));
    }

    fn load(&mut self, url: &str, autoplay: bool) -> Result<(), SurfaceError> {
        self.ensure_running()?;
        self.send(json!(["set_property", "pause", !autoplay]), None)?;
        self.send(json!(["loadfile", url, "replace"]), Some(PendingRequest::Load))
    }

    fn play(&mut self) -> Result<(), SurfaceError> {
        self.send(json!(["set_property", "pause", false]), Some(PendingRequest::Play))
    }

    fn pause(&mut self) {
        self.send_quiet(json!(["set_property", "pause", true]));
    }

    fn seek(&mut self, position: f64) {
        self.send_quiet(json!(["seek", position, "absolute"]));
    }

    fn set_volume(&mut self, volume: f64) {
        // mpv volume is 0-100
        self.send_quiet(json!(["set_property", "volume", volume * 100.0]));
    }

    fn set_muted(&mut self, muted: bool) {
        self.send_quiet(json!(["set_property", "mute", muted]));
    }

    fn request_fullscreen(&mut self) -> Result<(), SurfaceError> {
        self.send(
            json!(["set_property", "fullscreen", true]),
            Some(PendingRequest::Fullscreen),
        )
    }

    fn exit_fullscreen(&mut self) -> Result<(), SurfaceError> {
        self.send(json!(["set_property", "fullscreen", false]), None)
    }

    fn save(&mut self, url: &str) -> Result<(), SurfaceError> {
        let target = download::start(url, self.events.clone()).map_err(SurfaceError::new)?;
        info!("Downloading {} to {}", url, target.display());
        Ok(())
    }
}

fn read_events(stream: UnixStream, shared: Arc<Mutex<Shared>>, events: HostSender) {
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("mpv IPC read failed: {}", e);
                break;
            }
        };
        let Ok(message) = serde_json::from_str::<Value>(&line) else {
            debug!("Ignoring non-JSON IPC line: {}", line);
            continue;
        };

        let routed = route(&message, &mut lock(&shared));
        if let Some((binding, event)) = routed {
            if events.send(HostEvent::Media(binding, event)).is_err() {
                // UI loop is gone
                return;
            }
        }
    }

    info!("mpv IPC connection closed");
    let binding = lock(&shared).binding;
    if let Some(binding) = binding {
        let _ = events.send(HostEvent::Media(binding, MediaEvent::Error(MediaErrorKind::Aborted)));
    }
}

/// Map one IPC message onto the binding it belongs to
fn route(message: &Value, shared: &mut Shared) -> Option<(SurfaceBinding, MediaEvent)> {
    if let Some(request_id) = message.get("request_id").and_then(Value::as_u64) {
        let (binding, request) = shared.pending.remove(&request_id)?;
        let error = message["error"].as_str().unwrap_or("unknown error");
        if error == "success" {
            if request == PendingRequest::Load && shared.binding == Some(binding) {
                shared.entry = message["data"]["playlist_entry_id"].as_i64();
                if shared.entry.is_none() {
                    warn!("loadfile reply has no playlist_entry_id, file events will be dropped");
                }
            }
            return None;
        }
        return Some((binding, rejection(request, error)));
    }

    let binding = shared.binding?;
    match message["event"].as_str()? {
        "property-change" => {
            let id = message["id"].as_u64()?;
            if id / OBSERVER_STRIDE != binding.generation() {
                return None;
            }
            let name = message["name"].as_str()?;
            property_event(name, &message["data"], &mut shared.paused).map(|event| (binding, event))
        }
        "start-file" => {
            shared.started = message["playlist_entry_id"].as_i64();
            None
        }
        "file-loaded" => {
            if !shared.is_current_entry(shared.started) {
                debug!("Dropping file-loaded for entry {:?}", shared.started);
                return None;
            }
            Some((binding, MediaEvent::LoadedData))
        }
        "end-file" if message["reason"] == "error" => {
            let entry = message["playlist_entry_id"].as_i64();
            if !shared.is_current_entry(entry) {
                debug!("Dropping end-file for entry {:?}", entry);
                return None;
            }
            let reason = message["file_error"].as_str().unwrap_or_default();
            warn!("mpv failed to play file: {}", reason);
            Some((binding, MediaEvent::Error(classify_file_error(reason))))
        }
        _ => None,
    }
}

fn property_event(name: &str, data: &Value, paused: &mut bool) -> Option<MediaEvent> {
    match name {
        "time-pos" => data.as_f64().map(MediaEvent::TimeUpdate),
        // null while nothing is loaded or for live streams
        "duration" => Some(MediaEvent::DurationChanged(data.as_f64().unwrap_or(f64::NAN))),
        "pause" => {
            *paused = data.as_bool()?;
            (!*paused).then_some(MediaEvent::Playing)
        }
        "paused-for-cache" => match data.as_bool()? {
            true => Some(MediaEvent::Waiting),
            false => (!*paused).then_some(MediaEvent::Playing),
        },
        "eof-reached" => data.as_bool()?.then_some(MediaEvent::Ended),
        "fullscreen" => data.as_bool().map(MediaEvent::FullscreenChanged),
        _ => None,
    }
}

fn rejection(request: PendingRequest, error: &str) -> MediaEvent {
    match request {
        PendingRequest::Load => MediaEvent::Error(MediaErrorKind::Aborted),
        PendingRequest::Play => MediaEvent::PlayRejected(error.to_string()),
        PendingRequest::Fullscreen => MediaEvent::FullscreenRejected(error.to_string()),
    }
}

/// Map mpv's `file_error` text onto a media error class
fn classify_file_error(reason: &str) -> MediaErrorKind {
    let reason = reason.to_ascii_lowercase();
    if reason.contains("unrecognized") || reason.contains("format") {
        MediaErrorKind::SourceNotSupported
    } else if reason.contains("decod") || reason.contains("no audio or video") {
        MediaErrorKind::Decode
    } else if reason.contains("abort") || reason.contains("interrupt") {
        MediaErrorKind::Aborted
    } else {
        MediaErrorKind::Network
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_core::testing::{RecordingFrame, RecordingSurface};
    use marquee_core::{PlaybackController, PlayerConfig};

    #[test]
    fn test_property_changes_map_to_events() {
        let mut paused = true;
        assert_eq!(
            property_event("time-pos", &json!(12.5), &mut paused),
            Some(MediaEvent::TimeUpdate(12.5))
        );
        assert_eq!(property_event("time-pos", &Value::Null, &mut paused), None);
        assert_eq!(
            property_event("eof-reached", &json!(true), &mut paused),
            Some(MediaEvent::Ended)
        );
        assert_eq!(property_event("eof-reached", &json!(false), &mut paused), None);
        assert_eq!(
            property_event("fullscreen", &json!(true), &mut paused),
            Some(MediaEvent::FullscreenChanged(true))
        );
    }

    #[test]
    fn test_unknown_duration_is_not_a_number() {
        let mut paused = true;
        match property_event("duration", &Value::Null, &mut paused) {
            Some(MediaEvent::DurationChanged(duration)) => assert!(duration.is_nan()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_cache_recovery_respects_pause() {
        let mut paused = true;
        assert_eq!(
            property_event("paused-for-cache", &json!(true), &mut paused),
            Some(MediaEvent::Waiting)
        );
        assert_eq!(property_event("paused-for-cache", &json!(false), &mut paused), None);

        assert_eq!(
            property_event("pause", &json!(false), &mut paused),
            Some(MediaEvent::Playing)
        );
        assert!(!paused);
        assert_eq!(
            property_event("paused-for-cache", &json!(false), &mut paused),
            Some(MediaEvent::Playing)
        );
    }

    #[test]
    fn test_file_errors_are_classified() {
        assert_eq!(
            classify_file_error("unrecognized file format"),
            MediaErrorKind::SourceNotSupported
        );
        assert_eq!(
            classify_file_error("no audio or video data played"),
            MediaErrorKind::Decode
        );
        assert_eq!(classify_file_error("loading failed"), MediaErrorKind::Network);
    }

    #[test]
    fn test_rejected_requests() {
        assert_eq!(
            rejection(PendingRequest::Play, "property unavailable"),
            MediaEvent::PlayRejected("property unavailable".into())
        );
        assert_eq!(
            rejection(PendingRequest::Fullscreen, "error running command"),
            MediaEvent::FullscreenRejected("error running command".into())
        );
        assert_eq!(
            rejection(PendingRequest::Load, "invalid parameter"),
            MediaEvent::Error(MediaErrorKind::Aborted)
        );
    }

    /// Binding as issued for the `generation`-th source
    fn binding_for(generation: u64) -> SurfaceBinding {
        let mut controller = PlaybackController::new(
            PlayerConfig::default(),
            Box::new(RecordingSurface::new()),
            Box::new(RecordingFrame::new()),
        );
        for _ in 0..generation {
            controller.set_source("https://cdn.example.com/a.mp4");
        }
        controller.binding()
    }

    #[test]
    fn test_file_events_from_previous_source_are_dropped() {
        let first = binding_for(1);
        let second = binding_for(2);
        let mut shared = Shared::default();

        shared.rebind(Some(first));
        shared.pending.insert(7, (first, PendingRequest::Load));
        let reply = json!({ "request_id": 7, "error": "success", "data": { "playlist_entry_id": 1 } });
        assert!(route(&reply, &mut shared).is_none());
        assert!(route(&json!({ "event": "start-file", "playlist_entry_id": 1 }), &mut shared).is_none());

        // Source change before the first file finished
        shared.rebind(Some(second));
        shared.pending.insert(8, (second, PendingRequest::Load));

        let stale_error = json!({
            "event": "end-file",
            "reason": "error",
            "file_error": "loading failed",
            "playlist_entry_id": 1
        });
        assert!(route(&stale_error, &mut shared).is_none());
        assert!(route(&json!({ "event": "file-loaded" }), &mut shared).is_none());

        let reply = json!({ "request_id": 8, "error": "success", "data": { "playlist_entry_id": 2 } });
        assert!(route(&reply, &mut shared).is_none());
        assert!(route(&json!({ "event": "start-file", "playlist_entry_id": 2 }), &mut shared).is_none());
        assert_eq!(
            route(&json!({ "event": "file-loaded" }), &mut shared),
            Some((second, MediaEvent::LoadedData))
        );

        let current_error = json!({
            "event": "end-file",
            "reason": "error",
            "file_error": "loading failed",
            "playlist_entry_id": 2
        });
        assert_eq!(
            route(&current_error, &mut shared),
            Some((second, MediaEvent::Error(MediaErrorKind::Network)))
        );
    }

    #[test]
    fn test_messages_without_binding_are_dropped() {
        let mut shared = Shared::default();
        let message = json!({ "event": "file-loaded" });
        assert!(route(&message, &mut shared).is_none());
    }
}
