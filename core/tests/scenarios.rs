use std::time::Duration;

use marquee_core::testing::{RecordingFrame, RecordingSurface, SurfaceCall};
use marquee_core::{
    ClassificationError, ControllerEvent, MediaErrorKind, MediaEvent, Phase, PlaybackController,
    PlaybackFault, PlayerConfig, SourceVariant, TimerKind, TimerToken, classify,
};

fn controller() -> (PlaybackController, RecordingSurface) {
    let surface = RecordingSurface::new();
    let controller = PlaybackController::new(
        PlayerConfig::default(),
        Box::new(surface.clone()),
        Box::new(RecordingFrame::new()),
    );
    (controller, surface)
}

fn retries(events: &[ControllerEvent]) -> Vec<(TimerToken, Duration)> {
    events
        .iter()
        .filter_map(|event| match event {
            ControllerEvent::TimerScheduled(timer) if timer.token.kind == TimerKind::Retry => {
                Some((timer.token, timer.delay))
            }
            _ => None,
        })
        .collect()
}

#[test]
fn youtube_watch_url_becomes_embed() {
    let descriptor = classify("https://www.youtube.com/watch?v=abc123", false);
    assert_eq!(descriptor.variant(), SourceVariant::YouTubeEmbed);
    let url = descriptor.playback_url().unwrap();
    assert!(url.contains("/embed/abc123?autoplay=0"));
}

#[test]
fn watch_and_short_links_agree() {
    for autoplay in [false, true] {
        let watch = classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ", autoplay);
        let short = classify("https://youtu.be/dQw4w9WgXcQ", autoplay);
        assert_eq!(watch.playback_url(), short.playback_url());
    }
}

#[test]
fn ftp_source_is_rejected_without_session() {
    let (mut controller, surface) = controller();
    let descriptor = controller.set_source("ftp://example.com/video");
    assert_eq!(
        descriptor.error_reason(),
        Some(ClassificationError::MalformedUrl)
    );
    assert!(controller.session().is_none());
    assert!(surface.calls().is_empty());

    let events = controller.drain_events();
    assert!(matches!(events.as_slice(), [ControllerEvent::Failed(_)]));
}

#[test]
fn four_decode_faults_exhaust_recovery() {
    let (mut controller, surface) = controller();
    controller.set_source("https://cdn.example.com/movie.mp4");
    let binding = controller.binding();

    let mut delays = Vec::new();
    for _ in 0..3 {
        controller.handle_media_event(binding, MediaEvent::Error(MediaErrorKind::Decode));
        assert_eq!(controller.state().unwrap().phase, Phase::Recovering);

        let scheduled = retries(&controller.drain_events());
        assert_eq!(scheduled.len(), 1);
        let (token, delay) = scheduled[0];
        delays.push(delay);

        assert!(controller.timer_elapsed(token));
        assert_eq!(controller.state().unwrap().phase, Phase::Loading);
    }
    assert_eq!(
        delays,
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(3)
        ]
    );

    controller.handle_media_event(binding, MediaEvent::Error(MediaErrorKind::Network));
    let state = controller.state().unwrap();
    assert_eq!(state.phase, Phase::Errored);
    assert_eq!(state.fault_count, 4);
    assert_eq!(state.last_error, Some(PlaybackFault::NetworkError));

    let events = controller.drain_events();
    assert!(retries(&events).is_empty());
    let report = events
        .iter()
        .find_map(|event| match event {
            ControllerEvent::Failed(report) => Some(report),
            _ => None,
        })
        .expect("terminal failure event");
    assert_eq!(report.message, PlaybackFault::NetworkError.to_string());
    assert!(report.retryable);
    assert_eq!(surface.load_count(), 4);
}

#[test]
fn success_before_ceiling_resets_fault_count() {
    let (mut controller, _) = controller();
    controller.set_source("https://cdn.example.com/movie.mp4");
    let binding = controller.binding();

    for _ in 0..2 {
        controller.handle_media_event(binding, MediaEvent::Error(MediaErrorKind::Network));
        let (token, _) = retries(&controller.drain_events())[0];
        controller.timer_elapsed(token);
    }
    assert_eq!(controller.state().unwrap().fault_count, 2);

    controller.handle_media_event(binding, MediaEvent::LoadedData);
    let state = controller.state().unwrap();
    assert_eq!(state.phase, Phase::Ready);
    assert_eq!(state.fault_count, 0);
}

#[test]
fn source_change_mid_recovery_cancels_retry() {
    let (mut controller, surface) = controller();
    controller.set_source("https://cdn.example.com/a.mp4");
    let binding = controller.binding();
    controller.handle_media_event(binding, MediaEvent::Error(MediaErrorKind::Network));
    let (stale, _) = retries(&controller.drain_events())[0];

    controller.set_source("https://cdn.example.com/b.mp4");
    controller.drain_events();
    let before = controller.state().cloned();
    surface.clear();

    assert!(!controller.timer_elapsed(stale));
    assert_eq!(controller.state().cloned(), before);
    assert!(surface.calls().is_empty());
    assert!(controller.drain_events().is_empty());
}

#[test]
fn seek_and_volume_rules() {
    let (mut controller, surface) = controller();
    controller.set_source("https://cdn.example.com/movie.mp4");
    let binding = controller.binding();

    controller.handle_media_event(binding, MediaEvent::LoadedData);
    controller.seek(30.0);
    assert_eq!(controller.state().unwrap().current_time, 0.0);

    controller.handle_media_event(binding, MediaEvent::DurationChanged(90.0));
    controller.seek(120.0);
    assert_eq!(controller.state().unwrap().current_time, 90.0);

    controller.set_volume(0.0);
    assert!(controller.state().unwrap().muted);
    controller.set_volume(0.5);
    assert!(!controller.state().unwrap().muted);
    assert_eq!(
        surface.calls().last(),
        Some(&SurfaceCall::SetMuted(false))
    );
}

#[test]
fn playback_emits_time_updates_and_completion() {
    let (mut controller, _) = controller();
    controller.set_source("https://cdn.example.com/movie.mp4");
    let binding = controller.binding();
    controller.handle_media_event(binding, MediaEvent::DurationChanged(60.0));
    controller.handle_media_event(binding, MediaEvent::LoadedData);
    controller.toggle_play_pause();
    controller.drain_events();

    controller.handle_media_event(binding, MediaEvent::TimeUpdate(12.0));
    controller.handle_media_event(binding, MediaEvent::Ended);

    let events = controller.drain_events();
    assert_eq!(events[0], ControllerEvent::TimeUpdate(12.0));
    assert!(events.contains(&ControllerEvent::PhaseChanged(Phase::Paused)));
    assert_eq!(events.last(), Some(&ControllerEvent::Ended));
}
