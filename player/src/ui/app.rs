use std::time::Duration;

use marquee_core::{EmbedStatus, KeyCommand, Phase, PlaybackState};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use super::components::{
    ErrorPanel, HelpOverlay, ProgressBar, StatusMessage, VolumeIndicator, get_spinner_frame,
    message_width,
};
use crate::app::App;

/// Draw the player view
pub fn draw_player_view(f: &mut Frame, app: &App, area: Rect) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(5),    // Main area
            Constraint::Length(3), // Progress and volume
            Constraint::Length(1), // Key hints
        ])
        .split(area);

    draw_header(f, app, vertical[0]);

    if let Some(failure) = &app.failure {
        let panel_area = centered_rect(80, 80, vertical[1]);
        let panel = ErrorPanel::new(&failure.message)
            .guidance(failure.guidance.as_deref())
            .retryable(failure.retryable);
        f.render_widget(panel, panel_area);
    } else if let Some(state) = app.controller.state() {
        draw_phase(f, app, state, vertical[1]);
        draw_controls(f, state, vertical[2]);
    } else if let Some(embedded) = app.controller.embedded() {
        let spinner = get_spinner_frame(app.started.elapsed().as_millis());
        let status = match &embedded.status {
            EmbedStatus::Loading => format!("{} Opening embedded player...", spinner),
            EmbedStatus::Loaded => "Playing in your browser".to_string(),
            EmbedStatus::Failed(reason) => format!("Embedded player failed: {}", reason),
        };
        let text = Text::from(vec![
            Line::from(Span::styled(status, Style::default().fg(Color::Green))),
            Line::from(""),
            Line::from(Span::styled(
                embedded.embed_url.as_str(),
                Style::default().fg(Color::Gray),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Playback controls are provided by the embedded player",
                Style::default().fg(Color::DarkGray),
            )),
        ]);
        let para = Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(para, centered_rect(90, 50, vertical[1]));
    } else {
        let welcome = Paragraph::new(Text::from(vec![
            Line::from(Span::styled(
                "No video open",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Press o and paste a video URL (direct file, YouTube or Vimeo)"),
        ]))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
        f.render_widget(welcome, centered_rect(80, 40, vertical[1]));
    }

    draw_key_hints(f, app, vertical[3]);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let (variant, source) = match app.controller.descriptor() {
        Some(descriptor) => (
            descriptor.variant().to_string(),
            app.source.clone().unwrap_or_default(),
        ),
        None => ("idle".to_string(), String::new()),
    };

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("[{}] ", variant),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(source),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Marquee ")
            .title_alignment(Alignment::Center)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(header, area);
}

/// Big phase indicator in the middle of the screen
fn draw_phase(f: &mut Frame, app: &App, state: &PlaybackState, area: Rect) {
    let spinner = get_spinner_frame(app.started.elapsed().as_millis());
    // Retries look like loading; only exhaustion shows an error
    let (text, color) = match state.phase {
        Phase::Loading | Phase::Recovering => (
            format!("{} Loading media, please wait...", spinner),
            Color::Yellow,
        ),
        Phase::Buffering => (format!("{} Buffering...", spinner), Color::Yellow),
        Phase::Ready => ("Ready (Space to play)".to_string(), Color::Green),
        Phase::Playing => ("▶ Playing".to_string(), Color::Green),
        Phase::Paused => ("⏸ Paused".to_string(), Color::White),
        Phase::Errored => ("✖ Playback failed".to_string(), Color::Red),
    };

    let mut lines = vec![Line::from(Span::styled(
        text,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))];
    if let Some(poster) = poster_label(app.poster.as_deref(), state.phase) {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            poster,
            Style::default().fg(Color::Gray),
        )));
    }
    if state.is_fullscreen {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "fullscreen",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Length(lines.len() as u16),
            Constraint::Percentage(30),
        ])
        .split(area);

    let para = Paragraph::new(Text::from(lines)).alignment(Alignment::Center);
    f.render_widget(para, vertical[1]);
}

/// Poster line, shown only before the first frame is on screen
fn poster_label(poster: Option<&str>, phase: Phase) -> Option<String> {
    let poster = poster?;
    matches!(phase, Phase::Loading | Phase::Ready).then(|| format!("Poster: {}", poster))
}

fn draw_controls(f: &mut Frame, state: &PlaybackState, area: Rect) {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(14)])
        .split(area);

    let progress = ProgressBar::new(state.current_time, state.duration)
        .playing(state.phase == Phase::Playing)
        .title(Some(phase_label(state.phase)));
    f.render_widget(progress, horizontal[0]);

    let volume = VolumeIndicator::from_level(state.volume, state.muted);
    f.render_widget(volume, horizontal[1]);
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Loading | Phase::Recovering => "Loading",
        Phase::Ready => "Ready",
        Phase::Playing => "Playing",
        Phase::Paused => "Paused",
        Phase::Buffering => "Buffering",
        Phase::Errored => "Error",
    }
}

fn draw_key_hints(f: &mut Frame, app: &App, area: Rect) {
    let hints = if app.failure.is_some() {
        "r: try again | o: open | ?: help | q: quit"
    } else if app.controller.has_direct_controls() {
        "Space: play/pause | ←/→: seek | ↑/↓: volume | m: mute | f: fullscreen | d: download | ?: help"
    } else {
        "o: open | :: command | ?: help | q: quit"
    };

    let para = Paragraph::new(Text::from(hints))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    f.render_widget(para, area);
}

/// Draw status message with fade effect
pub fn draw_status_message(f: &mut Frame, message: &str, color: Color, age: Duration) {
    let max_age = Duration::from_secs(3);
    let status_message = StatusMessage::new(message, color, age).max_age(max_age);

    // Create a centered floating box for the message
    let area = f.area();
    let width = message_width(message);
    let message_area = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + area.height.saturating_sub(8), // Show near the bottom
        width: width.min(area.width),
        height: 3.min(area.height),
    };

    f.render_widget(status_message, message_area);
}

/// Draw command prompt
pub fn draw_command_prompt(f: &mut Frame, command: &str) {
    let screen = f.area();
    let area = Rect::new(0, screen.height.saturating_sub(3), screen.width, 3.min(screen.height));

    let prompt_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .style(Style::default().bg(Color::Black));

    f.render_widget(Clear, area);
    f.render_widget(&prompt_block, area);

    let inner_area = prompt_block.inner(area);
    let command_para = Paragraph::new(Text::from(format!(":{}", command)))
        .style(
            Style::default()
                .fg(Color::Yellow)
                .bg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Left);

    f.render_widget(command_para, inner_area);

    // Position the cursor at the end of the command text
    f.set_cursor_position((inner_area.x + 1 + command.len() as u16, inner_area.y));
}

/// Draw help dialog
pub fn draw_help_dialog(f: &mut Frame) {
    let area = centered_rect(60, 70, f.area());
    let help = HelpOverlay::new(KeyCommand::BINDINGS);
    f.render_widget(help, area);
}

/// Helper function to create a centered rect
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_core::testing::{RecordingFrame, RecordingSurface};
    use marquee_core::{MediaEvent, PlaybackController, PlayerConfig};
    use ratatui::{Terminal, backend::TestBackend};

    fn rendered(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal
            .draw(|f| draw_player_view(f, app, f.area()))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_poster_shown_until_playing() {
        let controller = PlaybackController::new(
            PlayerConfig::default(),
            Box::new(RecordingSurface::new()),
            Box::new(RecordingFrame::new()),
        );
        let mut app = App::new(controller);
        app.open_source_with_poster(
            "https://cdn.example.com/movie.mp4",
            Some("https://cdn.example.com/poster.jpg".into()),
        );
        assert!(rendered(&app).contains("Poster: https://cdn.example.com/poster.jpg"));

        let binding = app.controller.binding();
        app.controller.handle_media_event(binding, MediaEvent::LoadedData);
        app.controller.play();
        assert!(!rendered(&app).contains("Poster:"));
    }

    #[test]
    fn test_poster_label_phases() {
        assert!(poster_label(Some("p.jpg"), Phase::Loading).is_some());
        assert!(poster_label(Some("p.jpg"), Phase::Ready).is_some());
        assert!(poster_label(Some("p.jpg"), Phase::Playing).is_none());
        assert!(poster_label(None, Phase::Loading).is_none());
    }
}
