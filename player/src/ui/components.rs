use std::time::Duration;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

/// Format seconds as m:ss, or h:mm:ss past the hour
pub fn format_duration(duration: f64) -> String {
    let total_seconds = duration.max(0.0).round() as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Progress bar with a playback indicator
pub struct ProgressBar<'a> {
    position: f64,
    /// `None` while the stream length is unknown
    duration: Option<f64>,
    is_playing: bool,
    title: Option<&'a str>,
}

impl<'a> ProgressBar<'a> {
    pub fn new(position: f64, duration: Option<f64>) -> Self {
        Self {
            position,
            duration,
            is_playing: false,
            title: None,
        }
    }

    pub fn playing(mut self, is_playing: bool) -> Self {
        self.is_playing = is_playing;
        self
    }

    pub fn title(mut self, title: Option<&'a str>) -> Self {
        self.title = title;
        self
    }
}

impl<'a> Widget for ProgressBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let ratio = match self.duration {
            Some(duration) if duration > 0.0 => (self.position / duration).clamp(0.0, 1.0),
            _ => 0.0,
        };

        // Create the label with position/duration
        let label = format!(
            "{} / {}",
            format_duration(self.position),
            self.duration.map_or_else(|| "--:--".to_string(), format_duration)
        );

        let icon = if self.is_playing { "▶" } else { "⏸" };
        let display_title = match self.title {
            Some(title) => format!("{}  {} ", icon, title),
            None => format!("{} ", icon),
        };

        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(display_title))
            .gauge_style(
                Style::default()
                    .fg(Color::Blue)
                    .bg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )
            .ratio(ratio)
            .label(label);

        gauge.render(area, buf);
    }
}

/// Display a status message with fade effect
pub struct StatusMessage<'a> {
    message: &'a str,
    color: Color,
    age: Duration,
    max_age: Duration,
}

impl<'a> StatusMessage<'a> {
    pub fn new(message: &'a str, color: Color, age: Duration) -> Self {
        Self {
            message,
            color,
            age,
            max_age: Duration::from_secs(3), // Default fade after 3 seconds
        }
    }

    pub fn max_age(mut self, duration: Duration) -> Self {
        self.max_age = duration;
        self
    }
}

impl<'a> Widget for StatusMessage<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let fade_factor = if self.age > self.max_age {
            0.0
        } else {
            1.0 - (self.age.as_secs_f32() / self.max_age.as_secs_f32())
        };

        // Don't render if fully faded
        if fade_factor <= 0.0 {
            return;
        }

        let color = match (self.color, fade_factor) {
            (Color::Red, _) => Color::Red, // Errors always stay red
            (_, f) if f > 0.7 => self.color,
            _ => Color::DarkGray,
        };

        let text = Paragraph::new(Text::from(self.message))
            .style(Style::default().fg(color))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color))
                    .style(Style::default().bg(Color::Black)),
            );

        Clear.render(area, buf);
        text.render(area, buf);
    }
}

/// Volume indicator
pub struct VolumeIndicator {
    volume: u8, // 0-100
    muted: bool,
}

impl VolumeIndicator {
    pub fn new(volume: u8, muted: bool) -> Self {
        Self {
            volume: volume.min(100),
            muted,
        }
    }

    /// Build from a 0.0 - 1.0 volume
    pub fn from_level(level: f64, muted: bool) -> Self {
        Self::new((level.clamp(0.0, 1.0) * 100.0).round() as u8, muted)
    }
}

impl Widget for VolumeIndicator {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (icon, color) = if self.muted || self.volume == 0 {
            ("🔇", Color::DarkGray)
        } else if self.volume < 30 {
            ("🔈", Color::White)
        } else if self.volume < 70 {
            ("🔉", Color::White)
        } else {
            ("🔊", Color::White)
        };

        let vol_text = if self.muted {
            format!("{} Muted", icon)
        } else {
            format!("{} {}%", icon, self.volume)
        };

        let volume = Paragraph::new(Text::from(vol_text))
            .style(Style::default().fg(color))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Volume"));

        volume.render(area, buf);
    }
}

/// Terminal error panel with the retry affordance
pub struct ErrorPanel<'a> {
    message: &'a str,
    guidance: Option<&'a str>,
    retryable: bool,
}

impl<'a> ErrorPanel<'a> {
    pub fn new(message: &'a str) -> Self {
        Self {
            message,
            guidance: None,
            retryable: false,
        }
    }

    pub fn guidance(mut self, guidance: Option<&'a str>) -> Self {
        self.guidance = guidance;
        self
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}

impl<'a> Widget for ErrorPanel<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut lines = vec![
            Line::from(Span::styled(
                "✖ Playback failed",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(self.message, Style::default().fg(Color::Red))),
        ];

        if let Some(guidance) = self.guidance {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                guidance,
                Style::default().fg(Color::White),
            )));
        }

        lines.push(Line::from(""));
        let hint = if self.retryable {
            "r: try again   o: open another URL"
        } else {
            "o: open another URL"
        };
        lines.push(Line::from(Span::styled(
            hint,
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));

        let panel = Paragraph::new(Text::from(lines))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red))
                    .title(" Error ")
                    .title_alignment(Alignment::Center)
                    .style(Style::default().bg(Color::Black)),
            );

        Clear.render(area, buf);
        panel.render(area, buf);
    }
}

/// Simple help overlay widget
pub struct HelpOverlay<'a> {
    playback_keys: &'a [(&'a str, &'a str)],
}

impl<'a> HelpOverlay<'a> {
    pub fn new(playback_keys: &'a [(&'a str, &'a str)]) -> Self {
        Self { playback_keys }
    }
}

fn help_line<'a>(key: &'a str, description: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::styled(key, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" - "),
        Span::raw(description),
    ])
}

impl<'a> Widget for HelpOverlay<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let heading = Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED);

        let mut help_text = vec![
            Line::from(Span::styled("Playback (direct streams)", heading)),
            Line::from(""),
        ];
        help_text.extend(
            self.playback_keys
                .iter()
                .map(|(key, description)| help_line(key, description)),
        );

        help_text.push(Line::from(""));
        help_text.push(Line::from(Span::styled("Application", heading)));
        help_text.push(Line::from(""));
        help_text.push(help_line("o", "Open a URL"));
        help_text.push(help_line("d", "Download the current stream"));
        help_text.push(help_line("r", "Try again after an error"));
        help_text.push(help_line(":", "Command mode (open, seek, vol, mute, fs, download, reset, quit)"));
        help_text.push(help_line("? / F1", "Toggle help"));
        help_text.push(help_line("q / Ctrl+C", "Quit"));

        let help = Paragraph::new(Text::from(help_text))
            .block(Block::default().title("Help").borders(Borders::ALL))
            .style(Style::default().fg(Color::White).bg(Color::Black))
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });

        // Clear the background
        Clear.render(area, buf);

        help.render(area, buf);
    }
}

/// Width of a message box that fits `message` plus its borders
pub fn message_width(message: &str) -> u16 {
    (message.width() as u16).saturating_add(4)
}

/// Get a spinner frame for loading animations
pub fn get_spinner_frame(duration_ms: u128) -> &'static str {
    // Use braille pattern characters for a smooth animation
    const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠚", "⠞", "⠖", "⠦", "⠴", "⠲", "⠳", "⠓"];
    let frame_idx = (duration_ms / 80) % SPINNER_FRAMES.len() as u128;
    SPINNER_FRAMES[frame_idx as usize]
}
