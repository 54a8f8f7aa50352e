use anyhow::{Result, anyhow};
use ratatui::style::Color;

use crate::app::App;

/// Command handler for the application
pub struct CommandHandler;

impl CommandHandler {
    /// Parse and execute a command
    pub fn execute(app: &mut App, command_str: &str) -> Result<()> {
        let mut parts = command_str.trim().splitn(2, ' ');
        let cmd = parts.next().unwrap_or_default().to_lowercase();
        let args = parts.next().map(str::trim).filter(|args| !args.is_empty());

        match cmd.as_str() {
            "open" | "o" => {
                let args = args.ok_or_else(|| anyhow!("Open command requires a URL"))?;
                let mut words = args.split_whitespace();
                let source = words.next().unwrap_or_default();
                let poster = words.next().map(str::to_string);
                app.open_source_with_poster(source, poster);
            }
            "seek" | "s" => {
                let args = args.ok_or_else(|| anyhow!("Seek command requires a position argument"))?;
                let position = parse_position(args)?;
                app.controller.seek(position);
            }
            "play" | "p" => app.controller.play(),
            "pause" => app.controller.pause(),
            "toggle" | "t" => app.controller.toggle_play_pause(),
            "volume" | "vol" | "v" => {
                let args = args
                    .ok_or_else(|| anyhow!("Volume command requires a level argument (0-100)"))?;
                let level = args
                    .parse::<u8>()
                    .ok()
                    .filter(|level| *level <= 100)
                    .ok_or_else(|| anyhow!("Invalid volume: {}", args))?;
                app.controller.set_volume(f64::from(level) / 100.0);
                app.set_status(format!("Volume set to {}", level), Color::Yellow);
            }
            "mute" | "m" => app.controller.toggle_mute(),
            "fullscreen" | "fs" => app.controller.toggle_fullscreen(),
            "download" | "dl" => app.download(),
            "restart" => app.controller.seek(0.0),
            "reset" | "retry" | "r" => app.retry(),
            "help" | "h" | "?" => app.show_help = true,
            "quit" | "exit" | "q" => app.should_quit = true,
            "" => {
                // Empty command, do nothing
            }
            _ => {
                return Err(anyhow!("Unknown command: {}", cmd));
            }
        }

        Ok(())
    }
}

/// Parse seconds, `m:ss` or `h:mm:ss`
fn parse_position(text: &str) -> Result<f64> {
    let mut seconds = 0.0;
    for part in text.split(':') {
        let value: f64 = part
            .parse()
            .map_err(|_| anyhow!("Invalid position: {}", text))?;
        seconds = seconds * 60.0 + value;
    }
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(anyhow!("Invalid position: {}", text));
    }
    Ok(seconds)
}

/// Handle a command string entered by the user
pub fn handle_command(app: &mut App, command: &str) -> Result<()> {
    let result = CommandHandler::execute(app, command);
    app.pump_controller();
    result
}
