//! Keyboard shortcuts for the direct-stream surface.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Playback command bound to a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCommand {
    SeekBackward,
    SeekForward,
    TogglePlay,
    ToggleMute,
    ToggleFullscreen,
    JumpToStart,
    VolumeUp,
    VolumeDown,
}

impl KeyCommand {
    /// Key hint and description for help screens
    pub const BINDINGS: &'static [(&'static str, &'static str)] = &[
        ("Space / k", "Play / pause"),
        ("← / j", "Seek backward"),
        ("→ / l", "Seek forward"),
        ("↑ / ↓", "Volume up / down"),
        ("m", "Mute / unmute"),
        ("f", "Toggle fullscreen"),
        ("0 / Home", "Jump to start"),
    ];
}

/// Map a key press to a playback command
///
/// Key releases and keys held with Ctrl or Alt map to `None`.
pub fn map_key(key: &KeyEvent) -> Option<KeyCommand> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    {
        return None;
    }

    let command = match key.code {
        KeyCode::Left | KeyCode::Char('j') => KeyCommand::SeekBackward,
        KeyCode::Right | KeyCode::Char('l') => KeyCommand::SeekForward,
        KeyCode::Char(' ') | KeyCode::Char('k') => KeyCommand::TogglePlay,
        KeyCode::Char('m') => KeyCommand::ToggleMute,
        KeyCode::Char('f') => KeyCommand::ToggleFullscreen,
        KeyCode::Char('0') | KeyCode::Home => KeyCommand::JumpToStart,
        KeyCode::Up => KeyCommand::VolumeUp,
        KeyCode::Down => KeyCommand::VolumeDown,
        _ => return None,
    };
    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_arrow_and_vim_keys_seek() {
        assert_eq!(map_key(&press(KeyCode::Left)), Some(KeyCommand::SeekBackward));
        assert_eq!(map_key(&press(KeyCode::Char('j'))), Some(KeyCommand::SeekBackward));
        assert_eq!(map_key(&press(KeyCode::Right)), Some(KeyCommand::SeekForward));
        assert_eq!(map_key(&press(KeyCode::Char('l'))), Some(KeyCommand::SeekForward));
    }

    #[test]
    fn test_toggles() {
        assert_eq!(map_key(&press(KeyCode::Char(' '))), Some(KeyCommand::TogglePlay));
        assert_eq!(map_key(&press(KeyCode::Char('k'))), Some(KeyCommand::TogglePlay));
        assert_eq!(map_key(&press(KeyCode::Char('m'))), Some(KeyCommand::ToggleMute));
        assert_eq!(
            map_key(&press(KeyCode::Char('f'))),
            Some(KeyCommand::ToggleFullscreen)
        );
        assert_eq!(map_key(&press(KeyCode::Home)), Some(KeyCommand::JumpToStart));
        assert_eq!(map_key(&press(KeyCode::Char('0'))), Some(KeyCommand::JumpToStart));
    }

    #[test]
    fn test_unbound_keys_are_ignored() {
        assert_eq!(map_key(&press(KeyCode::Char('x'))), None);
        assert_eq!(map_key(&press(KeyCode::Enter)), None);
        assert_eq!(map_key(&press(KeyCode::F(5))), None);
    }

    #[test]
    fn test_modified_keys_are_ignored() {
        let ctrl_f = KeyEvent::new(KeyCode::Char('f'), KeyModifiers::CONTROL);
        assert_eq!(map_key(&ctrl_f), None);
        let shifted = KeyEvent::new(KeyCode::Up, KeyModifiers::SHIFT);
        assert_eq!(map_key(&shifted), Some(KeyCommand::VolumeUp));
    }

    #[test]
    fn test_key_release_is_ignored() {
        let release = KeyEvent::new_with_kind(
            KeyCode::Char(' '),
            KeyModifiers::NONE,
            KeyEventKind::Release,
        );
        assert_eq!(map_key(&release), None);
    }
}
