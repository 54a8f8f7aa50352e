use std::path::PathBuf;

use marquee_core::{FrameEvent, MediaEvent, SurfaceBinding};
use tokio::sync::mpsc::UnboundedSender;

/// Everything that reaches the UI loop from outside the terminal
#[derive(Debug)]
pub enum HostEvent {
    /// Notification from the mpv surface
    Media(SurfaceBinding, MediaEvent),
    /// Notification from the browser frame
    Frame(SurfaceBinding, FrameEvent),
    /// A background download finished
    Download(Result<PathBuf, String>),
}

pub type HostSender = UnboundedSender<HostEvent>;

/// Event utility functions
pub mod event_utils {
    use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};

    /// Check if a key event matches Ctrl+C or Ctrl+Q (terminate)
    pub fn is_terminate_event(event: &Event) -> bool {
        matches!(
            event,
            Event::Key(KeyEvent {
                code: KeyCode::Char('c'),
                modifiers: KeyModifiers::CONTROL,
                ..
            }) | Event::Key(KeyEvent {
                code: KeyCode::Char('q'),
                modifiers: KeyModifiers::CONTROL,
                ..
            })
        )
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_ctrl_c_and_ctrl_q_terminate() {
            let ctrl_c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
            let ctrl_q = Event::Key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL));
            let plain_q = Event::Key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE));
            assert!(is_terminate_event(&ctrl_c));
            assert!(is_terminate_event(&ctrl_q));
            assert!(!is_terminate_event(&plain_q));
        }
    }
}
