//! Embedded surface state.
//!
//! Externally hosted players only report whether the frame loaded. There is
//! no way to tell a transient failure from a permanent one through that
//! channel, so a failure here is final for the current source.

use log::{debug, info, warn};

use crate::media::FrameEvent;

/// Coarse load state of an embed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedStatus {
    Loading,
    Loaded,
    Failed(String),
}

/// State for one embedded source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedSession {
    pub embed_url: String,
    pub status: EmbedStatus,
}

impl EmbeddedSession {
    pub(crate) fn new(embed_url: &str) -> Self {
        Self {
            embed_url: embed_url.to_string(),
            status: EmbedStatus::Loading,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, EmbedStatus::Failed(_))
    }

    /// Apply a frame signal; returns the failure reason on the transition
    /// into `Failed`
    pub(crate) fn handle_event(&mut self, event: FrameEvent) -> Option<String> {
        if self.is_failed() {
            debug!("Ignoring {:?} from failed embed {}", event, self.embed_url);
            return None;
        }

        match event {
            FrameEvent::Loaded => {
                info!("Embed frame loaded {}", self.embed_url);
                self.status = EmbedStatus::Loaded;
                None
            }
            FrameEvent::Failed(reason) => {
                warn!("Embed frame failed for {}: {}", self.embed_url, reason);
                self.status = EmbedStatus::Failed(reason.clone());
                Some(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_is_final() {
        let mut embed = EmbeddedSession::new("https://player.vimeo.com/video/1?autoplay=0");
        assert_eq!(
            embed.handle_event(FrameEvent::Failed("blocked".into())),
            Some("blocked".to_string())
        );
        assert_eq!(embed.handle_event(FrameEvent::Loaded), None);
        assert_eq!(embed.status, EmbedStatus::Failed("blocked".into()));
    }

    #[test]
    fn test_loaded() {
        let mut embed = EmbeddedSession::new("https://www.youtube.com/embed/abc");
        assert_eq!(embed.handle_event(FrameEvent::Loaded), None);
        assert_eq!(embed.status, EmbedStatus::Loaded);
    }
}
