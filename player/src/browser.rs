use log::{debug, info};
use marquee_core::{EmbedFrame, FrameEvent, SurfaceBinding, SurfaceError};

use crate::events::{HostEvent, HostSender};

/// Embed frame that hands embeddable players to the system web browser
///
/// The browser gives no signal beyond whether it could be launched, so a
/// successful launch is reported as loaded.
pub struct BrowserFrame {
    events: HostSender,
    mounted: Option<String>,
}

impl BrowserFrame {
    pub fn new(events: HostSender) -> Self {
        Self {
            events,
            mounted: None,
        }
    }
}

impl EmbedFrame for BrowserFrame {
    fn mount(&mut self, embed_url: &str, binding: SurfaceBinding) -> Result<(), SurfaceError> {
        info!("Opening embed {} in the browser", embed_url);
        webbrowser::open(embed_url)
            .map_err(|e| SurfaceError::new(format!("could not open a browser: {}", e)))?;

        self.mounted = Some(embed_url.to_string());
        let _ = self
            .events
            .send(HostEvent::Frame(binding, FrameEvent::Loaded));
        Ok(())
    }

    fn unmount(&mut self) {
        // A browser tab cannot be closed from here
        if let Some(url) = self.mounted.take() {
            debug!("Forgetting embed {}", url);
        }
    }
}
