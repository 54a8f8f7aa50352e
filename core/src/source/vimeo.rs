use url::Url;

use super::{is_valid_identifier, trailing_segment};

const EMBED_BASE: &str = "https://player.vimeo.com/video";

const VIMEO_HOSTS: &[&str] = &["vimeo.com", "www.vimeo.com", "player.vimeo.com"];

/// Check if a host serves Vimeo videos
pub fn is_vimeo_host(host: &str) -> bool {
    VIMEO_HOSTS.contains(&host)
}

/// Extract the video identifier, which Vimeo keeps in the trailing path segment
pub fn extract_vimeo_id(url: &Url) -> Option<String> {
    trailing_segment(url)
        .filter(|id| is_valid_identifier(id))
        .map(str::to_string)
}

pub(super) fn embed_url(id: &str, autoplay: bool) -> String {
    format!("{}/{}?autoplay={}", EMBED_BASE, id, u8::from(autoplay))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_segment_is_the_id() {
        let url = Url::parse("https://player.vimeo.com/video/76979871/").unwrap();
        assert_eq!(extract_vimeo_id(&url), Some("76979871".into()));

        let url = Url::parse("https://vimeo.com").unwrap();
        assert_eq!(extract_vimeo_id(&url), None);
    }
}
