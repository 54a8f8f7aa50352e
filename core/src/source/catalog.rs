//! Third-party catalog hosts.
//!
//! Catalog URLs are handed to the direct surface untouched; classification
//! only checks that the path has a shape the host can actually serve.

use url::Url;

use super::trailing_segment;

/// Expected path shape for a catalog host
#[derive(Debug, Clone, Copy)]
enum PathShape {
    /// Path must end in a non-empty identifier
    TrailingIdentifier,
    /// Path must contain the given segment somewhere
    ContainsSegment(&'static str),
}

/// Steps shown when a catalog page cannot be played directly
pub const CATALOG_GUIDANCE: &str = "For MovieBox videos, open the video page, \
right-click the video, choose \"Copy video address\" and paste that URL instead.";

const CATALOG_HOSTS: &[(&str, PathShape)] = &[
    ("v.inmoviebox.com", PathShape::TrailingIdentifier),
    ("moviebox.ng", PathShape::ContainsSegment("watch")),
    ("www.moviebox.ng", PathShape::ContainsSegment("watch")),
];

fn shape_for(host: &str) -> Option<PathShape> {
    CATALOG_HOSTS
        .iter()
        .find(|(name, _)| *name == host)
        .map(|(_, shape)| *shape)
}

/// Check if a host is a recognized third-party catalog
pub fn is_catalog_host(host: &str) -> bool {
    shape_for(host).is_some()
}

pub(super) fn has_playable_shape(url: &Url) -> bool {
    let Some(shape) = url.host_str().and_then(shape_for) else {
        return false;
    };

    match shape {
        PathShape::TrailingIdentifier => trailing_segment(url).is_some(),
        PathShape::ContainsSegment(marker) => url
            .path_segments()
            .is_some_and(|mut segments| segments.any(|s| s == marker)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_marker_anywhere_in_path() {
        let url = Url::parse("https://www.moviebox.ng/en/watch/abc").unwrap();
        assert!(has_playable_shape(&url));

        let url = Url::parse("https://www.moviebox.ng/watchlist").unwrap();
        assert!(!has_playable_shape(&url));
    }

    #[test]
    fn test_unknown_host_has_no_shape() {
        let url = Url::parse("https://example.com/watch/abc").unwrap();
        assert!(!is_catalog_host("example.com"));
        assert!(!has_playable_shape(&url));
    }
}
