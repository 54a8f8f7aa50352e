use url::Url;

use super::is_valid_identifier;

const EMBED_BASE: &str = "https://www.youtube.com/embed";

/// Hosts serving YouTube watch pages or share links
const YOUTUBE_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtube-nocookie.com",
    "www.youtube-nocookie.com",
    "youtu.be",
];

/// Path prefixes that carry the identifier as the next segment
const ID_PATH_PREFIXES: &[&str] = &["embed", "shorts", "live", "v"];

/// Check if a host serves YouTube videos
pub fn is_youtube_host(host: &str) -> bool {
    YOUTUBE_HOSTS.contains(&host)
}

/// Extract the video identifier from a YouTube URL
///
/// Short links carry it in the first path segment, watch pages in the `v`
/// query parameter, embed/shorts/live links in the segment after the prefix.
pub fn extract_youtube_id(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    let id = if url.host_str() == Some("youtu.be") {
        segments.next().map(str::to_string)
    } else {
        match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some(prefix) if ID_PATH_PREFIXES.contains(&prefix) => {
                segments.next().map(str::to_string)
            }
            _ => None,
        }
    };

    id.filter(|id| is_valid_identifier(id))
}

pub(super) fn embed_url(id: &str, autoplay: bool) -> String {
    format!(
        "{}/{}?autoplay={}&enablejsapi=1",
        EMBED_BASE,
        id,
        u8::from(autoplay)
    )
}
