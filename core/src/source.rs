//! Source classification.
//!
//! Turns an arbitrary source string into a [`SourceDescriptor`] that picks
//! the rendering surface. Classification is pure: the same input and
//! autoplay flag always produce the same descriptor.

mod catalog;
mod vimeo;
mod youtube;

use std::fmt;

use log::debug;
use url::Url;

use crate::error::ClassificationError;

pub use catalog::{CATALOG_GUIDANCE, is_catalog_host};
pub use vimeo::{extract_vimeo_id, is_vimeo_host};
pub use youtube::{extract_youtube_id, is_youtube_host};

/// Network schemes a direct stream may use
const NETWORK_SCHEMES: &[&str] = &["http", "https"];

/// Host prefixes accepted without a scheme
const SCHEMELESS_PREFIXES: &[&str] = &[
    "youtu.be/",
    "youtube.com/",
    "www.youtube.com/",
    "m.youtube.com/",
    "vimeo.com/",
    "www.vimeo.com/",
];

/// Which rendering path a descriptor selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceVariant {
    DirectStream,
    YouTubeEmbed,
    VimeoEmbed,
    Invalid,
}

impl fmt::Display for SourceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceVariant::DirectStream => "direct stream",
            SourceVariant::YouTubeEmbed => "YouTube embed",
            SourceVariant::VimeoEmbed => "Vimeo embed",
            SourceVariant::Invalid => "invalid",
        };
        f.write_str(name)
    }
}

/// Where a direct stream URL came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceOrigin {
    /// Any absolute http(s) URL
    Direct,
    /// A third-party catalog page whose path shape was validated
    Catalog,
}

/// Classified, normalized representation of a source string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    /// Played by the direct media surface using the original URL
    DirectStream { url: String, origin: SourceOrigin },
    /// Rendered through the YouTube embed frame
    YouTubeEmbed { id: String, embed_url: String },
    /// Rendered through the Vimeo embed frame
    VimeoEmbed { id: String, embed_url: String },
    /// Unusable source; no session is ever created for it
    Invalid(ClassificationError),
}

impl SourceDescriptor {
    pub fn variant(&self) -> SourceVariant {
        match self {
            SourceDescriptor::DirectStream { .. } => SourceVariant::DirectStream,
            SourceDescriptor::YouTubeEmbed { .. } => SourceVariant::YouTubeEmbed,
            SourceDescriptor::VimeoEmbed { .. } => SourceVariant::VimeoEmbed,
            SourceDescriptor::Invalid(_) => SourceVariant::Invalid,
        }
    }

    /// URL to hand to the rendering surface, absent for invalid sources
    pub fn playback_url(&self) -> Option<&str> {
        match self {
            SourceDescriptor::DirectStream { url, .. } => Some(url),
            SourceDescriptor::YouTubeEmbed { embed_url, .. }
            | SourceDescriptor::VimeoEmbed { embed_url, .. } => Some(embed_url),
            SourceDescriptor::Invalid(_) => None,
        }
    }

    /// Populated only for invalid sources
    pub fn error_reason(&self) -> Option<ClassificationError> {
        match self {
            SourceDescriptor::Invalid(reason) => Some(*reason),
            _ => None,
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(
            self,
            SourceDescriptor::YouTubeEmbed { .. } | SourceDescriptor::VimeoEmbed { .. }
        )
    }

    pub fn is_catalog(&self) -> bool {
        matches!(
            self,
            SourceDescriptor::DirectStream {
                origin: SourceOrigin::Catalog,
                ..
            }
        )
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceDescriptor::Invalid(reason) => write!(f, "{}: {}", self.variant(), reason),
            SourceDescriptor::DirectStream {
                url,
                origin: SourceOrigin::Catalog,
            } => write!(f, "{} (catalog): {}", self.variant(), url),
            _ => match self.playback_url() {
                Some(url) => write!(f, "{}: {}", self.variant(), url),
                None => write!(f, "{}", self.variant()),
            },
        }
    }
}

/// Classify a source string into a descriptor
///
/// Rules are applied in order: YouTube, Vimeo, known catalog hosts, then
/// any absolute http(s) URL. `autoplay` only affects the embed URL template.
pub fn classify(source: &str, autoplay: bool) -> SourceDescriptor {
    let source = source.trim();

    let Some(url) = parse_network_url(source) else {
        debug!("Rejecting source without a network scheme: {:?}", source);
        return SourceDescriptor::Invalid(ClassificationError::MalformedUrl);
    };

    // Url lowercases hosts for special schemes
    let host = url.host_str().unwrap_or_default();

    let descriptor = if is_youtube_host(host) {
        match extract_youtube_id(&url) {
            Some(id) => SourceDescriptor::YouTubeEmbed {
                embed_url: youtube::embed_url(&id, autoplay),
                id,
            },
            None => SourceDescriptor::Invalid(ClassificationError::MissingIdentifier),
        }
    } else if is_vimeo_host(host) {
        match extract_vimeo_id(&url) {
            Some(id) => SourceDescriptor::VimeoEmbed {
                embed_url: vimeo::embed_url(&id, autoplay),
                id,
            },
            None => SourceDescriptor::Invalid(ClassificationError::MissingIdentifier),
        }
    } else if is_catalog_host(host) {
        if catalog::has_playable_shape(&url) {
            SourceDescriptor::DirectStream {
                url: source.to_string(),
                origin: SourceOrigin::Catalog,
            }
        } else {
            SourceDescriptor::Invalid(ClassificationError::UnsupportedHost)
        }
    } else {
        SourceDescriptor::DirectStream {
            url: source.to_string(),
            origin: SourceOrigin::Direct,
        }
    };

    debug!("Classified {:?} as {}", source, descriptor);
    descriptor
}

/// Parse an absolute URL with a network scheme and a host
fn parse_network_url(source: &str) -> Option<Url> {
    let url = match Url::parse(source) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) if has_schemeless_prefix(source) => {
            Url::parse(&format!("https://{}", source)).ok()?
        }
        Err(_) => return None,
    };

    if !NETWORK_SCHEMES.contains(&url.scheme()) {
        return None;
    }
    url.host_str().filter(|host| !host.is_empty())?;

    Some(url)
}

fn has_schemeless_prefix(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    SCHEMELESS_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// Video identifiers are restricted to URL-safe characters
pub(crate) fn is_valid_identifier(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Last non-empty path segment of a URL
pub(crate) fn trailing_segment(url: &Url) -> Option<&str> {
    url.path_segments()?.filter(|s| !s.is_empty()).next_back()
}
