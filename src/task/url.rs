//! Source URL descriptor parsing.
//!
//! Catalog URLs look like
//! `https://music.apple.com/{region}/{type}/{name}/{id}` with an optional
//! `?i={track_id}` query parameter pointing at a single item inside a
//! container. Parsing either yields a full descriptor or an [`InvalidUrl`]
//! error, never a partial result.

use percent_encoding::percent_decode_str;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use super::ContentType;

#[derive(Debug, Error)]
#[error("not a recognizable catalog URL: {0}")]
pub struct InvalidUrl(pub String);

/// Stable fields extracted from a source URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlDescriptor {
    pub content_type: ContentType,
    pub display_name: String,
    pub id: String,
}

fn path_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"/([a-z]{2})/(artist|album|playlist|song|music-video|post)/([^/?#]+)(?:/([^/?#]+))?",
        )
        .expect("path pattern is valid")
    })
}

fn item_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[?&]i=([0-9a-z]+)").expect("item pattern is valid"))
}

/// Parse a source URL into its descriptor.
///
/// The id may appear as a trailing path segment or as an `i=` query
/// parameter. An explicit item id narrows the content type to [`ContentType::Song`]
/// regardless of the container type in the path; this is what a track link
/// inside an album page looks like.
pub fn parse_source_url(url: &str) -> Result<UrlDescriptor, InvalidUrl> {
    let caps = path_pattern()
        .captures(url)
        .ok_or_else(|| InvalidUrl(url.to_string()))?;

    let content_type = ContentType::from_segment(&caps[2])
        .ok_or_else(|| InvalidUrl(url.to_string()))?;
    let display_name = percent_decode_str(&caps[3]).decode_utf8_lossy().into_owned();

    let item_id = item_pattern()
        .captures(url)
        .map(|item| item[1].to_string());

    let (content_type, id) = match item_id {
        Some(id) => (ContentType::Song, id),
        None => {
            let id = caps
                .get(4)
                .map(|m| m.as_str().to_string())
                .ok_or_else(|| InvalidUrl(url.to_string()))?;
            (content_type, id)
        }
    };

    Ok(UrlDescriptor {
        content_type,
        display_name,
        id,
    })
}
