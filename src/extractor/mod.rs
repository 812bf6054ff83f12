mod types;

pub use types::*;

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Video identifiers are fixed-width tokens.
const VIDEO_ID_LEN: usize = 11;

// Path-shaped video URLs, including the short domain. The token capture is
// maximal within the id alphabet, so a trailing delimiter (`?`, `&`, `/`,
// whitespace) bounds it naturally and an over-long token fails validation
// instead of being clipped.
static VIDEO_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:youtube\.com/(?:watch\?(?:[^&#\s]*&)*v=|embed/|v/|shorts/|live/)|youtu\.be/)([A-Za-z0-9_-]+)",
    )
    .unwrap()
});

static PLAYLIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[?&])list=([A-Za-z0-9_-]+)").unwrap());

fn is_video_id(token: &str) -> bool {
    token.len() == VIDEO_ID_LEN
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Extract an 11-character video id from any recognized URL shape.
///
/// Total over arbitrary strings: malformed or truncated input yields `None`.
pub fn extract_video_id(url: &str) -> Option<String> {
    // Structured lookup first: `v` may sit anywhere in the query string.
    if let Ok(parsed) = Url::parse(url) {
        if let Some(v) = parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())
        {
            if is_video_id(&v) {
                return Some(v);
            }
        }
    }

    if let Some(caps) = VIDEO_URL_RE.captures(url) {
        let token = &caps[1];
        if is_video_id(token) {
            return Some(token.to_string());
        }
    }

    // Channel-scoped share links: a trailing path segment that is itself a
    // well-formed id, e.g. youtube.com/<channel>/<id>.
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    if !host.ends_with("youtube.com") {
        return None;
    }
    let mut segments: Vec<&str> = parsed.path_segments()?.filter(|s| !s.is_empty()).collect();
    let last = segments.pop()?;
    if !segments.is_empty() && is_video_id(last) {
        return Some(last.to_string());
    }
    None
}

/// Extract a playlist id from a `list=` query parameter, wherever it sits.
pub fn extract_playlist_id(url: &str) -> Option<String> {
    PLAYLIST_RE
        .captures(url)
        .map(|caps| caps[1].to_string())
}

/// Combined extraction with playlist-over-video precedence.
pub fn extract_reference(url: &str) -> Option<MediaReference> {
    if let Some(list) = extract_playlist_id(url) {
        return Some(MediaReference::Playlist(list));
    }
    extract_video_id(url).map(MediaReference::Video)
}
