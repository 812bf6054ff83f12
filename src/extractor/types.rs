use serde::{Deserialize, Serialize};

/// A media resource referenced by a URL: a single video or a playlist.
///
/// Playlist wins over Video when a URL carries both, since playlist URLs
/// usually also carry a `v=` parameter for the currently selected item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaReference {
    Video(String),
    Playlist(String),
}

impl MediaReference {
    pub fn id(&self) -> &str {
        match self {
            Self::Video(id) | Self::Playlist(id) => id,
        }
    }

    fn path_segment(&self) -> &'static str {
        match self {
            Self::Video(_) => "video",
            Self::Playlist(_) => "playlist",
        }
    }
}

/// Viewer-application URL built from a [`MediaReference`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    url: String,
}

impl RedirectTarget {
    pub fn new(base_url: &str, reference: &MediaReference) -> Self {
        let url = format!(
            "{}/{}?source={}",
            base_url.trim_end_matches('/'),
            reference.path_segment(),
            urlencoding::encode(reference.id())
        );
        Self { url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn into_url(self) -> String {
        self.url
    }
}
