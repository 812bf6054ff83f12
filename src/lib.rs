//! vredirect - resolves a media identifier from the current page and
//! redirects to an alternate viewer application.
//!
//! Works in two contexts: on the media site's own watch/playlist page the
//! identifier sits in the page URL and resolution is a single attempt; on a
//! filter/block page the original destination is rendered asynchronously,
//! so resolution polls query parameter, DOM anchor, and page text on a
//! bounded schedule.

mod config;
mod extractor;
mod page;
mod resolver;

pub use config::{get_config, save_config, Config, ConfigError};
pub use extractor::{
    extract_playlist_id, extract_reference, extract_video_id, MediaReference, RedirectTarget,
};
pub use page::{Navigator, PageProbe, ProbeError, StaticPage};
pub use resolver::{PollState, Resolver};

use tracing::debug;

/// Entry point for one page load. Picks the mode from the current URL:
/// a URL that itself carries a reference resolves in a single attempt; a
/// filter-page URL enters polling mode; anything else is left alone.
///
/// Returns whether a redirect was issued.
pub async fn resolve(probe: &dyn PageProbe, nav: &mut dyn Navigator, config: &Config) -> bool {
    let current = match probe.current_url() {
        Ok(url) => url,
        Err(err) => {
            debug!(%err, "location unavailable, nothing to do");
            return false;
        }
    };

    let mut resolver = Resolver::new(config);
    if extract_reference(&current).is_some() {
        resolver.resolve_once(probe, nav)
    } else if is_filter_page(&current, config) {
        resolver.run(probe, nav).await
    } else {
        false
    }
}

fn is_filter_page(url: &str, config: &Config) -> bool {
    url.to_lowercase().contains(&config.filter_page_marker)
}
