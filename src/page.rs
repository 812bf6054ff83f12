use crate::config::Config;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("page access denied: {0}")]
    AccessDenied(String),
    #[error("invalid selector: {0}")]
    Selector(String),
}

/// Read access to the current page, injected so resolution is testable
/// against synthetic inputs.
///
/// Every accessor may fail; the resolver treats any failure as a missing
/// source for that attempt and retries on the next tick.
pub trait PageProbe {
    /// The page's current location.
    fn current_url(&self) -> Result<String, ProbeError>;

    /// `href` of the first link inside the element matching `selector`,
    /// if both exist.
    fn container_link(&self, selector: &str) -> Result<Option<String>, ProbeError>;

    /// Visible text of the document body, if any.
    fn body_text(&self) -> Result<Option<String>, ProbeError>;
}

/// Navigation sink. `replace` must not push a history entry, so back
/// navigation does not return to the filter page.
pub trait Navigator {
    fn replace(&mut self, url: &str);
}

static URL_IN_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>]+"#).unwrap());

/// Candidate destination URLs for one attempt, in source precedence order:
/// query parameter, DOM anchor, page text. Sources are re-read on every
/// call since filter-page content is rendered asynchronously.
pub(crate) fn candidate_urls(probe: &dyn PageProbe, config: &Config) -> Vec<String> {
    let mut candidates = Vec::new();

    match probe.current_url() {
        Ok(url) => {
            if let Some(dest) = query_param_destination(&url, &config.source_query_param) {
                candidates.push(dest);
            }
        }
        Err(err) => debug!(%err, "location read failed"),
    }

    match probe.container_link(&config.dom_container_selector) {
        Ok(Some(href)) if !href.is_empty() => candidates.push(href),
        Ok(_) => {}
        Err(err) => debug!(%err, "container probe failed"),
    }

    match probe.body_text() {
        Ok(Some(text)) => {
            if let Some(dest) = embedded_destination(&text, &config.destination_marker) {
                candidates.push(dest);
            }
        }
        Ok(None) => {}
        Err(err) => debug!(%err, "body text probe failed"),
    }

    candidates
}

/// Percent-decoded value of `param` on `page_url`. A URL that does not
/// parse, an absent parameter, and a value that fails to decode are all the
/// same outcome: no candidate from this source.
fn query_param_destination(page_url: &str, param: &str) -> Option<String> {
    let parsed = Url::parse(page_url).ok()?;
    let query = parsed.query()?;
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        if key != param {
            continue;
        }
        let Ok(decoded) = urlencoding::decode(value) else {
            continue;
        };
        if !decoded.is_empty() {
            return Some(decoded.into_owned());
        }
    }
    None
}

/// First URL embedded in free-form text whose lowercase form contains the
/// destination marker.
fn embedded_destination(text: &str, marker: &str) -> Option<String> {
    URL_IN_TEXT_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|candidate| candidate.to_lowercase().contains(marker))
        .map(str::to_string)
}

/// Probe over a URL plus an HTML snapshot.
///
/// The document is re-parsed per query; nothing is cached across attempts.
pub struct StaticPage {
    url: String,
    html: String,
}

impl StaticPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }
}

impl PageProbe for StaticPage {
    fn current_url(&self) -> Result<String, ProbeError> {
        Ok(self.url.clone())
    }

    fn container_link(&self, selector: &str) -> Result<Option<String>, ProbeError> {
        let container = Selector::parse(selector)
            .map_err(|e| ProbeError::Selector(e.to_string()))?;
        let anchor = Selector::parse("a").map_err(|e| ProbeError::Selector(e.to_string()))?;
        let doc = Html::parse_document(&self.html);
        Ok(doc
            .select(&container)
            .next()
            .and_then(|el| el.select(&anchor).next())
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string))
    }

    fn body_text(&self) -> Result<Option<String>, ProbeError> {
        let doc = Html::parse_document(&self.html);
        let text = doc
            .root_element()
            .text()
            .collect::<Vec<_>>()
            .join(" ");
        if text.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }
}
