use crate::config::Config;
use crate::extractor::{extract_reference, RedirectTarget};
use crate::page::{candidate_urls, Navigator, PageProbe};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

/// Resolution progress. Terminal states are absorbing: once redirected or
/// exhausted, further attempts are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Pending { attempt: u32 },
    Redirected,
    Exhausted,
}

impl PollState {
    /// Pure transition fed with the outcome of one attempt.
    pub fn step(self, found: bool, max_attempts: u32) -> PollState {
        match self {
            PollState::Pending { attempt } => {
                if found {
                    PollState::Redirected
                } else if attempt + 1 >= max_attempts {
                    PollState::Exhausted
                } else {
                    PollState::Pending {
                        attempt: attempt + 1,
                    }
                }
            }
            terminal => terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Pending { .. })
    }
}

/// One resolution session for one page load.
///
/// The attempt counter lives here rather than in a global, so concurrent
/// sessions (and tests) cannot interfere with each other.
pub struct Resolver<'a> {
    config: &'a Config,
    state: PollState,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a Config) -> Self {
        let state = if config.max_attempts == 0 {
            PollState::Exhausted
        } else {
            PollState::Pending { attempt: 0 }
        };
        Self { config, state }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// One polling attempt: gather candidates in source precedence order and
    /// take the first that extracts to a reference. A no-op in terminal
    /// states, so a leftover tick after success does not probe again.
    pub fn check(&mut self, probe: &dyn PageProbe) -> Option<RedirectTarget> {
        let PollState::Pending { attempt } = self.state else {
            return None;
        };
        let reference = candidate_urls(probe, self.config)
            .into_iter()
            .find_map(|candidate| extract_reference(&candidate));
        debug!(attempt, found = reference.is_some(), "resolution attempt");
        self.state = self.state.step(reference.is_some(), self.config.max_attempts);
        reference.map(|r| RedirectTarget::new(&self.config.base_target_url, &r))
    }

    /// Single-attempt mode for the media site's own page: the current URL is
    /// authoritative and will not change, so there is nothing to retry.
    pub fn resolve_once(&mut self, probe: &dyn PageProbe, nav: &mut dyn Navigator) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        let reference = probe
            .current_url()
            .ok()
            .and_then(|url| extract_reference(&url));
        match reference {
            Some(r) => {
                let target = RedirectTarget::new(&self.config.base_target_url, &r);
                self.state = PollState::Redirected;
                info!(url = %target.url(), "redirecting");
                nav.replace(target.url());
                true
            }
            None => {
                self.state = PollState::Exhausted;
                false
            }
        }
    }

    /// Polling mode for the filter page. Attempt 0 runs immediately; later
    /// attempts are spaced by `interval_ms` and re-read every source, up to
    /// `max_attempts` attempts. Gives up silently at the ceiling.
    pub async fn run(&mut self, probe: &dyn PageProbe, nav: &mut dyn Navigator) -> bool {
        loop {
            if let Some(target) = self.check(probe) {
                info!(url = %target.url(), "redirecting");
                nav.replace(target.url());
                return true;
            }
            match self.state {
                PollState::Pending { .. } => {
                    sleep(Duration::from_millis(self.config.interval_ms)).await;
                }
                PollState::Exhausted => {
                    debug!(
                        max_attempts = self.config.max_attempts,
                        "attempt ceiling reached, leaving page as-is"
                    );
                    return false;
                }
                PollState::Redirected => return true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::ProbeError;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use tokio::time::Instant;

    /// Probe whose DOM anchor yields a scripted sequence of hrefs, one per
    /// attempt. Counts how often it is read.
    struct ScriptedProbe {
        hrefs: RefCell<VecDeque<Option<String>>>,
        reads: Cell<u32>,
    }

    impl ScriptedProbe {
        fn new(hrefs: Vec<Option<&str>>) -> Self {
            Self {
                hrefs: RefCell::new(
                    hrefs.into_iter().map(|h| h.map(str::to_string)).collect(),
                ),
                reads: Cell::new(0),
            }
        }
    }

    impl PageProbe for ScriptedProbe {
        fn current_url(&self) -> Result<String, ProbeError> {
            Ok("https://filter.example/block-page".to_string())
        }

        fn container_link(&self, _selector: &str) -> Result<Option<String>, ProbeError> {
            self.reads.set(self.reads.get() + 1);
            Ok(self.hrefs.borrow_mut().pop_front().flatten())
        }

        fn body_text(&self) -> Result<Option<String>, ProbeError> {
            Ok(None)
        }
    }

    /// Probe whose every access fails, as when the environment denies
    /// location/DOM reads.
    struct DeniedProbe;

    impl PageProbe for DeniedProbe {
        fn current_url(&self) -> Result<String, ProbeError> {
            Err(ProbeError::AccessDenied("location".into()))
        }

        fn container_link(&self, _selector: &str) -> Result<Option<String>, ProbeError> {
            Err(ProbeError::AccessDenied("dom".into()))
        }

        fn body_text(&self) -> Result<Option<String>, ProbeError> {
            Err(ProbeError::AccessDenied("dom".into()))
        }
    }

    #[derive(Default)]
    struct RecordingNav {
        replaced: Vec<String>,
    }

    impl Navigator for RecordingNav {
        fn replace(&mut self, url: &str) {
            self.replaced.push(url.to_string());
        }
    }

    fn test_config() -> Config {
        Config {
            base_target_url: "https://viewer.example".into(),
            interval_ms: 250,
            max_attempts: 1200,
            ..Config::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn redirects_after_three_delays() {
        let probe = ScriptedProbe::new(vec![
            None,
            None,
            None,
            Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
        ]);
        let mut nav = RecordingNav::default();
        let config = test_config();
        let mut resolver = Resolver::new(&config);

        let start = Instant::now();
        assert!(resolver.run(&probe, &mut nav).await);

        assert_eq!(start.elapsed(), Duration::from_millis(750));
        assert_eq!(
            nav.replaced,
            vec!["https://viewer.example/video?source=dQw4w9WgXcQ"]
        );
        assert_eq!(probe.reads.get(), 4);
        assert_eq!(resolver.state(), PollState::Redirected);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_max_attempts() {
        let probe = ScriptedProbe::new(vec![]);
        let mut nav = RecordingNav::default();
        let config = Config {
            max_attempts: 5,
            ..test_config()
        };
        let mut resolver = Resolver::new(&config);

        assert!(!resolver.run(&probe, &mut nav).await);

        assert_eq!(probe.reads.get(), 5);
        assert!(nav.replaced.is_empty());
        assert_eq!(resolver.state(), PollState::Exhausted);
    }

    #[tokio::test(start_paused = true)]
    async fn leftover_tick_after_success_is_noop() {
        let probe = ScriptedProbe::new(vec![Some("https://youtu.be/dQw4w9WgXcQ")]);
        let mut nav = RecordingNav::default();
        let config = test_config();
        let mut resolver = Resolver::new(&config);

        assert!(resolver.run(&probe, &mut nav).await);
        let reads_after_success = probe.reads.get();

        // A stray timer firing after navigation began must not probe again.
        assert_eq!(resolver.check(&probe), None);
        assert_eq!(probe.reads.get(), reads_after_success);
        assert_eq!(nav.replaced.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn probe_errors_count_as_attempts() {
        let mut nav = RecordingNav::default();
        let config = Config {
            max_attempts: 3,
            ..test_config()
        };
        let mut resolver = Resolver::new(&config);

        assert!(!resolver.run(&DeniedProbe, &mut nav).await);
        assert_eq!(resolver.state(), PollState::Exhausted);
        assert!(nav.replaced.is_empty());
    }

    #[test]
    fn single_attempt_redirects_without_retry() {
        let page = crate::page::StaticPage::new("https://site/watch?v=dQw4w9WgXcQ", "");
        let mut nav = RecordingNav::default();
        let config = test_config();
        let mut resolver = Resolver::new(&config);

        assert!(resolver.resolve_once(&page, &mut nav));
        assert_eq!(
            nav.replaced,
            vec!["https://viewer.example/video?source=dQw4w9WgXcQ"]
        );
        // Second call must not navigate again.
        assert!(!resolver.resolve_once(&page, &mut nav));
        assert_eq!(nav.replaced.len(), 1);
    }

    #[test]
    fn single_attempt_failure_is_terminal() {
        let page = crate::page::StaticPage::new("https://site/other", "");
        let mut nav = RecordingNav::default();
        let config = test_config();
        let mut resolver = Resolver::new(&config);

        assert!(!resolver.resolve_once(&page, &mut nav));
        assert_eq!(resolver.state(), PollState::Exhausted);
        assert!(nav.replaced.is_empty());
    }

    #[test]
    fn playlist_candidate_routes_to_playlist_viewer() {
        let probe = ScriptedProbe::new(vec![Some(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PLabc_-123",
        )]);
        let config = test_config();
        let mut resolver = Resolver::new(&config);

        let target = resolver.check(&probe).unwrap();
        assert_eq!(
            target.url(),
            "https://viewer.example/playlist?source=PLabc_-123"
        );
    }

    #[test]
    fn step_transitions() {
        let s = PollState::Pending { attempt: 0 };
        assert_eq!(s.step(true, 5), PollState::Redirected);
        assert_eq!(s.step(false, 5), PollState::Pending { attempt: 1 });
        assert_eq!(
            PollState::Pending { attempt: 4 }.step(false, 5),
            PollState::Exhausted
        );
        assert_eq!(PollState::Redirected.step(false, 5), PollState::Redirected);
        assert_eq!(PollState::Exhausted.step(true, 5), PollState::Exhausted);
    }
}
