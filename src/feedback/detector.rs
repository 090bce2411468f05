//! Liveness state machine for the embedded feedback page.
//!
//! Each load is an attempt with its own [`AttemptId`]. Terminal signals
//! (load, network error, timeout) carry the id they were issued for and only
//! apply while that attempt is current and still loading, so at most one
//! outcome is committed per attempt and late signals are ignored.

use tracing::debug;

use super::port::target_url;

/// Browser error-page title fragments: "cannot be accessed" and "error" in
/// Chinese, plus Chromium and Firefox English titles.
pub const DEFAULT_ERROR_MARKERS: &[&str] = &[
    "无法访问",
    "错误",
    "can't be reached",
    "can’t be reached",
    "Problem loading page",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttemptId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Network,
    ErrorPage,
    Timeout,
}

impl FailureReason {
    pub fn description(&self) -> &'static str {
        match self {
            FailureReason::Network => "the page failed to load",
            FailureReason::ErrorPage => "the page is a browser error page",
            FailureReason::Timeout => "no response within the load timeout",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(FailureReason),
}

impl FrameState {
    pub fn is_loading(&self) -> bool {
        matches!(self, FrameState::Loading)
    }
}

/// What inspecting a loaded frame yielded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inspection {
    /// The document belongs to another origin and cannot be read.
    CrossOrigin,
    Document { title: String },
}

#[derive(Debug, Clone)]
pub struct LivenessDetector {
    port: Option<u16>,
    attempt: u64,
    state: FrameState,
    error_markers: Vec<String>,
}

impl Default for LivenessDetector {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_MARKERS.iter().map(|m| m.to_string()).collect())
    }
}

impl LivenessDetector {
    pub fn new(error_markers: Vec<String>) -> Self {
        Self {
            port: None,
            attempt: 0,
            state: FrameState::Idle,
            error_markers,
        }
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn is_current(&self, id: AttemptId) -> bool {
        id.0 == self.attempt
    }

    /// Point the detector at a new feedback port.
    ///
    /// Returns the id of the new attempt when loading starts. Clearing the
    /// port invalidates any pending attempt.
    pub fn set_port(&mut self, port: Option<u16>) -> Option<AttemptId> {
        if port == self.port {
            return None;
        }
        self.port = port;

        match port {
            Some(_) => Some(self.begin_attempt()),
            None => {
                self.attempt += 1;
                self.state = FrameState::Idle;
                debug!("Feedback port cleared, attempt {} idle", self.attempt);
                None
            }
        }
    }

    /// Reload the same URL.
    pub fn retry(&mut self) -> Option<AttemptId> {
        self.port?;
        Some(self.begin_attempt())
    }

    pub fn target_url(&self) -> Option<String> {
        self.port.map(target_url)
    }

    /// URL to open directly, outside the embedding.
    pub fn escape_url(&self) -> Option<String> {
        self.target_url()
    }

    pub fn on_load(&mut self, id: AttemptId, inspection: Inspection) -> Option<FrameState> {
        let next = match inspection {
            Inspection::CrossOrigin => FrameState::Loaded,
            Inspection::Document { title } if self.is_error_title(&title) => {
                FrameState::Failed(FailureReason::ErrorPage)
            }
            Inspection::Document { .. } => FrameState::Loaded,
        };
        self.commit(id, next)
    }

    pub fn on_error(&mut self, id: AttemptId) -> Option<FrameState> {
        self.commit(id, FrameState::Failed(FailureReason::Network))
    }

    pub fn on_timeout(&mut self, id: AttemptId) -> Option<FrameState> {
        self.commit(id, FrameState::Failed(FailureReason::Timeout))
    }

    pub fn is_error_title(&self, title: &str) -> bool {
        self.error_markers
            .iter()
            .any(|marker| title.contains(marker.as_str()))
    }

    fn begin_attempt(&mut self) -> AttemptId {
        self.attempt += 1;
        self.state = FrameState::Loading;
        debug!("Feedback attempt {} loading {:?}", self.attempt, self.port);
        AttemptId(self.attempt)
    }

    fn commit(&mut self, id: AttemptId, next: FrameState) -> Option<FrameState> {
        if !self.is_current(id) || !self.state.is_loading() {
            debug!(
                "Ignoring {:?} for attempt {} (current {}, state {:?})",
                next, id.0, self.attempt, self.state
            );
            return None;
        }
        self.state = next;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loading(port: u16) -> (LivenessDetector, AttemptId) {
        let mut detector = LivenessDetector::default();
        let id = detector.set_port(Some(port)).unwrap();
        (detector, id)
    }

    #[test]
    fn starts_idle_without_port() {
        let detector = LivenessDetector::default();
        assert_eq!(detector.state(), FrameState::Idle);
        assert_eq!(detector.target_url(), None);
    }

    #[test]
    fn setting_port_enters_loading() {
        let (detector, id) = loading(8080);
        assert_eq!(detector.state(), FrameState::Loading);
        assert!(detector.is_current(id));
        assert_eq!(
            detector.target_url().as_deref(),
            Some("http://127.0.0.1:8080")
        );
    }

    #[test]
    fn unchanged_port_does_not_restart() {
        let (mut detector, id) = loading(8080);
        assert_eq!(detector.set_port(Some(8080)), None);
        assert!(detector.is_current(id));
    }

    #[test]
    fn timeout_commits_error_once_and_late_load_is_ignored() {
        let (mut detector, id) = loading(8080);

        assert_eq!(
            detector.on_timeout(id),
            Some(FrameState::Failed(FailureReason::Timeout))
        );
        assert_eq!(
            detector.on_timeout(id),
            None,
            "on_timeout: second timeout for the same attempt must be a no-op"
        );
        assert_eq!(
            detector.on_load(id, Inspection::CrossOrigin),
            None,
            "on_load: late success after timeout must not change the outcome"
        );
        assert_eq!(
            detector.state(),
            FrameState::Failed(FailureReason::Timeout)
        );
    }

    #[test]
    fn cross_origin_inspection_counts_as_loaded() {
        let (mut detector, id) = loading(8080);
        assert_eq!(
            detector.on_load(id, Inspection::CrossOrigin),
            Some(FrameState::Loaded)
        );
    }

    #[test]
    fn readable_document_with_normal_title_is_loaded() {
        let (mut detector, id) = loading(8080);
        let state = detector.on_load(
            id,
            Inspection::Document {
                title: "Feedback board".to_string(),
            },
        );
        assert_eq!(state, Some(FrameState::Loaded));
    }

    #[test]
    fn error_page_title_commits_error() {
        for title in ["无法访问此网站", "127.0.0.1 - 错误", "This site can’t be reached"] {
            let (mut detector, id) = loading(8080);
            let state = detector.on_load(
                id,
                Inspection::Document {
                    title: title.to_string(),
                },
            );
            assert_eq!(
                state,
                Some(FrameState::Failed(FailureReason::ErrorPage)),
                "on_load: title {:?} should be detected as an error page",
                title
            );
        }
    }

    #[test]
    fn network_error_commits_error() {
        let (mut detector, id) = loading(8080);
        assert_eq!(
            detector.on_error(id),
            Some(FrameState::Failed(FailureReason::Network))
        );
        assert_eq!(detector.on_timeout(id), None);
    }

    #[test]
    fn retry_after_error_clears_failure_with_fresh_attempt() {
        let (mut detector, first) = loading(8080);
        detector.on_error(first);

        let second = detector.retry().unwrap();

        assert_ne!(first, second);
        assert_eq!(detector.state(), FrameState::Loading);
        assert_eq!(
            detector.on_timeout(first),
            None,
            "retry: the previous attempt's timer must not affect the new one"
        );
        assert_eq!(detector.on_load(second, Inspection::CrossOrigin), Some(FrameState::Loaded));
    }

    #[test]
    fn retry_without_port_does_nothing() {
        let mut detector = LivenessDetector::default();
        assert_eq!(detector.retry(), None);
        assert_eq!(detector.state(), FrameState::Idle);
    }

    #[test]
    fn switching_port_invalidates_pending_attempt() {
        let (mut detector, old) = loading(8080);
        let new = detector.set_port(Some(9090)).unwrap();

        assert_eq!(detector.on_timeout(old), None);
        assert_eq!(detector.state(), FrameState::Loading);
        assert_eq!(
            detector.on_timeout(new),
            Some(FrameState::Failed(FailureReason::Timeout))
        );
    }

    #[test]
    fn clearing_port_returns_to_idle_and_drops_pending_signals() {
        let (mut detector, id) = loading(8080);
        assert_eq!(detector.set_port(None), None);

        assert_eq!(detector.state(), FrameState::Idle);
        assert_eq!(detector.on_load(id, Inspection::CrossOrigin), None);
        assert_eq!(detector.state(), FrameState::Idle);
    }

    #[test]
    fn escape_url_targets_the_feedback_port() {
        let (detector, _) = loading(4567);
        assert_eq!(
            detector.escape_url().as_deref(),
            Some("http://127.0.0.1:4567")
        );
    }

    #[test]
    fn custom_markers_replace_defaults() {
        let detector = LivenessDetector::new(vec!["Bad Gateway".to_string()]);
        assert!(detector.is_error_title("502 Bad Gateway"));
        assert!(!detector.is_error_title("无法访问"));
    }
}
