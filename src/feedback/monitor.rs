use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::detector::{AttemptId, FrameState, Inspection, LivenessDetector};
use super::loader::{FrameLoader, HttpFrameLoader, LoadError};
use crate::config::FeedbackConfig;

#[derive(Debug)]
enum FrameEvent {
    Loaded(AttemptId, Inspection),
    Failed(AttemptId),
    TimedOut(AttemptId),
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub load_timeout: Duration,
    pub inspect_delay: Duration,
    /// Origin of the page embedding the frame; `None` reads the frame
    /// directly.
    pub embedder_origin: Option<String>,
    pub error_markers: Vec<String>,
}

impl MonitorSettings {
    pub fn from_config(config: &FeedbackConfig) -> Self {
        Self {
            load_timeout: config.load_timeout(),
            inspect_delay: config.inspect_delay(),
            embedder_origin: None,
            error_markers: config.error_markers.clone(),
        }
    }

    #[cfg(test)]
    pub fn with_embedder_origin(mut self, origin: impl Into<String>) -> Self {
        self.embedder_origin = Some(origin.into());
        self
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self::from_config(&FeedbackConfig::default())
    }
}

/// Drives a [`LivenessDetector`] with real loads and a load timeout.
///
/// The monitor is the only owner of the timeout task: every new attempt
/// aborts the previous timer before arming its own, and a committed outcome
/// aborts whatever is still pending.
pub struct FeedbackMonitor<L: FrameLoader = HttpFrameLoader> {
    detector: LivenessDetector,
    loader: Arc<L>,
    settings: MonitorSettings,
    tx: mpsc::UnboundedSender<FrameEvent>,
    rx: mpsc::UnboundedReceiver<FrameEvent>,
    timer: Option<JoinHandle<()>>,
    load_task: Option<JoinHandle<()>>,
}

impl FeedbackMonitor {
    pub fn new(settings: MonitorSettings) -> Result<Self, LoadError> {
        Ok(Self::with_loader(HttpFrameLoader::new()?, settings))
    }
}

impl<L: FrameLoader> FeedbackMonitor<L> {
    pub fn with_loader(loader: L, settings: MonitorSettings) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            detector: LivenessDetector::new(settings.error_markers.clone()),
            loader: Arc::new(loader),
            settings,
            tx,
            rx,
            timer: None,
            load_task: None,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> FrameState {
        self.detector.state()
    }

    pub fn detector(&self) -> &LivenessDetector {
        &self.detector
    }

    pub fn select_port(&mut self, port: Option<u16>) -> Option<AttemptId> {
        match self.detector.set_port(port) {
            Some(id) => {
                self.start(id);
                Some(id)
            }
            None => {
                if port.is_none() {
                    self.cancel_pending();
                }
                None
            }
        }
    }

    pub fn retry(&mut self) -> Option<AttemptId> {
        let id = self.detector.retry()?;
        info!("Retrying feedback load (attempt {:?})", id);
        self.start(id);
        Some(id)
    }

    /// Wait for the current attempt to commit an outcome.
    ///
    /// Returns `None` immediately when nothing is loading.
    pub async fn next_transition(&mut self) -> Option<FrameState> {
        while self.detector.state().is_loading() {
            let event = self.rx.recv().await?;
            let committed = match event {
                FrameEvent::Loaded(id, inspection) => self.detector.on_load(id, inspection),
                FrameEvent::Failed(id) => self.detector.on_error(id),
                FrameEvent::TimedOut(id) => self.detector.on_timeout(id),
            };

            if let Some(state) = committed {
                debug!("Feedback attempt committed {:?}", state);
                self.cancel_pending();
                return Some(state);
            }
        }
        None
    }

    pub async fn wait_for_outcome(&mut self) -> FrameState {
        while self.next_transition().await.is_some() {}
        self.detector.state()
    }

    fn start(&mut self, id: AttemptId) {
        self.cancel_pending();

        let Some(port) = self.detector.port() else {
            return;
        };

        let tx = self.tx.clone();
        let timeout = self.settings.load_timeout;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = tx.send(FrameEvent::TimedOut(id));
        }));

        let tx = self.tx.clone();
        let loader = Arc::clone(&self.loader);
        let delay = self.settings.inspect_delay;
        let embedder = self.settings.embedder_origin.clone();
        self.load_task = Some(tokio::spawn(async move {
            match loader.load(port).await {
                Ok(frame) => {
                    // Give an error page time to settle before reading it.
                    tokio::time::sleep(delay).await;
                    let inspection = frame.inspect(embedder.as_deref());
                    let _ = tx.send(FrameEvent::Loaded(id, inspection));
                }
                Err(e) => {
                    debug!("Feedback load on port {} failed: {}", port, e);
                    let _ = tx.send(FrameEvent::Failed(id));
                }
            }
        }));
    }

    fn cancel_pending(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        if let Some(task) = self.load_task.take() {
            task.abort();
        }
    }
}

impl<L: FrameLoader> Drop for FeedbackMonitor<L> {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::detector::FailureReason;
    use crate::feedback::loader::LoadedFrame;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    #[derive(Clone)]
    enum Step {
        Hang,
        Refuse,
        Answer(Option<&'static str>),
        SlowAnswer(Duration),
    }

    struct ScriptedLoader {
        steps: Vec<Step>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedLoader {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    fn frame(port: u16, title: Option<&str>) -> LoadedFrame {
        LoadedFrame {
            origin: format!("http://127.0.0.1:{}", port),
            status: 200,
            title: title.map(str::to_string),
        }
    }

    #[async_trait]
    impl FrameLoader for ScriptedLoader {
        async fn load(&self, port: u16) -> Result<LoadedFrame, LoadError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self.steps[n.min(self.steps.len() - 1)].clone();
            match step {
                Step::Hang => std::future::pending().await,
                Step::Refuse => Err(LoadError::Connect {
                    url: format!("http://127.0.0.1:{}", port),
                }),
                Step::Answer(title) => Ok(frame(port, title)),
                Step::SlowAnswer(after) => {
                    tokio::time::sleep(after).await;
                    Ok(frame(port, None))
                }
            }
        }
    }

    fn embedded_settings() -> MonitorSettings {
        MonitorSettings::default().with_embedder_origin("http://localhost:3000")
    }

    #[tokio::test(start_paused = true)]
    async fn unresponsive_page_times_out() {
        let mut monitor = FeedbackMonitor::with_loader(
            ScriptedLoader::new(vec![Step::Hang]),
            embedded_settings(),
        );
        let started = Instant::now();

        monitor.select_port(Some(8080)).unwrap();
        let state = monitor.wait_for_outcome().await;

        assert_eq!(state, FrameState::Failed(FailureReason::Timeout));
        assert!(started.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn cross_origin_answer_loads_after_inspect_delay() {
        let mut monitor = FeedbackMonitor::with_loader(
            ScriptedLoader::new(vec![Step::Answer(Some("无法访问"))]),
            embedded_settings(),
        );
        let started = Instant::now();

        monitor.select_port(Some(8080));
        let state = monitor.wait_for_outcome().await;

        assert_eq!(
            state,
            FrameState::Loaded,
            "cross-origin frames cannot be read, so an answer counts as loaded"
        );
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn readable_error_page_fails() {
        let mut monitor = FeedbackMonitor::with_loader(
            ScriptedLoader::new(vec![Step::Answer(Some("This site can't be reached"))]),
            MonitorSettings::default(),
        );

        monitor.select_port(Some(8080));
        assert_eq!(
            monitor.wait_for_outcome().await,
            FrameState::Failed(FailureReason::ErrorPage)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn refused_connection_fails_with_network_error() {
        let mut monitor = FeedbackMonitor::with_loader(
            ScriptedLoader::new(vec![Step::Refuse]),
            MonitorSettings::default(),
        );

        monitor.select_port(Some(8080));
        assert_eq!(
            monitor.wait_for_outcome().await,
            FrameState::Failed(FailureReason::Network)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn late_answer_after_timeout_is_ignored() {
        let mut monitor = FeedbackMonitor::with_loader(
            ScriptedLoader::new(vec![Step::SlowAnswer(Duration::from_secs(15))]),
            embedded_settings(),
        );

        let id = monitor.select_port(Some(8080)).unwrap();
        assert_eq!(
            monitor.wait_for_outcome().await,
            FrameState::Failed(FailureReason::Timeout)
        );

        monitor
            .tx
            .send(FrameEvent::Loaded(id, Inspection::CrossOrigin))
            .unwrap();
        tokio::time::sleep(Duration::from_secs(20)).await;

        assert_eq!(monitor.next_transition().await, None);
        assert_eq!(
            monitor.state(),
            FrameState::Failed(FailureReason::Timeout),
            "a committed timeout must survive a late load"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn switching_port_cancels_previous_timer() {
        let mut monitor = FeedbackMonitor::with_loader(
            ScriptedLoader::new(vec![Step::Hang]),
            embedded_settings(),
        );

        monitor.select_port(Some(8080)).unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        let switched_at = Instant::now();
        monitor.select_port(Some(9090)).unwrap();
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert!(
            monitor.rx.try_recv().is_err(),
            "the first attempt's timer must not fire after the switch"
        );
        assert_eq!(monitor.state(), FrameState::Loading);

        assert_eq!(
            monitor.wait_for_outcome().await,
            FrameState::Failed(FailureReason::Timeout)
        );
        assert!(switched_at.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_failure_rearms_and_loads() {
        let loader = ScriptedLoader::new(vec![Step::Refuse, Step::Answer(None)]);
        let calls = Arc::clone(&loader.calls);
        let mut monitor = FeedbackMonitor::with_loader(loader, embedded_settings());

        let first = monitor.select_port(Some(8080)).unwrap();
        assert_eq!(
            monitor.wait_for_outcome().await,
            FrameState::Failed(FailureReason::Network)
        );

        let second = monitor.retry().unwrap();
        assert_ne!(first, second);
        assert_eq!(monitor.state(), FrameState::Loading);

        assert_eq!(monitor.wait_for_outcome().await, FrameState::Loaded);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_port_goes_idle() {
        let mut monitor = FeedbackMonitor::with_loader(
            ScriptedLoader::new(vec![Step::Hang]),
            embedded_settings(),
        );

        monitor.select_port(Some(8080));
        monitor.select_port(None);

        assert_eq!(monitor.state(), FrameState::Idle);
        assert_eq!(monitor.next_transition().await, None);
    }
}
