mod detector;
mod external;
mod loader;
mod monitor;
mod port;

pub use detector::{FrameState, DEFAULT_ERROR_MARKERS};
pub use external::open_in_browser;
pub use loader::FrameLoader;
pub use monitor::{FeedbackMonitor, MonitorSettings};
pub use port::{resolve, target_url, FeedbackPort, FeedbackPortError, FEEDBACK_PID_FILE};

#[cfg(test)]
pub use detector::FailureReason;
#[cfg(test)]
pub use loader::{LoadError, LoadedFrame};
#[cfg(test)]
pub use port::pid_file_path;
