mod env;
mod loader;

pub use env::EnvSummary;
pub use loader::{Config, FeedbackConfig};
