pub mod config;
pub mod feedback;
pub mod launch;
pub mod stop;
pub mod version;
