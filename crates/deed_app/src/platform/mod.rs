mod app;
mod config;
pub mod logging;
mod progress;

pub use app::{run_job, Job, Overrides};
