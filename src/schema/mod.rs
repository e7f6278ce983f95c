//! Schema module - Configuration and progress types for calibration runs.

mod config;
mod progress;

pub use config::*;
pub use progress::*;
