pub mod types;
pub mod constants;
pub mod config;
pub mod state;

pub use types::*;
pub use config::{DashboardConfig, SensorSpec, TargetSpec};
pub use state::SelectionState;
