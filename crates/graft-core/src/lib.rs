pub mod config;
pub mod error;
pub mod target;

pub use config::{ConfigHandle, GraftConfig, TargetConfig};
pub use error::{GraftError, GraftResult};
pub use target::render_target_url;
