pub mod runtime_config;
pub mod validation;

pub use runtime_config::{PriorityConfig, RuntimeConfig};
pub use validation::{ConfigError, ConfigValidator, LogLevelValidator, TypeNameValidator};
