use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::validation::{parse_flag, ConfigValidator, LogLevelValidator, TypeNameValidator};
use crate::config::ConfigError;
use crate::container::Capability;

/// Priority overrides keyed by type name, one table per scheduler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    pub tick: BTreeMap<String, i32>,
    pub fixed: BTreeMap<String, i32>,
    pub late: BTreeMap<String, i32>,
    pub initialize: BTreeMap<String, i32>,
    pub dispose: BTreeMap<String, i32>,
}

impl PriorityConfig {
    /// Overrides for the scheduler serving `capability`
    pub fn for_capability(&self, capability: Capability) -> &BTreeMap<String, i32> {
        match capability {
            Capability::Tick => &self.tick,
            Capability::FixedTick => &self.fixed,
            Capability::LateTick => &self.late,
            Capability::Initialize => &self.initialize,
            Capability::Dispose => &self.dispose,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tick.is_empty()
            && self.fixed.is_empty()
            && self.late.is_empty()
            && self.initialize.is_empty()
            && self.dispose.is_empty()
    }
}

/// Runtime settings for a composition root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Nullable lookups of unbound contracts yield nothing instead of failing
    pub allow_null_bindings: bool,
    /// Raise an advisory for tick-capable types that never became tasks
    pub warn_for_missing_tickables: bool,
    pub log_level: String,
    pub priorities: PriorityConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            allow_null_bindings: false,
            warn_for_missing_tickables: false,
            log_level: "info".to_string(),
            priorities: PriorityConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub const ENV_ALLOW_NULL_BINDINGS: &'static str = "TICKWIRE_ALLOW_NULL_BINDINGS";
    pub const ENV_WARN_FOR_MISSING_TICKABLES: &'static str = "TICKWIRE_WARN_FOR_MISSING_TICKABLES";
    pub const ENV_LOG_LEVEL: &'static str = "TICKWIRE_LOG_LEVEL";

    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration suited for tests: strict lookups and missing-tickable warnings
    pub fn testing() -> Self {
        Self {
            warn_for_missing_tickables: true,
            log_level: "debug".to_string(),
            ..Self::default()
        }
    }

    pub fn with_allow_null_bindings(mut self, allow: bool) -> Self {
        self.allow_null_bindings = allow;
        self
    }

    pub fn with_warn_for_missing_tickables(mut self, warn: bool) -> Self {
        self.warn_for_missing_tickables = warn;
        self
    }

    /// Add a priority override by type name
    pub fn with_priority(mut self, capability: Capability, type_name: impl Into<String>, priority: i32) -> Self {
        let table = match capability {
            Capability::Tick => &mut self.priorities.tick,
            Capability::FixedTick => &mut self.priorities.fixed,
            Capability::LateTick => &mut self.priorities.late,
            Capability::Initialize => &mut self.priorities.initialize,
            Capability::Dispose => &mut self.priorities.dispose,
        };
        table.insert(type_name.into(), priority);
        self
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.yaml`, `.yml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        let config = match path.extension().and_then(|extension| extension.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&source)?,
            Some("json") => Self::from_json_str(&source)?,
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    path: path.display().to_string(),
                })
            }
        };
        tracing::debug!(path = %path.display(), "Runtime configuration loaded");
        Ok(config)
    }

    /// Defaults overridden by `TICKWIRE_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new();
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from `TICKWIRE_*` environment variables
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env(Self::ENV_ALLOW_NULL_BINDINGS)? {
            self.allow_null_bindings = parse_flag("allow_null_bindings", &value)?;
        }
        if let Some(value) = read_env(Self::ENV_WARN_FOR_MISSING_TICKABLES)? {
            self.warn_for_missing_tickables = parse_flag("warn_for_missing_tickables", &value)?;
        }
        if let Some(value) = read_env(Self::ENV_LOG_LEVEL)? {
            self.log_level = value;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        LogLevelValidator.validate(self.log_level.as_str())?;

        let tables = [
            &self.priorities.tick,
            &self.priorities.fixed,
            &self.priorities.late,
            &self.priorities.initialize,
            &self.priorities.dispose,
        ];
        for table in tables {
            for name in table.keys() {
                TypeNameValidator.validate(name.as_str())?;
            }
        }
        Ok(())
    }
}

fn read_env(name: &str) -> Result<Option<String>, ConfigError> {
    match env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::environment_error(format!(
            "{} is not valid unicode",
            name
        ))),
    }
}
