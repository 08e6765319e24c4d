use thiserror::Error;

use crate::config::ConfigError;

/// Core error type for the tickwire runtime
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("No binding found for '{contract}'. Resolution path: {path}")]
    BindingNotFound { contract: String, path: String },

    #[error("Found {} bindings for '{contract}' while a single one was requested: [{}]. Resolution path: {path}", .candidates.len(), .candidates.join(", "))]
    AmbiguousBinding {
        contract: String,
        candidates: Vec<String>,
        path: String,
    },

    #[error("Circular dependency detected while resolving '{contract}': {path}")]
    CyclicResolution { contract: String, path: String },

    #[error("Method provider returned no value when looking up type '{contract}'. Object graph: {path}")]
    NullProduction { contract: String, path: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Cannot add binding for '{contract}': container {container} is sealed")]
    ContainerSealed { contract: String, container: String },

    #[error("Binding for '{contract}' produced an instance of '{actual}'")]
    TypeMismatch { contract: String, actual: String },

    #[error("Lock error on resource: {resource}")]
    LockError { resource: String },

    #[error("Lifecycle error in component '{component}' during '{operation}': {source}")]
    Lifecycle {
        component: String,
        operation: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CoreError {
    /// Create a new configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a lock error for the named resource
    pub fn lock(resource: impl Into<String>) -> Self {
        Self::LockError {
            resource: resource.into(),
        }
    }

    /// Wrap a failure raised by a lifecycle callback
    pub fn lifecycle(
        component: impl Into<String>,
        operation: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Lifecycle {
            component: component.into(),
            operation: operation.into(),
            source: source.into(),
        }
    }

    pub fn is_binding_not_found(&self) -> bool {
        matches!(self, Self::BindingNotFound { .. })
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::AmbiguousBinding { .. })
    }

    pub fn is_cyclic(&self) -> bool {
        matches!(self, Self::CyclicResolution { .. })
    }

    pub fn is_null_production(&self) -> bool {
        matches!(self, Self::NullProduction { .. })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Resolution path carried by the error, if any
    pub fn resolution_path(&self) -> Option<&str> {
        match self {
            Self::BindingNotFound { path, .. }
            | Self::AmbiguousBinding { path, .. }
            | Self::CyclicResolution { path, .. }
            | Self::NullProduction { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Non-fatal diagnostics raised while composing or initializing a scope.
///
/// Advisories are logged at `warn` level and kept on the container that
/// raised them so callers (and tests) can inspect them afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    /// An installer slot was empty
    NullInstaller { position: usize },
    /// No installer was supplied at all, only standard bindings were installed
    EmptyInstallerSet,
    /// A type declared tick-capable never became an active task
    UnboundTickable { type_name: String },
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Advisory::NullInstaller { position } => {
                write!(f, "Found null installer at position {} in composition root", position)
            }
            Advisory::EmptyInstallerSet => {
                write!(f, "No installers found while initializing composition root")
            }
            Advisory::UnboundTickable { type_name } => {
                write!(f, "Found unbound tickable with type '{}'", type_name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_binding_lists_candidates() {
        let error = CoreError::AmbiguousBinding {
            contract: "Foo".to_string(),
            candidates: vec!["FooA".to_string(), "FooB".to_string()],
            path: "Foo(default)".to_string(),
        };

        let message = error.to_string();
        assert!(message.contains("Found 2 bindings"));
        assert!(message.contains("FooA, FooB"));
        assert!(error.is_ambiguous());
        assert_eq!(error.resolution_path(), Some("Foo(default)"));
    }

    #[test]
    fn test_configuration_helper() {
        let error = CoreError::configuration("bad priority");
        assert!(error.is_configuration());
        assert!(error.resolution_path().is_none());
        assert_eq!(error.to_string(), "Configuration error: bad priority");
    }
}
