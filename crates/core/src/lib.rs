pub mod composition;
pub mod config;
pub mod container;
pub mod errors;
pub mod foundation;
pub mod lifecycle;
pub mod logging;
pub mod scheduler;

// Re-export key types for convenience
pub use composition::{CompositionContext, CompositionDecorator, CompositionRoot, CompositionRootInfo, Installer};
pub use config::{ConfigError, PriorityConfig, RuntimeConfig};
pub use container::{Capability, Container, ContractKey, Injectable, Resolver, TypeKey};
pub use errors::{Advisory, CoreError};
pub use foundation::{
    Disposable, FixedTickable, Initializable, InjectionTarget, LateTickable, LifecycleState, Tickable,
};
pub use lifecycle::{DependencyRoot, DisposableManager, InitializableManager, RootScope, StandardDependencyRoot};
pub use scheduler::{PriorityOverride, TaskUpdater, TickManager};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get framework version
pub fn version() -> &'static str {
    VERSION
}
