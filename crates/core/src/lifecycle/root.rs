use std::sync::Arc;

use crate::container::{ContractKey, Injectable, Resolver};
use crate::errors::CoreError;
use crate::lifecycle::{DisposableManager, InitializableManager};
use crate::scheduler::TickManager;

/// Entry object of a composed scope; the host drives it through a
/// [`RootScope`](crate::lifecycle::RootScope)
pub trait DependencyRoot: Send + Sync {
    fn initialize(&self) -> Result<(), CoreError>;

    fn dispose(&self) -> Result<(), CoreError>;

    fn update(&self) -> Result<(), CoreError>;

    fn fixed_update(&self) -> Result<(), CoreError>;

    fn late_update(&self) -> Result<(), CoreError>;
}

/// Dependency root wiring the tick manager and the lifecycle managers
pub struct StandardDependencyRoot {
    tick_manager: Arc<TickManager>,
    initializables: Arc<InitializableManager>,
    disposables: Arc<DisposableManager>,
}

impl StandardDependencyRoot {
    pub fn tick_manager(&self) -> &Arc<TickManager> {
        &self.tick_manager
    }
}

impl Injectable for StandardDependencyRoot {
    fn create(resolver: &mut Resolver<'_>) -> Result<Self, CoreError> {
        Ok(Self {
            tick_manager: resolver.resolve::<TickManager>()?,
            initializables: resolver.resolve::<InitializableManager>()?,
            disposables: resolver.resolve::<DisposableManager>()?,
        })
    }

    fn dependencies() -> Vec<ContractKey> {
        vec![
            ContractKey::of::<TickManager>(),
            ContractKey::of::<InitializableManager>(),
            ContractKey::of::<DisposableManager>(),
        ]
    }
}

impl DependencyRoot for StandardDependencyRoot {
    fn initialize(&self) -> Result<(), CoreError> {
        self.initializables.initialize()
    }

    fn dispose(&self) -> Result<(), CoreError> {
        let failures = self.disposables.dispose();
        if failures > 0 {
            tracing::warn!(failures, "Some components failed to dispose");
        }
        Ok(())
    }

    fn update(&self) -> Result<(), CoreError> {
        self.tick_manager.update()
    }

    fn fixed_update(&self) -> Result<(), CoreError> {
        self.tick_manager.fixed_update()
    }

    fn late_update(&self) -> Result<(), CoreError> {
        self.tick_manager.late_update()
    }
}
