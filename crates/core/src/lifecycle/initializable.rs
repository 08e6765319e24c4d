use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::RuntimeConfig;
use crate::container::{Capability, Injectable, Resolver, TypeKey};
use crate::errors::CoreError;
use crate::foundation::Initializable;
use crate::scheduler::PriorityTable;

/// Bound instances of a lifecycle contract, sorted by priority then
/// registration order
pub(crate) fn prioritized<T: ?Sized + Send + Sync + 'static>(
    resolver: &mut Resolver<'_>,
    capability: Capability,
) -> Result<Vec<(Arc<T>, TypeKey)>, CoreError> {
    let config = resolver.try_resolve::<RuntimeConfig>()?;
    let container = resolver.container();
    let table = PriorityTable::gather(resolver, capability, config.as_deref())?;
    table.validate(container)?;

    let mut entries = Vec::new();
    for task in resolver.try_resolve_all_typed::<T>(None)? {
        let priority = table.priority_for(task.instance_type, container.describe(&task.instance_type))?;
        entries.push((priority, task.instance, task.instance_type));
    }
    entries.sort_by_key(|(priority, _, _)| *priority);

    Ok(entries
        .into_iter()
        .map(|(_, instance, instance_type)| (instance, instance_type))
        .collect())
}

/// Runs every bound `dyn Initializable` once, in priority order
pub struct InitializableManager {
    initializables: Vec<(Arc<dyn Initializable>, TypeKey)>,
    initialized: AtomicBool,
}

impl InitializableManager {
    pub fn new(initializables: Vec<(Arc<dyn Initializable>, TypeKey)>) -> Self {
        Self {
            initializables,
            initialized: AtomicBool::new(false),
        }
    }

    /// Initialize all components. Subsequent calls do nothing.
    ///
    /// Stops at the first failure, which is returned as a `Lifecycle` error
    /// naming the component.
    pub fn initialize(&self) -> Result<(), CoreError> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        for (initializable, type_key) in &self.initializables {
            tracing::debug!(component = type_key.short_name(), "Initializing");
            initializable
                .initialize()
                .map_err(|error| CoreError::lifecycle(type_key.short_name(), "initialize", error))?;
        }

        tracing::info!(count = self.initializables.len(), "Initializables completed");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.initializables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.initializables.is_empty()
    }

    /// Component types in initialization order
    pub fn order(&self) -> Vec<TypeKey> {
        self.initializables.iter().map(|(_, type_key)| *type_key).collect()
    }
}

impl Injectable for InitializableManager {
    fn create(resolver: &mut Resolver<'_>) -> Result<Self, CoreError> {
        Ok(Self::new(prioritized::<dyn Initializable>(
            resolver,
            Capability::Initialize,
        )?))
    }
}
