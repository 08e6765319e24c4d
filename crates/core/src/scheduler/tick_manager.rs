use std::collections::HashSet;
use std::sync::Arc;

use crate::config::RuntimeConfig;
use crate::container::{Capability, Container, Injectable, Resolver, TypeKey};
use crate::errors::{Advisory, CoreError};
use crate::foundation::{FixedTickable, LateTickable, Tickable};
use crate::scheduler::priority::PriorityTable;
use crate::scheduler::updater::TaskUpdater;

/// Owns the per-frame, fixed-step and late per-frame schedulers.
///
/// Built by the container: every bound `dyn Tickable`, `dyn FixedTickable`
/// and `dyn LateTickable` becomes a task with the priority found in the
/// matching priority table. Tasks can also be added and removed at runtime.
pub struct TickManager {
    updater: TaskUpdater<dyn Tickable>,
    fixed_updater: TaskUpdater<dyn FixedTickable>,
    late_updater: TaskUpdater<dyn LateTickable>,
}

impl TickManager {
    pub fn new() -> Self {
        Self {
            updater: TaskUpdater::<dyn Tickable>::new(Capability::Tick, |task| task.tick()),
            fixed_updater: TaskUpdater::<dyn FixedTickable>::new(Capability::FixedTick, |task| {
                task.fixed_tick()
            }),
            late_updater: TaskUpdater::<dyn LateTickable>::new(Capability::LateTick, |task| {
                task.late_tick()
            }),
        }
    }

    pub fn add<T: Tickable + 'static>(&self, tickable: Arc<T>, priority: i32) -> Result<(), CoreError> {
        self.updater.add_task(tickable, TypeKey::of::<T>(), priority)
    }

    pub fn add_fixed<T: FixedTickable + 'static>(&self, tickable: Arc<T>, priority: i32) -> Result<(), CoreError> {
        self.fixed_updater.add_task(tickable, TypeKey::of::<T>(), priority)
    }

    pub fn add_late<T: LateTickable + 'static>(&self, tickable: Arc<T>, priority: i32) -> Result<(), CoreError> {
        self.late_updater.add_task(tickable, TypeKey::of::<T>(), priority)
    }

    pub fn remove<T: Tickable + 'static>(&self, tickable: &Arc<T>) -> Result<bool, CoreError> {
        let task: Arc<dyn Tickable> = tickable.clone();
        self.updater.remove_task(&task)
    }

    pub fn remove_fixed<T: FixedTickable + 'static>(&self, tickable: &Arc<T>) -> Result<bool, CoreError> {
        let task: Arc<dyn FixedTickable> = tickable.clone();
        self.fixed_updater.remove_task(&task)
    }

    pub fn remove_late<T: LateTickable + 'static>(&self, tickable: &Arc<T>) -> Result<bool, CoreError> {
        let task: Arc<dyn LateTickable> = tickable.clone();
        self.late_updater.remove_task(&task)
    }

    pub fn update(&self) -> Result<(), CoreError> {
        self.updater.on_frame_start()?;
        self.updater.update_all()
    }

    pub fn fixed_update(&self) -> Result<(), CoreError> {
        self.fixed_updater.on_frame_start()?;
        self.fixed_updater.update_all()
    }

    pub fn late_update(&self) -> Result<(), CoreError> {
        self.late_updater.on_frame_start()?;
        self.late_updater.update_all()
    }

    /// Active tasks of one phase. Initialization capabilities have none.
    pub fn task_count(&self, capability: Capability) -> usize {
        match capability {
            Capability::Tick => self.updater.len(),
            Capability::FixedTick => self.fixed_updater.len(),
            Capability::LateTick => self.late_updater.len(),
            Capability::Initialize | Capability::Dispose => 0,
        }
    }

    /// Concrete task types of one phase in dispatch order
    pub fn task_order(&self, capability: Capability) -> Vec<TypeKey> {
        match capability {
            Capability::Tick => self.updater.task_order(),
            Capability::FixedTick => self.fixed_updater.task_order(),
            Capability::LateTick => self.late_updater.task_order(),
            Capability::Initialize | Capability::Dispose => Vec::new(),
        }
    }

    fn registered_types(&self, capability: Capability) -> Vec<TypeKey> {
        match capability {
            Capability::Tick => self.updater.registered_types(),
            Capability::FixedTick => self.fixed_updater.registered_types(),
            Capability::LateTick => self.late_updater.registered_types(),
            Capability::Initialize | Capability::Dispose => Vec::new(),
        }
    }

    /// Raise an advisory for every type declared with a tick capability in
    /// `container` that never became a task of that phase
    pub fn warn_for_missing(&self, container: &Container) {
        for capability in [Capability::Tick, Capability::FixedTick, Capability::LateTick] {
            let registered: HashSet<TypeKey> = self.registered_types(capability).into_iter().collect();
            for descriptor in container.type_registry().with_capability(capability) {
                if !registered.contains(&descriptor.key) {
                    container.advise(Advisory::UnboundTickable {
                        type_name: descriptor.key.short_name().to_string(),
                    });
                }
            }
        }
    }
}

impl Default for TickManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Injectable for TickManager {
    fn create(resolver: &mut Resolver<'_>) -> Result<Self, CoreError> {
        let config = resolver.try_resolve::<RuntimeConfig>()?;
        let manager = TickManager::new();

        populate(resolver, &manager.updater, config.as_deref())?;
        populate(resolver, &manager.fixed_updater, config.as_deref())?;
        populate(resolver, &manager.late_updater, config.as_deref())?;

        tracing::debug!(
            tick = manager.registered_types(Capability::Tick).len(),
            fixed = manager.registered_types(Capability::FixedTick).len(),
            late = manager.registered_types(Capability::LateTick).len(),
            "Tick manager created"
        );

        if config.as_deref().is_some_and(|config| config.warn_for_missing_tickables) {
            manager.warn_for_missing(resolver.container());
        }
        Ok(manager)
    }
}

fn populate<T: ?Sized + Send + Sync + 'static>(
    resolver: &mut Resolver<'_>,
    updater: &TaskUpdater<T>,
    config: Option<&RuntimeConfig>,
) -> Result<(), CoreError> {
    let capability = updater.capability();
    let container = resolver.container();
    let table = PriorityTable::gather(resolver, capability, config)?;
    table.validate(container)?;

    for task in resolver.try_resolve_all_typed::<T>(None)? {
        if task.instance_type == TypeKey::of::<T>() {
            tracing::warn!(
                phase = capability.method_name(),
                "Task bound without a concrete type; type priorities will not apply to it"
            );
        }
        let priority = table.priority_for(task.instance_type, container.describe(&task.instance_type))?;
        updater.add_task(task.instance, task.instance_type, priority)?;
    }
    Ok(())
}
