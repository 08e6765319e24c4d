use std::sync::{Arc, Mutex, MutexGuard};

use crate::container::{Capability, TypeKey};
use crate::errors::CoreError;

/// Dispatch state of a [`TaskUpdater`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdaterState {
    /// Nothing staged, not dispatching
    Idle,
    /// Adds or removes are waiting for the next frame start
    Staging,
    /// `update_all` is running tasks
    Dispatching,
}

struct TaskEntry<T: ?Sized> {
    task: Arc<T>,
    type_key: TypeKey,
    priority: i32,
    sequence: u64,
}

enum StagedOp<T: ?Sized> {
    Add(TaskEntry<T>),
    Remove(Arc<T>),
}

struct UpdaterInner<T: ?Sized> {
    active: Vec<TaskEntry<T>>,
    staged: Vec<StagedOp<T>>,
    state: UpdaterState,
    next_sequence: u64,
}

/// Priority-ordered task list for one update phase.
///
/// Adds and removes are staged and applied by [`TaskUpdater::on_frame_start`],
/// so a dispatch pass never observes a structural change. Active tasks are
/// ordered by ascending priority, ties by the order they were added.
pub struct TaskUpdater<T: ?Sized + Send + Sync + 'static> {
    capability: Capability,
    dispatch: fn(&T),
    inner: Mutex<UpdaterInner<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> TaskUpdater<T> {
    pub fn new(capability: Capability, dispatch: fn(&T)) -> Self {
        Self {
            capability,
            dispatch,
            inner: Mutex::new(UpdaterInner {
                active: Vec::new(),
                staged: Vec::new(),
                state: UpdaterState::Idle,
                next_sequence: 0,
            }),
        }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Stage a task; it becomes active at the next frame start
    pub fn add_task(&self, task: Arc<T>, type_key: TypeKey, priority: i32) -> Result<(), CoreError> {
        let mut inner = self.lock()?;
        if is_member(&inner, &task) {
            return Err(CoreError::configuration(format!(
                "Task '{}' is already registered with the {} scheduler",
                type_key, self.capability
            )));
        }

        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.staged.push(StagedOp::Add(TaskEntry {
            task,
            type_key,
            priority,
            sequence,
        }));
        if inner.state == UpdaterState::Idle {
            inner.state = UpdaterState::Staging;
        }

        tracing::trace!(task = type_key.short_name(), priority, phase = self.capability.method_name(), "Task staged for addition");
        Ok(())
    }

    /// Stage removal of a task. Returns `false` when the task is unknown.
    pub fn remove_task(&self, task: &Arc<T>) -> Result<bool, CoreError> {
        let mut inner = self.lock()?;
        if !is_member(&inner, task) {
            tracing::warn!(phase = self.capability.method_name(), "Attempted to remove a task that is not registered");
            return Ok(false);
        }

        inner.staged.push(StagedOp::Remove(task.clone()));
        if inner.state == UpdaterState::Idle {
            inner.state = UpdaterState::Staging;
        }
        Ok(true)
    }

    /// Apply staged changes and re-sort the active list
    pub fn on_frame_start(&self) -> Result<(), CoreError> {
        let mut inner = self.lock()?;
        if inner.state == UpdaterState::Dispatching {
            return Err(CoreError::configuration(format!(
                "Cannot start a new {} frame while tasks are being dispatched",
                self.capability
            )));
        }

        let staged = std::mem::take(&mut inner.staged);
        for op in staged {
            match op {
                StagedOp::Add(entry) => inner.active.push(entry),
                StagedOp::Remove(task) => inner.active.retain(|entry| !same_task(&entry.task, &task)),
            }
        }
        inner.active.sort_by_key(|entry| (entry.priority, entry.sequence));
        inner.state = UpdaterState::Idle;
        Ok(())
    }

    /// Run every active task once, in priority order
    pub fn update_all(&self) -> Result<(), CoreError> {
        let snapshot: Vec<(Arc<T>, TypeKey)> = {
            let mut inner = self.lock()?;
            if inner.state == UpdaterState::Dispatching {
                return Err(CoreError::configuration(format!(
                    "Re-entrant {} dispatch is not allowed",
                    self.capability
                )));
            }
            inner.state = UpdaterState::Dispatching;
            inner
                .active
                .iter()
                .map(|entry| (entry.task.clone(), entry.type_key))
                .collect()
        };

        let phase = self.capability.method_name();
        for (task, type_key) in snapshot {
            let span = tracing::trace_span!("tick", task = type_key.short_name(), phase);
            let _entered = span.enter();
            (self.dispatch)(&task);
        }

        let mut inner = self.lock()?;
        inner.state = if inner.staged.is_empty() {
            UpdaterState::Idle
        } else {
            UpdaterState::Staging
        };
        Ok(())
    }

    pub fn state(&self) -> UpdaterState {
        self.lock().map(|inner| inner.state).unwrap_or(UpdaterState::Idle)
    }

    /// Number of active tasks
    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.active.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concrete types of the active tasks in dispatch order
    pub fn task_order(&self) -> Vec<TypeKey> {
        self.lock()
            .map(|inner| inner.active.iter().map(|entry| entry.type_key).collect())
            .unwrap_or_default()
    }

    /// Concrete types that are active or staged for addition
    pub fn registered_types(&self) -> Vec<TypeKey> {
        self.lock()
            .map(|inner| {
                let mut types: Vec<TypeKey> = inner.active.iter().map(|entry| entry.type_key).collect();
                for op in &inner.staged {
                    if let StagedOp::Add(entry) = op {
                        types.push(entry.type_key);
                    }
                }
                types
            })
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, UpdaterInner<T>>, CoreError> {
        self.inner.lock().map_err(|_| CoreError::lock("task_updater"))
    }
}

fn same_task<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Whether `task` will be active after the staged operations are applied
fn is_member<T: ?Sized>(inner: &UpdaterInner<T>, task: &Arc<T>) -> bool {
    let mut member = inner.active.iter().any(|entry| same_task(&entry.task, task));
    for op in &inner.staged {
        match op {
            StagedOp::Add(entry) if same_task(&entry.task, task) => member = true,
            StagedOp::Remove(removed) if same_task(removed, task) => member = false,
            _ => {}
        }
    }
    member
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    trait Step: Send + Sync {
        fn run(&self);
    }

    struct Recorder {
        label: &'static str,
        log: Arc<StdMutex<Vec<&'static str>>>,
    }

    impl Step for Recorder {
        fn run(&self) {
            self.log.lock().unwrap().push(self.label);
        }
    }

    fn updater() -> TaskUpdater<dyn Step> {
        TaskUpdater::<dyn Step>::new(Capability::Tick, |step| step.run())
    }

    fn recorder(label: &'static str, log: &Arc<StdMutex<Vec<&'static str>>>) -> Arc<dyn Step> {
        Arc::new(Recorder {
            label,
            log: log.clone(),
        })
    }

    #[test]
    fn test_dispatch_orders_by_priority_then_insertion() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let updater = updater();
        let key = TypeKey::of::<Recorder>();

        updater.add_task(recorder("five", &log), key, 5).unwrap();
        updater.add_task(recorder("minus_three_a", &log), key, -3).unwrap();
        updater.add_task(recorder("zero", &log), key, 0).unwrap();
        updater.add_task(recorder("minus_three_b", &log), key, -3).unwrap();
        assert_eq!(updater.state(), UpdaterState::Staging);

        updater.on_frame_start().unwrap();
        updater.update_all().unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["minus_three_a", "minus_three_b", "zero", "five"]
        );
        assert_eq!(updater.state(), UpdaterState::Idle);
    }

    #[test]
    fn test_staged_tasks_do_not_run_before_frame_start() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let updater = updater();
        updater.add_task(recorder("late", &log), TypeKey::of::<Recorder>(), 0).unwrap();

        updater.update_all().unwrap();
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(updater.state(), UpdaterState::Staging);
        assert_eq!(updater.registered_types().len(), 1);
        assert!(updater.is_empty());
    }

    #[test]
    fn test_removal_applies_at_next_frame_start() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let updater = updater();
        let task = recorder("task", &log);
        updater.add_task(task.clone(), TypeKey::of::<Recorder>(), 0).unwrap();
        updater.on_frame_start().unwrap();

        assert!(updater.remove_task(&task).unwrap());
        updater.update_all().unwrap();
        assert_eq!(log.lock().unwrap().len(), 1);

        updater.on_frame_start().unwrap();
        updater.update_all().unwrap();
        assert_eq!(log.lock().unwrap().len(), 1);
        assert!(updater.is_empty());
    }

    #[test]
    fn test_duplicate_add_is_rejected() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let updater = updater();
        let task = recorder("task", &log);
        updater.add_task(task.clone(), TypeKey::of::<Recorder>(), 0).unwrap();

        let error = updater.add_task(task.clone(), TypeKey::of::<Recorder>(), 1).unwrap_err();
        assert!(error.is_configuration());

        // Re-adding after a staged removal is allowed
        updater.remove_task(&task).unwrap();
        updater.add_task(task, TypeKey::of::<Recorder>(), 2).unwrap();
        updater.on_frame_start().unwrap();
        assert_eq!(updater.len(), 1);
    }

    #[test]
    fn test_removing_unknown_task_is_a_no_op() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let updater = updater();
        assert!(!updater.remove_task(&recorder("ghost", &log)).unwrap());
        assert_eq!(updater.state(), UpdaterState::Idle);
    }
}
