use std::sync::{Arc, Mutex};

use crate::container::Container;
use crate::errors::CoreError;
use crate::foundation::LifecycleState;
use crate::lifecycle::DependencyRoot;

/// A running composition: the sealed container and its dependency root.
///
/// The host calls `update`, `fixed_update` and `late_update` from its loop.
/// Disposal happens exactly once, either through [`RootScope::dispose`] or
/// when the scope is dropped.
pub struct RootScope {
    container: Arc<Container>,
    root: Arc<dyn DependencyRoot>,
    state: Mutex<LifecycleState>,
}

impl RootScope {
    pub(crate) fn new(container: Arc<Container>, root: Arc<dyn DependencyRoot>) -> Self {
        Self {
            container,
            root,
            state: Mutex::new(LifecycleState::Created),
        }
    }

    pub(crate) fn initialize(&self) -> Result<(), CoreError> {
        self.set_state(LifecycleState::Initializing)?;
        match self.root.initialize() {
            Ok(()) => {
                self.set_state(LifecycleState::Running)?;
                tracing::info!(container = %self.container.id(), "Scope running");
                Ok(())
            }
            Err(error) => {
                self.set_state(LifecycleState::Failed)?;
                Err(error)
            }
        }
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn root(&self) -> &Arc<dyn DependencyRoot> {
        &self.root
    }

    pub fn state(&self) -> LifecycleState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(LifecycleState::Failed)
    }

    pub fn update(&self) -> Result<(), CoreError> {
        self.ensure_running("update")?;
        self.root.update()
    }

    pub fn fixed_update(&self) -> Result<(), CoreError> {
        self.ensure_running("fixed_update")?;
        self.root.fixed_update()
    }

    pub fn late_update(&self) -> Result<(), CoreError> {
        self.ensure_running("late_update")?;
        self.root.late_update()
    }

    /// Tear the scope down. Later calls do nothing.
    pub fn dispose(&self) -> Result<(), CoreError> {
        {
            let mut state = self.state.lock().map_err(|_| CoreError::lock("root_scope"))?;
            if matches!(*state, LifecycleState::Disposing | LifecycleState::Disposed) {
                return Ok(());
            }
            *state = LifecycleState::Disposing;
        }

        let result = self.root.dispose();
        self.set_state(LifecycleState::Disposed)?;
        tracing::info!(container = %self.container.id(), "Scope disposed");
        result
    }

    fn ensure_running(&self, operation: &str) -> Result<(), CoreError> {
        let state = self.state();
        if state.accepts_updates() {
            return Ok(());
        }
        Err(CoreError::configuration(format!(
            "Cannot call {} on a scope that is {}",
            operation, state
        )))
    }

    fn set_state(&self, next: LifecycleState) -> Result<(), CoreError> {
        let mut state = self.state.lock().map_err(|_| CoreError::lock("root_scope"))?;
        *state = next;
        Ok(())
    }
}

impl Drop for RootScope {
    fn drop(&mut self) {
        if let Err(error) = self.dispose() {
            tracing::warn!(error = %error, "Failed to dispose scope on drop");
        }
    }
}

impl std::fmt::Debug for RootScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootScope")
            .field("container", &self.container.id())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingRoot {
        updates: AtomicUsize,
        disposals: AtomicUsize,
    }

    impl DependencyRoot for CountingRoot {
        fn initialize(&self) -> Result<(), CoreError> {
            Ok(())
        }

        fn dispose(&self) -> Result<(), CoreError> {
            self.disposals.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn update(&self) -> Result<(), CoreError> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn fixed_update(&self) -> Result<(), CoreError> {
            Ok(())
        }

        fn late_update(&self) -> Result<(), CoreError> {
            Ok(())
        }
    }

    #[test]
    fn test_updates_require_running_scope() {
        let root = Arc::new(CountingRoot::default());
        let scope = RootScope::new(Arc::new(Container::new()), root.clone());

        assert!(scope.update().is_err());
        scope.initialize().unwrap();
        scope.update().unwrap();
        assert_eq!(root.updates.load(Ordering::SeqCst), 1);
        assert_eq!(scope.state(), LifecycleState::Running);
    }

    #[test]
    fn test_dispose_runs_exactly_once() {
        let root = Arc::new(CountingRoot::default());
        {
            let scope = RootScope::new(Arc::new(Container::new()), root.clone());
            scope.initialize().unwrap();
            scope.dispose().unwrap();
            scope.dispose().unwrap();
            assert_eq!(scope.state(), LifecycleState::Disposed);
            assert!(scope.update().is_err());
        }
        assert_eq!(root.disposals.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_disposes() {
        let root = Arc::new(CountingRoot::default());
        drop(RootScope::new(Arc::new(Container::new()), root.clone()));
        assert_eq!(root.disposals.load(Ordering::SeqCst), 1);
    }
}
