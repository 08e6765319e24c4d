use crate::container::Container;
use crate::errors::CoreError;

/// Callback run against a container while it is being composed
pub type InstallHook = Box<dyn FnOnce(&mut Container) -> Result<(), CoreError> + Send>;

/// Hooks for one composition.
///
/// Hooks are consumed when they run, so a context reused for a second
/// composition fires nothing unless new hooks were added.
#[derive(Default)]
pub struct CompositionContext {
    before_install: Vec<InstallHook>,
    after_install: Vec<InstallHook>,
}

impl CompositionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` before the standard bindings are installed
    pub fn before_install<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&mut Container) -> Result<(), CoreError> + Send + 'static,
    {
        self.add_before_install(hook);
        self
    }

    /// Run `hook` after every installer, right before the container is sealed
    pub fn after_install<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&mut Container) -> Result<(), CoreError> + Send + 'static,
    {
        self.add_after_install(hook);
        self
    }

    pub fn add_before_install<F>(&mut self, hook: F)
    where
        F: FnOnce(&mut Container) -> Result<(), CoreError> + Send + 'static,
    {
        self.before_install.push(Box::new(hook));
    }

    pub fn add_after_install<F>(&mut self, hook: F)
    where
        F: FnOnce(&mut Container) -> Result<(), CoreError> + Send + 'static,
    {
        self.after_install.push(Box::new(hook));
    }

    pub fn is_empty(&self) -> bool {
        self.before_install.is_empty() && self.after_install.is_empty()
    }

    pub(crate) fn run_before_install(&mut self, container: &mut Container) -> Result<(), CoreError> {
        run_hooks(std::mem::take(&mut self.before_install), container, "before_install")
    }

    pub(crate) fn run_after_install(&mut self, container: &mut Container) -> Result<(), CoreError> {
        run_hooks(std::mem::take(&mut self.after_install), container, "after_install")
    }
}

fn run_hooks(hooks: Vec<InstallHook>, container: &mut Container, stage: &str) -> Result<(), CoreError> {
    if !hooks.is_empty() {
        tracing::debug!(stage, count = hooks.len(), "Running composition hooks");
    }
    for hook in hooks {
        hook(container)?;
    }
    Ok(())
}
