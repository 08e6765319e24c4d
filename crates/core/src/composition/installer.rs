use std::collections::VecDeque;

use crate::container::Container;
use crate::errors::CoreError;

/// Unit of binding configuration run in two phases against a container.
///
/// Installers may queue further installers with [`Container::install`];
/// queued installers run before the installer chain moves on.
pub trait Installer: Send + Sync {
    /// Installer name for logs
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Disabled installers are skipped entirely
    fn enabled(&self) -> bool {
        true
    }

    /// Add bindings. Runs before any installer's post phase.
    fn pre_install_bindings(&mut self, container: &mut Container) -> Result<(), CoreError>;

    /// Runs after every pre phase of the chain has completed
    fn post_install_bindings(&mut self, container: &mut Container) -> Result<(), CoreError> {
        let _ = container;
        Ok(())
    }
}

/// Run an installer chain to completion.
///
/// Pre phases run depth first: installers queued by an installer run right
/// after it, ahead of its siblings. Post phases then run in the same order.
/// Installers queued during a post phase get both phases immediately.
pub fn run_installers(container: &mut Container, installers: Vec<Box<dyn Installer>>) -> Result<(), CoreError> {
    let mut queue: VecDeque<Box<dyn Installer>> = installers.into();
    let mut installed: Vec<Box<dyn Installer>> = Vec::new();

    while let Some(mut installer) = queue.pop_front() {
        if !installer.enabled() {
            tracing::debug!(installer = installer.name(), "Skipping disabled installer");
            continue;
        }

        tracing::debug!(installer = installer.name(), "Running pre-install bindings");
        installer.pre_install_bindings(container)?;

        let nested = container.take_pending_installers();
        for nested_installer in nested.into_iter().rev() {
            queue.push_front(nested_installer);
        }
        installed.push(installer);
    }

    for installer in installed.iter_mut() {
        tracing::debug!(installer = installer.name(), "Running post-install bindings");
        installer.post_install_bindings(container)?;

        let nested = container.take_pending_installers();
        if !nested.is_empty() {
            run_installers(container, nested)?;
        }
    }

    if container.has_pending_installers() {
        return Err(CoreError::configuration(
            "Installers are still pending after the installer chain completed",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Journal = Arc<Mutex<Vec<String>>>;

    struct Recording {
        label: &'static str,
        journal: Journal,
        children: Vec<&'static str>,
        enabled: bool,
    }

    impl Recording {
        fn new(label: &'static str, journal: &Journal) -> Self {
            Self {
                label,
                journal: journal.clone(),
                children: Vec::new(),
                enabled: true,
            }
        }
    }

    impl Installer for Recording {
        fn name(&self) -> &'static str {
            self.label
        }

        fn enabled(&self) -> bool {
            self.enabled
        }

        fn pre_install_bindings(&mut self, container: &mut Container) -> Result<(), CoreError> {
            self.journal.lock().unwrap().push(format!("pre:{}", self.label));
            for child in self.children.drain(..) {
                container.install(Recording::new(child, &self.journal));
            }
            Ok(())
        }

        fn post_install_bindings(&mut self, _: &mut Container) -> Result<(), CoreError> {
            self.journal.lock().unwrap().push(format!("post:{}", self.label));
            Ok(())
        }
    }

    #[test]
    fn test_nested_installers_run_depth_first() {
        let journal: Journal = Arc::new(Mutex::new(Vec::new()));
        let mut parent = Recording::new("parent", &journal);
        parent.children = vec!["child_a", "child_b"];
        let sibling = Recording::new("sibling", &journal);

        let mut container = Container::new();
        run_installers(&mut container, vec![Box::new(parent), Box::new(sibling)]).unwrap();

        assert_eq!(
            *journal.lock().unwrap(),
            vec![
                "pre:parent",
                "pre:child_a",
                "pre:child_b",
                "pre:sibling",
                "post:parent",
                "post:child_a",
                "post:child_b",
                "post:sibling",
            ]
        );
        assert!(!container.has_pending_installers());
    }

    #[test]
    fn test_disabled_installer_is_skipped() {
        let journal: Journal = Arc::new(Mutex::new(Vec::new()));
        let mut disabled = Recording::new("disabled", &journal);
        disabled.enabled = false;

        let mut container = Container::new();
        run_installers(&mut container, vec![Box::new(disabled)]).unwrap();
        assert!(journal.lock().unwrap().is_empty());
    }
}
