use std::sync::Arc;

use crate::composition::Installer;
use crate::config::RuntimeConfig;
use crate::container::Container;
use crate::errors::CoreError;
use crate::lifecycle::{DependencyRoot, DisposableManager, InitializableManager, StandardDependencyRoot};
use crate::scheduler::TickManager;

/// Bindings every composed container gets: the runtime configuration, the
/// tick and lifecycle managers, and the standard dependency root
pub struct StandardInstaller {
    config: RuntimeConfig,
}

impl StandardInstaller {
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }
}

impl Installer for StandardInstaller {
    fn name(&self) -> &'static str {
        "StandardInstaller"
    }

    fn pre_install_bindings(&mut self, container: &mut Container) -> Result<(), CoreError> {
        container
            .bind::<RuntimeConfig>()
            .to_instance(Arc::new(self.config.clone()))?;
        container.bind::<TickManager>().to_single()?;
        container.bind::<InitializableManager>().to_single()?;
        container.bind::<DisposableManager>().to_single()?;

        // A root bound by a before-install hook takes precedence
        if !container.has_local_binding::<dyn DependencyRoot>() {
            container
                .bind::<dyn DependencyRoot>()
                .to_single_with::<StandardDependencyRoot>(|root| root)?;
        }
        Ok(())
    }
}
