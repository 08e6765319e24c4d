use std::sync::Arc;

use crate::composition::installer::run_installers;
use crate::composition::{CompositionContext, Installer, StandardInstaller};
use crate::config::RuntimeConfig;
use crate::container::{Container, ContainerId, ResolutionPath, Resolver};
use crate::errors::{Advisory, CoreError};
use crate::foundation::InjectionTarget;
use crate::lifecycle::{DependencyRoot, RootScope};

/// Description of the composition root, bound in every container it composes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionRootInfo {
    pub name: String,
    pub container: ContainerId,
}

/// Builds containers from installers and starts scopes from them
pub struct CompositionRoot {
    name: String,
    config: RuntimeConfig,
    installers: Vec<Option<Box<dyn Installer>>>,
}

impl CompositionRoot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: RuntimeConfig::default(),
            installers: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a statically configured installer
    pub fn with_installer(mut self, installer: impl Installer + 'static) -> Self {
        self.add_installer(installer);
        self
    }

    pub fn add_installer(&mut self, installer: impl Installer + 'static) {
        self.installers.push(Some(Box::new(installer)));
    }

    /// Add a possibly empty installer slot; empty slots raise an advisory
    pub fn add_installer_slot(&mut self, installer: Option<Box<dyn Installer>>) {
        self.installers.push(installer);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Compose and seal a new container.
    ///
    /// The static installers are consumed by this call; `extra_installers`
    /// run ahead of them. Hooks in `context` run once and are drained.
    pub fn create_container(
        &mut self,
        allow_null_bindings: bool,
        parent: Option<Arc<Container>>,
        extra_installers: Vec<Option<Box<dyn Installer>>>,
        context: &mut CompositionContext,
    ) -> Result<Container, CoreError> {
        tracing::info!(root = %self.name, "Composing container");

        let mut container = match parent {
            Some(parent) => Container::with_parent(parent),
            None => Container::new(),
        };
        container.set_allow_null_bindings(allow_null_bindings || self.config.allow_null_bindings);
        let id = container.id();
        container
            .bind::<CompositionRootInfo>()
            .to_instance(Arc::new(CompositionRootInfo {
                name: self.name.clone(),
                container: id,
            }))?;

        context.run_before_install(&mut container)?;

        run_installers(
            &mut container,
            vec![Box::new(StandardInstaller::new(self.config.clone()))],
        )?;

        let mut installers: Vec<Box<dyn Installer>> = Vec::new();
        let slots = extra_installers
            .into_iter()
            .chain(std::mem::take(&mut self.installers));
        for (position, slot) in slots.enumerate() {
            match slot {
                Some(installer) => installers.push(installer),
                None => container.advise(Advisory::NullInstaller { position }),
            }
        }

        if installers.is_empty() {
            container.advise(Advisory::EmptyInstallerSet);
        } else {
            run_installers(&mut container, installers)?;
        }

        context.run_after_install(&mut container)?;
        container.seal();

        tracing::info!(
            root = %self.name,
            container = %container.id(),
            bindings = container.binding_count(),
            "Container composed"
        );
        Ok(container)
    }

    /// Compose a container, inject `targets`, resolve the dependency root
    /// and initialize it
    pub fn start(
        &mut self,
        parent: Option<Arc<Container>>,
        extra_installers: Vec<Option<Box<dyn Installer>>>,
        context: &mut CompositionContext,
        targets: &[Arc<dyn InjectionTarget>],
    ) -> Result<RootScope, CoreError> {
        let allow_null_bindings = self.config.allow_null_bindings;
        let container = Arc::new(self.create_container(allow_null_bindings, parent, extra_installers, context)?);

        for target in targets {
            tracing::debug!(target = target.target_name(), "Injecting target");
            let mut path = ResolutionPath::new();
            let mut resolver = Resolver::new(&container, &mut path);
            target.inject(&mut resolver)?;
        }

        let root = container.resolve::<dyn DependencyRoot>()?;
        let scope = RootScope::new(container, root);
        scope.initialize()?;
        Ok(scope)
    }
}

impl std::fmt::Debug for CompositionRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositionRoot")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("installers", &self.installers.len())
            .finish()
    }
}
