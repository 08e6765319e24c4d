use crate::composition::installer::run_installers;
use crate::composition::{CompositionContext, Installer};
use crate::container::Container;
use crate::errors::{Advisory, CoreError};

/// Wraps another composition with installers of its own: pre installers run
/// before the standard bindings, post installers after every other installer.
///
/// Useful to extend a scope without editing its composition root.
pub struct CompositionDecorator {
    name: String,
    pre_installers: Vec<Option<Box<dyn Installer>>>,
    post_installers: Vec<Option<Box<dyn Installer>>>,
}

impl CompositionDecorator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pre_installers: Vec::new(),
            post_installers: Vec::new(),
        }
    }

    pub fn with_pre_installer(mut self, installer: impl Installer + 'static) -> Self {
        self.pre_installers.push(Some(Box::new(installer)));
        self
    }

    pub fn with_post_installer(mut self, installer: impl Installer + 'static) -> Self {
        self.post_installers.push(Some(Box::new(installer)));
        self
    }

    pub fn with_pre_installer_slot(mut self, installer: Option<Box<dyn Installer>>) -> Self {
        self.pre_installers.push(installer);
        self
    }

    pub fn with_post_installer_slot(mut self, installer: Option<Box<dyn Installer>>) -> Self {
        self.post_installers.push(installer);
        self
    }

    /// Register the decorator's installers as hooks on `context`
    pub fn apply(self, context: &mut CompositionContext) {
        let Self {
            name,
            pre_installers,
            post_installers,
        } = self;
        let post_name = name.clone();

        context.add_before_install(move |container| install_slots(container, &name, pre_installers));
        context.add_after_install(move |container| install_slots(container, &post_name, post_installers));
    }
}

fn install_slots(
    container: &mut Container,
    decorator: &str,
    slots: Vec<Option<Box<dyn Installer>>>,
) -> Result<(), CoreError> {
    tracing::debug!(decorator, count = slots.len(), "Running decorator installers");
    let mut installers = Vec::new();
    for (position, slot) in slots.into_iter().enumerate() {
        match slot {
            Some(installer) => installers.push(installer),
            None => container.advise(Advisory::NullInstaller { position }),
        }
    }
    for installer in installers {
        run_installers(container, vec![installer])?;
    }
    Ok(())
}
