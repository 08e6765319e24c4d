//! Container composition: installers, hooks and the composition root.

pub mod context;
pub mod decorator;
pub mod installer;
pub mod root;
pub mod standard;

pub use context::{CompositionContext, InstallHook};
pub use decorator::CompositionDecorator;
pub use installer::{run_installers, Installer};
pub use root::{CompositionRoot, CompositionRootInfo};
pub use standard::StandardInstaller;
