use std::fmt;

use crate::container::Resolver;
use crate::errors::CoreError;

/// Work performed once per frame, ordered by priority
pub trait Tickable: Send + Sync {
    fn tick(&self);
}

/// Work performed once per fixed simulation step
pub trait FixedTickable: Send + Sync {
    fn fixed_tick(&self);
}

/// Work performed once per frame after every `Tickable` has run
pub trait LateTickable: Send + Sync {
    fn late_tick(&self);
}

/// Component that needs a one-time setup after the graph is built
pub trait Initializable: Send + Sync {
    fn initialize(&self) -> Result<(), CoreError>;
}

/// Component that releases resources when its scope ends
pub trait Disposable: Send + Sync {
    fn dispose(&self) -> Result<(), CoreError>;
}

/// Pre-existing object that receives its dependencies from a container
/// instead of being constructed by one
pub trait InjectionTarget: Send + Sync {
    fn inject(&self, resolver: &mut Resolver<'_>) -> Result<(), CoreError>;

    /// Name used in logs
    fn target_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl fmt::Debug for dyn Tickable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Tickable")
    }
}

impl fmt::Debug for dyn InjectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionTarget")
            .field("target", &self.target_name())
            .finish()
    }
}
