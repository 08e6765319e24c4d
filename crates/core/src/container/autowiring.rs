//! Constructor-style injection.
//!
//! Types implementing [`Injectable`] can be bound as singletons without a
//! hand-written factory: the container calls `create` with a [`Resolver`]
//! that tracks the active resolution path.

use crate::container::descriptor::ContractKey;
use crate::container::resolver::Resolver;
use crate::errors::CoreError;

/// Trait for types that know how to build themselves from a container
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Create an instance, resolving dependencies through `resolver`
    fn create(resolver: &mut Resolver<'_>) -> Result<Self, CoreError>;

    /// Contracts `create` resolves, used for pre-flight validation
    fn dependencies() -> Vec<ContractKey> {
        Vec::new()
    }
}
