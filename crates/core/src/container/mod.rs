#[allow(clippy::module_inception)]
pub mod container;
pub mod autowiring;
pub mod binding;
pub mod descriptor;
pub mod provider;
pub mod resolver;
pub mod types;

pub use autowiring::Injectable;
pub use binding::{BindingBuilder, BindingRegistry};
pub use container::{Container, ContainerId};
pub use descriptor::{ContractKey, TypeKey};
pub use provider::{Provider, SingletonProviderMap};
pub use resolver::{AnyInstance, ResolutionPath, Resolver, TypedInstance};
pub use types::{Capability, TypeDeclaration, TypeDescriptor, TypeRegistry};
