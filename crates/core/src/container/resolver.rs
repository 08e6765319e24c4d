use std::any::Any;
use std::sync::Arc;

use crate::container::container::Container;
use crate::container::descriptor::{ContractKey, TypeKey};
use crate::errors::CoreError;

/// Type-erased instance as stored by providers.
///
/// The erased value is always an `Arc<T>` for the contract type `T`, which
/// lets trait-object contracts (`dyn Tickable`) travel through the same
/// storage as concrete types.
pub type AnyInstance = Arc<dyn Any + Send + Sync>;

pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>(instance: Arc<T>) -> AnyInstance {
    Arc::new(instance)
}

pub(crate) fn downcast<T: ?Sized + Send + Sync + 'static>(
    instance: &AnyInstance,
    contract: &ContractKey,
    actual: TypeKey,
) -> Result<Arc<T>, CoreError> {
    instance
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| CoreError::TypeMismatch {
            contract: contract.to_string(),
            actual: actual.type_name().to_string(),
        })
}

/// Produced instance together with the concrete type of its provider
#[derive(Clone)]
pub struct Resolved {
    pub instance: AnyInstance,
    pub instance_type: TypeKey,
}

/// Typed instance returned by collection lookups that need the concrete type
pub struct TypedInstance<T: ?Sized> {
    pub instance: Arc<T>,
    pub instance_type: TypeKey,
}

impl<T: ?Sized> Clone for TypedInstance<T> {
    fn clone(&self) -> Self {
        Self {
            instance: self.instance.clone(),
            instance_type: self.instance_type,
        }
    }
}

/// How a lookup treats a contract with no binding anywhere in the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Requirement {
    /// Missing binding is always an error
    Required,
    /// Missing binding yields the empty representation
    Optional,
    /// Missing binding yields the empty representation only when the
    /// container allows null bindings
    Nullable,
}

/// Dependency resolution path for error reporting and cycle detection
#[derive(Debug, Clone, Default)]
pub struct ResolutionPath {
    pub contracts: Vec<ContractKey>,
}

impl ResolutionPath {
    /// Create a new resolution path
    pub fn new() -> Self {
        Self {
            contracts: Vec::new(),
        }
    }

    /// Add a contract to the resolution path
    pub fn push(&mut self, key: ContractKey) {
        self.contracts.push(key);
    }

    /// Remove the last contract from the resolution path
    pub fn pop(&mut self) -> Option<ContractKey> {
        self.contracts.pop()
    }

    /// Check if the path contains a contract (for cycle detection)
    pub fn contains(&self, key: &ContractKey) -> bool {
        self.contracts.contains(key)
    }

    pub fn depth(&self) -> usize {
        self.contracts.len()
    }

    /// Get the path as a string for error messages
    pub fn path_string(&self) -> String {
        if self.contracts.is_empty() {
            return "<root>".to_string();
        }
        self.contracts
            .iter()
            .map(|key| key.to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Path string with `key` appended, used when `key` itself failed
    pub fn path_string_with(&self, key: &ContractKey) -> String {
        let mut path = self.clone();
        path.push(key.clone());
        path.path_string()
    }
}

/// Resolution handle passed to factory methods and `Injectable::create`.
///
/// It carries the resolution path of the request being served so nested
/// lookups share one explicit stack for cycle detection.
pub struct Resolver<'a> {
    container: &'a Container,
    path: &'a mut ResolutionPath,
}

impl<'a> Resolver<'a> {
    pub fn new(container: &'a Container, path: &'a mut ResolutionPath) -> Self {
        Self { container, path }
    }

    /// The container serving this request
    pub fn container(&self) -> &'a Container {
        self.container
    }

    pub fn path(&self) -> &ResolutionPath {
        self.path
    }

    /// Resolve a required contract
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Arc<T>, CoreError> {
        self.resolve_required::<T>(ContractKey::of::<T>())
    }

    /// Resolve a required contract bound under an identifier
    pub fn resolve_id<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        id: &str,
    ) -> Result<Arc<T>, CoreError> {
        self.resolve_required::<T>(ContractKey::with_id::<T>(id))
    }

    /// Resolve an optional contract, `None` when nothing is bound
    pub fn try_resolve<T: ?Sized + Send + Sync + 'static>(
        &mut self,
    ) -> Result<Option<Arc<T>>, CoreError> {
        self.resolve_with::<T>(ContractKey::of::<T>(), Requirement::Optional)
    }

    pub fn try_resolve_id<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        id: &str,
    ) -> Result<Option<Arc<T>>, CoreError> {
        self.resolve_with::<T>(ContractKey::with_id::<T>(id), Requirement::Optional)
    }

    /// Resolve honoring the container's null-binding policy: `None` for a
    /// missing binding when the policy is enabled, `BindingNotFound` otherwise
    pub fn resolve_nullable<T: ?Sized + Send + Sync + 'static>(
        &mut self,
    ) -> Result<Option<Arc<T>>, CoreError> {
        self.resolve_with::<T>(ContractKey::of::<T>(), Requirement::Nullable)
    }

    /// Resolve every provider bound to a contract, in registration order
    pub fn resolve_all<T: ?Sized + Send + Sync + 'static>(
        &mut self,
    ) -> Result<Vec<Arc<T>>, CoreError> {
        self.collect::<T>(None, Requirement::Nullable)
    }

    pub fn resolve_all_id<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        id: &str,
    ) -> Result<Vec<Arc<T>>, CoreError> {
        self.collect::<T>(Some(id), Requirement::Nullable)
    }

    /// Like `resolve_all`, but an unbound contract yields an empty list
    pub fn try_resolve_all<T: ?Sized + Send + Sync + 'static>(
        &mut self,
    ) -> Result<Vec<Arc<T>>, CoreError> {
        self.collect::<T>(None, Requirement::Optional)
    }

    pub fn try_resolve_all_id<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        id: Option<&str>,
    ) -> Result<Vec<Arc<T>>, CoreError> {
        self.collect::<T>(id, Requirement::Optional)
    }

    /// Optional collection lookup keeping each provider's concrete type
    pub fn try_resolve_all_typed<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        id: Option<&str>,
    ) -> Result<Vec<TypedInstance<T>>, CoreError> {
        let key = ContractKey::from_parts::<T>(id);
        let resolved = self
            .container
            .resolve_all_key(&key, self.path, Requirement::Optional)?;

        resolved
            .into_iter()
            .map(|entry| {
                Ok(TypedInstance {
                    instance: downcast::<T>(&entry.instance, &key, entry.instance_type)?,
                    instance_type: entry.instance_type,
                })
            })
            .collect()
    }

    fn resolve_required<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        key: ContractKey,
    ) -> Result<Arc<T>, CoreError> {
        match self.resolve_with::<T>(key.clone(), Requirement::Required)? {
            Some(instance) => Ok(instance),
            None => Err(CoreError::BindingNotFound {
                contract: key.to_string(),
                path: self.path.path_string_with(&key),
            }),
        }
    }

    fn resolve_with<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        key: ContractKey,
        requirement: Requirement,
    ) -> Result<Option<Arc<T>>, CoreError> {
        match self.container.resolve_key(&key, self.path, requirement)? {
            Some(resolved) => {
                downcast::<T>(&resolved.instance, &key, resolved.instance_type).map(Some)
            }
            None => Ok(None),
        }
    }

    fn collect<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        id: Option<&str>,
        requirement: Requirement,
    ) -> Result<Vec<Arc<T>>, CoreError> {
        let key = ContractKey::from_parts::<T>(id);
        self.container
            .resolve_all_key(&key, self.path, requirement)?
            .iter()
            .map(|entry| downcast::<T>(&entry.instance, &key, entry.instance_type))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Physics;
    struct Renderer;

    #[test]
    fn test_resolution_path_string() {
        let mut path = ResolutionPath::new();
        assert_eq!(path.path_string(), "<root>");

        path.push(ContractKey::of::<Physics>());
        path.push(ContractKey::with_id::<Renderer>("main"));

        assert_eq!(path.path_string(), "Physics(default) -> Renderer(main)");
        assert!(path.contains(&ContractKey::of::<Physics>()));
        assert!(!path.contains(&ContractKey::of::<Renderer>()));
        assert_eq!(path.depth(), 2);
    }

    #[test]
    fn test_path_string_with_does_not_mutate() {
        let mut path = ResolutionPath::new();
        path.push(ContractKey::of::<Physics>());

        let rendered = path.path_string_with(&ContractKey::of::<Renderer>());
        assert_eq!(rendered, "Physics(default) -> Renderer(default)");
        assert_eq!(path.depth(), 1);
    }

    #[test]
    fn test_downcast_round_trip_for_trait_objects() {
        trait Named: Send + Sync {
            fn name(&self) -> &'static str;
        }
        impl Named for Physics {
            fn name(&self) -> &'static str {
                "physics"
            }
        }

        let key = ContractKey::of::<dyn Named>();
        let erased = erase::<dyn Named>(Arc::new(Physics));
        let typed = downcast::<dyn Named>(&erased, &key, TypeKey::of::<Physics>()).unwrap();
        assert_eq!(typed.name(), "physics");

        let wrong = downcast::<Renderer>(&erased, &key, TypeKey::of::<Physics>());
        assert!(matches!(wrong, Err(CoreError::TypeMismatch { .. })));
    }
}
