use std::fmt;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::composition::Installer;
use crate::container::autowiring::Injectable;
use crate::container::binding::{BindingBuilder, BindingRegistry};
use crate::container::descriptor::{ContractKey, TypeKey};
use crate::container::provider::{Provider, SingletonProviderMap, SingletonSlot};
use crate::container::resolver::{
    Requirement, ResolutionPath, Resolved, Resolver, TypedInstance,
};
use crate::container::types::{Capability, TypeDeclaration, TypeDescriptor, TypeRegistry};
use crate::errors::{Advisory, CoreError};
use crate::foundation::{Disposable, FixedTickable, Initializable, LateTickable, Tickable};
use crate::scheduler::PriorityOverride;

/// Unique identity of a container instance, used in logs and errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(Uuid);

impl ContainerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dependency-injection container.
///
/// Holds bindings from contract keys to providers, an optional parent used as
/// a fallback for unbound contracts, and the capability registry consulted by
/// the schedulers. Bindings are only added while the container is being
/// composed; [`Container::seal`] freezes the graph.
pub struct Container {
    id: ContainerId,
    registry: BindingRegistry,
    singletons: SingletonProviderMap,
    types: TypeRegistry,
    parent: Option<Arc<Container>>,
    allow_null_bindings: bool,
    sealed: bool,
    pending_installers: Vec<Box<dyn Installer>>,
    advisories: Mutex<Vec<Advisory>>,
}

impl Container {
    pub fn new() -> Self {
        let container = Self {
            id: ContainerId::new(),
            registry: BindingRegistry::new(),
            singletons: SingletonProviderMap::new(),
            types: TypeRegistry::new(),
            parent: None,
            allow_null_bindings: false,
            sealed: false,
            pending_installers: Vec::new(),
            advisories: Mutex::new(Vec::new()),
        };
        tracing::debug!(container = %container.id, "Container created");
        container
    }

    /// Create a child container that falls back to `parent` for unbound contracts
    pub fn with_parent(parent: Arc<Container>) -> Self {
        let mut container = Self::new();
        tracing::debug!(container = %container.id, parent = %parent.id, "Container attached to parent");
        container.parent = Some(parent);
        container
    }

    pub fn id(&self) -> ContainerId {
        self.id
    }

    pub fn parent(&self) -> Option<&Arc<Container>> {
        self.parent.as_ref()
    }

    pub fn allow_null_bindings(&self) -> bool {
        self.allow_null_bindings
    }

    /// When enabled, nullable lookups of unbound contracts yield `None`
    /// instead of failing
    pub fn set_allow_null_bindings(&mut self, allow: bool) {
        self.allow_null_bindings = allow;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Freeze the binding graph; further bindings fail with `ContainerSealed`
    pub fn seal(&mut self) {
        self.sealed = true;
        tracing::debug!(
            container = %self.id,
            bindings = self.registry.count(),
            singletons = self.singletons.len(),
            "Container sealed"
        );
    }

    // ------------------------------------------------------------------
    // Binding
    // ------------------------------------------------------------------

    /// Start a binding for the contract `T`
    pub fn bind<T: ?Sized + Send + Sync + 'static>(&mut self) -> BindingBuilder<'_, T> {
        BindingBuilder::new(self, ContractKey::of::<T>())
    }

    /// Start a binding for `T` under an identifier
    pub fn bind_id<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        id: impl Into<String>,
    ) -> BindingBuilder<'_, T> {
        BindingBuilder::new(self, ContractKey::with_id::<T>(id))
    }

    /// Remove existing local bindings for `T` and start a new one
    pub fn rebind<T: ?Sized + Send + Sync + 'static>(
        &mut self,
    ) -> Result<BindingBuilder<'_, T>, CoreError> {
        self.unbind::<T>()?;
        Ok(self.bind::<T>())
    }

    /// Remove every local binding of `T`, returning how many were removed
    pub fn unbind<T: ?Sized + Send + Sync + 'static>(&mut self) -> Result<usize, CoreError> {
        self.unbind_key(&ContractKey::of::<T>())
    }

    pub fn unbind_id<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        id: &str,
    ) -> Result<usize, CoreError> {
        self.unbind_key(&ContractKey::with_id::<T>(id))
    }

    fn unbind_key(&mut self, key: &ContractKey) -> Result<usize, CoreError> {
        self.ensure_open(key)?;
        let removed = self.registry.remove(key);
        tracing::trace!(container = %self.id, contract = %key, removed, "Unbound contract");
        Ok(removed)
    }

    /// Whether `T` is bound here or anywhere up the parent chain
    pub fn has_binding<T: ?Sized + 'static>(&self) -> bool {
        self.has_key(&ContractKey::of::<T>())
    }

    pub fn has_binding_id<T: ?Sized + 'static>(&self, id: &str) -> bool {
        self.has_key(&ContractKey::with_id::<T>(id))
    }

    /// Whether `T` is bound in this container, ignoring the parent
    pub fn has_local_binding<T: ?Sized + 'static>(&self) -> bool {
        self.registry.contains(&ContractKey::of::<T>())
    }

    fn has_key(&self, key: &ContractKey) -> bool {
        self.registry.contains(key)
            || self.parent.as_ref().is_some_and(|parent| parent.has_key(key))
    }

    pub fn binding_count(&self) -> usize {
        self.registry.count()
    }

    pub(crate) fn add_provider(&mut self, key: ContractKey, provider: Provider) -> Result<(), CoreError> {
        self.ensure_open(&key)?;
        tracing::trace!(container = %self.id, contract = %key, provider = ?provider, "Binding added");
        self.registry.add(key, provider);
        Ok(())
    }

    pub(crate) fn singleton_slot<C: Send + Sync + 'static>(&mut self) -> Arc<SingletonSlot> {
        let concrete = TypeKey::of::<C>();
        self.types.entry(concrete);
        self.singletons.slot(concrete, None)
    }

    fn ensure_open(&self, key: &ContractKey) -> Result<(), CoreError> {
        if self.sealed {
            return Err(CoreError::ContainerSealed {
                contract: key.to_string(),
                container: self.id.to_string(),
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Capability bindings
    // ------------------------------------------------------------------

    /// Register the singleton of `C` as a per-frame task.
    ///
    /// The singleton is shared with any other singleton binding of `C`.
    pub fn bind_tickable<C: Tickable + Injectable>(&mut self) -> Result<(), CoreError> {
        self.bind::<dyn Tickable>()
            .to_single_with::<C>(|concrete| concrete)?;
        self.declare::<C>().with_capability(Capability::Tick);
        Ok(())
    }

    /// Register the singleton of `C` as a fixed-step task
    pub fn bind_fixed_tickable<C: FixedTickable + Injectable>(&mut self) -> Result<(), CoreError> {
        self.bind::<dyn FixedTickable>()
            .to_single_with::<C>(|concrete| concrete)?;
        self.declare::<C>().with_capability(Capability::FixedTick);
        Ok(())
    }

    /// Register the singleton of `C` as a late per-frame task
    pub fn bind_late_tickable<C: LateTickable + Injectable>(&mut self) -> Result<(), CoreError> {
        self.bind::<dyn LateTickable>()
            .to_single_with::<C>(|concrete| concrete)?;
        self.declare::<C>().with_capability(Capability::LateTick);
        Ok(())
    }

    /// Register an existing value as a per-frame task
    pub fn bind_tickable_instance<C: Tickable + 'static>(&mut self, instance: Arc<C>) -> Result<(), CoreError> {
        self.bind::<dyn Tickable>()
            .to_instance_of(instance, |concrete| concrete)?;
        self.declare::<C>().with_capability(Capability::Tick);
        Ok(())
    }

    pub fn bind_fixed_tickable_instance<C: FixedTickable + 'static>(
        &mut self,
        instance: Arc<C>,
    ) -> Result<(), CoreError> {
        self.bind::<dyn FixedTickable>()
            .to_instance_of(instance, |concrete| concrete)?;
        self.declare::<C>().with_capability(Capability::FixedTick);
        Ok(())
    }

    pub fn bind_late_tickable_instance<C: LateTickable + 'static>(
        &mut self,
        instance: Arc<C>,
    ) -> Result<(), CoreError> {
        self.bind::<dyn LateTickable>()
            .to_instance_of(instance, |concrete| concrete)?;
        self.declare::<C>().with_capability(Capability::LateTick);
        Ok(())
    }

    pub fn bind_initializable<C: Initializable + Injectable>(&mut self) -> Result<(), CoreError> {
        self.bind::<dyn Initializable>()
            .to_single_with::<C>(|concrete| concrete)?;
        self.declare::<C>().with_capability(Capability::Initialize);
        Ok(())
    }

    pub fn bind_disposable<C: Disposable + Injectable>(&mut self) -> Result<(), CoreError> {
        self.bind::<dyn Disposable>()
            .to_single_with::<C>(|concrete| concrete)?;
        self.declare::<C>().with_capability(Capability::Dispose);
        Ok(())
    }

    /// Override the priority of type `K` (a concrete type or a declared kind)
    /// for the scheduler serving `capability`. Lower runs earlier.
    pub fn bind_priority<K: ?Sized + 'static>(
        &mut self,
        capability: Capability,
        priority: i32,
    ) -> Result<(), CoreError> {
        let entry = Arc::new(PriorityOverride::new(TypeKey::of::<K>(), priority));
        match capability.binding_id() {
            Some(id) => self.bind_id::<PriorityOverride>(id).to_instance(entry),
            None => self.bind::<PriorityOverride>().to_instance(entry),
        }
    }

    // ------------------------------------------------------------------
    // Type registry
    // ------------------------------------------------------------------

    /// Declare a type's kinds and capabilities
    pub fn declare<C: ?Sized + 'static>(&mut self) -> TypeDeclaration<'_> {
        TypeDeclaration::new(self.types.entry(TypeKey::of::<C>()))
    }

    /// Declare a kind: a grouping type other types derive from
    pub fn declare_kind<K: ?Sized + 'static>(&mut self) -> TypeDeclaration<'_> {
        let descriptor = self.types.entry(TypeKey::of::<K>());
        descriptor.is_kind = true;
        TypeDeclaration::new(descriptor)
    }

    /// Descriptor for `key`, looked up here and then up the parent chain
    pub fn describe(&self, key: &TypeKey) -> Option<&TypeDescriptor> {
        self.types
            .get(key)
            .or_else(|| self.parent.as_ref().and_then(|parent| parent.describe(key)))
    }

    /// Descriptors matching a type name, nearest container first
    pub fn describe_by_name(&self, name: &str) -> Vec<&TypeDescriptor> {
        let local = self.types.find_by_name(name);
        if !local.is_empty() {
            return local;
        }
        match &self.parent {
            Some(parent) => parent.describe_by_name(name),
            None => Vec::new(),
        }
    }

    /// This container's own registry, without the parent's declarations
    pub fn type_registry(&self) -> &TypeRegistry {
        &self.types
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Resolve a required contract
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, CoreError> {
        let mut path = ResolutionPath::new();
        Resolver::new(self, &mut path).resolve::<T>()
    }

    pub fn resolve_id<T: ?Sized + Send + Sync + 'static>(&self, id: &str) -> Result<Arc<T>, CoreError> {
        let mut path = ResolutionPath::new();
        Resolver::new(self, &mut path).resolve_id::<T>(id)
    }

    /// Resolve an optional contract, `None` when nothing is bound
    pub fn try_resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>, CoreError> {
        let mut path = ResolutionPath::new();
        Resolver::new(self, &mut path).try_resolve::<T>()
    }

    pub fn try_resolve_id<T: ?Sized + Send + Sync + 'static>(
        &self,
        id: &str,
    ) -> Result<Option<Arc<T>>, CoreError> {
        let mut path = ResolutionPath::new();
        Resolver::new(self, &mut path).try_resolve_id::<T>(id)
    }

    /// Resolve honoring the null-binding policy
    pub fn resolve_nullable<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Option<Arc<T>>, CoreError> {
        let mut path = ResolutionPath::new();
        Resolver::new(self, &mut path).resolve_nullable::<T>()
    }

    /// Resolve every provider of a contract, in registration order
    pub fn resolve_all<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<T>>, CoreError> {
        let mut path = ResolutionPath::new();
        Resolver::new(self, &mut path).resolve_all::<T>()
    }

    pub fn resolve_all_id<T: ?Sized + Send + Sync + 'static>(
        &self,
        id: &str,
    ) -> Result<Vec<Arc<T>>, CoreError> {
        let mut path = ResolutionPath::new();
        Resolver::new(self, &mut path).resolve_all_id::<T>(id)
    }

    /// Collection lookup that yields an empty list for an unbound contract
    pub fn try_resolve_all<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<T>>, CoreError> {
        let mut path = ResolutionPath::new();
        Resolver::new(self, &mut path).try_resolve_all::<T>()
    }

    pub fn try_resolve_all_typed<T: ?Sized + Send + Sync + 'static>(
        &self,
        id: Option<&str>,
    ) -> Result<Vec<TypedInstance<T>>, CoreError> {
        let mut path = ResolutionPath::new();
        Resolver::new(self, &mut path).try_resolve_all_typed::<T>(id)
    }

    pub(crate) fn resolve_key(
        &self,
        key: &ContractKey,
        path: &mut ResolutionPath,
        requirement: Requirement,
    ) -> Result<Option<Resolved>, CoreError> {
        if path.contains(key) {
            return Err(CoreError::CyclicResolution {
                contract: key.to_string(),
                path: path.path_string_with(key),
            });
        }

        match self.registry.get(key) {
            Some([provider]) => self.produce(provider, key, path).map(Some),
            Some(providers) if !providers.is_empty() => Err(CoreError::AmbiguousBinding {
                contract: key.to_string(),
                candidates: providers
                    .iter()
                    .map(|provider| provider.instance_type().type_name().to_string())
                    .collect(),
                path: path.path_string_with(key),
            }),
            _ => match &self.parent {
                Some(parent) => parent.resolve_key(key, path, requirement),
                None => {
                    self.check_missing(key, path, requirement)?;
                    Ok(None)
                }
            },
        }
    }

    pub(crate) fn resolve_all_key(
        &self,
        key: &ContractKey,
        path: &mut ResolutionPath,
        requirement: Requirement,
    ) -> Result<Vec<Resolved>, CoreError> {
        if path.contains(key) {
            return Err(CoreError::CyclicResolution {
                contract: key.to_string(),
                path: path.path_string_with(key),
            });
        }

        match self.registry.get(key) {
            // Local bindings shadow the parent's collection entirely
            Some(providers) if !providers.is_empty() => providers
                .iter()
                .map(|provider| self.produce(provider, key, path))
                .collect(),
            _ => match &self.parent {
                Some(parent) => parent.resolve_all_key(key, path, requirement),
                None => {
                    self.check_missing(key, path, requirement)?;
                    Ok(Vec::new())
                }
            },
        }
    }

    fn produce(
        &self,
        provider: &Provider,
        key: &ContractKey,
        path: &mut ResolutionPath,
    ) -> Result<Resolved, CoreError> {
        path.push(key.clone());
        let produced = provider.get_instance(self, key, path);
        path.pop();

        Ok(Resolved {
            instance: produced?,
            instance_type: provider.instance_type(),
        })
    }

    fn check_missing(
        &self,
        key: &ContractKey,
        path: &ResolutionPath,
        requirement: Requirement,
    ) -> Result<(), CoreError> {
        let tolerated = match requirement {
            Requirement::Required => false,
            Requirement::Optional => true,
            Requirement::Nullable => self.allow_null_bindings,
        };
        if tolerated {
            return Ok(());
        }
        Err(CoreError::BindingNotFound {
            contract: key.to_string(),
            path: path.path_string_with(key),
        })
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Check that `T` could be resolved, without constructing anything
    pub fn validate<T: ?Sized + 'static>(&self) -> Vec<CoreError> {
        let key = ContractKey::of::<T>();
        let mut path = ResolutionPath::new();
        if let Some(providers) = self.registry.get(&key) {
            if providers.len() > 1 {
                return vec![CoreError::AmbiguousBinding {
                    contract: key.to_string(),
                    candidates: providers
                        .iter()
                        .map(|provider| provider.instance_type().type_name().to_string())
                        .collect(),
                    path: path.path_string_with(&key),
                }];
            }
        }
        self.validate_key(&key, &mut path)
    }

    /// Validate every local binding and report all problems found
    pub fn validate_all(&self) -> Vec<CoreError> {
        let keys: Vec<ContractKey> = self.registry.keys().cloned().collect();
        let mut errors = Vec::new();
        for key in keys {
            let mut path = ResolutionPath::new();
            errors.extend(self.validate_key(&key, &mut path));
        }
        errors
    }

    pub(crate) fn validate_key(&self, key: &ContractKey, path: &mut ResolutionPath) -> Vec<CoreError> {
        if path.contains(key) {
            return vec![CoreError::CyclicResolution {
                contract: key.to_string(),
                path: path.path_string_with(key),
            }];
        }

        match self.registry.get(key) {
            Some(providers) if !providers.is_empty() => {
                path.push(key.clone());
                let errors = providers
                    .iter()
                    .flat_map(|provider| provider.validate(self, key, path))
                    .collect();
                path.pop();
                errors
            }
            _ => match &self.parent {
                Some(parent) => parent.validate_key(key, path),
                None if self.allow_null_bindings => Vec::new(),
                None => vec![CoreError::BindingNotFound {
                    contract: key.to_string(),
                    path: path.path_string_with(key),
                }],
            },
        }
    }

    // ------------------------------------------------------------------
    // Installers and advisories
    // ------------------------------------------------------------------

    /// Queue an installer; it runs when the composition root processes
    /// the installer chain
    pub fn install(&mut self, installer: impl Installer + 'static) {
        self.install_boxed(Box::new(installer));
    }

    pub fn install_boxed(&mut self, installer: Box<dyn Installer>) {
        tracing::trace!(container = %self.id, installer = installer.name(), "Installer queued");
        self.pending_installers.push(installer);
    }

    pub fn has_pending_installers(&self) -> bool {
        !self.pending_installers.is_empty()
    }

    pub(crate) fn take_pending_installers(&mut self) -> Vec<Box<dyn Installer>> {
        std::mem::take(&mut self.pending_installers)
    }

    /// Record a non-fatal diagnostic
    pub fn advise(&self, advisory: Advisory) {
        tracing::warn!(container = %self.id, "{}", advisory);
        if let Ok(mut advisories) = self.advisories.lock() {
            advisories.push(advisory);
        }
    }

    /// Diagnostics recorded so far, oldest first
    pub fn advisories(&self) -> Vec<Advisory> {
        self.advisories
            .lock()
            .map(|advisories| advisories.clone())
            .unwrap_or_default()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("bindings", &self.registry.count())
            .field("singletons", &self.singletons.len())
            .field("types", &self.types.len())
            .field("has_parent", &self.parent.is_some())
            .field("allow_null_bindings", &self.allow_null_bindings)
            .field("sealed", &self.sealed)
            .finish()
    }
}
