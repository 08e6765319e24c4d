use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use crate::container::container::Container;
use crate::container::descriptor::{ContractKey, TypeKey};
use crate::container::resolver::{AnyInstance, ResolutionPath, Resolver};
use crate::errors::CoreError;

/// Type-erased production function used by method providers
pub type ProviderMethod =
    Arc<dyn Fn(&mut Resolver<'_>) -> Result<Option<AnyInstance>, CoreError> + Send + Sync>;

/// Converts a cached concrete instance into the contract's representation
pub type Upcast = Arc<dyn Fn(&AnyInstance) -> Option<AnyInstance> + Send + Sync>;

/// Source of instances for one binding
pub enum Provider {
    /// Pre-existing value
    Instance(InstanceProvider),
    /// Production function invoked on every request
    Method(MethodProvider),
    /// Lazily constructed instance shared by every binding of the same slot
    Singleton(SingletonProvider),
}

impl Provider {
    /// Concrete type this provider produces
    pub fn instance_type(&self) -> TypeKey {
        match self {
            Provider::Instance(p) => p.instance_type,
            Provider::Method(p) => p.instance_type,
            Provider::Singleton(p) => p.slot.concrete,
        }
    }

    /// Whether an instance is available without running any production code
    pub fn has_instance(&self) -> bool {
        match self {
            Provider::Instance(_) => true,
            Provider::Method(_) => false,
            Provider::Singleton(p) => p.slot.is_ready(),
        }
    }

    /// Produce an instance for `contract` now
    pub fn get_instance(
        &self,
        container: &Container,
        contract: &ContractKey,
        path: &mut ResolutionPath,
    ) -> Result<AnyInstance, CoreError> {
        match self {
            Provider::Instance(p) => Ok(p.instance.clone()),
            Provider::Method(p) => p.produce(container, contract, path),
            Provider::Singleton(p) => p.get_instance(container, contract, path),
        }
    }

    /// Report every problem that would prevent this provider from producing,
    /// without constructing anything
    pub fn validate(
        &self,
        container: &Container,
        contract: &ContractKey,
        path: &mut ResolutionPath,
    ) -> Vec<CoreError> {
        match self {
            Provider::Instance(_) => Vec::new(),
            Provider::Method(p) => p.validate(container, path),
            Provider::Singleton(p) => p.validate(container, contract, path),
        }
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Instance(p) => write!(f, "Instance({})", p.instance_type),
            Provider::Method(p) => write!(f, "Method({})", p.instance_type),
            Provider::Singleton(p) => write!(f, "Singleton({})", p.slot.concrete),
        }
    }
}

pub struct InstanceProvider {
    instance: AnyInstance,
    instance_type: TypeKey,
}

impl InstanceProvider {
    pub fn new(instance: AnyInstance, instance_type: TypeKey) -> Self {
        Self {
            instance,
            instance_type,
        }
    }
}

pub struct MethodProvider {
    method: ProviderMethod,
    instance_type: TypeKey,
    /// Contracts the method is known to resolve, checked by `validate`
    dependencies: Vec<ContractKey>,
}

impl MethodProvider {
    pub fn new(method: ProviderMethod, instance_type: TypeKey) -> Self {
        Self {
            method,
            instance_type,
            dependencies: Vec::new(),
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<ContractKey>) -> Self {
        self.dependencies = dependencies;
        self
    }

    fn produce(
        &self,
        container: &Container,
        contract: &ContractKey,
        path: &mut ResolutionPath,
    ) -> Result<AnyInstance, CoreError> {
        let produced = {
            let mut resolver = Resolver::new(container, path);
            (self.method)(&mut resolver)?
        };

        produced.ok_or_else(|| CoreError::NullProduction {
            contract: contract.to_string(),
            path: path.path_string(),
        })
    }

    fn validate(&self, container: &Container, path: &mut ResolutionPath) -> Vec<CoreError> {
        self.dependencies
            .iter()
            .flat_map(|dependency| container.validate_key(dependency, path))
            .collect()
    }
}

enum SlotState {
    Empty,
    Constructing,
    Ready(AnyInstance),
}

/// Cache shared by every binding that resolves to the same singleton
pub struct SingletonSlot {
    concrete: TypeKey,
    id: Option<String>,
    creator: OnceLock<Provider>,
    state: Mutex<SlotState>,
}

impl SingletonSlot {
    fn new(concrete: TypeKey, id: Option<String>) -> Self {
        Self {
            concrete,
            id,
            creator: OnceLock::new(),
            state: Mutex::new(SlotState::Empty),
        }
    }

    pub fn concrete(&self) -> TypeKey {
        self.concrete
    }

    pub fn has_creator(&self) -> bool {
        self.creator.get().is_some()
    }

    /// Install the production strategy; a slot accepts exactly one
    pub(crate) fn set_creator(&self, creator: Provider) -> Result<(), CoreError> {
        self.creator.set(creator).map_err(|_| {
            CoreError::configuration(format!(
                "Singleton '{}' already has a creation method bound",
                self.label()
            ))
        })
    }

    /// Install the production strategy unless one exists already
    pub(crate) fn set_default_creator(&self, creator: impl FnOnce() -> Provider) {
        if self.creator.get().is_none() {
            let _ = self.creator.set(creator());
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state
            .lock()
            .map(|state| matches!(*state, SlotState::Ready(_)))
            .unwrap_or(false)
    }

    fn label(&self) -> String {
        match &self.id {
            Some(id) => format!("{}({})", self.concrete, id),
            None => self.concrete.to_string(),
        }
    }

    /// Chain closed by this slot's own key, unless the path already ends with it
    fn cycle_path(&self, path: &ResolutionPath) -> String {
        let slot_key = self.slot_key();
        if path.contracts.last() == Some(&slot_key) {
            path.path_string()
        } else {
            path.path_string_with(&slot_key)
        }
    }

    fn slot_key(&self) -> ContractKey {
        ContractKey {
            contract: self.concrete,
            id: self.id.clone(),
        }
    }

    fn get_or_create(
        &self,
        container: &Container,
        contract: &ContractKey,
        path: &mut ResolutionPath,
    ) -> Result<AnyInstance, CoreError> {
        {
            let mut state = self.state.lock().map_err(|_| CoreError::lock("singleton_slot"))?;
            if let SlotState::Ready(instance) = &*state {
                return Ok(instance.clone());
            }
            // Re-entering a singleton under construction is a cycle, never a partial value
            if matches!(*state, SlotState::Constructing) {
                return Err(CoreError::CyclicResolution {
                    contract: contract.to_string(),
                    path: self.cycle_path(path),
                });
            }
            *state = SlotState::Constructing;
        }

        let produced = match self.creator.get() {
            Some(creator) => creator.get_instance(container, &self.slot_key(), path),
            None => Err(missing_creator(self)),
        };

        let mut state = self.state.lock().map_err(|_| CoreError::lock("singleton_slot"))?;
        match produced {
            Ok(instance) => {
                tracing::trace!(singleton = %self.label(), "Singleton constructed");
                *state = SlotState::Ready(instance.clone());
                Ok(instance)
            }
            Err(error) => {
                *state = SlotState::Empty;
                Err(error)
            }
        }
    }
}

fn missing_creator(slot: &SingletonSlot) -> CoreError {
    CoreError::configuration(format!(
        "Singleton '{}' is bound but no binding supplies a way to create it",
        slot.label()
    ))
}

pub struct SingletonProvider {
    slot: Arc<SingletonSlot>,
    upcast: Option<Upcast>,
}

impl SingletonProvider {
    pub fn new(slot: Arc<SingletonSlot>, upcast: Option<Upcast>) -> Self {
        Self { slot, upcast }
    }

    pub fn slot(&self) -> &Arc<SingletonSlot> {
        &self.slot
    }

    fn get_instance(
        &self,
        container: &Container,
        contract: &ContractKey,
        path: &mut ResolutionPath,
    ) -> Result<AnyInstance, CoreError> {
        let instance = self.slot.get_or_create(container, contract, path)?;
        match &self.upcast {
            None => Ok(instance),
            Some(upcast) => upcast(&instance).ok_or_else(|| CoreError::TypeMismatch {
                contract: contract.to_string(),
                actual: self.slot.concrete.type_name().to_string(),
            }),
        }
    }

    fn validate(
        &self,
        container: &Container,
        contract: &ContractKey,
        path: &mut ResolutionPath,
    ) -> Vec<CoreError> {
        match self.slot.creator.get() {
            None => vec![missing_creator(&self.slot)],
            Some(creator) => creator.validate(container, contract, path),
        }
    }
}

/// Per-container map from (concrete type, identifier) to its singleton slot
#[derive(Default)]
pub struct SingletonProviderMap {
    slots: HashMap<ContractKey, Arc<SingletonSlot>>,
}

impl SingletonProviderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot for a concrete type, created on first use
    pub fn slot(&mut self, concrete: TypeKey, id: Option<&str>) -> Arc<SingletonSlot> {
        let key = ContractKey {
            contract: concrete,
            id: id.map(str::to_string),
        };
        self.slots
            .entry(key)
            .or_insert_with(|| Arc::new(SingletonSlot::new(concrete, id.map(str::to_string))))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
