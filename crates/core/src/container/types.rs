use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::container::descriptor::TypeKey;

/// Runtime capability a type declares instead of being discovered by reflection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    Tick,
    FixedTick,
    LateTick,
    Initialize,
    Dispose,
}

impl Capability {
    /// Identifier under which priority overrides for this capability are bound
    pub fn binding_id(&self) -> Option<&'static str> {
        match self {
            Capability::Tick => None,
            Capability::FixedTick => Some("Fixed"),
            Capability::LateTick => Some("Late"),
            Capability::Initialize => Some("Initialize"),
            Capability::Dispose => Some("Dispose"),
        }
    }

    /// Method name used in profiling scopes and diagnostics
    pub fn method_name(&self) -> &'static str {
        match self {
            Capability::Tick => "Tick",
            Capability::FixedTick => "FixedTick",
            Capability::LateTick => "LateTick",
            Capability::Initialize => "Initialize",
            Capability::Dispose => "Dispose",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// Explicit description of a type: what it derives from and what it can do
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub key: TypeKey,
    /// Kind types (usually trait objects) this type is declared to derive from
    pub kinds: Vec<TypeKey>,
    pub capabilities: BTreeSet<Capability>,
    /// Kinds only group other types; they are never instantiated
    pub is_kind: bool,
}

impl TypeDescriptor {
    pub fn new(key: TypeKey) -> Self {
        Self {
            key,
            kinds: Vec::new(),
            capabilities: BTreeSet::new(),
            is_kind: false,
        }
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// `true` when `other` is this type or one of its declared kinds
    pub fn derives_from_or_equal(&self, other: &TypeKey) -> bool {
        self.key == *other || self.kinds.contains(other)
    }
}

/// Capability registry populated while a container is composed
#[derive(Debug, Default)]
pub struct TypeRegistry {
    descriptors: Vec<TypeDescriptor>,
    index: HashMap<TypeKey, usize>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor for `key`, inserted empty on first access
    pub fn entry(&mut self, key: TypeKey) -> &mut TypeDescriptor {
        let position = match self.index.get(&key) {
            Some(position) => *position,
            None => {
                self.descriptors.push(TypeDescriptor::new(key));
                let position = self.descriptors.len() - 1;
                self.index.insert(key, position);
                position
            }
        };
        &mut self.descriptors[position]
    }

    pub fn get(&self, key: &TypeKey) -> Option<&TypeDescriptor> {
        self.index.get(key).map(|position| &self.descriptors[*position])
    }

    /// Find a descriptor by full or short type name
    pub fn find_by_name(&self, name: &str) -> Vec<&TypeDescriptor> {
        self.descriptors
            .iter()
            .filter(|descriptor| descriptor.key.matches_name(name))
            .collect()
    }

    /// Concrete types declaring `capability`, in declaration order
    pub fn with_capability(&self, capability: Capability) -> impl Iterator<Item = &TypeDescriptor> {
        self.descriptors
            .iter()
            .filter(move |descriptor| !descriptor.is_kind && descriptor.has_capability(capability))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Fluent declaration handle returned by `Container::declare`
pub struct TypeDeclaration<'a> {
    descriptor: &'a mut TypeDescriptor,
}

impl<'a> TypeDeclaration<'a> {
    pub(crate) fn new(descriptor: &'a mut TypeDescriptor) -> Self {
        Self { descriptor }
    }

    /// Declare that the type derives from the kind `K`
    pub fn derives_from<K: ?Sized + 'static>(self) -> Self {
        let kind = TypeKey::of::<K>();
        if !self.descriptor.kinds.contains(&kind) {
            self.descriptor.kinds.push(kind);
        }
        self
    }

    pub fn with_capability(self, capability: Capability) -> Self {
        self.descriptor.capabilities.insert(capability);
        self
    }

    pub fn tickable(self) -> Self {
        self.with_capability(Capability::Tick)
    }

    pub fn fixed_tickable(self) -> Self {
        self.with_capability(Capability::FixedTick)
    }

    pub fn late_tickable(self) -> Self {
        self.with_capability(Capability::LateTick)
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &*self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait PhysicsSystem {}
    struct RigidBodies;
    struct Cloth;

    #[test]
    fn test_entry_is_created_once() {
        let mut registry = TypeRegistry::new();
        registry.entry(TypeKey::of::<RigidBodies>()).capabilities.insert(Capability::Tick);
        registry.entry(TypeKey::of::<RigidBodies>()).capabilities.insert(Capability::LateTick);

        assert_eq!(registry.len(), 1);
        let descriptor = registry.get(&TypeKey::of::<RigidBodies>()).unwrap();
        assert!(descriptor.has_capability(Capability::Tick));
        assert!(descriptor.has_capability(Capability::LateTick));
        assert!(!descriptor.has_capability(Capability::FixedTick));
    }

    #[test]
    fn test_declaration_records_kinds() {
        let mut registry = TypeRegistry::new();
        TypeDeclaration::new(registry.entry(TypeKey::of::<RigidBodies>()))
            .derives_from::<dyn PhysicsSystem>()
            .derives_from::<dyn PhysicsSystem>()
            .fixed_tickable();

        let descriptor = registry.get(&TypeKey::of::<RigidBodies>()).unwrap();
        assert_eq!(descriptor.kinds, vec![TypeKey::of::<dyn PhysicsSystem>()]);
        assert!(descriptor.derives_from_or_equal(&TypeKey::of::<dyn PhysicsSystem>()));
        assert!(descriptor.derives_from_or_equal(&TypeKey::of::<RigidBodies>()));
        assert!(!descriptor.derives_from_or_equal(&TypeKey::of::<Cloth>()));
    }

    #[test]
    fn test_capability_scan_skips_kinds() {
        let mut registry = TypeRegistry::new();
        registry.entry(TypeKey::of::<RigidBodies>()).capabilities.insert(Capability::Tick);
        let kind = registry.entry(TypeKey::of::<dyn PhysicsSystem>());
        kind.capabilities.insert(Capability::Tick);
        kind.is_kind = true;

        let tickables: Vec<_> = registry
            .with_capability(Capability::Tick)
            .map(|descriptor| descriptor.key)
            .collect();
        assert_eq!(tickables, vec![TypeKey::of::<RigidBodies>()]);
        assert_eq!(registry.find_by_name("RigidBodies").len(), 1);
    }

    #[test]
    fn test_binding_ids_are_distinct_per_capability() {
        assert_eq!(Capability::Tick.binding_id(), None);
        assert_eq!(Capability::FixedTick.binding_id(), Some("Fixed"));
        assert_eq!(Capability::LateTick.binding_id(), Some("Late"));
        assert_eq!(Capability::LateTick.to_string(), "LateTick");
    }
}
