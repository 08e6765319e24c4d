use crate::config::RuntimeConfig;
use crate::container::{Capability, Container, Resolver, TypeDescriptor, TypeKey};
use crate::errors::CoreError;

/// Priority assigned to a type (or to every type deriving from a kind) for
/// one scheduler. Lower values dispatch earlier; unlisted types use 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityOverride {
    pub target: TypeKey,
    pub priority: i32,
}

impl PriorityOverride {
    pub fn new(target: TypeKey, priority: i32) -> Self {
        Self { target, priority }
    }
}

/// Priority overrides in effect for one scheduler
#[derive(Debug, Clone)]
pub struct PriorityTable {
    capability: Capability,
    overrides: Vec<PriorityOverride>,
}

impl PriorityTable {
    pub fn new(capability: Capability) -> Self {
        Self {
            capability,
            overrides: Vec::new(),
        }
    }

    pub fn from_overrides(capability: Capability, overrides: Vec<PriorityOverride>) -> Self {
        Self {
            capability,
            overrides,
        }
    }

    /// Collect the overrides bound for `capability` and merge the ones
    /// configured by type name. A configured entry replaces a bound one
    /// for the same type.
    pub fn gather(
        resolver: &mut Resolver<'_>,
        capability: Capability,
        config: Option<&RuntimeConfig>,
    ) -> Result<Self, CoreError> {
        let bound = resolver.try_resolve_all_id::<PriorityOverride>(capability.binding_id())?;
        let mut table = Self::from_overrides(capability, bound.iter().map(|entry| **entry).collect());

        if let Some(config) = config {
            let container = resolver.container();
            for (name, priority) in config.priorities.for_capability(capability) {
                let target = lookup_type(container, name, capability)?;
                table.overrides.retain(|entry| entry.target != target);
                table.overrides.push(PriorityOverride::new(target, *priority));
            }
        }

        Ok(table)
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    /// Every override must name a type declared with this table's capability
    pub fn validate(&self, container: &Container) -> Result<(), CoreError> {
        for entry in &self.overrides {
            let capable = container
                .describe(&entry.target)
                .is_some_and(|descriptor| descriptor.has_capability(self.capability));
            if !capable {
                return Err(CoreError::configuration(format!(
                    "Expected type '{}' to be declared {} while checking priorities",
                    entry.target, self.capability
                )));
            }
        }
        Ok(())
    }

    /// Effective priority for a concrete type.
    ///
    /// An override naming the type itself wins over kind overrides. Distinct
    /// priorities applying at the same level are a configuration error.
    pub fn priority_for(&self, key: TypeKey, descriptor: Option<&TypeDescriptor>) -> Result<i32, CoreError> {
        let exact = distinct(self.overrides.iter().filter(|entry| entry.target == key));
        match exact.as_slice() {
            [priority] => return Ok(*priority),
            [] => {}
            _ => return Err(self.ambiguous(key)),
        }

        let Some(descriptor) = descriptor else {
            return Ok(0);
        };
        let inherited = distinct(
            self.overrides
                .iter()
                .filter(|entry| descriptor.kinds.contains(&entry.target)),
        );
        match inherited.as_slice() {
            [] => Ok(0),
            [priority] => Ok(*priority),
            _ => Err(self.ambiguous(key)),
        }
    }

    fn ambiguous(&self, key: TypeKey) -> CoreError {
        CoreError::configuration(format!(
            "Found multiple {} priorities matching type '{}'",
            self.capability, key
        ))
    }
}

fn distinct<'a>(entries: impl Iterator<Item = &'a PriorityOverride>) -> Vec<i32> {
    let mut priorities: Vec<i32> = entries.map(|entry| entry.priority).collect();
    priorities.sort_unstable();
    priorities.dedup();
    priorities
}

fn lookup_type(container: &Container, name: &str, capability: Capability) -> Result<TypeKey, CoreError> {
    let matches = container.describe_by_name(name);
    match matches.as_slice() {
        [descriptor] => Ok(descriptor.key),
        [] => Err(CoreError::configuration(format!(
            "{} priority configured for unknown type '{}'",
            capability, name
        ))),
        _ => Err(CoreError::configuration(format!(
            "{} priority type name '{}' matches {} declared types",
            capability,
            name,
            matches.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Physics;
    struct Renderer;
    trait Simulation {}

    fn descriptor_with_kind() -> TypeDescriptor {
        let mut descriptor = TypeDescriptor::new(TypeKey::of::<Physics>());
        descriptor.kinds.push(TypeKey::of::<dyn Simulation>());
        descriptor
    }

    #[test]
    fn test_unlisted_type_defaults_to_zero() {
        let table = PriorityTable::new(Capability::Tick);
        assert_eq!(table.priority_for(TypeKey::of::<Physics>(), None).unwrap(), 0);
    }

    #[test]
    fn test_kind_override_applies_to_derived_types() {
        let table = PriorityTable::from_overrides(
            Capability::Tick,
            vec![PriorityOverride::new(TypeKey::of::<dyn Simulation>(), -5)],
        );
        let descriptor = descriptor_with_kind();
        assert_eq!(
            table.priority_for(TypeKey::of::<Physics>(), Some(&descriptor)).unwrap(),
            -5
        );
        assert_eq!(table.priority_for(TypeKey::of::<Renderer>(), None).unwrap(), 0);
    }

    #[test]
    fn test_exact_override_wins_over_kind() {
        let table = PriorityTable::from_overrides(
            Capability::Tick,
            vec![
                PriorityOverride::new(TypeKey::of::<dyn Simulation>(), -5),
                PriorityOverride::new(TypeKey::of::<Physics>(), 7),
            ],
        );
        let descriptor = descriptor_with_kind();
        assert_eq!(
            table.priority_for(TypeKey::of::<Physics>(), Some(&descriptor)).unwrap(),
            7
        );
    }

    #[test]
    fn test_duplicate_overrides_are_fatal() {
        let table = PriorityTable::from_overrides(
            Capability::LateTick,
            vec![
                PriorityOverride::new(TypeKey::of::<Physics>(), 1),
                PriorityOverride::new(TypeKey::of::<Physics>(), 2),
            ],
        );
        let error = table.priority_for(TypeKey::of::<Physics>(), None).unwrap_err();
        assert!(error.is_configuration());
        assert!(error.to_string().contains("LateTick"));
    }

    #[test]
    fn test_agreeing_kind_overrides_are_accepted() {
        trait Visible {}
        let mut descriptor = descriptor_with_kind();
        descriptor.kinds.push(TypeKey::of::<dyn Visible>());
        let table = PriorityTable::from_overrides(
            Capability::Tick,
            vec![
                PriorityOverride::new(TypeKey::of::<dyn Simulation>(), 3),
                PriorityOverride::new(TypeKey::of::<dyn Visible>(), 3),
            ],
        );
        assert_eq!(
            table.priority_for(TypeKey::of::<Physics>(), Some(&descriptor)).unwrap(),
            3
        );
    }
}
