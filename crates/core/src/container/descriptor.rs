use std::any::TypeId;
use std::fmt;

/// Identity of a Rust type, usable for sized types and trait objects alike
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl TypeKey {
    pub fn of<T: 'static + ?Sized>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Get the full type name as a string
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Type name without its module path, e.g. `Physics` for `game::systems::Physics`.
    ///
    /// Generic arguments are kept intact and trait objects keep their full name.
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.type_name)
    }

    /// Whether `name` refers to this type, either by full or by short name
    pub fn matches_name(&self, name: &str) -> bool {
        self.type_name == name || self.short_name() == name
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    // Trait objects keep their full path, `dyn` cannot be sliced off a &'static str
    if full.starts_with("dyn ") {
        return full;
    }

    let head_end = full.find('<').unwrap_or(full.len());
    match full[..head_end].rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

/// Binding slot identifier: contract type plus an optional identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContractKey {
    pub contract: TypeKey,
    pub id: Option<String>,
}

impl ContractKey {
    /// Create a contract key for a type
    pub fn of<T: 'static + ?Sized>() -> Self {
        Self {
            contract: TypeKey::of::<T>(),
            id: None,
        }
    }

    /// Create an identified contract key for a type
    pub fn with_id<T: 'static + ?Sized>(id: impl Into<String>) -> Self {
        Self {
            contract: TypeKey::of::<T>(),
            id: Some(id.into()),
        }
    }

    pub(crate) fn from_parts<T: 'static + ?Sized>(id: Option<&str>) -> Self {
        Self {
            contract: TypeKey::of::<T>(),
            id: id.map(str::to_string),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.contract.type_name
    }
}

impl fmt::Display for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({})",
            self.contract.short_name(),
            self.id.as_deref().unwrap_or("default")
        )
    }
}
