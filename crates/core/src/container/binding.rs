use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::container::autowiring::Injectable;
use crate::container::container::Container;
use crate::container::descriptor::{ContractKey, TypeKey};
use crate::container::provider::{
    InstanceProvider, MethodProvider, Provider, ProviderMethod, SingletonProvider, Upcast,
};
use crate::container::resolver::{erase, AnyInstance, Resolver};
use crate::errors::CoreError;

/// Per-container mapping from contract keys to their providers.
///
/// Providers under one key keep their registration order, which is the
/// order collection lookups return them in.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    bindings: HashMap<ContractKey, Vec<Provider>>,
    order: Vec<ContractKey>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: ContractKey, provider: Provider) {
        let providers = self.bindings.entry(key.clone()).or_default();
        if providers.is_empty() && !self.order.contains(&key) {
            self.order.push(key);
        }
        providers.push(provider);
    }

    pub fn get(&self, key: &ContractKey) -> Option<&[Provider]> {
        self.bindings.get(key).map(Vec::as_slice)
    }

    /// Remove every provider bound to `key`, returning how many were removed
    pub fn remove(&mut self, key: &ContractKey) -> usize {
        self.order.retain(|existing| existing != key);
        self.bindings.remove(key).map(|providers| providers.len()).unwrap_or(0)
    }

    pub fn contains(&self, key: &ContractKey) -> bool {
        self.bindings.get(key).is_some_and(|providers| !providers.is_empty())
    }

    /// Bound keys in first-registration order
    pub fn keys(&self) -> impl Iterator<Item = &ContractKey> {
        self.order.iter()
    }

    /// Total number of providers across all keys
    pub fn count(&self) -> usize {
        self.bindings.values().map(Vec::len).sum()
    }
}

/// Fluent builder finishing a binding for the contract `T`
pub struct BindingBuilder<'a, T: ?Sized + Send + Sync + 'static> {
    container: &'a mut Container,
    key: ContractKey,
    _contract: PhantomData<fn(&T)>,
}

impl<'a, T: ?Sized + Send + Sync + 'static> BindingBuilder<'a, T> {
    pub(crate) fn new(container: &'a mut Container, key: ContractKey) -> Self {
        Self {
            container,
            key,
            _contract: PhantomData,
        }
    }

    pub fn key(&self) -> &ContractKey {
        &self.key
    }

    /// Bind to an existing value
    pub fn to_instance(self, instance: Arc<T>) -> Result<(), CoreError> {
        let provider = Provider::Instance(InstanceProvider::new(erase(instance), TypeKey::of::<T>()));
        self.container.add_provider(self.key, provider)
    }

    /// Bind to an existing value of the concrete type `C`.
    ///
    /// Use this over `to_instance` for trait contracts: the provider then
    /// reports `C` as its instance type, which priorities and capability
    /// checks are keyed by.
    pub fn to_instance_of<C: Send + Sync + 'static>(
        self,
        instance: Arc<C>,
        cast: fn(Arc<C>) -> Arc<T>,
    ) -> Result<(), CoreError> {
        let provider = Provider::Instance(InstanceProvider::new(erase(cast(instance)), TypeKey::of::<C>()));
        self.container.add_provider(self.key, provider)
    }

    /// Bind to a factory method producing the concrete type `C` on every request
    pub fn to_method_of<C, F>(self, method: F, cast: fn(Arc<C>) -> Arc<T>) -> Result<(), CoreError>
    where
        C: Send + Sync + 'static,
        F: Fn(&mut Resolver<'_>) -> Result<Arc<C>, CoreError> + Send + Sync + 'static,
    {
        let erased: ProviderMethod = Arc::new(move |resolver| Ok(Some(erase::<T>(cast(method(resolver)?)))));
        let provider = Provider::Method(MethodProvider::new(erased, TypeKey::of::<C>()));
        self.container.add_provider(self.key, provider)
    }

    /// Bind to a factory method invoked on every request
    pub fn to_method<F>(self, method: F) -> Result<(), CoreError>
    where
        F: Fn(&mut Resolver<'_>) -> Result<Arc<T>, CoreError> + Send + Sync + 'static,
    {
        self.to_method_optional(move |resolver| method(resolver).map(Some))
    }

    /// Bind to a factory method that may produce nothing.
    ///
    /// Producing `None` fails the request with `NullProduction`.
    pub fn to_method_optional<F>(self, method: F) -> Result<(), CoreError>
    where
        F: Fn(&mut Resolver<'_>) -> Result<Option<Arc<T>>, CoreError> + Send + Sync + 'static,
    {
        let erased: ProviderMethod =
            Arc::new(move |resolver| Ok(method(resolver)?.map(erase::<T>)));
        let provider = Provider::Method(MethodProvider::new(erased, TypeKey::of::<T>()));
        self.container.add_provider(self.key, provider)
    }

    /// Bind to the shared singleton of `C`, built through `C::create`
    pub fn to_single_with<C: Injectable>(self, cast: fn(Arc<C>) -> Arc<T>) -> Result<(), CoreError> {
        let slot = self.container.singleton_slot::<C>();
        slot.set_default_creator(injectable_creator::<C>);
        self.finish_singleton::<C>(slot, Some(cast))
    }

    /// Bind to the shared singleton of `C`, built by `method`
    pub fn to_single_method_with<C, F>(self, method: F, cast: fn(Arc<C>) -> Arc<T>) -> Result<(), CoreError>
    where
        C: Send + Sync + 'static,
        F: Fn(&mut Resolver<'_>) -> Result<C, CoreError> + Send + Sync + 'static,
    {
        let slot = self.container.singleton_slot::<C>();
        slot.set_creator(method_creator::<C, F>(method))?;
        self.finish_singleton::<C>(slot, Some(cast))
    }

    /// Bind to the shared singleton of `C` whose creation method is supplied
    /// by another binding of the same concrete type
    pub fn to_shared_single_with<C: Send + Sync + 'static>(
        self,
        cast: fn(Arc<C>) -> Arc<T>,
    ) -> Result<(), CoreError> {
        let slot = self.container.singleton_slot::<C>();
        self.finish_singleton::<C>(slot, Some(cast))
    }

    fn finish_singleton<C: Send + Sync + 'static>(
        self,
        slot: Arc<crate::container::provider::SingletonSlot>,
        cast: Option<fn(Arc<C>) -> Arc<T>>,
    ) -> Result<(), CoreError> {
        let upcast: Option<Upcast> = cast.map(|cast| {
            let upcast: Upcast = Arc::new(move |instance: &AnyInstance| {
                instance
                    .downcast_ref::<Arc<C>>()
                    .map(|concrete| erase::<T>(cast(concrete.clone())))
            });
            upcast
        });
        let provider = Provider::Singleton(SingletonProvider::new(slot, upcast));
        self.container.add_provider(self.key, provider)
    }
}

impl<'a, T: Send + Sync + 'static> BindingBuilder<'a, T> {
    /// Bind to the shared singleton of `T` itself, built through `T::create`
    pub fn to_single(self) -> Result<(), CoreError>
    where
        T: Injectable,
    {
        let slot = self.container.singleton_slot::<T>();
        slot.set_default_creator(injectable_creator::<T>);
        self.finish_singleton::<T>(slot, None)
    }

    /// Bind to the shared singleton of `T`, built once by `method`
    pub fn to_single_method<F>(self, method: F) -> Result<(), CoreError>
    where
        F: Fn(&mut Resolver<'_>) -> Result<T, CoreError> + Send + Sync + 'static,
    {
        let slot = self.container.singleton_slot::<T>();
        slot.set_creator(method_creator::<T, F>(method))?;
        self.finish_singleton::<T>(slot, None)
    }

    /// Bind to a pre-built singleton shared with every other binding of `T`
    pub fn to_single_instance(self, instance: Arc<T>) -> Result<(), CoreError> {
        let slot = self.container.singleton_slot::<T>();
        slot.set_creator(Provider::Instance(InstanceProvider::new(
            erase(instance),
            TypeKey::of::<T>(),
        )))?;
        self.finish_singleton::<T>(slot, None)
    }
}

fn injectable_creator<C: Injectable>() -> Provider {
    let method: ProviderMethod =
        Arc::new(|resolver| Ok(Some(erase(Arc::new(C::create(resolver)?)))));
    Provider::Method(
        MethodProvider::new(method, TypeKey::of::<C>()).with_dependencies(C::dependencies()),
    )
}

fn method_creator<C, F>(method: F) -> Provider
where
    C: Send + Sync + 'static,
    F: Fn(&mut Resolver<'_>) -> Result<C, CoreError> + Send + Sync + 'static,
{
    let method: ProviderMethod =
        Arc::new(move |resolver| Ok(Some(erase(Arc::new(method(resolver)?)))));
    Provider::Method(MethodProvider::new(method, TypeKey::of::<C>()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Clock;

    fn instance_provider() -> Provider {
        Provider::Instance(InstanceProvider::new(
            erase(Arc::new(Clock)),
            TypeKey::of::<Clock>(),
        ))
    }

    #[test]
    fn test_registry_keeps_registration_order() {
        let mut registry = BindingRegistry::new();
        registry.add(ContractKey::with_id::<Clock>("b"), instance_provider());
        registry.add(ContractKey::with_id::<Clock>("a"), instance_provider());
        registry.add(ContractKey::with_id::<Clock>("b"), instance_provider());

        let keys: Vec<_> = registry.keys().map(|key| key.id.clone()).collect();
        assert_eq!(keys, vec![Some("b".to_string()), Some("a".to_string())]);
        assert_eq!(registry.count(), 3);
        assert_eq!(registry.get(&ContractKey::with_id::<Clock>("b")).unwrap().len(), 2);
    }

    #[test]
    fn test_registry_remove() {
        let mut registry = BindingRegistry::new();
        let key = ContractKey::of::<Clock>();
        registry.add(key.clone(), instance_provider());
        registry.add(key.clone(), instance_provider());

        assert!(registry.contains(&key));
        assert_eq!(registry.remove(&key), 2);
        assert!(!registry.contains(&key));
        assert_eq!(registry.remove(&key), 0);
        assert_eq!(registry.keys().count(), 0);
    }
}
