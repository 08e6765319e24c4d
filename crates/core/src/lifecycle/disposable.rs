use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::container::{Capability, Injectable, Resolver, TypeKey};
use crate::errors::CoreError;
use crate::foundation::Disposable;
use crate::lifecycle::initializable::prioritized;

/// Runs every bound `dyn Disposable` once, in priority order.
///
/// A failing component is logged and the remaining ones still run.
pub struct DisposableManager {
    disposables: Vec<(Arc<dyn Disposable>, TypeKey)>,
    disposed: AtomicBool,
}

impl DisposableManager {
    pub fn new(disposables: Vec<(Arc<dyn Disposable>, TypeKey)>) -> Self {
        Self {
            disposables,
            disposed: AtomicBool::new(false),
        }
    }

    /// Dispose all components and return the number that failed
    pub fn dispose(&self) -> usize {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return 0;
        }

        let mut failures = 0;
        for (disposable, type_key) in &self.disposables {
            if let Err(error) = disposable.dispose() {
                failures += 1;
                tracing::error!(component = type_key.short_name(), error = %error, "Dispose failed");
            }
        }

        tracing::info!(count = self.disposables.len(), failures, "Disposables completed");
        failures
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.disposables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.disposables.is_empty()
    }
}

impl Injectable for DisposableManager {
    fn create(resolver: &mut Resolver<'_>) -> Result<Self, CoreError> {
        Ok(Self::new(prioritized::<dyn Disposable>(resolver, Capability::Dispose)?))
    }
}
