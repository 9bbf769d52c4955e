//! One shared instance per type.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Instance = Arc<dyn Any + Send + Sync>;

static GLOBAL: Lazy<SingletonRegistry> = Lazy::new(SingletonRegistry::new);

/// Holds at most one instance of each type
///
/// The first initialiser to run wins; later `get_or_init` calls for the same
/// type return the stored instance and never run their initialiser.
/// Initialisers run under the registry's write lock and must not use the
/// registry themselves.
#[derive(Default)]
pub struct SingletonRegistry {
    instances: RwLock<HashMap<TypeId, Instance>>,
}

impl SingletonRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry, created on first use
    pub fn global() -> &'static SingletonRegistry {
        &GLOBAL
    }

    pub fn get_or_init<T, F>(&self, init: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        if let Some(existing) = self.get::<T>() {
            return existing;
        }

        let mut instances = self.instances.write();
        // another thread may have won the race for the write lock
        if let Some(existing) = instances.get(&TypeId::of::<T>()).and_then(downcast) {
            return existing;
        }
        tracing::debug!(singleton = type_name::<T>(), "creating singleton");
        let instance = Arc::new(init());
        instances.insert(TypeId::of::<T>(), Arc::clone(&instance) as Instance);
        instance
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.instances
            .read()
            .get(&TypeId::of::<T>())
            .and_then(downcast)
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.instances.read().contains_key(&TypeId::of::<T>())
    }

    /// Drop the registry's handle on `T`, returning it if present
    pub fn remove<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.instances
            .write()
            .remove(&TypeId::of::<T>())
            .and_then(|instance| downcast(&instance))
    }

    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }

    pub fn clear(&self) {
        self.instances.write().clear();
    }
}

fn downcast<T: Any + Send + Sync>(instance: &Instance) -> Option<Arc<T>> {
    Arc::clone(instance).downcast::<T>().ok()
}

impl fmt::Debug for SingletonRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingletonRegistry")
            .field("len", &self.len())
            .finish()
    }
}
