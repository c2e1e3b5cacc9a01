use alloc::{
    collections::BTreeMap,
    sync::{Arc, Weak},
    vec::Vec,
};
use parking_lot::RwLock;
use tracing::debug;

use crate::{
    binding::Binding,
    context::ContextKey,
    module::ModuleId,
    module_ref::{ModuleRef, ModuleRefInner},
};

/// Registry of a resolved module graph: every module reference and every binding created for it
#[derive(Default)]
pub struct ModuleContainer {
    modules: RwLock<BTreeMap<ModuleId, Weak<ModuleRefInner>>>,
    bindings: RwLock<Vec<Arc<Binding>>>,
}

impl ModuleContainer {
    #[inline]
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, module: &ModuleRef) {
        self.modules.write().insert(module.id(), module.downgrade());
    }

    pub(crate) fn set_bindings(&self, bindings: Vec<Arc<Binding>>) {
        *self.bindings.write() = bindings;
    }

    /// Reference of `module`, `None` if it isn't part of the graph or the graph was dropped
    #[must_use]
    pub fn get(&self, module: &ModuleId) -> Option<ModuleRef> {
        self.modules.read().get(module).and_then(ModuleRef::upgrade)
    }

    #[must_use]
    pub fn contains(&self, module: &ModuleId) -> bool {
        self.modules.read().contains_key(module)
    }

    /// Ids of the resolved modules
    #[must_use]
    pub fn modules(&self) -> Vec<ModuleId> {
        self.modules.read().keys().copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.read().is_empty()
    }

    /// Bindings created while composing the graph, in creation order
    #[must_use]
    pub fn bindings(&self) -> Vec<Arc<Binding>> {
        self.bindings.read().clone()
    }

    /// Drops the instances cached for `key` in every binding, returns how many were dropped
    pub fn release_context(&self, key: ContextKey) -> usize {
        if key == ContextKey::SINGLETON {
            debug!("Singleton instances can't be released");
            return 0;
        }

        let released = self.bindings.read().iter().filter(|binding| binding.release(key)).count();
        debug!(key = key.get(), released, "Context released");
        released
    }
}

impl core::fmt::Debug for ModuleContainer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModuleContainer")
            .field("modules", &self.modules())
            .field("bindings", &self.bindings.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use alloc::{sync::Arc, vec};
    use tracing_test::traced_test;

    use super::ModuleContainer;
    use crate::{binding::create_resolved_binding, Context, ContextKey, InjectionToken, Token};

    #[test]
    #[traced_test]
    fn test_release_context() {
        let container = ModuleContainer::new();
        let first = Context::new();
        let second = Context::new();

        let bindings = vec![
            Arc::new(create_resolved_binding(Token::from(&InjectionToken::new("a")), Arc::new(1_u8))),
            Arc::new(create_resolved_binding(Token::from(&InjectionToken::new("b")), Arc::new(2_u8))),
        ];
        for binding in &bindings {
            binding.set_instance(Arc::new(0_u8), Some(first.key()));
        }
        bindings[0].set_instance(Arc::new(0_u8), Some(second.key()));
        container.set_bindings(bindings.clone());

        assert_eq!(container.release_context(ContextKey::SINGLETON), 0);
        assert!(bindings.iter().all(|binding| binding.get_instance(None).is_some()));

        assert_eq!(container.release_context(first.key()), 2);
        assert_eq!(container.release_context(first.key()), 0);
        assert!(bindings[0].get_instance(Some(second.key())).is_some());
        assert_eq!(container.release_context(second.key()), 1);

        assert!(container.is_empty());
        assert_eq!(container.bindings().len(), 2);
    }
}
