use alloc::{collections::BTreeMap, sync::Arc};
use core::sync::atomic::{AtomicU64, Ordering};

use crate::{
    any::Instance,
    token::{Injectable, Token},
};

static NEXT_CONTEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of an event context.
///
/// Event-scoped instances are cached per key until the key is released
/// with [`crate::ModuleRef::release_context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextKey(u64);

impl ContextKey {
    /// Key used by singleton and module-lifetime instances
    pub const SINGLETON: ContextKey = ContextKey(0);

    #[inline]
    #[must_use]
    pub(crate) fn next() -> Self {
        Self(NEXT_CONTEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Per-event resolution context.
///
/// Resolves `ProvidedIn::Ctx` tokens and keys the cache of event-scoped instances.
/// Clones share the key, so they address the same event.
#[derive(Clone)]
pub struct Context {
    key: ContextKey,
    pub(crate) map: BTreeMap<Token, Instance>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            key: ContextKey::next(),
            map: BTreeMap::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> ContextKey {
        self.key
    }

    #[inline]
    pub fn insert<T: Injectable>(&mut self, value: T) -> Option<Arc<T>> {
        self.insert_rc(Arc::new(value))
    }

    #[inline]
    pub fn insert_rc<T: Injectable>(&mut self, value: Arc<T>) -> Option<Arc<T>> {
        self.map
            .insert(Token::of::<T>(), value)
            .and_then(|boxed| boxed.downcast().ok())
    }

    #[inline]
    pub fn insert_token(&mut self, token: impl Into<Token>, value: Instance) -> Option<Instance> {
        self.map.insert(token.into(), value)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, token: &Token) -> Option<Instance> {
        self.map.get(token).cloned()
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, token: &Token) -> bool {
        self.map.contains_key(token)
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;

    use super::{Context, ContextKey};
    use crate::{InjectionToken, Token};

    struct Message(&'static str);

    injectable!(Message);

    #[test]
    fn test_insert_and_get() {
        let mut context = Context::new();
        assert!(context.insert(Message("first")).is_none());

        let previous = context.insert(Message("second")).unwrap();
        assert_eq!(previous.0, "first");

        let message = context.get(&Token::of::<Message>()).unwrap().downcast::<Message>().unwrap();
        assert_eq!(message.0, "second");
    }

    #[test]
    fn test_insert_token() {
        let channel = InjectionToken::new("channel");
        let mut context = Context::new();
        context.insert_token(&channel, Arc::new(42_u32));

        assert!(context.contains(&Token::from(&channel)));
        assert!(!context.contains(&Token::from(InjectionToken::new("channel"))));
    }

    #[test]
    fn test_keys() {
        let context = Context::new();

        assert_ne!(context.key(), ContextKey::SINGLETON);
        assert_ne!(context.key(), Context::new().key());
        assert_eq!(context.clone().key(), context.key());
    }
}
