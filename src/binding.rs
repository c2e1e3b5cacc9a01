use alloc::{
    boxed::Box,
    collections::BTreeMap,
    sync::{Arc, Weak},
    vec,
    vec::Vec,
};
use core::fmt;
use parking_lot::Mutex;
use std::sync::OnceLock;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::{
    any::Instance,
    context::ContextKey,
    dependency_resolver::Dependencies,
    errors::{InstantiateErrorKind, InstantiatorErrorKind},
    injector::{Injector, InjectorInner},
    inquirer::InquirerContext,
    instantiator::{boxed_value, BoxedBeforeResolution, BoxedInstantiator, InstantiatorResult},
    provider::{Provider, ProviderKey, ProviderKind},
    scope::{Lifetime, ProvidedIn},
    token::Token,
    utils::future::BoxFuture,
};

/// Resolved, executable form of a provider.
///
/// Instances are cached per resolution context rather than per injector:
/// singleton and module lifetimes use [`ContextKey::SINGLETON`], event lifetimes
/// use the key of the caller's context. Each (binding, key) pair has its own
/// once-cell, so concurrent resolutions share a single in-flight build.
pub struct Binding {
    token: Token,
    lifetime: Lifetime,
    scope: ProvidedIn,
    deps: Vec<Token>,
    instantiator: BoxedInstantiator,
    before_resolution: Option<BoxedBeforeResolution>,
    multi: bool,
    alias: bool,
    cached: bool,
    provider: Option<ProviderKey>,
    effective_lifetime: OnceLock<Lifetime>,
    host: OnceLock<Weak<InjectorInner>>,
    instances: Mutex<BTreeMap<ContextKey, Arc<OnceCell<Instance>>>>,
}

impl Binding {
    fn new(token: Token, deps: Vec<Token>, instantiator: BoxedInstantiator) -> Self {
        let def = token.def();
        Self {
            token,
            lifetime: def.lifetime,
            scope: def.provided_in,
            deps,
            instantiator,
            before_resolution: None,
            multi: false,
            alias: false,
            cached: true,
            provider: None,
            effective_lifetime: OnceLock::new(),
            host: OnceLock::new(),
            instances: Mutex::new(BTreeMap::new()),
        }
    }

    /// Uncached binding that builds its value without dependencies on every call
    pub(crate) fn from_fn<F>(token: Token, f: F) -> Self
    where
        F: Fn() -> Result<Instance, InstantiateErrorKind> + Send + Sync + 'static,
    {
        let mut binding = Self::new(
            token,
            Vec::new(),
            Arc::new(move |_: Dependencies| -> BoxFuture<'static, InstantiatorResult> {
                let result = f().map_err(InstantiatorErrorKind::Factory);
                Box::pin(async move { result })
            }),
        );
        binding.cached = false;
        binding
    }

    #[inline]
    #[must_use]
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Lifetime declared by the token
    #[inline]
    #[must_use]
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    #[inline]
    #[must_use]
    pub fn scope(&self) -> ProvidedIn {
        self.scope
    }

    #[inline]
    #[must_use]
    pub fn dependencies(&self) -> &[Token] {
        &self.deps
    }

    #[inline]
    #[must_use]
    pub fn has_dependencies(&self) -> bool {
        !self.deps.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn is_multi(&self) -> bool {
        self.multi
    }

    /// Alias bindings forward the instance of their only dependency and never cache it
    #[inline]
    #[must_use]
    pub fn is_alias(&self) -> bool {
        self.alias
    }

    /// Whether instances are stored in the per-context cache, `false` for aliases and self-handles
    #[inline]
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.cached
    }

    #[inline]
    #[must_use]
    pub fn provider_key(&self) -> Option<ProviderKey> {
        self.provider
    }

    /// Lifetime after dependency contagion, `None` until first computed by an injector
    #[inline]
    #[must_use]
    pub fn effective_lifetime(&self) -> Option<Lifetime> {
        self.effective_lifetime.get().copied()
    }

    #[inline]
    pub(crate) fn memoize_effective_lifetime(&self, lifetime: Lifetime) -> Lifetime {
        *self.effective_lifetime.get_or_init(|| lifetime)
    }

    /// Injector of the module that declares the provider, dependencies are resolved through it
    #[must_use]
    pub fn host(&self) -> Option<Injector> {
        self.host.get().and_then(Injector::upgrade)
    }

    pub(crate) fn set_host(&self, host: &Injector) -> bool {
        self.host.set(host.downgrade()).is_ok()
    }

    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.lifetime.is_transient() || self.effective_lifetime().is_some_and(Lifetime::is_transient)
    }

    /// Cached instance for `key`, [`ContextKey::SINGLETON`] if `None`
    #[must_use]
    pub fn get_instance(&self, key: Option<ContextKey>) -> Option<Instance> {
        let key = key.unwrap_or(ContextKey::SINGLETON);
        self.instances.lock().get(&key).and_then(|cell| cell.get().cloned())
    }

    /// Overwrites the cached instance for `key`, [`ContextKey::SINGLETON`] if `None`
    pub fn set_instance(&self, instance: Instance, key: Option<ContextKey>) {
        let key = key.unwrap_or(ContextKey::SINGLETON);
        self.instances.lock().insert(key, Arc::new(OnceCell::new_with(Some(instance))));
    }

    #[must_use]
    pub(crate) fn cell(&self, key: ContextKey) -> Arc<OnceCell<Instance>> {
        self.instances.lock().entry(key).or_default().clone()
    }

    /// Drops the instance cached for `key`
    pub(crate) fn release(&self, key: ContextKey) -> bool {
        self.instances.lock().remove(&key).is_some()
    }

    /// Lets a class provider replace its resolved dependencies, other bindings pass them through
    pub(crate) async fn before_resolution(
        &self,
        injector: &Injector,
        dependencies: Dependencies,
        inquirer: &InquirerContext,
    ) -> Result<Dependencies, InstantiateErrorKind> {
        match &self.before_resolution {
            Some(hook) => hook(injector.clone(), dependencies, inquirer.clone()).await,
            None => Ok(dependencies),
        }
    }

    #[inline]
    pub(crate) async fn instantiate(&self, dependencies: Dependencies) -> InstantiatorResult {
        (self.instantiator)(dependencies).await
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("token", &self.token)
            .field("lifetime", &self.lifetime)
            .field("scope", &self.scope)
            .field("deps", &self.deps)
            .field("multi", &self.multi)
            .field("alias", &self.alias)
            .field("cached", &self.cached)
            .field("effective_lifetime", &self.effective_lifetime())
            .finish_non_exhaustive()
    }
}

/// Creates a binding for a value provider.
/// The value is stored as the singleton instance right away.
#[must_use]
pub fn create_resolved_binding(token: Token, value: Instance) -> Binding {
    let binding = Binding::new(token, Vec::new(), boxed_value(value.clone()));
    binding.set_instance(value, None);
    binding
}

/// Creates a new binding for `provider`, lifetime and scope come from the provider's token
#[must_use]
pub fn create_binding(provider: &Provider) -> Binding {
    let inner = &provider.inner;
    let mut binding = match &inner.kind {
        ProviderKind::Class {
            deps,
            instantiator,
            before_resolution,
        } => {
            let mut binding = Binding::new(inner.token.clone(), deps.clone(), instantiator.clone());
            binding.before_resolution = Some(before_resolution.clone());
            binding
        }
        ProviderKind::Factory { deps, instantiator } => Binding::new(inner.token.clone(), deps.clone(), instantiator.clone()),
        ProviderKind::Value(value) => create_resolved_binding(inner.token.clone(), value.clone()),
        ProviderKind::Existing(existing) => {
            let mut binding = Binding::new(
                inner.token.clone(),
                vec![existing.clone()],
                Arc::new(|mut dependencies: Dependencies| -> BoxFuture<'static, InstantiatorResult> {
                    let result = dependencies
                        .next_instance()
                        .map(|(_, instance)| instance)
                        .map_err(InstantiatorErrorKind::Deps);
                    Box::pin(async move { result })
                }),
            );
            binding.alias = true;
            binding.cached = false;
            binding
        }
    };
    binding.multi = inner.multi;
    binding.provider = Some(inner.key);
    binding
}

/// Creates bindings while composing a module graph.
///
/// Singleton bindings are memoized by provider declaration, so a provider
/// reached through several modules resolves to the same binding object.
#[derive(Default)]
pub(crate) struct BindingFactory {
    singletons: BTreeMap<ProviderKey, Arc<Binding>>,
    created: Vec<Arc<Binding>>,
}

impl BindingFactory {
    pub(crate) fn create_binding(&mut self, provider: &Provider) -> Arc<Binding> {
        let key = provider.key();
        if let Some(binding) = self.singletons.get(&key) {
            debug!(token = %provider.token(), "Reused singleton binding");
            return binding.clone();
        }

        let binding = Arc::new(create_binding(provider));
        if binding.lifetime() == Lifetime::Singleton && !binding.is_alias() {
            self.singletons.insert(key, binding.clone());
        }
        self.track(binding.clone());
        debug!(token = %provider.token(), lifetime = %binding.lifetime(), "Created binding");

        binding
    }

    pub(crate) fn track(&mut self, binding: Arc<Binding>) {
        self.created.push(binding);
    }

    #[must_use]
    pub(crate) fn bindings(&self) -> &[Arc<Binding>] {
        &self.created
    }

    #[must_use]
    pub(crate) fn into_bindings(self) -> Vec<Arc<Binding>> {
        self.created
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;

    use super::{create_binding, create_resolved_binding, BindingFactory};
    use crate::{context::ContextKey, InjectionToken, InstantiateErrorKind, Lifetime, Provider, ProvidedIn, Token};

    struct Service;
    struct Request;

    injectable!(Service);
    injectable!(Request, lifetime = Lifetime::Event, provided_in = ProvidedIn::Module);

    impl crate::Constructible for Service {
        type Deps = ();

        async fn construct((): ()) -> Result<Self, InstantiateErrorKind> {
            Ok(Service)
        }
    }

    impl crate::Constructible for Request {
        type Deps = ();

        async fn construct((): ()) -> Result<Self, InstantiateErrorKind> {
            Ok(Request)
        }
    }

    #[test]
    fn test_lifetime_and_scope_from_token() {
        let binding = create_binding(&Provider::class::<Request>());

        assert_eq!(binding.lifetime(), Lifetime::Event);
        assert_eq!(binding.scope(), ProvidedIn::Module);
        assert!(binding.effective_lifetime().is_none());
        assert!(!binding.has_dependencies());
    }

    #[test]
    fn test_instance_cache_keys() {
        let binding = create_binding(&Provider::class::<Service>());
        let key = ContextKey::next();

        binding.set_instance(Arc::new(Service), None);
        assert!(binding.get_instance(None).is_some());
        assert!(binding.get_instance(Some(ContextKey::SINGLETON)).is_some());
        assert!(binding.get_instance(Some(key)).is_none());

        binding.set_instance(Arc::new(Service), Some(key));
        assert!(binding.get_instance(Some(key)).is_some());
        assert!(binding.release(key));
        assert!(binding.get_instance(Some(key)).is_none());
    }

    #[test]
    fn test_resolved_binding() {
        let token = Token::from(InjectionToken::new("answer"));
        let value: crate::Instance = Arc::new(42_u32);
        let binding = create_resolved_binding(token, value.clone());

        assert!(Arc::ptr_eq(&binding.get_instance(None).unwrap(), &value));
    }

    #[test]
    fn test_factory_memoizes_singletons() {
        let mut factory = BindingFactory::default();

        let a = factory.create_binding(&Provider::class::<Service>());
        let b = factory.create_binding(&Provider::class::<Service>());
        assert!(Arc::ptr_eq(&a, &b));

        let c = factory.create_binding(&Provider::class::<Request>());
        let d = factory.create_binding(&Provider::class::<Request>());
        assert!(!Arc::ptr_eq(&c, &d));

        assert_eq!(factory.into_bindings().len(), 3);
    }

    #[test]
    fn test_alias_binding() {
        let alias = create_binding(&Provider::existing(InjectionToken::new("service"), Token::of::<Service>()).multi());

        assert!(alias.is_alias());
        assert!(!alias.is_cached());
        assert!(alias.is_multi());
        assert_eq!(alias.dependencies(), &[Token::of::<Service>()]);
    }
}
