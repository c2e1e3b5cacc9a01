use alloc::{
    boxed::Box,
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Weak},
    vec::Vec,
};
use core::{any::type_name, fmt};
use tracing::{debug, debug_span, error, Instrument as _};

use crate::{
    any::{Instance, Instances},
    binding::Binding,
    bloom::BloomFilter,
    config::Config,
    context::{Context, ContextKey},
    dependency_resolver::Dependencies,
    errors::{CyclePath, InstantiateErrorKind, InstantiatorErrorKind, ResolveErrorKind},
    inquirer::InquirerContext,
    module::ModuleId,
    scope::{Lifetime, ProvidedIn},
    token::{Injectable, Token},
    utils::future::BoxFuture,
};

/// Bindings of one token inside an injector
#[derive(Debug, Clone)]
pub(crate) enum Record {
    Single(Arc<Binding>),
    /// Multi bindings in declaration order
    Multi(Vec<Arc<Binding>>),
}

impl Record {
    fn bindings(&self) -> &[Arc<Binding>] {
        match self {
            Record::Single(binding) => core::slice::from_ref(binding),
            Record::Multi(bindings) => bindings,
        }
    }
}

/// Optional arguments of [`Injector::get_with`]
#[derive(Default, Clone)]
pub struct ResolveOptions<'a> {
    pub not_found: Option<Instance>,
    pub context: Option<&'a Context>,
    pub inquirer: Option<InquirerContext>,
}

impl<'a> ResolveOptions<'a> {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value returned instead of [`ResolveErrorKind::TokenNotFound`]
    #[inline]
    #[must_use]
    pub fn not_found(mut self, value: Instance) -> Self {
        self.not_found = Some(value);
        self
    }

    #[inline]
    #[must_use]
    pub fn context(mut self, context: &'a Context) -> Self {
        self.context = Some(context);
        self
    }

    #[inline]
    #[must_use]
    pub fn inquirer(mut self, inquirer: InquirerContext) -> Self {
        self.inquirer = Some(inquirer);
        self
    }
}

/// Per-call resolution state shared by the whole dependency path
#[derive(Clone, Copy)]
struct Request<'a> {
    context: Option<&'a Context>,
    inquirer: Option<&'a InquirerContext>,
    path: &'a [Token],
}

pub(crate) struct InjectorInner {
    parent: Option<Injector>,
    module: Option<ModuleId>,
    is_component: bool,
    records: BTreeMap<Token, Record>,
    filter: Option<BloomFilter>,
    config: Config,
}

/// Scope container of one module or component.
///
/// Resolves a token through its own bindings first, then through its parent chain.
/// Cheap to clone, clones share the bindings.
#[derive(Clone)]
pub struct Injector {
    inner: Arc<InjectorInner>,
}

injectable!(Injector);

impl Injector {
    /// Creates an injector that also binds [`Injector`] to itself.
    ///
    /// Bindings are applied in order: a non-multi binding replaces the previous record of its token,
    /// multi bindings accumulate.
    pub(crate) fn new(
        parent: Option<Injector>,
        module: Option<ModuleId>,
        is_component: bool,
        config: Config,
        bindings: impl IntoIterator<Item = Arc<Binding>>,
    ) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<InjectorInner>| {
            let weak = weak.clone();
            let handle = Binding::from_fn(Token::of::<Injector>(), move || {
                weak.upgrade()
                    .map(|inner| Arc::new(Injector { inner }) as Instance)
                    .ok_or_else(dropped_handle::<Injector>)
            });

            let mut records = BTreeMap::new();
            for binding in core::iter::once(Arc::new(handle)).chain(bindings) {
                insert_record(&mut records, binding);
            }
            let filter = config.bloom_filter.then(|| records.keys().collect());

            InjectorInner {
                parent,
                module,
                is_component,
                records,
                filter,
                config,
            }
        });

        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<InjectorInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<InjectorInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<&Injector> {
        self.inner.parent.as_ref()
    }

    /// Module the injector belongs to, `None` for the application injector
    #[inline]
    #[must_use]
    pub fn module(&self) -> Option<ModuleId> {
        self.inner.module
    }

    #[inline]
    #[must_use]
    pub fn is_component(&self) -> bool {
        self.inner.is_component
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> Config {
        self.inner.config
    }

    /// Whether `token` is bound by this injector itself
    #[must_use]
    pub fn contains(&self, token: &Token) -> bool {
        self.local(token).is_some()
    }

    /// Bindings of `token` in this injector, in declaration order
    #[must_use]
    pub fn bindings(&self, token: &Token) -> Vec<Arc<Binding>> {
        self.local(token).map(|record| record.bindings().to_vec()).unwrap_or_default()
    }

    fn local(&self, token: &Token) -> Option<&Record> {
        if let Some(filter) = &self.inner.filter {
            if !filter.might_contain(token) {
                return None;
            }
        }
        self.inner.records.get(token)
    }

    /// Module-provided tokens don't escape the module injector that declares them
    fn terminates(&self, token: &Token) -> bool {
        let Some(module) = self.inner.module else {
            return false;
        };
        if self.inner.is_component {
            return false;
        }
        match token.provided_in() {
            ProvidedIn::Module => true,
            ProvidedIn::In(target) => target == module,
            ProvidedIn::Root | ProvidedIn::Ctx => false,
        }
    }

    /// Injector in the chain that binds `token`, with its record
    fn find<'a>(&'a self, token: &Token) -> Option<(&'a Injector, &'a Record)> {
        let mut current = self;
        loop {
            if let Some(record) = current.local(token) {
                return Some((current, record));
            }
            if current.terminates(token) {
                debug!(module = ?current.module(), "Module-scoped token not found in its module");
                return None;
            }
            current = current.parent()?;
            debug!("No binding found, trying parent injector");
        }
    }

    /// Resolves `token` through this injector chain
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::TokenNotFound`] if no injector in the chain binds the token
    /// - Returns [`ResolveErrorKind::InvalidContextResolution`] if the token is context-bound
    /// - Returns other [`ResolveErrorKind`] variants if a dependency or build function fails
    pub async fn get(&self, token: &Token) -> Result<Instance, ResolveErrorKind> {
        self.get_with(token, ResolveOptions::default()).await
    }

    /// Resolves `token`, returning `not_found` if no injector in the chain binds it
    ///
    /// # Errors
    /// Returns [`ResolveErrorKind`] if resolution of a bound token fails
    pub async fn get_or(&self, token: &Token, not_found: Instance) -> Result<Instance, ResolveErrorKind> {
        self.get_with(token, ResolveOptions::default().not_found(not_found)).await
    }

    /// Resolves `token` with an optional fallback value, event context and inquirer
    ///
    /// # Errors
    /// See [`Self::get`]
    pub async fn get_with(&self, token: &Token, options: ResolveOptions<'_>) -> Result<Instance, ResolveErrorKind> {
        let span = debug_span!("get", token = %token);
        let ResolveOptions {
            not_found,
            context,
            inquirer,
        } = options;
        let request = Request {
            context,
            inquirer: inquirer.as_ref(),
            path: &[],
        };

        self.lookup(token, not_found, request).instrument(span).await
    }

    /// Resolves `T` and downcasts it
    ///
    /// # Errors
    /// See [`Self::get`]. Returns [`ResolveErrorKind::IncorrectType`] if the instance isn't a `T`.
    pub async fn resolve<T: Injectable>(&self) -> Result<Arc<T>, ResolveErrorKind> {
        let token = Token::of::<T>();
        let instance = self.get(&token).await?;
        downcast(&token, instance)
    }

    /// Resolves `T` with an event context
    ///
    /// # Errors
    /// See [`Self::resolve`]
    pub async fn resolve_in<T: Injectable>(&self, context: &Context) -> Result<Arc<T>, ResolveErrorKind> {
        let token = Token::of::<T>();
        let instance = self.get_with(&token, ResolveOptions::default().context(context)).await?;
        downcast(&token, instance)
    }

    /// Resolves every instance contributed to `T`, a non-multi binding yields one instance
    ///
    /// # Errors
    /// See [`Self::resolve`]
    pub async fn resolve_all<T: Injectable>(&self) -> Result<Vec<Arc<T>>, ResolveErrorKind> {
        let token = Token::of::<T>();
        let instance = self.get(&token).await?;
        match instance.downcast::<Instances>() {
            Ok(instances) => instances.downcast(&token),
            Err(instance) => downcast(&token, instance).map(|instance| alloc::vec![instance]),
        }
    }

    fn lookup<'a>(
        &'a self,
        token: &'a Token,
        not_found: Option<Instance>,
        request: Request<'a>,
    ) -> BoxFuture<'a, Result<Instance, ResolveErrorKind>> {
        Box::pin(async move {
            if token.provided_in() == ProvidedIn::Ctx {
                let Some(context) = request.context else {
                    let err = ResolveErrorKind::InvalidContextResolution { token: token.name().into() };
                    error!("{}", err);
                    return Err(err);
                };
                debug!("Resolving from context");
                return match context.get(token) {
                    Some(instance) => Ok(instance),
                    None => not_found.ok_or_else(|| not_found_err(token)),
                };
            }

            if let Some((injector, record)) = self.find(token) {
                return injector.instantiate_record(record, request).await;
            }

            if *token == Token::of::<InquirerContext>() {
                debug!("Resolved inquirer context");
                let inquirer = request.inquirer.cloned().unwrap_or_default();
                return Ok(Arc::new(inquirer));
            }
            if let Some(not_found) = not_found {
                debug!("Returned not found value");
                return Ok(not_found);
            }

            Err(not_found_err(token))
        })
    }

    async fn instantiate_record(&self, record: &Record, request: Request<'_>) -> Result<Instance, ResolveErrorKind> {
        match record {
            Record::Single(binding) => self.instantiate(binding, request).await,
            Record::Multi(bindings) => {
                let mut instances = Vec::with_capacity(bindings.len());
                for binding in bindings {
                    instances.push(self.instantiate(binding, request).await?);
                }
                Ok(Arc::new(Instances(instances)))
            }
        }
    }

    fn instantiate<'a>(&'a self, binding: &'a Binding, request: Request<'a>) -> BoxFuture<'a, Result<Instance, ResolveErrorKind>> {
        Box::pin(async move {
            let token = binding.token();
            if request.path.contains(token) {
                let path = request.path.iter().chain(core::iter::once(token)).map(ToString::to_string).collect();
                let err = ResolveErrorKind::CyclicDependency(CyclePath(path));
                error!("{}", err);
                return Err(err);
            }
            if request.path.len() >= self.inner.config.max_depth {
                let err = ResolveErrorKind::ResolutionTooDeep {
                    token: token.name().into(),
                    max_depth: self.inner.config.max_depth,
                };
                error!("{}", err);
                return Err(err);
            }

            let lifetime = self.effective_lifetime(binding);
            let key = match lifetime {
                _ if !binding.is_cached() => None,
                Lifetime::Transient => None,
                Lifetime::Event => request.context.map(Context::key),
                Lifetime::Singleton | Lifetime::Module => Some(ContextKey::SINGLETON),
            };

            let Some(key) = key else {
                debug!(%lifetime, "Building uncached instance");
                return self.build(binding, request).await;
            };

            let cell = binding.cell(key);
            if let Some(instance) = cell.get() {
                debug!(%lifetime, "Found in cache");
                return Ok(instance.clone());
            }
            debug!(%lifetime, "Not found in cache");

            let instance = cell.get_or_try_init(|| self.build(binding, request)).await?;
            Ok(instance.clone())
        })
    }

    /// Resolves dependencies in declaration order and calls the build function.
    /// Dependencies come from the host injector of the binding if it has one.
    async fn build(&self, binding: &Binding, request: Request<'_>) -> Result<Instance, ResolveErrorKind> {
        let token = binding.token();
        let host = binding.host();
        let injector = host.as_ref().unwrap_or(self);

        let mut path = Vec::with_capacity(request.path.len() + 1);
        path.extend_from_slice(request.path);
        path.push(token.clone());

        let inquirer = InquirerContext::new(Some(token.clone()), injector.module());
        let dependency_request = Request {
            context: request.context,
            inquirer: Some(&inquirer),
            path: &path,
        };

        let mut resolved = Vec::with_capacity(binding.dependencies().len());
        for dependency in binding.dependencies() {
            let instance = injector.lookup(dependency, None, dependency_request).await?;
            resolved.push((dependency.clone(), instance));
        }

        let requester = request.inquirer.cloned().unwrap_or_default();
        let dependencies = match binding.before_resolution(injector, Dependencies::new(resolved), &requester).await {
            Ok(dependencies) => dependencies,
            Err(err) => {
                error!("{}", err);
                return Err(ResolveErrorKind::Instantiator(InstantiatorErrorKind::Factory(err)));
            }
        };

        match binding.instantiate(dependencies).await {
            Ok(instance) => {
                debug!(token = %token, "Instantiated");
                Ok(instance)
            }
            Err(InstantiatorErrorKind::Deps(err)) => {
                error!("{}", err);
                Err(ResolveErrorKind::Instantiator(InstantiatorErrorKind::Deps(Box::new(err))))
            }
            Err(InstantiatorErrorKind::Factory(err)) => {
                error!("{}", err);
                Err(ResolveErrorKind::Instantiator(InstantiatorErrorKind::Factory(err)))
            }
        }
    }

    /// Lifetime of `binding` after contagion from its dependencies, memoized on the binding
    pub(crate) fn effective_lifetime(&self, binding: &Binding) -> Lifetime {
        if let Some(lifetime) = binding.effective_lifetime() {
            return lifetime;
        }
        self.compute_lifetime(binding, &mut BTreeSet::new())
    }

    fn compute_lifetime(&self, binding: &Binding, visiting: &mut BTreeSet<Token>) -> Lifetime {
        if let Some(lifetime) = binding.effective_lifetime() {
            return lifetime;
        }
        // Cycles are reported on resolution
        if !visiting.insert(binding.token().clone()) {
            return binding.lifetime();
        }

        let host = binding.host();
        let scope = host.as_ref().unwrap_or(self);

        let mut lifetime = if binding.is_alias() { Lifetime::Singleton } else { binding.lifetime() };
        for dependency in binding.dependencies() {
            let dependency_lifetime = if dependency.provided_in() == ProvidedIn::Ctx {
                Lifetime::Event
            } else if let Some((injector, record)) = scope.find(dependency) {
                record
                    .bindings()
                    .iter()
                    .map(|binding| injector.compute_lifetime(binding, visiting))
                    .max()
                    .unwrap_or(Lifetime::Singleton)
            } else {
                Lifetime::Singleton
            };

            lifetime = if binding.is_alias() {
                lifetime.max(dependency_lifetime)
            } else {
                lifetime.max(dependency_lifetime.contagion())
            };
        }

        visiting.remove(binding.token());
        binding.memoize_effective_lifetime(lifetime)
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("module", &self.inner.module)
            .field("is_component", &self.inner.is_component)
            .field("tokens", &self.inner.records.keys().collect::<Vec<_>>())
            .field("parent", &self.inner.parent)
            .finish()
    }
}

fn insert_record(records: &mut BTreeMap<Token, Record>, binding: Arc<Binding>) {
    let token = binding.token().clone();
    if !binding.is_multi() {
        records.insert(token, Record::Single(binding));
        return;
    }
    match records.get_mut(&token) {
        Some(Record::Multi(bindings)) => bindings.push(binding),
        _ => {
            records.insert(token, Record::Multi(alloc::vec![binding]));
        }
    }
}

fn not_found_err(token: &Token) -> ResolveErrorKind {
    let err = ResolveErrorKind::TokenNotFound { token: token.name().into() };
    debug!("{}", err);
    err
}

pub(crate) fn downcast<T: Send + Sync + 'static>(token: &Token, instance: Instance) -> Result<Arc<T>, ResolveErrorKind> {
    instance.downcast().map_err(|_| {
        let err = ResolveErrorKind::IncorrectType {
            token: token.name().into(),
            expected: type_name::<T>(),
        };
        error!("{}", err);
        err
    })
}

pub(crate) fn dropped_handle<T>() -> InstantiateErrorKind {
    InstantiateErrorKind::Custom(anyhow::anyhow!("{} was dropped", type_name::<T>()))
}
