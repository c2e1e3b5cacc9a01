use alloc::{
    sync::{Arc, Weak},
    vec::Vec,
};
use core::fmt;
use std::sync::OnceLock;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::{
    any::Instance,
    binding::{Binding, BindingFactory},
    config::Config,
    container::ModuleContainer,
    context::Context,
    errors::ResolveErrorKind,
    injector::{downcast, dropped_handle, Injector, ResolveOptions},
    module::{ComponentDecl, ModuleDefinition, ModuleId},
    token::{Injectable, Token},
};

pub(crate) struct ModuleRefInner {
    definition: ModuleDefinition,
    injector: Injector,
    components: Vec<ComponentRef>,
    imports: OnceLock<Vec<ModuleRef>>,
    container: Arc<ModuleContainer>,
}

/// Handle of a resolved module: its definition plus the injector built from it
#[derive(Clone)]
pub struct ModuleRef {
    inner: Arc<ModuleRefInner>,
}

injectable!(ModuleRef);

impl ModuleRef {
    /// Creates the module injector and the injectors of the module's components.
    ///
    /// The module injector binds [`ModuleRef`] to this reference, components bind [`ComponentRef`] to theirs.
    pub(crate) fn new(
        definition: ModuleDefinition,
        parent: &Injector,
        config: Config,
        bindings: Vec<Arc<Binding>>,
        factory: &mut BindingFactory,
        container: Arc<ModuleContainer>,
    ) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<ModuleRefInner>| {
            let weak = weak.clone();
            let handle = Arc::new(Binding::from_fn(Token::of::<ModuleRef>(), move || {
                weak.upgrade()
                    .map(|inner| Arc::new(ModuleRef { inner }) as Instance)
                    .ok_or_else(dropped_handle::<ModuleRef>)
            }));
            factory.track(handle.clone());

            let injector = Injector::new(
                Some(parent.clone()),
                Some(definition.id),
                false,
                config,
                bindings.into_iter().chain(core::iter::once(handle)),
            );
            let components = definition
                .components
                .iter()
                .map(|decl| ComponentRef::new(decl.clone(), definition.id, &injector, config, factory))
                .collect();

            debug!(module = %definition.id, "Module injector created");

            ModuleRefInner {
                definition,
                injector,
                components,
                imports: OnceLock::new(),
                container,
            }
        });

        Self { inner }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ModuleId {
        self.inner.definition.id
    }

    #[inline]
    #[must_use]
    pub fn definition(&self) -> &ModuleDefinition {
        &self.inner.definition
    }

    #[inline]
    #[must_use]
    pub fn injector(&self) -> &Injector {
        &self.inner.injector
    }

    #[inline]
    #[must_use]
    pub fn components(&self) -> &[ComponentRef] {
        &self.inner.components
    }

    /// Component of type `C` declared by this module
    #[must_use]
    pub fn component<C: Injectable>(&self) -> Option<&ComponentRef> {
        let token = Token::of::<C>();
        self.inner.components.iter().find(|component| *component.token() == token)
    }

    /// References of the imported modules, in declaration order
    #[inline]
    #[must_use]
    pub fn imports(&self) -> &[ModuleRef] {
        self.inner.imports.get().map(Vec::as_slice).unwrap_or_default()
    }

    pub(crate) fn set_imports(&self, imports: Vec<ModuleRef>) {
        if self.inner.imports.set(imports).is_err() {
            debug!(module = %self.id(), "Imports already set");
        }
    }

    #[inline]
    #[must_use]
    pub fn container(&self) -> &ModuleContainer {
        &self.inner.container
    }

    /// Reference of any module of the resolved graph
    #[inline]
    #[must_use]
    pub fn module<M: ?Sized + 'static>(&self) -> Option<ModuleRef> {
        self.inner.container.get(&ModuleId::of::<M>())
    }

    /// # Errors
    /// See [`Injector::get`]
    #[inline]
    pub async fn get(&self, token: &Token) -> Result<Instance, ResolveErrorKind> {
        self.inner.injector.get(token).await
    }

    /// # Errors
    /// See [`Injector::get_or`]
    #[inline]
    pub async fn get_or(&self, token: &Token, not_found: Instance) -> Result<Instance, ResolveErrorKind> {
        self.inner.injector.get_or(token, not_found).await
    }

    /// # Errors
    /// See [`Injector::get_with`]
    #[inline]
    pub async fn get_with(&self, token: &Token, options: ResolveOptions<'_>) -> Result<Instance, ResolveErrorKind> {
        self.inner.injector.get_with(token, options).await
    }

    /// # Errors
    /// See [`Injector::resolve`]
    #[inline]
    pub async fn resolve<T: Injectable>(&self) -> Result<Arc<T>, ResolveErrorKind> {
        self.inner.injector.resolve::<T>().await
    }

    /// # Errors
    /// See [`Injector::resolve_in`]
    #[inline]
    pub async fn resolve_in<T: Injectable>(&self, context: &Context) -> Result<Arc<T>, ResolveErrorKind> {
        self.inner.injector.resolve_in::<T>(context).await
    }

    /// # Errors
    /// See [`Injector::resolve_all`]
    #[inline]
    pub async fn resolve_all<T: Injectable>(&self) -> Result<Vec<Arc<T>>, ResolveErrorKind> {
        self.inner.injector.resolve_all::<T>().await
    }

    /// Drops every event instance built for `context` in the whole graph.
    /// Returns the number of released instances.
    ///
    /// Must be called by the owner of the context once the event is handled,
    /// otherwise its instances live as long as the graph.
    pub fn release_context(&self, context: &Context) -> usize {
        self.inner.container.release_context(context.key())
    }

    pub(crate) fn downgrade(&self) -> Weak<ModuleRefInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<ModuleRefInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }
}

impl PartialEq for ModuleRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ModuleRef {}

impl fmt::Debug for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRef")
            .field("id", &self.id())
            .field("components", &self.inner.components)
            .field("imports", &self.imports().iter().map(ModuleRef::id).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

struct ComponentRefInner {
    decl: ComponentDecl,
    module: ModuleId,
    injector: Injector,
    instance: OnceCell<Instance>,
}

/// Handle of a module component with its own injector.
///
/// The component instance is resolved once and kept by the handle.
#[derive(Clone)]
pub struct ComponentRef {
    inner: Arc<ComponentRefInner>,
}

injectable!(ComponentRef);

impl ComponentRef {
    fn new(decl: ComponentDecl, module: ModuleId, parent: &Injector, config: Config, factory: &mut BindingFactory) -> Self {
        let component = factory.create_binding(&decl.provider);

        let inner = Arc::new_cyclic(|weak: &Weak<ComponentRefInner>| {
            let weak = weak.clone();
            let handle = Arc::new(Binding::from_fn(Token::of::<ComponentRef>(), move || {
                weak.upgrade()
                    .map(|inner| Arc::new(ComponentRef { inner }) as Instance)
                    .ok_or_else(dropped_handle::<ComponentRef>)
            }));
            factory.track(handle.clone());

            let injector = Injector::new(Some(parent.clone()), Some(module), true, config, [component, handle]);

            debug!(component = %decl.info, %module, "Component injector created");

            ComponentRefInner {
                decl,
                module,
                injector,
                instance: OnceCell::new(),
            }
        });

        Self { inner }
    }

    #[inline]
    #[must_use]
    pub fn token(&self) -> &Token {
        self.inner.decl.token()
    }

    #[inline]
    #[must_use]
    pub fn module(&self) -> ModuleId {
        self.inner.module
    }

    #[inline]
    #[must_use]
    pub fn injector(&self) -> &Injector {
        &self.inner.injector
    }

    /// Instance of the component, resolved on the first call
    ///
    /// # Errors
    /// See [`Injector::get`]
    pub async fn instance(&self) -> Result<Instance, ResolveErrorKind> {
        let instance = self
            .inner
            .instance
            .get_or_try_init(|| self.inner.injector.get(self.inner.decl.token()))
            .await?;
        Ok(instance.clone())
    }

    /// # Errors
    /// See [`Self::instance`]. Returns [`ResolveErrorKind::IncorrectType`] if the component isn't a `T`.
    pub async fn instance_as<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveErrorKind> {
        let instance = self.instance().await?;
        downcast(self.token(), instance)
    }
}

impl fmt::Debug for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRef")
            .field("component", &self.inner.decl.info)
            .field("module", &self.inner.module)
            .field("resolved", &self.inner.instance.initialized())
            .finish()
    }
}
