use alloc::{boxed::Box, vec::Vec};
use core::{fmt, future::Future};

use crate::{
    any::TypeInfo,
    instantiator::Constructible,
    provider::Provider,
    token::{Injectable, Token},
    utils::future::BoxFuture,
};

/// Identity of a module, the type info of its marker type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(TypeInfo);

impl ModuleId {
    #[inline]
    #[must_use]
    pub fn of<M: ?Sized + 'static>() -> Self {
        Self(TypeInfo::of::<M>())
    }

    #[inline]
    #[must_use]
    pub fn type_info(&self) -> TypeInfo {
        self.0
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.0.short_name()
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Statically declared module
pub trait Module: 'static {
    fn metadata() -> ModuleMetadata;
}

/// Module produced by a computation, identified by the marker type `module`
pub struct DynamicModule {
    pub module: ModuleId,
    pub metadata: ModuleMetadata,
}

impl DynamicModule {
    #[inline]
    #[must_use]
    pub fn new<M: ?Sized + 'static>(metadata: ModuleMetadata) -> Self {
        Self {
            module: ModuleId::of::<M>(),
            metadata,
        }
    }
}

/// Static module: identity plus the function that declares it
#[derive(Clone, Copy)]
pub struct ModuleKey {
    pub id: ModuleId,
    pub(crate) metadata: fn() -> ModuleMetadata,
}

impl ModuleKey {
    #[inline]
    #[must_use]
    pub fn of<M: Module>() -> Self {
        Self {
            id: ModuleId::of::<M>(),
            metadata: M::metadata,
        }
    }
}

/// Entry of a module's import list
pub enum Import {
    Static(ModuleKey),
    /// Deferred module, awaited when the loader reaches the import
    Dynamic(BoxFuture<'static, Option<DynamicModule>>),
}

impl Import {
    #[inline]
    #[must_use]
    pub fn of<M: Module>() -> Self {
        Import::Static(ModuleKey::of::<M>())
    }

    #[must_use]
    pub fn dynamic<Fut>(future: Fut) -> Self
    where
        Fut: Future<Output = Option<DynamicModule>> + Send + 'static,
    {
        Import::Dynamic(Box::pin(future))
    }
}

impl From<DynamicModule> for Import {
    fn from(module: DynamicModule) -> Self {
        Import::dynamic(async move { Some(module) })
    }
}

impl fmt::Debug for Import {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Import::Static(key) => write!(f, "Import({})", key.id),
            Import::Dynamic(_) => f.write_str("Import(<dynamic>)"),
        }
    }
}

/// Entry of a module's export list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Export {
    Token(Token),
    /// Re-exports everything the module exports, or all own providers if it's the exporting module itself
    Module(ModuleId),
}

/// Component of a module: a constructible type that gets its own injector
#[derive(Debug, Clone)]
pub struct ComponentDecl {
    pub(crate) info: TypeInfo,
    pub(crate) provider: Provider,
}

impl ComponentDecl {
    #[inline]
    #[must_use]
    pub fn of<C: Constructible>() -> Self {
        Self {
            info: TypeInfo::of::<C>(),
            provider: Provider::class::<C>(),
        }
    }

    #[inline]
    #[must_use]
    pub fn type_info(&self) -> TypeInfo {
        self.info
    }

    #[inline]
    #[must_use]
    pub fn token(&self) -> &Token {
        self.provider.token()
    }
}

/// Declared imports, providers, components and exports of a module
#[derive(Debug, Default)]
pub struct ModuleMetadata {
    pub imports: Vec<Import>,
    pub providers: Vec<Provider>,
    pub components: Vec<ComponentDecl>,
    pub exports: Vec<Export>,
}

impl ModuleMetadata {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn import<M: Module>(mut self) -> Self {
        self.imports.push(Import::of::<M>());
        self
    }

    #[must_use]
    pub fn import_dynamic(mut self, import: impl Into<Import>) -> Self {
        self.imports.push(import.into());
        self
    }

    /// Adds an implicit provider for `T`
    #[must_use]
    pub fn provide<T: Constructible>(mut self) -> Self {
        self.providers.push(Provider::class::<T>());
        self
    }

    #[must_use]
    pub fn provider(mut self, provider: Provider) -> Self {
        self.providers.push(provider);
        self
    }

    #[must_use]
    pub fn providers(mut self, providers: impl IntoIterator<Item = Provider>) -> Self {
        self.providers.extend(providers);
        self
    }

    #[must_use]
    pub fn component<C: Constructible>(mut self) -> Self {
        self.components.push(ComponentDecl::of::<C>());
        self
    }

    /// Exports the provider of `T`
    #[must_use]
    pub fn export<T: Injectable>(mut self) -> Self {
        self.exports.push(Export::Token(Token::of::<T>()));
        self
    }

    #[must_use]
    pub fn export_token(mut self, token: impl Into<Token>) -> Self {
        self.exports.push(Export::Token(token.into()));
        self
    }

    /// Re-exports module `M`, use the declaring module itself to export all of its providers
    #[must_use]
    pub fn export_module<M: ?Sized + 'static>(mut self) -> Self {
        self.exports.push(Export::Module(ModuleId::of::<M>()));
        self
    }
}

/// Module definition after scanning: dynamic imports are awaited and replaced by their ids
#[derive(Debug, Clone)]
pub struct ModuleDefinition {
    pub id: ModuleId,
    pub imports: Vec<ModuleId>,
    pub providers: Vec<Provider>,
    pub components: Vec<ComponentDecl>,
    pub exports: Vec<Export>,
}

impl ModuleDefinition {
    #[inline]
    #[must_use]
    pub fn imports_module(&self, module: &ModuleId) -> bool {
        self.imports.contains(module)
    }

    /// Own providers bound to `token`, in declaration order
    pub fn providers_of<'a>(&'a self, token: &'a Token) -> impl Iterator<Item = &'a Provider> + 'a {
        self.providers.iter().filter(move |provider| provider.token() == token)
    }
}
