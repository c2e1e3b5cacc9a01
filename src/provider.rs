use alloc::{sync::Arc, vec::Vec};
use core::{
    any::TypeId,
    fmt,
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{
    any::Instance,
    dependency_resolver::{Dependencies, DependencyResolver},
    errors::InstantiateErrorKind,
    instantiator::{
        boxed_before_resolution, boxed_constructor, boxed_dependencies_fn, boxed_instantiator, boxed_value, BoxedBeforeResolution,
        BoxedInstantiator, Constructible, Instantiator,
    },
    token::{Injectable, Token},
};

static NEXT_PROVIDER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a provider declaration.
///
/// Implicit providers are identified by their type, so the same type declared
/// in several modules is one declaration. Any other provider is identified by
/// the value it was created as, clones included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProviderKey {
    Type(TypeId),
    Declaration(u64),
}

#[derive(Clone)]
pub(crate) enum ProviderKind {
    /// Implicit provider or class mapping, built with [`Constructible::construct`]
    Class {
        deps: Vec<Token>,
        instantiator: BoxedInstantiator,
        before_resolution: BoxedBeforeResolution,
    },
    Factory { deps: Vec<Token>, instantiator: BoxedInstantiator },
    Value(Instance),
    /// Points to the binding of another token
    Existing(Token),
}

#[derive(Clone)]
pub(crate) struct ProviderInner {
    pub(crate) key: ProviderKey,
    pub(crate) token: Token,
    pub(crate) kind: ProviderKind,
    pub(crate) multi: bool,
}

/// Declaration of how to build the value of a token.
///
/// Cheap to clone, clones keep the identity of the declaration.
#[derive(Clone)]
pub struct Provider {
    pub(crate) inner: Arc<ProviderInner>,
}

impl Provider {
    #[inline]
    fn new(key: ProviderKey, token: Token, kind: ProviderKind) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                key,
                token,
                kind,
                multi: false,
            }),
        }
    }

    #[inline]
    fn next_key() -> ProviderKey {
        ProviderKey::Declaration(NEXT_PROVIDER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Implicit provider: the type is both the token and the recipe
    #[must_use]
    pub fn class<T: Constructible>() -> Self {
        Self::new(
            ProviderKey::Type(TypeId::of::<T>()),
            Token::of::<T>(),
            ProviderKind::Class {
                deps: T::Deps::dependencies(),
                instantiator: boxed_constructor::<T>(),
                before_resolution: boxed_before_resolution::<T>(),
            },
        )
    }

    /// Binds `token` to instances of the constructible type `C`
    #[must_use]
    pub fn use_class<C: Constructible>(token: impl Into<Token>) -> Self {
        Self::new(
            Self::next_key(),
            token.into(),
            ProviderKind::Class {
                deps: C::Deps::dependencies(),
                instantiator: boxed_constructor::<C>(),
                before_resolution: boxed_before_resolution::<C>(),
            },
        )
    }

    /// Binds `token` to an async factory, its dependencies are the factory's argument types
    #[must_use]
    pub fn factory<Inst, Deps>(token: impl Into<Token>, instantiator: Inst) -> Self
    where
        Inst: Instantiator<Deps>,
        Deps: DependencyResolver,
    {
        Self::new(
            Self::next_key(),
            token.into(),
            ProviderKind::Factory {
                deps: Inst::dependencies(),
                instantiator: boxed_instantiator(instantiator),
            },
        )
    }

    /// Binds `T` to an async factory
    #[must_use]
    pub fn factory_for<T, Inst, Deps>(instantiator: Inst) -> Self
    where
        T: Injectable,
        Inst: Instantiator<Deps, Provides = T>,
        Deps: DependencyResolver,
    {
        Self::factory(Token::of::<T>(), instantiator)
    }

    /// Binds `token` to a factory with an explicit, ordered list of dependency tokens
    #[must_use]
    pub fn factory_with_deps<F, Fut, E>(token: impl Into<Token>, deps: impl IntoIterator<Item = Token>, factory: F) -> Self
    where
        F: Fn(Dependencies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Instance, E>> + Send + 'static,
        E: Into<InstantiateErrorKind>,
    {
        Self::new(
            Self::next_key(),
            token.into(),
            ProviderKind::Factory {
                deps: deps.into_iter().collect(),
                instantiator: boxed_dependencies_fn(factory),
            },
        )
    }

    /// Binds `token` to a precomputed constant
    #[must_use]
    pub fn value<T: Send + Sync + 'static>(token: impl Into<Token>, value: T) -> Self {
        Self::value_rc(token, Arc::new(value))
    }

    #[must_use]
    pub fn value_rc(token: impl Into<Token>, value: Instance) -> Self {
        Self::new(Self::next_key(), token.into(), ProviderKind::Value(value))
    }

    /// Makes `token` an alias of `existing`, no new instance is created
    #[must_use]
    pub fn existing(token: impl Into<Token>, existing: impl Into<Token>) -> Self {
        Self::new(Self::next_key(), token.into(), ProviderKind::Existing(existing.into()))
    }

    /// Contribute to the collection of `token` instead of replacing previous providers
    #[must_use]
    pub fn multi(mut self) -> Self {
        Arc::make_mut(&mut self.inner).multi = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn token(&self) -> &Token {
        &self.inner.token
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> ProviderKey {
        self.inner.key
    }

    #[inline]
    #[must_use]
    pub fn is_multi(&self) -> bool {
        self.inner.multi
    }

    #[inline]
    #[must_use]
    pub fn is_alias(&self) -> bool {
        matches!(self.inner.kind, ProviderKind::Existing(_))
    }

    #[inline]
    #[must_use]
    pub fn is_value(&self) -> bool {
        matches!(self.inner.kind, ProviderKind::Value(_))
    }

    #[must_use]
    pub fn dependencies(&self) -> &[Token] {
        match &self.inner.kind {
            ProviderKind::Class { deps, .. } | ProviderKind::Factory { deps, .. } => deps,
            ProviderKind::Value(_) | ProviderKind::Existing(_) => &[],
        }
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.inner.kind {
            ProviderKind::Class { .. } => "class",
            ProviderKind::Factory { .. } => "factory",
            ProviderKind::Value(_) => "value",
            ProviderKind::Existing(_) => "existing",
        };
        f.debug_struct("Provider")
            .field("token", &self.inner.token)
            .field("kind", &kind)
            .field("multi", &self.inner.multi)
            .finish()
    }
}
