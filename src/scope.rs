use core::fmt;

use crate::module::ModuleId;

/// How long and how widely an instance is shared.
///
/// The order of the variants is the order of transience: a binding is never
/// less transient than its most transient dependency (see [`Lifetime::contagion`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum Lifetime {
    /// One instance for the whole process
    #[default]
    Singleton = 1,
    /// One instance per module injector that binds the provider
    Module = 2,
    /// One instance per event context
    Event = 4,
    /// A new instance on every resolution
    Transient = 8,
}

impl Lifetime {
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    #[inline]
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Lifetime::Transient)
    }

    /// Lifetime forced onto a dependant by one of its dependencies.
    ///
    /// Transient and event lifetimes are contagious, module and singleton ones aren't.
    #[inline]
    #[must_use]
    pub const fn contagion(self) -> Lifetime {
        match self {
            Lifetime::Transient => Lifetime::Transient,
            Lifetime::Event => Lifetime::Event,
            Lifetime::Singleton | Lifetime::Module => Lifetime::Singleton,
        }
    }

    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Module => "module",
            Lifetime::Event => "event",
            Lifetime::Transient => "transient",
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a provider is visible from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProvidedIn {
    /// Visible through the whole injector chain
    #[default]
    Root,
    /// Visible only from the injector of the module that binds it
    Module,
    /// Resolved by the caller-supplied event context, never by an injector
    Ctx,
    /// Lookup stops at the injector of this exact module
    In(ModuleId),
}

impl fmt::Display for ProvidedIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvidedIn::Root => f.write_str("root"),
            ProvidedIn::Module => f.write_str("module"),
            ProvidedIn::Ctx => f.write_str("ctx"),
            ProvidedIn::In(module) => write!(f, "{module}"),
        }
    }
}

/// Injectable metadata of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InjectableDef {
    pub lifetime: Lifetime,
    pub provided_in: ProvidedIn,
}

impl InjectableDef {
    #[inline]
    #[must_use]
    pub const fn new(lifetime: Lifetime, provided_in: ProvidedIn) -> Self {
        Self { lifetime, provided_in }
    }

    #[inline]
    #[must_use]
    pub const fn with_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    #[inline]
    #[must_use]
    pub const fn with_provided_in(mut self, provided_in: ProvidedIn) -> Self {
        self.provided_in = provided_in;
        self
    }

    #[inline]
    #[must_use]
    pub const fn is_context_bound(&self) -> bool {
        matches!(self.provided_in, ProvidedIn::Ctx)
    }
}
