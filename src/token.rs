use alloc::{borrow::Cow, sync::Arc};
use core::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    sync::atomic::{AtomicU64, Ordering as AtomicOrdering},
};

use crate::{
    any::TypeInfo,
    scope::{InjectableDef, Lifetime, ProvidedIn},
};

/// Per-type injectable metadata.
///
/// Every type used as a [`Token`] implements this trait, usually with [`crate::injectable!`].
pub trait Injectable: Send + Sync + 'static {
    #[inline]
    #[must_use]
    fn injectable_def() -> InjectableDef {
        InjectableDef::default()
    }
}

static NEXT_INJECTION_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

struct InjectionTokenInner {
    id: u64,
    description: Cow<'static, str>,
    def: InjectableDef,
}

/// Explicit, non-nominal token.
/// Two tokens are equal only if one is a clone of the other, the description is informational.
#[derive(Clone)]
pub struct InjectionToken {
    inner: Arc<InjectionTokenInner>,
}

impl InjectionToken {
    #[must_use]
    pub fn new(description: impl Into<Cow<'static, str>>) -> Self {
        Self::with_def(description, InjectableDef::default())
    }

    #[must_use]
    pub fn with_def(description: impl Into<Cow<'static, str>>, def: InjectableDef) -> Self {
        Self {
            inner: Arc::new(InjectionTokenInner {
                id: NEXT_INJECTION_TOKEN_ID.fetch_add(1, AtomicOrdering::Relaxed),
                description: description.into(),
                def,
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.inner.description
    }

    #[inline]
    #[must_use]
    pub fn def(&self) -> InjectableDef {
        self.inner.def
    }
}

impl fmt::Debug for InjectionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionToken")
            .field("id", &self.inner.id)
            .field("description", &self.inner.description)
            .finish()
    }
}

/// Identifies a requested capability
#[derive(Clone)]
pub enum Token {
    Type { info: TypeInfo, def: InjectableDef },
    Injection(InjectionToken),
}

impl Token {
    #[inline]
    #[must_use]
    pub fn of<T: Injectable>() -> Self {
        Self::Type {
            info: TypeInfo::of::<T>(),
            def: T::injectable_def(),
        }
    }

    #[inline]
    #[must_use]
    pub fn def(&self) -> InjectableDef {
        match self {
            Token::Type { def, .. } => *def,
            Token::Injection(token) => token.def(),
        }
    }

    #[inline]
    #[must_use]
    pub fn lifetime(&self) -> Lifetime {
        self.def().lifetime
    }

    #[inline]
    #[must_use]
    pub fn provided_in(&self) -> ProvidedIn {
        self.def().provided_in
    }

    #[inline]
    #[must_use]
    pub fn type_info(&self) -> Option<TypeInfo> {
        match self {
            Token::Type { info, .. } => Some(*info),
            Token::Injection(_) => None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Token::Type { info, .. } => info.short_name(),
            Token::Injection(token) => token.description(),
        }
    }

    #[inline]
    fn key(&self) -> TokenKey {
        match self {
            Token::Type { info, .. } => TokenKey::Type(*info),
            Token::Injection(token) => TokenKey::Injection(token.inner.id),
        }
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
enum TokenKey {
    Type(TypeInfo),
    Injection(u64),
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Token {}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl From<InjectionToken> for Token {
    #[inline]
    fn from(token: InjectionToken) -> Self {
        Token::Injection(token)
    }
}

impl From<&InjectionToken> for Token {
    #[inline]
    fn from(token: &InjectionToken) -> Self {
        Token::Injection(token.clone())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Type { info, .. } => write!(f, "Token({})", info.name),
            Token::Injection(token) => write!(f, "Token({:?})", token.description()),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::{InjectionToken, Token};
    use crate::{InjectableDef, Lifetime, ProvidedIn};

    struct Service;
    struct Request;

    injectable!(Service);
    injectable!(Request, lifetime = Lifetime::Event, provided_in = ProvidedIn::Ctx);

    #[test]
    fn test_type_token_identity() {
        assert_eq!(Token::of::<Service>(), Token::of::<Service>());
        assert_ne!(Token::of::<Service>(), Token::of::<Request>());
        assert_eq!(Token::of::<Service>().name(), "Service");
    }

    #[test]
    fn test_type_token_def() {
        let token = Token::of::<Request>();

        assert_eq!(token.lifetime(), Lifetime::Event);
        assert_eq!(token.provided_in(), ProvidedIn::Ctx);
        assert_eq!(Token::of::<Service>().def(), InjectableDef::default());
    }

    #[test]
    fn test_injection_token_identity() {
        let config_a = InjectionToken::new("config");
        let config_b = InjectionToken::new("config");

        assert_eq!(Token::from(&config_a), Token::from(config_a.clone()));
        assert_ne!(Token::from(&config_a), Token::from(&config_b));
        assert_eq!(Token::from(&config_b).name(), "config");
    }
}
