use alloc::{sync::Arc, vec::Vec};
use core::{
    any::{type_name, Any, TypeId},
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
};

use crate::{errors::ResolveErrorKind, token::Token};

/// Type-erased, shareable instance produced by a binding
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Instances of a multi token, in binding order
#[derive(Clone, Default)]
pub struct Instances(pub Vec<Instance>);

impl Instances {
    /// Downcasts every instance contributed to `token`
    ///
    /// # Errors
    /// Returns [`ResolveErrorKind::IncorrectType`] if any instance isn't a `T`
    pub fn downcast<T: Send + Sync + 'static>(&self, token: &Token) -> Result<Vec<Arc<T>>, ResolveErrorKind> {
        self.0
            .iter()
            .map(|instance| {
                instance.clone().downcast().map_err(|_| ResolveErrorKind::IncorrectType {
                    token: token.name().into(),
                    expected: type_name::<T>(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    pub name: &'static str,
    pub id: TypeId,
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl PartialOrd for TypeInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl TypeInfo {
    #[inline]
    #[must_use]
    pub fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    #[inline]
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit_once("::").map_or(self.name, |(_, name)| name)
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;

    use super::{Instance, Instances, TypeInfo};
    use crate::{
        errors::ResolveErrorKind,
        token::{InjectionToken, Token},
    };

    mod nested {
        pub struct Service;
    }

    #[test]
    fn test_short_name() {
        let info = TypeInfo::of::<nested::Service>();

        assert_eq!(info.short_name(), "Service");
        assert!(info.name.ends_with("nested::Service"));
        assert_eq!(info, TypeInfo::of::<nested::Service>());
        assert_ne!(info, TypeInfo::of::<u8>());
    }

    #[test]
    fn test_instances_downcast() {
        let token = Token::from(&InjectionToken::new("numbers"));
        let instances = Instances(alloc::vec![Arc::new(1_u32) as Instance, Arc::new(2_u32) as Instance]);

        let numbers = instances.downcast::<u32>(&token).unwrap();
        assert_eq!(numbers.iter().map(|n| **n).collect::<alloc::vec::Vec<_>>(), [1, 2]);

        let mixed = Instances(alloc::vec![Arc::new(1_u32) as Instance, Arc::new("two") as Instance]);
        assert!(matches!(
            mixed.downcast::<u32>(&token),
            Err(ResolveErrorKind::IncorrectType { expected, .. }) if expected == core::any::type_name::<u32>()
        ));
    }
}
