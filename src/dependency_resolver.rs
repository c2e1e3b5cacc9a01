use alloc::{collections::VecDeque, sync::Arc, vec::Vec};
use core::any::type_name;

use crate::{any::Instance, errors::ResolveErrorKind, token::Token};

/// Resolved dependencies of a binding, in the positional order of its dependency tokens
pub struct Dependencies {
    resolved: VecDeque<(Token, Instance)>,
}

impl Dependencies {
    #[inline]
    #[must_use]
    pub(crate) fn new(resolved: Vec<(Token, Instance)>) -> Self {
        Self {
            resolved: resolved.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    /// Instance resolved for the first position bound to `token`
    #[must_use]
    pub fn get(&self, token: &Token) -> Option<&Instance> {
        self.resolved.iter().find(|(resolved, _)| resolved == token).map(|(_, instance)| instance)
    }

    /// Replaces the instance at the first position bound to `token` and returns the old one
    pub fn replace(&mut self, token: &Token, instance: Instance) -> Option<Instance> {
        let (_, slot) = self.resolved.iter_mut().find(|(resolved, _)| resolved == token)?;
        Some(core::mem::replace(slot, instance))
    }

    /// Takes the next dependency without a type check
    ///
    /// # Errors
    /// Returns [`ResolveErrorKind::TokenNotFound`] if all dependencies are taken
    pub fn next_instance(&mut self) -> Result<(Token, Instance), ResolveErrorKind> {
        self.resolved.pop_front().ok_or_else(|| ResolveErrorKind::TokenNotFound {
            token: "<positional dependency>".into(),
        })
    }

    /// Takes the next dependency and downcasts it
    ///
    /// # Errors
    /// Returns [`ResolveErrorKind::IncorrectType`] if the instance isn't a `T`
    pub fn next<T: Send + Sync + 'static>(&mut self) -> Result<Arc<T>, ResolveErrorKind> {
        let (token, instance) = self.next_instance()?;
        instance.downcast().map_err(|_| ResolveErrorKind::IncorrectType {
            token: token.name().into(),
            expected: type_name::<T>(),
        })
    }
}

/// Typed view over positional dependencies.
///
/// [`DependencyResolver::tokens`] declares the tokens, [`DependencyResolver::resolve`]
/// takes the resolved instances back in the same order.
pub trait DependencyResolver: Sized + Send + 'static {
    fn tokens(tokens: &mut Vec<Token>);

    /// # Errors
    /// Returns an error if an instance has an unexpected type
    fn resolve(dependencies: &mut Dependencies) -> Result<Self, ResolveErrorKind>;

    #[inline]
    #[must_use]
    fn dependencies() -> Vec<Token> {
        let mut tokens = Vec::new();
        Self::tokens(&mut tokens);
        tokens
    }
}

macro_rules! impl_dependency_resolver {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case, unused_mut)]
        impl<$($ty,)*> DependencyResolver for ($($ty,)*)
        where
            $( $ty: DependencyResolver, )*
        {
            #[inline]
            #[allow(unused_variables)]
            fn tokens(tokens: &mut Vec<Token>) {
                $( $ty::tokens(tokens); )*
            }

            #[inline]
            #[allow(unused_variables)]
            fn resolve(dependencies: &mut Dependencies) -> Result<Self, ResolveErrorKind> {
                Ok(($($ty::resolve(dependencies)?,)*))
            }
        }
    };
}

all_the_tuples!(impl_dependency_resolver);

#[cfg(test)]
mod tests {
    use alloc::{sync::Arc, vec};

    use super::{Dependencies, DependencyResolver};
    use crate::{Inject, ResolveErrorKind, Token};

    struct A(u8);
    struct B;

    injectable!(A);
    injectable!(B);

    #[test]
    fn test_tuple_tokens_order() {
        let tokens = <(Inject<A>, Inject<B>, Inject<A>)>::dependencies();

        assert_eq!(tokens, vec![Token::of::<A>(), Token::of::<B>(), Token::of::<A>()]);
        assert!(<()>::dependencies().is_empty());
    }

    #[test]
    fn test_tuple_resolve() {
        let mut dependencies = Dependencies::new(vec![(Token::of::<A>(), Arc::new(A(1)) as _), (Token::of::<B>(), Arc::new(B) as _)]);

        let (Inject(a), Inject(_b)) = <(Inject<A>, Inject<B>)>::resolve(&mut dependencies).unwrap();

        assert_eq!(a.0, 1);
        assert!(dependencies.is_empty());
    }

    #[test]
    fn test_incorrect_type() {
        let mut dependencies = Dependencies::new(vec![(Token::of::<A>(), Arc::new(B) as _)]);

        assert!(matches!(
            <(Inject<A>,)>::resolve(&mut dependencies),
            Err(ResolveErrorKind::IncorrectType { .. })
        ));
    }
}
