use alloc::{sync::Arc, vec::Vec};
use core::any::type_name;

use crate::{
    any::Instances,
    dependency_resolver::{Dependencies, DependencyResolver},
    errors::ResolveErrorKind,
    token::{Injectable, Token},
};

/// Injects the instance bound to `Token::of::<Dep>()`
pub struct Inject<Dep>(pub Arc<Dep>);

impl<Dep: Injectable> DependencyResolver for Inject<Dep> {
    #[inline]
    fn tokens(tokens: &mut Vec<Token>) {
        tokens.push(Token::of::<Dep>());
    }

    #[inline]
    fn resolve(dependencies: &mut Dependencies) -> Result<Self, ResolveErrorKind> {
        dependencies.next().map(Self)
    }
}

/// Injects every instance contributed to the multi token `Token::of::<Dep>()`
pub struct InjectAll<Dep>(pub Vec<Arc<Dep>>);

impl<Dep: Injectable> DependencyResolver for InjectAll<Dep> {
    #[inline]
    fn tokens(tokens: &mut Vec<Token>) {
        tokens.push(Token::of::<Dep>());
    }

    fn resolve(dependencies: &mut Dependencies) -> Result<Self, ResolveErrorKind> {
        let (token, instance) = dependencies.next_instance()?;
        // A non-multi binding resolves to a single instance
        if let Ok(instance) = instance.clone().downcast::<Dep>() {
            return Ok(Self(alloc::vec![instance]));
        }
        match instance.downcast::<Instances>() {
            Ok(instances) => instances.downcast(&token).map(Self),
            Err(_) => Err(ResolveErrorKind::IncorrectType {
                token: token.name().into(),
                expected: type_name::<Instances>(),
            }),
        }
    }
}
