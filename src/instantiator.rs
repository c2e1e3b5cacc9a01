use alloc::{boxed::Box, sync::Arc, vec::Vec};
use core::future::Future;
use tracing::debug;

use crate::{
    any::Instance,
    dependency_resolver::{Dependencies, DependencyResolver},
    errors::{InstantiateErrorKind, InstantiatorErrorKind, ResolveErrorKind},
    injector::Injector,
    inquirer::InquirerContext,
    token::{Injectable, Token},
    utils::future::BoxFuture,
};

pub(crate) type InstantiatorResult = Result<Instance, InstantiatorErrorKind<ResolveErrorKind, InstantiateErrorKind>>;

/// Type-erased build function of a binding
pub(crate) type BoxedInstantiator = Arc<dyn Fn(Dependencies) -> BoxFuture<'static, InstantiatorResult> + Send + Sync>;

/// Type-erased [`Constructible::before_resolution`]
pub(crate) type BoxedBeforeResolution = Arc<
    dyn Fn(Injector, Dependencies, InquirerContext) -> BoxFuture<'static, Result<Dependencies, InstantiateErrorKind>> + Send + Sync,
>;

/// Async build function whose dependencies are declared by its argument types
pub trait Instantiator<Deps>: Clone + Send + Sync + 'static
where
    Deps: DependencyResolver,
{
    type Provides: Send + Sync + 'static;
    type Error: Into<InstantiateErrorKind>;

    fn instantiate(&self, dependencies: Deps) -> impl Future<Output = Result<Self::Provides, Self::Error>> + Send;

    #[inline]
    #[must_use]
    fn dependencies() -> Vec<Token> {
        Deps::dependencies()
    }
}

/// Type that can act as its own provider
pub trait Constructible: Injectable + Sized {
    type Deps: DependencyResolver;

    fn construct(dependencies: Self::Deps) -> impl Future<Output = Result<Self, InstantiateErrorKind>> + Send;

    /// Called with the resolved dependencies before they are passed to [`Self::construct`].
    ///
    /// `injector` is the one that resolved them, `inquirer` describes who requested `Self`.
    /// The returned dependencies are used instead of the resolved ones.
    #[allow(unused_variables)]
    fn before_resolution(
        injector: &Injector,
        dependencies: Dependencies,
        inquirer: &InquirerContext,
    ) -> impl Future<Output = Result<Dependencies, InstantiateErrorKind>> + Send {
        async move { Ok(dependencies) }
    }
}

#[must_use]
pub(crate) fn boxed_instantiator<Inst, Deps>(instantiator: Inst) -> BoxedInstantiator
where
    Inst: Instantiator<Deps>,
    Deps: DependencyResolver,
{
    Arc::new(move |mut dependencies: Dependencies| -> BoxFuture<'static, InstantiatorResult> {
        let instantiator = instantiator.clone();

        Box::pin(async move {
            let dependencies = Deps::resolve(&mut dependencies).map_err(InstantiatorErrorKind::Deps)?;
            let instance = instantiator
                .instantiate(dependencies)
                .await
                .map_err(|err| InstantiatorErrorKind::Factory(err.into()))?;

            debug!("Instantiated");

            Ok(Arc::new(instance) as Instance)
        })
    })
}

#[must_use]
pub(crate) fn boxed_constructor<T: Constructible>() -> BoxedInstantiator {
    Arc::new(|mut dependencies: Dependencies| -> BoxFuture<'static, InstantiatorResult> {
        Box::pin(async move {
            let dependencies = T::Deps::resolve(&mut dependencies).map_err(InstantiatorErrorKind::Deps)?;
            let instance = T::construct(dependencies).await.map_err(InstantiatorErrorKind::Factory)?;

            debug!("Constructed");

            Ok(Arc::new(instance) as Instance)
        })
    })
}

#[must_use]
pub(crate) fn boxed_before_resolution<T: Constructible>() -> BoxedBeforeResolution {
    Arc::new(
        |injector: Injector, dependencies: Dependencies, inquirer: InquirerContext| -> BoxFuture<'static, Result<Dependencies, InstantiateErrorKind>> {
            Box::pin(async move { T::before_resolution(&injector, dependencies, &inquirer).await })
        },
    )
}

#[must_use]
pub(crate) fn boxed_dependencies_fn<F, Fut, E>(factory: F) -> BoxedInstantiator
where
    F: Fn(Dependencies) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Instance, E>> + Send + 'static,
    E: Into<InstantiateErrorKind>,
{
    Arc::new(move |dependencies: Dependencies| -> BoxFuture<'static, InstantiatorResult> {
        let future = factory(dependencies);

        Box::pin(async move { future.await.map_err(|err| InstantiatorErrorKind::Factory(err.into())) })
    })
}

#[must_use]
pub(crate) fn boxed_value(value: Instance) -> BoxedInstantiator {
    Arc::new(move |_: Dependencies| -> BoxFuture<'static, InstantiatorResult> {
        let value = value.clone();
        Box::pin(async move { Ok(value) })
    })
}

macro_rules! impl_instantiator {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case)]
        impl<F, Fut, Response, Err, $($ty,)*> Instantiator<($($ty,)*)> for F
        where
            F: Fn($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Result<Response, Err>> + Send,
            Response: Send + Sync + 'static,
            Err: Into<InstantiateErrorKind>,
            $( $ty: DependencyResolver, )*
        {
            type Provides = Response;
            type Error = Err;

            #[inline]
            fn instantiate(&self, ($($ty,)*): ($($ty,)*)) -> impl Future<Output = Result<Self::Provides, Self::Error>> + Send {
                self($($ty,)*)
            }
        }
    };
}

all_the_tuples!(impl_instantiator);
