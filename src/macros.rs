macro_rules! all_the_tuples {
    ($name:ident) => {
        $name!([]);
        $name!([T1]);
        $name!([T1, T2]);
        $name!([T1, T2, T3]);
        $name!([T1, T2, T3, T4]);
        $name!([T1, T2, T3, T4, T5]);
        $name!([T1, T2, T3, T4, T5, T6]);
        $name!([T1, T2, T3, T4, T5, T6, T7]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8, T9]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8, T9, T10]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12]);
    };
}

/// Implements [`crate::Injectable`] for a type.
///
/// ```
/// use modgraph::{injectable, Lifetime, ProvidedIn};
///
/// struct Logger;
/// struct RequestId;
/// struct Formatter;
///
/// injectable!(Logger);
/// injectable!(RequestId, lifetime = Lifetime::Event);
/// injectable!(Formatter, provided_in = ProvidedIn::Module);
/// ```
#[macro_export]
macro_rules! injectable {
    ($ty:ty $(,)?) => {
        impl $crate::Injectable for $ty {}
    };
    ($ty:ty, lifetime = $lifetime:expr $(,)?) => {
        impl $crate::Injectable for $ty {
            fn injectable_def() -> $crate::InjectableDef {
                $crate::InjectableDef::new($lifetime, $crate::ProvidedIn::Root)
            }
        }
    };
    ($ty:ty, provided_in = $provided_in:expr $(,)?) => {
        impl $crate::Injectable for $ty {
            fn injectable_def() -> $crate::InjectableDef {
                $crate::InjectableDef::new($crate::Lifetime::Singleton, $provided_in)
            }
        }
    };
    ($ty:ty, lifetime = $lifetime:expr, provided_in = $provided_in:expr $(,)?) => {
        impl $crate::Injectable for $ty {
            fn injectable_def() -> $crate::InjectableDef {
                $crate::InjectableDef::new($lifetime, $provided_in)
            }
        }
    };
}
