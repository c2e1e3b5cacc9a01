#![allow(dead_code)]

use criterion::{criterion_group, criterion_main, Criterion};
use modgraph::{
    injectable, resolve_root_module, Constructible, Context, Inject, InstantiateErrorKind, Lifetime, Module, ModuleMetadata,
};
use std::sync::Arc;
use tokio::runtime::Builder;

struct A(Arc<B>, Arc<C>);
struct B(i32);
struct C(Arc<CA>);
struct CA(Arc<CAA>);
struct CAA;
struct Request(Arc<A>);
struct Step(Arc<B>);

injectable!(A);
injectable!(B);
injectable!(C);
injectable!(CA);
injectable!(CAA);
injectable!(Request, lifetime = Lifetime::Event);
injectable!(Step, lifetime = Lifetime::Transient);

impl Constructible for A {
    type Deps = (Inject<B>, Inject<C>);

    async fn construct((Inject(b), Inject(c)): Self::Deps) -> Result<Self, InstantiateErrorKind> {
        Ok(A(b, c))
    }
}

impl Constructible for B {
    type Deps = ();

    async fn construct((): ()) -> Result<Self, InstantiateErrorKind> {
        Ok(B(2))
    }
}

impl Constructible for C {
    type Deps = (Inject<CA>,);

    async fn construct((Inject(ca),): Self::Deps) -> Result<Self, InstantiateErrorKind> {
        Ok(C(ca))
    }
}

impl Constructible for CA {
    type Deps = (Inject<CAA>,);

    async fn construct((Inject(caa),): Self::Deps) -> Result<Self, InstantiateErrorKind> {
        Ok(CA(caa))
    }
}

impl Constructible for CAA {
    type Deps = ();

    async fn construct((): ()) -> Result<Self, InstantiateErrorKind> {
        Ok(CAA)
    }
}

impl Constructible for Request {
    type Deps = (Inject<A>,);

    async fn construct((Inject(a),): Self::Deps) -> Result<Self, InstantiateErrorKind> {
        Ok(Request(a))
    }
}

impl Constructible for Step {
    type Deps = (Inject<B>,);

    async fn construct((Inject(b),): Self::Deps) -> Result<Self, InstantiateErrorKind> {
        Ok(Step(b))
    }
}

struct Leaf;
struct Middle;
struct Root;

impl Module for Leaf {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .provide::<CAA>()
            .provide::<CA>()
            .provide::<C>()
            .export::<C>()
    }
}

impl Module for Middle {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new().import::<Leaf>().export_module::<Leaf>()
    }
}

impl Module for Root {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .import::<Middle>()
            .provide::<B>()
            .provide::<A>()
            .provide::<Request>()
            .provide::<Step>()
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("resolve_root_module", |b| {
        b.to_async(Builder::new_current_thread().build().unwrap())
            .iter(|| async { resolve_root_module::<Root>().await.unwrap() });
    })
    .bench_function("get_singleton", |b| {
        let runtime = Builder::new_current_thread().build().unwrap();
        let root = runtime.block_on(resolve_root_module::<Root>()).unwrap();
        b.to_async(runtime).iter(|| async { root.resolve::<A>().await.unwrap() });
    })
    .bench_function("get_event_with_release", |b| {
        let runtime = Builder::new_current_thread().build().unwrap();
        let root = runtime.block_on(resolve_root_module::<Root>()).unwrap();
        b.to_async(runtime).iter(|| async {
            let context = Context::new();
            let _ = root.resolve_in::<Request>(&context).await.unwrap();
            root.release_context(&context)
        });
    })
    .bench_function("get_transient", |b| {
        let runtime = Builder::new_current_thread().build().unwrap();
        let root = runtime.block_on(resolve_root_module::<Root>()).unwrap();
        b.to_async(runtime).iter(|| async { root.resolve::<Step>().await.unwrap() });
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
