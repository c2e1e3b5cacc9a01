use modgraph::{
    injectable, resolve_root_module, Constructible, Context, Dependencies, Inject, InjectionToken, InquirerContext,
    InstantiateErrorKind, Lifetime, Module, ModuleId, ModuleMetadata, ProvidedIn, Provider, ResolveErrorKind, ResolveOptions,
    Token,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tracing_test::traced_test;

struct Update(u64);
struct Session(Arc<Update>);
struct Handler(Arc<Session>);
struct Clock;
struct Timestamped(Arc<Clock>);
struct Audit(Arc<InquirerContext>);

injectable!(Update, provided_in = ProvidedIn::Ctx);
injectable!(Session, lifetime = Lifetime::Event);
injectable!(Handler);
injectable!(Clock, lifetime = Lifetime::Transient);
injectable!(Timestamped);
injectable!(Audit, lifetime = Lifetime::Transient);

impl Constructible for Session {
    type Deps = (Inject<Update>,);

    async fn construct((Inject(update),): Self::Deps) -> Result<Self, InstantiateErrorKind> {
        Ok(Session(update))
    }
}

impl Constructible for Handler {
    type Deps = (Inject<Session>,);

    async fn construct((Inject(session),): Self::Deps) -> Result<Self, InstantiateErrorKind> {
        Ok(Handler(session))
    }
}

impl Constructible for Clock {
    type Deps = ();

    async fn construct((): ()) -> Result<Self, InstantiateErrorKind> {
        Ok(Clock)
    }
}

impl Constructible for Timestamped {
    type Deps = (Inject<Clock>,);

    async fn construct((Inject(clock),): Self::Deps) -> Result<Self, InstantiateErrorKind> {
        Ok(Timestamped(clock))
    }
}

impl Constructible for Audit {
    type Deps = (Inject<InquirerContext>,);

    async fn construct((Inject(inquirer),): Self::Deps) -> Result<Self, InstantiateErrorKind> {
        Ok(Audit(inquirer))
    }
}

struct Bot;
struct Events;

impl Module for Bot {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .import::<Events>()
            .provide::<Clock>()
            .provide::<Timestamped>()
            .provide::<Audit>()
    }
}

impl Module for Events {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .provide::<Session>()
            .provide::<Handler>()
            .export::<Handler>()
    }
}

fn context(id: u64) -> Context {
    let mut context = Context::new();
    context.insert(Update(id));
    context
}

#[tokio::test]
#[traced_test]
async fn test_event_instances_per_context_key() {
    let root = resolve_root_module::<Bot>().await.unwrap();
    let first = context(1);
    let second = context(2);

    let a = root.resolve_in::<Handler>(&first).await.unwrap();
    let b = root.resolve_in::<Handler>(&first).await.unwrap();
    let c = root.resolve_in::<Handler>(&second).await.unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(a.0 .0 .0, 1);
    assert_eq!(c.0 .0 .0, 2);

    // Clones share the key
    let d = root.resolve_in::<Handler>(&first.clone()).await.unwrap();
    assert!(Arc::ptr_eq(&a, &d));
}

#[tokio::test]
#[traced_test]
async fn test_release_context() {
    let root = resolve_root_module::<Bot>().await.unwrap();
    let event = context(1);
    let other = context(2);

    let a = root.resolve_in::<Handler>(&event).await.unwrap();
    let kept = root.resolve_in::<Handler>(&other).await.unwrap();

    // Handler and Session
    assert_eq!(root.release_context(&event), 2);
    assert_eq!(root.release_context(&event), 0);

    let b = root.resolve_in::<Handler>(&event).await.unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&kept, &root.resolve_in::<Handler>(&other).await.unwrap()));
}

#[tokio::test]
#[traced_test]
async fn test_context_token_requires_context() {
    let root = resolve_root_module::<Bot>().await.unwrap();

    assert!(matches!(
        root.resolve::<Update>().await,
        Err(ResolveErrorKind::InvalidContextResolution { .. })
    ));
    assert!(matches!(
        root.resolve::<Handler>().await,
        Err(ResolveErrorKind::InvalidContextResolution { .. })
    ));
    assert!(matches!(
        root.resolve_in::<Update>(&Context::new()).await,
        Err(ResolveErrorKind::TokenNotFound { .. })
    ));
}

#[tokio::test]
#[traced_test]
async fn test_transient_contagion() {
    let root = resolve_root_module::<Bot>().await.unwrap();

    let a = root.resolve::<Timestamped>().await.unwrap();
    let b = root.resolve::<Timestamped>().await.unwrap();
    assert!(!Arc::ptr_eq(&a, &b));

    let binding = root.injector().bindings(&Token::of::<Timestamped>()).remove(0);
    assert_eq!(binding.lifetime(), Lifetime::Singleton);
    assert_eq!(binding.effective_lifetime(), Some(Lifetime::Transient));
}

#[tokio::test]
#[traced_test]
async fn test_event_contagion() {
    let root = resolve_root_module::<Bot>().await.unwrap();
    let events = root.module::<Events>().unwrap();
    let event = context(3);

    let _ = root.resolve_in::<Handler>(&event).await.unwrap();

    let binding = events.injector().bindings(&Token::of::<Handler>()).remove(0);
    assert_eq!(binding.effective_lifetime(), Some(Lifetime::Event));
}

#[tokio::test]
#[traced_test]
async fn test_inquirer_context() {
    let root = resolve_root_module::<Bot>().await.unwrap();

    let audit = root.resolve::<Audit>().await.unwrap();
    assert_eq!(audit.0.inquirer(), Some(&Token::of::<Audit>()));
    assert_eq!(audit.0.module(), Some(ModuleId::of::<Bot>()));

    let caller = InquirerContext::new(Some(Token::of::<Handler>()), None);
    let direct = root
        .get_with(&Token::of::<InquirerContext>(), ResolveOptions::new().inquirer(caller))
        .await
        .unwrap()
        .downcast::<InquirerContext>()
        .unwrap();
    assert_eq!(direct.inquirer(), Some(&Token::of::<Handler>()));
}

struct Counter;
struct Concurrent;

injectable!(Counter);

static BUILDS: AtomicUsize = AtomicUsize::new(0);

impl Module for Concurrent {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new().provider(Provider::factory_for::<Counter, _, _>(|| async {
            BUILDS.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok::<_, InstantiateErrorKind>(Counter)
        }))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[traced_test]
async fn test_concurrent_singleton_build() {
    let root = resolve_root_module::<Concurrent>().await.unwrap();

    let tasks = (0..16)
        .map(|_| {
            let root = root.clone();
            tokio::spawn(async move { root.resolve::<Counter>().await.unwrap() })
        })
        .collect::<Vec<_>>();

    let mut instances = Vec::with_capacity(tasks.len());
    for task in tasks {
        instances.push(task.await.unwrap());
    }

    assert!(instances.iter().all(|instance| Arc::ptr_eq(instance, &instances[0])));
    assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
}

struct Explicit;

impl Module for Explicit {
    fn metadata() -> ModuleMetadata {
        let base = InjectionToken::new("base");
        let sum = InjectionToken::new("sum");
        let doubled = InjectionToken::new("doubled");

        ModuleMetadata::new()
            .provider(Provider::value(&base, 21_u32))
            .provider(Provider::factory_with_deps(
                &sum,
                [Token::from(&base), Token::from(&base)],
                |mut dependencies: Dependencies| async move {
                    let a = dependencies.next::<u32>()?;
                    let b = dependencies.next::<u32>()?;
                    Ok::<_, anyhow::Error>(Arc::new(*a + *b) as modgraph::Instance)
                },
            ))
            .provider(Provider::existing(&doubled, &sum))
            .export_token(&doubled)
    }
}

#[tokio::test]
#[traced_test]
async fn test_factory_with_explicit_dependencies() {
    let root = resolve_root_module::<Explicit>().await.unwrap();
    let definition = root.definition();

    assert_eq!(definition.providers.len(), 3);
    let doubled = definition.providers[2].token().clone();
    let value = root.get(&doubled).await.unwrap();
    assert_eq!(*value.downcast::<u32>().unwrap(), 42);
}
