use ferrous_container::{
    context_with_container, Args, Context, Dependency, Provider, Scope, Service, ServiceCollection,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Transaction {
    id: usize,
}

#[derive(Debug, Default)]
struct UserStorage {
    transaction: Option<Arc<Transaction>>,
}

#[derive(Debug, Default)]
struct ItemStorage {
    transaction: Option<Arc<Transaction>>,
}

#[derive(Debug, Default)]
struct MyService {
    transaction: Option<Arc<Transaction>>,
    user_storage: Option<Arc<UserStorage>>,
    item_storage: Option<Arc<ItemStorage>>,
}

fn transactional() -> (ServiceCollection, Arc<AtomicUsize>) {
    let opened = Arc::new(AtomicUsize::new(0));
    let counter = opened.clone();

    let mut services = ServiceCollection::new();
    services
        .add_service(
            "transaction",
            Service::with_constructor(
                Provider::from_fn(move || Transaction {
                    id: counter.fetch_add(1, Ordering::SeqCst),
                }),
                vec![],
            )
            .contextual(),
        )
        .add_service(
            "userStorage",
            Service::with_constructor(Provider::from_fn(UserStorage::default), vec![])
                .set_field("Transaction", Dependency::service("transaction"), |s: &mut UserStorage, tx: Arc<Transaction>| {
                    s.transaction = Some(tx)
                }),
        )
        .add_service(
            "itemStorage",
            Service::with_constructor(Provider::from_fn(ItemStorage::default), vec![]).set_field(
                "Transaction",
                Dependency::service("transaction"),
                |s: &mut ItemStorage, tx: Arc<Transaction>| s.transaction = Some(tx),
            ),
        )
        .add_service(
            "myService",
            Service::with_constructor(Provider::from_fn(MyService::default), vec![])
                .set_field("Transaction", Dependency::service("transaction"), |s: &mut MyService, tx: Arc<Transaction>| {
                    s.transaction = Some(tx)
                })
                .set_field("UserStorage", Dependency::service("userStorage"), |s: &mut MyService, u: Arc<UserStorage>| {
                    s.user_storage = Some(u)
                })
                .set_field("ItemStorage", Dependency::service("itemStorage"), |s: &mut MyService, i: Arc<ItemStorage>| {
                    s.item_storage = Some(i)
                }),
        );
    (services, opened)
}

#[test]
fn test_default_scope_is_elevated_to_contextual() {
    let (services, _) = transactional();
    let container = services.build();

    let first = container.get_as::<MyService>("myService").unwrap();
    let second = container.get_as::<MyService>("myService").unwrap();

    let tx = first.transaction.as_ref().unwrap();
    let user_tx = first.user_storage.as_ref().unwrap().transaction.as_ref().unwrap();
    let item_tx = first.item_storage.as_ref().unwrap().transaction.as_ref().unwrap();
    assert!(Arc::ptr_eq(tx, user_tx));
    assert!(Arc::ptr_eq(tx, item_tx));

    let other_tx = second.transaction.as_ref().unwrap();
    assert!(!Arc::ptr_eq(tx, other_tx));
    assert_ne!(tx.id, other_tx.id);
}

#[test]
fn test_contextual_instances_are_isolated_per_context() {
    let (services, opened) = transactional();
    let container = services.build();

    let (request_a, cancel_a) = Context::with_cancel(&Context::background());
    let (request_b, cancel_b) = Context::with_cancel(&Context::background());
    let ctx_a = context_with_container(&request_a, &container);
    let ctx_b = context_with_container(&request_b, &container);

    let a1 = container.get_in_context_as::<MyService>(&ctx_a, "myService").unwrap();
    let a2 = container.get_in_context_as::<Transaction>(&ctx_a, "transaction").unwrap();
    let b1 = container.get_in_context_as::<MyService>(&ctx_b, "myService").unwrap();

    assert!(Arc::ptr_eq(a1.transaction.as_ref().unwrap(), &a2));
    assert!(!Arc::ptr_eq(a1.transaction.as_ref().unwrap(), b1.transaction.as_ref().unwrap()));
    assert!(Arc::ptr_eq(
        &a1,
        &container.get_in_context_as::<MyService>(&ctx_a, "myService").unwrap()
    ));
    assert_eq!(opened.load(Ordering::SeqCst), 2);

    cancel_a.cancel();
    cancel_b.cancel();
}

#[test]
fn test_shared_is_built_once() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();
    let mut services = ServiceCollection::new();
    services.add_service(
        "pool",
        Service::with_constructor(
            Provider::new(move |_: &Args| counter.fetch_add(1, Ordering::SeqCst)),
            vec![],
        )
        .shared(),
    );
    let container = services.build();

    let (request, cancel) = Context::with_cancel(&Context::background());
    let ctx = context_with_container(&request, &container);
    let a = container.get("pool").unwrap();
    let b = container.get_in_context(&ctx, "pool").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(built.load(Ordering::SeqCst), 1);
    cancel.cancel();
}

#[test]
fn test_explicit_shared_is_not_elevated() {
    let (mut services, opened) = transactional();
    services.add_service(
        "audit",
        Service::new()
            .shared()
            .set_field("Transaction", Dependency::service("transaction"), |_: &mut (), _: Arc<Transaction>| {}),
    );
    let container = services.build();

    let first = container.get("audit").unwrap();
    let second = container.get("audit").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(opened.load(Ordering::SeqCst), 1);
}

#[test]
fn test_non_shared_builds_every_time() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();
    let mut services = ServiceCollection::new();
    services.add_service(
        "token",
        Service::with_constructor(Provider::from_fn(move || counter.fetch_add(1, Ordering::SeqCst)), vec![])
            .set_scope(Scope::NonShared),
    );
    let container = services.build();

    let (request, cancel) = Context::with_cancel(&Context::background());
    let ctx = context_with_container(&request, &container);
    container.get("token").unwrap();
    container.get_in_context(&ctx, "token").unwrap();
    container.get_in_context(&ctx, "token").unwrap();
    assert_eq!(built.load(Ordering::SeqCst), 3);
    cancel.cancel();
}

#[test]
fn test_scope_parsing() {
    assert_eq!("contextual".parse::<Scope>().unwrap(), Scope::Contextual);
    assert_eq!(Scope::NonShared.to_string(), "non_shared");
    assert!("request".parse::<Scope>().is_err());
}
