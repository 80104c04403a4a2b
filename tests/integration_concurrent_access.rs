/// Concurrent access integration tests
///
/// These tests verify that the container behaves correctly under concurrent
/// access: shared services are built at most once, contextual bags stay
/// isolated, and overrides racing with resolutions never deadlock.

use ferrous_container::{
    context_with_container, Args, Container, Context, Dependency, Provider, Service, ServiceCollection,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

// ===== Test Services =====

#[derive(Debug)]
pub struct ExpensiveService {
    id: u32,
}

#[derive(Debug)]
pub struct RequestState {
    id: u32,
}

fn slow_shared(builds: Arc<AtomicU32>) -> Service {
    Service::with_constructor(
        Provider::new(move |_: &Args| {
            thread::sleep(Duration::from_millis(10));
            ExpensiveService {
                id: builds.fetch_add(1, Ordering::SeqCst),
            }
        }),
        vec![],
    )
    .shared()
}

// ===== Integration Tests =====

#[test]
fn test_shared_service_built_at_most_once() {
    let builds = Arc::new(AtomicU32::new(0));
    let mut services = ServiceCollection::new();
    services.add_service("expensive", slow_shared(builds.clone()));
    let container = services.build();

    let thread_count = 16;
    let barrier = Arc::new(Barrier::new(thread_count));
    let handles: Vec<_> = (0..thread_count)
        .map(|_| {
            let container = container.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                container.get_as::<ExpensiveService>("expensive").unwrap()
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|s| Arc::ptr_eq(s, &results[0])));
    assert_eq!(results[0].id, 0);
}

#[test]
fn test_contextual_isolation_across_threads() {
    let next = Arc::new(AtomicU32::new(0));
    let counter = next.clone();
    let mut services = ServiceCollection::new();
    services.add_service(
        "state",
        Service::with_constructor(
            Provider::from_fn(move || RequestState {
                id: counter.fetch_add(1, Ordering::SeqCst),
            }),
            vec![],
        )
        .contextual(),
    );
    let container = services.build();

    let thread_count = 10;
    let barrier = Arc::new(Barrier::new(thread_count));
    let handles: Vec<_> = (0..thread_count)
        .map(|_| {
            let container = container.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let (request, cancel) = Context::with_cancel(&Context::background());
                let ctx = context_with_container(&request, &container);
                let first = container.get_in_context_as::<RequestState>(&ctx, "state").unwrap();
                let second = container.get_in_context_as::<RequestState>(&ctx, "state").unwrap();
                assert!(Arc::ptr_eq(&first, &second));
                cancel.cancel();
                first.id
            })
        })
        .collect();

    let mut ids: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), thread_count);
    assert_eq!(container.active_contexts(), 0);
}

#[test]
fn test_contextual_build_is_serialised_within_one_bag() {
    let builds = Arc::new(AtomicU32::new(0));
    let counter = builds.clone();
    let mut services = ServiceCollection::new();
    services.add_service(
        "state",
        Service::with_constructor(
            Provider::new(move |_: &Args| {
                thread::sleep(Duration::from_millis(5));
                RequestState {
                    id: counter.fetch_add(1, Ordering::SeqCst),
                }
            }),
            vec![],
        )
        .contextual(),
    );
    let container = services.build();
    let (request, cancel) = Context::with_cancel(&Context::background());
    let ctx = context_with_container(&request, &container);

    crossbeam_utils::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|_| container.get_in_context_as::<RequestState>(&ctx, "state").unwrap());
        }
    })
    .unwrap();

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    cancel.cancel();
}

#[test]
fn test_overrides_racing_with_resolutions() {
    let mut services = ServiceCollection::new();
    services
        .add_param("version", Dependency::value(0u32))
        .add_service(
            "versioned",
            Service::with_constructor(
                Provider::fallible(|args: &Args| args.value::<u32>(0)),
                vec![Dependency::param("version")],
            )
            .non_shared(),
        );
    let container = services.build();

    let writer = {
        let container: Container = container.clone();
        thread::spawn(move || {
            for v in 1..=50u32 {
                container.override_param("version", Dependency::value(v));
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let container = container.clone();
            thread::spawn(move || {
                let mut last = 0;
                for _ in 0..200 {
                    let v = *container.get_as::<u32>("versioned").unwrap();
                    assert!(v <= 50);
                    last = v;
                }
                last
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(*container.get_as::<u32>("versioned").unwrap(), 50);
}

#[test]
fn test_provider_calling_back_into_container() {
    let mut services = ServiceCollection::new();
    services
        .add_service("base", Service::with_value(10u32))
        .add_service(
            "derived",
            Service::with_constructor(
                Provider::fallible(|args: &Args| {
                    let container = args.get::<Arc<Container>>(0)?;
                    container.get_as::<u32>("base").map(|b| *b * 2)
                }),
                vec![Dependency::Container],
            ),
        );
    let container = services.build();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let container = container.clone();
            thread::spawn(move || {
                if i % 2 == 0 {
                    container.override_service("base", Service::with_value(10u32));
                }
                *container.get_as::<u32>("derived").unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 20);
    }
}
