//! Request Scope Demo - contextual services, decorators and hot-swap
//!
//! This example demonstrates:
//! - A contextual transaction shared by every repository within one request
//! - Default-scoped repositories elevated to contextual automatically
//! - A tag decorator wrapping every repository
//! - Reconfiguring the database url with `hot_swap` while requests run
//! - Cycle diagnostics and a DOT export of the graph

use ferrous_container::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug)]
struct Transaction {
    id: u32,
    url: String,
}

#[derive(Debug, Clone, Default)]
struct Repository {
    table: String,
    transaction: Option<Arc<Transaction>>,
    audited: bool,
}

fn repository(table: &str) -> Service {
    Service::with_value(Repository {
        table: table.to_string(),
        ..Repository::default()
    })
    .set_field("transaction", Dependency::service("transaction"), |r: &mut Repository, tx: Arc<Transaction>| {
        r.transaction = Some(tx)
    })
    .set_tag("repository", 0)
}

fn build() -> Container {
    let next_tx = Arc::new(AtomicU32::new(1));

    let mut services = ServiceCollection::new();
    services
        .add_param("db_url", Dependency::value(String::from("postgres://primary")))
        .add_service(
            "transaction",
            Service::with_constructor(
                Provider::fallible(move |args: &Args| {
                    let url = args.value::<String>(0)?;
                    Ok::<_, DiError>(Transaction {
                        id: next_tx.fetch_add(1, Ordering::SeqCst),
                        url,
                    })
                }),
                vec![Dependency::param("db_url")],
            )
            .contextual(),
        )
        .add_service("users", repository("users"))
        .add_service("orders", repository("orders"))
        .add_decorator(
            "repository",
            Decorator::map(|repo: Repository, _: &Args| Repository { audited: true, ..repo }),
            vec![],
        )
        .add_observer(Arc::new(LoggingObserver::with_prefix("demo")));
    services.build()
}

fn handle_request(container: &Container, request_id: u32) -> DiResult<()> {
    let (request, done) = Context::with_cancel(&Context::background());
    let ctx = context_with_container(&request, container);

    let users = container.get_in_context_as::<Repository>(&ctx, "users")?;
    let orders = container.get_in_context_as::<Repository>(&ctx, "orders")?;
    let (Some(a), Some(b)) = (&users.transaction, &orders.transaction) else {
        return Err(DiError::msg("repository without transaction"));
    };

    println!(
        "request {:>2}: {} + {} share tx #{} on {} (same: {}, audited: {})",
        request_id,
        users.table,
        orders.table,
        a.id,
        a.url,
        Arc::ptr_eq(a, b),
        users.audited && orders.audited,
    );

    done.cancel();
    Ok(())
}

fn main() -> DiResult<()> {
    println!("=== Request Scope Demo ===\n");
    let container = build();

    for request_id in 1..=3 {
        handle_request(&container, request_id)?;
    }

    println!("\n--- hot swap to the replica while requests run ---");
    let workers: Vec<_> = (4..=7)
        .map(|request_id| {
            let container = container.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(u64::from(request_id)));
                handle_request(&container, request_id)
            })
        })
        .collect();

    container.hot_swap(|swap| {
        swap.override_param("db_url", Dependency::value(String::from("postgres://replica")));
        Ok(())
    })?;

    for worker in workers {
        worker
            .join()
            .map_err(|_| DiError::msg("request thread panicked"))??;
    }

    println!("\n--- diagnostics ---");
    container.override_param("db_url", Dependency::param("db_url"));
    if let Err(err) = container.circular_deps() {
        println!("cycles:\n{}", err);
    }
    println!("\n{}", container.export_graph().to_dot());

    Ok(())
}
