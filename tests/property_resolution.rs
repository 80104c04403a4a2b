/// Property-based tests for service resolution
///
/// These tests verify that resolution behavior follows expected patterns
/// regardless of the specific services or configuration used.

use ferrous_container::{Args, Dependency, Provider, Service, ServiceCollection};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn depends_on(ids: &[String]) -> Service {
    ids.iter().fold(Service::new(), |service, id| {
        service.set_field(id.clone(), Dependency::service(id.clone()), |_: &mut (), _: Arc<()>| {})
    })
}

// Property: tag resolution is sorted by priority descending, then id ascending
proptest! {
    #[test]
    fn tagged_services_are_ordered(members in prop::collection::btree_map("[a-z]{1,6}", -5i32..5, 1..12)) {
        let mut services = ServiceCollection::new();
        for (id, priority) in &members {
            services.add_service(id.clone(), Service::with_value(id.clone()).set_tag("group", *priority));
        }
        let container = services.build();

        let resolved: Vec<String> = container
            .get_tagged_by_as::<String>("group")
            .unwrap()
            .iter()
            .map(|s| (**s).clone())
            .collect();

        let mut expected: Vec<(&String, &i32)> = members.iter().collect();
        expected.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        let expected: Vec<String> = expected.into_iter().map(|(id, _)| id.clone()).collect();
        prop_assert_eq!(&resolved, &expected);

        let again: Vec<String> = container
            .get_tagged_by_as::<String>("group")
            .unwrap()
            .iter()
            .map(|s| (**s).clone())
            .collect();
        prop_assert_eq!(resolved, again);
    }
}

// Property: cycle reports are deterministic and every cycle is closed
proptest! {
    #[test]
    fn cycle_reports_are_deterministic(edges in prop::collection::vec((0usize..6, 0usize..6), 0..14)) {
        let mut graph: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for i in 0..6 {
            graph.insert(format!("s{}", i), Vec::new());
        }
        for (from, to) in &edges {
            let deps = graph.get_mut(&format!("s{}", from)).unwrap();
            let to = format!("s{}", to);
            if !deps.contains(&to) {
                deps.push(to);
            }
        }

        let build = || {
            let mut services = ServiceCollection::new();
            for (id, deps) in &graph {
                services.add_service(id.clone(), depends_on(deps));
            }
            services.build()
        };

        let first = build().circular_deps().err().map(|e| e.to_string());
        let second = build().circular_deps().err().map(|e| e.to_string());
        prop_assert_eq!(&first, &second);

        if let Some(report) = first {
            for line in report.lines() {
                let nodes: Vec<&str> = line.split(" -> ").collect();
                prop_assert!(nodes.len() >= 2);
                prop_assert_eq!(nodes.first(), nodes.last());
                let smallest = nodes.iter().min().unwrap();
                prop_assert_eq!(nodes[0], *smallest);
            }
        }
    }
}

// Property: a shared constructor runs once however often it is resolved
proptest! {
    #[test]
    fn shared_constructor_runs_once(resolutions in 1usize..20) {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = builds.clone();
        let mut services = ServiceCollection::new();
        services.add_service(
            "svc",
            Service::with_constructor(
                Provider::new(move |_: &Args| counter.fetch_add(1, Ordering::SeqCst)),
                vec![],
            ),
        );
        let container = services.build();

        for _ in 0..resolutions {
            container.get("svc").unwrap();
        }
        prop_assert_eq!(builds.load(Ordering::SeqCst), 1);
    }
}

// Property: resolving an unregistered id fails without affecting registered ones
proptest! {
    #[test]
    fn missing_ids_fail_cleanly(id in "[a-z]{1,10}", registered in any::<bool>()) {
        let mut services = ServiceCollection::new();
        if registered {
            services.add_service(id.clone(), Service::with_value(1u8));
        }
        let container = services.build();

        let result = container.get(&id);
        prop_assert_eq!(result.is_ok(), registered);
        if let Err(err) = result {
            prop_assert_eq!(err.to_string(), format!("Container.get({:?}): service does not exist", id));
        }
    }
}
