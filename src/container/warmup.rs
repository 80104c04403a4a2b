//! Graph-derived data, computed once per configuration.

use std::cmp::Reverse;
use std::collections::HashMap;

use super::State;
use crate::dependency::Dependency;
use crate::internal::Graph;
use crate::{DiError, Key, Scope};

/// Cycles, effective scopes and tag membership of one configuration.
pub(crate) struct Warm {
    graph: Graph,
    cycles: Vec<Vec<Key>>,
    service_cycles: HashMap<String, Vec<usize>>,
    param_cycles: HashMap<String, Vec<usize>>,
    scopes: HashMap<String, Scope>,
    tagged: HashMap<String, Vec<String>>,
}

#[derive(Default)]
struct Targets<'a> {
    services: Vec<&'a str>,
    params: Vec<&'a str>,
    tags: Vec<&'a str>,
}

impl<'a> Targets<'a> {
    fn of(deps: impl IntoIterator<Item = &'a Dependency>) -> Self {
        let mut targets = Self::default();
        for dep in deps {
            match dep {
                Dependency::Service(id) => targets.services.push(id),
                Dependency::Param(id) => targets.params.push(id),
                Dependency::Tag(tag) => targets.tags.push(tag),
                _ => {}
            }
        }
        targets
    }
}

impl Warm {
    pub(crate) fn build(state: &State) -> Self {
        let mut graph = Graph::new();

        let mut ids: Vec<&String> = state.services.keys().collect();
        ids.sort();
        for id in &ids {
            let service = &state.services[id.as_str()];
            graph.add_service(id, service.tags().keys().map(String::as_str));
            let targets = Targets::of(service.dependencies());
            graph.service_depends_on_services(id, targets.services);
            graph.service_depends_on_params(id, targets.params);
            graph.service_depends_on_tags(id, targets.tags);
        }

        for (index, entry) in state.decorators.iter().enumerate() {
            graph.add_decorator(index, &entry.tag);
            let targets = Targets::of(&entry.deps);
            graph.decorator_depends_on_services(index, targets.services);
            graph.decorator_depends_on_params(index, targets.params);
            graph.decorator_depends_on_tags(index, targets.tags);
        }

        let mut param_ids: Vec<&String> = state.params.keys().collect();
        param_ids.sort();
        for id in &param_ids {
            graph.add_param(id);
            if let Dependency::Param(dep) = &state.params[id.as_str()] {
                graph.param_depends_on_param(id, dep);
            }
        }

        let cycles = graph.circular_deps();
        let mut service_cycles: HashMap<String, Vec<usize>> = HashMap::new();
        let mut param_cycles: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, cycle) in cycles.iter().enumerate() {
            // the last node closes the cycle
            for key in &cycle[..cycle.len().saturating_sub(1)] {
                match key {
                    Key::Service(id) => service_cycles.entry(id.clone()).or_default().push(index),
                    Key::Param(id) => param_cycles.entry(id.clone()).or_default().push(index),
                    _ => {}
                }
            }
        }

        let mut scopes = HashMap::with_capacity(ids.len());
        for id in &ids {
            let declared = state.services[id.as_str()].scope();
            let effective = match declared {
                Scope::Default => {
                    let contextual = graph.deps(id).iter().any(|key| {
                        key.as_service()
                            .and_then(|dep| state.services.get(dep))
                            .map_or(false, |dep| dep.scope() == Scope::Contextual)
                    });
                    if contextual {
                        Scope::Contextual
                    } else {
                        Scope::Shared
                    }
                }
                other => other,
            };
            scopes.insert(id.to_string(), effective);
        }

        let mut ranked: HashMap<&str, Vec<(i32, &str)>> = HashMap::new();
        for id in &ids {
            for (tag, priority) in state.services[id.as_str()].tags() {
                ranked.entry(tag.as_str()).or_default().push((*priority, id.as_str()));
            }
        }
        let tagged = ranked
            .into_iter()
            .map(|(tag, mut members)| {
                members.sort_by_key(|&(priority, id)| (Reverse(priority), id));
                let ids = members.into_iter().map(|(_, id)| id.to_string()).collect();
                (tag.to_string(), ids)
            })
            .collect();

        tracing::debug!(
            services = ids.len(),
            params = param_ids.len(),
            decorators = state.decorators.len(),
            cycles = cycles.len(),
            "dependency graph warmed up"
        );

        Self {
            graph,
            cycles,
            service_cycles,
            param_cycles,
            scopes,
            tagged,
        }
    }

    pub(crate) fn graph(&self) -> &Graph {
        &self.graph
    }

    pub(crate) fn cycles(&self) -> &[Vec<Key>] {
        &self.cycles
    }

    pub(crate) fn service_cycles(&self, id: &str) -> Option<DiError> {
        self.cycle_error(self.service_cycles.get(id))
    }

    pub(crate) fn param_cycles(&self, id: &str) -> Option<DiError> {
        self.cycle_error(self.param_cycles.get(id))
    }

    fn cycle_error(&self, indexes: Option<&Vec<usize>>) -> Option<DiError> {
        let errors = indexes?
            .iter()
            .map(|&i| DiError::Circular(self.cycles[i].clone()))
            .collect();
        DiError::group(errors).map(|err| err.prefix("circular dependencies: "))
    }

    /// Effective scope of a registered service.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not registered when the graph was warmed up.
    pub(crate) fn resolve_scope(&self, id: &str) -> Scope {
        match self.scopes.get(id) {
            Some(scope) => *scope,
            None => panic!("resolve_scope: service {:?} is not registered", id),
        }
    }

    /// Effective scope of `id`, or `None` when it was only referenced.
    pub(crate) fn scope(&self, id: &str) -> Option<Scope> {
        self.scopes.get(id).copied()
    }

    /// Ids carrying `tag`, by priority descending then id ascending.
    pub(crate) fn tagged(&self, tag: &str) -> &[String] {
        self.tagged.get(tag).map_or(&[], Vec::as_slice)
    }
}
