//! Dependency graph over services, params, tags and decorators.
//!
//! Edges point from a node to what it depends on. Self-edges are stored
//! through a helper vertex (`a -> loop(a) -> a`) so cycle enumeration only
//! ever deals with simple edges. Helper vertices sort after every real
//! node, which is what puts `@a -> @a` behind longer cycles starting at
//! `@a` in the cycle report.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::Key;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Vertex {
    Node(Key),
    Loop(Key),
}

impl Vertex {
    fn key(&self) -> Option<&Key> {
        match self {
            Vertex::Node(key) => Some(key),
            Vertex::Loop(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Graph {
    edges: BTreeMap<Vertex, BTreeSet<Vertex>>,
}

impl Graph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_node(&mut self, key: Key) {
        self.edges.entry(Vertex::Node(key)).or_default();
    }

    pub(crate) fn add_edge(&mut self, from: Key, to: Key) {
        if from == to {
            let helper = Vertex::Loop(from.clone());
            self.link(Vertex::Node(from.clone()), helper.clone());
            self.link(helper, Vertex::Node(from));
        } else {
            self.link(Vertex::Node(from), Vertex::Node(to));
        }
    }

    fn link(&mut self, from: Vertex, to: Vertex) {
        self.edges.entry(to.clone()).or_default();
        self.edges.entry(from).or_default().insert(to);
    }

    pub(crate) fn add_service<'a>(&mut self, id: &str, tags: impl IntoIterator<Item = &'a str>) {
        let service = Key::service(id);
        self.add_node(service.clone());
        for tag in tags {
            self.add_edge(Key::tag(tag), service.clone());
            self.add_edge(service.clone(), Key::decorated_by_tag(tag));
        }
    }

    pub(crate) fn add_param(&mut self, id: &str) {
        self.add_node(Key::param(id));
    }

    pub(crate) fn service_depends_on_services<'a>(&mut self, id: &str, services: impl IntoIterator<Item = &'a str>) {
        for dep in services {
            self.add_edge(Key::service(id), Key::service(dep));
        }
    }

    pub(crate) fn service_depends_on_params<'a>(&mut self, id: &str, params: impl IntoIterator<Item = &'a str>) {
        for dep in params {
            self.add_edge(Key::service(id), Key::param(dep));
        }
    }

    pub(crate) fn service_depends_on_tags<'a>(&mut self, id: &str, tags: impl IntoIterator<Item = &'a str>) {
        for tag in tags {
            self.add_edge(Key::service(id), Key::tag(tag));
        }
    }

    pub(crate) fn add_decorator(&mut self, index: usize, tag: &str) {
        self.add_edge(Key::decorated_by_tag(tag), Key::decorator(index));
    }

    pub(crate) fn decorator_depends_on_services<'a>(&mut self, index: usize, services: impl IntoIterator<Item = &'a str>) {
        for dep in services {
            self.add_edge(Key::decorator(index), Key::service(dep));
        }
    }

    pub(crate) fn decorator_depends_on_params<'a>(&mut self, index: usize, params: impl IntoIterator<Item = &'a str>) {
        for dep in params {
            self.add_edge(Key::decorator(index), Key::param(dep));
        }
    }

    pub(crate) fn decorator_depends_on_tags<'a>(&mut self, index: usize, tags: impl IntoIterator<Item = &'a str>) {
        for tag in tags {
            self.add_edge(Key::decorator(index), Key::tag(tag));
        }
    }

    pub(crate) fn param_depends_on_param(&mut self, id: &str, dep: &str) {
        self.add_edge(Key::param(id), Key::param(dep));
    }

    /// Real nodes in sorted order.
    pub(crate) fn nodes(&self) -> Vec<Key> {
        self.edges.keys().filter_map(Vertex::key).cloned().collect()
    }

    /// Edges between real nodes, self-edges restored.
    pub(crate) fn edges(&self) -> Vec<(Key, Key)> {
        let mut out = Vec::new();
        for (from, targets) in &self.edges {
            let Vertex::Node(from) = from else { continue };
            for to in targets {
                match to {
                    Vertex::Node(to) => out.push((from.clone(), to.clone())),
                    Vertex::Loop(_) => out.push((from.clone(), from.clone())),
                }
            }
        }
        out
    }

    /// Every node reachable from the service, sorted, without the service itself.
    pub(crate) fn deps(&self, service_id: &str) -> Vec<Key> {
        let start = Vertex::Node(Key::service(service_id));
        let mut seen: BTreeSet<&Vertex> = BTreeSet::new();
        let mut stack: Vec<&Vertex> = vec![&start];
        while let Some(vertex) = stack.pop() {
            let Some(targets) = self.edges.get(vertex) else { continue };
            for target in targets {
                if seen.insert(target) {
                    stack.push(target);
                }
            }
        }
        seen.into_iter()
            .filter(|v| **v != start)
            .filter_map(Vertex::key)
            .cloned()
            .collect()
    }

    /// Every elementary cycle, normalized, sorted and closed.
    ///
    /// Cycles are enumerated with Johnson's algorithm over the sorted
    /// vertex order, rotated to start at their smallest service (or their
    /// smallest node when they contain no service) and sorted by node
    /// sequence.
    pub(crate) fn circular_deps(&self) -> Vec<Vec<Key>> {
        let vertices: Vec<&Vertex> = self.edges.keys().collect();
        let index: HashMap<&Vertex, usize> = vertices.iter().enumerate().map(|(i, v)| (*v, i)).collect();
        let n = vertices.len();

        let mut adj = vec![Vec::new(); n];
        let mut radj = vec![Vec::new(); n];
        for (from, targets) in &self.edges {
            let f = index[from];
            for to in targets {
                let t = index[to];
                adj[f].push(t);
                radj[t].push(f);
            }
        }

        let mut search = Johnson::new(&adj);
        for start in 0..n {
            let component = strong_component(start, &adj, &radj);
            if component.iter().filter(|in_scc| **in_scc).count() < 2 {
                continue;
            }
            search.run(start, component);
        }

        let mut cycles: Vec<Vec<&Vertex>> = search
            .cycles
            .into_iter()
            .map(|cycle| normalize(cycle.into_iter().map(|i| vertices[i]).collect()))
            .collect();
        cycles.sort();
        cycles.dedup();

        cycles
            .into_iter()
            .map(|cycle| {
                let mut keys: Vec<Key> = cycle.into_iter().filter_map(Vertex::key).cloned().collect();
                if let Some(first) = keys.first().cloned() {
                    keys.push(first);
                }
                keys
            })
            .collect()
    }
}

/// Rotates a cycle to start at its smallest service, else its smallest node.
fn normalize(mut cycle: Vec<&Vertex>) -> Vec<&Vertex> {
    let smallest_service = cycle
        .iter()
        .enumerate()
        .filter(|(_, v)| matches!(v, Vertex::Node(Key::Service(_))))
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(i, _)| i);
    let start = smallest_service.or_else(|| {
        cycle
            .iter()
            .enumerate()
            .filter(|(_, v)| v.key().is_some())
            .min_by(|(_, a), (_, b)| a.cmp(b))
            .map(|(i, _)| i)
    });
    if let Some(start) = start {
        cycle.rotate_left(start);
    }
    cycle
}

/// Strongly connected component of `start` in the subgraph of vertices `>= start`.
fn strong_component(start: usize, adj: &[Vec<usize>], radj: &[Vec<usize>]) -> Vec<bool> {
    let forward = reachable(start, adj);
    let backward = reachable(start, radj);
    forward.iter().zip(backward.iter()).map(|(f, b)| *f && *b).collect()
}

fn reachable(start: usize, adj: &[Vec<usize>]) -> Vec<bool> {
    let mut seen = vec![false; adj.len()];
    seen[start] = true;
    let mut stack = vec![start];
    while let Some(v) = stack.pop() {
        for &w in &adj[v] {
            if w >= start && !seen[w] {
                seen[w] = true;
                stack.push(w);
            }
        }
    }
    seen
}

struct Johnson<'g> {
    adj: &'g [Vec<usize>],
    in_scc: Vec<bool>,
    blocked: Vec<bool>,
    blocked_by: Vec<Vec<usize>>,
    stack: Vec<usize>,
    cycles: Vec<Vec<usize>>,
}

impl<'g> Johnson<'g> {
    fn new(adj: &'g [Vec<usize>]) -> Self {
        let n = adj.len();
        Self {
            adj,
            in_scc: vec![false; n],
            blocked: vec![false; n],
            blocked_by: vec![Vec::new(); n],
            stack: Vec::new(),
            cycles: Vec::new(),
        }
    }

    fn run(&mut self, start: usize, component: Vec<bool>) {
        self.in_scc = component;
        for i in 0..self.adj.len() {
            self.blocked[i] = false;
            self.blocked_by[i].clear();
        }
        self.circuit(start, start);
    }

    fn circuit(&mut self, v: usize, start: usize) -> bool {
        let mut found = false;
        self.stack.push(v);
        self.blocked[v] = true;

        let adj = self.adj;
        for &w in &adj[v] {
            if !self.in_scc[w] {
                continue;
            }
            if w == start {
                self.cycles.push(self.stack.clone());
                found = true;
            } else if !self.blocked[w] && self.circuit(w, start) {
                found = true;
            }
        }

        if found {
            self.unblock(v);
        } else {
            for &w in &adj[v] {
                if self.in_scc[w] && !self.blocked_by[w].contains(&v) {
                    self.blocked_by[w].push(v);
                }
            }
        }

        self.stack.pop();
        found
    }

    fn unblock(&mut self, u: usize) {
        self.blocked[u] = false;
        let waiting = std::mem::take(&mut self.blocked_by[u]);
        for w in waiting {
            if self.blocked[w] {
                self.unblock(w);
            }
        }
    }
}
