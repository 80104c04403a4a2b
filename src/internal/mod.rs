//! Internal implementation details.

pub(crate) mod graph;
pub(crate) mod group;
pub(crate) mod safe_map;

pub(crate) use graph::Graph;
pub(crate) use group::GroupContext;
pub(crate) use safe_map::SafeMap;
