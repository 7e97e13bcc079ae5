//! The bidirectional allocation index (§4.2).
//!
//! Design note (see DESIGN.md): rather than maintaining the forward
//! (consumer → source → amount) and reverse (source → consumer → amount)
//! mappings as independently-mutable tables that can drift from the graph
//! (a classic way for this kind of dual index to rot), this index
//! treats the [`Graph`]'s edge flows as the single authoritative record of
//! every allocation. The forward/reverse "mappings" are views computed from
//! the graph's adjacency, which is itself amortized O(1) per edge, so I3/I4
//! hold by construction rather than by discipline. `load`/`allocated` are the
//! only independently-stored derived fields, and every public method that
//! touches them also touches the graph in the same call, so they can never
//! observably disagree with it.

use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::types::{AllocationRecord, Consumer, ConsumerId, Source, SourceId};
use indexmap::IndexMap;

/// The bidirectional allocation index and the graph it mirrors.
#[derive(Debug, Clone)]
pub struct AllocationIndex {
    graph: Graph,
    sources: IndexMap<SourceId, Source>,
    consumers: IndexMap<ConsumerId, Consumer>,
    tolerance: f64,
}

impl AllocationIndex {
    /// Create an empty index. `tolerance` is ε from [`crate::config::Config`].
    pub fn new(tolerance: f64) -> Self {
        Self {
            graph: Graph::new(),
            sources: IndexMap::new(),
            consumers: IndexMap::new(),
            tolerance,
        }
    }

    /// Configured numeric tolerance.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Read-only access to the flow network, for the offline allocator and
    /// the queues to enumerate nodes/edges without duplicating state.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Mutable access to the flow network. Reserved for the offline
    /// allocator (§4.4), which must add super-source/super-sink nodes and
    /// run Edmonds–Karp directly against the same persistent graph the index
    /// mirrors, then call [`AllocationIndex::rebuild_from_flow`] to
    /// resynchronize derived fields.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Register a new source (bootstrap or `source-added`, §4.7).
    pub fn add_source(&mut self, source: Source) {
        self.graph.add_node(source.id.clone());
        self.sources.insert(source.id.clone(), source);
    }

    /// Register a new consumer (bootstrap or `consumer-added`, §4.7).
    pub fn add_consumer(&mut self, consumer: Consumer) {
        self.graph.add_node(consumer.id.clone());
        self.consumers.insert(consumer.id.clone(), consumer);
    }

    /// Look up a source by id.
    pub fn source(&self, id: &str) -> Option<&Source> {
        self.sources.get(id)
    }

    /// Look up a consumer by id.
    pub fn consumer(&self, id: &str) -> Option<&Consumer> {
        self.consumers.get(id)
    }

    /// Mutable lookup, for the dispatcher to adjust demand/priority.
    pub fn consumer_mut(&mut self, id: &str) -> Option<&mut Consumer> {
        self.consumers.get_mut(id)
    }

    /// Mutable lookup, for the dispatcher to flip `active` ahead of a
    /// `remove_source_completely` cascade.
    pub fn source_mut(&mut self, id: &str) -> Option<&mut Source> {
        self.sources.get_mut(id)
    }

    /// All sources, in registration order.
    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        self.sources.values()
    }

    /// All consumers, in registration order.
    pub fn consumers(&self) -> impl Iterator<Item = &Consumer> {
        self.consumers.values()
    }

    /// The amount currently allocated from `source_id` to `consumer_id`, or
    /// 0 if no such allocation exists.
    pub fn amount(&self, source_id: &str, consumer_id: &str) -> f64 {
        self.graph
            .edge_id(source_id, consumer_id)
            .map(|e| self.graph.flow(e))
            .unwrap_or(0.0)
    }

    /// Forward index: every (source, amount) pair currently allocated to
    /// `consumer_id`, amount > ε.
    pub fn allocations_for_consumer(&self, consumer_id: &str) -> Vec<(SourceId, f64)> {
        self.graph
            .incoming(consumer_id)
            .into_iter()
            .filter(|(from, _)| self.sources.contains_key(from))
            .filter_map(|(from, edge_id)| {
                let amount = self.graph.flow(edge_id);
                (amount > self.tolerance).then_some((from, amount))
            })
            .collect()
    }

    /// Reverse index: every (consumer, amount) pair currently drawing from
    /// `source_id`, amount > ε.
    pub fn allocations_for_source(&self, source_id: &str) -> Vec<(ConsumerId, f64)> {
        self.graph
            .outgoing(source_id)
            .into_iter()
            .filter(|(to, _)| self.consumers.contains_key(to))
            .filter_map(|(to, edge_id)| {
                let amount = self.graph.flow(edge_id);
                (amount > self.tolerance).then_some((to, amount))
            })
            .collect()
    }

    /// All allocation triples currently in the system (amount > ε).
    pub fn all_allocations(&self) -> Vec<AllocationRecord> {
        let mut out = Vec::new();
        for source in self.sources.values() {
            for (consumer_id, amount) in self.allocations_for_source(&source.id) {
                out.push(AllocationRecord {
                    source_id: source.id.clone(),
                    consumer_id,
                    amount,
                });
            }
        }
        out
    }

    /// `add(c, s, a)` (§4.2): requires `a > 0` and `a <= available(s)`.
    /// Additive: if an allocation `(s, c)` already exists, `a` is added to it
    /// rather than replacing it.
    pub fn add(&mut self, consumer_id: &str, source_id: &str, amount: f64) -> Result<()> {
        if amount <= 0.0 {
            return Err(Error::invariant("index::add", "amount must be positive"));
        }
        let available = self
            .sources
            .get(source_id)
            .ok_or_else(|| Error::source_not_found(source_id))?
            .available();
        if amount > available + self.tolerance {
            return Err(Error::invariant(
                "index::add",
                format!("amount {amount} exceeds available capacity {available} on {source_id}"),
            ));
        }
        if !self.consumers.contains_key(consumer_id) {
            return Err(Error::consumer_not_found(consumer_id));
        }

        let edge_id = match self.graph.edge_id(source_id, consumer_id) {
            Some(e) => e,
            None => {
                let capacity = self.sources[source_id].capacity;
                self.graph.add_edge(source_id, consumer_id, capacity)?
            }
        };
        self.graph.push_flow(edge_id, amount)?;

        self.sources.get_mut(source_id).unwrap().load += amount;
        self.consumers.get_mut(consumer_id).unwrap().allocated += amount;
        Ok(())
    }

    /// `update(c, s, a')` (§4.2): requires the `(s, c)` allocation to already
    /// exist. Replaces the amount outright.
    pub fn update(&mut self, consumer_id: &str, source_id: &str, new_amount: f64) -> Result<()> {
        let edge_id = self.graph.edge_id(source_id, consumer_id).ok_or_else(|| {
            Error::invariant(
                "index::update",
                format!("no existing allocation ({source_id}, {consumer_id})"),
            )
        })?;
        let current = self.graph.flow(edge_id);
        let delta = new_amount - current;
        self.graph.push_flow(edge_id, delta)?;
        self.sources.get_mut(source_id).unwrap().load += delta;
        self.consumers.get_mut(consumer_id).unwrap().allocated += delta;
        Ok(())
    }

    /// `remove(c, s)` (§4.2): zeroes the edge's flow and drops the
    /// allocation. A no-op if no such allocation exists.
    pub fn remove(&mut self, consumer_id: &str, source_id: &str) -> Result<()> {
        let Some(edge_id) = self.graph.edge_id(source_id, consumer_id) else {
            return Ok(());
        };
        let current = self.graph.flow(edge_id);
        if current <= self.tolerance {
            return Ok(());
        }
        self.graph.push_flow(edge_id, -current)?;
        if let Some(s) = self.sources.get_mut(source_id) {
            s.load = (s.load - current).max(0.0);
        }
        if let Some(c) = self.consumers.get_mut(consumer_id) {
            c.allocated = (c.allocated - current).max(0.0);
        }
        Ok(())
    }

    /// `remove-source-completely(s)` (§4.2): atomically removes every
    /// allocation referencing `s`, then removes `s` itself. Deactivation
    /// alone is never sufficient: this removes the node, its edges, and its
    /// index/registry entry in one call, so there is no intermediate state
    /// in which a stale reference to `s` could be observed.
    pub fn remove_source_completely(&mut self, source_id: &str) {
        self.graph.remove_node(source_id);
        self.sources.shift_remove(source_id);
        self.rebuild_from_flow();
    }

    /// `rebuild-from-flow()` (§4.2): discard the derived `load`/`allocated`
    /// fields and recompute them from scratch by scanning every
    /// source→consumer edge with flow > ε. Idempotent (L1): calling this
    /// between events never changes observable state, since the graph's
    /// edge flows are already authoritative.
    pub fn rebuild_from_flow(&mut self) {
        for source in self.sources.values_mut() {
            source.load = 0.0;
        }
        for consumer in self.consumers.values_mut() {
            consumer.allocated = 0.0;
        }
        let source_ids: Vec<SourceId> = self.sources.keys().cloned().collect();
        for source_id in source_ids {
            let edges = self.graph.outgoing(&source_id);
            let mut load = 0.0;
            for (to, edge_id) in edges {
                if !self.consumers.contains_key(&to) {
                    continue;
                }
                let flow = self.graph.flow(edge_id);
                if flow > self.tolerance {
                    load += flow;
                    self.consumers.get_mut(&to).unwrap().allocated += flow;
                }
            }
            self.sources.get_mut(&source_id).unwrap().load = load;
        }
    }

    /// Check invariants I1–I4 over the current state. Used by tests and by
    /// the property suite (§8); never called from production code paths,
    /// since the primitives above are constructed to make violation
    /// unreachable.
    pub fn check_invariants(&self) -> Result<()> {
        for source in self.sources.values() {
            if source.load < -self.tolerance || source.load > source.capacity + self.tolerance {
                return Err(Error::invariant(
                    "check_invariants",
                    format!("source {} load {} out of [0, {}]", source.id, source.load, source.capacity),
                ));
            }
            let actual: f64 = self.allocations_for_source(&source.id).iter().map(|(_, a)| a).sum();
            if (actual - source.load).abs() > self.tolerance.max(1e-6) * 10.0 {
                return Err(Error::invariant(
                    "check_invariants",
                    format!("source {} load {} disagrees with Σallocations {}", source.id, source.load, actual),
                ));
            }
        }
        for consumer in self.consumers.values() {
            if consumer.allocated < -self.tolerance || consumer.allocated > consumer.demand + self.tolerance {
                return Err(Error::invariant(
                    "check_invariants",
                    format!(
                        "consumer {} allocated {} out of [0, {}]",
                        consumer.id, consumer.allocated, consumer.demand
                    ),
                ));
            }
        }
        Ok(())
    }
}
