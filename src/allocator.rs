//! Priority-layered offline allocator (§4.4).
//!
//! Computes a lexicographically-optimal initial allocation: one Edmonds–Karp
//! run per priority class, in ascending numeric priority (1 = most
//! important), each over a private super-sink wired only to that class's
//! unmet consumers. A shared super-source feeds every active source, its
//! per-source edge capacity shrinking class over class as earlier classes
//! commit load. Flow committed by an earlier class is never revisited: the
//! source→consumer edges that carry it are real, persistent edges, not part
//! of the super-source/super-sink scaffolding, which is torn down class by
//! class.

use crate::error::Result;
use crate::graph::flow::edmonds_karp;
use crate::index::AllocationIndex;

const SUPER_SOURCE: &str = "__super_source__";

fn super_sink(priority: u32) -> String {
    format!("__super_sink_{priority}__")
}

/// Run the offline allocator over every priority class present among
/// `index`'s consumers. Returns the total flow served per class, in
/// ascending priority order (deterministic even though the specific paths
/// chosen within a class are not).
pub fn run(index: &mut AllocationIndex) -> Result<Vec<(u32, f64)>> {
    let tolerance = index.tolerance();
    let mut priorities: Vec<u32> = index
        .consumers()
        .filter(|c| c.remaining() > tolerance)
        .map(|c| c.priority)
        .collect();
    priorities.sort_unstable();
    priorities.dedup();

    index.graph_mut().add_node(SUPER_SOURCE);

    let mut served = Vec::with_capacity(priorities.len());
    for priority in priorities {
        let flow = run_class(index, priority)?;
        served.push((priority, flow));
    }

    index.graph_mut().remove_node(SUPER_SOURCE);
    Ok(served)
}

fn run_class(index: &mut AllocationIndex, priority: u32) -> Result<f64> {
    let tolerance = index.tolerance();
    let sink = super_sink(priority);

    let consumer_ids: Vec<String> = index
        .consumers()
        .filter(|c| c.priority == priority && c.remaining() > tolerance)
        .map(|c| c.id.clone())
        .collect();
    let source_ids: Vec<String> = index
        .sources()
        .filter(|s| s.active && s.capacity > tolerance)
        .map(|s| s.id.clone())
        .collect();

    if consumer_ids.is_empty() || source_ids.is_empty() {
        return Ok(0.0);
    }

    index.graph_mut().add_node(&sink);

    for consumer_id in &consumer_ids {
        let remaining = index.consumer(consumer_id).unwrap().remaining();
        index.graph_mut().add_edge(consumer_id, &sink, remaining)?;
    }

    for source_id in &source_ids {
        let available = index.source(source_id).unwrap().available();
        index.graph_mut().remove_edge(SUPER_SOURCE, source_id);
        index.graph_mut().add_edge(SUPER_SOURCE, source_id, available)?;

        let capacity = index.source(source_id).unwrap().capacity;
        for consumer_id in &consumer_ids {
            if index.graph().edge_id(source_id, consumer_id).is_none() {
                index.graph_mut().add_edge(source_id, consumer_id, capacity)?;
            }
        }
    }

    let served = edmonds_karp(index.graph_mut(), SUPER_SOURCE, &sink)?;
    index.rebuild_from_flow();
    index.graph_mut().remove_node(&sink);

    Ok(served)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Consumer, Source, SourceKind};

    fn idx() -> AllocationIndex {
        AllocationIndex::new(1e-3)
    }

    #[test]
    fn single_class_saturates_up_to_capacity() {
        let mut idx = idx();
        idx.add_source(Source::new("S1", SourceKind::Solar, 100.0));
        idx.add_consumer(Consumer::new("C1", 1, 60.0));

        let served = run(&mut idx).unwrap();
        assert_eq!(served, vec![(1, 60.0)]);
        assert_eq!(idx.consumer("C1").unwrap().allocated, 60.0);
        assert_eq!(idx.source("S1").unwrap().load, 60.0);
        idx.check_invariants().unwrap();
    }

    #[test]
    fn higher_priority_class_served_first_when_supply_is_scarce() {
        let mut idx = idx();
        idx.add_source(Source::new("S1", SourceKind::Solar, 50.0));
        idx.add_consumer(Consumer::new("C1", 1, 40.0)); // priority 1: served first
        idx.add_consumer(Consumer::new("C2", 2, 40.0)); // priority 2: gets the leftover

        let served = run(&mut idx).unwrap();
        assert_eq!(served, vec![(1, 40.0), (2, 10.0)]);
        assert_eq!(idx.consumer("C1").unwrap().allocated, 40.0);
        assert_eq!(idx.consumer("C2").unwrap().allocated, 10.0);
        idx.check_invariants().unwrap();
    }

    #[test]
    fn excludes_inactive_and_zero_capacity_sources() {
        let mut idx = idx();
        let mut dead = Source::new("S1", SourceKind::Coal, 100.0);
        dead.active = false;
        idx.add_source(dead);
        idx.add_source(Source::new("S2", SourceKind::Solar, 0.0));
        idx.add_consumer(Consumer::new("C1", 1, 10.0));

        let served = run(&mut idx).unwrap();
        assert_eq!(served, vec![(1, 0.0)]);
    }

    #[test]
    fn skips_consumers_with_zero_demand() {
        let mut idx = idx();
        idx.add_source(Source::new("S1", SourceKind::Solar, 100.0));
        idx.add_consumer(Consumer::new("C1", 1, 0.0));

        let served = run(&mut idx).unwrap();
        assert!(served.is_empty());
    }

    #[test]
    fn leaves_no_scaffolding_nodes_behind() {
        let mut idx = idx();
        idx.add_source(Source::new("S1", SourceKind::Solar, 100.0));
        idx.add_consumer(Consumer::new("C1", 1, 10.0));
        run(&mut idx).unwrap();
        assert!(!idx.graph().has_node(SUPER_SOURCE));
        assert!(!idx.graph().has_node(&super_sink(1)));
    }
}
