//! The orchestrator: owns all core state, the event FIFO, and produces
//! observation snapshots (§5, §6 Observation).

use crate::config::Config;
use crate::events::{self, Event};
use crate::index::AllocationIndex;
use crate::types::{AllocationRecord, Consumer, Source};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{error, info};

/// Per-consumer outcome of the most recent reallocation pass, reported
/// alongside the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Satisfaction {
    /// Allocated is within tolerance of demand.
    Satisfied,
    /// Some but not all demand is allocated.
    PartiallySatisfied,
    /// Nothing is allocated.
    Unserved,
}

/// A read-only view of the core, for observers (§6 Observation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Every registered source.
    pub sources: Vec<Source>,
    /// Every registered consumer.
    pub consumers: Vec<Consumer>,
    /// Every current (source, consumer, amount) allocation.
    pub allocations: Vec<AllocationRecord>,
    /// Total events dispatched so far.
    pub events_processed: u64,
    /// Total consumers that moved from unsatisfied to satisfied across all events.
    pub successful_reallocations: u64,
}

impl Snapshot {
    /// Per-consumer satisfaction classification for the summary printed
    /// after every event (§7 User-visible behavior).
    pub fn satisfaction(&self, tolerance: f64) -> Vec<(String, Satisfaction)> {
        self.consumers
            .iter()
            .map(|c| {
                let outcome = if c.is_satisfied(tolerance) {
                    Satisfaction::Satisfied
                } else if c.allocated > tolerance {
                    Satisfaction::PartiallySatisfied
                } else {
                    Satisfaction::Unserved
                };
                (c.id.clone(), outcome)
            })
            .collect()
    }

    /// Fraction of total demand currently satisfied across all consumers.
    pub fn overall_satisfaction_ratio(&self) -> f64 {
        let demand: f64 = self.consumers.iter().map(|c| c.demand).sum();
        let allocated: f64 = self.consumers.iter().map(|c| c.allocated).sum();
        if demand <= 0.0 {
            1.0
        } else {
            allocated / demand
        }
    }

    /// Utilization (load / capacity) per source, for the utilization half of
    /// the per-event summary.
    pub fn source_utilization(&self) -> Vec<(String, f64)> {
        self.sources
            .iter()
            .map(|s| {
                let ratio = if s.capacity > 0.0 { s.load / s.capacity } else { 0.0 };
                (s.id.clone(), ratio)
            })
            .collect()
    }
}

/// Owns the graph/index, the event FIFO, and dispatch counters. The single
/// logical worker described in §5: every mutation happens inside
/// [`Orchestrator::run_once`] or [`Orchestrator::drain`], never concurrently.
pub struct Orchestrator {
    config: Config,
    index: AllocationIndex,
    queue: VecDeque<Event>,
    events_processed: u64,
    successful_reallocations: u64,
    stopped: bool,
}

impl Orchestrator {
    /// Build an orchestrator over an already-bootstrapped index (see
    /// [`crate::events::bootstrap`], run once before the event loop starts).
    pub fn new(config: Config, index: AllocationIndex) -> Self {
        Self {
            config,
            index,
            queue: VecDeque::new(),
            events_processed: 0,
            successful_reallocations: 0,
            stopped: false,
        }
    }

    /// Enqueue an event. A no-op once [`Orchestrator::stop`] has been
    /// called: the in-flight event (if any) still completes, but nothing
    /// new is accepted (§5 Cancellation and timeouts).
    pub fn post(&mut self, event: Event) {
        if self.stopped {
            info!(kind = event.kind_name(), "orchestrator stopped, dropping event");
            return;
        }
        self.queue.push_back(event);
    }

    /// Prevent further events from being dispatched. Does not interrupt a
    /// handler already running (there is none here, since dispatch is
    /// synchronous), matching §5's "in-flight event still runs to
    /// completion".
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Whether [`Orchestrator::stop`] has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Dequeue and dispatch one event to completion: `HANDLING →
    /// REBUILDING_INDEX → REFRESHING_QUEUES → IDLE` (§4.8). Returns `false`
    /// once the queue is empty. An `InvariantViolation` stops the
    /// orchestrator and is propagated to the caller.
    pub fn run_once(&mut self) -> crate::error::Result<bool> {
        let Some(event) = self.queue.pop_front() else {
            return Ok(false);
        };

        let before_satisfied = self
            .index
            .consumers()
            .filter(|c| c.is_satisfied(self.index.tolerance()))
            .count();

        let result = events::dispatch(&mut self.index, &self.config, &event);
        self.index.rebuild_from_flow();

        match result {
            Ok(()) => {
                self.events_processed += 1;
                let after_satisfied = self
                    .index
                    .consumers()
                    .filter(|c| c.is_satisfied(self.index.tolerance()))
                    .count();
                if after_satisfied > before_satisfied {
                    self.successful_reallocations += (after_satisfied - before_satisfied) as u64;
                }
                info!(kind = event.kind_name(), events_processed = self.events_processed, "event handled");
            }
            Err(err) => {
                error!(kind = event.kind_name(), error = %err, "invariant violation, stopping orchestrator");
                self.stop();
                return Err(err);
            }
        }
        Ok(true)
    }

    /// Drain the queue, dispatching every pending event to completion.
    /// Stops early (without error) if [`Orchestrator::stop`] has been
    /// called, or propagates the first `InvariantViolation` encountered.
    pub fn drain(&mut self) -> crate::error::Result<u64> {
        let start = self.events_processed;
        while !self.stopped && self.run_once()? {}
        Ok(self.events_processed - start)
    }

    /// A read-only snapshot of the current (quiescent, between-events)
    /// state (§6 Observation).
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            sources: self.index.sources().cloned().collect(),
            consumers: self.index.consumers().cloned().collect(),
            allocations: self.index.all_allocations(),
            events_processed: self.events_processed,
            successful_reallocations: self.successful_reallocations,
        }
    }

    /// The configuration this orchestrator was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Source, SourceKind};

    fn bootstrapped() -> Orchestrator {
        let mut index = AllocationIndex::new(1e-3);
        index.add_source(Source::new("S1", SourceKind::Solar, 100.0));
        index.add_consumer(Consumer::new("C1", 1, 50.0));
        crate::events::bootstrap(&mut index).unwrap();
        Orchestrator::new(Config::default(), index)
    }

    #[test]
    fn post_then_drain_processes_events_in_fifo_order() {
        let mut orch = bootstrapped();
        orch.post(Event::ConsumerAdded { consumer_id: "C2".to_string(), priority: 2, demand: 20.0 });
        let processed = orch.drain().unwrap();
        assert_eq!(processed, 1);
        let snap = orch.snapshot();
        assert_eq!(snap.events_processed, 1);
        assert!(snap.consumers.iter().any(|c| c.id == "C2" && c.allocated == 20.0));
    }

    #[test]
    fn stop_prevents_new_events_from_being_accepted() {
        let mut orch = bootstrapped();
        orch.stop();
        orch.post(Event::ConsumerAdded { consumer_id: "C2".to_string(), priority: 2, demand: 20.0 });
        let processed = orch.drain().unwrap();
        assert_eq!(processed, 0);
        assert!(orch.snapshot().consumers.iter().all(|c| c.id != "C2"));
    }

    #[test]
    fn snapshot_reports_satisfaction_per_consumer() {
        let orch = bootstrapped();
        let snap = orch.snapshot();
        let satisfaction = snap.satisfaction(1e-3);
        assert_eq!(satisfaction, vec![("C1".to_string(), Satisfaction::Satisfied)]);
        assert!((snap.overall_satisfaction_ratio() - 1.0).abs() < 1e-9);
    }
}
