//! # grid-alloc
//!
//! A priority-aware energy allocation engine for a smart grid: an offline
//! priority-layered max-flow bootstrap, followed by an always-on
//! event-driven core that repairs the allocation via greedy refill and
//! bounded preemptive reallocation.
//!
//! ## Modules
//!
//! - [`graph`] - directed capacitated flow network with residual-edge
//!   pairing and BFS augmenting-path search.
//! - [`index`] - the bidirectional allocation index, the single source of
//!   truth for current allocations.
//! - [`queues`] - priority heaps over sources (by available capacity) and
//!   consumers (by priority, then remaining demand).
//! - [`allocator`] - the offline, priority-layered Edmonds–Karp bootstrap.
//! - [`reallocate`] - the online greedy reallocator and selective
//!   deallocator.
//! - [`events`] - event payloads and the per-event-kind dispatcher.
//! - [`orchestrator`] - owns all core state and the event FIFO; the only
//!   entry point a caller needs.
//! - [`persistence`] - bootstrap data access behind a `Repository` trait.
//!
//! ## Quick start
//!
//! ```rust
//! use grid_alloc::config::Config;
//! use grid_alloc::events::{self, Event};
//! use grid_alloc::index::AllocationIndex;
//! use grid_alloc::orchestrator::Orchestrator;
//! use grid_alloc::types::{Consumer, Source, SourceKind};
//!
//! let mut index = AllocationIndex::new(1e-3);
//! index.add_source(Source::new("S1", SourceKind::Solar, 100.0));
//! index.add_consumer(Consumer::new("C1", 1, 60.0));
//! events::bootstrap(&mut index).unwrap();
//!
//! let mut orchestrator = Orchestrator::new(Config::default(), index);
//! orchestrator.post(Event::ConsumerAdded { consumer_id: "C2".into(), priority: 2, demand: 30.0 });
//! orchestrator.drain().unwrap();
//!
//! let snapshot = orchestrator.snapshot();
//! assert!(snapshot.overall_satisfaction_ratio() > 0.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod allocator;
pub mod config;
pub mod events;
pub mod graph;
pub mod index;
pub mod logging;
pub mod orchestrator;
pub mod persistence;
pub mod queues;
pub mod reallocate;
pub mod types;

mod error;

#[cfg(test)]
mod proptest_suite;

pub use error::{Error, Result};

/// Common imports for callers wiring up an [`orchestrator::Orchestrator`].
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::events::{self, Event};
    pub use crate::index::AllocationIndex;
    pub use crate::orchestrator::{Orchestrator, Satisfaction, Snapshot};
    pub use crate::types::{Consumer, Source, SourceKind};
    pub use crate::Error;
    pub use crate::Result;
}
