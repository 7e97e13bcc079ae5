//! Event payloads and the dispatcher (§4.7).

use crate::allocator;
use crate::config::Config;
use crate::index::AllocationIndex;
use crate::reallocate::greedy;
use crate::types::{Consumer, ConsumerId, Source, SourceId, SourceKind};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One incoming event, as accepted by [`crate::orchestrator::Orchestrator::post`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_kind")]
pub enum Event {
    /// A source has permanently failed and must be removed.
    SourceFailure {
        /// The failed source's identifier.
        source_id: SourceId,
    },
    /// A new source has come online.
    SourceAdded {
        /// Identifier for the new source.
        source_id: SourceId,
        /// Nameplate capacity.
        capacity: f64,
        /// Generation kind.
        kind: SourceKind,
    },
    /// A new consumer has appeared.
    ConsumerAdded {
        /// Identifier for the new consumer.
        consumer_id: ConsumerId,
        /// Priority level; 1 is highest.
        priority: u32,
        /// Requested demand.
        demand: f64,
    },
    /// An existing consumer's demand has risen.
    DemandIncrease {
        /// The consumer whose demand changed.
        consumer_id: ConsumerId,
        /// The new (higher) demand.
        new_demand: f64,
    },
    /// An existing consumer's demand has fallen.
    DemandDecrease {
        /// The consumer whose demand changed.
        consumer_id: ConsumerId,
        /// The new (lower) demand.
        new_demand: f64,
    },
}

impl Event {
    /// A short tag for logging, independent of the payload's contents.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Event::SourceFailure { .. } => "source-failure",
            Event::SourceAdded { .. } => "source-added",
            Event::ConsumerAdded { .. } => "consumer-added",
            Event::DemandIncrease { .. } => "demand-increase",
            Event::DemandDecrease { .. } => "demand-decrease",
        }
    }
}

/// Dispatch one event against `index`, running whatever reallocation it
/// triggers to completion before returning (§4.8: no suspension points
/// within a handler). Unknown identifiers are logged at warn level and the
/// event is treated as a no-op, per §6 Event ingress.
pub fn dispatch(index: &mut AllocationIndex, config: &Config, event: &Event) -> crate::error::Result<()> {
    match event {
        Event::SourceFailure { source_id } => handle_source_failure(index, config, source_id),
        Event::SourceAdded { source_id, capacity, kind } => {
            handle_source_added(index, config, source_id, *capacity, *kind)
        }
        Event::ConsumerAdded { consumer_id, priority, demand } => {
            handle_consumer_added(index, config, consumer_id, *priority, *demand)
        }
        Event::DemandIncrease { consumer_id, new_demand } => {
            handle_demand_increase(index, config, consumer_id, *new_demand)
        }
        Event::DemandDecrease { consumer_id, new_demand } => {
            handle_demand_decrease(index, config, consumer_id, *new_demand)
        }
    }
}

fn handle_source_failure(index: &mut AllocationIndex, config: &Config, source_id: &str) -> crate::error::Result<()> {
    if index.source(source_id).is_none() {
        warn!(source_id, "source-failure: unknown source, ignoring");
        return Ok(());
    }
    let affected = index
        .allocations_for_source(source_id)
        .into_iter()
        .map(|(consumer_id, _)| consumer_id)
        .collect::<Vec<_>>();

    index.remove_source_completely(source_id);
    greedy(index, config, &affected)?;
    Ok(())
}

fn handle_source_added(
    index: &mut AllocationIndex,
    config: &Config,
    source_id: &str,
    capacity: f64,
    kind: SourceKind,
) -> crate::error::Result<()> {
    if index.source(source_id).is_some() {
        warn!(source_id, "source-added: id already registered, ignoring");
        return Ok(());
    }
    index.add_source(Source::new(source_id.to_string(), kind, capacity));
    let needy: Vec<ConsumerId> = index
        .consumers()
        .filter(|c| c.remaining() > index.tolerance())
        .map(|c| c.id.clone())
        .collect();
    greedy(index, config, &needy)?;
    Ok(())
}

fn handle_consumer_added(
    index: &mut AllocationIndex,
    config: &Config,
    consumer_id: &str,
    priority: u32,
    demand: f64,
) -> crate::error::Result<()> {
    if index.consumer(consumer_id).is_some() {
        warn!(consumer_id, "consumer-added: id already registered, ignoring");
        return Ok(());
    }
    index.add_consumer(Consumer::new(consumer_id.to_string(), priority, demand));
    greedy(index, config, &[consumer_id.to_string()])?;
    Ok(())
}

fn handle_demand_increase(
    index: &mut AllocationIndex,
    config: &Config,
    consumer_id: &str,
    new_demand: f64,
) -> crate::error::Result<()> {
    if index.consumer(consumer_id).is_none() {
        warn!(consumer_id, "demand-increase: unknown consumer, ignoring");
        return Ok(());
    }
    set_demand_and_rebalance(index, config, consumer_id, new_demand)
}

fn handle_demand_decrease(
    index: &mut AllocationIndex,
    config: &Config,
    consumer_id: &str,
    new_demand: f64,
) -> crate::error::Result<()> {
    if index.consumer(consumer_id).is_none() {
        warn!(consumer_id, "demand-decrease: unknown consumer, ignoring");
        return Ok(());
    }
    set_demand_and_rebalance(index, config, consumer_id, new_demand)
}

/// Set `consumer_id`'s demand to `new_demand` and restore I2 if the new
/// value now sits below what is currently allocated, trimming the excess
/// from the sources with the least available energy first (since those are
/// the ones other consumers need most), then rerun greedy over every
/// consumer still short (§4.7 demand-decrease; applied defensively to
/// demand-increase too, since an absolute `new_demand` can end up lower
/// than the current allocation regardless of which event kind carried it).
fn set_demand_and_rebalance(
    index: &mut AllocationIndex,
    config: &Config,
    consumer_id: &str,
    new_demand: f64,
) -> crate::error::Result<()> {
    let tolerance = index.tolerance();
    let mut excess = index.consumer(consumer_id).map(|c| c.allocated - new_demand).unwrap_or(0.0);

    if let Some(consumer) = index.consumer_mut(consumer_id) {
        consumer.demand = new_demand;
    }

    if excess > tolerance {
        let mut held: Vec<(SourceId, f64)> = index.allocations_for_consumer(consumer_id);
        held.sort_by(|(a, _), (b, _)| {
            let avail_a = index.source(a).map(|s| s.available()).unwrap_or(0.0);
            let avail_b = index.source(b).map(|s| s.available()).unwrap_or(0.0);
            avail_a.total_cmp(&avail_b)
        });
        for (source_id, amount) in held {
            if excess <= tolerance {
                break;
            }
            let trim = amount.min(excess);
            let remainder = amount - trim;
            if remainder <= tolerance {
                index.remove(consumer_id, &source_id)?;
            } else {
                index.update(consumer_id, &source_id, remainder)?;
            }
            excess -= trim;
        }
    }

    let previously_unsatisfied: Vec<ConsumerId> = index
        .consumers()
        .filter(|c| c.remaining() > tolerance)
        .map(|c| c.id.clone())
        .collect();
    greedy(index, config, &previously_unsatisfied)?;
    Ok(())
}

/// Bootstrap the offline allocator once over every registered consumer, used
/// only at startup (§4.4), not part of the per-event dispatch table.
pub fn bootstrap(index: &mut AllocationIndex) -> crate::error::Result<Vec<(u32, f64)>> {
    allocator::run(index)
}
