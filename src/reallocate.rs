//! Online reallocation: the greedy refill (§4.5) and the selective
//! deallocator it falls back to for critical consumers (§4.6).

use crate::config::Config;
use crate::error::Result;
use crate::index::AllocationIndex;
use crate::queues::{ConsumerQueue, SourceQueue};
use crate::types::ConsumerId;

/// Run the greedy reallocator over `consumer_ids`, in consumer-queue order
/// (priority ascending, remaining demand descending). Returns the number of
/// consumers whose remaining need reached ≤ ε by the end of the call.
///
/// Never deallocates by itself: when a critical consumer (§6
/// `critical_priority_threshold`) still has unmet need after exhausting free
/// capacity, this delegates to [`selective_deallocate`] once, then retries
/// the refill a single time against the freshly-freed capacity.
pub fn greedy(index: &mut AllocationIndex, config: &Config, consumer_ids: &[ConsumerId]) -> Result<usize> {
    let tolerance = index.tolerance();

    let queue_entries: Vec<(ConsumerId, u32, f64)> = consumer_ids
        .iter()
        .filter_map(|id| {
            let consumer = index.consumer(id)?;
            let remaining = consumer.remaining();
            (remaining > tolerance).then_some((id.clone(), consumer.priority, remaining))
        })
        .collect();
    let mut queue = ConsumerQueue::rebuild(queue_entries);

    let mut satisfied = 0;
    while let Some((consumer_id, priority, _)) = queue.pop_front() {
        let mut remaining = refill_one(index, &consumer_id)?;

        if remaining > tolerance && config.is_critical(priority) {
            let freed = selective_deallocate(index, config, &consumer_id, remaining)?;
            if freed > tolerance {
                remaining = refill_one(index, &consumer_id)?;
            }
        }

        if remaining <= tolerance {
            satisfied += 1;
        }
    }
    Ok(satisfied)
}

/// One refill attempt for a single consumer (§4.5 step 2): snapshot active
/// sources with available capacity, then greedily drain the largest first
/// until the consumer's remaining need hits zero or the snapshot is empty.
/// Returns the consumer's remaining need after the attempt.
fn refill_one(index: &mut AllocationIndex, consumer_id: &str) -> Result<f64> {
    let tolerance = index.tolerance();
    let mut remaining = index
        .consumer(consumer_id)
        .map(|c| c.remaining())
        .unwrap_or(0.0);
    if remaining <= tolerance {
        return Ok(remaining);
    }

    let snapshot: Vec<(String, f64)> = index
        .sources()
        .filter(|s| s.active && s.available() > tolerance)
        .map(|s| (s.id.clone(), s.available()))
        .collect();
    let mut queue = SourceQueue::rebuild(snapshot);

    while remaining > tolerance {
        let Some((source_id, available)) = queue.pop_max() else {
            break;
        };
        let amount = available.min(remaining);
        if amount <= tolerance {
            break;
        }
        index.add(consumer_id, &source_id, amount)?;
        remaining -= amount;
    }
    Ok(remaining)
}

/// A single allocation eligible to be trimmed to serve a critical consumer.
struct Candidate {
    consumer_id: ConsumerId,
    source_id: String,
    amount: f64,
    priority_gap: i64,
}

/// Free capacity for `c_hi`, which still needs `r` more, by trimming
/// allocations held by strictly-lower-priority consumers on fully-loaded
/// sources, bounded by a fraction `β` of total allocated energy (§4.6).
/// Returns the amount actually freed.
pub fn selective_deallocate(
    index: &mut AllocationIndex,
    config: &Config,
    c_hi: &str,
    r: f64,
) -> Result<f64> {
    let tolerance = index.tolerance();
    let Some(priority_hi) = index.consumer(c_hi).map(|c| c.priority) else {
        return Ok(0.0);
    };

    let total_allocated: f64 = index.consumers().map(|c| c.allocated).sum();
    let budget = config.disturbance_budget_fraction * total_allocated;
    let cap = r.min(budget);
    if cap <= tolerance {
        return Ok(0.0);
    }

    let mut candidates = Vec::new();
    for source in index.sources() {
        if !source.active || source.available() > tolerance {
            continue;
        }
        for (consumer_id, amount) in index.allocations_for_source(&source.id) {
            if consumer_id == c_hi {
                continue;
            }
            let Some(priority_lo) = index.consumer(&consumer_id).map(|c| c.priority) else {
                continue;
            };
            if priority_lo <= priority_hi {
                continue;
            }
            candidates.push(Candidate {
                consumer_id,
                source_id: source.id.clone(),
                amount,
                priority_gap: i64::from(priority_lo) - i64::from(priority_hi),
            });
        }
    }
    // Largest priority gap (lowest importance) first; ties broken
    // deterministically by source then consumer id.
    candidates.sort_by(|a, b| {
        b.priority_gap
            .cmp(&a.priority_gap)
            .then_with(|| a.source_id.cmp(&b.source_id))
            .then_with(|| a.consumer_id.cmp(&b.consumer_id))
    });

    let mut freed = 0.0;
    for candidate in candidates {
        if freed >= cap - tolerance {
            break;
        }
        let current = index.amount(&candidate.source_id, &candidate.consumer_id);
        if current <= tolerance {
            continue;
        }
        let take = candidate.amount.min(cap - freed).min(current);
        if take <= tolerance {
            continue;
        }
        let remainder = current - take;
        if remainder <= tolerance {
            index.remove(&candidate.consumer_id, &candidate.source_id)?;
        } else {
            index.update(&candidate.consumer_id, &candidate.source_id, remainder)?;
        }
        freed += take;
    }
    Ok(freed)
}
