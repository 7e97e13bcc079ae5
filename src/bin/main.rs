//! Thin orchestrating entry point: load configuration, acquire the database
//! connection, bootstrap, release the connection, run the event loop,
//! print summaries (§7 User-visible behavior). No business logic lives
//! here; it all belongs to the library crate.

use grid_alloc::config::Config;
use grid_alloc::events;
use grid_alloc::index::AllocationIndex;
use grid_alloc::logging;
use grid_alloc::orchestrator::Orchestrator;
use grid_alloc::persistence::{PostgresRepository, Repository};
use std::env;
use tracing::info;

#[tokio::main]
async fn main() -> grid_alloc::Result<()> {
    logging::init();

    let config = Config::default();
    config.validate()?;

    let database_url = env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/grid_alloc".to_string());

    // Scoped connection: acquired here, dropped before the event loop runs.
    let bootstrap_data = {
        let repo = PostgresRepository::connect(&database_url).await?;
        repo.load().await?
    };

    let mut index = AllocationIndex::new(config.numeric_tolerance);
    for source in bootstrap_data.sources {
        index.add_source(source);
    }
    for consumer in bootstrap_data.consumers {
        index.add_consumer(consumer);
    }
    let served = events::bootstrap(&mut index)?;
    info!(?served, "offline allocator bootstrap complete");

    let mut orchestrator = Orchestrator::new(config, index);
    orchestrator.drain()?;

    let snapshot = orchestrator.snapshot();
    print_summary(&snapshot, orchestrator.config().numeric_tolerance);

    Ok(())
}

fn print_summary(snapshot: &grid_alloc::orchestrator::Snapshot, tolerance: f64) {
    println!(
        "events processed: {}, successful reallocations: {}",
        snapshot.events_processed, snapshot.successful_reallocations
    );
    println!("overall satisfaction: {:.1}%", snapshot.overall_satisfaction_ratio() * 100.0);
    for (id, outcome) in snapshot.satisfaction(tolerance) {
        println!("  consumer {id}: {outcome:?}");
    }
    for (id, ratio) in snapshot.source_utilization() {
        println!("  source {id}: {:.1}% utilized", ratio * 100.0);
    }
}
