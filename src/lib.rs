pub mod aggregator;
pub mod coordinator;
pub mod encoding;
pub mod error;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod sensing;
pub mod settings;
pub mod sink;
pub mod utils;

use std::sync::Arc;

use anyhow::Context;

pub use aggregator::{Aggregator, AggregatorSnapshot, AggregatorState, AggregatorStatus, IngestOutcome, StartRequest};
pub use coordinator::SessionCoordinator;
pub use encoding::{decode_batch, BatchEncoder, EncodingStrategy, OutputFormat};
pub use error::{AggregatorError, EncodeError, UnavailableReason};
pub use models::{Batch, RawReading, Sample, SensorKind, Session, StopReason};
pub use pipeline::{PipelineConfig, SequencePolicy};
pub use settings::{SettingsStore, TrackingSettings};
pub use sink::{BatchReady, BatchSink, ChannelSink, SinkEvent, StdoutSink};

use sensing::SimulatedSensor;

/// Runs one session against the simulated sensor and prints every batch to
/// stdout. Ctrl-C stops early.
pub fn run() -> anyhow::Result<()> {
    let debug_mode = std::env::var("WATCHSENSE_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(if debug_mode {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    log::info!("watchsense starting up...");

    let settings = SettingsStore::from_env()?;
    let mut tracking = settings.tracking();
    if let Ok(kind) = std::env::var("WATCHSENSE_KIND") {
        tracking.kind = kind.parse()?;
    }
    let request = tracking.to_request()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(async move {
        let aggregator = Aggregator::new(
            Arc::new(SimulatedSensor::new(rand::random())),
            Arc::new(StdoutSink),
        );
        let mut status = aggregator.status_updates();
        aggregator.start(request).await?;

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for ctrl-c")?;
                log::info!("interrupted; stopping session");
            }
            result = status.wait_for(|status| *status != AggregatorStatus::Running) => {
                result.context("aggregator went away")?;
            }
        }
        aggregator.stop().await?;

        let snapshot = aggregator.snapshot().await;
        log::info!(
            "done: {} readings, {} admitted, {} batches, {} encode failures",
            snapshot.metrics.readings_seen,
            snapshot.metrics.admitted,
            snapshot.metrics.batches_emitted,
            snapshot.metrics.encode_failures
        );
        Ok(())
    })
}
