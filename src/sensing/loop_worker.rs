use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::aggregator::{Aggregator, IngestOutcome};
use crate::models::RawReading;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

pub async fn sensing_loop(
    aggregator: Aggregator,
    session_id: String,
    mut readings: mpsc::Receiver<RawReading>,
    deadline: Option<Instant>,
    cancel_token: CancellationToken,
) {
    let expiry = async {
        match deadline {
            Some(deadline) => time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(expiry);

    let mut stream_open = true;
    let mut delivered: u64 = 0;

    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                log_info!("sensing loop for session {} shutting down after {} readings", session_id, delivered);
                break;
            }
            _ = &mut expiry => {
                if aggregator.expire(&session_id).await.is_some() {
                    log_info!("session {} reached its deadline", session_id);
                }
                break;
            }
            reading = readings.recv(), if stream_open => match reading {
                Some(reading) => {
                    delivered += 1;
                    let outcome = aggregator.ingest_for(&session_id, reading).await;
                    if let IngestOutcome::Emitted { window_index } = outcome {
                        log_debug!("session {} emitted window {}", session_id, window_index);
                    }
                    if outcome == IngestOutcome::Expired {
                        break;
                    }
                }
                None => {
                    // Keep waiting for the deadline or a stop.
                    log_warn!("sensor stream for session {} closed early", session_id);
                    stream_open = false;
                }
            },
        }
    }
}
