use std::{sync::Arc, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::{
    encoding::BatchEncoder,
    error::{AggregatorError, UnavailableReason},
    metrics::{BatchMetrics, MetricsCollector, MetricsSnapshot},
    models::{Batch, RawReading, Sample, SensorKind, Session, StopReason},
    pipeline::{
        BatchBuffer, MotionGate, PipelineConfig, ResolvedPipeline, SampleClock, SequencePolicy,
        SmoothingFilter, SystemClock, WallClock,
    },
    sensing::{Authorization, SensingController, SensorSource},
    sink::{BatchReady, BatchSink},
};

use super::{AggregatorState, AggregatorStatus};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone, PartialEq)]
pub struct StartRequest {
    pub kind: SensorKind,
    pub duration: Duration,
    pub sampling_interval: Duration,
    pub pipeline: PipelineConfig,
}

impl StartRequest {
    pub fn new(kind: SensorKind, duration: Duration, sampling_interval: Duration) -> Self {
        Self {
            kind,
            duration,
            sampling_interval,
            pipeline: PipelineConfig::default(),
        }
    }

    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }
}

/// What happened to one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// No session was running, or the reading was for another sensor.
    Ignored,
    /// The session deadline had passed; the reading was dropped and the
    /// session stopped.
    Expired,
    /// The gate dropped the reading.
    Rejected,
    Buffered,
    Emitted { window_index: u64 },
    EncodeFailed { window_index: u64 },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatorSnapshot {
    pub state: AggregatorState,
    pub buffered: usize,
    pub last_sequence: u64,
    pub metrics: MetricsSnapshot,
}

/// Everything a session touches, guarded by one lock.
struct AggregatorInner {
    state: AggregatorState,
    clock: SampleClock,
    filter: SmoothingFilter,
    gate: MotionGate,
    buffer: BatchBuffer,
    pipeline: Option<ResolvedPipeline>,
    metrics: MetricsCollector,
    sensing: SensingController,
    status_tx: watch::Sender<AggregatorStatus>,
}

/// Drives one sensor: stamps, smooths, gates and batches its readings and
/// hands every finished batch to the sink.
///
/// Cloning is cheap; clones share the same session.
#[derive(Clone)]
pub struct Aggregator {
    inner: Arc<Mutex<AggregatorInner>>,
    source: Arc<dyn SensorSource>,
    sink: Arc<dyn BatchSink>,
    status_rx: watch::Receiver<AggregatorStatus>,
}

impl Aggregator {
    pub fn new(source: Arc<dyn SensorSource>, sink: Arc<dyn BatchSink>) -> Self {
        Self::with_clock(source, sink, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: Arc<dyn SensorSource>,
        sink: Arc<dyn BatchSink>,
        wall: Arc<dyn WallClock>,
    ) -> Self {
        let (status_tx, status_rx) = watch::channel(AggregatorStatus::Idle);

        Self {
            inner: Arc::new(Mutex::new(AggregatorInner {
                state: AggregatorState::new(),
                clock: SampleClock::new(wall),
                filter: SmoothingFilter::disabled(),
                gate: MotionGate::disabled(),
                buffer: BatchBuffer::new(0),
                pipeline: None,
                metrics: MetricsCollector::new(),
                sensing: SensingController::new(),
                status_tx,
            })),
            source,
            sink,
            status_rx,
        }
    }

    pub async fn start(&self, request: StartRequest) -> Result<Session, AggregatorError> {
        let mut inner = self.inner.lock().await;
        if let Some(session) = inner.state.running_session() {
            return Err(AggregatorError::AlreadyRunning(session.id.clone()));
        }

        if request.duration.is_zero() {
            return Err(AggregatorError::InvalidConfig(
                "duration must be greater than zero".into(),
            ));
        }
        let pipeline = request.pipeline.resolve(request.sampling_interval)?;
        let run_for = TimeDelta::from_std(request.duration)
            .map_err(|_| AggregatorError::InvalidConfig("duration is too long".into()))?;

        let kind = request.kind;
        if !self.source.is_available(kind) {
            return Err(AggregatorError::SensorUnavailable {
                kind,
                reason: UnavailableReason::NotAvailable,
            });
        }
        if self.source.authorize(kind) == Authorization::Denied {
            return Err(AggregatorError::SensorUnavailable {
                kind,
                reason: UnavailableReason::AuthorizationDenied,
            });
        }

        let started_at = inner.clock.now();
        let deadline = started_at
            .checked_add_signed(run_for)
            .ok_or_else(|| AggregatorError::InvalidConfig("duration is too long".into()))?;

        let subscription = self
            .source
            .subscribe(kind, request.sampling_interval)
            .map_err(AggregatorError::Sensor)?;

        let session = Session {
            id: Uuid::new_v4().to_string(),
            kind,
            started_at,
            deadline,
            sampling_interval_secs: request.sampling_interval.as_secs_f64(),
            window_size: pipeline.window_size,
            stopped_at: None,
            stop_reason: None,
        };

        inner.reset_for(&pipeline);
        inner.pipeline = Some(pipeline);
        inner.state.begin_session(session.clone());
        inner.sensing.start_sensing(
            self.clone(),
            session.id.clone(),
            subscription,
            request.duration,
        );
        inner.status_tx.send_replace(AggregatorStatus::Running);

        log_info!(
            "session {} started: {} every {:.1}ms for {}s, window of {}",
            session.id,
            kind,
            session.sampling_interval_secs * 1000.0,
            request.duration.as_secs_f64(),
            session.window_size
        );

        Ok(session)
    }

    /// Stops the running session. Returns the stopped session, or `None` if
    /// nothing was running.
    pub async fn stop(&self) -> Result<Option<Session>, AggregatorError> {
        let (session, task) = {
            let mut inner = self.inner.lock().await;
            let now = inner.clock.now();
            let session = inner.finish(now, StopReason::Manual, &*self.source, &*self.sink);
            (session, inner.sensing.take_task())
        };

        // The loop may be waiting on the lock we just released; join outside it.
        if let Some(task) = task {
            SensingController::join(task)
                .await
                .map_err(AggregatorError::Sensor)?;
        }

        Ok(session)
    }

    pub async fn is_running(&self) -> bool {
        self.inner.lock().await.state.is_running()
    }

    /// Feeds one reading through the pipeline. The sensing loop calls this
    /// for subscribed readings; hosts that run their own callback thread may
    /// call it directly.
    pub async fn ingest(&self, reading: RawReading) -> IngestOutcome {
        let mut inner = self.inner.lock().await;
        inner.ingest(reading, &*self.source, &*self.sink)
    }

    pub(crate) async fn ingest_for(&self, session_id: &str, reading: RawReading) -> IngestOutcome {
        let mut inner = self.inner.lock().await;
        if !inner.is_current(session_id) {
            return IngestOutcome::Ignored;
        }
        inner.ingest(reading, &*self.source, &*self.sink)
    }

    /// Stops `session_id` because its deadline timer fired.
    pub(crate) async fn expire(&self, session_id: &str) -> Option<Session> {
        let mut inner = self.inner.lock().await;
        if !inner.is_current(session_id) {
            return None;
        }
        let now = inner.clock.now();
        inner.finish(now, StopReason::DeadlineReached, &*self.source, &*self.sink)
    }

    /// The running session, or the last one once stopped.
    pub async fn session(&self) -> Option<Session> {
        self.inner.lock().await.state.session.clone()
    }

    pub async fn state(&self) -> AggregatorState {
        self.inner.lock().await.state.clone()
    }

    pub async fn snapshot(&self) -> AggregatorSnapshot {
        let inner = self.inner.lock().await;
        AggregatorSnapshot {
            state: inner.state.clone(),
            buffered: inner.buffer.len(),
            last_sequence: inner.clock.issued(),
            metrics: inner.metrics.snapshot(),
        }
    }

    /// Watches lifecycle transitions without taking the session lock.
    pub fn status_updates(&self) -> watch::Receiver<AggregatorStatus> {
        self.status_rx.clone()
    }
}

impl AggregatorInner {
    fn is_current(&self, session_id: &str) -> bool {
        self.state
            .running_session()
            .map(|session| session.id == session_id)
            .unwrap_or(false)
    }

    fn reset_for(&mut self, pipeline: &ResolvedPipeline) {
        self.clock.reset();
        self.filter = SmoothingFilter::new(pipeline.alpha);
        self.gate = MotionGate::new(pipeline.gate_threshold);
        self.buffer = BatchBuffer::new(pipeline.window_size);
        self.metrics.reset();
    }

    fn ingest(
        &mut self,
        reading: RawReading,
        source: &dyn SensorSource,
        sink: &dyn BatchSink,
    ) -> IngestOutcome {
        let Some(kind) = self.state.running_session().map(|session| session.kind) else {
            return IngestOutcome::Ignored;
        };
        if reading.kind() != kind {
            log_warn!("ignoring {} reading in a {} session", reading.kind(), kind);
            return IngestOutcome::Ignored;
        }
        let Some(pipeline) = self.pipeline else {
            return IngestOutcome::Ignored;
        };

        self.metrics.record_reading();
        let now = self.clock.now();
        if self.state.deadline_reached(now) {
            self.metrics.record_expired();
            self.finish(now, StopReason::DeadlineReached, source, sink);
            return IngestOutcome::Expired;
        }

        let reading = self.filter.apply(reading);

        if !self.gate.admits(&reading) {
            self.metrics.record_rejected();
            if pipeline.sequence_policy == SequencePolicy::AllReadings {
                self.clock.skip();
                self.buffer.count_skipped();
                if let Some(outcome) = self.emit_if_full(pipeline.encoder, sink) {
                    return outcome;
                }
            }
            return IngestOutcome::Rejected;
        }

        let stamp = self.clock.stamp(now);
        self.buffer
            .add(Sample::new(stamp.sequence, stamp.timestamp, reading));
        self.metrics.record_admitted();

        self.emit_if_full(pipeline.encoder, sink)
            .unwrap_or(IngestOutcome::Buffered)
    }

    fn emit_if_full(&mut self, encoder: BatchEncoder, sink: &dyn BatchSink) -> Option<IngestOutcome> {
        if !self.buffer.is_full() {
            return None;
        }
        let batch = self.buffer.drain();
        Some(self.emit(batch, encoder, sink))
    }

    fn emit(&mut self, batch: Batch, encoder: BatchEncoder, sink: &dyn BatchSink) -> IngestOutcome {
        let Some((session_id, kind)) = self
            .state
            .session
            .as_ref()
            .map(|session| (session.id.clone(), session.kind))
        else {
            return IngestOutcome::Ignored;
        };
        let window_index = batch.window_index();
        let encode_start = std::time::Instant::now();

        match encoder.encode(&batch) {
            Ok(payload) => {
                self.metrics.record_batch(BatchMetrics {
                    window_index,
                    sample_count: batch.len(),
                    payload_bytes: payload.len(),
                    encode_micros: encode_start.elapsed().as_micros() as u64,
                    emitted_at: self.clock.now(),
                });
                sink.on_batch_ready(BatchReady {
                    session_id,
                    kind,
                    window_index,
                    sample_count: batch.len(),
                    payload,
                });
                IngestOutcome::Emitted { window_index }
            }
            Err(err) => {
                log_error!("dropping batch {window_index} of session {session_id}: {err}");
                self.metrics.record_encode_failure();
                sink.on_batch_failed(&session_id, window_index, &err);
                IngestOutcome::EncodeFailed { window_index }
            }
        }
    }

    /// The stop procedure shared by manual stops and deadline expiry.
    fn finish(
        &mut self,
        now: DateTime<Utc>,
        reason: StopReason,
        source: &dyn SensorSource,
        sink: &dyn BatchSink,
    ) -> Option<Session> {
        if !self.state.is_running() {
            return None;
        }

        if let Some(pipeline) = self.pipeline {
            if pipeline.flush_on_stop && !self.buffer.is_empty() {
                let batch = self.buffer.drain();
                self.emit(batch, pipeline.encoder, sink);
            }
        }
        if !self.buffer.is_empty() {
            log_info!("discarding {} samples from the unfinished window", self.buffer.len());
            self.buffer.clear();
        }

        self.sensing.release(source);
        let session = self.state.stop(now, reason);
        self.status_tx.send_replace(AggregatorStatus::Stopped);

        if let Some(session) = &session {
            log_info!(
                "session {} stopped ({}) after {} samples",
                session.id,
                reason.as_str(),
                self.clock.issued()
            );
        }
        session
    }
}
