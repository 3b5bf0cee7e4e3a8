use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;
use watchsense_lib::models::MotionReading;
use watchsense_lib::sensing::{ChannelSensor, SimulatedSensor};
use watchsense_lib::{
    decode_batch, Aggregator, AggregatorStatus, BatchReady, ChannelSink, EncodingStrategy,
    PipelineConfig, RawReading, SensorKind, SessionCoordinator, SinkEvent, StartRequest,
    StopReason,
};

fn loud(x: f64) -> RawReading {
    RawReading::Motion(MotionReading {
        accel_user_x: x,
        ..Default::default()
    })
}

async fn next_batch(events: &mut UnboundedReceiver<SinkEvent>) -> BatchReady {
    match timeout(Duration::from_secs(5), events.recv()).await {
        Ok(Some(SinkEvent::Ready(batch))) => batch,
        other => panic!("expected a batch, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn simulated_session_stops_at_deadline() {
    let sensor = Arc::new(SimulatedSensor::new(11));
    let (sink, mut events) = ChannelSink::new();
    let aggregator = Aggregator::new(sensor.clone(), Arc::new(sink));
    let mut status = aggregator.status_updates();

    let request = StartRequest::new(
        SensorKind::DeviceMotion,
        Duration::from_secs(2),
        Duration::from_secs_f64(1.0 / 32.0),
    )
    .with_pipeline(PipelineConfig {
        gate_threshold: None,
        ..Default::default()
    });
    let session = aggregator.start(request).await.unwrap();
    assert_eq!(session.window_size, 32);

    status
        .wait_for(|status| *status == AggregatorStatus::Stopped)
        .await
        .unwrap();

    let state = aggregator.state().await;
    assert_eq!(
        state.session.and_then(|s| s.stop_reason),
        Some(StopReason::DeadlineReached)
    );
    assert_eq!(sensor.active_generators(), 0);

    let mut batches = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SinkEvent::Ready(batch) = event {
            batches.push(batch);
        }
    }
    assert!(!batches.is_empty());

    let mut expected = 1;
    for (i, batch) in batches.iter().enumerate() {
        assert_eq!(batch.window_index, i as u64 + 1);
        assert_eq!(batch.sample_count, 32);
        for sample in decode_batch(&batch.payload, EncodingStrategy::FlatArray).unwrap() {
            assert_eq!(sample.obj_num, expected);
            assert_eq!(sample.kind(), SensorKind::DeviceMotion);
            expected += 1;
        }
    }

    aggregator.stop().await.unwrap();
}

#[tokio::test]
async fn readings_pushed_from_a_host_thread_are_batched() {
    let sensor = Arc::new(ChannelSensor::new([SensorKind::DeviceMotion]));
    let (sink, mut events) = ChannelSink::new();
    let aggregator = Aggregator::new(sensor.clone(), Arc::new(sink));

    let request = StartRequest::new(
        SensorKind::DeviceMotion,
        Duration::from_secs(60),
        Duration::from_millis(200),
    );
    let session = aggregator.start(request).await.unwrap();

    let host = {
        let sensor = sensor.clone();
        std::thread::spawn(move || {
            for i in 0..10 {
                // every third reading is below the gate
                let x = if i % 3 == 2 { 0.1 } else { 0.5 + i as f64 / 100.0 };
                sensor.push(loud(x));
            }
        })
    };
    host.join().unwrap();

    let first = next_batch(&mut events).await;
    assert_eq!(first.session_id, session.id);
    assert_eq!(first.window_index, 1);
    let samples = decode_batch(&first.payload, EncodingStrategy::FlatArray).unwrap();
    assert_eq!(
        samples.iter().map(|s| s.obj_num).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5]
    );
    assert!(samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    // let the loop drain the queue before stopping
    timeout(Duration::from_secs(5), async {
        while aggregator.snapshot().await.metrics.readings_seen < 10 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let stopped = aggregator.stop().await.unwrap().unwrap();
    assert_eq!(stopped.stop_reason, Some(StopReason::Manual));
    assert_eq!(sensor.subscriber_count(), 0);

    // 7 admitted: the trailing 2 were discarded on stop
    let snapshot = aggregator.snapshot().await;
    assert_eq!(snapshot.metrics.admitted, 7);
    assert_eq!(snapshot.metrics.batches_emitted, 1);
    assert_eq!(snapshot.buffered, 0);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn coordinator_stops_every_member() {
    let sensor = Arc::new(ChannelSensor::new([
        SensorKind::DeviceMotion,
        SensorKind::HeartRate,
    ]));
    let (sink, _events) = ChannelSink::new();
    let sink = Arc::new(sink);
    let motion = Aggregator::new(sensor.clone(), sink.clone());
    let heart = Aggregator::new(sensor.clone(), sink);

    let mut coordinator = SessionCoordinator::new();
    coordinator
        .add(
            motion.clone(),
            StartRequest::new(
                SensorKind::DeviceMotion,
                Duration::from_secs(30),
                Duration::from_secs_f64(1.0 / 32.0),
            ),
        )
        .add(
            heart.clone(),
            StartRequest::new(
                SensorKind::HeartRate,
                Duration::from_secs(30),
                Duration::from_secs(5),
            ),
        );

    let sessions = coordinator.start_all().await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert_ne!(sessions[0].id, sessions[1].id);
    assert_eq!(sensor.subscriber_count(), 2);
    assert!(coordinator.any_running().await);

    let stopped = coordinator.stop_all().await.unwrap();
    assert_eq!(stopped.len(), 2);
    assert!(stopped
        .iter()
        .all(|s| s.stop_reason == Some(StopReason::Manual)));
    assert!(!motion.is_running().await);
    assert!(!heart.is_running().await);
    assert_eq!(sensor.subscriber_count(), 0);

    // a second stop_all has nothing left to stop
    assert!(coordinator.stop_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn snapshot_serializes_in_camel_case() {
    let sensor = Arc::new(ChannelSensor::new([SensorKind::HeartRate]));
    let (sink, _events) = ChannelSink::new();
    let aggregator = Aggregator::new(sensor, Arc::new(sink));
    aggregator
        .start(StartRequest::new(
            SensorKind::HeartRate,
            Duration::from_secs(30),
            Duration::from_secs(5),
        ))
        .await
        .unwrap();
    aggregator.ingest(RawReading::heart_rate(72.0)).await;

    let json = serde_json::to_value(aggregator.snapshot().await).unwrap();
    assert_eq!(json["state"]["status"], "running");
    assert_eq!(json["state"]["session"]["kind"], "heartRate");
    assert_eq!(json["lastSequence"], 1);
    assert_eq!(json["metrics"]["batchesEmitted"], 1);
    assert_eq!(json["metrics"]["recentBatches"][0]["sampleCount"], 1);
}
