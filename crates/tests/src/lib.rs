//! # Integration Tests
//!
//! End-to-end coverage of the drain stage and its collaborators.
//!
//! Covers:
//! - The scripted acceptance flow (feed -> source -> stage -> writer)
//! - Lifecycle contracts: busy starts, restart, stop storms, self-stop
//! - Blueprint-to-stage wiring through the config loader

#[cfg(test)]
mod support {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use contracts::{
        ContractError, Destination, DestinationConfig, DestinationKind, DestinationMap,
        DrainSettings, Payload, Record, Writer,
    };
    use drain::{Drain, DrainSupervisor, MemoryWriter};

    pub(crate) const WAIT: Duration = Duration::from_secs(5);

    /// Supervisor that counts callbacks and keeps the last handed-back map.
    pub(crate) struct CountingSupervisor {
        notified: AtomicUsize,
        last_map: Mutex<Option<Arc<DestinationMap>>>,
    }

    impl CountingSupervisor {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self {
                notified: AtomicUsize::new(0),
                last_map: Mutex::new(None),
            })
        }

        pub(crate) fn notified(&self) -> usize {
            self.notified.load(Ordering::SeqCst)
        }

        pub(crate) fn last_map(&self) -> Option<Arc<DestinationMap>> {
            self.last_map.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DrainSupervisor for CountingSupervisor {
        async fn drain_stopped(&self, drain: Arc<Drain>, map: Arc<DestinationMap>) {
            // Taking the lifecycle lock here proves the stage released it
            // (and settled in Stopped) before reporting.
            assert!(drain.stopped().await, "reported before reaching Stopped");
            *self.last_map.lock().unwrap() = Some(map);
            self.notified.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Writer that rejects any payload carrying a "poison" field and
    /// forwards everything else to a memory writer.
    pub(crate) struct PoisonWriter {
        pub(crate) inner: Arc<MemoryWriter>,
    }

    #[async_trait]
    impl Writer for PoisonWriter {
        async fn setup(&self, config: &DestinationConfig) -> Result<(), ContractError> {
            self.inner.setup(config).await
        }

        async fn write(&self, payload: &Payload) -> Result<(), ContractError> {
            if payload
                .records
                .iter()
                .any(|record| record.get("poison").is_some())
            {
                return Err(ContractError::destination_write("poisoned", "payload rejected"));
            }
            self.inner.write(payload).await
        }

        async fn teardown(&self) -> Result<(), ContractError> {
            self.inner.teardown().await
        }
    }

    pub(crate) fn memory_map(name: &str) -> Arc<DestinationMap> {
        Arc::new(DestinationMap::new(
            Bytes::from(format!("events/{name}")),
            "events",
            Destination {
                name: name.into(),
                kind: DestinationKind::Memory,
            },
            DestinationConfig::default(),
        ))
    }

    pub(crate) fn settings(workers: usize) -> DrainSettings {
        DrainSettings {
            workers,
            tick_interval_ms: 1,
            source_capacity: 8,
        }
    }

    pub(crate) fn payload(seqs: &[u64]) -> Payload {
        Payload::new(
            seqs.iter()
                .map(|seq| Record::new().with_field("seq", *seq))
                .collect(),
        )
    }

    /// Poll `probe` until it holds; fail the test if it never does.
    pub(crate) async fn wait_until(what: &str, probe: impl Fn() -> bool) {
        let result = tokio::time::timeout(WAIT, async {
            while !probe() {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await;
        assert!(result.is_ok(), "timed out waiting for {what}");
    }

    /// Wait for the stage to settle in Stopped.
    pub(crate) async fn wait_stopped(drain: &Arc<Drain>) {
        let result = tokio::time::timeout(WAIT, async {
            while !drain.stopped().await {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await;
        assert!(result.is_ok(), "timed out waiting for the drain to stop");
    }
}

#[cfg(test)]
mod acceptance_tests {
    use std::sync::Arc;

    use drain::{ChannelSource, Drain, MemoryWriter};

    use crate::support::{
        memory_map, payload, settings, wait_stopped, wait_until, CountingSupervisor,
    };

    /// Scripted end-to-end pass: three payloads and an end-of-stream marker
    /// through a two-worker stage into a memory destination.
    #[tokio::test]
    async fn test_scripted_stream_drains_to_memory() {
        let drain = Drain::new("events/latest", settings(2));
        let supervisor = CountingSupervisor::new();
        let map = memory_map("latest");
        let writer = Arc::new(MemoryWriter::new("latest"));
        let (source, feeder) = ChannelSource::bounded(8);

        drain
            .start_with_writer(supervisor.clone(), map.clone(), writer.clone(), source)
            .await
            .unwrap();

        feeder.send(payload(&[1, 2])).await.unwrap();
        feeder.send(payload(&[3])).await.unwrap();
        feeder.send(payload(&[4, 5, 6])).await.unwrap();
        feeder
            .send(payload(&[]).with_end_of_stream(true))
            .await
            .unwrap();

        // The marker stops the stage on its own; nobody calls stop here.
        wait_until("the supervisor callback", || supervisor.notified() == 1).await;
        wait_stopped(&drain).await;

        assert_eq!(writer.payload_count(), 4);
        assert_eq!(writer.record_count(), 6);
        assert!(writer.end_of_stream_seen());
        assert_eq!(writer.teardown_count(), 1);

        // Workers may interleave batches, but every record lands once.
        let mut seqs: Vec<u64> = writer
            .written()
            .iter()
            .flatten()
            .filter_map(|record| record.get("seq").and_then(|v| v.as_u64()))
            .collect();
        seqs.sort_unstable();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5, 6]);

        // The stage hands back the map it was started with.
        let returned = supervisor.last_map().expect("map handed back");
        assert_eq!(returned.id(), map.id());

        let snapshot = drain.metrics().snapshot();
        assert_eq!(snapshot.payloads_dispatched, 4);
        assert_eq!(snapshot.payloads_written, 4);
        assert_eq!(snapshot.records_written, 6);
        assert_eq!(snapshot.write_failures, 0);
    }
}

#[cfg(test)]
mod lifecycle_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{Payload, Record};
    use drain::{ChannelSource, Drain, DrainError, MemoryWriter};

    use crate::support::{
        memory_map, payload, settings, wait_stopped, wait_until, CountingSupervisor, PoisonWriter,
    };

    /// A refused start must not disturb the run in progress.
    #[tokio::test]
    async fn test_refused_start_leaves_current_run_draining() {
        let drain = Drain::new("events/audit", settings(1));
        let supervisor = CountingSupervisor::new();
        let writer = Arc::new(MemoryWriter::new("audit"));
        let (source, feeder) = ChannelSource::bounded(8);

        drain
            .start_with_writer(supervisor.clone(), memory_map("audit"), writer.clone(), source)
            .await
            .unwrap();

        let other = Arc::new(MemoryWriter::new("other"));
        let (second_source, _second_feeder) = ChannelSource::bounded(8);
        let err = drain
            .start_with_writer(
                supervisor.clone(),
                memory_map("other"),
                other.clone(),
                second_source,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DrainError::Busy { .. }));

        // The original run keeps draining into its own writer.
        feeder.send(payload(&[7])).await.unwrap();
        wait_until("the payload to land", || writer.payload_count() == 1).await;
        assert_eq!(other.payload_count(), 0);
        assert_eq!(other.teardown_count(), 0);

        drain.stop(true).await.unwrap();
        assert_eq!(supervisor.notified(), 1);
    }

    /// Every payload of a long stream is written exactly once.
    #[tokio::test]
    async fn test_every_payload_written_exactly_once_under_load() {
        let drain = Drain::new("events/load", settings(4));
        let supervisor = CountingSupervisor::new();
        let writer = Arc::new(MemoryWriter::new("load"));
        let (source, feeder) = ChannelSource::bounded(16);

        drain
            .start_with_writer(supervisor.clone(), memory_map("load"), writer.clone(), source)
            .await
            .unwrap();

        let total = 200u64;
        for seq in 1..=total {
            // The final payload carries records and the marker at once.
            feeder
                .send(payload(&[seq]).with_end_of_stream(seq == total))
                .await
                .unwrap();
        }

        wait_until("the stream to drain", || supervisor.notified() == 1).await;

        assert_eq!(writer.payload_count() as u64, total);
        let mut seqs: Vec<u64> = writer
            .written()
            .iter()
            .flatten()
            .filter_map(|record| record.get("seq").and_then(|v| v.as_u64()))
            .collect();
        seqs.sort_unstable();
        assert_eq!(seqs, (1..=total).collect::<Vec<_>>());
        assert_eq!(drain.metrics().snapshot().write_failures, 0);
    }

    /// Dropping the feeder closes the source; the stage drains what is
    /// buffered and then stops itself.
    #[tokio::test]
    async fn test_source_closure_stops_the_stage() {
        let drain = Drain::new("events/closed", settings(2));
        let supervisor = CountingSupervisor::new();
        let writer = Arc::new(MemoryWriter::new("closed"));
        let (source, feeder) = ChannelSource::bounded(8);

        drain
            .start_with_writer(supervisor.clone(), memory_map("closed"), writer.clone(), source)
            .await
            .unwrap();

        feeder.send(payload(&[1])).await.unwrap();
        feeder.send(payload(&[2])).await.unwrap();
        drop(feeder);

        wait_until("the supervisor callback", || supervisor.notified() == 1).await;
        wait_stopped(&drain).await;

        assert_eq!(writer.payload_count(), 2);
        assert_eq!(writer.record_count(), 2);
        assert!(!writer.end_of_stream_seen());
        assert_eq!(drain.metrics().snapshot().write_failures, 0);
    }

    /// Repeated end-of-stream markers trigger exactly one stop and one
    /// supervisor callback.
    #[tokio::test]
    async fn test_duplicate_end_of_stream_markers_stop_once() {
        let drain = Drain::new("events/dup", settings(2));
        let supervisor = CountingSupervisor::new();
        let writer = Arc::new(MemoryWriter::new("dup"));
        let (source, feeder) = ChannelSource::bounded(8);

        drain
            .start_with_writer(supervisor.clone(), memory_map("dup"), writer.clone(), source)
            .await
            .unwrap();

        for _ in 0..3 {
            // Later markers may race the teardown; failed sends are fine.
            let _ = feeder.send(payload(&[]).with_end_of_stream(true)).await;
        }
        drop(feeder);

        wait_until("the supervisor callback", || supervisor.notified() == 1).await;
        assert!(drain.stopped().await);

        // Give a straggling duplicate stop a chance to surface.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(supervisor.notified(), 1);
        assert!(writer.end_of_stream_seen());
        assert_eq!(writer.teardown_count(), 1);
    }

    /// Concurrent stop calls all return Ok while only one of them runs the
    /// teardown sequence.
    #[tokio::test]
    async fn test_concurrent_stops_report_once() {
        let drain = Drain::new("events/storm", settings(2));
        let supervisor = CountingSupervisor::new();
        let writer = Arc::new(MemoryWriter::new("storm"));
        let (source, feeder) = ChannelSource::bounded(8);

        drain
            .start_with_writer(supervisor.clone(), memory_map("storm"), writer.clone(), source)
            .await
            .unwrap();
        feeder.send(payload(&[1])).await.unwrap();

        let mut calls = Vec::new();
        for i in 0..8 {
            let drain = Arc::clone(&drain);
            calls.push(tokio::spawn(async move { drain.stop(i % 2 == 0).await }));
        }
        for call in calls {
            call.await.unwrap().unwrap();
        }

        assert!(drain.stopped().await);
        assert_eq!(supervisor.notified(), 1);
        assert_eq!(writer.teardown_count(), 1);
    }

    /// A stopped stage accepts a brand-new destination and source.
    #[tokio::test]
    async fn test_restart_with_fresh_destination() {
        let drain = Drain::new("events/retry", settings(1));
        let supervisor = CountingSupervisor::new();

        let first_writer = Arc::new(MemoryWriter::new("first"));
        let (first_source, first_feeder) = ChannelSource::bounded(4);
        drain
            .start_with_writer(
                supervisor.clone(),
                memory_map("first"),
                first_writer.clone(),
                first_source,
            )
            .await
            .unwrap();
        first_feeder
            .send(payload(&[1]).with_end_of_stream(true))
            .await
            .unwrap();
        wait_until("the first run to report", || supervisor.notified() == 1).await;

        let second_writer = Arc::new(MemoryWriter::new("second"));
        let (second_source, second_feeder) = ChannelSource::bounded(4);
        let second_map = memory_map("second");
        drain
            .start_with_writer(
                supervisor.clone(),
                second_map.clone(),
                second_writer.clone(),
                second_source,
            )
            .await
            .unwrap();
        second_feeder
            .send(payload(&[2]).with_end_of_stream(true))
            .await
            .unwrap();
        wait_until("the second run to report", || supervisor.notified() == 2).await;

        assert_eq!(first_writer.payload_count(), 1);
        assert_eq!(second_writer.payload_count(), 1);
        let map = supervisor.last_map().expect("map handed back");
        assert_eq!(map.id(), second_map.id());
    }

    /// A failed write is counted and dropped; payloads on both sides of it
    /// still land and the stage keeps running to end of stream.
    #[tokio::test]
    async fn test_write_failure_does_not_stop_the_stage() {
        let drain = Drain::new("events/flaky", settings(1));
        let supervisor = CountingSupervisor::new();
        let inner = Arc::new(MemoryWriter::new("flaky"));
        let writer = Arc::new(PoisonWriter {
            inner: inner.clone(),
        });
        let (source, feeder) = ChannelSource::bounded(8);

        drain
            .start_with_writer(supervisor.clone(), memory_map("flaky"), writer, source)
            .await
            .unwrap();

        feeder.send(payload(&[1])).await.unwrap();
        feeder
            .send(Payload::new(vec![Record::new().with_field("poison", true)]))
            .await
            .unwrap();
        feeder
            .send(payload(&[2]).with_end_of_stream(true))
            .await
            .unwrap();

        wait_until("the stream to drain", || supervisor.notified() == 1).await;

        assert_eq!(inner.payload_count(), 2);
        let snapshot = drain.metrics().snapshot();
        assert_eq!(snapshot.payloads_dispatched, 3);
        assert_eq!(snapshot.payloads_written, 2);
        assert_eq!(snapshot.write_failures, 1);
    }
}

#[cfg(test)]
mod blueprint_tests {
    use std::sync::Arc;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::FeedConfig;
    use drain::{ChannelSource, Drain, MemoryWriter, RecordFeed};

    use crate::support::{memory_map, payload, settings, wait_until, CountingSupervisor, WAIT};

    const BLUEPRINT: &str = r#"
[stream]
name = "events"

[feed]
payload_count = 4
records_per_payload = 2
rate_hz = 200.0

[drain]
workers = 2
tick_interval_ms = 1
source_capacity = 8

[[destinations]]
name = "audit"
kind = "log"

[destinations.config]
level = "info"
"#;

    const TWO_DESTINATIONS: &str = r#"
[stream]
name = "events"

[drain]
workers = 2
tick_interval_ms = 1
source_capacity = 8

[[destinations]]
name = "latest"
kind = "memory"

[destinations.config]
capacity = "16"

[[destinations]]
name = "audit"
kind = "log"
"#;

    /// A parsed blueprint wires straight into a running stage with the
    /// kind-resolved writer.
    #[tokio::test]
    async fn test_blueprint_drives_a_stage_end_to_end() {
        let blueprint = ConfigLoader::load_from_str(BLUEPRINT, ConfigFormat::Toml).unwrap();
        let spec = &blueprint.destinations[0];
        let map = Arc::new(blueprint.destination_map(spec));
        assert_eq!(map.stream(), "events");
        assert_eq!(map.id().as_ref(), b"events/audit");

        let drain = Drain::new(map.id().clone(), blueprint.drain.clone());
        let supervisor = CountingSupervisor::new();
        let (source, feeder) = ChannelSource::bounded(blueprint.drain.source_capacity);

        drain.start(supervisor.clone(), map, source).await.unwrap();

        feeder.send(payload(&[1, 2])).await.unwrap();
        feeder
            .send(payload(&[3]).with_end_of_stream(true))
            .await
            .unwrap();

        wait_until("the stage to report", || supervisor.notified() == 1).await;
        let snapshot = drain.metrics().snapshot();
        assert_eq!(snapshot.payloads_dispatched, 2);
        assert_eq!(snapshot.payloads_written, 2);
        assert_eq!(snapshot.records_written, 3);
    }

    /// Every destination in the blueprint gets an independent stage.
    #[tokio::test]
    async fn test_each_destination_gets_its_own_stage() {
        let blueprint = ConfigLoader::load_from_str(TWO_DESTINATIONS, ConfigFormat::Toml).unwrap();
        assert_eq!(blueprint.destinations.len(), 2);
        let supervisor = CountingSupervisor::new();

        let mut drains = Vec::new();
        for spec in &blueprint.destinations {
            let map = Arc::new(blueprint.destination_map(spec));
            let drain = Drain::new(map.id().clone(), blueprint.drain.clone());
            let (source, feeder) = ChannelSource::bounded(blueprint.drain.source_capacity);
            drain.start(supervisor.clone(), map, source).await.unwrap();
            feeder
                .send(payload(&[1]).with_end_of_stream(true))
                .await
                .unwrap();
            drains.push(drain);
        }

        wait_until("both stages to report", || supervisor.notified() == 2).await;
        for drain in &drains {
            assert!(drain.stopped().await);
            assert_eq!(drain.metrics().snapshot().payloads_written, 1);
        }
    }

    /// The feed's final marker shuts the stage down by itself.
    #[tokio::test]
    async fn test_feed_end_of_stream_stops_the_stage() {
        let drain = Drain::new("events/feed", settings(2));
        let supervisor = CountingSupervisor::new();
        let writer = Arc::new(MemoryWriter::new("feed"));
        let (source, sender) = ChannelSource::bounded(8);

        drain
            .start_with_writer(supervisor.clone(), memory_map("feed"), writer.clone(), source)
            .await
            .unwrap();

        let feed = RecordFeed::new(
            "events",
            FeedConfig {
                payload_count: 5,
                records_per_payload: 3,
                rate_hz: 500.0,
            },
        );
        let handle = feed.spawn(sender);

        wait_until("the stage to report", || supervisor.notified() == 1).await;
        tokio::time::timeout(WAIT, handle)
            .await
            .expect("feed did not finish")
            .unwrap();

        assert_eq!(writer.payload_count(), 5);
        assert_eq!(writer.record_count(), 15);
        assert!(writer.end_of_stream_seen());
    }
}
