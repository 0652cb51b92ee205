use std::{
    sync::{
        mpsc::{channel, Receiver, Sender},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use anyhow::Result;
use latency_stats::{
    service::{
        config::ServiceConfig, ComputeStats, ReplyError, ServiceError, StatsService,
        SubmitError, WorkerState,
    },
    stats::{bucket_count::BucketCount, Stats},
};

const LONG: Duration = Duration::from_secs(10);

fn samples_for(i: usize) -> Vec<f64> {
    (0..(50 + i * 13))
        .map(|j| ((j * 31 + i * 7) % 97) as f64 * 1.5 - 20.)
        .collect()
}

/// Signals when a computation starts, then waits for permission to
/// finish it.
struct GatedEngine {
    entered: Sender<()>,
    release: Receiver<()>,
}

impl ComputeStats for GatedEngine {
    fn compute(&mut self, samples: &[f64], bucket_count: BucketCount) -> Stats {
        self.entered.send(()).expect("test still running");
        self.release.recv().expect("test still running");
        Stats::compute(samples, bucket_count)
    }
}

struct Gate {
    entered: Receiver<()>,
    release: Sender<()>,
}

fn gated_engine() -> (GatedEngine, Gate) {
    let (entered_w, entered_r) = channel();
    let (release_w, release_r) = channel();
    (
        GatedEngine {
            entered: entered_w,
            release: release_r,
        },
        Gate {
            entered: entered_r,
            release: release_w,
        },
    )
}

/// Records the first sample of every request it computes.
struct RecordingEngine(Arc<Mutex<Vec<f64>>>);

impl ComputeStats for RecordingEngine {
    fn compute(&mut self, samples: &[f64], bucket_count: BucketCount) -> Stats {
        self.0.lock().expect("no panics").push(samples[0]);
        Stats::compute(samples, bucket_count)
    }
}

struct PanickingEngine;

impl ComputeStats for PanickingEngine {
    fn compute(&mut self, _samples: &[f64], _bucket_count: BucketCount) -> Stats {
        panic!("engine failure")
    }
}

#[test]
fn t_concurrent_results_match_direct_compute() -> Result<()> {
    let service = StatsService::start(&ServiceConfig::default())?;
    let results: Vec<(usize, Stats)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..24)
            .map(|i| {
                let service = &service;
                scope.spawn(move || -> Result<(usize, Stats)> {
                    let reply = service.submit(samples_for(i), (i % 7) as i64 * 20)?;
                    Ok((i, reply.recv()?))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("no panics"))
            .collect::<Result<_>>()
    })?;
    assert_eq!(results.len(), 24);
    for (i, stats) in results {
        let direct = Stats::compute(&samples_for(i), (i % 7) as i64 * 20);
        assert_eq!(stats, direct);
        assert_eq!(stats.count, samples_for(i).len());
        assert_eq!(stats.histogram.iter().sum::<u64>(), stats.count as u64);
    }
    assert_eq!(service.processed(), 24);
    service.shutdown()?;
    Ok(())
}

#[test]
fn t_fifo_order() -> Result<()> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let service =
        StatsService::start_with_engine(&ServiceConfig::default(), RecordingEngine(seen.clone()))?;
    let replies = (0..30)
        .map(|i| service.submit(vec![i as f64, 1.], 10))
        .collect::<Result<Vec<_>, _>>()?;
    for (i, reply) in replies.into_iter().enumerate() {
        let stats = reply.recv()?;
        assert_eq!(stats.total, i as f64 + 1.);
    }
    let expected: Vec<f64> = (0..30).map(|i| i as f64).collect();
    assert_eq!(*seen.lock().expect("no panics"), expected);
    Ok(())
}

#[test]
fn t_backpressure() -> Result<()> {
    let config = ServiceConfig::default();
    assert_eq!(config.queue_capacity, 10);
    let (engine, gate) = gated_engine();
    let service = StatsService::start_with_engine(&config, engine)?;
    assert_ne!(service.state(), WorkerState::Stopped);

    let mut replies = vec![service.submit(vec![1.], 5)?];
    // The worker took the first request off the queue and is stuck in it
    gate.entered.recv_timeout(LONG)?;
    assert_eq!(service.state(), WorkerState::Computing);

    for i in 0..10 {
        replies.push(service.try_submit(vec![i as f64 + 2.], 5)?);
    }
    match service.try_submit(vec![42., 43.], 5) {
        Err(SubmitError::QueueFull(samples)) => assert_eq!(samples, [42., 43.]),
        other => panic!("expected QueueFull, got {other:?}"),
    }

    let (done_w, done_r) = channel();
    let blocked_reply = thread::scope(|scope| -> Result<_> {
        let handle = scope.spawn({
            let service = &service;
            move || {
                let reply = service.submit(vec![100.], 5);
                done_w.send(()).expect("receiver alive");
                reply
            }
        });
        // Still waiting for room in the queue
        assert!(done_r.recv_timeout(Duration::from_millis(200)).is_err());
        gate.release.send(())?;
        done_r.recv_timeout(LONG)?;
        Ok(handle.join().expect("no panics")?)
    })?;
    replies.push(blocked_reply);

    for _ in 0..11 {
        gate.release.send(())?;
    }
    let totals = replies
        .into_iter()
        .map(|reply| -> Result<f64> { Ok(reply.recv_timeout(LONG)?.total) })
        .collect::<Result<Vec<_>>>()?;
    let mut expected = vec![1.];
    expected.extend((0..10).map(|i| i as f64 + 2.));
    expected.push(100.);
    assert_eq!(totals, expected);
    assert_eq!(service.processed(), 12);
    Ok(())
}

#[test]
fn t_reply_timeout_and_not_ready() -> Result<()> {
    let (engine, gate) = gated_engine();
    let service = StatsService::start_with_engine(&ServiceConfig::default(), engine)?;
    let reply = service.submit(vec![3., 4.], 2)?;
    gate.entered.recv_timeout(LONG)?;
    assert_eq!(reply.try_recv(), Err(ReplyError::NotReady));
    assert_eq!(
        reply.recv_timeout(Duration::from_millis(50)),
        Err(ReplyError::Timeout)
    );
    gate.release.send(())?;
    let stats = reply.recv_timeout(LONG)?;
    assert_eq!(stats.histogram, [1, 1]);
    Ok(())
}

#[test]
fn t_shutdown_drains_queue() -> Result<()> {
    let service = StatsService::start(&ServiceConfig::default())?;
    let replies = (1..=5)
        .map(|n| service.submit(vec![2.; n], 3))
        .collect::<Result<Vec<_>, _>>()?;
    service.shutdown()?;
    for (i, reply) in replies.into_iter().enumerate() {
        assert_eq!(reply.recv()?.count, i + 1);
    }
    Ok(())
}

#[test]
fn t_abandoned_reply_is_harmless() -> Result<()> {
    let service = StatsService::start(&ServiceConfig::default())?;
    drop(service.submit(vec![1., 2., 3.], 3)?);
    let stats = service.compute(vec![5., 5., 5., 5.], 8)?;
    assert_eq!(stats.histogram[0], 4);
    assert_eq!(stats.std_dev, 0.);
    Ok(())
}

#[test]
fn t_default_bucket_count() -> Result<()> {
    let config = ServiceConfig {
        default_bucket_count: BucketCount::clamped(7),
        ..Default::default()
    };
    let service = StatsService::start(&config)?;
    let stats = service.submit_default(vec![1., 2.])?.recv()?;
    assert_eq!(stats.histogram.len(), 7);
    let stats = service.compute(vec![], 0)?;
    assert_eq!(stats.histogram, vec![0; 100]);
    assert_eq!(stats.count, 0);
    Ok(())
}

#[test]
fn t_zero_capacity_rejected() {
    let config = ServiceConfig {
        queue_capacity: 0,
        ..Default::default()
    };
    assert!(matches!(
        StatsService::start(&config),
        Err(ServiceError::ZeroQueueCapacity)
    ));
}

#[test]
fn t_panicking_engine() -> Result<()> {
    let service = StatsService::start_with_engine(&ServiceConfig::default(), PanickingEngine)?;
    let reply = service.submit(vec![1.], 1)?;
    assert_eq!(reply.recv(), Err(ReplyError::WorkerGone));
    match service.submit(vec![1.], 1) {
        Err(SubmitError::WorkerGone) => (),
        // The worker may not have dropped its end of the queue yet
        Ok(reply) => assert_eq!(reply.recv(), Err(ReplyError::WorkerGone)),
        Err(e) => panic!("unexpected error {e}"),
    }
    assert!(matches!(
        service.shutdown(),
        Err(ServiceError::WorkerPanicked)
    ));
    Ok(())
}
