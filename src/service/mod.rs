//! Serialized statistics computation: any number of callers submit
//! sample sets to one bounded FIFO queue, a single worker thread
//! computes them one at a time and sends each result back through the
//! caller's private reply channel.

pub mod config;

use std::{
    sync::{
        atomic::{AtomicU64, AtomicU8, Ordering},
        mpsc::{
            sync_channel, Receiver, RecvTimeoutError, SyncSender, TryRecvError, TrySendError,
        },
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::{
    debug, info,
    service::config::ServiceConfig,
    stats::{bucket_count::BucketCount, Stats},
    warn,
};

/// The computation the worker runs for each request.
pub trait ComputeStats: Send + 'static {
    fn compute(&mut self, samples: &[f64], bucket_count: BucketCount) -> Stats;
}

/// `Stats::compute`
#[derive(Debug, Default, Clone, Copy)]
pub struct TwoPassEngine;

impl ComputeStats for TwoPassEngine {
    fn compute(&mut self, samples: &[f64], bucket_count: BucketCount) -> Stats {
        Stats::compute(samples, bucket_count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Waiting for a request
    Idle = 0,
    Computing = 1,
    /// The queue was closed (or the worker panicked)
    Stopped = 2,
}

impl WorkerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => WorkerState::Idle,
            1 => WorkerState::Computing,
            2 => WorkerState::Stopped,
            _ => unreachable!("only ever storing WorkerState values"),
        }
    }
}

#[derive(Debug)]
struct WorkerStatus {
    state: AtomicU8,
    processed: AtomicU64,
}

impl WorkerStatus {
    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}

/// Marks the worker as stopped even when the engine panics.
struct StoppedOnDrop(Arc<WorkerStatus>);

impl Drop for StoppedOnDrop {
    fn drop(&mut self) {
        self.0.set_state(WorkerState::Stopped);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("queue_capacity must be at least 1")]
    ZeroQueueCapacity,
    #[error("spawning the worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("the worker thread panicked")]
    WorkerPanicked,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// Only from `try_submit`; carries the samples back to the caller
    #[error("the request queue is full")]
    QueueFull(Vec<f64>),
    #[error("the worker thread is gone")]
    WorkerGone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReplyError {
    #[error("the worker dropped the request without replying")]
    WorkerGone,
    #[error("timed out waiting for the reply")]
    Timeout,
    #[error("the reply is not ready yet")]
    NotReady,
}

struct Request {
    samples: Vec<f64>,
    bucket_count: BucketCount,
    reply: SyncSender<Stats>,
}

/// The receiving end of one request's private reply channel; exactly
/// one `Stats` value is ever sent to it. Waiting is unbounded unless
/// `recv_timeout` is used.
#[must_use]
#[derive(Debug)]
pub struct Reply {
    receiver: Receiver<Stats>,
}

impl Reply {
    pub fn recv(self) -> Result<Stats, ReplyError> {
        self.receiver.recv().map_err(|_| ReplyError::WorkerGone)
    }

    /// Can be called again after a `Timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Stats, ReplyError> {
        self.receiver.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => ReplyError::Timeout,
            RecvTimeoutError::Disconnected => ReplyError::WorkerGone,
        })
    }

    pub fn try_recv(&self) -> Result<Stats, ReplyError> {
        self.receiver.try_recv().map_err(|e| match e {
            TryRecvError::Empty => ReplyError::NotReady,
            TryRecvError::Disconnected => ReplyError::WorkerGone,
        })
    }
}

/// Owns the request queue and the worker thread. Share it by
/// reference (it is `Sync`) or in an `Arc`. Dropping it closes the
/// queue, lets the worker finish what is already queued, and joins
/// it.
#[derive(Debug)]
pub struct StatsService {
    queue: Option<SyncSender<Request>>,
    worker: Option<JoinHandle<()>>,
    status: Arc<WorkerStatus>,
    default_bucket_count: BucketCount,
}

impl StatsService {
    pub fn start(config: &ServiceConfig) -> Result<Self, ServiceError> {
        Self::start_with_engine(config, TwoPassEngine)
    }

    pub fn start_with_engine<E: ComputeStats>(
        config: &ServiceConfig,
        engine: E,
    ) -> Result<Self, ServiceError> {
        if config.queue_capacity == 0 {
            return Err(ServiceError::ZeroQueueCapacity);
        }
        let (queue, requests) = sync_channel(config.queue_capacity);
        let status = Arc::new(WorkerStatus {
            state: AtomicU8::new(WorkerState::Idle as u8),
            processed: AtomicU64::new(0),
        });
        let slow_compute_threshold = config.slow_compute_threshold();
        let worker = thread::Builder::new()
            .name(config.worker_thread_name.clone())
            .spawn({
                let status = status.clone();
                move || run_worker(engine, requests, status, slow_compute_threshold)
            })?;
        info!(
            "started stats worker {:?} with queue capacity {}",
            config.worker_thread_name,
            config.queue_capacity
        );
        Ok(StatsService {
            queue: Some(queue),
            worker: Some(worker),
            status,
            default_bucket_count: config.default_bucket_count,
        })
    }

    fn queue(&self) -> Result<&SyncSender<Request>, SubmitError> {
        self.queue.as_ref().ok_or(SubmitError::WorkerGone)
    }

    /// Enqueue a request, blocking while the queue is full, and
    /// return the channel the result will arrive on.
    pub fn submit(
        &self,
        samples: Vec<f64>,
        bucket_count: impl Into<BucketCount>,
    ) -> Result<Reply, SubmitError> {
        let (reply, receiver) = sync_channel(1);
        let request = Request {
            samples,
            bucket_count: bucket_count.into(),
            reply,
        };
        self.queue()?
            .send(request)
            .map_err(|_| SubmitError::WorkerGone)?;
        Ok(Reply { receiver })
    }

    /// `submit` with the configured `default_bucket_count`.
    pub fn submit_default(&self, samples: Vec<f64>) -> Result<Reply, SubmitError> {
        self.submit(samples, self.default_bucket_count)
    }

    /// Like `submit` but fails with `QueueFull` instead of blocking.
    pub fn try_submit(
        &self,
        samples: Vec<f64>,
        bucket_count: impl Into<BucketCount>,
    ) -> Result<Reply, SubmitError> {
        let (reply, receiver) = sync_channel(1);
        let request = Request {
            samples,
            bucket_count: bucket_count.into(),
            reply,
        };
        match self.queue()?.try_send(request) {
            Ok(()) => Ok(Reply { receiver }),
            Err(TrySendError::Full(request)) => Err(SubmitError::QueueFull(request.samples)),
            Err(TrySendError::Disconnected(_)) => Err(SubmitError::WorkerGone),
        }
    }

    /// Convenience: submit and wait for the result.
    pub fn compute(
        &self,
        samples: Vec<f64>,
        bucket_count: impl Into<BucketCount>,
    ) -> anyhow::Result<Stats> {
        Ok(self.submit(samples, bucket_count)?.recv()?)
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.status.state.load(Ordering::SeqCst))
    }

    /// Number of requests computed so far
    pub fn processed(&self) -> u64 {
        self.status.processed.load(Ordering::SeqCst)
    }

    fn stop(&mut self) -> Result<(), ServiceError> {
        // Closing the queue ends the worker loop once it is drained
        drop(self.queue.take());
        if let Some(worker) = self.worker.take() {
            worker.join().map_err(|_| ServiceError::WorkerPanicked)?;
        }
        Ok(())
    }

    /// Close the queue, wait for already queued requests to be
    /// computed and replied to, and join the worker thread.
    pub fn shutdown(mut self) -> Result<(), ServiceError> {
        self.stop()
    }
}

impl Drop for StatsService {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("stopping stats service: {e}");
        }
    }
}

fn run_worker<E: ComputeStats>(
    mut engine: E,
    requests: Receiver<Request>,
    status: Arc<WorkerStatus>,
    slow_compute_threshold: Duration,
) {
    let _stopped_on_drop = StoppedOnDrop(status.clone());
    debug!("stats worker: started");
    for Request {
        samples,
        bucket_count,
        reply,
    } in requests
    {
        status.set_state(WorkerState::Computing);
        let start = Instant::now();
        let stats = engine.compute(&samples, bucket_count);
        let elapsed = start.elapsed();
        if elapsed > slow_compute_threshold {
            warn!(
                "stats worker: computing stats over {} samples took {:.3} seconds",
                samples.len(),
                elapsed.as_secs_f64()
            );
        } else {
            debug!(
                "stats worker: {} samples, {bucket_count} buckets, {:.6} seconds",
                samples.len(),
                elapsed.as_secs_f64()
            );
        }
        status.processed.fetch_add(1, Ordering::SeqCst);
        if reply.send(stats).is_err() {
            debug!("stats worker: caller dropped its reply channel");
        }
        status.set_state(WorkerState::Idle);
    }
    debug!("stats worker: queue closed, stopping");
}
