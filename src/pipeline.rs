use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, info};

use crate::client::RepositoryClient;
use crate::config::MigratorConfig;
use crate::domain::{TransferJob, TreeNode, TreeResponse};
use crate::error::MigratorError;
use crate::planner::{Plan, plan_node};

#[derive(Debug, Default)]
pub struct PipelineStats {
    listings: AtomicU64,
    nodes: AtomicU64,
    groups: AtomicU64,
    jobs: AtomicU64,
    transfers: AtomicU64,
    failures: AtomicU64,
    pending: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub listings: u64,
    pub nodes: u64,
    pub groups: u64,
    pub jobs: u64,
    pub transfers: u64,
    pub failures: u64,
    pub pending: usize,
}

impl PipelineStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            listings: self.listings.load(Ordering::Relaxed),
            nodes: self.nodes.load(Ordering::Relaxed),
            groups: self.groups.load(Ordering::Relaxed),
            jobs: self.jobs.load(Ordering::Relaxed),
            transfers: self.transfers.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            pending: self.pending(),
        }
    }

    /// Messages queued or being processed anywhere in the network.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }
}

/// Shared by every worker of every stage.
#[derive(Clone)]
struct StageContext {
    stats: Arc<PipelineStats>,
    failures: Sender<MigratorError>,
}

impl StageContext {
    /// Counts the message as pending before it becomes visible downstream.
    fn forward<T>(&self, tx: &Sender<T>, message: T) {
        self.stats.pending.fetch_add(1, Ordering::SeqCst);
        if tx.send(message).is_err() {
            self.stats.pending.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn fail(&self, err: MigratorError) {
        self.stats.failures.fetch_add(1, Ordering::Relaxed);
        if let Err(unsent) = self.failures.send(err) {
            debug!(error = %unsent.0, "failure channel closed, error not reported");
        }
    }

    fn done(&self) {
        self.stats.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct PipelineHandle {
    seed: Sender<String>,
    failures: Receiver<MigratorError>,
    context: StageContext,
    workers: Vec<JoinHandle<()>>,
}

impl PipelineHandle {
    /// Queues a listing URL for the fetch stage.
    pub fn seed(&self, url: impl Into<String>) {
        self.context.forward(&self.seed, url.into());
    }

    pub fn failures(&self) -> &Receiver<MigratorError> {
        &self.failures
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.context.stats
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Polls until nothing is pending. Returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.stats().is_idle() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
        true
    }

    /// Logs every failure as it arrives. Announces each transition to idle
    /// but keeps running; returns only if every worker has gone away.
    pub fn drain_failures(&self, poll: Duration) {
        let mut idle_reported = false;
        loop {
            match self.failures.recv_timeout(poll) {
                Ok(err) => error!("{err}"),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return,
            }
            let snapshot = self.stats().snapshot();
            if snapshot.pending == 0 && !idle_reported {
                info!(
                    listings = snapshot.listings,
                    jobs = snapshot.jobs,
                    transfers = snapshot.transfers,
                    failures = snapshot.failures,
                    "pipeline idle"
                );
            }
            idle_reported = snapshot.pending == 0;
        }
    }
}

/// The four-stage migration network.
///
/// ```text
///   seed ──► fetch ──► decode ──► plan ──► transfer
///              ▲                   │
///              └──── child groups ─┘
/// ```
///
/// Every stage is a pool of threads draining one shared bounded queue. Errors
/// from any stage go to a single unbounded failure channel and the message
/// that caused them is dropped.
pub struct Pipeline;

impl Pipeline {
    /// Starts every worker pool. Nothing moves until [`PipelineHandle::seed`].
    pub fn spawn<C>(
        config: Arc<MigratorConfig>,
        client: Arc<C>,
    ) -> Result<PipelineHandle, MigratorError>
    where
        C: RepositoryClient + 'static,
    {
        let capacity = config.queue_capacity;
        let (fetch_tx, fetch_rx) = channel::bounded::<String>(capacity);
        let (decode_tx, decode_rx) = channel::bounded::<Vec<u8>>(capacity);
        let (plan_tx, plan_rx) = channel::bounded::<TreeNode>(capacity);
        let (transfer_tx, transfer_rx) = channel::bounded::<TransferJob>(capacity);
        let (failure_tx, failure_rx) = channel::unbounded();

        let context = StageContext {
            stats: Arc::new(PipelineStats::default()),
            failures: failure_tx,
        };
        let pools = config.pools;
        let mut workers = Vec::new();

        for index in 0..pools.fetch {
            let (client, rx, tx, ctx) = (
                Arc::clone(&client),
                fetch_rx.clone(),
                decode_tx.clone(),
                context.clone(),
            );
            workers.push(spawn_worker("fetch", index, move || {
                fetch_stage(&*client, rx, tx, ctx)
            })?);
        }

        for index in 0..pools.decode {
            let (rx, tx, ctx) = (decode_rx.clone(), plan_tx.clone(), context.clone());
            workers.push(spawn_worker("decode", index, move || {
                decode_stage(rx, tx, ctx)
            })?);
        }

        for index in 0..pools.plan {
            let (config, rx, fetch, transfer, ctx) = (
                Arc::clone(&config),
                plan_rx.clone(),
                fetch_tx.clone(),
                transfer_tx.clone(),
                context.clone(),
            );
            workers.push(spawn_worker("plan", index, move || {
                plan_stage(&config, rx, fetch, transfer, ctx)
            })?);
        }

        for index in 0..pools.transfer {
            let (client, rx, ctx) = (Arc::clone(&client), transfer_rx.clone(), context.clone());
            workers.push(spawn_worker("transfer", index, move || {
                transfer_stage(&*client, rx, ctx)
            })?);
        }

        info!(
            fetch = pools.fetch,
            decode = pools.decode,
            plan = pools.plan,
            transfer = pools.transfer,
            queue_capacity = capacity,
            "pipeline started"
        );

        Ok(PipelineHandle {
            seed: fetch_tx,
            failures: failure_rx,
            context,
            workers,
        })
    }
}

fn spawn_worker<F>(stage: &str, index: usize, body: F) -> Result<JoinHandle<()>, MigratorError>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(format!("{stage}-{index}"))
        .spawn(body)
        .map_err(|err| MigratorError::Spawn {
            stage: stage.to_string(),
            message: err.to_string(),
        })
}

fn fetch_stage<C: RepositoryClient + ?Sized>(
    client: &C,
    rx: Receiver<String>,
    decode: Sender<Vec<u8>>,
    ctx: StageContext,
) {
    for url in rx {
        match client.fetch_listing(&url) {
            Ok(body) => {
                ctx.stats.listings.fetch_add(1, Ordering::Relaxed);
                ctx.forward(&decode, body);
            }
            Err(err) => ctx.fail(err),
        }
        ctx.done();
    }
}

fn decode_stage(rx: Receiver<Vec<u8>>, plan: Sender<TreeNode>, ctx: StageContext) {
    for body in rx {
        match serde_json::from_slice::<TreeResponse>(&body) {
            Ok(response) => {
                ctx.stats.nodes.fetch_add(1, Ordering::Relaxed);
                debug!(path = %response.data.path, "decoded node");
                ctx.forward(&plan, response.data);
            }
            Err(err) => ctx.fail(MigratorError::Decode(err.to_string())),
        }
        ctx.done();
    }
}

fn plan_stage(
    config: &MigratorConfig,
    rx: Receiver<TreeNode>,
    fetch: Sender<String>,
    transfer: Sender<TransferJob>,
    ctx: StageContext,
) {
    for node in rx {
        match plan_node(&node, &config.endpoints) {
            Plan::Descend(urls) => {
                debug!(path = %node.path, groups = urls.len(), "descending");
                ctx.stats
                    .groups
                    .fetch_add(urls.len() as u64, Ordering::Relaxed);
                for url in urls {
                    ctx.forward(&fetch, url);
                }
            }
            Plan::Transfer(jobs) => {
                debug!(path = %node.path, jobs = jobs.len(), "planned transfers");
                ctx.stats.jobs.fetch_add(jobs.len() as u64, Ordering::Relaxed);
                for job in jobs {
                    ctx.forward(&transfer, job);
                }
            }
        }
        ctx.done();
    }
}

fn transfer_stage<C: RepositoryClient + ?Sized>(
    client: &C,
    rx: Receiver<TransferJob>,
    ctx: StageContext,
) {
    for job in rx {
        match client.transfer(&job) {
            Ok(()) => {
                ctx.stats.transfers.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => ctx.fail(err),
        }
        ctx.done();
    }
}
