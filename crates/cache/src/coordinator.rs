//! Subscription feeds driving the recompute handlers.
//!
//! Every feed gets a forwarding task that drains the chain channel and a
//! worker task that runs the recompute. The forwarder never waits on the
//! worker: era changes collapse to the newest value, and finalized blocks
//! pile up in a bounded backlog that the worker drains in one pass.

use crate::engine::CacheEngine;
use crate::errors::Result;
use parking_lot::Mutex;
use stakecache_chain::{BlockHash, ChainApi};
use stakecache_types::EraIndex;
use std::future::Future;
use std::mem;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Default)]
struct BlockBacklog {
    pending: Vec<BlockHash>,
    overflowed: bool,
    closed: bool,
}

struct BlockQueue {
    backlog: Mutex<BlockBacklog>,
    notify: Notify,
    limit: usize,
}

enum BlockWork {
    Apply(Vec<BlockHash>),
    Rebuild,
    Idle,
    Closed,
}

impl BlockQueue {
    fn new(limit: usize) -> Self {
        Self {
            backlog: Mutex::new(BlockBacklog::default()),
            notify: Notify::new(),
            limit: limit.max(1),
        }
    }

    fn push(&self, hash: BlockHash) {
        {
            let mut backlog = self.backlog.lock();
            // Once overflowed, the pending rebuild covers every later block.
            if !backlog.overflowed {
                if backlog.pending.len() >= self.limit {
                    warn!(limit = self.limit, "block backlog overflowed, scheduling full rebuild");
                    backlog.pending.clear();
                    backlog.overflowed = true;
                } else {
                    backlog.pending.push(hash);
                }
            }
        }
        self.notify.notify_one();
    }

    fn close(&self) {
        self.backlog.lock().closed = true;
        self.notify.notify_one();
    }

    fn take(&self) -> BlockWork {
        let mut backlog = self.backlog.lock();
        if mem::take(&mut backlog.overflowed) {
            backlog.pending.clear();
            BlockWork::Rebuild
        } else if !backlog.pending.is_empty() {
            BlockWork::Apply(mem::take(&mut backlog.pending))
        } else if backlog.closed {
            BlockWork::Closed
        } else {
            BlockWork::Idle
        }
    }
}

/// Running feed tasks for one network. Dropping it leaves the tasks running;
/// call [`SubscriptionCoordinator::shutdown`] to stop them.
pub struct SubscriptionCoordinator {
    tasks: Vec<JoinHandle<()>>,
}

impl SubscriptionCoordinator {
    /// Subscribe to the three chain feeds and start their tasks.
    pub async fn start<C: ChainApi>(engine: Arc<CacheEngine<C>>) -> Result<Self> {
        let chain = engine.chain().clone();
        let active_era = chain.subscribe_active_era().await?;
        let current_era = chain.subscribe_current_era().await?;
        let heads = chain.subscribe_finalized_heads().await?;

        let mut tasks = Vec::with_capacity(6);

        let economics = engine.clone();
        tasks.extend(spawn_era_feed("active_era", active_era, move |era| {
            let engine = economics.clone();
            async move { engine.refresh_economics(Some(era)).await }
        }));

        let registry = engine.clone();
        tasks.extend(spawn_era_feed("current_era", current_era, move |era| {
            let engine = registry.clone();
            async move { engine.refresh_registry(Some(era)).await }
        }));

        tasks.extend(spawn_block_feed(engine.clone(), heads));

        info!(network = %engine.network(), "subscriptions started");
        Ok(Self { tasks })
    }

    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(JoinHandle::is_finished)
    }

    pub fn shutdown(self) {
        for task in self.tasks {
            task.abort();
        }
    }
}

/// Forward an era feed into a watch channel so a busy worker only ever sees
/// the newest era.
fn spawn_era_feed<F, Fut>(
    feed: &'static str,
    mut source: mpsc::Receiver<EraIndex>,
    mut handle: F,
) -> [JoinHandle<()>; 2]
where
    F: FnMut(EraIndex) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (latest_tx, mut latest_rx) = watch::channel::<Option<EraIndex>>(None);

    let forwarder = tokio::spawn(async move {
        while let Some(era) = source.recv().await {
            debug!(feed, era, "era notification");
            if latest_tx.send(Some(era)).is_err() {
                break;
            }
        }
        warn!(feed, "subscription feed closed");
    });

    let worker = tokio::spawn(async move {
        while latest_rx.changed().await.is_ok() {
            let latest = *latest_rx.borrow_and_update();
            if let Some(era) = latest {
                handle(era).await;
            }
        }
    });

    [forwarder, worker]
}

fn spawn_block_feed<C: ChainApi>(
    engine: Arc<CacheEngine<C>>,
    mut source: mpsc::Receiver<BlockHash>,
) -> [JoinHandle<()>; 2] {
    let queue = Arc::new(BlockQueue::new(engine.settings().block_backlog_limit));

    let inbound = queue.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(hash) = source.recv().await {
            debug!(%hash, "finalized block notification");
            inbound.push(hash);
        }
        warn!(feed = "finalized_heads", "subscription feed closed");
        inbound.close();
    });

    let worker = tokio::spawn(async move {
        loop {
            queue.notify.notified().await;
            loop {
                match queue.take() {
                    BlockWork::Apply(hashes) => engine.apply_blocks(&hashes).await,
                    BlockWork::Rebuild => engine.rebuild_positions().await,
                    BlockWork::Idle => break,
                    BlockWork::Closed => return,
                }
            }
        }
    });

    [forwarder, worker]
}
