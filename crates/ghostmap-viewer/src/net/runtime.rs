use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use std::collections::HashMap;
use std::time::Duration;
use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::graph::timeline::TickScheduler;
use crate::net::http::{ApiClient, FetchError};
use crate::net::protocol::{Effect, FetchRequest, FetchSlot, Incoming, Mutation};

/// Runs API calls and timers off the frame loop; everything it learns goes
/// back over `tx`.
pub struct NetRuntime {
    rt: Runtime,
    api: ApiClient,
    tx: Sender<Incoming>,
    inflight: HashMap<FetchSlot, CancellationToken>,
    shutdown: CancellationToken,
}

impl NetRuntime {
    pub fn start(api: ApiClient, tx: Sender<Incoming>, ghost_every: Duration) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("ghostmap-net")
            .enable_all()
            .build()
            .context("start tokio runtime")?;
        let net = Self {
            rt,
            api,
            tx,
            inflight: HashMap::new(),
            shutdown: CancellationToken::new(),
        };
        net.spawn_ghost_poller(ghost_every);
        info!(api = %net.api.base(), "network runtime started");
        Ok(net)
    }

    pub fn handle(&self) -> Handle {
        self.rt.handle().clone()
    }

    pub fn ticker(&self) -> TokioTicker {
        TokioTicker::new(self.handle(), self.tx.clone())
    }

    pub fn run(&mut self, effect: Effect) {
        match effect {
            Effect::Fetch(req) => self.fetch(req),
            Effect::Cancel(slot) => self.cancel(slot),
            Effect::Mutate(m) => self.mutate(m),
        }
    }

    fn cancel(&mut self, slot: FetchSlot) {
        if let Some(token) = self.inflight.remove(&slot) {
            debug!(?slot, "cancel in-flight fetch");
            token.cancel();
        }
    }

    fn fetch(&mut self, req: FetchRequest) {
        let token = self.shutdown.child_token();
        if let Some(prev) = self.inflight.insert(req.kind.slot(), token.clone()) {
            prev.cancel();
        }
        let api = self.api.clone();
        let tx = self.tx.clone();
        self.rt.spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => Err(FetchError::Cancelled),
                r = api.fetch(&req.kind) => r,
            };
            let _ = tx.send(Incoming::fetched(&req, result));
        });
    }

    fn mutate(&mut self, mutation: Mutation) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        let token = self.shutdown.child_token();
        self.rt.spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => return,
                r = api.mutate(&mutation) => r,
            };
            let _ = tx.send(Incoming::Mutated { mutation, result });
        });
    }

    fn spawn_ghost_poller(&self, every: Duration) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        let token = self.shutdown.child_token();
        self.rt.spawn(async move {
            let mut tick = interval(every);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tick.tick() => {}
                }
                let result = tokio::select! {
                    _ = token.cancelled() => break,
                    r = api.ghost_activity() => r,
                };
                if tx.send(Incoming::Ghost(result)).is_err() {
                    break;
                }
            }
        });
    }
}

impl Drop for NetRuntime {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Playback timer backed by a tokio interval task. At most one task runs.
#[derive(Debug)]
pub struct TokioTicker {
    handle: Handle,
    tx: Sender<Incoming>,
    task: Option<JoinHandle<()>>,
}

impl TokioTicker {
    pub fn new(handle: Handle, tx: Sender<Incoming>) -> Self {
        Self {
            handle,
            tx,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl TickScheduler for TokioTicker {
    fn start(&mut self, period: Duration, generation: u64) {
        self.cancel();
        let tx = self.tx.clone();
        self.task = Some(self.handle.spawn(async move {
            let mut tick = interval(period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately
            tick.tick().await;
            loop {
                tick.tick().await;
                if tx.send(Incoming::Tick { generation }).is_err() {
                    break;
                }
            }
        }));
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TokioTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn ticker_delivers_its_generation() {
        let rt = runtime();
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut ticker = TokioTicker::new(rt.handle().clone(), tx);
        ticker.start(Duration::from_millis(10), 7);
        let got = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(got, Incoming::Tick { generation: 7 }));
        ticker.cancel();
        assert!(!ticker.is_running());
    }

    #[test]
    fn restart_replaces_the_previous_task() {
        let rt = runtime();
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut ticker = TokioTicker::new(rt.handle().clone(), tx);
        ticker.start(Duration::from_millis(5), 1);
        ticker.start(Duration::from_millis(5), 2);
        // let any tick from the aborted task that was already queued drain first
        std::thread::sleep(Duration::from_millis(50));
        let generations: Vec<u64> = rx
            .try_iter()
            .filter_map(|i| match i {
                Incoming::Tick { generation } => Some(generation),
                _ => None,
            })
            .collect();
        assert!(!generations.is_empty());
        assert_eq!(generations.last(), Some(&2));
        ticker.cancel();
    }
}
