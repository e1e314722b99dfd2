//! # Preview Scheduler
//!
//! Recomputes node previews on background workers while the editor stays
//! responsive.
//!
//! ## Rules
//!
//! - At most one task per node is in flight. Scheduling again while one runs
//!   cancels it and parks the new job; a newer job replaces a parked one.
//! - A result whose ticket is no longer current is dropped unseen.
//! - Results are only handed out by [`PreviewScheduler::poll`], so display
//!   state is touched on one thread.
//!
//! ```text
//!   schedule(node) ──▶ task table ──▶ job queue ──▶ worker ┐
//!                         ▲                                │
//!   poll() ◀── ticket check ◀──────── done channel ◀───────┘
//! ```

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use landforge_core::{GridBuffer, GridFunction, LandformError, LandformResult};
use landforge_procedural::BiomeId;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::graph::{LandformGraph, PortValue};
use crate::node::NodeId;

/// Cooperative cancellation flag shared with a running job.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the job to stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// True once cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// `Err(PreviewCancelled)` once cancelled, for `?` inside jobs.
    ///
    /// # Errors
    ///
    /// Returns `PreviewCancelled` naming `node` if the token was cancelled.
    pub fn check(&self, node: NodeId) -> LandformResult<()> {
        if self.is_cancelled() {
            Err(LandformError::PreviewCancelled(node.value()))
        } else {
            Ok(())
        }
    }
}

/// Work run on a preview worker.
pub type PreviewJob<T> = Box<dyn FnOnce(&CancelToken) -> LandformResult<T> + Send>;

/// A result delivered by [`PreviewScheduler::poll`].
#[derive(Debug)]
pub enum PreviewEvent<T> {
    /// The node's current task finished.
    Completed {
        /// The node previewed.
        node: NodeId,
        /// The job's output.
        value: T,
    },
    /// The node's current task failed.
    Failed {
        /// The node previewed.
        node: NodeId,
        /// Why.
        error: LandformError,
    },
}

struct Task<T> {
    node: NodeId,
    ticket: u64,
    token: CancelToken,
    job: PreviewJob<T>,
}

struct Done<T> {
    node: NodeId,
    ticket: u64,
    result: LandformResult<T>,
}

struct Slot<T> {
    running: Option<(u64, CancelToken)>,
    pending: Option<PreviewJob<T>>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            running: None,
            pending: None,
        }
    }
}

struct Table<T> {
    next_ticket: u64,
    slots: HashMap<NodeId, Slot<T>>,
}

/// Background preview computation with one task per node.
pub struct PreviewScheduler<T> {
    queue: Option<Sender<Task<T>>>,
    done: Receiver<Done<T>>,
    table: Mutex<Table<T>>,
    workers: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> PreviewScheduler<T> {
    /// Starts `workers` worker threads (at least one).
    ///
    /// # Errors
    ///
    /// Returns `Io` if a thread cannot be spawned.
    pub fn new(workers: usize) -> LandformResult<Self> {
        let (queue_tx, queue_rx) = unbounded::<Task<T>>();
        let (done_tx, done_rx) = unbounded::<Done<T>>();

        let mut handles = Vec::with_capacity(workers.max(1));
        for index in 0..workers.max(1) {
            let name = format!("landform-preview-{index}");
            let (queue_rx, done_tx) = (queue_rx.clone(), done_tx.clone());
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_loop(&queue_rx, &done_tx))
                .map_err(|e| LandformError::Io {
                    path: name,
                    reason: e.to_string(),
                })?;
            handles.push(handle);
        }

        Ok(Self {
            queue: Some(queue_tx),
            done: done_rx,
            table: Mutex::new(Table {
                next_ticket: 1,
                slots: HashMap::new(),
            }),
            workers: handles,
        })
    }

    /// Schedules `job` as the node's newest preview.
    ///
    /// # Errors
    ///
    /// Returns `PreviewFailed` if the workers have shut down.
    pub fn schedule(&self, node: NodeId, job: PreviewJob<T>) -> LandformResult<()> {
        let mut table = self.table.lock();
        let slot = table.slots.entry(node).or_default();

        if let Some((ticket, token)) = &slot.running {
            debug!(%node, ticket, "Preview in flight, cancelling and parking new job");
            token.cancel();
            slot.pending = Some(job);
            return Ok(());
        }

        self.dispatch(&mut table, node, job)
    }

    /// Cancels the node's task and drops any parked job.
    pub fn cancel(&self, node: NodeId) {
        let mut table = self.table.lock();
        if let Some(slot) = table.slots.remove(&node) {
            if let Some((_, token)) = slot.running {
                token.cancel();
            }
        }
    }

    /// True if the node has a task in flight or parked.
    #[must_use]
    pub fn is_busy(&self, node: NodeId) -> bool {
        self.table
            .lock()
            .slots
            .get(&node)
            .is_some_and(|slot| slot.running.is_some() || slot.pending.is_some())
    }

    /// Number of workers.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Collects finished tasks without blocking.
    ///
    /// Stale results are dropped, and parked jobs whose predecessor has
    /// finished are dispatched.
    pub fn poll(&self) -> Vec<PreviewEvent<T>> {
        let mut events = Vec::new();
        for done in self.done.try_iter() {
            self.settle(done, &mut events);
        }
        events
    }

    /// Like [`poll`](Self::poll), but waits up to `timeout` for the first
    /// finished task.
    pub fn poll_timeout(&self, timeout: Duration) -> Vec<PreviewEvent<T>> {
        let mut events = Vec::new();
        let Ok(first) = self.done.recv_timeout(timeout) else {
            return events;
        };
        self.settle(first, &mut events);
        for done in self.done.try_iter() {
            self.settle(done, &mut events);
        }
        events
    }

    fn settle(&self, done: Done<T>, events: &mut Vec<PreviewEvent<T>>) {
        let mut table = self.table.lock();
        let Some(slot) = table.slots.get_mut(&done.node) else {
            debug!(node = %done.node, ticket = done.ticket, "Dropping result of cancelled preview");
            return;
        };
        if slot.running.as_ref().map(|(ticket, _)| *ticket) != Some(done.ticket) {
            debug!(node = %done.node, ticket = done.ticket, "Dropping stale preview result");
            return;
        }
        slot.running = None;

        if let Some(job) = slot.pending.take() {
            // The finished task was cancelled for this job
            debug!(node = %done.node, ticket = done.ticket, "Dropping superseded preview result");
            if let Err(error) = self.dispatch(&mut table, done.node, job) {
                warn!(node = %done.node, %error, "Could not dispatch parked preview");
                events.push(PreviewEvent::Failed { node: done.node, error });
            }
            return;
        }
        table.slots.remove(&done.node);

        match done.result {
            Ok(value) => events.push(PreviewEvent::Completed { node: done.node, value }),
            Err(error) => {
                warn!(node = %done.node, %error, "Preview task failed");
                events.push(PreviewEvent::Failed { node: done.node, error });
            }
        }
    }

    fn dispatch(&self, table: &mut Table<T>, node: NodeId, job: PreviewJob<T>) -> LandformResult<()> {
        let ticket = table.next_ticket;
        table.next_ticket += 1;
        let token = CancelToken::new();

        let task = Task {
            node,
            ticket,
            token: token.clone(),
            job,
        };
        let sent = self.queue.as_ref().is_some_and(|queue| queue.send(task).is_ok());
        if !sent {
            table.slots.remove(&node);
            return Err(LandformError::PreviewFailed {
                node: node.value(),
                reason: "preview workers have shut down".to_string(),
            });
        }

        debug!(%node, ticket, "Dispatched preview");
        table.slots.entry(node).or_default().running = Some((ticket, token));
        Ok(())
    }
}

impl<T> Drop for PreviewScheduler<T> {
    fn drop(&mut self) {
        for slot in self.table.get_mut().slots.values() {
            if let Some((_, token)) = &slot.running {
                token.cancel();
            }
        }
        // Closing the queue ends every worker loop
        self.queue.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop<T>(queue: &Receiver<Task<T>>, done: &Sender<Done<T>>) {
    while let Ok(task) = queue.recv() {
        let Task {
            node,
            ticket,
            token,
            job,
        } = task;

        let result = if token.is_cancelled() {
            Err(LandformError::PreviewCancelled(node.value()))
        } else {
            panic::catch_unwind(AssertUnwindSafe(|| job(&token))).unwrap_or_else(|_| {
                Err(LandformError::PreviewFailed {
                    node: node.value(),
                    reason: "preview job panicked".to_string(),
                })
            })
        };

        if done.send(Done { node, ticket, result }).is_err() {
            break;
        }
    }
}

// =============================================================================
// Node previews
// =============================================================================

/// A sampled node output.
#[derive(Clone, Debug, PartialEq)]
pub enum PreviewImage {
    /// A scalar port.
    Values(GridBuffer<f64>),
    /// A biome port; `None` where the port leaves the cell open.
    Biomes(GridBuffer<Option<BiomeId>>),
}

impl PreviewImage {
    /// `(width, height)` in cells.
    #[must_use]
    pub fn size(&self) -> (usize, usize) {
        match self {
            Self::Values(buffer) => (buffer.width(), buffer.height()),
            Self::Biomes(buffer) => (buffer.width(), buffer.height()),
        }
    }
}

/// Builds a job sampling `node.port` over `width` x `height` node-space
/// cells. The port is resolved now; sampling happens on the worker.
///
/// # Errors
///
/// Returns `NodeNotFound` or `PortNotFound`.
pub fn preview_job(
    graph: &LandformGraph,
    node: NodeId,
    port: &str,
    width: usize,
    height: usize,
) -> LandformResult<PreviewJob<PreviewImage>> {
    let output = graph.output(node, port)?;
    Ok(Box::new(move |token: &CancelToken| match output {
        PortValue::Value(supplier) => {
            let grid = supplier.get();
            sample_rows(&*grid, width, height, node, token).map(PreviewImage::Values)
        }
        PortValue::Biome(supplier) => {
            let grid = supplier.get();
            sample_rows(&*grid, width, height, node, token).map(PreviewImage::Biomes)
        }
    }))
}

fn sample_rows<V>(
    grid: &dyn GridFunction<V>,
    width: usize,
    height: usize,
    node: NodeId,
    token: &CancelToken,
) -> LandformResult<GridBuffer<V>> {
    let mut rows = Vec::with_capacity(width * height);
    for z in 0..height {
        token.check(node)?;
        rows.extend((0..width).map(|x| grid.value_at(x as f64, z as f64)));
    }
    GridBuffer::from_vec(width, height, rows).ok_or_else(|| LandformError::PreviewFailed {
        node: node.value(),
        reason: "preview size overflowed".to_string(),
    })
}
