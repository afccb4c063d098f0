// crates/livecut-media/src/stage.rs
//
// Stage: one unit of the pipeline fabric — a worker thread plus its bounded
// input and output queues and a runtime-rebindable set of upstream stages.
//
// The selector thread is the only caller of tick(); workers never touch
// anything but their two queue endpoints and the stop flag. The `inputs`
// binding sits behind a parking_lot Mutex so the selector can swap the main
// video feed mid-run while a tick is in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{bail, Result};
use parking_lot::Mutex;

use livecut_core::frame::{Payload, PipelineData, StageId};

use crate::queue::Queue;

/// One tick's worth of gathered upstream output: the latest item per input
/// stage, in binding order. `None` where an input had nothing this tick.
pub type StageInput = Vec<(StageId, Option<Payload>)>;

/// Endpoints handed to a worker when the stage starts.
pub struct WorkerCtx {
    pub input:  Queue<StageInput>,
    pub output: Queue<PipelineData>,
    pub stop:   Arc<AtomicBool>,
}

impl WorkerCtx {
    /// True once close() was called or either queue shut down.
    pub fn stopping(&self) -> bool {
        self.stop.load(Ordering::Relaxed) || self.input.is_closed() || self.output.is_closed()
    }
}

type WorkerFn = Box<dyn FnOnce(WorkerCtx) + Send>;

pub struct Stage {
    id: StageId,

    input_q:  Queue<StageInput>,
    output_q: Queue<PipelineData>,

    /// Upstream stages read by tick(). Rebindable at runtime via set_inputs.
    inputs: Mutex<Vec<Arc<Stage>>>,

    /// Freshest item drained from the output queue on the last tick.
    output_latest: Mutex<Option<PipelineData>>,

    /// Registered by the stage constructor, consumed by start(). The
    /// selector launches every stage in dependency order on its first tick.
    pending: Mutex<Option<WorkerFn>>,

    worker:  Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
    stop:    Arc<AtomicBool>,
}

impl Stage {
    /// A stage whose queue capacities follow the drop flags: a dropping
    /// queue holds a single item (latest-only semantics), a non-dropping
    /// queue is unbounded (accumulate, never lose).
    pub fn new(id: StageId, drop_input: bool, drop_output: bool) -> Arc<Self> {
        let input_cap = if drop_input { 1 } else { 0 };
        let output_cap = if drop_output { 1 } else { 0 };
        Self::with_caps(id, input_cap, drop_input, output_cap, drop_output)
    }

    /// Full control over queue capacities — used by features, whose input
    /// side accumulates (pop_all) and whose vote output keeps a short
    /// drop-oldest backlog.
    pub fn with_caps(
        id:          StageId,
        input_cap:   usize,
        drop_input:  bool,
        output_cap:  usize,
        drop_output: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            input_q:       Queue::new(input_cap, drop_input),
            output_q:      Queue::new(output_cap, drop_output),
            inputs:        Mutex::new(Vec::new()),
            output_latest: Mutex::new(None),
            pending:       Mutex::new(None),
            worker:        Mutex::new(None),
            started:       AtomicBool::new(false),
            stop:          Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn id(&self) -> &StageId {
        &self.id
    }

    /// Replace the upstream binding. Well-defined mid-run: the next tick
    /// gathers from the new set; items already queued from the old set stay
    /// in the input queue.
    pub fn set_inputs(&self, upstream: Vec<Arc<Stage>>) {
        *self.inputs.lock() = upstream;
    }

    pub fn input_ids(&self) -> Vec<StageId> {
        self.inputs.lock().iter().map(|s| s.id.clone()).collect()
    }

    /// Register the worker function to launch on start(). Constructed
    /// stages hold their worker un-launched until the selector starts them.
    pub fn set_worker<F>(&self, worker: F)
    where
        F: FnOnce(WorkerCtx) + Send + 'static,
    {
        *self.pending.lock() = Some(Box::new(worker));
    }

    /// Launch the registered worker. Exactly once — a second call is an
    /// error, as is starting a stage that never registered a worker.
    pub fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            bail!("stage {} already started", self.id);
        }
        let worker = self
            .pending
            .lock()
            .take()
            .ok_or_else(|| anyhow::anyhow!("stage {} has no worker", self.id))?;
        let ctx = WorkerCtx {
            input:  self.input_q.clone(),
            output: self.output_q.clone(),
            stop:   Arc::clone(&self.stop),
        };
        let name = self.id.to_string();
        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker(ctx))
            .map_err(|e| anyhow::anyhow!("spawn worker for {name}: {e}"))?;
        *self.worker.lock() = Some(handle);
        Ok(())
    }

    /// Move data across the stage boundary. Called only by the selector.
    ///
    /// (a) When inputs are bound, gather each one's latest output and push
    ///     the bundle onto the input queue (dropped when full on a dropping
    ///     queue — latest-only consumers prefer fresh over complete).
    /// (b) Drain the output queue into `output_latest`. Video and votes are
    ///     latest-wins snapshots; audio concatenates across the drain so no
    ///     PCM is lost between ticks. An empty queue reads as None.
    pub fn tick(&self) {
        let upstream = self.inputs.lock().clone();
        if !upstream.is_empty() {
            let gathered: StageInput = upstream
                .iter()
                .map(|s| (s.id.clone(), s.read().map(|d| d.payload)))
                .collect();
            if self.input_q.drops_when_full() {
                let _ = self.input_q.try_push(gathered);
            } else {
                let _ = self.input_q.push(gathered);
            }
        }

        let mut latest: Option<PipelineData> = None;
        while let Some(item) = self.output_q.try_pop() {
            latest = Some(match latest.take() {
                Some(prev) => merge_drained(prev, item),
                None => item,
            });
        }
        *self.output_latest.lock() = latest;
    }

    /// The latest output snapshot taken by the last tick.
    pub fn read(&self) -> Option<PipelineData> {
        self.output_latest.lock().clone()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Worker no longer running: it returned on its own (EOF sources,
    /// failed device opens) or was joined by close().
    pub fn is_finished(&self) -> bool {
        if !self.is_started() {
            return false;
        }
        self.worker
            .lock()
            .as_ref()
            .map(|h| h.is_finished())
            .unwrap_or(true)
    }

    /// Direct handle on the input queue so tests can feed a worker without
    /// standing up a full upstream pipeline.
    #[cfg(test)]
    pub(crate) fn input_queue_for_tests(&self) -> Queue<StageInput> {
        self.input_q.clone()
    }

    /// Signal the worker to stop, close both queues, and join.
    pub fn close(&self) {
        self.stop.store(true, Ordering::Relaxed);
        self.input_q.close();
        self.output_q.close();
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                eprintln!("[stage] {} worker panicked", self.id);
            }
        }
    }
}

/// Combine two items drained in the same tick. Consecutive audio frames
/// from one source concatenate; anything else is replaced by the newer item.
fn merge_drained(prev: PipelineData, next: PipelineData) -> PipelineData {
    use livecut_core::frame::Frame;
    match (prev, next) {
        (
            PipelineData { source, payload: Payload::Media(Frame::Audio(mut a)) },
            PipelineData { source: next_source, payload: Payload::Media(Frame::Audio(b)) },
        ) if source == next_source => {
            a.samples.extend(&b.samples);
            a.seq = b.seq;
            PipelineData {
                source,
                payload: Payload::Media(Frame::Audio(a)),
            }
        }
        (_, next) => next,
    }
}
