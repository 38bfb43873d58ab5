//! The analysis worker pool.
//!
//! Each worker pulls frames from the shared work channel, accumulates them
//! into batches, and runs text recognition on every batched frame before
//! emitting the results individually. Batching amortizes per-batch
//! bookkeeping only — recognition itself is invoked once per frame.
//!
//! The per-worker lifecycle is an explicit state machine:
//! accumulating → flushing → done. A sentinel (or a closed channel) moves
//! the worker to flushing, where the partial batch is drained and exactly
//! one sentinel is forwarded downstream. Recognition failures degrade the
//! frame to empty text; they never kill the worker.

use std::sync::Arc;

use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};

use crate::recognize::{TextRecognizer, TextRegion};

use super::{AnalyzedFrame, FrameSample, ResultItem, TextPayload, WorkItem};

/// Settings shared by all workers in the pool.
#[derive(Debug, Clone)]
pub(crate) struct WorkerOptions {
    /// Number of frames accumulated before a flush.
    pub batch_size: usize,
    /// Frame region handed to recognition.
    pub region: TextRegion,
    /// Recognition language code.
    pub language: String,
}

/// Lifecycle of a single worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerPhase {
    Accumulating,
    Flushing,
    Done,
}

/// Spawn `count` analysis workers sharing one work receiver.
pub(crate) fn spawn_pool(
    count: usize,
    work: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
    results: mpsc::UnboundedSender<ResultItem>,
    recognizer: Arc<dyn TextRecognizer>,
    options: WorkerOptions,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|worker_id| {
            let work = Arc::clone(&work);
            let results = results.clone();
            let recognizer = Arc::clone(&recognizer);
            let options = options.clone();
            tokio::task::spawn_blocking(move || {
                run_worker(worker_id, &work, &results, recognizer.as_ref(), &options)
            })
        })
        .collect()
}

fn run_worker(
    worker_id: usize,
    work: &Mutex<mpsc::Receiver<WorkItem>>,
    results: &mpsc::UnboundedSender<ResultItem>,
    recognizer: &dyn TextRecognizer,
    options: &WorkerOptions,
) {
    // Heavy backends load here, once, before the consume loop. A failed
    // prepare is logged and the worker keeps running: recognition calls
    // will degrade to empty text, and the sentinel protocol stays intact.
    if let Err(error) = recognizer.prepare() {
        log::error!("Worker {worker_id}: recognizer failed to prepare: {error}");
    }

    let mut batch: Vec<FrameSample> = Vec::with_capacity(options.batch_size);
    let mut phase = WorkerPhase::Accumulating;

    loop {
        match phase {
            WorkerPhase::Accumulating => {
                // The lock guards only the receive; processing happens
                // with the channel released.
                let item = work.blocking_lock().blocking_recv();
                match item {
                    Some(WorkItem::Frame(sample)) => {
                        batch.push(sample);
                        if batch.len() >= options.batch_size {
                            flush_batch(worker_id, &mut batch, results, recognizer, options);
                        }
                    }
                    Some(WorkItem::Done) => phase = WorkerPhase::Flushing,
                    // A closed channel means the source is gone; treat it
                    // like a sentinel so shutdown still completes.
                    None => phase = WorkerPhase::Flushing,
                }
            }
            WorkerPhase::Flushing => {
                flush_batch(worker_id, &mut batch, results, recognizer, options);
                let _ = results.send(ResultItem::Done);
                phase = WorkerPhase::Done;
            }
            WorkerPhase::Done => break,
        }
    }

    log::debug!("Worker {worker_id} finished");
}

/// Recognize every frame in the batch and emit each result individually.
fn flush_batch(
    worker_id: usize,
    batch: &mut Vec<FrameSample>,
    results: &mpsc::UnboundedSender<ResultItem>,
    recognizer: &dyn TextRecognizer,
    options: &WorkerOptions,
) {
    for sample in batch.drain(..) {
        let text = match recognizer.recognize(&sample.image, options.region, &options.language) {
            Ok(text) => text,
            Err(error) => {
                log::error!(
                    "Worker {worker_id}: recognition failed on frame {}: {error}",
                    sample.frame_index,
                );
                String::new()
            }
        };

        let analyzed = AnalyzedFrame {
            frame_index: sample.frame_index,
            image: sample.image,
            payload: TextPayload::Plain(text),
        };
        if results.send(ResultItem::Frame(analyzed)).is_err() {
            // The aggregator is gone; nothing left to do but drain.
            log::debug!("Worker {worker_id}: results channel closed");
            return;
        }
    }
}
