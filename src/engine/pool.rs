//! Fan-out/fan-in worker pool
//!
//! One producer thread hands items to N worker threads over a zero-capacity
//! channel, so the producer blocks until a worker is ready to take the next
//! item. Workers push results onto an unbounded completion channel that the
//! aggregator (the calling thread) drains into a single mapping.
//!
//! ```text
//!  producer ──bounded(0)──┬─► worker 0 ──┐
//!                         ├─► worker 1 ──┼──unbounded──► aggregator ──► result_sink
//!                         └─► worker N ──┘                   │
//!                                                         observer
//! ```
//!
//! All threads are scoped to [`run`], so the producer, workers and callbacks
//! may borrow from the caller's stack.

use super::types::{EngineStats, Outcome, ResultMapping, ResultRecord};
use crate::error::{EngineError, Fatal, HandoffClosed};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::thread;
use std::time::Instant;
use tracing::{debug, error, trace};

/// Everything one engine run needs
pub struct EngineConfig<P, W, O, S> {
    /// Emits work items; runs on its own thread
    pub producer: P,

    /// Number of parallel workers (at least 1)
    pub worker_count: usize,

    /// Turns one item into one record, or a fatal condition
    pub worker: W,

    /// Called once per stored or counted record, on the aggregator
    pub observer: O,

    /// Receives the mapping once every item has been aggregated
    pub result_sink: S,
}

/// Producer-side handle for handing items to the workers
pub struct Emitter<I> {
    sender: Sender<I>,
}

impl<I> Emitter<I> {
    /// Hand one item to a worker, blocking until one takes it
    pub fn emit(&self, item: I) -> Result<(), HandoffClosed> {
        self.sender.send(item).map_err(|_| HandoffClosed)
    }
}

type Completion<V> = Result<ResultRecord<V>, Fatal>;

#[derive(Debug, Default)]
struct Tally {
    received: u64,
    stored: u64,
    counted: u64,
    ignored: u64,
}

/// Run the engine to completion.
///
/// On success the result sink has been called exactly once and the run's
/// counters are returned. On any error the sink is never called.
pub fn run<I, V, E, P, W, O, S>(config: EngineConfig<P, W, O, S>) -> Result<EngineStats, EngineError>
where
    I: Send,
    V: Send,
    E: std::error::Error + Send + Sync + 'static,
    P: FnOnce(&Emitter<I>) -> Result<(), E> + Send,
    W: Fn(I) -> Completion<V> + Sync,
    O: FnMut(&str, &V),
    S: FnOnce(ResultMapping<V>),
{
    let EngineConfig {
        producer,
        worker_count,
        worker,
        mut observer,
        result_sink,
    } = config;

    if worker_count == 0 {
        return Err(EngineError::NoWorkers);
    }

    let start = Instant::now();
    let (work_tx, work_rx) = bounded::<I>(0);
    let (result_tx, result_rx) = unbounded::<Completion<V>>();
    let worker = &worker;

    let (aggregated, processed, panicked, produced, spawn_error) = thread::scope(|scope| {
        let mut spawn_error = None;

        let producer_handle = thread::Builder::new()
            .name("engine-producer".into())
            .spawn_scoped(scope, move || {
                let emitter = Emitter { sender: work_tx };
                producer(&emitter)
            });
        if let Err(e) = &producer_handle {
            spawn_error = Some(EngineError::Spawn {
                role: "producer".into(),
                reason: e.to_string(),
            });
        }

        let mut workers = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("engine-worker-{id}"))
                .spawn_scoped(scope, move || worker_loop(id, work_rx, result_tx, worker));
            match spawned {
                Ok(handle) => workers.push((id, handle)),
                Err(e) => {
                    spawn_error.get_or_insert(EngineError::Spawn {
                        role: format!("worker {id}"),
                        reason: e.to_string(),
                    });
                    break;
                }
            }
        }

        // Only the spawned threads may hold channel ends from here on, so the
        // aggregator sees disconnection exactly when the last worker exits.
        drop(work_rx);
        drop(result_tx);

        let aggregated = aggregate(result_rx, &mut observer);

        let mut processed = 0u64;
        let mut panicked = None;
        for (id, handle) in workers {
            match handle.join() {
                Ok(count) => processed += count,
                Err(_) => {
                    error!(worker = id, "Worker thread panicked");
                    panicked.get_or_insert(EngineError::WorkerPanicked { id });
                }
            }
        }

        let produced = match producer_handle {
            Ok(handle) => handle.join().map_err(|_| EngineError::ProducerPanicked),
            Err(_) => Ok(Ok(())),
        };

        (aggregated, processed, panicked, produced, spawn_error)
    });

    let (mapping, tally) = aggregated?;

    if let Some(err) = panicked {
        return Err(err);
    }

    match produced {
        Err(err) => return Err(err),
        Ok(Err(err)) => return Err(EngineError::Producer(Box::new(err))),
        Ok(Ok(())) => {}
    }

    if let Some(err) = spawn_error {
        return Err(err);
    }

    if tally.received != processed {
        return Err(Fatal::Invariant(format!(
            "workers processed {processed} items but {} results were aggregated",
            tally.received
        ))
        .into());
    }

    let stats = EngineStats {
        stored: tally.stored,
        counted: tally.counted,
        ignored: tally.ignored,
        duration: start.elapsed(),
    };

    debug!(
        workers = worker_count,
        stored = stats.stored,
        counted = stats.counted,
        ignored = stats.ignored,
        "Engine run complete"
    );

    result_sink(mapping);
    Ok(stats)
}

/// Pull items until the producer is done or results can no longer be delivered
fn worker_loop<I, V, W>(
    id: usize,
    work_rx: Receiver<I>,
    result_tx: Sender<Completion<V>>,
    worker: &W,
) -> u64
where
    W: Fn(I) -> Completion<V>,
{
    let mut processed = 0u64;

    for item in work_rx.iter() {
        let record = worker(item);
        processed += 1;

        if result_tx.send(record).is_err() {
            trace!(worker = id, "Completion channel closed, stopping");
            break;
        }
    }

    trace!(worker = id, processed, "Worker finished");
    processed
}

/// Drain completions into the mapping; the only place the mapping is mutated
fn aggregate<V, O>(results: Receiver<Completion<V>>, observer: &mut O) -> Result<(ResultMapping<V>, Tally), Fatal>
where
    O: FnMut(&str, &V),
{
    let mut mapping = ResultMapping::new();
    let mut tally = Tally::default();

    for completion in results.iter() {
        let ResultRecord {
            key,
            value,
            outcome,
        } = completion?;
        tally.received += 1;

        match outcome {
            Outcome::Store => {
                observer(&key, &value);
                tally.stored += 1;
                mapping.insert(key, value);
            }
            Outcome::CountOnly => {
                observer(&key, &value);
                tally.counted += 1;
            }
            Outcome::Ignore => tally.ignored += 1,
        }
    }

    Ok((mapping, tally))
}
