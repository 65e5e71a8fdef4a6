//! Batch worker protocol
//!
//! A host submits `{ id, sample_data, sample_rate, duration }` requests and
//! receives one response per request: the full analysis result, or a failure
//! if the buffer violated the input contract or the analysis panicked.
//!
//! Requests travel over a BOUNDED channel so a fast producer (the decoder)
//! blocks instead of queueing whole tracks in memory. Responses travel over an
//! UNBOUNDED channel so a worker never blocks on send while the host is
//! waiting on `join()`.

use super::engine::Engine;
use crate::error::{AnalyzeError, Result};
use crate::types::{AnalysisResult, SampleBuffer};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, trace};

/// Queued requests per worker before `submit` blocks
const QUEUE_DEPTH_PER_WORKER: usize = 2;

/// One track to analyze
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Caller-chosen correlation id, echoed in the response
    pub id: u64,
    /// Mono samples in [-1, 1]
    pub sample_data: Vec<f32>,
    pub sample_rate: u32,
    /// Seconds; may be more precise than `len / sample_rate`
    pub duration: f64,
}

/// Outcome of one request
#[derive(Debug)]
pub enum AnalysisResponse {
    Completed { id: u64, result: AnalysisResult },
    Failed { id: u64, error: AnalyzeError },
}

impl AnalysisResponse {
    pub fn id(&self) -> u64 {
        match self {
            AnalysisResponse::Completed { id, .. } | AnalysisResponse::Failed { id, .. } => *id,
        }
    }

    pub fn into_result(self) -> Result<AnalysisResult> {
        match self {
            AnalysisResponse::Completed { result, .. } => Ok(result),
            AnalysisResponse::Failed { error, .. } => Err(error),
        }
    }
}

/// Fixed set of OS threads running `Engine::analyze` on submitted requests
pub struct WorkerPool {
    request_tx: Option<Sender<AnalysisRequest>>,
    response_rx: Receiver<AnalysisResponse>,
    cancelled: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `num_workers` threads (at least one) sharing `engine`
    pub fn spawn(num_workers: usize, engine: Arc<Engine>) -> Result<Self> {
        let num_workers = num_workers.max(1);
        let (request_tx, request_rx) = bounded::<AnalysisRequest>(num_workers * QUEUE_DEPTH_PER_WORKER);
        let (response_tx, response_rx) = unbounded::<AnalysisResponse>();
        let cancelled = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(num_workers);
        for index in 0..num_workers {
            let rx = request_rx.clone();
            let tx = response_tx.clone();
            let engine = Arc::clone(&engine);
            let cancelled = Arc::clone(&cancelled);
            let handle = thread::Builder::new()
                .name(format!("djcue-worker-{}", index))
                .spawn(move || worker_loop(rx, tx, engine, cancelled))?;
            handles.push(handle);
        }
        debug!("Started {} analysis workers", num_workers);

        Ok(Self {
            request_tx: Some(request_tx),
            response_rx,
            cancelled,
            handles,
        })
    }

    /// Queue a request, blocking while the queue is full
    pub fn submit(&self, request: AnalysisRequest) -> Result<()> {
        let tx = self.request_tx.as_ref().ok_or(AnalyzeError::WorkerDisconnected)?;
        tx.send(request).map_err(|_| AnalyzeError::WorkerDisconnected)
    }

    /// Clonable handle for submitting from another thread
    ///
    /// The request queue only closes once every sender, including these, is dropped.
    pub fn sender(&self) -> Option<Sender<AnalysisRequest>> {
        self.request_tx.clone()
    }

    /// Response stream; ends once the pool has shut down and every response was taken
    pub fn responses(&self) -> &Receiver<AnalysisResponse> {
        &self.response_rx
    }

    /// Stop starting new requests; in-flight analyses still complete
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Close the request queue and wait for every worker to exit
    ///
    /// Responses already produced stay readable from the returned receiver.
    pub fn shutdown(mut self) -> Receiver<AnalysisResponse> {
        self.close_and_join();
        self.response_rx.clone()
    }

    fn close_and_join(&mut self) {
        drop(self.request_tx.take());
        for handle in self.handles.drain(..) {
            if let Err(panic_info) = handle.join() {
                error!("Analysis worker exited abnormally: {}", panic_message(panic_info.as_ref()));
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close_and_join();
    }
}

fn worker_loop(
    rx: Receiver<AnalysisRequest>,
    tx: Sender<AnalysisResponse>,
    engine: Arc<Engine>,
    cancelled: Arc<AtomicBool>,
) {
    for request in rx {
        if cancelled.load(Ordering::SeqCst) {
            trace!("Dropping request {} after cancellation", request.id);
            continue;
        }

        let response = process(&engine, request);
        if tx.send(response).is_err() {
            // Host dropped the receiver, we're shutting down
            break;
        }
    }
}

/// Run one request, turning contract violations and panics into `Failed`
pub fn process(engine: &Engine, request: AnalysisRequest) -> AnalysisResponse {
    let id = request.id;
    let buffer = match SampleBuffer::with_duration(&request.sample_data, request.sample_rate, request.duration) {
        Ok(buffer) => buffer,
        Err(error) => return AnalysisResponse::Failed { id, error },
    };

    match panic::catch_unwind(AssertUnwindSafe(|| engine.analyze(&buffer))) {
        Ok(result) => AnalysisResponse::Completed { id, result },
        Err(panic_info) => {
            let reason = panic_message(panic_info.as_ref());
            error!("Analysis of request {} panicked: {}", id, reason);
            AnalysisResponse::Failed {
                id,
                error: AnalyzeError::WorkerFailed { id, reason },
            }
        }
    }
}

fn panic_message(panic_info: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
