//! Strictly sequential job queue.
//!
//! Jobs run in the order they were enqueued and never overlap: job N+1 is
//! started only after job N's future has resolved. A job that fails or
//! panics is logged and skipped; the queue moves on to the next job. Only
//! successful jobs add their weight to the progress counter.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use montage_common::error::MontageResult;
use tokio::sync::Notify;

/// Boxed future produced by a job's task.
pub type JobFuture = Pin<Box<dyn Future<Output = MontageResult<()>> + Send + 'static>>;

/// Receives the accumulated progress after every successful job.
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// A unit of queued work.
pub struct Job {
    task: Box<dyn FnOnce() -> JobFuture + Send>,
    weight: f64,
    label: String,
}

impl Job {
    /// Create a job from an async task. `weight` is added to the queue's
    /// progress when the task succeeds.
    pub fn new<F, Fut>(weight: f64, task: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = MontageResult<()>> + Send + 'static,
    {
        Self {
            task: Box::new(move || Box::pin(task()) as JobFuture),
            weight,
            label: String::from("job"),
        }
    }

    /// Attach a label used in log output.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("label", &self.label)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

/// Counters describing the queue's history.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QueueStats {
    pub progress: f64,
    pub completed: u64,
    pub failed: u64,
    pub pending: usize,
    pub is_processing: bool,
}

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<Job>,
    is_processing: bool,
    progress: f64,
    completed: u64,
    failed: u64,
}

struct Inner {
    state: Mutex<QueueState>,
    idle: Notify,
    on_progress: Option<ProgressCallback>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // Tasks and callbacks never run under this lock, so a poisoned
        // guard still holds consistent counters.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// FIFO job runner with a single worker.
#[derive(Clone)]
pub struct ProcessingQueue {
    inner: Arc<Inner>,
}

impl Default for ProcessingQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingQueue {
    /// Create a queue without a progress listener.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a queue that reports accumulated progress to `on_progress`.
    pub fn with_progress(on_progress: impl Fn(f64) + Send + Sync + 'static) -> Self {
        Self::build(Some(Arc::new(on_progress)))
    }

    fn build(on_progress: Option<ProgressCallback>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState::default()),
                idle: Notify::new(),
                on_progress,
            }),
        }
    }

    /// Append a job. Starts the worker if nothing is running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn enqueue(&self, job: Job) {
        let start_worker = {
            let mut state = self.inner.lock();
            tracing::debug!(label = %job.label, weight = job.weight, pending = state.jobs.len(), "Job enqueued");
            state.jobs.push_back(job);
            if state.is_processing {
                false
            } else {
                state.is_processing = true;
                true
            }
        };

        if start_worker {
            tokio::spawn(drain(self.inner.clone()));
        }
    }

    /// Accumulated weight of successful jobs.
    pub fn progress(&self) -> f64 {
        self.inner.lock().progress
    }

    /// Jobs waiting to start (excludes the running one).
    pub fn pending(&self) -> usize {
        self.inner.lock().jobs.len()
    }

    pub fn is_processing(&self) -> bool {
        self.inner.lock().is_processing
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.inner.lock();
        QueueStats {
            progress: state.progress,
            completed: state.completed,
            failed: state.failed,
            pending: state.jobs.len(),
            is_processing: state.is_processing,
        }
    }

    /// Wait until every queued job has run.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let state = self.inner.lock();
                if !state.is_processing && state.jobs.is_empty() {
                    return;
                }
            }

            notified.await;
        }
    }
}

async fn drain(inner: Arc<Inner>) {
    loop {
        let job = {
            let mut state = inner.lock();
            match state.jobs.pop_front() {
                Some(job) => job,
                None => {
                    state.is_processing = false;
                    drop(state);
                    inner.idle.notify_waiters();
                    return;
                }
            }
        };

        let Job {
            task,
            weight,
            label,
        } = job;

        // The task runs on its own Tokio task so a panic is contained and
        // reported as a join error instead of killing the worker.
        match tokio::spawn(task()).await {
            Ok(Ok(())) => {
                let progress = {
                    let mut state = inner.lock();
                    state.progress += weight;
                    state.completed += 1;
                    state.progress
                };
                tracing::debug!(label = %label, progress, "Job finished");
                if let Some(cb) = &inner.on_progress {
                    cb(progress);
                }
            }
            Ok(Err(err)) => {
                inner.lock().failed += 1;
                tracing::warn!(label = %label, error = %err, "Processing error");
            }
            Err(join_err) => {
                inner.lock().failed += 1;
                tracing::error!(label = %label, error = %join_err, "Job panicked");
            }
        }
    }
}
