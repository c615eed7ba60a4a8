//! Request serializer.
//!
//! The inference engine holds one mutable generation context, so generations
//! must never overlap. A bounded FIFO queue feeds a single worker thread
//! that owns the engine exclusively; callers submit asynchronously and
//! await a per-job reply channel. A full queue rejects the submission
//! immediately instead of stalling the caller.

use tokio::sync::{mpsc, oneshot};

use crate::engine::{GenerationConfig, InferenceEngine};
use crate::error::ServiceError;

struct GenerationJob {
    prompt: String,
    cfg: GenerationConfig,
    reply: oneshot::Sender<Result<String, ServiceError>>,
}

pub struct RequestSerializer {
    queue: mpsc::Sender<GenerationJob>,
}

impl RequestSerializer {
    /// Spawn the worker thread and hand it exclusive ownership of `engine`.
    ///
    /// `capacity` bounds the number of jobs waiting for a generation slot.
    pub fn spawn(
        engine: Box<dyn InferenceEngine>,
        capacity: usize,
    ) -> Result<Self, ServiceError> {
        let (queue, rx) = mpsc::channel(capacity);

        std::thread::Builder::new()
            .name("inference-worker".into())
            .spawn(move || worker_loop(engine, rx))?;

        Ok(Self { queue })
    }

    /// Enqueue a generation and await its result.
    ///
    /// Jobs run strictly in arrival order, one at a time. Fails with
    /// `Overloaded` when the queue is full.
    pub async fn submit(
        &self,
        prompt: String,
        cfg: GenerationConfig,
    ) -> Result<String, ServiceError> {
        let (reply, rx) = oneshot::channel();
        let job = GenerationJob { prompt, cfg, reply };

        self.queue.try_send(job).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => ServiceError::Overloaded,
            mpsc::error::TrySendError::Closed(_) => {
                ServiceError::Generation("inference worker is gone".into())
            }
        })?;

        rx.await
            .map_err(|_| ServiceError::Generation("inference worker dropped the request".into()))?
    }
}

fn worker_loop(mut engine: Box<dyn InferenceEngine>, mut rx: mpsc::Receiver<GenerationJob>) {
    while let Some(job) = rx.blocking_recv() {
        // The caller hung up while the job was queued; skip the generation.
        if job.reply.is_closed() {
            tracing::debug!("dropping queued job, caller went away");
            continue;
        }

        let result = engine.generate(&job.prompt, &job.cfg);
        if let Err(err) = &result {
            tracing::warn!(%err, "generation failed");
        }

        // Undeliverable results are discarded; the worker moves on.
        let _ = job.reply.send(result);
    }
    tracing::info!("inference worker shutting down");
}
