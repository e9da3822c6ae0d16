//! The dispatch queue and worker pool.
//!
//! A fixed pool of long-lived workers drains one unbounded FIFO queue of
//! dispatch tasks. Each task carries a recipient snapshot resolved at
//! submission time; the worker encrypts the message once and fans the
//! frame out to every recipient. Delivery is fire-and-forget end to end:
//! a task whose application has disappeared is dropped silently, and a
//! recipient whose write fails is closed and skipped without failing the
//! task.
//!
//! Ordering: the queue is FIFO, but two tasks picked up by different
//! workers may complete out of submission order. Shutdown pushes one
//! termination sentinel per worker; sentinels queue behind real tasks,
//! so everything already submitted is delivered first.

use std::sync::{Arc, Mutex};

use pushframe_core::{ApplicationDirectory, Message};
use tokio::{io::AsyncWriteExt, sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};

use crate::registry::{ConnectionRegistry, Recipient};

/// Number of concurrent dispatch workers.
///
/// Writes are bounded only by the OS socket buffer, so one slow
/// recipient can stall one worker for the duration of a task; the pool
/// size bounds that blast radius to a quarter of dispatch throughput.
pub const DISPATCH_WORKERS: usize = 4;

/// One unit of delivery work.
pub(crate) struct DispatchTask {
    app_id: String,
    recipients: Vec<Recipient>,
    message: Message,
    /// Worker shutdown sentinel; carries no message.
    terminate: bool,
}

impl DispatchTask {
    fn sentinel() -> Self {
        Self {
            app_id: String::new(),
            recipients: Vec::new(),
            message: Message::default(),
            terminate: true,
        }
    }
}

/// The queue and its worker pool.
pub(crate) struct Dispatcher {
    queue: mpsc::UnboundedSender<DispatchTask>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Spawn the worker pool.
    pub(crate) fn start(
        registry: Arc<ConnectionRegistry>,
        directory: Arc<dyn ApplicationDirectory>,
    ) -> Self {
        let (queue, rx) = mpsc::unbounded_channel();
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let workers = (0..DISPATCH_WORKERS)
            .map(|index| {
                tokio::spawn(worker(
                    index,
                    Arc::clone(&rx),
                    Arc::clone(&registry),
                    Arc::clone(&directory),
                ))
            })
            .collect();

        Self { queue, workers: Mutex::new(workers) }
    }

    /// Enqueue one task. Never blocks; the queue is unbounded.
    pub(crate) fn submit(&self, app_id: String, recipients: Vec<Recipient>, message: Message) {
        let task = DispatchTask { app_id, recipients, message, terminate: false };
        if self.queue.send(task).is_err() {
            // Workers already shut down; fire-and-forget means this is
            // not an error the submitter hears about.
            debug!("dispatch queue closed, message dropped");
        }
    }

    /// Push one sentinel per worker and wait for the pool to drain.
    ///
    /// Sentinels are ordinary queue entries, so every task submitted
    /// before this call is delivered before its worker exits.
    pub(crate) async fn shutdown(&self) {
        for _ in 0..DISPATCH_WORKERS {
            let _ = self.queue.send(DispatchTask::sentinel());
        }

        let workers = {
            let mut guard = self.workers.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };
        for worker in workers {
            let _ = worker.await;
        }
    }
}

async fn worker(
    index: usize,
    queue: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<DispatchTask>>>,
    registry: Arc<ConnectionRegistry>,
    directory: Arc<dyn ApplicationDirectory>,
) {
    loop {
        // Hold the receiver lock only for the dequeue itself, so the
        // other workers keep draining while this one delivers.
        let task = queue.lock().await.recv().await;

        let Some(task) = task else {
            break;
        };
        if task.terminate {
            debug!(worker = index, "dispatch worker stopping");
            break;
        }

        deliver(task, &registry, directory.as_ref()).await;
    }
}

async fn deliver(
    task: DispatchTask,
    registry: &ConnectionRegistry,
    directory: &dyn ApplicationDirectory,
) {
    // The application may have been deleted between submission and
    // delivery; the message is silently dropped.
    let Some(keys) = directory.key_material(&task.app_id) else {
        debug!(app_id = %task.app_id, "application gone, dropping message");
        return;
    };

    let plaintext = task.message.serialize();
    let ciphertext = pushframe_crypto::encrypt(&keys, &plaintext);
    let wire = pushframe_proto::encode_message_frame(plaintext.len(), &ciphertext);

    for recipient in task.recipients {
        let mut writer = recipient.writer.lock().await;
        if let Err(error) = writer.write_all(&wire).await {
            warn!(
                conn = %recipient.id,
                user = %recipient.user_id,
                %error,
                "write failed, closing recipient connection",
            );
            drop(writer);
            registry.remove(recipient.id);
        }
    }
}
