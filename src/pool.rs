//! Fixed-size background worker pool with a bounded job queue.

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use log::{debug, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use thiserror::Error;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Reasons a job was not accepted.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// The queue is at capacity
    #[error("worker queue is full")]
    Full,

    /// The pool has been shut down
    #[error("worker pool is shut down")]
    Closed,
}

/// A group of worker threads draining one bounded queue.
///
/// Submission never blocks. [`WorkerPool::shutdown`] closes the queue, lets
/// the workers finish everything already queued, then joins them; it also
/// runs on drop.
pub struct WorkerPool {
    name: String,
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawns `size` workers sharing a queue of `capacity` pending jobs.
    pub fn new(name: &str, size: usize, capacity: usize) -> std::io::Result<Self> {
        let (sender, receiver) = channel::bounded::<Job>(capacity);

        let mut workers = Vec::with_capacity(size);
        for id in 0..size.max(1) {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("{}-{}", name, id))
                .spawn(move || worker_loop(receiver))?;
            workers.push(handle);
        }

        Ok(WorkerPool {
            name: name.to_string(),
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        })
    }

    /// Queues `job` for background execution.
    pub fn execute<F>(&self, job: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let guard = self.sender.lock().map_err(|_| PoolError::Closed)?;
        let sender = guard.as_ref().ok_or(PoolError::Closed)?;
        sender.try_send(Box::new(job)).map_err(|e| match e {
            TrySendError::Full(_) => PoolError::Full,
            TrySendError::Disconnected(_) => PoolError::Closed,
        })
    }

    /// Stops accepting jobs, runs what is queued, and joins the workers.
    pub fn shutdown(&self) {
        // Dropping the sender ends each worker once the queue is empty.
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }

        let workers = match self.workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(_) => return,
        };
        if workers.is_empty() {
            return;
        }

        debug!("Draining {} worker pool", self.name);
        for handle in workers {
            if handle.join().is_err() {
                warn!("Worker in {} pool exited abnormally", self.name);
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(receiver: Receiver<Job>) {
    // Ends once every sender is gone and the queue is empty.
    for job in receiver.iter() {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            warn!("Background job panicked");
        }
    }
}
