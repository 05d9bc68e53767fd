//! Storage worker thread.
//!
//! All database access during a scan goes through one OS thread that owns
//! the connection. Callers enqueue jobs and never wait, except on
//! [`StorageHandle::drain`] or a [`StorageHandle::query`].

use std::thread::{self, JoinHandle};

use log::{debug, error, info};
use tokio::sync::{mpsc, oneshot};

use super::{Database, DatabaseError, InsertBatch, Result};

type DatabaseFn = Box<dyn FnOnce(&mut Database) -> Result<()> + Send>;

enum Job {
    Insert { source: String, batch: InsertBatch },
    Function(DatabaseFn),
    /// Reply once every earlier job has run.
    Drain(oneshot::Sender<Result<()>>),
}

/// Sends jobs to the storage worker.
#[derive(Debug, Clone)]
pub struct StorageHandle {
    tx: mpsc::UnboundedSender<Job>,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Job::Insert { source, batch } => write!(f, "Insert({}, {})", source, batch.name()),
            Job::Function(_) => f.write_str("Function"),
            Job::Drain(_) => f.write_str("Drain"),
        }
    }
}

impl StorageHandle {
    pub fn enqueue_insert(&self, source: &str, batch: InsertBatch) -> Result<()> {
        self.send(Job::Insert {
            source: source.to_string(),
            batch,
        })
    }

    /// Run `f` on the worker. Its error is reported by the next drain.
    pub fn enqueue<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Database) -> Result<()> + Send + 'static,
    {
        self.send(Job::Function(Box::new(f)))
    }

    /// Run `f` on the worker and wait for its result.
    pub async fn query<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Database) -> Result<T> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Job::Function(Box::new(move |db| {
            let _ = reply_tx.send(f(db));
            Ok(())
        })))?;
        reply_rx.await.map_err(|_| DatabaseError::WorkerStopped)?
    }

    /// Wait until every job enqueued so far has run. Returns the first error
    /// raised since the previous drain.
    pub async fn drain(&self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Job::Drain(reply_tx))?;
        reply_rx.await.map_err(|_| DatabaseError::WorkerStopped)?
    }

    fn send(&self, job: Job) -> Result<()> {
        self.tx.send(job).map_err(|_| DatabaseError::WorkerStopped)
    }
}

/// Owns the worker thread. The thread ends once every [`StorageHandle`] is
/// dropped.
#[derive(Debug)]
pub struct StorageWorker {
    handle: StorageHandle,
    thread: JoinHandle<()>,
}

impl StorageWorker {
    pub fn spawn(db: Database) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let thread = thread::Builder::new()
            .name("siscan-storage".to_string())
            .spawn(move || run(db, rx))?;
        Ok(Self {
            handle: StorageHandle { tx },
            thread,
        })
    }

    pub fn handle(&self) -> StorageHandle {
        self.handle.clone()
    }

    /// Close this handle and wait for the thread. Blocks until handles
    /// given out earlier are dropped too.
    pub fn shutdown(self) {
        let Self { handle, thread } = self;
        drop(handle);
        if thread.join().is_err() {
            error!("Storage: worker thread panicked");
        }
    }
}

fn run(mut db: Database, mut rx: mpsc::UnboundedReceiver<Job>) {
    debug!("Storage: worker started");
    let mut first_error: Option<DatabaseError> = None;
    while let Some(job) = rx.blocking_recv() {
        let result = match job {
            Job::Insert { source, batch } => db.insert(&source, &batch).map(|rows| {
                debug!("Storage: {} rows into {} for {}", rows, batch.name(), source);
            }),
            Job::Function(f) => f(&mut db),
            Job::Drain(reply) => {
                let _ = reply.send(first_error.take().map_or(Ok(()), Err));
                continue;
            }
        };
        if let Err(e) = result {
            error!("Storage: {}", e);
            first_error.get_or_insert(e);
        }
    }
    info!("Storage: worker stopped");
}
