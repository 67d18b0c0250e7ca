use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};
use rusqlite::Connection;
use tokio::sync::oneshot;

use super::migrations::run_migrations;

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum Message {
    Run(Job),
    Close,
}

/// The thread that owns the SQLite connection. Dropping the last
/// [`Database`] clone closes the queue and joins it.
struct Worker {
    queue: mpsc::Sender<Message>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    fn spawn(path: PathBuf) -> Result<Self> {
        let (queue, inbox) = mpsc::channel::<Message>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<()>>(1);

        let thread = thread::Builder::new()
            .name("sleepmate-db".into())
            .spawn(move || {
                let mut conn = match open_connection(&path) {
                    Ok(conn) => {
                        let _ = ready_tx.send(Ok(()));
                        conn
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };

                for message in inbox {
                    match message {
                        Message::Run(job) => job(&mut conn),
                        Message::Close => break,
                    }
                }
                info!("Database worker for {} stopped", path.display());
            })
            .context("failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .map_err(|_| anyhow!("database worker exited during startup"))??;

        Ok(Self {
            queue,
            thread: Mutex::new(Some(thread)),
        })
    }

    fn submit(&self, job: Job) -> Result<()> {
        self.queue
            .send(Message::Run(job))
            .map_err(|_| anyhow!("database worker is no longer running"))
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        let handle = self
            .thread
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(handle) = handle else {
            return;
        };
        if self.queue.send(Message::Close).is_err() {
            warn!("Database worker already gone at shutdown");
        }
        if handle.join().is_err() {
            error!("Database worker panicked");
        }
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open SQLite database {}", path.display()))?;
    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        warn!("WAL journal unavailable, using the default: {err}");
    }
    run_migrations(&mut conn).context("failed to run database migrations")?;
    Ok(conn)
}

/// Record store for assets and session history.
///
/// The SQLite connection lives on its own thread; callers hand it closures
/// and either await the reply ([`Database::execute`]) or fire and forget
/// ([`Database::enqueue`]).
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
}

impl Database {
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create database directory {}", dir.display()))?;
        }

        info!("Opening database at {}", path.display());
        let worker = Worker::spawn(path)?;

        Ok(Self {
            worker: Arc::new(worker),
        })
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.worker.submit(Box::new(move |conn| {
            // The caller may have given up waiting; the work is done either way.
            let _ = reply_tx.send(task(conn));
        }))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database worker dropped the request"))?
    }

    /// Queue a write without waiting for it. Failures are logged on the
    /// worker thread under `what`.
    pub fn enqueue<F>(&self, what: &'static str, task: F)
    where
        F: FnOnce(&mut Connection) -> Result<()> + Send + 'static,
    {
        let job: Job = Box::new(move |conn| {
            if let Err(err) = task(conn) {
                error!("Queued DB write '{what}' failed: {err:#}");
            }
        });
        if let Err(err) = self.worker.submit(job) {
            error!("Failed to queue DB write '{what}': {err}");
        }
    }
}
