use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use tokio::sync::oneshot;

pub mod helpers;
mod migrations;
mod repositories;

use migrations::run_migrations;

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "db";

use crate::{log_debug, log_error, log_info};

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Run { label: &'static str, task: DbTask },
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    /// Queued writes ahead of the shutdown marker still run before the join.
    fn drop(&mut self) {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(handle) = handle else {
            return;
        };

        if self.sender.send(DbCommand::Shutdown).is_err() {
            log_error!("database worker already gone at shutdown");
        }
        if let Err(panic) = handle.join() {
            log_error!("database worker panicked: {panic:?}");
        }
    }
}

/// Monitoring store backed by one SQLite connection on a dedicated thread.
///
/// Session rows, sample rows and feedback rows are all queued onto the same
/// channel. A session insert queued by `start` therefore lands before any of
/// its samples, and a read issued through `execute` observes every write
/// queued before it.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("stresswatch-db".into())
            .spawn(move || match open_connection(&path_for_thread) {
                Ok(conn) => {
                    if ready_tx.send(Ok(())).is_ok() {
                        serve(conn, command_rx);
                    }
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .context("failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        log_info!("monitoring store ready at {}", db_path.display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    /// Runs a query on the worker and waits for its result.
    pub async fn execute<F, T>(&self, label: &'static str, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(
            label,
            Box::new(move |conn| {
                // A dropped receiver means the caller stopped waiting; nothing to do.
                let _ = reply_tx.send(task(conn));
            }),
        )?;

        reply_rx
            .await
            .map_err(|_| anyhow!("{label}: database worker terminated"))?
            .with_context(|| format!("{label} failed"))
    }

    /// Queues a write without waiting for it. Failures are logged by the worker.
    pub fn submit<F>(&self, label: &'static str, task: F)
    where
        F: FnOnce(&mut Connection) -> Result<()> + Send + 'static,
    {
        let queued = self.send(
            label,
            Box::new(move |conn| {
                if let Err(err) = task(conn) {
                    log_error!("{label} failed: {err:#}");
                }
            }),
        );
        if let Err(err) = queued {
            log_error!("{err:#}");
        }
    }

    fn send(&self, label: &'static str, task: DbTask) -> Result<()> {
        self.inner
            .sender
            .send(DbCommand::Run { label, task })
            .map_err(|_| anyhow!("{label}: database worker is not running"))
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open SQLite database {}", path.display()))?;

    // Samples are small and frequent; WAL keeps the tick path cheap.
    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        log_error!("failed to enable WAL mode: {err}");
    }
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign keys")?;

    run_migrations(&mut conn).context("failed to run database migrations")?;
    Ok(conn)
}

fn serve(mut conn: Connection, commands: mpsc::Receiver<DbCommand>) {
    let mut served: u64 = 0;
    while let Ok(command) = commands.recv() {
        match command {
            DbCommand::Run { label, task } => {
                log_debug!("running {label}");
                task(&mut conn);
                served += 1;
            }
            DbCommand::Shutdown => break,
        }
    }
    log_info!("database worker stopping after {served} command(s)");
}
