//! SQLite-backed document store used by the embedded collection channel.
//!
//! All access goes through one worker thread that owns the connection; async
//! callers hand it closures through [`Database::execute`]. Each mutation runs in
//! a transaction that also bumps the collection version, so the snapshot read at
//! the end of the same task is tagged with a version that matches its contents.

use std::{
    path::PathBuf,
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

mod helpers;
mod migrations;
pub mod repositories;

use migrations::run_migrations;
use repositories::DocumentRepository;

use crate::{
    channel::Snapshot,
    models::{MeasurementPatch, NewMeasurement},
};

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("famsync-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => task(&mut conn),
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Document store opened at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
        })
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    pub async fn load_collection(&self, collection: &str) -> Result<Snapshot> {
        let collection = collection.to_string();
        self.execute(move |conn| DocumentRepository::new(conn).snapshot(&collection))
            .await
    }

    /// Inserts a document and returns its new id with the post-insert snapshot.
    pub async fn insert_document(
        &self,
        collection: &str,
        document: NewMeasurement,
    ) -> Result<(String, Snapshot)> {
        let collection = collection.to_string();
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open insert transaction")?;
            let (id, snapshot) = {
                let repo = DocumentRepository::new(&tx);
                let id = repo.insert(&collection, &document)?;
                repo.bump_version(&collection)?;
                (id, repo.snapshot(&collection)?)
            };
            tx.commit().context("failed to commit insert")?;
            Ok((id, snapshot))
        })
        .await
    }

    /// Returns `None` when no document with `id` exists in the collection.
    pub async fn update_document(
        &self,
        collection: &str,
        id: &str,
        patch: MeasurementPatch,
    ) -> Result<Option<Snapshot>> {
        let collection = collection.to_string();
        let id = id.to_string();
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open update transaction")?;
            let snapshot = {
                let repo = DocumentRepository::new(&tx);
                if !repo.update(&collection, &id, &patch)? {
                    return Ok(None);
                }
                repo.bump_version(&collection)?;
                repo.snapshot(&collection)?
            };
            tx.commit().context("failed to commit update")?;
            Ok(Some(snapshot))
        })
        .await
    }

    /// Deleting an id that is already gone still yields a fresh snapshot.
    pub async fn delete_document(&self, collection: &str, id: &str) -> Result<Snapshot> {
        let collection = collection.to_string();
        let id = id.to_string();
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open delete transaction")?;
            let snapshot = {
                let repo = DocumentRepository::new(&tx);
                repo.delete(&collection, &id)?;
                repo.bump_version(&collection)?;
                repo.snapshot(&collection)?
            };
            tx.commit().context("failed to commit delete")?;
            Ok(snapshot)
        })
        .await
    }
}
