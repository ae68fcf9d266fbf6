use crate::storage::error::StorageError;
use futures::future::BoxFuture;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Connection, SqliteConnection};
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;

/// One SQLite database with a single writer and a pool of readers.
///
/// Writes go through a pool capped at one connection and are additionally
/// serialized by `write_lock`, so at most one write transaction is open at any
/// instant. Reads use a separate pool and never wait on the lock; WAL mode lets
/// them proceed while a write is in flight.
pub struct StorageEngine {
    name: String,
    writer: SqlitePool,
    reader: SqlitePool,
    write_lock: Mutex<()>,
}

impl StorageEngine {
    pub async fn open(
        path: impl AsRef<Path>,
        migrator: &Migrator,
        read_pool_size: u32,
    ) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let mut bootstrap = SqliteConnection::connect_with(&options).await?;
        migrator.run(&mut bootstrap).await?;
        bootstrap.close().await?;

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await?;
        let reader = SqlitePoolOptions::new()
            .max_connections(read_pool_size.max(1))
            .connect_with(options)
            .await?;

        Ok(Self {
            name: path.display().to_string(),
            writer,
            reader,
            write_lock: Mutex::new(()),
        })
    }

    pub async fn write<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, StorageError>>,
    {
        let _guard = self.write_lock.lock().await;
        self.transaction(&self.writer, f).await
    }

    pub async fn read<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, StorageError>>,
    {
        self.transaction(&self.reader, f).await
    }

    async fn transaction<T, F>(&self, pool: &SqlitePool, f: F) -> Result<T, StorageError>
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, StorageError>>,
    {
        let mut tx = pool.begin().await?;
        match f(&mut *tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => match tx.rollback().await {
                Ok(()) => Err(err),
                Err(rollback) => {
                    tracing::error!(db = %self.name, "rollback failed after {}: {}", err, rollback);
                    Err(StorageError::Rollback {
                        source: Box::new(err),
                        rollback,
                    })
                }
            },
        }
    }

    pub async fn close(&self) {
        self.writer.close().await;
        self.reader.close().await;
    }
}
