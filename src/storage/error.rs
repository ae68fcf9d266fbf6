use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("{source} (rollback also failed: {rollback})")]
    Rollback {
        #[source]
        source: Box<StorageError>,
        rollback: sqlx::Error,
    },
    #[error("corrupt row: {0}")]
    CorruptRow(String),
    #[error(transparent)]
    Shards(#[from] ShardErrors),
}

#[derive(Debug)]
pub struct ShardFailure {
    pub shard: usize,
    pub error: StorageError,
}

/// Every shard that failed during one fan-out, joined into a single error.
#[derive(Debug)]
pub struct ShardErrors(pub Vec<ShardFailure>);

impl ShardErrors {
    pub fn shards(&self) -> Vec<usize> {
        self.0.iter().map(|f| f.shard).collect()
    }
}

impl fmt::Display for ShardErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "shard {}: {}", failure.shard, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ShardErrors {}
