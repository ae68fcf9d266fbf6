use crate::storage::engine::StorageEngine;
use crate::storage::error::{ShardErrors, ShardFailure, StorageError};
use futures::future::BoxFuture;
use sqlx::migrate::Migrator;
use sqlx::SqliteConnection;
use std::path::Path;

/// Maps a key to its shard. CRC32 keeps the mapping identical across restarts, but
/// only for the same `shard_count`: changing the count requires moving every record
/// by hand, which this store does not do.
pub fn shard_index(key: &str, shard_count: usize) -> usize {
    crc32fast::hash(key.as_bytes()) as usize % shard_count.max(1)
}

/// Result of a read on every shard. Successful partials are kept even when other
/// shards fail.
#[derive(Debug)]
pub struct FanOut<T> {
    pub partials: Vec<(usize, T)>,
    pub failures: Vec<ShardFailure>,
}

impl<T> FanOut<T> {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_parts(self) -> (Vec<(usize, T)>, Option<ShardErrors>) {
        let errors = (!self.failures.is_empty()).then(|| ShardErrors(self.failures));
        (self.partials, errors)
    }
}

pub struct ShardedStore {
    shards: Vec<StorageEngine>,
}

impl ShardedStore {
    /// Opens `{base}-1.db` through `{base}-{shard_count}.db`, migrating each one.
    pub async fn open(
        base: &str,
        shard_count: usize,
        migrator: &Migrator,
        read_pool_size: u32,
    ) -> Result<Self, StorageError> {
        if let Some(parent) = Path::new(base).parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let shard_count = shard_count.max(1);
        let mut shards = Vec::with_capacity(shard_count);
        for i in 0..shard_count {
            let path = format!("{}-{}.db", base, i + 1);
            shards.push(StorageEngine::open(&path, migrator, read_pool_size).await?);
        }
        tracing::info!(shard_count, base, "sharded store opened");

        Ok(Self { shards })
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn shard_for(&self, key: &str) -> usize {
        shard_index(key, self.shards.len())
    }

    pub async fn write<T, F>(&self, key: &str, f: F) -> Result<T, StorageError>
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, StorageError>>,
    {
        self.shards[self.shard_for(key)].write(f).await
    }

    pub async fn read<T, F>(&self, key: &str, f: F) -> Result<T, StorageError>
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, StorageError>>,
    {
        self.shards[self.shard_for(key)].read(f).await
    }

    /// Runs `f` against every shard concurrently and waits for all of them. A slow
    /// shard holds up the whole call.
    pub async fn read_all<T, F>(&self, f: F) -> FanOut<T>
    where
        F: for<'c> Fn(usize, &'c mut SqliteConnection) -> BoxFuture<'c, Result<T, StorageError>>,
    {
        let f = &f;
        let reads = self.shards.iter().enumerate().map(|(shard, engine)| async move {
            (shard, engine.read(move |conn| f(shard, conn)).await)
        });

        let mut out = FanOut {
            partials: Vec::with_capacity(self.shards.len()),
            failures: Vec::new(),
        };
        for (shard, result) in futures::future::join_all(reads).await {
            match result {
                Ok(value) => out.partials.push((shard, value)),
                Err(error) => {
                    tracing::error!(shard, "shard read failed: {}", error);
                    out.failures.push(ShardFailure { shard, error });
                }
            }
        }
        out
    }

    pub async fn close(&self) {
        for shard in &self.shards {
            shard.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_is_stable() {
        let keys = [
            "11111111-1111-1111-1111-111111111111",
            "4a7901b8-7d26-4d9d-aa19-4dc1c7cf60b3",
            "",
            "x",
        ];
        for key in keys {
            let first = shard_index(key, 16);
            for _ in 0..100 {
                assert_eq!(shard_index(key, 16), first);
            }
            assert!(first < 16);
        }
    }

    #[test]
    fn routing_uses_crc32() {
        assert_eq!(shard_index("123456789", 1 << 20), 0xCBF4_3926 % (1 << 20));
        assert_eq!(shard_index("anything", 1), 0);
        assert_eq!(shard_index("anything", 0), 0);
    }

    #[test]
    fn keys_spread_over_shards() {
        let mut hits = [0usize; 8];
        for _ in 0..4000 {
            hits[shard_index(&uuid::Uuid::new_v4().to_string(), 8)] += 1;
        }
        assert!(hits.iter().all(|&h| h > 250), "skewed distribution: {:?}", hits);
    }
}
