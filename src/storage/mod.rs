pub mod engine;
pub mod error;
pub mod sharded;

pub use engine::StorageEngine;
pub use error::{ShardErrors, ShardFailure, StorageError};
pub use sharded::{shard_index, FanOut, ShardedStore};

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
