//! # Redis
//!
//! Backing store for every user's vote log.
//!
//! ## Implementation
//!
//! - One Redis list per user: `user:<id>:votes`
//! - Each element is an encoded vote as a decimal string
//! - `RPUSH` appends, `LRANGE key start -1` reads the tail, `LLEN` for length
//! - Single-entry `RPUSH` is atomic, so concurrent writers for one user never
//!   interleave partially or lose entries. No locking on our side
//! - `votes:layout` holds the encoding tag, set once with `SET NX`
use std::time::Duration;

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client, RedisError,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tracing::{debug, info};

use crate::{
    codec::Entry,
    store::{LAYOUT_KEY, StoreError, VoteLog, user_key},
};

impl From<RedisError> for StoreError {
    fn from(err: RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, StoreError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url)?;
    let mut connection_manager = client.get_connection_manager_with_config(config).await?;

    let pong: String = redis::cmd("PING")
        .query_async(&mut connection_manager)
        .await?;
    info!("Redis at {redis_url} answered {pong}");

    Ok(connection_manager)
}

#[derive(Clone)]
pub struct RedisLog {
    connection: ConnectionManager,
}

impl RedisLog {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl VoteLog for RedisLog {
    async fn append(&self, user: &str, entry: Entry) -> Result<u64, StoreError> {
        let mut connection = self.connection.clone();

        let len: u64 = connection.rpush(user_key(user), entry.to_string()).await?;
        Ok(len)
    }

    async fn read_from(&self, user: &str, start: u64) -> Result<Vec<Entry>, StoreError> {
        let mut connection = self.connection.clone();
        let key = user_key(user);

        let start = isize::try_from(start).unwrap_or(isize::MAX);
        let values: Vec<String> = connection.lrange(&key, start, -1).await?;

        values
            .iter()
            .map(|value| {
                value.parse().map_err(|source| StoreError::CorruptEntry {
                    key: key.clone(),
                    source,
                })
            })
            .collect()
    }

    async fn len(&self, user: &str) -> Result<u64, StoreError> {
        let mut connection = self.connection.clone();

        let len: u64 = connection.llen(user_key(user)).await?;
        Ok(len)
    }

    async fn claim_layout(&self, layout: &str) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();

        let claimed: bool = connection.set_nx(LAYOUT_KEY, layout).await?;
        if claimed {
            info!("Recorded layout {layout} under {LAYOUT_KEY}");
            return Ok(());
        }

        let found: String = connection.get(LAYOUT_KEY).await?;
        if found != layout {
            return Err(StoreError::LayoutMismatch {
                expected: layout.to_string(),
                found,
            });
        }

        debug!(layout, "Layout already recorded");
        Ok(())
    }
}
