use anyhow::{Context, Result};
use backon::ConstantBuilder;
use redis::{
    AsyncCommands, Client, RedisError,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::retry::{always, retry};

use super::{ResultStore, StoreError};

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connects with `backoff` between attempts until a connection is made or
    /// `cancel_token` is cancelled. Later reconnects happen lazily on the next
    /// command after a failure.
    pub async fn connect(
        client: Client,
        backoff: ConstantBuilder,
        cancel_token: CancellationToken,
    ) -> Result<Self> {
        let config = ConnectionManagerConfig::new().set_number_of_retries(0);
        let conn = retry(
            || ConnectionManager::new_with_config(client.clone(), config.clone()),
            "connect to result store",
            backoff,
            cancel_token,
            always,
        )
        .await
        .context("Failed to connect to result store")?;
        info!("Connected to result store");
        Ok(Self { conn })
    }
}

fn classify(command: String, e: RedisError) -> StoreError {
    let detail = format!("{} failed: {}", command, e);
    if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
    {
        StoreError::Unavailable(detail)
    } else {
        StoreError::Command(detail)
    }
}

impl ResultStore for RedisStore {
    async fn set_result(&self, hash: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(hash, field, value)
            .await
            .map_err(|e| classify(format!("HSET {} {:?}", hash, field), e))
    }

    async fn get_result(&self, hash: &str, field: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.hget(hash, field)
            .await
            .map_err(|e| classify(format!("HGET {} {:?}", hash, field), e))
    }
}
