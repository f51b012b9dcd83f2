use anyhow::{Context, Result};
use clap::Parser;
use fib_worker::{
    channel::RedisSource,
    config::Config,
    logging,
    retry::new_backoff,
    stopper,
    store::RedisStore,
    worker::{self, Worker},
};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    logging::setup(config.log_format);
    info!("Starting fib-worker against {}", config.redis_url());

    let cancel_token = CancellationToken::new();
    let stopper_handle = stopper::run(cancel_token.clone());

    let client = redis::Client::open(config.redis_url()).context("Invalid Redis address")?;
    let store = match RedisStore::connect(
        client.clone(),
        new_backoff(config.retry_delay()),
        cancel_token.clone(),
    )
    .await
    {
        Ok(store) => store,
        Err(_) if cancel_token.is_cancelled() => {
            let _ = stopper_handle.await;
            info!("Goodbye.");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let source = RedisSource::new(client, config.channel.clone());
    info!("Listening for jobs on {}", source.channel());
    let worker = Worker::new(source, store, config.worker_options());
    let result = worker::run(worker, cancel_token.clone()).await;

    cancel_token.cancel();
    let _ = stopper_handle.await;
    info!("Goodbye.");
    result?
}
