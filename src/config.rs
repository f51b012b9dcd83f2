use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::{
    fibonacci::MAX_SUPPORTED_INDEX,
    job::InvalidJobPolicy,
    logging,
    worker::WorkerOptions,
};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[clap(
    name = "fib-worker",
    version,
    about = "Fibonacci compute worker",
    long_about = r#"Subscribes to a Redis channel for Fibonacci indexes and stores each computed value in a Redis hash"#
)]
pub struct Config {
    #[clap(
        long,
        env = "LOG_FORMAT",
        help = "Log format (plain, json)",
        default_value = "plain"
    )]
    pub log_format: logging::Format,

    #[clap(
        long,
        env = "REDIS_HOST",
        help = "Host of the Redis server (e.g., redis)",
        default_value = "127.0.0.1"
    )]
    pub redis_host: String,

    #[clap(
        long,
        env = "REDIS_PORT",
        help = "Port of the Redis server",
        default_value = "6379"
    )]
    pub redis_port: u16,

    #[clap(
        long,
        env = "CHANNEL",
        help = "Pub/sub channel carrying job messages",
        default_value = "insert"
    )]
    pub channel: String,

    #[clap(
        long,
        env = "HASH",
        help = "Hash that computed values are written to",
        default_value = "values"
    )]
    pub hash: String,

    #[clap(
        long,
        env = "MAX_INDEX",
        help = "Largest index the worker will compute (at most 92)",
        default_value = "92",
        value_parser = clap::value_parser!(u64).range(..=MAX_SUPPORTED_INDEX)
    )]
    pub max_index: u64,

    #[clap(
        long,
        env = "INVALID_JOB",
        help = "What to do with messages that are not a valid index (zero, skip)",
        default_value = "zero"
    )]
    pub invalid_job: InvalidJobPolicy,

    #[clap(
        long,
        env = "SKIP_CACHED",
        help = "Skip computing indexes whose result is already stored",
        default_value = "false"
    )]
    pub skip_cached: bool,

    #[clap(
        long,
        env = "RETRY_DELAY_MS",
        help = "Fixed delay between Redis reconnect attempts, in milliseconds",
        default_value = "1000"
    )]
    pub retry_delay_ms: u64,
}

impl Config {
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/", self.redis_host, self.redis_port)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn worker_options(&self) -> WorkerOptions {
        WorkerOptions {
            hash: self.hash.clone(),
            max_index: self.max_index,
            invalid_job: self.invalid_job,
            skip_cached: self.skip_cached,
            retry_delay: self.retry_delay(),
        }
    }
}
