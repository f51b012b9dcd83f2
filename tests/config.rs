use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use fib_worker::{config::Config, job::InvalidJobPolicy, logging};

#[test]
fn test_config_from_flags() -> Result<()> {
    let config = Config::try_parse_from([
        "fib-worker",
        "--redis-host",
        "redis",
        "--redis-port",
        "6380",
        "--channel",
        "jobs",
        "--hash",
        "results",
        "--max-index",
        "40",
        "--invalid-job",
        "skip",
        "--skip-cached",
        "--retry-delay-ms",
        "250",
        "--log-format",
        "json",
    ])?;
    assert_eq!(config.redis_url(), "redis://redis:6380/");
    assert_eq!(config.channel, "jobs");
    assert_eq!(config.log_format, logging::Format::Json);

    let options = config.worker_options();
    assert_eq!(options.hash, "results");
    assert_eq!(options.max_index, 40);
    assert_eq!(options.invalid_job, InvalidJobPolicy::Skip);
    assert!(options.skip_cached);
    assert_eq!(options.retry_delay, Duration::from_millis(250));
    Ok(())
}

#[test]
fn test_config_rejects_unsupported_max_index() {
    assert!(Config::try_parse_from(["fib-worker", "--max-index", "93"]).is_err());
    assert!(Config::try_parse_from(["fib-worker", "--max-index", "-1"]).is_err());
}

#[test]
fn test_invalid_job_defaults_to_zero() {
    assert_eq!(InvalidJobPolicy::default(), InvalidJobPolicy::Zero);
    assert_eq!(
        fib_worker::worker::WorkerOptions::default().invalid_job,
        InvalidJobPolicy::Zero
    );
}

#[test]
fn test_config_rejects_unknown_policy() {
    assert!(Config::try_parse_from(["fib-worker", "--invalid-job", "crash"]).is_err());
}
