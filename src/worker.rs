use std::time::Duration;

use anyhow::Result;
use backon::ConstantBuilder;
use scopeguard::defer;
use tokio::{select, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    channel::{JobSource, Subscription},
    fibonacci::{MAX_SUPPORTED_INDEX, fibonacci},
    job::{InvalidJobPolicy, Job, JobError},
    retry::{DEFAULT_RETRY_DELAY, always, new_backoff, retry},
    store::{ResultStore, StoreError},
};

pub const DEFAULT_HASH: &str = "values";

#[derive(Debug, Clone)]
pub struct WorkerOptions {
    pub hash: String,
    pub max_index: u64,
    pub invalid_job: InvalidJobPolicy,
    pub skip_cached: bool,
    pub retry_delay: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            hash: DEFAULT_HASH.to_string(),
            max_index: MAX_SUPPORTED_INDEX,
            invalid_job: InvalidJobPolicy::Zero,
            skip_cached: false,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Stored { key: String, value: u64 },
    Cached { key: String, value: String },
    Rejected { key: String, error: JobError },
    Failed { key: String, error: StoreError },
}

pub struct Worker<S, T> {
    source: S,
    store: T,
    options: WorkerOptions,
}

impl<S: JobSource, T: ResultStore> Worker<S, T> {
    pub fn new(source: S, store: T, options: WorkerOptions) -> Self {
        Self {
            source,
            store,
            options,
        }
    }

    fn backoff(&self) -> ConstantBuilder {
        new_backoff(self.options.retry_delay)
    }

    pub async fn subscribe(&self, cancel_token: &CancellationToken) -> Result<S::Subscription> {
        retry(
            || self.source.subscribe(),
            "subscribe to job channel",
            self.backoff(),
            cancel_token.clone(),
            always,
        )
        .await
    }

    /// Computes and stores the value for one message. Store outages are
    /// retried until they clear or `cancel_token` is cancelled; a command the
    /// store rejects drops the message.
    pub async fn handle(&self, message: &str, cancel_token: &CancellationToken) -> Result<Outcome> {
        info!("Received message {:?}", message);
        let hash = self.options.hash.as_str();

        let job = match Job::parse(message, self.options.max_index) {
            Ok(job) => job,
            Err(error @ JobError::OutOfRange { .. }) => {
                warn!("Rejecting message {:?}: {}", message, error);
                return Ok(Outcome::Rejected {
                    key: message.to_string(),
                    error,
                });
            }
            Err(error) => match self.options.invalid_job {
                InvalidJobPolicy::Skip => {
                    warn!("Skipping message {:?}: {}", message, error);
                    return Ok(Outcome::Rejected {
                        key: message.to_string(),
                        error,
                    });
                }
                InvalidJobPolicy::Zero => {
                    warn!("Treating message {:?} as index 0: {}", message, error);
                    Job::degenerate(message)
                }
            },
        };

        if self.options.skip_cached {
            match retry(
                || self.store.get_result(hash, &job.key),
                "read cached result",
                self.backoff(),
                cancel_token.clone(),
                StoreError::is_transient,
            )
            .await
            {
                Ok(Some(value)) => {
                    info!("Result for {:?} already stored: {}", job.key, value);
                    return Ok(Outcome::Cached {
                        key: job.key,
                        value,
                    });
                }
                Ok(None) => {}
                Err(e) if e.is_transient() => return Err(e.into()),
                Err(e) => warn!("Cache check for {:?} failed, computing anyway: {}", job.key, e),
            }
        }

        let value = fibonacci(job.index)?;
        let encoded = value.to_string();
        match retry(
            || self.store.set_result(hash, &job.key, &encoded),
            "write result",
            self.backoff(),
            cancel_token.clone(),
            StoreError::is_transient,
        )
        .await
        {
            Ok(()) => {
                info!("Stored {} {:?} = {}", hash, job.key, value);
                Ok(Outcome::Stored {
                    key: job.key,
                    value,
                })
            }
            Err(e) if e.is_transient() => Err(e.into()),
            Err(error) => {
                error!("Dropping result for {:?}: {}", job.key, error);
                Ok(Outcome::Failed {
                    key: job.key,
                    error,
                })
            }
        }
    }
}

/// Runs the receive loop until `cancel_token` is cancelled. Messages are
/// handled one at a time in arrival order; a dropped subscription is
/// re-established with the configured constant backoff.
pub fn run<S, T>(worker: Worker<S, T>, cancel_token: CancellationToken) -> JoinHandle<Result<()>>
where
    S: JobSource + 'static,
    S::Subscription: 'static,
    T: ResultStore + 'static,
{
    tokio::spawn(async move {
        defer! {
            info!("Worker exited");
        }

        let mut subscription = match worker.subscribe(&cancel_token).await {
            Ok(subscription) => subscription,
            Err(_) if cancel_token.is_cancelled() => return Ok(()),
            Err(e) => return Err(e),
        };

        loop {
            select! {
                biased;
                _ = cancel_token.cancelled() => {
                    info!("Worker cancelled");
                    return Ok(());
                }
                option_message = subscription.next_message() => {
                    match option_message {
                        Some(message) => {
                            if let Err(e) = worker.handle(&message, &cancel_token).await {
                                if cancel_token.is_cancelled() {
                                    info!("Worker cancelled while handling {:?}", message);
                                    return Ok(());
                                }
                                error!("Failed to handle message {:?}: {:?}", message, e);
                            }
                        }
                        None => {
                            warn!("Job subscription closed, resubscribing");
                            subscription = match worker.subscribe(&cancel_token).await {
                                Ok(subscription) => subscription,
                                Err(_) if cancel_token.is_cancelled() => return Ok(()),
                                Err(e) => return Err(e),
                            };
                        }
                    }
                }
            }
        }
    })
}
