mod redis_pubsub;

use anyhow::Result;

pub use redis_pubsub::RedisSource;

/// Something that can be subscribed to for job messages.
pub trait JobSource: Send + Sync {
    type Subscription: Subscription;

    fn subscribe(&self) -> impl Future<Output = Result<Self::Subscription>> + Send;
}

pub trait Subscription: Send {
    /// Next message payload, or `None` once the underlying connection is gone.
    fn next_message(&mut self) -> impl Future<Output = Option<String>> + Send;
}
