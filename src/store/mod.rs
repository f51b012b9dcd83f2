mod redis_hash;

use thiserror::Error as ThisError;

pub use redis_hash::RedisStore;

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached. Worth retrying.
    #[error("result store unavailable: {0}")]
    Unavailable(String),
    /// The store answered with an error. Retrying the same command will not help.
    #[error("result store rejected command: {0}")]
    Command(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Hash-field storage for computed results.
pub trait ResultStore: Send + Sync {
    fn set_result(
        &self,
        hash: &str,
        field: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get_result(
        &self,
        hash: &str,
        field: &str,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;
}
