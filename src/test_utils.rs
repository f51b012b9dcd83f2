use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result, bail};
use tokio::{
    sync::{
        Mutex,
        mpsc::{self, UnboundedReceiver, UnboundedSender},
    },
    time::{sleep, timeout},
};

use crate::{
    channel::{JobSource, Subscription},
    store::{ResultStore, StoreError},
};

const POLL_INTERVAL: Duration = Duration::from_millis(5);
const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct StoreState {
    hashes: HashMap<String, HashMap<String, String>>,
    available: bool,
    rejected_fields: HashSet<String>,
    writes: usize,
}

/// In-process `ResultStore` that can be switched off to simulate an outage,
/// or made to refuse writes to chosen fields the way Redis refuses a command.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState {
                hashes: HashMap::new(),
                available: true,
                rejected_fields: HashSet::new(),
                writes: 0,
            })),
        }
    }

    pub async fn set_available(&self, available: bool) {
        self.state.lock().await.available = available;
    }

    /// Every later write to `field` fails with a command error.
    pub async fn reject_field(&self, field: &str) {
        self.state
            .lock()
            .await
            .rejected_fields
            .insert(field.to_string());
    }

    pub async fn get(&self, hash: &str, field: &str) -> Option<String> {
        let state = self.state.lock().await;
        state.hashes.get(hash).and_then(|h| h.get(field)).cloned()
    }

    pub async fn len(&self, hash: &str) -> usize {
        let state = self.state.lock().await;
        state.hashes.get(hash).map_or(0, HashMap::len)
    }

    pub async fn writes(&self) -> usize {
        self.state.lock().await.writes
    }

    pub async fn wait_for(&self, hash: &str, field: &str) -> Result<String> {
        timeout(WAIT_TIMEOUT, async {
            loop {
                if let Some(value) = self.get(hash, field).await {
                    return value;
                }
                sleep(POLL_INTERVAL).await;
            }
        })
        .await
        .with_context(|| format!("Timed out waiting for {} {:?}", hash, field))
    }

    pub async fn wait_for_writes(&self, count: usize) -> Result<()> {
        timeout(WAIT_TIMEOUT, async {
            while self.writes().await < count {
                sleep(POLL_INTERVAL).await;
            }
        })
        .await
        .with_context(|| format!("Timed out waiting for {} writes", count))
    }
}

impl ResultStore for MemoryStore {
    async fn set_result(&self, hash: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if !state.available {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        if state.rejected_fields.contains(field) {
            return Err(StoreError::Command(format!(
                "WRONGTYPE writing {} {:?}",
                hash, field
            )));
        }
        state
            .hashes
            .entry(hash.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        state.writes += 1;
        Ok(())
    }

    async fn get_result(&self, hash: &str, field: &str) -> Result<Option<String>, StoreError> {
        let state = self.state.lock().await;
        if !state.available {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(state.hashes.get(hash).and_then(|h| h.get(field)).cloned())
    }
}

#[derive(Debug)]
struct BrokerState {
    subscribers: Vec<UnboundedSender<String>>,
    available: bool,
    subscriptions: usize,
}

/// In-process pub/sub channel. Like Redis, messages published while nobody
/// is subscribed are dropped.
#[derive(Clone, Debug)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BrokerState {
                subscribers: vec![],
                available: true,
                subscriptions: 0,
            })),
        }
    }

    /// Returns the number of subscribers the message was delivered to.
    pub async fn publish(&self, message: &str) -> usize {
        let mut state = self.state.lock().await;
        state
            .subscribers
            .retain(|tx| tx.send(message.to_string()).is_ok());
        state.subscribers.len()
    }

    /// Drops every live subscription, as a lost connection would.
    pub async fn disconnect(&self) {
        self.state.lock().await.subscribers.clear();
    }

    pub async fn set_available(&self, available: bool) {
        self.state.lock().await.available = available;
    }

    pub async fn subscriber_count(&self) -> usize {
        let mut state = self.state.lock().await;
        state.subscribers.retain(|tx| !tx.is_closed());
        state.subscribers.len()
    }

    /// Total successful subscribe calls since creation.
    pub async fn subscriptions(&self) -> usize {
        self.state.lock().await.subscriptions
    }

    pub async fn wait_for_subscriptions(&self, count: usize) -> Result<()> {
        timeout(WAIT_TIMEOUT, async {
            while self.subscriptions().await < count || self.subscriber_count().await == 0 {
                sleep(POLL_INTERVAL).await;
            }
        })
        .await
        .with_context(|| format!("Timed out waiting for {} subscriptions", count))
    }
}

pub struct MemorySubscription {
    rx: UnboundedReceiver<String>,
}

impl JobSource for MemoryBroker {
    type Subscription = MemorySubscription;

    async fn subscribe(&self) -> Result<MemorySubscription> {
        let mut state = self.state.lock().await;
        if !state.available {
            bail!("Job channel unavailable");
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.subscribers.push(tx);
        state.subscriptions += 1;
        Ok(MemorySubscription { rx })
    }
}

impl Subscription for MemorySubscription {
    async fn next_message(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}
