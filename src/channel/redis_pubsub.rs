use anyhow::{Context, Result};
use futures_util::{StreamExt, stream::BoxStream};
use redis::{Client, Msg};
use tracing::info;

use super::{JobSource, Subscription};

#[derive(Clone, Debug)]
pub struct RedisSource {
    client: Client,
    channel: String,
}

impl RedisSource {
    pub fn new(client: Client, channel: String) -> Self {
        Self { client, channel }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

pub struct RedisSubscription {
    messages: BoxStream<'static, Msg>,
}

impl JobSource for RedisSource {
    type Subscription = RedisSubscription;

    async fn subscribe(&self) -> Result<RedisSubscription> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .context("Failed to open pub/sub connection")?;
        pubsub
            .subscribe(self.channel.as_str())
            .await
            .with_context(|| format!("Failed to subscribe to {}", self.channel))?;
        info!("Subscribed to channel {}", self.channel);
        Ok(RedisSubscription {
            messages: pubsub.into_on_message().boxed(),
        })
    }
}

impl Subscription for RedisSubscription {
    async fn next_message(&mut self) -> Option<String> {
        self.messages
            .next()
            .await
            .map(|msg| decode_payload(msg.get_payload_bytes()))
    }
}

/// Payloads are not required to be UTF-8; invalid bytes become U+FFFD.
fn decode_payload(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_payload() {
        assert_eq!(decode_payload(b"42"), "42");
        assert_eq!(decode_payload(b" 7\n"), " 7\n");
        assert_eq!(decode_payload(b""), "");
    }

    #[test]
    fn test_decode_payload_invalid_utf8() {
        assert_eq!(decode_payload(&[b'1', 0xff, b'2']), "1\u{FFFD}2");
        assert_eq!(decode_payload(&[0xc3]), "\u{FFFD}");
    }
}
