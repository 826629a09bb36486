//! Reference-counted multiplexer for upstream market data streams.
//!
//! Each distinct stream key gets at most one upstream connection, shared by
//! every subscriber through a broadcast channel. The connection opens on the
//! first [`StreamMultiplexer::subscribe`] for a key and closes when the last
//! [`StreamSubscription`] for that key is dropped. Dropped connections retry
//! with a fixed delay until torn down.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::Result;
use crate::socket::{Connection, Transport, WsTransport};

/// Broadcast buffer per stream; slow consumers lag rather than block.
const STREAM_BROADCAST_CAPACITY: usize = 512;

/// Delay between retries after an upstream connection drops.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Opens upstream connections for stream keys.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn open(&self, key: &str) -> Result<Box<dyn Connection>>;
}

/// Connects to the exchange's combined-stream WebSocket endpoint.
pub struct ExchangeConnector {
    base_url: String,
}

impl ExchangeConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl StreamConnector for ExchangeConnector {
    async fn open(&self, key: &str) -> Result<Box<dyn Connection>> {
        let url = format!(
            "{}/stream?streams={}",
            self.base_url.trim_end_matches('/'),
            key
        );
        WsTransport.connect(&url).await
    }
}

struct ActiveStream {
    sender: broadcast::Sender<Value>,
    subscribers: usize,
    shutdown: watch::Sender<bool>,
}

struct Inner {
    streams: Mutex<HashMap<String, ActiveStream>>,
    connector: Arc<dyn StreamConnector>,
}

/// Hands out shared subscriptions to upstream streams.
#[derive(Clone)]
pub struct StreamMultiplexer {
    inner: Arc<Inner>,
}

impl StreamMultiplexer {
    pub fn new(connector: Arc<dyn StreamConnector>) -> Self {
        Self {
            inner: Arc::new(Inner {
                streams: Mutex::new(HashMap::new()),
                connector,
            }),
        }
    }

    /// Subscribes to `key`, opening the upstream connection if this is the
    /// first subscriber.
    pub fn subscribe(&self, key: &str) -> StreamSubscription {
        let mut streams = self.inner.streams.lock().unwrap();

        if let Some(active) = streams.get_mut(key) {
            active.subscribers += 1;
            debug!(stream = key, subscribers = active.subscribers, "Joined stream");
            return StreamSubscription {
                key: key.to_string(),
                inner: Arc::clone(&self.inner),
                receiver: active.sender.subscribe(),
            };
        }

        let (sender, receiver) = broadcast::channel(STREAM_BROADCAST_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        streams.insert(
            key.to_string(),
            ActiveStream {
                sender: sender.clone(),
                subscribers: 1,
                shutdown: shutdown_tx,
            },
        );
        info!(stream = key, "Opening stream");

        tokio::spawn(run_stream(
            Arc::clone(&self.inner),
            key.to_string(),
            sender,
            shutdown_rx,
        ));

        StreamSubscription {
            key: key.to_string(),
            inner: Arc::clone(&self.inner),
            receiver,
        }
    }

    /// Number of streams with a live upstream connection.
    pub fn active_stream_count(&self) -> usize {
        self.inner.streams.lock().unwrap().len()
    }
}

/// A handle onto one shared stream. Dropping it releases the share; the
/// upstream connection closes when the last handle goes.
pub struct StreamSubscription {
    key: String,
    inner: Arc<Inner>,
    receiver: broadcast::Receiver<Value>,
}

impl StreamSubscription {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Next frame from the stream, or `None` once the stream is torn down.
    pub async fn recv(&mut self) -> Option<Value> {
        loop {
            match self.receiver.recv().await {
                Ok(value) => return Some(value),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(stream = %self.key, missed, "Subscriber lagging, frames dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for StreamSubscription {
    fn drop(&mut self) {
        release(&self.inner, &self.key);
    }
}

fn release(inner: &Inner, key: &str) {
    let mut streams = inner.streams.lock().unwrap();
    let remove = match streams.get_mut(key) {
        Some(active) => {
            active.subscribers -= 1;
            debug!(stream = key, subscribers = active.subscribers, "Left stream");
            active.subscribers == 0
        }
        None => false,
    };
    if remove && let Some(active) = streams.remove(key) {
        let _ = active.shutdown.send(true);
        info!(stream = key, "Closing idle stream");
    }
}

/// Keeps the upstream connection for one stream alive until shutdown.
async fn run_stream(
    inner: Arc<Inner>,
    key: String,
    sender: broadcast::Sender<Value>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            return;
        }

        match inner.connector.open(&key).await {
            Ok(conn) => {
                if read_stream(&inner, &key, &sender, conn, &mut shutdown).await {
                    return;
                }
            }
            Err(e) => warn!(stream = %key, error = %e, "Stream connection failed"),
        }

        tokio::select! {
            _ = shutdown.changed() => return,
            _ = tokio::time::sleep(RETRY_DELAY) => {}
        }
    }
}

/// Reads one connection until it drops. Returns true on shutdown.
async fn read_stream(
    inner: &Inner,
    key: &str,
    sender: &broadcast::Sender<Value>,
    mut conn: Box<dyn Connection>,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return true;
                }
            }

            frame = conn.next_frame() => {
                match frame {
                    Some(Ok(text)) => match serde_json::from_str::<Value>(&text) {
                        Ok(value) => dispatch_frame(inner, key, sender, value),
                        Err(e) => warn!(stream = %key, error = %e, "Dropping malformed stream frame"),
                    },
                    Some(Err(e)) => {
                        warn!(stream = %key, error = %e, "Stream read failed");
                        return false;
                    }
                    None => {
                        debug!(stream = %key, "Stream closed by server");
                        return false;
                    }
                }
            }
        }
    }
}

/// Routes a frame to its stream's subscribers.
///
/// Combined-endpoint frames carry a `stream` tag and wrap the payload in
/// `data`; those route by tag, possibly to a different stream sharing the
/// connection. Untagged frames belong to the connection's own stream.
fn dispatch_frame(inner: &Inner, own_key: &str, own_sender: &broadcast::Sender<Value>, mut value: Value) {
    let tag = value
        .get("stream")
        .and_then(Value::as_str)
        .map(String::from);

    match tag {
        Some(tag) => {
            let payload = match value.get_mut("data") {
                Some(data) => data.take(),
                None => value,
            };
            if tag == own_key {
                let _ = own_sender.send(payload);
                return;
            }
            let streams = inner.streams.lock().unwrap();
            match streams.get(&tag) {
                Some(active) => {
                    let _ = active.sender.send(payload);
                }
                None => debug!(stream = %tag, "Frame for inactive stream"),
            }
        }
        None => {
            let _ = own_sender.send(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::{Duration, timeout};

    use super::*;

    struct FeedConnection {
        frames: broadcast::Receiver<String>,
    }

    #[async_trait]
    impl Connection for FeedConnection {
        async fn next_frame(&mut self) -> Option<Result<String>> {
            loop {
                match self.frames.recv().await {
                    Ok(frame) => return Some(Ok(frame)),
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        }

        async fn send_text(&mut self, _text: String) -> Result<()> {
            Ok(())
        }
    }

    /// Connector whose connections replay frames pushed by the test.
    struct TestConnector {
        feed: broadcast::Sender<String>,
        opens: AtomicU32,
    }

    impl TestConnector {
        fn new() -> (Arc<Self>, broadcast::Sender<String>) {
            let (feed, _) = broadcast::channel(64);
            let connector = Arc::new(Self {
                feed: feed.clone(),
                opens: AtomicU32::new(0),
            });
            (connector, feed)
        }

        fn opens(&self) -> u32 {
            self.opens.load(Ordering::Relaxed)
        }
    }

    #[async_trait]
    impl StreamConnector for TestConnector {
        async fn open(&self, _key: &str) -> Result<Box<dyn Connection>> {
            let frames = self.feed.subscribe();
            self.opens.fetch_add(1, Ordering::Relaxed);
            Ok(Box::new(FeedConnection { frames }))
        }
    }

    async fn wait_for_opens(connector: &TestConnector, want: u32) {
        timeout(Duration::from_secs(1), async {
            while connector.opens() < want {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("connector never opened");
    }

    #[tokio::test]
    async fn subscribers_share_one_connection() {
        let (connector, feed) = TestConnector::new();
        let mux = StreamMultiplexer::new(Arc::clone(&connector) as _);

        let mut first = mux.subscribe("btcusdt@aggTrade");
        let mut second = mux.subscribe("btcusdt@aggTrade");
        wait_for_opens(&connector, 1).await;

        feed.send(r#"{"p":"101.5"}"#.to_string()).unwrap();

        let a = timeout(Duration::from_secs(1), first.recv()).await.unwrap().unwrap();
        let b = timeout(Duration::from_secs(1), second.recv()).await.unwrap().unwrap();
        assert_eq!(a["p"], "101.5");
        assert_eq!(b["p"], "101.5");
        assert_eq!(connector.opens(), 1);
        assert_eq!(mux.active_stream_count(), 1);
    }

    #[tokio::test]
    async fn last_drop_closes_then_resubscribe_reopens() {
        let (connector, _feed) = TestConnector::new();
        let mux = StreamMultiplexer::new(Arc::clone(&connector) as _);

        let first = mux.subscribe("ethusdt@ticker");
        let second = mux.subscribe("ethusdt@ticker");
        wait_for_opens(&connector, 1).await;

        drop(first);
        assert_eq!(mux.active_stream_count(), 1);
        drop(second);
        assert_eq!(mux.active_stream_count(), 0);

        let _again = mux.subscribe("ethusdt@ticker");
        wait_for_opens(&connector, 2).await;
        assert_eq!(mux.active_stream_count(), 1);
    }

    #[tokio::test]
    async fn combined_frames_unwrap_to_payload() {
        let (connector, feed) = TestConnector::new();
        let mux = StreamMultiplexer::new(Arc::clone(&connector) as _);

        let mut sub = mux.subscribe("btcusdt@ticker");
        wait_for_opens(&connector, 1).await;

        feed.send(r#"{"stream":"btcusdt@ticker","data":{"c":"42000.10"}}"#.to_string())
            .unwrap();
        let value = timeout(Duration::from_secs(1), sub.recv()).await.unwrap().unwrap();
        assert_eq!(value["c"], "42000.10");
        assert!(value.get("stream").is_none());

        // Untagged frames pass through whole.
        feed.send(r#"{"c":"42001.00"}"#.to_string()).unwrap();
        let value = timeout(Duration::from_secs(1), sub.recv()).await.unwrap().unwrap();
        assert_eq!(value["c"], "42001.00");
    }

    #[tokio::test]
    async fn distinct_keys_use_distinct_connections() {
        let (connector, feed) = TestConnector::new();
        let mux = StreamMultiplexer::new(Arc::clone(&connector) as _);

        let mut btc = mux.subscribe("btcusdt@aggTrade");
        let mut eth = mux.subscribe("ethusdt@aggTrade");
        wait_for_opens(&connector, 2).await;
        assert_eq!(mux.active_stream_count(), 2);

        // Tagged frames land only on the stream they name, regardless of
        // which connection carried them.
        feed.send(r#"{"stream":"btcusdt@aggTrade","data":{"s":"BTCUSDT"}}"#.to_string())
            .unwrap();
        let value = timeout(Duration::from_secs(1), btc.recv()).await.unwrap().unwrap();
        assert_eq!(value["s"], "BTCUSDT");

        feed.send(r#"{"stream":"ethusdt@aggTrade","data":{"s":"ETHUSDT"}}"#.to_string())
            .unwrap();
        let value = timeout(Duration::from_secs(1), eth.recv()).await.unwrap().unwrap();
        assert_eq!(value["s"], "ETHUSDT");
    }
}
