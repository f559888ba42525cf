pub mod openai;

use async_trait::async_trait;
use axum::body::Bytes;
use futures::{ Stream, StreamExt };
use log::{ debug, error };
use serde_json::Value;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::RelayError;

pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, RelayError>> + Send>>;

const CHANNEL_CAPACITY: usize = 32;

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Opens a streaming completion. Returns once the upstream has accepted
    /// the request; failures up to that point come back as `Err` here, later
    /// ones as `Err` items on the stream.
    async fn open_stream(
        &self,
        model: &str,
        messages: Vec<Value>
    ) -> Result<DeltaStream, RelayError>;
}

/// Moves deltas from the upstream stream onto a bounded channel from a
/// separate task and returns the receiving end as a byte stream.
///
/// The receiver ending (client went away) makes the next send fail, which
/// stops the task and drops the upstream connection. An upstream error is
/// forwarded once and then the channel closes.
pub fn pump_deltas(mut upstream: DeltaStream) -> ReceiverStream<Result<Bytes, RelayError>> {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        while let Some(item) = upstream.next().await {
            match item {
                Ok(delta) => {
                    if delta.is_empty() {
                        continue;
                    }
                    if tx.send(Ok(Bytes::from(delta))).await.is_err() {
                        debug!("Response receiver dropped, stopping upstream reads");
                        return;
                    }
                }
                Err(e) => {
                    error!("Error during streaming: {}", e);
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            }
        }
        debug!("Upstream stream finished");
    });

    ReceiverStream::new(rx)
}

#[cfg(test)]
pub(crate) mod stub {
    use super::*;
    use futures::stream;
    use std::sync::atomic::{ AtomicUsize, Ordering };
    use std::sync::Mutex;

    pub enum StubDelta {
        Text(&'static str),
        Fail(&'static str),
    }

    /// Replays a fixed delta script and records what it was asked for.
    pub struct StubChatClient {
        script: Vec<StubDelta>,
        fail_open: bool,
        calls: AtomicUsize,
        seen: Mutex<Vec<(String, Vec<Value>)>>,
    }

    impl StubChatClient {
        pub fn new(script: Vec<StubDelta>) -> Self {
            Self {
                script,
                fail_open: false,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn failing_open() -> Self {
            Self { fail_open: true, ..Self::new(Vec::new()) }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn seen(&self) -> Vec<(String, Vec<Value>)> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatClient for StubChatClient {
        async fn open_stream(
            &self,
            model: &str,
            messages: Vec<Value>
        ) -> Result<DeltaStream, RelayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push((model.to_string(), messages));
            if self.fail_open {
                return Err(RelayError::Config("stub refused to open".into()));
            }
            let items: Vec<Result<String, RelayError>> = self.script
                .iter()
                .map(|d| match d {
                    StubDelta::Text(t) => Ok(t.to_string()),
                    StubDelta::Fail(msg) => Err(RelayError::UpstreamStream(msg.to_string())),
                })
                .collect();
            Ok(Box::pin(stream::iter(items)))
        }
    }
}
