//! Request/response correlation over a one-way inbox.
//!
//! The control center answers asynchronously through the same inbox that
//! carries every other inbound frame. [`Correlator::correlate`] sends a
//! request and drains the inbox until a frame satisfies the caller's
//! predicate, discarding everything else it pulls.
//!
//! Two properties hold:
//! - **Single flight.** The inbox receiver sits behind an async mutex held
//!   for the whole send-then-await sequence, so concurrent callers queue
//!   instead of consuming each other's responses.
//! - **Fixed deadline.** The deadline is computed once, after the gate is
//!   acquired. Unrelated traffic shortens the remaining budget rather than
//!   restarting it, so a busy inbox cannot starve a caller.
//!
//! Frames discarded by one caller are gone; a response that arrives while
//! nobody is correlating is consumed by whichever caller pulls next.

use crate::error::{DccError, DccResult};
use crate::protocol::{InboundMessage, TransactionId};
use crate::transport::{Inbox, Transport};
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{timeout_at, Instant};
use tracing::debug;

/// Process-wide transaction id source.
///
/// The counter wraps within 24 bits and is scaled by two, so ids are even
/// and lie in `2..=0x1FFFFFE` (0 after a wrap).
#[derive(Debug, Default)]
pub struct TransactionIds {
    counter: AtomicU32,
}

impl TransactionIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next id.
    pub fn next(&self) -> TransactionId {
        let prev = self
            .counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| {
                Some(c.wrapping_add(1) & 0x00FF_FFFF)
            })
            .unwrap_or_default();
        TransactionId::from_counter(prev.wrapping_add(1) & 0x00FF_FFFF)
    }
}

/// Sends requests and matches their responses.
pub struct Correlator {
    transport: Arc<dyn Transport>,
    inbox: Mutex<Inbox>,
    ids: TransactionIds,
}

impl Correlator {
    pub fn new(transport: Arc<dyn Transport>, inbox: Inbox) -> Self {
        Self {
            transport,
            inbox: Mutex::new(inbox),
            ids: TransactionIds::new(),
        }
    }

    /// Builds a request with a fresh id and sends it without waiting.
    pub async fn send<M, B>(&self, build: B) -> DccResult<TransactionId>
    where
        M: Serialize,
        B: FnOnce(TransactionId) -> M,
    {
        let id = self.ids.next();
        let payload = serde_json::to_string(&build(id))?;
        self.transport.send(payload).await?;
        Ok(id)
    }

    /// Sends an already-encoded payload.
    pub async fn send_payload(&self, payload: String) -> DccResult<()> {
        self.transport.send(payload).await
    }

    /// Sends a request and waits for the first inbound frame accepted by
    /// `matches`.
    ///
    /// `expected` names the awaited response in logs and in the timeout
    /// error. Unparsable and unmatched frames are dropped.
    pub async fn correlate<M, B, P>(
        &self,
        expected: &'static str,
        build: B,
        mut matches: P,
        timeout: Duration,
    ) -> DccResult<InboundMessage>
    where
        M: Serialize,
        B: FnOnce(TransactionId) -> M,
        P: FnMut(&InboundMessage) -> bool,
    {
        let mut inbox = self.inbox.lock().await;
        let deadline = Instant::now() + timeout;

        let id = self.send(build).await?;
        debug!("Sent request {} awaiting {}", id, expected);

        loop {
            let raw = match timeout_at(deadline, inbox.recv()).await {
                Ok(Some(raw)) => raw,
                Ok(None) => return Err(DccError::InboxClosed),
                Err(_) => return Err(DccError::CorrelationTimeout { expected, timeout }),
            };
            debug!("Received msg: {}", raw);

            let message = match InboundMessage::parse(&raw) {
                Ok(message) => message,
                Err(e) => {
                    debug!("Discarding unparsable frame: {}", e);
                    continue;
                }
            };

            if matches(&message) {
                return Ok(message);
            }
            debug!("Discarding {} while waiting for {}", message.msg_type, expected);
        }
    }
}
