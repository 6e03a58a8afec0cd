//! Transport and inbox seams.
//!
//! The session underneath is a black box: the connector hands it opaque
//! payloads and a background receiver pushes whatever arrives into an
//! unbounded inbox. Nothing here acknowledges anything.

use crate::error::DccResult;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Outbound half of the session.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one payload. Delivery is reliable and ordered; there is no
    /// per-message acknowledgment.
    async fn send(&self, payload: String) -> DccResult<()>;
}

/// Creates a connected inbox pair.
pub fn inbox() -> (InboxSender, Inbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (InboxSender(tx), Inbox(rx))
}

/// Handle the background receiver uses to deposit inbound frames.
#[derive(Debug, Clone)]
pub struct InboxSender(mpsc::UnboundedSender<String>);

impl InboxSender {
    /// Queues a frame. Returns false once the inbox has been dropped.
    pub fn deliver(&self, payload: impl Into<String>) -> bool {
        self.0.send(payload.into()).is_ok()
    }
}

/// Ordered, unbounded queue of inbound frames.
#[derive(Debug)]
pub struct Inbox(mpsc::UnboundedReceiver<String>);

impl Inbox {
    /// Waits for the next frame. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<String> {
        self.0.recv().await
    }
}

/// A scripted transport for testing.
pub mod mock {
    use super::*;
    use crate::error::DccError;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Mutex, PoisonError};

    /// Produces the server's replies to one request.
    pub type Responder = Box<dyn Fn(&Value) -> Vec<Value> + Send + Sync>;

    /// Records every payload sent and optionally answers through the inbox,
    /// standing in for the control center.
    pub struct MockTransport {
        sent: Mutex<Vec<String>>,
        inbox: InboxSender,
        responder: Option<Responder>,
        failing: AtomicBool,
    }

    impl MockTransport {
        /// A transport that never answers.
        pub fn new(inbox: InboxSender) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                inbox,
                responder: None,
                failing: AtomicBool::new(false),
            }
        }

        /// A transport that answers each request with `responder`'s output.
        pub fn with_responder<F>(inbox: InboxSender, responder: F) -> Self
        where
            F: Fn(&Value) -> Vec<Value> + Send + Sync + 'static,
        {
            Self {
                responder: Some(Box::new(responder)),
                ..Self::new(inbox)
            }
        }

        /// Makes subsequent sends fail.
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        /// The inbox handle, for injecting unsolicited traffic.
        pub fn inbox(&self) -> &InboxSender {
            &self.inbox
        }

        /// Every payload sent so far, parsed.
        pub fn sent(&self) -> Vec<Value> {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .filter_map(|p| serde_json::from_str(p).ok())
                .collect()
        }

        /// Sent payloads whose `type` matches.
        pub fn sent_of_type(&self, msg_type: &str) -> Vec<Value> {
            self.sent()
                .into_iter()
                .filter(|v| v["type"] == msg_type)
                .collect()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&self, payload: String) -> DccResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(DccError::Transport("mock transport failing".into()));
            }
            let parsed: Option<Value> = serde_json::from_str(&payload).ok();
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(payload);
            if let (Some(responder), Some(request)) = (&self.responder, parsed) {
                for reply in responder(&request) {
                    self.inbox.deliver(reply.to_string());
                }
            }
            Ok(())
        }
    }
}
