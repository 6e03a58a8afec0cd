//! IoT Control Center connector.
//!
//! Registers edge systems, devices and metrics with the control center over
//! an established session, keeps the local records in step, and batches
//! metric samples for upload.
//!
//! # Architecture
//!
//! ```text
//! caller ──► ControlCenter ──► Correlator ──► Transport ──► server
//!                 │                ▲
//!                 │                └── Inbox ◄── background receiver
//!                 ▼
//!            RecordStore (cache / discovery / summary)
//! ```
//!
//! Requests that expect a reply go through [`Correlator::correlate`], which
//! admits one caller at a time. Record writes happen under a separate file
//! lock, taken only after correlation has finished.

mod aggregator;
pub mod config;
pub mod correlation;
mod dcc;
pub mod error;
pub mod protocol;
mod reconcile;
pub mod registered;
pub mod transport;

pub use aggregator::format_batch;
pub use config::DccConfig;
pub use correlation::{Correlator, TransactionIds};
pub use dcc::{unit_parts, ControlCenter};
pub use error::{DccError, DccResult};
pub use protocol::{InboundMessage, TransactionId};
pub use registered::{Registered, RegisteredEntity, RegisteredMetric, Registrable, Sample};
pub use transport::{inbox, Inbox, InboxSender, Transport};
