//! Local registration records for the IoTCC connector.
//!
//! Three durable projections of registration state:
//!
//! - **Cache records**: one flat property map per registered entity, used to
//!   reconcile local state with the control center across restarts.
//! - **Discovery records**: a presentation view of each cache record, read by
//!   the device-management agent.
//! - **Summary record**: the current edge system and its known devices.
//!
//! [`RecordStore`] owns the files. The merge rules live on [`CacheRecord`]
//! and in [`reconcile`] so they can be exercised without touching disk.

mod cache;
mod discovery;
mod error;
mod store;
mod summary;

pub use cache::{
    is_reserved_key, reconcile, CacheRecord, RecordIdentity, KEY_DEVICE_TYPE, KEY_ENTITY_TYPE,
    KEY_NAME, KEY_TIMESTAMP, SYSTEM_PROPERTIES_MARKER,
};
pub use discovery::{
    Attribute, DiscoveryFile, DiscoveryRecord, ATTR_DEVICE_NAME, ATTR_DEVICE_TYPE,
    ATTR_EDGE_SYSTEM_NAME, ATTR_LAST_SEEN,
};
pub use error::{StoreError, StoreResult};
pub use store::{RecordStore, StoreConfig};
pub use summary::{DeviceEntry, EdgeSystemEntry, OgProperties, SummaryBody, SummaryRecord};
