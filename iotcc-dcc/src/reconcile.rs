//! Cache reconciliation against the control center.
//!
//! After a reboot the local cache may be behind the server. A record last
//! written at or before boot is refreshed from the server's property list
//! (when enabled) before incoming properties are merged in.

use crate::dcc::ControlCenter;
use crate::protocol::{GetPropertiesRequest, GET_PROPERTIES_RESPONSE};
use iotcc_store::{reconcile, CacheRecord, DiscoveryRecord, RecordIdentity, RecordStore};
use iotcc_types::{EntityCategory, Properties, RegEntityId};
use tracing::{debug, error, info, warn};

impl ControlCenter {
    /// Merges `properties` into the cache record for `reg_entity_id` and
    /// rewrites its discovery record.
    ///
    /// Failures are logged, never returned.
    pub async fn store_reg_entity_attributes(
        &self,
        category: EntityCategory,
        name: &str,
        reg_entity_id: &RegEntityId,
        device_type: Option<&str>,
        properties: Option<&Properties>,
    ) {
        let store = self.store.lock().await;
        self.store_reg_entity_attributes_locked(
            &store,
            category,
            name,
            reg_entity_id,
            device_type,
            properties,
        )
        .await;
    }

    /// Same as [`Self::store_reg_entity_attributes`], with the file lock
    /// already held by the caller.
    pub(crate) async fn store_reg_entity_attributes_locked(
        &self,
        store: &RecordStore,
        category: EntityCategory,
        name: &str,
        reg_entity_id: &RegEntityId,
        device_type: Option<&str>,
        properties: Option<&Properties>,
    ) {
        debug!("Storing attributes {}:{}:{}", category, name, reg_entity_id);

        let stored = match store.load_cache(reg_entity_id) {
            Ok(stored) => stored,
            Err(e) => {
                error!("Could not read cache record {}: {}", reg_entity_id, e);
                return;
            }
        };

        let remote = match &stored {
            Some(record) if self.config.enable_reboot_getprop && self.predates_boot(record) => {
                self.get_properties(reg_entity_id).await
            }
            _ => None,
        };

        let identity = RecordIdentity::new(category, name, device_type);
        let mut record = reconcile(stored, remote.as_deref(), identity, properties);

        if let Err(e) = store.save_cache(reg_entity_id, &mut record) {
            error!("Could not write cache record {}: {}", reg_entity_id, e);
            return;
        }

        let discovery = match category {
            EntityCategory::EdgeSystem => DiscoveryRecord::edge_system(name, Some(&record), false),
            EntityCategory::Devices => {
                DiscoveryRecord::device(name, device_type, Some(&record), false)
            }
        };
        if let Err(e) = store.write_discovery(reg_entity_id, discovery) {
            error!("Could not write discovery record {}: {}", reg_entity_id, e);
        }
    }

    /// Fetches the server's property list for a resource.
    ///
    /// Returns `None` on timeout or when the response has no list.
    pub async fn get_properties(&self, reg_entity_id: &RegEntityId) -> Option<Vec<Properties>> {
        info!("Get properties defined with IoTCC for resource {}", reg_entity_id);

        let result = self
            .correlator
            .correlate(
                GET_PROPERTIES_RESPONSE,
                |id| GetPropertiesRequest::new(id, reg_entity_id),
                |msg| {
                    msg.is(GET_PROPERTIES_RESPONSE)
                        && msg.body_str("uuid") == Some(reg_entity_id.as_str())
                },
                self.config.registration_timeout(),
            )
            .await;

        match result {
            Ok(msg) => {
                let list = msg.property_list();
                match &list {
                    Some(items) => info!("Got {} properties for {}", items.len(), reg_entity_id),
                    None => warn!("No propertyList for {}", reg_entity_id),
                }
                list
            }
            Err(e) => {
                error!("Could not get properties for {}: {}", reg_entity_id, e);
                None
            }
        }
    }

    /// Whether the record was last written at or before boot.
    fn predates_boot(&self, record: &CacheRecord) -> bool {
        match record.timestamp() {
            None => false,
            Some(Ok(ts)) => ts.is_at_or_before(&self.boot_time),
            Some(Err(e)) => {
                warn!("Unreadable record timestamp, treating as stale: {}", e);
                true
            }
        }
    }
}
