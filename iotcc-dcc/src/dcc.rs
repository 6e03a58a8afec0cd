//! Registration and relationship management.
//!
//! Per entity: unregistered → pending (request sent, awaiting the matching
//! response) → registered → unregistered. Every write to the local records
//! happens after correlation, under the one file lock.

use crate::config::DccConfig;
use crate::correlation::Correlator;
use crate::error::{DccError, DccResult};
use crate::protocol::{
    AddPropertiesMessage, CreateOrFindResourceRequest, CreateRelationshipRequest,
    RemoveResourceRequest, CREATE_OR_FIND_RESOURCE_RESPONSE, REMOVE_RESOURCE_RESPONSE,
};
use crate::registered::{Registered, RegisteredEntity, RegisteredMetric, Registrable};
use crate::transport::{Inbox, Transport};
use chrono::{DateTime, Utc};
use iotcc_store::{DeviceEntry, DiscoveryRecord, RecordStore};
use iotcc_types::{
    utc_millis, Entity, EntityType, Metric, Properties, RegEntityId, Unit, EDGE_SYSTEM_WIRE_KIND,
};
use std::sync::Arc;
use sysinfo::{System, SystemExt};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// Connector to the IoT Control Center.
pub struct ControlCenter {
    pub(crate) correlator: Correlator,
    /// The file lock. Guards every read and write of the local records.
    pub(crate) store: Mutex<RecordStore>,
    pub(crate) config: DccConfig,
    pub(crate) boot_time: DateTime<Utc>,
}

impl ControlCenter {
    /// Opens the local records and resets the summary record.
    ///
    /// The transport session is assumed to be up; its receiver must already
    /// be feeding `inbox`.
    pub fn new(transport: Arc<dyn Transport>, inbox: Inbox, config: DccConfig) -> DccResult<Self> {
        config.validate()?;
        let store = RecordStore::open(config.store_config())?;
        if let Err(e) = store.init_summary() {
            error!(
                "Could not initialize {}: {}",
                store.summary_path().display(),
                e
            );
        }
        info!("Connected to IoTCC, records under {}", config.entity_file_path.display());

        Ok(Self {
            correlator: Correlator::new(transport, inbox),
            store: Mutex::new(store),
            config,
            boot_time: system_boot_time(),
        })
    }

    /// Overrides the boot time used for staleness checks.
    #[must_use]
    pub fn with_boot_time(mut self, boot_time: DateTime<Utc>) -> Self {
        self.boot_time = boot_time;
        self
    }

    pub fn boot_time(&self) -> DateTime<Utc> {
        self.boot_time
    }

    pub fn config(&self) -> &DccConfig {
        &self.config
    }

    /// Takes the file lock for direct record access.
    pub async fn records(&self) -> MutexGuard<'_, RecordStore> {
        self.store.lock().await
    }

    // ── Registration ─────────────────────────────────────────────

    /// Registers an entity or metric.
    ///
    /// Metrics are not registered with the server; they come back unbound
    /// and take their parent's uuid in [`Self::create_relationship`].
    pub async fn register(&self, target: impl Into<Registrable>) -> DccResult<Registered> {
        match target.into() {
            Registrable::Metric(metric) => Ok(Registered::Metric(self.register_metric(metric))),
            Registrable::Entity(entity) => {
                Ok(Registered::Entity(self.register_entity(entity).await?))
            }
        }
    }

    /// Wraps a metric in an unbound registration. No network traffic.
    pub fn register_metric(&self, metric: Metric) -> Arc<RegisteredMetric> {
        debug!("Metric {} registered locally, parent pending", metric.name);
        Arc::new(RegisteredMetric::unbound(metric))
    }

    /// Registers an edge system or device with the control center.
    pub async fn register_entity(&self, entity: Entity) -> DccResult<Arc<RegisteredEntity>> {
        info!("Registering resource with IoTCC {}", entity.name);

        let local_id = entity.entity_id.clone();
        let response = self
            .correlator
            .correlate(
                CREATE_OR_FIND_RESOURCE_RESPONSE,
                |id| CreateOrFindResourceRequest::new(id, &entity),
                |msg| {
                    msg.is(CREATE_OR_FIND_RESOURCE_RESPONSE)
                        && msg.body_str("id") == Some(local_id.as_str())
                        && msg.granted_uuid().is_some()
                },
                self.config.registration_timeout(),
            )
            .await?;

        let uuid = response.granted_uuid().unwrap_or_default();
        let reg_entity_id = RegEntityId::parse(uuid).map_err(|e| {
            error!("Rejected identifier for {}: {}", entity.name, e);
            DccError::RegistrationFailure(entity.name.clone())
        })?;
        info!("FOUND RESOURCE: {}", reg_entity_id);

        {
            let store = self.store.lock().await;
            match &entity.entity_type {
                EntityType::EdgeSystem => {
                    let result = store.update_summary(|s| {
                        s.set_edge_system(
                            &entity.name,
                            EDGE_SYSTEM_WIRE_KIND,
                            &reg_entity_id,
                            &entity.entity_id,
                        )
                    });
                    if let Err(e) = result {
                        error!("Could not record edge system {}: {}", entity.name, e);
                    }
                }
                EntityType::Device(kind) => {
                    let entry =
                        DeviceEntry::new(&entity.name, kind, &reg_entity_id, &entity.entity_id);
                    if let Err(e) = store.update_summary(|s| {
                        s.upsert_device(entry);
                    }) {
                        error!("Could not record device {}: {}", entity.name, e);
                    }
                }
            }
            self.store_reg_entity_attributes_locked(
                &store,
                entity.entity_type.category(),
                &entity.name,
                &reg_entity_id,
                entity.entity_type.device_type(),
                None,
            )
            .await;
        }

        info!("Resource Registered {}", entity.name);
        Ok(Arc::new(RegisteredEntity::new(entity, reg_entity_id)))
    }

    /// Removes an entity from the control center and from the local records.
    ///
    /// Local state is removed whatever the server says, including when it
    /// says nothing. Returns whether the server confirmed the removal.
    pub async fn unregister(&self, target: &RegisteredEntity) -> DccResult<bool> {
        let entity = target.entity();
        let reg_entity_id = target.reg_entity_id();
        info!("Unregistering resource with IoTCC {}", entity.name);

        let local_id = entity.entity_id.as_str();
        let result = self
            .correlator
            .correlate(
                REMOVE_RESOURCE_RESPONSE,
                |id| RemoveResourceRequest::new(id, entity),
                |msg| {
                    msg.is(REMOVE_RESOURCE_RESPONSE)
                        && msg.body_str("id").is_none_or(|id| id == local_id)
                },
                self.config.unregistration_timeout(),
            )
            .await;

        let confirmed = match result {
            Ok(msg) if msg.succeeded() => {
                info!("Unregistration of resource {} with IoTCC succeeded", entity.name);
                true
            }
            Ok(_) => {
                warn!("Unregistration of resource {} with IoTCC failed", entity.name);
                false
            }
            Err(DccError::CorrelationTimeout { .. }) => {
                warn!("No unregistration response for resource {}", entity.name);
                false
            }
            Err(e) => return Err(e),
        };

        let store = self.store.lock().await;
        let discovery = match &entity.entity_type {
            EntityType::EdgeSystem => {
                let result = store.update_summary(|s| {
                    if s.remove_edge_system(&entity.name, reg_entity_id) {
                        info!("Removed {} edge-system from summary record", entity.name);
                    }
                });
                if let Err(e) = result {
                    error!("Could not update summary record: {}", e);
                }
                DiscoveryRecord::edge_system(&entity.name, None, true)
            }
            EntityType::Device(kind) => {
                let result = store.update_summary(|s| {
                    if !s.remove_device(reg_entity_id) {
                        debug!("No such device {} in summary record", entity.name);
                    }
                });
                if let Err(e) = result {
                    error!("Could not update summary record: {}", e);
                }
                DiscoveryRecord::device(&entity.name, Some(kind.as_str()), None, true)
            }
        };
        if let Err(e) = store.write_discovery(reg_entity_id, discovery) {
            error!("Could not write discovery record {}: {}", reg_entity_id, e);
        }

        info!("Unregistration of resource {} with IoTCC complete", entity.name);
        Ok(confirmed)
    }

    // ── Relationships ────────────────────────────────────────────

    /// Attaches `child` under `parent`.
    ///
    /// A metric child is bound to the parent's uuid and its unit published;
    /// the server is not told about the relationship. An entity child gets a
    /// relationship request and inherits the parent's system properties.
    pub async fn create_relationship(
        &self,
        parent: &Registered,
        child: &Registered,
    ) -> DccResult<()> {
        let parent_entity = parent.owning_entity().ok_or_else(|| {
            DccError::InvalidRelationship(format!("parent {parent} has no server identifier"))
        })?;

        match child {
            Registered::Metric(metric) => {
                metric.bind(parent_entity);
                let m = metric.metric();
                self.publish_unit(child, &m.name, m.unit.as_ref()).await
            }
            Registered::Entity(entity) => {
                if Arc::ptr_eq(entity, &parent_entity) {
                    return Err(DccError::InvalidRelationship(format!(
                        "{child} cannot be its own parent"
                    )));
                }
                entity.set_parent(parent_entity.clone());
                self.correlator
                    .send(|id| {
                        CreateRelationshipRequest::new(
                            id,
                            parent_entity.reg_entity_id(),
                            entity.reg_entity_id(),
                        )
                    })
                    .await?;
                match parent_entity.sys_properties() {
                    Some(sys) => self.set_system_properties(child, sys).await,
                    None => {
                        debug!("Parent {} has no system properties to propagate", parent);
                        Ok(())
                    }
                }
            }
        }
    }

    // ── Properties ───────────────────────────────────────────────

    /// Records system properties on the owning entity and sends them.
    pub async fn set_system_properties(
        &self,
        target: &Registered,
        properties: Properties,
    ) -> DccResult<()> {
        let owner = owner_of(target)?;
        let entity = owner.entity();
        info!("System Properties defined for resource {}", entity.name);
        self.correlator
            .send(|id| AddPropertiesMessage::new(id, entity, utc_millis(), &properties))
            .await?;
        owner.set_sys_properties(properties);
        Ok(())
    }

    /// Sends properties and merges them into the owning entity's cache record.
    pub async fn set_properties(&self, target: &Registered, properties: &Properties) -> DccResult<()> {
        let owner = owner_of(target)?;
        let entity = owner.entity();
        info!("Properties defined for resource {}", entity.name);
        self.correlator
            .send(|id| AddPropertiesMessage::new(id, entity, utc_millis(), properties))
            .await?;

        let store = self.store.lock().await;
        self.store_reg_entity_attributes_locked(
            &store,
            entity.entity_type.category(),
            &entity.name,
            owner.reg_entity_id(),
            entity.entity_type.device_type(),
            Some(properties),
        )
        .await;
        Ok(())
    }

    /// Publishes `<metric>_unit` and `<metric>_prefix` for a metric.
    pub async fn publish_unit(
        &self,
        target: &Registered,
        metric_name: &str,
        unit: Option<&Unit>,
    ) -> DccResult<()> {
        let (prefix, unit_name) = unit_parts(unit);
        let mut properties = Properties::new();
        properties.insert(format!("{metric_name}_unit"), unit_name);
        properties.insert(format!("{metric_name}_prefix"), prefix);
        self.set_properties(target, &properties).await?;
        info!("Published metric unit with prefix to IoTCC");
        Ok(())
    }
}

/// `(prefix, unit name)`, empty strings where unknown.
pub fn unit_parts(unit: Option<&Unit>) -> (String, String) {
    match unit {
        Some(unit) => (unit.prefix_name().to_string(), unit.name().to_string()),
        None => (String::new(), String::new()),
    }
}

fn owner_of(target: &Registered) -> DccResult<Arc<RegisteredEntity>> {
    target.owning_entity().ok_or_else(|| {
        DccError::InvalidRelationship(format!("metric {target} is not bound to an entity"))
    })
}

fn system_boot_time() -> DateTime<Utc> {
    let secs = System::new().boot_time();
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .unwrap_or(DateTime::UNIX_EPOCH)
}
