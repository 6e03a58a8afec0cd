//! Registration handles.
//!
//! A [`RegisteredEntity`] exists only once the control center has granted
//! it a uuid. A [`RegisteredMetric`] has no uuid of its own: it borrows its
//! parent's once [`crate::ControlCenter::create_relationship`] binds it.

use iotcc_types::{Entity, Metric, Properties, RegEntityId};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// An edge system or device with a server-assigned identifier.
#[derive(Debug)]
pub struct RegisteredEntity {
    entity: Entity,
    reg_entity_id: RegEntityId,
    sys_properties: RwLock<Option<Properties>>,
    parent: RwLock<Option<Arc<RegisteredEntity>>>,
}

impl RegisteredEntity {
    pub fn new(entity: Entity, reg_entity_id: RegEntityId) -> Self {
        Self {
            entity,
            reg_entity_id,
            sys_properties: RwLock::new(None),
            parent: RwLock::new(None),
        }
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn reg_entity_id(&self) -> &RegEntityId {
        &self.reg_entity_id
    }

    /// System properties propagated to children.
    pub fn sys_properties(&self) -> Option<Properties> {
        self.sys_properties
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_sys_properties(&self, properties: Properties) {
        *self
            .sys_properties
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(properties);
    }

    pub fn parent(&self) -> Option<Arc<RegisteredEntity>> {
        self.parent
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_parent(&self, parent: Arc<RegisteredEntity>) {
        *self.parent.write().unwrap_or_else(PoisonError::into_inner) = Some(parent);
    }
}

/// One collected sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub value: f64,
}

/// A metric stream attached (or about to be attached) to an entity.
#[derive(Debug)]
pub struct RegisteredMetric {
    metric: Metric,
    parent: RwLock<Option<Arc<RegisteredEntity>>>,
    samples: Mutex<VecDeque<Sample>>,
}

impl RegisteredMetric {
    /// A placeholder with no parent yet.
    pub fn unbound(metric: Metric) -> Self {
        Self {
            metric,
            parent: RwLock::new(None),
            samples: Mutex::new(VecDeque::new()),
        }
    }

    pub fn metric(&self) -> &Metric {
        &self.metric
    }

    pub fn parent(&self) -> Option<Arc<RegisteredEntity>> {
        self.parent
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The parent's uuid, once bound.
    pub fn reg_entity_id(&self) -> Option<RegEntityId> {
        self.parent().map(|p| p.reg_entity_id().clone())
    }

    pub(crate) fn bind(&self, parent: Arc<RegisteredEntity>) {
        *self.parent.write().unwrap_or_else(PoisonError::into_inner) = Some(parent);
    }

    /// Queues a sample for the next batch.
    pub fn push_sample(&self, timestamp: i64, value: f64) {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Sample { timestamp, value });
    }

    /// Samples waiting to be batched.
    pub fn backlog(&self) -> usize {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Takes every sample queued at the moment of the call, oldest first.
    pub fn drain_backlog(&self) -> Vec<Sample> {
        let mut samples = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
        let count = samples.len();
        samples.drain(..count).collect()
    }
}

/// What can be handed to [`crate::ControlCenter::register`].
#[derive(Debug, Clone)]
pub enum Registrable {
    Entity(Entity),
    Metric(Metric),
}

impl From<Entity> for Registrable {
    fn from(entity: Entity) -> Self {
        Self::Entity(entity)
    }
}

impl From<Metric> for Registrable {
    fn from(metric: Metric) -> Self {
        Self::Metric(metric)
    }
}

/// The outcome of registration.
#[derive(Debug, Clone)]
pub enum Registered {
    Entity(Arc<RegisteredEntity>),
    Metric(Arc<RegisteredMetric>),
}

impl Registered {
    /// The uuid this registration acts under, if resolved.
    pub fn reg_entity_id(&self) -> Option<RegEntityId> {
        match self {
            Self::Entity(e) => Some(e.reg_entity_id().clone()),
            Self::Metric(m) => m.reg_entity_id(),
        }
    }

    /// The entity that owns this registration's uuid: the entity itself,
    /// or a metric's bound parent.
    pub fn owning_entity(&self) -> Option<Arc<RegisteredEntity>> {
        match self {
            Self::Entity(e) => Some(e.clone()),
            Self::Metric(m) => m.parent(),
        }
    }

    pub fn as_entity(&self) -> Option<&Arc<RegisteredEntity>> {
        match self {
            Self::Entity(e) => Some(e),
            Self::Metric(_) => None,
        }
    }

    fn label(&self) -> &str {
        match self {
            Self::Entity(e) => &e.entity().name,
            Self::Metric(m) => &m.metric().name,
        }
    }
}

impl std::fmt::Display for Registered {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl From<Arc<RegisteredEntity>> for Registered {
    fn from(entity: Arc<RegisteredEntity>) -> Self {
        Self::Entity(entity)
    }
}

impl From<Arc<RegisteredMetric>> for Registered {
    fn from(metric: Arc<RegisteredMetric>) -> Self {
        Self::Metric(metric)
    }
}
