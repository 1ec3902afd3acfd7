// world.rs - Runtime context: components, membership, systems, entities
//
// Attaching a component takes effect immediately. Detaching is queued and
// only applied by `commit`, so a system walking its entity list never sees
// that list shrink under it mid-step.

use crate::config::{ConfigError, WorldConfig};
use crate::ecs::component::{ComponentRegistrationError, ComponentRegistry};
use crate::ecs::entity::EntityAllocator;
use crate::ecs::field_store::{FieldError, FieldStore};
use crate::ecs::mask::MembershipMasks;
use crate::ecs::schema::{Schema, SchemaError};
use crate::ecs::system::System;
use crate::ecs::{
    ComponentId, EntityId, SystemDescriptor, SystemHandle, SystemRegistrationError,
    SystemRegistry,
};
use flagstone_metrics::Counter;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

const ATTACH: &str = "attach";
const DETACH_QUEUED: &str = "detach_queued";
const DETACH_APPLIED: &str = "detach_applied";
const COMMIT: &str = "commit";

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("cannot register component '{name}': max components ({max}) reached")]
    CapacityExceeded { name: String, max: usize },

    #[error("component '{name}' is already registered")]
    DuplicateComponent { name: String },

    #[error("component '{name}' is not registered")]
    UnknownComponent { name: String },

    #[error("system '{name}' is not registered")]
    UnknownSystem { name: String },

    #[error("entity {entity} is outside the world's {max} entity slots")]
    EntityOutOfRange { entity: EntityId, max: usize },

    #[error("all {max} entity slots are in use")]
    EntityCapacityExceeded { max: usize },

    #[error("invalid values for component '{component}': {source}")]
    InvalidValue {
        component: String,
        source: FieldError,
    },

    #[error("invalid schema for component '{name}': {source}")]
    InvalidSchema { name: String, source: SchemaError },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    System(#[from] SystemRegistrationError),
}

impl From<ComponentRegistrationError> for WorldError {
    fn from(err: ComponentRegistrationError) -> Self {
        match err {
            ComponentRegistrationError::CapacityExceeded { name, max } => {
                WorldError::CapacityExceeded { name, max }
            }
            ComponentRegistrationError::DuplicateName { name } => {
                WorldError::DuplicateComponent { name }
            }
        }
    }
}

fn unknown_component(name: &str) -> WorldError {
    WorldError::UnknownComponent {
        name: name.to_string(),
    }
}

/// A queued component detachment, applied at the next [`World::commit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingRemoval {
    pub component: ComponentId,
    pub entity: EntityId,
}

/// The ECS runtime: owns every registry and per-entity array.
pub struct World {
    config: WorldConfig,
    pub(crate) components: ComponentRegistry,
    pub(crate) masks: MembershipMasks,
    pub(crate) systems: SystemRegistry,
    pub(crate) entities: EntityAllocator,
    removals: Vec<PendingRemoval>,
    entity_removals: Vec<EntityId>,
    counters: Counter,
}

impl World {
    /// Create an empty world sized by `config`.
    pub fn new(config: WorldConfig) -> Result<Self, WorldError> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: WorldConfig) -> Self {
        Self {
            config,
            components: ComponentRegistry::new(config.max_components, config.max_entities),
            masks: MembershipMasks::new(config.max_entities),
            systems: SystemRegistry::new(config.max_entities),
            entities: EntityAllocator::new(config.max_entities as u32),
            removals: Vec::new(),
            entity_removals: Vec::new(),
            counters: Counter::new(),
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Components
    // ------------------------------------------------------------------

    /// Register a component type and return its freshly allocated field store.
    ///
    /// Fails with [`WorldError::CapacityExceeded`] once `max_components` types
    /// exist; the failed call does not consume a membership bit.
    pub fn register_component(
        &mut self,
        name: &str,
        schema: Schema,
    ) -> Result<&mut FieldStore, WorldError> {
        if self.components.len() >= self.components.max_components() {
            return Err(WorldError::CapacityExceeded {
                name: name.to_string(),
                max: self.components.max_components(),
            });
        }
        schema
            .validate()
            .map_err(|source| WorldError::InvalidSchema {
                name: name.to_string(),
                source,
            })?;

        let descriptor = self.components.register(name, schema)?;
        let bit = descriptor.bit();
        debug!(
            component = name,
            generation = bit.generation(),
            bitflag = bit.bitflag(),
            "registered component"
        );

        self.masks.ensure_generations(bit.generation() + 1);
        Ok(descriptor.store_mut())
    }

    /// Field store of a registered component.
    pub fn component(&self, name: &str) -> Result<&FieldStore, WorldError> {
        self.components
            .lookup(name)
            .map(|descriptor| descriptor.store())
            .ok_or_else(|| unknown_component(name))
    }

    pub fn component_mut(&mut self, name: &str) -> Result<&mut FieldStore, WorldError> {
        self.components
            .lookup_mut(name)
            .map(|descriptor| descriptor.store_mut())
            .ok_or_else(|| unknown_component(name))
    }

    /// Registered component names in registration order.
    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|descriptor| descriptor.name())
    }

    /// Number of 32-bit membership words each entity currently uses.
    pub fn generation_count(&self) -> usize {
        self.components.generation_count()
    }

    /// Raw membership word `generation` of `entity`.
    pub fn mask_word(&self, generation: usize, entity: EntityId) -> u32 {
        self.masks.word(generation, entity)
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Allocate an entity id, reusing freed ids first.
    pub fn add_entity(&mut self) -> Result<EntityId, WorldError> {
        self.entities
            .allocate()
            .ok_or(WorldError::EntityCapacityExceeded {
                max: self.config.max_entities,
            })
    }

    /// Queue `entity` for removal: all its components are detached and its id
    /// is recycled at the next commit. Returns `false` if it was not live or
    /// is already queued.
    pub fn remove_entity(&mut self, entity: EntityId) -> bool {
        if !self.entities.is_alive(entity) || self.entity_removals.contains(&entity) {
            return false;
        }
        self.detach_all(entity);
        self.entity_removals.push(entity);
        true
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.is_alive(entity)
    }

    /// Number of entity slots ever handed out.
    pub fn entity_cursor(&self) -> u32 {
        self.entities.cursor()
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.entities.live_count()
    }

    fn check_entity(&self, entity: EntityId) -> Result<(), WorldError> {
        if (entity as usize) < self.config.max_entities {
            Ok(())
        } else {
            Err(WorldError::EntityOutOfRange {
                entity,
                max: self.config.max_entities,
            })
        }
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// Attach `name` to `entity` with zeroed fields.
    pub fn attach(&mut self, name: &str, entity: EntityId) -> Result<(), WorldError> {
        self.attach_with(name, entity, &Value::Null, true)
    }

    /// Attach `name` to `entity`, optionally zeroing its fields before writing
    /// the partial `values` object. Systems that now match pick the entity up
    /// before this returns. Attaching a component the entity already has does
    /// nothing, including ignoring `values`.
    pub fn attach_with(
        &mut self,
        name: &str,
        entity: EntityId,
        values: &Value,
        reset: bool,
    ) -> Result<(), WorldError> {
        self.check_entity(entity)?;
        let descriptor = self
            .components
            .lookup_mut(name)
            .ok_or_else(|| unknown_component(name))?;
        let bit = descriptor.bit();
        if self.masks.contains(bit, entity) {
            return Ok(());
        }

        let invalid = |source| WorldError::InvalidValue {
            component: name.to_string(),
            source,
        };
        let store = descriptor.store_mut();
        store.validate(values).map_err(invalid)?;

        self.masks.insert(bit, entity);
        if reset {
            store.reset(entity);
        }
        store.set(entity, values).map_err(invalid)?;

        for system in self.systems.iter_mut() {
            if system.check_component(bit) && system.check(&self.masks, entity) {
                system.add(entity);
            }
        }

        self.counters.increment(ATTACH, 1);
        Ok(())
    }

    /// Queue `name` for removal from `entity`. Nothing changes until [`World::commit`].
    pub fn detach(&mut self, name: &str, entity: EntityId) -> Result<(), WorldError> {
        let component = self
            .components
            .id_of(name)
            .ok_or_else(|| unknown_component(name))?;
        self.removals.push(PendingRemoval { component, entity });
        self.counters.increment(DETACH_QUEUED, 1);
        Ok(())
    }

    /// Queue every registered component for removal from `entity`.
    pub fn detach_all(&mut self, entity: EntityId) {
        let queued = self.components.len();
        self.removals.extend(self.components.iter().map(|descriptor| PendingRemoval {
            component: descriptor.id(),
            entity,
        }));
        self.counters.increment(DETACH_QUEUED, queued);
    }

    /// Detachments waiting for the next commit, in enqueue order.
    pub fn pending_removals(&self) -> &[PendingRemoval] {
        &self.removals
    }

    /// Apply queued detachments in enqueue order, then recycle removed entities.
    ///
    /// An entry whose component is already gone is skipped; the rest of the
    /// queue is still applied.
    pub fn commit(&mut self) {
        if self.removals.is_empty() && self.entity_removals.is_empty() {
            return;
        }

        let queued = self.removals.len();
        let mut applied = 0;
        for &PendingRemoval { component, entity } in &self.removals {
            let Some(descriptor) = self.components.get(component) else {
                continue;
            };
            let bit = descriptor.bit();
            if !self.masks.contains(bit, entity) {
                trace!(component = descriptor.name(), entity, "stale removal skipped");
                continue;
            }

            self.masks.remove(bit, entity);
            for system in self.systems.iter_mut() {
                if system.check_component(bit)
                    && system.contains(entity)
                    && !system.check(&self.masks, entity)
                {
                    system.remove(entity);
                }
            }
            trace!(component = descriptor.name(), entity, "component removed");
            applied += 1;
        }
        self.removals.clear();

        let freed = self.entity_removals.len();
        for entity in self.entity_removals.drain(..) {
            self.entities.free(entity);
        }

        self.counters.increment(DETACH_APPLIED, applied);
        self.counters.increment(COMMIT, 1);
        debug!(queued, applied, freed, "commit");
    }

    /// Whether `entity` currently carries `name`. Out-of-range ids never do.
    pub fn has(&self, name: &str, entity: EntityId) -> Result<bool, WorldError> {
        let descriptor = self
            .components
            .lookup(name)
            .ok_or_else(|| unknown_component(name))?;
        Ok(self.masks.contains(descriptor.bit(), entity))
    }

    /// Run one logical step: `f` does its attaches and detaches, then the
    /// queued detachments are committed.
    pub fn step<R>(&mut self, f: impl FnOnce(&mut World) -> R) -> R {
        let result = f(self);
        self.commit();
        result
    }

    // ------------------------------------------------------------------
    // Systems
    // ------------------------------------------------------------------

    /// Register a system. Allocated entities that already match join it immediately.
    pub fn register_system(
        &mut self,
        descriptor: SystemDescriptor,
    ) -> Result<SystemHandle, WorldError> {
        let system = self.systems.register(descriptor, &self.components)?;
        system.sync_all(&self.masks, self.entities.cursor());
        debug!(
            system = system.name(),
            components = system.components().len(),
            joined = system.len(),
            "registered system"
        );
        Ok(system.handle())
    }

    pub fn system(&self, name: &str) -> Option<&System> {
        self.systems.by_name(name)
    }

    pub fn system_by_handle(&self, handle: SystemHandle) -> Option<&System> {
        self.systems.get(handle)
    }

    /// Entities subscribed to the system `name`, in iteration order.
    pub fn system_entities(&self, name: &str) -> Result<&[EntityId], WorldError> {
        self.systems
            .by_name(name)
            .map(System::entities)
            .ok_or_else(|| WorldError::UnknownSystem {
                name: name.to_string(),
            })
    }

    /// Systems in registration order.
    pub fn systems(&self) -> impl Iterator<Item = &System> {
        self.systems.iter()
    }

    // ------------------------------------------------------------------
    // Metrics
    // ------------------------------------------------------------------

    /// Operation counters (all zero unless the `metrics` feature is on).
    pub fn counters(&self) -> &Counter {
        &self.counters
    }
}

impl Default for World {
    fn default() -> Self {
        Self::with_valid_config(WorldConfig::default())
    }
}
