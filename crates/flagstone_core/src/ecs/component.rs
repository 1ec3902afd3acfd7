// component.rs - Runtime component registration
//
// Components are identified by name and registration order. The order decides
// each component's membership bit and its position in snapshots, so two worlds
// only agree on a snapshot if they registered the same components in the same
// order.

use crate::ecs::field_store::FieldStore;
use crate::ecs::mask::{generations_for, ComponentBit};
use crate::ecs::schema::Schema;
use std::collections::HashMap;
use thiserror::Error;

/// Registration index of a component type.
pub type ComponentId = u32;

/// Everything the world knows about one registered component type.
#[derive(Debug, Clone)]
pub struct ComponentDescriptor {
    id: ComponentId,
    name: String,
    bit: ComponentBit,
    store: FieldStore,
}

impl ComponentDescriptor {
    #[inline]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn bit(&self) -> ComponentBit {
        self.bit
    }

    #[inline]
    pub fn store(&self) -> &FieldStore {
        &self.store
    }

    #[inline]
    pub fn store_mut(&mut self) -> &mut FieldStore {
        &mut self.store
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComponentRegistrationError {
    #[error("cannot register component '{name}': max components ({max}) reached")]
    CapacityExceeded { name: String, max: usize },

    #[error("component '{name}' is already registered")]
    DuplicateName { name: String },
}

/// Name-keyed component table with a fixed upper bound on entries.
#[derive(Debug, Clone)]
pub struct ComponentRegistry {
    components: Vec<ComponentDescriptor>,
    name_lookup: HashMap<String, ComponentId>,
    max_components: usize,
    max_entities: usize,
}

impl ComponentRegistry {
    pub fn new(max_components: usize, max_entities: usize) -> Self {
        Self {
            components: Vec::new(),
            name_lookup: HashMap::new(),
            max_components,
            max_entities,
        }
    }

    /// Register `name` with a fresh field store and the next free membership bit.
    ///
    /// A rejected registration leaves the registry untouched.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        schema: Schema,
    ) -> Result<&mut ComponentDescriptor, ComponentRegistrationError> {
        let name = name.into();
        if self.components.len() >= self.max_components {
            return Err(ComponentRegistrationError::CapacityExceeded {
                name,
                max: self.max_components,
            });
        }
        if self.name_lookup.contains_key(&name) {
            return Err(ComponentRegistrationError::DuplicateName { name });
        }

        let index = self.components.len();
        let id = index as ComponentId;
        self.name_lookup.insert(name.clone(), id);
        self.components.push(ComponentDescriptor {
            id,
            name,
            bit: ComponentBit::from_index(index),
            store: FieldStore::new(schema, self.max_entities),
        });
        Ok(&mut self.components[index])
    }

    pub fn id_of(&self, name: &str) -> Option<ComponentId> {
        self.name_lookup.get(name).copied()
    }

    pub fn lookup(&self, name: &str) -> Option<&ComponentDescriptor> {
        self.get(self.id_of(name)?)
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut ComponentDescriptor> {
        let id = self.id_of(name)?;
        self.get_mut(id)
    }

    #[inline]
    pub fn get(&self, id: ComponentId) -> Option<&ComponentDescriptor> {
        self.components.get(id as usize)
    }

    #[inline]
    pub fn get_mut(&mut self, id: ComponentId) -> Option<&mut ComponentDescriptor> {
        self.components.get_mut(id as usize)
    }

    /// Components in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentDescriptor> {
        self.components.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ComponentDescriptor> {
        self.components.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Generation words in use by the registered components.
    pub fn generation_count(&self) -> usize {
        generations_for(self.components.len())
    }

    pub fn max_components(&self) -> usize {
        self.max_components
    }
}
